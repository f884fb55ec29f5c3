//! Receipt date parsing

use chrono::NaiveDate;

/// Parse extracted date text using the first matching format.
///
/// The whole trimmed text is tried first; if nothing matches, the first
/// whitespace-separated word is tried, which handles answers such as
/// `"25/12/2018 10:31 AM"`. Formats are tried in order, so two-digit-year
/// formats must come before four-digit ones.
///
/// # Examples
///
/// ```
/// use tally_validate::parse_receipt_date;
/// use chrono::NaiveDate;
///
/// let formats = vec!["%d/%m/%Y".to_string()];
/// assert_eq!(
///     parse_receipt_date("25/12/2018", &formats),
///     NaiveDate::from_ymd_opt(2018, 12, 25)
/// );
/// assert_eq!(parse_receipt_date("yesterday", &formats), None);
/// ```
pub fn parse_receipt_date(raw: &str, formats: &[String]) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(date) = try_formats(trimmed, formats) {
        return Some(date);
    }

    let first_word = trimmed.split_whitespace().next()?;
    if first_word != trimmed {
        return try_formats(first_word, formats);
    }
    None
}

fn try_formats(text: &str, formats: &[String]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Formats seen on the receipt corpus, day-first, two-digit years first
pub(crate) fn default_date_formats() -> Vec<String> {
    [
        "%d/%m/%y",
        "%d-%m-%y",
        "%d.%m.%y",
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%d.%m.%Y",
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d %b %Y",
        "%d-%b-%Y",
        "%d %B %Y",
        "%b %d, %Y",
        "%d%b%Y",
    ]
    .iter()
    .map(|f| f.to_string())
    .collect()
}
