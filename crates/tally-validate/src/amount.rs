//! Amount cleaning

/// Convert extracted amount text to a number.
///
/// Every string in `stripped_symbols` is removed, surrounding whitespace is
/// trimmed, and the remainder is parsed as a decimal. Returns `None` for empty,
/// non-numeric, non-finite or negative input; never a made-up zero.
///
/// Only the listed symbols are removed: with the default `["$", ","]`,
/// `"RM12.00"` stays unparseable unless `"RM"` is added to the list.
///
/// # Examples
///
/// ```
/// use tally_validate::clean_amount;
///
/// let symbols = vec!["$".to_string(), ",".to_string()];
/// assert_eq!(clean_amount("$1,234.50", &symbols), Some(1234.50));
/// assert_eq!(clean_amount("RM12.00", &symbols), None);
/// assert_eq!(clean_amount("", &symbols), None);
/// ```
pub fn clean_amount(raw: &str, stripped_symbols: &[String]) -> Option<f64> {
    let mut cleaned = raw.to_string();
    for symbol in stripped_symbols.iter().filter(|s| !s.is_empty()) {
        cleaned = cleaned.replace(symbol.as_str(), "");
    }

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value)
}
