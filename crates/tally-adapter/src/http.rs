//! HTTP inference server client
//!
//! Talks JSON to a model server exposing the three recognition capabilities:
//!
//! | Route | Request | Response |
//! |-------|---------|----------|
//! | `POST /v1/document-qa` | `{"document", "question"}` | `[{"answer", "score"}]` |
//! | `POST /v1/zero-shot` | `{"text", "labels"}` | `{"labels", "scores"}` |
//! | `POST /v1/ocr` | raw image bytes | `[{"text", "bbox", "confidence"}]` |
//!
//! The client is blocking. The pipeline calls services from blocking worker
//! threads, never from inside an async task. There are no retries here;
//! a failed request is reported once and the adapter turns it into an absent
//! value.
//!
//! # Examples
//!
//! ```no_run
//! use tally_adapter::HttpInferenceClient;
//! use std::time::Duration;
//!
//! let client = HttpInferenceClient::new("http://localhost:8000", Duration::from_secs(30)).unwrap();
//! ```

use crate::{AdapterConfig, AdapterError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tally_domain::traits::{DocumentQuestionAnswerer, TextRecognizer, ZeroShotClassifier};
use tally_domain::{Answer, BoundingBox, LabelScore, PreparedDocument, RecognizedToken};

/// Default inference server endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Default timeout for inference requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for a JSON inference server
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct QuestionRequest<'a> {
    document: &'a str,
    question: &'a str,
}

#[derive(Deserialize)]
struct AnswerDto {
    answer: String,
    score: f64,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
    labels: &'a [String],
}

#[derive(Deserialize)]
struct ClassifyResponse {
    labels: Vec<String>,
    scores: Vec<f64>,
}

#[derive(Deserialize)]
struct TokenDto {
    text: String,
    bbox: Vec<[i32; 2]>,
    confidence: f64,
}

impl HttpInferenceClient {
    /// Create a client for the server at `endpoint`
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AdapterError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Create a client from adapter configuration
    pub fn from_config(config: &AdapterConfig) -> Result<Self, AdapterError> {
        Self::new(config.endpoint.clone(), config.request_timeout())
    }

    /// The server base URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post_json<Req, Resp>(&self, route: &str, body: &Req) -> Result<Resp, AdapterError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.endpoint, route);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(transport_error)?;
        Self::decode(route, response)
    }

    fn decode<Resp: DeserializeOwned>(
        route: &str,
        response: reqwest::blocking::Response,
    ) -> Result<Resp, AdapterError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AdapterError::ModelNotAvailable(route.to_string()));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AdapterError::Communication(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }
        response
            .json::<Resp>()
            .map_err(|e| AdapterError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

fn transport_error(e: reqwest::Error) -> AdapterError {
    if e.is_timeout() {
        AdapterError::Timeout
    } else {
        AdapterError::Communication(format!("Request failed: {}", e))
    }
}

/// Pair zero-shot labels with scores and rank them, highest first
fn rank_labels(response: ClassifyResponse) -> Result<Vec<LabelScore>, AdapterError> {
    if response.labels.len() != response.scores.len() {
        return Err(AdapterError::InvalidResponse(format!(
            "{} labels but {} scores",
            response.labels.len(),
            response.scores.len()
        )));
    }
    let mut ranked: Vec<LabelScore> = response
        .labels
        .into_iter()
        .zip(response.scores)
        .map(|(label, score)| LabelScore::new(label, score))
        .collect();
    ranked.sort_by(|a, b| b.score.value().total_cmp(&a.score.value()));
    Ok(ranked)
}

impl DocumentQuestionAnswerer for HttpInferenceClient {
    type Error = AdapterError;

    fn answer(&self, locator: &Path, question: &str) -> Result<Vec<Answer>, Self::Error> {
        let document = locator.to_string_lossy();
        let request = QuestionRequest {
            document: &document,
            question,
        };
        let answers: Vec<AnswerDto> = self.post_json("/v1/document-qa", &request)?;
        Ok(answers
            .into_iter()
            .map(|a| Answer::new(a.answer, a.score))
            .collect())
    }
}

impl ZeroShotClassifier for HttpInferenceClient {
    type Error = AdapterError;

    fn classify(&self, text: &str, labels: &[String]) -> Result<Vec<LabelScore>, Self::Error> {
        let response: ClassifyResponse =
            self.post_json("/v1/zero-shot", &ClassifyRequest { text, labels })?;
        rank_labels(response)
    }
}

impl TextRecognizer for HttpInferenceClient {
    type Error = AdapterError;

    fn recognize(&self, document: &PreparedDocument) -> Result<Vec<RecognizedToken>, Self::Error> {
        let url = format!("{}/v1/ocr", self.endpoint);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(document.image.clone())
            .send()
            .map_err(transport_error)?;
        let tokens: Vec<TokenDto> = Self::decode("/v1/ocr", response)?;
        Ok(tokens
            .into_iter()
            .map(|t| RecognizedToken::new(t.text, BoundingBox(t.bbox), t.confidence))
            .collect())
    }
}
