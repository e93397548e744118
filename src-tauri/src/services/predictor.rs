use crate::models::capture_types::AcquiredImage;
use crate::models::predict_types::PredictionOutcome;
use crate::services::acquirer::local_path;
use std::fmt;

const DEFAULT_API_URL: &str = "https://potato-disease-api-wd08.onrender.com/predict";
const API_URL_ENV: &str = "LEAF_LENSE_API_URL";

const DEFAULT_FILE_NAME: &str = "photo.jpg";
const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// How a prediction attempt failed. The caller branches on this: the
/// two classes map to different user-facing messages.
#[derive(Debug, PartialEq)]
pub enum PredictError {
    /// Network-layer failure: refused connection, timeout, non-2xx
    /// status, or a body that is not JSON.
    Transport(String),
    /// Well-formed response missing the classification field.
    MissingLabel,
}

impl fmt::Display for PredictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictError::Transport(detail) => write!(f, "transport failure: {}", detail),
            PredictError::MissingLabel => write!(f, "response carried no classification"),
        }
    }
}

/// Client for the remote leaf classifier. One POST per prediction, no
/// retries; the endpoint is resolved once at construction.
pub struct PredictionClient {
    endpoint: String,
    http: reqwest::Client,
}

impl PredictionClient {
    /// `endpoint` overrides everything; otherwise the `LEAF_LENSE_API_URL`
    /// environment variable applies, then the documented default.
    pub fn new(endpoint: Option<String>) -> Self {
        let endpoint = endpoint
            .or_else(|| std::env::var(API_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        PredictionClient {
            endpoint,
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload one acquired image as a single-part multipart form and
    /// fold the response into an outcome.
    pub async fn predict(&self, image: &AcquiredImage) -> Result<PredictionOutcome, PredictError> {
        let path = local_path(&image.uri);
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PredictError::Transport(format!("failed to read {}: {}", path, e)))?;

        let file_name = if image.name.is_empty() {
            DEFAULT_FILE_NAME.to_string()
        } else {
            image.name.clone()
        };
        let mime_type = if image.mime_type.is_empty() {
            DEFAULT_MIME_TYPE
        } else {
            image.mime_type.as_str()
        };

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_type)
            .map_err(|e| PredictError::Transport(format!("invalid mime type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| PredictError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictError::Transport(format!(
                "HTTP {} from {}",
                status, self.endpoint
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PredictError::Transport(format!("invalid response body: {}", e)))?;

        let label = match body.get("class").and_then(|v| v.as_str()) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => return Err(PredictError::MissingLabel),
        };
        let confidence = body.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0);

        // The contract says pre-scaled percentages. Divergent values are
        // flagged but passed through untouched so the display always
        // matches the server.
        if !(0.0..=100.0).contains(&confidence) {
            eprintln!(
                "[predict] confidence {} outside the 0-100 contract for {}",
                confidence, label
            );
        }

        Ok(PredictionOutcome { label, confidence })
    }

    /// Liveness probe against the API's sibling /ping route.
    pub async fn ping(&self) -> bool {
        let url = ping_url(&self.endpoint);
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                eprintln!("[predict] ping failed: {}", e);
                false
            }
        }
    }
}

fn ping_url(endpoint: &str) -> String {
    match endpoint.rfind('/') {
        Some(idx) => format!("{}/ping", &endpoint[..idx]),
        None => format!("{}/ping", endpoint),
    }
}
