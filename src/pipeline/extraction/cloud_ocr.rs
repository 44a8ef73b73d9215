//! Cloud text recognition through the HuggingFace inference API.

use std::time::Duration;

use serde_json::Value;

use super::types::TextRecognizer;
use super::{status_error, ExtractionError};
use crate::config::{normalize_base_url, CloudOcrConfig};

/// Reply fields that may carry recognized text, in preference order.
const TEXT_FIELDS: &[&str] = &["generated_text", "text", "answer"];

pub struct HuggingFaceRecognizer {
    endpoint: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HuggingFaceRecognizer {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, ExtractionError> {
        let base_url = normalize_base_url(base_url)
            .ok_or_else(|| ExtractionError::InvalidUrl(base_url.to_string()))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: format!("{base_url}/{}", model.trim_matches('/')),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &CloudOcrConfig) -> Result<Self, ExtractionError> {
        Self::new(
            &config.base_url,
            &config.model,
            config.api_key.clone(),
            config.timeout_secs,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextRecognizer for HuggingFaceRecognizer {
    fn recognize(&self, image: &[u8]) -> Result<String, ExtractionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ExtractionError::MissingApiKey("cloud recognition"))?;

        let _span = tracing::info_span!(
            "cloud_ocr_recognize",
            model = %self.model,
            image_size = image.len(),
        )
        .entered();
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .query(&[("wait_for_model", "true")])
            .body(image.to_vec())
            .send()
            .map_err(|e| ExtractionError::from_transport(e, &self.endpoint, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(status_error(response));
        }

        let body: Value = response
            .json()
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;
        let text = text_from_reply(&body).unwrap_or_default();

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            text_len = text.len(),
            "Cloud recognition complete"
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

/// First text field of the reply, which is an object or an array of objects.
pub fn text_from_reply(body: &Value) -> Option<String> {
    match body {
        Value::Array(items) => items.iter().find_map(text_from_reply),
        Value::Object(map) => TEXT_FIELDS
            .iter()
            .find_map(|f| map.get(*f).and_then(Value::as_str))
            .map(|s| s.trim().to_string()),
        _ => None,
    }
}
