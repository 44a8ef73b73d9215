//! Local text recognition through an Ollama vision model.
//!
//! The recognizer sends the prepared label image to `/api/chat` and asks for
//! a plain transcription. Deployments without local compute use
//! `NoOpRecognizer`, which always reports itself unavailable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::types::TextRecognizer;
use super::{status_error, ExtractionError};
use crate::config::{normalize_base_url, LocalOcrConfig};

// ──────────────────────────────────────────────
// Constants
// ──────────────────────────────────────────────

const TRANSCRIBE_SYSTEM_PROMPT: &str = "\
You transcribe packaged-food labels. Output only the text printed on the label, \
line by line, in reading order. Do not summarize, explain, or add anything.";

const TRANSCRIBE_USER_PROMPT: &str = "\
Transcribe every line of this food label: product name, claims, the Nutrition Facts \
panel with amounts and % Daily Value, the ingredient list, and allergen statements.";

// ──────────────────────────────────────────────
// VisionClient
// ──────────────────────────────────────────────

/// Chat-with-images transport used by the local recognizer.
pub trait VisionClient: Send + Sync {
    fn chat_with_images(
        &self,
        model: &str,
        prompt: &str,
        images_base64: &[String],
        system: Option<&str>,
    ) -> Result<String, ExtractionError>;
}

/// Ollama HTTP client for vision chat.
pub struct OllamaVisionClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaVisionClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ExtractionError> {
        let base_url = normalize_base_url(base_url)
            .ok_or_else(|| ExtractionError::InvalidUrl(base_url.to_string()))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url,
            client,
            timeout_secs,
        })
    }
}

/// Request body for Ollama /api/chat
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct OllamaChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<&'a [String]>,
}

/// Response body from Ollama /api/chat
#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaChatReply,
}

#[derive(Deserialize)]
struct OllamaChatReply {
    #[serde(default)]
    content: String,
}

fn chat_request<'a>(
    model: &'a str,
    prompt: &'a str,
    images: &'a [String],
    system: Option<&'a str>,
) -> OllamaChatRequest<'a> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(OllamaChatMessage {
            role: "system",
            content: system,
            images: None,
        });
    }
    messages.push(OllamaChatMessage {
        role: "user",
        content: prompt,
        images: Some(images),
    });
    OllamaChatRequest {
        model,
        messages,
        stream: false,
    }
}

impl VisionClient for OllamaVisionClient {
    fn chat_with_images(
        &self,
        model: &str,
        prompt: &str,
        images_base64: &[String],
        system: Option<&str>,
    ) -> Result<String, ExtractionError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = chat_request(model, prompt, images_base64, system);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| ExtractionError::from_transport(e, &self.base_url, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(status_error(response));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;

        Ok(parsed.message.content)
    }
}

/// Mock vision client for testing. Counts calls; rejects requests without an image.
pub struct MockVisionClient {
    response: String,
    calls: AtomicUsize,
}

impl MockVisionClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VisionClient for MockVisionClient {
    fn chat_with_images(
        &self,
        _model: &str,
        _prompt: &str,
        images_base64: &[String],
        _system: Option<&str>,
    ) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if images_base64.is_empty() {
            return Err(ExtractionError::ImageProcessing("no image attached".into()));
        }
        Ok(self.response.clone())
    }
}

// ──────────────────────────────────────────────
// Recognizers
// ──────────────────────────────────────────────

/// Local recognizer backed by an Ollama vision model.
pub struct OllamaVisionRecognizer {
    vision_client: Arc<dyn VisionClient>,
    model_name: String,
}

impl OllamaVisionRecognizer {
    pub fn new(vision_client: Arc<dyn VisionClient>, model_name: String) -> Self {
        Self {
            vision_client,
            model_name,
        }
    }

    /// `NoOpRecognizer` when no local model is configured.
    pub fn from_config(
        config: &LocalOcrConfig,
    ) -> Result<Arc<dyn TextRecognizer>, ExtractionError> {
        match &config.model {
            Some(model) => {
                let client = OllamaVisionClient::new(&config.base_url, config.timeout_secs)?;
                Ok(Arc::new(Self::new(Arc::new(client), model.clone())))
            }
            None => Ok(Arc::new(NoOpRecognizer)),
        }
    }
}

impl TextRecognizer for OllamaVisionRecognizer {
    fn recognize(&self, image: &[u8]) -> Result<String, ExtractionError> {
        let _span = tracing::info_span!(
            "local_ocr_recognize",
            model = %self.model_name,
            image_size = image.len(),
        )
        .entered();
        let start = std::time::Instant::now();

        let images = vec![base64::engine::general_purpose::STANDARD.encode(image)];
        let raw = self.vision_client.chat_with_images(
            &self.model_name,
            TRANSCRIBE_USER_PROMPT,
            &images,
            Some(TRANSCRIBE_SYSTEM_PROMPT),
        )?;
        let text = strip_code_fences(&raw);

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            text_len = text.len(),
            "Local recognition complete"
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

/// Vision models sometimes wrap the transcription in a Markdown fence.
fn strip_code_fences(raw: &str) -> String {
    raw.lines()
        .filter(|l| !l.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Stand-in for deployments without local compute.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpRecognizer;

impl TextRecognizer for NoOpRecognizer {
    fn recognize(&self, _image: &[u8]) -> Result<String, ExtractionError> {
        Err(ExtractionError::Unavailable(
            "no local recognition model configured".into(),
        ))
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Scripted recognizer for testing: optional leading transient failures,
/// then a fixed reply or a fatal error.
pub struct MockRecognizer {
    name: String,
    reply: Option<String>,
    transient_failures: usize,
    calls: AtomicUsize,
}

impl MockRecognizer {
    pub fn new(reply: &str) -> Self {
        Self {
            name: "mock".into(),
            reply: Some(reply.to_string()),
            transient_failures: 0,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call fails with a fatal HTTP 400.
    pub fn failing() -> Self {
        Self {
            reply: None,
            ..Self::new("")
        }
    }

    /// First `n` calls fail with 503.
    pub fn with_transient_failures(mut self, n: usize) -> Self {
        self.transient_failures = n;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for MockRecognizer {
    fn recognize(&self, _image: &[u8]) -> Result<String, ExtractionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.transient_failures {
            return Err(ExtractionError::Http {
                status: 503,
                body: "model loading".into(),
                retry_after_secs: None,
            });
        }
        self.reply.clone().ok_or_else(|| ExtractionError::Http {
            status: 400,
            body: "bad request".into(),
            retry_after_secs: None,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
