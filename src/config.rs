//! Application constants and environment-driven pipeline configuration.
//!
//! Every collaborator setting has a default so the pipeline runs with no
//! environment at all: product lookup and cloud endpoints point at the public
//! services, the local recognizer and advisory service stay disabled until a
//! model or API key is supplied.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "labelscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `tracing` directive when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "labelscan_lib=info,warn"
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be an http(s) URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },
}

// ═══════════════════════════════════════════════════════════
// Sections
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLookupConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ProductLookupConfig {
    fn default() -> Self {
        Self {
            base_url: "https://world.openfoodfacts.org".into(),
            timeout_secs: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudOcrConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for CloudOcrConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "microsoft/trocr-small-printed".into(),
            base_url: "https://api-inference.huggingface.co/models".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalOcrConfig {
    pub base_url: String,
    /// No model means the local tier is a no-op.
    pub model: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LocalOcrConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    /// No key means the advisory service is unavailable.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub site_url: Option<String>,
    pub app_name: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".into(),
            model: "deepseek/deepseek-r1".into(),
            site_url: None,
            app_name: None,
            timeout_secs: 60,
        }
    }
}

/// Per-tier retry budget for transient collaborator failures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub product_lookup: ProductLookupConfig,
    pub cloud_ocr: CloudOcrConfig,
    pub local_ocr: LocalOcrConfig,
    pub advisory: AdvisoryConfig,
    pub retry: RetryConfig,
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

impl PipelineConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// anything missing or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(url) = get("OPENFOODFACTS_BASE_URL") {
            config.product_lookup.base_url = checked_url("OPENFOODFACTS_BASE_URL", &url)?;
        }
        if let Some(secs) = number(&get, "OPENFOODFACTS_TIMEOUT_SECS")? {
            config.product_lookup.timeout_secs = secs;
        }

        config.cloud_ocr.api_key = get("HUGGINGFACE_API_KEY").or_else(|| get("HF_TOKEN"));
        if let Some(model) = get("DOCTR_API_MODEL") {
            config.cloud_ocr.model = model;
        }
        if let Some(url) = get("HUGGINGFACE_INFERENCE_URL") {
            config.cloud_ocr.base_url = checked_url("HUGGINGFACE_INFERENCE_URL", &url)?;
        }
        if let Some(secs) = number(&get, "DOCTR_API_TIMEOUT_SECS")? {
            config.cloud_ocr.timeout_secs = secs;
        }

        if let Some(url) = get("OLLAMA_BASE_URL") {
            config.local_ocr.base_url = checked_url("OLLAMA_BASE_URL", &url)?;
        }
        config.local_ocr.model = get("LOCAL_OCR_MODEL");
        if let Some(secs) = number(&get, "LOCAL_OCR_TIMEOUT_SECS")? {
            config.local_ocr.timeout_secs = secs;
        }

        config.advisory.api_key = get("OPENROUTER_API_KEY");
        if let Some(url) = get("OPENROUTER_BASE_URL") {
            config.advisory.base_url = checked_url("OPENROUTER_BASE_URL", &url)?;
        }
        if let Some(model) = get("OPENROUTER_MODEL") {
            config.advisory.model = model;
        }
        config.advisory.site_url = get("OPENROUTER_SITE_URL");
        config.advisory.app_name = get("OPENROUTER_APP_NAME");
        if let Some(secs) = number(&get, "OPENROUTER_TIMEOUT_SECS")? {
            config.advisory.timeout_secs = secs;
        }

        if let Some(retries) = number(&get, "EXTRACTION_MAX_RETRIES")? {
            config.retry.max_retries = retries;
        }
        if let Some(ms) = number(&get, "EXTRACTION_RETRY_BACKOFF_MS")? {
            config.retry.backoff_ms = ms;
        }

        tracing::debug!(
            cloud_key = config.cloud_ocr.api_key.is_some(),
            local_model = ?config.local_ocr.model,
            advisory_key = config.advisory.api_key.is_some(),
            "Pipeline configuration loaded"
        );
        Ok(config)
    }
}

fn number<T, G>(get: &G, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}

fn checked_url(var: &'static str, value: &str) -> Result<String, ConfigError> {
    normalize_base_url(value).ok_or_else(|| ConfigError::InvalidUrl {
        var,
        value: value.to_string(),
    })
}

/// Trailing-slash-free base URL, or `None` unless the scheme is http or https.
pub fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = reqwest::Url::parse(trimmed).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    Some(trimmed.to_string())
}
