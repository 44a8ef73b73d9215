use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::interpret::{interpret_claim_reply, interpret_product_reply};
use super::prompt::{
    build_claim_prompt, build_product_prompt, CLAIM_SYSTEM_PROMPT, PRODUCT_SYSTEM_PROMPT,
};
use super::types::{AdvisoryService, ClaimAdvice, ProductNarrative};
use super::AdvisoryError;
use crate::config::{normalize_base_url, AdvisoryConfig};
use crate::pipeline::parsing::NutrientMap;

const CLAIM_MAX_TOKENS: u32 = 200;
const CLAIM_TEMPERATURE: f32 = 0.3;
const PRODUCT_MAX_TOKENS: u32 = 2000;
const PRODUCT_TEMPERATURE: f32 = 0.1;

/// OpenRouter chat-completions client acting as the advisory service.
pub struct OpenRouterAdvisor {
    base_url: String,
    api_key: String,
    model: String,
    site_url: Option<String>,
    app_name: Option<String>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenRouterAdvisor {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, AdvisoryError> {
        let base_url = normalize_base_url(base_url)
            .ok_or_else(|| AdvisoryError::InvalidUrl(base_url.to_string()))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AdvisoryError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url,
            api_key: api_key.to_string(),
            model: model.to_string(),
            site_url: None,
            app_name: None,
            client,
            timeout_secs,
        })
    }

    /// Build from configuration; `NotConfigured` when no API key is set.
    pub fn from_config(config: &AdvisoryConfig) -> Result<Self, AdvisoryError> {
        let api_key = config.api_key.as_deref().ok_or(AdvisoryError::NotConfigured)?;
        let mut advisor =
            Self::new(&config.base_url, api_key, &config.model, config.timeout_secs)?;
        advisor.site_url = config.site_url.clone();
        advisor.app_name = config.app_name.clone();
        Ok(advisor)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One chat completion; returns the first choice's content.
    fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, AdvisoryError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.trim(),
                },
                ChatMessage {
                    role: "user",
                    content: user.trim(),
                },
            ],
            max_tokens,
            temperature,
        };

        let mut request = self.client.post(&url).bearer_auth(&self.api_key).json(&body);
        if let Some(site) = &self.site_url {
            request = request.header("HTTP-Referer", site);
        }
        if let Some(title) = &self.app_name {
            request = request.header("X-Title", title);
        }

        tracing::debug!(model = %self.model, max_tokens, "Advisory request");
        let response = request.send().map_err(|e| {
            if e.is_connect() {
                AdvisoryError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                AdvisoryError::Timeout(self.timeout_secs)
            } else {
                AdvisoryError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AdvisoryError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| AdvisoryError::ResponseParsing(e.to_string()))?;

        first_choice_content(parsed)
    }
}

impl AdvisoryService for OpenRouterAdvisor {
    fn evaluate_claim(
        &self,
        claim: &str,
        facts: &NutrientMap,
    ) -> Result<ClaimAdvice, AdvisoryError> {
        let reply = self.complete(
            CLAIM_SYSTEM_PROMPT,
            &build_claim_prompt(claim, facts),
            CLAIM_MAX_TOKENS,
            CLAIM_TEMPERATURE,
        )?;
        interpret_claim_reply(&reply)
    }

    fn evaluate_product(
        &self,
        facts: &NutrientMap,
        ingredients: &[String],
        raw_text: &str,
    ) -> Result<ProductNarrative, AdvisoryError> {
        let reply = self.complete(
            PRODUCT_SYSTEM_PROMPT,
            &build_product_prompt(facts, ingredients, raw_text),
            PRODUCT_MAX_TOKENS,
            PRODUCT_TEMPERATURE,
        )?;
        interpret_product_reply(&reply)
    }

    fn name(&self) -> &str {
        "openrouter"
    }
}

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

fn first_choice_content(response: ChatResponse) -> Result<String, AdvisoryError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or(AdvisoryError::EmptyResponse)
}
