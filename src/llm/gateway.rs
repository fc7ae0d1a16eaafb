//! Model fallback ladder with retry and backoff.
//!
//! Every generation call goes through a static ladder of four increasingly
//! conservative model configurations. Quota and rate-limit refusals descend
//! the ladder immediately with a shortened prompt; other failures are retried
//! at the primary rung with exponential backoff and a slightly raised
//! temperature before descending.

use crate::error::{AnalyzerError, Result};
use crate::llm::client::GenerationConfig;
use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Seam between the gateway and the underlying model API. The real
/// implementation is `GeminiClient`; tests substitute scripted providers.
pub trait GenerativeProvider {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> impl Future<Output = Result<String>> + Send;

    fn generate_with_document(
        &self,
        model: &str,
        prompt: &str,
        document: &[u8],
        mime_type: &str,
        config: &GenerationConfig,
    ) -> impl Future<Output = Result<String>> + Send;
}

impl<P: GenerativeProvider + Send + Sync> GenerativeProvider for Arc<P> {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> impl Future<Output = Result<String>> + Send {
        (**self).generate(model, prompt, config)
    }

    fn generate_with_document(
        &self,
        model: &str,
        prompt: &str,
        document: &[u8],
        mime_type: &str,
        config: &GenerationConfig,
    ) -> impl Future<Output = Result<String>> + Send {
        (**self).generate_with_document(model, prompt, document, mime_type, config)
    }
}

/// How much of the caller's prompt a ladder rung receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    /// The full prompt, up to the content ceiling.
    Full,
    /// A condensed instruction wrapping a truncated document.
    Short,
    /// A bare task prefix plus the leading slice of the document.
    Minimal,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f64,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub max_output_tokens: u32,
    pub prompt_style: PromptStyle,
}

impl ModelConfig {
    fn generation_config(&self, temperature_offset: f64) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature + temperature_offset,
            top_p: self.top_p,
            top_k: self.top_k,
            max_output_tokens: self.max_output_tokens,
            response_mime_type: None,
            response_schema: None,
        }
    }
}

/// Gateway policy. All values are policy constants, not derived; defaults
/// match the reference behavior.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub ladder: Vec<ModelConfig>,
    /// Retries at the primary rung for non-quota failures.
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    /// Prompt length ceiling in characters, enforced before any call.
    pub content_ceiling: usize,
    pub short_prompt_ceiling: usize,
    pub minimal_prompt_ceiling: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            ladder: default_ladder(),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(2_000),
            content_ceiling: 10_000,
            short_prompt_ceiling: 4_000,
            minimal_prompt_ceiling: 2_000,
        }
    }
}

fn default_ladder() -> Vec<ModelConfig> {
    vec![
        ModelConfig {
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.2,
            top_p: Some(0.8),
            top_k: Some(40),
            max_output_tokens: 2_048,
            prompt_style: PromptStyle::Full,
        },
        ModelConfig {
            model: "gemini-pro".to_string(),
            temperature: 0.2,
            top_p: Some(0.8),
            top_k: None,
            max_output_tokens: 2_048,
            prompt_style: PromptStyle::Short,
        },
        ModelConfig {
            model: "gemini-1.0-pro".to_string(),
            temperature: 0.3,
            top_p: None,
            top_k: None,
            max_output_tokens: 1_024,
            prompt_style: PromptStyle::Short,
        },
        ModelConfig {
            model: "gemini-pro-vision".to_string(),
            temperature: 0.4,
            top_p: None,
            top_k: None,
            max_output_tokens: 512,
            prompt_style: PromptStyle::Minimal,
        },
    ]
}

pub struct ModelGateway<P: GenerativeProvider> {
    provider: P,
    config: GatewayConfig,
}

impl<P: GenerativeProvider> ModelGateway<P> {
    pub fn new(provider: P, config: GatewayConfig) -> Self {
        Self { provider, config }
    }

    /// Runs `prompt` down the ladder until a rung succeeds.
    ///
    /// Quota-classified failures never retry the same rung. Non-quota
    /// failures at a fallback rung propagate as-is, since retrying a content
    /// problem on a weaker model will not help.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let full = truncate_chars(prompt, self.config.content_ceiling);

        for (rung, model) in self.config.ladder.iter().enumerate() {
            let rung_prompt = self.prompt_for(&full, model.prompt_style);

            if rung == 0 {
                match self.generate_primary(model, &rung_prompt).await {
                    Ok(text) => return Ok(text),
                    Err(err) => {
                        warn!(
                            "Primary model '{}' gave up ({}), descending the ladder",
                            model.model, err
                        );
                    }
                }
            } else {
                match self
                    .provider
                    .generate(&model.model, &rung_prompt, &model.generation_config(0.0))
                    .await
                {
                    Ok(text) => return Ok(text),
                    Err(err) if err.is_quota_or_rate_limit() => {
                        warn!(
                            "Fallback model '{}' refused on quota ({}), descending",
                            model.model, err
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        Err(AnalyzerError::AllModelsExhausted)
    }

    /// Primary rung: immediate descent on quota, otherwise up to
    /// `max_retries` retries with exponential backoff and a raised
    /// temperature per attempt.
    async fn generate_primary(&self, model: &ModelConfig, prompt: &str) -> Result<String> {
        let mut retries = 0u32;
        loop {
            let config = model.generation_config(0.1 * f64::from(retries));
            match self.provider.generate(&model.model, prompt, &config).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_quota_or_rate_limit() => return Err(err),
                Err(err) => {
                    retries += 1;
                    if retries > self.config.max_retries {
                        return Err(err);
                    }
                    let delay = self.config.retry_base_delay * 2u32.pow(retries - 1);
                    debug!(
                        "Retry {} of '{}' after {:?}: {}",
                        retries, model.model, delay, err
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    fn prompt_for(&self, full: &str, style: PromptStyle) -> String {
        match style {
            PromptStyle::Full => full.to_string(),
            PromptStyle::Short => format!(
                "以下の財務文書を簡潔に分析してください：\n{}",
                truncate_chars(full, self.config.short_prompt_ceiling)
            ),
            PromptStyle::Minimal => format!(
                "財務分析: {}",
                truncate_chars(full, self.config.minimal_prompt_ceiling)
            ),
        }
    }
}

fn truncate_chars(text: &str, ceiling: usize) -> String {
    if text.chars().count() <= ceiling {
        text.to_string()
    } else {
        text.chars().take(ceiling).collect()
    }
}
