use crate::error::{AnalyzerError, Result};
use crate::llm::gateway::GenerativeProvider;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// Base64-encoded document bytes.
    pub data: String,
}

/// Sampling parameters for a single generation call. Built by the gateway
/// from the active ladder rung.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    pub max_output_tokens: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    parts: Vec<Part>,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    async fn generate_content(
        &self,
        model: &str,
        contents: Vec<Content>,
        config: &GenerationConfig,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let payload = GenerateContentRequest {
            contents,
            generation_config: config.clone(),
        };

        let res = self.client.post(&url).json(&payload).send().await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(AnalyzerError::Provider {
                model: model.to_string(),
                message: format!("status {}: {}", status, err_text),
            });
        }

        let body: GenerateContentResponse = res.json().await?;

        let part = body
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().next())
            .ok_or_else(|| AnalyzerError::Provider {
                model: model.to_string(),
                message: "No candidates returned".to_string(),
            })?;

        match part {
            Part::Text { text } => Ok(text),
            Part::InlineData { .. } => Err(AnalyzerError::Provider {
                model: model.to_string(),
                message: "Model returned non-text content".to_string(),
            }),
        }
    }
}

impl GenerativeProvider for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let contents = vec![Content {
            role: "user".to_string(),
            parts: vec![Part::Text {
                text: prompt.to_string(),
            }],
        }];
        self.generate_content(model, contents, config).await
    }

    async fn generate_with_document(
        &self,
        model: &str,
        prompt: &str,
        document: &[u8],
        mime_type: &str,
        config: &GenerationConfig,
    ) -> Result<String> {
        let contents = vec![Content {
            role: "user".to_string(),
            parts: vec![
                Part::Text {
                    text: prompt.to_string(),
                },
                Part::InlineData {
                    inline_data: Blob {
                        mime_type: mime_type.to_string(),
                        data: STANDARD.encode(document),
                    },
                },
            ],
        }];
        self.generate_content(model, contents, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_config_omits_unset_fields() {
        let config = GenerationConfig {
            temperature: 0.3,
            top_p: None,
            top_k: None,
            max_output_tokens: 1024,
            response_mime_type: None,
            response_schema: None,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("maxOutputTokens"));
        assert!(!json.contains("topP"));
        assert!(!json.contains("topK"));
        assert!(!json.contains("responseSchema"));
    }

    #[test]
    fn test_inline_data_wire_shape() {
        let part = Part::InlineData {
            inline_data: Blob {
                mime_type: "application/pdf".to_string(),
                data: "AAAA".to_string(),
            },
        };
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains("inlineData"));
        assert!(json.contains("mimeType"));
    }
}
