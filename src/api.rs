//! Request/response boundary for the pipeline.
//!
//! One POST endpoint dispatches on an `action` field: `extract` runs the
//! extractor and verifier and returns a pending record; `approve` finalizes a
//! record and runs the full analysis. Error responses carry the user-facing
//! Japanese message, not the internal error text.

use crate::error::{AnalyzerError, Result};
use crate::llm::extractor::{DocumentStructurer, ExtractorConfig, FinancialExtractor};
use crate::llm::gateway::{GatewayConfig, GenerativeProvider, ModelGateway};
use crate::llm::analysis::AnalysisOrchestrator;
use crate::verification::{
    attach_verification, perform_integrity_check, VerifiedFinancialData, VerifierConfig,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ApiRequest {
    Extract {
        #[serde(rename = "base64Content")]
        base64_content: String,
    },
    Approve {
        #[serde(rename = "verifiedData")]
        verified_data: Box<VerifiedFinancialData>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        approver: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Extracted {
        success: bool,
        #[serde(rename = "verifiedData")]
        verified_data: Box<VerifiedFinancialData>,
    },
    Analyzed {
        success: bool,
        analysis: String,
    },
    Error {
        error: String,
        message: String,
    },
}

/// The two boundary operations, wired together over shared collaborators.
pub struct AnalysisService<S: DocumentStructurer, P: GenerativeProvider> {
    extractor: FinancialExtractor<S, P>,
    orchestrator: AnalysisOrchestrator<P>,
    verifier: VerifierConfig,
}

impl<S, P> AnalysisService<S, P>
where
    S: DocumentStructurer,
    P: GenerativeProvider + Clone,
{
    pub fn new(
        structurer: S,
        provider: P,
        gateway_config: GatewayConfig,
        extractor_config: ExtractorConfig,
        verifier_config: VerifierConfig,
    ) -> Self {
        Self {
            extractor: FinancialExtractor::new(structurer, provider.clone(), extractor_config),
            orchestrator: AnalysisOrchestrator::new(ModelGateway::new(provider, gateway_config)),
            verifier: verifier_config,
        }
    }

    /// Extractor then verifier; the returned record starts in pending status.
    pub async fn extract_and_verify(&self, base64_content: &str) -> Result<VerifiedFinancialData> {
        let document = decode_document(base64_content)?;
        let data = self.extractor.extract(&document).await?;
        let verification = perform_integrity_check(&data, &self.verifier);
        info!(
            "Verification complete: score {} ({} warnings)",
            verification.overall_score,
            verification.warnings.len()
        );
        Ok(attach_verification(data, verification))
    }

    /// Approves the record, then runs the full analysis on it.
    pub async fn approve_and_analyze(
        &self,
        verified: &mut VerifiedFinancialData,
        approver: Option<&str>,
    ) -> Result<String> {
        verified.approve(approver)?;
        self.orchestrator.analyze(verified).await
    }

    /// Request/response dispatch. Returns the HTTP status alongside the body
    /// so any transport layer can consume it.
    pub async fn handle(&self, method: &str, body: &str) -> (u16, ApiResponse) {
        if !method.eq_ignore_ascii_case("POST") {
            return (
                405,
                ApiResponse::Error {
                    error: "method_not_allowed".to_string(),
                    message: "POSTメソッドのみ対応しています。".to_string(),
                },
            );
        }

        let request: ApiRequest = match serde_json::from_str(body) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected malformed request: {}", e);
                return (
                    400,
                    ApiResponse::Error {
                        error: "bad_request".to_string(),
                        message: "リクエストの形式が正しくありません。".to_string(),
                    },
                );
            }
        };

        match request {
            ApiRequest::Extract { base64_content } => {
                match self.extract_and_verify(&base64_content).await {
                    Ok(verified) => (
                        200,
                        ApiResponse::Extracted {
                            success: true,
                            verified_data: Box::new(verified),
                        },
                    ),
                    Err(e) => error_response(e),
                }
            }
            ApiRequest::Approve {
                mut verified_data,
                approver,
            } => {
                match self
                    .approve_and_analyze(&mut verified_data, approver.as_deref())
                    .await
                {
                    Ok(analysis) => (
                        200,
                        ApiResponse::Analyzed {
                            success: true,
                            analysis,
                        },
                    ),
                    Err(e) => error_response(e),
                }
            }
        }
    }
}

fn error_response(error: AnalyzerError) -> (u16, ApiResponse) {
    warn!("Request failed: {}", error);
    let status = match &error {
        AnalyzerError::InvalidDocument(_)
        | AnalyzerError::Decode(_)
        | AnalyzerError::Serialization(_) => 400,
        AnalyzerError::AlreadyFinalized(_) => 409,
        _ => 500,
    };
    (
        status,
        ApiResponse::Error {
            error: error_code(&error).to_string(),
            message: error.user_facing_message(),
        },
    )
}

fn error_code(error: &AnalyzerError) -> &'static str {
    match error {
        AnalyzerError::InvalidDocument(_) | AnalyzerError::Decode(_) => "invalid_document",
        AnalyzerError::AlreadyFinalized(_) => "already_finalized",
        AnalyzerError::AllModelsExhausted => "models_exhausted",
        AnalyzerError::Provider { .. } => "provider_error",
        _ => "internal_error",
    }
}

/// Accepts both bare base64 and `data:` URL payloads.
fn decode_document(payload: &str) -> Result<Vec<u8>> {
    let raw = payload
        .split_once("base64,")
        .map(|(_, rest)| rest)
        .unwrap_or(payload);
    let bytes = STANDARD.decode(raw.trim())?;
    if bytes.is_empty() {
        return Err(AnalyzerError::InvalidDocument(
            "empty document payload".to_string(),
        ));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_document_strips_data_url_prefix() {
        let bytes = decode_document("data:application/pdf;base64,JVBERi0=").unwrap();
        assert_eq!(bytes, b"%PDF-");
    }

    #[test]
    fn test_decode_document_rejects_garbage() {
        assert!(decode_document("not base64 at all!!!").is_err());
        assert!(decode_document("").is_err());
    }

    #[test]
    fn test_request_action_tagging() {
        let json = r#"{"action":"extract","base64Content":"JVBERi0="}"#;
        let request: ApiRequest = serde_json::from_str(json).unwrap();
        assert!(matches!(request, ApiRequest::Extract { .. }));

        let unknown = r#"{"action":"delete","base64Content":"JVBERi0="}"#;
        assert!(serde_json::from_str::<ApiRequest>(unknown).is_err());
    }

    #[test]
    fn test_error_response_statuses() {
        let (status, _) = error_response(AnalyzerError::InvalidDocument("x".to_string()));
        assert_eq!(status, 400);

        let (status, _) = error_response(AnalyzerError::AlreadyFinalized("approved".to_string()));
        assert_eq!(status, 409);

        let (status, body) = error_response(AnalyzerError::AllModelsExhausted);
        assert_eq!(status, 500);
        match body {
            ApiResponse::Error { message, .. } => assert!(message.contains("30分")),
            _ => panic!("expected error body"),
        }
    }
}
