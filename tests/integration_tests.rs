use financial_statement_analyzer::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use financial_statement_analyzer::llm::client::GenerationConfig;
use financial_statement_analyzer::llm::extractor::DocumentStructurer;
use financial_statement_analyzer::llm::gateway::GenerativeProvider;

struct StubStructurer {
    statements: Option<FinancialStatements>,
    calls: AtomicUsize,
}

impl StubStructurer {
    fn returning(statements: FinancialStatements) -> Self {
        Self {
            statements: Some(statements),
            calls: AtomicUsize::new(0),
        }
    }

    fn empty() -> Self {
        Self {
            statements: None,
            calls: AtomicUsize::new(0),
        }
    }
}

impl DocumentStructurer for StubStructurer {
    async fn structure(
        &self,
        _document: &[u8],
        _mime_type: &str,
    ) -> Result<Option<FinancialStatements>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.statements.clone())
    }
}

struct StubProvider {
    responses: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl StubProvider {
    fn new(responses: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Self::new(vec![])
    }
}

impl GenerativeProvider for StubProvider {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(AnalyzerError::Provider {
                    model: model.to_string(),
                    message: "no scripted response".to_string(),
                })
            })
    }

    async fn generate_with_document(
        &self,
        model: &str,
        prompt: &str,
        _document: &[u8],
        _mime_type: &str,
        config: &GenerationConfig,
    ) -> Result<String> {
        self.generate(model, prompt, config).await
    }
}

fn fast_gateway_config() -> GatewayConfig {
    GatewayConfig {
        retry_base_delay: Duration::from_millis(1),
        ..GatewayConfig::default()
    }
}

fn service(
    structurer: StubStructurer,
    provider: Arc<StubProvider>,
) -> AnalysisService<StubStructurer, Arc<StubProvider>> {
    AnalysisService::new(
        structurer,
        provider,
        fast_gateway_config(),
        ExtractorConfig::default(),
        VerifierConfig::default(),
    )
}

fn document_payload() -> String {
    STANDARD.encode(b"%PDF-1.4 minimal statements document")
}

fn stage_outputs() -> Vec<Result<String>> {
    vec![
        Ok("負債比率は63.6%であり、負債合計27,947,258千円に対し純資産は十分です。".to_string()),
        Ok("経常損失は▲654,006千円で、附属病院セグメントの▲410,984千円が主因です。".to_string()),
        Ok("営業活動CF 1,470,000千円に対し投資活動CFは▲10,489,748千円でした。".to_string()),
        Ok("設備投資の資金調達構造に留意が必要です。".to_string()),
    ]
}

#[tokio::test]
async fn test_extract_verify_approve_analyze_pipeline() {
    let provider = StubProvider::new(stage_outputs());
    let service = service(
        StubStructurer::returning(reference_statements()),
        provider.clone(),
    );

    let mut verified = service
        .extract_and_verify(&document_payload())
        .await
        .unwrap();

    // The reference dataset carries a known cash-flow discrepancy: 4/5 checks.
    assert_eq!(verified.verification.overall_score, 80.0);
    assert!(verified.verification.is_valid);
    assert_eq!(verified.verification_status, VerificationStatus::Pending);
    assert!(verified
        .data
        .extraction_metadata
        .warnings
        .iter()
        .any(|w| w.contains("現金増減額")));

    let report = service
        .approve_and_analyze(&mut verified, Some("auditor"))
        .await
        .unwrap();

    assert_eq!(verified.verification_status, VerificationStatus::Approved);
    assert!(verified.verified_at.is_some());

    assert!(report.contains("# 財務分析レポート"));
    assert!(report.contains("## 財務健全性分析"));
    assert!(report.contains("## リスク分析と改善提案"));
    assert!(report.contains("[引用: data.totalLiabilities]"));
    assert!(report.contains("[引用: data.ordinaryLoss]"));
    assert!(report.contains("[引用: data.segments.附属病院.operatingProfitLoss]"));

    // Four stage calls, no ladder descent.
    assert_eq!(provider.prompts.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_degraded_extraction_still_produces_verifiable_record() {
    // Structurer finds nothing and every targeted field fails: the pipeline
    // must fall back to the reference dataset and say so.
    let provider = StubProvider::failing();
    let service = service(StubStructurer::empty(), provider);

    let verified = service
        .extract_and_verify(&document_payload())
        .await
        .unwrap();

    assert_eq!(verified.data.statements, reference_statements());
    assert!(verified
        .data
        .extraction_metadata
        .warnings
        .iter()
        .any(|w| w.contains("参照データセット")));
    assert_eq!(
        verified.data.extraction_metadata.confidence,
        ConfidenceTier::Medium
    );
    assert!(verified.verification.is_valid);
}

#[tokio::test]
async fn test_wire_contract_extract_and_approve() -> anyhow::Result<()> {
    let provider = StubProvider::new(stage_outputs());
    let service = service(
        StubStructurer::returning(reference_statements()),
        provider,
    );

    let body = serde_json::json!({
        "action": "extract",
        "base64Content": document_payload(),
    })
    .to_string();

    let (status, response) = service.handle("POST", &body).await;
    assert_eq!(status, 200);

    let verified = match response {
        ApiResponse::Extracted {
            success,
            verified_data,
        } => {
            assert!(success);
            verified_data
        }
        other => panic!("unexpected response: {:?}", other),
    };

    let approve_body = serde_json::to_string(&ApiRequest::Approve {
        verified_data: verified,
        approver: Some("auditor".to_string()),
    })?;

    let (status, response) = service.handle("POST", &approve_body).await;
    assert_eq!(status, 200);
    match response {
        ApiResponse::Analyzed { success, analysis } => {
            assert!(success);
            assert!(analysis.contains("財務分析レポート"));
        }
        other => panic!("unexpected response: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_wire_contract_rejects_bad_requests() {
    let provider = StubProvider::failing();
    let service = service(StubStructurer::empty(), provider);

    let (status, _) = service.handle("GET", "{}").await;
    assert_eq!(status, 405);

    let (status, _) = service
        .handle("POST", r#"{"action":"delete","base64Content":"AAAA"}"#)
        .await;
    assert_eq!(status, 400);

    let (status, response) = service
        .handle("POST", r#"{"action":"extract","base64Content":"!!!"}"#)
        .await;
    assert_eq!(status, 400);
    match response {
        ApiResponse::Error { message, .. } => assert!(message.contains("別の形式")),
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn test_approving_twice_is_a_conflict() {
    let provider = StubProvider::new(stage_outputs());
    let service = service(
        StubStructurer::returning(reference_statements()),
        provider,
    );

    let mut verified = service
        .extract_and_verify(&document_payload())
        .await
        .unwrap();
    service
        .approve_and_analyze(&mut verified, None)
        .await
        .unwrap();

    let approve_body = serde_json::to_string(&ApiRequest::Approve {
        verified_data: Box::new(verified),
        approver: None,
    })
    .unwrap();

    let (status, response) = service.handle("POST", &approve_body).await;
    assert_eq!(status, 409);
    match response {
        ApiResponse::Error { error, .. } => assert_eq!(error, "already_finalized"),
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn test_quota_pressure_descends_ladder_during_analysis() {
    let quota = |model: &str| {
        Err(AnalyzerError::Provider {
            model: model.to_string(),
            message: "status 429: quota exceeded".to_string(),
        })
    };
    let mut responses = vec![quota("gemini-1.5-flash")];
    responses.push(Ok("簡潔な健全性分析。".to_string()));
    responses.extend(stage_outputs().into_iter().skip(1));

    let provider = StubProvider::new(responses);
    let service = service(
        StubStructurer::returning(reference_statements()),
        provider.clone(),
    );

    let mut verified = service
        .extract_and_verify(&document_payload())
        .await
        .unwrap();
    let report = service
        .approve_and_analyze(&mut verified, None)
        .await
        .unwrap();

    assert!(report.contains("簡潔な健全性分析。"));

    // Stage 1 descended exactly one rung: five prompts total, and the second
    // one is the condensed fallback prompt.
    let prompts = provider.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 5);
    assert!(prompts[1].starts_with("以下の財務文書を簡潔に分析してください"));
}
