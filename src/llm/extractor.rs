//! Document extraction with an ordered fallback chain.
//!
//! Extraction strictly tries structured whole-document extraction first, then
//! field-by-field targeted extraction of the historically error-prone values,
//! then the fixed reference dataset. A quota refusal at any point jumps
//! straight to the reference dataset, and reference use is always recorded in
//! the extraction warnings.

use crate::currency::{extract_numbers, parse_japanese_currency};
use crate::error::{AnalyzerError, Result};
use crate::llm::client::{GeminiClient, GenerationConfig};
use crate::llm::gateway::GenerativeProvider;
use crate::llm::prompts::{
    structured_extraction_prompt, targeted_field_prompt, targeted_fields, TargetedField,
    TargetedFieldKind,
};
use crate::reference::{
    reference_statements, HOSPITAL_SEGMENT, REFERENCE_FISCAL_YEAR, REFERENCE_ORGANIZATION,
};
use crate::statements::{ExtractedFinancialData, ExtractionMetadata, FinancialStatements};
use log::{debug, info, warn};
use std::future::Future;

/// Seam to the external table/field locator: a typed statements object, or
/// `None` when the document holds nothing it can structure.
pub trait DocumentStructurer {
    fn structure(
        &self,
        document: &[u8],
        mime_type: &str,
    ) -> impl Future<Output = Result<Option<FinancialStatements>>> + Send;
}

/// Structurer backed by schema-constrained Gemini JSON output.
#[derive(Clone)]
pub struct GeminiStructurer {
    client: GeminiClient,
    model: String,
}

impl GeminiStructurer {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

impl DocumentStructurer for GeminiStructurer {
    async fn structure(
        &self,
        document: &[u8],
        mime_type: &str,
    ) -> Result<Option<FinancialStatements>> {
        let schema = serde_json::to_value(schemars::schema_for!(FinancialStatements))?;
        let config = GenerationConfig {
            temperature: 0.1,
            top_p: None,
            top_k: None,
            max_output_tokens: 8_192,
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
        };

        let text = self
            .client
            .generate_with_document(
                &self.model,
                &structured_extraction_prompt(),
                document,
                mime_type,
                &config,
            )
            .await?;

        match serde_json::from_str(strip_code_fences(&text)) {
            Ok(statements) => Ok(Some(statements)),
            Err(e) => {
                debug!("Structured extraction response did not parse: {}", e);
                Ok(None)
            }
        }
    }
}

/// Models still wrap JSON in markdown fences even when asked not to.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Model used for targeted single-field extraction.
    pub targeted_model: String,
    pub mime_type: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            targeted_model: "gemini-1.5-flash".to_string(),
            mime_type: "application/pdf".to_string(),
        }
    }
}

pub struct FinancialExtractor<S: DocumentStructurer, P: GenerativeProvider> {
    structurer: S,
    provider: P,
    config: ExtractorConfig,
}

impl<S: DocumentStructurer, P: GenerativeProvider> FinancialExtractor<S, P> {
    pub fn new(structurer: S, provider: P, config: ExtractorConfig) -> Self {
        Self {
            structurer,
            provider,
            config,
        }
    }

    /// Extracts a statement set from a document.
    ///
    /// Never fails for a value it cannot locate; only an undecodable document
    /// payload is fatal.
    pub async fn extract(&self, document: &[u8]) -> Result<ExtractedFinancialData> {
        if document.is_empty() {
            return Err(AnalyzerError::InvalidDocument(
                "empty document payload".to_string(),
            ));
        }

        info!("Starting extraction ({} bytes)", document.len());
        let mut warnings = Vec::new();

        match self
            .structurer
            .structure(document, &self.config.mime_type)
            .await
        {
            Ok(Some(statements)) => {
                info!("Structured extraction succeeded");
                return Ok(finish(statements, 3, warnings));
            }
            Ok(None) => {
                warn!("Structured extraction found no statements, switching to targeted fields");
                warnings.push(
                    "構造化抽出で財務諸表を特定できませんでした。個別項目抽出に切り替えます。"
                        .to_string(),
                );
            }
            Err(e) if e.is_quota_or_rate_limit() => {
                warn!("Structured extraction hit a quota limit: {}", e);
                return Ok(quota_reference_fallback(warnings));
            }
            Err(e) => {
                warn!("Structured extraction failed: {}", e);
                warnings.push(format!(
                    "構造化抽出でエラーが発生しました（{}）。個別項目抽出に切り替えます。",
                    e
                ));
            }
        }

        let mut results = Vec::new();
        for field in targeted_fields() {
            match self.extract_targeted_field(document, &field).await {
                Ok(result) => results.push((field, result)),
                Err(e) => {
                    warn!("Targeted extraction hit a quota limit: {}", e);
                    return Ok(quota_reference_fallback(warnings));
                }
            }
        }

        if results.iter().all(|(_, result)| result.value.is_none()) {
            warn!("All targeted fields failed, using the reference dataset");
            warnings.push(reference_warning());
            return Ok(finish(reference_statements(), 0, warnings));
        }

        let mut statements = reference_statements();
        let mut found = 0u32;
        for (field, result) in results {
            match result.value {
                Some(v) => {
                    found += 1;
                    apply_targeted_value(&mut statements, field.kind, v);
                }
                None => {
                    if result.raw.is_empty() {
                        warnings.push(format!(
                            "「{}」を特定できませんでした。0として記録します。",
                            field.label
                        ));
                    } else {
                        warnings.push(format!(
                            "「{}」を特定できませんでした（応答: {}）。0として記録します。",
                            field.label, result.raw
                        ));
                    }
                    apply_targeted_value(&mut statements, field.kind, 0);
                }
            }
        }
        warnings.push(
            "個別項目抽出の結果を既知のひな形に統合しました。他の項目は参照データに基づきます。"
                .to_string(),
        );

        Ok(finish(statements, found, warnings))
    }

    /// One targeted field: the raw response text alongside the parsed value.
    /// Anything recoverable parses to `None`; `Err` only for quota refusals,
    /// which the caller turns into the reference path.
    async fn extract_targeted_field(
        &self,
        document: &[u8],
        field: &TargetedField,
    ) -> Result<TargetedResult> {
        let config = GenerationConfig {
            temperature: 0.1,
            top_p: None,
            top_k: None,
            max_output_tokens: 256,
            response_mime_type: None,
            response_schema: None,
        };

        let response = self
            .provider
            .generate_with_document(
                &self.config.targeted_model,
                &targeted_field_prompt(field),
                document,
                &self.config.mime_type,
                &config,
            )
            .await;

        match response {
            Ok(text) => {
                let value = parse_targeted_response(&text);
                debug!("Targeted response for {}: {:?} -> {:?}", field.label, text, value);
                Ok(TargetedResult {
                    raw: text.trim().to_string(),
                    value,
                })
            }
            Err(e) if e.is_quota_or_rate_limit() => Err(e),
            Err(e) => {
                debug!("Targeted extraction of {} failed: {}", field.label, e);
                Ok(TargetedResult {
                    raw: String::new(),
                    value: None,
                })
            }
        }
    }
}

/// Raw extracted string plus its parsed value. Extraction of a field counts
/// as successful only when `value` is present.
#[derive(Debug, Clone)]
struct TargetedResult {
    raw: String,
    value: Option<i64>,
}

/// Targeted responses quote amounts with the statement unit suffix
/// ("7,020,870千円"). The model is already in thousand-yen units, so the
/// suffix is a unit marker, not a magnitude word; normalize it away before
/// parsing would scale it.
fn parse_targeted_response(text: &str) -> Option<i64> {
    let normalized = text.trim().replace("千円", "円");
    let value = parse_japanese_currency(&normalized)
        .or_else(|| extract_numbers(&normalized).first().copied())?;
    Some(value.round() as i64)
}

fn apply_targeted_value(statements: &mut FinancialStatements, kind: TargetedFieldKind, value: i64) {
    match kind {
        TargetedFieldKind::HospitalSegmentProfitLoss => {
            if let Some(segments) = statements.segments.as_mut() {
                if let Some(report) = segments.get_mut(HOSPITAL_SEGMENT) {
                    report.operating_profit_loss = value;
                }
            }
        }
        TargetedFieldKind::TotalLiabilities => {
            statements.balance_sheet.liabilities.total = value;
        }
        TargetedFieldKind::CurrentLiabilities => {
            statements.balance_sheet.liabilities.current.total = value;
        }
        TargetedFieldKind::OrdinaryExpenses => {
            statements.income_statement.expenses.total = value;
        }
    }
}

fn finish(
    statements: FinancialStatements,
    tables_found: u32,
    warnings: Vec<String>,
) -> ExtractedFinancialData {
    ExtractedFinancialData::new(statements, ExtractionMetadata::new(tables_found, warnings))
}

fn reference_warning() -> String {
    format!(
        "抽出に失敗したため、参照データセット（{} {}）を使用しています。",
        REFERENCE_ORGANIZATION, REFERENCE_FISCAL_YEAR
    )
}

fn quota_reference_fallback(mut warnings: Vec<String>) -> ExtractedFinancialData {
    warnings.push(
        "APIの利用制限により抽出を実行できませんでした。参照データセットを使用しています。"
            .to_string(),
    );
    warnings.push(reference_warning());
    finish(reference_statements(), 0, warnings)
}
