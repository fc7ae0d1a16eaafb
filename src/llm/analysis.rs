//! Four-stage chain-of-thought analysis of a verified statement set.
//!
//! Stages run strictly in order because each later stage's prompt is built
//! from the earlier outputs. A failed stage fails the whole run; no partial
//! report is ever returned.

use crate::citations::{CitationAnnotator, LiteralCitationAnnotator};
use crate::cleaning::clean_analysis_text;
use crate::error::Result;
use crate::llm::gateway::{GenerativeProvider, ModelGateway};
use crate::llm::prompts::{
    cash_flow_analysis_prompt, profitability_analysis_prompt, risk_and_recommendation_prompt,
    safety_analysis_prompt,
};
use crate::verification::VerifiedFinancialData;
use log::info;

pub const REPORT_TITLE: &str = "# 財務分析レポート";
pub const SECTION_SAFETY: &str = "## 財務健全性分析";
pub const SECTION_PROFITABILITY: &str = "## 収益性分析";
pub const SECTION_CASH_FLOW: &str = "## キャッシュ・フロー分析";
pub const SECTION_RISK: &str = "## リスク分析と改善提案";

pub struct AnalysisOrchestrator<P: GenerativeProvider, A: CitationAnnotator = LiteralCitationAnnotator>
{
    gateway: ModelGateway<P>,
    annotator: A,
}

impl<P: GenerativeProvider> AnalysisOrchestrator<P> {
    pub fn new(gateway: ModelGateway<P>) -> Self {
        Self {
            gateway,
            annotator: LiteralCitationAnnotator,
        }
    }
}

impl<P: GenerativeProvider, A: CitationAnnotator> AnalysisOrchestrator<P, A> {
    pub fn with_annotator(gateway: ModelGateway<P>, annotator: A) -> Self {
        Self { gateway, annotator }
    }

    /// Runs the full stage sequence and returns the assembled, annotated,
    /// cleaned report.
    pub async fn analyze(&self, verified: &VerifiedFinancialData) -> Result<String> {
        let data = &verified.data;

        info!("Analysis stage 1/4: safety");
        let safety = self.gateway.generate(&safety_analysis_prompt(data)).await?;

        info!("Analysis stage 2/4: profitability");
        let profitability = self
            .gateway
            .generate(&profitability_analysis_prompt(data))
            .await?;

        info!("Analysis stage 3/4: cash flow");
        let cash_flow = self
            .gateway
            .generate(&cash_flow_analysis_prompt(data))
            .await?;

        info!("Analysis stage 4/4: risk and recommendations");
        let risk = self
            .gateway
            .generate(&risk_and_recommendation_prompt(
                &safety,
                &profitability,
                &cash_flow,
            ))
            .await?;

        let assembled = assemble_report(&safety, &profitability, &cash_flow, &risk);
        let annotated = self.annotator.annotate(&assembled, &data.statements);
        Ok(clean_analysis_text(&annotated))
    }
}

fn assemble_report(safety: &str, profitability: &str, cash_flow: &str, risk: &str) -> String {
    format!(
        "{REPORT_TITLE}\n\n\
         {SECTION_SAFETY}\n{safety}\n\n\
         {SECTION_PROFITABILITY}\n{profitability}\n\n\
         {SECTION_CASH_FLOW}\n{cash_flow}\n\n\
         {SECTION_RISK}\n{risk}",
        safety = safety.trim(),
        profitability = profitability.trim(),
        cash_flow = cash_flow.trim(),
        risk = risk.trim(),
    )
}
