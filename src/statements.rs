//! Canonical financial statement schema.
//!
//! All monetary amounts are in thousands of yen (千円). Serde renames keep the
//! wire format identical to the original Japanese statement keys, so extracted
//! JSON documents deserialize directly into this model. The `JsonSchema`
//! derives let the structured-extraction path hand the provider an exact
//! response schema.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancialStatements {
    #[serde(rename = "貸借対照表")]
    pub balance_sheet: BalanceSheet,

    #[serde(rename = "損益計算書")]
    pub income_statement: IncomeStatement,

    #[serde(rename = "キャッシュフロー計算書")]
    pub cash_flow: CashFlowStatement,

    /// Segment name (e.g. a hospital division) to its segment report.
    #[serde(rename = "セグメント情報", default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<BTreeMap<String, SegmentReport>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BalanceSheet {
    #[serde(rename = "資産の部")]
    pub assets: AssetSection,

    #[serde(rename = "負債の部")]
    pub liabilities: LiabilitySection,

    #[serde(rename = "純資産の部")]
    pub equity: EquitySection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssetSection {
    #[serde(rename = "流動資産")]
    pub current: CurrentAssets,

    #[serde(rename = "固定資産")]
    pub fixed: FixedAssets,

    #[serde(rename = "資産合計")]
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CurrentAssets {
    #[serde(rename = "流動資産合計")]
    pub total: i64,

    /// Individual line items (現金及び預金, 有価証券, 未収金, ...).
    #[serde(flatten)]
    pub items: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FixedAssets {
    #[serde(rename = "固定資産合計")]
    pub total: i64,

    #[serde(flatten)]
    pub items: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LiabilitySection {
    #[serde(rename = "流動負債")]
    pub current: CurrentLiabilities,

    #[serde(rename = "固定負債")]
    pub fixed: FixedLiabilities,

    #[serde(rename = "負債合計")]
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CurrentLiabilities {
    #[serde(rename = "流動負債合計")]
    pub total: i64,

    #[serde(flatten)]
    pub items: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FixedLiabilities {
    #[serde(rename = "固定負債合計")]
    pub total: i64,

    #[serde(flatten)]
    pub items: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EquitySection {
    #[serde(rename = "純資産合計")]
    pub total: i64,

    #[serde(flatten)]
    pub items: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IncomeStatement {
    #[serde(rename = "経常収益")]
    pub revenue: RevenueSection,

    #[serde(rename = "経常費用")]
    pub expenses: ExpenseSection,

    /// Signed ordinary profit (negative for an ordinary loss).
    #[serde(rename = "経常利益")]
    pub ordinary_income: i64,

    /// Magnitude of the ordinary loss, present only when the period closed in
    /// deficit (mirrors how the statements themselves present it).
    #[serde(rename = "経常損失", default, skip_serializing_if = "Option::is_none")]
    pub ordinary_loss: Option<i64>,

    #[serde(rename = "当期純利益", default, skip_serializing_if = "Option::is_none")]
    pub net_income: Option<i64>,

    #[serde(rename = "当期純損失", default, skip_serializing_if = "Option::is_none")]
    pub net_loss: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RevenueSection {
    #[serde(rename = "経常収益合計")]
    pub total: i64,

    /// Individual revenue lines (附属病院収益, 運営費交付金収益, ...).
    #[serde(flatten)]
    pub items: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExpenseSection {
    #[serde(rename = "経常費用合計")]
    pub total: i64,

    #[serde(flatten)]
    pub items: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CashFlowStatement {
    #[serde(rename = "営業活動によるキャッシュフロー")]
    pub operating: OperatingCashFlow,

    #[serde(rename = "投資活動によるキャッシュフロー")]
    pub investing: InvestingCashFlow,

    #[serde(rename = "財務活動によるキャッシュフロー")]
    pub financing: FinancingCashFlow,

    #[serde(rename = "現金及び現金同等物の増減額")]
    pub net_change: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OperatingCashFlow {
    #[serde(rename = "営業活動によるキャッシュフロー合計")]
    pub total: i64,

    #[serde(flatten)]
    pub items: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InvestingCashFlow {
    #[serde(rename = "投資活動によるキャッシュフロー合計")]
    pub total: i64,

    #[serde(flatten)]
    pub items: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FinancingCashFlow {
    #[serde(rename = "財務活動によるキャッシュフロー合計")]
    pub total: i64,

    #[serde(flatten)]
    pub items: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentReport {
    /// Operating profit/loss of the segment (業務損益), signed.
    #[serde(rename = "業務損益")]
    pub operating_profit_loss: i64,

    #[serde(flatten)]
    pub items: BTreeMap<String, i64>,
}

impl FinancialStatements {
    /// Signed ordinary profit/loss, preferring the explicit loss line when the
    /// statements present one.
    pub fn ordinary_profit_loss(&self) -> i64 {
        match self.income_statement.ordinary_loss {
            Some(loss) => -loss.abs(),
            None => self.income_statement.ordinary_income,
        }
    }

    pub fn segment_operating_profit_loss(&self, segment: &str) -> Option<i64> {
        self.segments
            .as_ref()
            .and_then(|map| map.get(segment))
            .map(|report| report.operating_profit_loss)
    }
}

/// Derived scalar ratios. Always recomputed from the statements; ratios
/// supplied by an external source are discarded during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRatios {
    /// 負債比率 = 負債合計 ÷ 純資産合計 × 100
    #[serde(rename = "負債比率")]
    pub debt_ratio: f64,

    /// 流動比率 = 流動資産合計 ÷ 流動負債合計
    #[serde(rename = "流動比率")]
    pub current_ratio: f64,

    /// 固定比率 = 固定資産合計 ÷ 純資産合計
    #[serde(rename = "固定比率")]
    pub fixed_ratio: f64,

    /// 自己資本比率 = 純資産合計 ÷ 資産合計 × 100
    #[serde(rename = "自己資本比率")]
    pub equity_ratio: f64,
}

impl FinancialRatios {
    pub fn from_statements(statements: &FinancialStatements) -> Self {
        let bs = &statements.balance_sheet;
        Self {
            debt_ratio: ratio(bs.liabilities.total, bs.equity.total) * 100.0,
            current_ratio: ratio(bs.assets.current.total, bs.liabilities.current.total),
            fixed_ratio: ratio(bs.assets.fixed.total, bs.equity.total),
            equity_ratio: ratio(bs.equity.total, bs.assets.total) * 100.0,
        }
    }
}

fn ratio(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Extraction confidence tier, derived from the number of warnings collected
/// while extracting: none means high, fewer than three means medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn from_warning_count(count: usize) -> Self {
        match count {
            0 => ConfidenceTier::High,
            1..=2 => ConfidenceTier::Medium,
            _ => ConfidenceTier::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    #[serde(rename = "extractedAt")]
    pub extracted_at: DateTime<Utc>,

    #[serde(rename = "tablesFound")]
    pub tables_found: u32,

    pub confidence: ConfidenceTier,

    pub warnings: Vec<String>,
}

impl ExtractionMetadata {
    pub fn new(tables_found: u32, warnings: Vec<String>) -> Self {
        Self {
            extracted_at: Utc::now(),
            tables_found,
            confidence: ConfidenceTier::from_warning_count(warnings.len()),
            warnings,
        }
    }
}

/// The extractor's output: statements plus recomputed ratios and extraction
/// metadata. Write-once; the verifier never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFinancialData {
    pub statements: FinancialStatements,
    pub ratios: FinancialRatios,
    #[serde(rename = "extractionMetadata")]
    pub extraction_metadata: ExtractionMetadata,
}

impl ExtractedFinancialData {
    pub fn new(statements: FinancialStatements, metadata: ExtractionMetadata) -> Self {
        let ratios = FinancialRatios::from_statements(&statements);
        Self {
            statements,
            ratios,
            extraction_metadata: metadata,
        }
    }
}
