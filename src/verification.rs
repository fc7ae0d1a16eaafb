//! Automatic integrity verification of an extracted statement set.
//!
//! `perform_integrity_check` is a pure function: a fixed battery of five
//! arithmetic consistency checks, each compared against an absolute tolerance,
//! scored as the percentage of checks passed.

use crate::currency::group_digits;
use crate::error::{AnalyzerError, Result};
use crate::statements::ExtractedFinancialData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Verifier policy constants. These are policy choices, not derived values;
/// callers may override them but the defaults match the reference behavior.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Absolute tolerance per check, in thousands of yen.
    pub tolerance: i64,
    /// Minimum overall score (percent) for the data to count as valid.
    pub pass_threshold: f64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            tolerance: 1_000,
            pass_threshold: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityCheck {
    pub name: String,
    pub expected: i64,
    pub actual: i64,
    pub difference: i64,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    pub checks: Vec<IntegrityCheck>,
    #[serde(rename = "overallScore")]
    pub overall_score: f64,
    pub warnings: Vec<String>,
}

/// Runs the fixed battery of consistency checks. No I/O, no external calls;
/// calling twice on the same input yields identical results.
pub fn perform_integrity_check(
    data: &ExtractedFinancialData,
    config: &VerifierConfig,
) -> VerificationResult {
    let mut checks = Vec::with_capacity(5);
    let mut warnings = Vec::new();

    let bs = &data.statements.balance_sheet;
    let is_ = &data.statements.income_statement;
    let cf = &data.statements.cash_flow;

    // 1. 貸借対照表バランス: 資産合計 = 負債合計 + 純資産合計
    let check = make_check(
        "貸借対照表バランス",
        bs.assets.total,
        bs.liabilities.total + bs.equity.total,
        config.tolerance,
    );
    if !check.passed {
        warnings.push(format!(
            "貸借対照表のバランスが取れていません。差額: {}千円",
            group_digits(check.difference.unsigned_abs())
        ));
    }
    checks.push(check);

    // 2. 経常利益計算: 経常収益合計 - 経常費用合計 = 経常利益
    let check = make_check(
        "経常利益計算",
        is_.revenue.total - is_.expenses.total,
        data.statements.ordinary_profit_loss(),
        config.tolerance,
    );
    if !check.passed {
        warnings.push(format!(
            "経常利益の計算に誤差があります。差額: {}千円",
            group_digits(check.difference.unsigned_abs())
        ));
    }
    checks.push(check);

    // 3. 現金増減額計算: 営業CF + 投資CF + 財務CF = 現金及び現金同等物の増減額
    let check = make_check(
        "現金増減額計算",
        cf.operating.total + cf.investing.total + cf.financing.total,
        cf.net_change,
        config.tolerance,
    );
    if !check.passed {
        warnings.push(format!(
            "現金増減額の計算に誤差があります。差額: {}千円",
            group_digits(check.difference.unsigned_abs())
        ));
    }
    checks.push(check);

    // 4. 資産合計内訳計算: 流動資産合計 + 固定資産合計 = 資産合計
    let check = make_check(
        "資産合計内訳計算",
        bs.assets.current.total + bs.assets.fixed.total,
        bs.assets.total,
        config.tolerance,
    );
    if !check.passed {
        warnings.push(format!(
            "資産合計の内訳計算に誤差があります。差額: {}千円",
            group_digits(check.difference.unsigned_abs())
        ));
    }
    checks.push(check);

    // 5. 負債合計内訳計算: 流動負債合計 + 固定負債合計 = 負債合計
    let check = make_check(
        "負債合計内訳計算",
        bs.liabilities.current.total + bs.liabilities.fixed.total,
        bs.liabilities.total,
        config.tolerance,
    );
    if !check.passed {
        warnings.push(format!(
            "負債合計の内訳計算に誤差があります。差額: {}千円",
            group_digits(check.difference.unsigned_abs())
        ));
    }
    checks.push(check);

    let passed = checks.iter().filter(|c| c.passed).count();
    let overall_score = (passed as f64 / checks.len() as f64) * 100.0;
    let is_valid = overall_score >= config.pass_threshold;

    VerificationResult {
        is_valid,
        checks,
        overall_score,
        warnings,
    }
}

fn make_check(name: &str, expected: i64, actual: i64, tolerance: i64) -> IntegrityCheck {
    let difference = (expected - actual).abs();
    IntegrityCheck {
        name: name.to_string(),
        expected,
        actual,
        difference,
        passed: difference <= tolerance,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationStatus::Pending => write!(f, "pending"),
            VerificationStatus::Approved => write!(f, "approved"),
            VerificationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Extracted data with its verification attached. `verification_status` is the
/// only mutable state in the model; everything else is write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedFinancialData {
    #[serde(flatten)]
    pub data: ExtractedFinancialData,

    pub verification: VerificationResult,

    #[serde(rename = "verificationStatus")]
    pub verification_status: VerificationStatus,

    #[serde(rename = "verifiedAt", default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<DateTime<Utc>>,

    #[serde(rename = "verifiedBy", default, skip_serializing_if = "Option::is_none")]
    pub verified_by: Option<String>,
}

impl VerifiedFinancialData {
    /// Transitions `pending` → `approved`, stamping the approval time.
    ///
    /// The transition is write-once: a second approval attempt (or approval of
    /// a rejected record) fails instead of silently overwriting. A failed
    /// verification does not block approval; that call is the human's to make.
    pub fn approve(&mut self, approver: Option<&str>) -> Result<()> {
        if self.verification_status != VerificationStatus::Pending {
            return Err(AnalyzerError::AlreadyFinalized(
                self.verification_status.to_string(),
            ));
        }
        self.verification_status = VerificationStatus::Approved;
        self.verified_at = Some(Utc::now());
        self.verified_by = approver.map(str::to_string);
        Ok(())
    }

    /// Transitions `pending` → `rejected`.
    pub fn reject(&mut self, approver: Option<&str>) -> Result<()> {
        if self.verification_status != VerificationStatus::Pending {
            return Err(AnalyzerError::AlreadyFinalized(
                self.verification_status.to_string(),
            ));
        }
        self.verification_status = VerificationStatus::Rejected;
        self.verified_at = Some(Utc::now());
        self.verified_by = approver.map(str::to_string);
        Ok(())
    }
}

/// Merges a verification result into the extracted data, appending the
/// verifier's warnings to the extraction metadata and starting the record in
/// `pending` status. The verifier itself never mutates the data; this wrapper
/// step performs the merge.
pub fn attach_verification(
    mut data: ExtractedFinancialData,
    verification: VerificationResult,
) -> VerifiedFinancialData {
    data.extraction_metadata
        .warnings
        .extend(verification.warnings.iter().cloned());

    VerifiedFinancialData {
        data,
        verification,
        verification_status: VerificationStatus::Pending,
        verified_at: None,
        verified_by: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::reference_statements;
    use crate::statements::{ExtractionMetadata, ExtractedFinancialData};

    fn reference_data() -> ExtractedFinancialData {
        ExtractedFinancialData::new(reference_statements(), ExtractionMetadata::new(3, vec![]))
    }

    #[test]
    fn test_worked_example_four_of_five_checks_pass() {
        let data = reference_data();
        let result = perform_integrity_check(&data, &VerifierConfig::default());

        assert_eq!(result.checks.len(), 5);
        let passed = result.checks.iter().filter(|c| c.passed).count();
        assert_eq!(passed, 4);

        let cash_check = result
            .checks
            .iter()
            .find(|c| c.name == "現金増減額計算")
            .unwrap();
        assert!(!cash_check.passed);
        assert_eq!(cash_check.difference, 120_000);

        assert_eq!(result.overall_score, 80.0);
        // Boundary-inclusive: exactly at the threshold still counts as valid.
        assert!(result.is_valid);

        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("現金増減額"));
        assert!(result.warnings[0].contains("120,000"));
    }

    #[test]
    fn test_verifier_is_deterministic() {
        let data = reference_data();
        let config = VerifierConfig::default();
        let first = perform_integrity_check(&data, &config);
        let second = perform_integrity_check(&data, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn test_tolerance_boundary_inclusive() {
        let mut data = reference_data();
        let config = VerifierConfig::default();

        // Off by exactly the tolerance: passes.
        data.statements.balance_sheet.assets.total =
            data.statements.balance_sheet.liabilities.total
                + data.statements.balance_sheet.equity.total
                + config.tolerance;
        // Keep the asset breakdown in step so only the balance check moves.
        data.statements.balance_sheet.assets.fixed.total += config.tolerance;
        let result = perform_integrity_check(&data, &config);
        assert!(result.checks[0].passed);

        // One past the tolerance: fails.
        data.statements.balance_sheet.assets.total += 1;
        data.statements.balance_sheet.assets.fixed.total += 1;
        let result = perform_integrity_check(&data, &config);
        assert!(!result.checks[0].passed);
    }

    #[test]
    fn test_score_drops_twenty_points_per_failed_check() {
        let mut data = reference_data();
        let config = VerifierConfig::default();

        let baseline = perform_integrity_check(&data, &config);
        assert_eq!(baseline.overall_score, 80.0);
        assert!(baseline.is_valid);

        // Break the liability breakdown as well: 3/5 = 60, below threshold.
        data.statements.balance_sheet.liabilities.fixed.total += 5_000;
        data.statements.balance_sheet.liabilities.current.total -= 5_000;
        let mut changed = data.clone();
        changed.statements.balance_sheet.liabilities.fixed.total += 10_000;
        let degraded = perform_integrity_check(&changed, &config);

        assert_eq!(degraded.overall_score, baseline.overall_score - 20.0);
        assert!(!degraded.is_valid);
    }

    #[test]
    fn test_attach_verification_merges_warnings_and_starts_pending() {
        let data = reference_data();
        let verification = perform_integrity_check(&data, &VerifierConfig::default());
        let verified = attach_verification(data, verification);

        assert_eq!(verified.verification_status, VerificationStatus::Pending);
        assert!(verified.verified_at.is_none());
        assert!(verified
            .data
            .extraction_metadata
            .warnings
            .iter()
            .any(|w| w.contains("現金増減額")));
    }

    #[test]
    fn test_double_approval_fails() {
        let data = reference_data();
        let verification = perform_integrity_check(&data, &VerifierConfig::default());
        let mut verified = attach_verification(data, verification);

        verified.approve(Some("auditor")).unwrap();
        assert_eq!(verified.verification_status, VerificationStatus::Approved);
        assert!(verified.verified_at.is_some());
        assert_eq!(verified.verified_by.as_deref(), Some("auditor"));

        let second = verified.approve(Some("auditor"));
        assert!(matches!(second, Err(AnalyzerError::AlreadyFinalized(_))));
    }

    #[test]
    fn test_reject_is_terminal() {
        let data = reference_data();
        let verification = perform_integrity_check(&data, &VerifierConfig::default());
        let mut verified = attach_verification(data, verification);

        verified.reject(None).unwrap();
        assert!(verified.approve(None).is_err());
    }
}
