//! Citation injection for generated analysis text.
//!
//! Every numeric claim in analysis prose is tied back to its source field by
//! appending a `[引用: data.x]` marker after the literal amount. Injection is
//! pure text substitution over the values actually present in the extracted
//! statements, so a claim that does not match a known field is left alone.

use crate::currency::group_digits;
use crate::statements::FinancialStatements;

/// Seam for the annotation strategy. The literal annotator below is the only
/// implementation in this crate; tests substitute their own.
pub trait CitationAnnotator {
    /// Annotates `text` with citation markers derived from `statements`.
    fn annotate(&self, text: &str, statements: &FinancialStatements) -> String;
}

/// Annotates by literal substring substitution of each known amount.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralCitationAnnotator;

impl CitationAnnotator for LiteralCitationAnnotator {
    fn annotate(&self, text: &str, statements: &FinancialStatements) -> String {
        inject_citations(text, statements)
    }
}

/// Appends `[引用: tag]` markers after every amount in `text` that matches a
/// field of `statements`. Idempotent: amounts already carrying a marker are
/// skipped, so re-annotating annotated text is a no-op.
pub fn inject_citations(text: &str, statements: &FinancialStatements) -> String {
    let mut out = text.to_string();

    // Longer literals first, so a grouped amount is claimed before any of its
    // digit substrings can be.
    let mut substitutions: Vec<(String, String)> = Vec::new();
    for (value, tag) in citation_fields(statements) {
        for pattern in value_patterns(value) {
            substitutions.push((pattern, tag.clone()));
        }
    }
    substitutions.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));

    for (pattern, tag) in &substitutions {
        out = annotate_pattern(&out, pattern, tag);
    }
    out
}

/// The (value, tag) pairs eligible for citation.
fn citation_fields(statements: &FinancialStatements) -> Vec<(i64, String)> {
    let bs = &statements.balance_sheet;
    let is_ = &statements.income_statement;
    let cf = &statements.cash_flow;

    let mut fields = vec![
        (bs.assets.total, "data.totalAssets".to_string()),
        (bs.assets.current.total, "data.currentAssets".to_string()),
        (bs.assets.fixed.total, "data.fixedAssets".to_string()),
        (bs.liabilities.total, "data.totalLiabilities".to_string()),
        (
            bs.liabilities.current.total,
            "data.currentLiabilities".to_string(),
        ),
        (
            bs.liabilities.fixed.total,
            "data.fixedLiabilities".to_string(),
        ),
        (bs.equity.total, "data.netAssets".to_string()),
        (is_.revenue.total, "data.ordinaryRevenue".to_string()),
        (is_.expenses.total, "data.ordinaryExpenses".to_string()),
        (
            statements.ordinary_profit_loss(),
            "data.ordinaryLoss".to_string(),
        ),
        (cf.operating.total, "data.operatingCashFlow".to_string()),
        (cf.investing.total, "data.investingCashFlow".to_string()),
        (cf.financing.total, "data.financingCashFlow".to_string()),
        (cf.net_change, "data.netCashChange".to_string()),
    ];

    if let Some(segments) = &statements.segments {
        for (name, report) in segments {
            fields.push((
                report.operating_profit_loss,
                format!("data.segments.{}.operatingProfitLoss", name),
            ));
        }
    }

    // Zero appears everywhere in prose; never cite it.
    fields.retain(|(value, _)| *value != 0);
    fields
}

/// Literal renderings of a value as it may appear in prose. Negatives appear
/// with any of the three loss markers, and losses are also quoted by bare
/// magnitude ("経常損失は654,006千円").
fn value_patterns(value: i64) -> Vec<String> {
    let grouped = group_digits(value.unsigned_abs());
    let plain = value.unsigned_abs().to_string();

    let mut patterns = Vec::new();
    if value < 0 {
        for marker in ["▲", "△", "-"] {
            patterns.push(format!("{}{}", marker, grouped));
            if plain != grouped {
                patterns.push(format!("{}{}", marker, plain));
            }
        }
    }
    patterns.push(grouped.clone());
    if plain != grouped {
        patterns.push(plain);
    }
    patterns
}

fn annotate_pattern(text: &str, pattern: &str, tag: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let needle: Vec<char> = pattern.chars().collect();
    if needle.is_empty() || chars.len() < needle.len() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if i + needle.len() <= chars.len()
            && chars[i..i + needle.len()] == needle[..]
            && boundary_before(&chars, i)
            && boundary_after(&chars, i + needle.len())
            && !already_cited(&chars, i + needle.len())
        {
            out.extend(&chars[i..i + needle.len()]);
            out.push_str(" [引用: ");
            out.push_str(tag);
            out.push(']');
            i += needle.len();
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

/// The match must not start mid-number.
fn boundary_before(chars: &[char], start: usize) -> bool {
    match start.checked_sub(1).and_then(|p| chars.get(p)) {
        Some(prev) => !prev.is_ascii_digit() && *prev != ',',
        None => true,
    }
}

/// The match must not end mid-number (including before a `,ddd` or `.d`
/// continuation).
fn boundary_after(chars: &[char], end: usize) -> bool {
    match chars.get(end) {
        Some(next) if next.is_ascii_digit() => false,
        Some(',') | Some('.') => !chars.get(end + 1).is_some_and(|c| c.is_ascii_digit()),
        _ => true,
    }
}

/// Detects an existing marker after the match (allowing whitespace in between).
fn already_cited(chars: &[char], mut pos: usize) -> bool {
    while chars.get(pos).is_some_and(|c| c.is_whitespace()) {
        pos += 1;
    }
    chars.get(pos) == Some(&'[') && chars.get(pos + 1) == Some(&'引') && chars.get(pos + 2) == Some(&'用')
}
