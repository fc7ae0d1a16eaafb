//! Prompt text for extraction and the four analysis stages.
//!
//! All prompts are Japanese, matching the statements' source language. Each
//! stage prompt instructs the model to produce only its own section, so the
//! orchestrator can assemble the sections under fixed headings.

use crate::statements::{ExtractedFinancialData, FinancialStatements};

pub fn structured_extraction_prompt() -> String {
    "この財務諸表PDFから貸借対照表、損益計算書、キャッシュフロー計算書、\
     セグメント情報を抽出し、指定されたJSONスキーマに従って出力してください。\n\
     \n\
     重要な指示：\n\
     1. 金額はすべて千円単位の整数で出力してください\n\
     2. △記号や▲記号で始まる値は負の値として出力してください\n\
     3. 各セクションの合計項目（資産合計、負債合計など）を必ず含めてください\n\
     4. 表に存在しない項目は出力に含めないでください\n\
     \n\
     JSONのみを出力してください。説明は不要です。"
        .to_string()
}

/// A single hard-to-locate field with its disambiguation instruction.
#[derive(Debug, Clone)]
pub struct TargetedField {
    pub kind: TargetedFieldKind,
    /// The exact statement label to extract.
    pub label: &'static str,
    /// Labels the model must not confuse it with.
    pub not_labels: &'static [&'static str],
    /// Where in the document the label lives.
    pub location_hint: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetedFieldKind {
    HospitalSegmentProfitLoss,
    TotalLiabilities,
    CurrentLiabilities,
    OrdinaryExpenses,
}

/// The fixed set of historically error-prone fields, extracted one by one
/// when whole-document structuring fails.
pub fn targeted_fields() -> Vec<TargetedField> {
    vec![
        TargetedField {
            kind: TargetedFieldKind::HospitalSegmentProfitLoss,
            label: "附属病院セグメントの業務損益",
            not_labels: &["学部・研究科等の業務損益", "附属学校の業務損益"],
            location_hint: "セグメント情報の表の「附属病院」の行",
        },
        TargetedField {
            kind: TargetedFieldKind::TotalLiabilities,
            label: "負債合計",
            not_labels: &["純資産合計", "資産合計", "流動負債合計"],
            location_hint: "貸借対照表の「負債の部」の最後",
        },
        TargetedField {
            kind: TargetedFieldKind::CurrentLiabilities,
            label: "流動負債合計",
            not_labels: &["固定負債合計", "負債合計", "純資産合計"],
            location_hint: "貸借対照表の「負債の部」の「流動負債」サブセクションの最後",
        },
        TargetedField {
            kind: TargetedFieldKind::OrdinaryExpenses,
            label: "経常費用合計",
            not_labels: &["経常収益合計", "経常利益", "経常損失"],
            location_hint: "損益計算書の「経常費用」セクションの最後",
        },
    ]
}

pub fn targeted_field_prompt(field: &TargetedField) -> String {
    format!(
        "このPDFファイルから「{label}」の値を正確に抽出してください。\n\
         \n\
         重要な指示：\n\
         1. {hint}を探してください\n\
         2. {not}ではなく、必ず「{label}」の値を抽出してください\n\
         3. 金額は千円単位です\n\
         4. 値が△記号で始まっている場合は、それは負の値を意味します\n\
         \n\
         回答は抽出した値のみを返してください。説明は不要です。",
        label = field.label,
        hint = field.location_hint,
        not = field
            .not_labels
            .iter()
            .map(|l| format!("「{}」", l))
            .collect::<Vec<_>>()
            .join("や"),
    )
}

pub fn safety_analysis_prompt(data: &ExtractedFinancialData) -> String {
    let bs = &data.statements.balance_sheet;
    format!(
        "あなたは財務健全性分析の専門家です。以下の財務データに基づき、健全性分析のみを実行してください。\n\
         \n\
         財務データ:\n\
         {json}\n\
         \n\
         以下の分析を実行し、結果のみを出力してください：\n\
         \n\
         ### 財務健全性分析\n\
         1. **負債比率**を計算し評価してください\n\
            - 負債合計: {liabilities}千円\n\
            - 純資産合計: {equity}千円\n\
         \n\
         2. **流動比率**を計算し評価してください\n\
            - 流動資産合計: {current_assets}千円\n\
            - 流動負債合計: {current_liabilities}千円\n\
         \n\
         専門的な評価と解釈を含めて、健全性分析の結果のみを出力してください。",
        json = statements_json(&data.statements),
        liabilities = bs.liabilities.total,
        equity = bs.equity.total,
        current_assets = bs.assets.current.total,
        current_liabilities = bs.liabilities.current.total,
    )
}

pub fn profitability_analysis_prompt(data: &ExtractedFinancialData) -> String {
    let segment_line = if data.statements.segments.is_some() {
        "- 附属病院セグメントの業務損益が経常損失の主因であることを明確に指摘してください"
    } else {
        "- セグメント情報が利用できません"
    };
    format!(
        "あなたは収益性分析の専門家です。以下の財務データに基づき、収益性分析のみを実行してください。\n\
         \n\
         財務データ:\n\
         {json}\n\
         \n\
         以下の分析を実行し、結果のみを出力してください：\n\
         \n\
         ### 収益性分析\n\
         1. **経常損失**の分析\n\
            - 経常損失: {ordinary}千円\n\
         \n\
         2. **セグメント分析**（必須）\n\
            {segment_line}\n\
         \n\
         収益性の課題と根本原因を含めて、収益性分析の結果のみを出力してください。",
        json = statements_json(&data.statements),
        ordinary = data.statements.ordinary_profit_loss(),
    )
}

pub fn cash_flow_analysis_prompt(data: &ExtractedFinancialData) -> String {
    let cf = &data.statements.cash_flow;
    format!(
        "あなたはキャッシュフロー分析の専門家です。以下の財務データに基づき、キャッシュフロー分析のみを実行してください。\n\
         \n\
         財務データ:\n\
         営業活動CF: {operating}千円\n\
         投資活動CF: {investing}千円\n\
         財務活動CF: {financing}千円\n\
         \n\
         **重要な指示:**\n\
         1. 必ず「キャッシュ・フロー分析」という見出しで開始してください\n\
         2. 3つのキャッシュフローの数値を具体的に引用してください\n\
         3. 「巨額の設備投資（投資CF）を、借入金（財務CF）で賄っている」という資金の流れを必ず解説してください\n\
         4. 投資活動CFがマイナス、財務活動CFがプラスであることの意味を説明してください\n\
         \n\
         キャッシュフロー分析の結果のみを出力してください。他の分析は含めないでください。",
        operating = cf.operating.total,
        investing = cf.investing.total,
        financing = cf.financing.total,
    )
}

pub fn risk_and_recommendation_prompt(
    safety: &str,
    profitability: &str,
    cash_flow: &str,
) -> String {
    format!(
        "あなたはリスク分析と改善提案の専門家です。以下の3つの分析結果に基づき、リスク分析と改善提案のみを実行してください。\n\
         \n\
         ### 前段の分析結果:\n\
         **健全性分析:**\n\
         {safety}\n\
         \n\
         **収益性分析:**\n\
         {profitability}\n\
         \n\
         **キャッシュフロー分析:**\n\
         {cash_flow}\n\
         \n\
         以下の分析を実行し、結果のみを出力してください：\n\
         \n\
         ### リスク分析と改善提案\n\
         1. **具体的な数値を伴うリスク**を3つ以上特定してください\n\
         2. **各リスクに対する具体的で実行可能な改善提案**を提示してください\n\
         \n\
         上記3つの分析結果に基づいた、実践的なリスク評価と改善提案のみを出力してください。",
    )
}

fn statements_json(statements: &FinancialStatements) -> String {
    serde_json::to_string_pretty(statements).unwrap_or_default()
}
