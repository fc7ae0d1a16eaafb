//! Japanese currency and numeric string handling.
//!
//! Financial documents in this domain mix full-width digits, comma separators,
//! currency symbols, magnitude words (億/万/千) and the triangle negative
//! markers (▲/△) used to denote losses. Everything here is pure and
//! deterministic.

/// Parses a Japanese-formatted currency string into a signed number.
///
/// Returns `None` when no parseable digits remain after normalization.
pub fn parse_japanese_currency(value: &str) -> Option<f64> {
    let mut normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '，' | '、' => ',',
            '－' | '−' => '-',
            _ => c,
        })
        .filter(|c| *c != '円' && *c != '¥')
        .collect();

    let is_negative =
        normalized.contains('-') || normalized.contains('▲') || normalized.contains('△');
    normalized.retain(|c| c != '-' && c != '▲' && c != '△');

    let mut multiplier = 1.0_f64;
    if normalized.contains('億') {
        multiplier *= 100_000_000.0;
        normalized.retain(|c| c != '億');
    }
    if normalized.contains('万') {
        multiplier *= 10_000.0;
        normalized.retain(|c| c != '万');
    }
    if normalized.contains('千') {
        multiplier *= 1_000.0;
        normalized.retain(|c| c != '千');
    }

    normalized.retain(|c| c != ',');

    let numeric: f64 = normalized.parse().ok()?;
    let mut result = numeric * multiplier;
    // Decimal magnitudes like 4.1億 pick up binary float error when scaled;
    // scaled amounts are whole yen, so round them.
    if multiplier != 1.0 {
        result = result.round();
    }

    Some(if is_negative { -result } else { result })
}

/// Formats a signed amount losslessly: comma-grouped digits, `▲` for
/// negatives, `円` suffix. `parse_japanese_currency` recovers the value.
pub fn format_japanese_currency(value: i64) -> String {
    let grouped = group_digits(value.unsigned_abs());
    if value < 0 {
        format!("▲{}円", grouped)
    } else {
        format!("{}円", grouped)
    }
}

/// Groups an unsigned magnitude into comma-separated thousands.
pub fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Extracts every parseable amount from a text fragment, largest magnitude
/// first, without duplicates.
pub fn extract_numbers(text: &str) -> Vec<f64> {
    let chars: Vec<char> = text.chars().collect();
    let mut numbers: Vec<f64> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let starts_number = is_amount_digit(chars[i])
            || (is_negative_marker(chars[i])
                && chars.get(i + 1).is_some_and(|c| is_amount_digit(*c)));

        if !starts_number {
            i += 1;
            continue;
        }

        let start = i;
        if is_negative_marker(chars[i]) {
            i += 1;
        }
        while i < chars.len() && is_amount_char(chars[i]) {
            i += 1;
        }

        let token: String = chars[start..i].iter().collect();
        if let Some(parsed) = parse_japanese_currency(&token) {
            if !numbers.contains(&parsed) {
                numbers.push(parsed);
            }
        }
    }

    numbers.sort_by(|a, b| b.abs().total_cmp(&a.abs()));
    numbers
}

/// Normalizes a statement item label for lookup (strips whitespace,
/// parentheses and colons).
pub fn normalize_financial_item_name(name: &str) -> String {
    name.chars()
        .filter(|c| {
            !c.is_whitespace() && !matches!(c, '（' | '）' | '(' | ')' | '：' | ':')
        })
        .collect()
}

fn is_negative_marker(c: char) -> bool {
    matches!(c, '-' | '－' | '−' | '▲' | '△')
}

fn is_amount_digit(c: char) -> bool {
    c.is_ascii_digit() || ('０'..='９').contains(&c)
}

fn is_amount_char(c: char) -> bool {
    is_amount_digit(c) || matches!(c, ',' | '，' | '億' | '万' | '千' | '円')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_grouped() {
        assert_eq!(parse_japanese_currency("27947258"), Some(27_947_258.0));
        assert_eq!(parse_japanese_currency("27,947,258"), Some(27_947_258.0));
        assert_eq!(parse_japanese_currency("27,947,258円"), Some(27_947_258.0));
    }

    #[test]
    fn test_parse_fullwidth_digits() {
        assert_eq!(parse_japanese_currency("１２３４５"), Some(12_345.0));
        assert_eq!(parse_japanese_currency("１，２３４"), Some(1_234.0));
    }

    #[test]
    fn test_parse_negative_markers_equivalent() {
        let minus = parse_japanese_currency("-410,984");
        let black_triangle = parse_japanese_currency("▲410,984");
        let white_triangle = parse_japanese_currency("△410,984");
        assert_eq!(minus, Some(-410_984.0));
        assert_eq!(black_triangle, minus);
        assert_eq!(white_triangle, minus);
    }

    #[test]
    fn test_parse_magnitude_words() {
        assert_eq!(parse_japanese_currency("3億"), Some(300_000_000.0));
        assert_eq!(parse_japanese_currency("5万"), Some(50_000.0));
        assert_eq!(parse_japanese_currency("7千円"), Some(7_000.0));
        assert_eq!(parse_japanese_currency("▲4.1億"), Some(-410_000_000.0));
        assert_eq!(parse_japanese_currency("1.5万"), Some(15_000.0));
    }

    #[test]
    fn test_parse_rejects_digitless_input() {
        assert_eq!(parse_japanese_currency(""), None);
        assert_eq!(parse_japanese_currency("合計"), None);
        assert_eq!(parse_japanese_currency("▲円"), None);
    }

    #[test]
    fn test_format_parse_round_trip() {
        for value in [
            0,
            1,
            -1,
            999,
            1_000,
            -654_006,
            71_892_602,
            -10_489_748,
            i64::from(i32::MAX),
        ] {
            let formatted = format_japanese_currency(value);
            assert_eq!(
                parse_japanese_currency(&formatted),
                Some(value as f64),
                "round trip failed for {} (formatted: {})",
                value,
                formatted
            );
        }
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1_000), "1,000");
        assert_eq!(group_digits(71_892_602), "71,892,602");
    }

    #[test]
    fn test_extract_numbers() {
        let text = "経常損失は▲654,006千円、負債合計は27,947,258千円でした。";
        let numbers = extract_numbers(text);
        assert!(numbers.contains(&27_947_258_000.0) || numbers.contains(&27_947_258.0));
        assert!(numbers.iter().any(|n| *n < 0.0));
        // Sorted by magnitude, descending.
        for pair in numbers.windows(2) {
            assert!(pair[0].abs() >= pair[1].abs());
        }
    }

    #[test]
    fn test_normalize_item_name() {
        assert_eq!(normalize_financial_item_name(" 負債合計 ："), "負債合計");
        assert_eq!(normalize_financial_item_name("経常利益（損失）"), "経常利益損失");
    }
}
