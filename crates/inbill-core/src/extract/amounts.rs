//! Amount token normalization for Hungarian, ISO, and US conventions.

use regex::Captures;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Raw amount captures before normalization.
///
/// The extractor resolves the variant from the capture shape: a pattern with
/// three capture groups yields `Grouped`, anything else `Single`. No runtime
/// type inspection happens downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedAmount {
    /// One token holding the whole amount, e.g. `61.976,50`.
    Single(String),
    /// Digits split across groups by whitespace or layout artifacts:
    /// integer part, then the fraction digits positionally.
    Grouped(String, String, String),
}

impl ExtractedAmount {
    /// Resolve pattern captures into the tagged form.
    ///
    /// A group that did not participate in the match contributes an empty
    /// string, which fails decimal parsing downstream instead of panicking.
    pub fn from_captures(caps: &Captures) -> Self {
        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str()).to_string();
        if caps.len() == 4 {
            ExtractedAmount::Grouped(group(1), group(2), group(3))
        } else if caps.len() >= 2 {
            ExtractedAmount::Single(group(1))
        } else {
            ExtractedAmount::Single(group(0))
        }
    }

    /// Canonical decimal string, e.g. `61976.50` or `2.99`.
    pub fn normalize(&self) -> String {
        match self {
            ExtractedAmount::Single(token) => normalize_token(token),
            ExtractedAmount::Grouped(integer, frac_a, frac_b) => {
                let integer: String = integer.chars().filter(char::is_ascii_digit).collect();
                format!("{}.{}{}", integer, frac_a, frac_b)
            }
        }
    }

    /// Parsed decimal value, if the captures form a valid number.
    pub fn to_decimal(&self) -> Option<Decimal> {
        Decimal::from_str(&self.normalize()).ok()
    }
}

/// Normalize a captured amount token to a canonical decimal string.
///
/// Spaces (including NBSP) and dots act as thousands separators. A comma is
/// the decimal separator only when followed by exactly two digits; the same
/// holds for a final dot, so `3 548.94` keeps its fraction while `61.976`
/// collapses to `61976`. The output re-parses to the same value.
pub fn normalize_token(raw: &str) -> String {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if let Some(pos) = compact.rfind(',') {
        let fraction = &compact[pos + 1..];
        if is_two_digit_fraction(fraction) {
            let integer: String = compact[..pos].chars().filter(char::is_ascii_digit).collect();
            return format!("{}.{}", integer, fraction);
        }
        // Comma as thousands separator (US style).
        let without_commas: String = compact.chars().filter(|c| *c != ',').collect();
        return resolve_dots(&without_commas);
    }

    resolve_dots(&compact)
}

fn resolve_dots(token: &str) -> String {
    if let Some(pos) = token.rfind('.') {
        let fraction = &token[pos + 1..];
        if is_two_digit_fraction(fraction) {
            let integer: String = token[..pos].chars().filter(char::is_ascii_digit).collect();
            return format!("{}.{}", integer, fraction);
        }
    }
    token.chars().filter(char::is_ascii_digit).collect()
}

fn is_two_digit_fraction(s: &str) -> bool {
    s.len() == 2 && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use regex::Regex;

    #[test]
    fn test_hungarian_dot_thousands_comma_decimal() {
        assert_eq!(normalize_token("61.976,50"), "61976.50");
        assert_eq!(normalize_token("1.234.567,89"), "1234567.89");
    }

    #[test]
    fn test_space_thousands() {
        assert_eq!(normalize_token("21 489"), "21489");
        assert_eq!(normalize_token("21\u{a0}489"), "21489");
        assert_eq!(normalize_token("21 489,50"), "21489.50");
    }

    #[test]
    fn test_space_thousands_with_dot_decimal() {
        assert_eq!(normalize_token("3 548.94"), "3548.94");
    }

    #[test]
    fn test_dot_thousands_without_fraction() {
        assert_eq!(normalize_token("61.976"), "61976");
    }

    #[test]
    fn test_us_comma_thousands() {
        assert_eq!(normalize_token("1,234.56"), "1234.56");
        assert_eq!(normalize_token("1,234"), "1234");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for raw in ["61.976,50", "21 489", "3 548.94", "1,234.56", "2.99"] {
            let first = normalize_token(raw);
            assert_eq!(normalize_token(&first), first, "input {raw:?}");
        }
    }

    #[test]
    fn test_grouped_concatenation() {
        let amount = ExtractedAmount::Grouped("2".to_string(), "9".to_string(), "9".to_string());
        assert_eq!(amount.normalize(), "2.99");
        assert_eq!(
            amount.to_decimal(),
            Some(Decimal::from_str("2.99").unwrap())
        );
    }

    #[test]
    fn test_grouped_integer_part_keeps_digits_only() {
        let amount = ExtractedAmount::Grouped(
            "21 489".to_string(),
            "5".to_string(),
            "0".to_string(),
        );
        assert_eq!(amount.normalize(), "21489.50");
    }

    #[test]
    fn test_from_captures_single() {
        let re = Regex::new(r"Összesen:\s*([\d.,]+)\s*Ft").unwrap();
        let caps = re.captures("Összesen: 61.976,50 Ft").unwrap();
        let amount = ExtractedAmount::from_captures(&caps);
        assert_eq!(amount, ExtractedAmount::Single("61.976,50".to_string()));
        assert_eq!(
            amount.to_decimal(),
            Some(Decimal::from_str("61976.50").unwrap())
        );
    }

    #[test]
    fn test_from_captures_grouped() {
        let re = Regex::new(r"(\d+)\s*,\s*(\d)\s*(\d)\s*EUR").unwrap();
        let caps = re.captures("2 , 9 9 EUR").unwrap();
        let amount = ExtractedAmount::from_captures(&caps);
        assert_eq!(
            amount,
            ExtractedAmount::Grouped("2".to_string(), "9".to_string(), "9".to_string())
        );
    }
}
