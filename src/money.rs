// Currency mask and parser for Brazilian real amounts
// Keystrokes "12345" -> "R$ 123,45" masks, and back to a number

use crate::error::KitError;
use crate::masks::digits;
use crate::words;
use serde::{Deserialize, Serialize};
use std::fmt;

const CURRENCY_PREFIX: &str = "R$";

// ============================================================================
// AMOUNT
// ============================================================================

/// A non-negative monetary quantity stored as integer cents.
///
/// Serialized as a plain number of reais (`1234.5`), which is how document
/// snapshots and the history store carry values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_cents(cents: u64) -> Self {
        Amount(cents)
    }

    /// Round a float amount to the nearest cent.
    ///
    /// Negative, NaN and infinite values collapse to zero, mirroring how
    /// `parse_amount` degrades malformed input.
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() || value <= 0.0 {
            return Amount::ZERO;
        }
        Amount((value * 100.0).round() as u64)
    }

    /// Total value in cents
    pub fn cents(&self) -> u64 {
        self.0
    }

    /// Whole reais (integer part)
    pub fn reais(&self) -> u64 {
        self.0 / 100
    }

    /// Fractional part in cents (0-99)
    pub fn cents_part(&self) -> u64 {
        self.0 % 100
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Render as the input-field mask, e.g. `R$ 1.234,50`.
    ///
    /// Goes through `format_amount` on the cents digits, so
    /// `parse_amount(&a.to_masked())` always gives back `a`.
    pub fn to_masked(&self) -> String {
        format_amount(&self.0.to_string())
    }

    /// Written-out phrase, e.g. "um real e cinquenta centavos"
    pub fn to_words(&self) -> Result<String, KitError> {
        words::write_out(self.reais(), self.cents_part())
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Amount::from_f64(value)
    }
}

impl From<Amount> for f64 {
    fn from(amount: Amount) -> Self {
        amount.to_f64()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", CURRENCY_PREFIX, grouped_cents(self.0))
    }
}

// ============================================================================
// MASK
// ============================================================================

/// Currency mask applied on every keystroke.
///
/// Keeps only the digits, treats the last two as cents and re-inserts the
/// thousands separators. Total: empty or digit-free input yields `R$ 0,00`.
pub fn format_amount(raw: &str) -> String {
    let all_digits = digits(raw);
    let significant = all_digits.trim_start_matches('0');

    let mut numbers = if significant.is_empty() {
        "0".to_string()
    } else {
        significant.to_string()
    };

    // At least one integer digit plus two cents digits
    while numbers.len() < 3 {
        numbers.insert(0, '0');
    }

    let (reais, cents) = numbers.split_at(numbers.len() - 2);

    format!("{} {},{}", CURRENCY_PREFIX, group_thousands(reais), cents)
}

/// Extract the numeric amount from a masked string.
///
/// Never fails: anything without a leading number maps to `0.0`, which
/// callers cannot tell apart from a real zero. Negative results also map to
/// `0.0` since amounts are never negative.
pub fn parse_amount(masked: &str) -> f64 {
    if masked.is_empty() {
        return 0.0;
    }

    let clean = strip_currency_prefix(masked)
        .replace('.', "")
        .replacen(',', ".", 1);

    match leading_number(&clean) {
        Some(value) if value > 0.0 => value,
        _ => 0.0,
    }
}

/// pt-BR rendering with exactly two decimals: `1234.5` -> `1.234,50`
pub fn format_brl(value: f64) -> String {
    grouped_cents(Amount::from_f64(value).cents())
}

// ============================================================================
// HELPERS
// ============================================================================

fn grouped_cents(cents: u64) -> String {
    format!("{},{:02}", group_thousands(&(cents / 100).to_string()), cents % 100)
}

/// Insert `.` every three digits from the right, never before the first digit
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }

    out
}

/// Remove every `R$`, together with one whitespace character right after it
fn strip_currency_prefix(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find(CURRENCY_PREFIX) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + CURRENCY_PREFIX.len()..];

        let mut chars = rest.chars();
        if chars.next().is_some_and(char::is_whitespace) {
            rest = chars.as_str();
        }
    }

    out.push_str(rest);
    out
}

/// Read the longest decimal literal at the start of `s` (after leading
/// whitespace) and ignore whatever trails it: `"12.5abc"` -> `12.5`.
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let scan_digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }

    let int_end = scan_digits(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = scan_digits(end + 1);
        let frac_digits = frac_end - (end + 1);
        if mantissa_digits > 0 || frac_digits > 0 {
            mantissa_digits += frac_digits;
            end = frac_end;
        }
    }

    if mantissa_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_start = end + 1;
        if matches!(bytes.get(exp_start), Some(b'+') | Some(b'-')) {
            exp_start += 1;
        }
        let exp_end = scan_digits(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_well_formed(masked: &str) -> bool {
        let Some(body) = masked.strip_prefix("R$ ") else {
            return false;
        };
        let Some((reais, cents)) = body.split_once(',') else {
            return false;
        };
        let groups: Vec<&str> = reais.split('.').collect();
        cents.len() == 2
            && cents.chars().all(|c| c.is_ascii_digit())
            && !groups[0].is_empty()
            && groups[0].len() <= 3
            && groups[1..].iter().all(|g| g.len() == 3)
            && groups.iter().all(|g| g.chars().all(|c| c.is_ascii_digit()))
    }

    #[test]
    fn test_format_amount_basic() {
        assert_eq!(format_amount("123450"), "R$ 1.234,50");
        assert_eq!(format_amount("1"), "R$ 0,01");
        assert_eq!(format_amount("12"), "R$ 0,12");
        assert_eq!(format_amount("100"), "R$ 1,00");
        assert_eq!(format_amount("100000000"), "R$ 1.000.000,00");
    }

    #[test]
    fn test_format_amount_degrades_to_zero() {
        assert_eq!(format_amount(""), "R$ 0,00");
        assert_eq!(format_amount("abc"), "R$ 0,00");
        assert_eq!(format_amount("0000"), "R$ 0,00");
    }

    #[test]
    fn test_format_amount_keystrokes() {
        // Field already masked, user types another digit
        assert_eq!(format_amount("R$ 0,015"), "R$ 0,15");
        assert_eq!(format_amount("R$ 0,150"), "R$ 1,50");
        assert_eq!(format_amount("R$ 1.234,567"), "R$ 12.345,67");
        // Backspace
        assert_eq!(format_amount("R$ 12.345,6"), "R$ 1.234,56");
    }

    #[test]
    fn test_format_amount_is_idempotent() {
        for raw in ["", "7", "R$ 99", "12a34b56", "000123", "9876543210"] {
            let once = format_amount(raw);
            assert_eq!(format_amount(&once), once, "input {:?}", raw);
            assert!(is_well_formed(&once), "malformed: {}", once);
        }
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("R$ 1.234,50"), 1234.5);
        assert_eq!(parse_amount("R$ 0,01"), 0.01);
        assert_eq!(parse_amount("R$1.000,00"), 1000.0);
        assert_eq!(parse_amount("42"), 42.0);
    }

    #[test]
    fn test_parse_amount_never_fails() {
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("R$ "), 0.0);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount("R$ -5,00"), 0.0);
        // Trailing garbage after a number is ignored
        assert_eq!(parse_amount("12,5 reais"), 12.5);
        // Only the first comma becomes the decimal point
        assert_eq!(parse_amount("1,2,3"), 1.2);
    }

    #[test]
    fn test_round_trip_fixed_point() {
        for raw in ["1", "R$ 12.345,67", "x9y9z", "100000"] {
            let first = format_amount(&Amount::from_f64(parse_amount(&format_amount(raw))).cents().to_string());
            let second = format_amount(&Amount::from_f64(parse_amount(&first)).cents().to_string());
            assert_eq!(first, second);
            assert_eq!(first, format_amount(raw));
        }
    }

    #[test]
    fn test_amount_masked_round_trip() {
        for cents in [0u64, 1, 99, 100, 123456, 100_000_000, 987_654_321_01] {
            let amount = Amount::from_cents(cents);
            assert_eq!(Amount::from_f64(parse_amount(&amount.to_masked())), amount);
        }
    }

    #[test]
    fn test_amount_from_f64_rounds_to_cents() {
        assert_eq!(Amount::from_f64(1234.56).cents(), 123456);
        assert_eq!(Amount::from_f64(0.005).cents(), 1);
        assert_eq!(Amount::from_f64(-3.0), Amount::ZERO);
        assert_eq!(Amount::from_f64(f64::NAN), Amount::ZERO);
    }

    #[test]
    fn test_amount_display_and_brl() {
        assert_eq!(Amount::from_cents(123450).to_string(), "R$ 1.234,50");
        assert_eq!(format_brl(1234.5), "1.234,50");
        assert_eq!(format_brl(0.0), "0,00");
        assert_eq!(format_brl(1_000_000.0), "1.000.000,00");
    }

    #[test]
    fn test_amount_serde_as_reais() {
        let amount = Amount::from_cents(1050);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "10.5");
        let back: Amount = serde_json::from_str("10.5").unwrap();
        assert_eq!(back, amount);
    }
}
