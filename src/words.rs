// Number-to-words converter: amounts written out in Brazilian Portuguese
// 1234.56 -> "um mil e duzentos e trinta e quatro reais e cinquenta e seis centavos"
//
// The phrasing is kept exactly as documents have always printed it:
// "um mil" (not "mil") and "um milhão reais" (no "de").

use crate::error::KitError;

const UNITS: [&str; 10] = [
    "", "um", "dois", "três", "quatro", "cinco", "seis", "sete", "oito", "nove",
];

/// Ten to nineteen, indexed by the units digit
const TEENS: [&str; 10] = [
    "dez", "onze", "doze", "treze", "quatorze", "quinze", "dezesseis", "dezessete", "dezoito",
    "dezenove",
];

const TENS: [&str; 10] = [
    "", "", "vinte", "trinta", "quarenta", "cinquenta", "sessenta", "setenta", "oitenta",
    "noventa",
];

const HUNDREDS: [&str; 10] = [
    "",
    "cento",
    "duzentos",
    "trezentos",
    "quatrocentos",
    "quinhentos",
    "seiscentos",
    "setecentos",
    "oitocentos",
    "novecentos",
];

const THOUSAND: u64 = 1_000;
const MILLION: u64 = 1_000_000;

/// First whole value the millions table can no longer write
const LIMIT: u64 = 1_000_000_000;

const ZERO_PHRASE: &str = "zero reais";

/// Write out a float amount as a currency phrase.
///
/// Cents are `round((amount - floor(amount)) * 100)` on the float itself,
/// rounding halves up. A fraction like `.999` therefore becomes
/// "cem centavos" rather than carrying into the reais.
///
/// # Errors
/// Negative, NaN/infinite amounts and amounts of a billion reais or more.
pub fn amount_to_words(amount: f64) -> Result<String, KitError> {
    if !amount.is_finite() {
        return Err(KitError::NotFinite);
    }
    if amount < 0.0 {
        return Err(KitError::NegativeAmount(amount));
    }

    let whole = amount.floor();
    if whole >= LIMIT as f64 {
        return Err(KitError::AmountTooLarge(amount));
    }

    let cents = ((amount - whole) * 100.0).round() as u64;
    write_out(whole as u64, cents)
}

/// Write out `whole` reais and `cents` centavos.
///
/// `cents` is normally 0-99; 100 only comes out of float rounding in
/// `amount_to_words`. Anything above 100 is rejected.
pub fn write_out(whole: u64, cents: u64) -> Result<String, KitError> {
    if whole >= LIMIT {
        return Err(KitError::AmountTooLarge(whole as f64));
    }
    if cents > 100 {
        return Err(KitError::CentsOutOfRange(cents));
    }
    if whole == 0 && cents == 0 {
        return Ok(ZERO_PHRASE.to_string());
    }

    let mut phrase = String::new();

    if whole >= MILLION {
        let millions = whole / MILLION;
        phrase.push_str(&extenso999(millions as u32));
        phrase.push_str(if millions == 1 { " milhão" } else { " milhões" });
    }

    let rest = whole % MILLION;
    if rest >= THOUSAND {
        if !phrase.is_empty() {
            phrase.push_str(", ");
        }
        phrase.push_str(&extenso999((rest / THOUSAND) as u32));
        phrase.push_str(" mil");
    }

    let units = rest % THOUSAND;
    if units > 0 {
        if !phrase.is_empty() {
            phrase.push_str(" e ");
        }
        phrase.push_str(&extenso999(units as u32));
    }

    if whole == 1 {
        phrase.push_str(" real");
    } else if whole > 0 {
        phrase.push_str(" reais");
    }

    if cents > 0 {
        if !phrase.is_empty() {
            phrase.push_str(" e ");
        }
        phrase.push_str(&extenso999(cents as u32));
        phrase.push_str(if cents == 1 { " centavo" } else { " centavos" });
    }

    if phrase.is_empty() {
        return Ok(ZERO_PHRASE.to_string());
    }

    Ok(phrase)
}

/// Words for 0-999. Zero is the empty string; exactly 100 is "cem".
///
/// # Panics
/// If `n` is 1000 or more.
pub fn extenso999(n: u32) -> String {
    assert!(n < 1000, "extenso999 only covers 0-999, got {}", n);

    if n == 0 {
        return String::new();
    }
    if n == 100 {
        return "cem".to_string();
    }

    let hundreds = (n / 100) as usize;
    let tens = ((n % 100) / 10) as usize;
    let units = (n % 10) as usize;

    let mut parts: Vec<&str> = Vec::with_capacity(3);

    if hundreds > 0 {
        parts.push(HUNDREDS[hundreds]);
    }

    if tens == 1 {
        parts.push(TEENS[units]);
    } else {
        if tens > 0 {
            parts.push(TENS[tens]);
        }
        if units > 0 {
            parts.push(UNITS[units]);
        }
    }

    parts.join(" e ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(amount: f64) -> String {
        amount_to_words(amount).unwrap()
    }

    #[test]
    fn test_zero_and_one() {
        assert_eq!(words(0.0), "zero reais");
        assert_eq!(words(1.0), "um real");
        assert_eq!(words(2.0), "dois reais");
    }

    #[test]
    fn test_extenso999_tables() {
        assert_eq!(extenso999(0), "");
        assert_eq!(extenso999(7), "sete");
        assert_eq!(extenso999(10), "dez");
        assert_eq!(extenso999(19), "dezenove");
        assert_eq!(extenso999(21), "vinte e um");
        assert_eq!(extenso999(100), "cem");
        assert_eq!(extenso999(101), "cento e um");
        assert_eq!(extenso999(110), "cento e dez");
        assert_eq!(extenso999(115), "cento e quinze");
        assert_eq!(extenso999(300), "trezentos");
        assert_eq!(extenso999(999), "novecentos e noventa e nove");
    }

    #[test]
    fn test_hundred_uses_irregular_word() {
        assert_eq!(words(100.0), "cem reais");
        assert_eq!(words(115.0), "cento e quinze reais");
    }

    #[test]
    fn test_thousands_keep_um_mil() {
        assert_eq!(words(1000.0), "um mil reais");
        assert_eq!(words(1234.56), "um mil e duzentos e trinta e quatro reais e cinquenta e seis centavos");
        assert_eq!(words(15_000.0), "quinze mil reais");
        assert_eq!(words(100_100.0), "cem mil e cem reais");
    }

    #[test]
    fn test_millions_literal_concatenation() {
        assert_eq!(words(1_000_000.0), "um milhão reais");
        assert_eq!(words(2_500_000.0), "dois milhões, quinhentos mil reais");
        assert_eq!(words(1_001_000.0), "um milhão, um mil reais");
        assert_eq!(words(1_000_001.0), "um milhão e um reais");
        assert_eq!(
            words(999_999_999.0),
            "novecentos e noventa e nove milhões, novecentos e noventa e nove mil e novecentos e noventa e nove reais"
        );
    }

    #[test]
    fn test_cents_only() {
        assert_eq!(words(0.01), "um centavo");
        assert_eq!(words(0.5), "cinquenta centavos");
        assert_eq!(words(1.01), "um real e um centavo");
        // Below half a cent rounds away to nothing
        assert_eq!(words(0.001), "zero reais");
    }

    #[test]
    fn test_cents_rounding_quirk_preserved() {
        assert_eq!(words(1.999), "um real e cem centavos");
        assert_eq!(words(0.125), "treze centavos");
    }

    #[test]
    fn test_out_of_domain_inputs() {
        assert_eq!(amount_to_words(-1.0), Err(KitError::NegativeAmount(-1.0)));
        assert_eq!(amount_to_words(f64::NAN), Err(KitError::NotFinite));
        assert_eq!(amount_to_words(f64::INFINITY), Err(KitError::NotFinite));
        assert!(matches!(amount_to_words(1_000_000_000.0), Err(KitError::AmountTooLarge(_))));
        assert!(write_out(LIMIT, 0).is_err());
    }

    #[test]
    fn test_write_out_from_integer_parts() {
        assert_eq!(write_out(0, 0).unwrap(), "zero reais");
        assert_eq!(write_out(1, 50).unwrap(), "um real e cinquenta centavos");
        assert_eq!(write_out(0, 99).unwrap(), "noventa e nove centavos");
        assert_eq!(write_out(2, 100).unwrap(), "dois reais e cem centavos");
    }

    #[test]
    fn test_write_out_rejects_cents_above_one_hundred() {
        assert_eq!(write_out(5, 250), Err(KitError::CentsOutOfRange(250)));
        assert_eq!(write_out(0, 1000), Err(KitError::CentsOutOfRange(1000)));
        assert_eq!(write_out(0, u64::MAX), Err(KitError::CentsOutOfRange(u64::MAX)));
    }
}
