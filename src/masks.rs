// Tax-id (CPF/CNPJ) and phone masks
//
// Every mask is a pure function of the digit string: strip everything that is
// not an ASCII digit, then re-insert separators by position. The pattern is
// chosen from the digit count alone, so it can switch mid-entry.

use serde::{Deserialize, Serialize};

const CPF_MAX_DIGITS: usize = 11;
const CNPJ_MAX_DIGITS: usize = 14;
const LANDLINE_MAX_DIGITS: usize = 10;
const MOBILE_MAX_DIGITS: usize = 11;

/// The digit string carried by a masked value
pub fn digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Which tax-id grouping applies to an input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxIdKind {
    /// Individual: `000.000.000-00`
    Cpf,
    /// Organization: `00.000.000/0000-00`
    Cnpj,
}

impl TaxIdKind {
    pub fn detect(raw: &str) -> Self {
        if digits(raw).len() <= CPF_MAX_DIGITS {
            TaxIdKind::Cpf
        } else {
            TaxIdKind::Cnpj
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TaxIdKind::Cpf => "CPF",
            TaxIdKind::Cnpj => "CNPJ",
        }
    }
}

/// CPF mask up to 11 digits, CNPJ mask (truncated to 14 digits) beyond that
pub fn format_tax_id(raw: &str) -> String {
    let numbers = digits(raw);

    match TaxIdKind::detect(&numbers) {
        TaxIdKind::Cpf => {
            let mut out = String::with_capacity(14);
            for (i, ch) in numbers.chars().enumerate() {
                match i {
                    3 | 6 => out.push('.'),
                    9 => out.push('-'),
                    _ => {}
                }
                out.push(ch);
            }
            out
        }
        TaxIdKind::Cnpj => {
            let mut out = String::with_capacity(18);
            for (i, ch) in numbers.chars().take(CNPJ_MAX_DIGITS).enumerate() {
                match i {
                    2 | 5 => out.push('.'),
                    8 => out.push('/'),
                    12 => out.push('-'),
                    _ => {}
                }
                out.push(ch);
            }
            out
        }
    }
}

/// Landline `(00) 0000-0000` up to 10 digits, mobile `(00) 00000-0000`
/// (truncated to 11 digits) beyond that
pub fn format_phone(raw: &str) -> String {
    let numbers = digits(raw);

    // Area code brackets only appear once a third digit arrives
    if numbers.len() <= 2 {
        return numbers;
    }

    let (local_block, limit) = if numbers.len() <= LANDLINE_MAX_DIGITS {
        (4, LANDLINE_MAX_DIGITS)
    } else {
        (5, MOBILE_MAX_DIGITS)
    };

    let mut out = String::with_capacity(16);
    out.push('(');
    for (i, ch) in numbers.chars().take(limit).enumerate() {
        if i == 2 {
            out.push_str(") ");
        } else if i == 2 + local_block {
            out.push('-');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_ignores_everything_else() {
        assert_eq!(digits("(11) 98765-4321"), "11987654321");
        assert_eq!(digits("abc"), "");
        assert_eq!(digits("١٢٣"), ""); // non-ASCII digits do not count
    }

    #[test]
    fn test_cpf_incremental_entry() {
        let typed = "12345678901";
        let expected = [
            "1",
            "12",
            "123",
            "123.4",
            "123.45",
            "123.456",
            "123.456.7",
            "123.456.78",
            "123.456.789",
            "123.456.789-0",
            "123.456.789-01",
        ];
        for (n, want) in expected.iter().enumerate() {
            assert_eq!(format_tax_id(&typed[..=n]), *want);
        }
    }

    #[test]
    fn test_cnpj_switch_at_twelfth_digit() {
        assert_eq!(TaxIdKind::detect("12345678901"), TaxIdKind::Cpf);
        assert_eq!(TaxIdKind::detect("123456789012"), TaxIdKind::Cnpj);

        assert_eq!(format_tax_id("123456789012"), "12.345.678/9012");
        assert_eq!(format_tax_id("1234567890123"), "12.345.678/9012-3");
        assert_eq!(format_tax_id("12345678901234"), "12.345.678/9012-34");
        // Extra digits are dropped
        assert_eq!(format_tax_id("1234567890123456"), "12.345.678/9012-34");
        // Typing the 12th digit into an already masked CPF
        assert_eq!(format_tax_id("123.456.789-012"), "12.345.678/9012");
    }

    #[test]
    fn test_tax_id_idempotent() {
        for raw in ["", "1", "1234", "1234567890", "12345678901", "12345678901234"] {
            let once = format_tax_id(raw);
            assert_eq!(format_tax_id(&once), once);
        }
    }

    #[test]
    fn test_phone_landline() {
        assert_eq!(format_phone(""), "");
        assert_eq!(format_phone("11"), "11");
        assert_eq!(format_phone("113"), "(11) 3");
        assert_eq!(format_phone("113456"), "(11) 3456");
        assert_eq!(format_phone("1134567"), "(11) 3456-7");
        assert_eq!(format_phone("1134567890"), "(11) 3456-7890");
    }

    #[test]
    fn test_phone_switches_to_mobile_at_eleventh_digit() {
        assert_eq!(format_phone("11987654321"), "(11) 98765-4321");
        assert_eq!(format_phone("(11) 9876-54321"), "(11) 98765-4321");
        assert_eq!(format_phone("119876543210"), "(11) 98765-4321");
    }

    #[test]
    fn test_phone_idempotent() {
        for raw in ["1", "113", "1134567", "1134567890", "11987654321"] {
            let once = format_phone(raw);
            assert_eq!(format_phone(&once), once);
        }
    }
}
