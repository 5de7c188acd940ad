//! Amount normalization
//!
//! Parses a decimal monetary input into an exact integer minor-unit (cent)
//! value. Monetary values are integer cents from this boundary onwards;
//! `rust_decimal` is used only when rendering cents back to a decimal at
//! the presentation edge.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Monetary value in minor units (cents).
pub type MinorUnits = i64;

/// Raw amount as it arrives on the wire: either a decimal string
/// (validated against the amount grammar) or a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

/// Errors that can occur when normalizing an amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("invalid amount format: {0:?}")]
    Malformed(String),

    #[error("amount must not be negative")]
    Negative,

    #[error("amount is not a finite number")]
    NotFinite,

    #[error("amount exceeds the representable range")]
    Overflow,
}

impl AmountInput {
    /// Normalize to integer minor units.
    ///
    /// Strings must match `(0 | [1-9][0-9]*) ("." [0-9]{1,2})?` and are
    /// parsed with integer arithmetic only. Numbers are converted once via
    /// `round(value * 100)`. Bounds (minimum / ceiling) are the caller's
    /// responsibility.
    pub fn normalize(&self) -> Result<MinorUnits, AmountError> {
        match self {
            AmountInput::Text(s) => parse_amount_str(s),
            AmountInput::Number(n) => parse_amount_number(*n),
        }
    }
}

fn parse_amount_str(s: &str) -> Result<MinorUnits, AmountError> {
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };

    // Integer part: "0" or a digit sequence not starting with 0.
    let valid_int = match int_part.as_bytes() {
        [] => false,
        [b'0'] => true,
        [b'0', ..] => false,
        digits => digits.iter().all(u8::is_ascii_digit),
    };
    if !valid_int {
        return Err(AmountError::Malformed(s.to_string()));
    }

    // Fraction part: 1 or 2 digits when present.
    let cents_frac: i64 = match frac_part {
        None => 0,
        Some(f) => {
            if f.is_empty() || f.len() > 2 || !f.bytes().all(|b| b.is_ascii_digit()) {
                return Err(AmountError::Malformed(s.to_string()));
            }
            let n: i64 = f.parse().map_err(|_| AmountError::Malformed(s.to_string()))?;
            if f.len() == 1 {
                n * 10
            } else {
                n
            }
        }
    };

    let whole: i64 = int_part
        .parse()
        .map_err(|_| AmountError::Overflow)?;
    whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(cents_frac))
        .ok_or(AmountError::Overflow)
}

fn parse_amount_number(n: f64) -> Result<MinorUnits, AmountError> {
    if !n.is_finite() {
        return Err(AmountError::NotFinite);
    }
    if n < 0.0 {
        return Err(AmountError::Negative);
    }
    let cents = (n * 100.0).round();
    if cents > i64::MAX as f64 {
        return Err(AmountError::Overflow);
    }
    Ok(cents as i64)
}

/// Render minor units as a two-decimal value for responses.
pub fn format_minor_units(cents: MinorUnits) -> Decimal {
    Decimal::new(cents, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Result<MinorUnits, AmountError> {
        AmountInput::Text(s.to_string()).normalize()
    }

    #[test]
    fn test_exact_cents() {
        assert_eq!(text("1.23").unwrap(), 123);
        assert_eq!(text("0").unwrap(), 0);
        assert_eq!(text("0.5").unwrap(), 50);
        assert_eq!(text("0.50").unwrap(), 50);
        assert_eq!(text("10.23").unwrap(), 1023);
        assert_eq!(text("1000000").unwrap(), 100_000_000);
    }

    #[test]
    fn test_leading_zeros_rejected() {
        assert!(matches!(text("01.00"), Err(AmountError::Malformed(_))));
        assert!(matches!(text("00"), Err(AmountError::Malformed(_))));
        assert!(matches!(text("00012"), Err(AmountError::Malformed(_))));
        assert!(matches!(text("012.34"), Err(AmountError::Malformed(_))));
    }

    #[test]
    fn test_fraction_limits() {
        assert!(matches!(text("1.234"), Err(AmountError::Malformed(_))));
        assert!(matches!(text("1."), Err(AmountError::Malformed(_))));
        assert_eq!(text("1.2").unwrap(), 120);
    }

    #[test]
    fn test_garbage_rejected() {
        for bad in ["-1.00", "abc", "", ".", "1.2.3", "+5", " 1", "1 ", "1e3"] {
            assert!(text(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_overflow() {
        assert!(matches!(
            text("99999999999999999999"),
            Err(AmountError::Overflow)
        ));
    }

    #[test]
    fn test_number_input() {
        assert_eq!(AmountInput::Number(4.56).normalize().unwrap(), 456);
        assert_eq!(AmountInput::Number(1.0).normalize().unwrap(), 100);
        assert_eq!(AmountInput::Number(0.1).normalize().unwrap(), 10);
        assert!(matches!(
            AmountInput::Number(-1.0).normalize(),
            Err(AmountError::Negative)
        ));
        assert!(matches!(
            AmountInput::Number(f64::NAN).normalize(),
            Err(AmountError::NotFinite)
        ));
        assert!(matches!(
            AmountInput::Number(f64::INFINITY).normalize(),
            Err(AmountError::NotFinite)
        ));
    }

    #[test]
    fn test_untagged_deserialization() {
        let n: AmountInput = serde_json::from_str("4.56").unwrap();
        assert_eq!(n.normalize().unwrap(), 456);

        let s: AmountInput = serde_json::from_str("\"1.23\"").unwrap();
        assert_eq!(s.normalize().unwrap(), 123);
    }

    #[test]
    fn test_format_minor_units() {
        assert_eq!(format_minor_units(123).to_string(), "1.23");
        assert_eq!(format_minor_units(579).to_string(), "5.79");
        assert_eq!(format_minor_units(0).to_string(), "0.00");
    }
}
