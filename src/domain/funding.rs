//! Funding sources
//!
//! A funding request carries either a card number or a bank account plus
//! routing number. Cards are checked with the Luhn mod-10 checksum, routing
//! numbers with the ABA weighted checksum. Network identification is
//! cosmetic and never gates validity beyond the Luhn check.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source of funds for a deposit, dispatched on the wire `type` field.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FundingSource {
    #[serde(rename_all = "camelCase")]
    Card { account_number: String },
    #[serde(rename_all = "camelCase")]
    Bank {
        account_number: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        routing_number: Option<String>,
    },
}

/// Which side of the funding dispatch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FundingKind {
    Card,
    Bank,
}

impl fmt::Display for FundingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FundingKind::Card => write!(f, "card"),
            FundingKind::Bank => write!(f, "bank"),
        }
    }
}

/// Validation failure for a funding source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} funding source: {reason}")]
pub struct FundingError {
    pub kind: FundingKind,
    pub reason: String,
}

impl FundingError {
    fn card(reason: &str) -> Self {
        Self {
            kind: FundingKind::Card,
            reason: reason.to_string(),
        }
    }

    fn bank(reason: &str) -> Self {
        Self {
            kind: FundingKind::Bank,
            reason: reason.to_string(),
        }
    }
}

impl FundingSource {
    pub fn kind(&self) -> FundingKind {
        match self {
            FundingSource::Card { .. } => FundingKind::Card,
            FundingSource::Bank { .. } => FundingKind::Bank,
        }
    }

    /// Validate the funding source. Total over both variants.
    pub fn validate(&self) -> Result<(), FundingError> {
        match self {
            FundingSource::Card { account_number } => {
                let digits = normalize_card_number(account_number);
                if digits.len() < 12 || digits.len() > 19 {
                    return Err(FundingError::card("card number must be 12-19 digits"));
                }
                if !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(FundingError::card("card number must contain only digits"));
                }
                if !luhn_checksum_valid(&digits) {
                    return Err(FundingError::card("card number failed checksum"));
                }
                Ok(())
            }
            FundingSource::Bank {
                account_number,
                routing_number,
            } => {
                if account_number.is_empty()
                    || !account_number.bytes().all(|b| b.is_ascii_digit())
                {
                    return Err(FundingError::bank("bank account number must be digits only"));
                }
                let routing = routing_number
                    .as_deref()
                    .ok_or_else(|| FundingError::bank("routing number is required"))?;
                if !routing_number_valid(routing) {
                    return Err(FundingError::bank("invalid routing number"));
                }
                Ok(())
            }
        }
    }
}

/// Strip spaces and hyphens from a card number as entered by a user.
pub fn normalize_card_number(input: &str) -> String {
    input.chars().filter(|c| *c != ' ' && *c != '-').collect()
}

/// Luhn mod-10: double every second digit from the rightmost, subtract 9
/// when the doubled digit exceeds 9, valid iff the digit sum is 0 mod 10.
fn luhn_checksum_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    let mut double = false;
    for b in digits.bytes().rev() {
        let mut d = u32::from(b - b'0');
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }
    sum % 10 == 0
}

/// ABA weighted checksum over exactly nine digits:
/// 3*(d1+d4+d7) + 7*(d2+d5+d8) + 1*(d3+d6+d9) == 0 (mod 10).
fn routing_number_valid(routing: &str) -> bool {
    let bytes = routing.as_bytes();
    if bytes.len() != 9 || !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }
    let d = |i: usize| u32::from(bytes[i] - b'0');
    let checksum = 3 * (d(0) + d(3) + d(6)) + 7 * (d(1) + d(4) + d(7)) + (d(2) + d(5) + d(8));
    checksum % 10 == 0
}

/// Card networks recognized for display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardNetwork {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Jcb,
    Diners,
    Maestro,
    Unionpay,
    Unknown,
}

impl fmt::Display for CardNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardNetwork::Visa => "visa",
            CardNetwork::Mastercard => "mastercard",
            CardNetwork::Amex => "amex",
            CardNetwork::Discover => "discover",
            CardNetwork::Jcb => "jcb",
            CardNetwork::Diners => "diners",
            CardNetwork::Maestro => "maestro",
            CardNetwork::Unionpay => "unionpay",
            CardNetwork::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// Identify the card network from prefix and length tables. Display only;
/// an unknown network is still accepted when the Luhn check passes.
pub fn card_network(card_number: &str) -> CardNetwork {
    let s = normalize_card_number(card_number);
    let len = s.len();
    if len < 12 || len > 19 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return CardNetwork::Unknown;
    }
    let prefix = |n: usize| -> u32 { s[..n.min(len)].parse().unwrap_or(0) };

    // Ordered checks, more specific prefixes first.
    if len == 15 && matches!(prefix(2), 34 | 37) {
        return CardNetwork::Amex;
    }
    if len == 14 && (matches!(prefix(3), 300..=305) || matches!(prefix(2), 36 | 38 | 39)) {
        return CardNetwork::Diners;
    }
    if prefix(4) == 6011
        || prefix(2) == 65
        || matches!(prefix(3), 644..=649)
        || matches!(prefix(6), 622_126..=622_925)
    {
        return CardNetwork::Discover;
    }
    if len == 16 && matches!(prefix(4), 3528..=3589) {
        return CardNetwork::Jcb;
    }
    if len == 16 && (matches!(prefix(2), 51..=55) || matches!(prefix(4), 2221..=2720)) {
        return CardNetwork::Mastercard;
    }
    if matches!(len, 13 | 16 | 19) && prefix(1) == 4 {
        return CardNetwork::Visa;
    }
    if matches!(prefix(4), 5018 | 5020 | 5038 | 6304 | 6759 | 6761 | 6762 | 6763)
        || matches!(prefix(2), 56 | 58)
    {
        return CardNetwork::Maestro;
    }
    if prefix(2) == 62 {
        return CardNetwork::Unionpay;
    }
    CardNetwork::Unknown
}
