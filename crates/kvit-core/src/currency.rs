//! Integer minor-unit currency representation.
//!
//! All amounts in the pipeline are integers in minor units (cents) to
//! avoid floating-point rounding. The precision records how many decimal
//! digits the source receipt used so amounts can be rendered back.

use serde::{Deserialize, Serialize};

/// Number of decimal digits on the source receipt.
///
/// VAT regulations allow both two- and three-digit currency amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CurrencyPrecision {
    /// Currency of the form 23,33.
    Two,
    /// Currency of the form 23,333.
    Three,
}

impl Default for CurrencyPrecision {
    fn default() -> Self {
        Self::Two
    }
}

impl CurrencyPrecision {
    /// Decimal digits for this precision.
    pub fn digits(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

impl From<CurrencyPrecision> for u8 {
    fn from(p: CurrencyPrecision) -> u8 {
        p.digits() as u8
    }
}

impl TryFrom<u8> for CurrencyPrecision {
    type Error = String;

    fn try_from(v: u8) -> std::result::Result<Self, Self::Error> {
        match v {
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(format!("invalid currency precision: {other}")),
        }
    }
}

/// Render an integer minor-unit amount as a decimal string.
///
/// `format_minor_units(600, CurrencyPrecision::Two)` is `"6.00"`;
/// with three-digit precision the same amount renders as `"0.600"`.
pub fn format_minor_units(amount: i64, precision: CurrencyPrecision) -> String {
    let digits = precision.digits();
    let s = amount.to_string();
    if s.len() <= digits {
        format!("0.{s:0>width$}", width = digits)
    } else {
        let (int, frac) = s.split_at(s.len() - digits);
        format!("{int}.{frac}")
    }
}
