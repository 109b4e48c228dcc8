//! Tax and total extraction.
//!
//! Collects every currency-looking number on the receipt, in both the
//! two-decimal and three-decimal print formats, then probes for a pair
//! related by the standard 20% VAT rate. Amounts are handled as integer
//! minor units throughout.

use regex::Regex;
use tracing::debug;

use super::{Patch, Rule};
use crate::error::ExtractionError;

/// Currency symbols and unit markers stripped from line edges before
/// matching.
const EDGE_TRIM: &[char] = &['€', '*', 'E', 'U', 'R', ' ', 'e', 'u', 'r'];

pub struct CurrencyRule {
    /// dd+,dd or dd+.dd
    two_decimal: Regex,
    /// dd+,ddd as printed by fuel pumps and some registers
    three_decimal: Regex,
}

impl CurrencyRule {
    pub fn new() -> Self {
        Self {
            two_decimal: Regex::new(r"[0-9]+[,.]\s?[0-9]{2}")
                .expect("hard-coded two-decimal currency pattern"),
            three_decimal: Regex::new(r"[0-9]+,\s?[0-9]{3}")
                .expect("hard-coded three-decimal currency pattern"),
        }
    }

    /// All three-decimal amounts, truncated to two-decimal minor units.
    fn extract_three_decimal(&self, lines: &[String]) -> Vec<i64> {
        let mut out = Vec::new();
        for line in lines {
            let trimmed = line.trim_matches(EDGE_TRIM);
            for m in self.three_decimal.find_iter(trimmed) {
                let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
                if digits.len() < 2 {
                    continue;
                }
                // drop the last two digits of the three-decimal form
                if let Ok(v) = digits[..digits.len() - 2].parse::<i64>() {
                    out.push(v);
                }
            }
        }
        out
    }

    /// All two-decimal amounts as minor units.
    fn extract_two_decimal(&self, lines: &[String]) -> Vec<i64> {
        let mut out = Vec::new();
        for line in lines {
            let trimmed = line.trim_matches(EDGE_TRIM);
            for m in self.two_decimal.find_iter(trimmed) {
                let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
                if let Ok(v) = digits.parse::<i64>() {
                    out.push(v);
                }
            }
        }
        out
    }

    fn find_tax_total(&self, lines: &[String]) -> (i64, i64) {
        let mut amounts = self.extract_three_decimal(lines);
        amounts.extend(self.extract_two_decimal(lines));
        debug!(candidates = amounts.len(), "currency amounts collected");
        infer_tax_total(amounts)
    }
}

impl Default for CurrencyRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for CurrencyRule {
    fn name(&self) -> &'static str {
        "currency"
    }

    fn find(&self, lines: &[String]) -> Result<Patch, ExtractionError> {
        let (tax, total) = self.find_tax_total(lines);
        if tax == 0 && total == 0 {
            return Ok(Patch::miss("no tax/total found"));
        }
        Ok(Patch {
            total: Some(total),
            vat: Some(tax),
            ..Patch::default()
        })
    }
}

/// Probe descending amounts for a pair related by the 20% VAT rate.
///
/// Starting from the largest amount, each candidate total implies an
/// expected tax of `total - total/1.20`; the first amount within one
/// minor unit of that wins. The returned total snaps to the largest
/// amount on the receipt when it is within ten minor units, which
/// absorbs rounding lines printed above the grand total.
///
/// Only the 20% bracket is probed; 9% receipts need manual review.
fn infer_tax_total(mut amounts: Vec<i64>) -> (i64, i64) {
    amounts.sort_unstable_by(|a, b| b.cmp(a));

    let max_cost = amounts.first().copied().unwrap_or(0);
    for &total in &amounts {
        let expected_tax = total - (total as f64 / 1.20) as i64;
        for &tax in &amounts {
            if (expected_tax - 1..=expected_tax + 1).contains(&tax) {
                if (max_cost - total).abs() <= 10 {
                    return (tax, max_cost);
                }
                return (tax, total);
            }
        }
    }
    (0, 0)
}
