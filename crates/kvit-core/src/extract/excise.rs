//! Fuel excise detection.
//!
//! Fuel receipts get an extra excise record for the separate refund
//! claim. A receipt counts as fuel when a per-liter unit price marker
//! appears, or when both a liter quantity and an octane grade are found.
//! Finding nothing is not an error; most receipts are not fuel.

use regex::Regex;

use super::{Excise, Patch, Rule};
use crate::error::ExtractionError;

pub struct FuelExciseRule {
    /// Liter quantity, e.g. "35,4 L".
    quantity: Regex,
    /// Octane grade, e.g. "Futura 95".
    grade: Regex,
}

impl FuelExciseRule {
    pub fn new() -> Self {
        Self {
            quantity: Regex::new(r"([0-9]+[.,][0-9]{1,3})\s?L")
                .expect("hard-coded liter quantity pattern"),
            grade: Regex::new(r"\s?(95|98)(\s|$)").expect("hard-coded octane grade pattern"),
        }
    }

    fn detect(&self, lines: &[String]) -> Option<Excise> {
        let mut is_fuel = false;
        let mut quantity = String::new();
        let mut grade = String::new();

        for line in lines {
            if line.contains("EUR/L") {
                is_fuel = true;
            }
            if quantity.is_empty() {
                if let Some(caps) = self.quantity.captures(line) {
                    quantity = caps[1].replace(' ', "").replace(',', ".");
                }
            }
            if grade.is_empty() {
                if let Some(caps) = self.grade.captures(line) {
                    grade = caps[1].to_string();
                }
            }
        }

        // both fields present is as good as the unit-price marker
        if !quantity.is_empty() && !grade.is_empty() {
            is_fuel = true;
        }
        if !is_fuel {
            return None;
        }
        Some(Excise {
            kind: format!("Gasoline {grade}"),
            quantity,
        })
    }
}

impl Default for FuelExciseRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for FuelExciseRule {
    fn name(&self) -> &'static str {
        "fuel-excise"
    }

    fn find(&self, lines: &[String]) -> Result<Patch, ExtractionError> {
        Ok(Patch {
            excise: self.detect(lines),
            ..Patch::default()
        })
    }
}
