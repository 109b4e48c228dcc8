//! Vendor name extraction.
//!
//! Estonian legal-entity markers (AS, TÜ, UÜ, OÜ) appear either after or
//! before the company name. The alternations include forms the
//! recognizer commonly mangles: the digit 0 for the letter O, and Ù for
//! Ü; a fix-up pass corrects those afterwards.

use regex::Regex;

use super::{Patch, Rule};
use crate::error::ExtractionError;

pub struct VendorRule {
    /// Company form at the end of the name.
    suffix: Regex,
    /// Company form at the front of the name.
    prefix: Regex,
}

impl VendorRule {
    pub fn new() -> Self {
        Self {
            suffix: Regex::new(
                r"[^/,]+\s(AS|TÜ|UÜ|OÜ|As|Tü|Uü|Oü|OU|Ou|TU|Tu|UU|Uu|0Ü|0u|0U|0ü)",
            )
            .expect("hard-coded vendor suffix pattern"),
            prefix: Regex::new(
                r"(AS|TÜ|UÜ|OÜ|OÙ|As|Tü|Uü|Oü|OU|Ou|TU|Tu|UU|Uu|0Ü|0u|0U|0ü)\s[^/,]+$",
            )
            .expect("hard-coded vendor prefix pattern"),
        }
    }

    fn extract(&self, lines: &[String]) -> Option<String> {
        for regex in [&self.suffix, &self.prefix] {
            for line in lines {
                if let Some(found) = regex.find(line) {
                    if !found.as_str().is_empty() {
                        return Some(final_fixes(found.as_str()));
                    }
                }
            }
        }
        None
    }
}

impl Default for VendorRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for VendorRule {
    fn name(&self) -> &'static str {
        "vendor"
    }

    fn find(&self, lines: &[String]) -> Result<Patch, ExtractionError> {
        match self.extract(lines) {
            Some(vendor) => Ok(Patch {
                vendor: Some(vendor),
                ..Patch::default()
            }),
            None => Ok(Patch::miss("no vendor found")),
        }
    }
}

/// Fix recognizer confusions like O read as 0 and Ü read as Ù.
fn final_fixes(s: &str) -> String {
    s.replace('Ù', "U").replace('0', "O")
}
