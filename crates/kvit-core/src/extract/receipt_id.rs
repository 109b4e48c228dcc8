//! Receipt/invoice number extraction.
//!
//! Tries an ordered list of label patterns: the Estonian receipt label
//! "kviitung", the invoice label "arve", hash-prefixed numbers, and a
//! lowercase `h` that the recognizer often produces for `#`. The
//! candidate-line superset already contains adjacent-pair joins, so a
//! label and its number split across two recognizer lines still match.

use regex::Regex;

use super::{Patch, Rule};
use crate::error::ExtractionError;

pub struct ReceiptIdRule {
    patterns: Vec<Regex>,
}

impl ReceiptIdRule {
    pub fn new() -> Self {
        let patterns = [
            r"kviitung[^0-9]+([0-9]*/?[0-9]*)",
            r"arve[^0-9]+([0-9]*)",
            r"#([0-9]*)",
            // for # that looks like h instead
            r"h([0-9]*)",
        ];
        Self {
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("hard-coded receipt id pattern"))
                .collect(),
        }
    }

    fn extract(&self, lines: &[String]) -> Option<String> {
        for regex in &self.patterns {
            for line in lines {
                if let Some(caps) = regex.captures(line) {
                    let id = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                    if !id.is_empty() {
                        return Some(id.to_string());
                    }
                }
            }
        }
        None
    }
}

impl Default for ReceiptIdRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for ReceiptIdRule {
    fn name(&self) -> &'static str {
        "receipt-id"
    }

    fn find(&self, lines: &[String]) -> Result<Patch, ExtractionError> {
        match self.extract(lines) {
            Some(id) => Ok(Patch {
                receipt_number: Some(id),
                ..Patch::default()
            }),
            None => Ok(Patch::miss("no receipt number found")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{candidate_lines, Fragment, RecognizedPage};
    use pretty_assertions::assert_eq;

    fn extract(input: &[&str]) -> Option<String> {
        let lines: Vec<String> = input.iter().map(|s| s.to_string()).collect();
        ReceiptIdRule::new().extract(&lines)
    }

    #[test]
    fn kviitung_label_with_slash_number() {
        assert_eq!(
            extract(&["kviitung: 45065/90212"]).as_deref(),
            Some("45065/90212")
        );
    }

    #[test]
    fn arve_label() {
        assert_eq!(extract(&["arve nr 12345"]).as_deref(), Some("12345"));
    }

    #[test]
    fn hash_and_misread_hash() {
        assert_eq!(extract(&["#998877"]).as_deref(), Some("998877"));
        assert_eq!(extract(&["h998877"]).as_deref(), Some("998877"));
    }

    #[test]
    fn label_and_number_on_adjacent_lines() {
        // the pair-join heuristic bridges the label and its number
        let page = RecognizedPage {
            text: "kv-arve\n086778".to_string(),
            fragments: Vec::new(),
        };
        let lines = candidate_lines(&page);
        assert_eq!(
            ReceiptIdRule::new().extract(&lines).as_deref(),
            Some("086778")
        );
    }

    #[test]
    fn wide_column_number_printed_slightly_above_its_label() {
        // the recognizer reports the number first because it sits a few
        // pixels higher; the wide-column join must still put it after
        // the label
        let page = RecognizedPage {
            text: String::new(),
            fragments: vec![
                Fragment::from_rect("kviitung:", 10, 105, 110, 120),
                Fragment::from_rect("45065", 400, 98, 450, 113),
            ],
        };
        let lines = candidate_lines(&page);
        assert_eq!(
            ReceiptIdRule::new().extract(&lines).as_deref(),
            Some("45065")
        );
    }

    #[test]
    fn empty_capture_does_not_match() {
        assert_eq!(extract(&["kviitung only", "h and no digits"]), None);
    }
}
