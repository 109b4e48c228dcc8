//! Issue-date extraction.
//!
//! Receipts print day/month/year with any of `. , / -` or spaces as
//! separators, or nothing at all, and with 2- or 4-digit years. A
//! reversed year-first form also appears on card-terminal slips. The
//! result is normalized to DD/MM/YYYY; 2-digit years are expanded by
//! prefixing "20".

use regex::Regex;

use super::{Patch, Rule};
use crate::error::ExtractionError;

// The leading (^|[^0-9]) guard keeps the match from starting in the
// middle of a longer digit run such as a year or a price.
const DMY: &str =
    r"(?:^|[^0-9])(0[1-9]|[12][0-9]|3[01])\s?[.,/-]?\s?(0[1-9]|1[0-2])\s?[.,/-]?\s?(20[0-9]{2}|[0-9]{2})";
const YMD: &str =
    r"(?:^|[^0-9])(20[0-9]{2})\s?[.,/-]?\s?(0[1-9]|1[0-2])\s?[.,/-]?\s?(0[1-9]|[12][0-9]|3[01])";

pub struct DateRule {
    dmy: Regex,
    ymd: Regex,
}

impl DateRule {
    pub fn new() -> Self {
        Self {
            dmy: Regex::new(DMY).expect("hard-coded day-first date pattern"),
            ymd: Regex::new(YMD).expect("hard-coded year-first date pattern"),
        }
    }

    fn extract(&self, lines: &[String]) -> Option<String> {
        for line in lines {
            if let Some(caps) = self.dmy.captures(line) {
                return Some(normalize(&caps[1], &caps[2], &caps[3]));
            }
        }
        for line in lines {
            if let Some(caps) = self.ymd.captures(line) {
                return Some(normalize(&caps[3], &caps[2], &caps[1]));
            }
        }
        None
    }
}

impl Default for DateRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for DateRule {
    fn name(&self) -> &'static str {
        "date"
    }

    fn find(&self, lines: &[String]) -> Result<Patch, ExtractionError> {
        match self.extract(lines) {
            Some(date) => Ok(Patch {
                date: Some(date),
                ..Patch::default()
            }),
            None => Ok(Patch::miss("no date found")),
        }
    }
}

fn normalize(day: &str, month: &str, year: &str) -> String {
    if year.len() == 2 {
        format!("{day}/{month}/20{year}")
    } else {
        format!("{day}/{month}/{year}")
    }
}
