//! Rule-based fiscal field extraction.
//!
//! The extractor owns a fixed, ordered set of rules. Each rule scans the
//! full candidate-line superset and returns a [`Patch`] of the fields it
//! found; the engine merges patches in rule order and never lets a later
//! rule discard an earlier rule's success. A rule that finds nothing is
//! not a failure: it records a human-readable message that ends up in
//! the receipt's review list.

mod currency;
mod date;
mod excise;
mod receipt_id;
mod vendor;

pub use currency::CurrencyRule;
pub use date::DateRule;
pub use excise::FuelExciseRule;
pub use receipt_id::ReceiptIdRule;
pub use vendor::VendorRule;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::currency::CurrencyPrecision;
use crate::error::ExtractionError;
use crate::ocr::{Crop, Orientation, RecognizedPage, bounding_crop, candidate_lines};

/// Version tag recorded with each receipt to denote which revision of
/// the extraction rules produced it. Receipts processed under an older
/// tag are candidates for reprocessing. Format is YYYYMMDD, with an
/// optional suffix for multiple revisions on the same day.
pub const RULES_VERSION: &str = "20201206";

/// Excise sub-record for fuel receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Excise {
    /// Fuel description, e.g. "Gasoline 95".
    pub kind: String,
    /// Liter quantity as printed, normalized to a dot decimal.
    pub quantity: String,
}

/// Partial extraction produced by a single rule.
///
/// `None` means "this rule does not speak to that field"; soft failures
/// go into `errors` and never abort the pipeline.
#[derive(Debug, Default)]
pub struct Patch {
    pub vendor: Option<String>,
    pub date: Option<String>,
    pub receipt_number: Option<String>,
    pub total: Option<i64>,
    pub vat: Option<i64>,
    pub precision: Option<CurrencyPrecision>,
    pub excise: Option<Excise>,
    pub errors: Vec<String>,
}

impl Patch {
    /// A patch that found nothing, carrying one soft-failure message.
    pub fn miss(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
            ..Self::default()
        }
    }
}

/// A field-extraction rule over the candidate-line superset.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Scan the lines and report what was found. `Err` is reserved for
    /// exceptional conditions, never for "no match".
    fn find(&self, lines: &[String]) -> Result<Patch, ExtractionError>;
}

/// Structured result of extracting one receipt.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Candidate lines the rules operated on.
    pub lines: Vec<String>,
    pub orientation: Orientation,
    pub crop: Crop,
    /// Issue date normalized to DD/MM/YYYY, empty when not found.
    pub date: String,
    /// Total amount in integer minor units.
    pub total: i64,
    /// VAT amount in integer minor units.
    pub vat: i64,
    pub vendor: String,
    pub tax_id: String,
    pub receipt_number: String,
    pub precision: CurrencyPrecision,
    pub excise: Option<Excise>,
    /// Non-fatal extraction failures, surfaced for post-hoc review.
    pub errors: Vec<String>,
    pub rules_version: &'static str,
}

impl Default for Extraction {
    fn default() -> Self {
        Self::new(Vec::new(), Orientation::Unknown, Crop::default())
    }
}

impl Extraction {
    fn new(lines: Vec<String>, orientation: Orientation, crop: Crop) -> Self {
        Self {
            lines,
            orientation,
            crop,
            date: String::new(),
            total: 0,
            vat: 0,
            vendor: String::new(),
            tax_id: String::new(),
            receipt_number: String::new(),
            precision: CurrencyPrecision::Two,
            excise: None,
            errors: Vec::new(),
            rules_version: RULES_VERSION,
        }
    }

    /// Merge a rule's patch. Fields already populated by an earlier rule
    /// are kept; errors accumulate.
    fn apply(&mut self, patch: Patch) {
        if let Some(vendor) = patch.vendor {
            if self.vendor.is_empty() {
                self.vendor = vendor;
            }
        }
        if let Some(date) = patch.date {
            if self.date.is_empty() {
                self.date = date;
            }
        }
        if let Some(number) = patch.receipt_number {
            if self.receipt_number.is_empty() {
                self.receipt_number = number;
            }
        }
        if let Some(total) = patch.total {
            if self.total == 0 {
                self.total = total;
            }
        }
        if let Some(vat) = patch.vat {
            if self.vat == 0 {
                self.vat = vat;
            }
        }
        if let Some(precision) = patch.precision {
            self.precision = precision;
        }
        if self.excise.is_none() {
            self.excise = patch.excise;
        }
        self.errors.extend(patch.errors);
    }
}

/// The extraction rule engine.
///
/// All regular expressions are compiled once here, at construction, and
/// are read-only afterwards; the engine is safe to share across worker
/// threads.
pub struct Extractor {
    rules: Vec<Box<dyn Rule>>,
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(VendorRule::new()),
                Box::new(DateRule::new()),
                Box::new(ReceiptIdRule::new()),
                Box::new(CurrencyRule::new()),
                Box::new(FuelExciseRule::new()),
            ],
        }
    }

    /// Reconstruct candidate lines for the page and run every rule over
    /// them in order, merging the patches into one result.
    pub fn extract(
        &self,
        page: &RecognizedPage,
        orientation: Orientation,
    ) -> Result<Extraction, ExtractionError> {
        let lines = candidate_lines(page);
        let crop = bounding_crop(&page.fragments);
        let mut result = Extraction::new(lines, orientation, crop);

        for rule in &self.rules {
            let patch = rule.find(&result.lines)?;
            result.apply(patch);
            debug!(rule = rule.name(), errors = result.errors.len(), "rule applied");
        }
        Ok(result)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}
