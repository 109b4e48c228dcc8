//! Stored entity models.
//!
//! Each entity carries a kind discriminant, stored alongside its encoded
//! value so a read can verify it is decoding into the right type, and an
//! optional time-to-live. Structured entities encode as JSON; images are
//! raw bytes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kvit_core::currency::{format_minor_units, CurrencyPrecision};
use kvit_core::{Excise, Extraction, RULES_VERSION};

use crate::error::StoreError;

/// Receipt images are kept just long enough to cover a filing cycle.
pub const IMAGE_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 95);

/// Entity kind discriminant stored with each value.
///
/// The discriminants are one-hot so legacy dumps that OR'd flags
/// together remain readable; new writes always store a single kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntityKind {
    Unknown = 1,
    Account = 2,
    User = 4,
    Batch = 8,
    Receipt = 16,
    Export = 32,
    Image = 64,
}

impl EntityKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Unknown),
            2 => Some(Self::Account),
            4 => Some(Self::User),
            8 => Some(Self::Batch),
            16 => Some(Self::Receipt),
            32 => Some(Self::Export),
            64 => Some(Self::Image),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Account => "account",
            Self::User => "user",
            Self::Batch => "batch",
            Self::Receipt => "receipt",
            Self::Export => "export",
            Self::Image => "image",
        }
    }
}

/// A model that can be stored in the entity store.
pub trait Entity: Sized {
    const KIND: EntityKind;

    /// Time-to-live; `None` means the entity never expires.
    fn ttl(&self) -> Option<Duration> {
        None
    }

    fn to_bytes(&self) -> Result<Vec<u8>, StoreError>;
    fn from_bytes(raw: &[u8]) -> Result<Self, StoreError>;
}

/// One processed receipt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    pub vendor: String,
    pub tax_id: String,
    /// Total in integer minor units.
    pub total: i64,
    /// VAT in integer minor units. Never exceeds `total`.
    pub vat: i64,
    /// Issue date as DD/MM/YYYY, empty when extraction found none.
    pub date: String,
    pub receipt_number: String,
    pub batch_id: String,
    /// Original file name the receipt was processed from.
    pub source: String,
    /// Unix time the receipt was verified by a human; 0 = unreviewed.
    pub reviewed: i64,
    pub precision: CurrencyPrecision,
    pub excise: Option<Excise>,
    /// Soft extraction failures, kept for post-hoc review.
    pub errors: Vec<String>,
    /// Rule-engine revision that produced this receipt; receipts with an
    /// older tag are candidates for reprocessing.
    pub rules_version: String,
}

impl Receipt {
    /// Build a receipt from an extraction result, assigning a fresh id.
    ///
    /// An extracted VAT larger than the total is implausible; both
    /// amounts are dropped and the condition is recorded as a soft
    /// failure alongside the extraction's own.
    pub fn from_extraction(extraction: &Extraction, batch_id: &str, source: &str) -> Self {
        let mut errors = extraction.errors.clone();
        let (total, vat) = if extraction.vat > extraction.total && extraction.total != 0 {
            errors.push("tax exceeds total".to_string());
            (0, 0)
        } else {
            (extraction.total, extraction.vat)
        };

        Self {
            id: Uuid::new_v4().to_string(),
            vendor: extraction.vendor.clone(),
            tax_id: extraction.tax_id.clone(),
            total,
            vat,
            date: extraction.date.clone(),
            receipt_number: extraction.receipt_number.clone(),
            batch_id: batch_id.to_string(),
            source: source.to_string(),
            reviewed: 0,
            precision: extraction.precision,
            excise: extraction.excise.clone(),
            errors,
            rules_version: RULES_VERSION.to_string(),
        }
    }

    /// Total rendered per the receipt's currency precision.
    pub fn total_string(&self) -> String {
        format_minor_units(self.total, self.precision)
    }

    /// VAT rendered per the receipt's currency precision.
    pub fn vat_string(&self) -> String {
        format_minor_units(self.vat, self.precision)
    }
}

impl Entity for Receipt {
    const KIND: EntityKind = EntityKind::Receipt;

    fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn from_bytes(raw: &[u8]) -> Result<Self, StoreError> {
        Ok(serde_json::from_slice(raw)?)
    }
}

/// A filing batch of receipts.
///
/// The receipt totals are derived on read, never incrementally
/// maintained; see the batch service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// First receipt id in the batch, for resuming interrupted runs.
    pub start_id: String,
    pub num_receipts: usize,
    /// Sum of receipt VAT amounts, minor units.
    pub vat: i64,
    /// Sum of receipt totals, minor units.
    pub total: i64,
    /// Unix time the batch was closed; 0 = open.
    pub closed: i64,
}

impl Entity for Batch {
    const KIND: EntityKind = EntityKind::Batch;

    fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn from_bytes(raw: &[u8]) -> Result<Self, StoreError> {
        Ok(serde_json::from_slice(raw)?)
    }
}

/// An encoded receipt image, stored as its raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image(pub Vec<u8>);

impl Entity for Image {
    const KIND: EntityKind = EntityKind::Image;

    fn ttl(&self) -> Option<Duration> {
        Some(IMAGE_TTL)
    }

    fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(self.0.clone())
    }

    fn from_bytes(raw: &[u8]) -> Result<Self, StoreError> {
        Ok(Self(raw.to_vec()))
    }
}

/// A finished batch export: the packaged forms for one filing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    pub id: String,
    pub zip: Vec<u8>,
}

impl Entity for Export {
    const KIND: EntityKind = EntityKind::Export;

    fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn from_bytes(raw: &[u8]) -> Result<Self, StoreError> {
        Ok(serde_json::from_slice(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extraction_with(total: i64, vat: i64) -> Extraction {
        Extraction {
            total,
            vat,
            ..Extraction::default()
        }
    }

    #[test]
    fn receipt_from_extraction_assigns_id_and_version() {
        let receipt = Receipt::from_extraction(&extraction_with(600, 100), "b1", "r.png");
        assert!(!receipt.id.is_empty());
        assert_eq!(receipt.total, 600);
        assert_eq!(receipt.vat, 100);
        assert_eq!(receipt.batch_id, "b1");
        assert_eq!(receipt.source, "r.png");
        assert_eq!(receipt.reviewed, 0);
        assert_eq!(receipt.rules_version, RULES_VERSION);
    }

    #[test]
    fn implausible_vat_is_dropped_with_an_error() {
        let receipt = Receipt::from_extraction(&extraction_with(100, 600), "b1", "r.png");
        assert_eq!(receipt.total, 0);
        assert_eq!(receipt.vat, 0);
        assert_eq!(receipt.errors, vec!["tax exceeds total"]);
    }

    #[test]
    fn amount_rendering_follows_precision() {
        let mut receipt = Receipt::from_extraction(&extraction_with(600, 100), "b1", "r.png");
        assert_eq!(receipt.total_string(), "6.00");
        assert_eq!(receipt.vat_string(), "1.00");
        receipt.precision = CurrencyPrecision::Three;
        assert_eq!(receipt.total_string(), "0.600");
    }

    #[test]
    fn receipt_json_round_trips() {
        let receipt = Receipt::from_extraction(&extraction_with(600, 100), "b1", "r.png");
        let raw = receipt.to_bytes().unwrap();
        assert_eq!(Receipt::from_bytes(&raw).unwrap(), receipt);
    }

    #[test]
    fn receipt_with_excise_and_errors_round_trips() {
        let mut extraction = extraction_with(600, 100);
        extraction.excise = Some(Excise {
            kind: "Gasoline 95".to_string(),
            quantity: "32.5".to_string(),
        });
        extraction.errors = vec!["no vendor found".to_string()];

        let mut receipt = Receipt::from_extraction(&extraction, "b1", "r.png");
        receipt.precision = CurrencyPrecision::Three;
        let raw = receipt.to_bytes().unwrap();
        let decoded = Receipt::from_bytes(&raw).unwrap();
        assert_eq!(decoded, receipt);
        assert_eq!(decoded.excise.unwrap().kind, "Gasoline 95");
        assert_eq!(decoded.errors, vec!["no vendor found"]);
    }

    #[test]
    fn export_zip_round_trips() {
        let export = Export {
            id: "e1".to_string(),
            zip: (0u8..=255).collect(),
        };
        let raw = export.to_bytes().unwrap();
        assert_eq!(Export::from_bytes(&raw).unwrap(), export);
    }

    #[test]
    fn only_images_expire() {
        assert_eq!(Image(vec![1, 2, 3]).ttl(), Some(IMAGE_TTL));
        assert_eq!(Batch::default().ttl(), None);
        assert_eq!(Receipt::default().ttl(), None);
        assert_eq!(Export::default().ttl(), None);
    }

    #[test]
    fn kind_discriminants_are_one_hot() {
        assert_eq!(EntityKind::from_u8(16), Some(EntityKind::Receipt));
        assert_eq!(EntityKind::from_u8(64), Some(EntityKind::Image));
        assert_eq!(EntityKind::from_u8(3), None);
    }
}
