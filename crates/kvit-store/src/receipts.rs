//! Receipt persistence service.

use chrono::Utc;
use tracing::debug;

use crate::entities::{Entity, EntityKind, Receipt};
use crate::error::{Result, StoreError};
use crate::keys::{receipt_prefix, ReceiptKey};
use crate::store::Store;

/// CRUD over receipts plus batch listing.
#[derive(Clone)]
pub struct ReceiptService {
    store: Store,
}

impl ReceiptService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn upsert(&self, account_id: &str, receipt: &Receipt) -> Result<()> {
        let key = ReceiptKey {
            account_id: account_id.to_string(),
            receipt_id: receipt.id.clone(),
        };
        self.store.set(&key, receipt)
    }

    pub fn get(&self, account_id: &str, receipt_id: &str) -> Result<Receipt> {
        let key = ReceiptKey {
            account_id: account_id.to_string(),
            receipt_id: receipt_id.to_string(),
        };
        self.store.get(&key)
    }

    pub fn delete(&self, account_id: &str, receipt_id: &str) -> Result<()> {
        let key = ReceiptKey {
            account_id: account_id.to_string(),
            receipt_id: receipt_id.to_string(),
        };
        self.store.delete(&key)
    }

    /// All receipts belonging to a batch.
    pub fn get_batch(&self, account_id: &str, batch_id: &str) -> Result<Vec<Receipt>> {
        receipts_for_batch(&self.store, account_id, batch_id)
    }

    /// Stamp a receipt as human-verified.
    pub fn mark_reviewed(&self, account_id: &str, receipt_id: &str) -> Result<()> {
        let mut receipt = self.get(account_id, receipt_id)?;
        receipt.reviewed = Utc::now().timestamp();
        self.upsert(account_id, &receipt)
    }
}

/// All receipts of `account_id` whose batch id matches.
///
/// There is no secondary index by batch: this reverse-scans every
/// receipt under the account and filters in application code, an
/// O(account receipts) ceiling accepted because an account holds at
/// most a few filing cycles of receipts. Newest receipts come first.
pub(crate) fn receipts_for_batch(
    store: &Store,
    account_id: &str,
    batch_id: &str,
) -> Result<Vec<Receipt>> {
    if batch_id.is_empty() {
        return Err(StoreError::EmptyBatchId);
    }

    let prefix = receipt_prefix(account_id);
    let mut receipts = Vec::new();
    for (_, kind, value) in store.scan_prefix(&prefix, true)? {
        if kind != EntityKind::Receipt {
            return Err(StoreError::TypeMismatch {
                expected: EntityKind::Receipt.name(),
                found: kind as u8,
            });
        }
        let receipt = Receipt::from_bytes(&value)?;
        if receipt.batch_id == batch_id {
            receipts.push(receipt);
        }
    }
    debug!(batch = batch_id, count = receipts.len(), "batch receipts listed");
    Ok(receipts)
}
