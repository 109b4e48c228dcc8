//! Batch lifecycle service.
//!
//! A batch groups the receipts of one filing cycle. Its totals are a
//! materialized view recomputed from the receipts on every read, so they
//! can never drift from the stored receipts.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::entities::Batch;
use crate::error::Result;
use crate::keys::BatchKey;
use crate::receipts::receipts_for_batch;
use crate::store::Store;

#[derive(Clone)]
pub struct BatchService {
    store: Store,
}

impl BatchService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create an empty open batch and return its generated id.
    pub fn create_batch(&self, account_id: &str, start_id: &str) -> Result<(String, Batch)> {
        let batch = Batch {
            start_id: start_id.to_string(),
            ..Batch::default()
        };
        let key = BatchKey {
            account_id: account_id.to_string(),
            batch_id: Uuid::new_v4().to_string(),
        };
        self.store.set(&key, &batch)?;
        info!(batch = %key.batch_id, "batch created");
        Ok((key.batch_id, batch))
    }

    /// Read the batch with its receipt totals materialized.
    pub fn get_batch(&self, account_id: &str, batch_id: &str) -> Result<Batch> {
        let (batch, _) = self.materialize(account_id, batch_id)?;
        Ok(batch)
    }

    /// Close the batch, stamping the current time. The persisted record
    /// keeps the totals as of closing.
    pub fn close_batch(&self, account_id: &str, batch_id: &str) -> Result<()> {
        let (mut batch, key) = self.materialize(account_id, batch_id)?;
        batch.closed = Utc::now().timestamp();
        self.store.set(&key, &batch)?;
        info!(batch = batch_id, receipts = batch.num_receipts, "batch closed");
        Ok(())
    }

    fn materialize(&self, account_id: &str, batch_id: &str) -> Result<(Batch, BatchKey)> {
        let key = BatchKey {
            account_id: account_id.to_string(),
            batch_id: batch_id.to_string(),
        };
        let mut batch: Batch = self.store.get(&key)?;

        let receipts = receipts_for_batch(&self.store, account_id, batch_id)?;
        batch.num_receipts = receipts.len();
        batch.total = receipts.iter().map(|r| r.total).sum();
        batch.vat = receipts.iter().map(|r| r.vat).sum();
        Ok((batch, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Receipt;
    use crate::error::StoreError;
    use crate::receipts::ReceiptService;
    use pretty_assertions::assert_eq;

    fn receipt(id: &str, batch: &str, total: i64, vat: i64) -> Receipt {
        Receipt {
            id: id.to_string(),
            batch_id: batch.to_string(),
            total,
            vat,
            ..Receipt::default()
        }
    }

    #[test]
    fn totals_are_derived_from_receipts() {
        let store = Store::in_memory().unwrap();
        let batches = BatchService::new(store.clone());
        let receipts = ReceiptService::new(store);

        let (batch_id, batch) = batches.create_batch("acct1", "r1").unwrap();
        assert_eq!(batch.num_receipts, 0);

        receipts
            .upsert("acct1", &receipt("r1", &batch_id, 600, 100))
            .unwrap();
        receipts
            .upsert("acct1", &receipt("r2", &batch_id, 1200, 200))
            .unwrap();
        // a receipt in another batch stays out of the totals
        receipts
            .upsert("acct1", &receipt("r3", "other", 999, 99))
            .unwrap();

        let batch = batches.get_batch("acct1", &batch_id).unwrap();
        assert_eq!(batch.num_receipts, 2);
        assert_eq!(batch.total, 1800);
        assert_eq!(batch.vat, 300);
        assert_eq!(batch.closed, 0);
    }

    #[test]
    fn totals_track_receipt_changes() {
        let store = Store::in_memory().unwrap();
        let batches = BatchService::new(store.clone());
        let receipts = ReceiptService::new(store);

        let (batch_id, _) = batches.create_batch("acct1", "r1").unwrap();
        receipts
            .upsert("acct1", &receipt("r1", &batch_id, 600, 100))
            .unwrap();
        assert_eq!(batches.get_batch("acct1", &batch_id).unwrap().total, 600);

        receipts.delete("acct1", "r1").unwrap();
        assert_eq!(batches.get_batch("acct1", &batch_id).unwrap().total, 0);
    }

    #[test]
    fn close_stamps_time() {
        let store = Store::in_memory().unwrap();
        let batches = BatchService::new(store);
        let (batch_id, _) = batches.create_batch("acct1", "r1").unwrap();

        batches.close_batch("acct1", &batch_id).unwrap();
        assert!(batches.get_batch("acct1", &batch_id).unwrap().closed > 0);
    }

    #[test]
    fn unknown_batch_is_not_found() {
        let batches = BatchService::new(Store::in_memory().unwrap());
        assert!(matches!(
            batches.get_batch("acct1", "nope"),
            Err(StoreError::NotFound)
        ));
    }
}
