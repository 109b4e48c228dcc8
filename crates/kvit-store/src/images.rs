//! Receipt image persistence service.
//!
//! Images are stored under the same id as their receipt and expire on
//! their own TTL; the receipt record outlives its picture.

use crate::entities::Image;
use crate::error::Result;
use crate::keys::ImageKey;
use crate::store::Store;

#[derive(Clone)]
pub struct ImageService {
    store: Store,
}

impl ImageService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn upsert(&self, account_id: &str, receipt_id: &str, image: &Image) -> Result<()> {
        let key = ImageKey {
            account_id: account_id.to_string(),
            receipt_id: receipt_id.to_string(),
        };
        self.store.set(&key, image)
    }

    pub fn get(&self, account_id: &str, receipt_id: &str) -> Result<Image> {
        let key = ImageKey {
            account_id: account_id.to_string(),
            receipt_id: receipt_id.to_string(),
        };
        self.store.get(&key)
    }
}
