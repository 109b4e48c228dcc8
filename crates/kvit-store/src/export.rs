//! Export persistence service.
//!
//! An export is the packaged output of a closed batch, keyed by the
//! batch it came from. Building the package itself happens elsewhere;
//! this service only stores and retrieves it.

use crate::entities::Export;
use crate::error::Result;
use crate::keys::ExportKey;
use crate::store::Store;

#[derive(Clone)]
pub struct ExportService {
    store: Store,
}

impl ExportService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn create(&self, account_id: &str, batch_id: &str, export: &Export) -> Result<()> {
        let key = ExportKey {
            account_id: account_id.to_string(),
            batch_id: batch_id.to_string(),
        };
        self.store.set(&key, export)
    }

    pub fn get(&self, account_id: &str, batch_id: &str) -> Result<Export> {
        let key = ExportKey {
            account_id: account_id.to_string(),
            batch_id: batch_id.to_string(),
        };
        self.store.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn export_round_trips() {
        let svc = ExportService::new(Store::in_memory().unwrap());
        let export = Export {
            id: "e1".to_string(),
            zip: vec![0x50, 0x4B, 0x03, 0x04],
        };
        svc.create("acct1", "b1", &export).unwrap();
        assert_eq!(svc.get("acct1", "b1").unwrap(), export);
    }
}
