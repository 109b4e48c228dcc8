//! Entity storage and the parallel receipt processing pipeline.
//!
//! This crate provides:
//! - A SQLite-backed entity store with kind-checked reads, TTL expiry,
//!   and ordered prefix scans
//! - Path-like key codecs scoping every entity under its account
//! - Receipt, image, batch, and export services
//! - A worker pool that turns receipt images into stored receipts

pub mod batch;
pub mod entities;
pub mod error;
pub mod export;
pub mod images;
pub mod keys;
pub mod processor;
pub mod receipts;
pub mod store;
pub mod time;

pub use batch::BatchService;
pub use entities::{Batch, Entity, EntityKind, Export, Image, Receipt, IMAGE_TTL};
pub use error::{KeyError, ProcessError, Result, StoreError};
pub use export::ExportService;
pub use images::ImageService;
pub use keys::{account_prefix, BatchKey, ExportKey, ImageKey, Key, ReceiptKey};
pub use processor::{write_errors_hook, Hooks, ParallelOptions, ParallelProcessor};
pub use receipts::ReceiptService;
pub use store::{Entry, Store};
pub use time::{short_date_to_time, time_to_short_date};
