//! The feed store: canonical JSON document of feed metadata and items.
//!
//! The module is organized into three layers:
//!
//! - [`types`] - the persisted data model, mutation payloads, and errors
//! - [`storage`] - raw document persistence (atomic replace, single-slot
//!   backup, timestamped snapshots) behind the [`Storage`] trait
//! - [`feed_store`] - the operations layer: validated CRUD, bulk import,
//!   and the load-recovery chain, serialized under one write lock

mod feed_store;
mod storage;
mod types;

pub use feed_store::FeedStore;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use types::{
    BulkReport, DocMetadata, FeedDocument, FeedInfo, FeedItem, ItemPatch, LoadOutcome, NewItem,
    StoreError,
};
