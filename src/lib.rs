//! newswire: a self-hosted RSS feed service backed by a single JSON document.
//!
//! The crate is a small durable-store-to-published-artifact pipeline:
//!
//! - [`store`] - the feed store: canonical JSON document with atomic
//!   writes, a single-slot backup, and a load-recovery chain
//! - [`publish`] - the feed publisher: derives the public RSS 2.0 XML
//!   artifact from the store's current state
//! - [`api`] - a thin HTTP layer over both, plus static serving of the
//!   generated XML
//! - [`config`] - TOML file, environment, and CLI configuration layering

pub mod api;
pub mod config;
pub mod publish;
pub mod store;
pub mod util;

pub use api::{create_router, AppState};
pub use config::Config;
pub use publish::Publisher;
pub use store::{FeedStore, FileStorage};
