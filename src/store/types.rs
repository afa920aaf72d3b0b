use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by feed store operations.
///
/// `Validation` and `NotFound` are caller mistakes and never touch the
/// persisted document. `Persistence` and `Encode` mean a mutation was
/// accepted but could not be written; the caller reports a clean failure
/// instead of crashing.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required field is missing or empty, or a policy check failed.
    #[error("{0}")]
    Validation(String),

    /// No item with the given id exists in the document.
    #[error("no item with id {0}")]
    NotFound(Uuid),

    /// The document could not be written to disk.
    #[error("failed to persist feed data: {0}")]
    Persistence(#[from] std::io::Error),

    /// The document could not be serialized.
    #[error("failed to encode feed data: {0}")]
    Encode(#[from] serde_json::Error),
}

// ============================================================================
// Persisted Document
// ============================================================================

/// Feed-level metadata. Every field is optional on the wire; partial
/// updates keep the prior value for omitted fields.
///
/// Field names match the historical on-disk format (`feed_url`, `site_url`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl FeedInfo {
    /// Apply a partial update: fields present in `patch` replace the current
    /// value, omitted fields are untouched.
    pub fn merge(&mut self, patch: FeedInfo) {
        if let Some(title) = patch.title {
            self.title = Some(title);
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(feed_url) = patch.feed_url {
            self.feed_url = Some(feed_url);
        }
        if let Some(site_url) = patch.site_url {
            self.site_url = Some(site_url);
        }
        if let Some(language) = patch.language {
            self.language = Some(language);
        }
    }
}

/// Bookkeeping stamped by the store on every successful save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocMetadata {
    /// Set once when the document is first created, never changed after.
    pub created: DateTime<Utc>,
    /// Updated on every successful save; monotonically non-decreasing.
    pub last_modified: DateTime<Utc>,
    /// Document format version; stamped on save if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A single published entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Opaque unique identifier, generated on creation, never reassigned.
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub url: String,
    /// Publication timestamp; defaults to creation time. Never altered by
    /// updates.
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// The canonical persisted unit: feed metadata plus the ordered item list.
///
/// Items are kept newest-first by convention (the create path prepends) but
/// the order is not an enforced invariant; the publisher re-sorts by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDocument {
    pub feed_info: FeedInfo,
    pub items: Vec<FeedItem>,
    pub metadata: DocMetadata,
}

impl FeedDocument {
    /// A minimal empty document, used when neither the primary file nor the
    /// backup is readable. The feed stays servable even from nothing.
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            feed_info: FeedInfo::default(),
            items: Vec::new(),
            metadata: DocMetadata {
                created: now,
                last_modified: now,
                version: None,
            },
        }
    }
}

// ============================================================================
// Load Outcome
// ============================================================================

/// Result of the three-step load recovery chain.
///
/// Degraded outcomes are deliberate: the feed must always be servable, even
/// after corruption, so `load` never returns an error. Callers that care
/// about the distinction (logging, metrics, tests) can inspect the variant;
/// everyone else calls [`LoadOutcome::into_document`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The primary file parsed cleanly.
    Loaded(FeedDocument),
    /// The primary file was absent, empty, or unparsable; the single-slot
    /// backup supplied the document.
    Recovered(FeedDocument),
    /// Both the primary and the backup were unreadable; this is a minimal
    /// empty document.
    Fresh(FeedDocument),
}

impl LoadOutcome {
    pub fn into_document(self) -> FeedDocument {
        match self {
            LoadOutcome::Loaded(doc) | LoadOutcome::Recovered(doc) | LoadOutcome::Fresh(doc) => doc,
        }
    }

    pub fn document(&self) -> &FeedDocument {
        match self {
            LoadOutcome::Loaded(doc) | LoadOutcome::Recovered(doc) | LoadOutcome::Fresh(doc) => doc,
        }
    }
}

// ============================================================================
// Mutation Payloads
// ============================================================================

/// Payload for creating an item. `title`, `description` and `url` are
/// required non-empty; the rest default at creation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

/// Partial update for an item. `None` means "keep the existing value";
/// `Some` sets it, so an intentional empty string is representable (and is
/// rejected by validation for the required fields). `date` is deliberately
/// absent: updates never alter it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

/// Outcome of a bulk import: how many items were added, plus one message
/// per rejected candidate. Partial success is allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReport {
    pub added_count: usize,
    pub errors: Vec<String>,
}
