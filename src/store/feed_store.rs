use std::path::PathBuf;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::storage::Storage;
use super::types::{
    BulkReport, DocMetadata, FeedDocument, FeedInfo, FeedItem, ItemPatch, LoadOutcome, NewItem,
    StoreError,
};

const DOC_VERSION: &str = "1.0.0";

/// Owner of the canonical feed document.
///
/// Every mutating operation runs its load → mutate → save sequence inside a
/// single async mutex, so two concurrent requests cannot interleave a
/// read-modify-write and lose an update. Reads take no lock: the underlying
/// write is atomic (temp + rename), so a concurrent reader sees either the
/// previous or the new document, never a torn one.
pub struct FeedStore {
    storage: Box<dyn Storage>,
    reject_duplicate_urls: bool,
    write_lock: Mutex<()>,
}

impl FeedStore {
    pub fn new(storage: Box<dyn Storage>, reject_duplicate_urls: bool) -> Self {
        Self {
            storage,
            reject_duplicate_urls,
            write_lock: Mutex::new(()),
        }
    }

    /// Seed the document on first start: if no primary file exists yet,
    /// persist a document with the given feed metadata and one example item
    /// so the published feed is never an empty shell.
    pub async fn initialize(&self, seed_info: FeedInfo) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        if self.storage.read_primary()?.is_some() {
            return Ok(());
        }

        let now = Utc::now();
        let mut doc = FeedDocument {
            feed_info: seed_info,
            items: vec![FeedItem {
                id: Uuid::new_v4(),
                title: "Example title".into(),
                description: "This is an example article.".into(),
                url: "https://example.com/article".into(),
                date: now,
                author: String::new(),
                categories: Vec::new(),
            }],
            metadata: DocMetadata {
                created: now,
                last_modified: now,
                version: Some(DOC_VERSION.into()),
            },
        };
        self.persist(&mut doc)?;
        tracing::info!("Seeded new feed document");
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Load the current document through the three-step recovery chain:
    /// primary file → single-slot backup → minimal empty document.
    ///
    /// Never fails: availability wins over consistency here. A feed served
    /// from a stale backup beats a feed that is down.
    pub fn load(&self) -> LoadOutcome {
        match self.storage.read_primary() {
            Ok(Some(bytes)) => {
                if let Some(doc) = parse_document(&bytes) {
                    return LoadOutcome::Loaded(doc);
                }
                tracing::warn!("Primary feed data unparsable, trying backup");
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read primary feed data, trying backup");
            }
        }

        match self.storage.read_backup() {
            Ok(Some(bytes)) => {
                if let Some(doc) = parse_document(&bytes) {
                    tracing::warn!("Recovered feed data from backup");
                    return LoadOutcome::Recovered(doc);
                }
                tracing::warn!("Backup feed data unparsable");
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read backup feed data");
            }
        }

        LoadOutcome::Fresh(FeedDocument::empty())
    }

    /// Look up a single item by id.
    pub fn item(&self, id: Uuid) -> Result<FeedItem, StoreError> {
        self.load()
            .into_document()
            .items
            .into_iter()
            .find(|item| item.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    pub fn items(&self) -> Vec<FeedItem> {
        self.load().into_document().items
    }

    pub fn feed_info(&self) -> FeedInfo {
        self.load().into_document().feed_info
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Validate and create an item: fresh id, defaulted date/author/
    /// categories, prepended to the list, persisted in one save.
    pub async fn create_item(&self, new: NewItem) -> Result<FeedItem, StoreError> {
        validate_required(&new.title, &new.description, &new.url)?;

        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().into_document();

        if self.reject_duplicate_urls && doc.items.iter().any(|item| item.url == new.url) {
            return Err(StoreError::Validation(
                "an item with this URL already exists".into(),
            ));
        }

        let item = build_item(new);
        doc.items.insert(0, item.clone());
        self.persist(&mut doc)?;

        tracing::debug!(id = %item.id, "Created feed item");
        Ok(item)
    }

    /// Apply a partial update. Only fields present in the patch change;
    /// `date` is never altered.
    pub async fn update_item(&self, id: Uuid, patch: ItemPatch) -> Result<FeedItem, StoreError> {
        validate_patch(&patch)?;

        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().into_document();

        if self.reject_duplicate_urls {
            if let Some(url) = &patch.url {
                if doc.items.iter().any(|item| item.id != id && &item.url == url) {
                    return Err(StoreError::Validation(
                        "an item with this URL already exists".into(),
                    ));
                }
            }
        }

        let item = doc
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(StoreError::NotFound(id))?;

        if let Some(title) = patch.title {
            item.title = title;
        }
        if let Some(description) = patch.description {
            item.description = description;
        }
        if let Some(url) = patch.url {
            item.url = url;
        }
        if let Some(author) = patch.author {
            item.author = author;
        }
        if let Some(categories) = patch.categories {
            item.categories = categories;
        }

        let updated = item.clone();
        self.persist(&mut doc)?;

        tracing::debug!(id = %updated.id, "Updated feed item");
        Ok(updated)
    }

    /// Remove and return an item.
    pub async fn delete_item(&self, id: Uuid) -> Result<FeedItem, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().into_document();

        let index = doc
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let removed = doc.items.remove(index);
        self.persist(&mut doc)?;

        tracing::debug!(id = %removed.id, "Deleted feed item");
        Ok(removed)
    }

    /// Import a batch of items. Each candidate is validated independently;
    /// rejects are recorded per entry and the accepted remainder is
    /// prepended and persisted in a single save. Partial success is normal.
    pub async fn bulk_import(&self, candidates: Vec<NewItem>) -> Result<BulkReport, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().into_document();

        let mut accepted: Vec<FeedItem> = Vec::new();
        let mut errors = Vec::new();

        for (index, candidate) in candidates.into_iter().enumerate() {
            if let Err(e) =
                validate_required(&candidate.title, &candidate.description, &candidate.url)
            {
                errors.push(format!("item {index}: {e}"));
                continue;
            }
            if self.reject_duplicate_urls {
                let duplicate = doc.items.iter().any(|item| item.url == candidate.url)
                    || accepted.iter().any(|item| item.url == candidate.url);
                if duplicate {
                    errors.push(format!("item {index}: an item with this URL already exists"));
                    continue;
                }
            }
            accepted.push(build_item(candidate));
        }

        let added_count = accepted.len();
        if added_count > 0 {
            accepted.extend(doc.items.drain(..));
            doc.items = accepted;
            self.persist(&mut doc)?;
        }

        tracing::info!(added = added_count, rejected = errors.len(), "Bulk import");
        Ok(BulkReport {
            added_count,
            errors,
        })
    }

    /// Partially update the feed metadata; omitted fields keep their value.
    pub async fn update_feed_info(&self, patch: FeedInfo) -> Result<FeedInfo, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().into_document();

        doc.feed_info.merge(patch);
        let merged = doc.feed_info.clone();
        self.persist(&mut doc)?;
        Ok(merged)
    }

    /// Write a timestamped snapshot of the current document, distinct from
    /// the rolling single-slot backup that `save` maintains.
    pub async fn backup(&self) -> Result<PathBuf, StoreError> {
        let _guard = self.write_lock.lock().await;
        let doc = self.load().into_document();
        let bytes = encode(&doc)?;
        let path = self.storage.snapshot(&bytes)?;
        tracing::info!(path = %path.display(), "Wrote feed snapshot");
        Ok(path)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Stamp metadata and write the document through the storage layer
    /// (single-slot backup of the previous state, then atomic replace).
    fn persist(&self, doc: &mut FeedDocument) -> Result<(), StoreError> {
        let now = Utc::now();
        // Monotonic even if the wall clock stepped backwards.
        if now > doc.metadata.last_modified {
            doc.metadata.last_modified = now;
        }
        if doc.metadata.version.is_none() {
            doc.metadata.version = Some(DOC_VERSION.into());
        }

        let bytes = encode(doc)?;
        self.storage.replace(&bytes)?;
        Ok(())
    }
}

/// Pretty-printed JSON, human-diffable on disk.
fn encode(doc: &FeedDocument) -> Result<Vec<u8>, StoreError> {
    let mut bytes = serde_json::to_vec_pretty(doc)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn parse_document(bytes: &[u8]) -> Option<FeedDocument> {
    let text = std::str::from_utf8(bytes).ok()?;
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::warn!(error = %e, "Feed document failed to parse");
            None
        }
    }
}

fn build_item(new: NewItem) -> FeedItem {
    FeedItem {
        id: Uuid::new_v4(),
        title: new.title,
        description: new.description,
        url: new.url,
        date: new.date.unwrap_or_else(Utc::now),
        author: new.author.unwrap_or_default(),
        categories: new.categories.unwrap_or_default(),
    }
}

fn validate_required(title: &str, description: &str, url: &str) -> Result<(), StoreError> {
    if title.trim().is_empty() || description.trim().is_empty() || url.trim().is_empty() {
        return Err(StoreError::Validation(
            "title, description, and URL are required".into(),
        ));
    }
    Ok(())
}

/// Reject patches that would blank out a required field. An explicit empty
/// string here is a caller error, not a no-op.
fn validate_patch(patch: &ItemPatch) -> Result<(), StoreError> {
    let blanked = [&patch.title, &patch.description, &patch.url]
        .into_iter()
        .any(|field| matches!(field, Some(v) if v.trim().is_empty()));
    if blanked {
        return Err(StoreError::Validation(
            "title, description, and URL cannot be empty".into(),
        ));
    }
    Ok(())
}
