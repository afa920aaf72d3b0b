//! The feed publisher: derives the public RSS 2.0 artifact from the store.
//!
//! `regenerate` is invoked synchronously after every successful store
//! mutation, so the served XML and the persisted document stay consistent
//! on every write path. It always re-reads the store rather than trusting a
//! caller-supplied snapshot; regenerations that race each other all
//! converge on the latest persisted state.

use std::path::PathBuf;
use std::sync::Arc;

use rss::{Category, ChannelBuilder, Guid, Item, ItemBuilder};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::store::{FeedDocument, FeedItem, FeedStore};
use crate::util::atomic_write;

/// File name of the served artifact inside the public directory.
pub const FEED_FILE: &str = "feed.xml";

const DEFAULT_TITLE: &str = "RSS Feed";
const DEFAULT_DESCRIPTION: &str = "RSS Feed Description";
const DEFAULT_LANGUAGE: &str = "en";
const GENERATOR: &str = "newswire";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to build feed XML: {0}")]
    Xml(#[from] rss::Error),

    #[error("failed to write feed XML: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Publisher {
    store: Arc<FeedStore>,
    public_dir: PathBuf,
    public_url: String,
    write_lock: Mutex<()>,
}

impl Publisher {
    pub fn new(store: Arc<FeedStore>, public_dir: PathBuf, public_url: String) -> Self {
        Self {
            store,
            public_dir,
            public_url,
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the generated XML file.
    pub fn artifact_path(&self) -> PathBuf {
        self.public_dir.join(FEED_FILE)
    }

    /// Rebuild the XML artifact from the latest persisted document and
    /// write it atomically to the served location. Idempotent: an unchanged
    /// store produces byte-identical output.
    pub async fn regenerate(&self) -> Result<(), PublishError> {
        let _guard = self.write_lock.lock().await;

        let doc = self.store.load().into_document();
        let xml = render(&doc, &self.public_url)?;
        atomic_write(&self.artifact_path(), &xml)?;

        tracing::debug!(
            items = doc.items.len(),
            path = %self.artifact_path().display(),
            "Regenerated feed XML"
        );
        Ok(())
    }
}

/// Render the document as RSS 2.0. Items are emitted newest-first by
/// `date`; the sort is stable, so items sharing a date keep their stored
/// relative order. Channel timestamps come from `metadata.lastModified`,
/// not the wall clock, which keeps the output deterministic.
fn render(doc: &FeedDocument, public_url: &str) -> Result<Vec<u8>, PublishError> {
    let mut items = doc.items.clone();
    items.sort_by(|a, b| b.date.cmp(&a.date));

    let info = &doc.feed_info;
    let stamp = doc.metadata.last_modified.to_rfc2822();

    let channel = ChannelBuilder::default()
        .title(info.title.clone().unwrap_or_else(|| DEFAULT_TITLE.into()))
        .description(
            info.description
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.into()),
        )
        .link(info.site_url.clone().unwrap_or_else(|| public_url.to_string()))
        .language(Some(
            info.language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.into()),
        ))
        .pub_date(Some(stamp.clone()))
        .last_build_date(Some(stamp))
        .generator(Some(GENERATOR.into()))
        .items(items.iter().map(to_rss_item).collect::<Vec<_>>())
        .build();

    // The rss crate writes the <rss> element only; prepend the declaration.
    let mut buf = Vec::from(&br#"<?xml version="1.0" encoding="UTF-8"?>"#[..]);
    buf.push(b'\n');
    let mut buf = channel.pretty_write_to(buf, b' ', 2)?;
    buf.push(b'\n');
    Ok(buf)
}

fn to_rss_item(item: &FeedItem) -> Item {
    ItemBuilder::default()
        .title(Some(item.title.clone()))
        .description(Some(item.description.clone()))
        .link(Some(item.url.clone()))
        .guid(Some(Guid {
            value: item.id.to_string(),
            permalink: false,
        }))
        .pub_date(Some(item.date.to_rfc2822()))
        .author(if item.author.is_empty() {
            None
        } else {
            Some(item.author.clone())
        })
        .categories(
            item.categories
                .iter()
                .map(|name| Category {
                    name: name.clone(),
                    domain: None,
                })
                .collect::<Vec<_>>(),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocMetadata, FeedInfo, MemoryStorage, NewItem};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn test_publisher(store: Arc<FeedStore>, dir: &TempDir) -> Publisher {
        Publisher::new(
            store,
            dir.path().to_path_buf(),
            "http://localhost:3000".to_string(),
        )
    }

    fn dated_item(title: &str, date: &str) -> NewItem {
        NewItem {
            title: title.to_string(),
            description: format!("{title} description"),
            url: format!("https://example.com/{title}"),
            date: Some(date.parse().unwrap()),
            ..NewItem::default()
        }
    }

    /// Byte offset of `<title>{title}</title>` in the rendered XML.
    fn title_pos(xml: &str, title: &str) -> usize {
        xml.find(&format!("<title>{title}</title>"))
            .unwrap_or_else(|| panic!("{title} not found in feed"))
    }

    #[tokio::test]
    async fn test_items_publish_newest_first_regardless_of_insert_order() {
        let store = Arc::new(FeedStore::new(Box::new(MemoryStorage::new()), true));
        for (title, date) in [
            ("january", "2024-01-01T00:00:00Z"),
            ("march", "2024-03-01T00:00:00Z"),
            ("february", "2024-02-01T00:00:00Z"),
        ] {
            store.create_item(dated_item(title, date)).await.unwrap();
        }

        let dir = TempDir::new().unwrap();
        let publisher = test_publisher(store, &dir);
        publisher.regenerate().await.unwrap();

        let xml = std::fs::read_to_string(publisher.artifact_path()).unwrap();
        let march = title_pos(&xml, "march");
        let february = title_pos(&xml, "february");
        let january = title_pos(&xml, "january");
        assert!(march < february && february < january);
    }

    #[tokio::test]
    async fn test_regenerate_is_idempotent_for_unchanged_store() {
        let store = Arc::new(FeedStore::new(Box::new(MemoryStorage::new()), true));
        store
            .create_item(dated_item("only", "2024-01-01T00:00:00Z"))
            .await
            .unwrap();

        let dir = TempDir::new().unwrap();
        let publisher = test_publisher(store, &dir);

        publisher.regenerate().await.unwrap();
        let first = std::fs::read(publisher.artifact_path()).unwrap();
        publisher.regenerate().await.unwrap();
        let second = std::fs::read(publisher.artifact_path()).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_feed_info_falls_back_to_defaults() {
        let store = Arc::new(FeedStore::new(Box::new(MemoryStorage::new()), true));
        let dir = TempDir::new().unwrap();
        let publisher = test_publisher(store, &dir);

        publisher.regenerate().await.unwrap();

        let xml = std::fs::read_to_string(publisher.artifact_path()).unwrap();
        assert!(xml.contains("<title>RSS Feed</title>"));
        assert!(xml.contains("<language>en</language>"));
        assert!(xml.contains("<link>http://localhost:3000</link>"));
    }

    #[tokio::test]
    async fn test_guid_is_item_id_not_permalink() {
        let store = Arc::new(FeedStore::new(Box::new(MemoryStorage::new()), true));
        let item = store
            .create_item(dated_item("entry", "2024-01-01T00:00:00Z"))
            .await
            .unwrap();

        let dir = TempDir::new().unwrap();
        let publisher = test_publisher(store, &dir);
        publisher.regenerate().await.unwrap();

        let xml = std::fs::read_to_string(publisher.artifact_path()).unwrap();
        assert!(xml.contains(&format!(
            "<guid isPermaLink=\"false\">{}</guid>",
            item.id
        )));
    }

    #[tokio::test]
    async fn test_special_characters_are_escaped() {
        let store = Arc::new(FeedStore::new(Box::new(MemoryStorage::new()), true));
        store
            .create_item(NewItem {
                title: "Bits & <Pieces>".into(),
                description: "a < b".into(),
                url: "https://example.com/amp".into(),
                ..NewItem::default()
            })
            .await
            .unwrap();

        let dir = TempDir::new().unwrap();
        let publisher = test_publisher(store, &dir);
        publisher.regenerate().await.unwrap();

        let xml = std::fs::read_to_string(publisher.artifact_path()).unwrap();
        assert!(xml.contains("Bits &amp; &lt;Pieces&gt;"));
    }

    // ========================================================================
    // Ordering property
    // ========================================================================

    fn doc_with_day_offsets(offsets: &[i64]) -> FeedDocument {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let now = Utc::now();
        FeedDocument {
            feed_info: FeedInfo::default(),
            items: offsets
                .iter()
                .enumerate()
                .map(|(n, days)| FeedItem {
                    id: Uuid::new_v4(),
                    title: format!("item-{n}"),
                    description: "d".into(),
                    url: format!("https://example.com/{n}"),
                    date: base + chrono::Duration::days(*days),
                    author: String::new(),
                    categories: Vec::new(),
                })
                .collect(),
            metadata: DocMetadata {
                created: now,
                last_modified: now,
                version: None,
            },
        }
    }

    fn published_dates(xml: &str) -> Vec<chrono::DateTime<chrono::FixedOffset>> {
        xml.split("<pubDate>")
            .skip(2) // preamble + channel-level pubDate
            .map(|chunk| {
                let raw = chunk.split("</pubDate>").next().unwrap();
                chrono::DateTime::parse_from_rfc2822(raw).unwrap()
            })
            .collect()
    }

    proptest::proptest! {
        #[test]
        fn prop_published_order_is_non_increasing_by_date(
            offsets in proptest::collection::vec(0i64..3650, 0..24)
        ) {
            let doc = doc_with_day_offsets(&offsets);
            let xml = render(&doc, "http://localhost:3000").unwrap();
            let xml = String::from_utf8(xml).unwrap();

            let dates = published_dates(&xml);
            proptest::prop_assert_eq!(dates.len(), offsets.len());
            for pair in dates.windows(2) {
                proptest::prop_assert!(pair[0] >= pair[1]);
            }
        }
    }
}
