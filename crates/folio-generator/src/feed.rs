//! RSS feed serialization.
//!
//! Generates an RSS 2.0 channel from the `documents` of a render context,
//! typically a pagination page whose layout is `rss`.

use folio_core::value::{to_text, type_name};
use rss::{ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::{
    context::{RenderContext, parse_date},
    render::{FeedFn, feed_fn},
};

/// Default maximum number of feed items.
pub const DEFAULT_FEED_LIMIT: usize = 20;

/// RSS generation errors.
#[derive(Debug, Error)]
pub enum RssError {
    /// `documents` is present but not a sequence.
    #[error("RSS feed expects `documents` to be a sequence, found {0}")]
    InvalidDocuments(&'static str),
}

/// Result type for RSS operations.
pub type Result<T> = std::result::Result<T, RssError>;

/// RSS feed serializer.
#[derive(Debug, Clone)]
pub struct RssFeed {
    limit: usize,
}

impl Default for RssFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl RssFeed {
    /// Create a serializer with the default item limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_FEED_LIMIT,
        }
    }

    /// Limit the number of items.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Generate RSS feed XML for a render context.
    ///
    /// The channel comes from `config.title`, `config.base_url`,
    /// `config.description` and `config.lang`; items from `documents`.
    pub fn serialize(&self, ctx: &RenderContext) -> Result<String> {
        let base_url = ctx.str_field("config.base_url").unwrap_or_default();
        let title = ctx.str_field("config.title").unwrap_or_default();
        let description = ctx.str_field("config.description").unwrap_or(title);

        let documents = match ctx.lookup("documents") {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(items)) => items.as_slice(),
            Some(other) => {
                return Err(RssError::InvalidDocuments(type_name(other)));
            }
        };

        let items: Vec<Item> = documents
            .iter()
            .filter_map(Value::as_object)
            .take(self.limit)
            .map(|doc| document_to_item(doc, base_url))
            .collect();
        debug!(count = items.len(), limit = self.limit, "generating RSS feed");

        let last_build_date = documents
            .iter()
            .filter_map(|doc| doc.get("date"))
            .filter_map(|date| parse_date(&to_text(date)))
            .max()
            .map(|date| date.and_utc().to_rfc2822());

        let channel = ChannelBuilder::default()
            .title(title)
            .link(base_url)
            .description(description)
            .language(ctx.str_field("config.lang").map(str::to_string))
            .last_build_date(last_build_date)
            .items(items)
            .build();

        Ok(channel.to_string())
    }

    /// Wrap this serializer as a feed function.
    pub fn into_feed_fn(self) -> FeedFn {
        feed_fn(move |ctx| Ok(self.serialize(ctx)?))
    }
}

/// Convert a document's fields to an RSS item.
fn document_to_item(doc: &Map<String, Value>, base_url: &str) -> Item {
    let text = |key: &str| doc.get(key).map(to_text).filter(|s| !s.is_empty());
    let url = format!(
        "{}{}",
        base_url.trim_end_matches('/'),
        text("url").unwrap_or_default()
    );

    let guid = GuidBuilder::default().value(&url).permalink(true).build();

    let mut builder = ItemBuilder::default();
    builder.title(text("title"));
    builder.link(Some(url));
    builder.guid(Some(guid));

    if let Some(date) = text("date").and_then(|d| parse_date(&d)) {
        builder.pub_date(Some(date.and_utc().to_rfc2822()));
    }

    builder.description(text("excerpt").or_else(|| text("content")));

    let categories: Vec<_> = match doc.get("tags") {
        Some(Value::Array(tags)) => tags
            .iter()
            .map(|tag| rss::Category {
                name: to_text(tag),
                domain: None,
            })
            .collect(),
        _ => Vec::new(),
    };
    if !categories.is_empty() {
        builder.categories(categories);
    }

    builder.build()
}
