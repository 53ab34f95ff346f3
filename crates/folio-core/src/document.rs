//! The document model shared by every pipeline stage.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::path::filepath_to_url;

/// Field holding the relative path of the originating file.
pub const SOURCE_PATH: &str = "source_path";
/// Field holding the canonical site-relative URL.
pub const URL: &str = "url";
/// Field holding the rendered body.
pub const CONTENT: &str = "content";
/// Field holding the text before the cut marker.
pub const EXCERPT: &str = "excerpt";
/// Field holding the text after the cut marker.
pub const MORE: &str = "more";
/// Field naming the template used to render the document.
pub const LAYOUT: &str = "layout";

/// A parsed source file: front matter, derived fields and rendered content.
///
/// `source_path` and `url` are fixed when the document is created. Every
/// other field is an ordinary metadata entry. Query operations hand out
/// references and never modify documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Value>,
}

impl Document {
    /// Create a document for `source_path`, deriving its URL.
    pub fn new(source_path: impl Into<String>) -> Self {
        let source_path = source_path.into();
        let url = filepath_to_url(&source_path);

        let mut fields = Map::new();
        fields.insert(SOURCE_PATH.to_string(), Value::String(source_path));
        fields.insert(URL.to_string(), Value::String(url));
        fields.insert(CONTENT.to_string(), Value::String(String::new()));
        Self { fields }
    }

    /// Set a field. Identity fields (`source_path`, `url`) cannot be replaced
    /// and are left untouched.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if is_identity(&key) {
            debug!(
                field = %key,
                source_path = self.source_path(),
                "ignoring attempt to replace identity field"
            );
            return self;
        }
        self.fields.insert(key, value);
        self
    }

    /// Set every field of `fields`, in order, with the same rules as
    /// [`Document::with_field`].
    #[must_use]
    pub fn with_fields(self, fields: Map<String, Value>) -> Self {
        fields
            .into_iter()
            .fold(self, |doc, (key, value)| doc.with_field(key, value))
    }

    /// Remove a field, returning the document without it.
    #[must_use]
    pub fn without_field(mut self, key: &str) -> Self {
        if !is_identity(key) {
            self.fields.shift_remove(key);
        }
        self
    }

    /// Relative path of the originating file.
    pub fn source_path(&self) -> &str {
        self.str_field(SOURCE_PATH).unwrap_or_default()
    }

    /// Canonical site-relative URL.
    pub fn url(&self) -> &str {
        self.str_field(URL).unwrap_or_default()
    }

    /// Rendered body.
    pub fn content(&self) -> &str {
        self.str_field(CONTENT).unwrap_or_default()
    }

    /// Text before the cut marker, if the document was split.
    pub fn excerpt(&self) -> Option<&str> {
        self.str_field(EXCERPT)
    }

    /// Text after the cut marker, if the document was split.
    pub fn more(&self) -> Option<&str> {
        self.str_field(MORE)
    }

    /// Template name, if any.
    pub fn layout(&self) -> Option<&str> {
        self.str_field(LAYOUT).filter(|l| !l.is_empty())
    }

    /// Look up any field by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields, in insertion order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

fn is_identity(key: &str) -> bool {
    key == SOURCE_PATH || key == URL
}

/// Anything the page renderer can turn into an output file.
///
/// Implemented by [`Document`] and by synthetic pages such as pagination
/// pages.
pub trait Renderable {
    /// Relative source path used to derive the output path.
    fn source_path(&self) -> Option<&str>;

    /// Template name.
    fn layout(&self) -> Option<&str>;

    /// Fields exposed at the top level of the render context.
    fn to_fields(&self) -> Map<String, Value>;
}

impl Renderable for Document {
    fn source_path(&self) -> Option<&str> {
        Some(Document::source_path(self)).filter(|p| !p.is_empty())
    }

    fn layout(&self) -> Option<&str> {
        Document::layout(self)
    }

    fn to_fields(&self) -> Map<String, Value> {
        self.fields.clone()
    }
}
