//! Turning raw source files into documents.

use std::{collections::BTreeMap, fmt, path::Path, sync::Arc};

use folio_core::{
    BoxError, Document, ExtensionTable, Metadata,
    document::{CONTENT, EXCERPT, MORE},
    frontmatter::parse_frontmatter,
    path,
};
use serde_json::Value;
use tracing::trace;

use crate::{ParserError, RenderFn, Result, markdown::MarkdownRenderer, render_fn};

/// Derives a field from its raw front matter value and the full metadata.
pub type FieldParserFn =
    Arc<dyn Fn(Option<&Value>, &Metadata) -> std::result::Result<Value, BoxError> + Send + Sync>;

/// Wrap a closure as a [`FieldParserFn`].
pub fn field_parser_fn<F>(f: F) -> FieldParserFn
where
    F: Fn(Option<&Value>, &Metadata) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Options controlling how source files become documents.
#[derive(Clone, Default)]
pub struct ParseOptions {
    /// Body renderers keyed by source file extension.
    pub renderers: ExtensionTable<RenderFn>,

    /// Custom field parsers keyed by field name.
    pub field_parsers: BTreeMap<String, FieldParserFn>,

    /// Marker separating the excerpt from the rest of the content.
    pub cut: Option<String>,
}

impl ParseOptions {
    /// Options with the built-in renderers: Markdown for `md`/`markdown`,
    /// pass-through for `html`.
    pub fn with_default_renderers() -> Self {
        let markdown = MarkdownRenderer::new().into_render_fn();
        let passthrough = render_fn(|body| Ok(body.to_string()));

        Self {
            renderers: ExtensionTable::new()
                .with("md", Arc::clone(&markdown))
                .with("markdown", markdown)
                .with("html", passthrough),
            ..Self::default()
        }
    }

    /// Register a body renderer for an extension.
    #[must_use]
    pub fn renderer(mut self, extension: &str, render: RenderFn) -> Self {
        self.renderers.insert(extension, render);
        self
    }

    /// Register a custom field parser.
    #[must_use]
    pub fn field_parser(mut self, field: impl Into<String>, parse: FieldParserFn) -> Self {
        self.field_parsers.insert(field.into(), parse);
        self
    }

    /// Set the cut marker.
    #[must_use]
    pub fn cut(mut self, marker: impl Into<String>) -> Self {
        self.cut = Some(marker.into());
        self
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("renderers", &self.renderers)
            .field("field_parsers", &self.field_parsers.keys().collect::<Vec<_>>())
            .field("cut", &self.cut)
            .finish()
    }
}

/// Parses raw source text into a [`Document`].
#[derive(Debug, Clone, Default)]
pub struct DocumentParser {
    options: ParseOptions,
}

impl DocumentParser {
    /// Create a parser with the given options.
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    /// The options this parser was built with.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse `raw` read from `filepath` (relative to the content folder).
    ///
    /// Field precedence, lowest first: front matter, derived fields
    /// (`content`, `excerpt`, `more`), custom field parsers. `source_path`
    /// and `url` always come from `filepath`.
    pub fn parse(&self, raw: &str, filepath: &str) -> Result<Document> {
        let (metadata, body) = parse_frontmatter(raw, Path::new(filepath))?;

        let renderer = path::extension(filepath).and_then(|ext| self.options.renderers.get(ext));
        let rendered = match renderer {
            Some(render) => render(&body).map_err(ParserError::Render)?,
            None => {
                trace!(path = filepath, "no renderer for extension, passing body through");
                body
            }
        };
        let content = rendered.trim();

        let mut doc = Document::new(filepath)
            .with_fields(metadata.clone())
            .with_field(CONTENT, Value::String(content.to_string()))
            .without_field(EXCERPT)
            .without_field(MORE);

        if let Some((excerpt, more)) = self.split_excerpt(content) {
            doc = doc
                .with_field(EXCERPT, Value::String(excerpt.to_string()))
                .with_field(MORE, Value::String(more.to_string()));
        }

        for (field, parse) in &self.options.field_parsers {
            let value = parse(metadata.get(field), &metadata).map_err(ParserError::Field)?;
            doc = doc.with_field(field.as_str(), value);
        }

        Ok(doc)
    }

    /// Split content around the first cut marker, trimming both halves.
    fn split_excerpt<'a>(&self, content: &'a str) -> Option<(&'a str, &'a str)> {
        let marker = self.options.cut.as_deref().filter(|m| !m.is_empty())?;
        content
            .split_once(marker)
            .map(|(excerpt, more)| (excerpt.trim(), more.trim()))
    }
}
