//! Folio Parser Library
//!
//! Turns raw source files into [`Document`](folio_core::Document)s: front
//! matter splitting, body rendering keyed by file extension, excerpt
//! extraction and custom field parsing.

pub mod markdown;
pub mod parser;

use std::sync::Arc;

use folio_core::{BoxError, CoreError};
pub use markdown::MarkdownRenderer;
pub use parser::{DocumentParser, FieldParserFn, ParseOptions, field_parser_fn};
use thiserror::Error;

/// Parser errors.
#[derive(Debug, Error)]
pub enum ParserError {
    /// Front matter could not be parsed.
    #[error(transparent)]
    Frontmatter(#[from] CoreError),

    /// The body renderer failed.
    #[error(transparent)]
    Render(BoxError),

    /// A custom field parser failed.
    #[error(transparent)]
    Field(BoxError),
}

/// Result type for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Renders a raw body into its final form.
pub type RenderFn = Arc<dyn Fn(&str) -> std::result::Result<String, BoxError> + Send + Sync>;

/// Wrap a closure as a [`RenderFn`].
pub fn render_fn<F>(f: F) -> RenderFn
where
    F: Fn(&str) -> std::result::Result<String, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}
