//! Folio Core Library
//!
//! Document model, configuration loading and path helpers shared by the
//! Folio parser and generator.

pub mod config;
pub mod document;
pub mod error;
pub mod frontmatter;
pub mod path;
pub mod table;
pub mod value;

pub use config::{ConfigSet, deep_merge};
pub use document::{Document, Renderable};
pub use error::{BoxError, CoreError, Result};
pub use frontmatter::Metadata;
pub use table::ExtensionTable;
