//! Folio Generator Library
//!
//! Document pipeline for Folio: loading, querying, pagination and page
//! rendering.
//!
//! # Modules
//!
//! - [`repository`] - Loading documents from a content folder
//! - [`query`] - Filtering, ordering and grouping documents
//! - [`paginate`] - Slicing collections into listing pages
//! - [`context`] - Render context and template helpers
//! - [`render`] - Page rendering and output paths
//! - [`template`] - Default template engine
//! - [`feed`] - RSS feed serialization
//! - [`build`] - Build orchestration

pub mod build;
pub mod context;
pub mod feed;
pub mod paginate;
pub mod query;
pub mod render;
pub mod repository;
pub mod template;

pub use build::{BuildError, BuildSettings, BuildStats, Builder, CollectionSettings};
pub use context::{HelperFn, Helpers, RenderContext, helper_fn};
pub use feed::RssFeed;
pub use paginate::{PaginateOptions, PaginationPage, paginate};
pub use query::{Filter, GroupBy, Predicate, SortKey, filter, group, order, sort_keys};
pub use render::{FeedFn, PageRenderer, RenderError, RenderedPage, TemplateFn, feed_fn, template_fn};
pub use repository::{DocumentRepository, RepositoryError};
pub use template::{Template, TemplateError, TemplateRegistry};
