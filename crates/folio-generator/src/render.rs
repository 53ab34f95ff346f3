//! Turning one page into its output path and rendered content.

use std::{fmt, sync::Arc};

use folio_core::{BoxError, CoreError, ExtensionTable, Renderable, path};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::context::{Helpers, RenderContext};

/// Layout that routes a page to the feed serializer.
pub const FEED_LAYOUT: &str = "rss";

/// Output extension of feed pages.
pub const FEED_EXTENSION: &str = "xml";

/// Output extension when the layout does not carry one.
pub const DEFAULT_OUTPUT_EXTENSION: &str = "html";

/// Renders the template file `name` against a context.
pub type TemplateFn =
    Arc<dyn Fn(&str, &RenderContext) -> std::result::Result<String, BoxError> + Send + Sync>;

/// Serializes a feed from a context.
pub type FeedFn = Arc<dyn Fn(&RenderContext) -> std::result::Result<String, BoxError> + Send + Sync>;

/// Wrap a closure as a [`TemplateFn`].
pub fn template_fn<F>(f: F) -> TemplateFn
where
    F: Fn(&str, &RenderContext) -> std::result::Result<String, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`FeedFn`].
pub fn feed_fn<F>(f: F) -> FeedFn
where
    F: Fn(&RenderContext) -> std::result::Result<String, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Page rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The page cannot be rendered as given.
    #[error(transparent)]
    Config(#[from] CoreError),

    /// The template engine failed.
    #[error(transparent)]
    Template(BoxError),

    /// The feed serializer failed.
    #[error(transparent)]
    Feed(BoxError),
}

impl RenderError {
    /// Whether this error signals caller misuse.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(e) if e.is_config())
    }
}

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// A rendered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Path relative to the output root.
    pub output_path: String,
    pub content: String,
}

/// Renders pages through a template engine or the feed serializer.
#[derive(Clone, Default)]
pub struct PageRenderer {
    helpers: Helpers,
    templates: ExtensionTable<TemplateFn>,
    feed: Option<FeedFn>,
}

impl PageRenderer {
    /// A renderer using `templates`; the first entry is the active engine.
    pub fn new(templates: ExtensionTable<TemplateFn>) -> Self {
        Self {
            templates,
            ..Self::default()
        }
    }

    /// Replace the helper table.
    #[must_use]
    pub fn with_helpers(mut self, helpers: Helpers) -> Self {
        self.helpers = helpers;
        self
    }

    /// Set the feed serializer used for the `rss` layout.
    #[must_use]
    pub fn with_feed(mut self, feed: FeedFn) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    /// Build the context a page would be rendered with.
    pub fn context<R: Renderable + ?Sized>(&self, page: &R, config: &Value) -> RenderContext {
        RenderContext::new(config, page.to_fields(), self.helpers.clone())
    }

    /// Render `page` with the site `config`.
    ///
    /// A page without a source path or layout is a configuration error.
    /// Template engine and feed serializer failures are returned unchanged.
    pub fn render<R: Renderable + ?Sized>(&self, page: &R, config: &Value) -> Result<RenderedPage> {
        let source_path = page
            .source_path()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CoreError::config("Cannot render a document without a source path"))?;
        let layout = page
            .layout()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| {
                CoreError::config(format!("Document {source_path} has no layout"))
            })?;

        let ctx = self.context(page, config);

        let (content, output_ext) = if layout == FEED_LAYOUT {
            let feed = self.feed.as_ref().ok_or_else(|| {
                CoreError::config(format!(
                    "Document {source_path} uses the {FEED_LAYOUT} layout but no feed serializer is configured"
                ))
            })?;
            (feed(&ctx).map_err(RenderError::Feed)?, FEED_EXTENSION)
        } else {
            let (template_ext, template) = self.templates.first().ok_or_else(|| {
                CoreError::config(format!(
                    "No template engine registered to render {source_path}"
                ))
            })?;
            let template_name = format!("{layout}.{template_ext}");
            let content = template(&template_name, &ctx).map_err(RenderError::Template)?;
            (
                content,
                path::extension(layout).unwrap_or(DEFAULT_OUTPUT_EXTENSION),
            )
        };

        let output_path = path::replace_extension(source_path, output_ext);
        debug!(source = source_path, layout, output = %output_path, "rendered page");

        Ok(RenderedPage {
            output_path,
            content,
        })
    }
}

impl fmt::Debug for PageRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageRenderer")
            .field("helpers", &self.helpers)
            .field("templates", &self.templates)
            .field("feed", &self.feed.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use folio_core::Document;
    use serde_json::json;

    use super::*;
    use crate::{
        context::helper_fn,
        feed::RssFeed,
        paginate::{PaginateOptions, paginate},
        template::{Template, TemplateRegistry},
    };

    /// Echoes the template name and the page title.
    fn echo() -> TemplateFn {
        template_fn(|name, ctx| {
            Ok(format!(
                "{name}:{}",
                ctx.str_field("title").unwrap_or_default()
            ))
        })
    }

    fn renderer() -> PageRenderer {
        PageRenderer::new(ExtensionTable::new().with("html", echo()))
    }

    #[test]
    fn test_render_document() {
        let doc = Document::new("posts/hello.md")
            .with_field("layout", json!("post"))
            .with_field("title", json!("Hello"));

        let page = renderer().render(&doc, &json!({})).expect("render");
        assert_eq!(page.output_path, "posts/hello.html");
        assert_eq!(page.content, "post.html:Hello");
    }

    #[test]
    fn test_missing_layout_names_document() {
        let doc = Document::new("posts/no-layout.md");

        let err = renderer().render(&doc, &json!({})).expect_err("no layout");
        assert!(err.is_config());
        assert!(err.to_string().contains("posts/no-layout.md"));

        let doc = doc.with_field("layout", json!("page"));
        assert!(renderer().render(&doc, &json!({})).is_ok());
    }

    #[test]
    fn test_empty_layout_is_missing() {
        let doc = Document::new("a.md").with_field("layout", json!(""));
        let err = renderer().render(&doc, &json!({})).expect_err("empty layout");
        assert!(err.is_config());
    }

    #[test]
    fn test_missing_source_path() {
        let doc = Document::new("").with_field("layout", json!("page"));
        let err = renderer().render(&doc, &json!({})).expect_err("no source");
        assert!(err.is_config());
    }

    #[test]
    fn test_layout_extension_sets_output_extension() {
        let doc = Document::new("sitemap.md").with_field("layout", json!("sitemap.xml"));
        let page = renderer().render(&doc, &json!({})).expect("render");

        assert_eq!(page.output_path, "sitemap.xml");
        assert_eq!(page.content, "sitemap.xml.html:");
    }

    #[test]
    fn test_first_template_engine_wins() {
        let other = template_fn(|_, _| Ok("other".to_string()));
        let renderer = PageRenderer::new(
            ExtensionTable::new()
                .with("hbs", other)
                .with("html", echo()),
        );
        let doc = Document::new("a.md").with_field("layout", json!("page"));

        let page = renderer.render(&doc, &json!({})).expect("render");
        assert_eq!(page.content, "other");
        assert_eq!(page.output_path, "a.html");
    }

    #[test]
    fn test_no_template_engine() {
        let doc = Document::new("a.md").with_field("layout", json!("page"));
        let err = PageRenderer::default()
            .render(&doc, &json!({}))
            .expect_err("no engine");
        assert!(err.is_config());
    }

    #[test]
    fn test_feed_layout_uses_feed_serializer() {
        let feed = feed_fn(|ctx| {
            Ok(format!(
                "<rss>{}</rss>",
                ctx.str_field("config.title").unwrap_or_default()
            ))
        });
        let renderer = renderer().with_feed(feed);
        let doc = Document::new("feed.md").with_field("layout", json!("rss"));

        let page = renderer.render(&doc, &json!({"title": "Blog"})).expect("render");
        assert_eq!(page.output_path, "feed.xml");
        assert_eq!(page.content, "<rss>Blog</rss>");
    }

    #[test]
    fn test_feed_layout_without_serializer() {
        let doc = Document::new("feed.md").with_field("layout", json!("rss"));
        let err = renderer().render(&doc, &json!({})).expect_err("no feed");
        assert!(err.is_config());
    }

    #[test]
    fn test_template_error_propagates_unchanged() {
        let failing = template_fn(|_, _| Err("template exploded".into()));
        let renderer = PageRenderer::new(ExtensionTable::new().with("html", failing));
        let doc = Document::new("a.md").with_field("layout", json!("page"));

        let err = renderer.render(&doc, &json!({})).expect_err("failure");
        assert!(matches!(err, RenderError::Template(_)));
        assert_eq!(err.to_string(), "template exploded");
    }

    #[test]
    fn test_context_exposes_config_fields_and_helpers() {
        let seen = template_fn(|_, ctx| {
            let shout = ctx.call("shout", &[])?;
            Ok(format!(
                "{}|{}|{}",
                ctx.str_field("config.title").unwrap_or_default(),
                ctx.str_field("url").unwrap_or_default(),
                shout.as_str().unwrap_or_default()
            ))
        });
        let shout = helper_fn(|ctx, _| {
            Ok(json!(ctx.str_field("title").unwrap_or_default().to_uppercase()))
        });
        let renderer = PageRenderer::new(ExtensionTable::new().with("html", seen))
            .with_helpers(Helpers::new().with("shout", shout));
        let doc = Document::new("posts/a.md")
            .with_field("layout", json!("post"))
            .with_field("title", json!("hi"));

        let page = renderer.render(&doc, &json!({"title": "Site"})).expect("render");
        assert_eq!(page.content, "Site|/posts/a|HI");
    }

    #[test]
    fn test_default_engine_and_feed_plug_in() {
        let mut templates = TemplateRegistry::new();
        templates.register(Template::parse("post", "<h1>{{ title }}</h1>").expect("parse"));
        let renderer = PageRenderer::new(
            ExtensionTable::new().with("html", templates.into_template_fn()),
        )
        .with_feed(RssFeed::new().into_feed_fn());

        let doc = Document::new("a.md")
            .with_field("layout", json!("post"))
            .with_field("title", json!("A"));
        let page = renderer.render(&doc, &json!({})).expect("render");
        assert_eq!(page.content, "<h1>A</h1>");

        let feed = Document::new("feed.md").with_field("layout", json!("rss"));
        let page = renderer
            .render(&feed, &json!({"title": "Blog"}))
            .expect("render feed");
        assert_eq!(page.output_path, "feed.xml");
        assert!(page.content.contains("<title>Blog</title>"));

        let missing = Document::new("b.md").with_field("layout", json!("nope"));
        let err = renderer.render(&missing, &json!({})).expect_err("missing template");
        assert!(matches!(err, RenderError::Template(_)));
        assert!(err.to_string().contains("nope.html"));
    }

    #[test]
    fn test_render_pagination_page() {
        let docs = vec![Document::new("a.md"), Document::new("b.md")];
        let pages = paginate(&docs, &PaginateOptions::new("blog", "/blog", 1, "list"))
            .expect("paginate");

        let rendered = renderer().render(&pages[1], &json!({})).expect("render");
        assert_eq!(rendered.output_path, "blog/page/2.html");
        assert_eq!(rendered.content, "list.html:");
    }
}
