//! Slicing an ordered document collection into listing pages.

use folio_core::{CoreError, Document, Renderable, Result, path::collapse_slashes};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Path segment marking page 1 when [`PaginateOptions::index`] is set.
pub const INDEX_MARKER: &str = "index";

/// Pagination options as written in configuration.
///
/// The four prefix/size/layout options are required; they are optional here
/// only so that a missing one can be reported by name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PaginateOptions {
    /// Source path of page 1; later pages append `/page/{n}`.
    pub source_path_prefix: Option<String>,
    /// URL of page 1; later pages append `/page/{n}`.
    pub url_prefix: Option<String>,
    pub documents_per_page: Option<usize>,
    pub layout: Option<String>,
    /// Give page 1 the source path `{prefix}/index` instead of the bare prefix.
    pub index: bool,
    /// Fields added to every page, below the page's own fields.
    pub extra: Map<String, Value>,
}

impl PaginateOptions {
    /// Options with every required value set.
    pub fn new(
        source_path_prefix: impl Into<String>,
        url_prefix: impl Into<String>,
        documents_per_page: usize,
        layout: impl Into<String>,
    ) -> Self {
        Self {
            source_path_prefix: Some(source_path_prefix.into()),
            url_prefix: Some(url_prefix.into()),
            documents_per_page: Some(documents_per_page),
            layout: Some(layout.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra;
        self
    }

    fn validate(&self) -> Result<Settings<'_>> {
        let source_path_prefix = required(&self.source_path_prefix, "source_path_prefix")?;
        let url_prefix = required(&self.url_prefix, "url_prefix")?;
        let layout = required(&self.layout, "layout")?;
        let per_page = match self.documents_per_page {
            None => return Err(missing("documents_per_page")),
            Some(0) => {
                return Err(CoreError::config(
                    "Pagination option documents_per_page must be greater than zero",
                ));
            }
            Some(n) => n,
        };

        Ok(Settings {
            source_path_prefix,
            url_prefix,
            per_page,
            layout,
        })
    }
}

struct Settings<'o> {
    source_path_prefix: &'o str,
    url_prefix: &'o str,
    per_page: usize,
    layout: &'o str,
}

fn required<'o>(value: &'o Option<String>, name: &str) -> Result<&'o str> {
    value.as_deref().ok_or_else(|| missing(name))
}

fn missing(name: &str) -> CoreError {
    CoreError::config(format!("Missing required pagination option: {name}"))
}

/// One page of a paginated collection.
///
/// Rendered exactly like a [`Document`]; the page's documents are borrowed
/// from the input collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationPage<'a> {
    pub source_path: String,
    pub url: String,
    pub layout: String,
    /// 1-based.
    pub page_number: usize,
    pub total_pages: usize,
    pub documents: Vec<&'a Document>,
    /// Size of the whole collection, not of this page.
    pub documents_total: usize,
    pub previous_url: Option<String>,
    pub next_url: Option<String>,
    pub extra: Map<String, Value>,
}

impl Renderable for PaginationPage<'_> {
    fn source_path(&self) -> Option<&str> {
        Some(self.source_path.as_str())
    }

    fn layout(&self) -> Option<&str> {
        Some(self.layout.as_str())
    }

    fn to_fields(&self) -> Map<String, Value> {
        let mut fields = self.extra.clone();
        let documents = self
            .documents
            .iter()
            .map(|doc| Value::Object(doc.fields().clone()))
            .collect();

        fields.insert("source_path".into(), self.source_path.clone().into());
        fields.insert("url".into(), self.url.clone().into());
        fields.insert("layout".into(), self.layout.clone().into());
        fields.insert("page_number".into(), self.page_number.into());
        fields.insert("total_pages".into(), self.total_pages.into());
        fields.insert("documents".into(), Value::Array(documents));
        fields.insert("documents_total".into(), self.documents_total.into());
        fields.insert("previous_url".into(), self.previous_url.clone().into());
        fields.insert("next_url".into(), self.next_url.clone().into());
        fields
    }
}

/// Split `documents` into pages of `documents_per_page`.
///
/// The input order is kept; filter and order the collection first. An empty
/// collection produces no pages.
pub fn paginate<'a>(
    documents: impl IntoIterator<Item = &'a Document>,
    options: &PaginateOptions,
) -> Result<Vec<PaginationPage<'a>>> {
    let settings = options.validate()?;
    let documents: Vec<&Document> = documents.into_iter().collect();
    let total = documents.len();
    let total_pages = total.div_ceil(settings.per_page);

    let url_for = |n: usize| page_path(settings.url_prefix, n, false);

    let pages: Vec<PaginationPage<'a>> = documents
        .chunks(settings.per_page)
        .enumerate()
        .map(|(i, chunk)| {
            let n = i + 1;
            PaginationPage {
                source_path: page_path(settings.source_path_prefix, n, options.index),
                url: url_for(n),
                layout: settings.layout.to_string(),
                page_number: n,
                total_pages,
                documents: chunk.to_vec(),
                documents_total: total,
                previous_url: (n > 1).then(|| url_for(n - 1)),
                next_url: (n < total_pages).then(|| url_for(n + 1)),
                extra: options.extra.clone(),
            }
        })
        .collect();

    debug!(
        prefix = settings.source_path_prefix,
        documents = total,
        pages = pages.len(),
        "paginated collection"
    );
    Ok(pages)
}

fn page_path(prefix: &str, n: usize, index: bool) -> String {
    let path = match n {
        1 if index => format!("{prefix}/{INDEX_MARKER}"),
        1 => prefix.to_string(),
        n => format!("{prefix}/page/{n}"),
    };
    collapse_slashes(&path)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn docs(count: usize) -> Vec<Document> {
        (0..count)
            .map(|i| Document::new(format!("posts/{i}.md")))
            .collect()
    }

    fn options() -> PaginateOptions {
        PaginateOptions::new("blog", "/blog/", 4, "list")
    }

    #[test]
    fn test_ten_documents_three_pages() {
        let docs = docs(10);
        let pages = paginate(&docs, &options()).expect("paginate");

        let sizes: Vec<usize> = pages.iter().map(|p| p.documents.len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert!(pages.iter().all(|p| p.documents_total == 10));
        assert!(pages.iter().all(|p| p.total_pages == 3));

        assert_eq!(pages[0].previous_url, None);
        assert_eq!(pages[0].next_url.as_deref(), Some("/blog/page/2"));
        assert_eq!(pages[1].previous_url.as_deref(), Some("/blog/"));
        assert_eq!(pages[2].next_url, None);
    }

    #[test]
    fn test_page_paths() {
        let docs = docs(9);
        let pages = paginate(&docs, &options()).expect("paginate");

        let paths: Vec<&str> = pages.iter().map(|p| p.source_path.as_str()).collect();
        assert_eq!(paths, vec!["blog", "blog/page/2", "blog/page/3"]);
        let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(urls, vec!["/blog/", "/blog/page/2", "/blog/page/3"]);
    }

    #[test]
    fn test_index_marker_only_affects_source_path() {
        let docs = docs(5);
        let pages = paginate(&docs, &options().with_index(true)).expect("paginate");

        assert_eq!(pages[0].source_path, "blog/index");
        assert_eq!(pages[0].url, "/blog/");
        assert_eq!(pages[1].source_path, "blog/page/2");
    }

    #[test]
    fn test_slices_keep_input_order_and_identity() {
        let docs = docs(6);
        let pages = paginate(&docs, &options()).expect("paginate");

        assert!(std::ptr::eq(pages[0].documents[0], &docs[0]));
        assert!(std::ptr::eq(pages[1].documents[1], &docs[5]));
        assert_eq!(pages[1].documents[0].source_path(), "posts/4.md");
    }

    #[test]
    fn test_empty_collection_has_no_pages() {
        let docs: Vec<Document> = Vec::new();
        let pages = paginate(&docs, &options()).expect("paginate");
        assert!(pages.is_empty());
    }

    #[test]
    fn test_missing_options_are_config_errors() {
        for name in ["source_path_prefix", "url_prefix", "documents_per_page", "layout"] {
            let mut opts = options();
            match name {
                "source_path_prefix" => opts.source_path_prefix = None,
                "url_prefix" => opts.url_prefix = None,
                "documents_per_page" => opts.documents_per_page = None,
                _ => opts.layout = None,
            }

            let err = paginate(&docs(1), &opts).expect_err("missing option");
            assert!(err.is_config());
            assert!(err.to_string().contains(name), "{err} should name {name}");
        }
    }

    #[test]
    fn test_zero_per_page_is_rejected() {
        let mut opts = options();
        opts.documents_per_page = Some(0);
        let err = paginate(&docs(1), &opts).expect_err("zero");
        assert!(err.is_config());
    }

    #[test]
    fn test_page_fields_override_extra() {
        let Value::Object(extra) = json!({"title": "Archive", "url": "/ignored"}) else {
            unreachable!()
        };
        let docs = vec![Document::new("a.md").with_field("title", json!("A"))];
        let pages = paginate(&docs, &options().with_extra(extra)).expect("paginate");

        let fields = pages[0].to_fields();
        assert_eq!(fields["title"], json!("Archive"));
        assert_eq!(fields["url"], json!("/blog/"));
        assert_eq!(fields["page_number"], json!(1));
        assert_eq!(fields["documents_total"], json!(1));
        assert_eq!(fields["previous_url"], Value::Null);
        assert_eq!(fields["documents"][0]["title"], json!("A"));
        assert_eq!(Renderable::layout(&pages[0]), Some("list"));
    }

    #[test]
    fn test_options_deserialize() {
        let opts: PaginateOptions = serde_json::from_value(json!({
            "source_path_prefix": "tags/rust",
            "url_prefix": "/tags/rust",
            "documents_per_page": 10,
            "layout": "tag",
            "index": true
        }))
        .expect("deserialize");

        assert_eq!(
            opts,
            PaginateOptions::new("tags/rust", "/tags/rust", 10, "tag").with_index(true)
        );
    }
}
