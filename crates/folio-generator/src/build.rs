//! Build orchestration.
//!
//! Runs the whole pipeline once per configuration entry: load documents,
//! render each of them, render the configured collections and write the
//! results below the output directory.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use folio_core::{ConfigSet, CoreError, ExtensionTable};
use folio_parser::{DocumentParser, ParseOptions};
use rayon::prelude::*;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    context::Helpers,
    feed::{DEFAULT_FEED_LIMIT, RssFeed},
    paginate::{PaginateOptions, paginate},
    query::{Filter, filter, order, sort_keys},
    render::{PageRenderer, RenderError, RenderedPage},
    repository::{DocumentRepository, RepositoryError},
    template::{TEMPLATE_EXTENSION, TemplateError, TemplateRegistry},
};

/// Config key holding [`BuildSettings`].
pub const BUILD_KEY: &str = "build";

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// An output file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] CoreError),

    /// Documents could not be loaded.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Templates could not be loaded.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A page failed to render.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Build settings, read from the `build` key of a site config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Folder holding source documents.
    pub content_dir: PathBuf,

    /// Source file extensions to load.
    pub extensions: Vec<String>,

    /// Excerpt cut marker.
    pub cut: Option<String>,

    /// Folder holding `<layout>.html` templates.
    pub template_dir: PathBuf,

    /// Folder receiving rendered files.
    pub output_dir: PathBuf,

    /// Maximum number of items in RSS feeds.
    pub feed_limit: usize,

    /// Paginated listings.
    pub collections: Vec<CollectionSettings>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            extensions: vec!["md".into(), "markdown".into(), "html".into()],
            cut: None,
            template_dir: PathBuf::from("templates"),
            output_dir: PathBuf::from("public"),
            feed_limit: DEFAULT_FEED_LIMIT,
            collections: Vec::new(),
        }
    }
}

impl BuildSettings {
    /// Read settings from a site config. A missing `build` key gives the
    /// defaults.
    pub fn from_config(config: &Value) -> folio_core::Result<Self> {
        match config.get(BUILD_KEY) {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(value) => Self::deserialize(value)
                .map_err(|e| CoreError::config_with_source("Invalid build settings", e)),
        }
    }
}

/// One paginated listing: which documents, in which order, paged how.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    /// Field literals a document must match to be listed.
    pub filter: Map<String, Value>,

    /// Sort keys, `-field` for descending.
    pub order: Vec<String>,

    #[serde(flatten)]
    pub pagination: PaginateOptions,
}

/// Build statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Configuration entries built (languages, or 1 for the base config).
    pub languages: usize,

    /// Documents loaded.
    pub documents: usize,

    /// Files written for documents.
    pub pages: usize,

    /// Files written for collection pages.
    pub collection_pages: usize,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

/// Site builder that orchestrates the build process.
#[derive(Debug)]
pub struct Builder {
    configs: ConfigSet,
    root: PathBuf,
    output_dir: Option<PathBuf>,
    parse_options: ParseOptions,
    helpers: Helpers,
    clean: bool,
}

impl Builder {
    /// Create a builder for the site at `root`. Relative directories in the
    /// build settings are resolved against `root`.
    #[must_use]
    pub fn new(configs: ConfigSet, root: impl Into<PathBuf>) -> Self {
        Self {
            configs,
            root: root.into(),
            output_dir: None,
            parse_options: ParseOptions::with_default_renderers(),
            helpers: Helpers::with_defaults(),
            clean: false,
        }
    }

    /// Write output here instead of the configured `output_dir`.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Parse documents with these options. The configured cut marker still
    /// applies when set.
    #[must_use]
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    #[must_use]
    pub fn with_helpers(mut self, helpers: Helpers) -> Self {
        self.helpers = helpers;
        self
    }

    /// Remove each output directory before writing to it.
    #[must_use]
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Execute the full build process.
    pub fn build(&self) -> Result<BuildStats> {
        let start = Instant::now();
        let mut stats = BuildStats::default();

        info!(
            root = %self.root.display(),
            languages = ?self.configs.languages(),
            "starting build"
        );

        for (key, config) in self.configs.iter() {
            let lang = self.configs.is_multilingual().then_some(key);
            let config = with_lang(config, lang);
            self.build_entry(lang, &config, &mut stats)?;
            stats.languages += 1;
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            documents = stats.documents,
            pages = stats.pages,
            collection_pages = stats.collection_pages,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    /// Output directory for a config entry.
    pub fn output_root(&self, settings: &BuildSettings, lang: Option<&str>) -> PathBuf {
        let base = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => self.root.join(&settings.output_dir),
        };
        match lang {
            Some(lang) => base.join(lang),
            None => base,
        }
    }

    /// The document repository for a config entry.
    pub fn repository(&self, settings: &BuildSettings) -> DocumentRepository {
        let mut options = self.parse_options.clone();
        if let Some(cut) = &settings.cut {
            options.cut = Some(cut.clone());
        }
        DocumentRepository::new(DocumentParser::new(options))
    }

    fn build_entry(&self, lang: Option<&str>, config: &Value, stats: &mut BuildStats) -> Result<()> {
        let settings = BuildSettings::from_config(config)?;
        let output_root = self.output_root(&settings, lang);
        debug!(lang = ?lang, output = %output_root.display(), "building config entry");

        let documents = self
            .repository(&settings)
            .load_all(&self.root.join(&settings.content_dir), &settings.extensions)?;

        let templates = TemplateRegistry::load(&self.root.join(&settings.template_dir))?;
        let renderer = PageRenderer::new(
            ExtensionTable::new().with(TEMPLATE_EXTENSION, templates.into_template_fn()),
        )
        .with_helpers(self.helpers.clone())
        .with_feed(RssFeed::new().with_limit(settings.feed_limit).into_feed_fn());

        if self.clean {
            clean_dir(&output_root)?;
        }

        info!(count = documents.len(), "rendering documents");
        let rendered = documents
            .par_iter()
            .map(|doc| -> Result<(String, RenderedPage)> {
                Ok((doc.source_path().to_string(), renderer.render(doc, config)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut outputs = OutputClaims::default();
        for (source, page) in &rendered {
            outputs.claim(&page.output_path, source)?;
        }

        let mut collection_pages = Vec::new();
        for collection in &settings.collections {
            let selected = filter(&documents, &Filter::from_literals(&collection.filter));
            let ordered = order(selected, &sort_keys(&collection.order));
            let pages = paginate(ordered, &collection.pagination)?;

            for page in &pages {
                let output = renderer.render(page, config)?;
                outputs.claim(&output.output_path, &page.source_path)?;
                collection_pages.push(output);
            }
        }

        rendered
            .par_iter()
            .map(|(_, page)| write_output(&output_root, page))
            .collect::<Result<Vec<_>>>()?;
        for page in &collection_pages {
            write_output(&output_root, page)?;
        }
        let collection_pages = collection_pages.len();

        stats.documents += documents.len();
        stats.pages += documents.len();
        stats.collection_pages += collection_pages;
        Ok(())
    }
}

/// Output paths already taken in one config entry, keyed to their origin.
#[derive(Default)]
struct OutputClaims(HashMap<String, String>);

impl OutputClaims {
    fn claim(&mut self, output_path: &str, origin: &str) -> Result<()> {
        if let Some(previous) = self.0.get(output_path) {
            return Err(CoreError::config(format!(
                "{previous} and {origin} both render to {output_path}"
            ))
            .into());
        }
        self.0.insert(output_path.to_string(), origin.to_string());
        Ok(())
    }
}

/// Expose the language code as `config.lang` unless the config sets it.
fn with_lang(config: &Value, lang: Option<&str>) -> Value {
    let mut config = config.clone();
    if let (Some(lang), Value::Object(map)) = (lang, &mut config) {
        map.entry("lang")
            .or_insert_with(|| Value::String(lang.to_string()));
    }
    config
}

fn clean_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        debug!(dir = %dir.display(), "cleaning output directory");
        fs::remove_dir_all(dir).map_err(|source| BuildError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Write a rendered page below `root`, creating parent directories.
pub fn write_output(root: &Path, page: &RenderedPage) -> Result<()> {
    let path = root.join(page.output_path.trim_start_matches('/'));
    let io_err = |source| BuildError::Write {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(&path, &page.content).map_err(io_err)?;

    debug!(path = %path.display(), "wrote page");
    Ok(())
}
