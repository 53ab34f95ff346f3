//! Loading documents from a content folder.

use std::{
    fs,
    path::{Path, PathBuf},
};

use folio_core::{Document, path};
use folio_parser::{DocumentParser, ParserError};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Document loading errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A matched file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("failed to walk content folder: {0}")]
    Walk(#[from] walkdir::Error),

    /// A file could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParserError),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Loads every matching source file of a folder as a [`Document`].
#[derive(Debug, Clone, Default)]
pub struct DocumentRepository {
    parser: DocumentParser,
}

impl DocumentRepository {
    /// Create a repository parsing files with `parser`.
    #[must_use]
    pub fn new(parser: DocumentParser) -> Self {
        Self { parser }
    }

    /// Relative paths (with `/` separators) of every file under `folder`
    /// whose extension is in `extensions`.
    ///
    /// Hidden files and directories are skipped. Paths come back in a stable
    /// walk order, which is not a content order.
    pub fn discover(&self, folder: &Path, extensions: &[String]) -> Result<Vec<String>> {
        if !folder.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(folder)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(folder).unwrap_or(entry.path());
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let matches = path::extension(&relative).is_some_and(|ext| {
                extensions
                    .iter()
                    .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
            });
            if matches {
                files.push(relative);
            }
        }

        Ok(files)
    }

    /// Load and parse every matching file under `folder`.
    ///
    /// The result follows discovery order. Finding no files is not an error:
    /// a warning is logged and an empty list returned.
    pub fn load_all(&self, folder: &Path, extensions: &[String]) -> Result<Vec<Document>> {
        info!(dir = %folder.display(), ?extensions, "loading documents");

        let files = self.discover(folder, extensions)?;
        if files.is_empty() {
            warn!(
                dir = %folder.display(),
                ?extensions,
                "no documents found"
            );
            return Ok(Vec::new());
        }

        let documents = files
            .par_iter()
            .map(|relative| self.load_one(folder, relative))
            .collect::<Result<Vec<_>>>()?;

        info!(count = documents.len(), "loaded documents");
        Ok(documents)
    }

    /// Load a single file, `relative` to `folder`.
    pub fn load_one(&self, folder: &Path, relative: &str) -> Result<Document> {
        let full_path = folder.join(relative);
        debug!(path = %full_path.display(), "parsing file");

        let raw = fs::read_to_string(&full_path).map_err(|source| RepositoryError::Read {
            path: full_path.clone(),
            source,
        })?;

        Ok(self.parser.parse(&raw, relative)?)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
