//! Ordered extension-to-function lookup tables.

use std::fmt;

/// An ordered map from file extension to a pluggable function.
///
/// Lookups ignore a leading dot and ASCII case. Registration order is kept,
/// so [`ExtensionTable::first`] is well defined.
pub struct ExtensionTable<F> {
    entries: Vec<(String, F)>,
}

impl<F> ExtensionTable<F> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register `f` for `extension`, replacing an earlier entry in place.
    pub fn insert(&mut self, extension: impl AsRef<str>, f: F) {
        let key = normalize(extension.as_ref());
        match self.entries.iter_mut().find(|(ext, _)| *ext == key) {
            Some(entry) => entry.1 = f,
            None => self.entries.push((key, f)),
        }
    }

    /// Builder form of [`ExtensionTable::insert`].
    #[must_use]
    pub fn with(mut self, extension: impl AsRef<str>, f: F) -> Self {
        self.insert(extension, f);
        self
    }

    /// Function registered for `extension`.
    pub fn get(&self, extension: &str) -> Option<&F> {
        let key = normalize(extension);
        self.entries
            .iter()
            .find(|(ext, _)| *ext == key)
            .map(|(_, f)| f)
    }

    /// First registered entry.
    pub fn first(&self) -> Option<(&str, &F)> {
        self.entries.first().map(|(ext, f)| (ext.as_str(), f))
    }

    /// Registered extensions, in order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(ext, _)| ext.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F> Default for ExtensionTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Clone> Clone for ExtensionTable<F> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<F> fmt::Debug for ExtensionTable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionTable")
            .field("extensions", &self.extensions().collect::<Vec<_>>())
            .finish()
    }
}

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}
