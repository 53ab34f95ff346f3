//! Site configuration loading.
//!
//! A config folder holds one `base.<ext>` file plus any number of
//! `<language>.<ext>` files. Each language config is deep-merged over the
//! base config; languages never see each other.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
    error::{CoreError, Result},
    value::{parse_toml, type_name},
};

/// File stem of the base configuration.
pub const BASE_CONFIG: &str = "base";

/// Extensions recognized as configuration files.
pub const CONFIG_EXTENSIONS: &[&str] = &["yaml", "yml", "toml", "json"];

/// Loaded configuration: either the base config alone, or one merged
/// config per language code.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSet {
    configs: BTreeMap<String, Value>,
    multilingual: bool,
}

impl ConfigSet {
    /// Load every config file directly inside `folder`.
    pub fn load(folder: &Path) -> Result<Self> {
        if !folder.is_dir() {
            return Err(CoreError::config(format!(
                "Configuration folder not found: {}",
                folder.display()
            )));
        }

        let mut files: Vec<PathBuf> = fs::read_dir(folder)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_config_file(path))
            .collect();
        files.sort();

        let mut base = None;
        let mut languages = BTreeMap::new();

        for path in files {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let value = read_config_file(&path)?;
            debug!(path = %path.display(), "loaded config file");

            let slot = if stem == BASE_CONFIG {
                base.replace(value)
            } else {
                languages.insert(stem.to_string(), value)
            };
            if slot.is_some() {
                warn!(name = stem, path = %path.display(), "duplicate config name, later file wins");
            }
        }

        if base.is_none() && languages.is_empty() {
            warn!(dir = %folder.display(), "no configuration files found");
        }

        let set = Self::from_parts(base.unwrap_or_else(empty_mapping), languages);
        info!(languages = set.languages().len(), "configuration loaded");
        Ok(set)
    }

    /// Build the merged view from an already parsed base and language configs.
    pub fn from_parts(base: Value, languages: BTreeMap<String, Value>) -> Self {
        if languages.is_empty() {
            let mut configs = BTreeMap::new();
            configs.insert(BASE_CONFIG.to_string(), base);
            return Self {
                configs,
                multilingual: false,
            };
        }

        let configs = languages
            .into_iter()
            .map(|(code, lang)| (code, deep_merge(&base, &lang)))
            .collect();

        Self {
            configs,
            multilingual: true,
        }
    }

    /// Whether language configs were found.
    pub fn is_multilingual(&self) -> bool {
        self.multilingual
    }

    /// Language codes, empty when only the base config exists.
    pub fn languages(&self) -> Vec<&str> {
        if self.multilingual {
            self.configs.keys().map(String::as_str).collect()
        } else {
            Vec::new()
        }
    }

    /// Config for a key: a language code, or [`BASE_CONFIG`] when there are
    /// no languages.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.configs.get(key)
    }

    /// Iterate `(key, config)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.configs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

/// Recursively merge `over` onto `base`.
///
/// Mappings merge key by key with `over` winning on collision. Any other
/// value in `over`, sequences included, replaces the base value wholesale.
pub fn deep_merge(base: &Value, over: &Value) -> Value {
    match (base, over) {
        (Value::Object(base_map), Value::Object(over_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in over_map {
                let next = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, over) => over.clone(),
    }
}

fn is_config_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CONFIG_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn read_config_file(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let parsed: Value = match ext.as_str() {
        "toml" => parse_toml(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?,
        "json" => serde_json::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?,
        _ if content.trim().is_empty() => empty_mapping(),
        _ => serde_yaml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?,
    };

    match parsed {
        Value::Object(_) => Ok(parsed),
        Value::Null => Ok(empty_mapping()),
        other => Err(CoreError::config(format!(
            "Config file {} must contain a mapping, found {}",
            path.display(),
            type_name(&other)
        ))),
    }
}

fn empty_mapping() -> Value {
    Value::Object(Map::new())
}
