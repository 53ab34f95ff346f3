//! Per-render context and the helper functions templates can call.
//!
//! A [`RenderContext`] is built fresh for every page: the site config under
//! `config`, every page field at the top level, plus a table of helpers.
//! Helpers receive the context explicitly as their first argument.

use std::{collections::BTreeMap, fmt, fmt::Write as _, sync::Arc};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use folio_core::{BoxError, value::to_text};
use serde_json::{Map, Value};
use thiserror::Error;

/// Key under which the site config is exposed.
pub const CONFIG_KEY: &str = "config";

/// Format used by the `date` helper when none is given.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised when calling a helper.
#[derive(Debug, Error)]
pub enum HelperError {
    /// No helper is registered under this name.
    #[error("unknown helper: {0}")]
    Unknown(String),

    /// The helper itself failed.
    #[error(transparent)]
    Failed(BoxError),
}

/// A helper callable from templates.
pub type HelperFn =
    Arc<dyn Fn(&RenderContext, &[Value]) -> Result<Value, BoxError> + Send + Sync>;

/// Wrap a closure as a [`HelperFn`].
pub fn helper_fn<F>(f: F) -> HelperFn
where
    F: Fn(&RenderContext, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Named helper functions.
#[derive(Clone, Default)]
pub struct Helpers {
    table: BTreeMap<String, HelperFn>,
}

impl Helpers {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in `url`, `date` and `lang` helpers.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new()
            .with("url", helper_fn(url_helper))
            .with("date", helper_fn(date_helper))
            .with("lang", helper_fn(lang_helper))
    }

    /// Register a helper, replacing any with the same name.
    pub fn insert(&mut self, name: impl Into<String>, helper: HelperFn) {
        self.table.insert(name.into(), helper);
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, helper: HelperFn) -> Self {
        self.insert(name, helper);
        self
    }

    pub fn get(&self, name: &str) -> Option<&HelperFn> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

impl fmt::Debug for Helpers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.table.keys()).finish()
    }
}

/// Data and helpers visible while rendering one page.
#[derive(Debug, Clone)]
pub struct RenderContext {
    data: Map<String, Value>,
    helpers: Helpers,
}

impl RenderContext {
    /// Build a context from the site config and a page's fields.
    ///
    /// Page fields sit above `config` and win on a name collision.
    pub fn new(config: &Value, fields: Map<String, Value>, helpers: Helpers) -> Self {
        let mut data = Map::with_capacity(fields.len() + 1);
        data.insert(CONFIG_KEY.to_string(), config.clone());
        data.extend(fields);
        Self { data, helpers }
    }

    /// Every top-level value.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// The site config.
    pub fn config(&self) -> &Value {
        self.data.get(CONFIG_KEY).unwrap_or(&Value::Null)
    }

    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    /// Resolve a dotted path such as `config.title` or `documents.0.url`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        lookup_in(&self.data, path)
    }

    /// Resolve a top-level string field.
    pub fn str_field(&self, path: &str) -> Option<&str> {
        self.lookup(path).and_then(Value::as_str)
    }

    /// Call the helper `name` with `args`.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, HelperError> {
        let helper = self
            .helpers
            .get(name)
            .ok_or_else(|| HelperError::Unknown(name.to_string()))?;
        helper(self, args).map_err(HelperError::Failed)
    }
}

/// Resolve a dotted path inside a mapping. Numeric segments index sequences.
pub fn lookup_in<'v>(root: &'v Map<String, Value>, path: &str) -> Option<&'v Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    segments.try_fold(root.get(first)?, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// `url [path]`: join `config.base_url` with a site path, defaulting to the
/// page's own `url`.
fn url_helper(ctx: &RenderContext, args: &[Value]) -> Result<Value, BoxError> {
    let path = match args.first() {
        Some(value) => to_text(value),
        None => ctx.str_field("url").unwrap_or("/").to_string(),
    };
    let base = ctx.str_field("config.base_url").unwrap_or_default();

    if path.contains("://") {
        return Ok(Value::String(path));
    }
    Ok(Value::String(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )))
}

/// `date value [format]`: reformat an RFC 3339 or `YYYY-MM-DD` value.
fn date_helper(_ctx: &RenderContext, args: &[Value]) -> Result<Value, BoxError> {
    let raw = match args.first() {
        None | Some(Value::Null) => return Ok(Value::String(String::new())),
        Some(value) => to_text(value),
    };
    let format = args
        .get(1)
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_DATE_FORMAT);

    let datetime = parse_date(&raw).ok_or_else(|| format!("unrecognized date: {raw}"))?;

    let mut out = String::new();
    write!(out, "{}", datetime.format(format))
        .map_err(|_| format!("invalid date format: {format}"))?;
    Ok(Value::String(out))
}

/// `lang`: the current language code from `config.lang`.
fn lang_helper(ctx: &RenderContext, _args: &[Value]) -> Result<Value, BoxError> {
    Ok(Value::String(
        ctx.str_field("config.lang").unwrap_or_default().to_string(),
    ))
}

/// Parse the date formats front matter commonly uses.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
