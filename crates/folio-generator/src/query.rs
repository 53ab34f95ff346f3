//! Filtering, ordering and grouping document collections.
//!
//! Every operation takes document references and returns new collections of
//! the same references. Documents themselves are never touched.

use std::{cmp::Ordering, fmt, str::FromStr, sync::Arc};

use folio_core::{
    Document,
    value::{compare, is_truthy, to_text},
};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};

/// Test applied to a single field value. `None` means the field is absent.
pub type FieldTest = Arc<dyn Fn(Option<&Value>) -> bool + Send + Sync>;

/// Computes a group key for a document.
pub type KeyFn = Arc<dyn Fn(&Document) -> Option<Value> + Send + Sync>;

/// One condition on one field.
#[derive(Clone)]
pub enum Predicate {
    /// The field equals this value. `Value::Null` also matches an absent field.
    Equals(Value),
    /// The field's text form matches this pattern. Absent fields match as `""`.
    Matches(Regex),
    /// The field passes this test.
    Test(FieldTest),
}

impl Predicate {
    fn accepts(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Equals(expected) => value.unwrap_or(&Value::Null) == expected,
            Self::Matches(pattern) => pattern.is_match(&value.map(to_text).unwrap_or_default()),
            Self::Test(test) => test(value),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
            Self::Matches(pattern) => f.debug_tuple("Matches").field(&pattern.as_str()).finish(),
            Self::Test(_) => f.write_str("Test(..)"),
        }
    }
}

/// A set of field predicates; a document passes when all of them hold.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    predicates: IndexMap<String, Predicate>,
}

impl Filter {
    /// A filter that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an equality-only filter from a literal mapping, as found in
    /// configuration files.
    pub fn from_literals(literals: &Map<String, Value>) -> Self {
        literals
            .iter()
            .fold(Self::new(), |filter, (field, value)| filter.eq(field, value.clone()))
    }

    /// Require `field` to equal `value`.
    #[must_use]
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Predicate::Equals(value.into()))
    }

    /// Require the text of `field` to match `pattern`.
    #[must_use]
    pub fn matches(self, field: impl Into<String>, pattern: Regex) -> Self {
        self.with(field, Predicate::Matches(pattern))
    }

    /// Require `field` to pass `test`.
    #[must_use]
    pub fn test<F>(self, field: impl Into<String>, test: F) -> Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.with(field, Predicate::Test(Arc::new(test)))
    }

    /// Set the predicate for `field`, replacing any earlier one.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, predicate: Predicate) -> Self {
        self.predicates.insert(field.into(), predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Whether `doc` satisfies every predicate.
    pub fn accepts(&self, doc: &Document) -> bool {
        self.predicates
            .iter()
            .all(|(field, predicate)| predicate.accepts(doc.get(field)))
    }
}

/// Keep the documents accepted by `filter`, in input order.
pub fn filter<'a>(
    documents: impl IntoIterator<Item = &'a Document>,
    filter: &Filter,
) -> Vec<&'a Document> {
    documents
        .into_iter()
        .filter(|doc| filter.accepts(doc))
        .collect()
}

/// One ordering key: a field name and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    /// Ascending key on `field`.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    /// Descending key on `field`.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// `"date"` sorts ascending, `"-date"` descending.
    pub fn parse(key: &str) -> Self {
        match key.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(key.strip_prefix('+').unwrap_or(key)),
        }
    }

    fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ord = compare(a.get(&self.field), b.get(&self.field));
        if self.descending { ord.reverse() } else { ord }
    }
}

impl FromStr for SortKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Parse a list of `field` / `-field` strings into sort keys.
pub fn sort_keys<S: AsRef<str>>(keys: &[S]) -> Vec<SortKey> {
    keys
        .iter()
        .map(|key| SortKey::parse(key.as_ref()))
        .collect()
}

/// Stable multi-key sort. Keys apply left to right as primary, secondary
/// and so on; documents equal under every key keep their input order.
pub fn order<'a>(
    documents: impl IntoIterator<Item = &'a Document>,
    keys: &[SortKey],
) -> Vec<&'a Document> {
    let mut sorted: Vec<&Document> = documents.into_iter().collect();
    sorted.sort_by(|a, b| {
        keys.iter()
            .map(|key| key.compare(a, b))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    sorted
}

/// What to group documents by.
#[derive(Clone)]
pub enum GroupBy {
    /// The value of a field.
    Field(String),
    /// A key computed per document.
    Key(KeyFn),
}

impl GroupBy {
    /// Group by a computed key.
    pub fn key<F>(f: F) -> Self
    where
        F: Fn(&Document) -> Option<Value> + Send + Sync + 'static,
    {
        Self::Key(Arc::new(f))
    }

    fn value_of(&self, doc: &Document) -> Option<Value> {
        match self {
            Self::Field(field) => doc.get(field).cloned(),
            Self::Key(f) => f(doc),
        }
    }
}

impl From<&str> for GroupBy {
    fn from(field: &str) -> Self {
        Self::Field(field.to_string())
    }
}

impl fmt::Debug for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => f.debug_tuple("Field").field(field).finish(),
            Self::Key(_) => f.write_str("Key(..)"),
        }
    }
}

/// Partition documents by key, in order of first appearance.
///
/// A sequence value puts the document under each of its elements. Falsy
/// keys (absent, `null`, `false`, `0`, `""`) are left out of every group.
pub fn group<'a>(
    documents: impl IntoIterator<Item = &'a Document>,
    by: &GroupBy,
) -> IndexMap<String, Vec<&'a Document>> {
    let mut groups: IndexMap<String, Vec<&Document>> = IndexMap::new();

    for doc in documents {
        let Some(value) = by.value_of(doc) else {
            continue;
        };
        let keys = match value {
            Value::Array(items) => items,
            single => vec![single],
        };

        let mut seen: Vec<String> = Vec::with_capacity(keys.len());
        for key in keys.iter().filter(|k| is_truthy(k)).map(to_text) {
            if seen.contains(&key) {
                continue;
            }
            groups.entry(key.clone()).or_default().push(doc);
            seen.push(key);
        }
    }

    groups
}
