//! Default template engine.
//!
//! A lightweight mustache-style engine rather than a full template language:
//!
//! - `{{ title }}`, `{{ config.nav.home }}`: value lookup, missing is an error
//! - `{{ description? }}`: optional lookup, missing renders as nothing
//! - `{{ date published "%B %Y" }}`: helper call with path or literal arguments
//! - `{{#each documents}}..{{/each}}`: loop, item fields shadow the page's
//!   and `{{ this }}` is the item itself
//! - `{{#if next_url}}..{{else}}..{{/if}}`: conditional on truthiness
//!
//! Output is inserted verbatim, without HTML escaping.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use folio_core::{
    path,
    value::{is_truthy, to_text},
};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::{
    context::{HelperError, RenderContext, lookup_in},
    render::{TemplateFn, template_fn},
};

/// Extension of template files read by [`TemplateRegistry::load`].
pub const TEMPLATE_EXTENSION: &str = "html";

/// Template rendering errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Missing required variable.
    #[error("missing required variable `{variable}` in template {template}")]
    MissingVariable { template: String, variable: String },

    /// Template not found.
    #[error("template not found: {0}")]
    NotFound(String),

    /// Invalid template syntax.
    #[error("invalid template syntax in {template}: {message}")]
    InvalidSyntax { template: String, message: String },

    /// `{{#each}}` over something that is not a sequence.
    #[error("cannot iterate over `{path}` in template {template}: not a sequence")]
    NotIterable { template: String, path: String },

    /// A helper call failed.
    #[error(transparent)]
    Helper(#[from] HelperError),

    /// Template file could not be read.
    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template directory traversal failed.
    #[error("failed to walk template directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Expr(Expr),
    Each {
        path: String,
        body: Vec<Node>,
    },
    If {
        condition: Expr,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Expr {
    head: String,
    args: Vec<Arg>,
    optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Path(String),
    Literal(Value),
}

/// What closed a block while parsing.
enum Closer {
    End,
    Else,
    EndEach,
    EndIf,
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<Node>,
}

impl Template {
    /// Parse a template from source.
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self> {
        let name = name.into();
        let mut parser = Parser {
            name: &name,
            rest: source,
        };
        let (nodes, closer) = parser.block()?;
        match closer {
            Closer::End => Ok(Self { name, nodes }),
            Closer::Else => Err(parser.syntax("unexpected {{else}}")),
            Closer::EndEach => Err(parser.syntax("unexpected {{/each}}")),
            Closer::EndIf => Err(parser.syntax("unexpected {{/if}}")),
        }
    }

    /// Get the template name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the template against a page context.
    pub fn render(&self, ctx: &RenderContext) -> Result<String> {
        let mut out = String::new();
        let scope = Scope {
            template: &self.name,
            ctx,
            items: Vec::new(),
        };
        scope.render_nodes(&self.nodes, &mut out)?;
        Ok(out)
    }
}

struct Parser<'s> {
    name: &'s str,
    rest: &'s str,
}

impl Parser<'_> {
    fn syntax(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::InvalidSyntax {
            template: self.name.to_string(),
            message: message.into(),
        }
    }

    /// Parse nodes until end of input or a closing tag.
    fn block(&mut self) -> Result<(Vec<Node>, Closer)> {
        let mut nodes = Vec::new();

        loop {
            let rest = self.rest;
            let Some(start) = rest.find("{{") else {
                if !rest.is_empty() {
                    nodes.push(Node::Text(rest.to_string()));
                }
                self.rest = "";
                return Ok((nodes, Closer::End));
            };
            if start > 0 {
                nodes.push(Node::Text(rest[..start].to_string()));
            }

            let after_open = &rest[start + 2..];
            let end = after_open
                .find("}}")
                .ok_or_else(|| self.syntax("unclosed {{ delimiter"))?;
            let tag = after_open[..end].trim();
            self.rest = &after_open[end + 2..];

            match tag {
                "else" => return Ok((nodes, Closer::Else)),
                "/each" => return Ok((nodes, Closer::EndEach)),
                "/if" => return Ok((nodes, Closer::EndIf)),
                _ => {}
            }

            if let Some(path) = tag.strip_prefix("#each") {
                let path = path.trim();
                if path.is_empty() {
                    return Err(self.syntax("{{#each}} needs a path"));
                }
                let (body, closer) = self.block()?;
                if !matches!(closer, Closer::EndEach) {
                    return Err(self.syntax(format!("unclosed {{{{#each {path}}}}}")));
                }
                nodes.push(Node::Each {
                    path: path.to_string(),
                    body,
                });
            } else if let Some(condition) = tag.strip_prefix("#if") {
                let condition = self.expr(condition.trim())?;
                let (then, closer) = self.block()?;
                let otherwise = match closer {
                    Closer::EndIf => Vec::new(),
                    Closer::Else => {
                        let (otherwise, closer) = self.block()?;
                        if !matches!(closer, Closer::EndIf) {
                            return Err(self.syntax("unclosed {{#if}}"));
                        }
                        otherwise
                    }
                    _ => return Err(self.syntax("unclosed {{#if}}")),
                };
                nodes.push(Node::If {
                    condition,
                    then,
                    otherwise,
                });
            } else {
                nodes.push(Node::Expr(self.expr(tag)?));
            }
        }
    }

    fn expr(&self, tag: &str) -> Result<Expr> {
        let mut words = split_words(tag).map_err(|m| self.syntax(m))?.into_iter();
        let head = words.next().ok_or_else(|| self.syntax("empty {{ }} tag"))?;
        let (head, optional) = match head.strip_suffix('?') {
            Some(stripped) => (stripped.to_string(), true),
            None => (head, false),
        };
        let args = words.map(|word| parse_arg(&word)).collect();

        Ok(Expr {
            head,
            args,
            optional,
        })
    }
}

/// Split a tag on whitespace, keeping double-quoted strings whole.
fn split_words(tag: &str) -> std::result::Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut chars = tag.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut word = String::new();
        if c == '"' {
            word.push(c);
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            word.push(escaped);
                        }
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    c => word.push(c),
                }
            }
            if !closed {
                return Err(format!("unterminated string in `{tag}`"));
            }
            word.push('"');
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                word.push(c);
                chars.next();
            }
        }
        words.push(word);
    }

    Ok(words)
}

fn parse_arg(word: &str) -> Arg {
    if let Some(s) = word.strip_prefix('"').and_then(|w| w.strip_suffix('"')) {
        return Arg::Literal(Value::String(s.to_string()));
    }
    match word {
        "true" => Arg::Literal(Value::Bool(true)),
        "false" => Arg::Literal(Value::Bool(false)),
        "null" => Arg::Literal(Value::Null),
        _ => match serde_json::from_str::<serde_json::Number>(word) {
            Ok(n) => Arg::Literal(Value::Number(n)),
            Err(_) => Arg::Path(word.to_string()),
        },
    }
}

/// Evaluation state: the page context plus the stack of `{{#each}}` items.
struct Scope<'r> {
    template: &'r str,
    ctx: &'r RenderContext,
    items: Vec<&'r Value>,
}

impl<'r> Scope<'r> {
    fn render_nodes(&self, nodes: &'r [Node], out: &mut String) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Expr(expr) => {
                    let value = self.eval(expr)?;
                    out.push_str(&value.map(|v| to_text(&v)).unwrap_or_default());
                }
                Node::Each { path, body } => self.render_each(path, body, out)?,
                Node::If {
                    condition,
                    then,
                    otherwise,
                } => {
                    let optional = Expr {
                        optional: true,
                        ..condition.clone()
                    };
                    let holds = self.eval(&optional)?.is_some_and(|v| condition_holds(&v));
                    self.render_nodes(if holds { then } else { otherwise }, out)?;
                }
            }
        }
        Ok(())
    }

    fn render_each(&self, path: &str, body: &'r [Node], out: &mut String) -> Result<()> {
        let Some(value) = self.resolve(path) else {
            return Ok(());
        };
        let items = match value {
            Value::Null => return Ok(()),
            Value::Array(items) => items,
            _ => {
                return Err(TemplateError::NotIterable {
                    template: self.template.to_string(),
                    path: path.to_string(),
                });
            }
        };

        for item in items {
            let mut stack = self.items.clone();
            stack.push(item);
            let inner = Scope {
                template: self.template,
                ctx: self.ctx,
                items: stack,
            };
            inner.render_nodes(body, out)?;
        }
        Ok(())
    }

    /// Value of a path: innermost loop item first, then the page context.
    fn resolve(&self, path: &str) -> Option<&'r Value> {
        for &item in self.items.iter().rev() {
            if path == "this" {
                return Some(item);
            }
            let nested = path.strip_prefix("this.").unwrap_or(path);
            if let Value::Object(map) = item
                && let Some(found) = lookup_in(map, nested)
            {
                return Some(found);
            }
        }
        self.ctx.lookup(path)
    }

    /// Evaluate an expression; `Ok(None)` means an optional value was missing.
    fn eval(&self, expr: &Expr) -> Result<Option<Value>> {
        if expr.args.is_empty()
            && let Some(value) = self.resolve(&expr.head)
        {
            return Ok(Some(value.clone()));
        }

        if self.ctx.helpers().contains(&expr.head) {
            let args: Vec<Value> = expr
                .args
                .iter()
                .map(|arg| match arg {
                    Arg::Literal(value) => value.clone(),
                    Arg::Path(path) => self.resolve(path).cloned().unwrap_or(Value::Null),
                })
                .collect();
            return Ok(Some(self.ctx.call(&expr.head, &args)?));
        }

        if !expr.args.is_empty() {
            return Err(HelperError::Unknown(expr.head.clone()).into());
        }
        if expr.optional {
            return Ok(None);
        }
        Err(TemplateError::MissingVariable {
            template: self.template.to_string(),
            variable: expr.head.clone(),
        })
    }
}

/// `{{#if}}` truthiness: like field truthiness, but an empty sequence is false.
fn condition_holds(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        other => is_truthy(other),
    }
}

/// Templates loaded from a directory, keyed by relative path without
/// extension (`post`, `partials/card`).
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every `.html` file under `dir`. A missing directory yields an
    /// empty registry.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut registry = Self::new();
        if !dir.exists() {
            debug!(dir = %dir.display(), "template directory not found");
            return Ok(registry);
        }

        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(dir)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if path::extension(&relative) != Some(TEMPLATE_EXTENSION) {
                continue;
            }

            let source = fs::read_to_string(entry.path()).map_err(|source| TemplateError::Read {
                path: entry.path().to_path_buf(),
                source,
            })?;
            let name = path::remove_extension(&relative);
            registry.register(Template::parse(name, &source)?);
        }

        debug!(count = registry.len(), dir = %dir.display(), "loaded templates");
        Ok(registry)
    }

    /// Register a template.
    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Get a template by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Render a template by name. A trailing `.html` is ignored, so both
    /// `post` and `post.html` find the same template.
    pub fn render(&self, name: &str, ctx: &RenderContext) -> Result<String> {
        let key = name
            .strip_suffix(TEMPLATE_EXTENSION)
            .and_then(|n| n.strip_suffix('.'))
            .unwrap_or(name);
        let template = self
            .get(key)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        template.render(ctx)
    }

    /// Wrap this registry as a template render function.
    pub fn into_template_fn(self) -> TemplateFn {
        template_fn(move |name, ctx| Ok(self.render(name, ctx)?))
    }
}
