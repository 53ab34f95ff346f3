//! Frontmatter splitting for source files.

use std::path::Path;

use serde_json::{Map, Value};

use crate::{
    error::{CoreError, Result},
    value::{parse_toml, type_name},
};

/// Metadata parsed from a frontmatter block.
pub type Metadata = Map<String, Value>;

/// Delimiter types for frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterFormat {
    /// YAML frontmatter delimited by `---`.
    Yaml,
    /// TOML frontmatter delimited by `+++`.
    Toml,
}

impl FrontmatterFormat {
    /// Get the delimiter string for this format.
    pub fn delimiter(&self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }
}

/// Split content into frontmatter and body.
///
/// The opening delimiter must be the first line of the file and the closing
/// delimiter must sit on a line of its own. Returns `None` when there is no
/// complete frontmatter block.
pub fn split_frontmatter(content: &str) -> Option<(FrontmatterFormat, &str, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let first_line = content.lines().next()?.trim_end();

    let format = match first_line {
        "---" => FrontmatterFormat::Yaml,
        "+++" => FrontmatterFormat::Toml,
        _ => return None,
    };
    let delimiter = format.delimiter();

    let mut offset = content.find('\n')? + 1;
    let start = offset;
    for line in content[start..].split_inclusive('\n') {
        if line.trim_end() == delimiter {
            let frontmatter = &content[start..offset];
            let body = &content[offset + line.len()..];
            return Some((format, frontmatter, body));
        }
        offset += line.len();
    }

    None
}

/// Parse the frontmatter block of `content` into metadata plus body.
///
/// A file without frontmatter yields empty metadata and the whole content as
/// body. The metadata block must be a mapping.
pub fn parse_frontmatter(content: &str, path: &Path) -> Result<(Metadata, String)> {
    let Some((format, fm_str, body)) = split_frontmatter(content) else {
        return Ok((Metadata::new(), content.to_string()));
    };

    if fm_str.trim().is_empty() {
        return Ok((Metadata::new(), body.to_string()));
    }

    let value: Value = match format {
        FrontmatterFormat::Yaml => {
            serde_yaml::from_str(fm_str).map_err(|e| CoreError::frontmatter(path, e.to_string()))?
        }
        FrontmatterFormat::Toml => {
            parse_toml(fm_str).map_err(|e| CoreError::frontmatter(path, e.to_string()))?
        }
    };

    let metadata = match value {
        Value::Object(map) => map,
        Value::Null => Metadata::new(),
        other => {
            return Err(CoreError::frontmatter(
                path,
                format!("expected a mapping, found {}", type_name(&other)),
            ));
        }
    };

    Ok((metadata, body.to_string()))
}
