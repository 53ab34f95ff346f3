//! Check command - validate configuration and content

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, bail};
use folio_core::{ConfigSet, Document};
use folio_generator::{BuildSettings, Builder, paginate, render::FEED_LAYOUT, template};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub documents: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Run the check command.
///
/// Validates configuration and all content files.
pub fn run(config_dir: &Path, root: &Path, strict: bool) -> Result<()> {
    tracing::info!(?config_dir, ?root, strict, "Checking configuration and content");

    println!("Checking configuration...");
    let configs = ConfigSet::load(config_dir).wrap_err("Failed to load configuration")?;
    println!("  ✓ Configuration valid");

    println!("\nChecking content files...");
    let result = validate(&configs, root)?;
    println!("  {} document(s) loaded", result.documents);

    // Print summary
    println!();
    println!("Summary:");
    println!("  Errors:   {}", result.errors.len());
    println!("  Warnings: {}", result.warnings.len());

    if result.has_errors() {
        println!();
        println!("Errors:");
        for err in &result.errors {
            println!("  ✗ {err}");
        }
    }

    if result.has_warnings() {
        println!();
        println!("Warnings:");
        for warn in &result.warnings {
            println!("  ⚠ {warn}");
        }
    }

    // Determine exit status
    if result.has_errors() {
        bail!("Validation failed with {} error(s)", result.errors.len());
    }

    if strict && result.has_warnings() {
        bail!(
            "Validation failed with {} warning(s) (strict mode)",
            result.warnings.len()
        );
    }

    println!();
    println!("✓ All checks passed");

    Ok(())
}

/// Load every config entry's documents and report what a build would
/// reject.
///
/// Unparseable documents abort the check, as they would abort a build.
pub fn validate(configs: &ConfigSet, root: &Path) -> Result<ValidationResult> {
    let mut result = ValidationResult::default();
    let builder = Builder::new(configs.clone(), root);

    for (key, config) in configs.iter() {
        let settings = match BuildSettings::from_config(config) {
            Ok(settings) => settings,
            Err(e) => {
                result.add_error(format!("[{key}] {e}"));
                continue;
            }
        };

        let content_dir = root.join(&settings.content_dir);
        let documents = builder
            .repository(&settings)
            .load_all(&content_dir, &settings.extensions)
            .wrap_err_with(|| format!("[{key}] Failed to load documents"))?;
        result.documents += documents.len();

        if documents.is_empty() {
            result.add_warning(format!(
                "[{key}] No documents found in {}",
                content_dir.display()
            ));
        }

        let template_dir = root.join(&settings.template_dir);
        for doc in &documents {
            match doc.layout() {
                None => result.add_error(format!("[{key}] {} has no layout", doc.source_path())),
                Some(layout) => check_template(&mut result, key, &template_dir, layout),
            }
        }

        for (i, collection) in settings.collections.iter().enumerate() {
            if let Err(e) = paginate(Vec::<&Document>::new(), &collection.pagination) {
                result.add_error(format!("[{key}] collection {}: {e}", i + 1));
            } else if let Some(layout) = &collection.pagination.layout {
                check_template(&mut result, key, &template_dir, layout);
            }
        }
    }

    Ok(result)
}

fn check_template(result: &mut ValidationResult, key: &str, template_dir: &Path, layout: &str) {
    if layout == FEED_LAYOUT {
        return;
    }
    let file = template_dir.join(format!("{layout}.{}", template::TEMPLATE_EXTENSION));
    let message = format!("[{key}] template {} not found", file.display());
    if !file.exists() && !result.warnings.contains(&message) {
        result.add_warning(message);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, content).expect("write");
    }

    #[test]
    fn test_validate_reports_problems() {
        let site = tempfile::tempdir().expect("create temp dir");
        let root = site.path();
        write(
            root,
            "config/base.yaml",
            "build:\n  collections:\n    - source_path_prefix: blog\n      layout: list\n",
        );
        write(root, "templates/post.html", "{{ title }}");
        write(root, "content/a.md", "---\nlayout: post\n---\n");
        write(root, "content/b.md", "---\nlayout: missing\n---\n");
        write(root, "content/c.md", "no front matter");

        let configs = ConfigSet::load(&root.join("config")).expect("config");
        let result = validate(&configs, root).expect("validate");

        assert_eq!(result.documents, 3);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].contains("c.md has no layout"));
        assert!(result.errors[1].contains("url_prefix"));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("missing.html"));
    }

    #[test]
    fn test_validate_empty_site_warns() {
        let site = tempfile::tempdir().expect("create temp dir");
        write(site.path(), "config/base.toml", "title = \"Empty\"\n");

        let configs = ConfigSet::load(&site.path().join("config")).expect("config");
        let result = validate(&configs, site.path()).expect("validate");

        assert_eq!(result.documents, 0);
        assert!(!result.has_errors());
        assert!(result.warnings[0].contains("No documents found"));
    }

    #[test]
    fn test_run_strict_fails_on_warnings() {
        let site = tempfile::tempdir().expect("create temp dir");
        write(site.path(), "config/base.toml", "title = \"Empty\"\n");

        assert!(run(&site.path().join("config"), site.path(), false).is_ok());
        assert!(run(&site.path().join("config"), site.path(), true).is_err());
    }
}
