//! Build command - renders the site

use std::{path::Path, time::Instant};

use color_eyre::eyre::{Result, WrapErr};
use folio_core::ConfigSet;
use folio_generator::Builder;

/// Run the build command.
///
/// Loads the config folder and renders every config entry below the
/// output directory.
pub fn run(config_dir: &Path, root: &Path, output: Option<&Path>, clean: bool) -> Result<()> {
    let start = Instant::now();
    tracing::info!(?config_dir, ?root, ?output, clean, "Starting build");

    let configs = ConfigSet::load(config_dir).wrap_err("Failed to load configuration")?;
    tracing::debug!(?configs, "Loaded configuration");

    let mut builder = Builder::new(configs, root).with_clean(clean);
    if let Some(output) = output {
        builder = builder.with_output_dir(output);
    }

    let stats = builder.build().wrap_err("Build failed")?;

    let duration = start.elapsed();

    // Print build statistics
    println!();
    println!("  Build completed successfully!");
    println!();
    println!("  Languages:   {}", stats.languages);
    println!("  Documents:   {}", stats.documents);
    println!("  Pages:       {}", stats.pages);
    println!("  Collections: {}", stats.collection_pages);
    println!();
    println!("  Duration:    {:.2}s", duration.as_secs_f64());
    println!();

    tracing::info!(?stats, ?duration, "Build completed successfully");

    Ok(())
}
