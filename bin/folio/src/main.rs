//! Folio CLI
//!
//! Turns a folder of Markdown documents into a rendered site.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for Folio.
#[derive(Parser)]
#[command(name = "folio", version, about = "A document transform pipeline")]
struct Cli {
    /// Folder holding base.<ext> and <lang>.<ext> config files
    #[arg(short, long, default_value = "config")]
    config: PathBuf,

    /// Site root; relative folders in the build settings resolve against it
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Render every document and collection
    Build {
        /// Output directory, overriding build.output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Remove the output directory before writing
        #[arg(long)]
        clean: bool,
    },
    /// Validate configuration and content without writing anything
    Check {
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    folio::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build { output, clean } => {
            folio::cmd::build::run(&cli.config, &cli.root, output.as_deref(), clean)?;
        }
        Commands::Check { strict } => {
            folio::cmd::check::run(&cli.config, &cli.root, strict)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_cli_build_command_parsing() {
        let args = ["folio", "build", "--output", "dist"];
        let cli = Cli::parse_from(args);

        assert_eq!(cli.config, PathBuf::from("config"));
        assert_eq!(cli.root, PathBuf::from("."));
        assert_eq!(cli.verbose, 0);

        match cli.command {
            Commands::Build { output, clean } => {
                assert_eq!(output, Some(PathBuf::from("dist")));
                assert!(!clean);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_build_defaults() {
        let cli = Cli::parse_from(["folio", "build", "--clean"]);

        match cli.command {
            Commands::Build { output, clean } => {
                assert!(output.is_none());
                assert!(clean);
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_check_command_parsing() {
        let args = ["folio", "check", "--strict"];
        let cli = Cli::parse_from(args);

        match cli.command {
            Commands::Check { strict } => {
                assert!(strict);
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_verbosity_flags() {
        let args = ["folio", "-vvv", "build"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn test_cli_custom_config_and_root() {
        let args = ["folio", "--config", "site/conf", "--root", "site", "check"];
        let cli = Cli::parse_from(args);
        assert_eq!(cli.config, PathBuf::from("site/conf"));
        assert_eq!(cli.root, PathBuf::from("site"));
    }
}
