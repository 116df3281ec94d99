//! Formula CLI - single-artifact source installer
//!
//! Usage:
//!   formula install <name>         Fetch, verify, build, smoke-test
//!   formula test <binary>          Smoke-test an already-installed binary
//!   formula list                   List available formulas
//!   formula info <name>            Show formula metadata

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use formula::{output, ArtifactSource, InstallError, Pipeline, Registry, SourceMode};
use std::path::PathBuf;

/// Default formulas directory (XDG compliant)
fn default_formulas_path() -> PathBuf {
    if let Ok(path) = std::env::var("FORMULA_PATH") {
        return PathBuf::from(path);
    }

    // XDG_DATA_HOME or ~/.local/share
    let data_home = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local/share")
        });

    data_home.join("formula/formulas")
}

#[derive(Parser)]
#[command(name = "formula")]
#[command(about = "Single-artifact source installer driven by TOML formulas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the formulas directory
    #[arg(short = 'f', long, global = true)]
    formulas_path: Option<PathBuf>,

    /// Installation prefix
    #[arg(short, long, global = true, default_value = "/usr/local")]
    prefix: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, verify, build, and smoke-test a formula
    Install {
        /// Formula name
        name: String,

        /// Install a specific pinned version (default: highest released)
        #[arg(short = 'V', long)]
        version: Option<String>,

        /// Install from the head branch instead of a pinned release
        /// (skips checksum verification)
        #[arg(long)]
        head: bool,
    },

    /// Smoke-test an installed binary
    Test {
        /// Path to the binary
        binary: PathBuf,
    },

    /// List available formulas
    List,

    /// Show formula metadata
    Info {
        /// Formula name
        name: String,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        output::error(&format!("{:#}", err));
        let code = err
            .downcast_ref::<InstallError>()
            .map(|e| e.exit_code())
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let formulas_path = cli.formulas_path.unwrap_or_else(default_formulas_path);

    match cli.command {
        Commands::Install {
            name,
            version,
            head,
        } => {
            let registry = load_registry(&formulas_path)?;
            let formula = registry
                .get(&name)
                .with_context(|| format!("no formula named '{}' in {}", name, formulas_path.display()))?;

            let mode = if head {
                SourceMode::Head
            } else {
                SourceMode::Pinned
            };

            let mut pipeline = Pipeline::new(formula, version.as_deref(), mode, &cli.prefix)?;
            let result = pipeline.run()?;

            if let Some(version) = result.version {
                output::info(&format!("{} {} ready", name, version));
            } else {
                output::info(&format!("{} (head) ready", name));
            }
        }

        Commands::Test { binary } => {
            formula::smoke::smoke_test(&binary)?;
            output::success(&format!("{} passed the smoke test", binary.display()));
        }

        Commands::List => {
            let registry = load_registry(&formulas_path)?;
            if registry.is_empty() {
                output::info(&format!("no formulas in {}", formulas_path.display()));
                return Ok(());
            }
            for formula in registry.iter() {
                let versions: Vec<&str> =
                    formula.versions.keys().map(|s| s.as_str()).collect();
                let mut detail = versions.join(", ");
                if formula.head.is_some() {
                    if !detail.is_empty() {
                        detail.push_str(", ");
                    }
                    detail.push_str("head");
                }
                output::list_item(&formula.name, &detail);
            }
        }

        Commands::Info { name } => {
            let registry = load_registry(&formulas_path)?;
            let formula = registry
                .get(&name)
                .with_context(|| format!("no formula named '{}' in {}", name, formulas_path.display()))?;

            output::action(&formula.name);
            if let Some(description) = &formula.description {
                println!("  {}", description);
            }
            if let Some(homepage) = &formula.homepage {
                println!("  homepage: {}", homepage);
            }
            println!("  license:  {}", formula.license);
            if !formula.build_deps.is_empty() {
                println!("  build-deps: {}", formula.build_deps.join(", "));
            }
            for (version, pinned) in &formula.versions {
                println!("  {}: {}", version, pinned.url);
            }
            if let Some(head) = &formula.head {
                println!("  head: {} ({})", head.repo, head.branch);
            }

            // Show what a default install would pick.
            if let Ok(desc) = formula.descriptor(None, SourceMode::Pinned) {
                if let ArtifactSource::Pinned { version, .. } = desc.source {
                    println!("  default install: {}", version);
                }
            }
        }
    }

    Ok(())
}

fn load_registry(formulas_path: &std::path::Path) -> Result<Registry> {
    if !formulas_path.exists() {
        std::fs::create_dir_all(formulas_path).with_context(|| {
            format!(
                "failed to create formulas directory: {}",
                formulas_path.display()
            )
        })?;
    }
    let registry = Registry::load(formulas_path)?;
    Ok(registry)
}
