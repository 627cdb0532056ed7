///
/// This module implements the CLI interface for docs-sync: command parsing, argument
/// overrides, and the async entrypoint used by both `main()` and integration tests.
///
/// All pipeline logic (checkout, normalization, publishing) lives in `docs-sync-core`.
/// This module is strictly CLI glue.
///
/// ## How To Use
/// - Run `docs-sync` (or `docs-sync sync`) in the project root next to `docs-sync.yaml`.
/// - Use `docs-sync normalize <dir> --dry-run` to preview prefix stripping on a local tree.
/// - For programmatic use: call [`run`] with a constructed [`Cli`].
///
use crate::load_config::{load_config, Overrides, DEFAULT_CONFIG_FILE};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docs_sync_core::normalize::{apply_plan, plan_renames};
use docs_sync_core::runner::SystemRunner;
use docs_sync_core::synchronise::synchronise;
use std::path::PathBuf;

/// CLI for docs-sync: mirror an upstream docs subtree into this project.
#[derive(Parser)]
#[clap(
    name = "docs-sync",
    version,
    about = "Mirror a subtree of an upstream git repository into a local docs content directory"
)]
pub struct Cli {
    /// Defaults to `sync` with the default config file.
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the configured subtree, normalize names and replace the destination
    Sync(SyncArgs),
    /// Strip ordering prefixes from every name below a local directory
    Normalize {
        /// Directory to normalize in place
        dir: PathBuf,
        /// Print the rename plan without touching the filesystem
        #[clap(long)]
        dry_run: bool,
    },
}

#[derive(Args, Default)]
pub struct SyncArgs {
    /// Path to the YAML config file
    #[clap(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
    /// Override `source.repo_url`
    #[clap(long)]
    pub repo_url: Option<String>,
    /// Override `source.subtree_path`
    #[clap(long)]
    pub subtree: Option<String>,
    /// Override `source.reference` (branch or tag)
    #[clap(long)]
    pub reference: Option<String>,
    /// Override `cache_dir`
    #[clap(long)]
    pub cache_dir: Option<PathBuf>,
    /// Override `dest_dir`
    #[clap(long)]
    pub dest_dir: Option<PathBuf>,
    /// Print the run report as JSON
    #[clap(long)]
    pub json: bool,
}

impl SyncArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            repo_url: self.repo_url.clone(),
            subtree_path: self.subtree.clone(),
            reference: self.reference.clone(),
            cache_dir: self.cache_dir.clone(),
            dest_dir: self.dest_dir.clone(),
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let command = cli.command.unwrap_or_else(|| {
        Commands::Sync(SyncArgs {
            config: PathBuf::from(DEFAULT_CONFIG_FILE),
            ..SyncArgs::default()
        })
    });

    match command {
        Commands::Sync(args) => run_sync(args).await,
        Commands::Normalize { dir, dry_run } => run_normalize(dir, dry_run),
    }
}

async fn run_sync(args: SyncArgs) -> Result<()> {
    let config = load_config(&args.config, &args.overrides())?;
    tracing::info!(command = "sync", "Starting synchronisation process");

    let runner = SystemRunner::new(config.git_program.clone());
    match synchronise(&config, &runner).await {
        Ok(report) => {
            tracing::info!(command = "sync", ?report, "Synchronisation complete");
            if args.json {
                let json = serde_json::to_string_pretty(&report)
                    .context("Failed to serialize sync report")?;
                println!("{json}");
            } else {
                println!(
                    "Synchronised {} files ({} renamed) into {}",
                    report.files,
                    report.renamed,
                    report.destination.display()
                );
                println!("digest: {}", report.digest);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "sync", error = %e, "Synchronisation failed");
            Err(anyhow::Error::new(e).context("Synchronisation failed"))
        }
    }
}

fn run_normalize(dir: PathBuf, dry_run: bool) -> Result<()> {
    tracing::info!(command = "normalize", dir = %dir.display(), dry_run, "Normalizing directory");
    let plan = plan_renames(&dir)
        .with_context(|| format!("Failed to plan renames under {}", dir.display()))?;

    for rename in &plan.renames {
        println!(
            "{} -> {}",
            rename.from.display(),
            rename.normalized_path().display()
        );
    }

    if dry_run {
        println!("{} renames planned (dry run)", plan.len());
        return Ok(());
    }

    apply_plan(&dir, &plan)
        .with_context(|| format!("Failed to apply renames under {}", dir.display()))?;
    println!("{} entries renamed", plan.len());
    Ok(())
}
