mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use file_sync::{DiskFs, RepositorySource, SourceSpec, SyncOptions};
use file_sync_github::GitHubClient;
use tracing::{debug, error};

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH, load_config, resolve_config_path};

#[derive(Parser)]
#[command(name = "file-sync")]
#[command(about = "Keep local files in sync with files in remote GitHub repositories")]
struct Cli {
    /// Configuration file, relative to --root unless absolute
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Working tree that local paths are relative to
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Token used for sources without a token of their own
    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GitHub API base URL (for GitHub Enterprise)
    #[arg(long, global = true, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every configured file and write the ones that changed
    Sync {
        /// Do not create files that are missing locally
        #[arg(long)]
        skip_missing: bool,
        /// Stop at the first failure and exit nonzero if any file failed
        #[arg(long)]
        fail_on_error: bool,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the files a sync would touch, after glob expansion
    Plan {
        /// Print the task list as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_sources(cli: &Cli) -> Result<(AppConfig, Vec<SourceSpec>)> {
    let path = resolve_config_path(&cli.root, &cli.config);
    debug!(path = %path.display(), "loading configuration");

    let config = load_config(&path)?;
    let specs = config
        .source_specs(|var| std::env::var(var).ok())
        .context("failed to resolve source tokens")?;

    Ok((config, specs))
}

fn build_source(cli: &Cli) -> RepositorySource<GitHubClient> {
    RepositorySource::new(GitHubClient::new(cli.api_url.clone())).with_id("github")
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let (config, specs) = load_sources(&cli)?;
    let source = build_source(&cli);

    match cli.command {
        Command::Sync {
            skip_missing,
            fail_on_error,
            json,
        } => {
            let fail_on_error = fail_on_error || config.fail_on_error;
            let options = SyncOptions {
                default_credential: cli.token.clone(),
                create_missing: config.create_missing && !skip_missing,
                fail_fast: fail_on_error,
            };
            let fs = DiskFs::new(&cli.root);

            let summary = commands::sync::run(&specs, &source, &fs, &options, json).await?;

            if commands::sync::should_fail(&summary, fail_on_error) {
                error!(failed = summary.failed.len(), total = summary.total, "sync failed");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Plan { json } => {
            let options = SyncOptions {
                default_credential: cli.token.clone(),
                ..SyncOptions::default()
            };
            commands::plan::run(&specs, &source, &options, json).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    run(cli).await
}
