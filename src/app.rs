// Declare modules
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod expander;
pub mod formatter;
pub mod fs;
pub mod models;
pub mod resolver;

use anyhow::{Context, Result};
use clap::Parser;

use self::cli::{Cli, Command, InstallArgs};
use self::config::resolve_config;
use self::executor::{removal_targets, Executor};
use self::formatter::OutputGenerator;
use self::fs::{DiskFs, FileSystem};
use self::resolver::Resolver;

/// Parses args, sets up logging and runs the chosen command against the real disk.
pub fn run() -> Result<()> {
    let args = Cli::parse();
    init_logger(&args);
    execute(args, &DiskFs)
}

fn init_logger(args: &Cli) {
    let level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

/// Orchestrates config -> resolution -> output or execution.
pub fn execute<F: FileSystem + ?Sized>(args: Cli, fs: &F) -> Result<()> {
    // 1. Resolve Configuration
    let config = resolve_config(&args.config)?;

    if config.manifest.is_empty() {
        log::warn!("No libraries configured under `source`; nothing to do.");
    }

    // 2. Resolve operations
    let ops = Resolver::new(&config, fs)
        .resolve_manifest()
        .context("Failed to resolve file operations")?;

    // 3. List or install
    match args.command.unwrap_or_else(|| Command::Install(InstallArgs::default())) {
        Command::List(list) => {
            let output = if list.json {
                OutputGenerator::generate_json(&ops)?
            } else {
                OutputGenerator::generate_lines(&ops, &config.source_directory)
            };
            println!("{}", output);
        }
        Command::Install(install) => {
            let remove = if install.remove {
                removal_targets(&config, &ops)
            } else {
                Vec::new()
            };

            let summary = Executor::new(fs)
                .dry_run(install.dry_run)
                .jobs(install.jobs)
                .run(&ops, &remove)
                .context("Install aborted")?;

            if install.dry_run {
                log::info!("Dry run: {} file(s) would be copied", summary.copied);
            } else {
                log::info!(
                    "Copied {} file(s), removed {} package folder(s)",
                    summary.copied,
                    summary.removed
                );
            }
        }
    }

    Ok(())
}
