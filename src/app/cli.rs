use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Copy the files you need out of fetched bower packages"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Copy the configured files into place (default)
    Install(InstallArgs),
    /// Print the resolved copy operations without touching disk
    List(ListArgs),
}

/// Where the configuration comes from and what to override in it.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Config file: bower.json (reads `cInstall`) or a .toml file
    #[arg(short, long, global = true, default_value = "bower.json")]
    pub config: PathBuf,

    /// Project root destinations are relative to (defaults to the config file's folder)
    #[arg(long, global = true)]
    pub source_dir: Option<PathBuf>,

    /// Folder holding fetched packages, relative to the source dir
    #[arg(long, global = true)]
    pub packages_dir: Option<PathBuf>,

    /// Prefer `.min` siblings when they exist
    #[arg(long, global = true, conflicts_with = "no_min")]
    pub min: bool,

    /// Never substitute `.min` siblings
    #[arg(long, global = true)]
    pub no_min: bool,

    /// Keep the configured name for substituted `.min` files
    #[arg(long, global = true)]
    pub rename_min: bool,
}

impl ConfigArgs {
    /// `Some` only when one of `--min` / `--no-min` was given.
    pub fn prefer_minified(&self) -> Option<bool> {
        match (self.min, self.no_min) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Delete the fetched package folders once every copy succeeded
    #[arg(short, long)]
    pub remove: bool,

    /// Log what would happen without copying or deleting
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Number of parallel copy workers
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Print operations as a JSON array
    #[arg(long)]
    pub json: bool,
}
