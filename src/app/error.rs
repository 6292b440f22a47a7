//! Typed failures for the resolution and execution phases.
//!
//! Configuration loading and the CLI boundary work in [`anyhow::Result`];
//! these enums convert into it through `?`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Resolution failures. Any one of them aborts the whole run.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(
        "Globstar `**` matching is not supported (library `{library}`, pattern `{pattern}`); \
         list each folder and its destination explicitly"
    )]
    UnsupportedPattern { library: String, pattern: String },

    #[error("Invalid glob pattern `{pattern}` in library `{library}`: {source}")]
    InvalidPattern {
        library: String,
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to expand `{pattern}` in library `{library}`: {source}")]
    PatternExpansion {
        library: String,
        pattern: String,
        #[source]
        source: io::Error,
    },

    #[error("Group `{group}` in library `{library}` nests another group; only one level is allowed")]
    NestingTooDeep { library: String, group: String },
}

/// Copy and delete failures. Completed operations are not rolled back.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to start copy workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
