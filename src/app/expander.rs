use crate::app::error::ResolveError;
use crate::app::fs::{compile_pattern, FileSystem};
use std::path::{Path, PathBuf};

/// Expands `patterns` under `<base_dir>/<library>`, in pattern order.
///
/// Results are concatenated as-is; a file matched by two patterns appears
/// twice and is deduplicated later by reconciliation.
pub fn expand<F: FileSystem + ?Sized>(
    fs: &F,
    patterns: &[&str],
    base_dir: &Path,
    library: &str,
) -> Result<Vec<PathBuf>, ResolveError> {
    let root = base_dir.join(library);
    let mut files = Vec::new();

    for raw in patterns {
        let pattern = normalize(raw);
        check_supported(pattern, library)?;
        compile_pattern(pattern).map_err(|source| ResolveError::InvalidPattern {
            library: library.to_string(),
            pattern: pattern.to_string(),
            source,
        })?;

        let matched =
            fs.list(&root, pattern)
                .map_err(|source| ResolveError::PatternExpansion {
                    library: library.to_string(),
                    pattern: pattern.to_string(),
                    source,
                })?;
        log::trace!("{library}: `{pattern}` matched {} file(s)", matched.len());
        files.extend(matched);
    }

    Ok(files)
}

/// Recursive globbing (`**`) is not supported.
pub fn check_supported(pattern: &str, library: &str) -> Result<(), ResolveError> {
    if pattern.contains("**") {
        return Err(ResolveError::UnsupportedPattern {
            library: library.to_string(),
            pattern: pattern.to_string(),
        });
    }
    Ok(())
}

fn normalize(pattern: &str) -> &str {
    let mut pattern = pattern.trim();
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest;
    }
    pattern.trim_start_matches('/')
}
