use crate::app::error::ExecuteError;
use crate::app::fs::FileSystem;
use crate::app::models::{FileOperation, RuntimeConfig};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Carries out resolved operations: copies first, then optional deletes.
pub struct Executor<'a, F: FileSystem + ?Sized> {
    fs: &'a F,
    dry_run: bool,
    jobs: Option<usize>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub copied: usize,
    pub removed: usize,
}

impl<'a, F: FileSystem + ?Sized> Executor<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self {
            fs,
            dry_run: false,
            jobs: None,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Upper bound on concurrent copies; `None` lets rayon decide.
    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Copies everything, then deletes `remove` only if every copy succeeded.
    pub fn run(&self, ops: &[FileOperation], remove: &[PathBuf]) -> Result<Summary, ExecuteError> {
        let copied = self.copy_all(ops)?;

        let mut removed = 0;
        for dir in remove {
            self.delete_tree(dir)?;
            removed += 1;
        }
        Ok(Summary { copied, removed })
    }

    /// Stops at the first failed copy. Copies already written stay on disk.
    pub fn copy_all(&self, ops: &[FileOperation]) -> Result<usize, ExecuteError> {
        if self.dry_run {
            for op in ops {
                log::info!("Would copy {} -> {}", op.from.display(), op.target().display());
            }
            return Ok(ops.len());
        }

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(jobs) = self.jobs {
            builder = builder.num_threads(jobs);
        }
        let pool = builder.build()?;
        pool.install(|| ops.par_iter().try_for_each(|op| self.copy_one(op)))?;
        Ok(ops.len())
    }

    fn copy_one(&self, op: &FileOperation) -> Result<(), ExecuteError> {
        let target = op.target();
        log::debug!("Copying {} -> {}", op.from.display(), target.display());
        self.fs
            .copy(&op.from, &target)
            .map_err(|source| ExecuteError::Copy {
                from: op.from.clone(),
                to: target,
                source,
            })
    }

    pub fn delete_tree(&self, path: &Path) -> Result<(), ExecuteError> {
        if self.dry_run {
            log::info!("Would delete {}", path.display());
            return Ok(());
        }
        log::debug!("Deleting {}", path.display());
        self.fs
            .remove_tree(path)
            .map_err(|source| ExecuteError::Delete {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// The fetched folder of every configured library, minus any folder that
/// holds the project root or one of the copy destinations.
pub fn removal_targets(config: &RuntimeConfig, ops: &[FileOperation]) -> Vec<PathBuf> {
    let mut targets: Vec<PathBuf> = Vec::new();

    for (key, _) in config.manifest.entries() {
        let name = key.split_once('#').map_or(key.as_str(), |(name, _)| name);
        if name.is_empty() {
            continue;
        }
        let dir = config.packages_directory.join(name);
        if targets.contains(&dir) {
            continue;
        }
        if config.source_directory.starts_with(&dir) {
            log::warn!("Not deleting {}: it contains the project root", dir.display());
            continue;
        }
        if let Some(op) = ops.iter().find(|op| op.target().starts_with(&dir)) {
            log::warn!(
                "Not deleting {}: {} is copied into it",
                dir.display(),
                op.target().display()
            );
            continue;
        }
        targets.push(dir);
    }

    targets
}
