use crate::app::error::ResolveError;
use crate::app::expander::expand;
use crate::app::fs::FileSystem;
use crate::app::models::{
    Action, Bucket, DestinationSpec, FileOperation, PackageEntries, RuntimeConfig,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Turns the manifest into a conflict-free list of copy operations.
///
/// Holds nothing but borrowed inputs; every call is a pure function of the
/// configuration and what `fs` reports.
pub struct Resolver<'a, F: FileSystem + ?Sized> {
    config: &'a RuntimeConfig,
    fs: &'a F,
}

/// `"[!]<glob>[#<folder>]"`, the left-hand side of a package entry or group.
/// For a pattern list the `glob` part is the logical filename.
#[derive(Debug, PartialEq, Eq)]
struct EntryKey<'k> {
    action: Action,
    glob: &'k str,
    folder: &'k str,
}

impl<'k> EntryKey<'k> {
    fn parse(key: &'k str) -> Self {
        let (action, rest) = match key.strip_prefix('!') {
            Some(rest) => (Action::Ignore, rest),
            None => (Action::Move, key),
        };
        let (glob, folder) = rest.split_once('#').unwrap_or((rest, ""));
        let glob = if glob.is_empty() { "*" } else { glob };
        Self {
            action,
            glob,
            folder,
        }
    }
}

impl<'a, F: FileSystem + ?Sized> Resolver<'a, F> {
    pub fn new(config: &'a RuntimeConfig, fs: &'a F) -> Self {
        Self { config, fs }
    }

    /// Resolves every library, then applies ignores and drops duplicate sources.
    ///
    /// Libraries resolve in parallel; the first failure wins and no partial
    /// list is returned. Buckets merge in declaration order, so the output is
    /// stable for identical input.
    pub fn resolve_manifest(&self) -> Result<Vec<FileOperation>, ResolveError> {
        let buckets: Vec<Bucket> = self
            .config
            .manifest
            .entries()
            .par_iter()
            .map(|(key, entries)| self.resolve_library(key, entries))
            .collect::<Result<_, _>>()?;

        let mut combined = Bucket::default();
        for bucket in buckets {
            combined.append(bucket);
        }
        log::debug!(
            "Resolved {} move(s) and {} ignore(s) before reconciliation",
            combined.moved.len(),
            combined.ignored.len()
        );
        Ok(combined.reconcile())
    }

    /// `key` is `"<name>"` or `"<name>#<folder>"`.
    pub fn resolve_library(
        &self,
        key: &str,
        entries: &PackageEntries,
    ) -> Result<Bucket, ResolveError> {
        let (name, folder) = key.split_once('#').unwrap_or((key, ""));
        let bucket = self.resolve_package(name, folder, entries, None, false)?;
        log::debug!(
            "{name}: {} move(s), {} ignore(s)",
            bucket.moved.len(),
            bucket.ignored.len()
        );
        Ok(bucket)
    }

    /// Walks the entries of one package. A nested group contributes its own
    /// entries with its folder appended to `library_folder`.
    pub fn resolve_package(
        &self,
        library: &str,
        library_folder: &str,
        entries: &PackageEntries,
        forced: Option<Action>,
        nested: bool,
    ) -> Result<Bucket, ResolveError> {
        let mut bucket = Bucket::default();

        for (key, spec) in entries.entries() {
            let entry = EntryKey::parse(key);
            let action = match forced {
                Some(Action::Ignore) => Action::Ignore,
                _ => entry.action,
            };

            match spec {
                DestinationSpec::File(name) => {
                    let files = expand(
                        self.fs,
                        &[entry.glob],
                        &self.config.packages_directory,
                        library,
                    )?;
                    let logical = if name.is_empty() {
                        file_name(Path::new(entry.glob))
                    } else {
                        name.clone()
                    };
                    bucket.append(self.resolve_entry(
                        &files,
                        &logical,
                        library_folder,
                        entry.folder,
                        action,
                    ));
                }
                DestinationSpec::Patterns(patterns) => {
                    let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
                    let files = expand(
                        self.fs,
                        &patterns,
                        &self.config.packages_directory,
                        library,
                    )?;
                    // The key names the destination here; an empty name keeps each file's own.
                    bucket.append(self.resolve_entry(
                        &files,
                        entry.glob,
                        library_folder,
                        entry.folder,
                        action,
                    ));
                }
                DestinationSpec::Group(inner) => {
                    if nested {
                        return Err(ResolveError::NestingTooDeep {
                            library: library.to_string(),
                            group: key.clone(),
                        });
                    }
                    // The group label only names the group; its folder is what counts.
                    let folder = join_folders(library_folder, entry.folder);
                    bucket.append(self.resolve_package(
                        library,
                        &folder,
                        inner,
                        Some(action),
                        true,
                    )?);
                }
            }
        }

        Ok(bucket)
    }

    /// Builds one operation per matched file and files it under `action`.
    pub fn resolve_entry(
        &self,
        files: &[PathBuf],
        logical_name: &str,
        library_folder: &str,
        file_folder: &str,
        action: Action,
    ) -> Bucket {
        let templated = logical_name.contains('*');
        let logical_stem = stem(Path::new(logical_name));
        let min = &self.config.minified;
        let mut bucket = Bucket::default();

        for file in files {
            let mut source = file.clone();
            let mut dest_stem = if templated {
                stem(file)
            } else {
                logical_stem.clone()
            };
            let ext = extension(file);

            let mut minified = is_minified(file);
            if min.prefer_minified && !minified && !min.ignored_extensions.contains(ext) {
                if let Some(sibling) = minified_sibling(file) {
                    if self.fs.exists(&sibling) {
                        source = sibling;
                        minified = true;
                        if !min.rename_to_minified {
                            dest_stem.push_str(".min");
                        }
                    }
                }
            }

            let to = self.destination(ext, minified, library_folder, file_folder);
            let rename = if ext.is_empty() {
                dest_stem
            } else {
                format!("{dest_stem}.{ext}")
            };
            bucket.push(action, FileOperation { from: source, to, rename });
        }

        bucket
    }

    /// First matching rule wins: absolute file folder, absolute library
    /// folder, then default + extension + library + file folders.
    fn destination(
        &self,
        ext: &str,
        minified: bool,
        library_folder: &str,
        file_folder: &str,
    ) -> PathBuf {
        let root = &self.config.source_directory;

        if let Some(folder) = strip_root(file_folder) {
            return join_segments(root, &[folder]);
        }
        if let Some(folder) = strip_root(library_folder) {
            return join_segments(root, &[folder, file_folder]);
        }

        let config = self.config;
        let default = if minified && !config.default_minified_folder.is_empty() {
            config.default_minified_folder.as_str()
        } else {
            config.default_folder.as_str()
        };
        let ext_folder = config
            .extension_folders
            .get(ext)
            .map_or("", String::as_str);
        join_segments(root, &[default, ext_folder, library_folder, file_folder])
    }
}

fn strip_root(folder: &str) -> Option<&str> {
    folder.strip_prefix(['/', '\\'])
}

fn join_segments(root: &Path, segments: &[&str]) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in segments {
        let segment = segment.trim_start_matches(['/', '\\']);
        if !segment.is_empty() {
            path.push(segment);
        }
    }
    path
}

fn join_folders(outer: &str, inner: &str) -> String {
    if inner.is_empty() {
        outer.to_string()
    } else if outer.is_empty() || strip_root(inner).is_some() {
        inner.to_string()
    } else {
        format!("{}/{}", outer.trim_end_matches(['/', '\\']), inner)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("")
}

fn is_minified(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(".min") || s.contains(".min."))
}

fn minified_sibling(path: &Path) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    Some(path.with_file_name(format!("{stem}.min.{ext}")))
}
