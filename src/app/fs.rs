use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use pathdiff::diff_paths;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem capabilities the resolver and executor depend on.
///
/// Resolution only ever calls [`list`](FileSystem::list) and
/// [`exists`](FileSystem::exists); the executor uses the mutating pair.
pub trait FileSystem: Send + Sync {
    /// Files under `root` whose path relative to `root` matches `pattern`, sorted.
    /// A missing `root` lists nothing.
    fn list(&self, root: &Path, pattern: &str) -> io::Result<Vec<PathBuf>>;

    fn exists(&self, path: &Path) -> bool;

    /// Copies the bytes of `from` to `to`, creating the parent directories of `to`.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Removes `path` and everything below it. A missing `path` is not an error.
    fn remove_tree(&self, path: &Path) -> io::Result<()>;
}

/// `*` and `?` must not cross a path separator, like a shell glob.
pub fn compile_pattern(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

/// The real disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFs;

impl FileSystem for DiskFs {
    fn list(&self, root: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let matcher = compile_pattern(pattern)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        // Brace alternatives may differ in depth, so only bound plain patterns.
        let max_depth = if pattern.contains('{') {
            None
        } else {
            Some(Path::new(pattern).components().count())
        };

        // Linked files and linked library roots are listed under their link path.
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(true)
            .max_depth(max_depth)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut files = Vec::new();
        for result in walker {
            let entry = result.map_err(|err| {
                err.into_io_error()
                    .unwrap_or_else(|| io::Error::other("directory walk failed"))
            })?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Some(relative) = diff_paths(entry.path(), root) else {
                continue;
            };
            if matcher.is_match(&relative) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = fs::read(from)?;
        fs::write(to, bytes)
    }

    fn remove_tree(&self, path: &Path) -> io::Result<()> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        if !meta.is_dir() {
            return fs::remove_file(path);
        }
        // Children first; symlinked directories are unlinked, not followed.
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                self.remove_tree(&entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }
        fs::remove_dir(path)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn list_matches_single_level_without_crossing_separators() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("acme");
        touch(&root.join("a.js"));
        touch(&root.join("b.css"));
        touch(&root.join("dist/c.js"));

        let files = DiskFs.list(&root, "*.js").unwrap();
        assert_eq!(files, vec![root.join("a.js")]);

        let nested = DiskFs.list(&root, "dist/*.js").unwrap();
        assert_eq!(nested, vec![root.join("dist/c.js")]);
    }

    #[test]
    fn list_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DiskFs.list(&dir.path().join("nope"), "*").unwrap().is_empty());
    }

    #[test]
    fn list_supports_brace_alternatives() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        touch(&root.join("a.js"));
        touch(&root.join("css/b.css"));

        let files = DiskFs.list(&root, "{a.js,css/*.css}").unwrap();
        assert_eq!(files, vec![root.join("a.js"), root.join("css/b.css")]);
    }

    #[cfg(unix)]
    #[test]
    fn list_follows_symlinked_files_and_roots() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        touch(&real.join("a.js"));
        symlink("a.js", real.join("b.js")).unwrap();
        let pkgs = dir.path().join("bower_components");
        fs::create_dir_all(&pkgs).unwrap();
        let root = pkgs.join("acme");
        symlink(&real, &root).unwrap();

        let files = DiskFs.list(&root, "*.js").unwrap();
        assert_eq!(files, vec![root.join("a.js"), root.join("b.js")]);
    }

    #[test]
    fn copy_creates_destination_directories() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.js");
        fs::write(&from, b"content").unwrap();
        let to = dir.path().join("out/deep/b.js");

        DiskFs.copy(&from, &to).unwrap();
        assert_eq!(fs::read(&to).unwrap(), b"content");
    }

    #[test]
    fn remove_tree_recurses_and_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("pkgs");
        touch(&root.join("a/b/c.txt"));
        touch(&root.join("d.txt"));

        DiskFs.remove_tree(&root).unwrap();
        assert!(!root.exists());
        DiskFs.remove_tree(&root).unwrap();
    }
}
