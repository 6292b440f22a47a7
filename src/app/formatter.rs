use crate::app::models::FileOperation;
use anyhow::Result;
use pathdiff::diff_paths;
use std::path::{Path, PathBuf};

pub struct OutputGenerator;

impl OutputGenerator {
    /// One `from -> target` line per operation, paths relative to `root` when possible.
    pub fn generate_lines(ops: &[FileOperation], root: &Path) -> String {
        let mut output = String::new();

        for op in ops {
            output.push_str(&format!(
                "{} -> {}\n",
                relative(&op.from, root).display(),
                relative(&op.target(), root).display()
            ));
        }

        output.trim_end().to_string()
    }

    pub fn generate_json(ops: &[FileOperation]) -> Result<String> {
        Ok(serde_json::to_string_pretty(ops)?)
    }
}

fn relative(path: &Path, root: &Path) -> PathBuf {
    diff_paths(path, root).unwrap_or_else(|| path.to_path_buf())
}
