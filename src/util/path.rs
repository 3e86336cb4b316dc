use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Expand environment variables in a path string.
///
/// Supports `$VAR`, `${VAR}` and `~` via the shellexpand crate.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

pub fn is_tree_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml")
}

/// Collect tree files: `path` itself when it is a file, otherwise every
/// `*.toml` below it, sorted.
pub fn collect_tree_files(path: &Path) -> std::io::Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no such file or directory: {}", path.display()),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path) {
        let entry = entry.map_err(std::io::Error::other)?;
        if entry.file_type().is_file() && is_tree_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
