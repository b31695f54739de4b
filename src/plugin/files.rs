//! Plugin file tree operations
//!
//! Host-side copying and walking for deploys and backups. Walks skip `.git`
//! but deliberately ignore `.gitignore` rules: a deploy must ship exactly
//! what is on disk, not what git would commit.

use ignore::{overrides::OverrideBuilder, WalkBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FilesError {
    #[error("source path does not exist: {0}")]
    SourceMissing(PathBuf),

    #[error("walk error under {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn walker(root: &Path) -> Result<ignore::Walk, FilesError> {
    let mut overrides = OverrideBuilder::new(root);
    overrides.add("!.git/").map_err(|source| FilesError::Walk {
        path: root.to_path_buf(),
        source,
    })?;
    let overrides = overrides.build().map_err(|source| FilesError::Walk {
        path: root.to_path_buf(),
        source,
    })?;

    Ok(WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .overrides(overrides)
        .build())
}

/// All regular files under `root`, as paths relative to it, sorted
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>, FilesError> {
    if !root.exists() {
        return Err(FilesError::SourceMissing(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in walker(root)? {
        let entry = entry.map_err(|source| FilesError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            files.push(rel);
        }
    }
    files.sort();
    Ok(files)
}

/// Copies the file tree at `src` into `dst`, overwriting existing files
pub fn copy_tree(src: &Path, dst: &Path) -> Result<usize, FilesError> {
    let files = list_files(src)?;

    for rel in &files {
        let from = src.join(rel);
        let to = dst.join(rel);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|source| FilesError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::copy(&from, &to).map_err(|source| FilesError::Io {
            path: to.clone(),
            source,
        })?;
    }

    debug!(
        src = %src.display(),
        dst = %dst.display(),
        files = files.len(),
        "Copied plugin tree"
    );
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed_tree(dir: &Path) {
        fs::create_dir_all(dir.join("includes")).unwrap();
        fs::create_dir_all(dir.join(".git")).unwrap();
        fs::write(dir.join("webp-safe-migrator.php"), "<?php // main").unwrap();
        fs::write(dir.join("includes/admin.php"), "<?php // admin").unwrap();
        fs::write(dir.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        fs::write(dir.join(".gitignore"), "includes/\n").unwrap();
    }

    #[test]
    fn test_list_skips_git_dir_but_not_gitignored_files() {
        let dir = TempDir::new().unwrap();
        seed_tree(dir.path());

        let files = list_files(dir.path()).unwrap();
        assert!(files.contains(&PathBuf::from("webp-safe-migrator.php")));
        // gitignore rules must NOT apply to deploys
        assert!(files.contains(&PathBuf::from("includes/admin.php")));
        assert!(!files.iter().any(|f| f.starts_with(".git")));
    }

    #[test]
    fn test_copy_tree_overwrites() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        seed_tree(src.path());
        fs::write(dst.path().join("webp-safe-migrator.php"), "stale").unwrap();

        let copied = copy_tree(src.path(), dst.path()).unwrap();
        assert!(copied >= 3);
        let main = fs::read_to_string(dst.path().join("webp-safe-migrator.php")).unwrap();
        assert_eq!(main, "<?php // main");
    }

    #[test]
    fn test_missing_source_errors() {
        let err = list_files(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, FilesError::SourceMissing(_)));
    }
}
