//! Filesystem helpers scoped to a project root.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

/// Create the project root under `base_dir` (idempotent).
pub fn create_project_root(base_dir: &Path, project_name: &str) -> Result<PathBuf> {
    let root = base_dir.join(project_name);
    fs::create_dir_all(&root)
        .with_context(|| format!("create project root {}", root.display()))?;
    debug!(root = %root.display(), "project root ready");
    Ok(root)
}

/// Resolve a plan-relative path inside `root`.
///
/// Absolute paths and `..` components are refused so that no step writes
/// outside the project.
pub fn resolve_in_root(root: &Path, relative: &str) -> Result<PathBuf> {
    let candidate = Path::new(relative.trim());
    if candidate.as_os_str().is_empty() {
        return Err(anyhow!("path must be non-empty"));
    }
    for component in candidate.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(anyhow!("path '{relative}' escapes the project root"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(anyhow!("path '{relative}' must be relative"));
            }
        }
    }
    Ok(root.join(candidate))
}

/// Create a directory and its parents inside `root`.
pub fn create_dir_in_root(root: &Path, relative: &str) -> Result<PathBuf> {
    let path = resolve_in_root(root, relative)?;
    fs::create_dir_all(&path).with_context(|| format!("create directory {}", path.display()))?;
    Ok(path)
}

/// Write `contents` to a plan-relative path, creating parent directories.
pub fn write_in_root(root: &Path, relative: &str, contents: &str) -> Result<PathBuf> {
    let path = resolve_in_root(root, relative)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create parent directory {}", parent.display()))?;
    }
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
