//! Project summary document (`README.md`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::plan::REQUIREMENTS_FILE;

pub const README_FILE: &str = "README.md";

const TREE_INDENT: &str = "   ";

/// Depth-first, name-sorted listing of `root`, skipping dot entries.
///
/// Directories carry a trailing `/`; each level indents by three spaces.
pub fn build_tree(root: &Path) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    walk(root, "", &mut lines)?;
    Ok(lines)
}

fn walk(dir: &Path, prefix: &str, lines: &mut Vec<String>) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("read directory {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("read entries of {}", dir.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            lines.push(format!("{prefix}{name}/"));
            walk(&path, &format!("{prefix}{TREE_INDENT}"), lines)?;
        } else {
            lines.push(format!("{prefix}{name}"));
        }
    }
    Ok(())
}

/// Non-empty, trimmed lines of the project's requirements file, if present.
pub fn read_dependencies(root: &Path) -> Result<Vec<String>> {
    let path = root.join(REQUIREMENTS_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents =
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn render_readme(
    project_name: &str,
    prompt: &str,
    dependencies: &[String],
    tree: &[String],
) -> String {
    let deps = if dependencies.is_empty() {
        "None".to_string()
    } else {
        dependencies.join(", ")
    };
    format!(
        "# {project_name}\n\n\
         ## Original Prompt\n\
         ```\n{prompt}\n```\n\n\
         ## Dependencies\n\
         {deps}\n\n\
         ## Project Structure\n\
         ```\n{tree}\n```\n",
        prompt = prompt.trim(),
        tree = tree.join("\n"),
    )
}

/// Write `README.md` summarizing the final state of `root`.
pub fn write_readme(root: &Path, project_name: &str, prompt: &str) -> Result<PathBuf> {
    let tree = build_tree(root)?;
    let dependencies = read_dependencies(root)?;
    let readme = render_readme(project_name, prompt, &dependencies, &tree);
    let path = root.join(README_FILE);
    fs::write(&path, readme).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
