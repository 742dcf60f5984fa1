//! Generation-scoped file memory and bounded dependency context.

use std::collections::BTreeMap;

/// Default cap on assembled dependency context, in characters.
pub const DEFAULT_CONTEXT_CAP_CHARS: usize = 20_000;

/// Contents generated so far in one run, keyed by project-relative path.
#[derive(Debug, Default, Clone)]
pub struct FileMemory {
    entries: BTreeMap<String, String>,
}

impl FileMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: &str, content: &str) {
        self.entries.insert(path.to_string(), content.to_string());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Dependency context for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledContext {
    pub text: String,
    /// Dependencies that contributed content, in declaration order.
    pub included: Vec<String>,
    /// Dependencies with no memory entry; silently left out of `text`.
    pub missing: Vec<String>,
    /// Whether the leading part was cut to fit the cap.
    pub truncated: bool,
}

/// Concatenate memory entries for `dependencies`, keeping only the trailing
/// `cap_chars` characters when the result is longer.
pub fn assemble_context(
    memory: &FileMemory,
    dependencies: &[String],
    cap_chars: usize,
) -> AssembledContext {
    let mut text = String::new();
    let mut included = Vec::new();
    let mut missing = Vec::new();
    for dep in dependencies {
        match memory.get(dep) {
            Some(content) => {
                text.push_str(&format!("Content of {dep}:\n{content}\n\n"));
                included.push(dep.clone());
            }
            None => missing.push(dep.clone()),
        }
    }

    let (text, truncated) = keep_trailing_chars(text, cap_chars);
    AssembledContext {
        text,
        included,
        missing,
        truncated,
    }
}

fn keep_trailing_chars(text: String, cap_chars: usize) -> (String, bool) {
    let total = text.chars().count();
    if total <= cap_chars {
        return (text, false);
    }
    let skip = total - cap_chars;
    let start = text
        .char_indices()
        .nth(skip)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    (text[start..].to_string(), true)
}
