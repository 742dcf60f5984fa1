//! Pure plan sanitization: candidate extraction, quote repair, and schema completion.
//!
//! The repair round-trip with the planner model lives in [`crate::planner`]; this
//! module only transforms text and JSON values.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::plan::{DEFAULT_PROJECT_NAME, ProjectPlan, Step, sanitize_project_name};

/// Directory path used when a `create_directory` step omits `path`.
pub const DEFAULT_DIRECTORY_PATH: &str = "subdir";
/// File path used when a `generate_file` step omits `path`.
pub const DEFAULT_FILE_PATH: &str = "app.py";
/// Instruction used when a `generate_file` step omits `prompt`.
pub const DEFAULT_FILE_PROMPT: &str =
    "Create a minimal Flask app with a '/' route returning 'Hello, World!'";

static STRING_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"((?:[^"\\]|\\.)*)""#).expect("string literal regex"));

/// Slice from the first `{` to the last `}` inclusive.
///
/// Falls back to the trimmed input when no such pair exists so that the parser
/// reports the failure.
pub fn extract_candidate(text: &str) -> &str {
    let trimmed = text.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Collapse triple-quote runs into a single double quote.
pub fn normalize_quotes(text: &str) -> String {
    text.replace("\"\"\"", "\"").replace("'''", "\"")
}

/// Escape literal line breaks inside every quoted string literal.
pub fn escape_embedded_newlines(text: &str) -> String {
    STRING_LITERAL_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let inner = caps[1].replace('\n', "\\n").replace('\r', "\\r");
            format!("\"{inner}\"")
        })
        .into_owned()
}

/// Run extraction, quote normalization, and newline escaping in order.
pub fn prepare_candidate(text: &str) -> String {
    let candidate = extract_candidate(text);
    let normalized = normalize_quotes(candidate);
    escape_embedded_newlines(&normalized)
}

/// Parse prepared text into a top-level JSON object.
pub fn parse_plan_object(prepared: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(prepared) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(err) => Err(err.to_string()),
    }
}

/// Build a fully typed plan from a parsed planner object.
pub fn complete_plan(object: &Map<String, Value>) -> ProjectPlan {
    let project_name = object
        .get("projectName")
        .and_then(Value::as_str)
        .map(sanitize_project_name)
        .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());

    let steps = object
        .get("plan")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(complete_step).collect())
        .unwrap_or_default();

    ProjectPlan {
        project_name,
        steps,
    }
}

/// Which step kind a raw entry resolves to, either declared or inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    CreateDirectory,
    GenerateFile,
    CreateRequirementsFile,
    Unknown,
}

/// Resolve the kind of a raw step object.
///
/// An explicit, non-blank `type` wins. Otherwise: `prompt` implies a generated
/// file, `dependencies` alone a requirements file, `path` alone a directory.
pub fn resolve_kind(step: &Map<String, Value>) -> StepKind {
    let declared = step
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(declared) = declared {
        return match declared.to_ascii_lowercase().as_str() {
            "create_directory" => StepKind::CreateDirectory,
            "generate_file" => StepKind::GenerateFile,
            "create_requirements_file" => StepKind::CreateRequirementsFile,
            _ => StepKind::Unknown,
        };
    }
    if step.contains_key("prompt") {
        StepKind::GenerateFile
    } else if step.contains_key("dependencies") {
        StepKind::CreateRequirementsFile
    } else if step.contains_key("path") {
        StepKind::CreateDirectory
    } else {
        StepKind::Unknown
    }
}

fn complete_step(raw: &Value) -> Step {
    let Some(step) = raw.as_object() else {
        return Step::Unknown { raw: raw.clone() };
    };
    match resolve_kind(step) {
        StepKind::CreateDirectory => Step::CreateDirectory {
            path: string_field(step, "path").unwrap_or_else(|| DEFAULT_DIRECTORY_PATH.to_string()),
        },
        StepKind::GenerateFile => Step::GenerateFile {
            path: string_field(step, "path").unwrap_or_else(|| DEFAULT_FILE_PATH.to_string()),
            prompt: string_field(step, "prompt").unwrap_or_else(|| DEFAULT_FILE_PROMPT.to_string()),
            dependencies: dedup(string_list(step, "dependencies")),
            description: string_field(step, "description"),
        },
        StepKind::CreateRequirementsFile => Step::CreateRequirementsFile {
            dependencies: string_list(step, "dependencies"),
        },
        StepKind::Unknown => Step::Unknown { raw: raw.clone() },
    }
}

fn string_field(step: &Map<String, Value>, key: &str) -> Option<String> {
    step.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(step: &Map<String, Value>, key: &str) -> Vec<String> {
    step.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
