//! Entry-point conventions and run-command selection.

/// Entry files checked in order; the first one present wins.
pub const ENTRY_CANDIDATES: [&str; 2] = ["app.py", "main.py"];

/// Framework recognized from the entry file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    FastApi,
    Flask,
    Streamlit,
    Script,
}

impl Framework {
    /// Detect the framework from file content, case-insensitively.
    ///
    /// Markers are checked in priority order, so a FastAPI app that mentions
    /// Flask in a comment still runs under uvicorn.
    pub fn detect(content: &str) -> Self {
        let lowered = content.to_lowercase();
        if lowered.contains("fastapi") {
            Framework::FastApi
        } else if lowered.contains("flask") {
            Framework::Flask
        } else if lowered.contains("streamlit") {
            Framework::Streamlit
        } else {
            Framework::Script
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Framework::FastApi => "fastapi",
            Framework::Flask => "flask",
            Framework::Streamlit => "streamlit",
            Framework::Script => "script",
        }
    }
}

/// Build the command vector that launches `entry_file` under `framework`.
pub fn run_command(framework: Framework, entry_file: &str, python: &str) -> Vec<String> {
    match framework {
        Framework::FastApi => {
            let module = entry_file.strip_suffix(".py").unwrap_or(entry_file);
            vec![
                "uvicorn".to_string(),
                format!("{module}:app"),
                "--port".to_string(),
                "8001".to_string(),
                "--timeout-keep-alive".to_string(),
                "5".to_string(),
            ]
        }
        Framework::Flask => vec![
            "flask".to_string(),
            "--app".to_string(),
            entry_file.to_string(),
            "run".to_string(),
        ],
        Framework::Streamlit => vec![
            "streamlit".to_string(),
            "run".to_string(),
            entry_file.to_string(),
        ],
        Framework::Script => vec![python.to_string(), entry_file.to_string()],
    }
}
