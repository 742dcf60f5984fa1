//! Interactive loop: each non-blank line is a new-project prompt.

use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

pub const PROMPT: &str = "DevAgent > ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplAction<'a> {
    Exit,
    Ignore,
    Run(&'a str),
}

/// Classify one input line.
pub fn parse_line(line: &str) -> ReplAction<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        ReplAction::Ignore
    } else if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
        ReplAction::Exit
    } else {
        ReplAction::Run(trimmed)
    }
}

/// Read prompts until `exit`/`quit`, Ctrl-C, or Ctrl-D, passing each to `handle`.
///
/// An error from `handle` is printed and the loop continues.
pub fn run_repl(mut handle: impl FnMut(&str) -> Result<()>) -> Result<()> {
    let mut editor = DefaultEditor::new().context("initialize line editor")?;
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => match parse_line(&line) {
                ReplAction::Exit => break,
                ReplAction::Ignore => continue,
                ReplAction::Run(prompt) => {
                    if let Err(err) = editor.add_history_entry(prompt) {
                        debug!(err = %err, "history entry not recorded");
                    }
                    if let Err(err) = handle(prompt) {
                        eprintln!("error: {err:#}");
                    }
                }
            },
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                debug!("repl input closed");
                break;
            }
            Err(err) => return Err(err).context("read repl input"),
        }
    }
    println!("Goodbye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_words_are_case_insensitive() {
        assert_eq!(parse_line("exit"), ReplAction::Exit);
        assert_eq!(parse_line("  QUIT \n"), ReplAction::Exit);
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_line(""), ReplAction::Ignore);
        assert_eq!(parse_line(" \t "), ReplAction::Ignore);
    }

    #[test]
    fn other_lines_run_trimmed() {
        assert_eq!(
            parse_line("  a todo app with sqlite "),
            ReplAction::Run("a todo app with sqlite")
        );
        assert_eq!(parse_line("exit now"), ReplAction::Run("exit now"));
    }
}
