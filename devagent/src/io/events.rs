//! Event sinks for pipeline progress.
//!
//! # Separation of Concerns
//!
//! - **Tracing (`logging`)**: dev diagnostics via `RUST_LOG`, output to stderr.
//! - **Events (this module)**: the product narrative a caller sees. Components
//!   only emit [`Event`] values; the sink decides how to present them.

use std::io::Write;

use tracing::{info, warn};

use crate::core::types::{CorrectionState, Event};

pub trait EventSink {
    fn emit(&self, event: Event);
}

/// Renders events as human-readable lines on stdout and mirrors them to tracing.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: Event) {
        if is_problem(&event) {
            warn!(event = ?event, "pipeline event");
        } else {
            info!(event = ?event, "pipeline event");
        }
        let mut stdout = std::io::stdout().lock();
        // A closed stdout must not abort generation.
        let _ = writeln!(stdout, "{event}");
    }
}

fn is_problem(event: &Event) -> bool {
    matches!(
        event,
        Event::StepSkipped { .. }
            | Event::AttemptFailed { .. }
            | Event::DocsFailed { .. }
            | Event::PlanRepairRequested { .. }
            | Event::CorrectionFinished(
                CorrectionState::Failed { .. } | CorrectionState::Aborted { .. }
            )
    )
}
