//! Local-model coding agent that scaffolds a project from one prompt.
//!
//! A planner model turns the prompt into a JSON build plan; an executor model
//! writes each file; the entry point is then run and repaired in a bounded
//! loop. The crate keeps a strict separation:
//!
//! - **[`core`]**: pure, deterministic logic (sanitization, context assembly,
//!   code extraction, run-command selection). No I/O.
//! - **[`io`]**: side-effecting collaborators (HTTP inference, processes,
//!   filesystem, config). Traits at the seams so tests can script them.
//!
//! Orchestration modules ([`planner`], [`execute`], [`validate`], [`correct`],
//! [`pipeline`]) combine the two to implement CLI commands.

pub mod core;
pub mod correct;
pub mod execute;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod plan;
pub mod planner;
pub mod repl;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
