//! Stable exit codes for devagent CLI commands.

/// Project generated and the entry point ran (or there was nothing to run).
pub const OK: i32 = 0;
/// Invalid arguments/config or any other error.
pub const INVALID: i32 = 1;
/// The planner was unreachable or its output could not be parsed.
pub const PLAN_FAILED: i32 = 2;
/// Installing `requirements.txt` failed.
pub const INSTALL_FAILED: i32 = 3;
/// The correction loop ended in `Failed` or `Aborted`.
pub const CORRECTION_FAILED: i32 = 4;
