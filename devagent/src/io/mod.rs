//! I/O collaborators for the pipeline.

pub mod config;
pub mod docs;
pub mod events;
pub mod inference;
pub mod installer;
pub mod process;
pub mod project;
pub mod prompt;
