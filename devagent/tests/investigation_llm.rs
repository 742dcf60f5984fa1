//! Investigation tests against a live Ollama server.
//!
//! These tests exercise real model behavior and are excluded from regular CI
//! runs because they need a running server with the default models pulled.
//!
//! Run with: `cargo test -p devagent --test investigation_llm -- --ignored`

#[path = "investigation/ollama.rs"]
mod ollama;
