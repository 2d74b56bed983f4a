//! webscout: an LLM-driven research agent with a bounded tool-call loop.
//!
//! The binary wires the `agent-core` loop to real providers: an OpenAI-style
//! chat endpoint, a fetch-based page reader, and a workspace sandbox. The
//! `sessions` and `server` modules host concurrent runs behind an HTTP API.

pub mod browser_impl;
pub mod cli;
pub mod config;
pub mod llm;
pub mod server;
pub mod sessions;
