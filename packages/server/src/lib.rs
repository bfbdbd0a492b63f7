// Website Q&A - API Core
//
// This crate provides the backend for answering questions about web pages:
// an HTTP submission/read API, a durable Postgres-backed job queue, and a
// background runner that fetches pages, extracts readable text, and asks an
// LLM to answer the submitted question.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
