#![deny(missing_docs)]

//! Core library for the ReadLess AI workflow server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Document loader capability (download and text extraction).
pub mod document;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Workflow activity counters.
pub mod metrics;
/// Cache namespace derivation for source documents.
pub mod namespace;
/// Prompt templates and rendering.
pub mod prompts;
/// Completion provider clients and the ordered fallback combinator.
pub mod providers;
/// Qdrant vector store integration.
pub mod qdrant;
/// RAG orchestration pipeline: ingestion, retrieval, generation.
pub mod workflow;
