//! # Athena RAG Core
//!
//! Shared, I/O-free logic for Athena RAG: data models, the error taxonomy,
//! chunking, the embedding trait, the in-memory vector index, retrieval,
//! and prompt assembly.
//!
//! This crate contains no tokio runtime, HTTP client, or filesystem access.
//! Concrete embedding providers, the completion client, and the session
//! controller live in the `athena-rag` app crate.
//!
//! ## Data Flow
//!
//! ```text
//! canonical text ──▶ chunk::split ──▶ Embedder ──▶ VectorIndex::build
//!
//! question ──▶ retrieve::retrieve ──▶ prompt::assemble ──▶ completion
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod prompt;
pub mod retrieve;

pub use error::{RagError, Result};
