//! # Athena RAG
//!
//! Retrieval-augmented generation of Amazon Athena (Presto SQL) queries from
//! a pasted or uploaded database schema.
//!
//! A schema (DDL text, CSV/TSV, or an `.xlsx` workbook) is normalized to
//! text, split into overlapping chunks, embedded, and held in an in-memory
//! vector index. Each question retrieves the closest chunks, which are
//! assembled with the conversation history into a prompt for a hosted
//! OpenAI-compatible model (Groq by default).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   extract    │──▶│ chunk+embed  │──▶│ VectorIndex  │
//! │ text/csv/xlsx│   │ (core crate) │   │ per session  │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              │ retrieve
//!                                              ▼
//!                    ┌──────────────┐   ┌──────────────┐
//!                    │     llm      │◀──│    prompt    │
//!                    │ (Groq/OpenAI)│   │   assemble   │
//!                    └──────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GROQ_API_KEY=...
//! athena models
//! athena ask --file schema.sql "total revenue per customer last month"
//! athena chat --file tables.xlsx
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | Schema source → canonical text |
//! | [`embedding`] | Embedding providers (fastembed, OpenAI, Ollama, hash) |
//! | [`llm`] | OpenAI-compatible completion client |
//! | [`session`] | Setup/ask pipeline controller |
//! | [`commands`] | CLI subcommand implementations |

pub mod commands;
pub mod config;
pub mod embedding;
pub mod extract;
mod http;
pub mod llm;
pub mod session;
