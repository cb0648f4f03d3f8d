//! Session pipeline controller.
//!
//! A [`Session`] owns at most one active [`VectorIndex`] and exposes the two
//! pipeline operations:
//!
//! ```text
//! setup:  SchemaSource → extract → chunk::split → embed_all → VectorIndex::build
//! ask:    question + history → retrieve → prompt::assemble → CompletionClient::complete
//! ```
//!
//! # State
//!
//! The session is either *uninitialized* (no index) or *ready*. Setup
//! always starts by discarding the current index, so a failed setup leaves
//! the session uninitialized rather than answering from a stale schema.
//!
//! # Concurrency
//!
//! The index sits behind a [`tokio::sync::RwLock`]. `ask` holds a read
//! guard for its whole run, so concurrent questions proceed in parallel
//! against the same immutable index. `setup` holds the write guard while it
//! extracts, chunks, embeds, and builds, so it waits for in-flight
//! questions and no question ever sees a partially built index.

use std::sync::Arc;
use std::time::Duration;

use athena_rag_core::chunk;
use athena_rag_core::embedding::{embed_all, Embedder};
use athena_rag_core::index::VectorIndex;
use athena_rag_core::models::{ConversationTurn, RetrievalResult};
use athena_rag_core::prompt::{assemble, PromptLimits};
use athena_rag_core::{retrieve, RagError, Result};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::extract::{extract, SchemaFile, SchemaSource};
use crate::llm::{ChatMessage, CompletionClient, CompletionParams};

/// Opening assistant message for a fresh conversation.
pub const GREETING: &str = "Hello! Please provide your database schema to get started.";

/// Tunables for one session, usually derived from [`Config`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub max_chars: usize,
    pub overlap_chars: usize,
    pub top_k: usize,
    pub batch_size: usize,
    pub limits: PromptLimits,
    pub params: CompletionParams,
    /// Bounds embedding a whole schema (including first model load) and
    /// embedding a question.
    pub embed_timeout: Duration,
    pub completion_timeout: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_chars: config.chunking.max_chars,
            overlap_chars: config.chunking.overlap_chars,
            top_k: config.retrieval.top_k,
            batch_size: config.embedding.batch_size,
            limits: config.prompt.limits(),
            params: CompletionParams::from_config(&config.llm),
            embed_timeout: config.embedding.timeout(),
            completion_timeout: config.llm.timeout(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

enum SessionState {
    Uninitialized,
    Ready(Arc<VectorIndex>),
}

/// One user's schema plus the collaborators needed to answer questions about it.
pub struct Session {
    embedder: Arc<dyn Embedder>,
    client: Arc<dyn CompletionClient>,
    settings: SessionSettings,
    state: RwLock<SessionState>,
}

impl Session {
    /// Create an uninitialized session.
    ///
    /// Fails with [`RagError::InvalidConfig`] when the chunk sizes or
    /// `top_k` are unusable.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        client: Arc<dyn CompletionClient>,
        settings: SessionSettings,
    ) -> Result<Self> {
        chunk::validate(settings.max_chars, settings.overlap_chars)?;
        if settings.top_k == 0 {
            return Err(RagError::InvalidConfig("top_k must be >= 1".to_string()));
        }
        Ok(Self {
            embedder,
            client,
            settings,
            state: RwLock::new(SessionState::Uninitialized),
        })
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// True once a setup has succeeded and no later setup has failed.
    pub async fn is_ready(&self) -> bool {
        matches!(*self.state.read().await, SessionState::Ready(_))
    }

    /// Number of chunks in the active index.
    pub async fn chunk_count(&self) -> Option<usize> {
        match &*self.state.read().await {
            SessionState::Ready(index) => Some(index.len()),
            SessionState::Uninitialized => None,
        }
    }

    /// Drop the active index.
    pub async fn reset(&self) {
        *self.state.write().await = SessionState::Uninitialized;
    }

    /// Ingest pasted schema text. Blank text fails with [`RagError::EmptyInput`].
    ///
    /// Returns the number of chunks indexed.
    pub async fn setup_from_text(&self, text: &str) -> Result<usize> {
        if text.trim().is_empty() {
            self.reset().await;
            warn!("schema setup rejected: blank text");
            return Err(RagError::EmptyInput);
        }
        self.setup(SchemaSource::PlainText(text.as_bytes().to_vec()))
            .await
    }

    /// Ingest an uploaded file; its media type selects the extractor.
    pub async fn setup_from_file(&self, file: &SchemaFile) -> Result<usize> {
        match file.to_source() {
            Ok(source) => {
                debug!(file = %file.name, kind = source.kind(), "ingesting schema file");
                self.setup(source).await
            }
            Err(e) => {
                self.reset().await;
                warn!(file = %file.name, media_type = %file.media_type, error = %e, "schema setup failed");
                Err(e)
            }
        }
    }

    /// Replace the active index with one built from `source`.
    pub async fn setup(&self, source: SchemaSource) -> Result<usize> {
        let mut state = self.state.write().await;
        *state = SessionState::Uninitialized;

        match self.build_index(&source).await {
            Ok(index) => {
                let chunks = index.len();
                info!(
                    kind = source.kind(),
                    chunks,
                    dims = index.dims(),
                    model = self.embedder.model_name(),
                    "schema indexed"
                );
                *state = SessionState::Ready(Arc::new(index));
                Ok(chunks)
            }
            Err(e) => {
                warn!(kind = source.kind(), error = %e, "schema setup failed");
                Err(e)
            }
        }
    }

    async fn build_index(&self, source: &SchemaSource) -> Result<VectorIndex> {
        let text = extract(source)?;
        let chunks = chunk::split(&text, self.settings.max_chars, self.settings.overlap_chars)?;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let after = self.settings.embed_timeout;
        let vectors = tokio::time::timeout(
            after,
            embed_all(self.embedder.as_ref(), &texts, self.settings.batch_size),
        )
        .await
        .map_err(|_| RagError::Timeout {
            operation: "schema embedding",
            after,
        })??;

        VectorIndex::build(chunks, vectors)
    }

    /// Top-k chunks for `question` from the active index.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        let state = self.state.read().await;
        let SessionState::Ready(index) = &*state else {
            return Err(RagError::NoActiveIndex);
        };
        self.retrieve_from(index, question).await
    }

    async fn retrieve_from(&self, index: &VectorIndex, question: &str) -> Result<RetrievalResult> {
        let after = self.settings.embed_timeout;
        let result = tokio::time::timeout(
            after,
            retrieve::retrieve(question, index, self.embedder.as_ref(), self.settings.top_k),
        )
        .await
        .map_err(|_| RagError::Timeout {
            operation: "question embedding",
            after,
        })??;
        debug!(k = self.settings.top_k, hits = result.len(), "retrieved schema context");
        Ok(result)
    }

    /// Answer `question` given the prior `history`.
    ///
    /// Fails with [`RagError::NoActiveIndex`] before any successful setup,
    /// without embedding the question or calling the completion client.
    pub async fn ask(&self, question: &str, history: &[ConversationTurn]) -> Result<String> {
        let state = self.state.read().await;
        let SessionState::Ready(index) = &*state else {
            return Err(RagError::NoActiveIndex);
        };

        let retrieved = self.retrieve_from(index, question).await?;
        let prompt = assemble(question, &retrieved, history, &self.settings.limits);
        let messages = [ChatMessage::user(prompt)];

        let after = self.settings.completion_timeout;
        let answer = tokio::time::timeout(after, self.client.complete(&messages, &self.settings.params))
            .await
            .unwrap_or(Err(RagError::Timeout {
                operation: "completion",
                after,
            }));

        if let Err(e) = &answer {
            warn!(
                model = %self.settings.params.model,
                error = %e,
                transient = e.is_transient(),
                "completion failed"
            );
        }
        answer
    }

    /// [`ask`](Self::ask) and record the exchange in `conversation`.
    ///
    /// Neither turn is recorded when the question fails.
    pub async fn chat(&self, question: &str, conversation: &mut Conversation) -> Result<String> {
        let answer = self.ask(question, conversation.turns()).await?;
        conversation.push(ConversationTurn::user(question));
        conversation.push(ConversationTurn::assistant(answer.clone()));
        Ok(answer)
    }
}

/// Append-only conversation history, oldest turn first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// A conversation opened by the assistant's [`GREETING`].
    pub fn with_greeting() -> Self {
        Self {
            turns: vec![ConversationTurn::assistant(GREETING)],
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
