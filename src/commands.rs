//! Implementations behind the `athena` subcommands.
//!
//! Output meant for the user (answers, model ids, chunk previews) goes to
//! stdout; diagnostics go through `tracing` to stderr.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use athena_rag_core::chunk;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::extract::{extract, SchemaFile, SchemaSource};
use crate::llm::{choose_model, extract_sql, CompletionClient, OpenAICompatClient};
use crate::session::{Conversation, Session, SessionSettings, GREETING};

/// Where the schema comes from on the command line.
#[derive(Debug, Clone)]
pub enum SchemaInput {
    File(PathBuf),
    Text(String),
}

impl SchemaInput {
    fn to_source(&self) -> Result<SchemaSource> {
        match self {
            SchemaInput::File(path) => Ok(SchemaFile::from_path(path)?.to_source()?),
            SchemaInput::Text(text) => Ok(SchemaSource::PlainText(text.as_bytes().to_vec())),
        }
    }
}

/// Session wired to the configured embedder and the given completion client.
pub fn build_session(cfg: &Config, client: Arc<dyn CompletionClient>) -> Result<Session> {
    let embedder = create_embedder(&cfg.embedding)?;
    Ok(Session::new(
        embedder,
        client,
        SessionSettings::from_config(cfg),
    )?)
}

/// Run setup on `session` from a CLI schema argument.
pub async fn setup_session(session: &Session, input: &SchemaInput) -> Result<usize> {
    let chunks = match input {
        SchemaInput::File(path) => {
            let file = SchemaFile::from_path(path)?;
            session.setup_from_file(&file).await
        }
        SchemaInput::Text(text) => session.setup_from_text(text).await,
    };
    chunks.context("Failed to process schema")
}

/// The configured model when the provider offers it, else the provider's first.
///
/// A failed listing keeps the configured model.
pub async fn resolve_model(client: &dyn CompletionClient, preferred: &str) -> String {
    match client.list_models().await {
        Ok(models) => {
            let chosen = choose_model(preferred, &models);
            if chosen != preferred {
                warn!(preferred, chosen = %chosen, "configured model not offered; falling back");
            }
            chosen
        }
        Err(e) => {
            warn!(error = %e, "could not list models; using configured model");
            preferred.to_string()
        }
    }
}

/// `athena models`
pub async fn run_models(cfg: &Config) -> Result<()> {
    let client = OpenAICompatClient::new(&cfg.llm)?;
    let models = client
        .list_models()
        .await
        .context("Failed to fetch models")?;

    if models.is_empty() {
        println!("No models available.");
        return Ok(());
    }
    for model in models {
        let marker = if model == cfg.llm.model { " *" } else { "" };
        println!("{model}{marker}");
    }
    Ok(())
}

/// `athena chunks`
pub fn run_chunks(cfg: &Config, input: &SchemaInput) -> Result<()> {
    let text = extract(&input.to_source()?)?;
    let chunks = chunk::split(&text, cfg.chunking.max_chars, cfg.chunking.overlap_chars)?;

    for c in &chunks {
        println!(
            "--- chunk {} ({} chars, {} overlap) ---",
            c.index,
            c.text.chars().count(),
            c.overlap_chars
        );
        println!("{}", c.text);
    }
    println!("{} chunks", chunks.len());
    Ok(())
}

/// `athena ask`
pub async fn run_ask(
    cfg: &Config,
    input: &SchemaInput,
    question: &str,
    sql_only: bool,
) -> Result<()> {
    let client = Arc::new(OpenAICompatClient::new(&cfg.llm)?);
    let mut cfg = cfg.clone();
    cfg.llm.model = resolve_model(&*client, &cfg.llm.model).await;

    let session = build_session(&cfg, client)?;
    setup_session(&session, input).await?;

    let answer = session.ask(question, &[]).await?;
    if sql_only {
        println!("{}", extract_sql(&answer));
    } else {
        println!("{answer}");
    }
    Ok(())
}

/// `athena chat`
pub async fn run_chat(cfg: &Config, input: &SchemaInput) -> Result<()> {
    let client = Arc::new(OpenAICompatClient::new(&cfg.llm)?);
    let mut cfg = cfg.clone();
    cfg.llm.model = resolve_model(&*client, &cfg.llm.model).await;

    let session = build_session(&cfg, client)?;
    let chunks = setup_session(&session, input).await?;
    eprintln!("Schema processed: {chunks} chunks indexed. Type /reset to clear history, /quit to exit.");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    chat_loop(&session, stdin, &mut std::io::stdout()).await
}

/// Read questions line by line and print answers until `/quit` or EOF.
///
/// `/reset` starts a fresh conversation. A failed question is reported to
/// stderr and leaves the conversation unchanged.
pub async fn chat_loop<R, W>(session: &Session, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut conversation = Conversation::with_greeting();
    writeln!(out, "{GREETING}")?;

    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let question = line.trim();
        match question {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                conversation = Conversation::with_greeting();
                writeln!(out, "History cleared.")?;
                continue;
            }
            _ => {}
        }

        match session.chat(question, &mut conversation).await {
            Ok(answer) => writeln!(out, "{answer}")?,
            Err(e) => eprintln!("An error occurred: {e}"),
        }
    }
    Ok(())
}
