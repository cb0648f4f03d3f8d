//! # Athena RAG CLI (`athena`)
//!
//! Ingests a database schema and turns questions into Amazon Athena
//! (Presto SQL) queries via a hosted OpenAI-compatible model.
//!
//! ## Usage
//!
//! ```bash
//! athena --config ./athena.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `athena models` | List the models the provider offers |
//! | `athena chunks --file F` | Preview how a schema is chunked |
//! | `athena ask --file F "<question>"` | Ingest a schema and answer one question |
//! | `athena chat --file F` | Interactive question loop over one schema |
//!
//! ## Examples
//!
//! ```bash
//! # One-shot, SQL only
//! athena ask --text "CREATE TABLE customers(id INT, name VARCHAR(255));" \
//!     --sql-only "list all customers"
//!
//! # Chat over a spreadsheet of table/column names
//! athena chat --file ./warehouse.xlsx
//! ```
//!
//! Set `RUST_LOG=athena_rag=debug` to see pipeline events on stderr.

use athena_rag::commands::{self, SchemaInput};
use athena_rag::config::{self, Config};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Athena RAG: schema-aware SQL generation for Amazon Athena.
#[derive(Parser)]
#[command(
    name = "athena",
    about = "Athena RAG: turn questions about your schema into Amazon Athena SQL",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Built-in defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Exactly one schema source.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct SchemaArgs {
    /// Schema file: .sql, .ddl, .txt, .md, .csv, .tsv, or .xlsx.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Schema text (e.g. CREATE TABLE statements).
    #[arg(long)]
    text: Option<String>,
}

impl SchemaArgs {
    fn into_input(self) -> SchemaInput {
        match (self.file, self.text) {
            (Some(path), _) => SchemaInput::File(path),
            (None, Some(text)) => SchemaInput::Text(text),
            (None, None) => SchemaInput::Text(String::new()),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List model identifiers offered by the provider.
    ///
    /// The configured model is marked with `*`.
    Models,

    /// Show the chunks a schema is split into.
    Chunks {
        #[command(flatten)]
        schema: SchemaArgs,
    },

    /// Ingest a schema and answer a single question.
    Ask {
        #[command(flatten)]
        schema: SchemaArgs,

        /// Print only the SQL inside the answer's code block.
        #[arg(long)]
        sql_only: bool,

        /// The question to answer.
        question: String,
    },

    /// Ingest a schema and answer questions read from stdin.
    ///
    /// `/reset` clears the conversation, `/quit` exits.
    Chat {
        #[command(flatten)]
        schema: SchemaArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Models => {
            commands::run_models(&cfg).await?;
        }
        Commands::Chunks { schema } => {
            commands::run_chunks(&cfg, &schema.into_input())?;
        }
        Commands::Ask {
            schema,
            sql_only,
            question,
        } => {
            commands::run_ask(&cfg, &schema.into_input(), &question, sql_only).await?;
        }
        Commands::Chat { schema } => {
            commands::run_chat(&cfg, &schema.into_input()).await?;
        }
    }

    Ok(())
}
