use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use ragloop::core::config::AppPaths;
use ragloop::core::logging;
use ragloop::llm::structured::render_thinking;
use ragloop::rag::StructuredAnswer;
use ragloop::state::AppState;

/// Retrieval-augmented answers over a small set of web pages
#[derive(Parser, Debug)]
#[command(name = "ragloop")]
#[command(version)]
#[command(about = "Retrieval-augmented answers over a small set of web pages", long_about = None)]
struct Cli {
    /// Config file to use instead of the discovered config.yml
    #[arg(long, global = true, env = "RAGLOOP_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Document index file (JSON)
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch pages, embed their text and write the document index
    Ingest {
        /// Pages to ingest; defaults to `ingest.urls` from the config
        urls: Vec<String>,

        /// Embed each page body as a single document
        #[arg(long)]
        whole_page: bool,
    },

    /// Answer with the single closest document as context
    Ask { question: String },

    /// Answer through the retrieve / grade / rewrite agent graph
    Agent { question: String },

    /// Answer as JSON with the source the answer came from
    Answer { question: String },

    /// Print the effective configuration with secrets redacted
    Config {
        /// Write the built-in defaults to the config file
        #[arg(long)]
        init: bool,

        /// Overwrite an existing config file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, cli.verbose);

    let state = AppState::initialize(paths, cli.config.clone(), cli.index.clone())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Ingest { urls, whole_page } => ingest(&state, urls, whole_page).await,
        Commands::Ask { question } => ask(&state, &question).await,
        Commands::Agent { question } => agent(&state, &question).await,
        Commands::Answer { question } => answer(&state, &question).await,
        Commands::Config { init, force } => config(&state, init, force),
    }
}

async fn ingest(state: &AppState, urls: Vec<String>, whole_page: bool) -> anyhow::Result<()> {
    let urls = if urls.is_empty() {
        state.config.ingest.urls.clone()
    } else {
        urls
    };
    anyhow::ensure!(!urls.is_empty(), "No URLs to ingest");

    let mut engine_config = state.config.ingest.engine.clone();
    if whole_page {
        engine_config.chunk_size = 0;
    }
    let engine = ragloop::rag::RAGEngine::new(engine_config)?;

    let index = engine
        .build_index(&urls, state.provider.as_ref(), &state.config.models.embedding)
        .await
        .context("Failed to build the document index")?;

    let path = state.index_path();
    index
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!("Wrote {} documents to {}", index.len(), path.display());
    Ok(())
}

async fn ask(state: &AppState, question: &str) -> anyhow::Result<()> {
    let index = state.load_index()?;
    let outcome = state
        .pipeline(index)
        .ask(question)
        .await
        .context("Pipeline run failed")?;

    tracing::info!(source = %outcome.context.source, score = outcome.context.score, "Answered");
    println!("{}", render_thinking(&outcome.answer));
    Ok(())
}

async fn agent(state: &AppState, question: &str) -> anyhow::Result<()> {
    let index = state.load_index()?;
    let graph = state.rag_graph(index)?;
    let final_state = graph
        .invoke(question)
        .await
        .context("Agent graph run failed")?;

    let content = final_state
        .conversation
        .last()
        .map(|message| message.content.as_str())
        .unwrap_or_default();
    println!("{}", render_thinking(content));
    Ok(())
}

async fn answer(state: &AppState, question: &str) -> anyhow::Result<()> {
    let generator = state.generator(&state.config.models.generator);
    let prompt = format!("Answer the users question as best as possible.\n{}", question);
    let parsed = generator
        .generate_structured::<StructuredAnswer>(&prompt)
        .await?
        .into_result()
        .context("Model did not return a valid answer")?;

    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

fn config(state: &AppState, init: bool, force: bool) -> anyhow::Result<()> {
    if init {
        let path = state.config_service.write_defaults(force)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let redacted = state.config_service.redacted()?;
    print!("{}", serde_yaml::to_string(&redacted)?);
    Ok(())
}
