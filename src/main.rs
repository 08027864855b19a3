//! # MMCoQA Explorer CLI (`mmqa`)
//!
//! Loads the MMCoQA question corpus and its image, table, and text evidence
//! corpora, then lets you browse conversations, resolve evidence, render
//! tables with answer cells highlighted, serve the dataset over HTTP, or
//! score image–question similarity.
//!
//! ## Usage
//!
//! ```bash
//! mmqa --config ./config/mmqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mmqa summary` | Record counts for every corpus |
//! | `mmqa conversations` | List conversation ids with turn counts |
//! | `mmqa show <conversation>` | Print every turn with its evidence |
//! | `mmqa evidence <modality> <id>` | Print one evidence record as JSON |
//! | `mmqa table <id>` | Render a table, optionally highlighting cells |
//! | `mmqa score-images` | CLIP similarity between questions and image evidence |
//! | `mmqa serve` | Start the read-only JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! mmqa show C_381
//! mmqa evidence image 9a1b2c3d
//! mmqa table 0f3e... --qid C_381_4
//! mmqa score-images --output scores.jsonl --progress json
//! ```

use clap::{Parser, Subcommand};
use mmcoqa_core::models::Modality;
use std::path::PathBuf;

use mmcoqa_explorer::progress::ProgressMode;
use mmcoqa_explorer::{config, explore, prepare, server, similarity};

/// MMCoQA Explorer — browse multimodal conversational QA turns and their evidence.
#[derive(Parser)]
#[command(
    name = "mmqa",
    about = "MMCoQA Explorer — browse multimodal conversational QA turns and their evidence",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/mmqa.toml`. When the file does not exist,
    /// built-in defaults pointing at `./data/` are used.
    #[arg(long, global = true, default_value = "./config/mmqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show record counts for the question and evidence corpora.
    Summary,

    /// List conversation ids and their turn counts, sorted by id.
    Conversations {
        /// Maximum number of conversations to list.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print every turn of a conversation with its answers and evidence.
    Show {
        /// Conversation id (e.g. `C_381`).
        conversation: String,
    },

    /// Print one evidence record as JSON.
    Evidence {
        /// Evidence corpus: `image`, `table`, or `text`.
        modality: Modality,
        /// Evidence document id.
        id: String,
    },

    /// Render a table evidence record.
    Table {
        /// Table evidence id.
        id: String,

        /// Cell to highlight as `ROW,COL` (zero-based). Repeatable.
        #[arg(long = "highlight", value_parser = explore::parse_index_pair)]
        highlight: Vec<(i64, i64)>,

        /// Highlight the cells referenced by this turn's table answers.
        #[arg(long)]
        qid: Option<String>,

        /// Print the table and its highlight mask as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Score every image evidence against its question with CLIP.
    ///
    /// Writes one JSON object per scored pair. Requires building with
    /// `--features clip-fastembed`.
    ScoreImages {
        /// Write scores to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Maximum number of pairs to score.
        #[arg(long)]
        limit: Option<usize>,

        /// Progress on stderr. Defaults to `human` on a TTY, `off` otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Start the read-only JSON HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mmcoqa_explorer=info,mmcoqa_core=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::info!(
            "config file {} not found; using defaults",
            cli.config.display()
        );
        config::Config::minimal()
    };

    let dataset = prepare::prepare_dataset(&cfg.data, &cfg.loading)?;

    match cli.command {
        Commands::Summary => explore::run_summary(&dataset),
        Commands::Conversations { limit } => explore::run_conversations(&dataset, limit),
        Commands::Show { conversation } => explore::run_show(&dataset, &conversation)?,
        Commands::Evidence { modality, id } => explore::run_evidence(&dataset, modality, &id)?,
        Commands::Table {
            id,
            highlight,
            qid,
            json,
        } => explore::run_table(&cfg, &dataset, &id, &highlight, qid.as_deref(), json)?,
        Commands::ScoreImages {
            output,
            limit,
            progress,
        } => similarity::run_score_images(&cfg, &dataset, output, limit, progress).await?,
        Commands::Serve => server::run_server(&cfg, dataset).await?,
    }

    Ok(())
}
