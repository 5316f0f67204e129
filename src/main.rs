//! docsumma CLI - document text extraction and summaries
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use docsumma::{ui, Assistant, Config, Document, GeminiClient, SummaryLength};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docsumma")]
#[command(author, version, about = "Extract text from documents and summarise it with Gemini", long_about = None)]
struct Cli {
    /// Path to a config file (defaults to ./docsumma.toml or ~/.config/docsumma/docsumma.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the text of a PDF or image
    Extract {
        /// Document to read
        file: PathBuf,
    },
    /// Extract a document's text and summarise it
    Summarise {
        /// Document to summarise
        file: PathBuf,
        /// Summary length
        #[arg(short, long, value_enum, default_value_t = SummaryLength::Medium)]
        length: SummaryLength,
        /// Show raw extracted text instead of summary
        #[arg(long)]
        raw: bool,
        /// Print the summary as JSON
        #[arg(long, conflicts_with = "raw")]
        json: bool,
    },
    /// Chat with the assistant
    Chat,
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Some(Commands::Completions { shell }) = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "docsumma", &mut std::io::stdout());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let client = GeminiClient::from_config(&config)?;
    tracing::info!(model = client.model(), "gemini client ready");
    let mut assistant = Assistant::new(Arc::new(client), config);

    match cli.command {
        Some(Commands::Extract { file }) => {
            let document = Document::load(&file).await?;
            let token = assistant.cancellation_token();
            let text = ui::cancel_on_ctrl_c(token, assistant.select_file(document)).await?;
            println!("{}", text);
        }
        Some(Commands::Summarise {
            file,
            length,
            raw,
            json,
        }) => {
            eprintln!("Reading: {}", file.display());
            let document = Document::load(&file).await?;

            let token = assistant.cancellation_token();
            let text = ui::cancel_on_ctrl_c(token, assistant.select_file(document)).await?;

            if raw {
                ui::print_extracted(text);
                return Ok(());
            }

            eprintln!("Summarising {} characters...", text.chars().count());
            let token = assistant.cancellation_token();
            let summary = ui::cancel_on_ctrl_c(token, assistant.generate_summary(length)).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(summary)?);
            } else {
                ui::print_summary(summary);
            }
        }
        Some(Commands::Chat) => ui::chat_loop(&mut assistant).await?,
        Some(Commands::Completions { .. }) => {}
        None => {
            // Default: launch the interactive shell
            ui::run(&mut assistant).await?;
        }
    }

    Ok(())
}
