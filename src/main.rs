use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ragqna::commands::{init_documents, query_documents, start_shell};
use ragqna::config::{Config, load_env_file, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "ragqna")]
#[command(about = "RAG-based question answering over local documents")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to ~/.ragqna)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, split and store documents in the vector store
    Init {
        /// Path to a documents directory or a single file
        #[arg(short, long)]
        documents: PathBuf,
        /// Chat model to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Query documents
    Query {
        /// Question to ask
        question: String,
        /// Chat model to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Interactive menu to add documents and ask questions
    Shell {
        /// Chat model to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Configure the LLM provider and pipeline settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    load_env_file();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            eprintln!();
            eprintln!("💡 Troubleshooting tips:");
            eprintln!("1. Ensure your .env file contains MISTRAL_API_KEY (or the configured api_key_env)");
            eprintln!("2. Ensure supported files (PDF, TXT, PPTX) are in the documents directory");
            eprintln!("3. Run 'ragqna config' to check the provider settings");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => Config::default_dir()?,
    };

    match command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Init { documents, model } => {
            let config = Config::load(&config_dir)?;
            init_documents(&config, &documents, model.as_deref()).await?;
        }
        Commands::Query { question, model } => {
            let config = Config::load(&config_dir)?;
            query_documents(&config, &question, model.as_deref())?;
        }
        Commands::Shell { model } => {
            let config = Config::load(&config_dir)?;
            start_shell(&config, model.as_deref()).await?;
        }
    }

    Ok(())
}
