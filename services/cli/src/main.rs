//! Main Entrypoint for the studybuddy CLI
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging (to stderr, keeping stdout parseable).
//! 3. Constructing the orchestrator with the Gemini backend.
//! 4. Processing exactly one message and emitting the line-oriented
//!    output contract, plus an optional JSON dump of the full record.

mod output;

use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::process::ExitCode;
use std::sync::Arc;
use studybuddy_core::backend::GeminiClient;
use studybuddy_core::config::Config;
use studybuddy_core::engine::{MessageType, StudyBuddy, TurnOptions, TurnRequest};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "studybuddy",
    about = "Adaptive tutoring response generator",
    long_about = "Processes one student message and prints the assembled response record.\n\n\
        Examples:\n  \
        studybuddy \"Explain photosynthesis\" \"\" text\n  \
        studybuddy \"Q1: The sun, Q2: Carbon dioxide\" \"Previous quiz on photosynthesis\" text\n  \
        studybuddy \"Hello\" \"\" audio --file-name hello_audio"
)]
struct Cli {
    /// The student's message
    message: String,

    /// Conversation context carried over from the previous turn
    #[arg(default_value = "")]
    context: String,

    /// Response kind: text, or audio to also render a spoken artifact
    #[arg(default_value = "text")]
    message_type: String,

    /// Voice used for audio turns
    #[arg(long)]
    voice: Option<String>,

    /// File stem (without extension) for the audio artifact
    #[arg(long)]
    file_name: Option<String>,

    /// Also write the full record to chat_response_<timestamp>.json
    #[arg(long)]
    save_json: bool,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!("Configuration loaded. Initializing orchestrator...");

    let message_type: MessageType = cli.message_type.parse()?;
    let mut buddy = StudyBuddy::new(&config, Arc::new(GeminiClient::new()))
        .context("Failed to construct orchestrator")?;

    let record = buddy
        .process(TurnRequest {
            message: cli.message,
            context: cli.context,
            message_type,
            options: TurnOptions {
                voice: cli.voice,
                file_name: cli.file_name,
            },
        })
        .await;

    output::print_record(&record);

    if cli.save_json {
        let filename = format!("chat_response_{}.json", chrono::Local::now().timestamp());
        let file = File::create(&filename)
            .with_context(|| format!("Failed to create result file '{filename}'"))?;
        serde_json::to_writer_pretty(file, &record)
            .with_context(|| format!("Failed to write result file '{filename}'"))?;
        println!("Result saved to: {filename}");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // A labeled error line plus the full chain for diagnostics.
            eprintln!("error: {err}");
            eprintln!("{err:?}");
            ExitCode::FAILURE
        }
    }
}
