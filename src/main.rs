//! chat_temperature CLI - main entry point

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use chat_temperature::commands::{self, AnalyzeConfig};
use chat_temperature::history::JsonFileHistory;
use chat_temperature::{metrics, Config, OutputFormat, SituationType};

#[derive(Parser)]
#[command(name = "chat_temperature")]
#[command(about = "Relationship temperature from KakaoTalk and Instagram chat exports", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Path to config.yml (defaults to ./config.yml, then ../config.yml)
    #[arg(long, env = "CHAT_TEMPERATURE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the detected export format (kakao | instagram)
    Detect {
        /// Exported chat file
        file: PathBuf,
    },

    /// List participants and their message counts in the analysis window
    Participants {
        /// Exported chat file
        file: PathBuf,

        /// Days to look back
        #[arg(long)]
        window_days: Option<i64>,
    },

    /// Compute the relationship temperature, optionally with a narrative
    Analyze {
        /// Exported chat file
        file: PathBuf,

        /// Your name as it appears in the export
        #[arg(long)]
        me: String,

        /// Narrative lens: romance | conflict | counseling | general
        #[arg(long)]
        situation: Option<String>,

        /// Output format: json | markdown | both
        #[arg(long, default_value = "both")]
        output_format: String,

        /// Directory for report files
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the summary only
        #[arg(long, default_value_t = false)]
        no_report: bool,

        /// Do not record this run in the history
        #[arg(long, default_value_t = false)]
        no_history: bool,

        /// Days to look back
        #[arg(long)]
        window_days: Option<i64>,
    },

    /// Show or clear past analyses
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// List narrative situations
    Situations,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// All saved analyses, newest first
    List,
    /// The most recent analysis
    Last,
    /// Delete all saved analyses
    Clear,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Detect { .. } => "detect",
            Commands::Participants { .. } => "participants",
            Commands::Analyze { .. } => "analyze",
            Commands::History { .. } => "history",
            Commands::Situations => "situations",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("chat_temperature=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::new(),
    };

    let command_name = cli.command.name();
    metrics::record_command_start(command_name);
    let start = Instant::now();

    let result = execute_command(cli.command, config).await;

    metrics::record_command_result(command_name, start.elapsed(), result.is_ok());

    result
}

async fn execute_command(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Detect { file } => {
            commands::detect_run(&file)?;
        }
        Commands::Participants { file, window_days } => {
            let options = config.parse_options_with_window(window_days)?;
            commands::participants_run(&file, &options)?;
        }
        Commands::Analyze {
            file,
            me,
            situation,
            output_format,
            output_dir,
            no_report,
            no_history,
            window_days,
        } => {
            let mut analyze = AnalyzeConfig::new(me, config);
            analyze.situation = situation
                .as_deref()
                .map(str::parse::<SituationType>)
                .transpose()?;
            analyze.output_format = output_format.parse::<OutputFormat>()?;
            analyze.output_dir = output_dir;
            analyze.no_report = no_report;
            analyze.save_history = !no_history;
            analyze.window_days = window_days;

            commands::analyze_run(&file, analyze).await?;
        }
        Commands::History { action } => {
            let store = JsonFileHistory::new(config.history.path, config.history.max_entries);
            match action {
                HistoryAction::List => {
                    commands::history::list(&store)?;
                }
                HistoryAction::Last => {
                    commands::history::last(&store)?;
                }
                HistoryAction::Clear => commands::history::clear(&store)?,
            }
        }
        Commands::Situations => {
            for situation in SituationType::ALL {
                println!(
                    "{} {:<10} {}  {}",
                    situation.emoji(),
                    situation.as_str(),
                    situation.label(),
                    situation.description()
                );
            }
        }
    }

    Ok(())
}
