use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use interview_coach::config::{Overrides, Settings};
use interview_coach::constants::SESSION_IDLE_TIMEOUT_SECS;
use interview_coach::console::Console;
use interview_coach::gemini::GeminiClient;
use interview_coach::profile::{Company, Position};
use interview_coach::web_server::{self, AppState};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a practice interview in the terminal.
    Practice {
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Serve the interview API over HTTP.
    Serve {
        #[arg(long, default_value_t = 9900, help = "Port for the web server.")]
        port: u16,
        #[arg(long, default_value_t = SESSION_IDLE_TIMEOUT_SECS, help = "Seconds before an idle session is evicted.")]
        idle_timeout_secs: u64,
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// List the positions and companies a candidate can pick.
    Options,
}

#[derive(clap::Args, Debug)]
struct BackendArgs {
    #[arg(long, help = "Gemini API key (defaults to GEMINI_API_KEY).")]
    api_key: Option<String>,
    #[arg(long, help = "Model identifier (defaults to INTERVIEW_MODEL or gemini-2.5-flash).")]
    model: Option<String>,
    #[arg(long, help = "Gemini API base URL (defaults to GEMINI_BASE_URL).")]
    base_url: Option<String>,
    #[arg(long, help = "Number of candidate answers per interview.")]
    max_questions: Option<usize>,
    #[arg(long, help = "Wait for whole replies instead of streaming them.")]
    no_stream: bool,
}

impl BackendArgs {
    fn settings(self) -> Result<Settings> {
        Settings::resolve(Overrides {
            api_key: self.api_key,
            model: self.model,
            base_url: self.base_url,
            max_questions: self.max_questions,
            no_stream: self.no_stream,
        })
        .context("Invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for GEMINI_API_KEY and friends)
    dotenvy::dotenv().ok();

    // Logs go to stderr so the interview on stdout stays readable.
    // Reads log level from RUST_LOG (e.g., RUST_LOG=info,interview_coach=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Practice { backend } => {
            let settings = backend.settings()?;
            info!(model = %settings.model, max_questions = settings.max_questions, "Starting practice interview");
            let client = GeminiClient::new(settings.api_key.clone(), settings.base_url.clone());

            let stdin = io::stdin();
            let mut console = Console::new(stdin.lock(), io::stdout(), &client, &settings);
            console.run().await.context("Interview session failed")?;
        }
        Commands::Serve { port, idle_timeout_secs, backend } => {
            let settings = backend.settings()?;
            let client = GeminiClient::new(settings.api_key.clone(), settings.base_url.clone());
            let state = AppState::new(Arc::new(client), settings.model, settings.stream, settings.max_questions)
                .with_idle_timeout(Duration::from_secs(idle_timeout_secs));

            tokio::select! {
                res = web_server::start_web_server(port, state) => res?,
                _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, shutting down."),
            }
        }
        Commands::Options => {
            println!("Positions:");
            for position in Position::all() {
                println!("  {}", position);
            }
            println!("Companies:");
            for company in Company::all() {
                println!("  {}", company);
            }
        }
    }

    Ok(())
}
