use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod terminal;

#[derive(Parser)]
#[command(name = "wakeup-cli", version, about = "WakeUp alarm clock CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the alarm clock in this terminal
    Run,
    /// Alarm management
    Alarm {
        #[command(subcommand)]
        action: commands::alarm::AlarmAction,
    },
    /// Wake-up statistics
    Stats {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Available alarm sounds
    Sounds,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("WAKEUP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run => commands::run::run().await,
        Commands::Alarm { action } => commands::alarm::run(action).await,
        Commands::Stats { json } => commands::stats::run(json).await,
        Commands::Sounds => commands::sounds::run().await,
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
