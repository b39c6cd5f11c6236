//! Concierge CLI entry point.
//!
//! Commands:
//! - `serve`    Start the HTTP gateway
//! - `chat`     Run one conversation cycle locally
//! - `init`     Write the default config file
//! - `doctor`   Diagnose configuration and model connectivity

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "concierge",
    about = "Concierge: memory-augmented chat with session history and tools",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send one message and print the reply
    Chat {
        /// Conversation id (defaults to gateway.default_user_id)
        #[arg(short, long)]
        user: Option<String>,

        /// The message to send
        #[arg(short, long)]
        message: String,
    },

    /// Write the default config to ~/.concierge/config.toml
    Init,

    /// Diagnose configuration and model connectivity
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { user, message } => commands::chat::run(user, message).await?,
        Commands::Init => commands::init::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
