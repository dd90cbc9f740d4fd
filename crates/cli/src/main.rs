//! Coupler CLI: the main entry point.
//!
//! Commands:
//! - `route`: Split a request and route every piece to a team member
//! - `split`: Show how a request is split, without routing
//! - `team`: List the configured team
//! - `onboard`: Write a starter config
//! - `doctor`: Diagnose configuration and provider health

use std::path::PathBuf;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "coupler",
    about = "Coupler — route natural-language requests to the right team member",
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
    log_json: bool,

    /// Config file to use instead of ~/.coupler/config.toml
    #[arg(short, long, global = true, env = "COUPLER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Route a request to team members (reads stdin without --message)
    Route {
        /// The request to route
        #[arg(short, long)]
        message: Option<String>,

        /// Print assignments as JSON
        #[arg(long)]
        json: bool,

        /// Classification calls in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Keep routing when a single request fails
        #[arg(long)]
        isolated: bool,
    },

    /// Split a request into atomic requests
    Split {
        /// The request to split
        #[arg(short, long)]
        message: Option<String>,

        /// Print the requests as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the configured team
    Team {
        /// Print the roster section of the classification prompt
        #[arg(long)]
        prompt: bool,
    },

    /// Initialize configuration
    Onboard {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Diagnose configuration and provider health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only results
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Route {
            message,
            json,
            concurrency,
            isolated,
        } => {
            let options = commands::route::RouteOptions {
                json,
                concurrency,
                isolated,
            };
            commands::route::run(config, message, options).await?
        }
        Commands::Split { message, json } => commands::split::run(config, message, json).await?,
        Commands::Team { prompt } => commands::team::run(config, prompt)?,
        Commands::Onboard { force } => commands::onboard::run(config, force)?,
        Commands::Doctor => commands::doctor::run(config).await?,
    }

    Ok(())
}
