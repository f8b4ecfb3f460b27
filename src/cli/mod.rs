//! Command-line interface.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::logger::{self, LogLevel};

#[derive(Parser)]
#[command(name = "shelfdb", version, about = "In-memory vector database server")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (overrides config file)
        #[arg(long)]
        host: Option<String>,

        /// Path to a YAML config file (default: ./shelfdb.yaml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Log level: error, warn, info, debug, trace
        #[arg(short = 'l', long, default_value = "info")]
        loglevel: String,

        /// Suppress console log output
        #[arg(short, long)]
        quiet: bool,
    },
}

pub async fn run(cancel_token: CancellationToken) -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            host,
            config,
            loglevel,
            quiet,
        } => {
            let mut config = ServerConfig::load(config.as_deref())?;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }

            let level = LogLevel::parse(&loglevel).unwrap_or(LogLevel::Info);
            logger::init(level, quiet, config.log_dir.as_deref())?;

            crate::server::serve(config, cancel_token).await
        }
    }
}
