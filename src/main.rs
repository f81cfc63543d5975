use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use propdesk::config::Config;
use propdesk::db::Database;
use propdesk::gateway;

#[derive(Parser)]
#[command(name = "propdesk", version, about = "Offline-capable real-estate CRM backend")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway.
    Serve {
        /// Path to the TOML config file.
        #[arg(long, default_value = "propdesk.toml")]
        config: PathBuf,
        /// Override the bind host from the config.
        #[arg(long)]
        host: Option<String>,
        /// Override the bind port from the config.
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config, host, port } => {
            let mut config = Config::load(&config)?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let db = Database::open(Path::new(&config.database.path))?;
            gateway::serve(Arc::new(config), db).await
        }
    }
}
