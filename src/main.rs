use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sofipo_sim::core::{Catalog, CoreResult};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "sofipo-sim", about = "SOFIPO savings yield simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
        /// Rate catalog to load instead of the built-in one.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

fn load_catalog(path: Option<&PathBuf>) -> CoreResult<Catalog> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| {
                sofipo_sim::core::CoreError::InvalidCatalog(format!(
                    "cannot read {}: {e}",
                    path.display()
                ))
            })?;
            Catalog::from_json(&json)
        }
        None => Catalog::builtin(),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port, catalog } => {
            let catalog = match load_catalog(catalog.as_ref()) {
                Ok(catalog) => catalog,
                Err(e) => {
                    eprintln!("Catalog error: {e}");
                    std::process::exit(1);
                }
            };
            if let Err(e) = sofipo_sim::api::run_http_server(port, catalog).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
    }
}
