mod config;
use clap::{Parser, Subcommand};
use config::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod server;
use server::run_server;
use yard_core::SlotStore;

#[derive(Parser)]
#[command(name = "yard")]
#[command(about = "Slot numbering and occupancy service for warehouse yards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Server {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.yaml")]
        config: String,

        /// Create the slot database schema, then exit
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yard=info,yard_core=info,yard_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server { config, init } => {
            tracing::info!("Starting Yard server with config: {}", config);

            let cfg = match Config::from_file(&config) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("Failed to load config: {}", e);
                    std::process::exit(1);
                }
            };

            if init {
                match SlotStore::new(cfg.storage.db_path.clone(), cfg.storage.busy_timeout()) {
                    Ok(store) => {
                        tracing::info!(
                            "Initialization completed for {:?} (init-only mode)",
                            store.db_path()
                        );
                        return;
                    }
                    Err(error) => {
                        tracing::error!("Initialization failed: {}", error);
                        std::process::exit(1);
                    }
                }
            }

            tracing::info!(
                "Bind: {}, Max allocation attempts: {}, Occupied color: {}",
                cfg.server.bind_addr,
                cfg.allocation.max_attempts,
                cfg.occupancy.occupied_color
            );

            if let Err(e) = run_server(cfg).await {
                tracing::error!("Server error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
