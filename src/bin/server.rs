//! Locker Service Binary
//!
//! Runs the party locker as a headless HTTP service backing the three
//! claim/transfer routes (`/save`, `/get`, `/delete`) on a persistent
//! key-value store.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};

use party_locker_lib::config::ServiceConfig;
use party_locker_lib::server::LockerService;

const DEFAULT_PORT: u16 = 7842;

#[derive(Parser)]
#[command(name = "locker-server")]
#[command(about = "Party Locker Service")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory for the locker store
    #[arg(long, env = "LOCKER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = if args.verbose {
        "party_locker_lib=debug,locker_server=debug,axum=debug"
    } else {
        "party_locker_lib=info,locker_server=info"
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = ServiceConfig::from_env();
    config.host = args.host;
    config.port = args.port;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    info!("Starting locker service with config: {:?}", config);
    println!("Party Locker Service v{}", env!("CARGO_PKG_VERSION"));
    println!("Note: lockers are unauthenticated. Anyone who knows an");
    println!("address can read, overwrite, or delete it.");
    println!();

    let service = match LockerService::new(config) {
        Ok(service) => service,
        Err(e) => {
            error!("Failed to open locker store: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = service.start().await {
        error!("Service failed: {}", e);
        process::exit(1);
    }
}
