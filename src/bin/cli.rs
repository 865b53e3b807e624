//! Party Locker CLI
//!
//! Game-facing entry points as commands: deposit party members into
//! the cloud locker, withdraw them, scan for sibling saves to reunite
//! with, and redeem or author mystery gift codes.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use party_locker_lib::client::HttpLocker;
use party_locker_lib::config::LockerConfig;
use party_locker_lib::error::LockerError;
use party_locker_lib::gift::{self, GiftDispatcher, GiftPackage};
use party_locker_lib::party::{Creature, FileSaver, PlayerState};
use party_locker_lib::registry::IdentityRegistry;
use party_locker_lib::transfer::TransferOrchestrator;

#[derive(Parser)]
#[command(name = "locker-cli")]
#[command(about = "Party Locker Command Line Interface")]
#[command(version)]
struct Cli {
    /// Locker service URL
    #[arg(short, long, env = "LOCKER_API_URL")]
    server: Option<String>,

    /// Player state file
    #[arg(long)]
    state: Option<PathBuf>,

    /// Game title recorded in the identity registry
    #[arg(short, long, default_value = "Starfall Adventure")]
    title: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deposit selected party members into this save's locker
    Deposit {
        /// Party slot indices to deposit (0-based)
        indices: Vec<usize>,
    },

    /// Withdraw everything stored in this save's locker
    Withdraw,

    /// List sibling saves' lockers, or withdraw from one of them
    Reunion {
        /// Withdraw from the locker registered under this game title
        #[arg(long)]
        from: Option<String>,
    },

    /// Redeem a mystery gift code
    Gift {
        /// The code as handed out by the gift author
        code: String,
    },

    /// Author a gift blob, optionally publishing it at a code
    Author {
        /// Deposit the authored gift at this code
        #[arg(long)]
        publish: Option<String>,

        #[command(subcommand)]
        gift: GiftCommand,
    },
}

#[derive(Subcommand)]
enum GiftCommand {
    /// A creature grant
    Creature {
        species: String,
        #[arg(long, default_value_t = 5)]
        level: u32,
        #[arg(long)]
        nickname: Option<String>,
    },
    /// An item grant
    Item {
        item: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// A money grant
    Money { amount: i64 },
    /// A cosmetic grant
    Cosmetic { id: String },
}

impl GiftCommand {
    fn into_package(self) -> GiftPackage {
        match self {
            GiftCommand::Creature {
                species,
                level,
                nickname,
            } => GiftPackage::Creature {
                value: Creature {
                    species,
                    nickname,
                    level,
                    egg: false,
                },
            },
            GiftCommand::Item { item, quantity } => GiftPackage::Item {
                value: item,
                quantity,
            },
            GiftCommand::Money { amount } => GiftPackage::Money { value: amount },
            GiftCommand::Cosmetic { id } => GiftPackage::Cosmetic { value: id },
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "party_locker_lib=debug,locker_cli=debug"
    } else {
        "party_locker_lib=warn"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = LockerConfig::from_env();
    if let Some(server) = cli.server.clone() {
        config.api_url = server;
    }

    if let Err(e) = run(cli, config).await {
        eprintln!("{e}");
        process::exit(1);
    }
}

async fn run(cli: Cli, config: LockerConfig) -> anyhow::Result<()> {
    let client = HttpLocker::new(&config).map_err(|e| anyhow::anyhow!(e.user_message()))?;
    let registry = IdentityRegistry::new(config.shared_dir());
    let state_path = cli.state.clone().unwrap_or_else(PlayerState::state_path);

    match cli.command {
        Commands::Deposit { indices } => {
            let mut state = PlayerState::load_from(&state_path).await;
            let mut orchestrator = TransferOrchestrator::new(&client, &registry, &cli.title);
            match orchestrator.deposit(&mut state, &indices).await {
                Ok(outcome) => {
                    state.save_to(&state_path).await?;
                    println!("{}", outcome.message);
                }
                Err(e) => fail(&e),
            }
        }

        Commands::Withdraw => {
            let mut state = PlayerState::load_from(&state_path).await;
            let mut orchestrator = TransferOrchestrator::new(&client, &registry, &cli.title);
            match orchestrator.withdraw_self(&mut state).await {
                Ok(outcome) => {
                    state.save_to(&state_path).await?;
                    println!("{}", outcome.message);
                }
                Err(e) => fail(&e),
            }
        }

        Commands::Reunion { from } => {
            let mut state = PlayerState::load_from(&state_path).await;
            let mut orchestrator = TransferOrchestrator::new(&client, &registry, &cli.title);
            let candidates = match orchestrator.reunion_candidates() {
                Ok(candidates) => candidates,
                Err(e) => fail(&e),
            };
            if candidates.is_empty() {
                println!("No other local game records were found.");
                return Ok(());
            }

            match from {
                None => {
                    println!("Past journeys detected:");
                    for (title, address) in &candidates {
                        println!("  {title} -> {address}");
                    }
                    println!("Run with --from <title> to access one of them.");
                }
                Some(wanted) => {
                    let Some((title, address)) =
                        candidates.into_iter().find(|(title, _)| *title == wanted)
                    else {
                        println!("No record was found for {wanted}.");
                        process::exit(1);
                    };
                    println!("Accessing the locker for {title}...");
                    match orchestrator.withdraw(&mut state, &address).await {
                        Ok(outcome) => {
                            state.save_to(&state_path).await?;
                            println!("{}", outcome.message);
                        }
                        Err(e) => fail(&e),
                    }
                }
            }
        }

        Commands::Gift { code } => {
            let mut state = PlayerState::load_from(&state_path).await;
            let saver = FileSaver {
                path: state_path.clone(),
            };
            let dispatcher = GiftDispatcher::new(&client, &saver);
            match dispatcher.claim(&mut state, &code).await {
                Ok(report) => {
                    println!("{}", report.effect_message);
                    println!("{}", report.final_message);
                }
                Err(e) => fail(&e),
            }
        }

        Commands::Author { publish, gift } => {
            let package = gift.into_package();
            let blob = gift::author_blob(&package).map_err(|e| anyhow::anyhow!(e.user_message()))?;
            println!("Gift blob:");
            println!("{blob}");
            if let Some(code) = publish {
                match gift::publish_gift(&client, &code, &package).await {
                    Ok(address) => println!("Published at code {address}"),
                    Err(e) => fail(&e),
                }
            }
        }
    }

    Ok(())
}

/// Print the single player-facing message for a failed transaction.
fn fail(error: &LockerError) -> ! {
    eprintln!("{}", error.user_message());
    process::exit(1);
}
