//! Party Locker - cloud locker and mystery-gift library
//! Moves creatures, items, money, and cosmetics between a local save
//! and a remote key-value locker, and lets sibling saves on one device
//! find each other's lockers through a shared identity registry.

// Core modules
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod gift;
pub mod party;
pub mod registry;
pub mod transfer;

// Headless locker service
pub mod server;

pub use client::{Fetched, HttpLocker, RemoteLocker};
pub use config::{LockerConfig, ServiceConfig};
pub use error::LockerError;
pub use gift::{GiftDispatcher, GiftPackage};
pub use party::{Creature, PlayerState};
pub use registry::IdentityRegistry;
pub use transfer::{TransferOrchestrator, TransferOutcome, TransferPhase};
