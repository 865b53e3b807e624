//! Local player state
//!
//! The explicit state handle every transfer operates on: the party,
//! the money balance, the bag, and capability flags. Passing this in
//! (instead of reading ambient globals the way the scripting layer
//! did) is what makes the party invariants unit-testable.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const STATE_FILE: &str = "player_state.json";

/// Maximum party size.
pub const PARTY_CAP: usize = 6;

/// One creature as it travels through the locker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    pub species: String,
    #[serde(default)]
    pub nickname: Option<String>,
    pub level: u32,
    /// Eggs stay home; they can never be deposited.
    #[serde(default)]
    pub egg: bool,
}

/// One stack of items in the bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagSlot {
    pub item: String,
    pub quantity: u32,
}

/// The local save's mutable state, round-tripped through a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub name: String,
    pub save_id: u32,
    pub party: Vec<Creature>,
    pub money: i64,
    #[serde(default)]
    pub bag: Vec<BagSlot>,
    #[serde(default)]
    pub cosmetics: Vec<String>,
    /// Whether this build can apply cosmetic grants.
    #[serde(default)]
    pub supports_cosmetics: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            save_id: 0,
            party: Vec::new(),
            money: 0,
            bag: Vec::new(),
            cosmetics: Vec::new(),
            supports_cosmetics: false,
        }
    }
}

impl PlayerState {
    /// The self-addressed locker key for this save.
    pub fn locker_address(&self) -> String {
        format!("{}_{}", self.name, self.save_id)
    }

    pub fn party_full(&self) -> bool {
        self.party.len() >= PARTY_CAP
    }

    /// Add an item stack to the bag, merging with an existing stack.
    pub fn add_item(&mut self, item: &str, quantity: u32) {
        if let Some(slot) = self.bag.iter_mut().find(|s| s.item == item) {
            slot.quantity += quantity;
        } else {
            self.bag.push(BagSlot {
                item: item.to_string(),
                quantity,
            });
        }
    }

    /// Load state from disk or create default
    pub async fn load_from(path: &PathBuf) -> Self {
        if path.exists() {
            match tokio::fs::read_to_string(path).await {
                Ok(contents) => match serde_json::from_str::<PlayerState>(&contents) {
                    Ok(state) => {
                        tracing::info!(
                            "Loaded player state: {} ({} in party)",
                            state.name,
                            state.party.len()
                        );
                        return state;
                    }
                    Err(e) => tracing::warn!("Failed to parse state file: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read state file: {}", e),
            }
        }

        tracing::debug!("Creating new player state");
        Self::default()
    }

    /// Save state to disk
    pub async fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;
        tracing::debug!("Saved player state to {:?}", path);
        Ok(())
    }

    /// Default save file location.
    pub fn state_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("party-locker");
        path.push(STATE_FILE);
        path
    }
}

/// The game's own save routine, invoked after a successful gift claim.
#[async_trait]
pub trait GameSaver: Send + Sync {
    async fn save_game(&self, state: &PlayerState) -> Result<()>;
}

/// Saver writing the player state JSON at a fixed path.
pub struct FileSaver {
    pub path: PathBuf,
}

#[async_trait]
impl GameSaver for FileSaver {
    async fn save_game(&self, state: &PlayerState) -> Result<()> {
        state.save_to(&self.path).await
    }
}

// ============================================================================
// Item catalog
// ============================================================================

/// Known item identifiers and their display names. Gift item grants
/// are validated against this table before anything lands in the bag.
const ITEM_CATALOG: &[(&str, &str)] = &[
    ("POTION", "Potion"),
    ("SUPER_POTION", "Super Potion"),
    ("REVIVE", "Revive"),
    ("ETHER", "Ether"),
    ("NUGGET", "Nugget"),
    ("LUCK_CHARM", "Luck Charm"),
    ("TRAVEL_PASS", "Travel Pass"),
];

/// Look up an item's display name; `None` means the id is unknown.
pub fn item_name(id: &str) -> Option<&'static str> {
    ITEM_CATALOG
        .iter()
        .find(|(item_id, _)| *item_id == id)
        .map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locker_address_derivation() {
        let state = PlayerState {
            name: "Ash".to_string(),
            save_id: 7,
            ..Default::default()
        };
        assert_eq!(state.locker_address(), "Ash_7");
    }

    #[test]
    fn test_bag_merges_stacks() {
        let mut state = PlayerState::default();
        state.add_item("POTION", 2);
        state.add_item("POTION", 3);
        state.add_item("REVIVE", 1);
        assert_eq!(state.bag.len(), 2);
        assert_eq!(state.bag[0].quantity, 5);
    }

    #[test]
    fn test_catalog_lookup() {
        assert_eq!(item_name("POTION"), Some("Potion"));
        assert!(item_name("MISSINGNO").is_none());
    }

    #[tokio::test]
    async fn test_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = PlayerState {
            name: "Misty".to_string(),
            save_id: 3,
            money: 1200,
            ..Default::default()
        };
        state.party.push(Creature {
            species: "Tidewing".to_string(),
            nickname: Some("Splash".to_string()),
            level: 18,
            egg: false,
        });
        state.save_to(&path).await.unwrap();

        let loaded = PlayerState::load_from(&path).await;
        assert_eq!(loaded.name, "Misty");
        assert_eq!(loaded.party.len(), 1);
        assert_eq!(loaded.money, 1200);
    }
}
