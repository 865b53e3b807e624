//! Mystery gift dispatcher
//!
//! Claims externally-issued codes: fetch, decode, then dispatch the
//! package by type against a small effect table. Codes are one-shot
//! (the record is deleted after a successful claim) unless the address
//! carries the `GIFT_` permanent marker. Also hosts the authoring
//! helper that turns a package into the blob a gift author deposits.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::client::{Fetched, RemoteLocker};
use crate::codec::{decode_gift, encode_gift};
use crate::error::LockerError;
use crate::party::{item_name, Creature, GameSaver, PlayerState};
use crate::transfer::is_permanent;

fn default_quantity() -> u32 {
    1
}

/// Balances arrive from authoring tools as numbers or digit strings;
/// anything unparsable coerces to zero rather than failing the claim.
fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s.trim().parse().unwrap_or(0),
    })
}

/// One authored gift. The `unknown` arm keeps old clients forward
/// compatible with gift types they don't yet understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GiftPackage {
    Creature {
        value: Creature,
    },
    Item {
        value: String,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
    Money {
        #[serde(deserialize_with = "lenient_amount")]
        value: i64,
    },
    Cosmetic {
        value: String,
    },
    #[serde(other)]
    Unknown,
}

/// Terminal report of one claim: what the gift did, and the save
/// acknowledgment that follows it.
#[derive(Debug, Clone)]
pub struct ClaimReport {
    pub effect_message: String,
    pub final_message: String,
}

/// Claims gift codes against the remote locker.
pub struct GiftDispatcher<'a> {
    client: &'a dyn RemoteLocker,
    saver: &'a dyn GameSaver,
}

impl<'a> GiftDispatcher<'a> {
    pub fn new(client: &'a dyn RemoteLocker, saver: &'a dyn GameSaver) -> Self {
        Self { client, saver }
    }

    /// Redeem a free-text code. The code is trimmed and upper-cased
    /// before it is used as a locker address.
    pub async fn claim(
        &self,
        state: &mut PlayerState,
        code: &str,
    ) -> Result<ClaimReport, LockerError> {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return Err(LockerError::InvalidSelection(
                "Please enter a gift code.".to_string(),
            ));
        }
        let address = trimmed.to_uppercase();

        let blob = match self.client.get(&address).await? {
            Fetched::Found(blob) => blob,
            Fetched::Missing => return Err(LockerError::NotFound),
        };
        let gift = decode_gift(&blob)?;
        debug!("Claiming gift {:?} at {}", gift, address);

        let effect_message = match self.apply_effect(state, gift) {
            Ok(message) => message,
            // An unsupported effect is user feedback, not a failed
            // claim; the code is still consumed below.
            Err(LockerError::UnsupportedEffect(what)) => {
                LockerError::UnsupportedEffect(what).user_message()
            }
            Err(e) => return Err(e),
        };

        if is_permanent(&address) {
            debug!("Gift code {} is permanent; record kept", address);
        } else if let Err(e) = self.client.delete(&address).await {
            warn!("Failed to consume gift code {}: {}", address, e);
        }

        let final_message = match self.saver.save_game(state).await {
            Ok(()) => "Gift claimed and game saved successfully!".to_string(),
            Err(e) => {
                warn!("Post-claim save failed: {}", e);
                "Gift claimed, but the game could not be saved.".to_string()
            }
        };

        info!("Gift code {} redeemed", address);
        Ok(ClaimReport {
            effect_message,
            final_message,
        })
    }

    fn apply_effect(
        &self,
        state: &mut PlayerState,
        gift: GiftPackage,
    ) -> Result<String, LockerError> {
        match gift {
            GiftPackage::Creature { value } => {
                if state.party_full() {
                    return Err(LockerError::CapacityExceeded { incoming: 1 });
                }
                let species = value.species.clone();
                state.party.push(value);
                Ok(format!("You received a {species}!"))
            }
            GiftPackage::Item { value, quantity } => {
                let name = item_name(&value).ok_or_else(|| {
                    LockerError::CorruptPayload(format!("unknown item id: {value}"))
                })?;
                state.add_item(&value, quantity);
                Ok(format!("You received {quantity} x {name}!"))
            }
            GiftPackage::Money { value } => {
                state.money += value;
                Ok(format!("You received ${value}!"))
            }
            GiftPackage::Cosmetic { value } => {
                if state.supports_cosmetics {
                    state.cosmetics.push(value);
                    Ok("You received a new cosmetic!".to_string())
                } else {
                    Err(LockerError::UnsupportedEffect("Cosmetics".to_string()))
                }
            }
            GiftPackage::Unknown => Ok("You received a mysterious gift!".to_string()),
        }
    }
}

// ============================================================================
// Authoring
// ============================================================================

/// Encode a package to the blob a gift author deposits at their code.
pub fn author_blob(gift: &GiftPackage) -> Result<String, LockerError> {
    encode_gift(gift)
}

/// Encode and deposit a package at a (normalized) code in one step.
pub async fn publish_gift(
    client: &dyn RemoteLocker,
    code: &str,
    gift: &GiftPackage,
) -> Result<String, LockerError> {
    let address = code.trim().to_uppercase();
    let blob = author_blob(gift)?;
    client.put(&address, &blob).await?;
    info!("Published gift at code {}", address);
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD_NO_PAD;
    use base64::Engine as _;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MemoryLocker {
        records: Mutex<HashMap<String, String>>,
    }

    impl MemoryLocker {
        fn new() -> Self {
            Self {
                records: Mutex::new(HashMap::new()),
            }
        }

        fn seed(&self, address: &str, blob: &str) {
            self.records
                .lock()
                .unwrap()
                .insert(address.to_string(), blob.to_string());
        }

        fn stored(&self, address: &str) -> bool {
            self.records.lock().unwrap().contains_key(address)
        }
    }

    #[async_trait]
    impl RemoteLocker for MemoryLocker {
        async fn put(&self, address: &str, blob: &str) -> Result<(), LockerError> {
            self.seed(address, blob);
            Ok(())
        }

        async fn get(&self, address: &str) -> Result<Fetched, LockerError> {
            Ok(match self.records.lock().unwrap().get(address) {
                Some(blob) => Fetched::Found(blob.clone()),
                None => Fetched::Missing,
            })
        }

        async fn delete(&self, address: &str) -> Result<(), LockerError> {
            self.records.lock().unwrap().remove(address);
            Ok(())
        }
    }

    struct CountingSaver {
        saves: AtomicUsize,
    }

    impl CountingSaver {
        fn new() -> Self {
            Self {
                saves: AtomicUsize::new(0),
            }
        }

        fn count(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GameSaver for CountingSaver {
        async fn save_game(&self, _state: &PlayerState) -> anyhow::Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn creature_gift(species: &str) -> GiftPackage {
        GiftPackage::Creature {
            value: Creature {
                species: species.to_string(),
                nickname: None,
                level: 5,
                egg: false,
            },
        }
    }

    fn raw_blob(json: &str) -> String {
        STANDARD_NO_PAD.encode(json.as_bytes())
    }

    #[tokio::test]
    async fn test_creature_gift_claims_once_with_normalized_code() {
        let locker = MemoryLocker::new();
        let saver = CountingSaver::new();
        locker.seed("WELCOME1", &author_blob(&creature_gift("Starling")).unwrap());

        let mut state = PlayerState::default();
        let dispatcher = GiftDispatcher::new(&locker, &saver);
        let report = dispatcher.claim(&mut state, "  welcome1 ").await.unwrap();

        assert_eq!(state.party.len(), 1);
        assert!(report.effect_message.contains("Starling"));
        assert_ne!(report.effect_message, report.final_message);
        assert_eq!(saver.count(), 1);
        // One-shot code: consumed after the claim.
        assert!(!locker.stored("WELCOME1"));
    }

    #[tokio::test]
    async fn test_creature_gift_rejected_at_capacity() {
        let locker = MemoryLocker::new();
        let saver = CountingSaver::new();
        locker.seed("FULLHOUSE", &author_blob(&creature_gift("Starling")).unwrap());

        let mut state = PlayerState::default();
        for i in 0..6 {
            state.party.push(Creature {
                species: format!("Filler{i}"),
                nickname: None,
                level: 1,
                egg: false,
            });
        }

        let dispatcher = GiftDispatcher::new(&locker, &saver);
        let err = dispatcher.claim(&mut state, "FULLHOUSE").await.unwrap_err();
        assert!(matches!(err, LockerError::CapacityExceeded { .. }));
        assert_eq!(state.party.len(), 6);
        assert_eq!(saver.count(), 0);
        // A refused claim never consumes the code.
        assert!(locker.stored("FULLHOUSE"));
    }

    #[tokio::test]
    async fn test_item_gift_validates_catalog() {
        let locker = MemoryLocker::new();
        let saver = CountingSaver::new();

        let good = GiftPackage::Item {
            value: "POTION".to_string(),
            quantity: 3,
        };
        locker.seed("ITEMCODE", &author_blob(&good).unwrap());
        locker.seed(
            "BADITEM",
            &raw_blob(r#"{"type":"item","value":"MISSINGNO","quantity":1}"#),
        );

        let mut state = PlayerState::default();
        let dispatcher = GiftDispatcher::new(&locker, &saver);

        let report = dispatcher.claim(&mut state, "ITEMCODE").await.unwrap();
        assert!(report.effect_message.contains("3 x Potion"));
        assert_eq!(state.bag[0].quantity, 3);

        let err = dispatcher.claim(&mut state, "BADITEM").await.unwrap_err();
        assert!(matches!(err, LockerError::CorruptPayload(_)));
        assert!(locker.stored("BADITEM"));
    }

    #[tokio::test]
    async fn test_money_gift_coerces_string_amounts() {
        let locker = MemoryLocker::new();
        let saver = CountingSaver::new();
        locker.seed("PAYDAY", &raw_blob(r#"{"type":"money","value":"2500"}"#));

        let mut state = PlayerState::default();
        let dispatcher = GiftDispatcher::new(&locker, &saver);
        dispatcher.claim(&mut state, "PAYDAY").await.unwrap();
        assert_eq!(state.money, 2500);
    }

    #[tokio::test]
    async fn test_default_quantity_is_one() {
        let locker = MemoryLocker::new();
        let saver = CountingSaver::new();
        locker.seed("ONEITEM", &raw_blob(r#"{"type":"item","value":"REVIVE"}"#));

        let mut state = PlayerState::default();
        let dispatcher = GiftDispatcher::new(&locker, &saver);
        let report = dispatcher.claim(&mut state, "ONEITEM").await.unwrap();
        assert!(report.effect_message.contains("1 x Revive"));
    }

    #[tokio::test]
    async fn test_cosmetic_unsupported_still_completes_claim() {
        let locker = MemoryLocker::new();
        let saver = CountingSaver::new();
        let gift = GiftPackage::Cosmetic {
            value: "crimson_scarf".to_string(),
        };
        locker.seed("SCARF", &author_blob(&gift).unwrap());

        let mut state = PlayerState::default();
        assert!(!state.supports_cosmetics);

        let dispatcher = GiftDispatcher::new(&locker, &saver);
        let report = dispatcher.claim(&mut state, "SCARF").await.unwrap();
        assert!(report.effect_message.contains("not supported"));
        assert!(state.cosmetics.is_empty());
        // The code is consumed and the game saved all the same.
        assert!(!locker.stored("SCARF"));
        assert_eq!(saver.count(), 1);
    }

    #[tokio::test]
    async fn test_cosmetic_applied_when_supported() {
        let locker = MemoryLocker::new();
        let saver = CountingSaver::new();
        let gift = GiftPackage::Cosmetic {
            value: "crimson_scarf".to_string(),
        };
        locker.seed("SCARF", &author_blob(&gift).unwrap());

        let mut state = PlayerState {
            supports_cosmetics: true,
            ..Default::default()
        };
        let dispatcher = GiftDispatcher::new(&locker, &saver);
        dispatcher.claim(&mut state, "SCARF").await.unwrap();
        assert_eq!(state.cosmetics, vec!["crimson_scarf".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_gift_type_acknowledged_and_consumed() {
        let locker = MemoryLocker::new();
        let saver = CountingSaver::new();
        locker.seed(
            "FUTURE",
            &raw_blob(r#"{"type":"blessing","value":"???" }"#),
        );

        let mut state = PlayerState::default();
        let dispatcher = GiftDispatcher::new(&locker, &saver);
        let report = dispatcher.claim(&mut state, "FUTURE").await.unwrap();
        assert!(report.effect_message.contains("mysterious"));
        assert!(!locker.stored("FUTURE"));
    }

    #[tokio::test]
    async fn test_permanent_code_survives_repeat_claims() {
        let locker = MemoryLocker::new();
        let saver = CountingSaver::new();
        locker.seed("GIFT_WELCOME", &author_blob(&creature_gift("Starling")).unwrap());

        let dispatcher = GiftDispatcher::new(&locker, &saver);
        for _ in 0..2 {
            let mut state = PlayerState::default();
            dispatcher.claim(&mut state, "gift_welcome").await.unwrap();
            assert_eq!(state.party.len(), 1);
        }
        assert!(locker.stored("GIFT_WELCOME"));
    }

    #[tokio::test]
    async fn test_empty_code_is_refused_without_network() {
        let locker = MemoryLocker::new();
        let saver = CountingSaver::new();
        let dispatcher = GiftDispatcher::new(&locker, &saver);

        let mut state = PlayerState::default();
        let err = dispatcher.claim(&mut state, "   ").await.unwrap_err();
        assert!(matches!(err, LockerError::InvalidSelection(_)));
    }

    #[tokio::test]
    async fn test_publish_normalizes_code() {
        let locker = MemoryLocker::new();
        let address = publish_gift(&locker, " spring2026 ", &creature_gift("Starling"))
            .await
            .unwrap();
        assert_eq!(address, "SPRING2026");
        assert!(locker.stored("SPRING2026"));
    }
}
