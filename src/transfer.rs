//! Claim/transfer orchestrator
//!
//! Drives one deposit or withdrawal at a time through the phases
//! `Idle -> Validating -> AwaitingRemote -> ApplyingLocal -> Cleanup
//! -> Done | Failed`. The ordering rule is strict: local state is
//! never mutated before the remote operation that licenses it has
//! confirmed success. The one place the other direction holds —
//! withdrawal applies creatures before issuing the cleanup delete —
//! is an accepted duplication window: a crash between the two leaves
//! the record claimable again.

use tracing::{debug, info, warn};

use crate::client::{Fetched, RemoteLocker};
use crate::codec::{decode_transfer, encode_transfer, TransferUnit};
use crate::error::LockerError;
use crate::party::{PlayerState, PARTY_CAP};
use crate::registry::IdentityRegistry;

/// Most creatures allowed in one multi-deposit.
pub const MAX_DEPOSIT: usize = 5;
/// The party may never be emptied below this after a deposit.
pub const MIN_PARTY_REMAINING: usize = 1;

/// Addresses with this prefix are never deleted by a claim flow.
pub const PERMANENT_PREFIX: &str = "GIFT_";

/// Whether a locker address carries the permanent marker.
pub fn is_permanent(address: &str) -> bool {
    address.starts_with(PERMANENT_PREFIX)
}

/// Where a transaction currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    Idle,
    Validating,
    AwaitingRemote,
    ApplyingLocal,
    Cleanup,
    Done,
    Failed,
}

/// Successful terminal report for one transaction.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// Player-facing message.
    pub message: String,
    /// Creatures moved by this transaction.
    pub moved: usize,
}

/// One orchestrator drives one transaction at a time; calls reset it.
pub struct TransferOrchestrator<'a> {
    client: &'a dyn RemoteLocker,
    registry: &'a IdentityRegistry,
    game_title: String,
    phase: TransferPhase,
}

impl<'a> TransferOrchestrator<'a> {
    pub fn new(
        client: &'a dyn RemoteLocker,
        registry: &'a IdentityRegistry,
        game_title: impl Into<String>,
    ) -> Self {
        Self {
            client,
            registry,
            game_title: game_title.into(),
            phase: TransferPhase::Idle,
        }
    }

    pub fn phase(&self) -> TransferPhase {
        self.phase
    }

    fn advance(&mut self, next: TransferPhase) {
        debug!("transfer phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// Deposit the selected party members into this save's own locker.
    ///
    /// Validation happens before any remote call; the local party is
    /// only touched after the store has confirmed the deposit, so a
    /// network failure can never lose a creature.
    pub async fn deposit(
        &mut self,
        state: &mut PlayerState,
        indices: &[usize],
    ) -> Result<TransferOutcome, LockerError> {
        self.phase = TransferPhase::Idle;
        let result = self.deposit_inner(state, indices).await;
        if let Err(ref e) = result {
            self.advance(TransferPhase::Failed);
            warn!("deposit failed: {}", e);
        }
        result
    }

    async fn deposit_inner(
        &mut self,
        state: &mut PlayerState,
        indices: &[usize],
    ) -> Result<TransferOutcome, LockerError> {
        self.advance(TransferPhase::Validating);
        self.validate_selection(state, indices)?;

        let batch: Vec<_> = indices.iter().map(|&i| state.party[i].clone()).collect();
        let unit = TransferUnit::from_batch(batch);
        let moved = unit.count();
        let blob = encode_transfer(&unit)?;
        let address = state.locker_address();

        self.advance(TransferPhase::AwaitingRemote);
        self.client.put(&address, &blob).await?;

        self.advance(TransferPhase::ApplyingLocal);
        let mut removal: Vec<usize> = indices.to_vec();
        removal.sort_unstable();
        for &i in removal.iter().rev() {
            state.party.remove(i);
        }

        self.advance(TransferPhase::Cleanup);
        if let Err(e) = self.registry.record_self(&self.game_title, &address) {
            // The deposit itself is complete; a sibling save just
            // won't discover this locker until the next write succeeds.
            warn!("Failed to record identity in registry: {}", e);
        }

        self.advance(TransferPhase::Done);
        info!("Deposited {} creature(s) at {}", moved, address);
        Ok(TransferOutcome {
            message: if moved == 1 {
                "Success! The creature was moved to the cloud.".to_string()
            } else {
                "Success! The creatures were moved to the cloud.".to_string()
            },
            moved,
        })
    }

    fn validate_selection(
        &self,
        state: &PlayerState,
        indices: &[usize],
    ) -> Result<(), LockerError> {
        if indices.is_empty() {
            return Err(LockerError::InvalidSelection(
                "Nothing was selected.".to_string(),
            ));
        }
        if indices.len() > MAX_DEPOSIT {
            return Err(LockerError::InvalidSelection(format!(
                "You can deposit at most {MAX_DEPOSIT} creatures at a time!"
            )));
        }

        let mut seen = indices.to_vec();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != indices.len() {
            return Err(LockerError::InvalidSelection(
                "That creature is already selected!".to_string(),
            ));
        }

        for &i in indices {
            let creature = state.party.get(i).ok_or_else(|| {
                LockerError::InvalidSelection("That selection is out of range.".to_string())
            })?;
            if creature.egg {
                return Err(LockerError::InvalidSelection(
                    "Eggs cannot be deposited!".to_string(),
                ));
            }
        }

        if state.party.len() - indices.len() < MIN_PARTY_REMAINING {
            return Err(LockerError::InvalidSelection(
                "You must keep at least one creature in your party!".to_string(),
            ));
        }

        Ok(())
    }

    /// Withdraw from this save's own locker.
    pub async fn withdraw_self(
        &mut self,
        state: &mut PlayerState,
    ) -> Result<TransferOutcome, LockerError> {
        let address = state.locker_address();
        self.withdraw(state, &address).await
    }

    /// Withdraw from an arbitrary locker address (own or a reunion
    /// target). Capacity is checked only once the payload's count is
    /// known, i.e. post-fetch and pre-apply.
    pub async fn withdraw(
        &mut self,
        state: &mut PlayerState,
        address: &str,
    ) -> Result<TransferOutcome, LockerError> {
        self.phase = TransferPhase::Idle;
        let result = self.withdraw_inner(state, address).await;
        if let Err(ref e) = result {
            self.advance(TransferPhase::Failed);
            warn!("withdrawal from {} failed: {}", address, e);
        }
        result
    }

    async fn withdraw_inner(
        &mut self,
        state: &mut PlayerState,
        address: &str,
    ) -> Result<TransferOutcome, LockerError> {
        self.advance(TransferPhase::Validating);
        if address.trim().is_empty() {
            return Err(LockerError::NotFound);
        }

        self.advance(TransferPhase::AwaitingRemote);
        let blob = match self.client.get(address).await? {
            Fetched::Found(blob) => blob,
            Fetched::Missing => return Err(LockerError::NotFound),
        };

        let unit = decode_transfer(&blob)?;
        let incoming = unit.count();
        if state.party.len() + incoming > PARTY_CAP {
            return Err(LockerError::CapacityExceeded { incoming });
        }

        self.advance(TransferPhase::ApplyingLocal);
        state.party.extend(unit.into_creatures());

        self.advance(TransferPhase::Cleanup);
        if is_permanent(address) {
            debug!("Address {} is permanent; skipping delete", address);
        } else if let Err(e) = self.client.delete(address).await {
            // Best effort: the creatures are already home. The record
            // stays claimable until a later delete lands.
            warn!("Cleanup delete at {} failed: {}", address, e);
        }

        self.advance(TransferPhase::Done);
        info!("Withdrew {} creature(s) from {}", incoming, address);
        Ok(TransferOutcome {
            message: if incoming == 1 {
                "Transfer complete! The creature has returned.".to_string()
            } else {
                "Transfer complete! The creatures have returned.".to_string()
            },
            moved: incoming,
        })
    }

    /// Reunion scan: every sibling save's registered locker, in
    /// deterministic order, excluding this game's own entry.
    pub fn reunion_candidates(&self) -> Result<Vec<(String, String)>, LockerError> {
        self.registry.list_others(&self.game_title)
    }
}
