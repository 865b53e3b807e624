//! Locker error taxonomy
//!
//! Every failure a transfer or claim can hit maps to exactly one of
//! these variants, and each variant's Display string is the message
//! shown to the player. Nothing here is allowed to escape a
//! transaction as a panic.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockerError {
    /// Transport-level failure: timeout, unreachable host, non-2xx status.
    #[error("Connection failed! Please try again later.")]
    ConnectionFailed(String),

    /// The address is valid but nothing is stored there. A normal
    /// outcome, not a fault.
    #[error("Nothing was found in that locker.")]
    NotFound,

    /// The stored blob could not be decoded into any expected shape.
    #[error("The stored data is corrupted and could not be read.")]
    CorruptPayload(String),

    /// Applying the incoming creatures would push the party past its cap.
    #[error("Not enough room in the party for {incoming} more!")]
    CapacityExceeded { incoming: usize },

    /// A recognized effect this build cannot apply (e.g. cosmetics
    /// on a build without cosmetic support).
    #[error("{0} is not supported in this build.")]
    UnsupportedEffect(String),

    /// The identity registry file exists but could not be parsed.
    #[error("The identity registry is corrupted.")]
    RegistryUnreadable,

    /// A deposit selection that fails validation before any remote
    /// call is made (batch too large, party floor, egg, bad index).
    #[error("{0}")]
    InvalidSelection(String),
}

impl LockerError {
    /// The player-facing message for this failure.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_cause_has_a_distinct_message() {
        let errors = [
            LockerError::ConnectionFailed("timeout".into()),
            LockerError::NotFound,
            LockerError::CorruptPayload("bad base64".into()),
            LockerError::CapacityExceeded { incoming: 3 },
            LockerError::UnsupportedEffect("Cosmetics".into()),
            LockerError::RegistryUnreadable,
            LockerError::InvalidSelection("You must keep at least one creature!".into()),
        ];

        let messages: Vec<String> = errors.iter().map(|e| e.user_message()).collect();
        for (i, a) in messages.iter().enumerate() {
            assert!(!a.is_empty());
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
