//! Transport payload codec
//!
//! Everything that crosses the wire is serde_json serialized and then
//! wrapped in unpadded base64 so the blob is safe inside a form body
//! or query parameter. Decoding is defensive: bad base64, bad JSON, or
//! an unexpected shape all surface as `CorruptPayload`, never a panic.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::LockerError;
use crate::gift::GiftPackage;
use crate::party::Creature;

/// What one deposit or withdrawal moves: a lone creature from a
/// single-slot selection, or the ordered batch from a multi-select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransferUnit {
    Party(Vec<Creature>),
    Single(Creature),
}

impl TransferUnit {
    /// Wrap a selection, collapsing a one-element batch to `Single`.
    pub fn from_batch(mut batch: Vec<Creature>) -> Self {
        if batch.len() == 1 {
            TransferUnit::Single(batch.remove(0))
        } else {
            TransferUnit::Party(batch)
        }
    }

    /// Number of creatures this unit carries.
    pub fn count(&self) -> usize {
        match self {
            TransferUnit::Single(_) => 1,
            TransferUnit::Party(batch) => batch.len(),
        }
    }

    /// Flatten into the list of creatures, preserving order.
    pub fn into_creatures(self) -> Vec<Creature> {
        match self {
            TransferUnit::Single(creature) => vec![creature],
            TransferUnit::Party(batch) => batch,
        }
    }
}

fn encode_value<T: Serialize>(value: &T) -> Result<String, LockerError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| LockerError::CorruptPayload(format!("serialize: {e}")))?;
    Ok(STANDARD_NO_PAD.encode(bytes))
}

fn decode_value<T: DeserializeOwned>(blob: &str) -> Result<T, LockerError> {
    let bytes = STANDARD_NO_PAD
        .decode(blob.trim())
        .map_err(|e| LockerError::CorruptPayload(format!("base64: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| LockerError::CorruptPayload(format!("json: {e}")))
}

/// Encode a transfer unit to its transport blob.
pub fn encode_transfer(unit: &TransferUnit) -> Result<String, LockerError> {
    encode_value(unit)
}

/// Decode a transport blob back into a transfer unit.
pub fn decode_transfer(blob: &str) -> Result<TransferUnit, LockerError> {
    decode_value(blob)
}

/// Encode a gift package to its transport blob.
pub fn encode_gift(gift: &GiftPackage) -> Result<String, LockerError> {
    encode_value(gift)
}

/// Decode a transport blob into a gift package.
pub fn decode_gift(blob: &str) -> Result<GiftPackage, LockerError> {
    decode_value(blob)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::party::Creature;

    fn creature(species: &str, level: u32) -> Creature {
        Creature {
            species: species.to_string(),
            nickname: None,
            level,
            egg: false,
        }
    }

    #[test]
    fn test_single_round_trip() {
        let unit = TransferUnit::from_batch(vec![creature("Emberfox", 12)]);
        assert!(matches!(unit, TransferUnit::Single(_)));

        let blob = encode_transfer(&unit).unwrap();
        assert_eq!(decode_transfer(&blob).unwrap(), unit);
    }

    #[test]
    fn test_batch_round_trips_up_to_cap() {
        for n in 2..=5usize {
            let batch: Vec<Creature> = (0..n)
                .map(|i| creature(&format!("Species{i}"), 5 + i as u32))
                .collect();
            let unit = TransferUnit::from_batch(batch);
            let blob = encode_transfer(&unit).unwrap();
            let decoded = decode_transfer(&blob).unwrap();
            assert_eq!(decoded, unit);
            assert_eq!(decoded.count(), n);
        }
    }

    #[test]
    fn test_malformed_base64_is_corrupt_payload() {
        let err = decode_transfer("!!! not base64 !!!").unwrap_err();
        assert!(matches!(err, LockerError::CorruptPayload(_)));
    }

    #[test]
    fn test_foreign_shape_is_corrupt_payload() {
        // Valid base64, valid JSON, but neither a creature nor a list of them.
        let blob = STANDARD_NO_PAD.encode(br#"{"foo": 42}"#);
        let err = decode_transfer(&blob).unwrap_err();
        assert!(matches!(err, LockerError::CorruptPayload(_)));
    }
}
