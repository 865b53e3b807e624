//! Remote locker client
//!
//! Thin wrapper over the locker service's three routes. Absence is a
//! value (`Fetched::Missing`), not an error; every transport fault
//! collapses to `ConnectionFailed`. No retries — a transfer either
//! sees the remote operation succeed or reports the failure.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::LockerConfig;
use crate::error::LockerError;

/// Result of a `get`: the stored blob, or nothing at that address.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Found(String),
    Missing,
}

/// The remote store seam. Implemented by the HTTP client and by the
/// in-memory double the transfer tests use.
#[async_trait]
pub trait RemoteLocker: Send + Sync {
    /// Overwrite the record at `address` with `blob`.
    async fn put(&self, address: &str, blob: &str) -> Result<(), LockerError>;

    /// Read the record at `address` without removing it.
    async fn get(&self, address: &str) -> Result<Fetched, LockerError>;

    /// Remove the record at `address`.
    async fn delete(&self, address: &str) -> Result<(), LockerError>;
}

/// HTTP implementation talking to the locker service.
pub struct HttpLocker {
    client: Client,
    api_url: String,
}

impl HttpLocker {
    pub fn new(config: &LockerConfig) -> Result<Self, LockerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LockerError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RemoteLocker for HttpLocker {
    async fn put(&self, address: &str, blob: &str) -> Result<(), LockerError> {
        let response = self
            .client
            .post(format!("{}/save", self.api_url))
            .form(&[("id", address), ("data", blob)])
            .send()
            .await
            .map_err(|e| LockerError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LockerError::ConnectionFailed(format!(
                "save returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LockerError::ConnectionFailed(e.to_string()))?;

        // The service acknowledges with a fixed token; anything else
        // means the deposit did not land.
        if body.contains("OK") {
            Ok(())
        } else {
            Err(LockerError::ConnectionFailed(format!(
                "unexpected save response: {body}"
            )))
        }
    }

    async fn get(&self, address: &str) -> Result<Fetched, LockerError> {
        let response = self
            .client
            .get(format!("{}/get", self.api_url))
            .query(&[("id", address)])
            .send()
            .await
            .map_err(|e| LockerError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LockerError::ConnectionFailed(format!(
                "get returned {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| LockerError::ConnectionFailed(e.to_string()))?;

        // Application-level absence rides on a 200; the body is the signal.
        if body.is_empty() || body == "NOT_FOUND" {
            Ok(Fetched::Missing)
        } else {
            Ok(Fetched::Found(body))
        }
    }

    async fn delete(&self, address: &str) -> Result<(), LockerError> {
        let response = self
            .client
            .get(format!("{}/delete", self.api_url))
            .query(&[("id", address)])
            .send()
            .await
            .map_err(|e| LockerError::ConnectionFailed(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LockerError::ConnectionFailed(format!(
                "delete returned {}",
                response.status()
            )))
        }
    }
}
