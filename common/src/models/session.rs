// common/src/models/session.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection lifecycle of the wallet session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Network identifier as reported by the wallet, e.g. `0x1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(String);

impl ChainId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric chain id, accepting both `0x`-prefixed hex and decimal forms
    pub fn as_u64(&self) -> Option<u64> {
        match self.0.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => self.0.parse().ok(),
        }
    }

    pub fn network_name(&self) -> &'static str {
        match self.as_u64() {
            Some(1) => "Ethereum Mainnet",
            Some(10) => "Optimism",
            Some(137) => "Polygon",
            Some(8453) => "Base",
            Some(42161) => "Arbitrum One",
            Some(11155111) => "Sepolia",
            _ => "Unknown network",
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only view of the wallet session handed out to consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub status: ConnectionStatus,
    pub address: Option<String>,
    pub chain_id: Option<ChainId>,
}

impl WalletSnapshot {
    pub fn disconnected() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            address: None,
            chain_id: None,
        }
    }

    /// Connected exactly when an address is held
    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }
}
