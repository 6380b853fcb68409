// storefront/src/provider/mod.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::broadcast;

pub mod simulated;

pub use simulated::SimulatedWallet;

/// EIP-1193 code for a request the user declined
pub const USER_REJECTED_CODE: i64 = 4001;

/// Error object returned by the wallet for a failed request
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn user_rejected() -> Self {
        Self {
            code: USER_REJECTED_CODE,
            message: "User rejected the request.".to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED_CODE
    }
}

/// The four requests the storefront makes of a wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcRequest {
    /// Prompts the user for account access
    RequestAccounts,
    /// Silently lists already-authorized accounts
    Accounts,
    ChainId,
    PersonalSign { message: String, account: String },
}

impl RpcRequest {
    pub fn method(&self) -> &'static str {
        match self {
            RpcRequest::RequestAccounts => "eth_requestAccounts",
            RpcRequest::Accounts => "eth_accounts",
            RpcRequest::ChainId => "eth_chainId",
            RpcRequest::PersonalSign { .. } => "personal_sign",
        }
    }

    pub fn params(&self) -> Vec<Value> {
        match self {
            RpcRequest::PersonalSign { message, account } => {
                vec![Value::String(message.clone()), Value::String(account.clone())]
            }
            _ => Vec::new(),
        }
    }

    /// `{ "method": ..., "params": [...] }` as passed to an injected wallet
    pub fn to_json(&self) -> Value {
        json!({
            "method": self.method(),
            "params": self.params(),
        })
    }
}

/// Notifications pushed by the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(String),
}

/// Injected wallet capability.
///
/// Absence of a wallet is modelled by not having a provider at all, so an
/// implementation of this trait is always "installed".
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request(&self, request: RpcRequest) -> Result<Value, ProviderError>;

    /// Fresh receiver for account and chain notifications. Dropping the
    /// receiver removes the listener.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Decode an `eth_accounts`/`eth_requestAccounts` reply
pub fn parse_accounts(value: Value) -> Result<Vec<String>, ProviderError> {
    serde_json::from_value::<Vec<String>>(value)
        .map_err(|e| ProviderError::internal(format!("malformed account list: {}", e)))
}

/// Decode a reply that must be a single string (chain id, signature)
pub fn parse_string(value: Value) -> Result<String, ProviderError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ProviderError::internal(format!("expected a string, got {}", other))),
    }
}
