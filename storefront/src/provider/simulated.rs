// storefront/src/provider/simulated.rs
use async_trait::async_trait;
use common::SimulatedWalletConfig;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use super::{ProviderError, ProviderEvent, RpcRequest, WalletProvider};

// EIP-1193 "unauthorized" code
const UNAUTHORIZED_CODE: i64 = 4100;

struct WalletState {
    accounts: Vec<String>,
    chain_id: String,
    authorized: bool,
    reject_connect: bool,
    reject_signing: bool,
}

/// In-process wallet used by the demo binary and the tests.
///
/// Behaves like an injected browser wallet: account access must be granted
/// through `eth_requestAccounts` before `eth_accounts` reports anything.
/// Every request method is recorded so callers can check what was asked.
pub struct SimulatedWallet {
    state: Mutex<WalletState>,
    calls: Mutex<Vec<String>>,
    events: broadcast::Sender<ProviderEvent>,
}

impl SimulatedWallet {
    pub fn new(accounts: Vec<String>, chain_id: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(WalletState {
                accounts,
                chain_id: chain_id.into(),
                authorized: false,
                reject_connect: false,
                reject_signing: false,
            }),
            calls: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn from_config(config: &SimulatedWalletConfig) -> Self {
        Self::new(config.accounts.clone(), config.chain_id.clone()).with_authorized(config.authorized)
    }

    /// Accounts already granted to this site, as after a previous visit
    pub fn with_authorized(self, authorized: bool) -> Self {
        self.state().authorized = authorized;
        self
    }

    pub fn set_reject_connect(&self, reject: bool) {
        self.state().reject_connect = reject;
    }

    pub fn set_reject_signing(&self, reject: bool) {
        self.state().reject_signing = reject;
    }

    /// Switch the active account and notify listeners
    pub fn switch_account(&self, account: impl Into<String>) {
        let account = account.into();
        let accounts = {
            let mut state = self.state();
            state.accounts.retain(|a| !a.eq_ignore_ascii_case(&account));
            state.accounts.insert(0, account);
            if state.authorized {
                state.accounts.clone()
            } else {
                Vec::new()
            }
        };
        self.emit(ProviderEvent::AccountsChanged(accounts));
    }

    /// Switch network and notify listeners
    pub fn switch_chain(&self, chain_id: impl Into<String>) {
        let chain_id = chain_id.into();
        self.state().chain_id = chain_id.clone();
        self.emit(ProviderEvent::ChainChanged(chain_id));
    }

    /// Lock the wallet; listeners see an empty account list
    pub fn lock(&self) {
        self.state().authorized = false;
        self.emit(ProviderEvent::AccountsChanged(Vec::new()));
    }

    pub fn emit(&self, event: ProviderEvent) {
        // No receivers is fine, nobody is listening yet
        if self.events.send(event).is_err() {
            tracing::debug!("Simulated wallet event dropped, no listeners");
        }
    }

    /// Method names of every request received so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls().iter().filter(|m| m.as_str() == method).count()
    }

    fn state(&self) -> MutexGuard<'_, WalletState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, method: &str) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(method.to_string());
    }
}

/// Deterministic stand-in for a wallet signature
pub fn simulated_signature(account: &str, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(account.to_lowercase().as_bytes());
    hasher.update(b":");
    hasher.update(message.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

#[async_trait]
impl WalletProvider for SimulatedWallet {
    async fn request(&self, request: RpcRequest) -> Result<Value, ProviderError> {
        self.record(request.method());
        tracing::debug!("Simulated wallet request: {}", request.to_json());

        let mut state = self.state();
        match request {
            RpcRequest::RequestAccounts => {
                if state.reject_connect {
                    return Err(ProviderError::user_rejected());
                }
                state.authorized = true;
                Ok(json!(state.accounts))
            }
            RpcRequest::Accounts => {
                if state.authorized {
                    Ok(json!(state.accounts))
                } else {
                    Ok(json!([]))
                }
            }
            RpcRequest::ChainId => Ok(json!(state.chain_id)),
            RpcRequest::PersonalSign { message, account } => {
                if state.reject_signing {
                    return Err(ProviderError::user_rejected());
                }
                let known = state.accounts.iter().any(|a| a.eq_ignore_ascii_case(&account));
                if !state.authorized || !known {
                    return Err(ProviderError {
                        code: UNAUTHORIZED_CODE,
                        message: format!("account {} is not authorized", account),
                    });
                }
                Ok(json!(simulated_signature(&account, &message)))
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
