// storefront/src/actors/wallet_session.rs
use actix::prelude::*;
use common::models::session::{ChainId, ConnectionStatus, WalletSnapshot};
use common::SessionChanged;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;
use crate::errors::WalletError;
use crate::provider::{parse_accounts, parse_string, ProviderError, ProviderEvent, RpcRequest, WalletProvider};
use crate::storage::FlagStore;

pub const DEFAULT_AUTOCONNECT_KEY: &str = "wallet_autoconnect";

/// Ask the wallet for account access (prompts the user)
#[derive(Message)]
#[rtype(result = "Result<WalletSnapshot, WalletError>")]
pub struct Connect;

/// Forget the connected account locally
#[derive(Message)]
#[rtype(result = "WalletSnapshot")]
pub struct Disconnect;

/// Sign `message` with the connected account
#[derive(Message)]
#[rtype(result = "Result<String, WalletError>")]
pub struct SignMessage {
    pub message: String,
}

#[derive(Message)]
#[rtype(result = "WalletSnapshot")]
pub struct GetSnapshot;

/// Register for `SessionChanged` notifications
#[derive(Message)]
#[rtype(result = "SessionSubscription")]
pub struct Subscribe {
    pub recipient: Recipient<SessionChanged>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Unsubscribe {
    pub id: Uuid,
}

impl Message for ProviderEvent {
    type Result = ();
}

/// Handle for a session listener; unsubscribes when closed or dropped
pub struct SessionSubscription {
    id: Uuid,
    session: Option<Addr<WalletSessionActor>>,
}

impl SessionSubscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn close(mut self) {
        self.unsubscribe();
    }

    fn unsubscribe(&mut self) {
        if let Some(session) = self.session.take() {
            session.do_send(Unsubscribe { id: self.id });
        }
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Single source of truth for wallet connectivity.
///
/// Start one per process and hand its `Addr` to every consumer. Requests
/// that reach the wallet are handled atomically, so at most one external
/// call is in flight for a session.
pub struct WalletSessionActor {
    provider: Option<Arc<dyn WalletProvider>>,
    store: Arc<dyn FlagStore>,
    autoconnect_key: String,
    connecting: bool,
    address: Option<String>,
    chain_id: Option<ChainId>,
    subscribers: HashMap<Uuid, Recipient<SessionChanged>>,
}

impl WalletSessionActor {
    /// `provider` is `None` when no wallet extension is installed
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, store: Arc<dyn FlagStore>) -> Self {
        Self {
            provider,
            store,
            autoconnect_key: DEFAULT_AUTOCONNECT_KEY.to_string(),
            connecting: false,
            address: None,
            chain_id: None,
            subscribers: HashMap::new(),
        }
    }

    pub fn with_autoconnect_key(mut self, key: impl Into<String>) -> Self {
        self.autoconnect_key = key.into();
        self
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        let status = if self.connecting {
            ConnectionStatus::Connecting
        } else if self.address.is_some() {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        };

        WalletSnapshot {
            status,
            address: self.address.clone(),
            chain_id: self.chain_id.clone(),
        }
    }

    fn broadcast(&mut self) {
        self.subscribers.retain(|_, recipient| recipient.connected());
        if self.subscribers.is_empty() {
            return;
        }

        let snapshot = self.snapshot();
        for recipient in self.subscribers.values() {
            recipient.do_send(SessionChanged {
                snapshot: snapshot.clone(),
            });
        }
    }

    fn set_flag(&self) {
        if let Err(e) = self.store.set(&self.autoconnect_key, "1") {
            tracing::warn!("Failed to persist reconnect flag: {}", e);
        }
    }

    fn clear_flag(&self) {
        if let Err(e) = self.store.remove(&self.autoconnect_key) {
            tracing::warn!("Failed to clear reconnect flag: {}", e);
        }
    }

    fn flag_is_set(&self) -> bool {
        self.store.is_set(&self.autoconnect_key).unwrap_or_else(|e| {
            tracing::warn!("Failed to read reconnect flag: {}", e);
            false
        })
    }

    fn reset(&mut self) {
        self.address = None;
        self.chain_id = None;
        self.clear_flag();
    }

    fn apply_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.into_iter().next() {
                Some(account) => {
                    let account = account.to_lowercase();
                    tracing::info!("Wallet account changed to {}", account);
                    self.address = Some(account);
                    self.set_flag();
                }
                None => {
                    tracing::info!("Wallet reported no accounts, disconnecting");
                    self.reset();
                }
            },
            ProviderEvent::ChainChanged(chain_id) => {
                let chain_id = ChainId::new(chain_id);
                tracing::info!("Wallet chain changed to {} ({})", chain_id, chain_id.network_name());
                self.chain_id = Some(chain_id);
            }
        }
        self.broadcast();
    }

    // Silent reconnect for a user who connected on a previous run
    fn restore_session(&mut self, ctx: &mut Context<Self>) {
        let provider = match &self.provider {
            Some(provider) => provider.clone(),
            None => return,
        };
        if !self.flag_is_set() {
            tracing::debug!("Reconnect flag not set, staying disconnected");
            return;
        }

        let restore = query_authorized(provider)
            .into_actor(self)
            .map(|result, act, _ctx| {
                match result {
                    Ok(Some((account, chain_id))) => {
                        let account = account.to_lowercase();
                        tracing::info!("Restored wallet session for {}", account);
                        act.address = Some(account);
                        act.chain_id = chain_id.map(ChainId::new);
                        act.broadcast();
                    }
                    Ok(None) => tracing::info!("No authorized accounts to restore"),
                    Err(e) => tracing::warn!("Silent reconnect failed: {}", e),
                }
            });

        // Hold back every other message until the restore settles
        ctx.wait(restore);
    }

    // Events were dropped, so ask the wallet where things stand
    fn resync(&mut self, ctx: &mut Context<Self>) {
        let provider = match &self.provider {
            Some(provider) => provider.clone(),
            None => return,
        };
        if self.address.is_none() {
            tracing::debug!("Missed wallet events while disconnected, nothing to resync");
            return;
        }

        let resync = query_authorized(provider)
            .into_actor(self)
            .map(|result, act, _ctx| {
                match result {
                    Ok(Some((account, chain_id))) => {
                        let account = account.to_lowercase();
                        tracing::info!("Resynced wallet session for {}", account);
                        act.address = Some(account);
                        if let Some(chain_id) = chain_id {
                            act.chain_id = Some(ChainId::new(chain_id));
                        }
                    }
                    Ok(None) => {
                        tracing::info!("Wallet has no authorized accounts after resync, disconnecting");
                        act.reset();
                    }
                    Err(e) => tracing::warn!("Wallet resync failed: {}", e),
                }
                act.broadcast();
            });

        ctx.wait(resync);
    }
}

/// Silent `eth_accounts` then `eth_chainId`; never prompts the user
async fn query_authorized(
    provider: Arc<dyn WalletProvider>,
) -> Result<Option<(String, Option<String>)>, ProviderError> {
    let accounts = provider.request(RpcRequest::Accounts).await.and_then(parse_accounts)?;
    let account = match accounts.into_iter().next() {
        Some(account) => account,
        None => return Ok(None),
    };

    let chain_id = match provider.request(RpcRequest::ChainId).await.and_then(parse_string) {
        Ok(chain_id) => Some(chain_id),
        Err(e) => {
            tracing::warn!("Authorized account found without a chain id: {}", e);
            None
        }
    };
    Ok(Some((account, chain_id)))
}

impl Actor for WalletSessionActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        match &self.provider {
            Some(provider) => {
                tracing::info!("Wallet session started");
                ctx.add_stream(BroadcastStream::new(provider.subscribe()));
                self.restore_session(ctx);
            }
            None => tracing::info!("Wallet session started without a wallet extension"),
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            "Wallet session stopped with {} subscriber(s) attached",
            self.subscribers.len()
        );
    }
}

impl Handler<Connect> for WalletSessionActor {
    type Result = AtomicResponse<Self, Result<WalletSnapshot, WalletError>>;

    fn handle(&mut self, _msg: Connect, _ctx: &mut Self::Context) -> Self::Result {
        let provider = match &self.provider {
            Some(provider) => provider.clone(),
            None => {
                tracing::warn!("Connect requested but no wallet is installed");
                return AtomicResponse::new(Box::pin(fut::ready(Err(WalletError::CapabilityAbsent))));
            }
        };

        self.connecting = true;
        self.broadcast();

        AtomicResponse::new(Box::pin(
            async move {
                let accounts = provider
                    .request(RpcRequest::RequestAccounts)
                    .await
                    .and_then(parse_accounts)
                    .map_err(WalletError::from_connect)?;
                let account = accounts
                    .into_iter()
                    .next()
                    .ok_or_else(|| WalletError::ConnectionFailed("wallet returned no accounts".to_string()))?;
                let chain_id = provider
                    .request(RpcRequest::ChainId)
                    .await
                    .and_then(parse_string)
                    .map_err(WalletError::from_connect)?;
                Ok::<_, WalletError>((account, chain_id))
            }
            .into_actor(self)
            .map(|result, act, _ctx| {
                act.connecting = false;
                let outcome = match result {
                    Ok((account, chain_id)) => {
                        let account = account.to_lowercase();
                        tracing::info!("Wallet connected: {} on chain {}", account, chain_id);
                        act.address = Some(account);
                        act.chain_id = Some(ChainId::new(chain_id));
                        act.set_flag();
                        Ok(act.snapshot())
                    }
                    Err(e) => {
                        tracing::warn!("Wallet connection failed: {}", e);
                        Err(e)
                    }
                };
                act.broadcast();
                outcome
            }),
        ))
    }
}

impl Handler<Disconnect> for WalletSessionActor {
    type Result = MessageResult<Disconnect>;

    fn handle(&mut self, _msg: Disconnect, _ctx: &mut Self::Context) -> Self::Result {
        // The extension keeps its permission; only local state is reset
        self.reset();
        tracing::info!("Wallet disconnected");
        self.broadcast();
        MessageResult(self.snapshot())
    }
}

impl Handler<SignMessage> for WalletSessionActor {
    type Result = AtomicResponse<Self, Result<String, WalletError>>;

    fn handle(&mut self, msg: SignMessage, _ctx: &mut Self::Context) -> Self::Result {
        let account = match &self.address {
            Some(account) => account.clone(),
            None => {
                tracing::warn!("Signature requested without a connected wallet");
                return AtomicResponse::new(Box::pin(fut::ready(Err(WalletError::NotConnected))));
            }
        };
        let provider = match &self.provider {
            Some(provider) => provider.clone(),
            None => return AtomicResponse::new(Box::pin(fut::ready(Err(WalletError::CapabilityAbsent)))),
        };

        AtomicResponse::new(Box::pin(
            async move {
                provider
                    .request(RpcRequest::PersonalSign {
                        message: msg.message,
                        account,
                    })
                    .await
                    .and_then(parse_string)
                    .map_err(WalletError::from_signing)
            }
            .into_actor(self)
            .map(|result, _act, _ctx| {
                match &result {
                    Ok(_) => tracing::info!("Message signed"),
                    Err(e) => tracing::warn!("Signing failed: {}", e),
                }
                result
            }),
        ))
    }
}

impl Handler<GetSnapshot> for WalletSessionActor {
    type Result = MessageResult<GetSnapshot>;

    fn handle(&mut self, _msg: GetSnapshot, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.snapshot())
    }
}

impl Handler<Subscribe> for WalletSessionActor {
    type Result = MessageResult<Subscribe>;

    fn handle(&mut self, msg: Subscribe, ctx: &mut Self::Context) -> Self::Result {
        let id = Uuid::new_v4();
        msg.recipient.do_send(SessionChanged {
            snapshot: self.snapshot(),
        });
        self.subscribers.insert(id, msg.recipient);
        tracing::debug!("Session subscriber added: {}", id);

        MessageResult(SessionSubscription {
            id,
            session: Some(ctx.address()),
        })
    }
}

impl Handler<Unsubscribe> for WalletSessionActor {
    type Result = ();

    fn handle(&mut self, msg: Unsubscribe, _ctx: &mut Self::Context) -> Self::Result {
        if self.subscribers.remove(&msg.id).is_some() {
            tracing::debug!("Session subscriber removed: {}", msg.id);
        }
    }
}

impl Handler<ProviderEvent> for WalletSessionActor {
    type Result = ();

    fn handle(&mut self, msg: ProviderEvent, _ctx: &mut Self::Context) -> Self::Result {
        self.apply_event(msg);
    }
}

impl StreamHandler<Result<ProviderEvent, BroadcastStreamRecvError>> for WalletSessionActor {
    fn handle(&mut self, item: Result<ProviderEvent, BroadcastStreamRecvError>, ctx: &mut Self::Context) {
        match item {
            Ok(event) => self.apply_event(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!("Missed {} wallet events, resyncing", skipped);
                self.resync(ctx);
            }
        }
    }

    fn finished(&mut self, _ctx: &mut Self::Context) {
        // The wallet went away; keep serving local state
        tracing::info!("Wallet event stream closed");
    }
}
