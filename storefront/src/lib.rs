// storefront/src/lib.rs
pub mod actors;
pub mod checkout;
pub mod errors;
pub mod outcome;
pub mod provider;
pub mod storage;

pub use actors::notifier::NotificationCenter;
pub use actors::wallet_session::WalletSessionActor;
pub use checkout::{FlowState, PurchaseFlow};
pub use errors::{CheckoutError, FailureKind, WalletError};
