// storefront/src/errors.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::provider::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("no wallet extension detected")]
    CapabilityAbsent,
    #[error("the request was rejected in the wallet")]
    UserRejected,
    #[error("wallet connection failed: {0}")]
    ConnectionFailed(String),
    #[error("no wallet connected")]
    NotConnected,
    #[error("signing failed: {0}")]
    SigningFailed(String),
    #[error("wallet session is no longer running")]
    SessionUnavailable,
}

impl WalletError {
    /// Classify a failed account request
    pub fn from_connect(error: ProviderError) -> Self {
        if error.is_user_rejection() {
            WalletError::UserRejected
        } else {
            WalletError::ConnectionFailed(error.message)
        }
    }

    /// Classify a failed signature request
    pub fn from_signing(error: ProviderError) -> Self {
        WalletError::SigningFailed(error.message)
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            WalletError::CapabilityAbsent => FailureKind::CapabilityAbsent,
            WalletError::UserRejected => FailureKind::UserRejected,
            WalletError::ConnectionFailed(_) => FailureKind::ConnectionFailed,
            WalletError::NotConnected => FailureKind::NotConnected,
            WalletError::SigningFailed(_) => FailureKind::SigningFailed,
            WalletError::SessionUnavailable => FailureKind::ConnectionFailed,
        }
    }
}

impl From<actix::MailboxError> for WalletError {
    fn from(error: actix::MailboxError) -> Self {
        tracing::error!("Wallet session mailbox error: {}", error);
        WalletError::SessionUnavailable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("payment could not be processed")]
    SimulatedPaymentFailure,
    #[error("select a payment method first")]
    NoPaymentMethod,
    #[error("listing {0} is sold out")]
    SoldOut(String),
    #[error("cannot confirm from the {from} state")]
    InvalidTransition { from: &'static str },
}

impl CheckoutError {
    /// Failure tag for errors that end an attempt; guard errors have none
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            CheckoutError::Wallet(e) => Some(e.kind()),
            CheckoutError::SimulatedPaymentFailure => Some(FailureKind::SimulatedPaymentFailure),
            CheckoutError::NoPaymentMethod
            | CheckoutError::SoldOut(_)
            | CheckoutError::InvalidTransition { .. } => None,
        }
    }
}

/// Why a purchase attempt ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    CapabilityAbsent,
    UserRejected,
    ConnectionFailed,
    NotConnected,
    SigningFailed,
    SimulatedPaymentFailure,
}
