// storefront/src/checkout.rs
//! Simulated checkout for a single listing.
//!
//! A [`PurchaseFlow`] walks one purchase attempt through
//! `Selecting -> [Connecting ->] [Signing ->] Processing -> Succeeded | Failed`.
//! Only crypto payments touch the wallet session. Card, PayPal and bank
//! transfers go straight to processing. No money moves and the catalog's
//! inventory is never decremented.

use actix::prelude::*;
use chrono::{DateTime, Utc};
use common::models::listing::{Amount, Listing};
use common::models::order::{PaymentMethod, PurchaseReceipt};
use common::utils::short_address;
use common::{CheckoutConfig, Notification};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;
use crate::actors::wallet_session::{Connect, GetSnapshot, SignMessage, WalletSessionActor};
use crate::errors::{CheckoutError, FailureKind, WalletError};
use crate::outcome::{PaymentOutcome, RandomOutcome};

const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_millis(3000);
const DEFAULT_SUCCESS_RATE: f64 = 0.9;

/// User-visible state of a purchase attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FlowState {
    Selecting,
    Connecting,
    Signing,
    Processing,
    Succeeded,
    Failed { reason: FailureKind },
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Selecting => "selecting",
            FlowState::Connecting => "connecting",
            FlowState::Signing => "signing",
            FlowState::Processing => "processing",
            FlowState::Succeeded => "succeeded",
            FlowState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Succeeded | FlowState::Failed { .. })
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Text the buyer signs to authorize a crypto payment
pub fn authorization_message(listing: &Listing, quantity: u32, total: Amount, at: DateTime<Utc>) -> String {
    format!(
        "Crypto Payment Authorization\n\nEvent: {}\nQuantity: {}\nTotal: {} {}\nTimestamp: {}\n\nI authorize this payment for the above ticket purchase.",
        listing.title,
        quantity,
        total,
        listing.currency,
        at.to_rfc3339(),
    )
}

/// One purchase attempt bound to one listing
pub struct PurchaseFlow {
    id: Uuid,
    listing: Listing,
    quantity: u32,
    payment_method: Option<PaymentMethod>,
    state: watch::Sender<FlowState>,
    session: Addr<WalletSessionActor>,
    notifier: Recipient<Notification>,
    outcome: Box<dyn PaymentOutcome>,
    processing_delay: Duration,
    receipt: Option<PurchaseReceipt>,
    last_error: Option<CheckoutError>,
}

impl PurchaseFlow {
    /// Open checkout for `listing`; sold-out listings cannot be bought
    pub fn start(
        listing: Listing,
        session: Addr<WalletSessionActor>,
        notifier: Recipient<Notification>,
    ) -> Result<Self, CheckoutError> {
        if listing.is_sold_out() {
            tracing::info!("Refusing checkout for sold-out listing {}", listing.id);
            return Err(CheckoutError::SoldOut(listing.id));
        }

        let (state, _) = watch::channel(FlowState::Selecting);
        let flow = Self {
            id: Uuid::new_v4(),
            listing,
            quantity: 1,
            payment_method: None,
            state,
            session,
            notifier,
            outcome: Box::new(RandomOutcome::new(DEFAULT_SUCCESS_RATE, None)),
            processing_delay: DEFAULT_PROCESSING_DELAY,
            receipt: None,
            last_error: None,
        };
        tracing::info!("Checkout {} opened for listing {}", flow.id, flow.listing.id);
        Ok(flow)
    }

    /// Open checkout with delay and outcome taken from configuration
    pub fn from_config(
        listing: Listing,
        session: Addr<WalletSessionActor>,
        notifier: Recipient<Notification>,
        config: &CheckoutConfig,
    ) -> Result<Self, CheckoutError> {
        Ok(Self::start(listing, session, notifier)?
            .with_processing_delay(Duration::from_millis(config.processing_delay_ms))
            .with_outcome(Box::new(RandomOutcome::new(config.success_rate, config.seed))))
    }

    pub fn with_outcome(mut self, outcome: Box<dyn PaymentOutcome>) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = delay;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn state(&self) -> FlowState {
        *self.state.borrow()
    }

    /// Follow state changes, including the intermediate ones
    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.state.subscribe()
    }

    pub fn total(&self) -> Amount {
        self.listing.total_for(self.quantity)
    }

    /// e.g. `135 USDC`
    pub fn format_total(&self) -> String {
        self.listing.format_total(self.quantity)
    }

    pub fn receipt(&self) -> Option<&PurchaseReceipt> {
        self.receipt.as_ref()
    }

    pub fn last_error(&self) -> Option<&CheckoutError> {
        self.last_error.as_ref()
    }

    /// No ceiling: `available` is not enforced
    pub fn increment(&mut self) -> u32 {
        if self.editable() {
            self.quantity = self.quantity.saturating_add(1);
        }
        self.quantity
    }

    pub fn decrement(&mut self) -> u32 {
        if self.editable() {
            self.quantity = self.quantity.saturating_sub(1).max(1);
        }
        self.quantity
    }

    pub fn select_payment(&mut self, method: PaymentMethod) -> bool {
        if !self.editable() {
            return false;
        }
        tracing::debug!("Checkout {} payment method: {}", self.id, method);
        self.payment_method = Some(method);
        true
    }

    /// Run the attempt to a terminal state.
    ///
    /// Wallet and payment failures end in `Failed` with a notification and
    /// are also returned. Guard errors (no payment method, wrong state)
    /// leave the flow untouched.
    pub async fn confirm(&mut self) -> Result<PurchaseReceipt, CheckoutError> {
        let current = self.state();
        if current != FlowState::Selecting {
            return Err(CheckoutError::InvalidTransition { from: current.name() });
        }
        let method = self.payment_method.ok_or(CheckoutError::NoPaymentMethod)?;

        tracing::info!(
            "Checkout {}: {} x {} via {} ({})",
            self.id, self.quantity, self.listing.title, method, self.format_total()
        );

        let signature = if method.requires_wallet() {
            Some(self.authorize_with_wallet().await?)
        } else {
            None
        };

        self.transition(FlowState::Processing);
        tokio::time::sleep(self.processing_delay).await;

        if !self.outcome.settle() {
            return Err(self.fail(
                CheckoutError::SimulatedPaymentFailure,
                "Payment Error",
                "Could not process payment. Please try again.",
            ));
        }

        let receipt = PurchaseReceipt {
            order_id: Uuid::new_v4(),
            listing_id: self.listing.id.clone(),
            title: self.listing.title.clone(),
            quantity: self.quantity,
            total: self.total(),
            currency: self.listing.currency.clone(),
            payment_method: method,
            signature,
            purchased_at: Utc::now(),
        };

        self.transition(FlowState::Succeeded);
        self.notifier.do_send(Notification::info(
            "Payment Successful!",
            format!("You have purchased {} ticket(s) for {}", self.quantity, self.listing.title),
        ));
        self.receipt = Some(receipt.clone());
        Ok(receipt)
    }

    /// Go back to selection after a failure; never automatic
    pub fn retry(&mut self) -> bool {
        if !matches!(self.state(), FlowState::Failed { .. }) {
            return false;
        }
        self.last_error = None;
        self.transition(FlowState::Selecting);
        true
    }

    /// Discard the flow; nothing is written back anywhere
    pub fn close(self) {
        tracing::info!("Checkout {} closed in state {}", self.id, self.state());
    }

    async fn authorize_with_wallet(&mut self) -> Result<String, CheckoutError> {
        let connected = match self.session.send(GetSnapshot).await {
            Ok(snapshot) => snapshot.is_connected(),
            Err(e) => return Err(self.fail_connect(e.into())),
        };

        if !connected {
            self.transition(FlowState::Connecting);
            let connected = self
                .session
                .send(Connect)
                .await
                .map_err(WalletError::from)
                .and_then(|result| result);

            match connected {
                Ok(snapshot) => {
                    let address = snapshot.address.as_deref().map(short_address).unwrap_or_default();
                    self.notifier.do_send(Notification::info(
                        "Wallet Connected",
                        format!("Connected as {}", address),
                    ));
                }
                Err(e) => return Err(self.fail_connect(e)),
            }
        }

        self.transition(FlowState::Signing);
        let message = authorization_message(&self.listing, self.quantity, self.total(), Utc::now());
        let signed = self
            .session
            .send(SignMessage { message })
            .await
            .map_err(WalletError::from)
            .and_then(|result| result);

        signed.map_err(|e| {
            self.fail(
                e.into(),
                "Signature Failed",
                "Failed to sign payment authorization. Please try again.",
            )
        })
    }

    fn fail_connect(&mut self, error: WalletError) -> CheckoutError {
        let description = match error {
            WalletError::CapabilityAbsent => "No wallet extension found. Install one to pay with crypto.",
            WalletError::UserRejected => "The connection request was rejected in your wallet.",
            _ => "Failed to connect wallet. Please try again.",
        };
        self.fail(error.into(), "Connection Failed", description)
    }

    fn fail(&mut self, error: CheckoutError, title: &str, description: &str) -> CheckoutError {
        let reason = error.kind().unwrap_or(FailureKind::ConnectionFailed);
        tracing::warn!("Checkout {} failed: {}", self.id, error);

        self.transition(FlowState::Failed { reason });
        self.notifier.do_send(Notification::destructive(title, description));
        self.last_error = Some(error.clone());
        error
    }

    fn transition(&mut self, next: FlowState) {
        let previous = self.state.send_replace(next);
        tracing::info!("Checkout {}: {} -> {}", self.id, previous, next);
    }

    fn editable(&self) -> bool {
        let editable = self.state() == FlowState::Selecting;
        if !editable {
            tracing::debug!("Checkout {} is {}, ignoring edit", self.id, self.state());
        }
        editable
    }
}
