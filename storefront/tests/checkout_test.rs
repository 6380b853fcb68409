// storefront/tests/checkout_test.rs
use actix::prelude::*;
use chrono::{NaiveDate, NaiveTime};
use common::models::catalog::Catalog;
use common::models::listing::{Amount, Category, Listing};
use common::models::order::{OrderHistory, PaymentMethod, PurchasedTicket, TicketStatus};
use common::Notification;
use std::sync::Arc;
use std::time::Duration;
use storefront::actors::notifier::{GetNotifications, NotificationCenter};
use storefront::actors::wallet_session::{Connect, GetSnapshot, WalletSessionActor, DEFAULT_AUTOCONNECT_KEY};
use storefront::checkout::{FlowState, PurchaseFlow};
use storefront::errors::{CheckoutError, FailureKind, WalletError};
use storefront::outcome::{FixedOutcome, RandomOutcome, ScriptedOutcome};
use storefront::provider::{SimulatedWallet, WalletProvider};
use storefront::storage::{FlagStore, MemoryFlagStore};

const ACCOUNT: &str = "0x71c7656ec7ab88b098defb751b7401b5f6d8976f";

struct Harness {
    wallet: Option<Arc<SimulatedWallet>>,
    store: Arc<MemoryFlagStore>,
    session: Addr<WalletSessionActor>,
    notifier: Addr<NotificationCenter>,
}

impl Harness {
    fn new(installed: bool) -> Self {
        let wallet = installed.then(|| Arc::new(SimulatedWallet::new(vec![ACCOUNT.to_string()], "0x1")));
        let store = Arc::new(MemoryFlagStore::new());
        let provider = wallet.clone().map(|w| w as Arc<dyn WalletProvider>);
        let session = WalletSessionActor::new(provider, store.clone()).start();
        let notifier = NotificationCenter::new().start();
        Self { wallet, store, session, notifier }
    }

    fn flow(&self, listing: Listing, paid: bool) -> PurchaseFlow {
        PurchaseFlow::start(listing, self.session.clone(), self.notifier.clone().recipient())
            .unwrap()
            .with_processing_delay(Duration::ZERO)
            .with_outcome(Box::new(FixedOutcome(paid)))
    }

    fn wallet(&self) -> &SimulatedWallet {
        self.wallet.as_deref().unwrap()
    }

    async fn notifications(&self) -> Vec<Notification> {
        self.notifier.send(GetNotifications).await.unwrap()
    }
}

fn usdc_listing() -> Listing {
    Listing {
        id: "usdc-1".to_string(),
        title: "Summer Rooftop Session".to_string(),
        category: Category::Concert,
        date: NaiveDate::from_ymd_opt(2024, 6, 21).unwrap(),
        time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
        location: "Rooftop 21, Lisbon".to_string(),
        price: Amount::whole(45),
        currency: "USDC".to_string(),
        image: "rooftop.jpg".to_string(),
        available: 2,
        total: 40,
        seller: "0x4242...beef".to_string(),
        description: "Sunset DJ set".to_string(),
    }
}

#[actix::test]
async fn test_quantity_is_floored_at_one() {
    let harness = Harness::new(true);
    let mut flow = harness.flow(usdc_listing(), true);

    assert_eq!(flow.quantity(), 1);
    assert_eq!(flow.decrement(), 1);
    assert_eq!(flow.decrement(), 1);
    assert_eq!(flow.increment(), 2);
    assert_eq!(flow.decrement(), 1);
}

#[actix::test]
async fn test_quantity_ignores_available_count() {
    let harness = Harness::new(true);
    let mut flow = harness.flow(usdc_listing(), true);

    for _ in 0..10 {
        flow.increment();
    }
    assert_eq!(flow.quantity(), 11);
    assert!(flow.quantity() > flow.listing().available);
}

#[actix::test]
async fn test_total_is_unit_price_times_quantity() {
    let harness = Harness::new(true);
    let mut flow = harness.flow(usdc_listing(), true);

    flow.increment();
    flow.increment();

    assert_eq!(flow.quantity(), 3);
    assert_eq!(flow.total(), Amount::whole(135));
    assert_eq!(flow.format_total(), "135 USDC");
}

#[actix::test]
async fn test_sold_out_listing_cannot_start() {
    let harness = Harness::new(true);
    let catalog = Catalog::demo();
    let sold_out = catalog.get("6").cloned().unwrap();

    let result = PurchaseFlow::start(sold_out, harness.session.clone(), harness.notifier.clone().recipient());
    assert!(matches!(result, Err(CheckoutError::SoldOut(id)) if id == "6"));
}

#[actix::test]
async fn test_confirm_requires_payment_method() {
    let harness = Harness::new(true);
    let mut flow = harness.flow(usdc_listing(), true);

    let err = flow.confirm().await.unwrap_err();
    assert_eq!(err, CheckoutError::NoPaymentMethod);
    assert_eq!(flow.state(), FlowState::Selecting);
    assert!(harness.notifications().await.is_empty());
}

#[actix::test]
async fn test_card_payment_skips_wallet() {
    let harness = Harness::new(true);
    let mut flow = harness.flow(usdc_listing(), true);
    let mut states = flow.subscribe();
    flow.select_payment(PaymentMethod::Card);

    let receipt = flow.confirm().await.unwrap();

    assert_eq!(flow.state(), FlowState::Succeeded);
    assert_eq!(receipt.payment_method, PaymentMethod::Card);
    assert_eq!(receipt.signature, None);
    assert_eq!(receipt.total, Amount::whole(45));
    assert!(harness.wallet().calls().is_empty());
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), FlowState::Succeeded);

    let toasts = harness.notifications().await;
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].title, "Payment Successful!");
    assert_eq!(toasts[0].description, "You have purchased 1 ticket(s) for Summer Rooftop Session");
}

#[actix::test]
async fn test_crypto_payment_connects_signs_and_succeeds() {
    let harness = Harness::new(true);
    let mut flow = harness.flow(usdc_listing(), true);
    flow.select_payment(PaymentMethod::Crypto);
    flow.increment();
    flow.increment();

    let receipt = flow.confirm().await.unwrap();

    assert_eq!(flow.state(), FlowState::Succeeded);
    assert_eq!(receipt.quantity, 3);
    assert_eq!(receipt.total.to_string(), "135");
    assert!(receipt.signature.as_deref().unwrap().starts_with("0x"));
    assert_eq!(
        harness.wallet().calls(),
        vec!["eth_requestAccounts", "eth_chainId", "personal_sign"]
    );
    assert!(harness.store.is_set(DEFAULT_AUTOCONNECT_KEY).unwrap());

    let titles: Vec<String> = harness.notifications().await.into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["Wallet Connected", "Payment Successful!"]);
}

#[actix::test]
async fn test_crypto_payment_reuses_connected_session() {
    let harness = Harness::new(true);
    harness.session.send(Connect).await.unwrap().unwrap();

    let mut flow = harness.flow(usdc_listing(), true);
    flow.select_payment(PaymentMethod::Crypto);
    flow.confirm().await.unwrap();

    assert_eq!(harness.wallet().call_count("eth_requestAccounts"), 1);
    assert_eq!(harness.wallet().call_count("personal_sign"), 1);
    let titles: Vec<String> = harness.notifications().await.into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["Payment Successful!"]);
}

#[actix::test]
async fn test_missing_wallet_fails_with_capability_absent() {
    let harness = Harness::new(false);
    let mut flow = harness.flow(usdc_listing(), true);
    flow.select_payment(PaymentMethod::Crypto);

    let err = flow.confirm().await.unwrap_err();

    assert_eq!(err, CheckoutError::Wallet(WalletError::CapabilityAbsent));
    assert_eq!(flow.state(), FlowState::Failed { reason: FailureKind::CapabilityAbsent });
    assert!(flow.receipt().is_none());

    let snapshot = harness.session.send(GetSnapshot).await.unwrap();
    assert_eq!(snapshot.address, None);
    assert_eq!(snapshot.chain_id, None);

    let toasts = harness.notifications().await;
    assert_eq!(toasts.len(), 1);
    assert!(toasts[0].is_destructive());
    assert_eq!(toasts[0].title, "Connection Failed");
}

#[actix::test]
async fn test_rejected_connection_can_be_retried() {
    let harness = Harness::new(true);
    harness.wallet().set_reject_connect(true);
    let mut flow = harness.flow(usdc_listing(), true);
    flow.select_payment(PaymentMethod::Crypto);
    flow.increment();

    let err = flow.confirm().await.unwrap_err();
    assert_eq!(err, CheckoutError::Wallet(WalletError::UserRejected));
    assert_eq!(flow.state(), FlowState::Failed { reason: FailureKind::UserRejected });

    // Edits are ignored until the user retries
    assert_eq!(flow.increment(), 2);
    assert!(!flow.select_payment(PaymentMethod::Card));
    assert!(matches!(
        flow.confirm().await,
        Err(CheckoutError::InvalidTransition { from: "failed" })
    ));

    assert!(flow.retry());
    assert_eq!(flow.state(), FlowState::Selecting);
    assert_eq!(flow.quantity(), 2);
    assert_eq!(flow.payment_method(), Some(PaymentMethod::Crypto));
    assert!(flow.last_error().is_none());

    harness.wallet().set_reject_connect(false);
    flow.confirm().await.unwrap();
    assert_eq!(flow.state(), FlowState::Succeeded);
    assert!(!flow.retry());
}

#[actix::test]
async fn test_declined_signature_fails_flow() {
    let harness = Harness::new(true);
    harness.wallet().set_reject_signing(true);
    let mut flow = harness.flow(usdc_listing(), true);
    flow.select_payment(PaymentMethod::Crypto);

    let err = flow.confirm().await.unwrap_err();

    assert!(matches!(err, CheckoutError::Wallet(WalletError::SigningFailed(_))));
    assert_eq!(flow.state(), FlowState::Failed { reason: FailureKind::SigningFailed });
    assert_eq!(flow.last_error(), Some(&err));

    let titles: Vec<String> = harness.notifications().await.into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["Wallet Connected", "Signature Failed"]);
}

#[actix::test]
async fn test_payment_failure_then_retry_succeeds() {
    let harness = Harness::new(true);
    let mut flow = harness
        .flow(usdc_listing(), true)
        .with_outcome(Box::new(ScriptedOutcome::new([false, true])));
    flow.select_payment(PaymentMethod::Paypal);

    let err = flow.confirm().await.unwrap_err();
    assert_eq!(err, CheckoutError::SimulatedPaymentFailure);
    assert_eq!(
        flow.state(),
        FlowState::Failed { reason: FailureKind::SimulatedPaymentFailure }
    );

    assert!(flow.retry());
    flow.confirm().await.unwrap();
    assert_eq!(flow.state(), FlowState::Succeeded);

    let titles: Vec<String> = harness.notifications().await.into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["Payment Error", "Payment Successful!"]);
}

#[actix::test]
async fn test_observers_see_intermediate_states() {
    let harness = Harness::new(true);
    let mut flow = harness
        .flow(usdc_listing(), true)
        .with_processing_delay(Duration::from_millis(20));
    flow.select_payment(PaymentMethod::Crypto);

    let mut states = flow.subscribe();
    let watcher = tokio::spawn(async move {
        let mut seen = Vec::new();
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            seen.push(state);
            if state.is_terminal() {
                break;
            }
        }
        seen
    });

    flow.confirm().await.unwrap();
    let seen = watcher.await.unwrap();

    // Connecting and Signing are quick, so the watcher may skip them, but
    // it always sees Processing across the delay and then the outcome
    assert!(seen.contains(&FlowState::Processing));
    assert_eq!(seen.last(), Some(&FlowState::Succeeded));
}

#[actix::test]
async fn test_inventory_is_never_decremented() {
    let harness = Harness::new(true);
    let listing = usdc_listing();
    let mut flow = harness.flow(listing.clone(), true);
    flow.select_payment(PaymentMethod::Bank);
    flow.increment();

    let receipt = flow.confirm().await.unwrap();
    assert_eq!(flow.listing().available, listing.available);

    let mut history = OrderHistory::new();
    history.record(PurchasedTicket::from_receipt(&receipt, flow.listing()));
    let summary = history.summary();
    assert_eq!(summary.confirmed, 1);
    assert_eq!(summary.spent["USDC"], Amount::whole(90));
    assert_eq!(history.tickets()[0].status, TicketStatus::Confirmed);
}

#[actix::test]
async fn test_processing_outcome_is_not_deterministic() {
    let harness = Harness::new(true);
    let mut succeeded = 0;
    let mut failed = 0;

    for trial in 0..200u64 {
        let mut flow = harness
            .flow(usdc_listing(), true)
            .with_outcome(Box::new(RandomOutcome::new(0.9, Some(trial))));
        flow.select_payment(PaymentMethod::Card);
        let _ = flow.confirm().await;

        match flow.state() {
            FlowState::Succeeded => succeeded += 1,
            FlowState::Failed { reason: FailureKind::SimulatedPaymentFailure } => failed += 1,
            other => panic!("unexpected terminal state {:?}", other),
        }
        flow.close();
    }

    assert!(succeeded > 0, "no successful payments in 200 trials");
    assert!(failed > 0, "no failed payments in 200 trials");
    assert_eq!(succeeded + failed, 200);
}
