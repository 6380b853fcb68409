// storefront/src/main.rs
// Terminal driver: lists the catalog and runs one simulated checkout.
//
// Usage: storefront [listing-id] [card|paypal|bank|crypto] [quantity]

use actix::Actor;
use common::models::catalog::Catalog;
use common::models::order::{OrderHistory, PaymentMethod, PurchasedTicket};
use common::{setup_tracing, Config};
use std::sync::Arc;
use storefront::actors::notifier::{GetNotifications, NotificationCenter};
use storefront::actors::wallet_session::{Subscribe, WalletSessionActor};
use storefront::checkout::PurchaseFlow;
use storefront::provider::{SimulatedWallet, WalletProvider};
use storefront::storage::{FileFlagStore, FlagStore, MemoryFlagStore};

#[actix::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config first: log_level (file, APP__LOG_LEVEL or LOG_LEVEL) picks the tracing level
    let config = Config::from_env();
    setup_tracing(&config.log_level)?;
    tracing::debug!("Configuration: {:?}", config);

    let catalog = match &config.catalog.path {
        Some(path) => Catalog::from_json_file(path)?,
        None => Catalog::demo(),
    };
    for listing in catalog.listings() {
        tracing::info!(
            "#{} {} [{}] {} {} @ {} - {} {} ({}/{} left)",
            listing.id,
            listing.title,
            listing.category,
            listing.date,
            listing.time.format("%H:%M"),
            listing.location,
            listing.price,
            listing.currency,
            listing.available,
            listing.total,
        );
    }

    let store: Arc<dyn FlagStore> = match &config.wallet.storage_path {
        Some(path) => Arc::new(FileFlagStore::new(path)),
        None => Arc::new(MemoryFlagStore::new()),
    };

    let provider: Option<Arc<dyn WalletProvider>> = if config.wallet.simulated.installed {
        Some(Arc::new(SimulatedWallet::from_config(&config.wallet.simulated)))
    } else {
        None
    };

    let notifier = NotificationCenter::new().start();
    let session = WalletSessionActor::new(provider, store)
        .with_autoconnect_key(config.wallet.autoconnect_key.clone())
        .start();
    let subscription = session
        .send(Subscribe {
            recipient: notifier.clone().recipient(),
        })
        .await?;

    let mut args = std::env::args().skip(1);
    let listing = match args.next() {
        Some(id) => catalog.get(&id).cloned(),
        None => catalog.listings().iter().find(|l| !l.is_sold_out()).cloned(),
    };
    let listing = match listing {
        Some(listing) => listing,
        None => {
            tracing::error!("No matching listing available");
            return Ok(());
        }
    };
    let method = match args.next() {
        Some(raw) => raw.parse::<PaymentMethod>()?,
        None => PaymentMethod::Crypto,
    };
    let quantity = args.next().and_then(|q| q.parse::<u32>().ok()).unwrap_or(1).max(1);

    let mut flow = PurchaseFlow::from_config(
        listing.clone(),
        session.clone(),
        notifier.clone().recipient(),
        &config.checkout,
    )?;
    flow.select_payment(method);
    while flow.quantity() < quantity {
        flow.increment();
    }

    let mut history = OrderHistory::new();
    match flow.confirm().await {
        Ok(receipt) => {
            tracing::info!("Order {} paid: {} {}", receipt.order_id, receipt.total, receipt.currency);
            history.record(PurchasedTicket::from_receipt(&receipt, &listing));
        }
        Err(e) => tracing::warn!("Checkout ended without a purchase: {}", e),
    }
    flow.close();

    let summary = history.summary();
    tracing::info!(
        "My tickets: {} total, {} confirmed, {} pending",
        summary.total, summary.confirmed, summary.pending
    );
    for (currency, spent) in &summary.spent {
        tracing::info!("Spent {} {}", spent, currency);
    }

    let toasts = notifier.send(GetNotifications).await?;
    tracing::info!("{} notification(s) raised", toasts.len());

    subscription.close();
    Ok(())
}
