// storefront/src/actors/mod.rs

pub mod notifier;
pub mod wallet_session;
