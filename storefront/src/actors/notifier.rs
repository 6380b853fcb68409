// storefront/src/actors/notifier.rs
use actix::prelude::*;
use common::{Notification, SessionChanged};
use common::utils::short_address;
use std::collections::VecDeque;

// Oldest toasts are dropped past this point
const HISTORY_LIMIT: usize = 100;

#[derive(Message)]
#[rtype(result = "Vec<Notification>")]
pub struct GetNotifications;

#[derive(Message)]
#[rtype(result = "()")]
pub struct ClearNotifications;

/// Collects user-facing toasts and writes them to the log
pub struct NotificationCenter {
    history: VecDeque<Notification>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self {
            history: VecDeque::new(),
        }
    }
}

impl Actor for NotificationCenter {
    type Context = Context<Self>;
}

impl Handler<Notification> for NotificationCenter {
    type Result = ();

    fn handle(&mut self, msg: Notification, _ctx: &mut Self::Context) -> Self::Result {
        if msg.is_destructive() {
            tracing::warn!("[toast] {}: {}", msg.title, msg.description);
        } else {
            tracing::info!("[toast] {}: {}", msg.title, msg.description);
        }

        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(msg);
    }
}

// Wallet indicator, as shown in the navigation bar
impl Handler<SessionChanged> for NotificationCenter {
    type Result = ();

    fn handle(&mut self, msg: SessionChanged, _ctx: &mut Self::Context) -> Self::Result {
        match &msg.snapshot.address {
            Some(address) => tracing::info!("[wallet] {} ({:?})", short_address(address), msg.snapshot.status),
            None => tracing::info!("[wallet] not connected ({:?})", msg.snapshot.status),
        }
    }
}

impl Handler<GetNotifications> for NotificationCenter {
    type Result = MessageResult<GetNotifications>;

    fn handle(&mut self, _msg: GetNotifications, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.history.iter().cloned().collect())
    }
}

impl Handler<ClearNotifications> for NotificationCenter {
    type Result = ();

    fn handle(&mut self, _msg: ClearNotifications, _ctx: &mut Self::Context) -> Self::Result {
        self.history.clear();
    }
}
