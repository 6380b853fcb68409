// common/src/models/order.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use super::listing::{Amount, Category, Listing};

/// How the buyer paid at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Paypal,
    Bank,
    Crypto,
}

impl PaymentMethod {
    /// Only crypto payments go through the wallet
    pub fn requires_wallet(&self) -> bool {
        matches!(self, PaymentMethod::Crypto)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "Credit Card",
            PaymentMethod::Paypal => "PayPal",
            PaymentMethod::Bank => "Bank Transfer",
            PaymentMethod::Crypto => "Crypto",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "card" => Ok(PaymentMethod::Card),
            "paypal" => Ok(PaymentMethod::Paypal),
            "bank" => Ok(PaymentMethod::Bank),
            "crypto" => Ok(PaymentMethod::Crypto),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Proof of a completed (simulated) checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub order_id: Uuid,
    pub listing_id: String,
    pub title: String,
    pub quantity: u32,
    pub total: Amount,
    pub currency: String,
    pub payment_method: PaymentMethod,
    /// Wallet signature over the payment authorization, crypto only
    pub signature: Option<String>,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Confirmed,
    Pending,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(TicketStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: TicketStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

/// A ticket in the buyer's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchasedTicket {
    pub id: Uuid,
    pub listing_id: String,
    pub event_title: String,
    pub category: Category,
    pub event_date: NaiveDate,
    pub quantity: u32,
    pub total_paid: Amount,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub status: TicketStatus,
    pub purchased_at: DateTime<Utc>,
}

impl PurchasedTicket {
    pub fn from_receipt(receipt: &PurchaseReceipt, listing: &Listing) -> Self {
        Self {
            id: receipt.order_id,
            listing_id: receipt.listing_id.clone(),
            event_title: receipt.title.clone(),
            category: listing.category,
            event_date: listing.date,
            quantity: receipt.quantity,
            total_paid: receipt.total,
            currency: receipt.currency.clone(),
            payment_method: receipt.payment_method,
            status: TicketStatus::Confirmed,
            purchased_at: receipt.purchased_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub total: usize,
    pub confirmed: usize,
    pub pending: usize,
    pub cancelled: usize,
    /// Amount spent per currency code
    pub spent: BTreeMap<String, Amount>,
}

/// In-memory purchase history, newest last
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderHistory {
    tickets: Vec<PurchasedTicket>,
}

impl OrderHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, ticket: PurchasedTicket) {
        tracing::info!(
            "Recorded order {} ({} x {})",
            ticket.id, ticket.quantity, ticket.event_title
        );
        self.tickets.push(ticket);
    }

    pub fn tickets(&self) -> &[PurchasedTicket] {
        &self.tickets
    }

    pub fn filter(&self, filter: StatusFilter) -> Vec<&PurchasedTicket> {
        self.tickets.iter().filter(|t| filter.matches(t.status)).collect()
    }

    pub fn summary(&self) -> OrderSummary {
        let mut summary = OrderSummary {
            total: self.tickets.len(),
            ..Default::default()
        };

        for ticket in &self.tickets {
            match ticket.status {
                TicketStatus::Confirmed => summary.confirmed += 1,
                TicketStatus::Pending => summary.pending += 1,
                TicketStatus::Cancelled => summary.cancelled += 1,
            }

            // Cancelled orders were refunded
            if ticket.status != TicketStatus::Cancelled {
                let spent = summary.spent.entry(ticket.currency.clone()).or_insert(Amount::ZERO);
                *spent = spent.plus(&ticket.total_paid);
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::Catalog;

    fn ticket(listing: &Listing, quantity: u32, status: TicketStatus) -> PurchasedTicket {
        let receipt = PurchaseReceipt {
            order_id: Uuid::new_v4(),
            listing_id: listing.id.clone(),
            title: listing.title.clone(),
            quantity,
            total: listing.total_for(quantity),
            currency: listing.currency.clone(),
            payment_method: PaymentMethod::Card,
            signature: None,
            purchased_at: Utc::now(),
        };
        PurchasedTicket {
            status,
            ..PurchasedTicket::from_receipt(&receipt, listing)
        }
    }

    #[test]
    fn test_from_receipt_is_confirmed() {
        let catalog = Catalog::demo();
        let listing = catalog.get("3").unwrap();
        let t = ticket(listing, 2, TicketStatus::Confirmed);
        assert_eq!(t.category, Category::Theater);
        assert_eq!(t.total_paid.to_string(), "0.16");
        assert_eq!(t.event_date, listing.date);
    }

    #[test]
    fn test_status_filter() {
        let catalog = Catalog::demo();
        let listing = catalog.get("1").unwrap();
        let mut history = OrderHistory::new();
        history.record(ticket(listing, 1, TicketStatus::Confirmed));
        history.record(ticket(listing, 1, TicketStatus::Pending));
        history.record(ticket(listing, 1, TicketStatus::Cancelled));

        assert_eq!(history.filter(StatusFilter::All).len(), 3);
        let pending = history.filter(StatusFilter::Only(TicketStatus::Pending));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, TicketStatus::Pending);
    }

    #[test]
    fn test_summary_groups_spend_by_currency() {
        let catalog = Catalog::demo();
        let eth = catalog.get("1").unwrap();
        let usdc = Listing {
            price: Amount::whole(45),
            currency: "USDC".to_string(),
            ..catalog.get("6").unwrap().clone()
        };
        let usdc = &usdc;

        let mut history = OrderHistory::new();
        history.record(ticket(eth, 2, TicketStatus::Confirmed));
        history.record(ticket(eth, 1, TicketStatus::Pending));
        history.record(ticket(usdc, 3, TicketStatus::Confirmed));
        history.record(ticket(usdc, 1, TicketStatus::Cancelled));

        let summary = history.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.confirmed, 2);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(summary.spent["ETH"].to_string(), "0.15");
        assert_eq!(summary.spent["USDC"].to_string(), "135");
    }

    #[test]
    fn test_payment_method_from_str() {
        assert_eq!("Crypto".parse::<PaymentMethod>(), Ok(PaymentMethod::Crypto));
        assert_eq!(" paypal ".parse::<PaymentMethod>(), Ok(PaymentMethod::Paypal));
        assert!("cash".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_only_crypto_requires_wallet() {
        assert!(PaymentMethod::Crypto.requires_wallet());
        assert!(!PaymentMethod::Card.requires_wallet());
        assert!(!PaymentMethod::Paypal.requires_wallet());
        assert!(!PaymentMethod::Bank.requires_wallet());
    }
}
