// common/src/models/listing.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Keeps every amount below 10^28 so multiplying by any u32 quantity fits in u128
const MAX_DIGITS: usize = 28;
const MAX_SCALE: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount: {0}")]
    Invalid(String),
    #[error("amount has too many digits: {0}")]
    TooLarge(String),
}

/// Exact non-negative decimal amount stored as minor units and a scale.
///
/// Values are kept normalized (no trailing fractional zeros), so two equal
/// amounts always compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount {
    minor: u128,
    scale: u32,
}

impl Amount {
    pub const ZERO: Amount = Amount { minor: 0, scale: 0 };

    /// `Amount::new(5, 2)` is `0.05`
    pub fn new(minor: u64, scale: u32) -> Self {
        Self::normalized(minor as u128, scale.min(MAX_SCALE))
    }

    pub fn whole(value: u64) -> Self {
        Self::new(value, 0)
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn minor_units(&self) -> u128 {
        self.minor
    }

    pub fn is_zero(&self) -> bool {
        self.minor == 0
    }

    /// Exact product with a ticket quantity
    pub fn times(&self, quantity: u32) -> Amount {
        Self::normalized(self.minor * quantity as u128, self.scale)
    }

    /// Sum of two amounts; saturates instead of overflowing
    pub fn plus(&self, other: &Amount) -> Amount {
        let scale = self.scale.max(other.scale);
        let lhs = self.minor.saturating_mul(10u128.pow(scale - self.scale));
        let rhs = other.minor.saturating_mul(10u128.pow(scale - other.scale));
        Self::normalized(lhs.saturating_add(rhs), scale)
    }

    fn normalized(mut minor: u128, mut scale: u32) -> Self {
        while scale > 0 && minor % 10 == 0 {
            minor /= 10;
            scale -= 1;
        }
        if minor == 0 {
            scale = 0;
        }
        Self { minor, scale }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (int_part, frac_part) = match s.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (s, ""),
        };

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
            return Err(AmountError::Invalid(s.to_string()));
        }

        let int_part = int_part.trim_start_matches('0');
        let frac_part = frac_part.trim_end_matches('0');
        if int_part.len() + frac_part.len() > MAX_DIGITS || frac_part.len() > MAX_SCALE as usize {
            return Err(AmountError::TooLarge(s.to_string()));
        }

        let digits = format!("{}{}", int_part, frac_part);
        let minor = if digits.is_empty() {
            0
        } else {
            digits
                .parse::<u128>()
                .map_err(|_| AmountError::Invalid(s.to_string()))?
        };

        Ok(Self::normalized(minor, frac_part.len() as u32))
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.minor);
        }
        let divisor = 10u128.pow(self.scale);
        write!(
            f,
            "{}.{:0width$}",
            self.minor / divisor,
            self.minor % divisor,
            width = self.scale as usize
        )
    }
}

/// Event category used for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Concert,
    Art,
    Theater,
    Sports,
    Festival,
    Conference,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Concert,
        Category::Art,
        Category::Theater,
        Category::Sports,
        Category::Festival,
        Category::Conference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Concert => "concert",
            Category::Art => "art",
            Category::Theater => "theater",
            Category::Sports => "sports",
            Category::Festival => "festival",
            Category::Conference => "conference",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

/// A resale listing in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
    /// Unit price per ticket
    pub price: Amount,
    pub currency: String,
    pub image: String,
    pub available: u32,
    pub total: u32,
    pub seller: String,
    pub description: String,
}

impl Listing {
    pub fn is_sold_out(&self) -> bool {
        self.available == 0
    }

    pub fn total_for(&self, quantity: u32) -> Amount {
        self.price.times(quantity)
    }

    /// Total for `quantity` tickets with the currency code, e.g. `135 USDC`
    pub fn format_total(&self, quantity: u32) -> String {
        format!("{} {}", self.total_for(quantity), self.currency)
    }
}
