// common/src/models/catalog.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use super::listing::{Amount, Category, Listing};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Search criteria; empty fields match everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingFilter {
    pub search: String,
    pub category: Option<Category>,
    pub date: Option<NaiveDate>,
}

impl ListingFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        let needle = self.search.trim().to_lowercase();
        let matches_search = needle.is_empty()
            || listing.title.to_lowercase().contains(&needle)
            || listing.location.to_lowercase().contains(&needle);

        let matches_category = self.category.map_or(true, |c| c == listing.category);
        let matches_date = self.date.map_or(true, |d| d == listing.date);

        matches_search && matches_category && matches_date
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty() && self.category.is_none() && self.date.is_none()
    }
}

/// Read-only set of listings shown by the storefront
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    listings: Vec<Listing>,
}

impl Catalog {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self { listings }
    }

    /// Load listings from a JSON array on disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let listings: Vec<Listing> = serde_json::from_str(&raw)?;
        tracing::info!("Loaded {} listings from {}", listings.len(), path.as_ref().display());
        Ok(Self { listings })
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn get(&self, id: &str) -> Option<&Listing> {
        self.listings.iter().find(|listing| listing.id == id)
    }

    pub fn filter(&self, filter: &ListingFilter) -> Vec<&Listing> {
        self.listings.iter().filter(|listing| filter.matches(listing)).collect()
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Built-in mock listings
    pub fn demo() -> Self {
        let entries = [
            ("1", "Indie Rock Night - Los Volcanes", Category::Concert, (2024, 3, 15), (20, 0),
             "Teatro Nacional, Mexico City", (5, 2), "ETH", "concert-hero.jpg", 12, 50, "0x1234...abcd",
             "An unforgettable night with Los Volcanes at the Teatro Nacional"),
            ("2", "Contemporary Art Exhibition", Category::Art, (2024, 3, 20), (10, 0),
             "Museum of Modern Art, Madrid", (2, 2), "ETH", "art-event.jpg", 25, 100, "0x5678...efgh",
             "The latest trends in contemporary art"),
            ("3", "Hamlet - Classic Theater", Category::Theater, (2024, 3, 25), (19, 30),
             "Teatro Real, Madrid", (8, 2), "ETH", "theater-event.jpg", 8, 30, "0x9012...ijkl",
             "Shakespeare's masterpiece performed by a top cast"),
            ("4", "Copa del Rey Final", Category::Sports, (2024, 4, 5), (21, 0),
             "Estadio Santiago Bernabeu, Madrid", (15, 2), "ETH", "sports-event.jpg", 3, 20, "0x3456...mnop",
             "The most awaited football final of the year"),
            ("5", "International Jazz Festival", Category::Festival, (2024, 4, 12), (18, 0),
             "Parque del Retiro, Madrid", (6, 2), "ETH", "concert-hero.jpg", 45, 200, "0x7890...qrst",
             "Three days of jazz with international artists"),
            ("6", "Tech Summit 2024", Category::Conference, (2024, 4, 18), (9, 0),
             "Convention Center, Barcelona", (12, 2), "ETH", "art-event.jpg", 0, 500, "0xabcd...uvwx",
             "The latest in technology and startups"),
        ];

        let listings = entries
            .into_iter()
            .filter_map(|(id, title, category, (y, m, d), (hh, mm), location, (minor, scale), currency,
                          image, available, total, seller, description)| {
                Some(Listing {
                    id: id.to_string(),
                    title: title.to_string(),
                    category,
                    date: NaiveDate::from_ymd_opt(y, m, d)?,
                    time: NaiveTime::from_hms_opt(hh, mm, 0)?,
                    location: location.to_string(),
                    price: Amount::new(minor, scale),
                    currency: currency.to_string(),
                    image: image.to_string(),
                    available,
                    total,
                    seller: seller.to_string(),
                    description: description.to_string(),
                })
            })
            .collect();

        Self { listings }
    }
}
