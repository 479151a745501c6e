use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the listed item is
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Localization {
    pub city: String,
    pub zipcode: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl Localization {
    /// Coordinates as `(lat, lng)`, when the listing published both
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lng?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Seller {
    pub name: String,
}

/// Core classified ad data model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ad {
    pub title: String,
    pub description: String,
    pub price: i64,
    /// Absolute URLs, the first one is the thumbnail
    pub images: Vec<String>,
    pub localization: Localization,
    pub seller: Seller,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

/// Driving estimate from the configured origin to an ad
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RouteSummary {
    pub time_secs: f64,
    pub length_km: Option<f64>,
}
