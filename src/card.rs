use crate::images::ImageRetriever;
use crate::models::{Ad, RouteSummary};
use crate::routing::format_travel_time;
use crate::scrapers::error::ScrapeError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Leboncoin orange
pub const CARD_COLOUR: u32 = 0xec5a13;

pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_DESCRIPTION_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Platform-neutral summary of an ad, rendered by the chat adapter
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub title: String,
    pub url: String,
    pub author: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub colour: u32,
    pub fields: Vec<CardField>,
    pub timestamp: DateTime<Utc>,
}

/// A card and the local image files to attach to it
#[derive(Debug)]
pub struct FormattedCard {
    pub card: Card,
    pub files: Vec<PathBuf>,
}

pub struct CardFormatter {
    images: ImageRetriever,
}

impl CardFormatter {
    pub fn new(images: ImageRetriever) -> Self {
        Self { images }
    }

    pub fn images(&self) -> &ImageRetriever {
        &self.images
    }

    /// Download the ad's images and build its card.
    ///
    /// Image failures fail the whole card; the caller owns the returned
    /// files and must clean them up.
    pub async fn format(
        &self,
        ad: &Ad,
        route: Option<&RouteSummary>,
    ) -> Result<FormattedCard, ScrapeError> {
        let files = self.images.retrieve_all(&ad.images).await?;
        Ok(FormattedCard {
            card: build_card(ad, route),
            files,
        })
    }
}

pub fn build_card(ad: &Ad, route: Option<&RouteSummary>) -> Card {
    Card {
        title: truncate(&ad.title, MAX_TITLE_LEN),
        url: ad.url.clone(),
        author: ad.seller.name.clone(),
        description: truncate(&ad.description, MAX_DESCRIPTION_LEN),
        thumbnail: ad.images.first().cloned(),
        colour: CARD_COLOUR,
        fields: vec![
            CardField {
                name: "Prix".to_string(),
                value: format!("{} €", ad.price),
                inline: true,
            },
            CardField {
                name: "Localisation".to_string(),
                value: localization_line(ad, route),
                inline: true,
            },
        ],
        timestamp: ad.timestamp,
    }
}

fn localization_line(ad: &Ad, route: Option<&RouteSummary>) -> String {
    let place = format!("{} {}", ad.localization.city, ad.localization.zipcode);
    let travel = route.map_or_else(|| "N/A".to_string(), format_travel_time);
    format!("{} · {}", place.trim(), travel)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars - 1).collect();
    cut.push('…');
    cut
}
