use crate::config::RoutingConfig;
use crate::models::{Ad, RouteSummary};
use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const ROUTING_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct RouteResponse {
    trip: Trip,
}

#[derive(Debug, Deserialize)]
struct Trip {
    summary: TripSummary,
}

#[derive(Debug, Deserialize)]
struct TripSummary {
    time: f64,
    length: Option<f64>,
}

/// Driving time estimates from a fixed origin, via a Valhalla-style routing API
pub struct RouteEnricher {
    client: Client,
    config: RoutingConfig,
}

impl RouteEnricher {
    pub fn new(config: RoutingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(ROUTING_TIMEOUT)
            .build()
            .context("Failed to create routing HTTP client")?;
        Ok(Self { client, config })
    }

    /// Estimate travel time to the ad. Any failure yields `None`.
    #[instrument(skip_all, fields(url = %ad.url))]
    pub async fn estimate_travel_time(&self, ad: &Ad) -> Option<RouteSummary> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            debug!("No routing API key configured, skipping route");
            return None;
        };
        let Some(destination) = ad.localization.coordinates() else {
            debug!("Ad has no coordinates, skipping route");
            return None;
        };

        match self.request_route(api_key, destination).await {
            Ok(summary) => {
                debug!(time_secs = summary.time_secs, "Route estimated");
                Some(summary)
            }
            Err(e) => {
                warn!(error = %e, "Route estimation failed");
                None
            }
        }
    }

    async fn request_route(&self, api_key: &str, destination: (f64, f64)) -> Result<RouteSummary> {
        let body = route_request_body(&self.config, destination);

        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&[("api_key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow!("Routing API request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Routing API returned status {}", status);
        }

        let route: RouteResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse routing response: {}", e))?;

        Ok(RouteSummary {
            time_secs: route.trip.summary.time,
            length_km: route.trip.summary.length,
        })
    }
}

/// Request body for an `auto` route from the configured origin to `(lat, lng)`
pub fn route_request_body(config: &RoutingConfig, (lat, lng): (f64, f64)) -> Value {
    json!({
        "locations": [
            { "lon": config.origin_lng, "lat": config.origin_lat, "type": "break" },
            { "lon": lng, "lat": lat, "type": "break" }
        ],
        "costing": "auto",
        "costing_options": {
            "auto": { "use_highways": config.use_highways }
        },
        "units": "km"
    })
}

/// Human readable travel time, e.g. `1 h 05 min (85 km)` or `42 min`
pub fn format_travel_time(route: &RouteSummary) -> String {
    let minutes = (route.time_secs.max(0.0) / 60.0).round() as u64;
    let duration = if minutes >= 60 {
        format!("{} h {:02} min", minutes / 60, minutes % 60)
    } else {
        format!("{minutes} min")
    };
    match route.length_km {
        Some(km) => format!("{duration} ({km:.0} km)"),
        None => duration,
    }
}
