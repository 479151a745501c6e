use crate::models::{Ad, Localization, Seller};
use crate::scrapers::error::ScrapeError;
use crate::scrapers::http::HttpFetcher;
use crate::scrapers::traits::AdSource;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use scraper::{Html, Selector};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Messages must contain this before any URL in them is considered
pub const BASE_URL: &str = "https://www.leboncoin.fr/";

/// Next.js server-rendered data, one per page
const PAYLOAD_SELECTOR: &str = "script#__NEXT_DATA__";

const AD_PATH: &str = "props.pageProps.ad";

/// Leboncoin listing scraper
pub struct LeboncoinScraper {
    fetcher: HttpFetcher,
    debug_dump: Option<PathBuf>,
}

impl LeboncoinScraper {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self {
            fetcher,
            debug_dump: None,
        }
    }

    /// Write every decoded payload to `path`, pretty-printed
    pub fn with_debug_dump(mut self, path: PathBuf) -> Self {
        self.debug_dump = Some(path);
        self
    }

    async fn write_debug(&self, payload: &Value) {
        let Some(path) = &self.debug_dump else {
            return;
        };
        let json = match serde_json::to_string_pretty(payload) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Could not serialize payload for debugging");
                return;
            }
        };
        match tokio::fs::write(path, json).await {
            Ok(()) => debug!("Saved ad payload to {}", path.display()),
            Err(e) => warn!(error = %e, "Could not write debug payload to {}", path.display()),
        }
    }
}

#[async_trait]
impl AdSource for LeboncoinScraper {
    async fn extract(&self, url: &str) -> Result<Ad, ScrapeError> {
        info!("Scraping {}", url);

        let html = self.fetcher.get_text(url).await?;
        let payload = extract_payload(url, &html)?;
        self.write_debug(&payload).await;

        let ad = parse_ad(url, &payload)?;
        info!(
            url = %url,
            title = %ad.title,
            images = ad.images.len(),
            "Extracted ad"
        );
        Ok(ad)
    }

    fn mentioned_in(&self, text: &str) -> bool {
        text.contains(BASE_URL)
    }

    fn source_name(&self) -> &'static str {
        "Leboncoin"
    }
}

/// Locate the embedded data element in a page and decode it
pub fn extract_payload(url: &str, html: &str) -> Result<Value, ScrapeError> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse(PAYLOAD_SELECTOR).map_err(|e| ScrapeError::Selector(e.to_string()))?;

    let content: String = document
        .select(&selector)
        .next()
        .map(|element| element.text().collect())
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(ScrapeError::MissingPayload {
            url: url.to_string(),
        });
    }

    debug!(url = %url, bytes = content.len(), "Found embedded ad data");
    Ok(serde_json::from_str(&content)?)
}

/// Project a decoded payload onto an [`Ad`]
pub fn parse_ad(url: &str, payload: &Value) -> Result<Ad, ScrapeError> {
    let ad = Node::root(payload).path(AD_PATH)?;

    let location = ad.get("location")?;
    if !location.value.is_object() {
        return Err(location.invalid("expected an object"));
    }

    let images = match ad.optional("images.urls_large") {
        Some(urls) => urls
            .items()?
            .iter()
            .filter_map(|node| match node.as_str() {
                Ok(url) => Some(url.to_string()),
                Err(e) => {
                    debug!(error = %e, "Skipping image entry");
                    None
                }
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(Ad {
        title: ad.get("subject")?.as_str()?.to_string(),
        description: ad
            .optional("body")
            .map(|body| body.as_text())
            .transpose()?
            .unwrap_or_default(),
        price: ad.path("price.0")?.as_i64()?,
        images,
        localization: Localization {
            city: location.get("city")?.as_text()?,
            zipcode: location
                .optional("zipcode")
                .map(|zip| zip.as_text())
                .transpose()?
                .unwrap_or_default(),
            lat: location.optional("lat").and_then(|n| n.lenient_f64()),
            lng: location.optional("lng").and_then(|n| n.lenient_f64()),
        },
        seller: Seller {
            name: ad.path("owner.name")?.as_text()?,
        },
        url: url.to_string(),
        timestamp: ad.get("first_publication_date")?.as_timestamp()?,
    })
}

/// A JSON value together with the dotted path it was reached by
#[derive(Clone)]
struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    fn root(value: &'a Value) -> Self {
        Self {
            value,
            path: String::new(),
        }
    }

    fn get(&self, key: &str) -> Result<Node<'a>, ScrapeError> {
        let path = if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        };

        let child = match self.value {
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            other => other.get(key),
        };

        match child {
            Some(value) if !value.is_null() => Ok(Node { value, path }),
            _ => Err(ScrapeError::MissingField { path }),
        }
    }

    /// Walk a dotted path, failing at the first missing segment
    fn path(&self, dotted: &str) -> Result<Node<'a>, ScrapeError> {
        dotted
            .split('.')
            .try_fold(self.clone(), |node, key| node.get(key))
    }

    fn optional(&self, dotted: &str) -> Option<Node<'a>> {
        self.path(dotted).ok()
    }

    fn invalid(&self, reason: &str) -> ScrapeError {
        ScrapeError::InvalidField {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn items(&self) -> Result<Vec<Node<'a>>, ScrapeError> {
        let items = self
            .value
            .as_array()
            .ok_or_else(|| self.invalid("expected an array"))?;
        Ok(items
            .iter()
            .enumerate()
            .map(|(i, value)| Node {
                value,
                path: format!("{}.{}", self.path, i),
            })
            .collect())
    }

    fn as_str(&self) -> Result<&'a str, ScrapeError> {
        self.value
            .as_str()
            .ok_or_else(|| self.invalid("expected a string"))
    }

    /// Strings as-is, numbers rendered (zipcodes sometimes come as numbers)
    fn as_text(&self) -> Result<String, ScrapeError> {
        match self.value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(self.invalid("expected a string")),
        }
    }

    /// Numbers only; anything else is treated as absent
    fn lenient_f64(&self) -> Option<f64> {
        let number = self.value.as_f64();
        if number.is_none() {
            debug!(path = %self.path, "Ignoring non-numeric value");
        }
        number
    }

    fn as_i64(&self) -> Result<i64, ScrapeError> {
        self.value
            .as_i64()
            .or_else(|| self.value.as_f64().map(|f| f.round() as i64))
            .ok_or_else(|| self.invalid("expected a number"))
    }

    /// RFC 3339, the site's naive `YYYY-MM-DD HH:MM:SS` (read as UTC), or epoch millis
    fn as_timestamp(&self) -> Result<DateTime<Utc>, ScrapeError> {
        let parsed = match self.value {
            Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|naive| naive.and_utc())
                }),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid("expected a date"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::routing::get;
    use axum::Router;
    use chrono::TimeZone;
    use serde_json::json;
    use std::time::Duration;

    fn page(data: &str) -> String {
        format!(
            r#"<!DOCTYPE html><html><head><title>Annonce</title></head><body>
            <div id="app">rendered</div>
            <script id="__NEXT_DATA__" type="application/json">{data}</script>
            </body></html>"#
        )
    }

    fn velo_payload() -> Value {
        json!({
            "props": {
                "pageProps": {
                    "ad": {
                        "subject": "Velo",
                        "price": [50],
                        "location": {
                            "city": "Angers",
                            "zipcode": "49000",
                            "lat": 47.47,
                            "lng": -0.55
                        },
                        "owner": { "name": "Jean" },
                        "body": "desc",
                        "images": { "urls_large": ["http://x/1.jpg"] },
                        "first_publication_date": "2024-01-01T00:00:00Z"
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse_fixture_page() {
        let url = "https://www.leboncoin.fr/ad/velos/123";
        let html = page(&velo_payload().to_string());

        let payload = extract_payload(url, &html).unwrap();
        let ad = parse_ad(url, &payload).unwrap();

        assert_eq!(
            ad,
            Ad {
                title: "Velo".to_string(),
                description: "desc".to_string(),
                price: 50,
                images: vec!["http://x/1.jpg".to_string()],
                localization: Localization {
                    city: "Angers".to_string(),
                    zipcode: "49000".to_string(),
                    lat: Some(47.47),
                    lng: Some(-0.55),
                },
                seller: Seller {
                    name: "Jean".to_string()
                },
                url: url.to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            }
        );
    }

    #[test]
    fn test_missing_payload_element() {
        let html = "<html><body><div id=\"app\"></div></body></html>";
        let err = extract_payload("https://www.leboncoin.fr/ad/1", html).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingPayload { .. }));
        assert!(err.is_extraction());
    }

    #[test]
    fn test_empty_payload_element() {
        let err = extract_payload("https://www.leboncoin.fr/ad/1", &page("  ")).unwrap_err();
        assert!(matches!(err, ScrapeError::MissingPayload { .. }));
    }

    #[test]
    fn test_invalid_json_payload() {
        let html = page("{\"props\": ");
        let err = extract_payload("https://www.leboncoin.fr/ad/1", &html).unwrap_err();
        assert!(matches!(err, ScrapeError::Decode(_)));
        assert!(!err.is_extraction());
    }

    #[test]
    fn test_missing_nested_field_names_path() {
        let mut payload = velo_payload();
        payload["props"]["pageProps"]["ad"]
            .as_object_mut()
            .unwrap()
            .remove("owner");

        let err = parse_ad("u", &payload).unwrap_err();
        match err {
            ScrapeError::MissingField { path } => assert_eq!(path, "props.pageProps.ad.owner"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_price_and_location_fail() {
        let mut payload = velo_payload();
        payload["props"]["pageProps"]["ad"]["price"] = json!([]);
        let err = parse_ad("u", &payload).unwrap_err();
        assert!(matches!(
            err,
            ScrapeError::MissingField { ref path } if path == "props.pageProps.ad.price.0"
        ));

        let mut payload = velo_payload();
        payload["props"]["pageProps"]["ad"]["location"] = json!("Angers");
        let err = parse_ad("u", &payload).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidField { .. }));
    }

    #[test]
    fn test_optional_fields_default() {
        let mut payload = velo_payload();
        let ad = payload["props"]["pageProps"]["ad"].as_object_mut().unwrap();
        ad.remove("images");
        ad.remove("body");
        ad["location"]
            .as_object_mut()
            .unwrap()
            .retain(|key, _| key == "city");
        ad.insert(
            "first_publication_date".to_string(),
            json!("2024-03-02 18:30:00"),
        );

        let ad = parse_ad("u", &payload).unwrap();
        assert!(ad.images.is_empty());
        assert_eq!(ad.description, "");
        assert_eq!(ad.localization.zipcode, "");
        assert_eq!(ad.localization.coordinates(), None);
        assert_eq!(
            ad.timestamp,
            Utc.with_ymd_and_hms(2024, 3, 2, 18, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_malformed_coordinates_and_images_tolerated() {
        let mut payload = velo_payload();
        let ad = &mut payload["props"]["pageProps"]["ad"];
        ad["location"]["lat"] = json!("47.47");
        ad["location"]["lng"] = json!("-0.55");
        ad["images"]["urls_large"] = json!(["http://x/1.jpg", null, 3, "http://x/2.jpg"]);

        let ad = parse_ad("u", &payload).unwrap();
        assert_eq!(ad.title, "Velo");
        assert_eq!(ad.localization.lat, None);
        assert_eq!(ad.localization.coordinates(), None);
        assert_eq!(ad.images, vec!["http://x/1.jpg", "http://x/2.jpg"]);
    }

    #[tokio::test]
    async fn test_extract_over_http() {
        let html = page(&velo_payload().to_string());
        let app = Router::new().route(
            "/ad/velos/123",
            get(move || {
                let html = html.clone();
                async move { axum::response::Html(html) }
            }),
        );
        let base = spawn_server(app).await;
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("debug.json");

        let scraper = LeboncoinScraper::new(HttpFetcher::new(Duration::from_secs(5)).unwrap())
            .with_debug_dump(dump.clone());
        let ad = scraper.extract(&format!("{base}/ad/velos/123")).await.unwrap();

        assert_eq!(ad.title, "Velo");
        assert_eq!(ad.seller.name, "Jean");
        let dumped: Value = serde_json::from_str(&std::fs::read_to_string(dump).unwrap()).unwrap();
        assert_eq!(dumped, velo_payload());
    }

    #[test]
    fn test_mentioned_in() {
        let scraper = LeboncoinScraper::new(HttpFetcher::new(Duration::from_secs(5)).unwrap());
        assert!(scraper.mentioned_in("regarde https://www.leboncoin.fr/ad/velos/1"));
        assert!(!scraper.mentioned_in("https://example.com/ad/1"));
    }
}
