use std::time::Duration;

use crate::feed::error::FeedError;
use crate::feed::parse::parse_feature_collection;
use crate::feed::types::{FeedWindow, QuakeEvent};

pub const DEFAULT_FEED_BASE_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary";

/// Body excerpt length kept in `HttpStatus` errors.
const ERROR_BODY_LIMIT: usize = 512;

/// Single-attempt HTTP client for the summary GeoJSON feed.
#[derive(Debug, Clone)]
pub struct FeedClient {
    base_url: String,
    client: reqwest::Client,
}

impl FeedClient {
    pub fn new(base_url: Option<String>, timeout_ms: u64) -> Result<Self, FeedError> {
        let base_url = base_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_FEED_BASE_URL.to_string());

        Ok(Self {
            base_url,
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .map_err(|error| FeedError::Network(error.to_string()))?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, window: FeedWindow) -> String {
        format!(
            "{}/all_{}.geojson",
            self.base_url.trim_end_matches('/'),
            window.as_str()
        )
    }

    /// Issue one GET for `window` and parse the response.
    pub async fn fetch_once(&self, window: FeedWindow) -> Result<Vec<QuakeEvent>, FeedError> {
        let endpoint = self.endpoint(window);
        let response = self
            .client
            .get(&endpoint)
            .header("Accept", "application/geo+json, application/json")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        tracing::debug!("feed response: status={} endpoint={}", status, endpoint);

        if !status.is_success() {
            let mut body = text;
            if body.len() > ERROR_BODY_LIMIT {
                let mut cut = ERROR_BODY_LIMIT;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(FeedError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        parse_feature_collection(&text)
    }
}
