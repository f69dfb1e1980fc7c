//! Cityflitzer adapter: is a car-sharing vehicle parked nearby?
//!
//! Queries the points-of-interest endpoint for free-floating vehicles
//! bookable in the current hour and checks whether any is closer than a
//! threshold.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, DurationRound, SecondsFormat, TimeDelta, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::probe::AvailabilityProbe;
use crate::AdapterError;

/// Default API base.
pub const DEFAULT_BASE_URL: &str = "https://de1.cantamen.de/casirest/v3";

/// Default topic namespace.
pub const DEFAULT_TOPIC_PREFIX: &str = "mobility/cityflitzer";

/// Flag suffix published by this probe.
pub const FLAG_SUFFIX: &str = "cityflitzer_nearby";

const DEFAULT_LATITUDE: f64 = 51.32032033409821;
const DEFAULT_LONGITUDE: f64 = 12.36535400104385;
const DEFAULT_RANGE: u32 = 30_000;
const DEFAULT_MAX_DISTANCE: f64 = 500.0;

/// Probe for nearby car-sharing vehicles.
#[derive(Debug, Clone)]
pub struct CityflitzerProbe {
    client: Client,
    base_url: String,
    api_key: String,
    latitude: f64,
    longitude: f64,
    range: u32,
    max_distance: f64,
    topic_prefix: String,
}

impl CityflitzerProbe {
    /// Create a new builder for configuring the probe.
    pub fn builder() -> CityflitzerProbeBuilder {
        CityflitzerProbeBuilder::default()
    }

    fn url(&self) -> String {
        format!("{}/pointsofinterest", self.base_url.trim_end_matches('/'))
    }
}

/// The booking window containing `now`: the current full hour and the next.
pub fn search_window(now: DateTime<Utc>) -> Result<(String, String), AdapterError> {
    let start = now
        .duration_trunc(TimeDelta::hours(1))
        .map_err(|e| AdapterError::Parse(e.to_string()))?;
    let end = start + TimeDelta::hours(1);

    Ok((
        start.to_rfc3339_opts(SecondsFormat::Secs, true),
        end.to_rfc3339_opts(SecondsFormat::Secs, true),
    ))
}

#[async_trait]
impl AvailabilityProbe for CityflitzerProbe {
    type Record = Vehicle;

    async fn fetch(&self) -> Result<Vec<Vehicle>, AdapterError> {
        let (start, end) = search_window(Utc::now())?;

        let response = self
            .client
            .get(self.url())
            .header("X-API-KEY", &self.api_key)
            .query(&[
                ("placeIsFixed", "false".to_string()),
                ("lat", self.latitude.to_string()),
                ("lng", self.longitude.to_string()),
                ("range", self.range.to_string()),
                ("start", start),
                ("end", end),
                ("sort", "distance".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AdapterError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))
    }

    fn evaluate(&self, vehicles: &[Vehicle]) -> bool {
        vehicles.iter().any(|v| v.distance < self.max_distance)
    }

    fn flag_suffix(&self) -> &str {
        FLAG_SUFFIX
    }

    fn topic_prefix(&self) -> &str {
        &self.topic_prefix
    }
}

/// Builder for CityflitzerProbe.
#[derive(Debug, Default)]
pub struct CityflitzerProbeBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    range: Option<u32>,
    max_distance: Option<f64>,
    topic_prefix: Option<String>,
    timeout: Option<Duration>,
}

impl CityflitzerProbeBuilder {
    /// Set the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the `X-API-KEY` header value.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the search origin.
    pub fn location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Set the search radius in meters (default: 30000).
    pub fn range(mut self, range: u32) -> Self {
        self.range = Some(range);
        self
    }

    /// Set the distance below which a vehicle counts as nearby (default: 500).
    pub fn max_distance(mut self, meters: f64) -> Self {
        self.max_distance = Some(meters);
        self
    }

    /// Set the topic namespace (default: "mobility/cityflitzer").
    pub fn topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = Some(prefix.into());
        self
    }

    /// Set the request timeout (default: 5 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the probe.
    pub fn build(self) -> Result<CityflitzerProbe, AdapterError> {
        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(5)))
            .build()?;

        Ok(CityflitzerProbe {
            client,
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: self.api_key.unwrap_or_default(),
            latitude: self.latitude.unwrap_or(DEFAULT_LATITUDE),
            longitude: self.longitude.unwrap_or(DEFAULT_LONGITUDE),
            range: self.range.unwrap_or(DEFAULT_RANGE),
            max_distance: self.max_distance.unwrap_or(DEFAULT_MAX_DISTANCE),
            topic_prefix: self
                .topic_prefix
                .unwrap_or_else(|| DEFAULT_TOPIC_PREFIX.to_string()),
        })
    }
}

/// A bookable vehicle, as far as this probe cares.
#[derive(Debug, Clone, Deserialize)]
pub struct Vehicle {
    /// Distance from the search origin in meters.
    pub distance: f64,
}
