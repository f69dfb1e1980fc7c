//! Nextbike adapter: is an e-cargo bike parked at the home station?
//!
//! Queries the public live map feed and looks for any of a fixed list of
//! bike numbers at one station.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mqttbot_adapters::nextbike::NextbikeProbe;
//! use mqttbot_adapters::probe::AvailabilityProbe;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let probe = NextbikeProbe::builder()
//!         .station(4101)
//!         .bike_numbers(["20091", "20095"])
//!         .build()?;
//!
//!     println!("e-cargo available: {}", probe.check().await);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::probe::AvailabilityProbe;
use crate::AdapterError;

/// Default live feed for Leipzig.
pub const DEFAULT_ENDPOINT: &str =
    "https://maps.nextbike.net/maps/nextbike-live.json?city=1&domains=le&list_cities=0&bikes=0";

/// Default topic namespace.
pub const DEFAULT_TOPIC_PREFIX: &str = "mobility/nextbike";

/// Flag suffix published by this probe.
pub const FLAG_SUFFIX: &str = "e_cargo_available";

/// Default e-cargo bike numbers.
pub const DEFAULT_BIKE_NUMBERS: [&str; 6] = ["20091", "20095", "20096", "20111", "20118", "20119"];

/// Probe for e-cargo bikes at a home station.
#[derive(Debug, Clone)]
pub struct NextbikeProbe {
    client: Client,
    endpoint: String,
    country: String,
    city: String,
    station: i64,
    bike_numbers: Vec<String>,
    topic_prefix: String,
}

impl NextbikeProbe {
    /// Create a new builder for configuring the probe.
    pub fn builder() -> NextbikeProbeBuilder {
        NextbikeProbeBuilder::default()
    }

    fn station_has_bike(&self, countries: &[Country]) -> Option<()> {
        let country = countries.iter().find(|c| c.name == self.country)?;
        let city = country.cities.iter().find(|c| c.name == self.city)?;
        let place = city.places.iter().find(|p| p.number == self.station)?;
        place
            .bike_numbers
            .iter()
            .find(|n| self.bike_numbers.contains(n))
            .map(|_| ())
    }
}

#[async_trait]
impl AvailabilityProbe for NextbikeProbe {
    type Record = Country;

    async fn fetch(&self) -> Result<Vec<Country>, AdapterError> {
        let response = self.client.get(&self.endpoint).send().await?;

        if !response.status().is_success() {
            return Err(AdapterError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        let feed: Feed = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        Ok(feed.countries)
    }

    fn evaluate(&self, countries: &[Country]) -> bool {
        self.station_has_bike(countries).is_some()
    }

    fn flag_suffix(&self) -> &str {
        FLAG_SUFFIX
    }

    fn topic_prefix(&self) -> &str {
        &self.topic_prefix
    }
}

/// Builder for NextbikeProbe.
#[derive(Debug, Default)]
pub struct NextbikeProbeBuilder {
    endpoint: Option<String>,
    country: Option<String>,
    city: Option<String>,
    station: Option<i64>,
    bike_numbers: Option<Vec<String>>,
    topic_prefix: Option<String>,
    timeout: Option<Duration>,
}

impl NextbikeProbeBuilder {
    /// Set the live feed URL.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the country name (default: "Germany").
    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Set the city name (default: "Leipzig").
    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Set the station number (default: 4101).
    pub fn station(mut self, station: i64) -> Self {
        self.station = Some(station);
        self
    }

    /// Set the bike numbers to look for.
    pub fn bike_numbers<I, S>(mut self, numbers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bike_numbers = Some(numbers.into_iter().map(Into::into).collect());
        self
    }

    /// Set the topic namespace (default: "mobility/nextbike").
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
    pub fn build(self) -> Result<NextbikeProbe, AdapterError> {
        let client = Client::builder()
            .timeout(self.timeout.unwrap_or(Duration::from_secs(5)))
            .build()?;

        Ok(NextbikeProbe {
            client,
            endpoint: self.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            country: self.country.unwrap_or_else(|| "Germany".to_string()),
            city: self.city.unwrap_or_else(|| "Leipzig".to_string()),
            station: self.station.unwrap_or(4101),
            bike_numbers: self.bike_numbers.unwrap_or_else(|| {
                DEFAULT_BIKE_NUMBERS.iter().map(|n| n.to_string()).collect()
            }),
            topic_prefix: self
                .topic_prefix
                .unwrap_or_else(|| DEFAULT_TOPIC_PREFIX.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    countries: Vec<Country>,
}

/// Country entry of the live feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Country {
    /// Country name, e.g. "Germany".
    #[serde(default)]
    pub name: String,
    /// Cities served in this country.
    #[serde(default)]
    pub cities: Vec<City>,
}

/// City entry of the live feed.
#[derive(Debug, Clone, Deserialize)]
pub struct City {
    /// City name, e.g. "Leipzig".
    #[serde(default)]
    pub name: String,
    /// Stations in the city.
    #[serde(default)]
    pub places: Vec<Place>,
}

/// Station entry of the live feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Place {
    /// Station number.
    #[serde(default)]
    pub number: i64,
    /// Numbers of the bikes currently parked here.
    #[serde(default)]
    pub bike_numbers: Vec<String>,
}
