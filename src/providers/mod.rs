//! Providers module - flight search API adapters
//!
//! Each adapter speaks one provider's request/response schema and hands
//! back [`FlightOffer`]s. The comparator only ever sees the
//! [`FlightProvider`] trait.
//!
//! # Adding a New Provider
//!
//! 1. Create a new file (e.g., `kiwi.rs`)
//! 2. Implement the [`FlightProvider`] trait
//! 3. Add a [`ProviderId`] variant
//! 4. Register it in [`ProviderRegistry::from_config`]

pub mod google_flights;
pub mod sky_scrapper;

pub use google_flights::GoogleFlightsClient;
pub use sky_scrapper::SkyScrapperClient;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{Client, Response, StatusCode};

use crate::config::Config;
use crate::error::Error;
use crate::search::{FlightOffer, ProviderId, TripQuery};
use crate::Result;

/// Flight search provider - one adapter per external API
#[async_trait]
pub trait FlightProvider: Send + Sync {
    /// Provider identifier used in offers and failure records
    fn id(&self) -> ProviderId;

    /// Search for offers matching the query.
    ///
    /// Performs no retries.
    async fn search(&self, query: &TripQuery) -> Result<Vec<FlightOffer>>;
}

/// Provider registry - builds the configured providers in declared order.
pub struct ProviderRegistry;

impl ProviderRegistry {
    /// Sky Scrapper first, Google Flights second.
    pub fn from_config(config: &Config) -> Result<Vec<Arc<dyn FlightProvider>>> {
        let timeout = config.provider_timeout();
        let http = http_client(timeout)?;

        let sky = SkyScrapperClient::new(
            http.clone(),
            &config.sky_scrapper_api_key,
            &config.sky_scrapper_base_url,
            timeout,
        );
        let google = GoogleFlightsClient::new(
            http,
            &config.serpapi_api_key,
            &config.serpapi_base_url,
            timeout,
        );

        Ok(vec![Arc::new(sky), Arc::new(google)])
    }

    /// List available provider names.
    pub fn available() -> &'static [&'static str] {
        &["sky_scrapper", "google_flights"]
    }
}

/// Shared HTTP client with a bounded per-request wait.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("flight-agent/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport error onto the provider taxonomy.
pub(crate) fn transport_error(provider: ProviderId, err: reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            provider,
            seconds: timeout.as_secs(),
        }
    } else {
        Error::upstream(provider, format!("request failed: {}", err))
    }
}

/// Map a non-success status onto the provider taxonomy.
pub(crate) fn status_error(provider: ProviderId, status: StatusCode, body: &str) -> Error {
    let message = format!("HTTP {}: {}", status.as_u16(), truncate(body, 300));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication { provider, message },
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimit { provider, message },
        _ => Error::upstream(provider, message),
    }
}

/// Read a JSON body, classifying non-2xx statuses first.
pub(crate) async fn read_json(
    provider: ProviderId,
    response: Response,
    timeout: Duration,
) -> Result<serde_json::Value> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e, timeout))?;

    if !status.is_success() {
        return Err(status_error(provider, status, &text));
    }

    serde_json::from_str(&text)
        .map_err(|e| Error::upstream(provider, format!("malformed JSON payload: {}", e)))
}

/// Parse a provider's local wall-clock timestamp.
pub(crate) fn parse_local_time(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    let value = value.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Join distinct names in first-seen order.
pub(crate) fn join_distinct<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for name in names {
        let name = name.trim();
        if !name.is_empty() && !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen.join(" / ")
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Fake provider for testing.
#[cfg(test)]
pub struct FakeProvider {
    id: ProviderId,
    behavior: FakeBehavior,
    delay: Option<Duration>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
enum FakeBehavior {
    Offers(Vec<FlightOffer>),
    Fail(fn(ProviderId) -> Error),
}

#[cfg(test)]
impl FakeProvider {
    /// Succeed with fixed offers.
    pub fn with_offers(id: ProviderId, offers: Vec<FlightOffer>) -> Self {
        Self {
            id,
            behavior: FakeBehavior::Offers(offers),
            delay: None,
            calls: Default::default(),
        }
    }

    /// Fail every call with the error built by `make`.
    pub fn failing(id: ProviderId, make: fn(ProviderId) -> Error) -> Self {
        Self {
            id,
            behavior: FakeBehavior::Fail(make),
            delay: None,
            calls: Default::default(),
        }
    }

    /// Sleep before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl FlightProvider for FakeProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn search(&self, _query: &TripQuery) -> Result<Vec<FlightOffer>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            FakeBehavior::Offers(offers) => Ok(offers.clone()),
            FakeBehavior::Fail(make) => Err(make(self.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = status_error(ProviderId::SkyScrapper, StatusCode::UNAUTHORIZED, "bad key");
        assert!(matches!(err, Error::Authentication { .. }));

        let err = status_error(ProviderId::SkyScrapper, StatusCode::FORBIDDEN, "not subscribed");
        assert!(matches!(err, Error::Authentication { .. }));

        let err = status_error(ProviderId::GoogleFlights, StatusCode::TOO_MANY_REQUESTS, "quota");
        assert!(matches!(err, Error::RateLimit { .. }));

        let err = status_error(ProviderId::GoogleFlights, StatusCode::BAD_GATEWAY, "oops");
        assert!(matches!(err, Error::Upstream { .. }));
        assert!(err.to_string().contains("HTTP 502"));
    }

    #[test]
    fn test_parse_local_time_formats() {
        let expected = chrono::NaiveDate::from_ymd_opt(2025, 6, 10)
            .unwrap()
            .and_hms_opt(18, 5, 0)
            .unwrap();
        assert_eq!(parse_local_time("2025-06-10T18:05:00"), Some(expected));
        assert_eq!(parse_local_time("2025-06-10 18:05"), Some(expected));
        assert_eq!(parse_local_time("N/A"), None);
    }

    #[test]
    fn test_join_distinct() {
        assert_eq!(join_distinct(["BA", "AA", "BA", " "]), "BA / AA");
        assert_eq!(join_distinct(Vec::<&str>::new()), "");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 300), "short");
    }

    #[test]
    fn test_registry_order() {
        let config = Config::test();
        let providers = ProviderRegistry::from_config(&config).unwrap();
        let ids: Vec<ProviderId> = providers.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![ProviderId::SkyScrapper, ProviderId::GoogleFlights]);
    }
}
