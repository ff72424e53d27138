//! Google Flights client via SerpApi.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{join_distinct, parse_local_time, read_json, transport_error, FlightProvider};
use crate::error::Error;
use crate::search::{CabinClass, FlightOffer, Money, ProviderId, TripQuery};
use crate::Result;

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com";
const SEARCH_PATH: &str = "/search";

const PROVIDER: ProviderId = ProviderId::GoogleFlights;

/// SerpApi Google Flights client
#[derive(Clone)]
pub struct GoogleFlightsClient {
    api_key: String,
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl GoogleFlightsClient {
    pub fn new(client: Client, api_key: &str, base_url: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client,
        }
    }

    /// SerpApi query parameters, without the API key.
    fn build_params(&self, query: &TripQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("engine", "google_flights".to_string()),
            ("departure_id", query.origin().to_uppercase()),
            ("arrival_id", query.destination().to_uppercase()),
            ("outbound_date", query.departure_date().to_string()),
            ("travel_class", travel_class(query.cabin_class()).to_string()),
            ("adults", query.adults().to_string()),
            ("currency", query.currency().to_string()),
            ("hl", query.language().to_string()),
            ("gl", query.country_code().to_lowercase()),
            ("output", "json".to_string()),
        ];

        match query.return_date() {
            Some(ret) => {
                params.push(("type", "1".to_string()));
                params.push(("return_date", ret.to_string()));
            }
            None => params.push(("type", "2".to_string())),
        }

        params
    }
}

#[async_trait]
impl FlightProvider for GoogleFlightsClient {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    async fn search(&self, query: &TripQuery) -> Result<Vec<FlightOffer>> {
        if self.api_key.is_empty() {
            return Err(Error::Authentication {
                provider: PROVIDER,
                message: "SERPAPI_KEY is not set".to_string(),
            });
        }

        info!("Google Flights search: {} ({} adults, {})", query, query.adults(), query.cabin_class());

        let params = self.build_params(query);
        debug!("SerpApi params: {:?}", params);

        let response = self
            .client
            .get(format!("{}{}", self.base_url, SEARCH_PATH))
            .query(&params)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e, self.timeout))?;

        let body = read_json(PROVIDER, response, self.timeout).await?;
        let offers = parse_flights(&body, query.currency())?;
        info!("Google Flights returned {} offers", offers.len());
        Ok(offers)
    }
}

fn travel_class(cabin: CabinClass) -> u8 {
    match cabin {
        CabinClass::Economy => 1,
        CabinClass::PremiumEconomy => 2,
        CabinClass::Business => 3,
        CabinClass::First => 4,
    }
}

// Response schema

#[derive(Debug, Deserialize)]
struct FlightGroup {
    #[serde(default)]
    flights: Vec<Segment>,
    #[serde(default)]
    layovers: Vec<Value>,
    total_duration: Option<u32>,
    price: Option<f64>,
    booking_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    #[serde(default)]
    departure_airport: Airport,
    #[serde(default)]
    arrival_airport: Airport,
    duration: Option<u32>,
    airline: Option<String>,
    flight_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Airport {
    id: Option<String>,
    time: Option<String>,
}

/// SerpApi answers "no results" with an `error` string rather than a status.
fn is_empty_result(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("hasn't returned any results") || lower.contains("no results")
}

/// Adapt a SerpApi Google Flights payload: one offer per flight group.
///
/// Prices are in the currency SerpApi echoes under `search_parameters`,
/// falling back to the requested one.
fn parse_flights(body: &Value, requested: &str) -> Result<Vec<FlightOffer>> {
    if let Some(message) = body.get("error").and_then(Value::as_str) {
        if is_empty_result(message) {
            debug!("SerpApi reported no results: {}", message);
            return Ok(Vec::new());
        }
        return Err(Error::upstream(PROVIDER, message.to_string()));
    }

    let status = body
        .pointer("/search_metadata/status")
        .and_then(Value::as_str)
        .unwrap_or("Unknown");
    if status != "Success" {
        return Err(Error::upstream(PROVIDER, format!("search status '{}'", status)));
    }

    let currency = body
        .pointer("/search_parameters/currency")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .unwrap_or(requested);
    if !currency.eq_ignore_ascii_case(requested) {
        warn!("Google Flights priced in {} instead of {}", currency, requested);
    }

    let groups = ["best_flights", "other_flights"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_array))
        .flatten();

    let mut offers = Vec::new();
    for raw in groups {
        let group: FlightGroup = match serde_json::from_value(raw.clone()) {
            Ok(group) => group,
            Err(e) => {
                warn!("Skipping malformed Google Flights group: {}", e);
                continue;
            }
        };
        match to_offer(group, currency) {
            Some(offer) => offers.push(offer),
            None => debug!("Skipping Google Flights group without price or segments"),
        }
    }
    Ok(offers)
}

fn to_offer(group: FlightGroup, currency: &str) -> Option<FlightOffer> {
    let amount = group.price?;
    let first = group.flights.first()?;
    let last = group.flights.last()?;

    let airline = join_distinct(group.flights.iter().filter_map(|s| s.airline.as_deref()));
    let numbers: Vec<String> = group
        .flights
        .iter()
        .filter_map(|s| s.flight_number.as_deref())
        .map(|n| n.replace(' ', ""))
        .collect();
    let numbers = join_distinct(numbers.iter().map(String::as_str));
    let duration = group
        .total_duration
        .unwrap_or_else(|| group.flights.iter().filter_map(|s| s.duration).sum());

    Some(FlightOffer {
        provider: PROVIDER,
        airline: if airline.is_empty() { "Unknown airline".to_string() } else { airline },
        origin: first.departure_airport.id.clone().unwrap_or_default(),
        destination: last.arrival_airport.id.clone().unwrap_or_default(),
        departure: first.departure_airport.time.as_deref().and_then(parse_local_time),
        arrival: last.arrival_airport.time.as_deref().and_then(parse_local_time),
        duration_minutes: duration,
        stops: group.layovers.len() as u32,
        price: Money::new(amount, currency),
        flight_number: (!numbers.is_empty()).then_some(numbers),
        booking_reference: group.booking_token,
    })
}
