//! Sky Scrapper (RapidAPI) flight search client.
//!
//! Searching is a two step affair: origin and destination are first resolved
//! to Sky Scrapper's `skyId`/`entityId` pair via the airport lookup endpoint,
//! then the v2 flight search is called with those ids.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{join_distinct, parse_local_time, read_json, transport_error, FlightProvider};
use crate::error::Error;
use crate::search::{FlightOffer, Money, ProviderId, TripQuery};
use crate::Result;

pub const DEFAULT_BASE_URL: &str = "https://sky-scrapper.p.rapidapi.com";
const RAPIDAPI_HOST: &str = "sky-scrapper.p.rapidapi.com";
const LOOKUP_PATH: &str = "/api/v1/flights/searchAirport";
const SEARCH_PATH: &str = "/api/v2/flights/searchFlights";

const PROVIDER: ProviderId = ProviderId::SkyScrapper;

/// Resolved Sky Scrapper place identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkyLocation {
    pub sky_id: String,
    pub entity_id: String,
    pub name: String,
}

/// Sky Scrapper API client
#[derive(Clone)]
pub struct SkyScrapperClient {
    api_key: String,
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl SkyScrapperClient {
    pub fn new(client: Client, api_key: &str, base_url: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client,
        }
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        if self.api_key.is_empty() {
            return Err(Error::Authentication {
                provider: PROVIDER,
                message: "FLIGHTS_SCRAPER_SKY_API_KEY is not set".to_string(),
            });
        }

        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("x-rapidapi-host", RAPIDAPI_HOST)
            .header("x-rapidapi-key", &self.api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e, self.timeout))?;

        read_json(PROVIDER, response, self.timeout).await
    }

    /// Resolve an IATA code or city/airport name.
    ///
    /// Tries the upper-cased text first, then the title-cased text.
    /// Credential and quota errors abort the lookup immediately. When every
    /// candidate fails, the last lookup error is returned as is.
    pub async fn resolve_location(&self, text: &str) -> Result<SkyLocation> {
        let mut tried = Vec::new();
        let mut last_error = None;

        for candidate in lookup_candidates(text) {
            debug!("Looking up Sky Scrapper location for '{}'", candidate);
            let params = [("query", candidate.clone()), ("locale", "en-US".to_string())];

            match self.get(LOOKUP_PATH, &params).await {
                Ok(body) => {
                    if let Some(location) = parse_location(&body) {
                        debug!("Resolved '{}' to skyId={} entityId={}", text, location.sky_id, location.entity_id);
                        return Ok(location);
                    }
                }
                Err(e @ (Error::Authentication { .. } | Error::RateLimit { .. })) => return Err(e),
                Err(e) => {
                    warn!("Sky Scrapper lookup for '{}' failed: {}", candidate, e);
                    last_error = Some(e);
                }
            }
            tried.push(candidate);
        }

        Err(last_error.unwrap_or_else(|| {
            Error::upstream(
                PROVIDER,
                format!("could not resolve location '{}' (tried: {})", text, tried.join(", ")),
            )
        }))
    }
}

#[async_trait]
impl FlightProvider for SkyScrapperClient {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    async fn search(&self, query: &TripQuery) -> Result<Vec<FlightOffer>> {
        info!("Sky Scrapper search: {} ({} adults, {})", query, query.adults(), query.cabin_class());

        let (origin, destination) =
            tokio::try_join!(self.resolve_location(query.origin()), self.resolve_location(query.destination()))?;

        let params = search_params(query, origin, destination);
        debug!("Sky Scrapper params: {:?}", params);

        let body = self.get(SEARCH_PATH, &params).await?;
        let offers = parse_itineraries(&body, query.currency())?;
        info!("Sky Scrapper returned {} offers", offers.len());
        Ok(offers)
    }
}

/// v2 `searchFlights` query parameters for resolved endpoints.
fn search_params(
    query: &TripQuery,
    origin: SkyLocation,
    destination: SkyLocation,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("originSkyId", origin.sky_id),
        ("destinationSkyId", destination.sky_id),
        ("originEntityId", origin.entity_id),
        ("destinationEntityId", destination.entity_id),
        ("date", query.departure_date().to_string()),
        ("cabinClass", query.cabin_class().as_str().to_string()),
        ("adults", query.adults().to_string()),
        ("sortBy", "best".to_string()),
        ("currency", query.currency().to_string()),
        ("market", query.market().to_string()),
        ("countryCode", query.country_code().to_string()),
    ];
    if let Some(ret) = query.return_date() {
        params.push(("returnDate", ret.to_string()));
    }
    params
}

fn lookup_candidates(text: &str) -> Vec<String> {
    let text = text.trim();
    let mut candidates = vec![text.to_uppercase()];
    let title = title_case(text);
    if !candidates.contains(&title) {
        candidates.push(title);
    }
    candidates
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// Response schema

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationRecord {
    sky_id: Option<String>,
    entity_id: Option<String>,
    #[serde(default)]
    presentation: Presentation,
}

#[derive(Debug, Default, Deserialize)]
struct Presentation {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Itinerary {
    id: Option<String>,
    price: Option<Price>,
    #[serde(default)]
    legs: Vec<Leg>,
}

#[derive(Debug, Deserialize)]
struct Price {
    raw: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Leg {
    #[serde(default)]
    origin: Place,
    #[serde(default)]
    destination: Place,
    duration_in_minutes: Option<u32>,
    stop_count: Option<u32>,
    departure: Option<String>,
    arrival: Option<String>,
    #[serde(default)]
    carriers: Carriers,
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Place {
    display_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Carriers {
    #[serde(default)]
    marketing: Vec<Carrier>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Carrier {
    name: Option<String>,
    alternate_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Segment {
    flight_number: Option<String>,
    marketing_carrier: Option<Carrier>,
}

fn parse_location(body: &Value) -> Option<SkyLocation> {
    body.get("data")?.as_array()?.iter().find_map(|record| {
        let record: LocationRecord = serde_json::from_value(record.clone()).ok()?;
        let sky_id = record.sky_id.filter(|s| !s.is_empty())?;
        let entity_id = record.entity_id.filter(|s| !s.is_empty())?;
        Some(SkyLocation {
            name: record.presentation.title.unwrap_or_else(|| sky_id.clone()),
            sky_id,
            entity_id,
        })
    })
}

/// Adapt a v2 `searchFlights` payload.
///
/// v2 prices carry only `raw` and `formatted`, no currency code, so offers
/// are stamped with the requested currency.
fn parse_itineraries(body: &Value, currency: &str) -> Result<Vec<FlightOffer>> {
    if body.get("status").and_then(Value::as_bool) == Some(false) {
        let message = match body.get("message") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "search failed".to_string(),
        };
        return Err(Error::upstream(PROVIDER, message));
    }

    let itineraries = body
        .get("data")
        .and_then(|d| d.get("itineraries"))
        .and_then(Value::as_array)
        .ok_or_else(|| Error::upstream(PROVIDER, "response missing 'data.itineraries' list"))?;

    let mut offers = Vec::with_capacity(itineraries.len());
    for raw in itineraries {
        let itinerary: Itinerary = match serde_json::from_value(raw.clone()) {
            Ok(it) => it,
            Err(e) => {
                warn!("Skipping malformed Sky Scrapper itinerary: {}", e);
                continue;
            }
        };
        match to_offer(itinerary, currency) {
            Some(offer) => offers.push(offer),
            None => debug!("Skipping Sky Scrapper itinerary without price or legs"),
        }
    }
    Ok(offers)
}

fn to_offer(itinerary: Itinerary, currency: &str) -> Option<FlightOffer> {
    let amount = itinerary.price.and_then(|p| p.raw)?;
    let outbound = itinerary.legs.first()?;

    let airline = join_distinct(
        outbound
            .carriers
            .marketing
            .iter()
            .filter_map(|c| c.name.as_deref()),
    );

    let numbers: Vec<String> = outbound
        .segments
        .iter()
        .filter_map(|s| {
            let number = s.flight_number.as_deref()?;
            let prefix = s
                .marketing_carrier
                .as_ref()
                .and_then(|c| c.alternate_id.as_deref())
                .unwrap_or("");
            Some(format!("{prefix}{number}"))
        })
        .collect();

    let stops = outbound
        .stop_count
        .unwrap_or_else(|| outbound.segments.len().saturating_sub(1) as u32);

    Some(FlightOffer {
        provider: PROVIDER,
        airline: if airline.is_empty() { "Unknown airline".to_string() } else { airline },
        origin: outbound.origin.display_code.clone().unwrap_or_default(),
        destination: outbound.destination.display_code.clone().unwrap_or_default(),
        departure: outbound.departure.as_deref().and_then(parse_local_time),
        arrival: outbound.arrival.as_deref().and_then(parse_local_time),
        duration_minutes: itinerary.legs.iter().filter_map(|l| l.duration_in_minutes).sum(),
        stops,
        price: Money::new(amount, currency),
        flight_number: if numbers.is_empty() { None } else { Some(numbers.join(" / ")) },
        booking_reference: itinerary.id,
    })
}
