//! Flight tools - search one provider or compare both

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::Tool;
use crate::error::Error;
use crate::search::{CabinClass, FlightSearchService, ProviderId, TripQuery};
use crate::Result;

/// Arguments shared by every flight tool.
#[derive(Debug, Deserialize)]
struct FlightArgs {
    origin: String,
    destination: String,
    departure_date: String,
    #[serde(default)]
    return_date: Option<String>,
    #[serde(default)]
    adults: Option<u32>,
    #[serde(default)]
    cabin_class: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

/// Models often send `""` for optional strings; treat that as absent.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Validate raw tool arguments into a query. No network access.
fn parse_query(params: Value, default_currency: &str) -> Result<TripQuery> {
    let args: FlightArgs = serde_json::from_value(params)
        .map_err(|e| Error::InvalidQuery(format!("Invalid arguments: {}", e)))?;

    let mut builder = TripQuery::builder(args.origin, args.destination, args.departure_date)
        .return_date(present(args.return_date))
        .currency(present(args.currency).unwrap_or_else(|| default_currency.to_string()));

    if let Some(adults) = args.adults {
        builder = builder.adults(adults);
    }
    if let Some(cabin) = present(args.cabin_class) {
        builder = builder.cabin_class(cabin.parse::<CabinClass>()?);
    }
    if let Some(market) = present(args.market) {
        builder = builder.market(market);
    }
    if let Some(country_code) = present(args.country_code) {
        builder = builder.country_code(country_code);
    }
    if let Some(language) = present(args.language) {
        builder = builder.language(language);
    }

    builder.build()
}

fn flight_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "origin": {
                "type": "string",
                "description": "Origin airport IATA code (e.g. JFK) or city name"
            },
            "destination": {
                "type": "string",
                "description": "Destination airport IATA code (e.g. LHR) or city name"
            },
            "departure_date": {
                "type": "string",
                "description": "Departure date, YYYY-MM-DD"
            },
            "return_date": {
                "type": "string",
                "description": "Return date, YYYY-MM-DD. Omit for one-way trips"
            },
            "adults": {
                "type": "integer",
                "description": "Number of adult passengers (1-9, default 1)"
            },
            "cabin_class": {
                "type": "string",
                "enum": ["economy", "premium_economy", "business", "first"],
                "description": "Cabin class (default economy)"
            },
            "currency": {
                "type": "string",
                "description": "ISO currency code for prices (default USD)"
            },
            "market": {
                "type": "string",
                "description": "Market locale such as en-US or de-DE (default en-US)"
            },
            "country_code": {
                "type": "string",
                "description": "Two-letter country code of the searcher, e.g. US or DE (default US)"
            },
            "language": {
                "type": "string",
                "description": "Language for result text, e.g. en or de (default en)"
            }
        },
        "required": ["origin", "destination", "departure_date"]
    })
}

/// Which providers a tool consults
#[derive(Debug, Clone, Copy)]
enum Scope {
    Only(ProviderId),
    All,
}

/// A flight search tool bound to a provider scope
pub struct FlightSearchTool {
    name: &'static str,
    description: &'static str,
    scope: Scope,
    service: FlightSearchService,
    default_currency: String,
}

impl FlightSearchTool {
    /// `search_flights`: Sky Scrapper only
    pub fn sky_scrapper(service: FlightSearchService, default_currency: &str) -> Self {
        Self {
            name: "search_flights",
            description: "Search flights on Sky Scrapper. Returns offers sorted by price as JSON.",
            scope: Scope::Only(ProviderId::SkyScrapper),
            service,
            default_currency: default_currency.to_string(),
        }
    }

    /// `search_google_flights`: Google Flights only
    pub fn google_flights(service: FlightSearchService, default_currency: &str) -> Self {
        Self {
            name: "search_google_flights",
            description: "Search flights on Google Flights. Returns offers sorted by price as JSON.",
            scope: Scope::Only(ProviderId::GoogleFlights),
            service,
            default_currency: default_currency.to_string(),
        }
    }

    /// `compare_flights`: every provider, merged
    pub fn compare(service: FlightSearchService, default_currency: &str) -> Self {
        Self {
            name: "compare_flights",
            description: "Search all flight providers at once and return one merged list sorted by price, \
                          with the cheapest and fastest options and any provider failures, as JSON.",
            scope: Scope::All,
            service,
            default_currency: default_currency.to_string(),
        }
    }
}

#[async_trait]
impl Tool for FlightSearchTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn parameters(&self) -> Value {
        flight_parameters()
    }

    async fn execute(&self, params: Value) -> Result<String> {
        let query = parse_query(params, &self.default_currency)?;
        info!("{}: {}", self.name, query);

        let result = match self.scope {
            Scope::Only(id) => self.service.search_provider(id, &query).await?,
            Scope::All => self.service.search(&query).await?,
        };

        Ok(serde_json::to_string(&result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{FakeProvider, FlightProvider};
    use crate::search::fixtures::offer;
    use std::sync::Arc;
    use std::time::Duration;

    fn setup(a_price: f64, b_price: f64) -> (Arc<FakeProvider>, Arc<FakeProvider>, FlightSearchService) {
        let a = Arc::new(FakeProvider::with_offers(
            ProviderId::SkyScrapper,
            vec![offer(ProviderId::SkyScrapper, a_price, 420)],
        ));
        let b = Arc::new(FakeProvider::with_offers(
            ProviderId::GoogleFlights,
            vec![offer(ProviderId::GoogleFlights, b_price, 450)],
        ));
        let providers: Vec<Arc<dyn FlightProvider>> = vec![a.clone(), b.clone()];
        (a, b, FlightSearchService::new(providers, Duration::from_secs(5)))
    }

    #[test]
    fn test_parse_query_defaults() {
        let query = parse_query(
            json!({"origin": "JFK", "destination": "LHR", "departure_date": "2025-06-10"}),
            "EUR",
        )
        .unwrap();
        assert_eq!(query.adults(), 1);
        assert_eq!(query.cabin_class(), CabinClass::Economy);
        assert_eq!(query.currency(), "EUR");
        assert!(!query.is_round_trip());
    }

    #[test]
    fn test_parse_query_locale_hints() {
        let query = parse_query(
            json!({
                "origin": "FRA",
                "destination": "JFK",
                "departure_date": "2025-06-10",
                "market": "de-DE",
                "country_code": "DE",
                "language": "de"
            }),
            "EUR",
        )
        .unwrap();
        assert_eq!(query.market(), "de-DE");
        assert_eq!(query.country_code(), "DE");
        assert_eq!(query.language(), "de");
    }

    #[test]
    fn test_parse_query_empty_optionals_are_absent() {
        let query = parse_query(
            json!({
                "origin": "JFK",
                "destination": "LHR",
                "departure_date": "2025-06-10",
                "return_date": "",
                "cabin_class": "",
                "currency": "",
                "market": " ",
                "country_code": "",
                "language": ""
            }),
            "EUR",
        )
        .unwrap();
        assert!(!query.is_round_trip());
        assert_eq!(query.cabin_class(), CabinClass::Economy);
        assert_eq!(query.currency(), "EUR");
        assert_eq!(query.market(), "en-US");
        assert_eq!(query.country_code(), "US");
        assert_eq!(query.language(), "en");
    }

    #[test]
    fn test_parse_query_missing_field() {
        let err = parse_query(json!({"origin": "JFK"}), "USD").unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn test_parse_query_bad_cabin() {
        let err = parse_query(
            json!({"origin": "JFK", "destination": "LHR", "departure_date": "2025-06-10", "cabin_class": "steerage"}),
            "USD",
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_compare_returns_merged_json() {
        let (a, b, service) = setup(450.0, 420.0);
        let tool = FlightSearchTool::compare(service, "USD");

        let output = tool
            .execute(json!({"origin": "JFK", "destination": "LHR", "departure_date": "2025-06-10"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();

        let offers = value["offers"].as_array().unwrap();
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0]["provider"], "google_flights");
        assert_eq!(offers[1]["provider"], "sky_scrapper");
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_single_provider_tools() {
        let (a, b, service) = setup(450.0, 420.0);

        let sky = FlightSearchTool::sky_scrapper(service.clone(), "USD");
        let output = sky
            .execute(json!({"origin": "JFK", "destination": "LHR", "departure_date": "2025-06-10"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["offers"].as_array().unwrap().len(), 1);
        assert_eq!(value["offers"][0]["provider"], "sky_scrapper");
        assert_eq!((a.calls(), b.calls()), (1, 0));

        let google = FlightSearchTool::google_flights(service, "USD");
        google
            .execute(json!({"origin": "JFK", "destination": "LHR", "departure_date": "2025-06-10"}))
            .await
            .unwrap();
        assert_eq!((a.calls(), b.calls()), (1, 1));
    }

    #[tokio::test]
    async fn test_invalid_query_makes_no_calls() {
        let (a, b, service) = setup(450.0, 420.0);
        let tool = FlightSearchTool::compare(service, "USD");

        let same_city = tool
            .execute(json!({"origin": "JFK", "destination": "jfk", "departure_date": "2025-06-10"}))
            .await;
        assert!(matches!(same_city, Err(Error::InvalidQuery(_))));

        let backwards = tool
            .execute(json!({
                "origin": "JFK",
                "destination": "LHR",
                "departure_date": "2025-06-10",
                "return_date": "2025-06-01"
            }))
            .await;
        assert!(matches!(backwards, Err(Error::InvalidQuery(_))));

        assert_eq!(a.calls(), 0);
        assert_eq!(b.calls(), 0);
    }

    #[test]
    fn test_schema_requires_core_fields() {
        let (_, _, service) = setup(1.0, 2.0);
        let params = FlightSearchTool::compare(service, "USD").parameters();
        assert_eq!(params["required"], json!(["origin", "destination", "departure_date"]));
    }
}
