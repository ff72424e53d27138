//! Normalized flight offer shared by every provider adapter

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Flight search provider identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Sky Scrapper via RapidAPI
    SkyScrapper,
    /// Google Flights via SerpApi
    GoogleFlights,
}

impl ProviderId {
    /// Every provider, in registry order.
    pub const ALL: [ProviderId; 2] = [ProviderId::SkyScrapper, ProviderId::GoogleFlights];

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::SkyScrapper => "Sky Scrapper",
            ProviderId::GoogleFlights => "Google Flights",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Price amount labeled with its ISO currency code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

/// One flight option in provider-neutral form.
///
/// Departure and arrival are the local wall-clock times at each airport,
/// exactly as the provider reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    pub provider: ProviderId,
    pub airline: String,
    pub origin: String,
    pub destination: String,
    pub departure: Option<NaiveDateTime>,
    pub arrival: Option<NaiveDateTime>,
    pub duration_minutes: u32,
    pub stops: u32,
    pub price: Money,
    /// Flight number(s) of the outbound journey, e.g. "BA178" or "AA100 / BA295"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    /// Booking deep link or provider booking token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_reference: Option<String>,
}

impl FlightOffer {
    pub fn is_nonstop(&self) -> bool {
        self.stops == 0
    }

    /// Duration formatted as "7h 30m".
    pub fn duration_label(&self) -> String {
        format!("{}h {:02}m", self.duration_minutes / 60, self.duration_minutes % 60)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal offer for comparator and tool tests.
    pub fn offer(provider: ProviderId, amount: f64, duration_minutes: u32) -> FlightOffer {
        FlightOffer {
            provider,
            airline: "Test Air".to_string(),
            origin: "JFK".to_string(),
            destination: "LHR".to_string(),
            departure: None,
            arrival: None,
            duration_minutes,
            stops: 0,
            price: Money::new(amount, "USD"),
            flight_number: None,
            booking_reference: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_label() {
        let offer = fixtures::offer(ProviderId::GoogleFlights, 420.0, 450);
        assert_eq!(offer.duration_label(), "7h 30m");
        assert!(offer.is_nonstop());
    }

    #[test]
    fn test_provider_serialization() {
        let json = serde_json::to_string(&ProviderId::SkyScrapper).unwrap();
        assert_eq!(json, "\"sky_scrapper\"");
        assert_eq!(ProviderId::GoogleFlights.to_string(), "Google Flights");
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(420.0, "USD").to_string(), "420.00 USD");
    }
}
