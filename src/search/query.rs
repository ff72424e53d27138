//! Trip query - validated search parameters

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::Result;

/// Date format accepted from users and tools.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest party most providers will price in one search.
pub const MAX_ADULTS: u32 = 9;

/// Cabin class requested for the trip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    #[default]
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl CabinClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CabinClass::Economy => "economy",
            CabinClass::PremiumEconomy => "premium_economy",
            CabinClass::Business => "business",
            CabinClass::First => "first",
        }
    }
}

impl std::str::FromStr for CabinClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "economy" | "coach" => Ok(CabinClass::Economy),
            "premium_economy" | "premium" => Ok(CabinClass::PremiumEconomy),
            "business" => Ok(CabinClass::Business),
            "first" | "first_class" => Ok(CabinClass::First),
            other => Err(Error::InvalidQuery(format!("unknown cabin class '{other}'"))),
        }
    }
}

impl std::fmt::Display for CabinClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated flight search.
///
/// Only constructible through [`TripQueryBuilder::build`], so every value
/// satisfies: origin differs from destination, and the return date (if any)
/// is not before the departure date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripQuery {
    origin: String,
    destination: String,
    departure_date: NaiveDate,
    return_date: Option<NaiveDate>,
    adults: u32,
    cabin_class: CabinClass,
    currency: String,
    market: String,
    country_code: String,
    language: String,
}

impl TripQuery {
    pub fn builder(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure_date: impl Into<String>,
    ) -> TripQueryBuilder {
        TripQueryBuilder::new(origin, destination, departure_date)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn departure_date(&self) -> NaiveDate {
        self.departure_date
    }

    pub fn return_date(&self) -> Option<NaiveDate> {
        self.return_date
    }

    pub fn is_round_trip(&self) -> bool {
        self.return_date.is_some()
    }

    pub fn adults(&self) -> u32 {
        self.adults
    }

    pub fn cabin_class(&self) -> CabinClass {
        self.cabin_class
    }

    /// Currency prices are requested in. Also the comparison's reference currency.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl std::fmt::Display for TripQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} → {} on {}", self.origin, self.destination, self.departure_date)?;
        if let Some(ret) = self.return_date {
            write!(f, " (return {ret})")?;
        }
        Ok(())
    }
}

/// Builder collecting raw user/tool input before validation.
#[derive(Debug, Clone)]
pub struct TripQueryBuilder {
    origin: String,
    destination: String,
    departure_date: String,
    return_date: Option<String>,
    adults: u32,
    cabin_class: CabinClass,
    currency: String,
    market: String,
    country_code: String,
    language: String,
}

impl TripQueryBuilder {
    fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure_date: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            departure_date: departure_date.into(),
            return_date: None,
            adults: 1,
            cabin_class: CabinClass::default(),
            currency: "USD".to_string(),
            market: "en-US".to_string(),
            country_code: "US".to_string(),
            language: "en".to_string(),
        }
    }

    /// Empty strings are treated as a one-way trip.
    pub fn return_date(mut self, date: Option<impl Into<String>>) -> Self {
        self.return_date = date.map(Into::into).filter(|d: &String| !d.trim().is_empty());
        self
    }

    pub fn adults(mut self, adults: u32) -> Self {
        self.adults = adults;
        self
    }

    pub fn cabin_class(mut self, cabin_class: CabinClass) -> Self {
        self.cabin_class = cabin_class;
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn market(mut self, market: impl Into<String>) -> Self {
        self.market = market.into();
        self
    }

    pub fn country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn build(self) -> Result<TripQuery> {
        let origin = self.origin.trim().to_string();
        let destination = self.destination.trim().to_string();

        if origin.is_empty() {
            return Err(Error::InvalidQuery("origin is required".to_string()));
        }
        if destination.is_empty() {
            return Err(Error::InvalidQuery("destination is required".to_string()));
        }
        if origin.eq_ignore_ascii_case(&destination) {
            return Err(Error::InvalidQuery(format!(
                "origin and destination are both '{origin}'"
            )));
        }

        let departure_date = parse_date("departure_date", &self.departure_date)?;
        let return_date = self
            .return_date
            .as_deref()
            .map(|d| parse_date("return_date", d))
            .transpose()?;

        if let Some(ret) = return_date {
            if ret < departure_date {
                return Err(Error::InvalidQuery(format!(
                    "return date {ret} is before departure date {departure_date}"
                )));
            }
        }

        if self.adults == 0 || self.adults > MAX_ADULTS {
            return Err(Error::InvalidQuery(format!(
                "adults must be between 1 and {MAX_ADULTS}, got {}",
                self.adults
            )));
        }

        let currency = normalize_currency(&self.currency)?;

        Ok(TripQuery {
            origin,
            destination,
            departure_date,
            return_date,
            adults: self.adults,
            cabin_class: self.cabin_class,
            currency,
            market: self.market.trim().to_string(),
            country_code: self.country_code.trim().to_uppercase(),
            language: self.language.trim().to_string(),
        })
    }
}

/// Upper-case a currency code, rejecting anything but three ASCII letters.
pub fn normalize_currency(raw: &str) -> Result<String> {
    let currency = raw.trim().to_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidQuery(format!(
            "currency must be a 3-letter ISO code, got '{}'",
            raw
        )));
    }
    Ok(currency)
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        Error::InvalidQuery(format!("{field} '{value}' is not a YYYY-MM-DD date"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_one_way() {
        let query = TripQuery::builder(" jfk ", "LHR", "2025-06-10").build().unwrap();
        assert_eq!(query.origin(), "jfk");
        assert_eq!(query.departure_date(), NaiveDate::from_ymd_opt(2025, 6, 10).unwrap());
        assert!(!query.is_round_trip());
        assert_eq!(query.adults(), 1);
        assert_eq!(query.currency(), "USD");
    }

    #[test]
    fn test_same_origin_and_destination_rejected() {
        let err = TripQuery::builder("JFK", "jfk", "2025-06-10").build().unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn test_return_before_departure_rejected() {
        let err = TripQuery::builder("JFK", "LHR", "2025-06-10")
            .return_date(Some("2025-06-09"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("before departure"));
    }

    #[test]
    fn test_same_day_return_allowed() {
        let query = TripQuery::builder("JFK", "LHR", "2025-06-10")
            .return_date(Some("2025-06-10"))
            .build()
            .unwrap();
        assert!(query.is_round_trip());
    }

    #[test]
    fn test_unparseable_date_rejected() {
        let err = TripQuery::builder("JFK", "LHR", "10/06/2025").build().unwrap_err();
        assert!(err.to_string().contains("departure_date"));

        let err = TripQuery::builder("JFK", "LHR", "2025-02-30").build().unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn test_empty_return_date_is_one_way() {
        let query = TripQuery::builder("JFK", "LHR", "2025-06-10")
            .return_date(Some(""))
            .build()
            .unwrap();
        assert_eq!(query.return_date(), None);
    }

    #[test]
    fn test_passenger_bounds() {
        assert!(TripQuery::builder("JFK", "LHR", "2025-06-10").adults(0).build().is_err());
        assert!(TripQuery::builder("JFK", "LHR", "2025-06-10").adults(10).build().is_err());
        assert!(TripQuery::builder("JFK", "LHR", "2025-06-10").adults(9).build().is_ok());
    }

    #[test]
    fn test_currency_normalized() {
        let query = TripQuery::builder("JFK", "LHR", "2025-06-10")
            .currency("eur")
            .build()
            .unwrap();
        assert_eq!(query.currency(), "EUR");
        assert!(TripQuery::builder("JFK", "LHR", "2025-06-10").currency("euro").build().is_err());
    }

    #[test]
    fn test_locale_hints_carried() {
        let query = TripQuery::builder("FRA", "JFK", "2025-06-10")
            .market(" de-DE ")
            .country_code("de")
            .language("de")
            .build()
            .unwrap();
        assert_eq!(query.market(), "de-DE");
        assert_eq!(query.country_code(), "DE");
        assert_eq!(query.language(), "de");
    }

    #[test]
    fn test_cabin_class_parsing() {
        assert_eq!("Business".parse::<CabinClass>().unwrap(), CabinClass::Business);
        assert_eq!("premium economy".parse::<CabinClass>().unwrap(), CabinClass::PremiumEconomy);
        assert!("steerage".parse::<CabinClass>().is_err());
    }
}
