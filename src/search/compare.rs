//! Comparator - merges provider outcomes into one ranked result

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::offer::{FlightOffer, ProviderId};
use super::query::TripQuery;
use crate::error::Error;
use crate::Result;

/// Why a provider contributed no offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Authentication,
    RateLimit,
    Upstream,
    Timeout,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Authentication => "authentication",
            FailureKind::RateLimit => "rate_limit",
            FailureKind::Upstream => "upstream",
            FailureKind::Timeout => "timeout",
        }
    }
}

/// Recorded failure of a single provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub kind: FailureKind,
    pub message: String,
}

impl ProviderFailure {
    /// Classify an error raised while querying `provider`.
    pub fn from_error(provider: ProviderId, err: &Error) -> Self {
        let kind = match err {
            Error::Authentication { .. } => FailureKind::Authentication,
            Error::RateLimit { .. } => FailureKind::RateLimit,
            Error::Timeout { .. } => FailureKind::Timeout,
            Error::Http(e) if e.is_timeout() => FailureKind::Timeout,
            _ => FailureKind::Upstream,
        };
        Self {
            provider,
            kind,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.provider, self.kind.as_str(), self.message)
    }
}

/// Settled result of one provider branch.
#[derive(Debug)]
pub struct ProviderOutcome {
    pub provider: ProviderId,
    pub result: Result<Vec<FlightOffer>>,
}

impl ProviderOutcome {
    pub fn success(provider: ProviderId, offers: Vec<FlightOffer>) -> Self {
        Self {
            provider,
            result: Ok(offers),
        }
    }

    pub fn failure(provider: ProviderId, err: Error) -> Self {
        Self {
            provider,
            result: Err(err),
        }
    }
}

/// Per-provider contribution to a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub provider: ProviderId,
    pub succeeded: bool,
    pub offers: usize,
}

/// Merged, ranked offers for one trip query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub search_id: Uuid,
    /// Currency the ranking is anchored on (the requested currency)
    pub currency: String,
    /// True when at least one offer is priced in another currency
    pub mixed_currency: bool,
    pub offers: Vec<FlightOffer>,
    pub sources: Vec<SourceSummary>,
    pub failures: Vec<ProviderFailure>,
    pub summary: String,
}

impl ComparisonResult {
    /// Cheapest offer in the requested currency, if any came back in it.
    pub fn cheapest(&self) -> Option<&FlightOffer> {
        self.offers.first().filter(|o| o.price.currency == self.currency)
    }

    pub fn fastest(&self) -> Option<&FlightOffer> {
        self.offers.iter().min_by_key(|o| o.duration_minutes)
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Merge provider outcomes into a [`ComparisonResult`].
///
/// Outcomes are consumed in provider-declared order. Failed providers are
/// recorded and skipped. Fails with [`Error::NoResults`] when no offers remain.
pub fn compare(query: &TripQuery, outcomes: Vec<ProviderOutcome>) -> Result<ComparisonResult> {
    let reference = query.currency();
    let mut offers = Vec::new();
    let mut sources = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();

    for outcome in outcomes {
        match outcome.result {
            Ok(list) => {
                debug!("{} contributed {} offers", outcome.provider, list.len());
                sources.push(SourceSummary {
                    provider: outcome.provider,
                    succeeded: true,
                    offers: list.len(),
                });
                offers.extend(list);
            }
            Err(err) => {
                let failure = ProviderFailure::from_error(outcome.provider, &err);
                warn!("Provider failed, continuing without it: {}", failure);
                sources.push(SourceSummary {
                    provider: outcome.provider,
                    succeeded: false,
                    offers: 0,
                });
                failures.push(failure);
            }
        }
    }

    let mut offers = dedup(offers);

    if offers.is_empty() {
        return Err(Error::NoResults { failures });
    }

    offers.sort_by(|a, b| rank(reference, a, b));

    let mixed_currency = offers.iter().any(|o| o.price.currency != reference);
    let summary = summarize(query, &offers, &sources);
    info!("{}", summary);

    Ok(ComparisonResult {
        search_id: Uuid::new_v4(),
        currency: reference.to_string(),
        mixed_currency,
        offers,
        sources,
        failures,
        summary,
    })
}

/// Reference-currency offers first, then price, then duration.
/// Ties keep their input order because `sort_by` is stable.
fn rank(reference: &str, a: &FlightOffer, b: &FlightOffer) -> Ordering {
    let a_foreign = a.price.currency != reference;
    let b_foreign = b.price.currency != reference;

    a_foreign
        .cmp(&b_foreign)
        .then_with(|| {
            if a_foreign && b_foreign {
                a.price.currency.cmp(&b.price.currency)
            } else {
                Ordering::Equal
            }
        })
        .then_with(|| a.price.amount.total_cmp(&b.price.amount))
        .then_with(|| a.duration_minutes.cmp(&b.duration_minutes))
}

/// Drop repeats of the same provider + flight number + departure date.
/// Offers lacking a flight number or departure time are always kept.
fn dedup(offers: Vec<FlightOffer>) -> Vec<FlightOffer> {
    let mut seen: HashSet<(ProviderId, String, NaiveDate)> = HashSet::new();
    let before = offers.len();

    let kept: Vec<FlightOffer> = offers
        .into_iter()
        .filter(|offer| match (&offer.flight_number, offer.departure) {
            (Some(number), Some(departure)) => {
                seen.insert((offer.provider, number.clone(), departure.date()))
            }
            _ => true,
        })
        .collect();

    if kept.len() < before {
        debug!("Dropped {} duplicate offers", before - kept.len());
    }
    kept
}

fn summarize(query: &TripQuery, offers: &[FlightOffer], sources: &[SourceSummary]) -> String {
    let used: Vec<&str> = sources
        .iter()
        .filter(|s| s.succeeded)
        .map(|s| s.provider.display_name())
        .collect();

    format!(
        "Found {} flights from {} to {} on {} ({}).",
        offers.len(),
        query.origin(),
        query.destination(),
        query.departure_date(),
        used.join(", ")
    )
}
