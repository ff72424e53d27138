//! Search module - trip queries, normalized offers, and dual-source comparison.
//!
//! This module contains:
//! - [`TripQuery`] validated search parameters
//! - [`FlightOffer`] the provider-neutral offer
//! - [`compare`] merging provider outcomes into a [`ComparisonResult`]
//! - [`FlightSearchService`] concurrent fan-out over providers

mod compare;
mod offer;
mod query;
mod service;

pub use compare::{
    compare, ComparisonResult, FailureKind, ProviderFailure, ProviderOutcome, SourceSummary,
};
pub use offer::{FlightOffer, Money, ProviderId};
pub use query::{
    normalize_currency, CabinClass, TripQuery, TripQueryBuilder, DATE_FORMAT, MAX_ADULTS,
};
pub use service::FlightSearchService;

#[cfg(test)]
pub(crate) use offer::fixtures;
