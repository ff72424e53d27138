//! Search service - concurrent fan-out over providers with a join barrier

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::compare::{compare, ComparisonResult, ProviderOutcome};
use super::offer::ProviderId;
use super::query::TripQuery;
use crate::error::Error;
use crate::providers::FlightProvider;
use crate::Result;

/// Queries every registered provider and compares the results.
#[derive(Clone)]
pub struct FlightSearchService {
    providers: Vec<Arc<dyn FlightProvider>>,
    provider_timeout: Duration,
}

impl FlightSearchService {
    /// Providers are consulted, and ties ranked, in the given order.
    pub fn new(providers: Vec<Arc<dyn FlightProvider>>, provider_timeout: Duration) -> Self {
        Self {
            providers,
            provider_timeout,
        }
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Search all providers concurrently and merge their offers.
    ///
    /// Waits for every provider to settle. Dropping the returned future
    /// cancels all in-flight provider requests.
    pub async fn search(&self, query: &TripQuery) -> Result<ComparisonResult> {
        self.search_with(query, &self.providers).await
    }

    /// Search a single provider, still returning a [`ComparisonResult`].
    pub async fn search_provider(&self, id: ProviderId, query: &TripQuery) -> Result<ComparisonResult> {
        let selected: Vec<Arc<dyn FlightProvider>> = self
            .providers
            .iter()
            .filter(|p| p.id() == id)
            .cloned()
            .collect();

        if selected.is_empty() {
            return Err(Error::Config(format!("Provider not configured: {}", id)));
        }

        self.search_with(query, &selected).await
    }

    async fn search_with(
        &self,
        query: &TripQuery,
        providers: &[Arc<dyn FlightProvider>],
    ) -> Result<ComparisonResult> {
        info!("Searching {} across {} providers", query, providers.len());

        let branches = providers.iter().map(|provider| self.run_one(provider.as_ref(), query));
        let outcomes = join_all(branches).await;

        compare(query, outcomes)
    }

    async fn run_one(&self, provider: &dyn FlightProvider, query: &TripQuery) -> ProviderOutcome {
        let id = provider.id();
        debug!("Starting search on {}", id);

        match timeout(self.provider_timeout, provider.search(query)).await {
            Ok(Ok(offers)) => {
                debug!("{} settled with {} offers", id, offers.len());
                ProviderOutcome::success(id, offers)
            }
            Ok(Err(e)) => {
                warn!("{} failed: {}", id, e);
                ProviderOutcome::failure(id, e)
            }
            Err(_) => {
                warn!("{} timed out after {:?}", id, self.provider_timeout);
                ProviderOutcome::failure(
                    id,
                    Error::Timeout {
                        provider: id,
                        seconds: self.provider_timeout.as_secs(),
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::FakeProvider;
    use crate::search::compare::FailureKind;
    use crate::search::offer::fixtures::offer;

    fn query() -> TripQuery {
        TripQuery::builder("JFK", "LHR", "2025-06-10").build().unwrap()
    }

    fn service(a: Arc<FakeProvider>, b: Arc<FakeProvider>, limit: Duration) -> FlightSearchService {
        let providers: Vec<Arc<dyn FlightProvider>> = vec![a, b];
        FlightSearchService::new(providers, limit)
    }

    #[tokio::test]
    async fn test_dual_source_comparison() {
        let a = Arc::new(FakeProvider::with_offers(
            ProviderId::SkyScrapper,
            vec![offer(ProviderId::SkyScrapper, 450.0, 420)],
        ));
        let b = Arc::new(FakeProvider::with_offers(
            ProviderId::GoogleFlights,
            vec![offer(ProviderId::GoogleFlights, 420.0, 450)],
        ));

        let result = service(a.clone(), b.clone(), Duration::from_secs(5))
            .search(&query())
            .await
            .unwrap();

        let providers: Vec<ProviderId> = result.offers.iter().map(|o| o.provider).collect();
        assert_eq!(providers, vec![ProviderId::GoogleFlights, ProviderId::SkyScrapper]);
        assert_eq!(result.offers[0].price.amount, 420.0);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_single_source() {
        let a = Arc::new(
            FakeProvider::with_offers(
                ProviderId::SkyScrapper,
                vec![offer(ProviderId::SkyScrapper, 100.0, 420)],
            )
            .delayed(Duration::from_secs(5)),
        );
        let b_offer = offer(ProviderId::GoogleFlights, 420.0, 450);
        let b = Arc::new(FakeProvider::with_offers(ProviderId::GoogleFlights, vec![b_offer.clone()]));

        let result = service(a, b, Duration::from_millis(50))
            .search(&query())
            .await
            .unwrap();

        assert_eq!(result.offers, vec![b_offer]);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].provider, ProviderId::SkyScrapper);
        assert_eq!(result.failures[0].kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_branches_run_concurrently() {
        let a = Arc::new(
            FakeProvider::with_offers(ProviderId::SkyScrapper, vec![offer(ProviderId::SkyScrapper, 1.0, 1)])
                .delayed(Duration::from_millis(500)),
        );
        let b = Arc::new(
            FakeProvider::with_offers(ProviderId::GoogleFlights, vec![offer(ProviderId::GoogleFlights, 2.0, 1)])
                .delayed(Duration::from_millis(500)),
        );

        let started = std::time::Instant::now();
        let result = service(a, b, Duration::from_secs(5)).search(&query()).await.unwrap();

        assert_eq!(result.offers.len(), 2);
        assert!(started.elapsed() < Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_both_fail_is_no_results() {
        let a = Arc::new(FakeProvider::failing(ProviderId::SkyScrapper, |provider| {
            Error::Authentication {
                provider,
                message: "bad key".to_string(),
            }
        }));
        let b = Arc::new(FakeProvider::failing(ProviderId::GoogleFlights, |provider| {
            Error::upstream(provider, "HTTP 500")
        }));

        let err = service(a, b, Duration::from_secs(5))
            .search(&query())
            .await
            .unwrap_err();

        match err {
            Error::NoResults { failures } => {
                let kinds: Vec<FailureKind> = failures.iter().map(|f| f.kind).collect();
                assert_eq!(kinds, vec![FailureKind::Authentication, FailureKind::Upstream]);
            }
            other => panic!("expected NoResults, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_single_provider() {
        let a = Arc::new(FakeProvider::with_offers(
            ProviderId::SkyScrapper,
            vec![offer(ProviderId::SkyScrapper, 450.0, 420)],
        ));
        let b = Arc::new(FakeProvider::with_offers(
            ProviderId::GoogleFlights,
            vec![offer(ProviderId::GoogleFlights, 420.0, 450)],
        ));

        let result = service(a.clone(), b.clone(), Duration::from_secs(5))
            .search_provider(ProviderId::SkyScrapper, &query())
            .await
            .unwrap();

        assert_eq!(result.offers.len(), 1);
        assert_eq!(result.sources.len(), 1);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_provider() {
        let service = FlightSearchService::new(vec![], Duration::from_secs(1));
        let err = service
            .search_provider(ProviderId::GoogleFlights, &query())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
