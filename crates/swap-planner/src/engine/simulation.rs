//! Route simulation against venues.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use alloy_primitives::U256;
use tracing::{debug, warn};

use crate::config::PlannerConfig;
use crate::data_management::cache::{CacheMetrics, QuoteCache, QuoteCacheKey};
use crate::types::{CandidateRoute, Token, VenueId, NATIVE_TOKEN};
use crate::venue::Venue;

/// Per-call view of the venues: bounded, cached and time-limited queries.
pub struct PlanningContext<'a> {
    venues: &'a [Arc<dyn Venue>],
    cache: Mutex<QuoteCache>,
    timeout: Duration,
    width: usize,
}

impl<'a> PlanningContext<'a> {
    pub fn new(venues: &'a [Arc<dyn Venue>], config: &PlannerConfig) -> Self {
        Self {
            venues,
            cache: Mutex::new(QuoteCache::new(config.quote_cache_capacity)),
            timeout: config.query_timeout(),
            width: config.max_concurrent_queries.max(1),
        }
    }

    pub fn venues(&self) -> &'a [Arc<dyn Venue>] {
        self.venues
    }

    pub fn venue(&self, id: VenueId) -> Option<&'a Arc<dyn Venue>> {
        self.venues.iter().find(|venue| venue.id() == id)
    }

    /// Fan-out width for concurrent queries.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.lock_cache().metrics()
    }

    fn lock_cache(&self) -> MutexGuard<'_, QuoteCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Venue output for `amount_in` along `path`. Failures and timeouts read as zero.
    pub async fn quote(&self, venue: &dyn Venue, amount_in: U256, path: &[Token]) -> U256 {
        if amount_in.is_zero() {
            return U256::ZERO;
        }
        let key = QuoteCacheKey { venue: venue.id(), amount_in, path: path.to_vec() };
        let cached = self.lock_cache().get(&key);
        if let Some(cached) = cached {
            return cached;
        }

        let amount_out = match tokio::time::timeout(self.timeout, venue.amount_out(amount_in, path)).await {
            Ok(Ok(amount_out)) => amount_out,
            Ok(Err(e)) => {
                debug!(venue = %key.venue, ?path, error = %e, "Venue quote failed");
                U256::ZERO
            }
            Err(_) => {
                warn!(venue = %key.venue, ?path, timeout = ?self.timeout, "Venue quote timed out");
                U256::ZERO
            }
        };
        self.lock_cache().insert(key, amount_out);
        amount_out
    }

    /// Bridge tokens a venue offers, without the native sentinel. Failures read as empty.
    pub async fn pool_tokens(&self, venue: &dyn Venue) -> Vec<Token> {
        let id = venue.id();
        let cached = self.lock_cache().get_pool_tokens(id);
        if let Some(cached) = cached {
            return cached;
        }
        let tokens = match tokio::time::timeout(self.timeout, venue.common_pool_tokens()).await {
            Ok(Ok(tokens)) => tokens.into_iter().filter(|token| *token != NATIVE_TOKEN).collect(),
            Ok(Err(e)) => {
                warn!(venue = %id, error = %e, "Could not list common pool tokens");
                Vec::new()
            }
            Err(_) => {
                warn!(venue = %id, timeout = ?self.timeout, "Listing common pool tokens timed out");
                Vec::new()
            }
        };
        self.lock_cache().insert_pool_tokens(id, tokens.clone());
        tokens
    }
}

/// Chains every leg of `route`, feeding each leg's output into the next.
/// Returns zero as soon as a leg yields nothing.
pub async fn simulate_route(ctx: &PlanningContext<'_>, route: &CandidateRoute, amount_in: U256) -> U256 {
    let mut current_amount = amount_in;
    for (venue_id, path) in route.legs() {
        let Some(venue) = ctx.venue(*venue_id) else {
            warn!(venue = %venue_id, kind = %route.kind, "Route references an unknown venue");
            return U256::ZERO;
        };
        current_amount = ctx.quote(venue.as_ref(), current_amount, path).await;
        if current_amount.is_zero() {
            return U256::ZERO;
        }
    }
    current_amount
}
