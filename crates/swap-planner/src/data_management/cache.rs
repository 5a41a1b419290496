//! Caching for venue quotes within one planning call.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy_primitives::U256;
use lru::LruCache;

use crate::types::{Token, VenueId};

/// Cache key for a venue quote: (venue, amount in, path)
#[derive(Hash, PartialEq, Eq, Clone, Debug)]
pub struct QuoteCacheKey {
    pub venue: VenueId,
    pub amount_in: U256,
    pub path: Vec<Token>,
}

/// Cache key for a venue's common pool token list
#[derive(Hash, PartialEq, Eq, Clone, Copy, Debug)]
pub struct PoolTokensKey {
    pub venue: VenueId,
}

/// Snapshot of cache hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub quote_hits: usize,
    pub quote_misses: usize,
    pub pool_token_hits: usize,
    pub pool_token_misses: usize,
}

/// LRU of venue answers. Failed queries are stored as zero, so a failing
/// venue is asked once per distinct (amount, path).
pub struct QuoteCache {
    pub quotes: LruCache<QuoteCacheKey, U256>,
    pub pool_tokens: LruCache<PoolTokensKey, Vec<Token>>,
    pub quote_hits: AtomicUsize,
    pub quote_misses: AtomicUsize,
    pub pool_token_hits: AtomicUsize,
    pub pool_token_misses: AtomicUsize,
}

impl QuoteCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            quotes: LruCache::new(capacity),
            pool_tokens: LruCache::new(NonZeroUsize::new(64).unwrap_or(NonZeroUsize::MIN)),
            quote_hits: AtomicUsize::new(0),
            quote_misses: AtomicUsize::new(0),
            pool_token_hits: AtomicUsize::new(0),
            pool_token_misses: AtomicUsize::new(0),
        }
    }

    /// Get a cached quote if present.
    pub fn get(&mut self, key: &QuoteCacheKey) -> Option<U256> {
        if let Some(amount) = self.quotes.get(key) {
            self.quote_hits.fetch_add(1, Ordering::Relaxed);
            Some(*amount)
        } else {
            self.quote_misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Insert or update a cached quote.
    pub fn insert(&mut self, key: QuoteCacheKey, amount_out: U256) {
        self.quotes.put(key, amount_out);
    }

    pub fn get_pool_tokens(&mut self, venue: VenueId) -> Option<Vec<Token>> {
        if let Some(tokens) = self.pool_tokens.get(&PoolTokensKey { venue }) {
            self.pool_token_hits.fetch_add(1, Ordering::Relaxed);
            Some(tokens.clone())
        } else {
            self.pool_token_misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    pub fn insert_pool_tokens(&mut self, venue: VenueId, tokens: Vec<Token>) {
        self.pool_tokens.put(PoolTokensKey { venue }, tokens);
    }

    /// Retrieve current cache metrics snapshot.
    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            quote_hits: self.quote_hits.load(Ordering::Relaxed),
            quote_misses: self.quote_misses.load(Ordering::Relaxed),
            pool_token_hits: self.pool_token_hits.load(Ordering::Relaxed),
            pool_token_misses: self.pool_token_misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_logic() {
        let mut cache = QuoteCache::new(2);
        let key = |amount: u64| QuoteCacheKey {
            venue: VenueId::with_last_byte(9),
            amount_in: U256::from(amount),
            path: vec![Token::with_last_byte(1), Token::with_last_byte(2)],
        };
        assert!(cache.get(&key(1)).is_none());
        cache.insert(key(1), U256::from(10));
        cache.insert(key(2), U256::from(20));
        assert_eq!(cache.get(&key(1)), Some(U256::from(10)));
        // key(2) is now least recently used
        cache.insert(key(3), U256::from(30));
        assert!(cache.get(&key(2)).is_none());

        let metrics = cache.metrics();
        assert_eq!(metrics.quote_hits, 1);
        assert_eq!(metrics.quote_misses, 2);
    }

    #[test]
    fn pool_tokens_are_cached_per_venue() {
        let mut cache = QuoteCache::new(8);
        let venue = VenueId::with_last_byte(9);
        assert!(cache.get_pool_tokens(venue).is_none());
        cache.insert_pool_tokens(venue, vec![Token::with_last_byte(3)]);
        assert_eq!(cache.get_pool_tokens(venue), Some(vec![Token::with_last_byte(3)]));
        assert!(cache.get_pool_tokens(VenueId::with_last_byte(8)).is_none());
        assert_eq!(cache.metrics().pool_token_hits, 1);
    }
}
