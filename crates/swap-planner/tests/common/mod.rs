//! Shared fixtures: a flat-priced oracle and venues backed by lookup tables.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use swap_planner::{PlannerConfig, QueryError, StaticOracle, SwapPlanner, Token, Venue, VenueId, U256};

pub const NUMERAIRE: u8 = 200;
pub const ONE: u64 = 1_000_000_000_000_000_000;

pub fn token(n: u8) -> Token {
    Token::with_last_byte(n)
}

pub fn config() -> PlannerConfig {
    PlannerConfig::new(token(NUMERAIRE))
}

/// Every listed token has 18 decimals and is worth one numeraire unit per raw unit.
pub fn flat_oracle(tokens: &[Token]) -> StaticOracle {
    tokens
        .iter()
        .fold(StaticOracle::new(token(NUMERAIRE), 18), |oracle, t| oracle.with_token(*t, 18, U256::from(ONE)))
}

pub fn planner(tokens: &[Token], venues: Vec<Arc<dyn Venue>>, config: PlannerConfig) -> SwapPlanner {
    SwapPlanner::new(Arc::new(flat_oracle(tokens)), venues, config)
}

/// Venue quoting `amount * bps / 10_000` for each listed path; unlisted paths have no liquidity.
pub struct TableVenue {
    id: VenueId,
    rates: HashMap<Vec<Token>, u64>,
    pool_tokens: Vec<Token>,
    delay: Option<Duration>,
    path_delays: HashMap<Vec<Token>, Duration>,
    pub calls: AtomicUsize,
}

impl TableVenue {
    pub fn new(id: u8) -> Self {
        Self {
            id: VenueId::with_last_byte(id),
            rates: HashMap::new(),
            pool_tokens: Vec::new(),
            delay: None,
            path_delays: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_rate(mut self, path: &[Token], bps: u64) -> Self {
        self.rates.insert(path.to_vec(), bps);
        self
    }

    pub fn with_pool_tokens(mut self, tokens: &[Token]) -> Self {
        self.pool_tokens = tokens.to_vec();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay for one path only, overriding `with_delay`.
    pub fn with_path_delay(mut self, path: &[Token], delay: Duration) -> Self {
        self.path_delays.insert(path.to_vec(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn shared(self) -> Arc<dyn Venue> {
        Arc::new(self)
    }
}

#[async_trait]
impl Venue for TableVenue {
    fn id(&self) -> VenueId {
        self.id
    }

    async fn amount_out(&self, amount_in: U256, path: &[Token]) -> Result<U256, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.path_delays.get(path).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        match self.rates.get(path) {
            Some(bps) => Ok(amount_in * U256::from(*bps) / U256::from(10_000)),
            None => Err(QueryError::NoLiquidity {
                from: path.first().copied().unwrap_or_default(),
                to: path.last().copied().unwrap_or_default(),
            }),
        }
    }

    async fn common_pool_tokens(&self) -> Result<Vec<Token>, QueryError> {
        Ok(self.pool_tokens.clone())
    }
}
