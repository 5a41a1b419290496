//! Liquidity venue interface and a constant-product reference venue.

use std::collections::HashMap;

use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{QueryError, Token, VenueId};

/// A liquidity source able to quote a swap along an ordered path of tokens.
#[async_trait]
pub trait Venue: Send + Sync {
    fn id(&self) -> VenueId;

    /// Amount of `path.last()` obtained for `amount_in` of `path[0]`.
    async fn amount_out(&self, amount_in: U256, path: &[Token]) -> Result<U256, QueryError>;

    /// Tokens worth trying as intermediate hops on this venue.
    async fn common_pool_tokens(&self) -> Result<Vec<Token>, QueryError>;
}

/// Reserves of one x*y=k pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub token0: Token,
    pub token1: Token,
    pub reserve0: U256,
    pub reserve1: U256,
}

/// Venue quoting like a V2 router's `getAmountsOut`: every hop reads the pair's
/// reserves as they are, without applying earlier hops of the same path.
#[derive(Debug, Clone)]
pub struct ConstantProductVenue {
    id: VenueId,
    fee_bps: u32,
    pools: HashMap<(Token, Token), (U256, U256)>,
    common_pool_tokens: Vec<Token>,
}

impl ConstantProductVenue {
    pub fn new(id: VenueId, fee_bps: u32) -> Self {
        Self { id, fee_bps: fee_bps.min(10_000), pools: HashMap::new(), common_pool_tokens: Vec::new() }
    }

    pub fn with_pool(mut self, pool: Pool) -> Self {
        self.add_pool(pool);
        self
    }

    pub fn with_common_pool_tokens(mut self, tokens: Vec<Token>) -> Self {
        self.common_pool_tokens = tokens;
        self
    }

    pub fn add_pool(&mut self, pool: Pool) {
        self.pools.insert((pool.token0, pool.token1), (pool.reserve0, pool.reserve1));
        self.pools.insert((pool.token1, pool.token0), (pool.reserve1, pool.reserve0));
    }

    fn hop(&self, amount_in: U256, from: Token, to: Token) -> Result<U256, QueryError> {
        let (reserve_in, reserve_out) = self
            .pools
            .get(&(from, to))
            .copied()
            .filter(|(r_in, r_out)| !r_in.is_zero() && !r_out.is_zero())
            .ok_or(QueryError::NoLiquidity { from, to })?;
        let overflow = || QueryError::Backend(format!("amount overflow on {} -> {}", from, to));
        let amount_in_with_fee = amount_in.checked_mul(U256::from(10_000 - self.fee_bps)).ok_or_else(overflow)?;
        let numerator = amount_in_with_fee.checked_mul(reserve_out).ok_or_else(overflow)?;
        let denominator = reserve_in
            .checked_mul(U256::from(10_000))
            .and_then(|r| r.checked_add(amount_in_with_fee))
            .ok_or_else(overflow)?;
        Ok(numerator / denominator)
    }
}

#[async_trait]
impl Venue for ConstantProductVenue {
    fn id(&self) -> VenueId {
        self.id
    }

    async fn amount_out(&self, amount_in: U256, path: &[Token]) -> Result<U256, QueryError> {
        if path.len() < 2 {
            return Err(QueryError::InvalidPath(format!("{} tokens", path.len())));
        }
        path.windows(2).try_fold(amount_in, |amount, hop| self.hop(amount, hop[0], hop[1]))
    }

    async fn common_pool_tokens(&self) -> Result<Vec<Token>, QueryError> {
        Ok(self.common_pool_tokens.clone())
    }
}
