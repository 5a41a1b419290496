//! Price oracle interface and an in-memory price table.

use std::collections::HashMap;

use alloy_primitives::U256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{QueryError, Token};

/// Spot prices and token metadata.
///
/// `price(a, b)` is the amount of `b`, in `b`'s raw units, worth one whole unit of `a`
/// (`10^decimals(a)` raw units). `price(a, b) * price(b, a)` should be ~1 within rounding.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn price(&self, token_a: Token, token_b: Token) -> Result<U256, QueryError>;

    async fn decimals(&self, token: Token) -> Result<u8, QueryError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenQuote {
    pub decimals: u8,
    /// Raw numeraire units per whole token.
    pub price: U256,
}

/// Oracle backed by a fixed table of numeraire prices.
#[derive(Debug, Clone)]
pub struct StaticOracle {
    numeraire: Token,
    tokens: HashMap<Token, TokenQuote>,
}

impl StaticOracle {
    pub fn new(numeraire: Token, numeraire_decimals: u8) -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(numeraire, TokenQuote { decimals: numeraire_decimals, price: pow10(numeraire_decimals) });
        Self { numeraire, tokens }
    }

    pub fn with_token(mut self, token: Token, decimals: u8, price: U256) -> Self {
        self.insert(token, decimals, price);
        self
    }

    pub fn insert(&mut self, token: Token, decimals: u8, price: U256) {
        if token != self.numeraire {
            self.tokens.insert(token, TokenQuote { decimals, price });
        }
    }

    pub fn numeraire(&self) -> Token {
        self.numeraire
    }

    fn quote(&self, token: Token) -> Result<&TokenQuote, QueryError> {
        self.tokens.get(&token).ok_or(QueryError::UnknownToken(token))
    }
}

#[async_trait]
impl PriceOracle for StaticOracle {
    async fn price(&self, token_a: Token, token_b: Token) -> Result<U256, QueryError> {
        let a = self.quote(token_a)?;
        let b = self.quote(token_b)?;
        if b.price.is_zero() {
            return Err(QueryError::Backend(format!("zero price for {}", token_b)));
        }
        a.price
            .checked_mul(pow10(b.decimals))
            .map(|scaled| scaled / b.price)
            .ok_or_else(|| QueryError::Backend(format!("price overflow for {}/{}", token_a, token_b)))
    }

    async fn decimals(&self, token: Token) -> Result<u8, QueryError> {
        Ok(self.quote(token)?.decimals)
    }
}

pub(crate) fn pow10(decimals: u8) -> U256 {
    U256::from(10).pow(U256::from(decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cross_prices_go_through_the_numeraire() {
        let weth = Token::with_last_byte(1);
        let usdc = Token::with_last_byte(2);
        // 1 USDC (6 decimals) = 0.0005 WETH
        let oracle = StaticOracle::new(weth, 18).with_token(usdc, 6, U256::from(500_000_000_000_000u64));

        assert_eq!(oracle.price(usdc, weth).await.unwrap(), U256::from(500_000_000_000_000u64));
        // 1 WETH = 2000 USDC
        assert_eq!(oracle.price(weth, usdc).await.unwrap(), U256::from(2_000_000_000u64));
        assert_eq!(oracle.decimals(usdc).await.unwrap(), 6);
        assert!(matches!(oracle.price(Token::with_last_byte(9), weth).await, Err(QueryError::UnknownToken(_))));
    }
}
