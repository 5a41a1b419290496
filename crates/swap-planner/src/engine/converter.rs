//! Numeraire valuation of basket assets.

use std::collections::HashMap;
use std::time::Duration;

use alloy_primitives::U256;
use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::oracle::{pow10, PriceOracle};
use crate::types::{PlannerError, QueryError, Result, Token};

/// Oracle answer for one asset, in numeraire raw units per whole token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetPrice {
    pub price: U256,
    pub decimals: u8,
}

/// Prices of every asset touched by a planning call, fetched once up front.
#[derive(Debug, Clone)]
pub struct PriceBook {
    numeraire: Token,
    prices: HashMap<Token, AssetPrice>,
}

impl PriceBook {
    /// Queries price and decimals for each token. Any failure, timeout or zero
    /// price is fatal for the call.
    pub async fn fetch(
        oracle: &dyn PriceOracle,
        numeraire: Token,
        tokens: impl IntoIterator<Item = Token>,
        width: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let mut unique: Vec<Token> = Vec::new();
        for token in tokens {
            if !unique.contains(&token) {
                unique.push(token);
            }
        }

        let fetched: Vec<Result<(Token, AssetPrice)>> = stream::iter(unique)
            .map(|token| async move {
                let query = async {
                    let price = oracle.price(token, numeraire).await?;
                    let decimals = oracle.decimals(token).await?;
                    Ok::<_, QueryError>(AssetPrice { price, decimals })
                };
                let quoted = match tokio::time::timeout(timeout, query).await {
                    Ok(quoted) => quoted,
                    Err(_) => Err(QueryError::Timeout(timeout)),
                };
                match quoted {
                    Ok(asset) if asset.price.is_zero() => {
                        Err(PlannerError::UnpriceableAsset { token, reason: "oracle returned zero price".to_string() })
                    }
                    Ok(asset) => Ok((token, asset)),
                    Err(e) => Err(PlannerError::UnpriceableAsset { token, reason: e.to_string() }),
                }
            })
            .buffered(width.max(1))
            .collect()
            .await;

        let prices = fetched.into_iter().collect::<Result<HashMap<_, _>>>()?;
        debug!(assets = prices.len(), "Fetched price book");
        Ok(Self { numeraire, prices })
    }

    /// Builds a book from known prices.
    pub fn from_prices(numeraire: Token, prices: impl IntoIterator<Item = (Token, AssetPrice)>) -> Self {
        Self { numeraire, prices: prices.into_iter().collect() }
    }

    pub fn numeraire(&self) -> Token {
        self.numeraire
    }

    pub fn get(&self, token: Token) -> Result<AssetPrice> {
        self.prices.get(&token).copied().ok_or_else(|| PlannerError::UnpriceableAsset {
            token,
            reason: "not in price book".to_string(),
        })
    }

    pub fn decimals(&self, token: Token) -> Result<u8> {
        Ok(self.get(token)?.decimals)
    }

    /// `price * amount / 10^decimals`
    pub fn to_value(&self, token: Token, amount: U256) -> Result<U256> {
        let asset = self.get(token)?;
        mul_div(asset.price, amount, pow10(asset.decimals), "to_value")
    }

    /// `value * 10^decimals / price`
    pub fn to_amount(&self, token: Token, value: U256) -> Result<U256> {
        let asset = self.get(token)?;
        mul_div(value, pow10(asset.decimals), asset.price, "to_amount")
    }
}

/// `a * b / denominator` with a checked 256-bit product.
pub fn mul_div(a: U256, b: U256, denominator: U256, what: &'static str) -> Result<U256> {
    if denominator.is_zero() {
        return Err(PlannerError::Overflow(what));
    }
    a.checked_mul(b).map(|product| product / denominator).ok_or(PlannerError::Overflow(what))
}
