use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use alloy_primitives::U256;
use anyhow::{anyhow, bail, Context};
use serde::Deserialize;

use crate::engine::fee_cover::{LinearGasEstimator, Position};
use crate::oracle::StaticOracle;
use crate::types::{Desired, Provided, Token, VenueId};
use crate::venue::{ConstantProductVenue, Pool, Venue};

/// Token metadata and numeraire price from a scenario file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioToken {
    pub address: Token,
    pub symbol: String,
    pub decimals: u8,
    pub price: U256,
}

#[derive(Debug, Clone)]
pub struct ScenarioVenue {
    pub id: VenueId,
    pub fee_bps: u32,
    pub common_pool_tokens: Vec<Token>,
    pub pools: Vec<Pool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liquidation {
    pub position: Position,
    pub fee_asset: Token,
    pub estimated_fee: U256,
}

/// A self-contained planning setup: prices, pools and the baskets to convert.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub numeraire: Token,
    pub tokens: Vec<ScenarioToken>,
    pub venues: Vec<ScenarioVenue>,
    pub provided: Provided,
    pub desired: Desired,
    pub gas: LinearGasEstimator,
    pub liquidation: Option<Liquidation>,
}

#[derive(Deserialize)]
struct RawScenario {
    numeraire: String,
    tokens: Vec<RawToken>,
    #[serde(default)]
    venues: Vec<RawVenue>,
    provided: RawProvided,
    desired: RawDesired,
    gas: Option<RawGas>,
    liquidation: Option<RawLiquidation>,
}

#[derive(Deserialize)]
struct RawToken {
    address: String,
    #[serde(default)]
    symbol: Option<String>,
    decimals: u8,
    price: String,
}

#[derive(Deserialize)]
struct RawVenue {
    id: String,
    #[serde(default = "default_fee_bps")]
    fee_bps: u32,
    #[serde(default)]
    common_pool_tokens: Vec<String>,
    #[serde(default)]
    pools: Vec<RawPool>,
}

#[derive(Deserialize)]
struct RawPool {
    token0: String,
    token1: String,
    reserve0: String,
    reserve1: String,
}

#[derive(Deserialize)]
struct RawProvided {
    tokens: Vec<String>,
    amounts: Vec<String>,
}

#[derive(Deserialize)]
struct RawDesired {
    output_erc20s: Vec<String>,
    ratios: Vec<String>,
    #[serde(default)]
    min_amounts_out: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct RawGas {
    base_gas: Option<u64>,
    gas_per_leg: Option<u64>,
    gas_price_wei: Option<String>,
}

#[derive(Deserialize)]
struct RawLiquidation {
    target: String,
    fee_asset: String,
    estimated_fee: String,
}

fn default_fee_bps() -> u32 {
    30
}

/// Load a planning scenario from a JSON file.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> anyhow::Result<Scenario> {
    let text = std::fs::read_to_string(&path)
        .map_err(|e| anyhow!("unable to read scenario {}: {}", path.as_ref().display(), e))?;
    parse_scenario(&text).with_context(|| format!("invalid scenario {}", path.as_ref().display()))
}

pub fn parse_scenario(text: &str) -> anyhow::Result<Scenario> {
    let raw: RawScenario = serde_json::from_str(text)?;

    let numeraire = parse_address(&raw.numeraire)?;
    let tokens = raw
        .tokens
        .into_iter()
        .map(|t| -> anyhow::Result<ScenarioToken> {
            let address = parse_address(&t.address)?;
            Ok(ScenarioToken {
                symbol: t.symbol.unwrap_or_else(|| address.to_string()),
                address,
                decimals: t.decimals,
                price: parse_amount(&t.price)?,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    if !tokens.iter().any(|t| t.address == numeraire) {
        bail!("numeraire {} is not listed in tokens", numeraire);
    }

    let venues = raw
        .venues
        .into_iter()
        .map(|v| -> anyhow::Result<ScenarioVenue> {
            let pools = v
                .pools
                .into_iter()
                .map(|p| -> anyhow::Result<Pool> {
                    Ok(Pool {
                        token0: parse_address(&p.token0)?,
                        token1: parse_address(&p.token1)?,
                        reserve0: parse_amount(&p.reserve0)?,
                        reserve1: parse_amount(&p.reserve1)?,
                    })
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            Ok(ScenarioVenue {
                id: parse_address(&v.id)?,
                fee_bps: v.fee_bps,
                common_pool_tokens: parse_addresses(&v.common_pool_tokens)?,
                pools,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let provided = Provided::new(parse_addresses(&raw.provided.tokens)?, parse_amounts(&raw.provided.amounts)?)?;
    let output_erc20s = parse_addresses(&raw.desired.output_erc20s)?;
    let min_amounts_out = match raw.desired.min_amounts_out {
        Some(mins) => parse_amounts(&mins)?,
        None => vec![U256::ZERO; output_erc20s.len()],
    };
    let desired = Desired::new(output_erc20s, parse_amounts(&raw.desired.ratios)?, min_amounts_out)?;

    let mut gas = LinearGasEstimator::default();
    if let Some(raw_gas) = raw.gas {
        gas.base_gas = raw_gas.base_gas.unwrap_or(gas.base_gas);
        gas.gas_per_leg = raw_gas.gas_per_leg.unwrap_or(gas.gas_per_leg);
        if let Some(price) = raw_gas.gas_price_wei {
            gas.gas_price_wei = parse_amount(&price)?;
        }
    }

    let liquidation = raw
        .liquidation
        .map(|l| {
            Ok::<_, anyhow::Error>(Liquidation {
                position: Position { provided: provided.clone(), target: parse_address(&l.target)? },
                fee_asset: parse_address(&l.fee_asset)?,
                estimated_fee: parse_amount(&l.estimated_fee)?,
            })
        })
        .transpose()?;

    Ok(Scenario { numeraire, tokens, venues, provided, desired, gas, liquidation })
}

impl Scenario {
    pub fn token(&self, address: Token) -> Option<&ScenarioToken> {
        self.tokens.iter().find(|t| t.address == address)
    }

    /// Symbol and decimals for display; unknown tokens show their address and 18 decimals.
    pub fn symbol_decimals(&self, address: Token) -> (String, u8) {
        match self.token(address) {
            Some(t) => (t.symbol.clone(), t.decimals),
            None => (address.to_string(), 18),
        }
    }

    pub fn oracle(&self) -> anyhow::Result<StaticOracle> {
        let numeraire = self.token(self.numeraire).ok_or_else(|| anyhow!("numeraire is not listed in tokens"))?;
        let mut oracle = StaticOracle::new(numeraire.address, numeraire.decimals);
        for t in &self.tokens {
            oracle.insert(t.address, t.decimals, t.price);
        }
        Ok(oracle)
    }

    pub fn venues(&self) -> Vec<Arc<dyn Venue>> {
        self.venues
            .iter()
            .map(|v| {
                let mut venue = ConstantProductVenue::new(v.id, v.fee_bps).with_common_pool_tokens(v.common_pool_tokens.clone());
                for pool in &v.pools {
                    venue.add_pool(pool.clone());
                }
                Arc::new(venue) as Arc<dyn Venue>
            })
            .collect()
    }
}

fn parse_address(s: &str) -> anyhow::Result<Token> {
    Token::from_str(s.trim()).map_err(|e| anyhow!("invalid address {}: {}", s, e))
}

fn parse_addresses(list: &[String]) -> anyhow::Result<Vec<Token>> {
    list.iter().map(|s| parse_address(s)).collect()
}

fn parse_amount(s: &str) -> anyhow::Result<U256> {
    U256::from_str(s.trim()).map_err(|e| anyhow!("invalid amount {}: {}", s, e))
}

fn parse_amounts(list: &[String]) -> anyhow::Result<Vec<U256>> {
    list.iter().map(|s| parse_amount(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::PriceOracle;

    const SCENARIO: &str = r#"{
        "numeraire": "0x0000000000000000000000000000000000000001",
        "tokens": [
            { "address": "0x0000000000000000000000000000000000000001", "symbol": "WETH", "decimals": 18, "price": "1000000000000000000" },
            { "address": "0x0000000000000000000000000000000000000002", "symbol": "USDC", "decimals": 6, "price": "500000000000000" }
        ],
        "venues": [
            {
                "id": "0x0000000000000000000000000000000000000064",
                "common_pool_tokens": ["0x0000000000000000000000000000000000000001"],
                "pools": [
                    { "token0": "0x0000000000000000000000000000000000000001", "token1": "0x0000000000000000000000000000000000000002",
                      "reserve0": "1000000000000000000000", "reserve1": "2000000000000" }
                ]
            }
        ],
        "provided": { "tokens": ["0x0000000000000000000000000000000000000002"], "amounts": ["1000000000"] },
        "desired": { "output_erc20s": ["0x0000000000000000000000000000000000000001"], "ratios": ["1"] },
        "gas": { "gas_price_wei": "0x3b9aca00" }
    }"#;

    #[tokio::test]
    async fn builds_adapters_from_json() {
        let scenario = parse_scenario(SCENARIO).unwrap();
        assert_eq!(scenario.venues.len(), 1);
        assert_eq!(scenario.venues[0].fee_bps, 30);
        assert_eq!(scenario.desired.min_amounts_out, vec![U256::ZERO]);
        assert_eq!(scenario.gas.gas_price_wei, U256::from(1_000_000_000u64));
        assert_eq!(scenario.symbol_decimals(Token::with_last_byte(2)), ("USDC".to_string(), 6));
        assert!(scenario.liquidation.is_none());

        let oracle = scenario.oracle().unwrap();
        assert_eq!(oracle.decimals(Token::with_last_byte(2)).await.unwrap(), 6);
        let venues = scenario.venues();
        let out = venues[0]
            .amount_out(U256::from(1_000_000u64), &[Token::with_last_byte(2), Token::with_last_byte(1)])
            .await
            .unwrap();
        assert!(out > U256::ZERO);
    }

    #[test]
    fn rejects_unlisted_numeraire_and_bad_amounts() {
        let unlisted = SCENARIO.replace(
            r#""numeraire": "0x0000000000000000000000000000000000000001""#,
            r#""numeraire": "0x0000000000000000000000000000000000000009""#,
        );
        assert!(parse_scenario(&unlisted).is_err());

        let bad_amount = SCENARIO.replace(r#""amounts": ["1000000000"]"#, r#""amounts": ["lots"]"#);
        assert!(parse_scenario(&bad_amount).is_err());
    }
}
