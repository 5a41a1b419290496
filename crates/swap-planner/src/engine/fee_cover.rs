//! Two-pass planning that reserves an execution fee out of a liquidated position.

use alloy_primitives::U256;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{OutputSpec, SwapPlanner};
use crate::plan::SwapPlan;
use crate::types::{PlannerError, Provided, QueryError, Result, Token, NATIVE_TOKEN};

const DEFAULT_BASE_GAS: u64 = 100_000;
const DEFAULT_GAS_PER_LEG: u64 = 150_000;
const DEFAULT_GAS_PRICE_WEI: u64 = 30_000_000_000; // 30 Gwei

/// Gas cost of executing a plan, in native units.
#[async_trait]
pub trait GasEstimator: Send + Sync {
    async fn estimate_gas(&self, plan: &SwapPlan) -> std::result::Result<u64, QueryError>;

    async fn gas_price(&self) -> std::result::Result<U256, QueryError>;
}

/// `base_gas + gas_per_leg * legs` at a fixed gas price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearGasEstimator {
    pub base_gas: u64,
    pub gas_per_leg: u64,
    pub gas_price_wei: U256,
}

impl Default for LinearGasEstimator {
    fn default() -> Self {
        Self {
            base_gas: DEFAULT_BASE_GAS,
            gas_per_leg: DEFAULT_GAS_PER_LEG,
            gas_price_wei: U256::from(DEFAULT_GAS_PRICE_WEI),
        }
    }
}

#[async_trait]
impl GasEstimator for LinearGasEstimator {
    async fn estimate_gas(&self, plan: &SwapPlan) -> std::result::Result<u64, QueryError> {
        let legs = plan.leg_count() as u64;
        self.gas_per_leg
            .checked_mul(legs)
            .and_then(|gas| gas.checked_add(self.base_gas))
            .ok_or_else(|| QueryError::Backend(format!("gas overflow for {} legs", legs)))
    }

    async fn gas_price(&self) -> std::result::Result<U256, QueryError> {
        Ok(self.gas_price_wei)
    }
}

/// Assets of a position being liquidated into `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub provided: Provided,
    pub target: Token,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCover {
    /// Plan sized with `actual_fee`.
    pub plan: SwapPlan,
    /// Fee in `fee_asset` units.
    pub actual_fee: U256,
    pub fee_value: U256,
    pub estimated_fee: U256,
    pub gas_used: u64,
    pub gas_price: U256,
}

impl SwapPlanner {
    /// Plans a liquidation that reserves an execution fee in `fee_asset`.
    ///
    /// A first plan sized with `estimated_fee` is only used to estimate gas; the
    /// returned plan reserves `gas * gas_price * gas_margin`, converted into
    /// `fee_asset` when it is not the native token.
    pub async fn cover_fee(
        &self,
        position: &Position,
        fee_asset: Token,
        estimated_fee: U256,
        gas: &dyn GasEstimator,
    ) -> Result<FeeCover> {
        let supply = self.normalize_provided(&position.provided)?;
        let target = self.route_token(position.target);
        let fee_token = self.route_token(fee_asset);
        let gas_token = self.route_token(NATIVE_TOKEN);

        let mut priced_tokens: Vec<Token> = supply.keys().copied().collect();
        priced_tokens.extend([target, fee_token]);
        if gas_token != fee_token {
            priced_tokens.push(gas_token);
        }
        let book = self.price_book(priced_tokens).await?;
        let inputs = self.priced_inputs(&book, &supply)?;
        let position_value = inputs
            .iter()
            .try_fold(U256::ZERO, |acc, input| acc.checked_add(input.value))
            .ok_or(PlannerError::Overflow("position value"))?;

        let estimated_value = book.to_value(fee_token, estimated_fee)?;
        let first = fee_outputs(target, fee_token, position_value, estimated_value)?;
        let draft = self.plan_priced(&book, &inputs, &first).await?;

        let gas_used = gas.estimate_gas(&draft).await.map_err(|e| PlannerError::GasEstimation(e.to_string()))?;
        let gas_price = gas.gas_price().await.map_err(|e| PlannerError::GasEstimation(e.to_string()))?;
        let native_fee = U256::from(gas_used)
            .checked_mul(gas_price)
            .and_then(|cost| cost.checked_mul(U256::from(self.config.gas_margin)))
            .ok_or(PlannerError::Overflow("execution fee"))?;
        let actual_fee = if gas_token == fee_token {
            native_fee
        } else {
            book.to_amount(fee_token, book.to_value(gas_token, native_fee)?)?
        };
        let fee_value = book.to_value(fee_token, actual_fee)?;
        info!(
            gas_used,
            %gas_price,
            %estimated_fee,
            %actual_fee,
            %fee_value,
            %position_value,
            "Sized execution fee"
        );

        let second = fee_outputs(target, fee_token, position_value, fee_value)?;
        let plan = self.plan_priced(&book, &inputs, &second).await?;
        Ok(FeeCover { plan, actual_fee, fee_value, estimated_fee, gas_used, gas_price })
    }
}

/// Target gets what the fee leaves of the position and the fee output gets the
/// fee itself, so the reserved fee value is never diluted by the target's share.
fn fee_outputs(
    target: Token,
    fee_token: Token,
    position_value: U256,
    fee_value: U256,
) -> Result<IndexMap<Token, OutputSpec>> {
    if fee_value >= position_value {
        return Err(PlannerError::FeeExceedsValue { fee_value, position_value });
    }
    let mut outputs: IndexMap<Token, OutputSpec> = IndexMap::new();
    outputs.entry(target).or_default().ratio += position_value - fee_value;
    outputs.entry(fee_token).or_default().ratio += fee_value;
    Ok(outputs)
}
