//! Planner output: the ordered swap plan, its wire form and value previews.

use alloy_primitives::U256;
use indexmap::IndexMap;
use itertools::{multiunzip, Itertools};
use serde::{Deserialize, Serialize};

use crate::engine::converter::mul_div;
use crate::types::{Desired, PlannerError, Result, SwapPoint, Token, VenueId, SHARE_SCALE};

/// An input asset after normalization, with its numeraire value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputAsset {
    pub token: Token,
    pub amount: U256,
    pub value: U256,
}

/// An output asset with the value it should receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputTarget {
    pub token: Token,
    pub ratio: U256,
    pub min_amount_out: U256,
    /// `total_input_value * ratio / total_ratio`
    pub target_value: U256,
    /// Value of `min_amount_out`; informational.
    pub floor_value: U256,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPlan {
    pub swaps: Vec<SwapPoint>,
    pub inputs: Vec<InputAsset>,
    pub outputs: Vec<OutputTarget>,
}

/// Settlement arrays, index-aligned and order-significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanWire {
    pub token_in: Vec<Token>,
    pub token_out: Vec<Token>,
    /// Shares of each input's supplied amount, scaled by 1e18.
    pub amount_in: Vec<U256>,
    pub venues: Vec<Vec<VenueId>>,
    pub paths: Vec<Vec<Vec<Token>>>,
}

impl SwapPlan {
    pub fn is_empty(&self) -> bool {
        self.swaps.is_empty()
    }

    pub fn total_input_value(&self) -> U256 {
        self.inputs.iter().fold(U256::ZERO, |acc, input| acc.saturating_add(input.value))
    }

    /// Number of venue legs across all swaps.
    pub fn leg_count(&self) -> usize {
        self.swaps.iter().map(|swap| swap.venues.len()).sum()
    }

    /// Sum of `amount_in` per input token, in plan order.
    pub fn consumed_amounts(&self) -> IndexMap<Token, U256> {
        let mut consumed = IndexMap::new();
        for swap in &self.swaps {
            let entry = consumed.entry(swap.token_in).or_insert(U256::ZERO);
            *entry = entry.saturating_add(swap.amount_in);
        }
        consumed
    }

    /// Sum of `amount_out` per output token, in plan order.
    pub fn delivered_amounts(&self) -> IndexMap<Token, U256> {
        let mut delivered = IndexMap::new();
        for swap in &self.swaps {
            let entry = delivered.entry(swap.token_out).or_insert(U256::ZERO);
            *entry = entry.saturating_add(swap.amount_out);
        }
        delivered
    }

    /// Re-derives absolute amounts from each swap's share for a different supply.
    /// Outputs and values scale with the input; tokens missing from `supply` drop out.
    pub fn scale_to(&self, supply: &IndexMap<Token, U256>) -> Result<SwapPlan> {
        let mut swaps = Vec::with_capacity(self.swaps.len());
        for swap in &self.swaps {
            let available = supply.get(&swap.token_in).copied().unwrap_or(U256::ZERO);
            let amount_in = mul_div(swap.share, available, SHARE_SCALE, "scale_to")?;
            if amount_in.is_zero() || swap.amount_in.is_zero() {
                continue;
            }
            swaps.push(SwapPoint {
                amount_out: mul_div(swap.amount_out, amount_in, swap.amount_in, "scale_to")?,
                value_in: mul_div(swap.value_in, amount_in, swap.amount_in, "scale_to")?,
                value_out: mul_div(swap.value_out, amount_in, swap.amount_in, "scale_to")?,
                amount_in,
                ..swap.clone()
            });
        }

        let mut inputs = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let amount = supply.get(&input.token).copied().unwrap_or(U256::ZERO);
            let value =
                if input.amount.is_zero() { U256::ZERO } else { mul_div(input.value, amount, input.amount, "scale_to")? };
            inputs.push(InputAsset { token: input.token, amount, value });
        }

        Ok(SwapPlan { swaps, inputs, outputs: self.outputs.clone() })
    }

    /// Settlement arrays for the venue swaps. Identity pass-throughs need no
    /// swap and are left out.
    pub fn to_wire(&self) -> PlanWire {
        let (token_in, token_out, amount_in, venues, paths): (Vec<_>, Vec<_>, Vec<_>, Vec<_>, Vec<_>) = multiunzip(
            self.swaps
                .iter()
                .filter(|swap| !swap.is_identity())
                .map(|swap| (swap.token_in, swap.token_out, swap.share, swap.venues.clone(), swap.paths.clone())),
        );
        PlanWire { token_in, token_out, amount_in, venues, paths }
    }

    /// Human-readable one-line summary per swap.
    pub fn describe(&self) -> Vec<String> {
        self.swaps
            .iter()
            .map(|swap| {
                let legs = swap
                    .legs()
                    .map(|(venue, path)| format!("{}: {}", venue, path.iter().join(" -> ")))
                    .join(" | ");
                format!("{} -> {} [{}] {}", swap.token_in, swap.token_out, swap.kind, legs)
            })
            .collect()
    }
}

/// Expected outputs of a plan, one entry per desired output in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub tokens: Vec<Token>,
    pub amounts: Vec<U256>,
    pub values: Vec<U256>,
}

impl Preview {
    /// Errors on the first output whose expected amount is below its `min_amount_out`.
    pub fn check_floors(&self, desired: &Desired) -> Result<()> {
        desired.validate()?;
        if desired.output_erc20s.len() != self.amounts.len() {
            return Err(PlannerError::LengthMismatch {
                field: "preview amounts",
                expected: desired.output_erc20s.len(),
                found: self.amounts.len(),
            });
        }
        for ((token, _, min_amount_out), actual) in desired.iter().zip(&self.amounts) {
            if *actual < min_amount_out {
                return Err(PlannerError::BelowMinimum { token, required: min_amount_out, actual: *actual });
            }
        }
        Ok(())
    }
}
