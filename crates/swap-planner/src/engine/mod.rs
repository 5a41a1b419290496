pub mod allocation;
pub mod connectors;
pub mod converter;
pub mod fee_cover;
pub mod routing;
pub mod simulation;

use std::sync::Arc;

use alloy_primitives::U256;
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::config::{PlannerConfig, MAX_PROTOCOL_FEE_BPS};
use crate::oracle::PriceOracle;
use crate::plan::{InputAsset, OutputTarget, Preview, SwapPlan};
use crate::types::{Desired, PlannerError, Provided, Result, SwapPoint, Token, NATIVE_TOKEN};
use crate::venue::Venue;
use allocation::{allocate, pair_routes};
use connectors::Connectors;
use converter::{mul_div, PriceBook};
use simulation::PlanningContext;

/// Ratio and floor of a desired output after merging duplicates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputSpec {
    pub ratio: U256,
    pub min_amount_out: U256,
}

/// Plans conversions of one asset basket into another over a set of venues.
///
/// The oracle and venues are read-only; every call builds its own quote cache
/// and state, so one planner can serve concurrent calls.
pub struct SwapPlanner {
    oracle: Arc<dyn PriceOracle>,
    venues: Vec<Arc<dyn Venue>>,
    config: PlannerConfig,
}

impl SwapPlanner {
    pub fn new(oracle: Arc<dyn PriceOracle>, venues: Vec<Arc<dyn Venue>>, config: PlannerConfig) -> Self {
        Self { oracle, venues, config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn venues(&self) -> &[Arc<dyn Venue>] {
        &self.venues
    }

    /// Computes the ordered list of swaps converting `provided` into `desired`.
    pub async fn plan_swaps(&self, provided: &Provided, desired: &Desired) -> Result<SwapPlan> {
        let inputs = self.normalize_provided(provided)?;
        let outputs = self.normalize_desired(desired)?;
        let book = self.price_book(inputs.keys().chain(outputs.keys()).copied()).await?;
        let inputs = self.priced_inputs(&book, &inputs)?;
        self.plan_priced(&book, &inputs, &outputs).await
    }

    /// Expected amount and value of each desired output if `plan` is executed
    /// against `provided`. Entries follow `desired` order.
    pub async fn preview_value(&self, provided: &Provided, desired: &Desired, plan: &SwapPlan) -> Result<Preview> {
        desired.validate()?;
        let supply = self.normalize_provided(provided)?;
        let delivered = plan.scale_to(&supply)?.delivered_amounts();

        let route_tokens: Vec<Token> = desired.output_erc20s.iter().map(|token| self.route_token(*token)).collect();
        let amounts = split_delivered(&delivered, &route_tokens, &desired.ratios)?;
        let book = self.price_book(route_tokens.iter().copied()).await?;
        let values = route_tokens
            .iter()
            .zip(&amounts)
            .map(|(token, amount)| book.to_value(*token, *amount))
            .collect::<Result<Vec<_>>>()?;
        Ok(Preview { tokens: desired.output_erc20s.clone(), amounts, values })
    }

    /// Numeraire value of `amount` of `token`.
    pub async fn value_of(&self, token: Token, amount: U256) -> Result<U256> {
        let token = self.route_token(token);
        self.price_book([token]).await?.to_value(token, amount)
    }

    /// Amount of `token` worth `value` numeraire units.
    pub async fn amount_for(&self, token: Token, value: U256) -> Result<U256> {
        let token = self.route_token(token);
        self.price_book([token]).await?.to_amount(token, value)
    }

    pub async fn recommend_connectors(&self, token_in: Token, token_out: Token, amount: U256) -> Connectors {
        let ctx = PlanningContext::new(&self.venues, &self.config);
        connectors::recommend_connectors(&ctx, self.route_token(token_in), self.route_token(token_out), amount).await
    }

    /// Best single route for the whole of `amount_in`.
    pub async fn find_best_route(&self, token_in: Token, token_out: Token, amount_in: U256) -> Result<SwapPoint> {
        let (token_in, token_out) = (self.route_token(token_in), self.route_token(token_out));
        let book = self.price_book([token_in, token_out]).await?;
        let value_in = book.to_value(token_in, amount_in)?;
        if value_in.is_zero() {
            return Err(PlannerError::EmptyBasket("input amount has no value"));
        }
        let ctx = PlanningContext::new(&self.venues, &self.config);
        routing::find_best_route(&ctx, &book, token_in, token_out, amount_in, value_in).await
    }

    /// The token a venue should see for `token`.
    pub(crate) fn route_token(&self, token: Token) -> Token {
        match self.config.wrapped_native_token {
            Some(wrapped) if token == NATIVE_TOKEN => wrapped,
            _ => token,
        }
    }

    /// Merges duplicates, drops zero amounts and takes the protocol fee.
    pub(crate) fn normalize_provided(&self, provided: &Provided) -> Result<IndexMap<Token, U256>> {
        provided.validate()?;
        if provided.tokens.is_empty() {
            return Err(PlannerError::EmptyBasket("no provided assets"));
        }

        let mut merged: IndexMap<Token, U256> = IndexMap::new();
        for (token, amount) in provided.iter().filter(|(_, amount)| !amount.is_zero()) {
            let entry = merged.entry(self.route_token(token)).or_insert(U256::ZERO);
            *entry = entry.checked_add(amount).ok_or(PlannerError::Overflow("provided amount"))?;
        }

        if self.config.protocol_fee_bps > MAX_PROTOCOL_FEE_BPS {
            return Err(PlannerError::Config(format!(
                "protocol_fee_bps {} exceeds {}",
                self.config.protocol_fee_bps, MAX_PROTOCOL_FEE_BPS
            )));
        }
        let bps = U256::from(self.config.protocol_fee_bps);
        let mut net = IndexMap::with_capacity(merged.len());
        for (token, amount) in merged {
            let fee = mul_div(amount, bps, U256::from(MAX_PROTOCOL_FEE_BPS), "protocol fee")?;
            let amount = amount
                .checked_sub(fee)
                .ok_or_else(|| PlannerError::Config(format!("protocol fee exceeds {} amount", token)))?;
            if !amount.is_zero() {
                net.insert(token, amount);
            }
        }
        if net.is_empty() {
            return Err(PlannerError::EmptyBasket("provided amounts are all zero"));
        }
        Ok(net)
    }

    /// Merges duplicate outputs by summing ratios and floors.
    pub(crate) fn normalize_desired(&self, desired: &Desired) -> Result<IndexMap<Token, OutputSpec>> {
        desired.validate()?;
        if desired.output_erc20s.is_empty() {
            return Err(PlannerError::EmptyBasket("no desired outputs"));
        }

        let mut merged: IndexMap<Token, OutputSpec> = IndexMap::new();
        for (token, ratio, min_amount_out) in desired.iter() {
            let entry = merged.entry(self.route_token(token)).or_default();
            entry.ratio = entry.ratio.checked_add(ratio).ok_or(PlannerError::Overflow("desired ratio"))?;
            entry.min_amount_out =
                entry.min_amount_out.checked_add(min_amount_out).ok_or(PlannerError::Overflow("min amount out"))?;
        }
        Ok(merged)
    }

    pub(crate) async fn price_book(&self, tokens: impl IntoIterator<Item = Token>) -> Result<PriceBook> {
        PriceBook::fetch(
            self.oracle.as_ref(),
            self.config.numeraire_token,
            tokens,
            self.config.max_concurrent_queries,
            self.config.query_timeout(),
        )
        .await
    }

    /// Values each input; inputs worth nothing at oracle precision are dropped.
    pub(crate) fn priced_inputs(&self, book: &PriceBook, inputs: &IndexMap<Token, U256>) -> Result<Vec<InputAsset>> {
        let mut priced = Vec::with_capacity(inputs.len());
        for (token, amount) in inputs {
            let value = book.to_value(*token, *amount)?;
            if value.is_zero() {
                warn!(%token, %amount, "Dropping input worth zero numeraire units");
                continue;
            }
            priced.push(InputAsset { token: *token, amount: *amount, value });
        }
        if priced.is_empty() {
            return Err(PlannerError::EmptyBasket("provided basket has no value"));
        }
        Ok(priced)
    }

    pub(crate) async fn plan_priced(
        &self,
        book: &PriceBook,
        inputs: &[InputAsset],
        outputs: &IndexMap<Token, OutputSpec>,
    ) -> Result<SwapPlan> {
        let total_value = inputs
            .iter()
            .try_fold(U256::ZERO, |acc, input| acc.checked_add(input.value))
            .ok_or(PlannerError::Overflow("total input value"))?;
        let total_ratio = outputs
            .values()
            .try_fold(U256::ZERO, |acc, spec| acc.checked_add(spec.ratio))
            .ok_or(PlannerError::Overflow("total ratio"))?;
        if total_ratio.is_zero() {
            return Err(PlannerError::EmptyBasket("desired ratios sum to zero"));
        }

        let mut targets = Vec::with_capacity(outputs.len());
        for (token, spec) in outputs {
            targets.push(OutputTarget {
                token: *token,
                ratio: spec.ratio,
                min_amount_out: spec.min_amount_out,
                target_value: mul_div(total_value, spec.ratio, total_ratio, "target value")?,
                floor_value: book.to_value(*token, spec.min_amount_out)?,
            });
        }

        info!(
            inputs = inputs.len(),
            outputs = targets.len(),
            venues = self.venues.len(),
            %total_value,
            "Planning swaps"
        );
        let ctx = PlanningContext::new(&self.venues, &self.config);
        let routes = pair_routes(&ctx, book, inputs, &targets).await?;
        let swaps = allocate(routes, inputs, &targets)?;

        let metrics = ctx.metrics();
        info!(
            swaps = swaps.len(),
            quote_hits = metrics.quote_hits,
            quote_misses = metrics.quote_misses,
            "Swap plan ready"
        );
        Ok(SwapPlan { swaps, inputs: inputs.to_vec(), outputs: targets })
    }
}

/// Shares each token's delivered amount among the desired entries routed to it,
/// by ratio. The last entry of a token takes the rounding remainder.
fn split_delivered(delivered: &IndexMap<Token, U256>, tokens: &[Token], ratios: &[U256]) -> Result<Vec<U256>> {
    let mut ratio_sums: IndexMap<Token, U256> = IndexMap::new();
    let mut last_entry: IndexMap<Token, usize> = IndexMap::new();
    for (index, (token, ratio)) in tokens.iter().zip(ratios).enumerate() {
        let sum = ratio_sums.entry(*token).or_insert(U256::ZERO);
        *sum = sum.checked_add(*ratio).ok_or(PlannerError::Overflow("desired ratio"))?;
        last_entry.insert(*token, index);
    }

    let mut remaining = delivered.clone();
    let mut amounts = Vec::with_capacity(tokens.len());
    for (index, (token, ratio)) in tokens.iter().zip(ratios).enumerate() {
        let total = delivered.get(token).copied().unwrap_or(U256::ZERO);
        let left = remaining.get(token).copied().unwrap_or(U256::ZERO);
        let amount = if last_entry.get(token) == Some(&index) {
            left
        } else {
            match ratio_sums.get(token) {
                Some(sum) if !sum.is_zero() => mul_div(total, *ratio, *sum, "preview split")?.min(left),
                _ => U256::ZERO,
            }
        };
        if let Some(entry) = remaining.get_mut(token) {
            *entry -= amount;
        }
        amounts.push(amount);
    }
    Ok(amounts)
}
