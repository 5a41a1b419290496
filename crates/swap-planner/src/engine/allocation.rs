//! Greedy value allocation across all input x output pairs.

use alloy_primitives::U256;
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::engine::converter::{mul_div, PriceBook};
use crate::engine::routing::find_best_route;
use crate::engine::simulation::PlanningContext;
use crate::plan::{InputAsset, OutputTarget};
use crate::types::{Result, SwapPoint, NATIVE_TOKEN, SHARE_SCALE};

/// Finds the best route of every pair, probing with each input's full amount,
/// and returns them in discovery order (input-major).
pub async fn pair_routes(
    ctx: &PlanningContext<'_>,
    book: &PriceBook,
    inputs: &[InputAsset],
    outputs: &[OutputTarget],
) -> Result<Vec<SwapPoint>> {
    let pairs: Vec<(&InputAsset, &OutputTarget)> = inputs
        .iter()
        .flat_map(|input| outputs.iter().map(move |output| (input, output)))
        .filter(|(input, output)| {
            let native_self_pair = input.token == NATIVE_TOKEN && output.token == NATIVE_TOKEN;
            if native_self_pair {
                debug!("Skipping native self-pair");
            }
            !native_self_pair
        })
        .collect();

    let routes: Vec<Result<SwapPoint>> = stream::iter(pairs)
        .map(|(input, output)| find_best_route(ctx, book, input.token, output.token, input.amount, input.value))
        .buffered(ctx.width())
        .collect()
        .await;
    routes.into_iter().collect()
}

/// Walks `routes` by ascending slippage and assigns each input's value to
/// outputs until inputs run dry or targets are met. Accepted amounts are scaled
/// linearly from the probed route.
pub fn allocate(routes: Vec<SwapPoint>, inputs: &[InputAsset], outputs: &[OutputTarget]) -> Result<Vec<SwapPoint>> {
    let mut routes = routes;
    // Stable: equal slippage keeps discovery order.
    routes.sort_by(|a, b| a.slippage.cmp(&b.slippage));

    let mut consumed = vec![U256::ZERO; inputs.len()];
    let mut delivered = vec![U256::ZERO; outputs.len()];
    let mut accepted = Vec::new();

    for route in routes {
        let Some(i) = inputs.iter().position(|input| input.token == route.token_in) else {
            continue;
        };
        let Some(o) = outputs.iter().position(|output| output.token == route.token_out) else {
            continue;
        };
        if route.token_in == NATIVE_TOKEN && route.token_out == NATIVE_TOKEN {
            continue;
        }
        if route.amount_out.is_zero() || route.value_in.is_zero() || route.amount_in.is_zero() {
            debug!(token_in = %route.token_in, token_out = %route.token_out, "Pair has no usable route");
            continue;
        }
        if consumed[i] >= inputs[i].value || delivered[o] >= outputs[o].target_value {
            continue;
        }

        let more_in = inputs[i].value - consumed[i];
        let more_out = outputs[o].target_value - delivered[o];
        let value_in_adj = route.value_in.min(more_in).min(more_out);

        let amount_in_adj = mul_div(value_in_adj, route.amount_in, route.value_in, "amount_in_adj")?;
        let amount_out_adj = mul_div(value_in_adj, route.amount_out, route.value_in, "amount_out_adj")?;
        let value_out_adj = mul_div(value_in_adj, route.value_out, route.value_in, "value_out_adj")?;

        consumed[i] += value_in_adj;
        delivered[o] += value_in_adj;

        if amount_in_adj.is_zero() || value_in_adj.is_zero() {
            continue;
        }
        let share = mul_div(SHARE_SCALE, amount_in_adj, inputs[i].amount, "share")?;
        accepted.push(SwapPoint {
            amount_in: amount_in_adj,
            value_in: value_in_adj,
            amount_out: amount_out_adj,
            value_out: value_out_adj,
            share,
            ..route
        });
    }

    info!(accepted = accepted.len(), "Allocated swaps");
    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{slippage_of, RouteKind, Token, VenueId};

    fn token(n: u8) -> Token {
        Token::with_last_byte(n)
    }

    fn input(n: u8, amount: u64, value: u64) -> InputAsset {
        InputAsset { token: token(n), amount: U256::from(amount), value: U256::from(value) }
    }

    fn output(n: u8, target_value: u64) -> OutputTarget {
        OutputTarget {
            token: token(n),
            ratio: U256::from(1),
            min_amount_out: U256::ZERO,
            target_value: U256::from(target_value),
            floor_value: U256::ZERO,
        }
    }

    fn route(token_in: u8, token_out: u8, amount_in: u64, value_in: u64, amount_out: u64, value_out: u64) -> SwapPoint {
        SwapPoint {
            kind: RouteKind::Direct,
            token_in: token(token_in),
            token_out: token(token_out),
            amount_in: U256::from(amount_in),
            value_in: U256::from(value_in),
            amount_out: U256::from(amount_out),
            value_out: U256::from(value_out),
            slippage: slippage_of(U256::from(value_in), U256::from(value_out)).unwrap(),
            share: SHARE_SCALE,
            venues: vec![VenueId::with_last_byte(100)],
            paths: vec![vec![token(token_in), token(token_out)]],
        }
    }

    #[test]
    fn cheapest_route_is_filled_first() {
        let inputs = [input(1, 600, 600), input(2, 400, 400)];
        let outputs = [output(3, 1000)];
        let routes = vec![route(1, 3, 600, 600, 594, 594), route(2, 3, 400, 400, 380, 380)];
        let plan = allocate(routes, &inputs, &outputs).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].token_in, token(1));
        assert_eq!(plan[0].amount_in, U256::from(600));
        assert_eq!(plan[0].share, SHARE_SCALE);
        assert_eq!(plan[1].token_in, token(2));
        assert_eq!(plan[1].amount_in, U256::from(400));
    }

    #[test]
    fn clamps_to_remaining_target_and_scales_linearly() {
        // Output wants 500 of value; the first input route could move 1000.
        let inputs = [input(1, 2000, 1000)];
        let outputs = [output(2, 500), output(3, 500)];
        let routes = vec![route(1, 2, 2000, 1000, 990, 990), route(1, 3, 2000, 1000, 900, 900)];
        let plan = allocate(routes, &inputs, &outputs).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].amount_in, U256::from(1000));
        assert_eq!(plan[0].value_in, U256::from(500));
        assert_eq!(plan[0].amount_out, U256::from(495));
        assert_eq!(plan[0].share, U256::from(500_000_000_000_000_000u64));
        assert_eq!(plan[1].token_out, token(3));
        assert_eq!(plan[1].amount_in, U256::from(1000));
        let total: U256 = plan.iter().map(|p| p.amount_in).fold(U256::ZERO, |a, b| a + b);
        assert!(total <= U256::from(2000));
    }

    #[test]
    fn zero_output_and_exhausted_inputs_are_skipped() {
        let inputs = [input(1, 100, 100)];
        let outputs = [output(2, 100), output(3, 100)];
        let routes = vec![route(1, 2, 100, 100, 0, 0), route(1, 3, 100, 100, 100, 100), route(1, 2, 100, 100, 50, 50)];
        let plan = allocate(routes, &inputs, &outputs).unwrap();

        // the first route (zero slippage) drains the input; the zero-output route never counts
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].token_out, token(3));
    }

    #[test]
    fn equal_slippage_keeps_discovery_order() {
        let inputs = [input(1, 100, 100), input(2, 100, 100)];
        let outputs = [output(3, 100)];
        let routes = vec![route(2, 3, 100, 100, 99, 99), route(1, 3, 100, 100, 99, 99)];
        let plan = allocate(routes, &inputs, &outputs).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].token_in, token(2));
    }
}
