//! Bridge token recommendation.

use std::sync::Arc;

use alloy_primitives::U256;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::debug;

use crate::engine::simulation::PlanningContext;
use crate::types::{Token, VenueId};
use crate::venue::Venue;

/// A bridge token on a venue, scored by the round trip `token -> bridge -> token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Connector {
    pub venue: VenueId,
    pub bridge: Token,
    pub score: U256,
}

/// Best bridge for each side of a pair. `None` when no candidate scored above zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Connectors {
    pub best_in: Option<Connector>,
    pub best_out: Option<Connector>,
}

/// Scores every common pool token of every venue as a bridge for `token_in`
/// and for `token_out`, probing with `amount`.
pub async fn recommend_connectors(
    ctx: &PlanningContext<'_>,
    token_in: Token,
    token_out: Token,
    amount: U256,
) -> Connectors {
    let pool_tokens: Vec<Vec<Token>> = stream::iter(ctx.venues())
        .map(|venue| ctx.pool_tokens(venue.as_ref()))
        .buffered(ctx.width())
        .collect()
        .await;

    // Venue order, then pool-token order: this is the tie-break order.
    let probes: Vec<(&Arc<dyn Venue>, Token)> = ctx
        .venues()
        .iter()
        .zip(pool_tokens)
        .flat_map(|(venue, tokens)| tokens.into_iter().map(move |bridge| (venue, bridge)))
        .collect();

    let best_in = best_bridge(ctx, &probes, token_in, amount).await;
    let best_out = best_bridge(ctx, &probes, token_out, amount).await;
    debug!(
        %token_in,
        %token_out,
        probes = probes.len(),
        bridge_in = ?best_in.map(|c| c.bridge),
        bridge_out = ?best_out.map(|c| c.bridge),
        "Recommended connectors"
    );
    Connectors { best_in, best_out }
}

async fn best_bridge(
    ctx: &PlanningContext<'_>,
    probes: &[(&Arc<dyn Venue>, Token)],
    token: Token,
    amount: U256,
) -> Option<Connector> {
    let scores: Vec<U256> = stream::iter(probes)
        .map(|&(venue, bridge)| async move { ctx.quote(venue.as_ref(), amount, &[token, bridge, token]).await })
        .buffered(ctx.width())
        .collect()
        .await;

    let mut best: Option<Connector> = None;
    for ((venue, bridge), score) in probes.iter().zip(scores) {
        if score > best.map_or(U256::ZERO, |c| c.score) {
            best = Some(Connector { venue: venue.id(), bridge: *bridge, score });
        }
    }
    best
}
