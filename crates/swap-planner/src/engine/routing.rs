//! Best route for a single (token_in, token_out) pair.

use std::sync::Arc;

use alloy_primitives::{I256, U256};
use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::engine::connectors::{recommend_connectors, Connectors};
use crate::engine::converter::PriceBook;
use crate::engine::simulation::{simulate_route, PlanningContext};
use crate::types::{slippage_of, CandidateRoute, Result, RouteKind, SwapPoint, Token, SHARE_SCALE};
use crate::venue::Venue;

/// Builds the candidate set in evaluation order: one direct route per venue,
/// then bridged-in, bridged-out, and the merged or two-leg route.
pub fn candidate_routes(
    venues: &[Arc<dyn Venue>],
    token_in: Token,
    token_out: Token,
    connectors: &Connectors,
) -> Vec<CandidateRoute> {
    let mut routes: Vec<CandidateRoute> = venues
        .iter()
        .map(|venue| CandidateRoute::new(RouteKind::Direct, token_in, token_out, vec![(venue.id(), vec![token_in, token_out])]))
        .collect();

    if let Some(best_in) = connectors.best_in {
        routes.push(CandidateRoute::new(
            RouteKind::BridgedIn,
            token_in,
            token_out,
            vec![(best_in.venue, vec![token_in, best_in.bridge, token_out])],
        ));
    }
    if let Some(best_out) = connectors.best_out {
        routes.push(CandidateRoute::new(
            RouteKind::BridgedOut,
            token_in,
            token_out,
            vec![(best_out.venue, vec![token_in, best_out.bridge, token_out])],
        ));
    }
    if let (Some(best_in), Some(best_out)) = (connectors.best_in, connectors.best_out) {
        if best_in.venue == best_out.venue {
            routes.push(CandidateRoute::new(
                RouteKind::Merged,
                token_in,
                token_out,
                vec![(best_in.venue, vec![token_in, best_in.bridge, best_out.bridge, token_out])],
            ));
        } else {
            routes.push(CandidateRoute::new(
                RouteKind::TwoLeg,
                token_in,
                token_out,
                vec![
                    (best_in.venue, vec![token_in, best_in.bridge]),
                    (best_out.venue, vec![best_in.bridge, best_out.bridge, token_out]),
                ],
            ));
        }
    }
    routes
}

/// Evaluates every candidate for `amount_in` and keeps the one with the strictly
/// greatest output (first one wins ties). A pair nothing can fill comes back with
/// `amount_out == 0`.
pub async fn find_best_route(
    ctx: &PlanningContext<'_>,
    book: &PriceBook,
    token_in: Token,
    token_out: Token,
    amount_in: U256,
    value_in: U256,
) -> Result<SwapPoint> {
    if token_in == token_out {
        return Ok(identity_point(token_in, amount_in, value_in));
    }

    let connectors = recommend_connectors(ctx, token_in, token_out, amount_in).await;
    let mut candidates = candidate_routes(ctx.venues(), token_in, token_out, &connectors);

    let outputs: Vec<U256> = stream::iter(candidates.iter())
        .map(|route| simulate_route(ctx, route, amount_in))
        .buffered(ctx.width())
        .collect()
        .await;
    for (route, amount_out) in candidates.iter_mut().zip(&outputs) {
        route.amount_out = *amount_out;
    }

    let best = select_best(candidates)
        .unwrap_or_else(|| CandidateRoute::new(RouteKind::Direct, token_in, token_out, Vec::new()));

    let value_out = book.to_value(token_out, best.amount_out)?;
    let slippage = slippage_of(value_in, value_out)?;
    debug!(
        %token_in,
        %token_out,
        kind = %best.kind,
        amount_out = %best.amount_out,
        %slippage,
        "Selected pair route"
    );

    Ok(SwapPoint {
        kind: best.kind,
        token_in,
        token_out,
        amount_in,
        value_in,
        amount_out: best.amount_out,
        value_out,
        slippage,
        share: SHARE_SCALE,
        venues: best.venues,
        paths: best.paths,
    })
}

/// First candidate with the strictly greatest output; the first candidate when all are zero.
pub fn select_best(candidates: Vec<CandidateRoute>) -> Option<CandidateRoute> {
    let mut best: Option<CandidateRoute> = None;
    for candidate in candidates {
        match &best {
            Some(current) if candidate.amount_out <= current.amount_out => {}
            _ => best = Some(candidate),
        }
    }
    best
}

fn identity_point(token: Token, amount: U256, value: U256) -> SwapPoint {
    let route = CandidateRoute::identity(token);
    SwapPoint {
        kind: route.kind,
        token_in: token,
        token_out: token,
        amount_in: amount,
        value_in: value,
        amount_out: amount,
        value_out: value,
        slippage: I256::ZERO,
        share: SHARE_SCALE,
        venues: route.venues,
        paths: route.paths,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::connectors::Connector;
    use crate::types::VenueId;
    use crate::venue::ConstantProductVenue;

    fn token(n: u8) -> Token {
        Token::with_last_byte(n)
    }

    fn route_with(kind: RouteKind, amount_out: u64) -> CandidateRoute {
        let mut route = CandidateRoute::new(kind, token(1), token(2), Vec::new());
        route.amount_out = U256::from(amount_out);
        route
    }

    #[test]
    fn candidates_follow_connector_venues() {
        let venues: Vec<Arc<dyn Venue>> = vec![
            Arc::new(ConstantProductVenue::new(VenueId::with_last_byte(100), 30)) as Arc<dyn Venue>,
            Arc::new(ConstantProductVenue::new(VenueId::with_last_byte(101), 30)),
        ];
        let connector = |venue: u8, bridge: u8| Connector {
            venue: VenueId::with_last_byte(venue),
            bridge: token(bridge),
            score: U256::from(1),
        };

        let same_venue = Connectors { best_in: Some(connector(100, 10)), best_out: Some(connector(100, 11)) };
        let routes = candidate_routes(&venues, token(1), token(2), &same_venue);
        let kinds: Vec<RouteKind> = routes.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![RouteKind::Direct, RouteKind::Direct, RouteKind::BridgedIn, RouteKind::BridgedOut, RouteKind::Merged]
        );
        assert_eq!(routes[4].paths, vec![vec![token(1), token(10), token(11), token(2)]]);

        let split = Connectors { best_in: Some(connector(100, 10)), best_out: Some(connector(101, 11)) };
        let routes = candidate_routes(&venues, token(1), token(2), &split);
        let two_leg = routes.last().unwrap();
        assert_eq!(two_leg.kind, RouteKind::TwoLeg);
        assert_eq!(two_leg.venues, vec![VenueId::with_last_byte(100), VenueId::with_last_byte(101)]);
        assert_eq!(two_leg.paths, vec![vec![token(1), token(10)], vec![token(10), token(11), token(2)]]);

        let only_in = Connectors { best_in: Some(connector(101, 10)), best_out: None };
        let routes = candidate_routes(&venues, token(1), token(2), &only_in);
        assert_eq!(routes.len(), 3);
        assert_eq!(routes[2].kind, RouteKind::BridgedIn);
    }

    #[test]
    fn select_best_prefers_first_on_ties() {
        let best = select_best(vec![
            route_with(RouteKind::Direct, 5),
            route_with(RouteKind::BridgedIn, 9),
            route_with(RouteKind::Merged, 9),
        ])
        .unwrap();
        assert_eq!(best.kind, RouteKind::BridgedIn);

        let none_fill = select_best(vec![route_with(RouteKind::Direct, 0), route_with(RouteKind::Merged, 0)]).unwrap();
        assert_eq!(none_fill.kind, RouteKind::Direct);
        assert!(select_best(Vec::new()).is_none());
    }
}
