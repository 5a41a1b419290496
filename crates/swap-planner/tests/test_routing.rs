//! Route selection over constant-product venues.

mod common;

use std::sync::Arc;

use common::{config, planner, token};
use swap_planner::types::RouteKind;
use swap_planner::{ConstantProductVenue, Pool, Token, Venue, VenueId, U256};

fn pool(a: Token, b: Token, reserve: u64) -> Pool {
    Pool { token0: a, token1: b, reserve0: U256::from(reserve), reserve1: U256::from(reserve) }
}

#[tokio::test]
async fn selected_route_beats_every_candidate() {
    let (a, b, x) = (token(1), token(2), token(10));
    let deep = Arc::new(
        ConstantProductVenue::new(VenueId::with_last_byte(100), 30)
            .with_pool(pool(a, b, 10_000))
            .with_pool(pool(a, x, 1_000_000))
            .with_pool(pool(x, b, 1_000_000))
            .with_common_pool_tokens(vec![x]),
    );
    let direct = Arc::new(ConstantProductVenue::new(VenueId::with_last_byte(101), 30).with_pool(pool(a, b, 100_000)));
    let venues: Vec<Arc<dyn Venue>> = vec![deep.clone() as Arc<dyn Venue>, direct.clone()];
    let planner = planner(&[a, b, x], venues, config());

    let amount = U256::from(1000);
    let best = planner.find_best_route(a, b, amount).await.unwrap();

    let alternatives = [
        deep.amount_out(amount, &[a, b]).await.unwrap(),
        direct.amount_out(amount, &[a, b]).await.unwrap(),
        deep.amount_out(amount, &[a, x, b]).await.unwrap(),
    ];
    assert_eq!(alternatives, [U256::from(906), U256::from(987), U256::from(992)]);
    assert!(alternatives.iter().all(|out| best.amount_out >= *out));
    assert_eq!(best.kind, RouteKind::BridgedIn);
    assert_eq!(best.amount_out, U256::from(992));
    assert_eq!(best.paths, vec![vec![a, x, b]]);
}

#[tokio::test]
async fn shared_venue_bridges_merge_into_one_path() {
    let (a, b, x, y) = (token(1), token(2), token(10), token(11));
    let venue = ConstantProductVenue::new(VenueId::with_last_byte(100), 30)
        .with_pool(pool(a, x, 1_000_000))
        .with_pool(pool(x, y, 1_000_000))
        .with_pool(pool(y, b, 1_000_000))
        .with_common_pool_tokens(vec![x, y]);
    let planner = planner(&[a, b, x, y], vec![Arc::new(venue) as Arc<dyn Venue>], config());

    let connectors = planner.recommend_connectors(a, b, U256::from(1000)).await;
    assert_eq!(connectors.best_in.map(|c| c.bridge), Some(x));
    assert_eq!(connectors.best_out.map(|c| c.bridge), Some(y));

    let best = planner.find_best_route(a, b, U256::from(1000)).await.unwrap();
    assert_eq!(best.kind, RouteKind::Merged);
    assert_eq!(best.venues, vec![VenueId::with_last_byte(100)]);
    assert_eq!(best.paths, vec![vec![a, x, y, b]]);
    assert_eq!(best.amount_out, U256::from(988));
}

#[tokio::test]
async fn bridges_on_different_venues_chain_two_legs() {
    let (a, b, x, y) = (token(1), token(2), token(10), token(11));
    let first = ConstantProductVenue::new(VenueId::with_last_byte(100), 30)
        .with_pool(pool(a, x, 1_000_000))
        .with_common_pool_tokens(vec![x]);
    let second = ConstantProductVenue::new(VenueId::with_last_byte(101), 30)
        .with_pool(pool(x, y, 1_000_000))
        .with_pool(pool(y, b, 1_000_000))
        .with_common_pool_tokens(vec![y]);
    let venues: Vec<Arc<dyn Venue>> = vec![Arc::new(first) as Arc<dyn Venue>, Arc::new(second)];
    let planner = planner(&[a, b, x, y], venues, config());

    let best = planner.find_best_route(a, b, U256::from(1000)).await.unwrap();
    assert_eq!(best.kind, RouteKind::TwoLeg);
    assert_eq!(best.venues, vec![VenueId::with_last_byte(100), VenueId::with_last_byte(101)]);
    assert_eq!(best.paths, vec![vec![a, x], vec![x, y, b]]);
    assert_eq!(best.amount_out, U256::from(988));
}

#[tokio::test]
async fn unreachable_pair_reports_zero_output() {
    let (a, b) = (token(1), token(2));
    let venue = ConstantProductVenue::new(VenueId::with_last_byte(100), 30);
    let planner = planner(&[a, b], vec![Arc::new(venue) as Arc<dyn Venue>], config());

    let best = planner.find_best_route(a, b, U256::from(1000)).await.unwrap();
    assert_eq!(best.amount_out, U256::ZERO);
    assert_eq!(best.kind, RouteKind::Direct);
}
