// Library entry point for swap-planner

pub mod config;
pub mod data_management;
pub mod engine;
pub mod oracle;
pub mod plan;
pub mod types;
pub mod utils;
pub mod venue;

pub use alloy_primitives::{Address, I256, U256};
pub use config::PlannerConfig;
pub use engine::fee_cover::{FeeCover, GasEstimator, LinearGasEstimator, Position};
pub use engine::SwapPlanner;
pub use oracle::{PriceOracle, StaticOracle};
pub use plan::{PlanWire, Preview, SwapPlan};
pub use types::{Desired, PlannerError, Provided, QueryError, SwapPoint, Token, VenueId, NATIVE_TOKEN};
pub use venue::{ConstantProductVenue, Pool, Venue};
