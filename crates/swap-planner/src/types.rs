//! Common types, error handling, basket and plan data models.

use std::fmt;
use std::time::Duration;

use alloy_primitives::{Address, I256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token identifier. Amounts are raw integers in the token's own decimals.
pub type Token = Address;

/// Liquidity venue identifier (the swapper's address on-chain).
pub type VenueId = Address;

/// Sentinel for the chain's native asset. Never used as an intermediate hop.
pub const NATIVE_TOKEN: Token = Address::ZERO;

/// Fixed-point scale of a SwapPoint's `share` (1e18 = the whole input amount).
pub const SHARE_SCALE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Fixed-point scale of slippage (1e12 = 100 %).
pub const SLIPPAGE_SCALE: U256 = U256::from_limbs([1_000_000_000_000, 0, 0, 0]);

/// Error type for planning calls.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("Unpriceable asset {token}: {reason}")]
    UnpriceableAsset { token: Token, reason: String },

    #[error("Empty basket: {0}")]
    EmptyBasket(&'static str),

    #[error("Length mismatch: {field} has {found} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("Output {token} below minimum: need {required}, got {actual}")]
    BelowMinimum {
        token: Token,
        required: U256,
        actual: U256,
    },

    #[error("Fee value {fee_value} does not fit in position value {position_value}")]
    FeeExceedsValue { fee_value: U256, position_value: U256 },

    #[error("Gas estimation failed: {0}")]
    GasEstimation(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PlannerError>;

/// Failure of a single oracle or venue query.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error("no liquidity between {from} and {to}")]
    NoLiquidity { from: Token, to: Token },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("unknown token {0}")]
    UnknownToken(Token),

    #[error("{0}")]
    Backend(String),
}

/// Assets held by the caller, in the settlement engine's array shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provided {
    pub tokens: Vec<Token>,
    pub amounts: Vec<U256>,
}

impl Provided {
    pub fn new(tokens: Vec<Token>, amounts: Vec<U256>) -> Result<Self> {
        let provided = Self { tokens, amounts };
        provided.validate()?;
        Ok(provided)
    }

    pub fn single(token: Token, amount: U256) -> Self {
        Self { tokens: vec![token], amounts: vec![amount] }
    }

    pub fn validate(&self) -> Result<()> {
        if self.amounts.len() != self.tokens.len() {
            return Err(PlannerError::LengthMismatch {
                field: "amounts",
                expected: self.tokens.len(),
                found: self.amounts.len(),
            });
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Token, U256)> + '_ {
        self.tokens.iter().copied().zip(self.amounts.iter().copied())
    }
}

/// Assets wanted by the caller, in the settlement engine's array shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Desired {
    pub output_erc20s: Vec<Token>,
    pub ratios: Vec<U256>,
    pub min_amounts_out: Vec<U256>,
}

impl Desired {
    pub fn new(output_erc20s: Vec<Token>, ratios: Vec<U256>, min_amounts_out: Vec<U256>) -> Result<Self> {
        let desired = Self { output_erc20s, ratios, min_amounts_out };
        desired.validate()?;
        Ok(desired)
    }

    /// One output taking the whole input value, with no floor.
    pub fn single(token: Token) -> Self {
        Self {
            output_erc20s: vec![token],
            ratios: vec![U256::from(1)],
            min_amounts_out: vec![U256::ZERO],
        }
    }

    pub fn validate(&self) -> Result<()> {
        let expected = self.output_erc20s.len();
        if self.ratios.len() != expected {
            return Err(PlannerError::LengthMismatch { field: "ratios", expected, found: self.ratios.len() });
        }
        if self.min_amounts_out.len() != expected {
            return Err(PlannerError::LengthMismatch {
                field: "min_amounts_out",
                expected,
                found: self.min_amounts_out.len(),
            });
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Token, U256, U256)> + '_ {
        self.output_erc20s
            .iter()
            .zip(&self.ratios)
            .zip(&self.min_amounts_out)
            .map(|((token, ratio), min)| (*token, *ratio, *min))
    }
}

/// How a candidate route was constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// Input token is also the output token; nothing to swap.
    Identity,
    Direct,
    BridgedIn,
    BridgedOut,
    /// Both bridges on one venue: `[in, bridge_in, bridge_out, out]`.
    Merged,
    /// Bridges on different venues: `[in, bridge_in]` then `[bridge_in, bridge_out, out]`.
    TwoLeg,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RouteKind::Identity => "identity",
            RouteKind::Direct => "direct",
            RouteKind::BridgedIn => "bridged-in",
            RouteKind::BridgedOut => "bridged-out",
            RouteKind::Merged => "merged",
            RouteKind::TwoLeg => "two-leg",
        };
        f.write_str(name)
    }
}

/// One or more consecutive legs, each executed on one venue across one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRoute {
    pub kind: RouteKind,
    pub token_in: Token,
    pub token_out: Token,
    pub venues: Vec<VenueId>,
    pub paths: Vec<Vec<Token>>,
    pub amount_out: U256,
}

impl CandidateRoute {
    pub fn new(kind: RouteKind, token_in: Token, token_out: Token, legs: Vec<(VenueId, Vec<Token>)>) -> Self {
        let (venues, paths) = legs.into_iter().unzip();
        Self { kind, token_in, token_out, venues, paths, amount_out: U256::ZERO }
    }

    pub fn identity(token: Token) -> Self {
        Self::new(RouteKind::Identity, token, token, Vec::new())
    }

    pub fn legs(&self) -> impl Iterator<Item = (&VenueId, &[Token])> {
        self.venues.iter().zip(self.paths.iter().map(Vec::as_slice))
    }
}

/// A finalized, costed unit of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPoint {
    pub kind: RouteKind,
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: U256,
    /// Numeraire value of `amount_in`.
    pub value_in: U256,
    pub amount_out: U256,
    /// Numeraire value of `amount_out`.
    pub value_out: U256,
    /// `1e12 * (value_in - value_out) / value_in`; negative for favorable routes.
    pub slippage: I256,
    /// `amount_in` as a fraction of the supplied input amount, scaled by [`SHARE_SCALE`].
    pub share: U256,
    pub venues: Vec<VenueId>,
    pub paths: Vec<Vec<Token>>,
}

impl SwapPoint {
    pub fn is_identity(&self) -> bool {
        self.kind == RouteKind::Identity
    }

    pub fn legs(&self) -> impl Iterator<Item = (&VenueId, &[Token])> {
        self.venues.iter().zip(self.paths.iter().map(Vec::as_slice))
    }
}

/// Computes `1e12 * (value_in - value_out) / value_in` with sign.
pub fn slippage_of(value_in: U256, value_out: U256) -> Result<I256> {
    if value_in.is_zero() {
        return Err(PlannerError::Overflow("slippage of zero input value"));
    }
    let (diff, negative) = if value_in >= value_out {
        (value_in - value_out, false)
    } else {
        (value_out - value_in, true)
    };
    let magnitude = diff
        .checked_mul(SLIPPAGE_SCALE)
        .ok_or(PlannerError::Overflow("slippage"))?
        / value_in;
    let magnitude = I256::try_from(magnitude).map_err(|_| PlannerError::Overflow("slippage"))?;
    Ok(if negative { -magnitude } else { magnitude })
}
