//! Configuration loading, env vars, CLI flags.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::types::{PlannerError, Result, Token};

#[cfg(feature = "cli")]
use clap::Args;

const DEFAULT_PROTOCOL_FEE_BPS: u32 = 0;
pub const MAX_PROTOCOL_FEE_BPS: u32 = 10_000;
const DEFAULT_GAS_MARGIN: u64 = 2;
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 16;
const DEFAULT_QUOTE_CACHE_CAPACITY: usize = 4_096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Token every asset is valued in.
    pub numeraire_token: Token,
    /// When set, the native sentinel is routed as this token.
    pub wrapped_native_token: Option<Token>,
    /// Settlement fee taken from every provided amount before swapping.
    pub protocol_fee_bps: u32,
    /// Multiplier applied to gas cost when sizing a liquidation fee.
    pub gas_margin: u64,
    pub query_timeout_ms: u64,
    pub max_concurrent_queries: usize,
    pub quote_cache_capacity: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub numeraire_token: Option<String>,
    pub wrapped_native_token: Option<String>,
    pub protocol_fee_bps: Option<u32>,
    pub gas_margin: Option<u64>,
    pub query_timeout_ms: Option<u64>,
    pub max_concurrent_queries: Option<usize>,
    pub quote_cache_capacity: Option<usize>,
}

#[cfg(feature = "cli")]
#[derive(Args, Debug, Clone, Default)]
pub struct CliConfig {
    /// TOML file with planner settings.
    #[arg(long)]
    pub config: Option<String>,
    #[arg(long)]
    pub numeraire_token: Option<String>,
    #[arg(long)]
    pub wrapped_native_token: Option<String>,
    #[arg(long)]
    pub protocol_fee_bps: Option<u32>,
    #[arg(long)]
    pub gas_margin: Option<u64>,
    #[arg(long)]
    pub query_timeout_ms: Option<u64>,
    #[arg(long)]
    pub max_concurrent_queries: Option<usize>,
    #[arg(long)]
    pub quote_cache_capacity: Option<usize>,
}

impl PlannerConfig {
    /// Defaults for everything except the numeraire.
    pub fn new(numeraire_token: Token) -> Self {
        Self {
            numeraire_token,
            wrapped_native_token: None,
            protocol_fee_bps: DEFAULT_PROTOCOL_FEE_BPS,
            gas_margin: DEFAULT_GAS_MARGIN,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
            quote_cache_capacity: DEFAULT_QUOTE_CACHE_CAPACITY,
        }
    }

    pub fn with_wrapped_native(mut self, token: Token) -> Self {
        self.wrapped_native_token = Some(token);
        self
    }

    /// Capped at 10000 bps (the whole amount).
    pub fn with_protocol_fee_bps(mut self, bps: u32) -> Self {
        self.protocol_fee_bps = bps.min(MAX_PROTOCOL_FEE_BPS);
        self
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Load from environment variables only.
    pub fn load() -> Result<Self> {
        Self::layered(FileConfig::default(), Overrides::default())
    }

    /// Load from a TOML file, with environment variables filling the gaps.
    pub fn from_file(path: &str) -> Result<Self> {
        Self::layered(FileConfig::read(path)?, Overrides::default())
    }

    /// Flags win over the `--config` file, which wins over environment variables.
    #[cfg(feature = "cli")]
    pub fn load_with_cli(cli: &CliConfig) -> Result<Self> {
        let file_config = match cli.config.as_deref() {
            Some(path) => FileConfig::read(path)?,
            None => FileConfig::default(),
        };
        let overrides = Overrides {
            numeraire_token: cli.numeraire_token.clone(),
            wrapped_native_token: cli.wrapped_native_token.clone(),
            protocol_fee_bps: cli.protocol_fee_bps,
            gas_margin: cli.gas_margin,
            query_timeout_ms: cli.query_timeout_ms,
            max_concurrent_queries: cli.max_concurrent_queries,
            quote_cache_capacity: cli.quote_cache_capacity,
        };
        Self::layered(file_config, overrides)
    }

    fn layered(file: FileConfig, cli: Overrides) -> Result<Self> {
        let numeraire = cli
            .numeraire_token
            .or(file.numeraire_token)
            .or(env::var("NUMERAIRE_TOKEN").ok())
            .ok_or_else(|| PlannerError::Config("numeraire token is not set (NUMERAIRE_TOKEN)".to_string()))?;
        let numeraire_token = parse_token("numeraire_token", &numeraire)?;

        let wrapped_native_token = cli
            .wrapped_native_token
            .or(file.wrapped_native_token)
            .or(env::var("WRAPPED_NATIVE_TOKEN").ok())
            .map(|s| parse_token("wrapped_native_token", &s))
            .transpose()?;
        if wrapped_native_token.is_none() {
            info!("WRAPPED_NATIVE_TOKEN not set; native asset will be quoted as-is by venues.");
        }

        let protocol_fee_bps = cli
            .protocol_fee_bps
            .or(file.protocol_fee_bps)
            .or(env_parse("PROTOCOL_FEE_BPS"))
            .unwrap_or(DEFAULT_PROTOCOL_FEE_BPS);
        if protocol_fee_bps > MAX_PROTOCOL_FEE_BPS {
            return Err(PlannerError::Config(format!(
                "protocol_fee_bps {} exceeds {}",
                protocol_fee_bps, MAX_PROTOCOL_FEE_BPS
            )));
        }
        let gas_margin = cli
            .gas_margin
            .or(file.gas_margin)
            .or(env_parse("GAS_MARGIN"))
            .unwrap_or(DEFAULT_GAS_MARGIN);
        let query_timeout_ms = cli
            .query_timeout_ms
            .or(file.query_timeout_ms)
            .or(env_parse("QUERY_TIMEOUT_MS"))
            .unwrap_or(DEFAULT_QUERY_TIMEOUT_MS);
        let max_concurrent_queries = cli
            .max_concurrent_queries
            .or(file.max_concurrent_queries)
            .or(env_parse("MAX_CONCURRENT_QUERIES"))
            .unwrap_or(DEFAULT_MAX_CONCURRENT_QUERIES)
            .max(1);
        let quote_cache_capacity = cli
            .quote_cache_capacity
            .or(file.quote_cache_capacity)
            .or(env_parse("QUOTE_CACHE_CAPACITY"))
            .unwrap_or(DEFAULT_QUOTE_CACHE_CAPACITY)
            .max(1);

        Ok(Self {
            numeraire_token,
            wrapped_native_token,
            protocol_fee_bps,
            gas_margin,
            query_timeout_ms,
            max_concurrent_queries,
            quote_cache_capacity,
        })
    }
}

impl FileConfig {
    pub fn read(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PlannerError::Config(format!("unable to read {}: {}", path, e)))?;
        Self::parse(&contents).map_err(|e| PlannerError::Config(format!("{}: {}", path, e)))
    }

    pub fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

#[derive(Default)]
struct Overrides {
    numeraire_token: Option<String>,
    wrapped_native_token: Option<String>,
    protocol_fee_bps: Option<u32>,
    gas_margin: Option<u64>,
    query_timeout_ms: Option<u64>,
    max_concurrent_queries: Option<usize>,
    quote_cache_capacity: Option<usize>,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

fn parse_token(field: &str, value: &str) -> Result<Token> {
    Token::from_str(value.trim()).map_err(|e| PlannerError::Config(format!("invalid {} '{}': {}", field, value, e)))
}
