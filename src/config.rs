// 7.0 config.rs: pool configuration as the configuration provider authors it.
// human decimals in, packed tick tables out. the core trusts what passes validate();
// it does not check that targets across assets sum to 1.0.
// 7.1 presets: stable_trio for a realistic three-stablecoin basket, pass_through for flat pricing.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::fixed_point::{decimal_to_fixed, ALLOCATION_BITS, ALLOCATION_ONE, FEE_BITS, PRICE_BITS, SLOPE_BITS};
use crate::pool::PoolConfig;
use crate::tick::{AssetConfig, TickBoundary};
use crate::types::AssetId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid tick table for {asset}: {reason}")]
    InvalidTicks { asset: AssetId, reason: String },

    #[error("invalid allocation for {asset}: {reason}")]
    InvalidAllocation { asset: AssetId, reason: String },

    #[error("invalid fees: {reason}")]
    InvalidFees { reason: String },

    #[error("duplicate asset {0}")]
    DuplicateAsset(AssetId),

    #[error("configuration does not parse: {reason}")]
    Parse { reason: String },
}

// One tick as authored. The upper edge is implied by the next tick (or the asset max).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickSpec {
    pub lower_allocation: Decimal,
    pub base_price: Decimal,
    #[serde(default)]
    pub price_slope: Decimal,
    #[serde(default)]
    pub increase_fee: Decimal,
    #[serde(default)]
    pub decrease_fee: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSpec {
    pub id: AssetId,
    // Display only (e.g. "USDC")
    pub symbol: String,
    // Native token decimals
    pub decimals: u32,
    pub target_allocation: Decimal,
    pub max_allocation: Decimal,
    pub ticks: Vec<TickSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSpec {
    pub assets: Vec<AssetSpec>,
    // Flat fee on the proportional (all assets at target weights) mint path
    pub proportional_mint_fee: Decimal,
    // Flat fee on the proportional burn path
    pub proportional_burn_fee: Decimal,
    // Share of an equalizing withdrawal paid back as bounty, capped by collected fees
    pub equalize_bounty: Decimal,
    // Event log retention
    pub max_events: usize,
}

fn packed_allocation(value: Decimal, asset: AssetId, field: &str) -> Result<u128, ConfigError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(ConfigError::InvalidAllocation {
            asset,
            reason: format!("{} must be within [0, 1], got {}", field, value),
        });
    }
    if value == Decimal::ONE {
        return Ok(ALLOCATION_ONE);
    }
    let fixed = decimal_to_fixed(value, ALLOCATION_BITS).map_err(|e| ConfigError::InvalidAllocation {
        asset,
        reason: format!("{}: {}", field, e),
    })?;
    Ok(fixed.as_u128())
}

fn packed_q64(value: Decimal, bits: u32, asset: AssetId, field: &str) -> Result<u128, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidTicks { asset, reason };
    let fixed = decimal_to_fixed(value, bits).map_err(|e| invalid(format!("{}: {}", field, e)))?;
    if fixed.bits() > 128 {
        return Err(invalid(format!("{} {} does not fit 64 integer bits", field, value)));
    }
    Ok(fixed.as_u128())
}

fn packed_fee(value: Decimal, what: &str) -> Result<u64, ConfigError> {
    if value < Decimal::ZERO || value >= Decimal::ONE {
        return Err(ConfigError::InvalidFees {
            reason: format!("{} must be within [0, 1), got {}", what, value),
        });
    }
    let fixed = decimal_to_fixed(value, FEE_BITS).map_err(|e| ConfigError::InvalidFees {
        reason: format!("{}: {}", what, e),
    })?;
    Ok(fixed.low_u64())
}

impl AssetSpec {
    /// Packs the authored tick table. Upper edges come from the next tick's lower
    /// edge, and the last tick closes at the max allocation.
    pub fn to_asset_config(&self) -> Result<AssetConfig, ConfigError> {
        let max_allocation = packed_allocation(self.max_allocation, self.id, "max_allocation")?;
        let target_allocation = packed_allocation(self.target_allocation, self.id, "target_allocation")?;

        let mut ticks = Vec::with_capacity(self.ticks.len());
        for (i, spec) in self.ticks.iter().enumerate() {
            let upper_allocation = match self.ticks.get(i + 1) {
                Some(next) => packed_allocation(next.lower_allocation, self.id, "lower_allocation")?,
                None => max_allocation,
            };
            ticks.push(TickBoundary {
                lower_allocation: packed_allocation(spec.lower_allocation, self.id, "lower_allocation")?,
                upper_allocation,
                base_price: packed_q64(spec.base_price, PRICE_BITS, self.id, "base_price")?,
                price_slope: packed_q64(spec.price_slope, SLOPE_BITS, self.id, "price_slope")?,
                increase_fee: packed_fee(spec.increase_fee, "increase_fee")?,
                decrease_fee: packed_fee(spec.decrease_fee, "decrease_fee")?,
            });
        }

        let config = AssetConfig {
            decimals: self.decimals,
            target_allocation,
            max_allocation,
            ticks,
        };
        config.validate(self.id)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_asset_config().map(|_| ())
    }
}

impl Default for PoolSpec {
    fn default() -> Self {
        Self::stable_trio()
    }
}

impl PoolSpec {
    /// Three stablecoins: 40/30/30 targets, cheaper to deposit when under target.
    pub fn stable_trio() -> Self {
        let tick = |lower: Decimal, price: Decimal, slope: Decimal, inc: Decimal, dec_fee: Decimal| TickSpec {
            lower_allocation: lower,
            base_price: price,
            price_slope: slope,
            increase_fee: inc,
            decrease_fee: dec_fee,
        };
        let curve = |target: Decimal| {
            vec![
                // under target: deposits earn a premium, withdrawals pay more
                tick(dec!(0), dec!(1.004), dec!(0.01), dec!(0.0001), dec!(0.001)),
                // around target: close to par
                tick(target - dec!(0.1), dec!(1.001), dec!(0.01), dec!(0.0005), dec!(0.0005)),
                // over target: deposits discounted, withdrawals cheap
                tick(target + dec!(0.1), dec!(0.999), dec!(0.03), dec!(0.002), dec!(0.0001)),
            ]
        };
        let asset = |id: u32, symbol: &str, decimals: u32, target: Decimal| AssetSpec {
            id: AssetId(id),
            symbol: symbol.to_string(),
            decimals,
            target_allocation: target,
            max_allocation: target + dec!(0.2),
            ticks: curve(target),
        };

        Self {
            assets: vec![
                asset(1, "USDC", 6, dec!(0.4)),
                asset(2, "USDT", 6, dec!(0.3)),
                asset(3, "DAI", 18, dec!(0.3)),
            ],
            proportional_mint_fee: dec!(0.0005),
            proportional_burn_fee: dec!(0.0005),
            equalize_bounty: dec!(0.001),
            max_events: 100_000,
        }
    }

    /// Flat par pricing: one tick per asset over [0, 1], no slope, no fees.
    pub fn pass_through(assets: &[(u32, u32)]) -> Self {
        let target = if assets.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::ONE / Decimal::from(assets.len() as u64)
        };
        Self {
            assets: assets
                .iter()
                .map(|&(id, decimals)| AssetSpec {
                    id: AssetId(id),
                    symbol: format!("T{}", id),
                    decimals,
                    target_allocation: target,
                    max_allocation: Decimal::ONE,
                    ticks: vec![TickSpec {
                        lower_allocation: Decimal::ZERO,
                        base_price: Decimal::ONE,
                        price_slope: Decimal::ZERO,
                        increase_fee: Decimal::ZERO,
                        decrease_fee: Decimal::ZERO,
                    }],
                })
                .collect(),
            proportional_mint_fee: Decimal::ZERO,
            proportional_burn_fee: Decimal::ZERO,
            equalize_bounty: Decimal::ZERO,
            max_events: 10_000,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let spec: PoolSpec = serde_json::from_str(json).map_err(|e| ConfigError::Parse { reason: e.to_string() })?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse { reason: e.to_string() })
    }

    /// Per-asset checks plus pool-level fees. Does not cross-check target sums.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for asset in &self.assets {
            if !seen.insert(asset.id) {
                return Err(ConfigError::DuplicateAsset(asset.id));
            }
            asset.validate()?;
        }
        self.pool_config().map(|_| ())
    }

    pub fn pool_config(&self) -> Result<PoolConfig, ConfigError> {
        Ok(PoolConfig {
            max_events: self.max_events,
            proportional_mint_fee: packed_fee(self.proportional_mint_fee, "proportional_mint_fee")?,
            proportional_burn_fee: packed_fee(self.proportional_burn_fee, "proportional_burn_fee")?,
            equalize_bounty: packed_fee(self.equalize_bounty, "equalize_bounty")?,
        })
    }
}
