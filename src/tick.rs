// 3.0 tick.rs: per-asset tick tables and the tick locator.
// a tick is a half-open allocation band [lower, upper) with its own linear price and
// directional fees. the last tick is closed: its upper edge is the asset's max allocation.
// 3.1 locate_tick reports Within / BelowDomain / AboveDomain; callers choose to clamp or reject.

use crate::config::ConfigError;
use crate::fixed_point::{allocation_to_x128, ALLOCATION_ONE, ONE_X128};
use crate::types::AssetId;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// One allocation band of an asset's price curve, in packed widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickBoundary {
    /// Inclusive lower edge, 88 fractional bits.
    pub lower_allocation: u128,
    /// Next tick's lower edge, or the asset max for the last tick.
    pub upper_allocation: u128,
    /// Price at `lower_allocation`, Q64.64 basket units per reserve unit.
    pub base_price: u128,
    /// Price drop per unit of allocation, Q64.64.
    pub price_slope: u128,
    /// Deducted from a deposit's basket-unit output.
    pub increase_fee: u64,
    /// Added on top of a withdrawal's basket-unit input.
    pub decrease_fee: u64,
}

impl TickBoundary {
    pub fn lower_x128(&self) -> U256 {
        allocation_to_x128(self.lower_allocation)
    }

    pub fn upper_x128(&self) -> U256 {
        allocation_to_x128(self.upper_allocation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Native decimal precision of the underlying token.
    pub decimals: u32,
    pub target_allocation: u128,
    pub max_allocation: u128,
    pub ticks: Vec<TickBoundary>,
}

impl AssetConfig {
    pub fn last_index(&self) -> usize {
        self.ticks.len().saturating_sub(1)
    }

    pub fn tick(&self, index: usize) -> Option<&TickBoundary> {
        self.ticks.get(index)
    }

    /// Structural checks on the tick table: contiguous, strictly increasing,
    /// closed at the max allocation.
    pub fn validate(&self, asset: AssetId) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidTicks { asset, reason };

        if self.ticks.is_empty() {
            return Err(invalid("tick table is empty".to_string()));
        }
        if self.max_allocation > ALLOCATION_ONE {
            return Err(ConfigError::InvalidAllocation {
                asset,
                reason: "max allocation above 1.0".to_string(),
            });
        }
        if self.target_allocation > self.max_allocation {
            return Err(ConfigError::InvalidAllocation {
                asset,
                reason: "target allocation above max allocation".to_string(),
            });
        }

        for (i, tick) in self.ticks.iter().enumerate() {
            if tick.lower_allocation >= tick.upper_allocation {
                return Err(invalid(format!("tick {} has an empty or inverted band", i)));
            }
            match self.ticks.get(i + 1) {
                Some(next) if next.lower_allocation != tick.upper_allocation => {
                    return Err(invalid(format!("tick {} upper edge does not meet tick {}", i, i + 1)));
                }
                None if tick.upper_allocation != self.max_allocation => {
                    return Err(invalid("last tick does not end at max allocation".to_string()));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Where an allocation sits relative to a tick table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPosition {
    Within(usize),
    BelowDomain,
    AboveDomain,
}

impl TickPosition {
    /// Below the table resolves to the first tick, above it to the last.
    pub fn clamped(self, last_index: usize) -> usize {
        match self {
            TickPosition::Within(index) => index,
            TickPosition::BelowDomain => 0,
            TickPosition::AboveDomain => last_index,
        }
    }
}

/// specific / total at canonical scale. An empty pool reads as allocation 0.
pub fn allocation_x128(specific_reserves: U256, total_reserves: U256) -> U256 {
    if total_reserves.is_zero() {
        return U256::zero();
    }
    let wide = specific_reserves.full_mul(ONE_X128) / primitive_types::U512::from(total_reserves);
    U256::try_from(wide).unwrap_or(U256::MAX)
}

// r / R >= boundary, compared without dividing.
fn at_or_above(specific: U256, total: U256, boundary_x128: U256) -> bool {
    specific.full_mul(ONE_X128) >= boundary_x128.full_mul(total)
}

/// Locates the tick whose half-open band contains specific / total. Never fails.
///
/// An allocation equal to an interior boundary belongs to the tick that starts there.
/// The last tick's upper edge is inclusive; a max allocation of 1.0 has no above-domain.
pub fn locate_tick(config: &AssetConfig, specific_reserves: U256, total_reserves: U256) -> TickPosition {
    if config.ticks.is_empty() {
        return TickPosition::BelowDomain;
    }
    let (specific, total) = if total_reserves.is_zero() {
        // empty pool: allocation 0
        (U256::zero(), U256::one())
    } else {
        (specific_reserves, total_reserves)
    };

    let count = config
        .ticks
        .partition_point(|t| at_or_above(specific, total, t.lower_x128()));
    if count == 0 {
        return TickPosition::BelowDomain;
    }

    let index = count - 1;
    let above_max = specific.full_mul(ONE_X128) > allocation_to_x128(config.max_allocation).full_mul(total);
    if index == config.last_index() && config.max_allocation < ALLOCATION_ONE && above_max {
        return TickPosition::AboveDomain;
    }
    TickPosition::Within(index)
}

/// Clamped tick lookup: below-domain allocations resolve to 0, above-domain to the last index.
pub fn get_tick_lower_bound_index(config: &AssetConfig, specific_reserves: U256, total_reserves: U256) -> usize {
    locate_tick(config, specific_reserves, total_reserves).clamped(config.last_index())
}
