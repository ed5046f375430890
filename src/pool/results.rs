// 8.0.2: receipts and errors for reserve pool operations.
// native_* fields are token units, canonical_* the 18-digit pool view, basket_units the ledger unit.

use crate::config::ConfigError;
use crate::fixed_point::MathError;
use crate::step::PricingError;
use crate::types::{AssetId, Direction};
use primitive_types::U256;

/// A tick-priced deposit: tokens in, basket units out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub asset: AssetId,
    pub native_in: U256,
    pub canonical_in: U256,
    pub basket_units: U256,
    pub fee: U256,
    pub ticks_crossed: usize,
}

/// A tick-priced withdrawal: basket units in (fee included), tokens out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnReceipt {
    pub asset: AssetId,
    pub native_out: U256,
    pub canonical_out: U256,
    pub basket_units: U256,
    pub fee: U256,
    pub ticks_crossed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub asset_in: AssetId,
    pub asset_out: AssetId,
    pub native_in: U256,
    pub native_out: U256,
    pub canonical_in: U256,
    pub canonical_out: U256,
    pub basket_units: U256,
    pub fee: U256, // both legs
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProportionalLeg {
    pub asset: AssetId,
    pub native_amount: U256,
    pub canonical_amount: U256,
}

/// Flat-fee mint or burn across every asset at its target weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProportionalReceipt {
    /// Net units minted, or units burned including the fee.
    pub basket_units: U256,
    pub fee: U256,
    pub legs: Vec<ProportionalLeg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualizeReceipt {
    pub asset: AssetId,
    pub direction: Direction,
    pub native_amount: U256,
    pub canonical_amount: U256,
    /// Minted for a deposit, burned (fee included) for a withdrawal.
    pub basket_units: U256,
    pub fee: U256,
    /// Paid out of collected fees on the withdrawal side only.
    pub bounty: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReserveError {
    #[error("asset {0} not configured")]
    UnknownAsset(AssetId),

    #[error("slippage bound violated: got {actual}, limit {limit}")]
    Slippage { actual: U256, limit: U256 },

    #[error("{asset} would exceed its max allocation")]
    AllocationAboveMax { asset: AssetId },

    #[error("{asset} reserve cannot cover its share")]
    AllocationBelowMin { asset: AssetId },

    #[error("insufficient reserve of {asset}: requested {requested}, available {available}")]
    InsufficientReserve {
        asset: AssetId,
        requested: U256,
        available: U256,
    },

    #[error("{direction} moves {asset} away from its target")]
    WrongDirection { asset: AssetId, direction: Direction },

    #[error("{direction} would move {asset} past its target")]
    PassesTarget { asset: AssetId, direction: Direction },

    #[error("{0} already at target allocation")]
    AtTarget(AssetId),

    #[error("cannot swap {0} for itself")]
    SameAsset(AssetId),

    #[error("pool holds no reserves")]
    EmptyPool,

    #[error("pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("math error: {0}")]
    Math(#[from] MathError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
