//! Reserve pool runtime options, in packed widths.

/// Pool-level configuration. Per-asset tick tables live in `AssetConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Flat fee fraction on the proportional mint path, 64 fractional bits.
    pub proportional_mint_fee: u64,
    /// Flat fee fraction on the proportional burn path, 64 fractional bits.
    pub proportional_burn_fee: u64,
    /// Share of an equalizing withdrawal's gross paid back as bounty.
    pub equalize_bounty: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            proportional_mint_fee: 0,
            proportional_burn_fee: 0,
            equalize_bounty: 0,
        }
    }
}
