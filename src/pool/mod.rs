// 8.0: reserve pool. tracks per-asset native and canonical balances, applies tick-priced
// mints, burns and swaps, the flat proportional path, and target equalization.
// deterministic and single-threaded; callers serialize operations against one pool.

mod config;
mod core;
mod equalize;
mod priced;
mod proportional;
mod results;

pub use config::PoolConfig;
pub use self::core::{AssetState, ReservePool};
pub use proportional::{max_allocation_check, min_allocation_check};
pub use results::{
    BurnReceipt, EqualizeReceipt, MintReceipt, ProportionalLeg, ProportionalReceipt, ReserveError, SwapReceipt,
};
