// basket-core: tick-priced multi-asset reserve pool.
// prices deposits, withdrawals and swaps of reserve assets against basket units by
// integrating a per-allocation-band linear price curve. pure computation, no I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  fixed_point.rs: X128 scale, packed widths, mul_div, ln/log2, decimal scaling
//   2.x  types.rs: AssetId, Direction, StepResult
//   3.x  tick.rs: tick tables and the tick locator
//   4.x  step.rs: single-tick step pricer, max-step helpers
//   5.x  crossing.rs: multi-tick crossing orchestrator
//   6.x  swap.rs: cross-asset swap composition
//   7.x  config.rs: authored pool spec, validation, presets
//   8.x  pool/: reserve accounting, priced ops, proportional path, equalization
//   9.x  events.rs: state transition events for audit

// pricing modules
pub mod crossing;
pub mod fixed_point;
pub mod step;
pub mod swap;
pub mod tick;
pub mod types;

// stateful modules
pub mod config;
pub mod events;
pub mod pool;

// re exports for convenience
pub use config::{AssetSpec, ConfigError, PoolSpec, TickSpec};
pub use crossing::{
    compute_burn_given_withdrawal, compute_deposit_given_mint, compute_mint_given_deposit,
    compute_withdrawal_given_burn, CrossingResult,
};
pub use events::*;
pub use fixed_point::MathError;
pub use pool::*;
pub use primitive_types::U256;
pub use step::PricingError;
pub use swap::{compute_swap_underlying_given_in, compute_swap_underlying_given_out, SwapLeg, SwapQuote};
pub use tick::{get_tick_lower_bound_index, locate_tick, AssetConfig, TickBoundary, TickPosition};
pub use types::*;
