//! Basket Reserve Pool Simulation.
//!
//! Walks a three-stablecoin pool through seeding, priced deposits and withdrawals,
//! tick crossings, swaps, slippage rejection and target equalization.
//!
//! RUST_LOG=basket_core=debug shows every quote; the default level is info.

use basket_core::fixed_point::{amount_to_decimal, fixed_to_decimal, X128_BITS};
use basket_core::*;
use tracing_subscriber::EnvFilter;

const USDC: AssetId = AssetId(1);
const USDT: AssetId = AssetId(2);
const DAI: AssetId = AssetId(3);

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

fn main() {
    init_logging("info");

    println!("Basket Reserve Pool Simulation");
    println!("Three stablecoins, tick-priced allocation bands\n");

    scenario_1_seed_and_price();
    scenario_2_tick_crossing();
    scenario_3_swaps();
    scenario_4_slippage();
    scenario_5_equalization();

    println!("\nAll simulations completed successfully.");
}

fn native(amount: u64, decimals: u32) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(decimals))
}

fn units(amount: U256) -> String {
    amount_to_decimal(amount, 18)
        .map(|d| d.round_dp(6).to_string())
        .unwrap_or_else(|_| amount.to_string())
}

fn tokens(amount: U256, decimals: u32) -> String {
    amount_to_decimal(amount, decimals)
        .map(|d| d.round_dp(6).to_string())
        .unwrap_or_else(|_| amount.to_string())
}

fn print_allocations(pool: &ReservePool) {
    for (asset, state) in pool.assets() {
        let allocation = pool.allocation_decimal(*asset).unwrap();
        let target = fixed_to_decimal(U256::from(state.config.target_allocation), 88).unwrap();
        println!(
            "    {}: balance {}, allocation {:.4} (target {:.2}), tick {:?}",
            asset,
            tokens(state.native_balance, state.config.decimals),
            allocation,
            target,
            pool.current_tick(*asset).unwrap()
        );
    }
}

fn seeded_pool() -> ReservePool {
    let mut pool = ReservePool::from_spec(&PoolSpec::stable_trio()).unwrap();
    pool.mint_proportional(native(1_000_000, 18)).unwrap();
    pool
}

/// Proportional seed, then single-asset deposits priced by allocation.
fn scenario_1_seed_and_price() {
    println!("Scenario 1: Seeding and Allocation Pricing\n");

    let mut pool = ReservePool::from_spec(&PoolSpec::stable_trio()).unwrap();
    let seed = pool.mint_proportional(native(1_000_000, 18)).unwrap();
    println!("  Proportional seed of 1,000,000 units, fee {}", units(seed.fee));
    print_allocations(&pool);

    let usdc = pool.mint_given_deposit(USDC, native(10_000, 6), U256::zero()).unwrap();
    println!("\n  Deposit 10,000 USDC (at target): minted {}", units(usdc.basket_units));

    let dai = pool.burn_given_withdrawal(DAI, native(50_000, 18), U256::MAX).unwrap();
    println!("  Withdraw 50,000 DAI: burned {} (fee {})", units(dai.basket_units), units(dai.fee));

    let dai_back = pool.quote_mint_given_deposit(DAI, native(10_000, 18)).unwrap();
    println!("  Quote 10,000 DAI deposit (now under target): {} units\n", units(dai_back.basket_units));
}

/// A large deposit walks through several allocation bands.
fn scenario_2_tick_crossing() {
    println!("Scenario 2: Tick Crossing\n");

    let mut pool = seeded_pool();
    let receipt = pool.mint_given_deposit(USDT, native(250_000, 6), U256::zero()).unwrap();
    println!(
        "  Deposit 250,000 USDT: minted {}, fee {}, crossed {} ticks",
        units(receipt.basket_units),
        units(receipt.fee),
        receipt.ticks_crossed
    );
    print_allocations(&pool);

    match pool.quote_mint_given_deposit(USDT, native(500_000, 6)) {
        Ok(_) => println!("  Unexpected: deposit past max allowed"),
        Err(e) => println!("\n  Deposit of 500,000 more USDT rejected: {}\n", e),
    }
}

/// Swaps compose a mint and a burn through basket units.
fn scenario_3_swaps() {
    println!("Scenario 3: Cross-Asset Swaps\n");

    let mut pool = seeded_pool();
    let given_in = pool.swap_given_in(USDC, DAI, native(20_000, 6), U256::zero()).unwrap();
    println!(
        "  Swap 20,000 USDC -> {} DAI (fee {} units)",
        tokens(given_in.native_out, 18),
        units(given_in.fee)
    );

    let given_out = pool.swap_given_out(DAI, USDT, native(5_000, 6), U256::MAX).unwrap();
    println!(
        "  Swap {} DAI -> 5,000 USDT (fee {} units)",
        tokens(given_out.native_in, 18),
        units(given_out.fee)
    );
    println!("  Fees collected: {}\n", units(pool.fees_collected()));
}

/// Slippage bounds reject without touching reserves.
fn scenario_4_slippage() {
    println!("Scenario 4: Slippage Rejection\n");

    let mut pool = seeded_pool();
    let before = pool.total_reserves();
    let result = pool.mint_given_deposit(USDC, native(1_000, 6), native(2_000, 18));
    println!("  Demand 2,000 units for 1,000 USDC: {}", result.unwrap_err());
    println!(
        "  Reserves unchanged: {}",
        pool.total_reserves() == before
    );
    println!("  Last event: {:?}\n", pool.events().last().map(|e| &e.payload));
}

/// Drain DAI below target, then equalize back and earn the bounty on the way down.
fn scenario_5_equalization() {
    println!("Scenario 5: Target Equalization\n");

    let mut pool = seeded_pool();
    pool.burn_given_withdrawal(DAI, native(80_000, 18), U256::MAX).unwrap();
    pool.mint_given_deposit(USDC, native(60_000, 6), U256::zero()).unwrap();
    print_allocations(&pool);

    let dai = pool.equalize_to_target(DAI).unwrap();
    println!(
        "\n  Equalize DAI: {} {} for {} units",
        dai.direction,
        tokens(dai.native_amount, 18),
        units(dai.basket_units)
    );

    let usdc = pool.equalize_to_target(USDC).unwrap();
    println!(
        "  Equalize USDC: {} {} for {} units, bounty {}",
        usdc.direction,
        tokens(usdc.native_amount, 6),
        units(usdc.basket_units),
        units(usdc.bounty)
    );
    print_allocations(&pool);

    let allocation = pool.allocation(USDC).unwrap();
    println!(
        "\n  USDC allocation after equalizing: {}",
        fixed_to_decimal(allocation, X128_BITS).unwrap().round_dp(8)
    );
}
