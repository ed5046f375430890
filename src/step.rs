// 4.0 step.rs: single-tick step pricer. prices a deposit or withdrawal that stays inside one tick.
// 4.1 price(a) = base - slope * (a - lower), linear and non-increasing in allocation.
// 4.2 max-step helpers: the reserve change that lands an asset on a given allocation.
// 4.3 integral: basket units = ∫ price(a(t)) dt over the reserve change, closed form with a log.
// 4.4 inverses: reserve change for a given basket amount, Newton on the closed-form integral.
//     iterations are capped at MAX_NEWTON_STEPS whatever the amount; hitting the cap is NoConvergence.
//
// all amounts are canonical reserve units; r = the asset's reserve, total = pool reserve.

use crate::fixed_point::{
    allocation_to_x128, fee_to_x128, ln_ratio, mul_div, mul_div_up, mul_x128, narrow,
    price_to_x128, slope_to_x128, MathError, ALLOCATION_ONE, ONE_X128, X128_BITS,
};
use crate::tick::{allocation_x128, TickBoundary};
use crate::types::{Direction, StepResult};
use primitive_types::{U256, U512};

// the integral is concave (deposit) or convex (withdrawal) in the amount, so Newton
// from the closed-form linear seed lands in a handful of steps
const MAX_NEWTON_STEPS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("math error: {0}")]
    Math(#[from] MathError),

    #[error("allocation outside the tick band")]
    AllocationOutsideTick,

    #[error("{direction} cannot start from outside the tick table")]
    AllocationOutOfDomain { direction: Direction },

    #[error("{direction} would cross past tick {index}")]
    TickOutOfRange { index: usize, direction: Direction },

    #[error("withdrawal of {requested} exceeds reserve of {available}")]
    ExceedsReserve { requested: U256, available: U256 },

    #[error("price curve is negative inside the tick")]
    NegativePrice,

    #[error("step inverse did not converge")]
    NoConvergence,
}

// allocation seen by the price curve while reserves move. with nothing else in the
// pool every reserve unit belongs to this asset, so the curve sits at 1.0
fn path_allocation(specific: U256, total: U256) -> U256 {
    if total.is_zero() || specific >= total {
        ONE_X128
    } else {
        allocation_x128(specific, total)
    }
}

// linear price, extended below `lower` so a step that starts a hair under the
// boundary after a crossing still prices consistently with the integral
fn price_at(tick: &TickBoundary, allocation: U256) -> Result<U256, PricingError> {
    let base = price_to_x128(tick.base_price);
    let slope = slope_to_x128(tick.price_slope);
    let lower = tick.lower_x128();
    if allocation >= lower {
        let drop = mul_x128(slope, allocation - lower)?;
        base.checked_sub(drop).ok_or(PricingError::NegativePrice)
    } else {
        let rise = mul_x128(slope, lower - allocation)?;
        Ok(base.checked_add(rise).ok_or(MathError::Overflow)?)
    }
}

/// Price at `allocation` inside `tick`. Fails outside [lower, upper); the upper edge
/// itself belongs to the next tick.
pub fn calc_price(tick: &TickBoundary, allocation: U256) -> Result<U256, PricingError> {
    if allocation < tick.lower_x128() || allocation >= tick.upper_x128() {
        return Err(PricingError::AllocationOutsideTick);
    }
    price_at(tick, allocation)
}

/// Deposit x with (r + x) / (R + x) = boundary, i.e. x = (boundary * R - r) / (1 - boundary).
///
/// Floors, so the post-deposit allocation sits at or a few units under the boundary.
/// A boundary of 1.0 never binds and returns `U256::MAX`.
pub fn calc_step_max_deposit(boundary: u128, specific: U256, total: U256) -> Result<U256, PricingError> {
    if boundary >= ALLOCATION_ONE {
        return Ok(U256::MAX);
    }
    let b = allocation_to_x128(boundary);
    let reach = b.full_mul(total);
    let held = specific.full_mul(ONE_X128);
    if reach <= held {
        return Ok(U256::zero());
    }
    Ok(narrow((reach - held) / U512::from(ONE_X128 - b))?)
}

/// Withdrawal y with (r - y) / (R - y) = boundary, i.e. y = (r - boundary * R) / (1 - boundary).
///
/// Floors, so the post-withdrawal allocation sits at or a few units over the boundary.
/// A boundary of 0 returns the full balance.
pub fn calc_step_max_withdrawal(boundary: u128, specific: U256, total: U256) -> Result<U256, PricingError> {
    let b = allocation_to_x128(boundary);
    let held = specific.full_mul(ONE_X128);
    let floor = b.full_mul(total);
    if held <= floor {
        return Ok(U256::zero());
    }
    let withdrawal = narrow((held - floor) / U512::from(ONE_X128 - b))?;
    Ok(withdrawal.min(specific))
}

// gross basket units for moving `amount` of reserve inside one tick.
//   ∫ price = base * x - slope * ∫ (a - lower)
//   ∫ (a - lower) = (1 - lower) * x - (R - r) * ln(ratio)
// deposit ratio is (R + x) / R, withdrawal ratio is R / (R - x).
fn step_integral(
    tick: &TickBoundary,
    specific: U256,
    total: U256,
    amount: U256,
    direction: Direction,
) -> Result<U256, PricingError> {
    if amount.is_zero() {
        return Ok(U256::zero());
    }
    let base = price_to_x128(tick.base_price).full_mul(amount);
    let slope = slope_to_x128(tick.price_slope);
    if slope.is_zero() {
        return Ok(narrow(base >> X128_BITS)?);
    }

    let spare = total.checked_sub(specific).ok_or(MathError::Underflow)?;
    let linear = (ONE_X128 - tick.lower_x128()).full_mul(amount);
    let curved = if spare.is_zero() {
        U512::zero()
    } else {
        let log = match direction {
            Direction::Deposit => {
                let after = total.checked_add(amount).ok_or(MathError::Overflow)?;
                ln_ratio(after, total)?
            }
            Direction::Withdrawal => {
                let after = total.checked_sub(amount).ok_or(MathError::Underflow)?;
                ln_ratio(total, after)?
            }
        };
        spare.full_mul(log)
    };

    let gross = if linear >= curved {
        let penalty = slope.full_mul(narrow(linear - curved)?) >> X128_BITS;
        base.checked_sub(penalty).ok_or(PricingError::NegativePrice)?
    } else {
        // path ran below `lower`: the extended curve pays more than base
        let bonus = slope.full_mul(narrow(curved - linear)?) >> X128_BITS;
        base + bonus
    };
    Ok(narrow(gross >> X128_BITS)?)
}

fn invert_deposit(
    tick: &TickBoundary,
    specific: U256,
    total: U256,
    target: U256,
    capacity: Option<U256>,
) -> Result<U256, PricingError> {
    let clamp = |x: U256| capacity.map_or(x, |cap| x.min(cap));

    // start price is the highest price on the path, so the seed sits under the root
    let start_price = price_at(tick, path_allocation(specific, total))?;
    if start_price.is_zero() {
        return Err(PricingError::NegativePrice);
    }
    let mut deposit = clamp(mul_div(target, ONE_X128, start_price)?);

    for _ in 0..MAX_NEWTON_STEPS {
        let reached = step_integral(tick, specific, total, deposit, Direction::Deposit)?;
        if reached >= target || Some(deposit) == capacity {
            return Ok(deposit);
        }
        let price = price_at(
            tick,
            path_allocation(specific + deposit, total.checked_add(deposit).ok_or(MathError::Overflow)?),
        )?;
        if price.is_zero() {
            return Err(PricingError::NegativePrice);
        }
        let step = mul_div_up(target - reached, ONE_X128, price)?;
        deposit = clamp(deposit.checked_add(step).ok_or(MathError::Overflow)?);
    }
    Err(PricingError::NoConvergence)
}

fn invert_withdrawal(
    tick: &TickBoundary,
    specific: U256,
    total: U256,
    target: U256,
    capacity: U256,
) -> Result<U256, PricingError> {
    // start price is the lowest price on the path, so the seed sits over the root
    let start_price = price_at(tick, path_allocation(specific, total))?;
    if start_price.is_zero() {
        return Err(PricingError::NegativePrice);
    }
    let mut withdrawal = mul_div_up(target, ONE_X128, start_price)?.min(capacity);

    for _ in 0..MAX_NEWTON_STEPS {
        let reached = step_integral(tick, specific, total, withdrawal, Direction::Withdrawal)?;
        if reached <= target {
            return Ok(withdrawal);
        }
        let price = price_at(tick, path_allocation(specific - withdrawal, total - withdrawal))?;
        let step = mul_div(reached - target, ONE_X128, price)?;
        withdrawal = withdrawal.saturating_sub(step.max(U256::one()));
    }
    Err(PricingError::NoConvergence)
}

/// Basket units minted for depositing `deposit` inside `tick`. The increase fee comes
/// out of the gross integral: amount + fee == gross.
pub fn calc_step_mint(tick: &TickBoundary, specific: U256, total: U256, deposit: U256) -> Result<StepResult, PricingError> {
    let gross = step_integral(tick, specific, total, deposit, Direction::Deposit)?;
    let fee = mul_div(gross, fee_to_x128(tick.increase_fee), ONE_X128)?;
    Ok(StepResult { amount: gross - fee, fee })
}

/// Deposit needed inside `tick` to mint `mint` net basket units. `capacity` caps the
/// deposit at the tick's upper edge; `None` means the edge never binds.
pub fn calc_step_deposit(
    tick: &TickBoundary,
    specific: U256,
    total: U256,
    mint: U256,
    capacity: Option<U256>,
) -> Result<StepResult, PricingError> {
    if mint.is_zero() {
        return Ok(StepResult::zero());
    }
    let kept = ONE_X128 - fee_to_x128(tick.increase_fee);
    let gross = mul_div_up(mint, ONE_X128, kept)?;
    let deposit = invert_deposit(tick, specific, total, gross, capacity)?;
    Ok(StepResult { amount: deposit, fee: gross - mint })
}

/// Basket units burned to withdraw `withdrawal` inside `tick`. The decrease fee is added
/// on top of the gross integral: amount == gross + fee.
pub fn calc_step_burn(tick: &TickBoundary, specific: U256, total: U256, withdrawal: U256) -> Result<StepResult, PricingError> {
    if withdrawal > specific {
        return Err(PricingError::ExceedsReserve {
            requested: withdrawal,
            available: specific,
        });
    }
    let gross = step_integral(tick, specific, total, withdrawal, Direction::Withdrawal)?;
    let fee = mul_div_up(gross, fee_to_x128(tick.decrease_fee), ONE_X128)?;
    let burn = gross.checked_add(fee).ok_or(MathError::Overflow)?;
    Ok(StepResult { amount: burn, fee })
}

/// Withdrawal paid inside `tick` for burning `burn` basket units, never above `capacity`.
pub fn calc_step_withdrawal(
    tick: &TickBoundary,
    specific: U256,
    total: U256,
    burn: U256,
    capacity: U256,
) -> Result<StepResult, PricingError> {
    if burn.is_zero() {
        return Ok(StepResult::zero());
    }
    let charged = ONE_X128 + fee_to_x128(tick.decrease_fee);
    let gross = mul_div(burn, ONE_X128, charged)?;
    let withdrawal = invert_withdrawal(tick, specific, total, gross, capacity.min(specific))?;
    Ok(StepResult { amount: withdrawal, fee: burn - gross })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_point::{decimal_to_fixed, ALLOCATION_BITS, FEE_BITS, PRICE_BITS, SLOPE_BITS};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    fn packed(value: Decimal, bits: u32) -> u128 {
        decimal_to_fixed(value, bits).unwrap().as_u128()
    }

    fn tick(lower: Decimal, upper: Decimal, price: Decimal, slope: Decimal, fee: Decimal) -> TickBoundary {
        TickBoundary {
            lower_allocation: packed(lower, ALLOCATION_BITS),
            upper_allocation: packed(upper, ALLOCATION_BITS),
            base_price: packed(price, PRICE_BITS),
            price_slope: packed(slope, SLOPE_BITS),
            increase_fee: packed(fee, FEE_BITS) as u64,
            decrease_fee: packed(fee, FEE_BITS) as u64,
        }
    }

    fn frac(numerator: u64, denominator: u64) -> U256 {
        ONE_X128 * U256::from(numerator) / U256::from(denominator)
    }

    fn assert_close(got: U256, expected: U256, parts_per_billion: u64) {
        let diff = if got > expected { got - expected } else { expected - got };
        assert!(
            diff * U256::from(1_000_000_000u64) <= expected * U256::from(parts_per_billion) + U256::from(1_000_000_000u64),
            "{} vs {}",
            got,
            expected
        );
    }

    #[test]
    fn calc_price_half_open_band() {
        let t = tick(dec!(0.25), dec!(0.5), dec!(1.2), dec!(0.4), dec!(0));
        assert_eq!(calc_price(&t, frac(1, 4)).unwrap(), price_to_x128(t.base_price));
        assert_eq!(calc_price(&t, frac(1, 2)), Err(PricingError::AllocationOutsideTick));
        assert_eq!(calc_price(&t, frac(1, 8)), Err(PricingError::AllocationOutsideTick));

        // 0.375 is 0.125 above lower: 1.2 - 0.4 * 0.125 = 1.15
        let mid = calc_price(&t, frac(3, 8)).unwrap();
        let expected = decimal_to_fixed(dec!(1.15), X128_BITS).unwrap();
        assert_close(mid, expected, 1);
    }

    #[test]
    fn calc_price_rejects_negative_curve() {
        let t = tick(dec!(0), dec!(1), dec!(0.1), dec!(1), dec!(0));
        assert_eq!(calc_price(&t, frac(1, 2)), Err(PricingError::NegativePrice));
    }

    #[test]
    fn max_step_boundaries() {
        let (r, total) = (e18(1), e18(10));
        assert_eq!(calc_step_max_withdrawal(0, r, total).unwrap(), r);
        assert_eq!(calc_step_max_deposit(ALLOCATION_ONE, r, total).unwrap(), U256::MAX);
        assert_eq!(calc_step_max_deposit(0, r, total).unwrap(), U256::zero());
        // already above a 5% boundary: nothing to deposit, 10% -> 5% withdraws
        let five_percent = packed(dec!(0.05), ALLOCATION_BITS);
        assert_eq!(calc_step_max_deposit(five_percent, r, total).unwrap(), U256::zero());
        assert!(calc_step_max_withdrawal(five_percent, r, total).unwrap() > U256::zero());
    }

    #[test]
    fn max_deposit_lands_just_under_boundary() {
        let boundary = packed(dec!(0.2), ALLOCATION_BITS);
        let b = allocation_to_x128(boundary);
        let (r, total) = (e18(1), e18(10));
        let x = calc_step_max_deposit(boundary, r, total).unwrap();
        // (0.2 * 10 - 1) / 0.8 = 1.25
        assert_close(x, e18(5) / U256::from(4u64), 1);
        assert!((r + x).full_mul(ONE_X128) <= b.full_mul(total + x));
        let over = x + U256::one();
        assert!((r + over).full_mul(ONE_X128) > b.full_mul(total + over));
    }

    #[test]
    fn max_withdrawal_lands_just_over_boundary() {
        let boundary = packed(dec!(0.05), ALLOCATION_BITS);
        let b = allocation_to_x128(boundary);
        let (r, total) = (e18(1), e18(10));
        let y = calc_step_max_withdrawal(boundary, r, total).unwrap();
        assert!((r - y).full_mul(ONE_X128) >= b.full_mul(total - y));
        let over = y + U256::one();
        assert!((r - over).full_mul(ONE_X128) < b.full_mul(total - over));
    }

    #[test]
    fn flat_tick_mints_at_base_price() {
        let t = tick(dec!(0), dec!(1), dec!(1), dec!(0), dec!(0));
        let result = calc_step_mint(&t, e18(1), e18(10), e18(2)).unwrap();
        assert_eq!(result.amount, e18(2));
        assert_eq!(result.fee, U256::zero());
    }

    #[test]
    fn mint_fee_conserves_gross() {
        let with_fee = tick(dec!(0), dec!(1), dec!(1.05), dec!(0.3), dec!(0.003));
        let no_fee = tick(dec!(0), dec!(1), dec!(1.05), dec!(0.3), dec!(0));
        let with = calc_step_mint(&with_fee, e18(1), e18(10), e18(1)).unwrap();
        let gross = calc_step_mint(&no_fee, e18(1), e18(10), e18(1)).unwrap().amount;
        assert_eq!(with.amount + with.fee, gross);
        assert!(with.fee > U256::zero());
    }

    #[test]
    fn sloped_mint_between_start_and_end_price() {
        let t = tick(dec!(0), dec!(1), dec!(1), dec!(0.5), dec!(0));
        let (r, total, x) = (e18(1), e18(10), e18(1));
        let minted = calc_step_mint(&t, r, total, x).unwrap().amount;
        let start = price_at(&t, allocation_x128(r, total)).unwrap();
        let end = price_at(&t, allocation_x128(r + x, total + x)).unwrap();
        assert!(minted < mul_x128(start, x).unwrap());
        assert!(minted > mul_x128(end, x).unwrap());
    }

    #[test]
    fn sloped_mint_matches_closed_form_reference() {
        // r = 1, R = 10, x = 5, price(a) = 1 - 0.5 a:
        // ∫ = 5 - 0.5 * (5 - 9 ln(15/10))
        let t = tick(dec!(0), dec!(1), dec!(1), dec!(0.5), dec!(0));
        let minted = calc_step_mint(&t, e18(1), e18(10), e18(5)).unwrap().amount;
        let expected = 5.0 - 0.5 * (5.0 - 9.0 * 1.5f64.ln());
        let expected = U256::from((expected * 1e15) as u64) * U256::from(1000u64);
        assert_close(minted, expected, 10);
    }

    #[test]
    fn deposit_inverse_round_trips() {
        let t = tick(dec!(0), dec!(1), dec!(1.02), dec!(0.8), dec!(0.002));
        let (r, total) = (e18(3), e18(10));
        let deposit = e18(2) + U256::from(123_456_789u64);
        let minted = calc_step_mint(&t, r, total, deposit).unwrap();
        let back = calc_step_deposit(&t, r, total, minted.amount, None).unwrap();
        assert_close(back.amount, deposit, 10);
        assert_close(back.fee, minted.fee, 10);
    }

    #[test]
    fn deposit_inverse_converges_at_any_scale() {
        let t = tick(dec!(0), dec!(1), dec!(1.02), dec!(0.8), dec!(0.002));
        // same allocation, pool sizes from 1e3 to 1e30 canonical units
        for exponent in [3u32, 12, 18, 24, 30] {
            let total = U256::from(10u64).pow(U256::from(exponent));
            let r = total * U256::from(3u64) / U256::from(10u64);
            let deposit = total / U256::from(5u64);
            let minted = calc_step_mint(&t, r, total, deposit).unwrap();
            assert!(calc_step_deposit(&t, r, total, minted.amount, None).is_ok(), "10^{}", exponent);
            let burned = calc_step_burn(&t, r, total, deposit).unwrap();
            assert!(calc_step_withdrawal(&t, r, total, burned.amount, r).is_ok(), "10^{}", exponent);
        }
    }

    #[test]
    fn withdrawal_inverse_round_trips() {
        let t = tick(dec!(0), dec!(1), dec!(0.97), dec!(0.6), dec!(0.004));
        let (r, total) = (e18(4), e18(10));
        let withdrawal = e18(1) + U256::from(987_654_321u64);
        let burned = calc_step_burn(&t, r, total, withdrawal).unwrap();
        let back = calc_step_withdrawal(&t, r, total, burned.amount, r).unwrap();
        assert_close(back.amount, withdrawal, 10);
    }

    #[test]
    fn withdrawal_inverse_respects_capacity() {
        let t = tick(dec!(0), dec!(1), dec!(1), dec!(0.5), dec!(0));
        let (r, total) = (e18(4), e18(10));
        let capacity = e18(1);
        let back = calc_step_withdrawal(&t, r, total, e18(3), capacity).unwrap();
        assert_eq!(back.amount, capacity);
    }

    #[test]
    fn burn_rejects_overdraw() {
        let t = tick(dec!(0), dec!(1), dec!(1), dec!(0), dec!(0));
        let result = calc_step_burn(&t, e18(1), e18(10), e18(2));
        assert!(matches!(result, Err(PricingError::ExceedsReserve { .. })));
    }

    #[test]
    fn burn_adds_fee_on_top() {
        let t = tick(dec!(0), dec!(1), dec!(1), dec!(0), dec!(0.01));
        let burned = calc_step_burn(&t, e18(1), e18(10), e18(1)).unwrap();
        assert_close(burned.fee, e18(1) / U256::from(100u64), 1);
        assert_eq!(burned.amount, e18(1) + burned.fee);
    }

    #[test]
    fn single_asset_pool_prices_at_full_allocation() {
        // r == R: allocation stays at 1.0, price = 1 - 0.5 * (1 - 0) = 0.5
        let t = tick(dec!(0), dec!(1), dec!(1), dec!(0.5), dec!(0));
        let minted = calc_step_mint(&t, e18(10), e18(10), e18(2)).unwrap().amount;
        assert_close(minted, e18(1), 1);
        let back = calc_step_deposit(&t, e18(10), e18(10), minted, None).unwrap();
        assert_close(back.amount, e18(2), 1);
    }

    #[test]
    fn zero_amounts_price_to_zero() {
        let t = tick(dec!(0), dec!(1), dec!(1), dec!(0.5), dec!(0.01));
        assert_eq!(calc_step_mint(&t, e18(1), e18(10), U256::zero()).unwrap(), StepResult::zero());
        assert_eq!(calc_step_deposit(&t, e18(1), e18(10), U256::zero(), None).unwrap(), StepResult::zero());
        assert_eq!(calc_step_burn(&t, e18(1), e18(10), U256::zero()).unwrap(), StepResult::zero());
        assert_eq!(calc_step_withdrawal(&t, e18(1), e18(10), U256::zero(), e18(1)).unwrap(), StepResult::zero());
    }
}
