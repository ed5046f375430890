// 5.0 crossing.rs: multi-tick orchestrator. extends the single-tick step pricer across
// tick boundaries. each loop settles the current tick up to its edge, moves the reserve
// levels to that edge and steps the tick index by one, until the residual fits.
// 5.1 deposits walk up the table, withdrawals walk down. running off either end fails.
//
// cost is bounded by the tick count, never by the amount.

use crate::fixed_point::MathError;
use crate::step::{
    calc_step_burn, calc_step_deposit, calc_step_max_deposit, calc_step_max_withdrawal, calc_step_mint,
    calc_step_withdrawal, PricingError,
};
use crate::tick::{locate_tick, AssetConfig, TickBoundary, TickPosition};
use crate::types::{Direction, StepResult};
use primitive_types::U256;
use tracing::trace;

/// Summed outcome of a possibly multi-tick operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrossingResult {
    /// The side the caller did not specify (mint, deposit, burn or withdrawal).
    pub amount: U256,
    /// Basket-unit fee summed over every tick touched.
    pub fee: U256,
    pub ticks_crossed: usize,
    /// Tick the operation finished in.
    pub final_tick: usize,
}

impl CrossingResult {
    fn starting_at(index: usize) -> Self {
        Self {
            final_tick: index,
            ..Self::default()
        }
    }

    fn absorb(&mut self, amount: U256, fee: U256) -> Result<(), PricingError> {
        self.amount = self.amount.checked_add(amount).ok_or(MathError::Overflow)?;
        self.fee = self.fee.checked_add(fee).ok_or(MathError::Overflow)?;
        Ok(())
    }

    fn absorb_step(&mut self, step: StepResult) -> Result<(), PricingError> {
        self.absorb(step.amount, step.fee)
    }
}

// Reserve levels as the walk advances through the table.
struct Cursor {
    index: usize,
    specific: U256,
    total: U256,
}

impl Cursor {
    fn start(config: &AssetConfig, specific: U256, total: U256, direction: Direction) -> Result<Self, PricingError> {
        // deposits may start under the table and withdrawals over it: both move towards compliance
        let index = match (locate_tick(config, specific, total), direction) {
            (TickPosition::Within(index), _) => index,
            (TickPosition::BelowDomain, Direction::Deposit) => 0,
            (TickPosition::AboveDomain, Direction::Withdrawal) => config.last_index(),
            _ => return Err(PricingError::AllocationOutOfDomain { direction }),
        };
        Ok(Self { index, specific, total })
    }

    fn tick<'a>(&self, config: &'a AssetConfig, direction: Direction) -> Result<&'a TickBoundary, PricingError> {
        config.tick(self.index).ok_or(PricingError::TickOutOfRange {
            index: self.index,
            direction,
        })
    }

    // move reserves to the edge of the current tick, then step into the neighbour
    fn cross(&mut self, config: &AssetConfig, moved: U256, direction: Direction) -> Result<(), PricingError> {
        let out_of_range = PricingError::TickOutOfRange {
            index: self.index,
            direction,
        };
        match direction {
            Direction::Deposit => {
                self.specific = self.specific.checked_add(moved).ok_or(MathError::Overflow)?;
                self.total = self.total.checked_add(moved).ok_or(MathError::Overflow)?;
                if self.index >= config.last_index() {
                    return Err(out_of_range);
                }
                self.index += 1;
            }
            Direction::Withdrawal => {
                self.specific = self.specific.checked_sub(moved).ok_or(MathError::Underflow)?;
                self.total = self.total.checked_sub(moved).ok_or(MathError::Underflow)?;
                if self.index == 0 {
                    return Err(out_of_range);
                }
                self.index -= 1;
            }
        }
        trace!(
            to_tick = self.index,
            %direction,
            specific = %self.specific,
            total = %self.total,
            "crossed tick boundary"
        );
        Ok(())
    }
}

/// Basket units minted for depositing `deposit` canonical units, across as many ticks as needed.
pub fn compute_mint_given_deposit(
    config: &AssetConfig,
    specific: U256,
    total: U256,
    deposit: U256,
) -> Result<CrossingResult, PricingError> {
    let direction = Direction::Deposit;
    let mut cursor = Cursor::start(config, specific, total, direction)?;
    let mut result = CrossingResult::starting_at(cursor.index);
    let mut remaining = deposit;

    while !remaining.is_zero() {
        let tick = cursor.tick(config, direction)?;
        let capacity = calc_step_max_deposit(tick.upper_allocation, cursor.specific, cursor.total)?;
        if remaining <= capacity {
            result.absorb_step(calc_step_mint(tick, cursor.specific, cursor.total, remaining)?)?;
            break;
        }
        result.absorb_step(calc_step_mint(tick, cursor.specific, cursor.total, capacity)?)?;
        remaining -= capacity;
        cursor.cross(config, capacity, direction)?;
        result.ticks_crossed += 1;
    }
    result.final_tick = cursor.index;
    Ok(result)
}

/// Canonical deposit needed to mint `mint` net basket units.
pub fn compute_deposit_given_mint(
    config: &AssetConfig,
    specific: U256,
    total: U256,
    mint: U256,
) -> Result<CrossingResult, PricingError> {
    let direction = Direction::Deposit;
    let mut cursor = Cursor::start(config, specific, total, direction)?;
    let mut result = CrossingResult::starting_at(cursor.index);
    let mut remaining = mint;

    while !remaining.is_zero() {
        let tick = cursor.tick(config, direction)?;
        let capacity = calc_step_max_deposit(tick.upper_allocation, cursor.specific, cursor.total)?;
        if capacity == U256::MAX {
            result.absorb_step(calc_step_deposit(tick, cursor.specific, cursor.total, remaining, None)?)?;
            break;
        }

        let full = calc_step_mint(tick, cursor.specific, cursor.total, capacity)?;
        if remaining <= full.amount {
            result.absorb_step(calc_step_deposit(
                tick,
                cursor.specific,
                cursor.total,
                remaining,
                Some(capacity),
            )?)?;
            break;
        }
        result.absorb(capacity, full.fee)?;
        remaining -= full.amount;
        cursor.cross(config, capacity, direction)?;
        result.ticks_crossed += 1;
    }
    result.final_tick = cursor.index;
    Ok(result)
}

/// Canonical withdrawal paid for burning `burn` basket units.
pub fn compute_withdrawal_given_burn(
    config: &AssetConfig,
    specific: U256,
    total: U256,
    burn: U256,
) -> Result<CrossingResult, PricingError> {
    let direction = Direction::Withdrawal;
    let mut cursor = Cursor::start(config, specific, total, direction)?;
    let mut result = CrossingResult::starting_at(cursor.index);
    let mut remaining = burn;

    while !remaining.is_zero() {
        let tick = cursor.tick(config, direction)?;
        let capacity = calc_step_max_withdrawal(tick.lower_allocation, cursor.specific, cursor.total)?;
        let full = calc_step_burn(tick, cursor.specific, cursor.total, capacity)?;
        if remaining <= full.amount {
            result.absorb_step(calc_step_withdrawal(
                tick,
                cursor.specific,
                cursor.total,
                remaining,
                capacity,
            )?)?;
            break;
        }
        result.absorb(capacity, full.fee)?;
        remaining -= full.amount;
        cursor.cross(config, capacity, direction)?;
        result.ticks_crossed += 1;
    }
    result.final_tick = cursor.index;
    Ok(result)
}

/// Basket units burned (fee included) to withdraw `withdrawal` canonical units.
pub fn compute_burn_given_withdrawal(
    config: &AssetConfig,
    specific: U256,
    total: U256,
    withdrawal: U256,
) -> Result<CrossingResult, PricingError> {
    if withdrawal > specific {
        return Err(PricingError::ExceedsReserve {
            requested: withdrawal,
            available: specific,
        });
    }
    let direction = Direction::Withdrawal;
    let mut cursor = Cursor::start(config, specific, total, direction)?;
    let mut result = CrossingResult::starting_at(cursor.index);
    let mut remaining = withdrawal;

    while !remaining.is_zero() {
        let tick = cursor.tick(config, direction)?;
        let capacity = calc_step_max_withdrawal(tick.lower_allocation, cursor.specific, cursor.total)?;
        if remaining <= capacity {
            result.absorb_step(calc_step_burn(tick, cursor.specific, cursor.total, remaining)?)?;
            break;
        }
        result.absorb_step(calc_step_burn(tick, cursor.specific, cursor.total, capacity)?)?;
        remaining -= capacity;
        cursor.cross(config, capacity, direction)?;
        result.ticks_crossed += 1;
    }
    result.final_tick = cursor.index;
    Ok(result)
}
