// 8.4 pool/equalize.rs: moves one asset's allocation towards its target and never past it.
// target is the configured target allocation, not a tick edge. equalizing withdrawals earn a
// bounty out of previously collected fees.

use super::core::{BalanceDelta, FeeDelta, ReservePool};
use super::results::{EqualizeReceipt, ReserveError};
use crate::crossing::{compute_burn_given_withdrawal, compute_mint_given_deposit};
use crate::events::{EqualizedEvent, EventPayload};
use crate::fixed_point::{
    allocation_to_x128, fee_to_x128, mul_div, scale_decimals, scale_decimals_up, CANONICAL_DECIMALS, ONE_X128,
};
use crate::step::{calc_step_max_deposit, calc_step_max_withdrawal};
use crate::types::{AssetId, Direction};
use primitive_types::U256;
use std::cmp::Ordering;
use tracing::{debug, info};

impl ReservePool {
    // which way the asset has to move to reach its target
    fn direction_to_target(&self, asset: AssetId) -> Result<Direction, ReserveError> {
        let state = self.state(asset)?;
        if self.total_canonical.is_zero() {
            return Err(ReserveError::EmptyPool);
        }
        let held = state.canonical_balance.full_mul(ONE_X128);
        let target = allocation_to_x128(state.config.target_allocation).full_mul(self.total_canonical);
        match held.cmp(&target) {
            Ordering::Less => Ok(Direction::Deposit),
            Ordering::Greater => Ok(Direction::Withdrawal),
            Ordering::Equal => Err(ReserveError::AtTarget(asset)),
        }
    }

    pub fn quote_swap_towards_target(
        &self,
        asset: AssetId,
        direction: Direction,
        native_amount: U256,
    ) -> Result<EqualizeReceipt, ReserveError> {
        let needed = self.direction_to_target(asset)?;
        if needed != direction {
            return Err(ReserveError::WrongDirection { asset, direction });
        }
        let state = self.state(asset)?;
        let (specific, total) = (state.canonical_balance, self.total_canonical);
        let target = state.config.target_allocation;
        let passes = ReserveError::PassesTarget { asset, direction };

        let receipt = match direction {
            Direction::Deposit => {
                let canonical_amount = scale_decimals(native_amount, state.config.decimals, CANONICAL_DECIMALS)?;
                if canonical_amount > calc_step_max_deposit(target, specific, total)? {
                    return Err(passes);
                }
                let crossing = compute_mint_given_deposit(&state.config, specific, total, canonical_amount)?;
                EqualizeReceipt {
                    asset,
                    direction,
                    native_amount,
                    canonical_amount,
                    basket_units: crossing.amount,
                    fee: crossing.fee,
                    bounty: U256::zero(),
                }
            }
            Direction::Withdrawal => {
                let canonical_amount = scale_decimals_up(native_amount, state.config.decimals, CANONICAL_DECIMALS)?;
                if canonical_amount > calc_step_max_withdrawal(target, specific, total)? {
                    return Err(passes);
                }
                let crossing = compute_burn_given_withdrawal(&state.config, specific, total, canonical_amount)?;
                let gross = crossing.amount - crossing.fee;
                let offered = mul_div(gross, fee_to_x128(self.config.equalize_bounty), ONE_X128)?;
                EqualizeReceipt {
                    asset,
                    direction,
                    native_amount,
                    canonical_amount,
                    basket_units: crossing.amount,
                    fee: crossing.fee,
                    bounty: offered.min(self.fees_collected),
                }
            }
        };

        debug!(%asset, %direction, %native_amount, units = %receipt.basket_units, bounty = %receipt.bounty, "quote equalize");
        Ok(receipt)
    }

    /// Deposits or withdraws `native_amount` of `asset`, only towards its target allocation.
    pub fn swap_towards_target(
        &mut self,
        asset: AssetId,
        direction: Direction,
        native_amount: U256,
    ) -> Result<EqualizeReceipt, ReserveError> {
        let quoted = self.quote_swap_towards_target(asset, direction, native_amount);
        let receipt = self.settle("swap_towards_target", Some(asset), quoted)?;

        let delta = match direction {
            Direction::Deposit => BalanceDelta::credit(asset, receipt.native_amount, receipt.canonical_amount),
            Direction::Withdrawal => BalanceDelta::debit(asset, receipt.native_amount, receipt.canonical_amount),
        };
        let applied = self.apply(
            &[delta],
            FeeDelta {
                collected: receipt.fee,
                paid_out: receipt.bounty,
            },
        );
        self.settle("swap_towards_target", Some(asset), applied)?;

        info!(
            %asset,
            %direction,
            native_amount = %receipt.native_amount,
            units = %receipt.basket_units,
            bounty = %receipt.bounty,
            "equalized"
        );
        self.emit_event(EventPayload::Equalized(EqualizedEvent {
            asset,
            direction,
            native_amount: receipt.native_amount,
            basket_units: receipt.basket_units,
            bounty: receipt.bounty,
        }));
        Ok(receipt)
    }

    /// Native amount that brings `asset` as close to target as whole native units allow.
    pub fn amount_to_target(&self, asset: AssetId) -> Result<(Direction, U256), ReserveError> {
        let direction = self.direction_to_target(asset)?;
        let state = self.state(asset)?;
        let (specific, total) = (state.canonical_balance, self.total_canonical);
        let target = state.config.target_allocation;
        let canonical = match direction {
            Direction::Deposit => calc_step_max_deposit(target, specific, total)?,
            Direction::Withdrawal => calc_step_max_withdrawal(target, specific, total)?,
        };
        // floor so the move stops short of target rather than passing it
        let native = scale_decimals(canonical, CANONICAL_DECIMALS, state.config.decimals)?;
        if native.is_zero() {
            return Err(ReserveError::AtTarget(asset));
        }
        Ok((direction, native))
    }

    /// Moves `asset` onto its target allocation in one step.
    pub fn equalize_to_target(&mut self, asset: AssetId) -> Result<EqualizeReceipt, ReserveError> {
        let planned = self.amount_to_target(asset);
        let (direction, native_amount) = self.settle("equalize_to_target", Some(asset), planned)?;
        self.swap_towards_target(asset, direction, native_amount)
    }
}
