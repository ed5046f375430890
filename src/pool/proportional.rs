// 8.3 pool/proportional.rs: the simple path. every asset moves by its target weight at par
// (one basket unit per canonical reserve unit) with a flat fee, no tick pricing.
// outcomes are bounded by the saturating allocation checks below.

use super::core::{BalanceDelta, FeeDelta, ReservePool};
use super::results::{ProportionalLeg, ProportionalReceipt, ReserveError};
use crate::events::{EventPayload, ProportionalEvent};
use crate::fixed_point::{
    allocation_to_x128, fee_to_x128, mul_div, mul_div_up, scale_decimals, scale_decimals_up, MathError,
    ALLOCATION_ONE, CANONICAL_DECIMALS, ONE_X128,
};
use crate::tick::AssetConfig;
use crate::types::AssetId;
use primitive_types::U256;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Fails when `specific / total` is above the asset's max. Saturates: a max of 1.0
/// or an empty pool always passes.
pub fn max_allocation_check(
    asset: AssetId,
    config: &AssetConfig,
    specific: U256,
    total: U256,
) -> Result<(), ReserveError> {
    if config.max_allocation >= ALLOCATION_ONE || total.is_zero() {
        return Ok(());
    }
    let max = allocation_to_x128(config.max_allocation);
    if specific.full_mul(ONE_X128) > max.full_mul(total) {
        return Err(ReserveError::AllocationAboveMax { asset });
    }
    Ok(())
}

/// Reserve left after taking `withdrawal`. Fails instead of wrapping below zero.
pub fn min_allocation_check(asset: AssetId, specific: U256, withdrawal: U256) -> Result<U256, ReserveError> {
    specific
        .checked_sub(withdrawal)
        .ok_or(ReserveError::AllocationBelowMin { asset })
}

// specific / total strictly below before_specific / before_total
fn allocation_falls(before_specific: U256, before_total: U256, specific: U256, total: U256) -> bool {
    !before_total.is_zero() && specific.full_mul(before_total) < before_specific.full_mul(total)
}

impl ReservePool {
    // every asset must end at or under its max allocation, unless it started over and
    // the operation strictly lowers its share
    fn check_after(&self, changed: &BTreeMap<AssetId, U256>, total: U256) -> Result<(), ReserveError> {
        for (asset, state) in &self.assets {
            let specific = changed.get(asset).copied().unwrap_or(state.canonical_balance);
            if let Err(e) = max_allocation_check(*asset, &state.config, specific, total) {
                if !allocation_falls(state.canonical_balance, self.total_canonical, specific, total) {
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    pub fn quote_mint_proportional(&self, gross_units: U256) -> Result<ProportionalReceipt, ReserveError> {
        let fee = mul_div(gross_units, fee_to_x128(self.config.proportional_mint_fee), ONE_X128)?;
        let mut legs = Vec::with_capacity(self.assets.len());
        let mut changed = BTreeMap::new();
        let mut total = self.total_canonical;

        for (asset, state) in &self.assets {
            let target = allocation_to_x128(state.config.target_allocation);
            if target.is_zero() {
                continue;
            }
            // the pool receives these, so round the ask up and credit what arrives
            let owed = mul_div_up(gross_units, target, ONE_X128)?;
            let native_amount = scale_decimals_up(owed, CANONICAL_DECIMALS, state.config.decimals)?;
            let canonical_amount = scale_decimals(native_amount, state.config.decimals, CANONICAL_DECIMALS)?;

            total = total.checked_add(canonical_amount).ok_or(MathError::Overflow)?;
            let after = state
                .canonical_balance
                .checked_add(canonical_amount)
                .ok_or(MathError::Overflow)?;
            changed.insert(*asset, after);
            legs.push(ProportionalLeg {
                asset: *asset,
                native_amount,
                canonical_amount,
            });
        }
        self.check_after(&changed, total)?;

        debug!(%gross_units, %fee, legs = legs.len(), "quote proportional mint");
        Ok(ProportionalReceipt {
            basket_units: gross_units - fee,
            fee,
            legs,
        })
    }

    /// Deposits every asset at its target weight for `gross_units` worth, minting
    /// gross less the flat proportional mint fee.
    pub fn mint_proportional(&mut self, gross_units: U256) -> Result<ProportionalReceipt, ReserveError> {
        let quoted = self.quote_mint_proportional(gross_units);
        let receipt = self.settle("mint_proportional", None, quoted)?;
        let deltas: Vec<BalanceDelta> = receipt
            .legs
            .iter()
            .map(|leg| BalanceDelta::credit(leg.asset, leg.native_amount, leg.canonical_amount))
            .collect();
        let applied = self.apply(
            &deltas,
            FeeDelta {
                collected: receipt.fee,
                ..FeeDelta::default()
            },
        );
        self.settle("mint_proportional", None, applied)?;

        info!(minted = %receipt.basket_units, fee = %receipt.fee, "proportional mint");
        self.emit_event(EventPayload::ProportionalMinted(ProportionalEvent {
            basket_units: receipt.basket_units,
            fee: receipt.fee,
            legs: receipt.legs.iter().map(|leg| (leg.asset, leg.native_amount)).collect(),
        }));
        Ok(receipt)
    }

    pub fn quote_burn_proportional(&self, units: U256) -> Result<ProportionalReceipt, ReserveError> {
        if self.total_canonical.is_zero() {
            return Err(ReserveError::EmptyPool);
        }
        let fee = mul_div_up(units, fee_to_x128(self.config.proportional_burn_fee), ONE_X128)?;
        let net = units - fee;
        let mut legs = Vec::with_capacity(self.assets.len());
        let mut changed = BTreeMap::new();
        let mut total = self.total_canonical;

        for (asset, state) in &self.assets {
            let target = allocation_to_x128(state.config.target_allocation);
            if target.is_zero() {
                continue;
            }
            // the pool pays these, so floor at both scales
            let share = mul_div(net, target, ONE_X128)?;
            let native_amount = scale_decimals(share, CANONICAL_DECIMALS, state.config.decimals)?;
            let canonical_amount = scale_decimals_up(native_amount, state.config.decimals, CANONICAL_DECIMALS)?;

            let after = min_allocation_check(*asset, state.canonical_balance, canonical_amount)?;
            total = total.checked_sub(canonical_amount).ok_or(MathError::Underflow)?;
            changed.insert(*asset, after);
            legs.push(ProportionalLeg {
                asset: *asset,
                native_amount,
                canonical_amount,
            });
        }
        self.check_after(&changed, total)?;

        debug!(%units, %fee, legs = legs.len(), "quote proportional burn");
        Ok(ProportionalReceipt {
            basket_units: units,
            fee,
            legs,
        })
    }

    /// Burns `units` basket units (fee included) and pays every asset at its target weight.
    pub fn burn_proportional(&mut self, units: U256) -> Result<ProportionalReceipt, ReserveError> {
        let quoted = self.quote_burn_proportional(units);
        let receipt = self.settle("burn_proportional", None, quoted)?;
        let deltas: Vec<BalanceDelta> = receipt
            .legs
            .iter()
            .map(|leg| BalanceDelta::debit(leg.asset, leg.native_amount, leg.canonical_amount))
            .collect();
        let applied = self.apply(
            &deltas,
            FeeDelta {
                collected: receipt.fee,
                ..FeeDelta::default()
            },
        );
        self.settle("burn_proportional", None, applied)?;

        info!(burned = %receipt.basket_units, fee = %receipt.fee, "proportional burn");
        self.emit_event(EventPayload::ProportionalBurned(ProportionalEvent {
            basket_units: receipt.basket_units,
            fee: receipt.fee,
            legs: receipt.legs.iter().map(|leg| (leg.asset, leg.native_amount)).collect(),
        }));
        Ok(receipt)
    }
}
