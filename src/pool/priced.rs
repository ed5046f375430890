//! Tick-priced mint, burn and swap.
//!
//! Amounts the pool receives are floored into canonical units, amounts it pays are
//! floored into native units, and amounts a caller must supply are rounded up.

use super::core::{at_least, at_most, BalanceDelta, FeeDelta, ReservePool};
use super::results::{BurnReceipt, MintReceipt, ReserveError, SwapReceipt};
use crate::crossing::{
    compute_burn_given_withdrawal, compute_deposit_given_mint, compute_mint_given_deposit,
    compute_withdrawal_given_burn,
};
use crate::events::{BurnedEvent, EventPayload, MintedEvent, SwappedEvent};
use crate::fixed_point::{scale_decimals, scale_decimals_up, CANONICAL_DECIMALS};
use crate::swap::{compute_swap_underlying_given_in, compute_swap_underlying_given_out, SwapLeg};
use crate::types::AssetId;
use primitive_types::U256;
use tracing::{debug, info};

impl ReservePool {
    pub fn quote_mint_given_deposit(&self, asset: AssetId, native_in: U256) -> Result<MintReceipt, ReserveError> {
        let state = self.state(asset)?;
        let canonical_in = scale_decimals(native_in, state.config.decimals, CANONICAL_DECIMALS)?;
        let crossing = compute_mint_given_deposit(&state.config, state.canonical_balance, self.total_canonical, canonical_in)?;

        debug!(%asset, %native_in, minted = %crossing.amount, fee = %crossing.fee, ticks = crossing.ticks_crossed, "quote mint");
        Ok(MintReceipt {
            asset,
            native_in,
            canonical_in,
            basket_units: crossing.amount,
            fee: crossing.fee,
            ticks_crossed: crossing.ticks_crossed,
        })
    }

    /// Deposits `native_in` tokens and mints at least `min_mint` basket units.
    pub fn mint_given_deposit(&mut self, asset: AssetId, native_in: U256, min_mint: U256) -> Result<MintReceipt, ReserveError> {
        let quoted = self
            .quote_mint_given_deposit(asset, native_in)
            .and_then(|receipt| at_least(receipt.basket_units, min_mint).map(|_| receipt));
        let receipt = self.settle("mint_given_deposit", Some(asset), quoted)?;
        self.record_mint(receipt)
    }

    pub fn quote_deposit_given_mint(&self, asset: AssetId, mint: U256) -> Result<MintReceipt, ReserveError> {
        let state = self.state(asset)?;
        let crossing = compute_deposit_given_mint(&state.config, state.canonical_balance, self.total_canonical, mint)?;
        // the caller supplies whole native units; the pool credits what those are worth
        let native_in = scale_decimals_up(crossing.amount, CANONICAL_DECIMALS, state.config.decimals)?;
        let canonical_in = scale_decimals(native_in, state.config.decimals, CANONICAL_DECIMALS)?;

        debug!(%asset, %mint, %native_in, fee = %crossing.fee, ticks = crossing.ticks_crossed, "quote deposit");
        Ok(MintReceipt {
            asset,
            native_in,
            canonical_in,
            basket_units: mint,
            fee: crossing.fee,
            ticks_crossed: crossing.ticks_crossed,
        })
    }

    /// Mints exactly `mint` basket units for at most `max_native_in` tokens.
    pub fn deposit_given_mint(&mut self, asset: AssetId, mint: U256, max_native_in: U256) -> Result<MintReceipt, ReserveError> {
        let quoted = self
            .quote_deposit_given_mint(asset, mint)
            .and_then(|receipt| at_most(receipt.native_in, max_native_in).map(|_| receipt));
        let receipt = self.settle("deposit_given_mint", Some(asset), quoted)?;
        self.record_mint(receipt)
    }

    fn record_mint(&mut self, receipt: MintReceipt) -> Result<MintReceipt, ReserveError> {
        let applied = self.apply(
            &[BalanceDelta::credit(receipt.asset, receipt.native_in, receipt.canonical_in)],
            FeeDelta {
                collected: receipt.fee,
                ..FeeDelta::default()
            },
        );
        self.settle("mint", Some(receipt.asset), applied)?;

        info!(
            asset = %receipt.asset,
            native_in = %receipt.native_in,
            minted = %receipt.basket_units,
            fee = %receipt.fee,
            "minted"
        );
        self.emit_event(EventPayload::Minted(MintedEvent {
            asset: receipt.asset,
            native_in: receipt.native_in,
            basket_units: receipt.basket_units,
            fee: receipt.fee,
            ticks_crossed: receipt.ticks_crossed,
        }));
        Ok(receipt)
    }

    pub fn quote_withdrawal_given_burn(&self, asset: AssetId, burn: U256) -> Result<BurnReceipt, ReserveError> {
        let state = self.state(asset)?;
        let crossing = compute_withdrawal_given_burn(&state.config, state.canonical_balance, self.total_canonical, burn)?;
        let native_out = scale_decimals(crossing.amount, CANONICAL_DECIMALS, state.config.decimals)?;
        let canonical_out = scale_decimals_up(native_out, state.config.decimals, CANONICAL_DECIMALS)?;

        debug!(%asset, %burn, %native_out, fee = %crossing.fee, ticks = crossing.ticks_crossed, "quote withdrawal");
        Ok(BurnReceipt {
            asset,
            native_out,
            canonical_out,
            basket_units: burn,
            fee: crossing.fee,
            ticks_crossed: crossing.ticks_crossed,
        })
    }

    /// Burns `burn` basket units and pays out at least `min_native_out` tokens.
    pub fn withdrawal_given_burn(&mut self, asset: AssetId, burn: U256, min_native_out: U256) -> Result<BurnReceipt, ReserveError> {
        let quoted = self
            .quote_withdrawal_given_burn(asset, burn)
            .and_then(|receipt| at_least(receipt.native_out, min_native_out).map(|_| receipt));
        let receipt = self.settle("withdrawal_given_burn", Some(asset), quoted)?;
        self.record_burn(receipt)
    }

    pub fn quote_burn_given_withdrawal(&self, asset: AssetId, native_out: U256) -> Result<BurnReceipt, ReserveError> {
        let state = self.state(asset)?;
        let canonical_out = scale_decimals_up(native_out, state.config.decimals, CANONICAL_DECIMALS)?;
        let crossing = compute_burn_given_withdrawal(&state.config, state.canonical_balance, self.total_canonical, canonical_out)?;

        debug!(%asset, %native_out, burn = %crossing.amount, fee = %crossing.fee, ticks = crossing.ticks_crossed, "quote burn");
        Ok(BurnReceipt {
            asset,
            native_out,
            canonical_out,
            basket_units: crossing.amount,
            fee: crossing.fee,
            ticks_crossed: crossing.ticks_crossed,
        })
    }

    /// Pays out exactly `native_out` tokens for at most `max_burn` basket units.
    pub fn burn_given_withdrawal(&mut self, asset: AssetId, native_out: U256, max_burn: U256) -> Result<BurnReceipt, ReserveError> {
        let quoted = self
            .quote_burn_given_withdrawal(asset, native_out)
            .and_then(|receipt| at_most(receipt.basket_units, max_burn).map(|_| receipt));
        let receipt = self.settle("burn_given_withdrawal", Some(asset), quoted)?;
        self.record_burn(receipt)
    }

    fn record_burn(&mut self, receipt: BurnReceipt) -> Result<BurnReceipt, ReserveError> {
        let applied = self.apply(
            &[BalanceDelta::debit(receipt.asset, receipt.native_out, receipt.canonical_out)],
            FeeDelta {
                collected: receipt.fee,
                ..FeeDelta::default()
            },
        );
        self.settle("burn", Some(receipt.asset), applied)?;

        info!(
            asset = %receipt.asset,
            native_out = %receipt.native_out,
            burned = %receipt.basket_units,
            fee = %receipt.fee,
            "burned"
        );
        self.emit_event(EventPayload::Burned(BurnedEvent {
            asset: receipt.asset,
            native_out: receipt.native_out,
            basket_units: receipt.basket_units,
            fee: receipt.fee,
            ticks_crossed: receipt.ticks_crossed,
        }));
        Ok(receipt)
    }

    fn swap_legs(&self, asset_in: AssetId, asset_out: AssetId) -> Result<(SwapLeg<'_>, SwapLeg<'_>), ReserveError> {
        if asset_in == asset_out {
            return Err(ReserveError::SameAsset(asset_in));
        }
        let input = self.state(asset_in)?;
        let output = self.state(asset_out)?;
        Ok((
            SwapLeg::new(&input.config, input.canonical_balance),
            SwapLeg::new(&output.config, output.canonical_balance),
        ))
    }

    pub fn quote_swap_given_in(&self, asset_in: AssetId, asset_out: AssetId, native_in: U256) -> Result<SwapReceipt, ReserveError> {
        let (input, output) = self.swap_legs(asset_in, asset_out)?;
        let canonical_in = scale_decimals(native_in, input.config.decimals, CANONICAL_DECIMALS)?;
        let quote = compute_swap_underlying_given_in(input, output, self.total_canonical, canonical_in)?;
        let native_out = scale_decimals(quote.amount_out, CANONICAL_DECIMALS, output.config.decimals)?;
        let canonical_out = scale_decimals_up(native_out, output.config.decimals, CANONICAL_DECIMALS)?;

        debug!(%asset_in, %asset_out, %native_in, %native_out, fee = %quote.fee, "quote swap given in");
        Ok(SwapReceipt {
            asset_in,
            asset_out,
            native_in,
            native_out,
            canonical_in,
            canonical_out,
            basket_units: quote.basket_units,
            fee: quote.fee,
        })
    }

    /// Swaps `native_in` of one asset for at least `min_native_out` of another.
    pub fn swap_given_in(
        &mut self,
        asset_in: AssetId,
        asset_out: AssetId,
        native_in: U256,
        min_native_out: U256,
    ) -> Result<SwapReceipt, ReserveError> {
        let quoted = self
            .quote_swap_given_in(asset_in, asset_out, native_in)
            .and_then(|receipt| at_least(receipt.native_out, min_native_out).map(|_| receipt));
        let receipt = self.settle("swap_given_in", Some(asset_in), quoted)?;
        self.record_swap(receipt)
    }

    pub fn quote_swap_given_out(&self, asset_in: AssetId, asset_out: AssetId, native_out: U256) -> Result<SwapReceipt, ReserveError> {
        let (input, output) = self.swap_legs(asset_in, asset_out)?;
        let canonical_out = scale_decimals_up(native_out, output.config.decimals, CANONICAL_DECIMALS)?;
        let quote = compute_swap_underlying_given_out(input, output, self.total_canonical, canonical_out)?;
        let native_in = scale_decimals_up(quote.amount_in, CANONICAL_DECIMALS, input.config.decimals)?;
        let canonical_in = scale_decimals(native_in, input.config.decimals, CANONICAL_DECIMALS)?;

        debug!(%asset_in, %asset_out, %native_in, %native_out, fee = %quote.fee, "quote swap given out");
        Ok(SwapReceipt {
            asset_in,
            asset_out,
            native_in,
            native_out,
            canonical_in,
            canonical_out,
            basket_units: quote.basket_units,
            fee: quote.fee,
        })
    }

    /// Swaps at most `max_native_in` of one asset for exactly `native_out` of another.
    pub fn swap_given_out(
        &mut self,
        asset_in: AssetId,
        asset_out: AssetId,
        native_out: U256,
        max_native_in: U256,
    ) -> Result<SwapReceipt, ReserveError> {
        let quoted = self
            .quote_swap_given_out(asset_in, asset_out, native_out)
            .and_then(|receipt| at_most(receipt.native_in, max_native_in).map(|_| receipt));
        let receipt = self.settle("swap_given_out", Some(asset_in), quoted)?;
        self.record_swap(receipt)
    }

    fn record_swap(&mut self, receipt: SwapReceipt) -> Result<SwapReceipt, ReserveError> {
        let applied = self.apply(
            &[
                BalanceDelta::credit(receipt.asset_in, receipt.native_in, receipt.canonical_in),
                BalanceDelta::debit(receipt.asset_out, receipt.native_out, receipt.canonical_out),
            ],
            FeeDelta {
                collected: receipt.fee,
                ..FeeDelta::default()
            },
        );
        self.settle("swap", Some(receipt.asset_in), applied)?;

        info!(
            asset_in = %receipt.asset_in,
            asset_out = %receipt.asset_out,
            native_in = %receipt.native_in,
            native_out = %receipt.native_out,
            fee = %receipt.fee,
            "swapped"
        );
        self.emit_event(EventPayload::Swapped(SwappedEvent {
            asset_in: receipt.asset_in,
            asset_out: receipt.asset_out,
            native_in: receipt.native_in,
            native_out: receipt.native_out,
            basket_units: receipt.basket_units,
            fee: receipt.fee,
        }));
        Ok(receipt)
    }
}
