// 6.0 swap.rs: cross-asset swaps composed from two crossings through basket units.
// given-in: mint against the input asset, then burn the minted units against the output
// asset with the pool total already inflated by the deposit.
// given-out: burn for the requested output first, then mint that many units from the
// input asset against the deflated total.

use crate::crossing::{
    compute_burn_given_withdrawal, compute_deposit_given_mint, compute_mint_given_deposit,
    compute_withdrawal_given_burn, CrossingResult,
};
use crate::fixed_point::MathError;
use crate::step::PricingError;
use crate::tick::AssetConfig;
use primitive_types::U256;

/// One side of a swap: the asset's tick table and its canonical reserve.
#[derive(Debug, Clone, Copy)]
pub struct SwapLeg<'a> {
    pub config: &'a AssetConfig,
    pub reserve: U256,
}

impl<'a> SwapLeg<'a> {
    pub fn new(config: &'a AssetConfig, reserve: U256) -> Self {
        Self { config, reserve }
    }
}

/// Canonical amounts of a priced swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapQuote {
    pub amount_in: U256,
    pub amount_out: U256,
    /// Basket units minted by the input leg and burned by the output leg.
    pub basket_units: U256,
    /// Sum of both legs' fees, in basket units.
    pub fee: U256,
    pub ticks_crossed: usize,
}

impl SwapQuote {
    fn compose(amount_in: U256, amount_out: U256, basket_units: U256, legs: [CrossingResult; 2]) -> Result<Self, PricingError> {
        let [first, second] = legs;
        Ok(Self {
            amount_in,
            amount_out,
            basket_units,
            fee: first.fee.checked_add(second.fee).ok_or(MathError::Overflow)?,
            ticks_crossed: first.ticks_crossed + second.ticks_crossed,
        })
    }
}

/// Output for depositing `amount_in` of the input asset.
pub fn compute_swap_underlying_given_in(
    input: SwapLeg<'_>,
    output: SwapLeg<'_>,
    total: U256,
    amount_in: U256,
) -> Result<SwapQuote, PricingError> {
    let minted = compute_mint_given_deposit(input.config, input.reserve, total, amount_in)?;
    let inflated = total.checked_add(amount_in).ok_or(MathError::Overflow)?;
    let paid = compute_withdrawal_given_burn(output.config, output.reserve, inflated, minted.amount)?;
    SwapQuote::compose(amount_in, paid.amount, minted.amount, [minted, paid])
}

/// Input needed to withdraw `amount_out` of the output asset.
pub fn compute_swap_underlying_given_out(
    input: SwapLeg<'_>,
    output: SwapLeg<'_>,
    total: U256,
    amount_out: U256,
) -> Result<SwapQuote, PricingError> {
    let burned = compute_burn_given_withdrawal(output.config, output.reserve, total, amount_out)?;
    let deflated = total.checked_sub(amount_out).ok_or(MathError::Underflow)?;
    let deposit = compute_deposit_given_mint(input.config, input.reserve, deflated, burned.amount)?;
    SwapQuote::compose(deposit.amount, amount_out, burned.amount, [burned, deposit])
}
