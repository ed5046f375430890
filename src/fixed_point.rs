// 1.0 fixed_point.rs: canonical scaled-integer math. every price, fee and allocation
// ends up here as a U256 holding value * 2^128 before it touches a reserve amount.
// 1.1 packed widths: narrower fractional widths used by tick tables, widened by a shift.
// 1.2 logarithm: range reduction by powers of two, then the atanh series.
// 1.3 decimals: native token precision <-> canonical 18 digit precision.

use primitive_types::{U256, U512};
use rust_decimal::Decimal;

/// Fractional bits of the canonical fixed-point scale.
pub const X128_BITS: u32 = 128;
/// 1.0 at canonical scale (2^128).
pub const ONE_X128: U256 = U256([0, 0, 1, 0]);
/// ln(2) at canonical scale, rounded down.
pub const LN2_X128: U256 = U256([0xC9E3_B398_03F2_F6AF, 0xB172_17F7_D1CF_79AB, 0, 0]);

/// Decimal digits every asset balance is rescaled to.
pub const CANONICAL_DECIMALS: u32 = 18;

// packed allocation: 88 fractional bits. "1.0" is the all-ones value, not 2^88.
pub const ALLOCATION_BITS: u32 = 88;
pub const ALLOCATION_ONE: u128 = (1u128 << ALLOCATION_BITS) - 1;
// packed price and slope: Q64.64
pub const PRICE_BITS: u32 = 64;
pub const SLOPE_BITS: u32 = 64;
// packed fee fraction: 0.64, always below 1.0
pub const FEE_BITS: u32 = 64;

const DISPLAY_DECIMALS: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("arithmetic underflow")]
    Underflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("logarithm argument below 1.0")]
    LogDomain,

    #[error("negative value where unsigned expected")]
    Negative,
}

pub fn allocation_to_x128(allocation: u128) -> U256 {
    U256::from(allocation) << (X128_BITS - ALLOCATION_BITS)
}


pub fn price_to_x128(price: u128) -> U256 {
    U256::from(price) << (X128_BITS - PRICE_BITS)
}

pub fn slope_to_x128(slope: u128) -> U256 {
    U256::from(slope) << (X128_BITS - SLOPE_BITS)
}

pub fn fee_to_x128(fee: u64) -> U256 {
    U256::from(fee) << (X128_BITS - FEE_BITS)
}

pub(crate) fn narrow(value: U512) -> Result<U256, MathError> {
    U256::try_from(value).map_err(|_| MathError::Overflow)
}

/// floor(a * b / d) with a 512-bit intermediate product.
pub fn mul_div(a: U256, b: U256, d: U256) -> Result<U256, MathError> {
    if d.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    narrow(a.full_mul(b) / U512::from(d))
}

/// ceil(a * b / d) with a 512-bit intermediate product.
pub fn mul_div_up(a: U256, b: U256, d: U256) -> Result<U256, MathError> {
    if d.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let (quotient, remainder) = a.full_mul(b).div_mod(U512::from(d));
    let quotient = narrow(quotient)?;
    if remainder.is_zero() {
        Ok(quotient)
    } else {
        quotient.checked_add(U256::one()).ok_or(MathError::Overflow)
    }
}

/// Canonical fixed-point product, floored.
pub fn mul_x128(a: U256, b: U256) -> Result<U256, MathError> {
    narrow(a.full_mul(b) >> X128_BITS)
}

// 2 * atanh(z) = 2 * (z + z^3/3 + z^5/5 + ...). z must be below 1/2 so the
// loop ends once the next term floors to zero.
fn atanh_series_x2(z: U256) -> U256 {
    let z_squared = (z * z) >> X128_BITS;
    let mut term = z;
    let mut sum = U256::zero();
    let mut divisor = 1u64;
    while !term.is_zero() {
        sum += term / U256::from(divisor);
        term = (term * z_squared) >> X128_BITS;
        divisor += 2;
    }
    sum << 1
}

/// Natural logarithm at canonical scale, for x >= 1.0. Rounds down.
///
/// x = 2^n * y with y in [1, 2), ln(x) = n * ln(2) + 2 * atanh((y - 1) / (y + 1)).
/// The series argument stays below 1/3, so each term shrinks at least ninefold.
pub fn ln(x: U256) -> Result<U256, MathError> {
    if x < ONE_X128 {
        return Err(MathError::LogDomain);
    }
    let exponent = x.bits() - (X128_BITS as usize + 1);
    let mantissa = x >> exponent;
    let z = ((mantissa - ONE_X128) << X128_BITS) / (mantissa + ONE_X128);
    let integer_part = U256::from(exponent as u64) * LN2_X128;
    Ok(integer_part + atanh_series_x2(z))
}

/// Base-2 logarithm at canonical scale, for x >= 1.0. Rounds down.
pub fn log2(x: U256) -> Result<U256, MathError> {
    mul_div(ln(x)?, ONE_X128, LN2_X128)
}

/// ln(numerator / denominator) for numerator >= denominator > 0.
pub fn ln_ratio(numerator: U256, denominator: U256) -> Result<U256, MathError> {
    if numerator < denominator {
        return Err(MathError::LogDomain);
    }
    ln(mul_div(numerator, ONE_X128, denominator)?)
}

pub fn pow10(exponent: u32) -> Result<U256, MathError> {
    U256::from(10u64)
        .checked_pow(U256::from(exponent))
        .ok_or(MathError::Overflow)
}

/// Rescales an integer amount between decimal precisions, flooring on precision loss.
pub fn scale_decimals(amount: U256, from_digits: u32, to_digits: u32) -> Result<U256, MathError> {
    use std::cmp::Ordering;
    match from_digits.cmp(&to_digits) {
        Ordering::Equal => Ok(amount),
        Ordering::Less => amount
            .checked_mul(pow10(to_digits - from_digits)?)
            .ok_or(MathError::Overflow),
        Ordering::Greater => Ok(amount / pow10(from_digits - to_digits)?),
    }
}

/// Same as `scale_decimals` but rounds up when precision is lost.
pub fn scale_decimals_up(amount: U256, from_digits: u32, to_digits: u32) -> Result<U256, MathError> {
    if from_digits <= to_digits {
        return scale_decimals(amount, from_digits, to_digits);
    }
    let divisor = pow10(from_digits - to_digits)?;
    let (quotient, remainder) = amount.div_mod(divisor);
    if remainder.is_zero() {
        Ok(quotient)
    } else {
        quotient.checked_add(U256::one()).ok_or(MathError::Overflow)
    }
}

/// Human decimal -> fixed point with `frac_bits` fractional bits, floored.
pub fn decimal_to_fixed(value: Decimal, frac_bits: u32) -> Result<U256, MathError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MathError::Negative);
    }
    let mantissa = U256::from(value.mantissa().unsigned_abs());
    mul_div(mantissa, U256::one() << frac_bits, pow10(value.scale())?)
}

/// Fixed point with `frac_bits` fractional bits -> human decimal, 18 digits kept.
pub fn fixed_to_decimal(value: U256, frac_bits: u32) -> Result<Decimal, MathError> {
    let scaled = mul_div(value, pow10(DISPLAY_DECIMALS)?, U256::one() << frac_bits)?;
    amount_to_decimal(scaled, DISPLAY_DECIMALS)
}

/// Integer amount with `decimals` digits -> human decimal.
pub fn amount_to_decimal(amount: U256, decimals: u32) -> Result<Decimal, MathError> {
    if amount.bits() > 96 {
        return Err(MathError::Overflow);
    }
    Decimal::try_from_i128_with_scale(amount.as_u128() as i128, decimals)
        .map(|d| d.normalize())
        .map_err(|_| MathError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::MathematicalOps;
    use rust_decimal_macros::dec;

    fn x128_to_f64(value: U256) -> f64 {
        let bits = value.bits();
        if bits <= 64 {
            value.low_u64() as f64 / 2f64.powi(128)
        } else {
            let shift = bits - 64;
            (value >> shift).low_u64() as f64 * 2f64.powi(shift as i32 - 128)
        }
    }

    #[test]
    fn ln2_constant_matches_series() {
        // ln(2) = 2 * atanh(1/3)
        let third = ONE_X128 / U256::from(3u64);
        let series = atanh_series_x2(third);
        let diff = if series > LN2_X128 { series - LN2_X128 } else { LN2_X128 - series };
        assert!(diff < U256::from(1024u64), "ln2 drift {}", diff);
    }

    #[test]
    fn ln_of_one_is_zero() {
        assert_eq!(ln(ONE_X128).unwrap(), U256::zero());
        assert_eq!(log2(ONE_X128).unwrap(), U256::zero());
    }

    #[test]
    fn ln_below_one_rejected() {
        assert_eq!(ln(ONE_X128 - U256::one()), Err(MathError::LogDomain));
        assert_eq!(ln_ratio(U256::from(9u64), U256::from(10u64)), Err(MathError::LogDomain));
    }

    #[test]
    fn log2_of_powers_of_two() {
        for n in [1u64, 2, 7, 64, 100] {
            let x = ONE_X128 << n as usize;
            let got = log2(x).unwrap();
            let expected = U256::from(n) * ONE_X128;
            let diff = if got > expected { got - expected } else { expected - got };
            // one part in 2^100 of an integer result
            assert!(diff < (ONE_X128 >> 100), "log2(2^{}) off by {}", n, diff);
        }
    }

    #[test]
    fn ln_matches_f64_reference() {
        for (num, den) in [(3u64, 2u64), (11, 10), (1_000_001, 1_000_000), (7, 1), (1 << 40, 3)] {
            let got = x128_to_f64(ln_ratio(U256::from(num), U256::from(den)).unwrap());
            let u = (num - den) as f64 / den as f64;
            let expected = u.ln_1p();
            assert!(((got - expected) / expected).abs() < 1e-12, "ln({}/{}) = {} vs {}", num, den, got, expected);
        }
    }

    #[test]
    fn ln_matches_decimal_reference() {
        let got = ln_ratio(U256::from(5u64), U256::from(4u64)).unwrap();
        let got = fixed_to_decimal(got, X128_BITS).unwrap();
        let expected = dec!(1.25).ln();
        assert!(((got - expected) / expected).abs() < dec!(0.000000001));
    }

    #[test]
    fn ln_tiny_ratio_keeps_relative_precision() {
        let den = U256::from(10u64).pow(U256::from(24u64));
        let num = den + U256::from(10u64).pow(U256::from(12u64));
        let got = x128_to_f64(ln_ratio(num, den).unwrap());
        let expected = 1e-12f64.ln_1p();
        assert!(((got - expected) / expected).abs() < 1e-12);
    }

    #[test]
    fn mul_div_rounding() {
        let seven = U256::from(7u64);
        let two = U256::from(2u64);
        assert_eq!(mul_div(seven, U256::one(), two).unwrap(), U256::from(3u64));
        assert_eq!(mul_div_up(seven, U256::one(), two).unwrap(), U256::from(4u64));
        assert_eq!(mul_div(seven, seven, U256::zero()), Err(MathError::DivisionByZero));
    }

    #[test]
    fn mul_div_survives_wide_products() {
        let big = U256::MAX >> 1;
        assert_eq!(mul_div(big, ONE_X128, ONE_X128).unwrap(), big);
        assert_eq!(mul_div(U256::MAX, U256::MAX, U256::one()), Err(MathError::Overflow));
    }

    #[test]
    fn scale_decimals_floors_and_ceils() {
        let amount = U256::from(1_234_567u64);
        assert_eq!(scale_decimals(amount, 6, 18).unwrap(), U256::from(1_234_567_000_000_000_000u64));
        assert_eq!(scale_decimals(amount, 6, 3).unwrap(), U256::from(1_234u64));
        assert_eq!(scale_decimals_up(amount, 6, 3).unwrap(), U256::from(1_235u64));
        assert_eq!(scale_decimals_up(U256::from(1_234_000u64), 6, 3).unwrap(), U256::from(1_234u64));
        assert_eq!(scale_decimals(amount, 18, 18).unwrap(), amount);
        assert_eq!(scale_decimals(U256::MAX, 0, 18), Err(MathError::Overflow));
    }

    #[test]
    fn packed_widths_widen_to_canonical() {
        assert_eq!(price_to_x128(1u128 << PRICE_BITS), ONE_X128);
        assert_eq!(fee_to_x128(1u64 << 63), ONE_X128 / U256::from(2u64));
        assert_eq!(allocation_to_x128(1u128 << 87), ONE_X128 / U256::from(2u64));
        // the all-ones sentinel sits just under canonical 1.0
        assert!(allocation_to_x128(ALLOCATION_ONE) < ONE_X128);
    }

    #[test]
    fn decimal_round_trip() {
        let price = decimal_to_fixed(dec!(1.1), PRICE_BITS).unwrap();
        let back = fixed_to_decimal(price, PRICE_BITS).unwrap();
        assert!((back - dec!(1.1)).abs() < dec!(0.000000000000001));
        assert_eq!(decimal_to_fixed(dec!(-0.5), PRICE_BITS), Err(MathError::Negative));
        assert_eq!(amount_to_decimal(U256::from(1_500_000u64), 6).unwrap(), dec!(1.5));
    }
}
