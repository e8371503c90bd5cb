use std::fmt::Debug;
use std::fmt::Display;
use std::ops::Add;
use std::ops::AddAssign;
use std::ops::Mul;
use std::ops::MulAssign;
use std::ops::Neg;
use std::ops::Sub;
use std::ops::SubAssign;

use subtle::ConditionallySelectable;
use subtle::ConstantTimeEq;

use crate::error::Result;

pub trait ModPowU64 {
    #[must_use]
    fn mod_pow_u64(&self, pow: u64) -> Self;
}

pub trait Inverse
where
    Self: Sized + Copy,
{
    /// Fails with [`FieldError::NotInvertible`](crate::error::FieldError)
    /// for zero, or for any element sharing a factor with a composite
    /// modulus.
    fn inverse(&self) -> Result<Self>;

    /// The inverse, or zero where [`Self::inverse`] fails.
    fn inverse_or_zero(&self) -> Self;
}

pub trait SquareRoot
where
    Self: Sized,
{
    /// A verified square root.
    fn sqrt(&self) -> Result<Self>;

    fn is_square(&self) -> bool;
}

pub trait AddGroup:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
{
}

impl<T> AddGroup for T where
    T: Copy
        + Add<Output = T>
        + Sub<Output = T>
        + Neg<Output = T>
        + AddAssign
        + SubAssign
{
}

pub trait MulGroup: Copy + Mul<Output = Self> + MulAssign {}

impl<T> MulGroup for T where T: Copy + Mul<Output = T> + MulAssign {}

pub trait FiniteField:
    AddGroup
    + MulGroup
    + Debug
    + Display
    + Eq
    + ConstantTimeEq
    + ConditionallySelectable
    + Inverse
    + ModPowU64
    + SquareRoot
    + Send
    + Sync
{
    /// Invert every element with a single field inversion (Montgomery's
    /// trick).
    ///
    /// Fails with [`FieldError::NotInvertible`](crate::error::FieldError)
    /// when any input is zero. Adapted from
    /// <https://paulmillr.com/posts/noble-secp256k1-fast-ecc/#batch-inversion>.
    fn batch_inversion(mut input: Vec<Self>) -> Result<Vec<Self>> {
        let Some(&first) = input.first() else {
            return Ok(input);
        };

        // prefix[i] = input[0] * ... * input[i]
        let mut prefix = Vec::with_capacity(input.len());
        let mut acc = first;
        prefix.push(acc);
        for value in &input[1..] {
            acc *= *value;
            prefix.push(acc);
        }

        let mut inv = acc.inverse()?;
        for i in (1..input.len()).rev() {
            let current = input[i];
            input[i] = inv * prefix[i - 1];
            inv *= current;
        }
        input[0] = inv;

        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use num_bigint::BigUint;

    use super::*;
    use crate::error::FieldError;
    use crate::fp::Fp;
    use crate::modulus::Modulus;

    static NIST256: LazyLock<Modulus<5>> =
        LazyLock::new(|| Modulus::nist256().unwrap());

    #[test]
    fn batch_inversion_matches_single_inversions() {
        let m = &*NIST256;
        let input: Vec<_> =
            (1..20).map(|i| Fp::from_int(i * 7 - 60, m)).collect();
        let inverted = Fp::batch_inversion(input.clone()).unwrap();
        for (x, y) in input.iter().zip(&inverted) {
            assert_eq!(x.inverse().unwrap(), *y);
            assert!((*x * *y).is_one());
        }
    }

    #[test]
    fn batch_inversion_of_empty_and_single_inputs() {
        let m = &*NIST256;
        let empty: Vec<Fp<'_, 5>> = Vec::new();
        assert!(Fp::batch_inversion(empty).unwrap().is_empty());
        let x = Fp::from_biguint(&BigUint::from(12345u32), m);
        let single = Fp::batch_inversion(vec![x]).unwrap();
        assert_eq!(vec![x.inverse().unwrap()], single);
    }

    #[test]
    fn batch_inversion_rejects_zero() {
        let m = &*NIST256;
        let input = vec![Fp::from_int(3, m), Fp::zero(m), Fp::from_int(5, m)];
        assert_eq!(Err(FieldError::NotInvertible), Fp::batch_inversion(input));
    }
}
