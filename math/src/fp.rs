//! Prime field elements with lazy reduction.
//!
//! An [`Fp`] stores a [`Big`] in the internal form selected by its
//! [`Modulus`]: a Montgomery residue for standard primes, the raw value for
//! the Mersenne families. Additions and subtractions let the value grow past
//! `p`; the growth is tracked as an [`Excess`] and collapsed by a full
//! reduction only when the next operation could overflow.

use std::fmt;
use std::ops::Add;
use std::ops::AddAssign;
use std::ops::Mul;
use std::ops::MulAssign;
use std::ops::Neg;
use std::ops::Sub;
use std::ops::SubAssign;

use num_bigint::BigUint;
use serde::Serialize;
use serde::Serializer;
use subtle::Choice;
use subtle::ConditionallySelectable;
use subtle::ConstantTimeEq;

use crate::big::Big;
use crate::error::FieldError;
use crate::error::ParseFieldElementError;
use crate::error::Result;
use crate::modulus::Modulus;
use crate::reduce::Excess;
use crate::reduce::SmallMul;
use crate::traits::FiniteField;
use crate::traits::Inverse;
use crate::traits::ModPowU64;
use crate::traits::SquareRoot;

/// An element of the prime field defined by a borrowed [`Modulus`].
#[derive(Clone, Copy)]
pub struct Fp<'m, const N: usize> {
    x: Big<N>,
    modulus: &'m Modulus<N>,
}

impl<'m, const N: usize> Fp<'m, N> {
    pub fn zero(modulus: &'m Modulus<N>) -> Self {
        Self {
            x: Big::zero(),
            modulus,
        }
    }

    pub fn one(modulus: &'m Modulus<N>) -> Self {
        Self::from_big(&Big::one(), modulus)
    }

    pub fn from_int(n: i32, modulus: &'m Modulus<N>) -> Self {
        let magnitude = Big::from_u64(u64::from(n.unsigned_abs()));
        let mut fp = Self::from_big(&magnitude, modulus);
        if n < 0 {
            fp.negate();
        }
        fp
    }

    /// Element congruent to `v`, which may exceed `p`.
    pub fn from_big(v: &Big<N>, modulus: &'m Modulus<N>) -> Self {
        let mut x = *v;
        modulus.reduce_full(&mut x);
        modulus.to_internal(&mut x);
        Self { x, modulus }
    }

    pub fn from_biguint(v: &BigUint, modulus: &'m Modulus<N>) -> Self {
        let r = v % modulus.p.to_biguint();
        let mut x = Big::from_biguint_truncated(&r);
        modulus.to_internal(&mut x);
        Self { x, modulus }
    }

    /// Parse a canonical hexadecimal value in `[0, p)`.
    pub fn from_hex(s: &str, modulus: &'m Modulus<N>) -> Result<Self> {
        let v = Big::from_hex(s)?;
        if v.comp(&modulus.p).is_ge() {
            let err = ParseFieldElementError::NotCanonical(s.to_string());
            return Err(err.into());
        }
        Ok(Self::from_big(&v, modulus))
    }

    pub fn modulus(&self) -> &'m Modulus<N> {
        self.modulus
    }

    /// The stored value, in internal form and possibly not fully reduced.
    pub fn as_internal(&self) -> &Big<N> {
        &self.x
    }

    /// The canonical value in `[0, p)`.
    pub fn to_canonical(&self) -> Big<N> {
        self.modulus.to_canonical(&self.x)
    }

    pub fn to_biguint(&self) -> BigUint {
        self.to_canonical().to_biguint()
    }

    pub fn excess(&self) -> Excess {
        self.modulus.excess(&self.x)
    }

    /// Collapse any accumulated excess, leaving the stored value below `p`.
    pub fn reduce(&mut self) {
        self.modulus.reduce_full(&mut self.x);
    }

    pub fn is_zero(&self) -> bool {
        let mut t = self.x;
        self.modulus.reduce_full(&mut t);
        t.ct_eq(&Big::zero()).into()
    }

    pub fn is_one(&self) -> bool {
        *self == Self::one(self.modulus)
    }

    /// Exchange `self` and `other` when `choice` is set, with the same
    /// memory accesses either way.
    pub fn conditional_swap(&mut self, other: &mut Self, choice: Choice) {
        self.x.cswap(&mut other.x, choice);
    }

    /// Overwrite `self` with `other` when `choice` is set, with the same
    /// memory accesses either way.
    pub fn conditional_copy(&mut self, other: &Self, choice: Choice) {
        self.x.cmove(&other.x, choice);
    }

    fn same_modulus(&self, other: &Self) -> bool {
        std::ptr::eq(self.modulus, other.modulus)
            || self.modulus == other.modulus
    }

    fn add_mod(&mut self, rhs: &Self) {
        debug_assert!(self.same_modulus(rhs), "operands use different moduli");
        let m = self.modulus;
        self.x.add(&rhs.x);
        self.x.norm();
        if m.sum_needs_reduction(self.excess()) {
            self.reduce();
        }
    }

    fn sub_mod(&mut self, rhs: &Self) {
        let mut n = *rhs;
        n.negate();
        self.add_mod(&n);
    }

    fn mul_mod(&mut self, rhs: &Self) {
        debug_assert!(self.same_modulus(rhs), "operands use different moduli");
        let m = self.modulus;
        let mut b = rhs.x;
        b.norm();
        self.x.norm();
        let (ea, eb) = (self.excess(), m.excess(&b));
        if m.product_needs_reduction(ea, eb) {
            log::trace!(
                "reducing before product, excess {} and {}",
                ea.get(),
                eb.get()
            );
            self.reduce();
        }
        self.x = m.reduce_wide(&self.x.mul(&b));
    }

    /// `self = -self`
    ///
    /// Subtracts from `p` shifted just far enough to stay above the current
    /// value, so the result is non-negative without a full reduction.
    pub fn negate(&mut self) {
        let m = self.modulus;
        self.x.norm();
        let mut lifted = m.p;
        lifted.shl(m.negation_shift(self.excess()));
        self.x.rsub(&lifted);
        self.x.norm();
        if m.negation_needs_reduction(self.excess()) {
            self.reduce();
        }
    }

    /// `self = self^2`
    pub fn square(&mut self) {
        let m = self.modulus;
        self.x.norm();
        let e = self.excess();
        if m.product_needs_reduction(e, e) {
            log::trace!("reducing before square, excess {}", e.get());
            self.reduce();
        }
        self.x = m.reduce_wide(&self.x.sqr());
    }

    #[must_use]
    pub fn squared(&self) -> Self {
        let mut r = *self;
        r.square();
        r
    }

    /// `self = c * self` for a small public constant `c`.
    pub fn scalar_mul(&mut self, c: i32) {
        let m = self.modulus;
        let k = i64::from(c.unsigned_abs());
        match m.small_mul_plan(self.excess(), k) {
            SmallMul::Limbwise => self.x.imul(k),
            SmallMul::Carrying => {
                let carry = self.x.pmul(k);
                debug_assert_eq!(0, carry);
            }
            SmallMul::Wide => self.x = self.x.pxmul(k).dmod(&m.p),
        }
        self.x.norm();
        if c < 0 {
            self.negate();
        }
    }

    /// `self = self / 2`, without branching on the parity of the value.
    pub fn halve(&mut self) {
        let m = self.modulus;
        self.x.norm();
        let mut t = self.x;
        t.add(&m.p);
        t.norm();
        let odd = Choice::from(self.x.parity());
        self.x.cmove(&t, odd);
        self.x.shr(1);
    }

    /// Replace `self` by its multiplicative inverse.
    pub fn invert(&mut self) -> Result<()> {
        let m = self.modulus;
        let mut c = self.to_canonical();
        if c.is_zero() || !c.invmodp(&m.p) {
            return Err(FieldError::NotInvertible);
        }
        m.to_internal(&mut c);
        self.x = c;
        Ok(())
    }

    /// `self^e` by right-to-left square-and-multiply.
    ///
    /// The sequence of operations depends on `e`; use [`Self::pow_ct`] for
    /// secret exponents.
    #[must_use]
    pub fn pow(&self, e: &Big<N>) -> Self {
        let mut e = *e;
        e.norm();
        let mut r = Self::one(self.modulus);
        let mut base = *self;
        loop {
            if e.parity() == 1 {
                r *= base;
            }
            e.shr(1);
            if e.is_zero() {
                break;
            }
            base.square();
        }
        r.reduce();
        r
    }

    /// `self^e` by a Montgomery ladder over every bit position of `e`.
    #[must_use]
    pub fn pow_ct(&self, e: &Big<N>) -> Self {
        let mut e = *e;
        e.norm();
        let mut r0 = Self::one(self.modulus);
        let mut r1 = *self;
        for i in (0..Big::<N>::CAPACITY).rev() {
            let bit = Choice::from(e.bit(i));
            r0.conditional_swap(&mut r1, bit);
            r1 *= r0;
            r0.square();
            r0.conditional_swap(&mut r1, bit);
        }
        r0.reduce();
        r0
    }

    /// A square root of `self` if one exists. The result is not checked;
    /// see [`SquareRoot::sqrt`].
    #[must_use]
    pub fn sqrt_candidate(&self) -> Self {
        let m = self.modulus;
        let mut a = *self;
        a.reduce();
        if m.mod8() == 5 {
            // Atkin: v = (2a)^((p-5)/8), i = 2av^2, root = av(i - 1)
            let mut e = m.p;
            e.dec(5);
            e.norm();
            e.shr(3);
            let mut i = a + a;
            let v = i.pow(&e);
            i *= v;
            i *= v;
            i -= Self::one(m);
            let mut r = a * v;
            r *= i;
            r.reduce();
            r
        } else {
            let mut e = m.p;
            e.inc(1);
            e.norm();
            e.shr(2);
            a.pow(&e)
        }
    }

    /// Jacobi symbol `(self / p)`: `0` for zero, `1` for non-zero squares and
    /// `-1` otherwise.
    pub fn jacobi(&self) -> i32 {
        self.to_canonical().jacobi(&self.modulus.p)
    }
}

impl<const N: usize> Inverse for Fp<'_, N> {
    fn inverse(&self) -> Result<Self> {
        let mut r = *self;
        r.invert()?;
        Ok(r)
    }

    fn inverse_or_zero(&self) -> Self {
        self.inverse().unwrap_or_else(|_| Self::zero(self.modulus))
    }
}

impl<const N: usize> ModPowU64 for Fp<'_, N> {
    fn mod_pow_u64(&self, pow: u64) -> Self {
        let mut r = Self::one(self.modulus);
        let mut base = *self;
        let mut e = pow;
        while e != 0 {
            if e & 1 == 1 {
                r *= base;
            }
            e >>= 1;
            if e != 0 {
                base.square();
            }
        }
        r.reduce();
        r
    }
}

impl<const N: usize> SquareRoot for Fp<'_, N> {
    fn sqrt(&self) -> Result<Self> {
        let mod8 = self.modulus.mod8();
        if mod8 == 1 {
            return Err(FieldError::UnsupportedSqrt { mod8 });
        }
        let r = self.sqrt_candidate();
        if r.squared() == *self {
            Ok(r)
        } else {
            Err(FieldError::NonResidue)
        }
    }

    fn is_square(&self) -> bool {
        self.jacobi() != -1
    }
}

impl<const N: usize> FiniteField for Fp<'_, N> {}

impl<const N: usize> ConstantTimeEq for Fp<'_, N> {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.to_canonical().ct_eq(&other.to_canonical())
    }
}

impl<const N: usize> PartialEq for Fp<'_, N> {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl<const N: usize> Eq for Fp<'_, N> {}

impl<const N: usize> ConditionallySelectable for Fp<'_, N> {
    fn conditional_select(a: &Self, b: &Self, choice: Choice) -> Self {
        let mut r = *a;
        r.conditional_copy(b, choice);
        r
    }
}

/// Canonical value in hex, zero-padded to the width of the modulus.
impl<const N: usize> fmt::Display for Fp<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.modulus.bits().div_ceil(4);
        write!(f, "{:0width$x}", self.to_canonical())
    }
}

impl<const N: usize> fmt::Debug for Fp<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fp({:#x})", self.to_canonical())
    }
}

impl<const N: usize> Serialize for Fp<'_, N> {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_canonical().serialize(serializer)
    }
}

macro_rules! impl_binary_op {
    (
        $op:ident,
        $method:ident,
        $op_assign:ident,
        $method_assign:ident,
        $kernel:ident
    ) => {
        impl<'m, const N: usize> $op_assign<&Fp<'m, N>> for Fp<'m, N> {
            #[inline]
            fn $method_assign(&mut self, rhs: &Fp<'m, N>) {
                self.$kernel(rhs);
            }
        }

        impl<'m, const N: usize> $op_assign for Fp<'m, N> {
            #[inline]
            fn $method_assign(&mut self, rhs: Self) {
                self.$kernel(&rhs);
            }
        }

        impl<'m, const N: usize> $op<&Fp<'m, N>> for Fp<'m, N> {
            type Output = Self;

            #[inline]
            fn $method(mut self, rhs: &Fp<'m, N>) -> Self {
                self.$kernel(rhs);
                self
            }
        }

        impl<'m, const N: usize> $op for Fp<'m, N> {
            type Output = Self;

            #[inline]
            fn $method(mut self, rhs: Self) -> Self {
                self.$kernel(&rhs);
                self
            }
        }
    };
}

impl_binary_op!(Add, add, AddAssign, add_assign, add_mod);
impl_binary_op!(Sub, sub, SubAssign, sub_assign, sub_mod);
impl_binary_op!(Mul, mul, MulAssign, mul_assign, mul_mod);

impl<const N: usize> Mul<i32> for Fp<'_, N> {
    type Output = Self;

    fn mul(mut self, rhs: i32) -> Self {
        self.scalar_mul(rhs);
        self
    }
}

impl<const N: usize> Neg for Fp<'_, N> {
    type Output = Self;

    #[inline]
    fn neg(mut self) -> Self {
        self.negate();
        self
    }
}
