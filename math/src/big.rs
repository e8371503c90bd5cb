//! Fixed-width multi-limb integers.
//!
//! [`Big<N>`] holds `N` limbs of [`BASEBITS`] bits; [`DBig<N>`] holds twice
//! as many and receives full products. Values handed out through the public
//! API are normalized and non-negative. The arithmetic used by the field
//! layer is crate-private and may leave carries unpropagated until the next
//! normalization.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigUint;
use serde::de;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use subtle::Choice;
use subtle::ConstantTimeEq;

use crate::error::ParseFieldElementError;
use crate::limbs;
use crate::limbs::Limbs;
use crate::limbs::BASEBITS;
use crate::limbs::BMASK;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Single-width integer of `N` limbs.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Big<const N: usize> {
    w: [i64; N],
}

/// Double-width integer of `2 * N` limbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DBig<const N: usize> {
    w: [[i64; N]; 2],
}

impl<const N: usize> Limbs for Big<N> {
    #[inline]
    fn limbs(&self) -> &[i64] {
        &self.w
    }

    #[inline]
    fn limbs_mut(&mut self) -> &mut [i64] {
        &mut self.w
    }
}

impl<const N: usize> Limbs for DBig<N> {
    #[inline]
    fn limbs(&self) -> &[i64] {
        self.w.as_flattened()
    }

    #[inline]
    fn limbs_mut(&mut self) -> &mut [i64] {
        self.w.as_flattened_mut()
    }
}

impl<const N: usize> Default for Big<N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const N: usize> Big<N> {
    /// Total number of value bits.
    pub const CAPACITY: usize = N * BASEBITS;

    pub const fn zero() -> Self {
        Self { w: [0; N] }
    }

    pub const fn one() -> Self {
        let mut w = [0; N];
        w[0] = 1;
        Self { w }
    }

    /// Build from a `u64`, keeping its low [`Self::CAPACITY`] bits.
    pub fn from_u64(value: u64) -> Self {
        let mut w = [0; N];
        let mut v = value;
        for limb in &mut w {
            *limb = (v & BMASK as u64) as i64;
            v >>= BASEBITS;
        }
        Self { w }
    }

    /// Parse a hexadecimal string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, ParseFieldElementError> {
        let digits = s.trim().trim_start_matches("0x");
        let value = BigUint::parse_bytes(digits.as_bytes(), 16)
            .ok_or_else(|| ParseFieldElementError::InvalidHex(s.to_string()))?;
        Self::try_from(&value)
    }

    /// Build from a `BigUint`, keeping its low [`Self::CAPACITY`] bits.
    pub(crate) fn from_biguint_truncated(value: &BigUint) -> Self {
        let digits = value.to_u64_digits();
        let digit = |i: usize| digits.get(i).copied().unwrap_or(0);
        let mut w = [0; N];
        for (i, limb) in w.iter_mut().enumerate() {
            let pos = i * BASEBITS;
            let (word, offset) = (pos / 64, pos % 64);
            let mut bits = digit(word) >> offset;
            if offset > 64 - BASEBITS {
                bits |= digit(word + 1) << (64 - offset);
            }
            *limb = (bits & BMASK as u64) as i64;
        }
        Self { w }
    }

    pub fn to_biguint(&self) -> BigUint {
        let mut t = *self;
        t.norm();
        t.w.iter().rev().fold(BigUint::default(), |acc, &limb| {
            (acc << BASEBITS) + BigUint::from(limb as u64)
        })
    }

    pub fn is_zero(&self) -> bool {
        limbs::is_zero(&self.w)
    }

    pub fn is_one(&self) -> bool {
        *self == Self::one()
    }

    /// Lowest bit of a normalized value.
    pub fn parity(&self) -> u8 {
        (self.w[0] & 1) as u8
    }

    /// Bit `i` of a normalized value.
    pub fn bit(&self, i: usize) -> u8 {
        let (limb, offset) = (i / BASEBITS, i % BASEBITS);
        match self.w.get(limb) {
            Some(&l) => ((l >> offset) & 1) as u8,
            None => 0,
        }
    }

    /// Bit length of a normalized value.
    pub fn nbits(&self) -> usize {
        limbs::nbits(&self.w)
    }

    #[inline]
    pub(crate) fn limb(&self, i: usize) -> i64 {
        self.w[i]
    }

    #[inline]
    pub(crate) fn top(&self) -> i64 {
        self.w[N - 1]
    }

    #[inline]
    pub(crate) fn norm(&mut self) {
        limbs::norm(&mut self.w);
    }

    pub(crate) fn comp(&self, other: &Self) -> Ordering {
        limbs::comp(&self.w, &other.w)
    }

    #[inline]
    pub(crate) fn add(&mut self, other: &Self) {
        limbs::add(&mut self.w, &other.w);
    }

    #[inline]
    pub(crate) fn sub(&mut self, other: &Self) {
        limbs::sub(&mut self.w, &other.w);
    }

    /// `self = m - self`
    pub(crate) fn rsub(&mut self, m: &Self) {
        let mut r = *m;
        r.sub(self);
        *self = r;
    }

    pub(crate) fn inc(&mut self, k: i64) {
        self.w[0] += k;
    }

    pub(crate) fn dec(&mut self, k: i64) {
        self.w[0] -= k;
    }

    pub(crate) fn shl(&mut self, k: usize) {
        limbs::shl(&mut self.w, k);
    }

    pub(crate) fn shr(&mut self, k: usize) {
        limbs::shr(&mut self.w, k);
    }

    /// Limb-wise multiply by a small constant without carrying. Each limb
    /// must stay below `2^63`, which holds for `c` under
    /// [`SMALL_MUL_LIMIT`](crate::modulus::SMALL_MUL_LIMIT) on a normalized
    /// value.
    pub(crate) fn imul(&mut self, c: i64) {
        for limb in &mut self.w {
            *limb *= c;
        }
    }

    /// Multiply by `c < 2^BASEBITS` with carry propagation, returning the
    /// carry out of the top limb.
    pub(crate) fn pmul(&mut self, c: i64) -> i64 {
        let mut carry: i128 = 0;
        for limb in &mut self.w {
            let t = *limb as i128 * c as i128 + carry;
            *limb = (t & BMASK as i128) as i64;
            carry = t >> BASEBITS;
        }
        carry as i64
    }

    /// Multiply by `c < 2^BASEBITS` into a double-width result.
    pub(crate) fn pxmul(&self, c: i64) -> DBig<N> {
        let mut d = DBig::zero();
        let w = d.limbs_mut();
        let mut carry: i128 = 0;
        for (i, &limb) in self.w.iter().enumerate() {
            let t = limb as i128 * c as i128 + carry;
            w[i] = (t & BMASK as i128) as i64;
            carry = t >> BASEBITS;
        }
        w[N] = carry as i64;
        d
    }

    /// Full product of two normalized, non-negative values.
    pub(crate) fn mul(&self, other: &Self) -> DBig<N> {
        let (a, b) = (&self.w, &other.w);
        let mut d = DBig::zero();
        let w = d.limbs_mut();
        let mut carry: i128 = 0;
        for k in 0..2 * N - 1 {
            let mut acc = carry;
            for i in k.saturating_sub(N - 1)..=k.min(N - 1) {
                acc += a[i] as i128 * b[k - i] as i128;
            }
            w[k] = (acc & BMASK as i128) as i64;
            carry = acc >> BASEBITS;
        }
        w[2 * N - 1] = carry as i64;
        d
    }

    /// Full square of a normalized, non-negative value.
    pub(crate) fn sqr(&self) -> DBig<N> {
        let a = &self.w;
        let mut d = DBig::zero();
        let w = d.limbs_mut();
        let mut carry: i128 = 0;
        for k in 0..2 * N - 1 {
            let mut cross: i128 = 0;
            let lo = k.saturating_sub(N - 1);
            for i in lo..=k.min(N - 1) {
                let j = k - i;
                if i >= j {
                    break;
                }
                cross += a[i] as i128 * a[j] as i128;
            }
            let mut acc = carry + 2 * cross;
            if k % 2 == 0 {
                acc += a[k / 2] as i128 * a[k / 2] as i128;
            }
            w[k] = (acc & BMASK as i128) as i64;
            carry = acc >> BASEBITS;
        }
        w[2 * N - 1] = carry as i64;
        d
    }

    /// `self = self mod m`
    pub(crate) fn rmod(&mut self, m: &Self) {
        limbs::rem(self, m);
    }

    /// `self = self mod m` with a round count fixed by `shift`, for
    /// `self < m * 2^(shift + 1)`.
    pub(crate) fn rmod_fixed(&mut self, m: &Self, shift: usize) {
        limbs::rem_fixed(self, m, shift);
    }

    pub(crate) fn cswap(&mut self, other: &mut Self, choice: Choice) {
        limbs::cswap(&mut self.w, &mut other.w, choice);
    }

    pub(crate) fn cmove(&mut self, other: &Self, choice: Choice) {
        limbs::cmove(&mut self.w, &other.w, choice);
    }

    /// Replace `self` by its inverse modulo `p`, by binary extended Euclid.
    ///
    /// Returns `false`, leaving `self` reduced, when no inverse exists.
    pub(crate) fn invmodp(&mut self, p: &Self) -> bool {
        self.rmod(p);
        let one = Self::one();
        let mut u = *self;
        let mut v = *p;
        let mut x1 = one;
        let mut x2 = Self::zero();
        while !u.is_one() && !v.is_one() {
            if u.is_zero() || v.is_zero() {
                return false;
            }
            while u.parity() == 0 {
                u.shr(1);
                x1.halve_mod(p);
            }
            while v.parity() == 0 {
                v.shr(1);
                x2.halve_mod(p);
            }
            if u.comp(&v) != Ordering::Less {
                u.sub(&v);
                u.norm();
                x1.sub_mod(&x2, p);
            } else {
                v.sub(&u);
                v.norm();
                x2.sub_mod(&x1, p);
            }
        }
        *self = if u.is_one() { x1 } else { x2 };
        true
    }

    fn halve_mod(&mut self, p: &Self) {
        if self.parity() == 1 {
            self.add(p);
            self.norm();
        }
        self.shr(1);
    }

    fn sub_mod(&mut self, other: &Self, p: &Self) {
        if self.comp(other) == Ordering::Less {
            self.add(p);
        }
        self.sub(other);
        self.norm();
    }

    /// Jacobi symbol `(self / p)` for odd positive `p`.
    pub(crate) fn jacobi(&self, p: &Self) -> i32 {
        if p.parity() == 0 || p.is_zero() {
            return 0;
        }
        let mut a = *self;
        a.rmod(p);
        let mut n = *p;
        let mut t = 1;
        while !a.is_zero() {
            while a.parity() == 0 {
                a.shr(1);
                let r = n.w[0] & 7;
                if r == 3 || r == 5 {
                    t = -t;
                }
            }
            std::mem::swap(&mut a, &mut n);
            if a.w[0] & 3 == 3 && n.w[0] & 3 == 3 {
                t = -t;
            }
            a.rmod(&n);
        }
        if n.is_one() {
            t
        } else {
            0
        }
    }

    fn nibble(&self, d: usize) -> u8 {
        let pos = 4 * d;
        let (limb, offset) = if pos / BASEBITS < N {
            (pos / BASEBITS, pos % BASEBITS)
        } else {
            (N - 1, pos - (N - 1) * BASEBITS)
        };
        ((self.w[limb] >> offset) & 0xf) as u8
    }
}

impl<const N: usize> TryFrom<&BigUint> for Big<N> {
    type Error = ParseFieldElementError;

    fn try_from(value: &BigUint) -> Result<Self, Self::Error> {
        if value.bits() > Self::CAPACITY as u64 {
            return Err(ParseFieldElementError::TooWide {
                bits: value.bits(),
                capacity: Self::CAPACITY,
            });
        }
        Ok(Self::from_biguint_truncated(value))
    }
}

impl<const N: usize> ConstantTimeEq for Big<N> {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.w[..].ct_eq(&other.w[..])
    }
}

impl<const N: usize> fmt::LowerHex for Big<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut t = *self;
        t.norm();
        let digits = t.nbits().div_ceil(4).max(1);
        let s: String = (0..digits)
            .rev()
            .map(|d| HEX_DIGITS[usize::from(t.nibble(d))] as char)
            .collect();
        f.pad_integral(true, "0x", &s)
    }
}

/// Fixed-width rendering: every limb contributes `BASEBITS / 4` hex digits.
impl<const N: usize> fmt::Display for Big<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:0width$x}", width = N * BASEBITS / 4)
    }
}

impl<const N: usize> fmt::Debug for Big<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Big({self:#x})")
    }
}

impl<const N: usize> Serialize for Big<N> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&format_args!("{self:x}"))
    }
}

impl<'de, const N: usize> Deserialize<'de> for Big<N> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

impl<const N: usize> DBig<N> {
    pub const fn zero() -> Self {
        Self { w: [[0; N]; 2] }
    }

    pub(crate) fn from_big(x: &Big<N>) -> Self {
        Self { w: [x.w, [0; N]] }
    }

    /// Low half as a single-width value. The high half must be zero.
    pub(crate) fn low(&self) -> Big<N> {
        Big { w: self.w[0] }
    }

    /// High half as a single-width value.
    pub(crate) fn high(&self) -> Big<N> {
        Big { w: self.w[1] }
    }

    pub(crate) fn norm(&mut self) {
        limbs::norm(self.limbs_mut());
    }

    pub(crate) fn add(&mut self, other: &Self) {
        limbs::add(self.limbs_mut(), other.limbs());
    }

    pub(crate) fn shl(&mut self, k: usize) {
        limbs::shl(self.limbs_mut(), k);
    }

    /// Split a normalized value at bit `k` into `(low, high)` parts.
    pub(crate) fn split(&self, k: usize) -> (Self, Self) {
        let mut lo = *self;
        limbs::truncate(lo.limbs_mut(), k);
        let mut hi = *self;
        limbs::shr(hi.limbs_mut(), k);
        (lo, hi)
    }

    /// Multiply a normalized value by `c < 2^BASEBITS`; the carry lands in
    /// the unmasked top limb.
    pub(crate) fn pmul(&mut self, c: i64) {
        let w = self.limbs_mut();
        let top = w.len() - 1;
        let mut carry: i128 = 0;
        for limb in &mut w[..top] {
            let t = *limb as i128 * c as i128 + carry;
            *limb = (t & BMASK as i128) as i64;
            carry = t >> BASEBITS;
        }
        w[top] = (w[top] as i128 * c as i128 + carry) as i64;
    }

    /// Generic reduction of a non-negative value modulo `m`.
    pub(crate) fn dmod(&self, m: &Big<N>) -> Big<N> {
        let mut x = *self;
        limbs::rem(&mut x, &Self::from_big(m));
        x.low()
    }
}

#[cfg(test)]
mod tests {
    use num_traits::One;
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;

    type B4 = Big<4>;

    fn value() -> impl Strategy<Value = BigUint> {
        any::<[u64; 3]>().prop_map(|d| BigUint::from_slice(&to_u32s(&d)))
    }

    fn to_u32s(digits: &[u64]) -> Vec<u32> {
        digits
            .iter()
            .flat_map(|d| [*d as u32, (*d >> 32) as u32])
            .collect()
    }

    fn big(v: &BigUint) -> B4 {
        B4::try_from(v).unwrap()
    }

    #[proptest]
    fn biguint_conversion_preserves_value(#[strategy(value())] v: BigUint) {
        prop_assert_eq!(v.clone(), big(&v).to_biguint());
    }

    #[proptest]
    fn full_product_matches_biguint(
        #[strategy(value())] a: BigUint,
        #[strategy(value())] b: BigUint,
    ) {
        let d = big(&a).mul(&big(&b));
        let mut lo = d.low().to_biguint();
        lo += d.high().to_biguint() << B4::CAPACITY;
        prop_assert_eq!(&a * &b, lo);
    }

    #[proptest]
    fn square_matches_product(#[strategy(value())] a: BigUint) {
        let x = big(&a);
        prop_assert_eq!(x.mul(&x), x.sqr());
    }

    #[proptest]
    fn double_width_reduction_matches_biguint(
        #[strategy(value())] a: BigUint,
        #[strategy(value())] b: BigUint,
        #[strategy(1u64..)] m: u64,
    ) {
        let d = big(&a).mul(&big(&b));
        let r = d.dmod(&B4::from_u64(m));
        prop_assert_eq!((&a * &b) % m, r.to_biguint());
    }

    #[proptest]
    fn single_width_reduction_matches_biguint(
        #[strategy(value())] a: BigUint,
        #[strategy(1u64..)] m: u64,
    ) {
        let mut x = big(&a);
        x.rmod(&B4::from_u64(m));
        prop_assert_eq!(&a % m, x.to_biguint());
    }

    #[test]
    fn from_u64_splits_across_limbs() {
        let x = B4::from_u64(u64::MAX);
        assert_eq!(BigUint::from(u64::MAX), x.to_biguint());
        assert_eq!(64, x.nbits());
        assert_eq!(1, x.bit(63));
        assert_eq!(0, x.bit(64));
    }

    #[test]
    fn modular_inverse_of_small_values() {
        let p = Big::<1>::from_u64(23);
        for a in 1..23u64 {
            let mut x = Big::<1>::from_u64(a);
            assert!(x.invmodp(&p));
            let inv = x.to_biguint();
            assert!((BigUint::from(a) * inv % 23u32).is_one());
        }
        let mut zero = Big::<1>::zero();
        assert!(!zero.invmodp(&p));
    }

    #[test]
    fn modular_inverse_fails_for_shared_factors() {
        let mut x = Big::<1>::from_u64(6);
        assert!(!x.invmodp(&Big::<1>::from_u64(21)));
    }

    #[test]
    fn jacobi_matches_euler_criterion_for_small_prime() {
        let p = Big::<1>::from_u64(23);
        for a in 0..46u64 {
            let expected = match a % 23 {
                0 => 0,
                r if (1..23u64).any(|y| y * y % 23 == r) => 1,
                _ => -1,
            };
            assert_eq!(expected, Big::<1>::from_u64(a).jacobi(&p), "a = {a}");
        }
    }

    #[test]
    fn jacobi_of_composite_modulus() {
        // (2/15) = (2/3)(2/5) = (-1)(-1) = 1, though 2 is not a square mod 15
        let n = Big::<1>::from_u64(15);
        assert_eq!(1, Big::<1>::from_u64(2).jacobi(&n));
        assert_eq!(0, Big::<1>::from_u64(6).jacobi(&n));
    }

    #[test]
    fn hex_rendering_and_parsing() {
        let x = B4::from_hex("0x1f").unwrap();
        assert_eq!("1f", format!("{x:x}"));
        assert_eq!("0x1f", format!("{x:#x}"));
        assert_eq!(56, format!("{x}").len());
        assert_eq!("0", format!("{:x}", B4::zero()));
        assert!(matches!(
            B4::from_hex("xyz"),
            Err(ParseFieldElementError::InvalidHex(_))
        ));
        let too_wide = format!("1{}", "0".repeat(56));
        assert!(matches!(
            B4::from_hex(&too_wide),
            Err(ParseFieldElementError::TooWide { .. })
        ));
    }

    #[test]
    fn serde_uses_hex_strings() {
        let x = B4::from_u64(0xdead_beef);
        let json = serde_json::to_string(&x).unwrap();
        assert_eq!("\"deadbeef\"", json);
        let back: B4 = serde_json::from_str(&json).unwrap();
        assert_eq!(x, back);
    }

    #[test]
    fn small_constant_multiplies_agree() {
        let x = B4::from_hex("ffffffffffffffffffffffffffff").unwrap();
        let m = B4::from_hex("f".repeat(50).as_str()).unwrap();
        let wide = x.pxmul(1000).dmod(&m);

        let mut carried = x;
        assert_eq!(0, carried.pmul(1000));
        let mut limbwise = x;
        limbwise.imul(100);
        limbwise.norm();
        limbwise.pmul(10);

        assert_eq!(carried, limbwise);
        assert_eq!(carried, wide);
    }
}
