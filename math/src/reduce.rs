//! Reduction engine.
//!
//! Tracks how far a lazily reduced value has grown past the modulus, decides
//! when growth must be collapsed, and folds double-width products back into
//! single-width internal form for each modulus family.

use crate::big::Big;
use crate::big::DBig;
use crate::limbs::Limbs;
use crate::limbs::BASEBITS;
use crate::limbs::BMASK;
use crate::modulus::Modulus;
use crate::modulus::Reducer;
use crate::modulus::SMALL_MUL_LIMIT;

/// How many multiples of `2^m` a value has accumulated on top of the
/// modulus' bit length `m`. A fully reduced value has excess zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Excess(i64);

impl Excess {
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Bit length of the counter, computed without branching on its value.
    fn bit_len(self) -> usize {
        (i64::BITS - self.0.max(0).leading_zeros()) as usize
    }
}

/// Strategy for multiplying by a small public constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SmallMul {
    /// Multiply each limb in place and normalize afterwards.
    Limbwise,
    /// Multiply with carry propagation; the result still fits `N` limbs.
    Carrying,
    /// Widen to double width and reduce modulo `p`.
    Wide,
}

impl<const N: usize> Modulus<N> {
    /// Excess of a normalized, non-negative value.
    pub fn excess(&self, x: &Big<N>) -> Excess {
        Excess(x.top() >> self.excess_shift)
    }

    /// A sum whose excess comes within two of the limit must be reduced
    /// before it can take part in another addition.
    pub(crate) fn sum_needs_reduction(&self, e: Excess) -> bool {
        e.0 + 2 >= self.excess_limit
    }

    pub(crate) fn negation_needs_reduction(&self, e: Excess) -> bool {
        e.0 >= self.excess_limit
    }

    /// Whether operands with excesses `a` and `b` would overflow the
    /// double-width product.
    pub(crate) fn product_needs_reduction(&self, a: Excess, b: Excess) -> bool {
        (a.0 + 1) > self.excess_limit / (b.0 + 1)
    }

    /// Shift that lifts `p` above any value with excess `e`.
    pub(crate) fn negation_shift(&self, e: Excess) -> usize {
        1 + e.bit_len()
    }

    /// Cheapest safe way to multiply a value with excess `e` by `c >= 0`.
    pub(crate) fn small_mul_plan(&self, e: Excess, c: i64) -> SmallMul {
        let grown = (e.0 + 1).saturating_mul(c + 1).saturating_add(1);
        if c < SMALL_MUL_LIMIT && grown < self.excess_limit {
            SmallMul::Limbwise
        } else if grown < self.excess_limit {
            SmallMul::Carrying
        } else {
            SmallMul::Wide
        }
    }

    /// Convert a canonical value in `[0, p)` to internal form.
    pub(crate) fn to_internal(&self, x: &mut Big<N>) {
        if let Reducer::Montgomery { .. } = self.reducer {
            let mut d = DBig::from_big(x);
            d.shl(Big::<N>::CAPACITY);
            *x = d.dmod(&self.p);
        }
    }

    /// Canonical value in `[0, p)` of an internal-form `x`.
    pub(crate) fn to_canonical(&self, x: &Big<N>) -> Big<N> {
        let mut r = match self.reducer {
            Reducer::Montgomery { inv } => self.redc(&DBig::from_big(x), inv),
            _ => *x,
        };
        self.reduce_full(&mut r);
        r
    }

    /// Fully reduce any stored value into `[0, p)`.
    ///
    /// Stored values stay below `2^CAPACITY`, which is at most
    /// `p * 2^(CAPACITY - bits + 1)`, so one fixed round count covers every
    /// excess and the running time does not depend on `x`.
    pub(crate) fn reduce_full(&self, x: &mut Big<N>) {
        x.rmod_fixed(&self.p, Big::<N>::CAPACITY - self.bits);
    }

    /// Reduce a normalized double-width product to a single-width value in
    /// internal form with excess at most one.
    pub(crate) fn reduce_wide(&self, d: &DBig<N>) -> Big<N> {
        match &self.reducer {
            Reducer::Montgomery { inv } => self.redc(d, *inv),
            Reducer::PseudoMersenne { c, rounds } => {
                let mut t = *d;
                for _ in 0..*rounds {
                    let (mut lo, mut hi) = t.split(self.bits);
                    hi.pmul(*c);
                    lo.add(&hi);
                    lo.norm();
                    t = lo;
                }
                t.low()
            }
            Reducer::GeneralisedMersenne { terms, rounds } => {
                let mut t = *d;
                for _ in 0..*rounds {
                    let (mut lo, hi) = t.split(self.bits);
                    for &k in terms {
                        let mut s = hi;
                        s.shl(k);
                        lo.add(&s);
                    }
                    lo.norm();
                    t = lo;
                }
                t.low()
            }
        }
    }

    /// Montgomery reduction `d * R^-1 mod p`, leaving the result below
    /// `d / R + p`.
    fn redc(&self, d: &DBig<N>, inv: i64) -> Big<N> {
        let mut t = *d;
        let w = t.limbs_mut();
        for i in 0..N {
            let m = w[i].wrapping_mul(inv) & BMASK;
            let mut carry: i128 = 0;
            for j in 0..N {
                let s = w[i + j] as i128
                    + m as i128 * self.p.limb(j) as i128
                    + carry;
                w[i + j] = (s & BMASK as i128) as i64;
                carry = s >> BASEBITS;
            }
            w[i + N] += carry as i64;
        }
        t.norm();
        t.high()
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use num_traits::One;
    use proptest::prelude::*;
    use test_strategy::proptest;

    use super::*;
    use crate::modulus::ModulusType;

    fn residue(p: &BigUint) -> impl Strategy<Value = BigUint> {
        let p = p.clone();
        any::<[u32; 16]>().prop_map(move |d| BigUint::from_slice(&d) % &p)
    }

    fn bn254_residue() -> impl Strategy<Value = BigUint> {
        residue(&Modulus::<5>::bn254().unwrap().value().to_biguint())
    }

    fn curve25519_residue() -> impl Strategy<Value = BigUint> {
        residue(&Modulus::<5>::curve25519().unwrap().value().to_biguint())
    }

    fn nist256_residue() -> impl Strategy<Value = BigUint> {
        residue(&Modulus::<5>::nist256().unwrap().value().to_biguint())
    }

    fn check_wide_reduction(m: &Modulus<5>, a: &BigUint, b: &BigUint) {
        let p = m.value().to_biguint();
        let mut x = Big::<5>::try_from(a).unwrap();
        let mut y = Big::<5>::try_from(b).unwrap();
        m.to_internal(&mut x);
        m.to_internal(&mut y);
        let r = m.reduce_wide(&x.mul(&y));
        assert!(m.excess(&r).get() <= 1);
        assert_eq!((a * b) % &p, m.to_canonical(&r).to_biguint());
    }

    #[proptest]
    fn montgomery_products_match_biguint(
        #[strategy(bn254_residue())]
        a: BigUint,
        #[strategy(bn254_residue())]
        b: BigUint,
    ) {
        check_wide_reduction(&Modulus::<5>::bn254().unwrap(), &a, &b);
    }

    #[proptest]
    fn pseudo_mersenne_products_match_biguint(
        #[strategy(curve25519_residue())]
        a: BigUint,
        #[strategy(curve25519_residue())]
        b: BigUint,
    ) {
        check_wide_reduction(&Modulus::<5>::curve25519().unwrap(), &a, &b);
    }

    #[test]
    fn goldilocks_fold_handles_largest_inputs() {
        let m = Modulus::<9>::goldilocks().unwrap();
        let p = m.value().to_biguint();
        let a = &p - 1u32;
        let x = Big::<9>::try_from(&a).unwrap();
        let r = m.reduce_wide(&x.sqr());
        assert!(m.excess(&r).get() <= 1);
        assert_eq!(BigUint::one(), m.to_canonical(&r).to_biguint());

        let max = (BigUint::one() << Big::<9>::CAPACITY) - 1u32;
        let x = Big::<9>::from_biguint_truncated(&max);
        let r = m.reduce_wide(&x.sqr());
        assert_eq!((&max * &max) % &p, m.to_canonical(&r).to_biguint());
    }

    #[test]
    fn conversion_round_trips_small_prime() {
        let m = Modulus::<1>::new(&BigUint::from(23u32), ModulusType::Standard)
            .unwrap();
        for v in 0..23u64 {
            let mut x = Big::<1>::from_u64(v);
            m.to_internal(&mut x);
            assert_eq!(Big::from_u64(v), m.to_canonical(&x));
        }
    }

    #[test]
    fn excess_policy_thresholds() {
        let m = Modulus::<1>::new(&BigUint::from(23u32), ModulusType::Standard)
            .unwrap();
        let limit = m.excess_limit();
        assert!(!m.sum_needs_reduction(Excess(limit - 3)));
        assert!(m.sum_needs_reduction(Excess(limit - 2)));
        assert!(!m.negation_needs_reduction(Excess(limit - 1)));
        assert!(m.negation_needs_reduction(Excess(limit)));
        assert!(!m.product_needs_reduction(Excess(0), Excess(0)));
        assert!(m.product_needs_reduction(Excess(limit), Excess(1)));

        assert_eq!(1, m.negation_shift(Excess(0)));
        assert_eq!(2, m.negation_shift(Excess(1)));
        assert_eq!(4, m.negation_shift(Excess(5)));

        assert_eq!(SmallMul::Limbwise, m.small_mul_plan(Excess(0), 3));
        assert_eq!(SmallMul::Carrying, m.small_mul_plan(Excess(0), 1000));
        assert_eq!(SmallMul::Wide, m.small_mul_plan(Excess(limit / 2), 3));
    }

    #[proptest]
    fn full_reduction_clears_any_excess(
        #[strategy(nist256_residue())]
        a: BigUint,
        #[strategy(0u32..16)] k: u32,
    ) {
        // a + k * p carries an excess well past one
        let m = Modulus::<5>::nist256().unwrap();
        let p = m.value().to_biguint();
        let mut x = Big::<5>::try_from(&(&a + &p * k)).unwrap();
        m.reduce_full(&mut x);
        prop_assert_eq!(a, x.to_biguint());
    }

    #[test]
    fn full_reduction_of_largest_stored_value() {
        let m = Modulus::<5>::curve25519().unwrap();
        let p = m.value().to_biguint();
        let max = (BigUint::one() << Big::<5>::CAPACITY) - 1u32;
        let mut x = Big::<5>::from_biguint_truncated(&max);
        m.reduce_full(&mut x);
        assert_eq!(&max % &p, x.to_biguint());
    }

    #[test]
    fn excess_reads_bits_above_modulus() {
        let m = Modulus::<5>::curve25519().unwrap();
        let v = BigUint::from(3u32) << 255usize;
        let x = Big::<5>::from_biguint_truncated(&v);
        assert_eq!(Excess(3), m.excess(&x));
    }
}
