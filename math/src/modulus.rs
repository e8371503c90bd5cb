//! Modulus configuration.
//!
//! A [`Modulus`] is built once, validated against the limb geometry of
//! `N` limbs, and then shared by reference with every
//! [`Fp`](crate::fp::Fp) built over it. It never changes after
//! construction, so it can live in a `static` behind
//! [`LazyLock`](std::sync::LazyLock) and be read from any thread.

use std::fmt;

use num_bigint::BigUint;
use num_traits::One;
use num_traits::ToPrimitive;
use serde::Deserialize;
use serde::Serialize;

use crate::big::Big;
use crate::error::ModulusError;
use crate::limbs::BASEBITS;
use crate::limbs::CHUNK;

/// Smallest number of spare bits above the modulus in the top limb.
pub const MIN_HEADROOM: usize = 4;

/// Largest number of set bits in `2^m - p` for a generalised-Mersenne prime.
pub const MAX_SPARSE_TERMS: usize = 8;

/// Bound below which small constants may be multiplied limb by limb.
pub const SMALL_MUL_LIMIT: i64 = 1 << (CHUNK - BASEBITS - 1);

/// Family of the prime, selecting representation and reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModulusType {
    /// Any odd prime, handled with Montgomery arithmetic.
    Standard,
    /// `2^m - c` for a single-limb constant `c`.
    PseudoMersenne,
    /// `2^m - c` for a sparse constant `c`, e.g. `2^448 - 2^224 - 1`.
    GeneralisedMersenne,
}

/// How field elements store their value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    /// `value * R mod p` with `R = 2^(N * BASEBITS)`.
    Montgomery,
    /// The value itself, not necessarily fully reduced.
    Raw,
}

impl ModulusType {
    pub const fn representation(self) -> Representation {
        match self {
            ModulusType::Standard => Representation::Montgomery,
            ModulusType::PseudoMersenne
            | ModulusType::GeneralisedMersenne => Representation::Raw,
        }
    }
}

impl fmt::Display for ModulusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModulusType::Standard => "standard",
            ModulusType::PseudoMersenne => "pseudo-Mersenne",
            ModulusType::GeneralisedMersenne => "generalised-Mersenne",
        };
        f.write_str(name)
    }
}

/// Family-specific reduction data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reducer {
    /// `-p^-1 mod 2^BASEBITS`
    Montgomery { inv: i64 },
    /// Fold by `c = 2^m - p`, `rounds` times.
    PseudoMersenne { c: i64, rounds: usize },
    /// Fold by `c = sum(2^t for t in terms)`, `rounds` times.
    GeneralisedMersenne { terms: Vec<usize>, rounds: usize },
}

/// Serializable description of a modulus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulusParams {
    /// Hexadecimal prime, with or without a `0x` prefix.
    pub modulus: String,
    pub family: ModulusType,
}

/// A prime modulus together with everything derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modulus<const N: usize> {
    pub(crate) p: Big<N>,
    pub(crate) family: ModulusType,
    pub(crate) bits: usize,
    pub(crate) mod8: u32,
    pub(crate) excess_shift: usize,
    pub(crate) excess_limit: i64,
    pub(crate) reducer: Reducer,
}

impl<const N: usize> Modulus<N> {
    /// Validate `p` for `family` and derive the reduction parameters.
    ///
    /// `p` must be odd and greater than two, and its bit length `m` must
    /// satisfy `MIN_HEADROOM <= N * BASEBITS - m <= BASEBITS`.
    ///
    /// `p` is assumed prime and primality is not checked. Over a composite
    /// `p` the ring operations still agree with integer arithmetic mod `p`,
    /// but [`Fp::invert`](crate::fp::Fp::invert) fails for every element
    /// sharing a factor with `p` and square roots are meaningless.
    pub fn new(p: &BigUint, family: ModulusType) -> Result<Self, ModulusError> {
        if *p <= BigUint::from(2u32) {
            return Err(ModulusError::TooSmall);
        }
        if !p.bit(0) {
            return Err(ModulusError::Even);
        }
        let bits = p.bits();
        let capacity = Big::<N>::CAPACITY as u64;
        if bits + MIN_HEADROOM as u64 > capacity
            || capacity - bits > BASEBITS as u64
        {
            return Err(ModulusError::Geometry { bits, limbs: N });
        }
        let big = Big::<N>::try_from(p)
            .map_err(|_| ModulusError::Geometry { bits, limbs: N })?;
        let bits = bits as usize;

        let reducer = match family {
            ModulusType::Standard => Reducer::Montgomery {
                inv: montgomery_inverse(big.limb(0)),
            },
            ModulusType::PseudoMersenne => {
                let err = ModulusError::NotPseudoMersenne { bits: bits as u64 };
                let c = (BigUint::one() << bits) - p;
                let cbits = c.bits() as usize;
                if cbits > BASEBITS || cbits + 2 > bits {
                    return Err(err);
                }
                Reducer::PseudoMersenne {
                    c: c.to_i64().ok_or(err)?,
                    rounds: fold_rounds::<N>(bits, cbits),
                }
            }
            ModulusType::GeneralisedMersenne => {
                let err =
                    ModulusError::NotGeneralisedMersenne { bits: bits as u64 };
                let c = (BigUint::one() << bits) - p;
                let cbits = c.bits() as usize;
                let terms: Vec<usize> =
                    (0..cbits).filter(|&t| c.bit(t as u64)).collect();
                if terms.len() > MAX_SPARSE_TERMS
                    || cbits > bits / 2 + 1
                    || cbits + 2 > bits
                {
                    return Err(err);
                }
                Reducer::GeneralisedMersenne {
                    terms,
                    rounds: fold_rounds::<N>(bits, cbits),
                }
            }
        };

        let headroom = Big::<N>::CAPACITY - bits;
        let modulus = Self {
            p: big,
            family,
            bits,
            mod8: (big.limb(0) & 7) as u32,
            excess_shift: bits - (N - 1) * BASEBITS,
            excess_limit: 1 << (headroom - 1),
            reducer,
        };
        log::debug!(
            "configured {family} modulus: {bits} bits in {limbs} x {limb_bits}-bit limbs, excess limit {limit}",
            limbs = N,
            limb_bits = BASEBITS,
            limit = modulus.excess_limit,
        );
        Ok(modulus)
    }

    /// Parse a hexadecimal prime, with or without a `0x` prefix.
    pub fn from_hex(
        hex: &str,
        family: ModulusType,
    ) -> Result<Self, ModulusError> {
        let digits = hex.trim().trim_start_matches("0x");
        let p = BigUint::parse_bytes(digits.as_bytes(), 16)
            .ok_or_else(|| ModulusError::InvalidHex(hex.to_string()))?;
        Self::new(&p, family)
    }

    pub fn params(&self) -> ModulusParams {
        ModulusParams {
            modulus: format!("{:x}", self.p),
            family: self.family,
        }
    }

    /// The prime itself.
    pub fn value(&self) -> &Big<N> {
        &self.p
    }

    pub fn family(&self) -> ModulusType {
        self.family
    }

    pub fn representation(&self) -> Representation {
        self.family.representation()
    }

    /// `p mod 8`, which selects the square-root algorithm.
    pub fn mod8(&self) -> u32 {
        self.mod8
    }

    /// Bit length of the prime.
    pub fn bits(&self) -> usize {
        self.bits
    }

    pub const fn limb_count(&self) -> usize {
        N
    }

    pub const fn bits_per_limb(&self) -> usize {
        BASEBITS
    }

    /// Largest excess tolerated before a full reduction is forced.
    pub fn excess_limit(&self) -> i64 {
        self.excess_limit
    }

    pub const fn small_mul_limit(&self) -> i64 {
        SMALL_MUL_LIMIT
    }
}

impl<const N: usize> TryFrom<&ModulusParams> for Modulus<N> {
    type Error = ModulusError;

    fn try_from(params: &ModulusParams) -> Result<Self, Self::Error> {
        Self::from_hex(&params.modulus, params.family)
    }
}

impl<const N: usize> fmt::Display for Modulus<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x} ({})", self.p, self.family)
    }
}

impl Modulus<5> {
    /// `2^255 - 19`
    pub fn curve25519() -> Result<Self, ModulusError> {
        let p = (BigUint::one() << 255usize) - 19u32;
        Self::new(&p, ModulusType::PseudoMersenne)
    }

    /// The NIST P-256 field prime.
    pub fn nist256() -> Result<Self, ModulusError> {
        Self::from_hex(
            "ffffffff00000001000000000000000000000000ffffffffffffffffffffffff",
            ModulusType::Standard,
        )
    }

    /// The BN254 base field prime.
    pub fn bn254() -> Result<Self, ModulusError> {
        Self::from_hex(
            "30644e72e131a029b85045b68181585d97816a916871ca8d3c208c16d87cfd47",
            ModulusType::Standard,
        )
    }
}

impl Modulus<9> {
    /// `2^448 - 2^224 - 1`
    pub fn goldilocks() -> Result<Self, ModulusError> {
        let p = (BigUint::one() << 448usize)
            - (BigUint::one() << 224usize)
            - 1u32;
        Self::new(&p, ModulusType::GeneralisedMersenne)
    }
}

/// `-p0^-1 mod 2^BASEBITS` by Newton iteration; `p0` must be odd.
fn montgomery_inverse(p0: i64) -> i64 {
    let p0 = p0 as u64;
    let mut inv: u64 = 1;
    for _ in 0..6 {
        inv = inv.wrapping_mul(2u64.wrapping_sub(p0.wrapping_mul(inv)));
    }
    (inv.wrapping_neg() & ((1 << BASEBITS) - 1)) as i64
}

/// Number of folds taking any double-width value below `2^(bits + 1)`.
fn fold_rounds<const N: usize>(bits: usize, cbits: usize) -> usize {
    let mut bound = 2 * Big::<N>::CAPACITY;
    let mut rounds = 0;
    while bound > bits + 1 {
        bound = (bound - bits + cbits).max(bits) + 1;
        rounds += 1;
    }
    rounds
}
