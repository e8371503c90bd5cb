use thiserror::Error;

/// Common result type used across this crate.
pub type Result<T, E = FieldError> = core::result::Result<T, E>;

/// Top-level error type to keep error management simple for users.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum FieldError {
    #[error("element has no multiplicative inverse")]
    NotInvertible,
    #[error("element is not a quadratic residue")]
    NonResidue,
    #[error("square roots are not supported for p = {mod8} mod 8")]
    UnsupportedSqrt { mod8: u32 },
    #[error(transparent)]
    Modulus(#[from] ModulusError),
    #[error(transparent)]
    Parse(#[from] ParseFieldElementError),
}

/// Errors raised while building a [`Modulus`](crate::modulus::Modulus).
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum ModulusError {
    #[error("modulus must be greater than two")]
    TooSmall,
    #[error("modulus must be odd")]
    Even,
    #[error("{bits}-bit modulus does not fit {limbs} limbs with the required headroom")]
    Geometry { bits: u64, limbs: usize },
    #[error("modulus is not 2^{bits} - c for a small constant c")]
    NotPseudoMersenne { bits: u64 },
    #[error("modulus is not 2^{bits} - c for a sparse constant c")]
    NotGeneralisedMersenne { bits: u64 },
    #[error("invalid hexadecimal modulus {0:?}")]
    InvalidHex(String),
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum ParseFieldElementError {
    #[error("invalid hexadecimal value {0:?}")]
    InvalidHex(String),
    #[error("value has {bits} bits but at most {capacity} fit")]
    TooWide { bits: u64, capacity: usize },
    #[error("non-canonical {0} >= modulus")]
    NotCanonical(String),
}
