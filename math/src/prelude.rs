pub use crate::{fp, fp_vec};
pub use crate::{
    big::Big,
    error::{FieldError, ModulusError, ParseFieldElementError},
    fp::Fp,
    modulus::{Modulus, ModulusParams, ModulusType, Representation},
    reduce::Excess,
    traits::{FiniteField, Inverse, ModPowU64, SquareRoot},
};
