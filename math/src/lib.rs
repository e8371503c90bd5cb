//! Prime field arithmetic over fixed-width multi-limb integers.
//!
//! A [`Modulus`] describes a prime and its family (standard, pseudo-Mersenne
//! or generalised-Mersenne), which fixes how [`Fp`] elements are stored and
//! reduced. Elements borrow their modulus and reduce lazily.
//!
//! ```
//! use modfield::prelude::*;
//!
//! let m = Modulus::<5>::curve25519().unwrap();
//! let x = fp!(&m, 2) * fp!(&m, 3);
//! assert_eq!(fp!(&m, 6), x);
//! assert!((x * x.inverse().unwrap()).is_one());
//! ```

pub mod big;
pub mod error;
pub mod fp;
mod limbs;
pub mod macros;
pub mod modulus;
pub mod prelude;
pub mod reduce;
pub mod traits;

pub use big::Big;
pub use fp::Fp;
pub use limbs::BASEBITS;
pub use limbs::CHUNK;
pub use modulus::Modulus;
pub use modulus::ModulusType;
