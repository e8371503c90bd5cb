//! Shared macros for constructing field elements.
//!
//! These macros delegate to [`Fp::from_int`](crate::fp::Fp::from_int), which
//! keeps test vectors and call sites short.

/// Simplifies constructing an [`Fp`](crate::fp::Fp) from a small integer.
///
/// ```
/// use modfield::prelude::*;
///
/// let m = Modulus::<5>::curve25519().unwrap();
/// let a = fp!(&m, 42);
/// assert_eq!(a, Fp::from_int(42, &m));
/// ```
#[macro_export]
macro_rules! fp {
    ($modulus:expr, $value:expr) => {
        $crate::fp::Fp::from_int($value, $modulus)
    };
}

/// Create a [`Vec`] of [`Fp`](crate::fp::Fp)s over one modulus.
///
/// ```
/// use modfield::prelude::*;
///
/// let m = Modulus::<5>::curve25519().unwrap();
/// let repeated = fp_vec![&m; 7; 3];
/// assert_eq!(repeated, vec![fp!(&m, 7); 3]);
/// assert_eq!(fp_vec![&m; 1, -2], vec![fp!(&m, 1), fp!(&m, -2)]);
/// ```
#[macro_export]
macro_rules! fp_vec {
    ($modulus:expr; $b:expr; $n:expr) => {
        vec![$crate::fp::Fp::from_int($b, $modulus); $n]
    };
    ($modulus:expr; $($b:expr),* $(,)?) => {{
        let modulus = $modulus;
        vec![$($crate::fp::Fp::from_int($b, modulus)),*]
    }};
}
