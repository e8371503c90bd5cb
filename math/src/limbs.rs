//! Limb-level primitives shared by [`Big`](crate::big::Big) and
//! [`DBig`](crate::big::DBig).
//!
//! A value is a little-endian sequence of signed 64-bit limbs, each carrying
//! [`BASEBITS`] bits. Between normalizations a limb may hold extra carry bits
//! or go negative. The top limb is never masked, so it absorbs whatever
//! excess the value has accumulated.

use std::cmp::Ordering;

use subtle::Choice;
use subtle::ConditionallySelectable;

/// Bits carried by each limb.
pub const BASEBITS: usize = 56;

/// Width of the machine word backing a limb.
pub const CHUNK: usize = 64;

pub(crate) const BMASK: i64 = (1 << BASEBITS) - 1;

/// Fixed-size limb storage.
pub(crate) trait Limbs: Copy {
    fn limbs(&self) -> &[i64];
    fn limbs_mut(&mut self) -> &mut [i64];
}

/// Propagate carries so every limb except the top one lies in
/// `[0, 2^BASEBITS)`. The sign of the value ends up in the top limb.
pub(crate) fn norm(w: &mut [i64]) {
    let top = w.len() - 1;
    let mut carry = 0;
    for limb in &mut w[..top] {
        let d = *limb + carry;
        *limb = d & BMASK;
        carry = d >> BASEBITS;
    }
    w[top] += carry;
}

pub(crate) fn is_zero(w: &[i64]) -> bool {
    w.iter().fold(0, |acc, &limb| acc | limb) == 0
}

pub(crate) fn add(a: &mut [i64], b: &[i64]) {
    for (x, y) in a.iter_mut().zip(b) {
        *x += y;
    }
}

pub(crate) fn sub(a: &mut [i64], b: &[i64]) {
    for (x, y) in a.iter_mut().zip(b) {
        *x -= y;
    }
}

/// Shift a normalized value left by `k` bits. Bits pushed past the top limb
/// are lost.
pub(crate) fn shl(w: &mut [i64], k: usize) {
    let len = w.len();
    let (n, m) = (k / BASEBITS, k % BASEBITS);
    if n >= len {
        w.fill(0);
        return;
    }
    for i in (n..len).rev() {
        let hi = w[i - n] << m;
        let lo = if i > n {
            w[i - n - 1] >> (BASEBITS - m)
        } else {
            0
        };
        w[i] = if i == len - 1 { hi | lo } else { (hi & BMASK) | lo };
    }
    w[..n].fill(0);
}

/// Shift a normalized, non-negative value right by `k` bits.
pub(crate) fn shr(w: &mut [i64], k: usize) {
    let len = w.len();
    let (n, m) = (k / BASEBITS, k % BASEBITS);
    if n >= len {
        w.fill(0);
        return;
    }
    for i in 0..len - n {
        let lo = w[i + n] >> m;
        let hi = if i + n + 1 < len {
            (w[i + n + 1] << (BASEBITS - m)) & BMASK
        } else {
            0
        };
        w[i] = lo | hi;
    }
    w[len - n..].fill(0);
}

/// Keep only the lowest `k` bits of a normalized value.
pub(crate) fn truncate(w: &mut [i64], k: usize) {
    let (n, m) = (k / BASEBITS, k % BASEBITS);
    if n >= w.len() {
        return;
    }
    w[n] &= (1 << m) - 1;
    w[n + 1..].fill(0);
}

/// Three-way comparison of two normalized values of equal length.
pub(crate) fn comp(a: &[i64], b: &[i64]) -> Ordering {
    for (x, y) in a.iter().zip(b).rev() {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Bit length of a normalized, non-negative value.
pub(crate) fn nbits(w: &[i64]) -> usize {
    match w.iter().rposition(|&limb| limb != 0) {
        None => 0,
        Some(k) => k * BASEBITS + (CHUNK - w[k].leading_zeros() as usize),
    }
}

/// Exchange `a` and `b` when `choice` is set, touching every limb either way.
pub(crate) fn cswap(a: &mut [i64], b: &mut [i64], choice: Choice) {
    for (x, y) in a.iter_mut().zip(b.iter_mut()) {
        i64::conditional_swap(x, y, choice);
    }
}

/// Overwrite `a` with `b` when `choice` is set, touching every limb either way.
pub(crate) fn cmove(a: &mut [i64], b: &[i64], choice: Choice) {
    for (x, y) in a.iter_mut().zip(b) {
        x.conditional_assign(y, choice);
    }
}

/// `Choice` that is set iff the normalized value is non-negative.
pub(crate) fn non_negative(w: &[i64]) -> Choice {
    let sign = (w[w.len() - 1] >> (CHUNK - 1)) & 1;
    Choice::from((1 ^ sign) as u8)
}

/// `x = x mod m` by restoring shift-and-subtract.
///
/// Both operands must be non-negative and `m` non-zero. The round count
/// follows the bit lengths of the operands, so this is only for public
/// values. Secret values go through [`rem_fixed`].
pub(crate) fn rem<T: Limbs>(x: &mut T, m: &T) {
    norm(x.limbs_mut());
    if comp(x.limbs(), m.limbs()) == Ordering::Less {
        return;
    }
    let k = nbits(x.limbs()) - nbits(m.limbs());
    rem_fixed(x, m, k);
}

/// `x = x mod m` in exactly `shift + 1` rounds, whatever the value of `x`.
///
/// Requires `0 <= x < m * 2^(shift + 1)` and room for `m << shift`.
pub(crate) fn rem_fixed<T: Limbs>(x: &mut T, m: &T, shift: usize) {
    norm(x.limbs_mut());
    let mut r = *m;
    shl(r.limbs_mut(), shift);
    for _ in 0..=shift {
        let mut t = *x;
        sub(t.limbs_mut(), r.limbs());
        norm(t.limbs_mut());
        let keep = non_negative(t.limbs());
        cmove(x.limbs_mut(), t.limbs(), keep);
        shr(r.limbs_mut(), 1);
    }
}
