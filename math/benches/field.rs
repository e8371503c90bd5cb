use criterion::{black_box, criterion_group, criterion_main, Criterion};
use num_bigint::BigUint;

use modfield::prelude::*;

fn sample<const N: usize>(m: &Modulus<N>, seed: u32) -> Fp<'_, N> {
    // deterministic, full-width values keep runs comparable
    let digits: Vec<u32> =
        (0..16).map(|i| seed.wrapping_mul(0x9e37_79b9) ^ i).collect();
    Fp::from_biguint(&BigUint::from_slice(&digits), m)
}

fn bench_family<const N: usize>(c: &mut Criterion, name: &str, m: &Modulus<N>) {
    let a = sample(m, 1);
    let b = sample(m, 2);
    let e = sample(m, 3).to_canonical();

    c.bench_function(&format!("{name}/mul"), |bench| {
        bench.iter(|| black_box(a) * black_box(b));
    });
    c.bench_function(&format!("{name}/square"), |bench| {
        bench.iter(|| black_box(a).squared());
    });
    c.bench_function(&format!("{name}/add"), |bench| {
        bench.iter(|| black_box(a) + black_box(b));
    });
    c.bench_function(&format!("{name}/inverse"), |bench| {
        bench.iter(|| black_box(a).inverse());
    });
    c.bench_function(&format!("{name}/pow"), |bench| {
        bench.iter(|| black_box(a).pow(black_box(&e)));
    });
    c.bench_function(&format!("{name}/pow_ct"), |bench| {
        bench.iter(|| black_box(a).pow_ct(black_box(&e)));
    });
    c.bench_function(&format!("{name}/sqrt"), |bench| {
        let s = a.squared();
        bench.iter(|| black_box(s).sqrt());
    });
}

fn bench_curve25519(c: &mut Criterion) {
    let m = Modulus::<5>::curve25519().expect("valid preset");
    bench_family(c, "curve25519", &m);
}

fn bench_nist256(c: &mut Criterion) {
    let m = Modulus::<5>::nist256().expect("valid preset");
    bench_family(c, "nist256", &m);
}

fn bench_goldilocks(c: &mut Criterion) {
    let m = Modulus::<9>::goldilocks().expect("valid preset");
    bench_family(c, "goldilocks", &m);
}

criterion_group!(benches, bench_curve25519, bench_nist256, bench_goldilocks);
criterion_main!(benches);
