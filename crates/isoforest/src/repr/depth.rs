//! Analytic depth constants.
//!
//! Terminal nodes that stop with several residual rows record the expected
//! depth a uniformly random recursive bisection would still need to isolate
//! them, instead of growing further.

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Generalized harmonic number `H(x) = ψ(x + 1) + γ`, valid for real `x >= 0`.
///
/// Shifts `x` upwards with `H(x) = H(x + 1) - 1 / (x + 1)` until the
/// asymptotic expansion is accurate to double precision.
pub fn harmonic(x: f64) -> f64 {
    let mut x = x;
    let mut acc = 0.0;
    while x < 64.0 {
        x += 1.0;
        acc -= 1.0 / x;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    acc + x.ln() + EULER_GAMMA + 0.5 * inv
        - inv2 * (1.0 / 12.0 - inv2 * (1.0 / 120.0 - inv2 / 252.0))
}

/// Expected isolation depth of `n` points: `2 (H(n) - 1)`.
///
/// Zero for `n <= 1`, strictly increasing above. Accepts weighted counts.
pub fn expected_avg_depth(n: f64) -> f64 {
    if n <= 1.0 {
        return 0.0;
    }
    2.0 * (harmonic(n) - 1.0)
}

/// Expected depth at which two of `n` points are separated.
///
/// Follows `s(n) = 1 + 2 / (n (n-1)^2) · Σ_{k=2}^{n-1} k (k-1) s(k)` with
/// `s(1) = 0`, `s(2) = 1`. Tends to 3 as `n` grows.
pub fn expected_separation_depth(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let mut acc = 0.0;
    let mut s = 1.0;
    for k in 3..=n {
        let prev = (k - 1) as f64;
        acc += prev * (prev - 1.0) * s;
        let kf = k as f64;
        s = 1.0 + 2.0 * acc / (kf * prev * prev);
    }
    s
}
