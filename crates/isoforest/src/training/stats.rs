//! Statistics over node samples.
//!
//! All functions take optional weights; `None` means every value weighs one.
//! Callers filter missing values before calling.

use rand::prelude::*;

/// Monte Carlo draws for the expected kurtosis of a categorical column.
const CATEGORICAL_KURTOSIS_DRAWS: usize = 50;

// =============================================================================
// Moments
// =============================================================================

#[inline]
fn weight_at(weights: Option<&[f64]>, i: usize) -> f64 {
    weights.map_or(1.0, |w| w[i])
}

/// Weighted mean and population standard deviation.
///
/// Returns `(NaN, NaN)` when the total weight is zero.
pub(crate) fn mean_sd(values: &[f64], weights: Option<&[f64]>) -> (f64, f64) {
    let mut total = 0.0;
    let mut sum = 0.0;
    for (i, &x) in values.iter().enumerate() {
        let w = weight_at(weights, i);
        total += w;
        sum += w * x;
    }
    if !(total > 0.0) {
        return (f64::NAN, f64::NAN);
    }
    let mean = sum / total;
    let ss: f64 = values
        .iter()
        .enumerate()
        .map(|(i, &x)| weight_at(weights, i) * (x - mean) * (x - mean))
        .sum();
    (mean, (ss / total).sqrt())
}

/// Weighted sample kurtosis.
///
/// ```text
/// kurtosis = m4 / m2²,   mk = Σ w (x - mean)^k / Σ w
/// ```
///
/// Returns NaN for fewer than two values, zero total weight or zero spread.
pub(crate) fn kurtosis(values: &[f64], weights: Option<&[f64]>) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let (mean, sd) = mean_sd(values, weights);
    if !(sd > 0.0) {
        return f64::NAN;
    }
    let mut total = 0.0;
    let mut m2 = 0.0;
    let mut m4 = 0.0;
    for (i, &x) in values.iter().enumerate() {
        let w = weight_at(weights, i);
        let d2 = (x - mean) * (x - mean);
        total += w;
        m2 += w * d2;
        m4 += w * d2 * d2;
    }
    m2 /= total;
    m4 /= total;
    if !(m2 > 0.0) {
        return f64::NAN;
    }
    m4 / (m2 * m2)
}

/// Expected kurtosis of a categorical column whose categories are mapped
/// to independent `U(0, 1)` numbers.
///
/// `counts[k]` is the (weighted) number of rows in category `k`. The
/// expectation is estimated by averaging over random mappings.
pub(crate) fn categorical_kurtosis<R: Rng>(counts: &[f64], rng: &mut R, buf: &mut Vec<f64>) -> f64 {
    let present = counts.iter().filter(|&&c| c > 0.0).count();
    if present < 2 {
        return f64::NAN;
    }
    let mut sum = 0.0;
    let mut n_valid = 0usize;
    for _ in 0..CATEGORICAL_KURTOSIS_DRAWS {
        buf.clear();
        buf.extend(counts.iter().map(|_| rng.r#gen::<f64>()));
        let k = kurtosis(&buf[..], Some(counts));
        if k.is_finite() {
            sum += k;
            n_valid += 1;
        }
    }
    if n_valid == 0 { f64::NAN } else { sum / n_valid as f64 }
}

/// Column sampling weight from a kurtosis value.
///
/// Degenerate columns get weight zero and are never drawn.
#[inline]
pub(crate) fn kurtosis_weight(kurtosis: f64) -> f64 {
    if kurtosis.is_finite() {
        (kurtosis - 1.0).max(1e-8)
    } else {
        0.0
    }
}

// =============================================================================
// Categorical dispersion
// =============================================================================

/// Shannon entropy of category counts.
///
/// ```text
/// H = ln W - Σ c ln c / W
/// ```
#[inline]
pub(crate) fn entropy(total: f64, sum_c_ln_c: f64) -> f64 {
    if !(total > 0.0) {
        return 0.0;
    }
    (total.ln() - sum_c_ln_c / total).max(0.0)
}

#[inline]
pub(crate) fn c_ln_c(count: f64) -> f64 {
    if count > 0.0 { count * count.ln() } else { 0.0 }
}

/// Standard deviation of a column whose categories are mapped to
/// independent `U(0, 1)` numbers.
///
/// ```text
/// D = sqrt((1 - Σ p²) / 12),   p = c / W
/// ```
#[inline]
pub(crate) fn categorical_dispersion(total: f64, sum_sq: f64) -> f64 {
    if !(total > 0.0) {
        return 0.0;
    }
    ((1.0 - sum_sq / (total * total)).max(0.0) / 12.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn mean_sd_weighted() {
        let (mean, sd) = mean_sd(&[1.0, 3.0], None);
        assert_abs_diff_eq!(mean, 2.0);
        assert_abs_diff_eq!(sd, 1.0);

        let (mean, _) = mean_sd(&[1.0, 3.0], Some(&[3.0, 1.0]));
        assert_abs_diff_eq!(mean, 1.5);
    }

    #[test]
    fn kurtosis_of_two_points_is_one() {
        assert_abs_diff_eq!(kurtosis(&[0.0, 1.0], None), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(kurtosis_weight(1.0), 1e-8);
    }

    #[test]
    fn kurtosis_degenerate() {
        assert!(kurtosis(&[2.0, 2.0, 2.0], None).is_nan());
        assert!(kurtosis(&[2.0], None).is_nan());
        assert_eq!(kurtosis_weight(f64::NAN), 0.0);
    }

    #[test]
    fn heavy_tail_has_high_kurtosis() {
        let mut values = vec![0.0; 99];
        values.push(100.0);
        assert!(kurtosis(&values, None) > 50.0);
    }

    #[test]
    fn categorical_kurtosis_is_finite_for_two_categories() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut buf = Vec::new();
        let k = categorical_kurtosis(&[5.0, 5.0, 0.0], &mut rng, &mut buf);
        assert_abs_diff_eq!(k, 1.0, epsilon = 1e-9);
        assert!(categorical_kurtosis(&[5.0, 0.0], &mut rng, &mut buf).is_nan());
    }

    #[test]
    fn entropy_and_dispersion() {
        let counts = [2.0, 2.0];
        let s: f64 = counts.iter().map(|&c| c_ln_c(c)).sum();
        assert_abs_diff_eq!(entropy(4.0, s), std::f64::consts::LN_2, epsilon = 1e-12);
        assert_abs_diff_eq!(entropy(4.0, c_ln_c(4.0)), 0.0);
        assert_abs_diff_eq!(categorical_dispersion(4.0, 8.0), (0.5f64 / 12.0).sqrt());
        assert_abs_diff_eq!(categorical_dispersion(4.0, 16.0), 0.0);
    }
}
