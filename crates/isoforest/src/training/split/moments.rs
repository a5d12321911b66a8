//! Weighted running moments (Welford).

/// Running weight, mean and sum of squared deviations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct RunningMoments {
    weight: f64,
    mean: f64,
    m2: f64,
}

impl RunningMoments {
    /// Add `x` with weight `w`. Non-positive weights are ignored.
    #[inline]
    pub fn push(&mut self, x: f64, w: f64) {
        if !(w > 0.0) {
            return;
        }
        self.weight += w;
        let delta = x - self.mean;
        self.mean += delta * w / self.weight;
        self.m2 += w * delta * (x - self.mean);
    }

    #[inline]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation; zero for an empty accumulator.
    #[inline]
    pub fn sd(&self) -> f64 {
        if self.weight > 0.0 {
            (self.m2.max(0.0) / self.weight).sqrt()
        } else {
            0.0
        }
    }
}

/// Fill `out[i]` with the moments of `pairs[i..]`, plus an empty entry at
/// `out[n]`.
pub(crate) fn suffix_moments(pairs: &[(f64, f64)], out: &mut Vec<RunningMoments>) {
    out.clear();
    out.resize(pairs.len() + 1, RunningMoments::default());
    let mut acc = RunningMoments::default();
    for (i, &(x, w)) in pairs.iter().enumerate().rev() {
        acc.push(x, w);
        out[i] = acc;
    }
}
