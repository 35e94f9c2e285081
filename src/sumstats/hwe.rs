//! Exact test for Hardy-Weinberg equilibrium (Wigginton et al., 2005), mid-p variant.
//!
//! Conditional on the observed allele counts, the number of heterozygotes
//! follows a discrete distribution over `{rare % 2, rare % 2 + 2, ..., rare}`
//! where `rare` is the minor allele count.  Probabilities are taken relative to
//! the mode and obtained by walking the ratio of consecutive terms outward from
//! it.  Each walk stops once the terms become negligible, so memory stays
//! constant.  A walk that does not reach negligible terms within
//! `MAX_WALK_STEPS` gives up, which bounds the time spent on one record.

/// Relative slack when comparing a configuration against the observed one.
const TIE_TOLERANCE: f64 = 1e-9;

/// Terms below this fraction of the mode's probability are dropped.
const NEGLIGIBLE: f64 = f64::EPSILON * 1e-10;

/// Upper bound on the number of terms visited by one walk.
const MAX_WALK_STEPS: u64 = 1 << 24;

/// Heterozygote counts with their probability relative to the mode, walking
/// away from the mode in one direction while the terms are not negligible.
struct Walk {
    rare: u64,
    n: u64,
    het: u64,
    prob: f64,
    upward: bool,
    steps: u64,
    /// Stopped by the step limit rather than by negligible terms.
    truncated: bool,
}

impl Walk {
    fn new(rare: u64, n: u64, mode: u64, upward: bool) -> Self {
        Self {
            rare,
            n,
            het: mode,
            prob: 1.0,
            upward,
            steps: 0,
            truncated: false,
        }
    }
}

impl Iterator for Walk {
    type Item = (u64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.prob == 0.0 || self.truncated {
            return None;
        }
        if self.steps == MAX_WALK_STEPS {
            self.truncated = true;
            return None;
        }
        self.steps += 1;

        let h = self.het;
        // With `h` heterozygotes, there are `(rare - h) / 2` rare and
        // `n - h - (rare - h) / 2` common homozygotes.
        let rare_homs = (self.rare - h) / 2;
        let common_homs = (self.n - h - rare_homs) as f64;
        let rare_homs = rare_homs as f64;

        let ratio = if self.upward {
            if self.rare - h < 2 {
                return None;
            }
            self.het = h + 2;
            // P(h + 2) / P(h)
            4.0 * rare_homs * common_homs / ((h + 1) as f64 * (h + 2) as f64)
        } else {
            if h < 2 {
                return None;
            }
            self.het = h - 2;
            // P(h - 2) / P(h)
            (h as f64 * (h - 1) as f64) / (4.0 * (rare_homs + 1.0) * (common_homs + 1.0))
        };

        self.prob *= ratio;
        if self.prob < NEGLIGIBLE {
            self.prob = 0.0;
            None
        } else {
            Some((self.het, self.prob))
        }
    }
}

/// Two-sided exact mid-p value for the genotype counts.
///
/// Returns `None` if no individuals were genotyped.  A monomorphic site is
/// trivially in equilibrium and yields `1.0`.  An observation too unlikely to
/// be reached from the mode yields `0.0`.  Counts so large that the walk
/// exceeds its step limit yield `None` as well.  The result is symmetric in
/// `hom_ref` and `hom_alt`.
pub fn hwe_midp(hom_ref: u64, het: u64, hom_alt: u64) -> Option<f64> {
    let n = hom_ref.checked_add(het)?.checked_add(hom_alt)?;
    if n == 0 {
        return None;
    }
    let rare = 2 * hom_ref.min(hom_alt) + het;
    if rare == 0 {
        return Some(1.0);
    }

    let two_n = 2 * u128::from(n);
    let mut mode = (u128::from(rare) * (two_n - u128::from(rare)) / two_n) as u64;
    if mode % 2 != rare % 2 {
        mode += 1;
    }

    let observed = if het == mode {
        1.0
    } else {
        let mut walk = Walk::new(rare, n, mode, het > mode);
        match walk.find(|(h, _)| *h == het) {
            Some((_, prob)) => prob,
            None if walk.truncated => return None,
            None => return Some(0.0),
        }
    };

    let threshold = observed * (1.0 + TIE_TOLERANCE);
    let mut upward = Walk::new(rare, n, mode, true);
    let mut downward = Walk::new(rare, n, mode, false);
    let (total, tail) = std::iter::once((mode, 1.0))
        .chain(&mut upward)
        .chain(&mut downward)
        .fold((0.0f64, 0.0f64), |(total, tail), (_, prob)| {
            if prob <= threshold {
                (total + prob, tail + prob)
            } else {
                (total + prob, tail)
            }
        });
    if upward.truncated || downward.truncated {
        return None;
    }

    Some(((tail - 0.5 * observed) / total).clamp(0.0, 1.0))
}
