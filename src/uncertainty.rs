//! Monte Carlo sensitivity of a footprint to its emission factors.
//!
//! Every call takes the random source as a parameter; nothing in this module
//! reaches for an ambient generator.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::shopping::{Components, Scope};

/// Perturbs `value` by a log-normal draw whose mean is `value` and whose
/// relative standard deviation is `rel_sd`.
///
/// Non-positive values and non-positive spreads are returned unchanged, so that
/// credits (negative values) are never flipped in sign.
pub fn bounded<R: Rng + ?Sized>(value: f64, rel_sd: f64, rng: &mut R) -> f64 {
    if value <= 0.0 || rel_sd <= 0.0 {
        return value;
    }
    let sigma = (1.0 + rel_sd * rel_sd).ln().sqrt();
    let mu = value.ln() - 0.5 * sigma * sigma;
    (mu + sigma * standard_normal(rng)).exp()
}

/// A standard normal deviate via the Box-Muller transform
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // 1 - [0, 1) lies in (0, 1], keeping ln finite
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Draws `runs` scope-consistent totals, each component perturbed independently.
pub fn sample_totals<R: Rng + ?Sized>(
    components: &Components,
    scope: Scope,
    runs: usize,
    variation: f64,
    rng: &mut R,
) -> Vec<f64> {
    (0..runs)
        .map(|_| {
            let sample = Components {
                production: bounded(components.production, variation, rng),
                logistics: bounded(components.logistics, variation, rng),
                use_phase: bounded(components.use_phase, variation, rng),
                end_of_life: bounded(components.end_of_life, variation, rng),
            };
            sample.total(scope)
        })
        .collect()
}

/// Distribution of the Monte Carlo totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub runs: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// 5th percentile
    pub p05: f64,
    /// 95th percentile
    pub p95: f64,
}

impl Summary {
    /// Returns `None` when there are no samples
    pub fn new(mut samples: Vec<f64>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(f64::total_cmp);
        let runs = samples.len();
        Some(Self {
            runs,
            mean: samples.iter().sum::<f64>() / runs as f64,
            min: samples[0],
            max: samples[runs - 1],
            p05: percentile(&samples, 0.05),
            p95: percentile(&samples, 0.95),
        })
    }
}

/// Nearest-rank percentile of sorted, non-empty samples
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}
