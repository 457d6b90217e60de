//! Seeded synthetic history drawn from a known power law.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use roas_core::HistoricalDataPoint;
use volume_model::calibrated_roas;

/// Shape of a synthetic history series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyntheticSpec {
    pub a: f64,
    pub b: f64,
    pub points: usize,
    pub min_spend: f64,
    pub max_spend: f64,
    /// Multiplicative ROAS noise, uniform in `[1 - noise_frac, 1 + noise_frac]`. Must be in [0, 1).
    pub noise_frac: f64,
}

/// Draw `spec.points` periods with log-uniform spend and noisy ROAS.
///
/// Same seed, same series. Returns an empty series for an unusable spec.
pub fn synthetic_history(spec: &SyntheticSpec, seed: u64) -> Vec<HistoricalDataPoint> {
    if !(spec.min_spend > 0.0 && spec.max_spend > spec.min_spend)
        || !(0.0..1.0).contains(&spec.noise_frac)
    {
        return Vec::new();
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (lo, hi) = (spec.min_spend.ln(), spec.max_spend.ln());
    (0..spec.points)
        .map(|i| {
            let spend = rng.gen_range(lo..hi).exp();
            let noise = if spec.noise_frac > 0.0 {
                rng.gen_range(-spec.noise_frac..=spec.noise_frac)
            } else {
                0.0
            };
            let roas = calibrated_roas(spend, spec.a, spec.b) * (1.0 + noise);
            HistoricalDataPoint::from_roas(format!("period-{:02}", i + 1), spend, roas)
        })
        .collect()
}
