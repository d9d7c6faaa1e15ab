use statrs::statistics::Statistics;

/// Shared statistics utilities for simulated distributions.
pub struct Stats;

impl Stats {
    /// Arithmetic mean, zero for an empty sample
    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.mean()
    }

    /// Unbiased sample standard deviation (n - 1), zero below two samples
    pub fn sample_std_dev(samples: &[f64]) -> f64 {
        if samples.len() < 2 {
            return 0.0;
        }
        samples.std_dev()
    }
}
