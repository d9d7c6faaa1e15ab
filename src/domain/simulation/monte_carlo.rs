use crate::domain::errors::{DataError, NumericalError, RiskError, ValidationError};
use crate::domain::portfolio::ActiveSet;
use crate::domain::simulation::cholesky;
use crate::domain::simulation::result::YearlySimulationResult;
use crate::domain::simulation::stats::Stats;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    pub sample_count: usize,
    /// Pivots within this distance of zero are treated as exact zeros
    pub factorization_tolerance: f64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            sample_count: 10_000,
            factorization_tolerance: 1e-8,
        }
    }
}

/// Draws correlated project deliveries for one year and aggregates them into
/// portfolio statistics.
#[derive(Debug, Clone)]
pub struct MonteCarloEngine {
    config: MonteCarloConfig,
}

impl MonteCarloEngine {
    pub fn new(config: MonteCarloConfig) -> Result<Self, ValidationError> {
        if config.sample_count < 2 {
            return Err(ValidationError::InvalidSampleCount {
                sample_count: config.sample_count,
            });
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Simulates the total delivery of `active` for its year.
    ///
    /// `correlation` must be the principal submatrix of the project
    /// correlation matrix over exactly the active projects, in the same order.
    /// Each sample draws i.i.d. standard normals, correlates them with the
    /// Cholesky factor and turns component `z_i` into
    /// `expected_value_percentage_i * offered_volume_i + standard_deviation_i * z_i`.
    pub fn simulate_year<R: Rng>(
        &self,
        active: &ActiveSet,
        correlation: &DMatrix<f64>,
        rng: &mut R,
    ) -> Result<YearlySimulationResult, RiskError> {
        let n = active.len();
        if n == 0 {
            return Err(DataError::EmptyActiveSet { year: active.year }.into());
        }
        if correlation.nrows() != n || correlation.ncols() != n {
            return Err(ValidationError::DimensionMismatch {
                expected: n,
                actual: correlation.nrows(),
            }
            .into());
        }

        let factor = cholesky::lower_factor(correlation, self.config.factorization_tolerance)
            .map_err(|failure| NumericalError::FactorizationFailed {
                year: active.year,
                active_projects: n,
                row: failure.row,
                pivot: failure.pivot,
            })?;

        let means: Vec<f64> = active.projects.iter().map(|p| p.expected_delivery()).collect();
        let std_devs: Vec<f64> = active
            .projects
            .iter()
            .map(|p| p.standard_deviation)
            .collect();

        let mut totals = Vec::with_capacity(self.config.sample_count);
        let mut independent = DVector::<f64>::zeros(n);

        for _ in 0..self.config.sample_count {
            for z in independent.iter_mut() {
                *z = rng.sample(StandardNormal);
            }
            let correlated = &factor * &independent;

            let total: f64 = (0..n)
                .map(|i| means[i] + std_devs[i] * correlated[i])
                .sum();
            totals.push(total);
        }

        let overall_portfolio_delivery = Stats::mean(&totals);
        let overall_standard_deviation = Stats::sample_std_dev(&totals);
        let overall_offered_volume = active.total_offered_volume();
        let overall_delivery_rate = YearlySimulationResult::delivery_rate(
            overall_portfolio_delivery,
            overall_offered_volume,
        );

        debug!(
            "Simulated {}: {} projects, mean delivery {:.2} (analytic {:.2}), std dev {:.2}",
            active.year,
            n,
            overall_portfolio_delivery,
            active.total_expected_delivery(),
            overall_standard_deviation
        );

        Ok(YearlySimulationResult {
            year: active.year,
            overall_standard_deviation,
            overall_portfolio_delivery,
            overall_delivery_rate,
            overall_offered_volume,
            active_projects: n,
        })
    }
}
