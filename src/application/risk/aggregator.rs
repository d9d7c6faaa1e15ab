use crate::domain::correlation::ProjectCorrelationMatrix;
use crate::domain::errors::{DataError, RiskError};
use crate::domain::portfolio::{ActiveSetResolver, YearlyPortfolio};
use crate::domain::simulation::{MonteCarloEngine, YearlySimulationResult};
use crate::infrastructure::observability::Metrics;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{info, warn};

/// Runs the Monte Carlo engine for every calendar year of the portfolio
/// horizon and collects the results in ascending year order.
///
/// Years only share the read-only correlation matrix, so they run
/// independently on the rayon pool when `parallel` is set. Each year draws
/// from its own generator seeded from the base seed and the year, which makes
/// the output independent of scheduling.
pub struct YearlyRiskAggregator {
    engine: MonteCarloEngine,
    seed: u64,
    parallel: bool,
}

impl YearlyRiskAggregator {
    pub fn new(engine: MonteCarloEngine, seed: u64, parallel: bool) -> Self {
        Self {
            engine,
            seed,
            parallel,
        }
    }

    /// Seed of one year's generator
    pub fn year_seed(seed: u64, year: i32) -> u64 {
        seed ^ (year as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    /// Simulates every year of the horizon.
    ///
    /// Years without active projects are skipped with a warning. Any other
    /// error, notably a failed factorization, aborts the run.
    pub fn run(
        &self,
        portfolio: &YearlyPortfolio,
        correlation: &ProjectCorrelationMatrix,
        metrics: Option<&Metrics>,
    ) -> Result<Vec<YearlySimulationResult>, RiskError> {
        let Some(horizon) = portfolio.horizon()? else {
            warn!("Portfolio covers no calendar year, nothing to simulate");
            return Ok(Vec::new());
        };
        let years: Vec<i32> = horizon.collect();

        info!(
            "Simulating {} years ({}..={}) with {} samples each (parallel: {})",
            years.len(),
            years.first().copied().unwrap_or_default(),
            years.last().copied().unwrap_or_default(),
            self.engine.config().sample_count,
            self.parallel
        );

        let outcomes: Vec<Option<YearlySimulationResult>> = if self.parallel {
            years
                .par_iter()
                .map(|&year| self.simulate(year, portfolio, correlation, metrics))
                .collect::<Result<_, _>>()?
        } else {
            years
                .iter()
                .map(|&year| self.simulate(year, portfolio, correlation, metrics))
                .collect::<Result<_, _>>()?
        };

        let mut results: Vec<YearlySimulationResult> = outcomes.into_iter().flatten().collect();
        results.sort_by_key(|r| r.year);

        info!(
            "Simulation complete: {} of {} years produced results",
            results.len(),
            years.len()
        );
        Ok(results)
    }

    /// Simulates a single year. `Ok(None)` when the year has no active project.
    pub fn simulate(
        &self,
        year: i32,
        portfolio: &YearlyPortfolio,
        correlation: &ProjectCorrelationMatrix,
        metrics: Option<&Metrics>,
    ) -> Result<Option<YearlySimulationResult>, RiskError> {
        let active = match ActiveSetResolver::resolve(portfolio, year) {
            Ok(active) => active,
            Err(DataError::EmptyActiveSet { year }) => {
                warn!("No active projects in {}, skipping", year);
                if let Some(metrics) = metrics {
                    metrics.record_skipped_year();
                }
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let started = Instant::now();
        let indices = correlation.indices_of(&active.project_ids())?;
        let submatrix = correlation.submatrix(&indices);
        let mut rng = StdRng::seed_from_u64(Self::year_seed(self.seed, year));

        let result = self.engine.simulate_year(&active, &submatrix, &mut rng)?;

        if let Some(metrics) = metrics {
            metrics.record_year(&result, started.elapsed().as_secs_f64());
        }
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::correlation::{
        CategoryCorrelationMatrix, CorrelationMatrixBuilder, RepairReport,
    };
    use crate::domain::errors::{CategoryKind, NumericalError};
    use crate::domain::portfolio::{Project, YearlyFigures};
    use crate::domain::simulation::MonteCarloConfig;
    use nalgebra::DMatrix;

    fn figures(offered: f64) -> YearlyFigures {
        YearlyFigures {
            offered_volume: Some(offered),
            standard_deviation: Some(offered * 0.1),
            delivery_volume: Some(offered * 0.8),
            expected_value_percentage: Some(0.8),
        }
    }

    fn fixture() -> (YearlyPortfolio, ProjectCorrelationMatrix) {
        let portfolio = YearlyPortfolio::new(vec![
            Project::new("A", "Solar", "Chile", 2025, 2)
                .with_year(2025, figures(100.0))
                .with_year(2026, figures(100.0)),
            // Gap year 2027 between contracts
            Project::new("B", "Wind", "Chile", 2028, 1).with_year(2028, figures(50.0)),
        ])
        .unwrap();
        let technology = CategoryCorrelationMatrix::new(
            CategoryKind::Technology,
            vec!["Solar".into(), "Wind".into()],
            vec![vec![1.0, 0.5], vec![0.5, 1.0]],
        )
        .unwrap();
        let country = CategoryCorrelationMatrix::new(
            CategoryKind::Country,
            vec!["Chile".into()],
            vec![vec![1.0]],
        )
        .unwrap();
        let correlation = CorrelationMatrixBuilder::default()
            .build(&portfolio, &technology, &country)
            .unwrap();
        (portfolio, correlation)
    }

    fn aggregator(parallel: bool) -> YearlyRiskAggregator {
        let engine = MonteCarloEngine::new(MonteCarloConfig {
            sample_count: 2_000,
            ..MonteCarloConfig::default()
        })
        .unwrap();
        YearlyRiskAggregator::new(engine, 11, parallel)
    }

    #[test]
    fn test_skips_empty_years_and_orders_results() {
        let (portfolio, correlation) = fixture();
        let metrics = Metrics::new().unwrap();

        let results = aggregator(true)
            .run(&portfolio, &correlation, Some(&metrics))
            .unwrap();

        let years: Vec<i32> = results.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2025, 2026, 2028]);
        assert_eq!(results[2].overall_offered_volume, 50.0);
        assert_eq!(metrics.years_skipped_total.get(), 1.0);
        assert_eq!(metrics.years_simulated_total.get(), 3.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (portfolio, correlation) = fixture();

        let parallel = aggregator(true).run(&portfolio, &correlation, None).unwrap();
        let sequential = aggregator(false).run(&portfolio, &correlation, None).unwrap();

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_factorization_failure_aborts_the_run() {
        let portfolio = YearlyPortfolio::new(vec![
            Project::new("A", "Solar", "Chile", 2025, 2)
                .with_year(2025, figures(100.0))
                .with_year(2026, figures(100.0)),
            Project::new("B", "Wind", "Chile", 2026, 1).with_year(2026, figures(80.0)),
            Project::new("C", "Hydro", "Chile", 2026, 1).with_year(2026, figures(60.0)),
        ])
        .unwrap();
        // A-B and B-C strongly correlated but A-C strongly anti-correlated
        let indefinite = DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 0.9, -0.9, 0.9, 1.0, 0.9, -0.9, 0.9, 1.0],
        );
        let correlation = ProjectCorrelationMatrix::new(
            vec!["A".into(), "B".into(), "C".into()],
            indefinite.clone(),
            indefinite,
            RepairReport::default(),
        );

        for parallel in [true, false] {
            let metrics = Metrics::new().unwrap();
            let err = aggregator(parallel)
                .run(&portfolio, &correlation, Some(&metrics))
                .unwrap_err();

            assert!(matches!(
                err,
                RiskError::Numerical(NumericalError::FactorizationFailed {
                    year: 2026,
                    active_projects: 3,
                    ..
                })
            ));
            assert_eq!(metrics.years_skipped_total.get(), 0.0);
        }
    }

    #[test]
    fn test_year_seeds_differ() {
        assert_ne!(
            YearlyRiskAggregator::year_seed(5, 2025),
            YearlyRiskAggregator::year_seed(5, 2026)
        );
        assert_eq!(
            YearlyRiskAggregator::year_seed(5, 2025),
            YearlyRiskAggregator::year_seed(5, 2025)
        );
    }
}
