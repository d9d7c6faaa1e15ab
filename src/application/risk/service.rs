use crate::application::risk::aggregator::YearlyRiskAggregator;
use crate::config::SimulationConfig;
use crate::domain::correlation::{
    CategoryCorrelationMatrix, CorrelationMatrixBuilder, ProjectCorrelationMatrix,
};
use crate::domain::portfolio::YearlyPortfolio;
use crate::domain::simulation::{MonteCarloEngine, YearlySimulationResult};
use crate::domain::validation::StrictPortfolioValidator;
use crate::infrastructure::observability::Metrics;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::info;

/// Outcome of a full risk analysis run
#[derive(Debug, Clone)]
pub struct RiskAnalysis {
    pub simulation_date: DateTime<Utc>,
    /// Base seed actually used, so the run can be reproduced
    pub seed: u64,
    pub correlation: ProjectCorrelationMatrix,
    pub results: Vec<YearlySimulationResult>,
}

/// End-to-end pipeline: validate the portfolio, build and validate the
/// correlation matrix, simulate every year and validate the results.
pub struct RiskAnalysisService {
    config: SimulationConfig,
    metrics: Option<Metrics>,
}

impl RiskAnalysisService {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validates the portfolio and builds the project correlation matrix
    pub fn build_correlation(
        &self,
        portfolio: &YearlyPortfolio,
        technology: &CategoryCorrelationMatrix,
        country: &CategoryCorrelationMatrix,
    ) -> Result<ProjectCorrelationMatrix> {
        self.config.validate()?;

        if !StrictPortfolioValidator::validate_yearly_portfolio(
            portfolio,
            &self.config.calendar_years(),
        ) {
            bail!("Yearly portfolio failed validation");
        }

        let correlation = CorrelationMatrixBuilder::new(self.config.psd_repair())
            .build(portfolio, technology, country)
            .context("Failed to build the project correlation matrix")?;

        if !StrictPortfolioValidator::validate_correlation_matrix(
            &correlation,
            self.config.eigenvalue_tolerance,
        ) {
            bail!("Project correlation matrix failed validation");
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_correlation(&correlation);
        }
        Ok(correlation)
    }

    pub fn run(
        &self,
        portfolio: &YearlyPortfolio,
        technology: &CategoryCorrelationMatrix,
        country: &CategoryCorrelationMatrix,
    ) -> Result<RiskAnalysis> {
        let simulation_date = Utc::now();
        let correlation = self.build_correlation(portfolio, technology, country)?;

        let seed = self.config.seed.unwrap_or_else(|| rand::rng().random());
        info!("Running portfolio simulation with seed {}", seed);

        let engine = MonteCarloEngine::new(self.config.monte_carlo())?;
        let aggregator = YearlyRiskAggregator::new(engine, seed, self.config.parallel);
        let results = aggregator
            .run(portfolio, &correlation, self.metrics.as_ref())
            .context("Portfolio simulation failed")?;

        if !StrictPortfolioValidator::validate_simulation_results(&results) {
            bail!("Simulation results failed validation");
        }

        Ok(RiskAnalysis {
            simulation_date,
            seed,
            correlation,
            results,
        })
    }
}
