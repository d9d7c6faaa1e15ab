//! Prometheus metrics definitions for the GHG risk engine
//!
//! All metrics use the `ghg_` prefix and are read-only.

use crate::domain::correlation::ProjectCorrelationMatrix;
use crate::domain::simulation::YearlySimulationResult;
use prometheus::{
    Counter, Gauge, GaugeVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge, GenericGaugeVec},
};
use std::sync::Arc;

/// Prometheus metrics for a simulation run
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Years for which a result was produced
    pub years_simulated_total: Counter,
    /// Years skipped because no project was active
    pub years_skipped_total: Counter,
    /// PSD repairs applied to the project correlation matrix
    pub psd_repairs_total: Counter,
    /// Smallest eigenvalue of the project correlation matrix before repair
    pub correlation_min_eigenvalue: GenericGauge<AtomicF64>,
    /// Number of projects in the correlation matrix
    pub correlation_projects: GenericGauge<AtomicF64>,
    /// Simulated standard deviation of total delivery per year
    pub year_standard_deviation: GenericGaugeVec<AtomicF64>,
    /// Simulated delivery rate per year
    pub year_delivery_rate: GenericGaugeVec<AtomicF64>,
    /// Wall time of one year's simulation in seconds
    pub year_simulation_seconds: Histogram,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let years_simulated_total = Counter::with_opts(Opts::new(
            "ghg_years_simulated_total",
            "Calendar years simulated",
        ))?;
        registry.register(Box::new(years_simulated_total.clone()))?;

        let years_skipped_total = Counter::with_opts(Opts::new(
            "ghg_years_skipped_total",
            "Calendar years skipped with no active project",
        ))?;
        registry.register(Box::new(years_skipped_total.clone()))?;

        let psd_repairs_total = Counter::with_opts(Opts::new(
            "ghg_psd_repairs_total",
            "Positive-semi-definite repairs of the project correlation matrix",
        ))?;
        registry.register(Box::new(psd_repairs_total.clone()))?;

        let correlation_min_eigenvalue = Gauge::with_opts(Opts::new(
            "ghg_correlation_min_eigenvalue",
            "Smallest eigenvalue of the project correlation matrix before repair",
        ))?;
        registry.register(Box::new(correlation_min_eigenvalue.clone()))?;

        let correlation_projects = Gauge::with_opts(Opts::new(
            "ghg_correlation_projects",
            "Projects in the project correlation matrix",
        ))?;
        registry.register(Box::new(correlation_projects.clone()))?;

        let year_standard_deviation = GaugeVec::new(
            Opts::new(
                "ghg_year_standard_deviation",
                "Simulated standard deviation of total delivery",
            ),
            &["year"],
        )?;
        registry.register(Box::new(year_standard_deviation.clone()))?;

        let year_delivery_rate = GaugeVec::new(
            Opts::new("ghg_year_delivery_rate", "Simulated delivery rate (0-1)"),
            &["year"],
        )?;
        registry.register(Box::new(year_delivery_rate.clone()))?;

        let year_simulation_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "ghg_year_simulation_seconds",
                "Wall time of one year's simulation in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(year_simulation_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            years_simulated_total,
            years_skipped_total,
            psd_repairs_total,
            correlation_min_eigenvalue,
            correlation_projects,
            year_standard_deviation,
            year_delivery_rate,
            year_simulation_seconds,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn record_correlation(&self, matrix: &ProjectCorrelationMatrix) {
        let report = matrix.repair_report();
        self.correlation_min_eigenvalue.set(report.min_eigenvalue);
        self.correlation_projects.set(matrix.len() as f64);
        if report.repaired {
            self.psd_repairs_total.inc();
        }
    }

    pub fn record_year(&self, result: &YearlySimulationResult, elapsed_seconds: f64) {
        let year = result.year.to_string();
        self.years_simulated_total.inc();
        self.year_standard_deviation
            .with_label_values(&[year.as_str()])
            .set(result.overall_standard_deviation);
        if let Some(rate) = result.overall_delivery_rate {
            self.year_delivery_rate
                .with_label_values(&[year.as_str()])
                .set(rate);
        }
        self.year_simulation_seconds.observe(elapsed_seconds);
    }

    pub fn record_skipped_year(&self) {
        self.years_skipped_total.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_recorded_year() {
        let metrics = Metrics::new().unwrap();
        metrics.record_year(
            &YearlySimulationResult {
                year: 2031,
                overall_standard_deviation: 12.5,
                overall_portfolio_delivery: 90.0,
                overall_delivery_rate: Some(0.9),
                overall_offered_volume: 100.0,
                active_projects: 2,
            },
            0.02,
        );
        metrics.record_skipped_year();

        let text = metrics.render();
        assert!(text.contains("ghg_years_simulated_total 1"));
        assert!(text.contains("ghg_years_skipped_total 1"));
        assert!(text.contains("ghg_year_standard_deviation{year=\"2031\"} 12.5"));
        assert!(text.contains("ghg_year_delivery_rate{year=\"2031\"} 0.9"));
    }
}
