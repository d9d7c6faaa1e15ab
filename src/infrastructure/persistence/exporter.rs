use crate::application::risk::RiskAnalysis;
use crate::domain::correlation::ProjectCorrelationMatrix;
use crate::domain::simulation::YearlySimulationResult;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const RESULTS_CSV: &str = "portfolio_simulation_results.csv";
pub const RESULTS_JSON: &str = "portfolio_simulation_results.json";
pub const CORRELATION_CSV: &str = "project_correlation_matrix.csv";

#[derive(Debug, Serialize)]
struct ResultRecord {
    year: i32,
    offered_volume: f64,
    portfolio_delivery: f64,
    standard_deviation: f64,
    delivery_rate: Option<f64>,
}

impl From<&YearlySimulationResult> for ResultRecord {
    fn from(result: &YearlySimulationResult) -> Self {
        Self {
            year: result.year,
            offered_volume: result.overall_offered_volume,
            portfolio_delivery: result.overall_portfolio_delivery,
            standard_deviation: result.overall_standard_deviation,
            delivery_rate: result.overall_delivery_rate,
        }
    }
}

/// Totals over every simulated year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsSummary {
    pub total_offered_volume: f64,
    pub total_portfolio_delivery: f64,
    /// Total delivery over total offered volume, `None` when nothing is offered
    pub average_delivery_rate: Option<f64>,
}

impl ResultsSummary {
    pub fn from_results(results: &[YearlySimulationResult]) -> Self {
        let total_offered_volume: f64 = results.iter().map(|r| r.overall_offered_volume).sum();
        let total_portfolio_delivery: f64 =
            results.iter().map(|r| r.overall_portfolio_delivery).sum();
        Self {
            total_offered_volume,
            total_portfolio_delivery,
            average_delivery_rate: YearlySimulationResult::delivery_rate(
                total_portfolio_delivery,
                total_offered_volume,
            ),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    simulation_date: DateTime<Utc>,
    seed: u64,
    summary: ResultsSummary,
    results: &'a [YearlySimulationResult],
}

/// Writes analysis outputs to disk
pub struct ResultsExporter {
    root: PathBuf,
}

impl ResultsExporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/<YYYYmmdd_HHMMSS>` for the given simulation date
    pub fn run_directory(&self, simulation_date: &DateTime<Utc>) -> PathBuf {
        self.root
            .join(simulation_date.format("%Y%m%d_%H%M%S").to_string())
    }

    /// Exports results (CSV and JSON) and the correlation matrix into a
    /// timestamped directory, returning that directory.
    pub fn export(&self, analysis: &RiskAnalysis) -> Result<PathBuf> {
        let dir = self.run_directory(&analysis.simulation_date);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;

        Self::write_results_csv(dir.join(RESULTS_CSV), &analysis.results)?;
        Self::write_results_json(dir.join(RESULTS_JSON), analysis)?;
        Self::write_correlation_csv(dir.join(CORRELATION_CSV), &analysis.correlation)?;

        info!("Exported {} yearly results to {:?}", analysis.results.len(), dir);
        Ok(dir)
    }

    pub fn write_results_csv(
        path: impl AsRef<Path>,
        results: &[YearlySimulationResult],
    ) -> Result<()> {
        let path = path.as_ref();
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {:?}", path))?;
        for result in results {
            wtr.serialize(ResultRecord::from(result))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_results_json(path: impl AsRef<Path>, analysis: &RiskAnalysis) -> Result<()> {
        let path = path.as_ref();
        let report = JsonReport {
            simulation_date: analysis.simulation_date,
            seed: analysis.seed,
            summary: ResultsSummary::from_results(&analysis.results),
            results: &analysis.results,
        };
        let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &report)?;
        writer.flush()?;
        Ok(())
    }

    /// Square table labelled by project id on both axes
    pub fn write_correlation_csv(
        path: impl AsRef<Path>,
        correlation: &ProjectCorrelationMatrix,
    ) -> Result<()> {
        let path = path.as_ref();
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {:?}", path))?;

        let mut header = vec!["project_id".to_string()];
        header.extend(correlation.project_ids().iter().cloned());
        wtr.write_record(&header)?;

        for (id, row) in correlation.project_ids().iter().zip(correlation.to_rows()) {
            let mut record = vec![id.clone()];
            record.extend(row.iter().map(|value| value.to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(year: i32, offered: f64, delivery: f64) -> YearlySimulationResult {
        YearlySimulationResult {
            year,
            overall_standard_deviation: 5.0,
            overall_portfolio_delivery: delivery,
            overall_delivery_rate: YearlySimulationResult::delivery_rate(delivery, offered),
            overall_offered_volume: offered,
            active_projects: 1,
        }
    }

    #[test]
    fn test_summary_totals() {
        let summary =
            ResultsSummary::from_results(&[result(2025, 100.0, 80.0), result(2026, 100.0, 90.0)]);
        assert_eq!(summary.total_offered_volume, 200.0);
        assert_eq!(summary.total_portfolio_delivery, 170.0);
        assert!((summary.average_delivery_rate.unwrap() - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_results_csv_leaves_undefined_rate_empty() {
        let dir = std::env::temp_dir().join("ghg_risk_exporter_csv");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(RESULTS_CSV);

        ResultsExporter::write_results_csv(&path, &[result(2025, 100.0, 80.0), result(2026, 0.0, 0.0)])
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "year,offered_volume,portfolio_delivery,standard_deviation,delivery_rate"
        );
        assert_eq!(lines[1], "2025,100.0,80.0,5.0,0.8");
        assert_eq!(lines[2], "2026,0.0,0.0,5.0,");
    }

    #[test]
    fn test_run_directory_is_timestamped() {
        let exporter = ResultsExporter::new("output");
        let date = DateTime::parse_from_rfc3339("2026-03-04T05:06:07Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            exporter.run_directory(&date),
            PathBuf::from("output").join("20260304_050607")
        );
    }
}
