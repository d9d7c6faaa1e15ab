use crate::domain::correlation::ProjectCorrelationMatrix;
use crate::domain::correlation::psd;
use crate::domain::portfolio::YearlyPortfolio;
use crate::domain::simulation::YearlySimulationResult;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use tracing::warn;

/// Centralized sanity checks between the pipeline stages.
///
/// Each check logs the first problem it finds and returns false; the caller
/// stops the run rather than exporting suspect numbers.
pub struct StrictPortfolioValidator;

impl StrictPortfolioValidator {
    /// Non-empty, unique project ids, every calendar year and every contract
    /// window inside `allowed_years`, no negative standard deviation.
    pub fn validate_yearly_portfolio(
        portfolio: &YearlyPortfolio,
        allowed_years: &RangeInclusive<i32>,
    ) -> bool {
        if portfolio.is_empty() {
            warn!("Validation FAILED: The yearly portfolio is empty");
            return false;
        }

        let mut seen = HashSet::new();
        for id in portfolio.project_ids() {
            if !seen.insert(id) {
                warn!(
                    "Validation FAILED: The yearly portfolio contains duplicate project id {}",
                    id
                );
                return false;
            }
        }

        if let Some(year) = portfolio
            .calendar_years()
            .into_iter()
            .find(|year| !allowed_years.contains(year))
        {
            warn!(
                "Validation FAILED: Calendar year {} is outside {} to {}",
                year,
                allowed_years.start(),
                allowed_years.end()
            );
            return false;
        }

        for project in portfolio.projects() {
            if project.contract_duration == 0 {
                continue;
            }
            match project.end_year() {
                Ok(end)
                    if allowed_years.contains(&project.start_year)
                        && allowed_years.contains(&end) => {}
                Ok(end) => {
                    warn!(
                        "Validation FAILED: Contract of project {} ({} to {}) is outside {} to {}",
                        project.id,
                        project.start_year,
                        end,
                        allowed_years.start(),
                        allowed_years.end()
                    );
                    return false;
                }
                Err(e) => {
                    warn!("Validation FAILED: {}", e);
                    return false;
                }
            }

            for (year, figures) in &project.yearly {
                if let Some(std_dev) = figures.standard_deviation {
                    if std_dev < 0.0 || !std_dev.is_finite() {
                        warn!(
                            "Validation FAILED: Standard deviation {} of project {} in {} must be non-negative",
                            std_dev, project.id, year
                        );
                        return false;
                    }
                }
            }
        }

        true
    }

    /// Finite, symmetric within `tolerance`, no eigenvalue below `-tolerance`.
    pub fn validate_correlation_matrix(matrix: &ProjectCorrelationMatrix, tolerance: f64) -> bool {
        let values = matrix.matrix();

        if values.iter().any(|v| !v.is_finite()) {
            warn!("Validation FAILED: The project correlation matrix contains non-finite values");
            return false;
        }

        if (values - values.transpose()).amax() > tolerance {
            warn!("Validation FAILED: The project correlation matrix is not symmetric");
            return false;
        }

        match psd::min_eigenvalue(values) {
            Ok(min) if min >= -tolerance => true,
            Ok(min) => {
                warn!(
                    "Validation FAILED: The project correlation matrix is not positive semi-definite (min eigenvalue {:.3e})",
                    min
                );
                false
            }
            Err(e) => {
                warn!("Validation FAILED: {}", e);
                false
            }
        }
    }

    /// Non-empty, non-negative deviations and deliveries, rates within [0, 1].
    pub fn validate_simulation_results(results: &[YearlySimulationResult]) -> bool {
        if results.is_empty() {
            warn!("Validation FAILED: The portfolio simulation results are empty");
            return false;
        }

        for result in results {
            if result.overall_standard_deviation < 0.0
                || !result.overall_standard_deviation.is_finite()
            {
                warn!(
                    "Validation FAILED: Standard deviation {} for {} must be non-negative",
                    result.overall_standard_deviation, result.year
                );
                return false;
            }

            if result.overall_portfolio_delivery < 0.0 {
                warn!(
                    "Validation FAILED: Portfolio delivery {} for {} must be non-negative",
                    result.overall_portfolio_delivery, result.year
                );
                return false;
            }

            if let Some(rate) = result.overall_delivery_rate {
                if !(0.0..=1.0).contains(&rate) {
                    warn!(
                        "Validation FAILED: Delivery rate {} for {} must be between 0 and 1",
                        rate, result.year
                    );
                    return false;
                }
            }
        }

        true
    }
}
