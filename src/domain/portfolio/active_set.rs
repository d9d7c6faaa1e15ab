use crate::domain::errors::DataError;
use crate::domain::portfolio::yearly_portfolio::YearlyPortfolio;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Simulation inputs of one project for one calendar year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveProject {
    pub project_id: String,
    pub offered_volume: f64,
    pub standard_deviation: f64,
    pub expected_value_percentage: f64,
}

impl ActiveProject {
    /// Deterministic part of the delivery draw
    pub fn expected_delivery(&self) -> f64 {
        self.expected_value_percentage * self.offered_volume
    }
}

/// Projects active in a calendar year, in portfolio order. The order is the
/// positional order of the correlation submatrix used for that year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSet {
    pub year: i32,
    pub projects: Vec<ActiveProject>,
}

impl ActiveSet {
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn project_ids(&self) -> Vec<&str> {
        self.projects.iter().map(|p| p.project_id.as_str()).collect()
    }

    /// Exact sum of offered volumes, no sampling involved
    pub fn total_offered_volume(&self) -> f64 {
        self.projects.iter().map(|p| p.offered_volume).sum()
    }

    /// Analytic mean of the total delivery
    pub fn total_expected_delivery(&self) -> f64 {
        self.projects.iter().map(|p| p.expected_delivery()).sum()
    }
}

/// Selects the projects with a defined, nonzero offered volume in a year.
pub struct ActiveSetResolver;

impl ActiveSetResolver {
    /// Resolves the active set of `year`.
    ///
    /// Missing standard deviations and expected value percentages count as zero.
    /// Returns `DataError::EmptyActiveSet` when nothing is active; the caller
    /// decides whether that is a skip or an abort.
    pub fn resolve(portfolio: &YearlyPortfolio, year: i32) -> Result<ActiveSet, DataError> {
        let mut projects = Vec::new();

        for project in portfolio.projects() {
            if !project.is_active(year) {
                continue;
            }
            let Some(figures) = project.figures(year) else {
                continue;
            };

            if figures.standard_deviation.is_none() || figures.expected_value_percentage.is_none() {
                debug!(
                    "Project {} has incomplete figures for {}, treating missing values as zero",
                    project.id, year
                );
            }

            projects.push(ActiveProject {
                project_id: project.id.clone(),
                offered_volume: figures.offered_volume.unwrap_or(0.0),
                standard_deviation: figures.standard_deviation.unwrap_or(0.0),
                expected_value_percentage: figures.expected_value_percentage.unwrap_or(0.0),
            });
        }

        if projects.is_empty() {
            return Err(DataError::EmptyActiveSet { year });
        }

        Ok(ActiveSet { year, projects })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::project::{Project, YearlyFigures};

    fn figures(offered: f64, std_dev: Option<f64>) -> YearlyFigures {
        YearlyFigures {
            offered_volume: Some(offered),
            standard_deviation: std_dev,
            delivery_volume: None,
            expected_value_percentage: Some(0.9),
        }
    }

    fn portfolio() -> YearlyPortfolio {
        YearlyPortfolio::new(vec![
            Project::new("A", "Solar", "India", 2025, 2)
                .with_year(2025, figures(100.0, Some(10.0)))
                .with_year(2026, figures(110.0, Some(11.0))),
            Project::new("B", "Wind", "India", 2026, 2)
                .with_year(2026, figures(50.0, None))
                .with_year(2027, figures(55.0, Some(4.0))),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_keeps_portfolio_order() {
        let set = ActiveSetResolver::resolve(&portfolio(), 2026).unwrap();

        assert_eq!(set.year, 2026);
        assert_eq!(set.project_ids(), vec!["A", "B"]);
        assert_eq!(set.total_offered_volume(), 160.0);
        // Missing standard deviation counts as zero
        assert_eq!(set.projects[1].standard_deviation, 0.0);
    }

    #[test]
    fn test_resolve_single_year_projects() {
        let set = ActiveSetResolver::resolve(&portfolio(), 2027).unwrap();
        assert_eq!(set.project_ids(), vec!["B"]);
        assert!((set.total_expected_delivery() - 49.5).abs() < 1e-12);
    }

    #[test]
    fn test_resolve_empty_year_is_data_error() {
        let result = ActiveSetResolver::resolve(&portfolio(), 2030);
        assert!(matches!(result, Err(DataError::EmptyActiveSet { year: 2030 })));
    }
}
