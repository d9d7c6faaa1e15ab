use crate::domain::correlation::category_matrix::CategoryCorrelationMatrix;
use crate::domain::correlation::project_matrix::ProjectCorrelationMatrix;
use crate::domain::correlation::psd::{self, PsdRepairConfig};
use crate::domain::errors::{CategoryKind, RiskError, ValidationError};
use crate::domain::portfolio::YearlyPortfolio;
use nalgebra::DMatrix;
use tracing::info;

/// Builds the project correlation matrix from technology and country
/// correlations.
///
/// The correlation of two distinct projects is the product of their
/// technology correlation and their country correlation. The product is
/// symmetrized, given a unit diagonal and repaired to be positive
/// semi-definite.
#[derive(Debug, Clone, Default)]
pub struct CorrelationMatrixBuilder {
    repair: PsdRepairConfig,
}

impl CorrelationMatrixBuilder {
    pub fn new(repair: PsdRepairConfig) -> Self {
        Self { repair }
    }

    pub fn build(
        &self,
        portfolio: &YearlyPortfolio,
        technology: &CategoryCorrelationMatrix,
        country: &CategoryCorrelationMatrix,
    ) -> Result<ProjectCorrelationMatrix, RiskError> {
        if portfolio.is_empty() {
            return Err(ValidationError::EmptyInput {
                input: "yearly portfolio".to_string(),
            }
            .into());
        }
        Self::check_kind(technology, CategoryKind::Technology)?;
        Self::check_kind(country, CategoryKind::Country)?;

        // Resolve every label once; the pair loop below only touches indices
        let mut technology_index = Vec::with_capacity(portfolio.len());
        let mut country_index = Vec::with_capacity(portfolio.len());
        for project in portfolio.projects() {
            technology_index.push(technology.index_of(&project.technology)?);
            country_index.push(country.index_of(&project.country)?);
        }

        let n = portfolio.len();
        let mut raw = DMatrix::identity(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                let value = technology.get(technology_index[i], technology_index[j])
                    * country.get(country_index[i], country_index[j]);
                raw[(i, j)] = value;
                raw[(j, i)] = value;
            }
        }

        let mut symmetric = psd::symmetrize(&raw);
        symmetric.fill_diagonal(1.0);

        let (matrix, report) = psd::repair(&symmetric, &self.repair)?;

        info!(
            "Built {}x{} project correlation matrix (min eigenvalue {:.4e}, repaired: {})",
            n, n, report.min_eigenvalue, report.repaired
        );

        let project_ids = portfolio
            .projects()
            .iter()
            .map(|p| p.id.clone())
            .collect();

        Ok(ProjectCorrelationMatrix::new(
            project_ids,
            symmetric,
            matrix,
            report,
        ))
    }

    fn check_kind(
        matrix: &CategoryCorrelationMatrix,
        expected: CategoryKind,
    ) -> Result<(), ValidationError> {
        if matrix.is_empty() {
            return Err(ValidationError::EmptyInput {
                input: format!("{} correlation matrix", expected),
            });
        }
        if matrix.kind() != expected {
            return Err(ValidationError::MalformedMatrix {
                kind: expected,
                reason: format!("got a {} matrix instead", matrix.kind()),
            });
        }
        Ok(())
    }
}
