use thiserror::Error;

/// Which category axis a correlation table describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Technology,
    Country,
}

impl std::fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryKind::Technology => write!(f, "technology"),
            CategoryKind::Country => write!(f, "country"),
        }
    }
}

/// Errors raised when inputs cannot produce a valid correlation structure.
/// Fatal for the whole run.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Input is empty: {input}")]
    EmptyInput { input: String },

    #[error("{kind} '{label}' not found in {kind} correlation matrix")]
    MissingLabel { kind: CategoryKind, label: String },

    #[error("Malformed {kind} correlation matrix: {reason}")]
    MalformedMatrix { kind: CategoryKind, reason: String },

    #[error("{kind} correlation ({row}, {column}) = {value} is outside [-1, 1]")]
    CorrelationOutOfRange {
        kind: CategoryKind,
        row: String,
        column: String,
        value: f64,
    },

    #[error("Project '{project_id}' is not part of the correlation matrix")]
    UnknownProject { project_id: String },

    #[error("Correlation matrix is {actual}x{actual} but {expected} projects are active")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sample count must be at least 2, got {sample_count}")]
    InvalidSampleCount { sample_count: usize },
}

/// Errors related to the shape and content of the yearly portfolio table
#[derive(Debug, Error)]
pub enum DataError {
    #[error("No active projects in {year}")]
    EmptyActiveSet { year: i32 },

    #[error("Duplicate project id: {project_id}")]
    DuplicateProject { project_id: String },

    #[error("Project {project_id} has more than one row for {year}")]
    DuplicateYear { project_id: String, year: i32 },

    #[error("Inconsistent data for project {project_id}: {reason}")]
    InconsistentProject { project_id: String, reason: String },

    #[error(
        "Contract year {year_index} of project {project_id} starting in {start_year} is not a valid calendar year"
    )]
    CalendarYearOverflow {
        project_id: String,
        start_year: i32,
        year_index: u32,
    },
}

/// Errors raised by the linear algebra behind the simulation
#[derive(Debug, Error)]
pub enum NumericalError {
    #[error(
        "Cholesky factorization failed for {year} ({active_projects} active projects): pivot {pivot:.3e} at row {row}"
    )]
    FactorizationFailed {
        year: i32,
        active_projects: usize,
        row: usize,
        pivot: f64,
    },

    #[error("Eigen-decomposition produced non-finite values")]
    NonFiniteSpectrum,

    #[error("Repaired matrix has a non-positive diagonal entry {value:.3e} at row {row}")]
    DegenerateDiagonal { row: usize, value: f64 },
}

/// Umbrella error for the public operations of the risk engine
#[derive(Debug, Error)]
pub enum RiskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Numerical(#[from] NumericalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_label_names_the_label() {
        let error = ValidationError::MissingLabel {
            kind: CategoryKind::Technology,
            label: "Biogas".to_string(),
        };

        let msg = error.to_string();
        assert!(msg.contains("Biogas"));
        assert!(msg.contains("technology correlation matrix"));
    }

    #[test]
    fn test_numerical_error_reports_year_and_size() {
        let error: RiskError = NumericalError::FactorizationFailed {
            year: 2031,
            active_projects: 7,
            row: 3,
            pivot: -0.25,
        }
        .into();

        let msg = error.to_string();
        assert!(msg.contains("2031"));
        assert!(msg.contains("7 active projects"));
        assert!(matches!(error, RiskError::Numerical(_)));
    }
}
