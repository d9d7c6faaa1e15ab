use crate::domain::correlation::psd::RepairReport;
use crate::domain::errors::ValidationError;
use nalgebra::DMatrix;
use std::collections::HashMap;

/// Project-by-project correlation matrix, labelled by project id.
///
/// Built once per run from the full project universe and shared read-only by
/// every per-year simulation. Rows and columns follow `project_ids()`.
/// The pre-repair matrix and the repair report stay available so that the
/// distortion introduced by the repair can be inspected.
#[derive(Debug, Clone)]
pub struct ProjectCorrelationMatrix {
    project_ids: Vec<String>,
    index: HashMap<String, usize>,
    raw: DMatrix<f64>,
    matrix: DMatrix<f64>,
    repair: RepairReport,
}

impl ProjectCorrelationMatrix {
    pub fn new(
        project_ids: Vec<String>,
        raw: DMatrix<f64>,
        matrix: DMatrix<f64>,
        repair: RepairReport,
    ) -> Self {
        let index = project_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        Self {
            project_ids,
            index,
            raw,
            matrix,
            repair,
        }
    }

    pub fn project_ids(&self) -> &[String] {
        &self.project_ids
    }

    pub fn len(&self) -> usize {
        self.project_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.project_ids.is_empty()
    }

    /// The repaired matrix used by the simulation
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// The multiplicative matrix before PSD repair
    pub fn raw_matrix(&self) -> &DMatrix<f64> {
        &self.raw
    }

    pub fn repair_report(&self) -> &RepairReport {
        &self.repair
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[(i, j)]
    }

    pub fn correlation(&self, a: &str, b: &str) -> Option<f64> {
        let i = *self.index.get(a)?;
        let j = *self.index.get(b)?;
        Some(self.get(i, j))
    }

    pub fn index_of(&self, project_id: &str) -> Result<usize, ValidationError> {
        self.index
            .get(project_id)
            .copied()
            .ok_or_else(|| ValidationError::UnknownProject {
                project_id: project_id.to_string(),
            })
    }

    pub fn indices_of<S: AsRef<str>>(&self, project_ids: &[S]) -> Result<Vec<usize>, ValidationError> {
        project_ids
            .iter()
            .map(|id| self.index_of(id.as_ref()))
            .collect()
    }

    /// Principal submatrix over the given positions, in the given order
    pub fn submatrix(&self, indices: &[usize]) -> DMatrix<f64> {
        let n = indices.len();
        DMatrix::from_fn(n, n, |i, j| self.matrix[(indices[i], indices[j])])
    }

    /// Principal submatrix restricted to the given project ids
    pub fn submatrix_for<S: AsRef<str>>(
        &self,
        project_ids: &[S],
    ) -> Result<DMatrix<f64>, ValidationError> {
        Ok(self.submatrix(&self.indices_of(project_ids)?))
    }

    /// Row-major copy of the repaired matrix, for export
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.matrix
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }
}
