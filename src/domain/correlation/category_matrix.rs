use crate::domain::errors::{CategoryKind, ValidationError};
use nalgebra::DMatrix;
use std::collections::HashMap;
use tracing::warn;

/// Labelled correlation table between categories (technologies or countries).
///
/// Labels are resolved to integer indices once, so lookups by index never go
/// through a string key afterwards.
#[derive(Debug, Clone)]
pub struct CategoryCorrelationMatrix {
    kind: CategoryKind,
    labels: Vec<String>,
    index: HashMap<String, usize>,
    values: DMatrix<f64>,
}

impl CategoryCorrelationMatrix {
    /// Builds a matrix whose rows and columns share the same label order.
    pub fn new(
        kind: CategoryKind,
        labels: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, ValidationError> {
        if labels.is_empty() || rows.is_empty() {
            return Err(ValidationError::EmptyInput {
                input: format!("{} correlation matrix", kind),
            });
        }

        let n = labels.len();
        let mut index = HashMap::with_capacity(n);
        for (i, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), i).is_some() {
                return Err(ValidationError::MalformedMatrix {
                    kind,
                    reason: format!("duplicate label '{}'", label),
                });
            }
        }

        if rows.len() != n {
            return Err(ValidationError::MalformedMatrix {
                kind,
                reason: format!("{} labels but {} rows", n, rows.len()),
            });
        }

        let mut values = DMatrix::zeros(n, n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(ValidationError::MalformedMatrix {
                    kind,
                    reason: format!(
                        "row '{}' has {} values, expected {}",
                        labels[i],
                        row.len(),
                        n
                    ),
                });
            }

            for (j, &value) in row.iter().enumerate() {
                if !value.is_finite() {
                    return Err(ValidationError::MalformedMatrix {
                        kind,
                        reason: format!("non-finite value at ('{}', '{}')", labels[i], labels[j]),
                    });
                }
                if !(-1.0..=1.0).contains(&value) {
                    return Err(ValidationError::CorrelationOutOfRange {
                        kind,
                        row: labels[i].clone(),
                        column: labels[j].clone(),
                        value,
                    });
                }
                values[(i, j)] = value;
            }
        }

        for (i, label) in labels.iter().enumerate() {
            if (values[(i, i)] - 1.0).abs() > 1e-9 {
                warn!(
                    "{} correlation of '{}' with itself is {}, expected 1",
                    kind,
                    label,
                    values[(i, i)]
                );
            }
        }

        Ok(Self {
            kind,
            labels,
            index,
            values,
        })
    }

    /// Builds a matrix from a table whose row labels may be ordered
    /// differently from its column labels. Both label sets must match.
    pub fn from_labelled(
        kind: CategoryKind,
        row_labels: Vec<String>,
        column_labels: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, ValidationError> {
        if row_labels.len() != rows.len() {
            return Err(ValidationError::MalformedMatrix {
                kind,
                reason: format!("{} row labels but {} rows", row_labels.len(), rows.len()),
            });
        }

        let row_positions: HashMap<&str, usize> = row_labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), i))
            .collect();

        for label in &row_labels {
            if !column_labels.contains(label) {
                return Err(ValidationError::MalformedMatrix {
                    kind,
                    reason: format!("row '{}' has no matching column", label),
                });
            }
        }

        let mut ordered = Vec::with_capacity(column_labels.len());
        for label in &column_labels {
            let position =
                row_positions
                    .get(label.as_str())
                    .ok_or_else(|| ValidationError::MalformedMatrix {
                        kind,
                        reason: format!("column '{}' has no matching row", label),
                    })?;
            ordered.push(rows[*position].clone());
        }

        Self::new(kind, column_labels, ordered)
    }

    pub fn kind(&self) -> CategoryKind {
        self.kind
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Result<usize, ValidationError> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| ValidationError::MissingLabel {
                kind: self.kind,
                label: label.to_string(),
            })
    }

    /// Correlation by resolved indices
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    pub fn correlation(&self, a: &str, b: &str) -> Result<f64, ValidationError> {
        Ok(self.get(self.index_of(a)?, self.index_of(b)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_lookup_by_label() {
        let matrix = CategoryCorrelationMatrix::new(
            CategoryKind::Technology,
            labels(&["Solar", "Wind"]),
            vec![vec![1.0, 0.4], vec![0.4, 1.0]],
        )
        .unwrap();

        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.correlation("Solar", "Wind").unwrap(), 0.4);
        assert_eq!(matrix.index_of("Wind").unwrap(), 1);
    }

    #[test]
    fn test_missing_label_is_validation_error() {
        let matrix = CategoryCorrelationMatrix::new(
            CategoryKind::Country,
            labels(&["Peru"]),
            vec![vec![1.0]],
        )
        .unwrap();

        let err = matrix.index_of("Chile").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingLabel { kind: CategoryKind::Country, ref label } if label == "Chile"
        ));
    }

    #[test]
    fn test_rejects_out_of_range_and_nan() {
        let out_of_range = CategoryCorrelationMatrix::new(
            CategoryKind::Technology,
            labels(&["A", "B"]),
            vec![vec![1.0, 1.5], vec![1.5, 1.0]],
        );
        assert!(matches!(
            out_of_range,
            Err(ValidationError::CorrelationOutOfRange { .. })
        ));

        let nan = CategoryCorrelationMatrix::new(
            CategoryKind::Technology,
            labels(&["A", "B"]),
            vec![vec![1.0, f64::NAN], vec![0.0, 1.0]],
        );
        assert!(matches!(nan, Err(ValidationError::MalformedMatrix { .. })));
    }

    #[test]
    fn test_rejects_empty_and_ragged() {
        let empty = CategoryCorrelationMatrix::new(CategoryKind::Country, vec![], vec![]);
        assert!(matches!(empty, Err(ValidationError::EmptyInput { .. })));

        let ragged = CategoryCorrelationMatrix::new(
            CategoryKind::Country,
            labels(&["A", "B"]),
            vec![vec![1.0, 0.1], vec![1.0]],
        );
        assert!(matches!(ragged, Err(ValidationError::MalformedMatrix { .. })));
    }

    #[test]
    fn test_from_labelled_reorders_rows_to_columns() {
        let matrix = CategoryCorrelationMatrix::from_labelled(
            CategoryKind::Country,
            labels(&["Y", "X"]),
            labels(&["X", "Y"]),
            // rows listed Y first, columns X first
            vec![vec![0.2, 1.0], vec![1.0, 0.2]],
        )
        .unwrap();

        assert_eq!(matrix.labels(), &["X".to_string(), "Y".to_string()]);
        assert_eq!(matrix.correlation("X", "X").unwrap(), 1.0);
        assert_eq!(matrix.correlation("X", "Y").unwrap(), 0.2);
        assert_eq!(matrix.correlation("Y", "Y").unwrap(), 1.0);
    }

    #[test]
    fn test_from_labelled_rejects_mismatched_labels() {
        let result = CategoryCorrelationMatrix::from_labelled(
            CategoryKind::Country,
            labels(&["X", "Z"]),
            labels(&["X", "Y"]),
            vec![vec![1.0, 0.2], vec![0.2, 1.0]],
        );
        assert!(matches!(result, Err(ValidationError::MalformedMatrix { .. })));
    }
}
