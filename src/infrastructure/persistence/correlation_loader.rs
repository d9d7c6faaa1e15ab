use crate::domain::correlation::CategoryCorrelationMatrix;
use crate::domain::errors::CategoryKind;
use anyhow::{Context, Result, bail};
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Reads a labelled category correlation table.
///
/// The header holds the column labels after an arbitrary first cell; each
/// following row starts with its own label. Row order may differ from column
/// order.
pub struct CorrelationCsvLoader;

impl CorrelationCsvLoader {
    pub fn load(kind: CategoryKind, path: impl AsRef<Path>) -> Result<CategoryCorrelationMatrix> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {} correlation file {:?}", kind, path))?;
        let matrix = Self::from_reader(kind, file)
            .with_context(|| format!("Failed to load {} correlations from {:?}", kind, path))?;
        info!("Loaded {} {} labels from {:?}", matrix.len(), kind, path);
        Ok(matrix)
    }

    pub fn from_reader<R: Read>(kind: CategoryKind, reader: R) -> Result<CategoryCorrelationMatrix> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let column_labels: Vec<String> = rdr
            .headers()?
            .iter()
            .skip(1)
            .map(str::to_string)
            .collect();
        if column_labels.is_empty() {
            bail!("{} correlation table has no labels", kind);
        }

        let mut row_labels = Vec::new();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let mut cells = record.iter();
            let Some(label) = cells.next() else {
                continue;
            };
            if label.is_empty() && record.iter().all(str::is_empty) {
                continue;
            }

            let values = cells
                .map(|cell| {
                    cell.parse::<f64>().with_context(|| {
                        format!("{} row '{}': '{}' is not a number", kind, label, cell)
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            row_labels.push(label.to_string());
            rows.push(values);
        }

        Ok(CategoryCorrelationMatrix::from_labelled(
            kind,
            row_labels,
            column_labels,
            rows,
        )?)
    }
}
