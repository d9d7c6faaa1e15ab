//! File-based input and output: wide portfolio and correlation CSVs in,
//! results and the project correlation matrix out.

pub mod correlation_loader;
pub mod exporter;
pub mod portfolio_loader;

pub use correlation_loader::CorrelationCsvLoader;
pub use exporter::{ResultsExporter, ResultsSummary};
pub use portfolio_loader::PortfolioCsvLoader;
