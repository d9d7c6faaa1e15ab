pub mod aggregator;
pub mod service;

pub use aggregator::YearlyRiskAggregator;
pub use service::{RiskAnalysis, RiskAnalysisService};
