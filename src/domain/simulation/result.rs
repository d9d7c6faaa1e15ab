use serde::{Deserialize, Serialize};

/// Portfolio-level risk statistics of one calendar year
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlySimulationResult {
    pub year: i32,
    /// Sample standard deviation of the simulated total delivery
    pub overall_standard_deviation: f64,
    /// Sample mean of the simulated total delivery
    pub overall_portfolio_delivery: f64,
    /// `None` when the year offers no volume
    pub overall_delivery_rate: Option<f64>,
    /// Exact sum of the offered volumes of the active projects
    pub overall_offered_volume: f64,
    pub active_projects: usize,
}

impl YearlySimulationResult {
    /// Delivery over offered volume, undefined for a zero offered volume
    pub fn delivery_rate(portfolio_delivery: f64, offered_volume: f64) -> Option<f64> {
        if offered_volume == 0.0 || !offered_volume.is_finite() {
            None
        } else {
            Some(portfolio_delivery / offered_volume)
        }
    }
}
