// Per-year Monte Carlo simulation of portfolio delivery
pub mod cholesky;
pub mod monte_carlo;
pub mod result;
pub mod stats;

pub use monte_carlo::{MonteCarloConfig, MonteCarloEngine};
pub use result::YearlySimulationResult;
