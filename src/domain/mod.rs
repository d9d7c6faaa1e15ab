// Project correlation construction and repair
pub mod correlation;

// Domain-specific error types
pub mod errors;

// Projects and yearly figures
pub mod portfolio;

// Monte Carlo delivery simulation
pub mod simulation;

// Input and output sanity checks
pub mod validation;
