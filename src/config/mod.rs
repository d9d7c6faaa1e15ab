//! Configuration module for the GHG risk engine.
//!
//! Settings come from environment variables (optionally a `.env` file loaded by
//! the binary) or from a TOML file passed on the command line.

mod simulation_config;

pub use simulation_config::SimulationConfig;
