//! Simulation configuration parsing from environment variables or TOML.
//!
//! This module handles loading sample counts, seeding, PSD repair thresholds
//! and the accepted calendar-year range.

use crate::domain::correlation::PsdRepairConfig;
use crate::domain::simulation::MonteCarloConfig;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::env;
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;

/// Simulation environment configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub sample_count: usize,
    /// Base seed; `None` draws one from entropy for each run
    pub seed: Option<u64>,
    pub eigenvalue_tolerance: f64,
    pub eigenvalue_floor: f64,
    /// Run years on the rayon pool
    pub parallel: bool,
    pub min_calendar_year: i32,
    pub max_calendar_year: i32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sample_count: 10_000,
            seed: None,
            eigenvalue_tolerance: 1e-8,
            eigenvalue_floor: 1e-8,
            parallel: true,
            min_calendar_year: 2000,
            max_calendar_year: 2100,
        }
    }
}

impl SimulationConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let seed = match env::var("GHG_SEED") {
            Ok(value) if !value.trim().is_empty() => Some(
                value
                    .trim()
                    .parse::<u64>()
                    .context("Failed to parse GHG_SEED")?,
            ),
            _ => None,
        };

        let config = Self {
            sample_count: Self::parse("GHG_SAMPLE_COUNT", defaults.sample_count)?,
            seed,
            eigenvalue_tolerance: Self::parse(
                "GHG_EIGENVALUE_TOLERANCE",
                defaults.eigenvalue_tolerance,
            )?,
            eigenvalue_floor: Self::parse("GHG_EIGENVALUE_FLOOR", defaults.eigenvalue_floor)?,
            parallel: Self::parse("GHG_PARALLEL", defaults.parallel)?,
            min_calendar_year: Self::parse("GHG_MIN_CALENDAR_YEAR", defaults.min_calendar_year)?,
            max_calendar_year: Self::parse("GHG_MAX_CALENDAR_YEAR", defaults.max_calendar_year)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_count < 2 {
            bail!("sample_count must be at least 2, got {}", self.sample_count);
        }
        if self.eigenvalue_tolerance < 0.0 || !self.eigenvalue_tolerance.is_finite() {
            bail!(
                "eigenvalue_tolerance must be a non-negative number, got {}",
                self.eigenvalue_tolerance
            );
        }
        if self.eigenvalue_floor < 0.0 || !self.eigenvalue_floor.is_finite() {
            bail!(
                "eigenvalue_floor must be a non-negative number, got {}",
                self.eigenvalue_floor
            );
        }
        if self.min_calendar_year > self.max_calendar_year {
            bail!(
                "min_calendar_year {} is after max_calendar_year {}",
                self.min_calendar_year,
                self.max_calendar_year
            );
        }
        Ok(())
    }

    pub fn psd_repair(&self) -> PsdRepairConfig {
        PsdRepairConfig {
            tolerance: self.eigenvalue_tolerance,
            floor: self.eigenvalue_floor,
        }
    }

    pub fn monte_carlo(&self) -> MonteCarloConfig {
        MonteCarloConfig {
            sample_count: self.sample_count,
            factorization_tolerance: self.eigenvalue_tolerance,
        }
    }

    pub fn calendar_years(&self) -> RangeInclusive<i32> {
        self.min_calendar_year..=self.max_calendar_year
    }

    fn parse<T>(key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match env::var(key) {
            Ok(value) => value
                .trim()
                .parse::<T>()
                .with_context(|| format!("Failed to parse {}", key)),
            Err(_) => Ok(default),
        }
    }
}
