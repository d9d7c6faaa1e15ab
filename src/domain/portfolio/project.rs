use crate::domain::errors::DataError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-year figures of a project. `None` means the cell was left empty in the
/// source table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct YearlyFigures {
    pub offered_volume: Option<f64>,
    pub standard_deviation: Option<f64>,
    /// Point estimate, carried through but not used by the simulation
    pub delivery_volume: Option<f64>,
    pub expected_value_percentage: Option<f64>,
}

impl YearlyFigures {
    pub fn is_empty(&self) -> bool {
        self.offered_volume.is_none()
            && self.standard_deviation.is_none()
            && self.delivery_volume.is_none()
            && self.expected_value_percentage.is_none()
    }
}

/// One greenhouse-gas reduction project with its yearly figures keyed by
/// calendar year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub technology: String,
    pub country: String,
    pub contract_duration: u32,
    pub start_year: i32,
    pub yearly: BTreeMap<i32, YearlyFigures>,
}

impl Project {
    pub fn new(
        id: impl Into<String>,
        technology: impl Into<String>,
        country: impl Into<String>,
        start_year: i32,
        contract_duration: u32,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            technology: technology.into(),
            country: country.into(),
            contract_duration,
            start_year,
            yearly: BTreeMap::new(),
        }
    }

    /// Builder-style helper to attach the figures of one calendar year
    pub fn with_year(mut self, calendar_year: i32, figures: YearlyFigures) -> Self {
        self.yearly.insert(calendar_year, figures);
        self
    }

    /// Maps a 1-based contract year index to its calendar year
    pub fn calendar_year(&self, year_index: u32) -> Result<i32, DataError> {
        i32::try_from(i64::from(self.start_year) + i64::from(year_index) - 1).map_err(|_| {
            DataError::CalendarYearOverflow {
                project_id: self.id.clone(),
                start_year: self.start_year,
                year_index,
            }
        })
    }

    /// Last calendar year covered by the contract. Equals `start_year - 1`
    /// for a zero-length contract.
    pub fn end_year(&self) -> Result<i32, DataError> {
        self.calendar_year(self.contract_duration)
    }

    pub fn is_in_contract(&self, year: i32) -> bool {
        let offset = i64::from(year) - i64::from(self.start_year);
        offset >= 0 && offset < i64::from(self.contract_duration)
    }

    pub fn figures(&self, year: i32) -> Option<&YearlyFigures> {
        self.yearly.get(&year)
    }

    /// A project is active in `year` when the year falls inside its contract
    /// and it offers a defined, nonzero volume for that year.
    pub fn is_active(&self, year: i32) -> bool {
        if !self.is_in_contract(year) {
            return false;
        }

        match self.figures(year).and_then(|f| f.offered_volume) {
            Some(volume) => volume.is_finite() && volume != 0.0,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figures(offered: Option<f64>) -> YearlyFigures {
        YearlyFigures {
            offered_volume: offered,
            standard_deviation: Some(5.0),
            delivery_volume: Some(80.0),
            expected_value_percentage: Some(0.8),
        }
    }

    #[test]
    fn test_contract_window() {
        let project = Project::new("P1", "Solar", "Kenya", 2025, 3);

        assert_eq!(project.end_year().unwrap(), 2027);
        assert_eq!(project.calendar_year(1).unwrap(), 2025);
        assert_eq!(project.calendar_year(3).unwrap(), 2027);
        assert!(!project.is_in_contract(2024));
        assert!(project.is_in_contract(2025));
        assert!(project.is_in_contract(2027));
        assert!(!project.is_in_contract(2028));
    }

    #[test]
    fn test_active_requires_defined_nonzero_volume() {
        let project = Project::new("P1", "Solar", "Kenya", 2025, 3)
            .with_year(2025, figures(Some(100.0)))
            .with_year(2026, figures(Some(0.0)))
            .with_year(2027, figures(None))
            .with_year(2028, figures(Some(100.0)));

        assert!(project.is_active(2025));
        assert!(!project.is_active(2026));
        assert!(!project.is_active(2027));
        // Outside the contract even though figures exist
        assert!(!project.is_active(2028));
    }

    #[test]
    fn test_zero_duration_contract_is_never_active() {
        let project =
            Project::new("P1", "Solar", "Kenya", 2025, 0).with_year(2025, figures(Some(100.0)));

        assert_eq!(project.end_year().unwrap(), 2024);
        assert!(!project.is_active(2025));
    }

    #[test]
    fn test_overlong_contract_end_year_is_an_error() {
        let project = Project::new("P1", "Solar", "Kenya", 2025, i32::MAX as u32);

        assert!(matches!(
            project.end_year(),
            Err(DataError::CalendarYearOverflow { ref project_id, start_year: 2025, .. })
                if project_id == "P1"
        ));
        assert!(project.calendar_year(u32::MAX).is_err());
        // Window checks stay total even when the end year is not representable
        assert!(project.is_in_contract(i32::MAX));
        assert!(!project.is_in_contract(2024));
    }
}
