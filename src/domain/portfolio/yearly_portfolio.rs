use crate::domain::errors::DataError;
use crate::domain::portfolio::project::{Project, YearlyFigures};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::RangeInclusive;

/// One row of the long yearly portfolio table, keyed by `(project_id, calendar_year)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyRow {
    pub project_id: String,
    pub project_name: String,
    pub technology: String,
    pub country: String,
    pub contract_duration: u32,
    pub start_year: i32,
    pub calendar_year: i32,
    pub figures: YearlyFigures,
}

/// The yearly portfolio: every project of the universe with its per-year
/// figures. Project order is the order of first appearance and is the order
/// used for the project correlation matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearlyPortfolio {
    projects: Vec<Project>,
}

impl YearlyPortfolio {
    /// Creates a portfolio, rejecting duplicate project ids.
    pub fn new(projects: Vec<Project>) -> Result<Self, DataError> {
        let mut seen = HashSet::with_capacity(projects.len());
        for project in &projects {
            if !seen.insert(project.id.as_str()) {
                return Err(DataError::DuplicateProject {
                    project_id: project.id.clone(),
                });
            }
        }
        Ok(Self { projects })
    }

    /// Pivots long rows back into projects.
    ///
    /// Every row of a project must agree on its static attributes, and each
    /// `(project_id, calendar_year)` key may appear only once.
    pub fn from_rows(rows: impl IntoIterator<Item = YearlyRow>) -> Result<Self, DataError> {
        let mut projects: Vec<Project> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for row in rows {
            let position = match positions.get(&row.project_id) {
                Some(&position) => {
                    Self::check_consistent(&projects[position], &row)?;
                    position
                }
                None => {
                    let mut project = Project::new(
                        row.project_id.clone(),
                        row.technology.clone(),
                        row.country.clone(),
                        row.start_year,
                        row.contract_duration,
                    );
                    project.name = row.project_name.clone();
                    projects.push(project);
                    positions.insert(row.project_id.clone(), projects.len() - 1);
                    projects.len() - 1
                }
            };

            let project = &mut projects[position];
            if project.yearly.contains_key(&row.calendar_year) {
                return Err(DataError::DuplicateYear {
                    project_id: row.project_id,
                    year: row.calendar_year,
                });
            }
            project.yearly.insert(row.calendar_year, row.figures);
        }

        Ok(Self { projects })
    }

    fn check_consistent(project: &Project, row: &YearlyRow) -> Result<(), DataError> {
        let mismatch = if project.technology != row.technology {
            Some(format!(
                "technology '{}' vs '{}'",
                project.technology, row.technology
            ))
        } else if project.country != row.country {
            Some(format!("country '{}' vs '{}'", project.country, row.country))
        } else if project.start_year != row.start_year {
            Some(format!(
                "start year {} vs {}",
                project.start_year, row.start_year
            ))
        } else if project.contract_duration != row.contract_duration {
            Some(format!(
                "contract duration {} vs {}",
                project.contract_duration, row.contract_duration
            ))
        } else {
            None
        };

        match mismatch {
            Some(reason) => Err(DataError::InconsistentProject {
                project_id: row.project_id.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project_ids(&self) -> Vec<&str> {
        self.projects.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Calendar years from the earliest start year to the latest contract end
    /// year. `None` when no project covers any year.
    pub fn horizon(&self) -> Result<Option<RangeInclusive<i32>>, DataError> {
        let mut bounds: Option<(i32, i32)> = None;
        for project in self.projects.iter().filter(|p| p.contract_duration > 0) {
            let end = project.end_year()?;
            bounds = Some(match bounds {
                Some((first, last)) => (first.min(project.start_year), last.max(end)),
                None => (project.start_year, end),
            });
        }
        Ok(bounds.map(|(first, last)| first..=last))
    }

    /// Every calendar year for which some project carries figures
    pub fn calendar_years(&self) -> BTreeSet<i32> {
        self.projects
            .iter()
            .flat_map(|p| p.yearly.keys().copied())
            .collect()
    }
}
