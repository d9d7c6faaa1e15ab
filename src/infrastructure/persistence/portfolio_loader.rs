use crate::domain::portfolio::{Project, YearlyFigures, YearlyPortfolio, YearlyRow};
use anyhow::{Context, Result, anyhow, bail};
use csv::StringRecord;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const PROJECT_ID: &str = "project_id";
const PROJECT_NAME: &str = "project_name";
const CONTRACT_DURATION: &str = "contract_duration";
const COUNTRY: &str = "country";
const TECHNOLOGY: &str = "technology";
const START_YEAR: &str = "start_year";

/// Per-year column families of the wide portfolio layout, suffixed `_year_<i>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum YearlyColumn {
    OfferedVolume,
    StandardDeviation,
    DeliveryVolume,
    ExpectedValuePercentage,
}

impl YearlyColumn {
    fn parse(header: &str) -> Option<(Self, u32)> {
        let (family, index) = header.rsplit_once("_year_")?;
        let index: u32 = index.parse().ok()?;
        let column = match family {
            "offered_volume" => Self::OfferedVolume,
            "project_standard_deviation" => Self::StandardDeviation,
            "project_delivery_volume" => Self::DeliveryVolume,
            "project_expected_value_percentage" => Self::ExpectedValuePercentage,
            _ => return None,
        };
        Some((column, index))
    }

    fn assign(self, figures: &mut YearlyFigures, value: Option<f64>) {
        match self {
            Self::OfferedVolume => figures.offered_volume = value,
            Self::StandardDeviation => figures.standard_deviation = value,
            Self::DeliveryVolume => figures.delivery_volume = value,
            Self::ExpectedValuePercentage => figures.expected_value_percentage = value,
        }
    }
}

/// Column positions resolved once from the header row
struct PortfolioLayout {
    project_id: usize,
    project_name: Option<usize>,
    contract_duration: usize,
    country: usize,
    technology: usize,
    start_year: usize,
    yearly: Vec<(usize, YearlyColumn, u32)>,
}

impl PortfolioLayout {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| {
            position(name).ok_or_else(|| anyhow!("Portfolio is missing required column '{}'", name))
        };

        let mut yearly = Vec::new();
        for (i, header) in headers.iter().enumerate() {
            let header = header.trim();
            if header.to_lowercase().contains("risk_bucket") {
                debug!("Ignoring portfolio column '{}'", header);
                continue;
            }
            if let Some((column, index)) = YearlyColumn::parse(header) {
                if index == 0 {
                    bail!("Year index in column '{}' must start at 1", header);
                }
                yearly.push((i, column, index));
            }
        }

        Ok(Self {
            project_id: required(PROJECT_ID)?,
            project_name: position(PROJECT_NAME),
            contract_duration: required(CONTRACT_DURATION)?,
            country: required(COUNTRY)?,
            technology: required(TECHNOLOGY)?,
            start_year: required(START_YEAR)?,
            yearly,
        })
    }
}

/// Loads the wide project-level portfolio table and reshapes it into the
/// yearly (long) form keyed by `(project_id, calendar_year)`.
pub struct PortfolioCsvLoader;

impl PortfolioCsvLoader {
    pub fn load(path: impl AsRef<Path>) -> Result<YearlyPortfolio> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open portfolio file {:?}", path))?;
        let portfolio = Self::from_reader(file)
            .with_context(|| format!("Failed to load portfolio from {:?}", path))?;
        info!(
            "Loaded {} projects from {:?}",
            portfolio.len(),
            path
        );
        Ok(portfolio)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<YearlyPortfolio> {
        let rows = Self::read_rows(reader)?;
        YearlyPortfolio::from_rows(rows).context("Failed to reshape portfolio")
    }

    /// Melts each wide record into one row per contract year that carries
    /// at least one defined figure.
    pub fn read_rows<R: Read>(reader: R) -> Result<Vec<YearlyRow>> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let layout = PortfolioLayout::from_headers(rdr.headers()?)?;

        let mut rows = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record?;
            // Header is line 1
            let line = line + 2;
            let cell = |i: usize| record.get(i).unwrap_or("");

            let project_id = cell(layout.project_id).to_string();
            if project_id.is_empty() {
                bail!("Line {}: empty project_id", line);
            }
            let project_name = layout
                .project_name
                .map(|i| cell(i).to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| project_id.clone());
            let contract_duration = parse_integer(cell(layout.contract_duration))
                .with_context(|| format!("Line {}: invalid {}", line, CONTRACT_DURATION))?;
            let contract_duration = u32::try_from(contract_duration)
                .with_context(|| format!("Line {}: negative {}", line, CONTRACT_DURATION))?;
            let start_year = parse_integer(cell(layout.start_year))
                .with_context(|| format!("Line {}: invalid {}", line, START_YEAR))?;
            let start_year = i32::try_from(start_year)
                .with_context(|| format!("Line {}: {} out of range", line, START_YEAR))?;

            let mut project = Project::new(
                project_id,
                cell(layout.technology),
                cell(layout.country),
                start_year,
                contract_duration,
            );
            project.name = project_name;

            let mut by_index: BTreeMap<u32, YearlyFigures> = BTreeMap::new();
            for &(i, column, index) in &layout.yearly {
                let value = parse_optional(cell(i))
                    .with_context(|| format!("Line {}: invalid value in column {}", line, i + 1))?;
                column.assign(by_index.entry(index).or_default(), value);
            }

            for (index, figures) in by_index {
                if figures.is_empty() {
                    continue;
                }
                let calendar_year = project
                    .calendar_year(index)
                    .with_context(|| format!("Line {}: year index {}", line, index))?;
                rows.push(YearlyRow {
                    project_id: project.id.clone(),
                    project_name: project.name.clone(),
                    technology: project.technology.clone(),
                    country: project.country.clone(),
                    contract_duration,
                    start_year,
                    calendar_year,
                    figures,
                });
            }
        }

        if rows.is_empty() {
            bail!("Portfolio contains no yearly figures");
        }
        Ok(rows)
    }
}

/// Empty cells are undefined
fn parse_optional(value: &str) -> Result<Option<f64>> {
    if value.is_empty() {
        return Ok(None);
    }
    let parsed: f64 = value
        .parse()
        .with_context(|| format!("'{}' is not a number", value))?;
    Ok(Some(parsed))
}

/// Accepts `2025` as well as spreadsheet exports like `2025.0`
fn parse_integer(value: &str) -> Result<i64> {
    if let Ok(parsed) = value.parse::<i64>() {
        return Ok(parsed);
    }
    let parsed: f64 = value
        .parse()
        .with_context(|| format!("'{}' is not a number", value))?;
    if parsed.fract() != 0.0 || !parsed.is_finite() {
        bail!("'{}' is not a whole number", value);
    }
    Ok(parsed as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDE: &str = "\
project_id,project_name,contract_duration,country,technology,counterparty,start_year,screening_date,overall_project_rating,offered_volume_year_1,offered_volume_year_2,project_standard_deviation_year_1,project_standard_deviation_year_2,project_delivery_volume_year_1,project_delivery_volume_year_2,project_expected_value_percentage_year_1,project_expected_value_percentage_year_2,risk_bucket_year_1
1,Kasigau,2,Kenya,REDD+,Acme,2025,2024-01-10,A,100,120,10,12,80,96,0.8,0.8,low
2,Lake Turkana,1,Kenya,Wind,Acme,2026.0,2024-02-11,B,50,,5,,40,,0.8,,high
";

    #[test]
    fn test_melts_wide_rows_to_calendar_years() {
        let rows = PortfolioCsvLoader::read_rows(WIDE.as_bytes()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].calendar_year, 2025);
        assert_eq!(rows[1].calendar_year, 2026);
        assert_eq!(rows[1].figures.offered_volume, Some(120.0));
        assert_eq!(rows[2].project_id, "2");
        assert_eq!(rows[2].calendar_year, 2026);
        assert_eq!(rows[2].figures.standard_deviation, Some(5.0));
    }

    #[test]
    fn test_loads_portfolio_in_file_order() {
        let portfolio = PortfolioCsvLoader::from_reader(WIDE.as_bytes()).unwrap();

        assert_eq!(portfolio.project_ids(), vec!["1", "2"]);
        let first = &portfolio.projects()[0];
        assert_eq!(first.name, "Kasigau");
        assert_eq!(first.technology, "REDD+");
        assert_eq!(first.figures(2026).unwrap().expected_value_percentage, Some(0.8));
        // Year 2 of project 2 is blank and never materialised
        assert!(portfolio.projects()[1].figures(2027).is_none());
    }

    #[test]
    fn test_missing_required_column_fails() {
        let csv = "project_id,country,technology,start_year\n1,Kenya,Wind,2025\n";
        let err = PortfolioCsvLoader::from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("contract_duration"));
    }

    #[test]
    fn test_non_numeric_figure_fails() {
        let csv = "project_id,contract_duration,country,technology,start_year,offered_volume_year_1\n\
                   1,1,Kenya,Wind,2025,lots\n";
        assert!(PortfolioCsvLoader::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_year_index_past_calendar_range_fails() {
        let csv = "project_id,contract_duration,country,technology,start_year,offered_volume_year_4294967295\n\
                   1,1,Kenya,Wind,2025,10\n";
        let err = PortfolioCsvLoader::from_reader(csv.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("not a valid calendar year"));
    }

    #[test]
    fn test_yearly_column_parsing() {
        assert_eq!(
            YearlyColumn::parse("offered_volume_year_12"),
            Some((YearlyColumn::OfferedVolume, 12))
        );
        assert_eq!(YearlyColumn::parse("risk_bucket_year_1"), None);
        assert_eq!(YearlyColumn::parse("offered_volume"), None);
    }
}
