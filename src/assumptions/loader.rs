//! CSV-based assumption and scenario table loader
//!
//! Loads the assumption row and the scenario tables from CSV files in data/.
//! Every scenario file holds several variants; only the rows of the variant
//! selected by the assumption row are kept.

use super::{
    AssumptionSet, IndexationKey, MortalityKey, PensionTariffKey, ReturnKey, ScenarioTable,
    ScenarioTables, Status, TariffKey,
};
use crate::error::{ProjectionError, Result, Stage};
use crate::member::{ClaimCode, Sex};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::fs::File;
use std::hash::Hash;
use std::io::Read;
use std::path::Path;

/// Default path to the source data directory
pub const DEFAULT_DATA_PATH: &str = "data";

pub const ASSUMPTION_FILE: &str = "assumption.csv";
pub const INFLATION_FILE: &str = "inflation.csv";
pub const SALARY_INCREASE_FILE: &str = "salary_increase.csv";
pub const INDEXATION_FILE: &str = "indexation.csv";
pub const INTEREST_FILE: &str = "interest.csv";
pub const RETURN_FILE: &str = "investment_return.csv";
pub const MORTALITY_FILE: &str = "mortality.csv";
pub const TARIFF_FILE: &str = "tariff.csv";
pub const PENSION_TARIFF_FILE: &str = "pension_tariff.csv";

/// Whether rows of a table must, may or must not carry a simulation number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimulationColumn {
    Required,
    Forbidden,
    Optional,
}

/// One CSV row of a scenario table
trait ScenarioRecord: DeserializeOwned {
    type Key: Copy + Eq + Hash + Debug;

    fn variant(&self) -> u32;

    fn into_entry(self) -> Result<(Self::Key, Option<u32>, f64)>;
}

/// Rate by projection year (inflation, interest)
#[derive(Debug, serde::Deserialize)]
struct YearRateRow {
    variant: u32,
    year: u32,
    simulation: u32,
    rate: f64,
}

impl ScenarioRecord for YearRateRow {
    type Key = u32;

    fn variant(&self) -> u32 {
        self.variant
    }

    fn into_entry(self) -> Result<(u32, Option<u32>, f64)> {
        Ok((self.year, Some(self.simulation), self.rate))
    }
}

/// Rate by attained age (salary increase)
#[derive(Debug, serde::Deserialize)]
struct AgeRateRow {
    variant: u32,
    age: i32,
    simulation: u32,
    rate: f64,
}

impl ScenarioRecord for AgeRateRow {
    type Key = i32;

    fn variant(&self) -> u32 {
        self.variant
    }

    fn into_entry(self) -> Result<(i32, Option<u32>, f64)> {
        Ok((self.age, Some(self.simulation), self.rate))
    }
}

#[derive(Debug, serde::Deserialize)]
struct IndexationRow {
    variant: u32,
    status: String,
    year: u32,
    simulation: u32,
    rate: f64,
}

impl ScenarioRecord for IndexationRow {
    type Key = IndexationKey;

    fn variant(&self) -> u32 {
        self.variant
    }

    fn into_entry(self) -> Result<(IndexationKey, Option<u32>, f64)> {
        let status = Status::from_code(&self.status).ok_or_else(|| {
            ProjectionError::integrity(
                Stage::Load,
                INDEXATION_FILE,
                format!("unknown status '{}'", self.status),
            )
        })?;
        Ok(((status, self.year), Some(self.simulation), self.rate))
    }
}

#[derive(Debug, serde::Deserialize)]
struct ReturnRow {
    variant: u32,
    age_at_start: i32,
    year: u32,
    simulation: u32,
    rate: f64,
}

impl ScenarioRecord for ReturnRow {
    type Key = ReturnKey;

    fn variant(&self) -> u32 {
        self.variant
    }

    fn into_entry(self) -> Result<(ReturnKey, Option<u32>, f64)> {
        Ok(((self.age_at_start, self.year), Some(self.simulation), self.rate))
    }
}

fn parse_sex(table: &str, code: &str) -> Result<Sex> {
    Sex::from_code(code)
        .ok_or_else(|| ProjectionError::integrity(Stage::Load, table, format!("unknown sex '{}'", code)))
}

fn parse_claim(table: &str, code: &str) -> Result<ClaimCode> {
    ClaimCode::from_code(code).ok_or_else(|| {
        ProjectionError::integrity(Stage::Load, table, format!("unknown claim code '{}'", code))
    })
}

#[derive(Debug, serde::Deserialize)]
struct MortalityRow {
    variant: u32,
    sex: String,
    age_at_start: i32,
    age: i32,
    #[serde(default)]
    simulation: Option<u32>,
    qx: f64,
}

impl ScenarioRecord for MortalityRow {
    type Key = MortalityKey;

    fn variant(&self) -> u32 {
        self.variant
    }

    fn into_entry(self) -> Result<(MortalityKey, Option<u32>, f64)> {
        let sex = parse_sex(MORTALITY_FILE, &self.sex)?;
        Ok(((sex, self.age_at_start, self.age), self.simulation, self.qx))
    }
}

#[derive(Debug, serde::Deserialize)]
struct TariffRow {
    variant: u32,
    tariff_id: u32,
    claim: String,
    sex: String,
    age: i32,
    #[serde(default)]
    simulation: Option<u32>,
    tariff: f64,
}

impl ScenarioRecord for TariffRow {
    type Key = TariffKey;

    fn variant(&self) -> u32 {
        self.variant
    }

    fn into_entry(self) -> Result<(TariffKey, Option<u32>, f64)> {
        let claim = parse_claim(TARIFF_FILE, &self.claim)?;
        let sex = parse_sex(TARIFF_FILE, &self.sex)?;
        Ok(((self.tariff_id, claim, sex, self.age), self.simulation, self.tariff))
    }
}

#[derive(Debug, serde::Deserialize)]
struct PensionTariffRow {
    variant: u32,
    pension_age: u32,
    sex: String,
    claim: String,
    age_at_start: i32,
    #[serde(default)]
    simulation: Option<u32>,
    tariff: f64,
}

impl ScenarioRecord for PensionTariffRow {
    type Key = PensionTariffKey;

    fn variant(&self) -> u32 {
        self.variant
    }

    fn into_entry(self) -> Result<(PensionTariffKey, Option<u32>, f64)> {
        let sex = parse_sex(PENSION_TARIFF_FILE, &self.sex)?;
        let claim = parse_claim(PENSION_TARIFF_FILE, &self.claim)?;
        Ok((
            (self.pension_age, sex, claim, self.age_at_start),
            self.simulation,
            self.tariff,
        ))
    }
}

/// Read one scenario table, keeping only the selected variant
fn read_table<R, T>(
    reader: R,
    name: &str,
    variant: u32,
    simulation_column: SimulationColumn,
) -> Result<ScenarioTable<T::Key>>
where
    R: Read,
    T: ScenarioRecord,
{
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut entries = Vec::new();

    for result in csv_reader.deserialize() {
        let row: T = result?;
        if row.variant() != variant {
            continue;
        }
        let entry = row.into_entry()?;
        match (simulation_column, entry.1) {
            (SimulationColumn::Required, None) => {
                return Err(ProjectionError::config(
                    Stage::Load,
                    format!("{} requires a simulation number on every row", name),
                ));
            }
            (SimulationColumn::Forbidden, Some(_)) => {
                return Err(ProjectionError::config(
                    Stage::Load,
                    format!(
                        "{} carries a simulation dimension but simulated mortality is disabled",
                        name
                    ),
                ));
            }
            _ => {}
        }
        entries.push(entry);
    }

    if entries.is_empty() {
        return Err(ProjectionError::config(
            Stage::Load,
            format!("{} has no rows for selected variant {}", name, variant),
        ));
    }

    let table = ScenarioTable::from_entries(name, entries)?;
    log::debug!("Loaded {} ({} rows, {:?})", name, table.len(), table.axis());
    Ok(table)
}

fn read_table_file<T: ScenarioRecord>(
    dir: &Path,
    file: &str,
    variant: u32,
    simulation_column: SimulationColumn,
) -> Result<ScenarioTable<T::Key>> {
    let reader = File::open(dir.join(file))?;
    read_table::<_, T>(reader, file, variant, simulation_column)
}

/// Load the assumption row from any reader
///
/// The first row is used; a file without rows is a configuration error.
pub fn load_assumption_from_reader<R: Read>(reader: R) -> Result<AssumptionSet> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows = csv_reader.deserialize::<AssumptionSet>();

    let assumption = match rows.next() {
        Some(row) => row?,
        None => {
            return Err(ProjectionError::config(
                Stage::Load,
                format!("{} contains no assumption row", ASSUMPTION_FILE),
            ))
        }
    };
    if rows.next().is_some() {
        log::warn!("{} has more than one row; using the first", ASSUMPTION_FILE);
    }

    Ok(assumption)
}

/// Load the assumption row from assumption.csv in a directory
pub fn load_assumption(dir: &Path) -> Result<AssumptionSet> {
    let file = File::open(dir.join(ASSUMPTION_FILE))?;
    load_assumption_from_reader(file)
}

/// Load all scenario tables from a directory, filtered by the assumption's variants
pub fn load_scenario_tables(
    dir: &Path,
    assumption: &AssumptionSet,
    has_simulated_mortality: bool,
) -> Result<ScenarioTables> {
    let demographic = if has_simulated_mortality {
        SimulationColumn::Required
    } else {
        SimulationColumn::Forbidden
    };

    Ok(ScenarioTables {
        inflation: read_table_file::<YearRateRow>(
            dir,
            INFLATION_FILE,
            assumption.inflation_variant,
            SimulationColumn::Required,
        )?,
        salary_increase: read_table_file::<AgeRateRow>(
            dir,
            SALARY_INCREASE_FILE,
            assumption.salary_increase_variant,
            SimulationColumn::Required,
        )?,
        indexation: read_table_file::<IndexationRow>(
            dir,
            INDEXATION_FILE,
            assumption.indexation_variant,
            SimulationColumn::Required,
        )?,
        interest: read_table_file::<YearRateRow>(
            dir,
            INTEREST_FILE,
            assumption.interest_variant,
            SimulationColumn::Required,
        )?,
        investment_return: read_table_file::<ReturnRow>(
            dir,
            RETURN_FILE,
            assumption.return_variant,
            SimulationColumn::Required,
        )?,
        mortality: read_table_file::<MortalityRow>(
            dir,
            MORTALITY_FILE,
            assumption.nqx_variant,
            demographic,
        )?,
        tariff: read_table_file::<TariffRow>(
            dir,
            TARIFF_FILE,
            assumption.tariff_variant,
            demographic,
        )?,
        pension_tariff: read_table_file::<PensionTariffRow>(
            dir,
            PENSION_TARIFF_FILE,
            assumption.pension_tariff_variant,
            SimulationColumn::Optional,
        )?,
    })
}
