//! Run assumptions and economic/demographic scenario tables

mod scenario_table;
pub mod loader;

pub use scenario_table::{
    modulo_map, AgeKey, IndexationKey, MortalityKey, PensionTariffKey, ReturnKey, ScenarioTable,
    SimulationAxis, Status, TariffKey, YearKey,
};
pub use loader::{load_assumption, load_scenario_tables, DEFAULT_DATA_PATH};

use crate::member::{ClaimDefinition, Member};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Global parameters of a projection run (the single assumption row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssumptionSet {
    pub calculation_date: NaiveDate,
    /// State pension (AOW) base amount
    pub aow: f64,
    /// Years added to ages before mortality lookups
    pub age_adjustment: i32,
    /// Moment of investment within the year: 0 = begin, 1 = end
    pub investment_timing: f64,
    pub inflation_variant: u32,
    pub salary_increase_variant: u32,
    pub indexation_variant: u32,
    pub interest_variant: u32,
    pub return_variant: u32,
    pub nqx_variant: u32,
    pub tariff_variant: u32,
    pub pension_tariff_variant: u32,
}

/// All scenario tables, each filtered to the variant the assumption row selects
#[derive(Debug, Clone)]
pub struct ScenarioTables {
    pub inflation: ScenarioTable<YearKey>,
    pub salary_increase: ScenarioTable<AgeKey>,
    pub indexation: ScenarioTable<IndexationKey>,
    pub interest: ScenarioTable<YearKey>,
    pub investment_return: ScenarioTable<ReturnKey>,
    pub mortality: ScenarioTable<MortalityKey>,
    pub tariff: ScenarioTable<TariffKey>,
    /// Annuity tariffs at the pension date, used by the summary
    pub pension_tariff: ScenarioTable<PensionTariffKey>,
}

/// Read-only inputs of one projection run
#[derive(Debug, Clone)]
pub struct SourceData {
    pub members: Vec<Member>,
    pub claims: Vec<ClaimDefinition>,
    pub assumption: AssumptionSet,
    pub tables: ScenarioTables,
}

impl SourceData {
    /// Load all source tables from CSV files in the default location (data/)
    pub fn from_csv(has_simulated_mortality: bool) -> crate::Result<Self> {
        Self::from_csv_path(Path::new(DEFAULT_DATA_PATH), has_simulated_mortality)
    }

    /// Load all source tables from CSV files in a specific directory
    pub fn from_csv_path(dir: &Path, has_simulated_mortality: bool) -> crate::Result<Self> {
        let members = crate::member::load_members(dir.join(crate::member::loader::MEMBERS_FILE))?;
        let claims = crate::member::load_claims(dir)?;
        let assumption = load_assumption(dir)?;
        let tables = load_scenario_tables(dir, &assumption, has_simulated_mortality)?;

        log::info!(
            "Loaded {} members, {} plan claims from {}",
            members.len(),
            claims.len(),
            dir.display()
        );

        Ok(Self {
            members,
            claims,
            assumption,
            tables,
        })
    }
}
