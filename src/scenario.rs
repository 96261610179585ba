//! Scenario runner for complete projection runs
//!
//! Pre-loads the source data once, then allows running many projections with
//! different configurations without re-reading CSV files.

use crate::assumptions::{SimulationAxis, SourceData};
use crate::error::{ProjectionError, Result, Stage};
use crate::panel::Panel;
use crate::projection::{ProjectionConfig, ProjectionEngine, SummaryReducer, SummaryRow};
use std::path::Path;

/// Projected panel and its summary
#[derive(Debug, Clone)]
pub struct ProjectionOutput {
    pub panel: Panel,
    pub summary: Vec<SummaryRow>,
}

/// Pre-loaded scenario runner
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::from_csv_path(Path::new("data"), false)?;
///
/// for simulation_count in [1, 100, 1000] {
///     let config = ProjectionConfig { simulation_count, ..Default::default() };
///     let output = runner.run(&config)?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    source: SourceData,
}

impl ScenarioRunner {
    /// Create runner by loading source data from the default location (data/)
    pub fn from_csv(has_simulated_mortality: bool) -> Result<Self> {
        Ok(Self {
            source: SourceData::from_csv(has_simulated_mortality)?,
        })
    }

    /// Create runner from a specific data directory
    pub fn from_csv_path(path: &Path, has_simulated_mortality: bool) -> Result<Self> {
        Ok(Self {
            source: SourceData::from_csv_path(path, has_simulated_mortality)?,
        })
    }

    /// Create runner with pre-built source data
    pub fn with_source(source: SourceData) -> Self {
        Self { source }
    }

    /// Mortality and tariff tables must match the configured simulation dimension
    fn check_dimensions(&self, config: &ProjectionConfig) -> Result<()> {
        let tables = &self.source.tables;
        for (name, axis) in [
            (tables.mortality.name(), tables.mortality.axis()),
            (tables.tariff.name(), tables.tariff.axis()),
        ] {
            let simulated = matches!(axis, SimulationAxis::Simulated(_));
            if simulated != config.has_simulated_mortality {
                return Err(ProjectionError::config(
                    Stage::IndexResolution,
                    format!(
                        "{} is {:?} but has_simulated_mortality is {}",
                        name, axis, config.has_simulated_mortality
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Run the full pipeline: panel, indices, projection, summary
    pub fn run(&self, config: &ProjectionConfig) -> Result<ProjectionOutput> {
        config.validate()?;
        self.check_dimensions(config)?;

        let source = &self.source;
        let engine = ProjectionEngine::new(source.assumption.clone(), config.clone());
        let panel = engine.run(&source.members, &source.claims, &source.tables)?;
        let summary = SummaryReducer::new(&source.tables.pension_tariff).reduce(&panel)?;

        Ok(ProjectionOutput { panel, summary })
    }

    /// Run several configurations against the same source data
    pub fn run_scenarios(&self, configs: &[ProjectionConfig]) -> Result<Vec<ProjectionOutput>> {
        configs.iter().map(|config| self.run(config)).collect()
    }

    /// Get reference to the source data for inspection
    pub fn source(&self) -> &SourceData {
        &self.source
    }

    /// Get mutable reference to the source data for customization
    pub fn source_mut(&mut self) -> &mut SourceData {
        &mut self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::{AssumptionSet, ScenarioTable, ScenarioTables, Status};
    use crate::member::{ClaimCode, ClaimDefinition, ClaimKind, Member, PlanType, Sex};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn claim(claim: ClaimCode, percentage: f64, tariff_id: u32) -> ClaimDefinition {
        ClaimDefinition {
            plan_id: 1,
            plan_type: PlanType::AveragePay,
            claim,
            pension_age: 67,
            percentage,
            franchise: 13_000.0,
            max_salary: 105_000.0,
            premium_franchise: 13_000.0,
            premium_ceiling: 105_000.0,
            pct_own_contribution: 0.0,
            tariff_id,
        }
    }

    /// One member with three years to go, 2% active indexation and flat economics
    fn fixture() -> SourceData {
        let member = Member {
            id: 1,
            name: "fixture".to_string(),
            birth_date: date(1954, 1, 10),
            hire_date: date(2000, 1, 1),
            sex: Sex::Male,
            part_time_pct: 1.0,
            ft_salary: 23_000.0,
            op_premium_exempt: 0.0,
            np_premium_exempt: 0.0,
            memo: String::new(),
        };
        let assumption = AssumptionSet {
            calculation_date: date(2018, 1, 1),
            aow: 14_000.0,
            age_adjustment: 0,
            investment_timing: 0.0,
            inflation_variant: 1,
            salary_increase_variant: 1,
            indexation_variant: 1,
            interest_variant: 1,
            return_variant: 1,
            nqx_variant: 1,
            tariff_variant: 1,
            pension_tariff_variant: 1,
        };

        let years = 1..=3u32;
        let tables = ScenarioTables {
            inflation: ScenarioTable::from_entries("inflation", years.clone().map(|y| (y, Some(1), 0.0)))
                .unwrap(),
            salary_increase: ScenarioTable::from_entries("salary_increase", (64..=66).map(|a| (a, Some(1), 0.0)))
                .unwrap(),
            indexation: ScenarioTable::from_entries(
                "indexation",
                years
                    .clone()
                    .flat_map(|y| [((Status::Active, y), Some(1), 0.02), ((Status::Inactive, y), Some(1), 0.0)]),
            )
            .unwrap(),
            interest: ScenarioTable::from_entries("interest", years.clone().map(|y| (y, Some(1), 0.03))).unwrap(),
            investment_return: ScenarioTable::from_entries(
                "investment_return",
                years.clone().map(|y| ((64, y), Some(1), 0.04)),
            )
            .unwrap(),
            mortality: ScenarioTable::from_entries(
                "mortality",
                (64..=66).map(|a| ((Sex::Male, 64, a), None, 0.01)),
            )
            .unwrap(),
            tariff: ScenarioTable::from_entries(
                "tariff",
                (64..=66).map(|a| ((2, ClaimCode::Capital, Sex::Male, a), None, 1.0)),
            )
            .unwrap(),
            pension_tariff: ScenarioTable::from_entries(
                "pension_tariff",
                vec![
                    ((67, Sex::Male, ClaimCode::OldAge, 64), None, 12.0),
                    ((67, Sex::Male, ClaimCode::Survivor, 64), None, 4.0),
                ],
            )
            .unwrap(),
        };

        SourceData {
            members: vec![member],
            claims: vec![claim(ClaimCode::OldAge, 0.01875, 1)],
            assumption,
            tables,
        }
    }

    #[test]
    fn test_average_pay_fixture_end_to_end() {
        let runner = ScenarioRunner::with_source(fixture());
        let output = runner.run(&ProjectionConfig::default()).expect("run");

        let rows = &output.panel.groups()[0].rows;
        assert_eq!(rows.len(), 3);
        let accruals: Vec<f64> = rows.iter().map(|r| r.accrual).collect();
        assert_relative_eq!(accruals[0], 187.5, epsilon = 1e-9);
        assert_relative_eq!(accruals[1], 191.25, epsilon = 1e-9);
        assert_relative_eq!(accruals[2], 195.075, epsilon = 1e-9);
        assert_relative_eq!(rows[0].backservice, 0.0);
        assert_relative_eq!(rows[2].time_prop, 573.825, epsilon = 1e-9);

        assert_eq!(output.summary.len(), 1);
        let summary = &output.summary[0];
        assert_relative_eq!(summary.time_prop, 573.825, epsilon = 1e-9);
        assert_eq!(summary.capital_dc, 0.0);
        assert_relative_eq!(summary.capital, 573.825 * 12.0, epsilon = 1e-9);
        assert_relative_eq!(summary.projected_op, 573.825, epsilon = 1e-9);
    }

    #[test]
    fn test_summary_completeness_across_simulations() {
        let mut source = fixture();
        source.claims.push(claim(ClaimCode::Survivor, 0.013125, 1));
        source.claims.push(claim(ClaimCode::Capital, 0.05, 2));
        let runner = ScenarioRunner::with_source(source);

        let config = ProjectionConfig {
            simulation_count: 3,
            ..Default::default()
        };
        let output = runner.run(&config).expect("run");

        assert_eq!(output.panel.groups().len(), 9);
        assert_eq!(output.summary.len(), 3);
        let simulations: Vec<u32> = output.summary.iter().map(|s| s.simulation).collect();
        assert_eq!(simulations, vec![1, 2, 3]);

        // single-path tables: every simulation projects the same
        assert_relative_eq!(output.summary[0].capital, output.summary[2].capital, epsilon = 1e-9);
        assert!(output.summary[0].capital_dc > 0.0);

        for group in output.panel.groups() {
            for row in &group.rows {
                match group.kind {
                    ClaimKind::DefinedContribution => assert_eq!(row.premium_db, 0.0),
                    _ => assert_eq!(row.premium_dc, 0.0),
                }
            }
        }
    }

    #[test]
    fn test_non_accruing_plan_is_left_out_of_summary() {
        let mut source = fixture();
        source.claims.push(ClaimDefinition {
            plan_id: 2,
            plan_type: PlanType::Contribution,
            ..claim(ClaimCode::OldAge, 0.01875, 1)
        });
        let output = ScenarioRunner::with_source(source)
            .run(&ProjectionConfig::default())
            .expect("run");

        assert_eq!(output.panel.groups().len(), 2);
        let plans: Vec<u32> = output.summary.iter().map(|s| s.plan_id).collect();
        assert_eq!(plans, vec![1]);
    }

    #[test]
    fn test_zero_contribution_capital_is_zero() {
        let mut source = fixture();
        source.claims = vec![claim(ClaimCode::Capital, 0.0, 2)];
        let output = ScenarioRunner::with_source(source)
            .run(&ProjectionConfig::default())
            .expect("run");

        assert_eq!(output.summary.len(), 1);
        let summary = &output.summary[0];
        assert_eq!(summary.capital_dc, 0.0);
        assert_eq!(summary.capital, 0.0);
        assert_eq!(summary.projected_op_dc, 0.0);
        assert!(output.panel.groups()[0].rows.iter().all(|r| r.capital == 0.0));
    }

    #[test]
    fn test_simulated_mortality_mismatch() {
        let runner = ScenarioRunner::with_source(fixture());
        let config = ProjectionConfig {
            has_simulated_mortality: true,
            ..Default::default()
        };
        let err = runner.run(&config).unwrap_err();
        assert!(matches!(err, ProjectionError::Configuration { .. }));
    }

    #[test]
    fn test_missing_interest_is_fatal() {
        let mut source = fixture();
        source.tables.interest =
            ScenarioTable::from_entries("interest", vec![(1u32, Some(1), 0.03), (2, Some(1), 0.03)]).unwrap();
        let err = ScenarioRunner::with_source(source)
            .run(&ProjectionConfig::default())
            .unwrap_err();
        assert_eq!(err.stage(), Stage::IndexResolution);
    }

    #[test]
    fn test_sample_data_directory() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join("sample");
        let runner = ScenarioRunner::from_csv_path(&dir, false).expect("load sample");
        assert_eq!(runner.source().members.len(), 2);
        assert_eq!(runner.source().claims.len(), 3);

        let config = ProjectionConfig {
            simulation_count: 2,
            ..Default::default()
        };
        let output = runner.run(&config).expect("run sample");
        // 2 plans x 2 members x 2 simulations
        assert_eq!(output.summary.len(), 8);
        assert!(output.summary.iter().all(|s| s.projected_op.is_finite()));
    }
}
