//! Scenario index resolution
//!
//! Every economic and demographic driver follows the same routine: look up
//! the period value for each row under its (wrapped) simulation number,
//! compound it into a running index per group, and optionally lag it by one
//! year. Drivers differ only in table, key, sign, lag and miss policy.

use crate::assumptions::{ScenarioTable, ScenarioTables, Status};
use crate::error::{ProjectionError, Result, Stage};
use crate::member::ClaimKind;
use crate::panel::elementwise::pct_to_cum_index;
use crate::panel::{group_scan, IndexSlot, Panel, PanelGroup, PanelRow, ScanOp};
use rayon::prelude::*;
use std::fmt::Debug;
use std::hash::Hash;

/// Direction in which a rate moves its running index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Growth: `Π(1 + r)`
    Plus,
    /// Decrement: `Π(1 - r)`
    Minus,
    /// Raw value, not compounded
    None,
}

impl Sign {
    fn factor(&self) -> Option<f64> {
        match self {
            Sign::Plus => Some(1.0),
            Sign::Minus => Some(-1.0),
            Sign::None => None,
        }
    }
}

/// What a lookup miss resolves to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MissPolicy {
    /// Neutral value (rate 0, multiplier 1)
    Default(f64),
    /// NaN; fatal wherever the driver is required
    Undefined,
}

/// Which groups cannot do without a defined value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    AllGroups,
    DefinedContribution,
    Never,
}

impl Requirement {
    fn applies_to(&self, kind: ClaimKind) -> bool {
        match self {
            Requirement::AllGroups => true,
            Requirement::DefinedContribution => kind == ClaimKind::DefinedContribution,
            Requirement::Never => false,
        }
    }
}

/// Descriptor of one scenario driver
pub struct Driver<'a, K> {
    pub name: &'static str,
    pub table: &'a ScenarioTable<K>,
    pub key: fn(&PanelGroup, &PanelRow) -> K,
    pub sign: Sign,
    pub lag: bool,
    pub on_miss: MissPolicy,
    pub slot: IndexSlot,
    pub required: Requirement,
}

impl<'a, K> Driver<'a, K>
where
    K: Copy + Eq + Hash + Debug + Send + Sync,
{
    /// Look up and compound the driver for one group, returning the miss count
    fn resolve_group(&self, group: &mut PanelGroup) -> Result<usize> {
        let simulation = group.key.simulation;
        let mut misses = 0;

        let view: &PanelGroup = group;
        let rates: Vec<f64> = view
            .rows
            .iter()
            .map(|row| {
                self.table
                    .get((self.key)(view, row), simulation)
                    .unwrap_or_else(|| {
                        misses += 1;
                        match self.on_miss {
                            MissPolicy::Default(value) => value,
                            MissPolicy::Undefined => f64::NAN,
                        }
                    })
            })
            .collect();

        if self.required.applies_to(group.kind) {
            if let Some(row) = group.rows.iter().zip(&rates).find(|(_, r)| r.is_nan()).map(|(row, _)| row) {
                return Err(ProjectionError::UndefinedIndex {
                    stage: Stage::IndexResolution,
                    driver: self.name,
                    member_id: group.key.member_id,
                    plan_id: group.key.plan_id,
                    claim: group.key.claim.to_string(),
                    simulation,
                    boy: row.boy,
                });
            }
        }

        let cumulative = match self.sign.factor() {
            Some(sign) => pct_to_cum_index(&rates, sign, 1.0),
            None => rates.clone(),
        };

        for ((row, rate), cum) in group.rows.iter_mut().zip(rates).zip(cumulative) {
            let values = row.index_mut(self.slot);
            values.rate = rate;
            values.cumulative = cum;
        }

        Ok(misses)
    }

    /// Resolve the driver on every group of the panel
    pub fn resolve(&self, panel: &mut Panel) -> Result<usize> {
        let misses: usize = panel
            .groups_mut()
            .par_iter_mut()
            .map(|group| self.resolve_group(group))
            .collect::<Result<Vec<usize>>>()?
            .into_iter()
            .sum();

        if self.lag {
            let slot = self.slot;
            group_scan(
                panel,
                ScanOp::Lag { fill: 1.0 },
                |row| row.index(slot).cumulative,
                |row, value| row.index_mut(slot).lagged = value,
            );
        }

        log::debug!(
            "Resolved {}: {} simulations in table, {} misses",
            self.name,
            self.table.simulations(),
            misses
        );
        if misses > 0 {
            if let MissPolicy::Default(value) = self.on_miss {
                log::warn!(
                    "{}: {} rows without a scenario value, using {}",
                    self.name,
                    misses,
                    value
                );
            }
        }
        Ok(misses)
    }
}

/// Resolve every scenario driver on the panel
pub fn resolve_all(panel: &mut Panel, tables: &ScenarioTables) -> Result<()> {
    Driver {
        name: "inflation",
        table: &tables.inflation,
        key: |_, row| row.boy,
        sign: Sign::Plus,
        lag: false,
        on_miss: MissPolicy::Default(0.0),
        slot: IndexSlot::Inflation,
        required: Requirement::Never,
    }
    .resolve(panel)?;

    Driver {
        name: "salary increase",
        table: &tables.salary_increase,
        key: |_, row| row.age_low,
        sign: Sign::Plus,
        lag: false,
        on_miss: MissPolicy::Default(0.0),
        slot: IndexSlot::SalaryIncrease,
        required: Requirement::Never,
    }
    .resolve(panel)?;

    Driver {
        name: "indexation active",
        table: &tables.indexation,
        key: |_, row| (Status::Active, row.boy),
        sign: Sign::Plus,
        lag: true,
        on_miss: MissPolicy::Default(0.0),
        slot: IndexSlot::IndexationActive,
        required: Requirement::Never,
    }
    .resolve(panel)?;

    Driver {
        name: "indexation inactive",
        table: &tables.indexation,
        key: |_, row| (Status::Inactive, row.boy),
        sign: Sign::Plus,
        lag: true,
        on_miss: MissPolicy::Default(0.0),
        slot: IndexSlot::IndexationInactive,
        required: Requirement::Never,
    }
    .resolve(panel)?;

    Driver {
        name: "interest",
        table: &tables.interest,
        key: |_, row| row.boy,
        sign: Sign::Plus,
        lag: true,
        on_miss: MissPolicy::Undefined,
        slot: IndexSlot::Interest,
        required: Requirement::AllGroups,
    }
    .resolve(panel)?;

    Driver {
        name: "investment return",
        table: &tables.investment_return,
        key: |_, row| (row.age0, row.boy),
        sign: Sign::Plus,
        lag: true,
        on_miss: MissPolicy::Undefined,
        slot: IndexSlot::InvestmentReturn,
        required: Requirement::DefinedContribution,
    }
    .resolve(panel)?;

    Driver {
        name: "mortality",
        table: &tables.mortality,
        key: |group, row| (group.member.sex, row.age0_adjusted, row.age_low_adjusted),
        sign: Sign::Minus,
        lag: true,
        on_miss: MissPolicy::Undefined,
        slot: IndexSlot::Survival,
        required: Requirement::DefinedContribution,
    }
    .resolve(panel)?;

    Driver {
        name: "tariff",
        table: &tables.tariff,
        key: |group, row| (group.claim.tariff_id, group.key.claim, group.member.sex, row.age_low),
        sign: Sign::None,
        lag: false,
        on_miss: MissPolicy::Default(1.0),
        slot: IndexSlot::Tariff,
        required: Requirement::Never,
    }
    .resolve(panel)?;

    log::info!("Resolved scenario indices on {} rows", panel.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{ClaimCode, ClaimDefinition, Member, PlanType, Sex};
    use crate::panel::PanelBuilder;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn build_panel(plan_type: PlanType, claim: ClaimCode, simulations: u32) -> Panel {
        let member = Member {
            id: 1,
            name: "test".to_string(),
            birth_date: date(1954, 1, 10),
            hire_date: date(2000, 1, 1),
            sex: Sex::Female,
            part_time_pct: 1.0,
            ft_salary: 30_000.0,
            op_premium_exempt: 0.0,
            np_premium_exempt: 0.0,
            memo: String::new(),
        };
        let definition = ClaimDefinition {
            plan_id: 7,
            plan_type,
            claim,
            pension_age: 67,
            percentage: 0.02,
            franchise: 0.0,
            max_salary: 100_000.0,
            premium_franchise: 0.0,
            premium_ceiling: 100_000.0,
            pct_own_contribution: 0.0,
            tariff_id: 1,
        };
        PanelBuilder::new(date(2018, 1, 1))
            .simulations(simulations)
            .build(&[member], &[definition])
            .expect("panel")
    }

    fn year_table(rates: &[(u32, u32, f64)]) -> ScenarioTable<u32> {
        ScenarioTable::from_entries("test", rates.iter().map(|&(y, s, r)| (y, Some(s), r))).unwrap()
    }

    fn year_driver(table: &ScenarioTable<u32>, on_miss: MissPolicy, required: Requirement) -> Driver<'_, u32> {
        Driver {
            name: "interest",
            table,
            key: |_, row| row.boy,
            sign: Sign::Plus,
            lag: true,
            on_miss,
            slot: IndexSlot::Interest,
            required,
        }
    }

    #[test]
    fn test_cumulative_and_lag() {
        let mut panel = build_panel(PlanType::AveragePay, ClaimCode::OldAge, 1);
        let table = year_table(&[(1, 1, 0.03), (2, 1, 0.04), (3, 1, 0.05)]);
        let misses = year_driver(&table, MissPolicy::Undefined, Requirement::AllGroups)
            .resolve(&mut panel)
            .expect("resolved");
        assert_eq!(misses, 0);

        let rows = &panel.groups()[0].rows;
        assert_relative_eq!(rows[0].interest.cumulative, 1.03);
        assert_relative_eq!(rows[2].interest.cumulative, 1.03 * 1.04 * 1.05, epsilon = 1e-12);
        assert_relative_eq!(rows[0].interest.lagged, 1.0);
        assert_relative_eq!(rows[1].interest.lagged, rows[0].interest.cumulative);
        assert_relative_eq!(rows[2].interest.lagged, rows[1].interest.cumulative);
    }

    #[test]
    fn test_simulations_wrap_without_touching_rows() {
        let mut panel = build_panel(PlanType::AveragePay, ClaimCode::OldAge, 3);
        let table = year_table(&[
            (1, 1, 0.01),
            (2, 1, 0.01),
            (3, 1, 0.01),
            (1, 2, 0.02),
            (2, 2, 0.02),
            (3, 2, 0.02),
        ]);
        year_driver(&table, MissPolicy::Undefined, Requirement::AllGroups)
            .resolve(&mut panel)
            .expect("resolved");

        let groups = panel.groups();
        assert_eq!(groups[2].key.simulation, 3);
        assert_relative_eq!(groups[2].rows[0].interest.rate, 0.01);
        assert_relative_eq!(groups[1].rows[0].interest.rate, 0.02);
    }

    #[test]
    fn test_neutral_default_on_miss() {
        let mut panel = build_panel(PlanType::AveragePay, ClaimCode::OldAge, 1);
        let table = year_table(&[(1, 1, 0.02)]);
        let misses = year_driver(&table, MissPolicy::Default(0.0), Requirement::Never)
            .resolve(&mut panel)
            .expect("resolved");
        assert_eq!(misses, 2);
        let rows = &panel.groups()[0].rows;
        assert_relative_eq!(rows[2].interest.cumulative, 1.02);
    }

    #[test]
    fn test_undefined_required_value_is_fatal() {
        let mut panel = build_panel(PlanType::AveragePay, ClaimCode::OldAge, 1);
        let table = year_table(&[(1, 1, 0.02)]);
        let err = year_driver(&table, MissPolicy::Undefined, Requirement::AllGroups)
            .resolve(&mut panel)
            .unwrap_err();
        match err {
            ProjectionError::UndefinedIndex { driver, boy, .. } => {
                assert_eq!(driver, "interest");
                assert_eq!(boy, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undefined_value_tolerated_outside_requirement() {
        let mut panel = build_panel(PlanType::AveragePay, ClaimCode::OldAge, 1);
        let table = year_table(&[(1, 1, 0.02)]);
        year_driver(&table, MissPolicy::Undefined, Requirement::DefinedContribution)
            .resolve(&mut panel)
            .expect("DB rows do not need this driver");
        assert!(panel.groups()[0].rows[1].interest.cumulative.is_nan());

        let mut dc = build_panel(PlanType::AveragePay, ClaimCode::Capital, 1);
        assert!(year_driver(&table, MissPolicy::Undefined, Requirement::DefinedContribution)
            .resolve(&mut dc)
            .is_err());
    }

    #[test]
    fn test_survival_is_non_increasing() {
        let mut panel = build_panel(PlanType::AveragePay, ClaimCode::Capital, 1);
        let table = ScenarioTable::from_entries(
            "mortality",
            vec![
                ((Sex::Female, 64, 64), None, 0.01),
                ((Sex::Female, 64, 65), None, 0.0),
                ((Sex::Female, 64, 66), None, 0.02),
            ],
        )
        .unwrap();
        Driver {
            name: "mortality",
            table: &table,
            key: |group, row| (group.member.sex, row.age0_adjusted, row.age_low_adjusted),
            sign: Sign::Minus,
            lag: true,
            on_miss: MissPolicy::Undefined,
            slot: IndexSlot::Survival,
            required: Requirement::DefinedContribution,
        }
        .resolve(&mut panel)
        .expect("resolved");

        let survival: Vec<f64> = panel.groups()[0].rows.iter().map(|r| r.survival.cumulative).collect();
        assert_relative_eq!(survival[0], 0.99);
        assert!(survival.windows(2).all(|p| p[1] <= p[0]));
        assert_relative_eq!(panel.groups()[0].rows[0].survival.lagged, 1.0);
    }
}
