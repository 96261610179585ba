//! Reduce the projected panel to one row per (plan, member, simulation) at
//! the pension date
//!
//! Accrued DB pensions are converted to capital with the pension-date
//! annuity tariffs; DC capital is converted back to an old-age pension with
//! the combined old-age plus survivor tariff.

use crate::assumptions::{PensionTariffKey, ScenarioTable};
use crate::error::{ProjectionError, Result, Stage};
use crate::member::{ClaimCode, ClaimKind, Sex};
use crate::panel::elementwise::{employee_contribution, full_time_base};
use crate::panel::{Panel, PanelGroup, PanelRow};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Survivor pension as a fraction of the old-age pension
pub const SURVIVOR_FRACTION: f64 = 0.7;

/// Projected pension summary of one member in one plan under one simulation
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub plan_id: u32,
    pub member_id: u32,
    pub simulation: u32,
    pub name: String,
    pub sex: Sex,
    pub birth_date: NaiveDate,
    pub pension_date: NaiveDate,
    pub pension_age: u32,
    pub age0: i32,
    /// Projected years
    pub horizon: u32,
    /// Horizon was cut short by the configured cap
    pub capped: bool,
    pub part_time_pct: f64,

    // Unprojected and projected salary data
    pub salary: f64,
    pub projected_salary: f64,
    pub projected_aow: f64,
    pub projected_franchise: f64,
    pub projected_premium_ceiling: f64,

    // Contributions
    pub own_contribution0: f64,
    pub cum_own_contribution: f64,

    // Accrued at the pension date
    pub time_prop: f64,
    pub survivor_time_prop: f64,
    pub capital_dc: f64,
    pub capital_db: f64,
    pub capital: f64,

    // Pension-date tariffs
    pub tar_opll: f64,
    pub tar_npllrs: f64,
    pub tar_combi: f64,

    // Projected pensions
    pub projected_op_dc: f64,
    pub projected_op: f64,
    pub projected_np: f64,
    /// Premium-exempt benefits expressed as old-age pension
    pub pv: f64,
    pub projected_op_plus_pv: f64,
    pub projected_op_plus_pv_aow: f64,
    pub projected_op_employer: f64,
    pub projected_op_employee: f64,
}

/// Running totals of one (plan, member, simulation)
struct Accumulator<'p> {
    group: &'p PanelGroup,
    boundary: &'p PanelRow,
    capped: bool,
    time_prop: f64,
    survivor_time_prop: f64,
    capital_dc: f64,
    capital_db: f64,
}

/// Builds summary rows from a projected panel
pub struct SummaryReducer<'a> {
    pension_tariff: &'a ScenarioTable<PensionTariffKey>,
}

impl<'a> SummaryReducer<'a> {
    pub fn new(pension_tariff: &'a ScenarioTable<PensionTariffKey>) -> Self {
        Self { pension_tariff }
    }

    fn tariff(&self, group: &PanelGroup, claim: ClaimCode, age0: i32) -> Result<f64> {
        let key = (group.claim.pension_age, group.member.sex, claim, age0);
        self.pension_tariff
            .get(key, group.key.simulation)
            .ok_or_else(|| {
                ProjectionError::integrity(
                    Stage::Summary,
                    self.pension_tariff.name(),
                    format!(
                        "no pension tariff for {:?} (member {}, plan {}, simulation {})",
                        key, group.key.member_id, group.key.plan_id, group.key.simulation
                    ),
                )
            })
    }

    /// Money columns must be finite before they are aggregated
    fn check_numeric(panel: &Panel) -> Result<()> {
        for (group, row) in panel.rows() {
            let columns = [
                ("premium", row.premium),
                ("capital", row.capital),
                ("time_prop", row.time_prop),
                ("cum_own_contribution", row.cum_own_contribution),
            ];
            if let Some(&(column, _)) = columns.iter().find(|(_, v)| !v.is_finite()) {
                return Err(ProjectionError::NonNumeric {
                    stage: Stage::Summary,
                    column,
                    member_id: group.key.member_id,
                    plan_id: group.key.plan_id,
                    claim: group.key.claim.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn reduce(&self, panel: &Panel) -> Result<Vec<SummaryRow>> {
        Self::check_numeric(panel)?;

        let mut totals: BTreeMap<(u32, u32, u32), Accumulator<'_>> = BTreeMap::new();

        for group in panel.groups() {
            // claims the plan type does not accrue carry no summary
            if group.kind == ClaimKind::None {
                continue;
            }
            let Some(boundary) = group.boundary() else {
                continue;
            };
            let key = (group.key.plan_id, group.key.member_id, group.key.simulation);
            let acc = totals.entry(key).or_insert_with(|| Accumulator {
                group,
                boundary,
                capped: false,
                time_prop: 0.0,
                survivor_time_prop: 0.0,
                capital_dc: 0.0,
                capital_db: 0.0,
            });
            acc.capped |= group.is_capped();

            match group.key.claim {
                ClaimCode::OldAge => acc.time_prop += boundary.time_prop,
                ClaimCode::Survivor => acc.survivor_time_prop += boundary.time_prop,
                _ => {}
            }
            if group.kind == ClaimKind::DefinedContribution {
                acc.capital_dc += boundary.capital;
            }
            if group.kind.is_defined_benefit() && group.key.claim.is_lifelong() {
                let tariff = self.tariff(group, group.key.claim, boundary.age0)?;
                acc.capital_db += boundary.time_prop * tariff;
            }
        }

        let capped = totals.values().filter(|acc| acc.capped).count();
        if capped > 0 {
            log::warn!(
                "{} summary rows are taken at a capped horizon, before the pension date",
                capped
            );
        }

        let rows = totals
            .into_values()
            .map(|acc| self.summarize(acc))
            .collect::<Result<Vec<_>>>()?;

        log::info!("Built summary: {} rows", rows.len());
        Ok(rows)
    }

    fn summarize(&self, acc: Accumulator<'_>) -> Result<SummaryRow> {
        let group = acc.group;
        let boundary = acc.boundary;
        let member = &group.member;
        let claim = &group.claim;

        let tar_opll = self.tariff(group, ClaimCode::OldAge, boundary.age0)?;
        let tar_npllrs = self.tariff(group, ClaimCode::Survivor, boundary.age0)?;
        let tar_combi = tar_opll + SURVIVOR_FRACTION * tar_npllrs;
        if tar_combi.is_nan() || tar_combi <= 0.0 {
            return Err(ProjectionError::integrity(
                Stage::Summary,
                self.pension_tariff.name(),
                format!(
                    "combined tariff {} is not positive for member {}, plan {}",
                    tar_combi, group.key.member_id, group.key.plan_id
                ),
            ));
        }

        let capital = acc.capital_dc + acc.capital_db;
        let projected_op_dc = acc.capital_dc / tar_combi;
        let projected_op = acc.time_prop + projected_op_dc;
        let projected_np = acc.survivor_time_prop + SURVIVOR_FRACTION * projected_op_dc;
        let pv = (member.op_premium_exempt * tar_opll + member.np_premium_exempt * tar_npllrs) / tar_combi;
        let projected_op_employer = (capital - boundary.cum_own_contribution) / tar_combi;

        Ok(SummaryRow {
            plan_id: group.key.plan_id,
            member_id: group.key.member_id,
            simulation: group.key.simulation,
            name: member.name.clone(),
            sex: member.sex,
            birth_date: member.birth_date,
            pension_date: boundary.pension_date,
            pension_age: claim.pension_age,
            age0: boundary.age0,
            horizon: group.horizon(),
            capped: acc.capped,
            part_time_pct: member.part_time_pct,
            salary: member.ft_salary,
            projected_salary: boundary.ft_salary,
            projected_aow: boundary.aow,
            projected_franchise: boundary.franchise,
            projected_premium_ceiling: boundary.premium_ceiling,
            own_contribution0: employee_contribution(
                full_time_base(member.ft_salary, claim.premium_franchise, claim.premium_ceiling),
                claim.pct_own_contribution,
                member.part_time_pct,
            ),
            cum_own_contribution: boundary.cum_own_contribution,
            time_prop: acc.time_prop,
            survivor_time_prop: acc.survivor_time_prop,
            capital_dc: acc.capital_dc,
            capital_db: acc.capital_db,
            capital,
            tar_opll,
            tar_npllrs,
            tar_combi,
            projected_op_dc,
            projected_op,
            projected_np,
            pv,
            projected_op_plus_pv: projected_op + pv,
            projected_op_plus_pv_aow: projected_op + pv + boundary.aow,
            projected_op_employer,
            projected_op_employee: projected_op - projected_op_employer,
        })
    }
}
