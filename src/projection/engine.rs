//! Core projection engine: premium bases, contributions and the per-claim
//! accrual recurrence

use super::resolver;
use crate::assumptions::{AssumptionSet, ScenarioTables};
use crate::error::{ProjectionError, Result, Stage};
use crate::formulae::ServiceMethod;
use crate::member::{ClaimDefinition, ClaimKind, Member};
use crate::panel::elementwise::{employee_contribution, full_time_base, return_on_capital};
use crate::panel::{Panel, PanelBuilder, PanelRow, ScanOp};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Configuration for a projection run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Number of simulations to project (panel simulations 1..=n)
    pub simulation_count: u32,

    /// Project at most this many years per member
    pub horizon_cap: Option<u32>,

    /// Mortality and tariff tables carry a simulation dimension
    pub has_simulated_mortality: bool,

    /// Override of the assumption row's age adjustment
    pub age_adjustment: Option<i32>,

    pub service_method: ServiceMethod,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            simulation_count: 1,
            horizon_cap: None,
            has_simulated_mortality: false,
            age_adjustment: None,
            service_method: ServiceMethod::ActualDays,
        }
    }
}

impl ProjectionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.simulation_count == 0 {
            return Err(ProjectionError::config(
                Stage::Load,
                "simulation_count must be at least 1",
            ));
        }
        if self.horizon_cap == Some(0) {
            return Err(ProjectionError::config(
                Stage::Load,
                "horizon_cap must be a positive number of years",
            ));
        }
        Ok(())
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(file)
    }
}

/// Main projection engine
pub struct ProjectionEngine {
    assumption: AssumptionSet,
    config: ProjectionConfig,
}

impl ProjectionEngine {
    /// Create a new projection engine with the given assumption row and config
    pub fn new(assumption: AssumptionSet, config: ProjectionConfig) -> Self {
        Self { assumption, config }
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Age adjustment in effect: the config override or the assumption row
    pub fn age_adjustment(&self) -> i32 {
        self.config
            .age_adjustment
            .unwrap_or(self.assumption.age_adjustment)
    }

    /// Build the panel, resolve every scenario driver and project it
    pub fn run(
        &self,
        members: &[Member],
        claims: &[ClaimDefinition],
        tables: &ScenarioTables,
    ) -> Result<Panel> {
        self.config.validate()?;

        let mut panel = PanelBuilder::new(self.assumption.calculation_date)
            .simulations(self.config.simulation_count)
            .horizon_cap(self.config.horizon_cap)
            .age_adjustment(self.age_adjustment())
            .service_method(self.config.service_method)
            .build(members, claims)?;

        resolver::resolve_all(&mut panel, tables)?;
        self.project(&mut panel)?;
        Ok(panel)
    }

    /// Project every group of a panel whose indices are resolved
    pub fn project(&self, panel: &mut Panel) -> Result<()> {
        let timing = self.assumption.investment_timing;
        if !(0.0..=1.0).contains(&timing) {
            return Err(ProjectionError::config(
                Stage::Projection,
                format!("investment_timing must lie in [0, 1], got {}", timing),
            ));
        }

        panel.groups_mut().par_iter_mut().for_each(|group| {
            let member = &group.member;
            let claim = &group.claim;
            let rows = &mut group.rows;

            self.project_bases(member, claim, rows);
            match group.kind {
                ClaimKind::AveragePay => {
                    average_pay(claim.percentage, rows);
                    defined_benefit(claim.percentage, rows);
                }
                ClaimKind::FinalPay => {
                    final_pay(claim.percentage, rows);
                    defined_benefit(claim.percentage, rows);
                }
                ClaimKind::DefinedContribution => {
                    defined_contribution(claim.percentage, 1.0 - timing, rows);
                }
                ClaimKind::None => {}
            }
            for row in rows.iter_mut() {
                row.premium = row.premium_db + row.premium_dc;
            }
        });

        log::info!(
            "Projected {} groups ({} rows)",
            panel.groups().len(),
            panel.len()
        );
        Ok(())
    }

    /// Escalated plan parameters, salary, bases and own contribution
    fn project_bases(&self, member: &Member, claim: &ClaimDefinition, rows: &mut [PanelRow]) {
        let pt = member.part_time_pct;
        // Pension base at the calculation date, full-time
        let base0 = full_time_base(member.ft_salary, claim.franchise, claim.max_salary);

        for row in rows.iter_mut() {
            let inflation = row.inflation.cumulative;

            row.psy = row.psy0 + row.boy as f64;
            row.pro_rata = row.fsy.min(1.0);

            row.premium_franchise = claim.premium_franchise * inflation;
            row.premium_ceiling = claim.premium_ceiling * inflation;
            row.franchise = claim.franchise * inflation;
            row.max_salary = claim.max_salary * inflation;
            row.aow = self.assumption.aow * inflation;

            row.ft_salary = member.ft_salary * row.salary_increase.cumulative;
            row.ft_premium_base = full_time_base(row.ft_salary, row.premium_franchise, row.premium_ceiling);
            row.pt_premium_base = row.ft_premium_base * pt;
            row.own_contribution = employee_contribution(row.ft_premium_base, claim.pct_own_contribution, pt);

            row.op_premium_exempt = member.op_premium_exempt * row.indexation_inactive.cumulative;
            row.np_premium_exempt = member.np_premium_exempt * row.indexation_inactive.cumulative;

            row.ft_pension_base = full_time_base(row.ft_salary, row.franchise, row.max_salary);
            row.pt_pension_base = row.ft_pension_base * pt;
            row.pt_pension_base0 = base0;
        }

        // Own contributions accumulate at the interest index
        let discounted: Vec<f64> = rows
            .iter()
            .map(|r| r.own_contribution / r.interest.lagged)
            .collect();
        let cumulative = ScanOp::CumSum.apply(&discounted);
        for (row, cum) in rows.iter_mut().zip(cumulative) {
            row.cum_own_contribution = row.interest.cumulative * cum;
            row.return_on_own_contribution =
                return_on_capital(row.cum_own_contribution, row.own_contribution, row.interest.rate, 0.0);
        }
    }
}

/// Average pay: purchases indexed with active indexation
fn average_pay(pct: f64, rows: &mut [PanelRow]) {
    for row in rows.iter_mut() {
        row.purchase = row.pro_rata * pct * row.pt_pension_base;
    }

    let discounted: Vec<f64> = rows
        .iter()
        .map(|r| r.purchase / r.indexation_active.lagged)
        .collect();
    let cumulative = ScanOp::CumSum.apply(&discounted);
    for (row, cum) in rows.iter_mut().zip(cumulative) {
        row.time_prop = row.indexation_active.lagged * cum;
    }

    let time_prop: Vec<f64> = rows.iter().map(|r| r.time_prop).collect();
    let accrual = ScanOp::Diff.apply(&time_prop);
    for (row, accrual) in rows.iter_mut().zip(accrual) {
        row.accrual = accrual;
        // Indexation granted this year on benefits accrued before it
        row.backservice = row.indexation_active.rate * (row.time_prop - row.accrual);
    }
}

/// Final pay: past service is revalued on every pension base increase
fn final_pay(pct: f64, rows: &mut [PanelRow]) {
    let Some(first) = rows.first() else {
        return;
    };
    let base0 = first.pt_pension_base0;

    let bases: Vec<f64> = rows.iter().map(|r| r.pt_pension_base).collect();
    let prior = ScanOp::Lag { fill: base0 }.apply(&bases);

    for (row, prior) in rows.iter_mut().zip(prior) {
        row.backservice = (row.psy - 1.0).max(0.0) * pct * (row.pt_pension_base - prior).max(0.0);
        row.purchase = pct * row.pt_pension_base;
        row.accrual = row.purchase + row.backservice;
    }

    let accrual: Vec<f64> = rows.iter().map(|r| r.accrual).collect();
    for (row, time_prop) in rows.iter_mut().zip(ScanOp::CumSum.apply(&accrual)) {
        row.time_prop = time_prop;
    }
}

/// Insured amount and premium shared by both DB formulas
fn defined_benefit(pct: f64, rows: &mut [PanelRow]) {
    for row in rows.iter_mut() {
        let tariff = row.tariff.rate;
        row.insured = row.time_prop + (row.fsy - 1.0).max(0.0) * pct * row.pt_pension_base;
        row.premium_db = (row.accrual - row.backservice) * tariff;
        row.backservice_amount = row.backservice * tariff;
    }
}

/// Defined contribution capital, discounted for return and survival
///
/// `timing` is the fraction of the year the premium is invested (1 = whole year).
fn defined_contribution(pct: f64, timing: f64, rows: &mut [PanelRow]) {
    let mut discounted = Vec::with_capacity(rows.len());
    for row in rows.iter_mut() {
        let ret = row.investment_return.rate;
        row.scale_pct = row.tariff.rate * pct;
        row.premium_dc = row.pro_rata * row.scale_pct * row.pt_pension_base;

        let cash_flow_timing = (1.0 + timing * ret) / (1.0 + ret);
        discounted.push(
            row.premium_dc * cash_flow_timing * row.survival.lagged / row.investment_return.lagged,
        );
    }

    for (row, cum) in rows.iter_mut().zip(ScanOp::CumSum.apply(&discounted)) {
        row.capital = row.investment_return.cumulative / row.survival.cumulative * cum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{ClaimCode, PlanType, Sex};
    use crate::panel::IndexValues;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn assumption(investment_timing: f64) -> AssumptionSet {
        AssumptionSet {
            calculation_date: date(2018, 1, 1),
            aow: 20_000.0,
            age_adjustment: 0,
            investment_timing,
            inflation_variant: 1,
            salary_increase_variant: 1,
            indexation_variant: 1,
            interest_variant: 1,
            return_variant: 1,
            nqx_variant: 1,
            tariff_variant: 1,
            pension_tariff_variant: 1,
        }
    }

    fn member() -> Member {
        Member {
            id: 1,
            name: "test".to_string(),
            birth_date: date(1954, 1, 10),
            hire_date: date(2000, 1, 1),
            sex: Sex::Male,
            part_time_pct: 1.0,
            ft_salary: 23_000.0,
            op_premium_exempt: 1000.0,
            np_premium_exempt: 700.0,
            memo: String::new(),
        }
    }

    fn claim(plan_type: PlanType, claim: ClaimCode, percentage: f64) -> ClaimDefinition {
        ClaimDefinition {
            plan_id: 10,
            plan_type,
            claim,
            pension_age: 67,
            percentage,
            franchise: 13_000.0,
            max_salary: 105_000.0,
            premium_franchise: 13_000.0,
            premium_ceiling: 105_000.0,
            pct_own_contribution: 0.0,
            tariff_id: 1,
        }
    }

    fn neutral() -> IndexValues {
        IndexValues {
            rate: 0.0,
            cumulative: 1.0,
            lagged: 1.0,
        }
    }

    fn growth(rate: f64, t: u32) -> IndexValues {
        IndexValues {
            rate,
            cumulative: (1.0 + rate).powi(t as i32),
            lagged: (1.0 + rate).powi(t as i32 - 1),
        }
    }

    /// Three-year panel with neutral indices and a unit tariff
    fn panel(definition: ClaimDefinition, member: Member) -> Panel {
        let mut panel = PanelBuilder::new(date(2018, 1, 1))
            .build(&[member], &[definition])
            .expect("panel");
        for group in panel.groups_mut() {
            for row in group.rows.iter_mut() {
                row.inflation = neutral();
                row.salary_increase = neutral();
                row.indexation_active = neutral();
                row.indexation_inactive = neutral();
                row.interest = neutral();
                row.investment_return = neutral();
                row.survival = neutral();
                row.tariff = IndexValues {
                    rate: 1.0,
                    cumulative: 1.0,
                    lagged: f64::NAN,
                };
            }
        }
        panel
    }

    #[test]
    fn test_average_pay_accrual_with_indexation() {
        let mut panel = panel(claim(PlanType::AveragePay, ClaimCode::OldAge, 0.01875), member());
        for row in panel.groups_mut()[0].rows.iter_mut() {
            row.indexation_active = growth(0.02, row.boy);
        }
        ProjectionEngine::new(assumption(0.0), ProjectionConfig::default())
            .project(&mut panel)
            .expect("projected");

        let rows = &panel.groups()[0].rows;
        assert_relative_eq!(rows[0].pt_pension_base, 10_000.0);
        assert_relative_eq!(rows[0].accrual, 187.5, epsilon = 1e-9);
        assert_relative_eq!(rows[1].accrual, 191.25, epsilon = 1e-9);
        assert_relative_eq!(rows[2].accrual, 195.075, epsilon = 1e-9);
        assert_relative_eq!(rows[2].time_prop, 573.825, epsilon = 1e-9);
        assert_relative_eq!(rows[0].backservice, 0.0);
        assert_relative_eq!(rows[1].backservice, 3.75, epsilon = 1e-9);
        assert_relative_eq!(rows[2].backservice, 7.575, epsilon = 1e-9);
        // premium covers the new purchase only
        assert_relative_eq!(rows[1].premium_db, 187.5, epsilon = 1e-9);
        assert_relative_eq!(rows[1].premium, rows[1].premium_db);
        assert_relative_eq!(rows[1].premium_dc, 0.0);
        assert_relative_eq!(rows[0].insured, 187.5 + 2.0 * 187.5, epsilon = 1e-9);
    }

    #[test]
    fn test_final_pay_backservice_on_raise() {
        let mut panel = panel(claim(PlanType::FinalPay, ClaimCode::OldAge, 0.02), member());
        for row in panel.groups_mut()[0].rows.iter_mut() {
            if row.boy >= 2 {
                row.salary_increase.cumulative = 1.05;
            }
        }
        ProjectionEngine::new(assumption(0.0), ProjectionConfig::default())
            .project(&mut panel)
            .expect("projected");

        let rows = &panel.groups()[0].rows;
        // salary 23000 -> 24150, base 10000 -> 11150
        assert_relative_eq!(rows[1].pt_pension_base, 11_150.0, epsilon = 1e-9);
        assert_relative_eq!(rows[0].backservice, 0.0);
        assert_relative_eq!(
            rows[1].backservice,
            (rows[1].psy - 1.0) * 0.02 * 1150.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(rows[2].backservice, 0.0);
        assert_relative_eq!(rows[1].accrual, 223.0 + rows[1].backservice, epsilon = 1e-9);
        assert_relative_eq!(
            rows[2].time_prop,
            rows[0].accrual + rows[1].accrual + rows[2].accrual,
            epsilon = 1e-9
        );
        assert_relative_eq!(rows[1].premium_db, 223.0, epsilon = 1e-9);
    }

    #[test]
    fn test_defined_contribution_capital() {
        let mut panel = panel(claim(PlanType::AveragePay, ClaimCode::Capital, 0.1), member());
        for row in panel.groups_mut()[0].rows.iter_mut() {
            row.investment_return = growth(0.03, row.boy);
        }
        ProjectionEngine::new(assumption(0.0), ProjectionConfig::default())
            .project(&mut panel)
            .expect("projected");

        let rows = &panel.groups()[0].rows;
        let premium = 1000.0;
        assert_relative_eq!(rows[0].premium_dc, premium, epsilon = 1e-9);
        assert_relative_eq!(rows[0].capital, premium * 1.03, epsilon = 1e-9);
        assert_relative_eq!(
            rows[1].capital,
            premium * (1.03f64.powi(2) + 1.03),
            epsilon = 1e-9
        );
        assert!(rows.iter().all(|r| r.premium_db == 0.0 && r.time_prop == 0.0));
        assert_relative_eq!(rows[2].premium, rows[2].premium_dc);
    }

    #[test]
    fn test_end_of_year_investment_earns_nothing_in_first_year() {
        let mut panel = panel(claim(PlanType::AveragePay, ClaimCode::Capital, 0.1), member());
        for row in panel.groups_mut()[0].rows.iter_mut() {
            row.investment_return = growth(0.03, row.boy);
        }
        ProjectionEngine::new(assumption(1.0), ProjectionConfig::default())
            .project(&mut panel)
            .expect("projected");
        assert_relative_eq!(panel.groups()[0].rows[0].capital, 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_own_contribution_accumulates_at_interest() {
        let mut definition = claim(PlanType::AveragePay, ClaimCode::OldAge, 0.01875);
        definition.pct_own_contribution = 0.04;
        let mut panel = panel(definition, member());
        for row in panel.groups_mut()[0].rows.iter_mut() {
            row.interest = growth(0.03, row.boy);
            row.indexation_inactive = growth(0.01, row.boy);
        }
        ProjectionEngine::new(assumption(0.0), ProjectionConfig::default())
            .project(&mut panel)
            .expect("projected");

        let rows = &panel.groups()[0].rows;
        let own = 0.04 * 10_000.0;
        assert_relative_eq!(rows[0].own_contribution, own, epsilon = 1e-9);
        assert_relative_eq!(rows[0].cum_own_contribution, own * 1.03, epsilon = 1e-9);
        assert_relative_eq!(rows[1].cum_own_contribution, own * (1.03f64.powi(2) + 1.03), epsilon = 1e-9);
        assert_relative_eq!(rows[0].return_on_own_contribution, 0.03 * own, epsilon = 1e-9);
        assert_relative_eq!(rows[1].op_premium_exempt, 1000.0 * 1.0201, epsilon = 1e-9);
    }

    #[test]
    fn test_unused_claim_kind_accrues_nothing() {
        let mut panel = panel(claim(PlanType::Contribution, ClaimCode::OldAge, 0.02), member());
        ProjectionEngine::new(assumption(0.0), ProjectionConfig::default())
            .project(&mut panel)
            .expect("projected");
        assert!(panel.groups()[0]
            .rows
            .iter()
            .all(|r| r.premium == 0.0 && r.time_prop == 0.0 && r.capital == 0.0));
    }

    #[test]
    fn test_config_validation() {
        let config = ProjectionConfig::from_json_reader(r#"{"simulation_count": 50, "horizon_cap": 10}"#.as_bytes())
            .expect("config");
        assert_eq!(config.simulation_count, 50);
        assert_eq!(config.horizon_cap, Some(10));
        assert_eq!(config.service_method, ServiceMethod::ActualDays);

        let err = ProjectionConfig::from_json_reader(r#"{"simulation_count": 0}"#.as_bytes()).unwrap_err();
        assert!(matches!(err, ProjectionError::Configuration { .. }));

        let config: ProjectionConfig =
            serde_json::from_str(r#"{"service_method": "calendar_months"}"#).expect("config");
        assert_eq!(config.service_method, ServiceMethod::CalendarMonths);
    }

    #[test]
    fn test_investment_timing_out_of_range() {
        let mut panel = panel(claim(PlanType::AveragePay, ClaimCode::OldAge, 0.02), member());
        let err = ProjectionEngine::new(assumption(1.5), ProjectionConfig::default())
            .project(&mut panel)
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Projection);
    }
}
