//! CSV output of the projected panel and the summary
//!
//! The panel schema is one record per row: group key, member and plan
//! attributes, then every projected column in [`PanelRecord`] field order.
//! Index columns are flattened to `<driver>_rate`, `<driver>_idx` and
//! `<driver>_idx_lag`.

use super::summary::SummaryRow;
use crate::error::Result;
use crate::member::{ClaimCode, PlanType, Sex};
use crate::panel::{Panel, PanelGroup, PanelRow};
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// One flattened panel row
#[derive(Debug, Clone, Serialize)]
pub struct PanelRecord {
    // Key
    pub member_id: u32,
    pub plan_id: u32,
    pub claim: ClaimCode,
    pub simulation: u32,
    pub boy: u32,

    // Attributes
    pub plan_type: PlanType,
    pub sex: Sex,
    pub pension_age: u32,
    pub pension_date: NaiveDate,
    pub fsy0: f64,
    pub psy0: f64,
    pub tsy: f64,
    pub fsy: f64,
    pub psy: f64,
    pub age0: i32,
    pub age0_adjusted: i32,
    pub age: f64,
    pub age_low: i32,
    pub age_low_adjusted: i32,

    // Indices
    pub inflation_rate: f64,
    pub inflation_idx: f64,
    pub salary_increase_rate: f64,
    pub salary_increase_idx: f64,
    pub indexation_active_rate: f64,
    pub indexation_active_idx: f64,
    pub indexation_active_idx_lag: f64,
    pub indexation_inactive_rate: f64,
    pub indexation_inactive_idx: f64,
    pub indexation_inactive_idx_lag: f64,
    pub interest_rate: f64,
    pub interest_idx: f64,
    pub interest_idx_lag: f64,
    pub return_rate: f64,
    pub return_idx: f64,
    pub return_idx_lag: f64,
    pub nqx: f64,
    pub survival_idx: f64,
    pub survival_idx_lag: f64,
    pub tariff: f64,

    // Projection
    pub premium_franchise: f64,
    pub premium_ceiling: f64,
    pub franchise: f64,
    pub max_salary: f64,
    pub aow: f64,
    pub ft_salary: f64,
    pub ft_premium_base: f64,
    pub pt_premium_base: f64,
    pub ft_pension_base: f64,
    pub pt_pension_base: f64,
    pub pt_pension_base0: f64,
    pub own_contribution: f64,
    pub cum_own_contribution: f64,
    pub return_on_own_contribution: f64,
    pub op_premium_exempt: f64,
    pub np_premium_exempt: f64,
    pub pro_rata: f64,
    pub purchase: f64,
    pub accrual: f64,
    pub backservice: f64,
    pub time_prop: f64,
    pub insured: f64,
    pub premium_db: f64,
    pub scale_pct: f64,
    pub premium_dc: f64,
    pub capital: f64,
    pub premium: f64,
    pub backservice_amount: f64,
}

impl PanelRecord {
    pub fn new(group: &PanelGroup, row: &PanelRow) -> Self {
        Self {
            member_id: group.key.member_id,
            plan_id: group.key.plan_id,
            claim: group.key.claim,
            simulation: group.key.simulation,
            boy: row.boy,
            plan_type: group.claim.plan_type,
            sex: group.member.sex,
            pension_age: group.claim.pension_age,
            pension_date: row.pension_date,
            fsy0: row.fsy0,
            psy0: row.psy0,
            tsy: row.tsy,
            fsy: row.fsy,
            psy: row.psy,
            age0: row.age0,
            age0_adjusted: row.age0_adjusted,
            age: row.age,
            age_low: row.age_low,
            age_low_adjusted: row.age_low_adjusted,
            inflation_rate: row.inflation.rate,
            inflation_idx: row.inflation.cumulative,
            salary_increase_rate: row.salary_increase.rate,
            salary_increase_idx: row.salary_increase.cumulative,
            indexation_active_rate: row.indexation_active.rate,
            indexation_active_idx: row.indexation_active.cumulative,
            indexation_active_idx_lag: row.indexation_active.lagged,
            indexation_inactive_rate: row.indexation_inactive.rate,
            indexation_inactive_idx: row.indexation_inactive.cumulative,
            indexation_inactive_idx_lag: row.indexation_inactive.lagged,
            interest_rate: row.interest.rate,
            interest_idx: row.interest.cumulative,
            interest_idx_lag: row.interest.lagged,
            return_rate: row.investment_return.rate,
            return_idx: row.investment_return.cumulative,
            return_idx_lag: row.investment_return.lagged,
            nqx: row.survival.rate,
            survival_idx: row.survival.cumulative,
            survival_idx_lag: row.survival.lagged,
            tariff: row.tariff.rate,
            premium_franchise: row.premium_franchise,
            premium_ceiling: row.premium_ceiling,
            franchise: row.franchise,
            max_salary: row.max_salary,
            aow: row.aow,
            ft_salary: row.ft_salary,
            ft_premium_base: row.ft_premium_base,
            pt_premium_base: row.pt_premium_base,
            ft_pension_base: row.ft_pension_base,
            pt_pension_base: row.pt_pension_base,
            pt_pension_base0: row.pt_pension_base0,
            own_contribution: row.own_contribution,
            cum_own_contribution: row.cum_own_contribution,
            return_on_own_contribution: row.return_on_own_contribution,
            op_premium_exempt: row.op_premium_exempt,
            np_premium_exempt: row.np_premium_exempt,
            pro_rata: row.pro_rata,
            purchase: row.purchase,
            accrual: row.accrual,
            backservice: row.backservice,
            time_prop: row.time_prop,
            insured: row.insured,
            premium_db: row.premium_db,
            scale_pct: row.scale_pct,
            premium_dc: row.premium_dc,
            capital: row.capital,
            premium: row.premium,
            backservice_amount: row.backservice_amount,
        }
    }
}

/// Serialize records as CSV with a header row
pub fn write_csv<W, T, I>(writer: W, records: I) -> Result<()>
where
    W: Write,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_panel<W: Write>(writer: W, panel: &Panel) -> Result<()> {
    write_csv(writer, panel.rows().map(|(group, row)| PanelRecord::new(group, row)))
}

pub fn write_summary<W: Write>(writer: W, rows: &[SummaryRow]) -> Result<()> {
    write_csv(writer, rows)
}

pub fn write_panel_file(path: &Path, panel: &Panel) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_panel(std::io::BufWriter::new(file), panel)
}

pub fn write_summary_file(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_summary(std::io::BufWriter::new(file), rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{ClaimDefinition, Member};
    use crate::panel::PanelBuilder;

    fn panel() -> Panel {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        let member = Member {
            id: 5,
            name: "writer".to_string(),
            birth_date: date(1954, 1, 10),
            hire_date: date(2000, 1, 1),
            sex: Sex::Female,
            part_time_pct: 1.0,
            ft_salary: 30_000.0,
            op_premium_exempt: 0.0,
            np_premium_exempt: 0.0,
            memo: String::new(),
        };
        let claim = ClaimDefinition {
            plan_id: 10,
            plan_type: PlanType::FinalPay,
            claim: ClaimCode::Survivor,
            pension_age: 67,
            percentage: 0.014,
            franchise: 13_000.0,
            max_salary: 105_000.0,
            premium_franchise: 13_000.0,
            premium_ceiling: 105_000.0,
            pct_own_contribution: 0.0,
            tariff_id: 1,
        };
        PanelBuilder::new(date(2018, 1, 1))
            .build(&[member], &[claim])
            .expect("panel")
    }

    #[test]
    fn test_panel_csv_schema() {
        let mut buffer = Vec::new();
        write_panel(&mut buffer, &panel()).expect("write");
        let text = String::from_utf8(buffer).expect("utf8");
        let mut lines = text.lines();

        let header = lines.next().expect("header");
        assert!(header.starts_with("member_id,plan_id,claim,simulation,boy,plan_type,sex"));
        assert!(header.ends_with("premium,backservice_amount"));

        let first = lines.next().expect("first row");
        assert!(first.starts_with("5,10,NPLLRS,1,1,EL,F,67,2021-01-01"));
        assert_eq!(lines.count(), 2);
    }
}
