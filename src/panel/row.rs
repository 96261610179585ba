//! One projection year of one member-claim-simulation group

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Resolved scenario values of one driver on one row
///
/// Undefined values (lookup misses without a neutral default) are NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexValues {
    /// Period value looked up in the scenario table
    pub rate: f64,
    /// Running product of `1 ± rate` within the group
    pub cumulative: f64,
    /// Previous year's cumulative value, 1.0 in the first year
    pub lagged: f64,
}

impl Default for IndexValues {
    fn default() -> Self {
        Self {
            rate: f64::NAN,
            cumulative: f64::NAN,
            lagged: f64::NAN,
        }
    }
}

/// Scenario driver columns of a panel row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexSlot {
    Inflation,
    SalaryIncrease,
    IndexationActive,
    IndexationInactive,
    Interest,
    InvestmentReturn,
    Survival,
    Tariff,
}

/// A single row of the projection panel
///
/// Key and service columns are set when the panel is built; index columns by
/// the resolver; every remaining column by the projection engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRow {
    /// Projection year, 1-based
    pub boy: u32,

    // Service and age
    pub pension_date: NaiveDate,
    /// Future service years at the calculation date
    pub fsy0: f64,
    /// Past service years at the calculation date
    pub psy0: f64,
    pub tsy: f64,
    /// Future service years remaining at the start of this year
    pub fsy: f64,
    pub psy: f64,
    pub age0: i32,
    pub age0_adjusted: i32,
    pub age: f64,
    pub age_low: i32,
    pub age_low_adjusted: i32,

    // Scenario indices
    pub inflation: IndexValues,
    pub salary_increase: IndexValues,
    pub indexation_active: IndexValues,
    pub indexation_inactive: IndexValues,
    pub interest: IndexValues,
    pub investment_return: IndexValues,
    /// Survival probability index built from nqx
    pub survival: IndexValues,
    pub tariff: IndexValues,

    // Escalated plan parameters
    pub premium_franchise: f64,
    pub premium_ceiling: f64,
    pub franchise: f64,
    pub max_salary: f64,
    pub aow: f64,

    // Salary and bases
    pub ft_salary: f64,
    pub ft_premium_base: f64,
    pub pt_premium_base: f64,
    pub ft_pension_base: f64,
    pub pt_pension_base: f64,
    /// Pension base at the calculation date
    pub pt_pension_base0: f64,

    // Own contribution
    pub own_contribution: f64,
    pub cum_own_contribution: f64,
    pub return_on_own_contribution: f64,

    // Premium-exempt accrued benefits
    pub op_premium_exempt: f64,
    pub np_premium_exempt: f64,

    // Defined benefit accrual
    pub pro_rata: f64,
    pub purchase: f64,
    pub accrual: f64,
    pub backservice: f64,
    pub time_prop: f64,
    pub insured: f64,
    pub premium_db: f64,

    // Defined contribution
    pub scale_pct: f64,
    pub premium_dc: f64,
    pub capital: f64,

    // Totals
    pub premium: f64,
    pub backservice_amount: f64,
}

impl PanelRow {
    /// Create a row for one projection year with zeroed amounts and undefined indices
    pub fn new(boy: u32, pension_date: NaiveDate) -> Self {
        Self {
            boy,
            pension_date,
            fsy0: 0.0,
            psy0: 0.0,
            tsy: 0.0,
            fsy: 0.0,
            psy: 0.0,
            age0: 0,
            age0_adjusted: 0,
            age: 0.0,
            age_low: 0,
            age_low_adjusted: 0,
            inflation: IndexValues::default(),
            salary_increase: IndexValues::default(),
            indexation_active: IndexValues::default(),
            indexation_inactive: IndexValues::default(),
            interest: IndexValues::default(),
            investment_return: IndexValues::default(),
            survival: IndexValues::default(),
            tariff: IndexValues::default(),
            premium_franchise: 0.0,
            premium_ceiling: 0.0,
            franchise: 0.0,
            max_salary: 0.0,
            aow: 0.0,
            ft_salary: 0.0,
            ft_premium_base: 0.0,
            pt_premium_base: 0.0,
            ft_pension_base: 0.0,
            pt_pension_base: 0.0,
            pt_pension_base0: 0.0,
            own_contribution: 0.0,
            cum_own_contribution: 0.0,
            return_on_own_contribution: 0.0,
            op_premium_exempt: 0.0,
            np_premium_exempt: 0.0,
            pro_rata: 0.0,
            purchase: 0.0,
            accrual: 0.0,
            backservice: 0.0,
            time_prop: 0.0,
            insured: 0.0,
            premium_db: 0.0,
            scale_pct: 0.0,
            premium_dc: 0.0,
            capital: 0.0,
            premium: 0.0,
            backservice_amount: 0.0,
        }
    }

    pub fn index(&self, slot: IndexSlot) -> &IndexValues {
        match slot {
            IndexSlot::Inflation => &self.inflation,
            IndexSlot::SalaryIncrease => &self.salary_increase,
            IndexSlot::IndexationActive => &self.indexation_active,
            IndexSlot::IndexationInactive => &self.indexation_inactive,
            IndexSlot::Interest => &self.interest,
            IndexSlot::InvestmentReturn => &self.investment_return,
            IndexSlot::Survival => &self.survival,
            IndexSlot::Tariff => &self.tariff,
        }
    }

    pub fn index_mut(&mut self, slot: IndexSlot) -> &mut IndexValues {
        match slot {
            IndexSlot::Inflation => &mut self.inflation,
            IndexSlot::SalaryIncrease => &mut self.salary_increase,
            IndexSlot::IndexationActive => &mut self.indexation_active,
            IndexSlot::IndexationInactive => &mut self.indexation_inactive,
            IndexSlot::Interest => &mut self.interest,
            IndexSlot::InvestmentReturn => &mut self.investment_return,
            IndexSlot::Survival => &mut self.survival,
            IndexSlot::Tariff => &mut self.tariff,
        }
    }
}
