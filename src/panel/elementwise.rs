//! Row-wise formulas broadcast over the panel
//!
//! Nothing here changes the number of rows or looks at neighbouring rows.
//! NaN inputs give NaN outputs; negative bases clamp to zero.

use super::Panel;
use crate::formulae::{self, ServiceMethod};
use chrono::NaiveDate;
use rayon::prelude::*;

/// Attained age given the years remaining to the pension date
pub fn age(pension_age: u32, fsy: f64) -> f64 {
    pension_age as f64 - fsy
}

/// Salary between a floor and a cap: `max(0, min(salary, cap) - floor)`
pub fn full_time_base(salary: f64, floor: f64, cap: f64) -> f64 {
    if salary.is_nan() || floor.is_nan() || cap.is_nan() {
        return f64::NAN;
    }
    (salary.min(cap) - floor).max(0.0)
}

pub fn employee_contribution(base: f64, pct_contribution: f64, pct_parttime: f64) -> f64 {
    pct_parttime * pct_contribution * base
}

/// Yield earned during the year on an accumulated capital
///
/// `adjust` removes part of this year's contribution from the interest-bearing
/// balance (0 = the whole balance earns interest).
pub fn return_on_capital(cum_capital: f64, contribution: f64, yield_rate: f64, adjust: f64) -> f64 {
    yield_rate / (1.0 + yield_rate) * (cum_capital - adjust * contribution)
}

/// Running index from period rates: `(1 + s*r)^(adjust - 1) * cumprod(1 + s*r)`
///
/// `sign` is +1 for growth rates and -1 for decrements. `adjust` sets the
/// payment moment within the year: 0 = begin, 0.5 = middle, 1 = end.
pub fn pct_to_cum_index(rates: &[f64], sign: f64, adjust: f64) -> Vec<f64> {
    let mut running = 1.0;
    rates
        .iter()
        .map(|&r| {
            let factor = 1.0 + sign * r;
            running *= factor;
            factor.powf(adjust - 1.0) * running
        })
        .collect()
}

/// Fill the service and age columns of every row
pub fn add_service_and_age(
    panel: &mut Panel,
    calculation_date: NaiveDate,
    age_adjustment: i32,
    method: ServiceMethod,
) {
    panel.groups_mut().par_iter_mut().for_each(|group| {
        let pension_age = group.claim.pension_age;
        let hire_date = group.member.hire_date;

        for row in group.rows.iter_mut() {
            let fsy0 = formulae::future_service_years(calculation_date, row.pension_date);
            let psy0 = formulae::past_service_years(hire_date, calculation_date, method);

            row.fsy0 = fsy0;
            row.psy0 = psy0;
            row.tsy = formulae::total_service_years(psy0, fsy0);
            row.age0 = age(pension_age, fsy0).trunc() as i32;
            row.age0_adjusted = row.age0 + age_adjustment;

            row.fsy = fsy0 - row.boy as f64 + 1.0;
            row.age = age(pension_age, row.fsy);
            row.age_low = row.age.trunc() as i32;
            row.age_low_adjusted = row.age_low + age_adjustment;
        }
    });
}
