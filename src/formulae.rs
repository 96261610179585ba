//! Scalar actuarial formulas on single dates
//!
//! Pension date and service-year arithmetic used by the panel builder and the
//! elementwise layer. All functions are pure.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Method for counting past service years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMethod {
    /// Elapsed days divided by 365.25
    #[default]
    ActualDays,
    /// Whole years plus months/12, ignoring the day of month
    CalendarMonths,
}

/// Pension date: first day of the birth month in the year the pension age is reached
pub fn pension_date(birth_date: NaiveDate, pension_age: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(birth_date.year() + pension_age as i32, birth_date.month(), 1)
}

/// Years from the calculation date to the pension date, month precision
pub fn future_service_years(calculation_date: NaiveDate, pension_date: NaiveDate) -> f64 {
    (pension_date.year() - calculation_date.year()) as f64
        + (pension_date.month() as f64 - calculation_date.month() as f64) / 12.0
}

/// Years of service between hire date and calculation date
pub fn past_service_years(
    service_date: NaiveDate,
    calculation_date: NaiveDate,
    method: ServiceMethod,
) -> f64 {
    match method {
        ServiceMethod::ActualDays => {
            (calculation_date - service_date).num_days() as f64 / 365.25
        }
        ServiceMethod::CalendarMonths => {
            (calculation_date.year() - service_date.year()) as f64
                + (calculation_date.month() as f64 - service_date.month() as f64) / 12.0
        }
    }
}

pub fn total_service_years(past_service_years: f64, future_service_years: f64) -> f64 {
    past_service_years + future_service_years
}

/// Round up to the next whole year
pub fn roundup(years: f64) -> i64 {
    years.ceil() as i64
}

/// Pension date and the number of projection years from the calculation date
pub fn projection_years(
    birth_date: NaiveDate,
    calculation_date: NaiveDate,
    pension_age: u32,
) -> Option<(NaiveDate, i64)> {
    let pension = pension_date(birth_date, pension_age)?;
    Some((pension, roundup(future_service_years(calculation_date, pension))))
}
