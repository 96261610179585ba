//! Member and plan-claim records as delivered by the source tables

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sex of the plan member, used for mortality and tariff lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "M" | "m" => Some(Sex::Male),
            "F" | "f" | "V" | "v" => Some(Sex::Female),
            _ => None,
        }
    }
}

/// Benefit formula of a pension plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanType {
    /// Average pay (middelloon)
    #[serde(rename = "ML")]
    AveragePay,
    /// Final pay (eindloon)
    #[serde(rename = "EL")]
    FinalPay,
    /// Available premium, capital only
    #[serde(rename = "BP")]
    Contribution,
}

impl PlanType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "ML" => Some(PlanType::AveragePay),
            "EL" => Some(PlanType::FinalPay),
            "BP" => Some(PlanType::Contribution),
            _ => None,
        }
    }
}

/// Claim code of a plan benefit
///
/// Ordering follows declaration order and determines the panel sort order
/// within a (member, plan) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClaimCode {
    /// Lifelong old-age pension
    #[serde(rename = "OPLL")]
    OldAge,
    /// Lifelong survivor pension on risk-and-savings basis
    #[serde(rename = "NPLLRS")]
    Survivor,
    /// Temporary survivor pension (deprecated)
    #[serde(rename = "NPTL-O")]
    TemporarySurvivor,
    /// Temporary orphan pension (deprecated)
    #[serde(rename = "NPTL-OT")]
    TemporaryOrphan,
    /// Variable capital (defined contribution)
    #[serde(rename = "VARL")]
    Capital,
}

impl ClaimCode {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "OPLL" => Some(ClaimCode::OldAge),
            "NPLLRS" => Some(ClaimCode::Survivor),
            "NPTL-O" => Some(ClaimCode::TemporarySurvivor),
            "NPTL-OT" => Some(ClaimCode::TemporaryOrphan),
            "VARL" => Some(ClaimCode::Capital),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimCode::OldAge => "OPLL",
            ClaimCode::Survivor => "NPLLRS",
            ClaimCode::TemporarySurvivor => "NPTL-O",
            ClaimCode::TemporaryOrphan => "NPTL-OT",
            ClaimCode::Capital => "VARL",
        }
    }

    /// Claims accruing a formula-defined benefit
    pub fn is_defined_benefit(&self) -> bool {
        matches!(
            self,
            ClaimCode::OldAge
                | ClaimCode::Survivor
                | ClaimCode::TemporarySurvivor
                | ClaimCode::TemporaryOrphan
        )
    }

    pub fn is_defined_contribution(&self) -> bool {
        matches!(self, ClaimCode::Capital)
    }

    /// DB claims converted to capital at the pension date
    pub fn is_lifelong(&self) -> bool {
        matches!(self, ClaimCode::OldAge | ClaimCode::Survivor)
    }
}

impl fmt::Display for ClaimCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accrual formula a panel group follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimKind {
    AveragePay,
    FinalPay,
    DefinedContribution,
    /// Claim accrues nothing under this plan type
    None,
}

impl ClaimKind {
    pub fn classify(claim: ClaimCode, plan_type: PlanType) -> Self {
        if claim.is_defined_contribution() {
            return ClaimKind::DefinedContribution;
        }
        match (claim.is_defined_benefit(), plan_type) {
            (true, PlanType::AveragePay) => ClaimKind::AveragePay,
            (true, PlanType::FinalPay) => ClaimKind::FinalPay,
            _ => ClaimKind::None,
        }
    }

    pub fn is_defined_benefit(&self) -> bool {
        matches!(self, ClaimKind::AveragePay | ClaimKind::FinalPay)
    }
}

/// An active plan member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: u32,
    pub name: String,
    pub birth_date: NaiveDate,
    pub hire_date: NaiveDate,
    pub sex: Sex,
    /// Part-time fraction (1.0 = full time)
    pub part_time_pct: f64,
    /// Current full-time salary
    pub ft_salary: f64,
    /// Premium-exempt old-age pension already accrued
    pub op_premium_exempt: f64,
    /// Premium-exempt survivor pension already accrued
    pub np_premium_exempt: f64,
    #[serde(default)]
    pub memo: String,
}

/// A claim attached to an active pension plan (plan joined with claim)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimDefinition {
    pub plan_id: u32,
    pub plan_type: PlanType,
    pub claim: ClaimCode,
    pub pension_age: u32,
    /// Accrual percentage per service year, or contribution scale factor for DC
    pub percentage: f64,
    /// Pension franchise (offset of the pension base)
    pub franchise: f64,
    /// Maximum pensionable salary
    pub max_salary: f64,
    pub premium_franchise: f64,
    pub premium_ceiling: f64,
    /// Employee contribution as a fraction of the premium base
    pub pct_own_contribution: f64,
    pub tariff_id: u32,
}

impl ClaimDefinition {
    pub fn kind(&self) -> ClaimKind {
        ClaimKind::classify(self.claim, self.plan_type)
    }
}
