//! Load members and plan claims from members.csv, plans.csv and claims.csv
//!
//! Inactive rows (active flag false) are dropped; claims are inner-joined
//! with their active plan.

use super::{ClaimCode, ClaimDefinition, Member, PlanType, Sex};
use crate::error::{ProjectionError, Result, Stage};
use chrono::NaiveDate;
use csv::Reader;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

pub const MEMBERS_FILE: &str = "members.csv";
pub const PLANS_FILE: &str = "plans.csv";
pub const CLAIMS_FILE: &str = "claims.csv";

/// Accepts TRUE/FALSE, true/false and 1/0
fn parse_flag(table: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(ProjectionError::integrity(
            Stage::Load,
            table,
            format!("unknown active flag: {}", other),
        )),
    }
}

/// Raw CSV row matching members.csv columns
#[derive(Debug, serde::Deserialize)]
struct MemberRow {
    id: u32,
    #[serde(default)]
    name: String,
    birth_date: NaiveDate,
    hire_date: NaiveDate,
    sex: String,
    part_time_pct: f64,
    ft_salary: f64,
    #[serde(default)]
    op_premium_exempt: f64,
    #[serde(default)]
    np_premium_exempt: f64,
    #[serde(default)]
    memo: String,
    active: String,
}

impl MemberRow {
    fn to_member(self) -> Result<Member> {
        let sex = Sex::from_code(&self.sex).ok_or_else(|| {
            ProjectionError::integrity(
                Stage::Load,
                MEMBERS_FILE,
                format!("unknown sex '{}' for member {}", self.sex, self.id),
            )
        })?;

        Ok(Member {
            id: self.id,
            name: self.name,
            birth_date: self.birth_date,
            hire_date: self.hire_date,
            sex,
            part_time_pct: self.part_time_pct,
            ft_salary: self.ft_salary,
            op_premium_exempt: self.op_premium_exempt,
            np_premium_exempt: self.np_premium_exempt,
            memo: self.memo,
        })
    }
}

/// Raw CSV row matching plans.csv columns
#[derive(Debug, serde::Deserialize)]
struct PlanRow {
    plan_id: u32,
    plan_type: String,
    pension_age: u32,
    franchise: f64,
    max_salary: f64,
    premium_franchise: f64,
    premium_ceiling: f64,
    pct_own_contribution: f64,
    active: String,
}

/// Raw CSV row matching claims.csv columns
#[derive(Debug, serde::Deserialize)]
struct ClaimRow {
    plan_id: u32,
    claim: String,
    percentage: f64,
    tariff_id: u32,
    active: String,
}

/// Load active members from any reader
pub fn load_members_from_reader<R: Read>(reader: R) -> Result<Vec<Member>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut members = Vec::new();

    for result in csv_reader.deserialize() {
        let row: MemberRow = result?;
        if !parse_flag(MEMBERS_FILE, &row.active)? {
            continue;
        }
        members.push(row.to_member()?);
    }

    let mut seen = HashSet::new();
    for member in &members {
        if !seen.insert(member.id) {
            return Err(ProjectionError::integrity(
                Stage::Load,
                MEMBERS_FILE,
                format!("duplicate member id {}", member.id),
            ));
        }
    }

    Ok(members)
}

/// Load active members from a CSV file
pub fn load_members<P: AsRef<Path>>(path: P) -> Result<Vec<Member>> {
    let file = std::fs::File::open(path)?;
    load_members_from_reader(file)
}

/// Join active claims with their active plans
pub fn load_claims_from_readers<P: Read, C: Read>(plans: P, claims: C) -> Result<Vec<ClaimDefinition>> {
    let mut plan_reader = Reader::from_reader(plans);
    let mut active_plans: HashMap<u32, PlanRow> = HashMap::new();

    for result in plan_reader.deserialize() {
        let row: PlanRow = result?;
        if !parse_flag(PLANS_FILE, &row.active)? {
            continue;
        }
        if active_plans.contains_key(&row.plan_id) {
            return Err(ProjectionError::integrity(
                Stage::Load,
                PLANS_FILE,
                format!("duplicate plan id {}", row.plan_id),
            ));
        }
        active_plans.insert(row.plan_id, row);
    }

    let mut claim_reader = Reader::from_reader(claims);
    let mut definitions = Vec::new();

    for result in claim_reader.deserialize() {
        let row: ClaimRow = result?;
        if !parse_flag(CLAIMS_FILE, &row.active)? {
            continue;
        }
        let Some(plan) = active_plans.get(&row.plan_id) else {
            continue;
        };
        let claim = ClaimCode::from_code(&row.claim).ok_or_else(|| {
            ProjectionError::integrity(
                Stage::Load,
                CLAIMS_FILE,
                format!("unknown claim code '{}' in plan {}", row.claim, row.plan_id),
            )
        })?;
        let plan_type = PlanType::from_code(&plan.plan_type).ok_or_else(|| {
            ProjectionError::integrity(
                Stage::Load,
                PLANS_FILE,
                format!("unknown plan type '{}' for plan {}", plan.plan_type, plan.plan_id),
            )
        })?;

        definitions.push(ClaimDefinition {
            plan_id: plan.plan_id,
            plan_type,
            claim,
            pension_age: plan.pension_age,
            percentage: row.percentage,
            franchise: plan.franchise,
            max_salary: plan.max_salary,
            premium_franchise: plan.premium_franchise,
            premium_ceiling: plan.premium_ceiling,
            pct_own_contribution: plan.pct_own_contribution,
            tariff_id: row.tariff_id,
        });
    }

    definitions.sort_by_key(|d| (d.plan_id, d.claim));
    if let Some(pair) = definitions
        .windows(2)
        .find(|w| (w[0].plan_id, w[0].claim) == (w[1].plan_id, w[1].claim))
    {
        return Err(ProjectionError::integrity(
            Stage::Load,
            CLAIMS_FILE,
            format!("claim {} listed twice for plan {}", pair[0].claim, pair[0].plan_id),
        ));
    }

    Ok(definitions)
}

/// Load plan claims from plans.csv and claims.csv in a directory
pub fn load_claims(dir: &Path) -> Result<Vec<ClaimDefinition>> {
    let plans = std::fs::File::open(dir.join(PLANS_FILE))?;
    let claims = std::fs::File::open(dir.join(CLAIMS_FILE))?;
    load_claims_from_readers(plans, claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMBERS: &str = "\
id,name,birth_date,hire_date,sex,part_time_pct,ft_salary,op_premium_exempt,np_premium_exempt,memo,active
1,Jansen,1960-03-14,1990-01-01,M,1.0,45000,1200,840,,TRUE
2,De Vries,1975-11-02,2005-06-01,V,0.8,38000,0,0,part-time,TRUE
3,Bakker,1980-01-01,2010-01-01,M,1.0,50000,0,0,,FALSE
";

    const PLANS: &str = "\
plan_id,plan_type,pension_age,franchise,max_salary,premium_franchise,premium_ceiling,pct_own_contribution,active
10,ML,67,13000,105000,13000,105000,0.04,TRUE
20,EL,67,13000,105000,13000,105000,0.0,FALSE
";

    const CLAIMS: &str = "\
plan_id,claim,percentage,tariff_id,active
10,OPLL,0.01875,1,TRUE
10,NPLLRS,0.013125,1,TRUE
10,NPTL-O,0.0,1,FALSE
20,OPLL,0.02,1,TRUE
";

    #[test]
    fn test_load_members_skips_inactive() {
        let members = load_members_from_reader(MEMBERS.as_bytes()).expect("members");
        assert_eq!(members.len(), 2);
        assert_eq!(members[1].sex, Sex::Female);
        assert_eq!(members[1].memo, "part-time");
        assert!((members[0].op_premium_exempt - 1200.0).abs() < 1e-12);
    }

    #[test]
    fn test_claims_join_active_plans_only() {
        let claims = load_claims_from_readers(PLANS.as_bytes(), CLAIMS.as_bytes()).expect("claims");
        assert_eq!(claims.len(), 2);
        assert!(claims.iter().all(|c| c.plan_id == 10));
        assert_eq!(claims[0].claim, ClaimCode::OldAge);
        assert_eq!(claims[1].claim, ClaimCode::Survivor);
        assert_eq!(claims[0].plan_type, PlanType::AveragePay);
    }

    #[test]
    fn test_unknown_claim_code_is_rejected() {
        let claims = "plan_id,claim,percentage,tariff_id,active\n10,XYZ,0.01,1,TRUE\n";
        let err = load_claims_from_readers(PLANS.as_bytes(), claims.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("XYZ"));
    }
}
