//! Expand members × plan claims into the projection panel

use super::{elementwise, GroupKey, Panel, PanelGroup, PanelRow};
use crate::error::{ProjectionError, Result, Stage};
use crate::formulae::{self, ServiceMethod};
use crate::member::{ClaimDefinition, Member};
use chrono::NaiveDate;
use std::sync::Arc;

/// Builds a [`Panel`] for one calculation date
#[derive(Debug, Clone)]
pub struct PanelBuilder {
    calculation_date: NaiveDate,
    simulations: u32,
    horizon_cap: Option<u32>,
    age_adjustment: i32,
    service_method: ServiceMethod,
}

impl PanelBuilder {
    pub fn new(calculation_date: NaiveDate) -> Self {
        Self {
            calculation_date,
            simulations: 1,
            horizon_cap: None,
            age_adjustment: 0,
            service_method: ServiceMethod::default(),
        }
    }

    pub fn simulations(mut self, simulations: u32) -> Self {
        self.simulations = simulations;
        self
    }

    /// Limit every group to at most `cap` projection years
    pub fn horizon_cap(mut self, cap: Option<u32>) -> Self {
        self.horizon_cap = cap;
        self
    }

    pub fn age_adjustment(mut self, age_adjustment: i32) -> Self {
        self.age_adjustment = age_adjustment;
        self
    }

    pub fn service_method(mut self, method: ServiceMethod) -> Self {
        self.service_method = method;
        self
    }

    /// Years from the calculation date to the pension date, rounded up
    fn horizon(&self, member: &Member, claim: &ClaimDefinition) -> Result<(NaiveDate, u32)> {
        let (pension_date, years) = formulae::projection_years(
            member.birth_date,
            self.calculation_date,
            claim.pension_age,
        )
        .ok_or_else(|| {
            ProjectionError::integrity(
                Stage::PanelBuild,
                "members",
                format!(
                    "no pension date for member {} at pension age {}",
                    member.id, claim.pension_age
                ),
            )
        })?;

        if years <= 0 {
            return Err(ProjectionError::integrity(
                Stage::PanelBuild,
                "members",
                format!(
                    "member {} reaches pension date {} before calculation date {} (plan {}, horizon {})",
                    member.id, pension_date, self.calculation_date, claim.plan_id, years
                ),
            ));
        }
        Ok((pension_date, years as u32))
    }

    /// Cross members with claims, then expand by projection year and simulation
    pub fn build(&self, members: &[Member], claims: &[ClaimDefinition]) -> Result<Panel> {
        if self.simulations == 0 {
            return Err(ProjectionError::config(
                Stage::PanelBuild,
                "simulation count must be at least 1",
            ));
        }
        if self.horizon_cap == Some(0) {
            return Err(ProjectionError::config(
                Stage::PanelBuild,
                "horizon cap must be a positive number of years",
            ));
        }

        let claims: Vec<Arc<ClaimDefinition>> = claims.iter().cloned().map(Arc::new).collect();
        let mut groups = Vec::with_capacity(members.len() * claims.len() * self.simulations as usize);

        for member in members {
            let member = Arc::new(member.clone());
            for claim in &claims {
                let (pension_date, full_horizon) = self.horizon(&member, claim)?;
                let horizon = match self.horizon_cap {
                    Some(cap) => full_horizon.min(cap),
                    None => full_horizon,
                };

                for simulation in 1..=self.simulations {
                    groups.push(PanelGroup {
                        key: GroupKey {
                            member_id: member.id,
                            plan_id: claim.plan_id,
                            claim: claim.claim,
                            simulation,
                        },
                        member: Arc::clone(&member),
                        claim: Arc::clone(claim),
                        kind: claim.kind(),
                        full_horizon,
                        rows: (1..=horizon)
                            .map(|boy| PanelRow::new(boy, pension_date))
                            .collect(),
                    });
                }
            }
        }

        let mut panel = Panel::from_groups(groups);
        elementwise::add_service_and_age(
            &mut panel,
            self.calculation_date,
            self.age_adjustment,
            self.service_method,
        );

        log::info!(
            "Built panel: {} members x {} claims x {} simulations = {} groups, {} rows",
            members.len(),
            claims.len(),
            self.simulations,
            panel.groups().len(),
            panel.len()
        );
        Ok(panel)
    }
}
