//! Long projection panel: one group per (member, plan, claim, simulation),
//! one row per projection year

mod builder;
pub mod elementwise;
mod row;
pub mod scan;

pub use builder::PanelBuilder;
pub use row::{IndexSlot, IndexValues, PanelRow};
pub use scan::{group_scan, ScanOp};

use crate::member::{ClaimCode, ClaimDefinition, ClaimKind, Member};
use serde::Serialize;
use std::sync::Arc;

/// Identity of a panel group; ordering is the panel sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    pub member_id: u32,
    pub plan_id: u32,
    pub claim: ClaimCode,
    pub simulation: u32,
}

/// Rows of one member-claim pair under one simulation, in BOY order
#[derive(Debug, Clone)]
pub struct PanelGroup {
    pub key: GroupKey,
    pub member: Arc<Member>,
    pub claim: Arc<ClaimDefinition>,
    pub kind: ClaimKind,
    /// Years to the pension date before any cap
    pub full_horizon: u32,
    pub rows: Vec<PanelRow>,
}

impl PanelGroup {
    /// Projected years (equals `full_horizon` unless capped)
    pub fn horizon(&self) -> u32 {
        self.rows.len() as u32
    }

    pub fn is_capped(&self) -> bool {
        self.horizon() < self.full_horizon
    }

    /// Row at the pension boundary: the last projected year
    pub fn boundary(&self) -> Option<&PanelRow> {
        self.rows.last()
    }
}

/// The projection panel, sorted by group key
#[derive(Debug, Clone, Default)]
pub struct Panel {
    groups: Vec<PanelGroup>,
}

impl Panel {
    /// Build a panel from groups; groups are sorted by key
    pub fn from_groups(mut groups: Vec<PanelGroup>) -> Self {
        groups.sort_by_key(|g| g.key);
        Self { groups }
    }

    pub fn groups(&self) -> &[PanelGroup] {
        &self.groups
    }

    pub fn groups_mut(&mut self) -> &mut [PanelGroup] {
        &mut self.groups
    }

    /// Total number of rows
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.rows.is_empty())
    }

    /// All rows in panel order, paired with their group
    pub fn rows(&self) -> impl Iterator<Item = (&PanelGroup, &PanelRow)> {
        self.groups
            .iter()
            .flat_map(|g| g.rows.iter().map(move |r| (g, r)))
    }
}
