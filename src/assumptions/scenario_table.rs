//! Scenario lookup tables keyed by a driver-specific natural key and a
//! simulation number
//!
//! Simulation numbers in a table form the dense range `1..=N`. Panels may
//! request more simulations than a table stores; requests are wrapped into
//! the stored range with [`modulo_map`]. Tables without a simulation
//! dimension answer every simulation with the same value.

use crate::error::{ProjectionError, Result, Stage};
use crate::member::{ClaimCode, Sex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

/// Wrap a simulation number into `1..=n`: `((x - 1) mod n) + 1`
pub fn modulo_map(simulation: u32, n: u32) -> u32 {
    (simulation.saturating_sub(1) % n.max(1)) + 1
}

/// Member status selecting the indexation path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Active,
    Inactive,
}

impl Status {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "active" | "actief" => Some(Status::Active),
            "inactive" | "inactief" => Some(Status::Inactive),
            _ => None,
        }
    }
}

/// Projection year (BOY)
pub type YearKey = u32;
/// Integer age
pub type AgeKey = i32;
pub type IndexationKey = (Status, u32);
/// (age at calculation date, projection year)
pub type ReturnKey = (i32, u32);
/// (sex, adjusted age at calculation date, adjusted attained age)
pub type MortalityKey = (Sex, i32, i32);
/// (tariff id, claim, sex, attained age)
pub type TariffKey = (u32, ClaimCode, Sex, i32);
/// (pension age, sex, claim, age at calculation date)
pub type PensionTariffKey = (u32, Sex, ClaimCode, i32);

/// Whether a table carries a simulation dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationAxis {
    /// Dense simulation numbers `1..=n`
    Simulated(u32),
    /// One value per key for every simulation
    Invariant,
}

/// Indexed scenario table with no duplicate keys
#[derive(Debug, Clone)]
pub struct ScenarioTable<K> {
    name: String,
    axis: SimulationAxis,
    values: HashMap<(K, u32), f64>,
}

impl<K> ScenarioTable<K>
where
    K: Copy + Eq + Hash + Debug,
{
    /// Build a table from (key, simulation, value) entries
    ///
    /// Either every entry carries a simulation number or none does. Duplicate
    /// (key, simulation) pairs and gaps in the simulation range are rejected.
    pub fn from_entries<I>(name: impl Into<String>, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Option<u32>, f64)>,
    {
        let name = name.into();
        let mut values = HashMap::new();
        let mut simulations = BTreeSet::new();
        let mut with_simulation = 0usize;
        let mut without_simulation = 0usize;

        for (key, simulation, value) in entries {
            let sim = match simulation {
                Some(0) => {
                    return Err(ProjectionError::integrity(
                        Stage::Load,
                        name,
                        format!("simulation numbers start at 1 (key {:?})", key),
                    ));
                }
                Some(sim) => {
                    with_simulation += 1;
                    simulations.insert(sim);
                    sim
                }
                None => {
                    without_simulation += 1;
                    0
                }
            };
            if values.insert((key, sim), value).is_some() {
                return Err(ProjectionError::integrity(
                    Stage::Load,
                    name,
                    format!("duplicate key {:?} for simulation {}", key, sim),
                ));
            }
        }

        if with_simulation > 0 && without_simulation > 0 {
            return Err(ProjectionError::integrity(
                Stage::Load,
                name,
                "rows mix simulated and simulation-invariant values",
            ));
        }

        let axis = match simulations.last() {
            Some(&max) => {
                if simulations.len() as u32 != max {
                    return Err(ProjectionError::integrity(
                        Stage::Load,
                        name,
                        format!(
                            "simulation numbers are not dense: {} distinct values up to {}",
                            simulations.len(),
                            max
                        ),
                    ));
                }
                SimulationAxis::Simulated(max)
            }
            None => SimulationAxis::Invariant,
        };

        Ok(Self { name, axis, values })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn axis(&self) -> SimulationAxis {
        self.axis
    }

    /// Number of stored simulation paths (1 for invariant tables)
    pub fn simulations(&self) -> u32 {
        match self.axis {
            SimulationAxis::Simulated(n) => n,
            SimulationAxis::Invariant => 1,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up the value for a key under a panel simulation number
    ///
    /// The simulation number is wrapped into the stored range; the caller's
    /// simulation number is never changed.
    pub fn get(&self, key: K, simulation: u32) -> Option<f64> {
        let sim = match self.axis {
            SimulationAxis::Simulated(n) => modulo_map(simulation, n),
            SimulationAxis::Invariant => 0,
        };
        self.values.get(&(key, sim)).copied()
    }
}
