//! Plan members, pension plans and their claims

mod data;
pub mod loader;

pub use data::{ClaimCode, ClaimDefinition, ClaimKind, Member, PlanType, Sex};
pub use loader::{load_claims, load_claims_from_readers, load_members, load_members_from_reader};
