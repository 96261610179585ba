//! Pension Projection - projection engine for pension plan benefits
//!
//! This library provides:
//! - A long panel of member × claim × projection year × simulation rows
//! - Scenario index resolution (inflation, salary, indexation, interest,
//!   investment return, mortality, tariffs)
//! - Average-pay, final-pay and defined contribution accrual
//! - A per member, plan and simulation summary at the pension date

pub mod error;
pub mod formulae;
pub mod member;
pub mod assumptions;
pub mod panel;
pub mod projection;
pub mod scenario;

// Re-export commonly used types
pub use error::{ProjectionError, Result, Stage};
pub use member::{ClaimCode, ClaimDefinition, ClaimKind, Member, PlanType, Sex};
pub use assumptions::{AssumptionSet, ScenarioTable, ScenarioTables, SourceData};
pub use panel::{Panel, PanelBuilder, PanelGroup, PanelRow};
pub use projection::{ProjectionConfig, ProjectionEngine, SummaryReducer, SummaryRow};
pub use scenario::{ProjectionOutput, ScenarioRunner};
