//! Index resolution, benefit projection and summary reduction

mod engine;
pub mod output;
pub mod resolver;
pub mod summary;

pub use engine::{ProjectionConfig, ProjectionEngine};
pub use resolver::{resolve_all, Driver, MissPolicy, Requirement, Sign};
pub use summary::{SummaryReducer, SummaryRow, SURVIVOR_FRACTION};
