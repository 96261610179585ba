//! Error taxonomy for loading, panel construction, index resolution,
//! projection and summary reduction

use std::fmt;
use thiserror::Error;

/// Pipeline stage in which an error was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    PanelBuild,
    IndexResolution,
    Projection,
    Summary,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::PanelBuild => "panel build",
            Stage::IndexResolution => "index resolution",
            Stage::Projection => "projection",
            Stage::Summary => "summary",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("[{stage}] configuration error: {message}")]
    Configuration { stage: Stage, message: String },

    #[error("[{stage}] data integrity error in {table}: {message}")]
    DataIntegrity {
        stage: Stage,
        table: String,
        message: String,
    },

    #[error(
        "[{stage}] undefined {driver} index for member {member_id}, plan {plan_id}, \
         claim {claim}, simulation {simulation}, year {boy}"
    )]
    UndefinedIndex {
        stage: Stage,
        driver: &'static str,
        member_id: u32,
        plan_id: u32,
        claim: String,
        simulation: u32,
        boy: u32,
    },

    #[error("[{stage}] non-numeric value in column {column} for member {member_id}, plan {plan_id}, claim {claim}")]
    NonNumeric {
        stage: Stage,
        column: &'static str,
        member_id: u32,
        plan_id: u32,
        claim: String,
    },

    #[error("[load] CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("[load] I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[load] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProjectionError {
    pub fn config(stage: Stage, message: impl Into<String>) -> Self {
        ProjectionError::Configuration {
            stage,
            message: message.into(),
        }
    }

    pub fn integrity(stage: Stage, table: impl Into<String>, message: impl Into<String>) -> Self {
        ProjectionError::DataIntegrity {
            stage,
            table: table.into(),
            message: message.into(),
        }
    }

    /// Stage the error was raised in; I/O and parse failures belong to loading
    pub fn stage(&self) -> Stage {
        match self {
            ProjectionError::Configuration { stage, .. }
            | ProjectionError::DataIntegrity { stage, .. }
            | ProjectionError::UndefinedIndex { stage, .. }
            | ProjectionError::NonNumeric { stage, .. } => *stage,
            ProjectionError::Csv(_)
            | ProjectionError::Io(_)
            | ProjectionError::Json(_) => Stage::Load,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
