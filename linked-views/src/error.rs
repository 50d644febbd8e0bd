//! Error types for the linked-views core.
//!
//! Nothing here is fatal: a rejected selection leaves the previous one active
//! and a failed render only affects the view that raised it.

use serde::Serialize;
use thiserror::Error;

use crate::types::{FieldId, SimulationId};

/// Errors raised while loading data, validating configuration or accepting a
/// selection at the coordinator boundary.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("unknown bucket name `{0}`")]
    UnknownBucket(String),
    #[error("unknown simulation {0}")]
    UnknownSimulation(SimulationId),
    #[error("unknown field {0}")]
    UnknownField(FieldId),
    #[error("simulation {0} appears more than once")]
    DuplicateSimulation(SimulationId),
    #[error("field {0} appears more than once")]
    DuplicateField(FieldId),
    #[error("field {field} references missing simulation {simulation}")]
    OrphanField {
        field: FieldId,
        simulation: SimulationId,
    },
    #[error("simulation {simulation} has recruitment rate {rate}, expected a value in [0, 1]")]
    InvalidRate { simulation: SimulationId, rate: f64 },
    #[error("field {0} geometry needs at least three vertices")]
    DegeneratePolygon(FieldId),
    #[error("bucket thresholds must be strictly increasing inside (0, 1), got {0:?}")]
    InvalidThresholds([f64; 3]),
    #[error("{name} must lie in [0, 1], got {value}")]
    InvalidOpacity { name: &'static str, value: f64 },
    #[error("demo data would need {0} fields, more than the u32 id space holds")]
    TooManyFields(u64),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// A render failure reported by one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("view `{view}` failed to render: {message}")]
pub struct ViewError {
    pub view: String,
    pub message: String,
}

impl ViewError {
    pub fn new(view: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            message: message.into(),
        }
    }
}
