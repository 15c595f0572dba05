use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ProjectId;

#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("Invalid team: {0}")]
    InvalidTeam(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Planner unavailable after {attempts} attempts: {message}")]
    PlannerUnavailable { attempts: u32, message: String },

    #[error("Malformed plan: {0}")]
    MalformedPlan(String),

    #[error("Planning deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Stable failure category reported to callers. Internal detail stays in the
/// error message; the kind is what the command layer switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidTeam,
    Store,
    Configuration,
    PlannerUnavailable,
    MalformedPlan,
    DeadlineExceeded,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidTeam => "invalid_team",
            ErrorKind::Store => "store",
            ErrorKind::Configuration => "configuration",
            ErrorKind::PlannerUnavailable => "planner_unavailable",
            ErrorKind::MalformedPlan => "malformed_plan",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl PlanningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanningError::Validation(_) => ErrorKind::Validation,
            PlanningError::ProjectNotFound(_) => ErrorKind::NotFound,
            PlanningError::InvalidTeam(_) => ErrorKind::InvalidTeam,
            PlanningError::Store(_) => ErrorKind::Store,
            PlanningError::Configuration(_) => ErrorKind::Configuration,
            PlanningError::PlannerUnavailable { .. } => ErrorKind::PlannerUnavailable,
            PlanningError::MalformedPlan(_) => ErrorKind::MalformedPlan,
            PlanningError::DeadlineExceeded(_) => ErrorKind::DeadlineExceeded,
        }
    }

    /// Only transient call failures are worth another attempt; everything
    /// else is terminal for the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlanningError::PlannerUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, PlanningError>;
