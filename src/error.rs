use serde::Serialize;
use thiserror::Error;

/// Everything the scheduler can refuse, plus the storage failures of its collaborators.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("the salon is closed on {weekday}s")]
    ClosedDay { weekday: String },

    #[error("{date} is a holiday")]
    Holiday { date: String },

    #[error("outside business hours ({open}-{close})")]
    OutsideHours { open: String, close: String },

    #[error("crosses the {start}-{end} break")]
    CrossesBreak { start: String, end: String },

    #[error("maximum capacity ({limit}) reached at that time")]
    CapacityExceeded { limit: u32 },

    #[error("cannot move an appointment from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("phone number already registered for {existing}")]
    DuplicateContact { existing: String },

    #[error("{0}")]
    MalformedInput(String),

    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: String },

    #[error("business policies are not configured yet (capacity is required)")]
    NotConfigured,

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Machine-readable counterpart of [`SchedulerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ClosedDay,
    Holiday,
    OutsideHours,
    CrossesBreak,
    CapacityExceeded,
    InvalidTransition,
    DuplicateContact,
    MalformedInput,
    NotFound,
    NotConfigured,
    Storage,
}

impl SchedulerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchedulerError::ClosedDay { .. } => ErrorKind::ClosedDay,
            SchedulerError::Holiday { .. } => ErrorKind::Holiday,
            SchedulerError::OutsideHours { .. } => ErrorKind::OutsideHours,
            SchedulerError::CrossesBreak { .. } => ErrorKind::CrossesBreak,
            SchedulerError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            SchedulerError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            SchedulerError::DuplicateContact { .. } => ErrorKind::DuplicateContact,
            SchedulerError::MalformedInput(_) => ErrorKind::MalformedInput,
            SchedulerError::NotFound { .. } => ErrorKind::NotFound,
            SchedulerError::NotConfigured => ErrorKind::NotConfigured,
            SchedulerError::Storage(_) | SchedulerError::Serialization(_) => ErrorKind::Storage,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        SchedulerError::MalformedInput(message.into())
    }

    pub fn not_found(what: &'static str, id: impl Into<String>) -> Self {
        SchedulerError::NotFound { what, id: id.into() }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
