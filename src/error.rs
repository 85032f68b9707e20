//! Error types for the Bricks Planner
//!
//! Provides a closed error taxonomy for request validation, layout
//! generation, brick sizing and device allocation, plus the ambient
//! configuration and I/O failures of the surrounding tooling.

use thiserror::Error;

/// Unified error type for the planner
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("invalid replica count: {count} (supported: 2 or 3)")]
    InvalidReplicaCount { count: u32 },

    #[error("invalid arbiter count: {count} (at most 1 arbiter per subvolume)")]
    InvalidArbiterCount { count: u32 },

    #[error("disperse redundancy count is required when disperse data count is set")]
    RedundancyRequired,

    #[error("invalid redundancy count: {redundancy} (disperse count {disperse_count})")]
    InvalidRedundancyCount { redundancy: u32, disperse_count: u32 },

    #[error("invalid max-brick-size {size}: {reason}")]
    InvalidMaxBrickSize { size: u64, reason: String },

    // =========================================================================
    // Planner Errors
    // =========================================================================
    #[error("subvolume type not supported: {0}")]
    UnsupportedSubvolumeType(String),

    // =========================================================================
    // Size Errors
    // =========================================================================
    #[error("brick size is too small: {size} bytes (minimum {minimum} bytes)")]
    BrickTooSmall { size: u64, minimum: u64 },

    // =========================================================================
    // Capacity Errors
    // =========================================================================
    #[error("no devices registered or available for allocating bricks")]
    NoDevicesAvailable,

    #[error("no space available for subvolume {subvolume}: {unplaced} of {total} bricks could not be placed")]
    InsufficientCapacity {
        subvolume: usize,
        unplaced: usize,
        total: usize,
    },

    // =========================================================================
    // Inventory Errors
    // =========================================================================
    #[error("device not found: {peer_id}/{name}")]
    DeviceNotFound { peer_id: String, name: String },

    #[error("device already registered: {peer_id}/{name}")]
    DeviceExists { peer_id: String, name: String },

    #[error("volume {volume} already holds a reservation")]
    AlreadyReserved { volume: String },

    #[error("volume {volume} holds no reservation")]
    NotReserved { volume: String },

    #[error("device {peer_id}/{name} has {available} bytes free, plan needs {requested}")]
    DeviceCapacityExceeded {
        peer_id: String,
        name: String,
        requested: u64,
        available: u64,
    },

    // =========================================================================
    // Configuration & Parse Errors
    // =========================================================================
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("capacity parse error: {0}")]
    CapacityParse(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Closed classification of planner failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request
    Validation,
    /// Unsupported subvolume type
    Planner,
    /// Brick size below the minimum after subdivision
    Size,
    /// Empty inventory or unplaceable bricks
    Capacity,
    /// Device registry bookkeeping
    Inventory,
    /// Configuration, parsing, I/O and anything else
    Other,
}

/// How a caller should surface a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The client sent a bad request
    ClientInput,
    /// A dependency (device capacity) is not able to satisfy the request
    Conflict,
    /// Anything the client cannot fix
    Internal,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_)
            | Error::InvalidReplicaCount { .. }
            | Error::InvalidArbiterCount { .. }
            | Error::RedundancyRequired
            | Error::InvalidRedundancyCount { .. }
            | Error::InvalidMaxBrickSize { .. } => ErrorKind::Validation,

            Error::UnsupportedSubvolumeType(_) => ErrorKind::Planner,

            Error::BrickTooSmall { .. } => ErrorKind::Size,

            Error::NoDevicesAvailable
            | Error::InsufficientCapacity { .. }
            | Error::DeviceCapacityExceeded { .. } => ErrorKind::Capacity,

            Error::DeviceNotFound { .. }
            | Error::DeviceExists { .. }
            | Error::AlreadyReserved { .. }
            | Error::NotReserved { .. } => ErrorKind::Inventory,

            _ => ErrorKind::Other,
        }
    }

    /// Determine how this error should be reported to the client
    pub fn class(&self) -> FailureClass {
        match self.kind() {
            ErrorKind::Validation => FailureClass::ClientInput,
            ErrorKind::Capacity => FailureClass::Conflict,
            _ => FailureClass::Internal,
        }
    }

    /// Planning is deterministic, so retrying against the same inventory
    /// never helps. Only I/O failures of the inventory source are worth
    /// another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

/// Result type alias for the planner
pub type Result<T> = std::result::Result<T, Error>;
