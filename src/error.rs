//! Error taxonomy for TSPEC configuration, negotiation and resynchronization.

/// Failure reported by a station collaborator (transport, firmware, MIB).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StationError {
    #[error("confirmation timed out")]
    Timeout,
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("collaborator unavailable")]
    Unavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum CacError {
    #[error("Invalid TSPEC field: {0}")]
    InvalidField(String),
    #[error("TSPEC field is read-only: {0}")]
    ReadOnly(&'static str),
    #[error("Value {value} exceeds maximum {max} for {field}")]
    ValueOutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },
    #[error("No pending TSPEC with id {0}")]
    InvalidTsid(u8),
    #[error("TSPEC {0} already accepted")]
    AlreadyAccepted(u8),
    #[error("Station not connected")]
    NotConnected,
    #[error("BSS rate too low: {rate} b/s below minimum PHY rate {min_phy_rate} b/s")]
    RateTooLow { rate: u32, min_phy_rate: u32 },
    #[error("Transport: {0}")]
    Transport(String),
    #[error("Firmware: {0}")]
    Firmware(String),
    #[error("No pending request for dialog token {0}")]
    NoMatchingRequest(u8),
    #[error("Invalid user priority {0}")]
    ProtocolError(u32),
    #[error("No prior admission found for priority {0}")]
    NoPriorAdmission(u8),
    #[error("TSPEC id {0} out of range 0-7")]
    OutOfRange(i64),
    #[error("No TSPEC with id {0}")]
    NotFound(u8),
    #[error("TSPEC id {0} already has a pending entry")]
    IdInUse(u8),
    #[error("Malformed frame: {0}")]
    Malformed(String),
    #[error("Parse: {0}")]
    Parse(String),
    #[error("Config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CacError>;
