//! Error taxonomy shared by every hwmgr crate
//!
//! Each [`HwError`] variant maps onto one stable numeric [`ErrorCode`], so
//! callers that only care about the class of failure (FFI shims, exit codes,
//! log aggregation) can match on the code while humans read the message.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable numeric error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    None = 0,
    Unknown = -1,
    NotInitialized = -2,
    AlreadyInit = -3,
    Memory = -4,
    InvalidArg = -5,
    NotFound = -6,
    NotSupported = -7,
    Busy = -8,
    Access = -9,
    Timeout = -10,
    Device = -11,
    Io = -12,
    NotLoaded = -13,
    Driver = -14,
    File = -15,
    Thread = -16,
    Mutex = -17,
    Overrun = -18,
    Config = -19,
    InvalidState = -20,
}

impl ErrorCode {
    const ALL: [ErrorCode; 21] = [
        ErrorCode::None,
        ErrorCode::Unknown,
        ErrorCode::NotInitialized,
        ErrorCode::AlreadyInit,
        ErrorCode::Memory,
        ErrorCode::InvalidArg,
        ErrorCode::NotFound,
        ErrorCode::NotSupported,
        ErrorCode::Busy,
        ErrorCode::Access,
        ErrorCode::Timeout,
        ErrorCode::Device,
        ErrorCode::Io,
        ErrorCode::NotLoaded,
        ErrorCode::Driver,
        ErrorCode::File,
        ErrorCode::Thread,
        ErrorCode::Mutex,
        ErrorCode::Overrun,
        ErrorCode::Config,
        ErrorCode::InvalidState,
    ];

    /// Numeric value of this code
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Look up a code by its numeric value
    pub fn from_value(value: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|code| code.value() == value)
    }

    /// Human-readable description
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::None => "Success",
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::NotInitialized => "Not initialized",
            ErrorCode::AlreadyInit => "Already initialized",
            ErrorCode::Memory => "Memory allocation failed",
            ErrorCode::InvalidArg => "Invalid argument",
            ErrorCode::NotFound => "Not found",
            ErrorCode::NotSupported => "Not supported",
            ErrorCode::Busy => "Resource busy",
            ErrorCode::Access => "Access denied",
            ErrorCode::Timeout => "Operation timed out",
            ErrorCode::Device => "Device error",
            ErrorCode::Io => "I/O error",
            ErrorCode::NotLoaded => "Driver not loaded",
            ErrorCode::Driver => "Driver error",
            ErrorCode::File => "File error",
            ErrorCode::Thread => "Thread error",
            ErrorCode::Mutex => "Mutex error",
            ErrorCode::Overrun => "Buffer overrun",
            ErrorCode::Config => "Configuration error",
            ErrorCode::InvalidState => "Invalid state",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by hardware manager operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HwError {
    #[error("unknown error: {0}")]
    Unknown(String),
    #[error("hardware manager is not initialized")]
    NotInitialized,
    #[error("hardware manager is already initialized")]
    AlreadyInit,
    #[error("memory allocation failed")]
    Memory,
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: u32 },
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("resource busy: {0}")]
    Busy(String),
    #[error("access denied: {0}")]
    Access(String),
    #[error("operation timed out")]
    Timeout,
    #[error("device error: {0}")]
    Device(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("driver not loaded")]
    NotLoaded,
    #[error("driver error: {0}")]
    Driver(String),
    #[error("file error: {0}")]
    File(String),
    #[error("thread error: {0}")]
    Thread(String),
    #[error("lock poisoned")]
    Mutex,
    #[error("overrun: {0}")]
    Overrun(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl HwError {
    pub fn component_not_found(id: u32) -> Self {
        HwError::NotFound { what: "component", id }
    }

    pub fn monitor_not_found(id: u32) -> Self {
        HwError::NotFound { what: "monitor", id }
    }

    /// The stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            HwError::Unknown(_) => ErrorCode::Unknown,
            HwError::NotInitialized => ErrorCode::NotInitialized,
            HwError::AlreadyInit => ErrorCode::AlreadyInit,
            HwError::Memory => ErrorCode::Memory,
            HwError::InvalidArg(_) => ErrorCode::InvalidArg,
            HwError::NotFound { .. } => ErrorCode::NotFound,
            HwError::NotSupported(_) => ErrorCode::NotSupported,
            HwError::Busy(_) => ErrorCode::Busy,
            HwError::Access(_) => ErrorCode::Access,
            HwError::Timeout => ErrorCode::Timeout,
            HwError::Device(_) => ErrorCode::Device,
            HwError::Io(_) => ErrorCode::Io,
            HwError::NotLoaded => ErrorCode::NotLoaded,
            HwError::Driver(_) => ErrorCode::Driver,
            HwError::File(_) => ErrorCode::File,
            HwError::Thread(_) => ErrorCode::Thread,
            HwError::Mutex => ErrorCode::Mutex,
            HwError::Overrun(_) => ErrorCode::Overrun,
            HwError::Config(_) => ErrorCode::Config,
            HwError::InvalidState(_) => ErrorCode::InvalidState,
        }
    }
}

impl From<std::io::Error> for HwError {
    fn from(e: std::io::Error) -> Self {
        HwError::Io(e.to_string())
    }
}

impl From<std::collections::TryReserveError> for HwError {
    fn from(_: std::collections::TryReserveError) -> Self {
        HwError::Memory
    }
}

/// Result alias used throughout hwmgr
pub type HwResult<T> = Result<T, HwError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_through_value() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_value(code.value()), Some(code));
        }
        assert_eq!(ErrorCode::from_value(7), None);
    }

    #[test]
    fn test_error_maps_to_code() {
        assert_eq!(HwError::component_not_found(3).code(), ErrorCode::NotFound);
        assert_eq!(HwError::Mutex.code(), ErrorCode::Mutex);
        assert_eq!(HwError::Memory.code().value(), -4);
        assert_eq!(
            HwError::monitor_not_found(9).to_string(),
            "monitor 9 not found"
        );
    }
}
