//! Errors surfaced to callers, classified by kind and carrying the native code.

use strum::{Display, EnumString};
use thiserror::Error;

use crate::code::NativeCode;

/// Result alias used across `VcxKit`.
pub type VcxKitResult<T, E = VcxKitError> = std::result::Result<T, E>;

/// Which half of the two-phase native contract reported a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    /// The status code returned synchronously by the entry point.
    Immediate,
    /// The error field delivered to the completion callback.
    Callback,
}

/// The stable, type-independent class of a failure. Callers branch on this while the
/// raw native code stays available for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Operation attempted on a null, released, stale or never-initialized handle.
    InvalidHandle,
    /// Malformed or missing required input.
    InvalidInput,
    /// A snapshot or JSON document did not have the expected shape.
    InvalidJson,
    /// The operation is not available under the configured communication method.
    ActionNotSupported,
    /// The native entry point rejected the call synchronously.
    NativeRejected,
    /// The native completion callback reported an error.
    CallbackError,
    /// A code with no mapped kind. The raw code is preserved.
    Unknown,
}

/// Error outputs from `VcxKit`.
///
/// Every variant carries the native numeric code verbatim together with a human
/// readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error, uniffi::Error)]
pub enum VcxKitError {
    /// See [`ErrorKind::InvalidHandle`].
    #[error("invalid_handle [{code}]: {message}")]
    InvalidHandle { code: u32, message: String },
    /// See [`ErrorKind::InvalidInput`].
    #[error("invalid_input [{code}]: {message}")]
    InvalidInput { code: u32, message: String },
    /// See [`ErrorKind::InvalidJson`].
    #[error("invalid_json [{code}]: {message}")]
    InvalidJson { code: u32, message: String },
    /// See [`ErrorKind::ActionNotSupported`].
    #[error("action_not_supported [{code}]: {message}")]
    ActionNotSupported { code: u32, message: String },
    /// See [`ErrorKind::NativeRejected`].
    #[error("native_rejected [{code}]: {message}")]
    NativeRejected { code: u32, message: String },
    /// See [`ErrorKind::CallbackError`].
    #[error("callback_error [{code}]: {message}")]
    CallbackError { code: u32, message: String },
    /// See [`ErrorKind::Unknown`].
    #[error("unknown [{code}]: {message}")]
    Unknown { code: u32, message: String },
}

impl VcxKitError {
    /// Builds an error of the given kind.
    pub fn new(kind: ErrorKind, code: NativeCode, message: impl Into<String>) -> Self {
        let code = code.0;
        let message = message.into();
        match kind {
            ErrorKind::InvalidHandle => Self::InvalidHandle { code, message },
            ErrorKind::InvalidInput => Self::InvalidInput { code, message },
            ErrorKind::InvalidJson => Self::InvalidJson { code, message },
            ErrorKind::ActionNotSupported => Self::ActionNotSupported { code, message },
            ErrorKind::NativeRejected => Self::NativeRejected { code, message },
            ErrorKind::CallbackError => Self::CallbackError { code, message },
            ErrorKind::Unknown => Self::Unknown { code, message },
        }
    }

    /// Classifies a native code reported in `phase`.
    pub fn from_native(
        code: NativeCode,
        phase: CallPhase,
        message: impl Into<String>,
    ) -> Self {
        Self::new(code.kind(phase), code, message)
    }

    pub(crate) fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, NativeCode::UNKNOWN_ERROR, message)
    }

    /// The error class.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidHandle { .. } => ErrorKind::InvalidHandle,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::InvalidJson { .. } => ErrorKind::InvalidJson,
            Self::ActionNotSupported { .. } => ErrorKind::ActionNotSupported,
            Self::NativeRejected { .. } => ErrorKind::NativeRejected,
            Self::CallbackError { .. } => ErrorKind::CallbackError,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// The native code, verbatim.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            Self::InvalidHandle { code, .. }
            | Self::InvalidInput { code, .. }
            | Self::InvalidJson { code, .. }
            | Self::ActionNotSupported { code, .. }
            | Self::NativeRejected { code, .. }
            | Self::CallbackError { code, .. }
            | Self::Unknown { code, .. } => *code,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidHandle { message, .. }
            | Self::InvalidInput { message, .. }
            | Self::InvalidJson { message, .. }
            | Self::ActionNotSupported { message, .. }
            | Self::NativeRejected { message, .. }
            | Self::CallbackError { message, .. }
            | Self::Unknown { message, .. } => message,
        }
    }
}

impl From<serde_json::Error> for VcxKitError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorKind::InvalidJson, NativeCode::INVALID_JSON, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_native_preserves_raw_code() {
        let error = VcxKitError::from_native(
            NativeCode(777_777),
            CallPhase::Callback,
            "vcx_connection_connect",
        );
        assert_eq!(error.kind(), ErrorKind::Unknown);
        assert_eq!(error.code(), 777_777);
        assert_eq!(error.to_string(), "unknown [777777]: vcx_connection_connect");
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ErrorKind::ActionNotSupported.to_string(), "action_not_supported");
        assert_eq!(
            "invalid_handle".parse::<ErrorKind>().unwrap(),
            ErrorKind::InvalidHandle
        );
    }

    #[test]
    fn test_serde_errors_are_invalid_json() {
        let error: VcxKitError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(error.kind(), ErrorKind::InvalidJson);
        assert_eq!(error.code(), NativeCode::INVALID_JSON.0);
    }
}
