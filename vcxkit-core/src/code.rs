//! Native status codes returned by the VCX engine.
//!
//! The numeric space belongs to the native library. This module names the codes the
//! binding needs to classify and never reinterprets anything else.

use std::fmt;

use crate::error::{CallPhase, ErrorKind};

/// A raw status code reported by the native engine, either as the immediate return
/// value of an entry point or as the error field of its completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeCode(pub u32);

impl NativeCode {
    pub const SUCCESS: Self = Self(0);
    pub const UNKNOWN_ERROR: Self = Self(1001);
    pub const INVALID_CONNECTION_HANDLE: Self = Self(1003);
    pub const INVALID_CONFIGURATION: Self = Self(1004);
    pub const NOT_READY: Self = Self(1005);
    pub const INVALID_OPTION: Self = Self(1007);
    pub const INVALID_DID: Self = Self(1008);
    pub const POST_MESSAGE_FAILURE: Self = Self(1010);
    pub const INVALID_ISSUER_CREDENTIAL_HANDLE: Self = Self(1015);
    pub const INVALID_JSON: Self = Self(1016);
    pub const INVALID_PROOF_HANDLE: Self = Self(1017);
    pub const INVALID_CREDENTIAL_REQUEST: Self = Self(1018);
    pub const INVALID_SCHEMA: Self = Self(1031);
    pub const INVALID_CREDENTIAL_DEF_HANDLE: Self = Self(1037);
    pub const INVALID_SCHEMA_HANDLE: Self = Self(1042);
    pub const INVALID_CREDENTIAL_OFFER: Self = Self(1043);
    pub const INVALID_INVITE_DETAILS: Self = Self(1045);
    pub const INVALID_OBJ_HANDLE: Self = Self(1048);
    pub const INVALID_DISCLOSED_PROOF_HANDLE: Self = Self(1049);
    pub const SERIALIZATION_ERROR: Self = Self(1050);
    pub const INVALID_CREDENTIAL_HANDLE: Self = Self(1053);
    pub const INVALID_CREDENTIAL_JSON: Self = Self(1054);
    pub const INVALID_WALLET_HANDLE: Self = Self(1057);
    pub const OBJECT_CACHE_ERROR: Self = Self(1070);
    pub const DUPLICATE_WALLET_RECORD: Self = Self(1072);
    pub const WALLET_RECORD_NOT_FOUND: Self = Self(1073);
    pub const INVALID_STATE: Self = Self(1081);
    pub const INVALID_PROOF_REQUEST: Self = Self(1086);
    pub const ACTION_NOT_SUPPORTED: Self = Self(1103);
    pub const MESSAGE_IS_OUT_OF_THREAD: Self = Self(1109);
    pub const INVALID_PROOF_PROPOSAL: Self = Self(1110);
    pub const INCOMPATIBLE_PARAMETERS: Self = Self(1111);
    pub const CONNECTION_NOT_COMPLETED: Self = Self(1112);

    /// Returns `true` for the zero status.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Returns the symbolic name of the code when the binding knows it.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0 => "SUCCESS",
            1001 => "UNKNOWN_ERROR",
            1003 => "INVALID_CONNECTION_HANDLE",
            1004 => "INVALID_CONFIGURATION",
            1005 => "NOT_READY",
            1007 => "INVALID_OPTION",
            1008 => "INVALID_DID",
            1010 => "POST_MESSAGE_FAILURE",
            1015 => "INVALID_ISSUER_CREDENTIAL_HANDLE",
            1016 => "INVALID_JSON",
            1017 => "INVALID_PROOF_HANDLE",
            1018 => "INVALID_CREDENTIAL_REQUEST",
            1031 => "INVALID_SCHEMA",
            1037 => "INVALID_CREDENTIAL_DEF_HANDLE",
            1042 => "INVALID_SCHEMA_HANDLE",
            1043 => "INVALID_CREDENTIAL_OFFER",
            1045 => "INVALID_INVITE_DETAILS",
            1048 => "INVALID_OBJ_HANDLE",
            1049 => "INVALID_DISCLOSED_PROOF_HANDLE",
            1050 => "SERIALIZATION_ERROR",
            1053 => "INVALID_CREDENTIAL_HANDLE",
            1054 => "INVALID_CREDENTIAL_JSON",
            1057 => "INVALID_WALLET_HANDLE",
            1070 => "OBJECT_CACHE_ERROR",
            1072 => "DUPLICATE_WALLET_RECORD",
            1073 => "WALLET_RECORD_NOT_FOUND",
            1081 => "INVALID_STATE",
            1086 => "INVALID_PROOF_REQUEST",
            1103 => "ACTION_NOT_SUPPORTED",
            1109 => "MESSAGE_IS_OUT_OF_THREAD",
            1110 => "INVALID_PROOF_PROPOSAL",
            1111 => "INCOMPATIBLE_PARAMETERS",
            1112 => "CONNECTION_NOT_COMPLETED",
            _ => return None,
        };
        Some(name)
    }

    /// Maps the code onto the binding's error taxonomy.
    ///
    /// Handle, input, JSON and unsupported-action codes keep their kind regardless of
    /// where they were reported. Any other named code is classified by the phase that
    /// reported it. Unnamed codes and `UNKNOWN_ERROR` are always [`ErrorKind::Unknown`].
    #[must_use]
    pub const fn kind(self, phase: CallPhase) -> ErrorKind {
        match self.0 {
            1003 | 1015 | 1017 | 1037 | 1042 | 1048 | 1049 | 1053 | 1057 => {
                ErrorKind::InvalidHandle
            }
            1007 | 1008 | 1018 | 1031 | 1043 | 1045 | 1086 | 1110 | 1111 => {
                ErrorKind::InvalidInput
            }
            1016 | 1050 | 1054 => ErrorKind::InvalidJson,
            1103 => ErrorKind::ActionNotSupported,
            1001 => ErrorKind::Unknown,
            _ if self.name().is_none() => ErrorKind::Unknown,
            _ => match phase {
                CallPhase::Immediate => ErrorKind::NativeRejected,
                CallPhase::Callback => ErrorKind::CallbackError,
            },
        }
    }
}

impl fmt::Display for NativeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({name})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<u32> for NativeCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(NativeCode::INVALID_CONNECTION_HANDLE, ErrorKind::InvalidHandle)]
    #[test_case(NativeCode::INVALID_DISCLOSED_PROOF_HANDLE, ErrorKind::InvalidHandle)]
    #[test_case(NativeCode::INVALID_OPTION, ErrorKind::InvalidInput)]
    #[test_case(NativeCode::INVALID_CREDENTIAL_OFFER, ErrorKind::InvalidInput)]
    #[test_case(NativeCode::INVALID_JSON, ErrorKind::InvalidJson)]
    #[test_case(NativeCode::ACTION_NOT_SUPPORTED, ErrorKind::ActionNotSupported)]
    #[test_case(NativeCode::UNKNOWN_ERROR, ErrorKind::Unknown)]
    #[test_case(NativeCode(4242), ErrorKind::Unknown)]
    fn test_kind_is_phase_independent(code: NativeCode, expected: ErrorKind) {
        assert_eq!(code.kind(CallPhase::Immediate), expected);
        assert_eq!(code.kind(CallPhase::Callback), expected);
    }

    #[test]
    fn test_named_generic_codes_follow_phase() {
        let code = NativeCode::POST_MESSAGE_FAILURE;
        assert_eq!(code.kind(CallPhase::Immediate), ErrorKind::NativeRejected);
        assert_eq!(code.kind(CallPhase::Callback), ErrorKind::CallbackError);
    }

    #[test]
    fn test_display_includes_name() {
        assert_eq!(
            NativeCode::INVALID_JSON.to_string(),
            "1016 (INVALID_JSON)"
        );
        assert_eq!(NativeCode(9).to_string(), "9");
    }
}
