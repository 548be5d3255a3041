//! Session configuration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::{code::NativeCode, error::ErrorKind, VcxKitError, VcxKitResult};

/// The messaging protocol family the native engine speaks.
///
/// Several actions (rejecting a credential offer, declining a presentation request)
/// only exist under [`CommunicationMethod::Aries`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    uniffi::Enum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CommunicationMethod {
    /// The legacy agency protocol.
    #[default]
    Proprietary,
    /// Aries RFC based protocols.
    Aries,
}

/// Configuration accepted by [`crate::Session::from_config_json`].
///
/// Only the keys the binding acts on are typed. Every other key is kept in `native`
/// and handed to the engine verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VcxKitConfig {
    #[serde(default)]
    pub communication_method: CommunicationMethod,
    #[serde(
        default,
        deserialize_with = "bool_or_string",
        serialize_with = "bool_as_string"
    )]
    pub enable_test_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    #[serde(flatten)]
    pub native: Map<String, Value>,
}

impl VcxKitConfig {
    /// Parses a configuration document.
    ///
    /// # Errors
    /// Returns [`ErrorKind::InvalidJson`] when `json` is not a valid configuration object.
    pub fn from_json(json: &str) -> VcxKitResult<Self> {
        serde_json::from_str(json).map_err(|error| {
            VcxKitError::new(
                ErrorKind::InvalidJson,
                NativeCode::INVALID_JSON,
                format!("invalid configuration: {error}"),
            )
        })
    }

    /// Configuration for the in-memory test mode engine.
    #[must_use]
    pub fn test_mode(communication_method: CommunicationMethod) -> Self {
        Self {
            communication_method,
            enable_test_mode: true,
            ..Self::default()
        }
    }

    /// The document handed to the native `init` entry point.
    #[must_use]
    pub fn to_native_json(&self) -> String {
        // A map of JSON values always serializes.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

fn bool_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Str(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Str(value) => value.parse().map_err(serde::de::Error::custom),
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)] // signature required by serde
fn bool_as_string<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *value { "true" } else { "false" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VcxKitConfig::from_json("{}").unwrap();
        assert_eq!(config.communication_method, CommunicationMethod::Proprietary);
        assert!(!config.enable_test_mode);
        assert!(config.native.is_empty());
    }

    #[test]
    fn test_test_mode_accepts_bool_and_string() {
        let config = VcxKitConfig::from_json(r#"{"enable_test_mode":"true"}"#).unwrap();
        assert!(config.enable_test_mode);
        let config = VcxKitConfig::from_json(r#"{"enable_test_mode":true}"#).unwrap();
        assert!(config.enable_test_mode);
        assert!(VcxKitConfig::from_json(r#"{"enable_test_mode":"yes"}"#).is_err());
    }

    #[test]
    fn test_passthrough_keys_reach_native() {
        let config = VcxKitConfig::from_json(
            r#"{"communication_method":"aries","agency_endpoint":"http://localhost:8080"}"#,
        )
        .unwrap();
        assert_eq!(config.communication_method, CommunicationMethod::Aries);

        let native: Value = serde_json::from_str(&config.to_native_json()).unwrap();
        assert_eq!(native["agency_endpoint"], "http://localhost:8080");
        assert_eq!(native["communication_method"], "aries");
        assert_eq!(native["enable_test_mode"], "false");
    }

    #[test]
    fn test_communication_method_from_str() {
        assert_eq!(
            "aries".parse::<CommunicationMethod>().unwrap(),
            CommunicationMethod::Aries
        );
    }

    #[test]
    fn test_invalid_document() {
        let error = VcxKitConfig::from_json("[]").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidJson);
    }
}
