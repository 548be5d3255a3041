//! The native library session.

use std::{borrow::Cow, fmt, sync::Arc};

use crate::{
    adapter::{native_error, AsyncCallAdapter, FromFields},
    code::NativeCode,
    config::{CommunicationMethod, VcxKitConfig},
    error::{CallPhase, ErrorKind},
    handle::HandleRegistry,
    native::{memory::InMemoryEngine, CommandHandle, NativeCallback, NativeEngine},
    VcxKitError, VcxKitResult,
};

/// Agency status of a message, as understood by the native layer.
///
/// The known values are named; any other string is forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageStatus(Cow<'static, str>);

impl MessageStatus {
    pub const CREATED: Self = Self(Cow::Borrowed("MS-101"));
    pub const SENT: Self = Self(Cow::Borrowed("MS-102"));
    pub const PENDING: Self = Self(Cow::Borrowed("MS-103"));
    pub const ACCEPTED: Self = Self(Cow::Borrowed("MS-104"));
    pub const REJECTED: Self = Self(Cow::Borrowed("MS-105"));
    pub const REVIEWED: Self = Self(Cow::Borrowed("MS-106"));

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageStatus {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

impl From<&str> for MessageStatus {
    fn from(value: &str) -> Self {
        Self(Cow::Owned(value.to_owned()))
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One native library session: the engine, the adapter that talks to it and the
/// registry of handles it has handed out.
///
/// Calls against different handles may be in flight concurrently. Calls against the
/// same handle are not serialized here; issuing two state updates on one handle at the
/// same time leaves it to the engine which message pass wins.
pub struct Session {
    config: VcxKitConfig,
    engine: Arc<dyn NativeEngine>,
    adapter: AsyncCallAdapter,
    registry: HandleRegistry,
    test_engine: Option<Arc<InMemoryEngine>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("adapter", &self.adapter)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// A session over an explicit engine.
    #[must_use]
    pub fn new(config: VcxKitConfig, engine: Arc<dyn NativeEngine>) -> Self {
        Self {
            config,
            engine,
            adapter: AsyncCallAdapter::new(),
            registry: HandleRegistry::new(),
            test_engine: None,
        }
    }

    /// A session over a fresh [`InMemoryEngine`], reachable afterwards through
    /// [`Self::test_engine`].
    #[must_use]
    pub fn in_memory(config: VcxKitConfig) -> Self {
        let engine = Arc::new(InMemoryEngine::new(config.communication_method));
        let mut session = Self::new(config, Arc::clone(&engine) as Arc<dyn NativeEngine>);
        session.test_engine = Some(engine);
        session
    }

    /// Parses `json` and picks the engine it asks for: the in-memory engine in test
    /// mode, the linked libvcx library otherwise.
    ///
    /// # Errors
    /// - `json` is not a valid configuration;
    /// - test mode is off and the crate was built without the `libvcx` feature.
    pub fn from_config_json(json: &str) -> VcxKitResult<Self> {
        let config = VcxKitConfig::from_json(json)?;
        log::info!(
            "vcxkit session created (communication_method={}, test_mode={})",
            config.communication_method,
            config.enable_test_mode
        );
        if config.enable_test_mode {
            Ok(Self::in_memory(config))
        } else {
            Ok(Self::new(config, Self::linked_engine()?))
        }
    }

    #[cfg(feature = "libvcx")]
    #[allow(clippy::unnecessary_wraps)]
    fn linked_engine() -> VcxKitResult<Arc<dyn NativeEngine>> {
        Ok(Arc::new(crate::native::libvcx::LibVcxEngine::new()))
    }

    #[cfg(not(feature = "libvcx"))]
    fn linked_engine() -> VcxKitResult<Arc<dyn NativeEngine>> {
        Err(VcxKitError::new(
            ErrorKind::InvalidInput,
            NativeCode::INVALID_CONFIGURATION,
            "test mode is disabled and no native library is linked",
        ))
    }

    #[must_use]
    pub const fn config(&self) -> &VcxKitConfig {
        &self.config
    }

    #[must_use]
    pub const fn communication_method(&self) -> CommunicationMethod {
        self.config.communication_method
    }

    #[must_use]
    pub const fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn adapter(&self) -> &AsyncCallAdapter {
        &self.adapter
    }

    #[must_use]
    pub fn engine(&self) -> &dyn NativeEngine {
        self.engine.as_ref()
    }

    /// The in-memory engine, for sessions running in test mode.
    #[must_use]
    pub fn test_engine(&self) -> Option<&InMemoryEngine> {
        self.test_engine.as_deref()
    }

    /// Issues one native call through the adapter.
    pub(crate) async fn call<T, F>(&self, entry_point: &str, issue: F) -> VcxKitResult<T>
    where
        T: FromFields,
        F: FnOnce(&dyn NativeEngine, CommandHandle, NativeCallback) -> NativeCode,
    {
        let engine = self.engine.as_ref();
        self.adapter
            .call(engine, entry_point, |command, callback| {
                issue(engine, command, callback)
            })
            .await
    }

    /// Builds the error for a synchronous native status.
    pub(crate) fn immediate_error(&self, entry_point: &str, code: NativeCode) -> VcxKitError {
        native_error(self.engine(), entry_point, code, CallPhase::Immediate)
    }

    /// Hands the configuration to the engine.
    ///
    /// # Errors
    /// Any engine error, classified by phase.
    pub async fn init(&self) -> VcxKitResult<()> {
        let config = self.config.to_native_json();
        self.call("vcx_init_with_config", |engine, command, callback| {
            engine.init(command, &config, callback)
        })
        .await
    }

    /// The engine's version string.
    #[must_use]
    pub fn version(&self) -> String {
        self.engine.version()
    }

    /// The engine's description of a code.
    #[must_use]
    pub fn error_message(&self, code: u32) -> Option<String> {
        self.engine.error_message(NativeCode(code))
    }

    /// Invalidates every handle handed out so far, then shuts the engine down.
    ///
    /// # Errors
    /// The engine's shutdown status, when non-zero. Handles are invalid either way.
    pub fn shutdown(&self, delete_wallet: bool) -> VcxKitResult<()> {
        let generation = self.registry.invalidate_all();
        log::info!("vcxkit session shutting down, handle generation is now {generation}");
        let status = self.engine.shutdown(delete_wallet);
        if status.is_success() {
            Ok(())
        } else {
            Err(self.immediate_error("vcx_shutdown", status))
        }
    }

    /// Updates the agency status of the messages listed in `pairwise_uids`
    /// (`[{"pairwiseDID": .., "uids": [..]}]`).
    ///
    /// # Errors
    /// Any engine error, classified by phase.
    pub async fn update_messages(
        &self,
        status: &MessageStatus,
        pairwise_uids: &str,
    ) -> VcxKitResult<()> {
        self.call("vcx_messages_update_status", |engine, command, callback| {
            engine.update_messages(command, status.as_str(), pairwise_uids, callback)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_status_is_opaque() {
        assert_eq!(MessageStatus::REVIEWED.as_str(), "MS-106");
        assert_eq!(MessageStatus::from("MS-999").to_string(), "MS-999");
    }

    #[cfg(not(feature = "libvcx"))]
    #[test]
    fn test_requires_engine_outside_test_mode() {
        let error = Session::from_config_json("{}").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
        assert_eq!(error.code(), NativeCode::INVALID_CONFIGURATION.0);
    }

    #[tokio::test]
    async fn test_init_and_version_in_test_mode() {
        let session = Session::from_config_json(r#"{"enable_test_mode":"true"}"#).unwrap();
        session.init().await.unwrap();
        assert!(!session.version().is_empty());
        assert!(session.test_engine().is_some());
        session.shutdown(false).unwrap();
    }
}
