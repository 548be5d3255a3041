use std::sync::Arc;

use vcxkit_core::{ErrorKind, MessageStatus, NativeCode, Session, VcxKitError};

use crate::Connection;

/// A running VCX engine. Every object is created against one.
#[derive(Debug, uniffi::Object)]
pub struct VcxSession(Arc<Session>);

impl VcxSession {
    pub(crate) fn core(&self) -> Arc<Session> {
        Arc::clone(&self.0)
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl VcxSession {
    /// Builds a session from a JSON configuration and initializes the engine.
    ///
    /// With `"enable_test_mode": "true"` the session runs on the in-memory engine.
    ///
    /// # Errors
    /// Malformed configuration, or any engine error during initialization.
    #[uniffi::constructor]
    pub async fn init(config: &str) -> Result<Self, VcxKitError> {
        let session = Session::from_config_json(config)?;
        session.init().await?;
        log::info!("vcxkit session ready, engine {}", session.version());
        Ok(Self(Arc::new(session)))
    }

    #[must_use]
    pub fn version(&self) -> String {
        self.0.version()
    }

    #[must_use]
    pub fn communication_method(&self) -> vcxkit_core::CommunicationMethod {
        self.0.communication_method()
    }

    /// The engine's description of `code`.
    #[must_use]
    pub fn error_message(&self, code: u32) -> Option<String> {
        self.0.error_message(code)
    }

    /// Invalidates every object created so far and shuts the engine down.
    ///
    /// # Errors
    /// The engine's shutdown status.
    pub fn shutdown(&self, delete_wallet: bool) -> Result<(), VcxKitError> {
        self.0.shutdown(delete_wallet)
    }

    /// Sets the agency status (`MS-101` to `MS-106`) of the listed messages.
    ///
    /// # Errors
    /// Any engine error.
    pub async fn update_messages(
        &self,
        status: &str,
        pairwise_uids: &str,
    ) -> Result<(), VcxKitError> {
        self.0
            .update_messages(&MessageStatus::from(status), pairwise_uids)
            .await
    }

    /// Queues an inbound protocol message on `connection`. Only available in test mode.
    ///
    /// # Errors
    /// `ActionNotSupported` outside test mode, an invalid connection, or a message
    /// that is not JSON.
    pub fn deliver_message(
        &self,
        connection: &Connection,
        message: &str,
    ) -> Result<bool, VcxKitError> {
        let engine = self.0.test_engine().ok_or_else(|| {
            VcxKitError::new(
                ErrorKind::ActionNotSupported,
                NativeCode::ACTION_NOT_SUPPORTED,
                "messages can only be delivered in test mode",
            )
        })?;
        let raw = connection.0.live_handle()?;
        let message = serde_json::from_str(message)?;
        Ok(engine.deliver_message(raw, message))
    }
}
