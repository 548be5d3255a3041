//! The lifecycle shared by every protocol object.
//!
//! A [`ProtocolObject`] is a thin local value: the session it lives in, the caller's
//! source id and the handle the engine returned. State is never cached; every query
//! goes to the engine. The last state seen is kept only to flag transitions the
//! descriptor does not list.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use serde_json::Value;

use crate::{
    adapter::{Created, FromFields},
    code::NativeCode,
    error::ErrorKind,
    handle::Handle,
    native::{Action, ActionKind, CreateInput},
    protocol::{connection::ConnectionProtocol, Protocol, ProtocolState},
    session::Session,
    VcxKitError, VcxKitResult,
};

/// A protocol object of family `P`.
pub struct ProtocolObject<P: Protocol> {
    session: Arc<Session>,
    source_id: String,
    handle: Option<Handle<P>>,
    last_seen: Mutex<Option<P::State>>,
}

impl<P: Protocol> fmt::Debug for ProtocolObject<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolObject")
            .field("kind", &P::KIND)
            .field("source_id", &self.source_id)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

fn entry_point<P: Protocol>(op: &str) -> String {
    format!("vcx_{}_{op}", P::KIND)
}

impl<P: Protocol> ProtocolObject<P> {
    fn with_handle(session: Arc<Session>, source_id: String, handle: Handle<P>) -> Self {
        Self {
            session,
            source_id,
            handle: Some(handle),
            last_seen: Mutex::new(None),
        }
    }

    /// An object that was never constructed. Every handle operation on it fails with
    /// the family's invalid-handle error.
    #[must_use]
    pub fn detached(session: Arc<Session>, source_id: impl Into<String>) -> Self {
        Self {
            session,
            source_id: source_id.into(),
            handle: None,
            last_seen: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    #[must_use]
    pub const fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The handle as last returned by the engine, without checking it is still live.
    #[must_use]
    pub const fn handle(&self) -> Option<Handle<P>> {
        self.handle
    }

    /// The raw handle, after checking it is still live.
    ///
    /// # Errors
    /// The family's invalid-handle error when the object was never constructed, has
    /// been released, or belongs to a session that was shut down.
    pub fn live_handle(&self) -> VcxKitResult<u32> {
        self.session
            .registry()
            .validate(self.handle.as_ref())
            .map(|handle| handle.raw())
    }

    /// Registers a freshly constructed engine object. When the registry refuses it the
    /// engine object is released so it does not leak.
    fn register(
        session: Arc<Session>,
        source_id: String,
        raw: u32,
        generation: u64,
    ) -> VcxKitResult<Self> {
        match session.registry().register_in::<P>(raw, generation) {
            Ok(handle) => Ok(Self::with_handle(session, source_id, handle)),
            Err(error) => {
                if raw != 0 {
                    let status = session.engine().release(P::KIND, raw);
                    if !status.is_success() {
                        log::warn!(
                            "{}: releasing unregistered handle {raw} failed with {status}",
                            P::KIND
                        );
                    }
                }
                Err(error)
            }
        }
    }

    /// Constructs an object from a type-specific payload. Returns the object and the
    /// optional second payload the engine delivered with the handle.
    ///
    /// # Errors
    /// - `input` belongs to another family;
    /// - the engine rejects the input (missing source id or malformed payload).
    pub async fn create_with_payload(
        session: Arc<Session>,
        source_id: Option<&str>,
        input: CreateInput,
    ) -> VcxKitResult<(Self, Option<String>)> {
        if input.kind() != P::KIND {
            return Err(VcxKitError::new(
                ErrorKind::InvalidInput,
                NativeCode::INVALID_OPTION,
                format!("cannot create a {} from a {} payload", P::KIND, input.kind()),
            ));
        }

        let generation = session.registry().generation();
        let created: Created = session
            .call(&entry_point::<P>("create"), |engine, command, callback| {
                engine.create(command, source_id, &input, callback)
            })
            .await?;
        let object = Self::register(
            Arc::clone(&session),
            source_id.unwrap_or_default().to_owned(),
            created.handle,
            generation,
        )?;
        Ok((object, created.payload))
    }

    /// Constructs an object from a type-specific payload.
    ///
    /// # Errors
    /// See [`Self::create_with_payload`].
    pub async fn from_input(
        session: Arc<Session>,
        source_id: Option<&str>,
        input: CreateInput,
    ) -> VcxKitResult<Self> {
        Self::create_with_payload(session, source_id, input)
            .await
            .map(|(object, _)| object)
    }

    /// Constructs an object from a message waiting on `connection`, fetched by id.
    /// Returns the object and the message payload.
    ///
    /// Without any connection the call fails as an unknown error; with a connection that
    /// was never constructed it fails as an invalid connection handle. The two cases
    /// mirror what the engine itself reports for them.
    ///
    /// # Errors
    /// As above, or when the engine cannot find the message.
    pub async fn create_from_message_id(
        session: Arc<Session>,
        source_id: Option<&str>,
        connection: Option<&ProtocolObject<ConnectionProtocol>>,
        message_id: Option<&str>,
    ) -> VcxKitResult<(Self, String)> {
        let connection = match connection {
            Some(connection) => connection.live_handle()?,
            None => {
                return Err(VcxKitError::new(
                    ErrorKind::Unknown,
                    NativeCode::UNKNOWN_ERROR,
                    format!("{}: no connection to read message from", P::KIND),
                ))
            }
        };

        let generation = session.registry().generation();
        let created: Created = session
            .call(
                &entry_point::<P>("create_with_msgid"),
                |engine, command, callback| {
                    engine.create_from_message_id(
                        command, P::KIND, source_id, connection, message_id, callback,
                    )
                },
            )
            .await?;
        let Some(payload) = created.payload else {
            let status = session.engine().release(P::KIND, created.handle);
            log::warn!("{}: message payload missing, released handle: {status}", P::KIND);
            return Err(VcxKitError::unknown("engine returned no message payload"));
        };
        let object = Self::register(
            Arc::clone(&session),
            source_id.unwrap_or_default().to_owned(),
            created.handle,
            generation,
        )?;
        Ok((object, payload))
    }

    /// Reconstructs an object from a snapshot produced by [`Self::serialize`]. Nothing
    /// is registered unless the engine accepts the snapshot.
    ///
    /// # Errors
    /// [`ErrorKind::InvalidJson`] when the snapshot does not have the family's shape.
    pub async fn deserialize(session: Arc<Session>, snapshot: &str) -> VcxKitResult<Self> {
        let generation = session.registry().generation();
        let raw: u32 = session
            .call(&entry_point::<P>("deserialize"), |engine, command, callback| {
                engine.deserialize(command, P::KIND, snapshot, callback)
            })
            .await?;
        let source_id = serde_json::from_str::<Value>(snapshot)
            .ok()
            .and_then(|value| value["data"]["source_id"].as_str().map(str::to_owned))
            .unwrap_or_default();
        Self::register(session, source_id, raw, generation)
    }

    /// [`Self::deserialize`] for an already parsed snapshot.
    ///
    /// # Errors
    /// See [`Self::deserialize`].
    pub async fn deserialize_json(session: Arc<Session>, snapshot: &Value) -> VcxKitResult<Self> {
        Self::deserialize(session, &snapshot.to_string()).await
    }

    /// The current state, fetched from the engine.
    ///
    /// # Errors
    /// The family's invalid-handle error, or any engine error.
    pub async fn get_state(&self) -> VcxKitResult<P::State> {
        let handle = self.live_handle()?;
        let ordinal: u32 = self
            .session
            .call(&entry_point::<P>("get_state"), |engine, command, callback| {
                engine.get_state(command, P::KIND, handle, callback)
            })
            .await?;
        self.decode(ordinal)
    }

    /// Polls for new messages, applies the first applicable one and returns the
    /// resulting state. Without pending messages the state is unchanged.
    ///
    /// # Errors
    /// The family's invalid-handle error, or any engine error.
    pub async fn update_state(&self) -> VcxKitResult<P::State> {
        self.advance(None).await
    }

    /// Applies `message` instead of polling.
    ///
    /// # Errors
    /// See [`Self::update_state`].
    pub async fn update_state_with_message(&self, message: &str) -> VcxKitResult<P::State> {
        self.advance(Some(message)).await
    }

    async fn advance(&self, message: Option<&str>) -> VcxKitResult<P::State> {
        let handle = self.live_handle()?;
        let op = if message.is_some() {
            "update_state_with_message"
        } else {
            "update_state"
        };
        let ordinal: u32 = self
            .session
            .call(&entry_point::<P>(op), |engine, command, callback| {
                engine.update_state(command, P::KIND, handle, message, callback)
            })
            .await?;
        self.decode(ordinal)
    }

    /// The snapshot, exactly as the engine produced it.
    ///
    /// # Errors
    /// The family's invalid-handle error, or any engine error.
    pub async fn serialize(&self) -> VcxKitResult<String> {
        let handle = self.live_handle()?;
        self.session
            .call(&entry_point::<P>("serialize"), |engine, command, callback| {
                engine.serialize(command, P::KIND, handle, callback)
            })
            .await
    }

    /// The snapshot, parsed.
    ///
    /// # Errors
    /// See [`Self::serialize`].
    pub async fn serialize_json(&self) -> VcxKitResult<Value> {
        let snapshot = self.serialize().await?;
        serde_json::from_str(&snapshot).map_err(|error| {
            VcxKitError::new(
                ErrorKind::InvalidJson,
                NativeCode::SERIALIZATION_ERROR,
                format!("{}: engine produced an unreadable snapshot: {error}", P::KIND),
            )
        })
    }

    /// Releases the handle. A second release fails with the invalid-handle error and
    /// is not forwarded to the engine.
    ///
    /// # Errors
    /// The family's invalid-handle error, or the engine's release status. The handle is
    /// unusable afterwards either way.
    pub fn release(&self) -> VcxKitResult<()> {
        let handle = self.session.registry().validate(self.handle.as_ref())?;
        self.session.registry().release(&handle)?;
        let status = self.session.engine().release(P::KIND, handle.raw());
        if status.is_success() {
            Ok(())
        } else {
            Err(self
                .session
                .immediate_error(&entry_point::<P>("release"), status))
        }
    }

    /// The problem report, or `None` when the object never failed.
    ///
    /// # Errors
    /// The family's invalid-handle error, or any engine error.
    pub async fn get_problem_report(&self) -> VcxKitResult<Option<Value>> {
        let handle = self.live_handle()?;
        let report: Option<String> = self
            .session
            .call(
                &entry_point::<P>("get_problem_report"),
                |engine, command, callback| {
                    engine.get_problem_report(command, P::KIND, handle, callback)
                },
            )
            .await?;
        report
            .map(|report| serde_json::from_str(&report).map_err(VcxKitError::from))
            .transpose()
    }

    /// Fails with `ActionNotSupported` unless the configured communication method
    /// supports `action`. Callers that validate arguments run this first.
    pub(crate) fn ensure_supported(&self, action: ActionKind) -> VcxKitResult<()> {
        let method = self.session.communication_method();
        if P::supports(method, action) {
            return Ok(());
        }
        Err(VcxKitError::new(
            ErrorKind::ActionNotSupported,
            NativeCode::ACTION_NOT_SUPPORTED,
            format!(
                "{}: {action} is not supported with the {method} communication method",
                P::KIND
            ),
        ))
    }

    /// Performs a type-specific action after checking the configured communication
    /// method supports it.
    pub(crate) async fn perform<T: FromFields>(&self, action: Action) -> VcxKitResult<T> {
        self.ensure_supported(action.kind())?;
        let handle = self.live_handle()?;
        let op: &'static str = action.kind().into();
        self.session
            .call(&entry_point::<P>(op), |engine, command, callback| {
                engine.perform(command, P::KIND, handle, &action, callback)
            })
            .await
    }

    /// The JSON list of pending offers or requests on `connection`.
    pub(crate) async fn list_pending(
        session: &Session,
        op: &str,
        connection: &ProtocolObject<ConnectionProtocol>,
    ) -> VcxKitResult<String> {
        let connection = connection.live_handle()?;
        session
            .call(&entry_point::<P>(op), |engine, command, callback| {
                engine.list_pending(command, P::KIND, connection, callback)
            })
            .await
    }

    fn decode(&self, ordinal: u32) -> VcxKitResult<P::State> {
        let state = P::decode_state(ordinal)?;
        self.observe(state);
        Ok(state)
    }

    fn observe(&self, state: P::State) {
        let mut last_seen = self
            .last_seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = *last_seen {
            if !P::can_transition(previous, state) {
                log::warn!(
                    "{} {}: engine moved from {previous} ({}) to {state} ({}), which is not a listed transition",
                    P::KIND,
                    self.source_id,
                    previous.ordinal(),
                    state.ordinal()
                );
            }
        }
        *last_seen = Some(state);
    }
}
