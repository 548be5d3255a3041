//! Turns callback-style native calls into futures.
//!
//! One [`NativeCallback`] is shared by every call issued through an adapter. Each call
//! registers a `oneshot` sender under a fresh [`CommandHandle`]; the callback removes
//! the sender for the token it receives and completes it. A token is therefore settled
//! at most once: a repeated or unknown invocation finds nothing to complete, is logged
//! and counted, and otherwise ignored.
//!
//! The adapter applies no timeout and no retry. A caller racing a call against a timer
//! simply drops the future; the pending entry is removed and the late callback is
//! ignored like any other stray invocation.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use tokio::sync::oneshot;

use crate::{
    code::NativeCode,
    error::CallPhase,
    native::{CommandHandle, NativeCallback, NativeEngine, NativeValue},
    VcxKitError, VcxKitResult,
};

type Pending = Arc<Mutex<HashMap<CommandHandle, oneshot::Sender<Completion>>>>;

/// What a completion callback delivered.
#[derive(Debug)]
struct Completion {
    code: NativeCode,
    fields: Vec<NativeValue>,
}

/// Decodes the result fields of a successful completion.
pub trait FromFields: Sized {
    /// # Errors
    /// Returns an [`crate::ErrorKind::Unknown`] error when the fields do not have the
    /// expected shape.
    fn from_fields(fields: Vec<NativeValue>) -> VcxKitResult<Self>;
}

fn unexpected(fields: &[NativeValue]) -> VcxKitError {
    VcxKitError::unknown(format!("unexpected callback payload: {fields:?}"))
}

impl FromFields for () {
    fn from_fields(_fields: Vec<NativeValue>) -> VcxKitResult<Self> {
        Ok(())
    }
}

impl FromFields for u32 {
    fn from_fields(fields: Vec<NativeValue>) -> VcxKitResult<Self> {
        fields
            .first()
            .and_then(NativeValue::as_u32)
            .ok_or_else(|| unexpected(&fields))
    }
}

impl FromFields for Option<String> {
    fn from_fields(fields: Vec<NativeValue>) -> VcxKitResult<Self> {
        match fields.into_iter().next() {
            Some(NativeValue::Str(value)) => Ok(Some(value)),
            Some(NativeValue::Null) | None => Ok(None),
            Some(other) => Err(unexpected(&[other])),
        }
    }
}

impl FromFields for String {
    fn from_fields(fields: Vec<NativeValue>) -> VcxKitResult<Self> {
        match fields.into_iter().next() {
            Some(NativeValue::Str(value)) => Ok(value),
            other => Err(unexpected(other.as_slice())),
        }
    }
}

impl FromFields for (u32, Option<String>) {
    fn from_fields(fields: Vec<NativeValue>) -> VcxKitResult<Self> {
        let first = fields
            .first()
            .and_then(NativeValue::as_u32)
            .ok_or_else(|| unexpected(&fields))?;
        let second = Option::<String>::from_fields(fields.into_iter().skip(1).collect())?;
        Ok((first, second))
    }
}

/// A handle produced by a constructor, with the optional payload some constructors
/// deliver alongside it (the triggering message, or an endorser transaction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub handle: u32,
    pub payload: Option<String>,
}

impl FromFields for Created {
    fn from_fields(fields: Vec<NativeValue>) -> VcxKitResult<Self> {
        let (handle, payload) = <(u32, Option<String>)>::from_fields(fields)?;
        Ok(Self { handle, payload })
    }
}

/// Removes the pending entry when the awaiting future goes away before completion.
struct PendingGuard<'a> {
    pending: &'a Pending,
    token: CommandHandle,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.pending).remove(&self.token);
        }
    }
}

fn lock(pending: &Pending) -> MutexGuard<'_, HashMap<CommandHandle, oneshot::Sender<Completion>>> {
    pending
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Issues native calls and awaits their completion callbacks.
pub struct AsyncCallAdapter {
    next_token: AtomicU32,
    pending: Pending,
    stray: Arc<AtomicU64>,
    callback: NativeCallback,
}

impl std::fmt::Debug for AsyncCallAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncCallAdapter")
            .field("in_flight", &self.in_flight())
            .field("stray_callbacks", &self.stray_callbacks())
            .finish_non_exhaustive()
    }
}

impl Default for AsyncCallAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncCallAdapter {
    #[must_use]
    pub fn new() -> Self {
        let pending: Pending = Arc::default();
        let stray = Arc::new(AtomicU64::new(0));

        let callback: NativeCallback = {
            let pending = Arc::clone(&pending);
            let stray = Arc::clone(&stray);
            Arc::new(move |token, code, fields| {
                let sender = lock(&pending).remove(&token);
                match sender {
                    Some(sender) => {
                        if sender.send(Completion { code, fields }).is_err() {
                            log::debug!("completion for command {token} arrived after its caller left");
                        }
                    }
                    None => {
                        stray.fetch_add(1, Ordering::Relaxed);
                        log::warn!(
                            "ignoring callback for command {token} with status {code}: no call is waiting on it"
                        );
                    }
                }
            })
        };

        Self {
            next_token: AtomicU32::new(1),
            pending,
            stray,
            callback,
        }
    }

    /// Number of callbacks that arrived for a token nobody was waiting on.
    #[must_use]
    pub fn stray_callbacks(&self) -> u64 {
        self.stray.load(Ordering::Relaxed)
    }

    /// Number of calls currently waiting on their callback.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Picks a token that is non-zero and not already waiting.
    fn register(&self, sender: oneshot::Sender<Completion>) -> CommandHandle {
        let mut pending = lock(&self.pending);
        loop {
            let token = self.next_token.fetch_add(1, Ordering::Relaxed);
            if token != 0 && !pending.contains_key(&token) {
                pending.insert(token, sender);
                return token;
            }
        }
    }

    /// Issues one native call and waits for its completion.
    ///
    /// `issue` receives the correlation token and the callback to pass to the engine
    /// and returns the immediate status. `entry_point` names the call in errors and logs.
    ///
    /// # Errors
    /// - the immediate status is non-zero, classified with [`CallPhase::Immediate`];
    /// - the callback reports a non-zero code, classified with [`CallPhase::Callback`];
    /// - the result fields cannot be decoded as `T`.
    pub async fn call<T, F>(
        &self,
        engine: &dyn NativeEngine,
        entry_point: &str,
        issue: F,
    ) -> VcxKitResult<T>
    where
        T: FromFields,
        F: FnOnce(CommandHandle, NativeCallback) -> NativeCode,
    {
        let (sender, receiver) = oneshot::channel();
        let token = self.register(sender);
        let mut guard = PendingGuard {
            pending: &self.pending,
            token,
            armed: true,
        };

        log::debug!("{entry_point}: issuing command {token}");
        let status = issue(token, Arc::clone(&self.callback));
        if !status.is_success() {
            drop(guard);
            return Err(native_error(engine, entry_point, status, CallPhase::Immediate));
        }

        let completion = receiver.await.map_err(|_| {
            VcxKitError::unknown(format!("{entry_point}: completion callback was dropped"))
        })?;
        guard.armed = false;

        if !completion.code.is_success() {
            return Err(native_error(
                engine,
                entry_point,
                completion.code,
                CallPhase::Callback,
            ));
        }
        T::from_fields(completion.fields)
    }
}

/// Builds the error for a failed native call, appending the engine's own detail text.
pub(crate) fn native_error(
    engine: &dyn NativeEngine,
    entry_point: &str,
    code: NativeCode,
    phase: CallPhase,
) -> VcxKitError {
    let detail = engine
        .error_message(code)
        .or_else(|| code.name().map(str::to_owned))
        .unwrap_or_else(|| String::from("unrecognised native error"));
    log::debug!("{entry_point}: failed with {code} ({phase:?}): {detail}");
    VcxKitError::from_native(code, phase, format!("{entry_point}: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{native::memory::InMemoryEngine, CommunicationMethod, ErrorKind};

    fn engine() -> InMemoryEngine {
        InMemoryEngine::new(CommunicationMethod::Proprietary)
    }

    #[tokio::test]
    async fn test_resolves_with_callback_fields() {
        let adapter = AsyncCallAdapter::new();
        let value: u32 = adapter
            .call(&engine(), "test_call", |token, callback| {
                std::thread::spawn(move || {
                    callback(token, NativeCode::SUCCESS, vec![NativeValue::U32(7)]);
                });
                NativeCode::SUCCESS
            })
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(adapter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_immediate_rejection_does_not_wait() {
        let adapter = AsyncCallAdapter::new();
        let error = adapter
            .call::<(), _>(&engine(), "test_call", |_, _| NativeCode::POST_MESSAGE_FAILURE)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NativeRejected);
        assert_eq!(error.code(), 1010);
        assert!(error.message().starts_with("test_call: "));
        assert_eq!(adapter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_callback_error_is_classified() {
        let adapter = AsyncCallAdapter::new();
        let error = adapter
            .call::<(), _>(&engine(), "test_call", |token, callback| {
                callback(token, NativeCode::POST_MESSAGE_FAILURE, Vec::new());
                NativeCode::SUCCESS
            })
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::CallbackError);
    }

    #[tokio::test]
    async fn test_second_callback_is_ignored() {
        let adapter = AsyncCallAdapter::new();
        let value: String = adapter
            .call(&engine(), "test_call", |token, callback| {
                callback(token, NativeCode::SUCCESS, vec![NativeValue::Str("first".into())]);
                callback(token, NativeCode::SUCCESS, vec![NativeValue::Str("second".into())]);
                NativeCode::SUCCESS
            })
            .await
            .unwrap();
        assert_eq!(value, "first");
        assert_eq!(adapter.stray_callbacks(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_call_ignores_late_callback() {
        let adapter = AsyncCallAdapter::new();
        let (late_tx, late_rx) = std::sync::mpsc::channel::<(CommandHandle, NativeCallback)>();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            adapter.call::<(), _>(&engine(), "test_call", |token, callback| {
                late_tx.send((token, callback)).unwrap();
                NativeCode::SUCCESS
            }),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(adapter.in_flight(), 0);

        let (token, callback) = late_rx.recv().unwrap();
        callback(token, NativeCode::SUCCESS, Vec::new());
        assert_eq!(adapter.stray_callbacks(), 1);
    }

    #[test]
    fn test_decode_handle_with_payload() {
        let created = Created::from_fields(vec![
            NativeValue::U32(12),
            NativeValue::Str("{}".into()),
        ])
        .unwrap();
        assert_eq!(created.handle, 12);
        assert_eq!(created.payload.as_deref(), Some("{}"));

        let error = u32::from_fields(vec![NativeValue::Null]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unknown);
    }
}
