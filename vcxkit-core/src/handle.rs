//! Handle registry.
//!
//! The engine owns the objects; the registry owns the binding's view of which handles
//! may be used. A handle is live from the moment a constructor resolves until it is
//! released or the session shuts down. Every handle carries the generation it was
//! registered under, so a shutdown invalidates all outstanding handles at once without
//! touching them.

use std::{
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};

use crate::{code::NativeCode, error::ErrorKind, native::ObjectKind, VcxKitError, VcxKitResult};

/// What a registry slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Object(ObjectKind),
    WalletSearch,
}

impl SlotKind {
    /// The code used when a handle of this kind is unusable.
    #[must_use]
    pub const fn invalid_handle_code(self) -> NativeCode {
        match self {
            Self::Object(kind) => kind.invalid_handle_code(),
            Self::WalletSearch => NativeCode::INVALID_WALLET_HANDLE,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Object(kind) => kind.into(),
            Self::WalletSearch => "wallet_search",
        }
    }
}

/// Marker for the types a [`Handle`] can refer to.
pub trait HandleKind: 'static {
    const SLOT: SlotKind;
}

/// A live, typed handle. Only the registry creates these.
pub struct Handle<K> {
    raw: u32,
    generation: u64,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Handle<K> {
    /// The integer the engine knows the object by.
    #[must_use]
    pub const fn raw(&self) -> u32 {
        self.raw
    }

    /// The registry generation this handle belongs to.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.generation == other.generation
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
        self.generation.hash(state);
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", K::SLOT.label(), self.raw, self.generation)
    }
}

/// Live handles, keyed by kind since the engine numbers each kind independently. The
/// value is the generation the handle was registered under.
type Slots = HashMap<(SlotKind, u32), u64>;

/// Process-wide record of live handles.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    generation: AtomicU64,
    slots: Mutex<Slots>,
}

fn invalid<K: HandleKind>(message: impl Into<String>) -> VcxKitError {
    VcxKitError::new(
        ErrorKind::InvalidHandle,
        K::SLOT.invalid_handle_code(),
        format!("{}: {}", K::SLOT.label(), message.into()),
    )
}

impl HandleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Number of live handles.
    #[must_use]
    pub fn live(&self) -> usize {
        self.slots().len()
    }

    /// Records a handle returned by a successful constructor.
    ///
    /// # Errors
    /// - `raw` is zero, which the engine never returns for a live object;
    /// - `raw` is already live, which would let two objects share one handle.
    pub fn register<K: HandleKind>(&self, raw: u32) -> VcxKitResult<Handle<K>> {
        self.register_in(raw, self.generation())
    }

    /// Records a handle whose constructor was issued under `generation`. A shutdown
    /// in between means the engine object outlived its session, so it is refused.
    ///
    /// # Errors
    /// Same as [`Self::register`], plus [`ErrorKind::InvalidHandle`] when the
    /// generation moved on while the constructor was running.
    pub fn register_in<K: HandleKind>(
        &self,
        raw: u32,
        generation: u64,
    ) -> VcxKitResult<Handle<K>> {
        if raw == 0 {
            return Err(invalid::<K>("engine returned a null handle"));
        }

        let mut slots = self.slots();
        if generation != self.generation() {
            return Err(invalid::<K>(format!(
                "session shut down while handle {raw} was being created"
            )));
        }
        if slots.contains_key(&(K::SLOT, raw)) {
            return Err(VcxKitError::new(
                ErrorKind::Unknown,
                NativeCode::OBJECT_CACHE_ERROR,
                format!("{} handle {raw} is already live", K::SLOT.label()),
            ));
        }
        slots.insert((K::SLOT, raw), generation);
        log::debug!("registered {} handle {raw}", K::SLOT.label());
        Ok(Handle {
            raw,
            generation,
            _kind: PhantomData,
        })
    }

    /// Confirms a handle may be forwarded to the engine.
    ///
    /// # Errors
    /// Returns [`ErrorKind::InvalidHandle`] with the kind's own code when the handle is
    /// absent, from an earlier generation, or no longer live.
    pub fn validate<K: HandleKind>(&self, handle: Option<&Handle<K>>) -> VcxKitResult<Handle<K>> {
        let handle = handle.ok_or_else(|| invalid::<K>("handle was never initialized"))?;
        if handle.generation != self.generation() {
            return Err(invalid::<K>(format!(
                "handle {} belongs to a session that was shut down",
                handle.raw
            )));
        }
        match self.slots().get(&(K::SLOT, handle.raw)) {
            Some(generation) if *generation == handle.generation => Ok(*handle),
            _ => Err(invalid::<K>(format!("handle {} is not live", handle.raw))),
        }
    }

    /// Marks a handle as released.
    ///
    /// # Errors
    /// Same as [`Self::validate`]. Releasing twice fails the second time and leaves the
    /// registry untouched.
    pub fn release<K: HandleKind>(&self, handle: &Handle<K>) -> VcxKitResult<()> {
        let mut slots = self.slots();
        match slots.get(&(K::SLOT, handle.raw)) {
            Some(generation)
                if *generation == handle.generation && *generation == self.generation() =>
            {
                slots.remove(&(K::SLOT, handle.raw));
                log::debug!("released {} handle {}", K::SLOT.label(), handle.raw);
                Ok(())
            }
            _ => Err(invalid::<K>(format!("handle {} is not live", handle.raw))),
        }
    }

    /// Invalidates every outstanding handle and starts a new generation.
    pub fn invalidate_all(&self) -> u64 {
        let mut slots = self.slots();
        let dropped = slots.len();
        slots.clear();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("handle generation {generation} started, {dropped} handles invalidated");
        generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Conn;
    impl HandleKind for Conn {
        const SLOT: SlotKind = SlotKind::Object(ObjectKind::Connection);
    }

    struct Cred;
    impl HandleKind for Cred {
        const SLOT: SlotKind = SlotKind::Object(ObjectKind::Credential);
    }

    #[test]
    fn test_register_refuses_handle_from_before_shutdown() {
        let registry = HandleRegistry::new();
        let issued_under = registry.generation();
        registry.invalidate_all();

        let error = registry.register_in::<Conn>(11, issued_under).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidHandle);
        assert_eq!(error.code(), 1003);
        assert_eq!(registry.live(), 0);
        assert!(registry.register_in::<Conn>(11, registry.generation()).is_ok());
    }

    #[test]
    fn test_null_handle_is_invalid() {
        let registry = HandleRegistry::new();
        let error = registry.validate::<Conn>(None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidHandle);
        assert_eq!(error.code(), 1003);

        let error = registry.register::<Cred>(0).unwrap_err();
        assert_eq!(error.code(), 1053);
    }

    #[test]
    fn test_release_is_idempotent() {
        let registry = HandleRegistry::new();
        let handle = registry.register::<Conn>(42).unwrap();
        assert!(registry.validate(Some(&handle)).is_ok());

        registry.release(&handle).unwrap();
        let error = registry.release(&handle).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidHandle);
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn test_duplicate_live_handle_is_rejected() {
        let registry = HandleRegistry::new();
        registry.register::<Conn>(7).unwrap();
        let error = registry.register::<Conn>(7).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unknown);
        assert_eq!(error.code(), NativeCode::OBJECT_CACHE_ERROR.0);
    }

    #[test]
    fn test_handle_kind_is_checked() {
        let registry = HandleRegistry::new();
        let handle = registry.register::<Conn>(9).unwrap();
        let forged: Handle<Cred> = Handle {
            raw: handle.raw(),
            generation: handle.generation(),
            _kind: PhantomData,
        };
        assert!(registry.validate(Some(&forged)).is_err());

        // Kinds are numbered independently by the engine.
        assert!(registry.register::<Cred>(9).is_ok());
    }

    #[test]
    fn test_invalidate_all_makes_handles_stale() {
        let registry = HandleRegistry::new();
        let handle = registry.register::<Conn>(5).unwrap();
        registry.invalidate_all();

        let error = registry.validate(Some(&handle)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidHandle);

        // The raw value may come back from the engine in the new generation.
        let again = registry.register::<Conn>(5).unwrap();
        assert_ne!(again, handle);
        assert!(registry.validate(Some(&handle)).is_err());
        assert!(registry.validate(Some(&again)).is_ok());
    }
}
