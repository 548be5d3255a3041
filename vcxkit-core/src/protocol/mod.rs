//! Protocol descriptors.
//!
//! Each protocol object family is described by a [`Protocol`] implementation: its state
//! enumeration, the initial state, the transitions the engine may perform and the
//! actions available under each [`CommunicationMethod`]. The generic lifecycle in
//! [`crate::lifecycle`] is instantiated once per descriptor.

use std::fmt::{Debug, Display};

use crate::{
    code::NativeCode,
    config::CommunicationMethod,
    error::ErrorKind,
    handle::HandleKind,
    native::{ActionKind, ObjectKind},
    VcxKitError, VcxKitResult,
};

pub mod connection;
pub mod credential;
pub mod credential_def;
pub mod disclosed_proof;
pub mod verifier;

/// A closed state enumeration backed by the engine's ordinals.
pub trait ProtocolState: Copy + Eq + Debug + Display + Send + Sync + 'static {
    fn ordinal(self) -> u32;

    fn from_ordinal(ordinal: u32) -> Option<Self>;
}

macro_rules! protocol_state {
    ($state:ty) => {
        impl $crate::protocol::ProtocolState for $state {
            fn ordinal(self) -> u32 {
                self as u32
            }

            fn from_ordinal(ordinal: u32) -> Option<Self> {
                Self::from_repr(ordinal)
            }
        }
    };
}
pub(crate) use protocol_state;

/// Describes one protocol object family.
pub trait Protocol: HandleKind + Send + Sync {
    const KIND: ObjectKind;

    type State: ProtocolState;

    /// The state a freshly constructed object is in.
    const INITIAL: Self::State;

    /// Every transition the engine may perform, as `(from, to)` pairs.
    const TRANSITIONS: &'static [(Self::State, Self::State)];

    /// Actions available under `method`.
    fn supported_actions(method: CommunicationMethod) -> &'static [ActionKind];

    #[must_use]
    fn supports(method: CommunicationMethod, action: ActionKind) -> bool {
        Self::supported_actions(method).contains(&action)
    }

    /// Staying put is always allowed.
    #[must_use]
    fn can_transition(from: Self::State, to: Self::State) -> bool {
        from == to || Self::TRANSITIONS.contains(&(from, to))
    }

    /// A state with no outgoing transition.
    #[must_use]
    fn is_terminal(state: Self::State) -> bool {
        !Self::TRANSITIONS.iter().any(|(from, _)| *from == state)
    }

    /// Decodes a state ordinal reported by the engine.
    ///
    /// # Errors
    /// An ordinal outside the enumeration is an [`ErrorKind::Unknown`] error.
    fn decode_state(ordinal: u32) -> VcxKitResult<Self::State> {
        Self::State::from_ordinal(ordinal).ok_or_else(|| {
            VcxKitError::new(
                ErrorKind::Unknown,
                NativeCode::UNKNOWN_ERROR,
                format!("{}: unknown state ordinal {ordinal}", Self::KIND),
            )
        })
    }
}

/// A descriptor with its states erased to ordinals, for code that dispatches on
/// [`ObjectKind`] at runtime.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Descriptor {
    pub initial: u32,
    transitions: fn() -> Vec<(u32, u32)>,
    supported: fn(CommunicationMethod) -> &'static [ActionKind],
    is_state: fn(u32) -> bool,
}

impl Descriptor {
    fn of<P: Protocol>() -> Self {
        Self {
            initial: P::INITIAL.ordinal(),
            transitions: || {
                P::TRANSITIONS
                    .iter()
                    .map(|(from, to)| (from.ordinal(), to.ordinal()))
                    .collect()
            },
            supported: P::supported_actions,
            is_state: |ordinal| P::State::from_ordinal(ordinal).is_some(),
        }
    }

    pub fn for_kind(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Connection => Self::of::<connection::ConnectionProtocol>(),
            ObjectKind::Credential => Self::of::<credential::CredentialProtocol>(),
            ObjectKind::DisclosedProof => Self::of::<disclosed_proof::DisclosedProofProtocol>(),
            ObjectKind::Proof => Self::of::<verifier::VerifierProtocol>(),
            ObjectKind::CredentialDef => Self::of::<credential_def::CredentialDefProtocol>(),
        }
    }

    pub fn allows(&self, from: u32, to: u32) -> bool {
        from == to || (self.transitions)().contains(&(from, to))
    }

    pub fn supports(&self, method: CommunicationMethod, action: ActionKind) -> bool {
        (self.supported)(method).contains(&action)
    }

    pub fn is_state(&self, ordinal: u32) -> bool {
        (self.is_state)(ordinal)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_descriptor_matches_typed_tables() {
        for kind in ObjectKind::iter() {
            let descriptor = Descriptor::for_kind(kind);
            assert!(descriptor.allows(descriptor.initial, descriptor.initial));
        }

        let connection = Descriptor::for_kind(ObjectKind::Connection);
        assert_eq!(connection.initial, 1);
        assert!(connection.allows(1, 2));
        assert!(!connection.allows(4, 1));
        assert!(connection.is_state(8));
        assert!(!connection.is_state(5));
    }

    #[test]
    fn test_reject_support_depends_on_method() {
        let proof = Descriptor::for_kind(ObjectKind::DisclosedProof);
        assert!(!proof.supports(CommunicationMethod::Proprietary, ActionKind::Reject));
        assert!(proof.supports(CommunicationMethod::Aries, ActionKind::Reject));
    }
}
