//! Pairwise connections.

use std::sync::Arc;

use strum::{Display, FromRepr};

use crate::{
    config::CommunicationMethod,
    handle::{HandleKind, SlotKind},
    lifecycle::ProtocolObject,
    native::{Action, ActionKind, CreateInput, ObjectKind},
    session::Session,
    VcxKitResult,
};

use super::{protocol_state, Protocol};

/// Connection states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr, uniffi::Enum)]
#[repr(u32)]
pub enum ConnectionState {
    Failed = 0,
    Initialized = 1,
    RequestSent = 2,
    ResponseReceived = 3,
    Accepted = 4,
    Redirected = 8,
}

protocol_state!(ConnectionState);

/// Descriptor for connections.
#[derive(Debug)]
pub struct ConnectionProtocol;

impl HandleKind for ConnectionProtocol {
    const SLOT: SlotKind = SlotKind::Object(ObjectKind::Connection);
}

const ACTIONS: &[ActionKind] = &[
    ActionKind::Connect,
    ActionKind::InviteDetails,
    ActionKind::SendMessage,
];

impl Protocol for ConnectionProtocol {
    const KIND: ObjectKind = ObjectKind::Connection;
    type State = ConnectionState;
    const INITIAL: ConnectionState = ConnectionState::Initialized;
    const TRANSITIONS: &'static [(ConnectionState, ConnectionState)] = &[
        (ConnectionState::Initialized, ConnectionState::RequestSent),
        (ConnectionState::RequestSent, ConnectionState::ResponseReceived),
        (ConnectionState::ResponseReceived, ConnectionState::Accepted),
        (ConnectionState::RequestSent, ConnectionState::Redirected),
        (ConnectionState::Initialized, ConnectionState::Failed),
        (ConnectionState::RequestSent, ConnectionState::Failed),
        (ConnectionState::ResponseReceived, ConnectionState::Failed),
    ];

    fn supported_actions(_method: CommunicationMethod) -> &'static [ActionKind] {
        ACTIONS
    }
}

/// A pairwise connection.
pub type Connection = ProtocolObject<ConnectionProtocol>;

impl ProtocolObject<ConnectionProtocol> {
    /// Creates a connection that will produce an invitation.
    ///
    /// # Errors
    /// The engine rejects the call, for instance when `source_id` is missing.
    pub async fn create(session: Arc<Session>, source_id: Option<&str>) -> VcxKitResult<Self> {
        Self::from_input(session, source_id, CreateInput::Connection).await
    }

    /// Creates a connection accepting a received invitation.
    ///
    /// # Errors
    /// The engine rejects the invitation.
    pub async fn create_with_invite(
        session: Arc<Session>,
        source_id: Option<&str>,
        invite: Option<&str>,
    ) -> VcxKitResult<Self> {
        let input = CreateInput::ConnectionWithInvite {
            invite: invite.map(str::to_owned),
        };
        Self::from_input(session, source_id, input).await
    }

    /// Creates a connection accepting a received out-of-band invitation.
    ///
    /// # Errors
    /// The engine rejects the invitation.
    pub async fn create_with_outofband_invite(
        session: Arc<Session>,
        source_id: Option<&str>,
        invite: Option<&str>,
    ) -> VcxKitResult<Self> {
        let input = CreateInput::ConnectionWithOutOfBand {
            invite: invite.map(str::to_owned),
        };
        Self::from_input(session, source_id, input).await
    }

    /// Starts the exchange. Returns the invite details when the engine produces them.
    ///
    /// # Errors
    /// Invalid handle or engine failure.
    pub async fn connect(&self, options: Option<&str>) -> VcxKitResult<Option<String>> {
        self.perform(Action::Connect {
            options: options.map(str::to_owned),
        })
        .await
    }

    /// The invitation for this connection.
    ///
    /// # Errors
    /// Invalid handle or engine failure.
    pub async fn invite_details(&self, abbreviated: bool) -> VcxKitResult<String> {
        self.perform(Action::InviteDetails { abbreviated }).await
    }

    /// Sends a generic message over the connection. Returns the message id.
    ///
    /// # Errors
    /// Invalid handle or engine failure.
    pub async fn send_message(&self, message: &str, options: &str) -> VcxKitResult<String> {
        self.perform(Action::SendMessage {
            message: message.to_owned(),
            options: options.to_owned(),
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ProtocolState;

    #[test]
    fn test_ordinals() {
        assert_eq!(ConnectionState::Accepted.ordinal(), 4);
        assert_eq!(
            ConnectionState::from_ordinal(8),
            Some(ConnectionState::Redirected)
        );
        assert_eq!(ConnectionState::from_ordinal(5), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ConnectionProtocol::is_terminal(ConnectionState::Accepted));
        assert!(ConnectionProtocol::is_terminal(ConnectionState::Failed));
        assert!(!ConnectionProtocol::is_terminal(ConnectionState::RequestSent));
        assert!(!ConnectionProtocol::can_transition(
            ConnectionState::Accepted,
            ConnectionState::Initialized
        ));
    }
}
