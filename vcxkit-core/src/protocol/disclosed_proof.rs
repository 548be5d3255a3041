//! Prover side of proof presentation.

use std::sync::Arc;

use strum::{Display, FromRepr};

use crate::{
    code::NativeCode,
    config::CommunicationMethod,
    error::ErrorKind,
    handle::{HandleKind, SlotKind},
    lifecycle::ProtocolObject,
    native::{Action, ActionKind, CreateInput, ObjectKind},
    protocol::connection::Connection,
    session::Session,
    VcxKitError, VcxKitResult,
};

use super::{protocol_state, Protocol};

/// Prover states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr, uniffi::Enum)]
#[repr(u32)]
pub enum DisclosedProofState {
    Failed = 0,
    Sent = 2,
    RequestReceived = 3,
    Accepted = 4,
    Generated = 5,
    Declined = 8,
    Rejected = 9,
}

protocol_state!(DisclosedProofState);

/// Descriptor for prover objects.
#[derive(Debug)]
pub struct DisclosedProofProtocol;

impl HandleKind for DisclosedProofProtocol {
    const SLOT: SlotKind = SlotKind::Object(ObjectKind::DisclosedProof);
}

impl Protocol for DisclosedProofProtocol {
    const KIND: ObjectKind = ObjectKind::DisclosedProof;
    type State = DisclosedProofState;
    const INITIAL: DisclosedProofState = DisclosedProofState::RequestReceived;
    const TRANSITIONS: &'static [(DisclosedProofState, DisclosedProofState)] = &[
        (DisclosedProofState::RequestReceived, DisclosedProofState::Generated),
        (DisclosedProofState::Generated, DisclosedProofState::Sent),
        (DisclosedProofState::Sent, DisclosedProofState::Accepted),
        (DisclosedProofState::Sent, DisclosedProofState::Failed),
        (DisclosedProofState::RequestReceived, DisclosedProofState::Rejected),
        (DisclosedProofState::Generated, DisclosedProofState::Rejected),
        (DisclosedProofState::RequestReceived, DisclosedProofState::Declined),
        (DisclosedProofState::Generated, DisclosedProofState::Declined),
    ];

    fn supported_actions(method: CommunicationMethod) -> &'static [ActionKind] {
        match method {
            CommunicationMethod::Proprietary => &[
                ActionKind::RetrieveCredentials,
                ActionKind::GenerateProof,
                ActionKind::SendProof,
            ],
            CommunicationMethod::Aries => &[
                ActionKind::RetrieveCredentials,
                ActionKind::GenerateProof,
                ActionKind::SendProof,
                ActionKind::Reject,
                ActionKind::Decline,
            ],
        }
    }
}

/// A presentation this wallet prepares for a verifier.
pub type DisclosedProof = ProtocolObject<DisclosedProofProtocol>;

/// Why a presentation request is declined: a free-text reason or a counter proposal,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decline {
    Reason(String),
    Proposal(String),
}

impl ProtocolObject<DisclosedProofProtocol> {
    /// Creates a prover object from a presentation request received out of band.
    ///
    /// # Errors
    /// Missing source id or request, or a request the engine cannot read.
    pub async fn create_with_request(
        session: Arc<Session>,
        source_id: Option<&str>,
        request: Option<&str>,
    ) -> VcxKitResult<Self> {
        let input = CreateInput::DisclosedProofWithRequest {
            request: request.map(str::to_owned),
        };
        Self::from_input(session, source_id, input).await
    }

    /// Creates a prover object from a request waiting on `connection`. Returns the
    /// object and the request.
    ///
    /// # Errors
    /// See [`ProtocolObject::create_from_message_id`].
    pub async fn create_with_msg_id(
        session: Arc<Session>,
        source_id: Option<&str>,
        connection: Option<&Connection>,
        message_id: Option<&str>,
    ) -> VcxKitResult<(Self, String)> {
        Self::create_from_message_id(session, source_id, connection, message_id).await
    }

    /// Presentation requests waiting on `connection`, as a JSON array.
    ///
    /// # Errors
    /// Invalid connection handle or engine failure.
    pub async fn get_requests(session: &Session, connection: &Connection) -> VcxKitResult<String> {
        Self::list_pending(session, "get_requests", connection).await
    }

    /// Wallet credentials that can satisfy the request, as JSON.
    ///
    /// # Errors
    /// Invalid handle or engine failure.
    pub async fn retrieve_credentials(&self) -> VcxKitResult<String> {
        self.perform(Action::RetrieveCredentials).await
    }

    /// Builds the presentation from the selected credentials and self-attested values.
    ///
    /// # Errors
    /// Invalid handle or engine failure.
    pub async fn generate_proof(
        &self,
        selected_credentials: &str,
        self_attested_attrs: &str,
    ) -> VcxKitResult<()> {
        self.perform(Action::GenerateProof {
            selected_credentials: selected_credentials.to_owned(),
            self_attested_attrs: self_attested_attrs.to_owned(),
        })
        .await
    }

    /// Sends the generated presentation.
    ///
    /// # Errors
    /// Invalid handles or engine failure.
    pub async fn send_proof(&self, connection: &Connection) -> VcxKitResult<()> {
        let connection = connection.live_handle()?;
        self.perform(Action::SendProof { connection }).await
    }

    /// Rejects the request. Only available with the aries communication method.
    ///
    /// # Errors
    /// `ActionNotSupported` under the proprietary method; the state is left unchanged.
    pub async fn reject(&self, connection: &Connection) -> VcxKitResult<()> {
        self.ensure_supported(ActionKind::Reject)?;
        let connection = connection.live_handle()?;
        self.perform(Action::Reject {
            connection,
            comment: None,
        })
        .await
    }

    /// Declines the request. Only available with the aries communication method.
    ///
    /// # Errors
    /// `ActionNotSupported` under the proprietary method; invalid handles or engine
    /// failure otherwise.
    pub async fn decline(&self, connection: &Connection, decline: Decline) -> VcxKitResult<()> {
        let (reason, proposal) = match decline {
            Decline::Reason(reason) => (Some(reason), None),
            Decline::Proposal(proposal) => (None, Some(proposal)),
        };
        self.decline_presentation_request(connection, reason.as_deref(), proposal.as_deref())
            .await
    }

    /// Declines with loosely typed arguments, as received from a foreign binding.
    ///
    /// # Errors
    /// Passing both or neither of `reason` and `proposal` fails with
    /// `INCOMPATIBLE_PARAMETERS`.
    pub async fn decline_presentation_request(
        &self,
        connection: &Connection,
        reason: Option<&str>,
        proposal: Option<&str>,
    ) -> VcxKitResult<()> {
        self.ensure_supported(ActionKind::Decline)?;
        if reason.is_some() == proposal.is_some() {
            return Err(VcxKitError::new(
                ErrorKind::InvalidInput,
                NativeCode::INCOMPATIBLE_PARAMETERS,
                "disclosed_proof: decline needs exactly one of reason and proposal",
            ));
        }
        let connection = connection.live_handle()?;
        self.perform(Action::Decline {
            connection,
            reason: reason.map(str::to_owned),
            proposal: proposal.map(str::to_owned),
        })
        .await
    }
}
