//! Verifier side of proof presentation. The engine calls these objects `proof`.

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

/// Verifier states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr, uniffi::Enum)]
#[repr(u32)]
pub enum VerifierState {
    Failed = 0,
    Initialized = 1,
    RequestSent = 2,
    ProofReceived = 3,
    Accepted = 4,
    Rejected = 9,
}

protocol_state!(VerifierState);

/// Outcome of verifying a received presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr, uniffi::Enum)]
#[repr(u32)]
pub enum ProofState {
    Undefined = 0,
    Validated = 1,
    Invalid = 2,
}

/// Descriptor for verifier objects.
#[derive(Debug)]
pub struct VerifierProtocol;

impl HandleKind for VerifierProtocol {
    const SLOT: SlotKind = SlotKind::Object(ObjectKind::Proof);
}

impl Protocol for VerifierProtocol {
    const KIND: ObjectKind = ObjectKind::Proof;
    type State = VerifierState;
    const INITIAL: VerifierState = VerifierState::Initialized;
    const TRANSITIONS: &'static [(VerifierState, VerifierState)] = &[
        (VerifierState::Initialized, VerifierState::RequestSent),
        (VerifierState::RequestSent, VerifierState::ProofReceived),
        (VerifierState::ProofReceived, VerifierState::Accepted),
        (VerifierState::ProofReceived, VerifierState::Rejected),
        (VerifierState::RequestSent, VerifierState::Failed),
    ];

    fn supported_actions(_method: CommunicationMethod) -> &'static [ActionKind] {
        &[ActionKind::SendProofRequest, ActionKind::GetProof]
    }
}

/// A verifier requesting and checking a presentation.
pub type Verifier = ProtocolObject<VerifierProtocol>;

/// What the verifier asks for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProofRequest<'a> {
    pub requested_attrs: Option<&'a str>,
    pub requested_predicates: Option<&'a str>,
    pub revocation_interval: Option<&'a str>,
    pub name: Option<&'a str>,
}

impl ProtocolObject<VerifierProtocol> {
    /// Creates a verifier for the given request.
    ///
    /// # Errors
    /// Missing source id or attributes, or JSON the engine cannot read.
    pub async fn create(
        session: Arc<Session>,
        source_id: Option<&str>,
        request: ProofRequest<'_>,
    ) -> VcxKitResult<Self> {
        let input = CreateInput::Verifier {
            requested_attrs: request.requested_attrs.map(str::to_owned),
            requested_predicates: request.requested_predicates.map(str::to_owned),
            revocation_interval: request.revocation_interval.map(str::to_owned),
            name: request.name.map(str::to_owned),
        };
        Self::from_input(session, source_id, input).await
    }

    /// Creates a verifier answering a presentation proposal.
    ///
    /// # Errors
    /// Missing source id or proposal, or a proposal the engine cannot read.
    pub async fn create_with_proposal(
        session: Arc<Session>,
        source_id: Option<&str>,
        proposal: Option<&str>,
        name: Option<&str>,
    ) -> VcxKitResult<Self> {
        let input = CreateInput::VerifierWithProposal {
            proposal: proposal.map(str::to_owned),
            name: name.map(str::to_owned),
        };
        Self::from_input(session, source_id, input).await
    }

    /// Sends the presentation request over `connection`.
    ///
    /// # Errors
    /// Invalid handles or engine failure.
    pub async fn send_proof_request(&self, connection: &Connection) -> VcxKitResult<()> {
        let connection = connection.live_handle()?;
        self.perform(Action::SendProofRequest { connection }).await
    }

    /// Reads the received presentation and acknowledges it, completing the exchange.
    /// Returns the verification outcome and the presentation.
    ///
    /// # Errors
    /// Invalid handles, no presentation received yet, or engine failure.
    pub async fn get_proof(
        &self,
        connection: &Connection,
    ) -> VcxKitResult<(ProofState, Option<String>)> {
        let connection = connection.live_handle()?;
        let (ordinal, proof): (u32, Option<String>) =
            self.perform(Action::GetProof { connection }).await?;
        let state = ProofState::from_repr(ordinal).ok_or_else(|| {
            VcxKitError::new(
                ErrorKind::Unknown,
                NativeCode::UNKNOWN_ERROR,
                format!("proof: unknown proof state ordinal {ordinal}"),
            )
        })?;
        Ok((state, proof))
    }
}
