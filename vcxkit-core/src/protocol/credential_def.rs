//! Issuer credential definitions.

use std::sync::Arc;

use strum::{Display, FromRepr};

use crate::{
    config::CommunicationMethod,
    handle::{HandleKind, SlotKind},
    lifecycle::ProtocolObject,
    native::{Action, ActionKind, CreateInput, ObjectKind},
    session::Session,
    VcxKitError, VcxKitResult,
};

use super::{protocol_state, Protocol};

/// Credential definition states. Publication is one way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr, uniffi::Enum)]
#[repr(u32)]
pub enum CredentialDefState {
    Built = 0,
    Published = 1,
}

protocol_state!(CredentialDefState);

/// Descriptor for credential definitions.
#[derive(Debug)]
pub struct CredentialDefProtocol;

impl HandleKind for CredentialDefProtocol {
    const SLOT: SlotKind = SlotKind::Object(ObjectKind::CredentialDef);
}

impl Protocol for CredentialDefProtocol {
    const KIND: ObjectKind = ObjectKind::CredentialDef;
    type State = CredentialDefState;
    const INITIAL: CredentialDefState = CredentialDefState::Built;
    const TRANSITIONS: &'static [(CredentialDefState, CredentialDefState)] =
        &[(CredentialDefState::Built, CredentialDefState::Published)];

    fn supported_actions(_method: CommunicationMethod) -> &'static [ActionKind] {
        &[ActionKind::GetCredDefId]
    }
}

/// A credential definition owned by this issuer.
pub type CredentialDef = ProtocolObject<CredentialDefProtocol>;

/// Parameters shared by the publishing constructors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialDefParams<'a> {
    pub name: Option<&'a str>,
    pub schema_id: Option<&'a str>,
    pub issuer_did: Option<&'a str>,
    pub tag: Option<&'a str>,
    pub revocation_details: Option<&'a str>,
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_owned)
}

impl ProtocolObject<CredentialDefProtocol> {
    /// Creates and publishes a credential definition.
    ///
    /// # Errors
    /// Missing parameters or engine failure.
    pub async fn create(
        session: Arc<Session>,
        source_id: Option<&str>,
        params: CredentialDefParams<'_>,
        payment_handle: u32,
    ) -> VcxKitResult<Self> {
        let input = CreateInput::CredentialDef {
            name: owned(params.name),
            schema_id: owned(params.schema_id),
            issuer_did: owned(params.issuer_did),
            tag: owned(params.tag),
            revocation_details: owned(params.revocation_details),
            payment_handle,
        };
        Self::from_input(session, source_id, input).await
    }

    /// Builds a credential definition whose ledger transaction must be signed by
    /// `endorser`. Returns the object, still `Built`, and the transaction to hand over.
    /// A later [`ProtocolObject::update_state`] observes the write and moves it to
    /// `Published`.
    ///
    /// # Errors
    /// Missing parameters or engine failure.
    pub async fn prepare_for_endorser(
        session: Arc<Session>,
        source_id: Option<&str>,
        params: CredentialDefParams<'_>,
        endorser: Option<&str>,
    ) -> VcxKitResult<(Self, String)> {
        let input = CreateInput::CredentialDefForEndorser {
            name: owned(params.name),
            schema_id: owned(params.schema_id),
            issuer_did: owned(params.issuer_did),
            tag: owned(params.tag),
            revocation_details: owned(params.revocation_details),
            endorser: owned(endorser),
        };
        let (object, transaction) = Self::create_with_payload(session, source_id, input).await?;
        let transaction = transaction
            .ok_or_else(|| VcxKitError::unknown("engine returned no endorser transaction"))?;
        Ok((object, transaction))
    }

    /// Wraps a credential definition that is already on the ledger.
    ///
    /// # Errors
    /// Missing id or engine failure.
    pub async fn create_with_id(
        session: Arc<Session>,
        source_id: Option<&str>,
        cred_def_id: Option<&str>,
        issuer_did: Option<&str>,
        revocation_config: Option<&str>,
    ) -> VcxKitResult<Self> {
        let input = CreateInput::CredentialDefWithId {
            cred_def_id: owned(cred_def_id),
            issuer_did: owned(issuer_did),
            revocation_config: owned(revocation_config),
        };
        Self::from_input(session, source_id, input).await
    }

    /// The ledger id of the definition.
    ///
    /// # Errors
    /// Invalid handle or engine failure.
    pub async fn get_cred_def_id(&self) -> VcxKitResult<String> {
        self.perform(Action::GetCredDefId).await
    }
}
