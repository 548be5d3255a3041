//! Holder side of credential issuance.

use std::sync::Arc;

use strum::{Display, FromRepr};

use crate::{
    config::CommunicationMethod,
    handle::{HandleKind, SlotKind},
    lifecycle::ProtocolObject,
    native::{Action, ActionKind, CreateInput, ObjectKind},
    protocol::connection::Connection,
    session::Session,
    VcxKitResult,
};

use super::{protocol_state, Protocol};

/// Holder credential states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr, uniffi::Enum)]
#[repr(u32)]
pub enum CredentialState {
    Failed = 0,
    RequestSent = 2,
    OfferReceived = 3,
    Accepted = 4,
    Rejected = 9,
}

protocol_state!(CredentialState);

/// Descriptor for holder credentials.
#[derive(Debug)]
pub struct CredentialProtocol;

impl HandleKind for CredentialProtocol {
    const SLOT: SlotKind = SlotKind::Object(ObjectKind::Credential);
}

impl Protocol for CredentialProtocol {
    const KIND: ObjectKind = ObjectKind::Credential;
    type State = CredentialState;
    const INITIAL: CredentialState = CredentialState::OfferReceived;
    const TRANSITIONS: &'static [(CredentialState, CredentialState)] = &[
        (CredentialState::OfferReceived, CredentialState::RequestSent),
        (CredentialState::RequestSent, CredentialState::Accepted),
        (CredentialState::OfferReceived, CredentialState::Rejected),
        (CredentialState::RequestSent, CredentialState::Rejected),
        (CredentialState::OfferReceived, CredentialState::Failed),
        (CredentialState::RequestSent, CredentialState::Failed),
    ];

    fn supported_actions(method: CommunicationMethod) -> &'static [ActionKind] {
        match method {
            CommunicationMethod::Proprietary => &[ActionKind::SendRequest],
            CommunicationMethod::Aries => &[ActionKind::SendRequest, ActionKind::Reject],
        }
    }
}

/// A credential held by this wallet, from offer to issuance.
pub type Credential = ProtocolObject<CredentialProtocol>;

impl ProtocolObject<CredentialProtocol> {
    /// Creates a credential from an offer received out of band.
    ///
    /// # Errors
    /// A missing source id or offer is an invalid-input error; an offer the engine
    /// cannot read fails with `INVALID_CREDENTIAL_OFFER`.
    pub async fn create_with_offer(
        session: Arc<Session>,
        source_id: Option<&str>,
        offer: Option<&str>,
    ) -> VcxKitResult<Self> {
        let input = CreateInput::CredentialWithOffer {
            offer: offer.map(str::to_owned),
        };
        Self::from_input(session, source_id, input).await
    }

    /// Creates a credential from an offer waiting on `connection`. Returns the object
    /// and the offer.
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

    /// Offers waiting on `connection`, as a JSON array.
    ///
    /// # Errors
    /// Invalid connection handle or engine failure.
    pub async fn get_offers(session: &Session, connection: &Connection) -> VcxKitResult<String> {
        Self::list_pending(session, "get_offers", connection).await
    }

    /// Creates a credential from `offer` and immediately requests it.
    ///
    /// # Errors
    /// Any failure of [`Self::create_with_offer`] or [`Self::send_request`].
    pub async fn accept_offer(
        session: Arc<Session>,
        source_id: Option<&str>,
        offer: Option<&str>,
        connection: &Connection,
    ) -> VcxKitResult<Self> {
        let credential = Self::create_with_offer(session, source_id, offer).await?;
        credential.send_request(connection, 0).await?;
        Ok(credential)
    }

    /// Requests the offered credential over `connection`.
    ///
    /// # Errors
    /// Invalid credential or connection handle, or engine failure.
    pub async fn send_request(
        &self,
        connection: &Connection,
        payment_handle: u32,
    ) -> VcxKitResult<()> {
        let connection = connection.live_handle()?;
        self.perform(Action::SendRequest {
            connection,
            payment_handle,
        })
        .await
    }

    /// Rejects the offer. Only available with the aries communication method.
    ///
    /// # Errors
    /// `ActionNotSupported` under the proprietary method, otherwise invalid handles or
    /// engine failure.
    pub async fn reject(&self, connection: &Connection, comment: Option<&str>) -> VcxKitResult<()> {
        self.ensure_supported(ActionKind::Reject)?;
        let connection = connection.live_handle()?;
        self.perform(Action::Reject {
            connection,
            comment: comment.map(str::to_owned),
        })
        .await
    }
}
