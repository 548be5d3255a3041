//! Exported protocol objects.

use std::sync::Arc;

use vcxkit_core::{
    protocol::{
        connection, credential, credential_def::{self, CredentialDefParams},
        disclosed_proof, verifier::{self, ProofRequest, ProofState},
    },
    VcxKitError,
};

use crate::VcxSession;

/// Generates an exported object around a core protocol object together with the
/// lifecycle operations every family shares.
macro_rules! protocol_object {
    ($(#[$meta:meta])* $name:ident($core:ty) => $state:ty) => {
        $(#[$meta])*
        #[derive(Debug, uniffi::Object)]
        pub struct $name(pub(crate) $core);

        #[uniffi::export(async_runtime = "tokio")]
        impl $name {
            /// Rebuilds an object from a snapshot produced by `serialize`.
            ///
            /// # Errors
            /// `InvalidJson` when the snapshot does not belong to this family.
            #[uniffi::constructor]
            pub async fn deserialize(
                session: &VcxSession,
                snapshot: &str,
            ) -> Result<Self, VcxKitError> {
                <$core>::deserialize(session.core(), snapshot).await.map(Self)
            }

            #[must_use]
            pub fn source_id(&self) -> String {
                self.0.source_id().to_owned()
            }

            /// # Errors
            /// Invalid handle or engine failure.
            pub async fn get_state(&self) -> Result<$state, VcxKitError> {
                self.0.get_state().await
            }

            /// Applies the next pending message, if any.
            ///
            /// # Errors
            /// Invalid handle or engine failure.
            pub async fn update_state(&self) -> Result<$state, VcxKitError> {
                self.0.update_state().await
            }

            /// # Errors
            /// Invalid handle, a message that is not JSON, or engine failure.
            pub async fn update_state_with_message(
                &self,
                message: &str,
            ) -> Result<$state, VcxKitError> {
                self.0.update_state_with_message(message).await
            }

            /// # Errors
            /// Invalid handle or engine failure.
            pub async fn serialize(&self) -> Result<String, VcxKitError> {
                self.0.serialize().await
            }

            /// Releases the native handle. Later calls fail with `InvalidHandle`.
            ///
            /// # Errors
            /// The handle was already released.
            pub fn release(&self) -> Result<(), VcxKitError> {
                self.0.release()
            }

            /// The problem report as JSON, if the exchange failed.
            ///
            /// # Errors
            /// Invalid handle or engine failure.
            pub async fn get_problem_report(&self) -> Result<Option<String>, VcxKitError> {
                Ok(self
                    .0
                    .get_problem_report()
                    .await?
                    .map(|report| report.to_string()))
            }
        }
    };
}

protocol_object!(
    /// A pairwise connection.
    Connection(connection::Connection) => connection::ConnectionState
);

protocol_object!(
    /// A credential offered to this wallet.
    Credential(credential::Credential) => credential::CredentialState
);

protocol_object!(
    /// A presentation prepared for a verifier.
    DisclosedProof(disclosed_proof::DisclosedProof) => disclosed_proof::DisclosedProofState
);

protocol_object!(
    /// A presentation request sent by this wallet.
    Verifier(verifier::Verifier) => verifier::VerifierState
);

protocol_object!(
    /// A credential definition owned by this issuer.
    CredentialDef(credential_def::CredentialDef) => credential_def::CredentialDefState
);

#[uniffi::export(async_runtime = "tokio")]
impl Connection {
    /// # Errors
    /// Missing source id or engine failure.
    #[uniffi::constructor]
    pub async fn create(
        session: &VcxSession,
        source_id: Option<String>,
    ) -> Result<Self, VcxKitError> {
        connection::Connection::create(session.core(), source_id.as_deref())
            .await
            .map(Self)
    }

    /// # Errors
    /// Missing source id, or an invitation the engine cannot read.
    #[uniffi::constructor]
    pub async fn create_with_invite(
        session: &VcxSession,
        source_id: Option<String>,
        invite: Option<String>,
    ) -> Result<Self, VcxKitError> {
        connection::Connection::create_with_invite(
            session.core(),
            source_id.as_deref(),
            invite.as_deref(),
        )
        .await
        .map(Self)
    }

    /// # Errors
    /// Missing source id, or an invitation the engine cannot read.
    #[uniffi::constructor]
    pub async fn create_with_outofband_invite(
        session: &VcxSession,
        source_id: Option<String>,
        invite: Option<String>,
    ) -> Result<Self, VcxKitError> {
        connection::Connection::create_with_outofband_invite(
            session.core(),
            source_id.as_deref(),
            invite.as_deref(),
        )
        .await
        .map(Self)
    }

    /// Starts the exchange and returns the invitation when this side produces one.
    ///
    /// # Errors
    /// Invalid handle or engine failure.
    pub async fn connect(&self, options: Option<String>) -> Result<Option<String>, VcxKitError> {
        self.0.connect(options.as_deref()).await
    }

    /// # Errors
    /// Invalid handle or engine failure.
    pub async fn invite_details(&self, abbreviated: bool) -> Result<String, VcxKitError> {
        self.0.invite_details(abbreviated).await
    }

    /// # Errors
    /// The connection is not accepted yet, or engine failure.
    pub async fn send_message(&self, message: &str, options: &str) -> Result<String, VcxKitError> {
        self.0.send_message(message, options).await
    }
}

/// A credential created from an offer fetched by message id.
#[derive(Debug, uniffi::Record)]
pub struct CredentialWithOffer {
    pub credential: Arc<Credential>,
    pub offer: String,
}

#[uniffi::export(async_runtime = "tokio")]
impl Credential {
    /// # Errors
    /// Missing arguments or an offer the engine cannot read.
    #[uniffi::constructor]
    pub async fn create_with_offer(
        session: &VcxSession,
        source_id: Option<String>,
        offer: Option<String>,
    ) -> Result<Self, VcxKitError> {
        credential::Credential::create_with_offer(
            session.core(),
            source_id.as_deref(),
            offer.as_deref(),
        )
        .await
        .map(Self)
    }

    /// Creates the credential and immediately requests it over `connection`.
    ///
    /// # Errors
    /// Any failure of the creation or of the request.
    #[uniffi::constructor]
    pub async fn accept_offer(
        session: &VcxSession,
        source_id: Option<String>,
        offer: Option<String>,
        connection: &Connection,
    ) -> Result<Self, VcxKitError> {
        credential::Credential::accept_offer(
            session.core(),
            source_id.as_deref(),
            offer.as_deref(),
            &connection.0,
        )
        .await
        .map(Self)
    }

    /// # Errors
    /// Invalid handles or engine failure.
    pub async fn send_request(
        &self,
        connection: &Connection,
        payment_handle: u32,
    ) -> Result<(), VcxKitError> {
        self.0.send_request(&connection.0, payment_handle).await
    }

    /// # Errors
    /// `ActionNotSupported` under the proprietary method.
    pub async fn reject(
        &self,
        connection: &Connection,
        comment: Option<String>,
    ) -> Result<(), VcxKitError> {
        self.0.reject(&connection.0, comment.as_deref()).await
    }
}

/// Creates a credential from the offer `message_id` waiting on `connection`.
///
/// # Errors
/// No connection, an unknown message, or engine failure.
#[uniffi::export(async_runtime = "tokio")]
pub async fn credential_create_with_msg_id(
    session: &VcxSession,
    source_id: Option<String>,
    connection: Option<Arc<Connection>>,
    message_id: Option<String>,
) -> Result<CredentialWithOffer, VcxKitError> {
    let (credential, offer) = credential::Credential::create_with_msg_id(
        session.core(),
        source_id.as_deref(),
        connection.as_deref().map(|connection| &connection.0),
        message_id.as_deref(),
    )
    .await?;
    Ok(CredentialWithOffer {
        credential: Arc::new(Credential(credential)),
        offer,
    })
}

/// Offers waiting on `connection`, as a JSON array.
///
/// # Errors
/// Invalid connection or engine failure.
#[uniffi::export(async_runtime = "tokio")]
pub async fn credential_get_offers(
    session: &VcxSession,
    connection: &Connection,
) -> Result<String, VcxKitError> {
    credential::Credential::get_offers(&session.core(), &connection.0).await
}

/// A prover object created from a request fetched by message id.
#[derive(Debug, uniffi::Record)]
pub struct DisclosedProofWithRequest {
    pub proof: Arc<DisclosedProof>,
    pub request: String,
}

#[uniffi::export(async_runtime = "tokio")]
impl DisclosedProof {
    /// # Errors
    /// Missing arguments or a request the engine cannot read.
    #[uniffi::constructor]
    pub async fn create_with_request(
        session: &VcxSession,
        source_id: Option<String>,
        request: Option<String>,
    ) -> Result<Self, VcxKitError> {
        disclosed_proof::DisclosedProof::create_with_request(
            session.core(),
            source_id.as_deref(),
            request.as_deref(),
        )
        .await
        .map(Self)
    }

    /// # Errors
    /// Invalid handle or engine failure.
    pub async fn retrieve_credentials(&self) -> Result<String, VcxKitError> {
        self.0.retrieve_credentials().await
    }

    /// # Errors
    /// Invalid handle, malformed JSON or engine failure.
    pub async fn generate_proof(
        &self,
        selected_credentials: &str,
        self_attested_attrs: &str,
    ) -> Result<(), VcxKitError> {
        self.0
            .generate_proof(selected_credentials, self_attested_attrs)
            .await
    }

    /// # Errors
    /// No generated proof, invalid handles or engine failure.
    pub async fn send_proof(&self, connection: &Connection) -> Result<(), VcxKitError> {
        self.0.send_proof(&connection.0).await
    }

    /// # Errors
    /// `ActionNotSupported` under the proprietary method.
    pub async fn reject(&self, connection: &Connection) -> Result<(), VcxKitError> {
        self.0.reject(&connection.0).await
    }

    /// Declines with exactly one of `reason` and `proposal`.
    ///
    /// # Errors
    /// Both or neither given, or `ActionNotSupported` under the proprietary method.
    pub async fn decline_presentation_request(
        &self,
        connection: &Connection,
        reason: Option<String>,
        proposal: Option<String>,
    ) -> Result<(), VcxKitError> {
        self.0
            .decline_presentation_request(&connection.0, reason.as_deref(), proposal.as_deref())
            .await
    }
}

/// Creates a prover object from the request `message_id` waiting on `connection`.
///
/// # Errors
/// No connection, an unknown message, or engine failure.
#[uniffi::export(async_runtime = "tokio")]
pub async fn disclosed_proof_create_with_msg_id(
    session: &VcxSession,
    source_id: Option<String>,
    connection: Option<Arc<Connection>>,
    message_id: Option<String>,
) -> Result<DisclosedProofWithRequest, VcxKitError> {
    let (proof, request) = disclosed_proof::DisclosedProof::create_with_msg_id(
        session.core(),
        source_id.as_deref(),
        connection.as_deref().map(|connection| &connection.0),
        message_id.as_deref(),
    )
    .await?;
    Ok(DisclosedProofWithRequest {
        proof: Arc::new(DisclosedProof(proof)),
        request,
    })
}

/// Presentation requests waiting on `connection`, as a JSON array.
///
/// # Errors
/// Invalid connection or engine failure.
#[uniffi::export(async_runtime = "tokio")]
pub async fn disclosed_proof_get_requests(
    session: &VcxSession,
    connection: &Connection,
) -> Result<String, VcxKitError> {
    disclosed_proof::DisclosedProof::get_requests(&session.core(), &connection.0).await
}

/// The verifier's view of a received presentation.
#[derive(Debug, uniffi::Record)]
pub struct VerifiedProof {
    pub state: ProofState,
    pub proof: Option<String>,
}

#[uniffi::export(async_runtime = "tokio")]
impl Verifier {
    /// # Errors
    /// Missing arguments or JSON the engine cannot read.
    #[uniffi::constructor]
    pub async fn create(
        session: &VcxSession,
        source_id: Option<String>,
        requested_attrs: Option<String>,
        requested_predicates: Option<String>,
        revocation_interval: Option<String>,
        name: Option<String>,
    ) -> Result<Self, VcxKitError> {
        let request = ProofRequest {
            requested_attrs: requested_attrs.as_deref(),
            requested_predicates: requested_predicates.as_deref(),
            revocation_interval: revocation_interval.as_deref(),
            name: name.as_deref(),
        };
        verifier::Verifier::create(session.core(), source_id.as_deref(), request)
            .await
            .map(Self)
    }

    /// # Errors
    /// Missing arguments or a proposal the engine cannot read.
    #[uniffi::constructor]
    pub async fn create_with_proposal(
        session: &VcxSession,
        source_id: Option<String>,
        proposal: Option<String>,
        name: Option<String>,
    ) -> Result<Self, VcxKitError> {
        verifier::Verifier::create_with_proposal(
            session.core(),
            source_id.as_deref(),
            proposal.as_deref(),
            name.as_deref(),
        )
        .await
        .map(Self)
    }

    /// # Errors
    /// Invalid handles or engine failure.
    pub async fn send_proof_request(&self, connection: &Connection) -> Result<(), VcxKitError> {
        self.0.send_proof_request(&connection.0).await
    }

    /// # Errors
    /// No presentation received yet, invalid handles or engine failure.
    pub async fn get_proof(&self, connection: &Connection) -> Result<VerifiedProof, VcxKitError> {
        let (state, proof) = self.0.get_proof(&connection.0).await?;
        Ok(VerifiedProof { state, proof })
    }
}

/// A credential definition waiting for an endorser, and the transaction to sign.
#[derive(Debug, uniffi::Record)]
pub struct EndorsableCredentialDef {
    pub cred_def: Arc<CredentialDef>,
    pub transaction: String,
}

#[uniffi::export(async_runtime = "tokio")]
impl CredentialDef {
    /// Creates and publishes a credential definition.
    ///
    /// # Errors
    /// Missing parameters or engine failure.
    #[uniffi::constructor]
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        session: &VcxSession,
        source_id: Option<String>,
        name: Option<String>,
        schema_id: Option<String>,
        issuer_did: Option<String>,
        tag: Option<String>,
        revocation_details: Option<String>,
        payment_handle: u32,
    ) -> Result<Self, VcxKitError> {
        let params = CredentialDefParams {
            name: name.as_deref(),
            schema_id: schema_id.as_deref(),
            issuer_did: issuer_did.as_deref(),
            tag: tag.as_deref(),
            revocation_details: revocation_details.as_deref(),
        };
        credential_def::CredentialDef::create(
            session.core(),
            source_id.as_deref(),
            params,
            payment_handle,
        )
        .await
        .map(Self)
    }

    /// # Errors
    /// Missing id or engine failure.
    #[uniffi::constructor]
    pub async fn create_with_id(
        session: &VcxSession,
        source_id: Option<String>,
        cred_def_id: Option<String>,
        issuer_did: Option<String>,
        revocation_config: Option<String>,
    ) -> Result<Self, VcxKitError> {
        credential_def::CredentialDef::create_with_id(
            session.core(),
            source_id.as_deref(),
            cred_def_id.as_deref(),
            issuer_did.as_deref(),
            revocation_config.as_deref(),
        )
        .await
        .map(Self)
    }

    /// # Errors
    /// Invalid handle or engine failure.
    pub async fn get_cred_def_id(&self) -> Result<String, VcxKitError> {
        self.0.get_cred_def_id().await
    }
}

/// Builds a credential definition whose ledger write is signed by `endorser`.
///
/// # Errors
/// Missing parameters or engine failure.
#[uniffi::export(async_runtime = "tokio")]
#[allow(clippy::too_many_arguments)]
pub async fn credential_def_prepare_for_endorser(
    session: &VcxSession,
    source_id: Option<String>,
    name: Option<String>,
    schema_id: Option<String>,
    issuer_did: Option<String>,
    tag: Option<String>,
    revocation_details: Option<String>,
    endorser: Option<String>,
) -> Result<EndorsableCredentialDef, VcxKitError> {
    let params = CredentialDefParams {
        name: name.as_deref(),
        schema_id: schema_id.as_deref(),
        issuer_did: issuer_did.as_deref(),
        tag: tag.as_deref(),
        revocation_details: revocation_details.as_deref(),
    };
    let (cred_def, transaction) = credential_def::CredentialDef::prepare_for_endorser(
        session.core(),
        source_id.as_deref(),
        params,
        endorser.as_deref(),
    )
    .await?;
    Ok(EndorsableCredentialDef {
        cred_def: Arc::new(CredentialDef(cred_def)),
        transaction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConnectionState, CredentialState, DisclosedProofState, ErrorKind};

    async fn session(method: &str) -> VcxSession {
        let config = format!(r#"{{"enable_test_mode":"true","communication_method":"{method}"}}"#);
        VcxSession::init(&config).await.unwrap()
    }

    fn message(kind: &str, id: &str) -> String {
        serde_json::json!({ "@type": format!("https://didcomm.org/{kind}"), "@id": id }).to_string()
    }

    async fn accepted(session: &VcxSession) -> Connection {
        let connection = Connection::create(session, Some("alice".into())).await.unwrap();
        assert!(connection.connect(None).await.unwrap().is_some());
        session
            .deliver_message(&connection, &message("connections/1.0/response", "r"))
            .unwrap();
        session
            .deliver_message(&connection, &message("notification/1.0/ack", "a"))
            .unwrap();
        connection.update_state().await.unwrap();
        assert_eq!(
            connection.update_state().await.unwrap(),
            ConnectionState::Accepted
        );
        connection
    }

    #[tokio::test]
    async fn test_credential_from_message_id() {
        let session = session("aries").await;
        let connection = Arc::new(accepted(&session).await);
        session
            .deliver_message(
                &connection,
                &message("issue-credential/1.0/offer-credential", "offer-9"),
            )
            .unwrap();

        let offers = credential_get_offers(&session, &connection).await.unwrap();
        assert!(offers.contains("offer-9"));

        let created = credential_create_with_msg_id(
            &session,
            Some("cred".into()),
            Some(Arc::clone(&connection)),
            Some("offer-9".into()),
        )
        .await
        .unwrap();
        assert!(created.offer.contains("offer-9"));
        assert_eq!(
            created.credential.get_state().await.unwrap(),
            CredentialState::OfferReceived
        );

        let error = credential_create_with_msg_id(&session, Some("cred".into()), None, None)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unknown);
    }

    #[tokio::test]
    async fn test_snapshot_survives_release() {
        let session = session("proprietary").await;
        let request = r#"{"@id":"req","requested_attributes":{}}"#;
        let proof = DisclosedProof::create_with_request(&session, Some("p".into()), Some(request.into()))
            .await
            .unwrap();
        let snapshot = proof.serialize().await.unwrap();
        proof.release().unwrap();
        assert_eq!(
            proof.get_state().await.unwrap_err().kind(),
            ErrorKind::InvalidHandle
        );

        let restored = DisclosedProof::deserialize(&session, &snapshot).await.unwrap();
        assert_eq!(restored.source_id(), "p");
        assert_eq!(
            restored.get_state().await.unwrap(),
            DisclosedProofState::RequestReceived
        );
        assert_eq!(restored.get_problem_report().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_endorser_flow() {
        let session = session("proprietary").await;
        let created = credential_def_prepare_for_endorser(
            &session,
            Some("def".into()),
            Some("degree".into()),
            Some("schema".into()),
            Some("did".into()),
            Some("tag".into()),
            None,
            Some("endorser".into()),
        )
        .await
        .unwrap();
        assert!(created.transaction.contains("endorser"));
        assert_eq!(
            created.cred_def.update_state().await.unwrap(),
            crate::CredentialDefState::Published
        );
    }
}
