mod common;

use std::sync::Arc;

use test_case::test_case;
use tokio_test::{assert_err, assert_ok};
use vcxkit_core::{
    lifecycle::ProtocolObject,
    native::ObjectKind,
    protocol::{
        connection::{Connection, ConnectionState},
        credential::{Credential, CredentialState},
        credential_def::{CredentialDef, CredentialDefParams},
        disclosed_proof::DisclosedProof,
        verifier::{ProofRequest, Verifier, VerifierState},
        Protocol,
    },
    CommunicationMethod, ErrorKind, Session,
};

const PARAMS: CredentialDefParams<'static> = CredentialDefParams {
    name: Some("degree"),
    schema_id: Some("2hoqvcwupRTUNkXn6ArYzs:2:degree:1.0"),
    issuer_did: Some("2hoqvcwupRTUNkXn6ArYzs"),
    tag: Some("tag1"),
    revocation_details: None,
};

async fn round_trip<P: Protocol>(object: &ProtocolObject<P>) -> eyre::Result<()> {
    let snapshot = object.serialize().await?;
    let restored = ProtocolObject::<P>::deserialize(Arc::clone(object.session()), &snapshot).await?;
    assert_eq!(restored.source_id(), object.source_id());
    assert_ne!(restored.handle(), object.handle());
    assert_eq!(restored.serialize().await?, snapshot);
    assert_eq!(restored.get_state().await?, object.get_state().await?);
    Ok(())
}

#[test_case(ObjectKind::Connection ; "connection")]
#[test_case(ObjectKind::Credential ; "credential")]
#[test_case(ObjectKind::DisclosedProof ; "disclosed proof")]
#[test_case(ObjectKind::Proof ; "verifier")]
#[test_case(ObjectKind::CredentialDef ; "credential definition")]
#[tokio::test]
async fn test_snapshot_round_trip(kind: ObjectKind) -> eyre::Result<()> {
    let session = common::session(CommunicationMethod::Aries);
    match kind {
        ObjectKind::Connection => {
            let connection = common::accepted_connection(&session, "alice").await;
            round_trip(&connection).await
        }
        ObjectKind::Credential => {
            let offer = common::credential_offer();
            let credential =
                Credential::create_with_offer(Arc::clone(&session), Some("cred"), Some(&offer))
                    .await?;
            round_trip(&credential).await
        }
        ObjectKind::DisclosedProof => {
            let request = common::proof_request();
            let proof =
                DisclosedProof::create_with_request(Arc::clone(&session), Some("proof"), Some(&request))
                    .await?;
            proof.generate_proof("{}", "{}").await?;
            round_trip(&proof).await
        }
        ObjectKind::Proof => {
            let request = ProofRequest {
                requested_attrs: Some(r#"[{"name":"degree"}]"#),
                name: Some("employment"),
                ..ProofRequest::default()
            };
            let verifier = Verifier::create(Arc::clone(&session), Some("verifier"), request).await?;
            round_trip(&verifier).await
        }
        ObjectKind::CredentialDef => {
            let (cred_def, _) =
                CredentialDef::prepare_for_endorser(Arc::clone(&session), Some("def"), PARAMS, Some("endorser"))
                    .await?;
            round_trip(&cred_def).await
        }
    }
}

#[tokio::test]
async fn test_restored_credential_keeps_reading_its_connection() -> eyre::Result<()> {
    let session = common::session(CommunicationMethod::Aries);
    let connection = common::accepted_connection(&session, "issuer").await;
    let offer = common::credential_offer();
    let credential =
        Credential::create_with_offer(Arc::clone(&session), Some("cred"), Some(&offer)).await?;
    credential.send_request(&connection, 0).await?;

    let snapshot = credential.serialize().await?;
    credential.release()?;
    let restored = Credential::deserialize(Arc::clone(&session), &snapshot).await?;
    assert_eq!(restored.get_state().await?, CredentialState::RequestSent);

    let mut issue = common::message("issue-credential/1.0/issue-credential");
    issue["~thread"] = serde_json::json!({ "thid": "offer-1" });
    assert!(common::deliver(&connection, issue));
    assert_eq!(restored.update_state().await?, CredentialState::Accepted);
    Ok(())
}

#[tokio::test]
async fn test_restored_verifier_receives_presentation() -> eyre::Result<()> {
    let session = common::session(CommunicationMethod::Aries);
    let connection = common::accepted_connection(&session, "prover").await;
    let request = ProofRequest {
        requested_attrs: Some(r#"[{"name":"degree"}]"#),
        name: Some("employment"),
        ..ProofRequest::default()
    };
    let verifier = Verifier::create(Arc::clone(&session), Some("verifier"), request).await?;
    verifier.send_proof_request(&connection).await?;

    let restored = Verifier::deserialize(Arc::clone(&session), &verifier.serialize().await?).await?;
    verifier.release()?;

    common::deliver(&connection, common::message("present-proof/1.0/presentation"));
    assert_eq!(restored.update_state().await?, VerifierState::ProofReceived);
    let (_, proof) = restored.get_proof(&connection).await?;
    assert!(proof.is_some());
    assert_eq!(restored.get_state().await?, VerifierState::Accepted);
    Ok(())
}

async fn expect_invalid_handle<P: Protocol>(object: &ProtocolObject<P>) {
    let error = object.get_state().await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidHandle);
    assert_eq!(error.code(), P::KIND.invalid_handle_code().0);
}

#[test_case(ObjectKind::Connection, 1003 ; "connection")]
#[test_case(ObjectKind::Credential, 1053 ; "credential")]
#[test_case(ObjectKind::DisclosedProof, 1049 ; "disclosed proof")]
#[test_case(ObjectKind::Proof, 1017 ; "verifier")]
#[test_case(ObjectKind::CredentialDef, 1037 ; "credential definition")]
#[tokio::test]
async fn test_get_state_on_uninitialized_handle(kind: ObjectKind, code: u32) {
    let session = common::session(CommunicationMethod::Proprietary);
    assert_eq!(kind.invalid_handle_code().0, code);
    match kind {
        ObjectKind::Connection => expect_invalid_handle(&Connection::detached(session, "c")).await,
        ObjectKind::Credential => expect_invalid_handle(&Credential::detached(session, "c")).await,
        ObjectKind::DisclosedProof => {
            expect_invalid_handle(&DisclosedProof::detached(session, "c")).await;
        }
        ObjectKind::Proof => expect_invalid_handle(&Verifier::detached(session, "c")).await,
        ObjectKind::CredentialDef => {
            expect_invalid_handle(&CredentialDef::detached(session, "c")).await;
        }
    }
    // Nothing reached the engine.
}

#[tokio::test]
async fn test_released_handle_is_invalid() {
    let session = common::session(CommunicationMethod::Proprietary);
    let connection = Connection::create(Arc::clone(&session), Some("alice"))
        .await
        .unwrap();
    assert_eq!(common::engine(&session).live_objects(), 1);

    assert_ok!(connection.release());
    assert_eq!(common::engine(&session).live_objects(), 0);

    for error in [
        connection.update_state().await.unwrap_err(),
        connection.update_state_with_message("{}").await.unwrap_err(),
        connection.connect(None).await.unwrap_err(),
        connection.serialize().await.unwrap_err(),
    ] {
        assert_eq!(error.kind(), ErrorKind::InvalidHandle);
        assert_eq!(error.code(), 1003);
    }

    // Releasing again fails locally and never reaches the engine.
    let error = assert_err!(connection.release());
    assert_eq!(error.kind(), ErrorKind::InvalidHandle);
}

#[tokio::test]
async fn test_update_state_without_messages_is_idempotent() {
    let session = common::session(CommunicationMethod::Proprietary);
    let connection = Connection::create(Arc::clone(&session), Some("alice"))
        .await
        .unwrap();
    connection.connect(None).await.unwrap();

    let first = connection.update_state().await.unwrap();
    let second = connection.update_state().await.unwrap();
    assert_eq!(first, ConnectionState::RequestSent);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unmatched_message_is_a_no_op() {
    let session = common::session(CommunicationMethod::Proprietary);
    let connection = Connection::create(Arc::clone(&session), Some("alice"))
        .await
        .unwrap();

    // An ack has no transition out of Initialized.
    let ack = common::message("notification/1.0/ack").to_string();
    let state = connection.update_state_with_message(&ack).await.unwrap();
    assert_eq!(state, ConnectionState::Initialized);

    // Neither does a message for some other protocol.
    common::deliver(&connection, common::message("present-proof/1.0/ack"));
    assert_eq!(
        connection.update_state().await.unwrap(),
        ConnectionState::Initialized
    );
}

#[tokio::test]
async fn test_shutdown_invalidates_every_handle() {
    let session = common::session(CommunicationMethod::Proprietary);
    let connection = Connection::create(Arc::clone(&session), Some("alice"))
        .await
        .unwrap();
    let offer = common::credential_offer();
    let credential = Credential::create_with_offer(Arc::clone(&session), Some("cred"), Some(&offer))
        .await
        .unwrap();
    let generation = session.registry().generation();

    session.shutdown(false).unwrap();
    assert_eq!(session.registry().generation(), generation + 1);
    assert_eq!(session.registry().live(), 0);

    let error = connection.get_state().await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidHandle);
    let error = credential.get_state().await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidHandle);
    // No second release is needed, and one is refused.
    assert!(credential.release().is_err());

    // The session keeps working with new objects.
    let again = Connection::create(Arc::clone(&session), Some("bob")).await.unwrap();
    assert_eq!(again.get_state().await.unwrap(), ConnectionState::Initialized);
}

#[tokio::test]
async fn test_deserialize_rejects_foreign_shapes() {
    let session = common::session(CommunicationMethod::Proprietary);
    let live_before = session.registry().live();

    for snapshot in [
        r#"{"data":{"source_id":"Invalid"}}"#,
        "not json",
        r#"{"version":"1.0","data":{"source_id":"s","thread_id":"t","state":7}}"#,
    ] {
        let error = Credential::deserialize(Arc::clone(&session), snapshot)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidJson, "{snapshot}");
        assert_eq!(error.code(), 1016);
    }
    assert_eq!(session.registry().live(), live_before);
}

#[tokio::test]
async fn test_problem_report_is_absent_until_failure() {
    let session = common::session(CommunicationMethod::Aries);
    let connection = common::accepted_connection(&session, "alice").await;
    let offer = common::credential_offer();
    let credential = Credential::create_with_offer(Arc::clone(&session), Some("cred"), Some(&offer))
        .await
        .unwrap();
    assert_eq!(credential.get_problem_report().await.unwrap(), None);

    credential.send_request(&connection, 0).await.unwrap();
    let mut report = common::message("issue-credential/1.0/problem-report");
    report["description"] = serde_json::json!({ "en": "revoked", "code": "issuance-abandoned" });
    common::deliver(&connection, report.clone());

    assert_eq!(credential.update_state().await.unwrap(), CredentialState::Failed);
    assert_eq!(credential.get_problem_report().await.unwrap(), Some(report));
}

#[tokio::test]
async fn test_session_outlives_its_objects() {
    let session: Arc<Session> = common::session(CommunicationMethod::Proprietary);
    {
        let connection = Connection::create(Arc::clone(&session), Some("alice"))
            .await
            .unwrap();
        connection.release().unwrap();
    }
    assert_eq!(Arc::strong_count(&session), 1);
    assert_eq!(session.adapter().in_flight(), 0);
    assert_eq!(session.adapter().stray_callbacks(), 0);
}
