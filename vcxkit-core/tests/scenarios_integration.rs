mod common;

use std::sync::Arc;

use serde_json::{json, Value};
use test_case::test_case;
use vcxkit_core::{
    protocol::{
        connection::{Connection, ConnectionState},
        credential::{Credential, CredentialState},
        credential_def::{CredentialDef, CredentialDefParams, CredentialDefState},
        disclosed_proof::{Decline, DisclosedProof, DisclosedProofState},
        verifier::{ProofRequest, ProofState, Verifier, VerifierState},
    },
    CommunicationMethod, ErrorKind, MessageStatus, NativeCode,
};

fn threaded(kind: &str, thread: &str) -> Value {
    let mut message = common::message(kind);
    message["~thread"] = json!({ "thid": thread });
    message
}

#[tokio::test]
async fn test_connect_moves_to_request_sent() {
    let session = common::session(CommunicationMethod::Proprietary);
    let connection = Connection::create(Arc::clone(&session), Some("alice"))
        .await
        .unwrap();
    assert_eq!(connection.source_id(), "alice");
    assert_eq!(
        connection.get_state().await.unwrap(),
        ConnectionState::Initialized
    );

    let invite = connection.connect(None).await.unwrap().unwrap();
    assert_eq!(
        connection.get_state().await.unwrap(),
        ConnectionState::RequestSent
    );
    let invite: Value = serde_json::from_str(&invite).unwrap();
    assert_eq!(invite["label"], "alice");

    // The response cannot arrive before the request went out.
    let accepted = Connection::create(Arc::clone(&session), Some("bob"))
        .await
        .unwrap();
    let response = common::message("connections/1.0/response").to_string();
    assert_eq!(
        accepted.update_state_with_message(&response).await.unwrap(),
        ConnectionState::Initialized
    );
}

#[tokio::test]
async fn test_invitee_accepts_invitation() {
    let session = common::session(CommunicationMethod::Aries);
    let inviter = Connection::create(Arc::clone(&session), Some("inviter"))
        .await
        .unwrap();
    let invite = inviter.invite_details(false).await.unwrap();

    let invitee =
        Connection::create_with_invite(Arc::clone(&session), Some("invitee"), Some(&invite))
            .await
            .unwrap();
    assert_eq!(invitee.connect(None).await.unwrap(), None);
    assert_eq!(
        invitee.get_state().await.unwrap(),
        ConnectionState::RequestSent
    );

    let abbreviated: Value =
        serde_json::from_str(&inviter.invite_details(true).await.unwrap()).unwrap();
    assert_eq!(abbreviated["label"], "inviter");
    assert!(abbreviated.get("recipientKeys").is_none());
}

#[test_case(None, NativeCode::INVALID_OPTION ; "missing invite")]
#[test_case(Some("not-json"), NativeCode::INVALID_INVITE_DETAILS ; "malformed invite")]
#[tokio::test]
async fn test_bad_invitation_is_rejected(invite: Option<&str>, code: NativeCode) {
    let session = common::session(CommunicationMethod::Aries);
    let error = Connection::create_with_invite(Arc::clone(&session), Some("invitee"), invite)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidInput);
    assert_eq!(error.code(), code.0);
    assert_eq!(session.registry().live(), 0);
}

#[tokio::test]
async fn test_messages_need_an_accepted_connection() {
    let session = common::session(CommunicationMethod::Aries);
    let pending = Connection::create(Arc::clone(&session), Some("pending"))
        .await
        .unwrap();
    let error = pending.send_message("hello", "{}").await.unwrap_err();
    assert_eq!(error.code(), NativeCode::CONNECTION_NOT_COMPLETED.0);

    let connection = common::accepted_connection(&session, "alice").await;
    let message_id = connection.send_message("hello", "{}").await.unwrap();
    assert!(!message_id.is_empty());
}

#[tokio::test]
async fn test_redirected_connection() {
    let session = common::session(CommunicationMethod::Aries);
    let connection = Connection::create(Arc::clone(&session), Some("alice"))
        .await
        .unwrap();
    connection.connect(None).await.unwrap();
    let redirect = common::message("connections/1.0/redirect").to_string();
    assert_eq!(
        connection.update_state_with_message(&redirect).await.unwrap(),
        ConnectionState::Redirected
    );
}

#[test_case(Some("cred") ; "with source id")]
#[test_case(None ; "without source id")]
#[tokio::test]
async fn test_accept_offer(source_id: Option<&str>) {
    let session = common::session(CommunicationMethod::Proprietary);
    let connection = common::accepted_connection(&session, "issuer").await;
    let offer = common::credential_offer();

    let result = Credential::accept_offer(Arc::clone(&session), source_id, Some(&offer), &connection).await;
    match source_id {
        Some(source_id) => {
            let credential = result.unwrap();
            assert_eq!(credential.source_id(), source_id);
            assert_eq!(
                credential.get_state().await.unwrap(),
                CredentialState::RequestSent
            );
        }
        None => {
            let error = result.unwrap_err();
            assert_eq!(error.kind(), ErrorKind::InvalidInput);
            assert_eq!(error.code(), NativeCode::INVALID_OPTION.0);
            // Only the connection is registered.
            assert_eq!(session.registry().live(), 1);
        }
    }
}

#[tokio::test]
async fn test_malformed_offer() {
    let session = common::session(CommunicationMethod::Proprietary);
    let error = Credential::create_with_offer(Arc::clone(&session), Some("cred"), Some("not-json"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidInput);
    assert_eq!(error.code(), NativeCode::INVALID_CREDENTIAL_OFFER.0);
    assert_eq!(session.registry().live(), 0);
}

#[tokio::test]
async fn test_credential_issuance_over_connection() {
    let session = common::session(CommunicationMethod::Aries);
    let connection = common::accepted_connection(&session, "issuer").await;

    let mut offer = common::message("issue-credential/1.0/offer-credential");
    offer["@id"] = json!("offer-2");
    assert!(common::deliver(&connection, offer));

    let offers: Vec<Value> =
        serde_json::from_str(&Credential::get_offers(&session, &connection).await.unwrap()).unwrap();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0]["@id"], "offer-2");

    let (credential, payload) = Credential::create_with_msg_id(
        Arc::clone(&session),
        Some("degree"),
        Some(&connection),
        Some("offer-2"),
    )
    .await
    .unwrap();
    let payload: Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(payload["@id"], "offer-2");
    assert_eq!(
        credential.get_state().await.unwrap(),
        CredentialState::OfferReceived
    );

    credential.send_request(&connection, 0).await.unwrap();
    assert_eq!(
        credential.get_state().await.unwrap(),
        CredentialState::RequestSent
    );

    // An issue for another thread stays queued.
    common::deliver(&connection, threaded("issue-credential/1.0/issue-credential", "other"));
    assert_eq!(
        credential.update_state().await.unwrap(),
        CredentialState::RequestSent
    );

    common::deliver(&connection, threaded("issue-credential/1.0/issue-credential", "offer-2"));
    assert_eq!(
        credential.update_state().await.unwrap(),
        CredentialState::Accepted
    );
    assert_eq!(common::engine(&session).pending_messages(connection.live_handle().unwrap()), 1);
}

#[tokio::test]
async fn test_create_with_msg_id_without_connection() {
    let session = common::session(CommunicationMethod::Aries);

    let error = Credential::create_with_msg_id(Arc::clone(&session), Some("cred"), None, Some("id"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Unknown);
    assert_eq!(error.code(), NativeCode::UNKNOWN_ERROR.0);

    let detached = Connection::detached(Arc::clone(&session), "nobody");
    let error = DisclosedProof::create_with_msg_id(
        Arc::clone(&session),
        Some("proof"),
        Some(&detached),
        Some("id"),
    )
    .await
    .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidHandle);
    assert_eq!(error.code(), NativeCode::INVALID_CONNECTION_HANDLE.0);
}

#[tokio::test]
async fn test_create_with_unknown_msg_id() {
    let session = common::session(CommunicationMethod::Aries);
    let connection = common::accepted_connection(&session, "issuer").await;
    let error = Credential::create_with_msg_id(
        Arc::clone(&session),
        Some("cred"),
        Some(&connection),
        Some("missing"),
    )
    .await
    .unwrap_err();
    assert_eq!(error.code(), NativeCode::UNKNOWN_ERROR.0);
    assert_eq!(session.registry().live(), 1);
}

#[tokio::test]
async fn test_credential_reject_keeps_comment() {
    let session = common::session(CommunicationMethod::Aries);
    let connection = common::accepted_connection(&session, "issuer").await;
    let offer = common::credential_offer();
    let credential = Credential::create_with_offer(Arc::clone(&session), Some("cred"), Some(&offer))
        .await
        .unwrap();

    credential.reject(&connection, Some("not interested")).await.unwrap();
    assert_eq!(
        credential.get_state().await.unwrap(),
        CredentialState::Rejected
    );
    let report = credential.get_problem_report().await.unwrap().unwrap();
    assert_eq!(report["description"]["en"], "not interested");
    assert_eq!(report["~thread"]["thid"], "offer-1");
}

#[tokio::test]
async fn test_endorser_credential_definition() {
    let session = common::session(CommunicationMethod::Proprietary);
    let params = CredentialDefParams {
        name: Some("degree"),
        schema_id: Some("schema-1"),
        issuer_did: Some("did-1"),
        tag: Some("tag1"),
        revocation_details: None,
    };
    let (cred_def, transaction) =
        CredentialDef::prepare_for_endorser(Arc::clone(&session), Some("def"), params, Some("endorser-did"))
            .await
            .unwrap();
    let transaction: Value = serde_json::from_str(&transaction).unwrap();
    assert_eq!(transaction["endorser"], "endorser-did");
    assert_eq!(cred_def.get_state().await.unwrap(), CredentialDefState::Built);

    assert_eq!(
        cred_def.update_state().await.unwrap(),
        CredentialDefState::Published
    );
    // Publication never goes back.
    assert_eq!(
        cred_def.update_state().await.unwrap(),
        CredentialDefState::Published
    );
    assert_eq!(
        cred_def.get_cred_def_id().await.unwrap(),
        "did-1:3:CL:schema-1:tag1"
    );

    let error = cred_def.update_state_with_message("{}").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ActionNotSupported);
}

#[tokio::test]
async fn test_credential_definition_from_ledger() {
    let session = common::session(CommunicationMethod::Proprietary);
    let cred_def = CredentialDef::create_with_id(
        Arc::clone(&session),
        Some("def"),
        Some("did:3:CL:1:tag"),
        None,
        None,
    )
    .await
    .unwrap();
    assert_eq!(
        cred_def.get_state().await.unwrap(),
        CredentialDefState::Published
    );
    assert_eq!(cred_def.get_cred_def_id().await.unwrap(), "did:3:CL:1:tag");

    let error = CredentialDef::create_with_id(Arc::clone(&session), Some("def"), None, None, None)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_reject_unsupported_with_proprietary_method() {
    let session = common::session(CommunicationMethod::Proprietary);
    let connection = common::accepted_connection(&session, "verifier").await;
    let request = common::proof_request();
    let proof =
        DisclosedProof::create_with_request(Arc::clone(&session), Some("proof"), Some(&request))
            .await
            .unwrap();

    let error = proof.reject(&connection).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ActionNotSupported);
    assert_eq!(error.code(), NativeCode::ACTION_NOT_SUPPORTED.0);
    assert_eq!(
        proof.get_state().await.unwrap(),
        DisclosedProofState::RequestReceived
    );

    let error = proof
        .decline(&connection, Decline::Reason("no".into()))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ActionNotSupported);
}

#[tokio::test]
async fn test_unsupported_action_wins_over_released_connection() {
    let session = common::session(CommunicationMethod::Proprietary);
    let connection = common::accepted_connection(&session, "peer").await;
    let request = common::proof_request();
    let proof =
        DisclosedProof::create_with_request(Arc::clone(&session), Some("proof"), Some(&request))
            .await
            .unwrap();
    let offer = common::credential_offer();
    let credential = Credential::create_with_offer(Arc::clone(&session), Some("cred"), Some(&offer))
        .await
        .unwrap();
    connection.release().unwrap();

    let error = proof.reject(&connection).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ActionNotSupported);
    assert_eq!(error.code(), NativeCode::ACTION_NOT_SUPPORTED.0);

    let error = proof
        .decline_presentation_request(&connection, Some("busy"), Some("{}"))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ActionNotSupported);

    let error = credential.reject(&connection, Some("no")).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ActionNotSupported);
    assert_eq!(
        proof.get_state().await.unwrap(),
        DisclosedProofState::RequestReceived
    );
}

#[tokio::test]
async fn test_presentation_over_connection() {
    let session = common::session(CommunicationMethod::Aries);
    let connection = common::accepted_connection(&session, "verifier").await;

    let mut request = common::message("present-proof/1.0/request-presentation");
    request["@id"] = json!("request-2");
    request["requested_attributes"] = json!({ "degree": { "name": "degree" } });
    common::deliver(&connection, request);

    let requests: Vec<Value> = serde_json::from_str(
        &DisclosedProof::get_requests(&session, &connection)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(requests.len(), 1);

    let (proof, _) = DisclosedProof::create_with_msg_id(
        Arc::clone(&session),
        Some("proof"),
        Some(&connection),
        Some("request-2"),
    )
    .await
    .unwrap();

    let credentials: Value =
        serde_json::from_str(&proof.retrieve_credentials().await.unwrap()).unwrap();
    assert_eq!(credentials, json!({ "attrs": { "degree": [] } }));

    let error = proof.send_proof(&connection).await.unwrap_err();
    assert_eq!(error.code(), NativeCode::NOT_READY.0);

    let error = proof.generate_proof("not json", "{}").await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidJson);

    proof.generate_proof("{}", r#"{"name":"alice"}"#).await.unwrap();
    assert_eq!(
        proof.get_state().await.unwrap(),
        DisclosedProofState::Generated
    );
    proof.send_proof(&connection).await.unwrap();
    assert_eq!(proof.get_state().await.unwrap(), DisclosedProofState::Sent);

    common::deliver(&connection, threaded("present-proof/1.0/ack", "request-2"));
    assert_eq!(
        proof.update_state().await.unwrap(),
        DisclosedProofState::Accepted
    );
}

#[test_case(Some("busy"), None, true ; "reason")]
#[test_case(None, Some(r#"{"attributes":[]}"#), true ; "proposal")]
#[test_case(Some("busy"), Some("{}"), false ; "both")]
#[test_case(None, None, false ; "neither")]
#[tokio::test]
async fn test_decline_presentation_request(
    reason: Option<&str>,
    proposal: Option<&str>,
    accepted: bool,
) {
    let session = common::session(CommunicationMethod::Aries);
    let connection = common::accepted_connection(&session, "verifier").await;
    let request = common::proof_request();
    let proof =
        DisclosedProof::create_with_request(Arc::clone(&session), Some("proof"), Some(&request))
            .await
            .unwrap();

    let result = proof
        .decline_presentation_request(&connection, reason, proposal)
        .await;
    if accepted {
        result.unwrap();
        assert_eq!(
            proof.get_state().await.unwrap(),
            DisclosedProofState::Declined
        );
    } else {
        let error = result.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
        assert_eq!(error.code(), NativeCode::INCOMPATIBLE_PARAMETERS.0);
        assert_eq!(
            proof.get_state().await.unwrap(),
            DisclosedProofState::RequestReceived
        );
    }
}

#[test_case(json!({}), ProofState::Validated, VerifierState::Accepted ; "valid presentation")]
#[test_case(json!({ "verified": false }), ProofState::Invalid, VerifierState::Rejected ; "invalid presentation")]
#[tokio::test]
async fn test_verifier_checks_presentation(
    fields: Value,
    expected: ProofState,
    final_state: VerifierState,
) {
    let session = common::session(CommunicationMethod::Aries);
    let connection = common::accepted_connection(&session, "prover").await;
    let request = ProofRequest {
        requested_attrs: Some(r#"[{"name":"degree"}]"#),
        name: Some("employment"),
        ..ProofRequest::default()
    };
    let verifier = Verifier::create(Arc::clone(&session), Some("verifier"), request)
        .await
        .unwrap();
    assert_eq!(
        verifier.get_state().await.unwrap(),
        VerifierState::Initialized
    );

    verifier.send_proof_request(&connection).await.unwrap();
    let error = verifier.get_proof(&connection).await.unwrap_err();
    assert_eq!(error.code(), NativeCode::NOT_READY.0);

    let mut presentation = common::message("present-proof/1.0/presentation");
    if let (Some(target), Some(fields)) = (presentation.as_object_mut(), fields.as_object()) {
        target.extend(fields.clone());
    }
    common::deliver(&connection, presentation.clone());
    assert_eq!(
        verifier.update_state().await.unwrap(),
        VerifierState::ProofReceived
    );

    let (state, proof) = verifier.get_proof(&connection).await.unwrap();
    assert_eq!(state, expected);
    let proof: Value = serde_json::from_str(&proof.unwrap()).unwrap();
    assert_eq!(proof, presentation);
    assert_eq!(verifier.get_state().await.unwrap(), final_state);
}

#[tokio::test]
async fn test_verifier_rejects_malformed_attributes() {
    let session = common::session(CommunicationMethod::Aries);
    let request = ProofRequest {
        requested_attrs: Some("not json"),
        name: Some("employment"),
        ..ProofRequest::default()
    };
    let error = Verifier::create(Arc::clone(&session), Some("verifier"), request)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidJson);
}

#[tokio::test]
async fn test_update_message_status() {
    let session = common::session(CommunicationMethod::Aries);
    let uids = r#"[{"pairwiseDID":"did","uids":["a","b"]}]"#;
    session
        .update_messages(&MessageStatus::REVIEWED, uids)
        .await
        .unwrap();
    assert_eq!(
        common::engine(&session).message_statuses(),
        vec![("MS-106".to_owned(), uids.to_owned())]
    );

    let error = session
        .update_messages(&MessageStatus::REVIEWED, "{}")
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidJson);
}
