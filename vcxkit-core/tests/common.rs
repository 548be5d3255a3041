//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use serde_json::{json, Value};
use vcxkit_core::{
    logger,
    native::memory::InMemoryEngine,
    protocol::connection::{Connection, ConnectionState},
    CommunicationMethod, Session, VcxKitConfig,
};

static LOGGING: Once = Once::new();

/// Installs the fmt subscriber once per test binary. Set `RUST_LOG` to see output.
pub fn init_logging() {
    LOGGING.call_once(|| {
        logger::init_tracing(None);
    });
}

/// A fresh test-mode session speaking `method`.
pub fn session(method: CommunicationMethod) -> Arc<Session> {
    init_logging();
    Arc::new(Session::in_memory(VcxKitConfig::test_mode(method)))
}

pub fn engine(session: &Session) -> &InMemoryEngine {
    session
        .test_engine()
        .expect("test sessions run on the in-memory engine")
}

/// An inbound protocol message of the given `@type` suffix.
pub fn message(kind: &str) -> Value {
    json!({
        "@type": format!("https://didcomm.org/{kind}"),
        "@id": uuid::Uuid::new_v4().to_string(),
    })
}

/// Delivers `message` to `connection` and returns whether it was queued.
pub fn deliver(connection: &Connection, message: Value) -> bool {
    let raw = connection.live_handle().expect("connection is live");
    engine(connection.session()).deliver_message(raw, message)
}

/// Drives a fresh connection to `Accepted`.
pub async fn accepted_connection(session: &Arc<Session>, source_id: &str) -> Connection {
    let connection = Connection::create(Arc::clone(session), Some(source_id))
        .await
        .unwrap();
    connection.connect(None).await.unwrap();

    deliver(&connection, message("connections/1.0/response"));
    assert_eq!(
        connection.update_state().await.unwrap(),
        ConnectionState::ResponseReceived
    );
    deliver(&connection, message("notification/1.0/ack"));
    assert_eq!(
        connection.update_state().await.unwrap(),
        ConnectionState::Accepted
    );
    connection
}

/// A credential offer in the array form the engine hands out.
pub fn credential_offer() -> String {
    json!([{
        "@type": "https://didcomm.org/issue-credential/1.0/offer-credential",
        "@id": "offer-1",
        "credential_preview": { "attributes": [{ "name": "degree", "value": "maths" }] },
    }])
    .to_string()
}

/// A presentation request asking for `name` and `degree`.
pub fn proof_request() -> String {
    json!({
        "@id": "request-1",
        "name": "employment",
        "requested_attributes": {
            "name": { "name": "name" },
            "degree": { "name": "degree" },
        },
        "requested_predicates": {},
    })
    .to_string()
}
