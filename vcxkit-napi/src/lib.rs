use std::sync::Arc;

use napi::{bindgen_prelude::ToNapiValue, Env, JsObject, Status};
use vcxkit_core::{
  logger,
  protocol::{
    connection::Connection,
    credential::Credential,
    credential_def::{CredentialDef, CredentialDefParams},
    disclosed_proof::DisclosedProof,
    verifier::{ProofRequest, Verifier},
    ProtocolState,
  },
  wallet::{Wallet, WalletSearch},
  ErrorKind, MessageStatus, NativeCode, Session, VcxKitError,
};

#[macro_use]
extern crate napi_derive;

/// Errors reach JavaScript as `[code] kind: message`.
fn to_napi(error: VcxKitError) -> napi::Error {
  napi::Error::new(
    Status::GenericFailure,
    format!("[{}] {}: {}", error.code(), error.kind(), error.message()),
  )
}

fn js<T>(result: Result<T, VcxKitError>) -> napi::Result<T> {
  result.map_err(to_napi)
}

/// Resolves to `{ [name]: object, [payload_name]: payload }` for constructors that
/// hand back a payload along with the new object.
fn with_payload<T: ToNapiValue>(
  env: &mut Env,
  name: &str,
  object: T,
  payload_name: &str,
  payload: String,
) -> napi::Result<JsObject> {
  let mut out = env.create_object()?;
  out.set_named_property(name, object)?;
  out.set_named_property(payload_name, payload)?;
  Ok(out)
}

/// Installs a fmt subscriber. `filter` uses `RUST_LOG` syntax.
#[napi]
pub fn init_logging(filter: Option<String>) -> bool {
  logger::init_tracing(filter.as_deref())
}

#[napi(js_name = "VcxSession")]
pub struct JsSession {
  inner: Arc<Session>,
}

/// Builds a session from a JSON configuration and initializes the engine.
#[napi]
pub async fn init_session(config: String) -> napi::Result<JsSession> {
  let session = js(Session::from_config_json(&config))?;
  js(session.init().await)?;
  Ok(JsSession {
    inner: Arc::new(session),
  })
}

#[napi]
impl JsSession {
  #[napi]
  pub fn version(&self) -> String {
    self.inner.version()
  }

  #[napi]
  pub fn error_message(&self, code: u32) -> Option<String> {
    self.inner.error_message(code)
  }

  #[napi]
  pub fn shutdown(&self, delete_wallet: bool) -> napi::Result<()> {
    js(self.inner.shutdown(delete_wallet))
  }

  #[napi]
  pub async fn update_messages(&self, status: String, pairwise_uids: String) -> napi::Result<()> {
    js(
      self
        .inner
        .update_messages(&MessageStatus::from(status), &pairwise_uids)
        .await,
    )
  }

  /// Queues an inbound message on `connection`. Test mode only.
  #[napi]
  pub fn deliver_message(&self, connection: &JsConnection, message: String) -> napi::Result<bool> {
    let engine = self.inner.test_engine().ok_or_else(|| {
      to_napi(VcxKitError::new(
        ErrorKind::ActionNotSupported,
        NativeCode::ACTION_NOT_SUPPORTED,
        "messages can only be delivered in test mode",
      ))
    })?;
    let raw = js(connection.inner.live_handle())?;
    let message = js(serde_json::from_str(&message).map_err(VcxKitError::from))?;
    Ok(engine.deliver_message(raw, message))
  }
}

/// The lifecycle shared by every protocol object class.
macro_rules! js_protocol_object {
  ($js:ident, $name:literal, $core:ty, $deserialize:ident) => {
    #[napi(js_name = $name)]
    pub struct $js {
      inner: Arc<$core>,
    }

    impl $js {
      fn wrap(inner: $core) -> Self {
        Self {
          inner: Arc::new(inner),
        }
      }
    }

    #[napi]
    impl $js {
      #[napi(getter)]
      pub fn source_id(&self) -> String {
        self.inner.source_id().to_owned()
      }

      #[napi]
      pub async fn get_state(&self) -> napi::Result<u32> {
        js(self.inner.get_state().await).map(ProtocolState::ordinal)
      }

      #[napi]
      pub async fn update_state(&self) -> napi::Result<u32> {
        js(self.inner.update_state().await).map(ProtocolState::ordinal)
      }

      #[napi]
      pub async fn update_state_with_message(&self, message: String) -> napi::Result<u32> {
        js(self.inner.update_state_with_message(&message).await).map(ProtocolState::ordinal)
      }

      #[napi]
      pub async fn serialize(&self) -> napi::Result<String> {
        js(self.inner.serialize().await)
      }

      #[napi]
      pub fn release(&self) -> napi::Result<()> {
        js(self.inner.release())
      }

      #[napi]
      pub async fn get_problem_report(&self) -> napi::Result<Option<String>> {
        js(self.inner.get_problem_report().await).map(|report| report.map(|r| r.to_string()))
      }
    }

    #[napi]
    pub fn $deserialize(env: Env, session: &JsSession, snapshot: String) -> napi::Result<JsObject> {
      let session = Arc::clone(&session.inner);
      env.spawn_future(async move { js(<$core>::deserialize(session, &snapshot).await).map($js::wrap) })
    }
  };
}

js_protocol_object!(JsConnection, "Connection", Connection, deserialize_connection);
js_protocol_object!(JsCredential, "Credential", Credential, deserialize_credential);
js_protocol_object!(JsDisclosedProof, "DisclosedProof", DisclosedProof, deserialize_disclosed_proof);
js_protocol_object!(JsVerifier, "Verifier", Verifier, deserialize_verifier);
js_protocol_object!(JsCredentialDef, "CredentialDef", CredentialDef, deserialize_credential_def);

#[napi]
pub fn create_connection(env: Env, session: &JsSession, source_id: Option<String>) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  env.spawn_future(async move {
    js(Connection::create(session, source_id.as_deref()).await).map(JsConnection::wrap)
  })
}

#[napi]
pub fn create_connection_with_invite(
  env: Env,
  session: &JsSession,
  source_id: Option<String>,
  invite: Option<String>,
) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  env.spawn_future(async move {
    js(Connection::create_with_invite(session, source_id.as_deref(), invite.as_deref()).await)
      .map(JsConnection::wrap)
  })
}

#[napi]
pub fn create_connection_with_outofband_invite(
  env: Env,
  session: &JsSession,
  source_id: Option<String>,
  invite: Option<String>,
) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  env.spawn_future(async move {
    js(Connection::create_with_outofband_invite(session, source_id.as_deref(), invite.as_deref()).await)
      .map(JsConnection::wrap)
  })
}

#[napi]
impl JsConnection {
  #[napi]
  pub async fn connect(&self, options: Option<String>) -> napi::Result<Option<String>> {
    js(self.inner.connect(options.as_deref()).await)
  }

  #[napi]
  pub async fn invite_details(&self, abbreviated: bool) -> napi::Result<String> {
    js(self.inner.invite_details(abbreviated).await)
  }

  #[napi]
  pub async fn send_message(&self, message: String, options: String) -> napi::Result<String> {
    js(self.inner.send_message(&message, &options).await)
  }
}

#[napi]
pub fn create_credential_with_offer(
  env: Env,
  session: &JsSession,
  source_id: Option<String>,
  offer: Option<String>,
) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  env.spawn_future(async move {
    js(Credential::create_with_offer(session, source_id.as_deref(), offer.as_deref()).await)
      .map(JsCredential::wrap)
  })
}

#[napi]
pub fn accept_credential_offer(
  env: Env,
  session: &JsSession,
  source_id: Option<String>,
  offer: Option<String>,
  connection: &JsConnection,
) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  let connection = Arc::clone(&connection.inner);
  env.spawn_future(async move {
    js(Credential::accept_offer(session, source_id.as_deref(), offer.as_deref(), &connection).await)
      .map(JsCredential::wrap)
  })
}

#[napi]
pub fn get_credential_offers(env: Env, session: &JsSession, connection: &JsConnection) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  let connection = Arc::clone(&connection.inner);
  env.spawn_future(async move { js(Credential::get_offers(&session, &connection).await) })
}

/// Resolves to `{ credential, offer }`.
#[napi(ts_return_type = "Promise<{ credential: Credential, offer: string }>")]
pub fn create_credential_with_msg_id(
  env: Env,
  session: &JsSession,
  source_id: Option<String>,
  connection: &JsConnection,
  msg_id: Option<String>,
) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  let connection = Arc::clone(&connection.inner);
  env.execute_tokio_future(
    async move {
      js(Credential::create_with_msg_id(session, source_id.as_deref(), Some(connection.as_ref()), msg_id.as_deref()).await)
    },
    |env, (credential, offer)| with_payload(env, "credential", JsCredential::wrap(credential), "offer", offer),
  )
}

#[napi]
impl JsCredential {
  #[napi]
  pub fn send_request(&self, env: Env, connection: &JsConnection, payment_handle: u32) -> napi::Result<JsObject> {
    let credential = Arc::clone(&self.inner);
    let connection = Arc::clone(&connection.inner);
    env.spawn_future(async move { js(credential.send_request(&connection, payment_handle).await) })
  }

  #[napi]
  pub fn reject(&self, env: Env, connection: &JsConnection, comment: Option<String>) -> napi::Result<JsObject> {
    let credential = Arc::clone(&self.inner);
    let connection = Arc::clone(&connection.inner);
    env.spawn_future(async move { js(credential.reject(&connection, comment.as_deref()).await) })
  }
}

#[napi]
pub fn create_disclosed_proof_with_request(
  env: Env,
  session: &JsSession,
  source_id: Option<String>,
  request: Option<String>,
) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  env.spawn_future(async move {
    js(DisclosedProof::create_with_request(session, source_id.as_deref(), request.as_deref()).await)
      .map(JsDisclosedProof::wrap)
  })
}

#[napi]
pub fn get_proof_requests(env: Env, session: &JsSession, connection: &JsConnection) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  let connection = Arc::clone(&connection.inner);
  env.spawn_future(async move { js(DisclosedProof::get_requests(&session, &connection).await) })
}

/// Resolves to `{ proof, request }`.
#[napi(ts_return_type = "Promise<{ proof: DisclosedProof, request: string }>")]
pub fn create_disclosed_proof_with_msg_id(
  env: Env,
  session: &JsSession,
  source_id: Option<String>,
  connection: &JsConnection,
  msg_id: Option<String>,
) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  let connection = Arc::clone(&connection.inner);
  env.execute_tokio_future(
    async move {
      js(
        DisclosedProof::create_with_msg_id(session, source_id.as_deref(), Some(connection.as_ref()), msg_id.as_deref())
          .await,
      )
    },
    |env, (proof, request)| with_payload(env, "proof", JsDisclosedProof::wrap(proof), "request", request),
  )
}

#[napi]
impl JsDisclosedProof {
  #[napi]
  pub async fn retrieve_credentials(&self) -> napi::Result<String> {
    js(self.inner.retrieve_credentials().await)
  }

  #[napi]
  pub async fn generate_proof(&self, selected_credentials: String, self_attested_attrs: String) -> napi::Result<()> {
    js(
      self
        .inner
        .generate_proof(&selected_credentials, &self_attested_attrs)
        .await,
    )
  }

  #[napi]
  pub fn send_proof(&self, env: Env, connection: &JsConnection) -> napi::Result<JsObject> {
    let proof = Arc::clone(&self.inner);
    let connection = Arc::clone(&connection.inner);
    env.spawn_future(async move { js(proof.send_proof(&connection).await) })
  }

  #[napi]
  pub fn reject(&self, env: Env, connection: &JsConnection) -> napi::Result<JsObject> {
    let proof = Arc::clone(&self.inner);
    let connection = Arc::clone(&connection.inner);
    env.spawn_future(async move { js(proof.reject(&connection).await) })
  }

  #[napi]
  pub fn decline_presentation_request(
    &self,
    env: Env,
    connection: &JsConnection,
    reason: Option<String>,
    proposal: Option<String>,
  ) -> napi::Result<JsObject> {
    let proof = Arc::clone(&self.inner);
    let connection = Arc::clone(&connection.inner);
    env.spawn_future(async move {
      js(
        proof
          .decline_presentation_request(&connection, reason.as_deref(), proposal.as_deref())
          .await,
      )
    })
  }
}

#[napi(object)]
pub struct ProofRequestOptions {
  pub requested_attrs: Option<String>,
  pub requested_predicates: Option<String>,
  pub revocation_interval: Option<String>,
  pub name: Option<String>,
}

#[napi(object)]
pub struct VerifiedProof {
  pub state: u32,
  pub proof: Option<String>,
}

#[napi]
pub fn create_verifier(
  env: Env,
  session: &JsSession,
  source_id: Option<String>,
  request: ProofRequestOptions,
) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  env.spawn_future(async move {
    let request = ProofRequest {
      requested_attrs: request.requested_attrs.as_deref(),
      requested_predicates: request.requested_predicates.as_deref(),
      revocation_interval: request.revocation_interval.as_deref(),
      name: request.name.as_deref(),
    };
    js(Verifier::create(session, source_id.as_deref(), request).await).map(JsVerifier::wrap)
  })
}

#[napi]
pub fn create_verifier_with_proposal(
  env: Env,
  session: &JsSession,
  source_id: Option<String>,
  proposal: Option<String>,
  name: Option<String>,
) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  env.spawn_future(async move {
    js(Verifier::create_with_proposal(session, source_id.as_deref(), proposal.as_deref(), name.as_deref()).await)
      .map(JsVerifier::wrap)
  })
}

#[napi]
impl JsVerifier {
  #[napi]
  pub fn send_proof_request(&self, env: Env, connection: &JsConnection) -> napi::Result<JsObject> {
    let verifier = Arc::clone(&self.inner);
    let connection = Arc::clone(&connection.inner);
    env.spawn_future(async move { js(verifier.send_proof_request(&connection).await) })
  }

  #[napi]
  pub fn get_proof(&self, env: Env, connection: &JsConnection) -> napi::Result<JsObject> {
    let verifier = Arc::clone(&self.inner);
    let connection = Arc::clone(&connection.inner);
    env.spawn_future(async move {
      let (state, proof) = js(verifier.get_proof(&connection).await)?;
      Ok(VerifiedProof {
        state: state as u32,
        proof,
      })
    })
  }
}

#[napi(object)]
pub struct CredentialDefOptions {
  pub name: Option<String>,
  pub schema_id: Option<String>,
  pub issuer_did: Option<String>,
  pub tag: Option<String>,
  pub revocation_details: Option<String>,
}

impl CredentialDefOptions {
  fn params(&self) -> CredentialDefParams<'_> {
    CredentialDefParams {
      name: self.name.as_deref(),
      schema_id: self.schema_id.as_deref(),
      issuer_did: self.issuer_did.as_deref(),
      tag: self.tag.as_deref(),
      revocation_details: self.revocation_details.as_deref(),
    }
  }
}

#[napi]
pub fn create_credential_def(
  env: Env,
  session: &JsSession,
  source_id: Option<String>,
  options: CredentialDefOptions,
  payment_handle: u32,
) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  env.spawn_future(async move {
    js(CredentialDef::create(session, source_id.as_deref(), options.params(), payment_handle).await)
      .map(JsCredentialDef::wrap)
  })
}

/// Resolves to `{ credentialDef, transaction }`. The definition stays `Built` until the
/// endorser has written it and `updateState` is called.
#[napi(ts_return_type = "Promise<{ credentialDef: CredentialDef, transaction: string }>")]
pub fn prepare_credential_def_for_endorser(
  env: Env,
  session: &JsSession,
  source_id: Option<String>,
  options: CredentialDefOptions,
  endorser: Option<String>,
) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  env.execute_tokio_future(
    async move {
      js(
        CredentialDef::prepare_for_endorser(session, source_id.as_deref(), options.params(), endorser.as_deref())
          .await,
      )
    },
    |env, (cred_def, transaction)| {
      with_payload(env, "credentialDef", JsCredentialDef::wrap(cred_def), "transaction", transaction)
    },
  )
}

#[napi]
pub fn create_credential_def_with_id(
  env: Env,
  session: &JsSession,
  source_id: Option<String>,
  cred_def_id: Option<String>,
  issuer_did: Option<String>,
  revocation_config: Option<String>,
) -> napi::Result<JsObject> {
  let session = Arc::clone(&session.inner);
  env.spawn_future(async move {
    js(
      CredentialDef::create_with_id(
        session,
        source_id.as_deref(),
        cred_def_id.as_deref(),
        issuer_did.as_deref(),
        revocation_config.as_deref(),
      )
      .await,
    )
    .map(JsCredentialDef::wrap)
  })
}

#[napi]
impl JsCredentialDef {
  #[napi]
  pub async fn get_cred_def_id(&self) -> napi::Result<String> {
    js(self.inner.get_cred_def_id().await)
  }
}

#[napi(js_name = "Wallet")]
pub struct JsWallet {
  inner: Wallet,
}

#[napi]
impl JsWallet {
  #[napi(constructor)]
  pub fn new(session: &JsSession) -> Self {
    JsWallet {
      inner: Wallet::new(Arc::clone(&session.inner)),
    }
  }

  #[napi]
  pub async fn add_record(&self, record_type: String, id: String, value: String, tags: Option<String>) -> napi::Result<()> {
    js(self.inner.add_record(&record_type, &id, &value, tags.as_deref()).await)
  }

  #[napi]
  pub async fn get_record(&self, record_type: String, id: String, options: Option<String>) -> napi::Result<String> {
    js(self.inner.get_record(&record_type, &id, options.as_deref()).await)
  }

  #[napi]
  pub async fn update_record_value(&self, record_type: String, id: String, value: String) -> napi::Result<()> {
    js(self.inner.update_record_value(&record_type, &id, &value).await)
  }

  #[napi]
  pub async fn delete_record(&self, record_type: String, id: String) -> napi::Result<()> {
    js(self.inner.delete_record(&record_type, &id).await)
  }

  #[napi]
  pub async fn open_search(&self, record_type: String, query: String, options: Option<String>) -> napi::Result<JsWalletSearch> {
    let search = js(self.inner.open_search(&record_type, &query, options.as_deref()).await)?;
    Ok(JsWalletSearch { inner: search })
  }
}

#[napi(js_name = "WalletSearch")]
pub struct JsWalletSearch {
  inner: WalletSearch,
}

#[napi]
impl JsWalletSearch {
  #[napi]
  pub async fn next_records(&self, count: u32) -> napi::Result<String> {
    js(self.inner.next_records(count).await)
  }

  #[napi]
  pub async fn close(&self) -> napi::Result<()> {
    js(self.inner.close().await)
  }
}
