//! The in-memory engine used in test mode.
//!
//! It behaves like the native library for everything the binding can observe: handles
//! are opaque non-zero integers, snapshots round-trip byte for byte, completions are
//! delivered from another thread, and required arguments are checked before a call is
//! accepted. Protocol messages are plain JSON values matched on the suffix of their
//! `@type` and on `~thread.thid`. Tests push inbound messages onto a connection with
//! [`InMemoryEngine::deliver_message`].
//!
//! A received presentation is valid unless it carries `"verified": false`.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{
    Action, CommandHandle, CreateInput, NativeCallback, NativeEngine, NativeValue, ObjectKind,
};
use crate::{
    code::NativeCode,
    config::CommunicationMethod,
    protocol::{
        connection::ConnectionState, credential::CredentialState,
        credential_def::CredentialDefState, disclosed_proof::DisclosedProofState,
        verifier::{ProofState, VerifierState},
        Descriptor,
    },
};

const SNAPSHOT_VERSION: &str = "1.0";

const CONNECTION_RESPONSE: &str = "connections/1.0/response";
const CONNECTION_ACK: &str = "notification/1.0/ack";
const CONNECTION_PROBLEM_REPORT: &str = "connections/1.0/problem_report";
const CONNECTION_REDIRECT: &str = "connections/1.0/redirect";
const CREDENTIAL_OFFER: &str = "issue-credential/1.0/offer-credential";
const CREDENTIAL_ISSUE: &str = "issue-credential/1.0/issue-credential";
const CREDENTIAL_PROBLEM_REPORT: &str = "issue-credential/1.0/problem-report";
const PRESENTATION_REQUEST: &str = "present-proof/1.0/request-presentation";
const PRESENTATION: &str = "present-proof/1.0/presentation";
const PRESENTATION_ACK: &str = "present-proof/1.0/ack";
const PRESENTATION_PROBLEM_REPORT: &str = "present-proof/1.0/problem-report";

type Outcome = Result<Vec<NativeValue>, NativeCode>;

/// `{"version": .., "data": ..}` as stored and produced by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    version: String,
    data: ObjectData,
}

/// Optional fields distinguish "absent" from an explicit empty or `null` value so that
/// a snapshot serializes back exactly as it was read.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ObjectData {
    source_id: String,
    thread_id: String,
    state: u32,
    /// The connection whose inbox feeds this object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    connection: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<Map<String, Value>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    problem_report: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Keeps an explicit `null` as `Some(Value::Null)`; a missing key falls back to `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug)]
struct MemoryObject {
    kind: ObjectKind,
    version: String,
    data: ObjectData,
}

impl MemoryObject {
    fn new(kind: ObjectKind, source_id: &str, thread_id: String, payload: Map<String, Value>) -> Self {
        Self {
            kind,
            version: SNAPSHOT_VERSION.to_owned(),
            data: ObjectData {
                source_id: source_id.to_owned(),
                thread_id,
                state: Descriptor::for_kind(kind).initial,
                connection: None,
                payload: Some(payload),
                problem_report: None,
                extra: Map::new(),
            },
        }
    }

    /// Moves to `to` if the kind's transition table allows it.
    fn transition(&mut self, to: u32) -> Result<(), NativeCode> {
        if Descriptor::for_kind(self.kind).allows(self.data.state, to) {
            self.data.state = to;
            Ok(())
        } else {
            Err(NativeCode::INVALID_STATE)
        }
    }

    fn payload_value(&self, key: &str) -> Option<&Value> {
        self.data.payload.as_ref().and_then(|payload| payload.get(key))
    }

    fn payload_mut(&mut self) -> &mut Map<String, Value> {
        self.data.payload.get_or_insert_with(Map::new)
    }

    /// The stored problem report, treating an explicit `null` as none.
    fn stored_problem_report(&self) -> Option<&Value> {
        self.data.problem_report.as_ref().filter(|report| !report.is_null())
    }

    fn payload_str(&self, key: &str) -> Option<String> {
        self.payload_value(key).map(|value| match value {
            Value::String(value) => value.clone(),
            other => other.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
struct WalletRecord {
    value: String,
    tags: Map<String, Value>,
}

#[derive(Debug)]
struct WalletSearch {
    records: Vec<Value>,
    cursor: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordOptions {
    #[serde(default)]
    retrieve_type: bool,
    #[serde(default = "yes")]
    retrieve_value: bool,
    #[serde(default)]
    retrieve_tags: bool,
}

const fn yes() -> bool {
    true
}

impl RecordOptions {
    fn render(&self, record_type: &str, id: &str, record: &WalletRecord) -> Value {
        json!({
            "id": id,
            "type": self.retrieve_type.then_some(record_type),
            "value": self.retrieve_value.then_some(record.value.as_str()),
            "tags": self.retrieve_tags.then_some(&record.tags),
        })
    }
}

#[derive(Debug, Default)]
struct EngineState {
    method: CommunicationMethod,
    objects: HashMap<u32, MemoryObject>,
    inboxes: HashMap<u32, VecDeque<Value>>,
    wallet: BTreeMap<(String, String), WalletRecord>,
    searches: HashMap<u32, WalletSearch>,
    next_search: u32,
    message_statuses: Vec<(String, String)>,
}

fn message_type(message: &Value) -> &str {
    message.get("@type").and_then(Value::as_str).unwrap_or_default()
}

fn is_type(message: &Value, suffix: &str) -> bool {
    message_type(message).ends_with(suffix)
}

fn thread_of(message: &Value) -> Option<&str> {
    message.pointer("/~thread/thid").and_then(Value::as_str)
}

fn id_of(message: &Value) -> Option<&str> {
    message.get("@id").and_then(Value::as_str)
}

fn parse(json: &str, code: NativeCode) -> Result<Value, NativeCode> {
    serde_json::from_str(json).map_err(|_| code)
}

fn new_thread_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The state an inbound message moves an object to, if it applies at all.
fn inbound_target(kind: ObjectKind, state: u32, message: &Value) -> Option<u32> {
    let target = match kind {
        ObjectKind::Connection => {
            if is_type(message, CONNECTION_RESPONSE) {
                ConnectionState::ResponseReceived as u32
            } else if is_type(message, CONNECTION_ACK) {
                ConnectionState::Accepted as u32
            } else if is_type(message, CONNECTION_PROBLEM_REPORT) {
                ConnectionState::Failed as u32
            } else if is_type(message, CONNECTION_REDIRECT) {
                ConnectionState::Redirected as u32
            } else {
                return None;
            }
        }
        ObjectKind::Credential => {
            if is_type(message, CREDENTIAL_ISSUE) {
                CredentialState::Accepted as u32
            } else if is_type(message, CREDENTIAL_PROBLEM_REPORT) {
                CredentialState::Failed as u32
            } else {
                return None;
            }
        }
        ObjectKind::DisclosedProof => {
            if is_type(message, PRESENTATION_ACK) {
                DisclosedProofState::Accepted as u32
            } else if is_type(message, PRESENTATION_PROBLEM_REPORT) {
                DisclosedProofState::Failed as u32
            } else {
                return None;
            }
        }
        ObjectKind::Proof => {
            if is_type(message, PRESENTATION) {
                VerifierState::ProofReceived as u32
            } else if is_type(message, PRESENTATION_PROBLEM_REPORT) {
                VerifierState::Failed as u32
            } else {
                return None;
            }
        }
        ObjectKind::CredentialDef => return None,
    };
    (target != state && Descriptor::for_kind(kind).allows(state, target)).then_some(target)
}

fn problem_report(comment: Option<&str>, code: &str, thread_id: &str) -> Value {
    json!({
        "@type": "https://didcomm.org/report-problem/1.0/problem-report",
        "@id": new_thread_id(),
        "~thread": { "thid": thread_id },
        "description": { "en": comment.unwrap_or_default(), "code": code },
    })
}

impl EngineState {
    fn allocate_handle(&self) -> u32 {
        loop {
            let handle = rand::random::<u32>();
            if handle != 0 && !self.objects.contains_key(&handle) {
                return handle;
            }
        }
    }

    fn insert(&mut self, object: MemoryObject) -> u32 {
        let handle = self.allocate_handle();
        if object.kind == ObjectKind::Connection {
            self.inboxes.entry(handle).or_default();
        }
        self.objects.insert(handle, object);
        handle
    }

    fn object(&self, kind: ObjectKind, handle: u32) -> Result<&MemoryObject, NativeCode> {
        match self.objects.get(&handle) {
            Some(object) if object.kind == kind => Ok(object),
            _ => Err(kind.invalid_handle_code()),
        }
    }

    fn object_mut(&mut self, kind: ObjectKind, handle: u32) -> Result<&mut MemoryObject, NativeCode> {
        match self.objects.get_mut(&handle) {
            Some(object) if object.kind == kind => Ok(object),
            _ => Err(kind.invalid_handle_code()),
        }
    }

    fn require_connection(&self, connection: u32) -> Result<(), NativeCode> {
        self.object(ObjectKind::Connection, connection).map(|_| ())
    }

    fn create(&mut self, source_id: &str, input: &CreateInput) -> Outcome {
        let kind = input.kind();
        let mut payload = Map::new();
        let mut thread_id = new_thread_id();
        let mut extra_field = NativeValue::Null;

        match input {
            CreateInput::Connection => {
                payload.insert("role".into(), "inviter".into());
                payload.insert(
                    "invite".into(),
                    json!({
                        "@type": "https://didcomm.org/connections/1.0/invitation",
                        "@id": thread_id,
                        "label": source_id,
                        "recipientKeys": [format!("key-{thread_id}")],
                        "serviceEndpoint": "http://localhost:8080/agency/msg",
                    }),
                );
            }
            CreateInput::ConnectionWithInvite { invite }
            | CreateInput::ConnectionWithOutOfBand { invite } => {
                let invite = parse(invite.as_deref().unwrap_or_default(), NativeCode::INVALID_INVITE_DETAILS)?;
                if !invite.is_object() {
                    return Err(NativeCode::INVALID_INVITE_DETAILS);
                }
                if let Some(id) = id_of(&invite) {
                    id.clone_into(&mut thread_id);
                }
                payload.insert("role".into(), "invitee".into());
                payload.insert("invite".into(), invite);
            }
            CreateInput::CredentialWithOffer { offer } => {
                let offer = parse(offer.as_deref().unwrap_or_default(), NativeCode::INVALID_CREDENTIAL_OFFER)?;
                let first = match &offer {
                    Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
                    other => other.clone(),
                };
                if !first.is_object() {
                    return Err(NativeCode::INVALID_CREDENTIAL_OFFER);
                }
                if let Some(id) = id_of(&first).or_else(|| first.get("thread_id").and_then(Value::as_str)) {
                    id.clone_into(&mut thread_id);
                }
                payload.insert("offer".into(), offer);
            }
            CreateInput::DisclosedProofWithRequest { request } => {
                let request = parse(request.as_deref().unwrap_or_default(), NativeCode::INVALID_PROOF_REQUEST)?;
                if !request.is_object() {
                    return Err(NativeCode::INVALID_PROOF_REQUEST);
                }
                if let Some(id) = id_of(&request) {
                    id.clone_into(&mut thread_id);
                }
                payload.insert("request".into(), request);
            }
            CreateInput::Verifier {
                requested_attrs,
                requested_predicates,
                revocation_interval,
                name,
            } => {
                let attrs = parse(requested_attrs.as_deref().unwrap_or_default(), NativeCode::INVALID_JSON)?;
                let predicates = parse(requested_predicates.as_deref().unwrap_or("[]"), NativeCode::INVALID_JSON)?;
                let interval = parse(revocation_interval.as_deref().unwrap_or("{}"), NativeCode::INVALID_JSON)?;
                payload.insert(
                    "request".into(),
                    json!({
                        "name": name,
                        "requested_attributes": attrs,
                        "requested_predicates": predicates,
                        "non_revoked": interval,
                    }),
                );
            }
            CreateInput::VerifierWithProposal { proposal, name } => {
                let proposal = parse(proposal.as_deref().unwrap_or_default(), NativeCode::INVALID_PROOF_PROPOSAL)?;
                if !proposal.is_object() {
                    return Err(NativeCode::INVALID_PROOF_PROPOSAL);
                }
                if let Some(id) = id_of(&proposal) {
                    id.clone_into(&mut thread_id);
                }
                payload.insert("request".into(), json!({ "name": name, "proposal": proposal }));
            }
            CreateInput::CredentialDef {
                schema_id,
                issuer_did,
                tag,
                ..
            } => {
                let id = format!(
                    "{}:3:CL:{}:{}",
                    issuer_did.as_deref().unwrap_or_default(),
                    schema_id.as_deref().unwrap_or_default(),
                    tag.as_deref().unwrap_or_default()
                );
                payload.insert("cred_def_id".into(), id.into());
            }
            CreateInput::CredentialDefForEndorser {
                schema_id,
                issuer_did,
                tag,
                endorser,
                ..
            } => {
                let issuer_did = issuer_did.as_deref().unwrap_or_default();
                let schema_id = schema_id.as_deref().unwrap_or_default();
                let tag = tag.as_deref().unwrap_or_default();
                let transaction = json!({
                    "identifier": issuer_did,
                    "endorser": endorser,
                    "reqId": rand::random::<u32>(),
                    "operation": {
                        "type": "102",
                        "ref": schema_id,
                        "signature_type": "CL",
                        "tag": tag,
                    },
                });
                payload.insert(
                    "cred_def_id".into(),
                    format!("{issuer_did}:3:CL:{schema_id}:{tag}").into(),
                );
                extra_field = NativeValue::Str(transaction.to_string());
                payload.insert("transaction".into(), transaction);
            }
            CreateInput::CredentialDefWithId { cred_def_id, .. } => {
                payload.insert("cred_def_id".into(), cred_def_id.clone().into());
            }
        }

        let mut object = MemoryObject::new(kind, source_id, thread_id, payload);
        if matches!(
            input,
            CreateInput::CredentialDef { .. } | CreateInput::CredentialDefWithId { .. }
        ) {
            object.data.state = CredentialDefState::Published as u32;
        }
        let handle = self.insert(object);
        Ok(vec![NativeValue::U32(handle), extra_field])
    }

    fn create_from_message_id(
        &mut self,
        kind: ObjectKind,
        source_id: &str,
        connection: u32,
        message_id: &str,
    ) -> Outcome {
        self.require_connection(connection)?;
        let (wanted, payload_key) = match kind {
            ObjectKind::Credential => (CREDENTIAL_OFFER, "offer"),
            ObjectKind::DisclosedProof => (PRESENTATION_REQUEST, "request"),
            _ => return Err(NativeCode::ACTION_NOT_SUPPORTED),
        };

        let inbox = self.inboxes.entry(connection).or_default();
        let position = inbox
            .iter()
            .position(|message| id_of(message) == Some(message_id) && is_type(message, wanted))
            .ok_or(NativeCode::UNKNOWN_ERROR)?;
        let message = inbox.remove(position).ok_or(NativeCode::UNKNOWN_ERROR)?;

        let thread_id = thread_of(&message)
            .or_else(|| id_of(&message))
            .map_or_else(new_thread_id, str::to_owned);
        let mut payload = Map::new();
        payload.insert(payload_key.into(), message.clone());
        let mut object = MemoryObject::new(kind, source_id, thread_id, payload);
        object.data.connection = Some(connection);
        let handle = self.insert(object);
        Ok(vec![NativeValue::U32(handle), NativeValue::Str(message.to_string())])
    }

    /// Applies `message` to the object if it matches its thread and has a transition
    /// from the current state.
    fn apply(object: &mut MemoryObject, message: &Value) -> bool {
        if let Some(thread) = thread_of(message) {
            if thread != object.data.thread_id {
                return false;
            }
        }
        let Some(target) = inbound_target(object.kind, object.data.state, message) else {
            return false;
        };

        object.data.state = target;
        if message_type(message).contains("problem") {
            object.data.problem_report = Some(message.clone());
        } else if is_type(message, CREDENTIAL_ISSUE) {
            object.payload_mut().insert("credential".into(), message.clone());
        } else if is_type(message, PRESENTATION) {
            object.payload_mut().insert("presentation".into(), message.clone());
        }
        true
    }

    fn update_state(&mut self, kind: ObjectKind, handle: u32, message: Option<&str>) -> Outcome {
        if kind == ObjectKind::CredentialDef {
            let object = self.object_mut(kind, handle)?;
            object.transition(CredentialDefState::Published as u32)?;
            return Ok(vec![NativeValue::U32(object.data.state)]);
        }

        if let Some(message) = message {
            let message = parse(message, NativeCode::INVALID_JSON)?;
            let object = self.object_mut(kind, handle)?;
            Self::apply(object, &message);
            return Ok(vec![NativeValue::U32(object.data.state)]);
        }

        let inbox_owner = {
            let object = self.object(kind, handle)?;
            if kind == ObjectKind::Connection {
                Some(handle)
            } else {
                object.data.connection
            }
        };
        let Some(owner) = inbox_owner else {
            return Ok(vec![NativeValue::U32(self.object(kind, handle)?.data.state)]);
        };

        let mut inbox = self.inboxes.remove(&owner).unwrap_or_default();
        let object = self.object_mut(kind, handle)?;
        if let Some(position) = inbox.iter().position(|message| {
            thread_of(message).is_none_or(|thread| thread == object.data.thread_id)
                && inbound_target(object.kind, object.data.state, message).is_some()
        }) {
            if let Some(message) = inbox.remove(position) {
                Self::apply(object, &message);
            }
        }
        let state = object.data.state;
        if self.objects.contains_key(&owner) {
            self.inboxes.insert(owner, inbox);
        }
        Ok(vec![NativeValue::U32(state)])
    }

    fn perform(&mut self, kind: ObjectKind, handle: u32, action: &Action) -> Outcome {
        match action {
            Action::Connect { .. } => {
                let object = self.object_mut(kind, handle)?;
                object.transition(ConnectionState::RequestSent as u32)?;
                let details = if object.payload_str("role").as_deref() == Some("inviter") {
                    NativeValue::from(object.payload_str("invite"))
                } else {
                    NativeValue::Null
                };
                Ok(vec![details])
            }
            Action::InviteDetails { abbreviated } => {
                let object = self.object(kind, handle)?;
                let invite = object.payload_value("invite").cloned().unwrap_or(Value::Null);
                let details = if *abbreviated {
                    json!({ "id": invite.get("@id"), "label": invite.get("label") })
                } else {
                    invite
                };
                Ok(vec![NativeValue::Str(details.to_string())])
            }
            Action::SendMessage { message, .. } => {
                let object = self.object(kind, handle)?;
                if object.data.state != ConnectionState::Accepted as u32 {
                    return Err(NativeCode::CONNECTION_NOT_COMPLETED);
                }
                if message.is_empty() {
                    return Err(NativeCode::INVALID_OPTION);
                }
                Ok(vec![NativeValue::Str(new_thread_id())])
            }
            Action::SendRequest { connection, .. } => {
                self.require_connection(*connection)?;
                let object = self.object_mut(kind, handle)?;
                if object.data.state != CredentialState::OfferReceived as u32 {
                    return Err(NativeCode::INVALID_STATE);
                }
                object.transition(CredentialState::RequestSent as u32)?;
                object.data.connection = Some(*connection);
                Ok(Vec::new())
            }
            Action::Reject {
                connection,
                comment,
            } => {
                self.require_connection(*connection)?;
                let rejected = match kind {
                    ObjectKind::Credential => CredentialState::Rejected as u32,
                    _ => DisclosedProofState::Rejected as u32,
                };
                let object = self.object_mut(kind, handle)?;
                object.transition(rejected)?;
                object.data.connection = Some(*connection);
                object.data.problem_report = Some(problem_report(
                    comment.as_deref(),
                    "rejected",
                    &object.data.thread_id,
                ));
                Ok(Vec::new())
            }
            Action::RetrieveCredentials => {
                let object = self.object(kind, handle)?;
                let attrs: Map<String, Value> = object
                    .payload_value("request")
                    .and_then(|request| request.get("requested_attributes"))
                    .and_then(Value::as_object)
                    .map(|attrs| attrs.keys().map(|key| (key.clone(), json!([]))).collect())
                    .unwrap_or_default();
                Ok(vec![NativeValue::Str(json!({ "attrs": attrs }).to_string())])
            }
            Action::GenerateProof {
                selected_credentials,
                self_attested_attrs,
            } => {
                let selected = parse(selected_credentials, NativeCode::INVALID_JSON)?;
                let self_attested = parse(self_attested_attrs, NativeCode::INVALID_JSON)?;
                let object = self.object_mut(kind, handle)?;
                object.transition(DisclosedProofState::Generated as u32)?;
                object.payload_mut().insert(
                    "presentation".into(),
                    json!({ "selected": selected, "self_attested": self_attested }),
                );
                Ok(Vec::new())
            }
            Action::SendProof { connection } => {
                self.require_connection(*connection)?;
                let object = self.object_mut(kind, handle)?;
                if object.data.state != DisclosedProofState::Generated as u32 {
                    return Err(NativeCode::NOT_READY);
                }
                object.transition(DisclosedProofState::Sent as u32)?;
                object.data.connection = Some(*connection);
                Ok(Vec::new())
            }
            Action::Decline {
                connection, reason, ..
            } => {
                self.require_connection(*connection)?;
                let object = self.object_mut(kind, handle)?;
                object.transition(DisclosedProofState::Declined as u32)?;
                object.data.connection = Some(*connection);
                object.data.problem_report = Some(problem_report(
                    reason.as_deref(),
                    "declined",
                    &object.data.thread_id,
                ));
                Ok(Vec::new())
            }
            Action::SendProofRequest { connection } => {
                self.require_connection(*connection)?;
                let object = self.object_mut(kind, handle)?;
                if object.data.state != VerifierState::Initialized as u32 {
                    return Err(NativeCode::INVALID_STATE);
                }
                object.transition(VerifierState::RequestSent as u32)?;
                object.data.connection = Some(*connection);
                Ok(Vec::new())
            }
            Action::GetProof { connection } => {
                self.require_connection(*connection)?;
                let object = self.object_mut(kind, handle)?;
                let presentation = object.payload_value("presentation").cloned();
                let state = object.data.state;
                let presentation = match presentation {
                    Some(presentation)
                        if state == VerifierState::ProofReceived as u32
                            || state == VerifierState::Accepted as u32
                            || state == VerifierState::Rejected as u32 =>
                    {
                        presentation
                    }
                    _ => return Err(NativeCode::NOT_READY),
                };
                let valid = presentation
                    .get("verified")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                let (proof_state, next) = if valid {
                    (ProofState::Validated, VerifierState::Accepted)
                } else {
                    (ProofState::Invalid, VerifierState::Rejected)
                };
                if state == VerifierState::ProofReceived as u32 {
                    object.transition(next as u32)?;
                }
                let proof_state = if object.data.state == VerifierState::Rejected as u32 {
                    ProofState::Invalid
                } else {
                    proof_state
                };
                Ok(vec![
                    NativeValue::U32(proof_state as u32),
                    NativeValue::Str(presentation.to_string()),
                ])
            }
            Action::GetCredDefId => {
                let object = self.object(kind, handle)?;
                object
                    .payload_str("cred_def_id")
                    .map(|id| vec![NativeValue::Str(id)])
                    .ok_or(NativeCode::NOT_READY)
            }
        }
    }

    fn list_pending(&self, kind: ObjectKind, connection: u32) -> Outcome {
        self.require_connection(connection)?;
        let wanted = match kind {
            ObjectKind::Credential => CREDENTIAL_OFFER,
            ObjectKind::DisclosedProof => PRESENTATION_REQUEST,
            _ => return Err(NativeCode::ACTION_NOT_SUPPORTED),
        };
        let pending: Vec<Value> = self
            .inboxes
            .get(&connection)
            .into_iter()
            .flatten()
            .filter(|message| is_type(message, wanted))
            .cloned()
            .collect();
        Ok(vec![NativeValue::Str(Value::Array(pending).to_string())])
    }

    fn open_search(&mut self, record_type: &str, query: &str, options: &str) -> Outcome {
        let query = parse(query, NativeCode::INVALID_JSON)?;
        let query = query.as_object().ok_or(NativeCode::INVALID_JSON)?;
        let options: RecordOptions = serde_json::from_str(options).map_err(|_| NativeCode::INVALID_JSON)?;

        let records = self
            .wallet
            .iter()
            .filter(|((kind, _), record)| {
                kind == record_type
                    && query
                        .iter()
                        .all(|(tag, value)| record.tags.get(tag) == Some(value))
            })
            .map(|((kind, id), record)| options.render(kind, id, record))
            .collect();

        self.next_search = self.next_search.wrapping_add(1).max(1);
        while self.searches.contains_key(&self.next_search) {
            self.next_search = self.next_search.wrapping_add(1).max(1);
        }
        let search = self.next_search;
        self.searches.insert(search, WalletSearch { records, cursor: 0 });
        Ok(vec![NativeValue::U32(search)])
    }

    fn search_next_records(&mut self, search: u32, count: u32) -> Outcome {
        let search = self
            .searches
            .get_mut(&search)
            .ok_or(NativeCode::INVALID_WALLET_HANDLE)?;
        let total = search.records.len();
        let start = search.cursor.min(total);
        let end = start.saturating_add(count as usize).min(total);
        search.cursor = end;
        let records = (start < end).then(|| Value::Array(search.records[start..end].to_vec()));
        let batch = json!({ "totalCount": total, "records": records });
        Ok(vec![NativeValue::Str(batch.to_string())])
    }
}

/// A native engine that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: Mutex<EngineState>,
}

impl InMemoryEngine {
    #[must_use]
    pub fn new(method: CommunicationMethod) -> Self {
        Self {
            state: Mutex::new(EngineState {
                method,
                ..EngineState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers the outcome from a separate thread, like a native worker would.
    fn complete(command: CommandHandle, callback: NativeCallback, outcome: Outcome) -> NativeCode {
        std::thread::spawn(move || match outcome {
            Ok(fields) => callback(command, NativeCode::SUCCESS, fields),
            Err(code) => callback(command, code, Vec::new()),
        });
        NativeCode::SUCCESS
    }

    /// Queues an inbound protocol message on `connection`. Returns `false` when no such
    /// connection exists.
    pub fn deliver_message(&self, connection: u32, message: Value) -> bool {
        let mut state = self.lock();
        if state.require_connection(connection).is_err() {
            return false;
        }
        log::debug!(
            "queueing {} on connection {connection}",
            message_type(&message)
        );
        state.inboxes.entry(connection).or_default().push_back(message);
        true
    }

    /// Number of inbound messages waiting on `connection`.
    #[must_use]
    pub fn pending_messages(&self, connection: u32) -> usize {
        self.lock().inboxes.get(&connection).map_or(0, VecDeque::len)
    }

    /// Number of objects the engine holds.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.lock().objects.len()
    }

    /// Every `(status, pairwise_uids)` pair received by `update_messages`, in order.
    #[must_use]
    pub fn message_statuses(&self) -> Vec<(String, String)> {
        self.lock().message_statuses.clone()
    }
}

impl NativeEngine for InMemoryEngine {
    fn init(&self, command: CommandHandle, config: &str, callback: NativeCallback) -> NativeCode {
        let outcome = match serde_json::from_str::<Map<String, Value>>(config) {
            Ok(config) => {
                if let Some(method) = config
                    .get("communication_method")
                    .and_then(Value::as_str)
                    .and_then(|method| method.parse().ok())
                {
                    self.lock().method = method;
                }
                Ok(Vec::new())
            }
            Err(_) => Err(NativeCode::INVALID_CONFIGURATION),
        };
        Self::complete(command, callback, outcome)
    }

    fn version(&self) -> String {
        format!("{}-memory", env!("CARGO_PKG_VERSION"))
    }

    fn shutdown(&self, delete_wallet: bool) -> NativeCode {
        let mut state = self.lock();
        state.objects.clear();
        state.inboxes.clear();
        state.searches.clear();
        if delete_wallet {
            state.wallet.clear();
        }
        NativeCode::SUCCESS
    }

    fn error_message(&self, code: NativeCode) -> Option<String> {
        let message = match code {
            NativeCode::SUCCESS => "Success",
            NativeCode::UNKNOWN_ERROR => "Unknown Error",
            NativeCode::INVALID_OPTION => "Invalid Option",
            NativeCode::INVALID_JSON => "Invalid JSON string",
            NativeCode::INVALID_CONFIGURATION => "Invalid Configuration",
            NativeCode::NOT_READY => "Object not ready for specified action",
            NativeCode::INVALID_STATE => "Object is in an invalid state for this action",
            NativeCode::INVALID_CREDENTIAL_OFFER => "Invalid Credential Offer",
            NativeCode::INVALID_INVITE_DETAILS => "Invalid invite details structure",
            NativeCode::INVALID_PROOF_REQUEST => "Invalid proof request",
            NativeCode::INVALID_PROOF_PROPOSAL => "Invalid proof proposal",
            NativeCode::ACTION_NOT_SUPPORTED => "Action is not supported",
            NativeCode::INCOMPATIBLE_PARAMETERS => "Incompatible parameters",
            NativeCode::CONNECTION_NOT_COMPLETED => "Connection is not completed",
            NativeCode::DUPLICATE_WALLET_RECORD => "Record already exists in the wallet",
            NativeCode::WALLET_RECORD_NOT_FOUND => "Wallet record not found",
            NativeCode::SERIALIZATION_ERROR => "Unable to serialize",
            code => return code.name().map(|name| format!("{name} reported by the in-memory engine")),
        };
        Some(message.to_owned())
    }

    fn create(
        &self,
        command: CommandHandle,
        source_id: Option<&str>,
        input: &CreateInput,
        callback: NativeCallback,
    ) -> NativeCode {
        let Some(source_id) = source_id else {
            return NativeCode::INVALID_OPTION;
        };
        let missing = match input {
            CreateInput::Connection => false,
            CreateInput::ConnectionWithInvite { invite }
            | CreateInput::ConnectionWithOutOfBand { invite } => invite.is_none(),
            CreateInput::CredentialWithOffer { offer } => offer.is_none(),
            CreateInput::DisclosedProofWithRequest { request } => request.is_none(),
            CreateInput::Verifier {
                requested_attrs,
                name,
                ..
            } => requested_attrs.is_none() || name.is_none(),
            CreateInput::VerifierWithProposal { proposal, name } => {
                proposal.is_none() || name.is_none()
            }
            CreateInput::CredentialDef {
                name,
                schema_id,
                issuer_did,
                tag,
                ..
            } => name.is_none() || schema_id.is_none() || issuer_did.is_none() || tag.is_none(),
            CreateInput::CredentialDefForEndorser {
                name,
                schema_id,
                issuer_did,
                tag,
                endorser,
                ..
            } => {
                name.is_none()
                    || schema_id.is_none()
                    || issuer_did.is_none()
                    || tag.is_none()
                    || endorser.is_none()
            }
            CreateInput::CredentialDefWithId { cred_def_id, .. } => cred_def_id.is_none(),
        };
        if missing {
            return NativeCode::INVALID_OPTION;
        }

        let outcome = self.lock().create(source_id, input);
        Self::complete(command, callback, outcome)
    }

    fn create_from_message_id(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        source_id: Option<&str>,
        connection: u32,
        message_id: Option<&str>,
        callback: NativeCallback,
    ) -> NativeCode {
        let (Some(source_id), Some(message_id)) = (source_id, message_id) else {
            return NativeCode::INVALID_OPTION;
        };
        let outcome = self
            .lock()
            .create_from_message_id(kind, source_id, connection, message_id);
        Self::complete(command, callback, outcome)
    }

    fn get_state(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        callback: NativeCallback,
    ) -> NativeCode {
        let state = match self.lock().object(kind, handle) {
            Ok(object) => object.data.state,
            Err(code) => return code,
        };
        Self::complete(command, callback, Ok(vec![NativeValue::U32(state)]))
    }

    fn update_state(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        message: Option<&str>,
        callback: NativeCallback,
    ) -> NativeCode {
        let mut state = self.lock();
        if let Err(code) = state.object(kind, handle) {
            return code;
        }
        if kind == ObjectKind::CredentialDef && message.is_some() {
            return NativeCode::ACTION_NOT_SUPPORTED;
        }
        let outcome = state.update_state(kind, handle, message);
        drop(state);
        Self::complete(command, callback, outcome)
    }

    fn serialize(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        callback: NativeCallback,
    ) -> NativeCode {
        let snapshot = match self.lock().object(kind, handle) {
            Ok(object) => Snapshot {
                version: object.version.clone(),
                data: object.data.clone(),
            },
            Err(code) => return code,
        };
        let outcome = serde_json::to_string(&snapshot)
            .map(|json| vec![NativeValue::Str(json)])
            .map_err(|_| NativeCode::SERIALIZATION_ERROR);
        Self::complete(command, callback, outcome)
    }

    fn deserialize(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        snapshot: &str,
        callback: NativeCallback,
    ) -> NativeCode {
        let outcome = serde_json::from_str::<Snapshot>(snapshot)
            .map_err(|_| NativeCode::INVALID_JSON)
            .and_then(|snapshot| {
                if !Descriptor::for_kind(kind).is_state(snapshot.data.state) {
                    return Err(NativeCode::INVALID_JSON);
                }
                let object = MemoryObject {
                    kind,
                    version: snapshot.version,
                    data: snapshot.data,
                };
                Ok(vec![NativeValue::U32(self.lock().insert(object))])
            });
        Self::complete(command, callback, outcome)
    }

    fn release(&self, kind: ObjectKind, handle: u32) -> NativeCode {
        let mut state = self.lock();
        if let Err(code) = state.object(kind, handle) {
            return code;
        }
        state.objects.remove(&handle);
        state.inboxes.remove(&handle);
        NativeCode::SUCCESS
    }

    fn get_problem_report(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        callback: NativeCallback,
    ) -> NativeCode {
        let report = match self.lock().object(kind, handle) {
            Ok(object) => object.stored_problem_report().map(Value::to_string),
            Err(code) => return code,
        };
        Self::complete(command, callback, Ok(vec![NativeValue::from(report)]))
    }

    fn perform(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        action: &Action,
        callback: NativeCallback,
    ) -> NativeCode {
        let mut state = self.lock();
        if !Descriptor::for_kind(kind).supports(state.method, action.kind()) {
            return NativeCode::ACTION_NOT_SUPPORTED;
        }
        if let Action::Decline {
            reason, proposal, ..
        } = action
        {
            if reason.is_some() == proposal.is_some() {
                return NativeCode::INCOMPATIBLE_PARAMETERS;
            }
        }
        if let Err(code) = state.object(kind, handle) {
            return code;
        }
        let outcome = state.perform(kind, handle, action);
        drop(state);
        Self::complete(command, callback, outcome)
    }

    fn list_pending(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        connection: u32,
        callback: NativeCallback,
    ) -> NativeCode {
        let outcome = self.lock().list_pending(kind, connection);
        Self::complete(command, callback, outcome)
    }

    fn update_messages(
        &self,
        command: CommandHandle,
        status: &str,
        pairwise_uids: &str,
        callback: NativeCallback,
    ) -> NativeCode {
        let outcome = match parse(pairwise_uids, NativeCode::INVALID_JSON) {
            Ok(Value::Array(_)) => {
                self.lock()
                    .message_statuses
                    .push((status.to_owned(), pairwise_uids.to_owned()));
                Ok(Vec::new())
            }
            Ok(_) => Err(NativeCode::INVALID_JSON),
            Err(code) => Err(code),
        };
        Self::complete(command, callback, outcome)
    }

    fn wallet_add_record(
        &self,
        command: CommandHandle,
        record_type: &str,
        id: &str,
        value: &str,
        tags: &str,
        callback: NativeCallback,
    ) -> NativeCode {
        let outcome = serde_json::from_str::<Map<String, Value>>(tags)
            .map_err(|_| NativeCode::INVALID_JSON)
            .and_then(|tags| {
                let mut state = self.lock();
                let key = (record_type.to_owned(), id.to_owned());
                if state.wallet.contains_key(&key) {
                    return Err(NativeCode::DUPLICATE_WALLET_RECORD);
                }
                state.wallet.insert(
                    key,
                    WalletRecord {
                        value: value.to_owned(),
                        tags,
                    },
                );
                Ok(Vec::new())
            });
        Self::complete(command, callback, outcome)
    }

    fn wallet_get_record(
        &self,
        command: CommandHandle,
        record_type: &str,
        id: &str,
        options: &str,
        callback: NativeCallback,
    ) -> NativeCode {
        let outcome = serde_json::from_str::<RecordOptions>(options)
            .map_err(|_| NativeCode::INVALID_JSON)
            .and_then(|options| {
                let state = self.lock();
                let record = state
                    .wallet
                    .get(&(record_type.to_owned(), id.to_owned()))
                    .ok_or(NativeCode::WALLET_RECORD_NOT_FOUND)?;
                Ok(vec![NativeValue::Str(
                    options.render(record_type, id, record).to_string(),
                )])
            });
        Self::complete(command, callback, outcome)
    }

    fn wallet_update_record_value(
        &self,
        command: CommandHandle,
        record_type: &str,
        id: &str,
        value: &str,
        callback: NativeCallback,
    ) -> NativeCode {
        let outcome = match self
            .lock()
            .wallet
            .get_mut(&(record_type.to_owned(), id.to_owned()))
        {
            Some(record) => {
                value.clone_into(&mut record.value);
                Ok(Vec::new())
            }
            None => Err(NativeCode::WALLET_RECORD_NOT_FOUND),
        };
        Self::complete(command, callback, outcome)
    }

    fn wallet_delete_record(
        &self,
        command: CommandHandle,
        record_type: &str,
        id: &str,
        callback: NativeCallback,
    ) -> NativeCode {
        let outcome = self
            .lock()
            .wallet
            .remove(&(record_type.to_owned(), id.to_owned()))
            .map(|_| Vec::new())
            .ok_or(NativeCode::WALLET_RECORD_NOT_FOUND);
        Self::complete(command, callback, outcome)
    }

    fn wallet_open_search(
        &self,
        command: CommandHandle,
        record_type: &str,
        query: &str,
        options: &str,
        callback: NativeCallback,
    ) -> NativeCode {
        let outcome = self.lock().open_search(record_type, query, options);
        Self::complete(command, callback, outcome)
    }

    fn wallet_search_next_records(
        &self,
        command: CommandHandle,
        search: u32,
        count: u32,
        callback: NativeCallback,
    ) -> NativeCode {
        let mut state = self.lock();
        if !state.searches.contains_key(&search) {
            return NativeCode::INVALID_WALLET_HANDLE;
        }
        let outcome = state.search_next_records(search, count);
        drop(state);
        Self::complete(command, callback, outcome)
    }

    fn wallet_close_search(
        &self,
        command: CommandHandle,
        search: u32,
        callback: NativeCallback,
    ) -> NativeCode {
        if self.lock().searches.remove(&search).is_none() {
            return NativeCode::INVALID_WALLET_HANDLE;
        }
        Self::complete(command, callback, Ok(Vec::new()))
    }
}
