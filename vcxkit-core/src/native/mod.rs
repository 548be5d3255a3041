//! The interface to the native protocol engine.
//!
//! The engine owns every protocol object, the wallet and the messaging transport. The
//! binding only reaches it through the entry points of [`NativeEngine`], which follow a
//! two-phase contract: each asynchronous entry point returns an immediate
//! [`NativeCode`] and, when that code is zero, later invokes the supplied
//! [`NativeCallback`] exactly once with the same [`CommandHandle`].

use std::sync::Arc;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::code::NativeCode;

pub mod memory;

#[cfg(feature = "libvcx")]
pub mod libvcx;

/// Correlation token passed to an asynchronous entry point and echoed by its callback.
pub type CommandHandle = u32;

/// Completion callback handed to the engine.
pub type NativeCallback = Arc<dyn Fn(CommandHandle, NativeCode, Vec<NativeValue>) + Send + Sync>;

/// A single result field delivered to a completion callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeValue {
    U32(u32),
    Str(String),
    Null,
}

impl NativeValue {
    /// Returns the integer payload, if any.
    #[must_use]
    pub const fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(value) => Some(*value),
            _ => None,
        }
    }

    /// Consumes the value and returns its string payload, if any.
    #[must_use]
    pub fn into_string(self) -> Option<String> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Option<String>> for NativeValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Str)
    }
}

/// The protocol object families exposed by the engine. The string form is the type
/// segment of the native entry point names (`vcx_<kind>_<op>`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ObjectKind {
    Connection,
    Credential,
    DisclosedProof,
    Proof,
    #[strum(serialize = "credentialdef")]
    CredentialDef,
}

impl ObjectKind {
    /// The code the engine reports for an unusable handle of this kind.
    #[must_use]
    pub const fn invalid_handle_code(self) -> NativeCode {
        match self {
            Self::Connection => NativeCode::INVALID_CONNECTION_HANDLE,
            Self::Credential => NativeCode::INVALID_CREDENTIAL_HANDLE,
            Self::DisclosedProof => NativeCode::INVALID_DISCLOSED_PROOF_HANDLE,
            Self::Proof => NativeCode::INVALID_PROOF_HANDLE,
            Self::CredentialDef => NativeCode::INVALID_CREDENTIAL_DEF_HANDLE,
        }
    }
}

/// Type-specific construction payloads.
///
/// Required arguments are `Option`s on purpose: a missing value reaches the engine as
/// null and is rejected there, so the caller sees the engine's own error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateInput {
    /// A fresh connection that will produce an invitation.
    Connection,
    /// A connection accepting a received invitation.
    ConnectionWithInvite { invite: Option<String> },
    /// A connection accepting a received out-of-band invitation.
    ConnectionWithOutOfBand { invite: Option<String> },
    /// A holder credential built from a received offer.
    CredentialWithOffer { offer: Option<String> },
    /// A prover object built from a received presentation request.
    DisclosedProofWithRequest { request: Option<String> },
    /// A verifier built from requested attributes and predicates.
    Verifier {
        requested_attrs: Option<String>,
        requested_predicates: Option<String>,
        revocation_interval: Option<String>,
        name: Option<String>,
    },
    /// A verifier answering a received presentation proposal.
    VerifierWithProposal {
        proposal: Option<String>,
        name: Option<String>,
    },
    /// A credential definition written to the ledger by this issuer.
    CredentialDef {
        name: Option<String>,
        schema_id: Option<String>,
        issuer_did: Option<String>,
        tag: Option<String>,
        revocation_details: Option<String>,
        payment_handle: u32,
    },
    /// A credential definition whose ledger transaction is signed by an endorser.
    CredentialDefForEndorser {
        name: Option<String>,
        schema_id: Option<String>,
        issuer_did: Option<String>,
        tag: Option<String>,
        revocation_details: Option<String>,
        endorser: Option<String>,
    },
    /// A credential definition that already exists on the ledger.
    CredentialDefWithId {
        cred_def_id: Option<String>,
        issuer_did: Option<String>,
        revocation_config: Option<String>,
    },
}

impl CreateInput {
    /// The object family this payload constructs.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Connection
            | Self::ConnectionWithInvite { .. }
            | Self::ConnectionWithOutOfBand { .. } => ObjectKind::Connection,
            Self::CredentialWithOffer { .. } => ObjectKind::Credential,
            Self::DisclosedProofWithRequest { .. } => ObjectKind::DisclosedProof,
            Self::Verifier { .. } | Self::VerifierWithProposal { .. } => ObjectKind::Proof,
            Self::CredentialDef { .. }
            | Self::CredentialDefForEndorser { .. }
            | Self::CredentialDefWithId { .. } => ObjectKind::CredentialDef,
        }
    }
}

/// Names of the type-specific actions, used for support checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    Connect,
    InviteDetails,
    SendMessage,
    SendRequest,
    Reject,
    RetrieveCredentials,
    GenerateProof,
    SendProof,
    Decline,
    SendProofRequest,
    GetProof,
    GetCredDefId,
}

/// A type-specific action performed on a live handle. Connection arguments are raw
/// handles that the caller has already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Connection: start the exchange. Completes with optional invite details.
    Connect { options: Option<String> },
    /// Connection: the invitation. Completes with a JSON string.
    InviteDetails { abbreviated: bool },
    /// Connection: send a generic message. Completes with the message id.
    SendMessage { message: String, options: String },
    /// Credential: request the offered credential.
    SendRequest { connection: u32, payment_handle: u32 },
    /// Credential or disclosed proof: refuse the offer or request.
    Reject {
        connection: u32,
        comment: Option<String>,
    },
    /// Disclosed proof: wallet credentials matching the request. Completes with JSON.
    RetrieveCredentials,
    /// Disclosed proof: build the presentation.
    GenerateProof {
        selected_credentials: String,
        self_attested_attrs: String,
    },
    /// Disclosed proof: send the generated presentation.
    SendProof { connection: u32 },
    /// Disclosed proof: decline with a reason or a counter proposal.
    Decline {
        connection: u32,
        reason: Option<String>,
        proposal: Option<String>,
    },
    /// Verifier: send the presentation request.
    SendProofRequest { connection: u32 },
    /// Verifier: read and acknowledge the received presentation. Completes with the
    /// proof state ordinal and the proof JSON.
    GetProof { connection: u32 },
    /// Credential definition: its ledger id. Completes with a string.
    GetCredDefId,
}

impl Action {
    /// The action's name for support checks.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Connect { .. } => ActionKind::Connect,
            Self::InviteDetails { .. } => ActionKind::InviteDetails,
            Self::SendMessage { .. } => ActionKind::SendMessage,
            Self::SendRequest { .. } => ActionKind::SendRequest,
            Self::Reject { .. } => ActionKind::Reject,
            Self::RetrieveCredentials => ActionKind::RetrieveCredentials,
            Self::GenerateProof { .. } => ActionKind::GenerateProof,
            Self::SendProof { .. } => ActionKind::SendProof,
            Self::Decline { .. } => ActionKind::Decline,
            Self::SendProofRequest { .. } => ActionKind::SendProofRequest,
            Self::GetProof { .. } => ActionKind::GetProof,
            Self::GetCredDefId => ActionKind::GetCredDefId,
        }
    }
}

/// The native protocol engine.
///
/// Every asynchronous method returns the immediate status. When it is non-zero the
/// callback must not be invoked; when it is zero the callback is invoked exactly once,
/// possibly from another thread.
pub trait NativeEngine: Send + Sync {
    /// Initializes the engine with a configuration document. Completes with no fields.
    fn init(&self, command: CommandHandle, config: &str, callback: NativeCallback)
        -> NativeCode;

    /// The engine's version string.
    fn version(&self) -> String;

    /// Tears down the engine, releasing every object it holds.
    fn shutdown(&self, delete_wallet: bool) -> NativeCode;

    /// Detail text for a code, when the engine has one.
    fn error_message(&self, code: NativeCode) -> Option<String>;

    /// Constructs an object. Completes with its handle and, for some inputs, a
    /// second payload (the endorser transaction).
    fn create(
        &self,
        command: CommandHandle,
        source_id: Option<&str>,
        input: &CreateInput,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Constructs an object from a message waiting on `connection`. Completes with the
    /// handle and the message payload.
    fn create_from_message_id(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        source_id: Option<&str>,
        connection: u32,
        message_id: Option<&str>,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Completes with the state ordinal.
    fn get_state(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Applies the first applicable pending message, or `message` when supplied.
    /// Completes with the resulting state ordinal.
    fn update_state(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        message: Option<&str>,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Completes with the snapshot JSON.
    fn serialize(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Completes with a fresh handle.
    fn deserialize(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        snapshot: &str,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Releases a handle synchronously.
    fn release(&self, kind: ObjectKind, handle: u32) -> NativeCode;

    /// Completes with the problem report JSON or null.
    fn get_problem_report(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Performs a type-specific action. The completion fields depend on the action.
    fn perform(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        action: &Action,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Completes with a JSON array of the offers (credential) or requests (disclosed
    /// proof) waiting on `connection`.
    fn list_pending(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        connection: u32,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Updates the agency status of messages. Completes with no fields.
    fn update_messages(
        &self,
        command: CommandHandle,
        status: &str,
        pairwise_uids: &str,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Completes with no fields.
    fn wallet_add_record(
        &self,
        command: CommandHandle,
        record_type: &str,
        id: &str,
        value: &str,
        tags: &str,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Completes with the record JSON.
    fn wallet_get_record(
        &self,
        command: CommandHandle,
        record_type: &str,
        id: &str,
        options: &str,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Completes with no fields.
    fn wallet_update_record_value(
        &self,
        command: CommandHandle,
        record_type: &str,
        id: &str,
        value: &str,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Completes with no fields.
    fn wallet_delete_record(
        &self,
        command: CommandHandle,
        record_type: &str,
        id: &str,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Completes with a search handle.
    fn wallet_open_search(
        &self,
        command: CommandHandle,
        record_type: &str,
        query: &str,
        options: &str,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Completes with the next batch as JSON.
    fn wallet_search_next_records(
        &self,
        command: CommandHandle,
        search: u32,
        count: u32,
        callback: NativeCallback,
    ) -> NativeCode;

    /// Completes with no fields.
    fn wallet_close_search(
        &self,
        command: CommandHandle,
        search: u32,
        callback: NativeCallback,
    ) -> NativeCode;
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_object_kind_entry_point_names() {
        let names: Vec<&'static str> = ObjectKind::iter().map(Into::into).collect();
        assert_eq!(
            names,
            ["connection", "credential", "disclosed_proof", "proof", "credentialdef"]
        );
        assert_eq!(
            "credentialdef".parse::<ObjectKind>().unwrap(),
            ObjectKind::CredentialDef
        );
    }

    #[test]
    fn test_create_input_kind() {
        assert_eq!(CreateInput::Connection.kind(), ObjectKind::Connection);
        assert_eq!(
            CreateInput::VerifierWithProposal { proposal: None, name: None }.kind(),
            ObjectKind::Proof
        );
    }
}
