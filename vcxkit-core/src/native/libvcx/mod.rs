//! [`NativeEngine`] backed by the libvcx C library.
//!
//! libvcx completes asynchronous calls through plain C function pointers that only
//! carry the command handle. Each call is therefore given a process-wide token, its
//! callback is parked in a route table under that token, and one trampoline per
//! callback shape looks the route up and forwards the fields. Tokens are unique across
//! sessions, so two adapters numbering their commands independently never collide.

use std::{
    collections::HashMap,
    ffi::{CStr, CString},
    os::raw::c_char,
    ptr,
    sync::{
        atomic::{AtomicU32, Ordering},
        Mutex, MutexGuard, OnceLock, PoisonError,
    },
};

use super::{
    Action, CommandHandle, CreateInput, NativeCallback, NativeEngine, NativeValue, ObjectKind,
};
use crate::code::NativeCode;

mod ffi;

struct Route {
    command: CommandHandle,
    callback: NativeCallback,
}

type Routes = HashMap<u32, Route>;

static ROUTES: OnceLock<Mutex<Routes>> = OnceLock::new();
static NEXT_TOKEN: AtomicU32 = AtomicU32::new(1);

fn routes() -> MutexGuard<'static, Routes> {
    ROUTES
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn settle(token: u32, err: u32, fields: Vec<NativeValue>) {
    let route = routes().remove(&token);
    match route {
        Some(route) => (route.callback)(route.command, NativeCode(err), fields),
        None => log::warn!("libvcx completed unknown command {token} with status {err}"),
    }
}

/// Copies a string the library passed to a callback. The pointer is only valid for the
/// duration of the callback.
fn read_str(value: *const c_char) -> NativeValue {
    if value.is_null() {
        return NativeValue::Null;
    }
    // SAFETY: libvcx passes NUL-terminated strings that outlive the callback.
    let value = unsafe { CStr::from_ptr(value) };
    NativeValue::Str(value.to_string_lossy().into_owned())
}

// ── Trampolines ─────────────────────────────────────────────────────────

extern "C" fn on_unit(token: u32, err: u32) {
    settle(token, err, Vec::new());
}

extern "C" fn on_u32(token: u32, err: u32, value: u32) {
    settle(token, err, vec![NativeValue::U32(value)]);
}

extern "C" fn on_str(token: u32, err: u32, value: *const c_char) {
    settle(token, err, vec![read_str(value)]);
}

extern "C" fn on_u32_str(token: u32, err: u32, value: u32, text: *const c_char) {
    settle(token, err, vec![NativeValue::U32(value), read_str(text)]);
}

extern "C" fn on_endorser(
    token: u32,
    err: u32,
    handle: u32,
    cred_def_txn: *const c_char,
    rev_reg_def_txn: *const c_char,
    rev_reg_delta_txn: *const c_char,
) {
    settle(
        token,
        err,
        vec![
            NativeValue::U32(handle),
            read_str(cred_def_txn),
            read_str(rev_reg_def_txn),
            read_str(rev_reg_delta_txn),
        ],
    );
}

extern "C" fn on_search(token: u32, err: u32, search: i32) {
    // A negative search handle never names a live search; zero is rejected upstream.
    let search = u32::try_from(search).unwrap_or(0);
    settle(token, err, vec![NativeValue::U32(search)]);
}

// ── Argument conversion ─────────────────────────────────────────────────

type Converted = Result<NativeCode, NativeCode>;

fn c_string(value: &str) -> Result<CString, NativeCode> {
    CString::new(value).map_err(|_| NativeCode::INVALID_OPTION)
}

fn c_opt(value: Option<&str>) -> Result<Option<CString>, NativeCode> {
    value.map(c_string).transpose()
}

fn as_ptr(value: Option<&CString>) -> *const c_char {
    value.map_or(ptr::null(), |value| value.as_ptr())
}

/// Parks `callback` under a fresh token and issues the call. The route is dropped
/// again when the library refuses the call, since no completion will follow.
fn dispatch(
    command: CommandHandle,
    callback: NativeCallback,
    issue: impl FnOnce(u32) -> u32,
) -> NativeCode {
    let mut token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    if token == 0 {
        token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
    }
    routes().insert(token, Route { command, callback });

    let status = NativeCode(issue(token));
    if !status.is_success() {
        routes().remove(&token);
    }
    status
}

/// Completes a call the library has no entry point for with a fixed payload, from a
/// separate thread like every other completion.
fn complete_locally(
    command: CommandHandle,
    callback: NativeCallback,
    fields: Vec<NativeValue>,
) -> NativeCode {
    std::thread::spawn(move || callback(command, NativeCode::SUCCESS, fields));
    NativeCode::SUCCESS
}

fn flatten(result: Converted) -> NativeCode {
    result.unwrap_or_else(|code| code)
}

/// The libvcx engine. The library keeps its own global state, so every instance
/// drives the same native objects.
#[derive(Debug, Default)]
pub struct LibVcxEngine;

impl LibVcxEngine {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

// SAFETY (applies to every `unsafe` block below): string arguments are `CString`s that
// outlive the call, libvcx copies them before returning, and every callback is a
// trampoline with the exact signature the entry point declares.
#[allow(clippy::too_many_lines)]
impl LibVcxEngine {
    fn try_create(
        command: CommandHandle,
        source_id: Option<&str>,
        input: &CreateInput,
        callback: NativeCallback,
    ) -> Converted {
        let source = c_opt(source_id)?;
        let source_id = as_ptr(source.as_ref());

        let status = match input {
            CreateInput::Connection => dispatch(command, callback, |token| unsafe {
                ffi::vcx_connection_create(token, source_id, Some(on_u32))
            }),
            CreateInput::ConnectionWithInvite { invite } => {
                let invite = c_opt(invite.as_deref())?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_connection_create_with_invite(
                        token,
                        source_id,
                        as_ptr(invite.as_ref()),
                        Some(on_u32),
                    )
                })
            }
            CreateInput::ConnectionWithOutOfBand { invite } => {
                let invite = c_opt(invite.as_deref())?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_connection_create_with_outofband_invitation(
                        token,
                        source_id,
                        as_ptr(invite.as_ref()),
                        Some(on_u32),
                    )
                })
            }
            CreateInput::CredentialWithOffer { offer } => {
                let offer = c_opt(offer.as_deref())?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_credential_create_with_offer(
                        token,
                        source_id,
                        as_ptr(offer.as_ref()),
                        Some(on_u32),
                    )
                })
            }
            CreateInput::DisclosedProofWithRequest { request } => {
                let request = c_opt(request.as_deref())?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_disclosed_proof_create_with_request(
                        token,
                        source_id,
                        as_ptr(request.as_ref()),
                        Some(on_u32),
                    )
                })
            }
            CreateInput::Verifier {
                requested_attrs,
                requested_predicates,
                revocation_interval,
                name,
            } => {
                let attrs = c_opt(requested_attrs.as_deref())?;
                let predicates = c_opt(requested_predicates.as_deref())?;
                let interval = c_opt(revocation_interval.as_deref())?;
                let name = c_opt(name.as_deref())?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_proof_create(
                        token,
                        source_id,
                        as_ptr(attrs.as_ref()),
                        as_ptr(predicates.as_ref()),
                        as_ptr(interval.as_ref()),
                        as_ptr(name.as_ref()),
                        Some(on_u32),
                    )
                })
            }
            CreateInput::VerifierWithProposal { proposal, name } => {
                let proposal = c_opt(proposal.as_deref())?;
                let name = c_opt(name.as_deref())?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_proof_create_with_proposal(
                        token,
                        source_id,
                        as_ptr(proposal.as_ref()),
                        as_ptr(name.as_ref()),
                        Some(on_u32),
                    )
                })
            }
            CreateInput::CredentialDef {
                name,
                schema_id,
                issuer_did,
                tag,
                revocation_details,
                payment_handle,
            } => {
                let name = c_opt(name.as_deref())?;
                let schema_id = c_opt(schema_id.as_deref())?;
                let issuer_did = c_opt(issuer_did.as_deref())?;
                let tag = c_opt(tag.as_deref())?;
                let revocation_details = c_opt(revocation_details.as_deref())?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_credentialdef_create(
                        token,
                        source_id,
                        as_ptr(name.as_ref()),
                        as_ptr(schema_id.as_ref()),
                        as_ptr(issuer_did.as_ref()),
                        as_ptr(tag.as_ref()),
                        as_ptr(revocation_details.as_ref()),
                        *payment_handle,
                        Some(on_u32),
                    )
                })
            }
            CreateInput::CredentialDefForEndorser {
                name,
                schema_id,
                issuer_did,
                tag,
                revocation_details,
                endorser,
            } => {
                let name = c_opt(name.as_deref())?;
                let schema_id = c_opt(schema_id.as_deref())?;
                let issuer_did = c_opt(issuer_did.as_deref())?;
                let tag = c_opt(tag.as_deref())?;
                let revocation_details = c_opt(revocation_details.as_deref())?;
                let endorser = c_opt(endorser.as_deref())?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_credentialdef_prepare_for_endorser(
                        token,
                        source_id,
                        as_ptr(name.as_ref()),
                        as_ptr(schema_id.as_ref()),
                        as_ptr(issuer_did.as_ref()),
                        as_ptr(tag.as_ref()),
                        as_ptr(revocation_details.as_ref()),
                        as_ptr(endorser.as_ref()),
                        Some(on_endorser),
                    )
                })
            }
            CreateInput::CredentialDefWithId {
                cred_def_id,
                issuer_did,
                revocation_config,
            } => {
                let cred_def_id = c_opt(cred_def_id.as_deref())?;
                let issuer_did = c_opt(issuer_did.as_deref())?;
                let revocation_config = c_opt(revocation_config.as_deref())?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_credentialdef_create_with_id(
                        token,
                        source_id,
                        as_ptr(cred_def_id.as_ref()),
                        as_ptr(issuer_did.as_ref()),
                        as_ptr(revocation_config.as_ref()),
                        Some(on_u32),
                    )
                })
            }
        };
        Ok(status)
    }

    fn try_perform(
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        action: &Action,
        callback: NativeCallback,
    ) -> Converted {
        let status = match action {
            Action::Connect { options } => {
                let options = c_opt(options.as_deref())?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_connection_connect(token, handle, as_ptr(options.as_ref()), Some(on_str))
                })
            }
            Action::InviteDetails { abbreviated } => dispatch(command, callback, |token| unsafe {
                ffi::vcx_connection_invite_details(token, handle, *abbreviated, Some(on_str))
            }),
            Action::SendMessage { message, options } => {
                let message = c_string(message)?;
                let options = c_string(options)?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_connection_send_message(
                        token,
                        handle,
                        message.as_ptr(),
                        options.as_ptr(),
                        Some(on_str),
                    )
                })
            }
            Action::SendRequest {
                connection,
                payment_handle,
            } => dispatch(command, callback, |token| unsafe {
                ffi::vcx_credential_send_request(
                    token,
                    handle,
                    *connection,
                    *payment_handle,
                    Some(on_unit),
                )
            }),
            Action::Reject { connection, comment } if kind == ObjectKind::Credential => {
                let comment = c_opt(comment.as_deref())?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_credential_reject(
                        token,
                        handle,
                        *connection,
                        as_ptr(comment.as_ref()),
                        Some(on_unit),
                    )
                })
            }
            Action::Reject { connection, .. } => dispatch(command, callback, |token| unsafe {
                ffi::vcx_disclosed_proof_reject_proof(token, handle, *connection, Some(on_unit))
            }),
            Action::RetrieveCredentials => dispatch(command, callback, |token| unsafe {
                ffi::vcx_disclosed_proof_retrieve_credentials(token, handle, Some(on_str))
            }),
            Action::GenerateProof {
                selected_credentials,
                self_attested_attrs,
            } => {
                let selected = c_string(selected_credentials)?;
                let self_attested = c_string(self_attested_attrs)?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_disclosed_proof_generate_proof(
                        token,
                        handle,
                        selected.as_ptr(),
                        self_attested.as_ptr(),
                        Some(on_unit),
                    )
                })
            }
            Action::SendProof { connection } => dispatch(command, callback, |token| unsafe {
                ffi::vcx_disclosed_proof_send_proof(token, handle, *connection, Some(on_unit))
            }),
            Action::Decline {
                connection,
                reason,
                proposal,
            } => {
                let reason = c_opt(reason.as_deref())?;
                let proposal = c_opt(proposal.as_deref())?;
                dispatch(command, callback, |token| unsafe {
                    ffi::vcx_disclosed_proof_decline_presentation_request(
                        token,
                        handle,
                        *connection,
                        as_ptr(reason.as_ref()),
                        as_ptr(proposal.as_ref()),
                        Some(on_unit),
                    )
                })
            }
            Action::SendProofRequest { connection } => dispatch(command, callback, |token| unsafe {
                ffi::vcx_proof_send_request(token, handle, *connection, Some(on_unit))
            }),
            Action::GetProof { connection } => dispatch(command, callback, |token| unsafe {
                ffi::vcx_get_proof(token, handle, *connection, Some(on_u32_str))
            }),
            Action::GetCredDefId => dispatch(command, callback, |token| unsafe {
                ffi::vcx_credentialdef_get_cred_def_id(token, handle, Some(on_str))
            }),
        };
        Ok(status)
    }
}

impl NativeEngine for LibVcxEngine {
    fn init(&self, command: CommandHandle, config: &str, callback: NativeCallback) -> NativeCode {
        flatten(c_string(config).map(|config| {
            dispatch(command, callback, |token| unsafe {
                ffi::vcx_init_with_config(token, config.as_ptr(), Some(on_unit))
            })
        }))
    }

    fn version(&self) -> String {
        // SAFETY: the version string is static.
        let version = unsafe { ffi::vcx_version() };
        read_str(version).into_string().unwrap_or_default()
    }

    fn shutdown(&self, delete_wallet: bool) -> NativeCode {
        NativeCode(unsafe { ffi::vcx_shutdown(delete_wallet) })
    }

    fn error_message(&self, code: NativeCode) -> Option<String> {
        // SAFETY: error messages are static strings.
        let message = unsafe { ffi::vcx_error_c_message(code.0) };
        read_str(message).into_string()
    }

    fn create(
        &self,
        command: CommandHandle,
        source_id: Option<&str>,
        input: &CreateInput,
        callback: NativeCallback,
    ) -> NativeCode {
        flatten(Self::try_create(command, source_id, input, callback))
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
        let entry: unsafe extern "C" fn(u32, *const c_char, u32, *const c_char, ffi::cb_u32_str) -> u32 =
            match kind {
                ObjectKind::Credential => ffi::vcx_credential_create_with_msgid,
                ObjectKind::DisclosedProof => ffi::vcx_disclosed_proof_create_with_msgid,
                _ => return NativeCode::ACTION_NOT_SUPPORTED,
            };
        flatten(c_opt(source_id).and_then(|source_id| {
            let message_id = c_opt(message_id)?;
            Ok(dispatch(command, callback, |token| unsafe {
                entry(
                    token,
                    as_ptr(source_id.as_ref()),
                    connection,
                    as_ptr(message_id.as_ref()),
                    Some(on_u32_str),
                )
            }))
        }))
    }

    fn get_state(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        callback: NativeCallback,
    ) -> NativeCode {
        let entry = match kind {
            ObjectKind::Connection => ffi::vcx_connection_get_state,
            ObjectKind::Credential => ffi::vcx_credential_get_state,
            ObjectKind::DisclosedProof => ffi::vcx_disclosed_proof_get_state,
            ObjectKind::Proof => ffi::vcx_proof_get_state,
            ObjectKind::CredentialDef => ffi::vcx_credentialdef_get_state,
        };
        dispatch(command, callback, |token| unsafe { entry(token, handle, Some(on_u32)) })
    }

    fn update_state(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        message: Option<&str>,
        callback: NativeCallback,
    ) -> NativeCode {
        let Some(message) = message else {
            let entry = match kind {
                ObjectKind::Connection => ffi::vcx_connection_update_state,
                ObjectKind::Credential => ffi::vcx_credential_update_state,
                ObjectKind::DisclosedProof => ffi::vcx_disclosed_proof_update_state,
                ObjectKind::Proof => ffi::vcx_proof_update_state,
                ObjectKind::CredentialDef => ffi::vcx_credentialdef_update_state,
            };
            return dispatch(command, callback, |token| unsafe {
                entry(token, handle, Some(on_u32))
            });
        };

        let entry: unsafe extern "C" fn(u32, u32, *const c_char, ffi::cb_u32) -> u32 = match kind {
            ObjectKind::Connection => ffi::vcx_connection_update_state_with_message,
            ObjectKind::Credential => ffi::vcx_credential_update_state_with_message,
            ObjectKind::DisclosedProof => ffi::vcx_disclosed_proof_update_state_with_message,
            ObjectKind::Proof => ffi::vcx_proof_update_state_with_message,
            ObjectKind::CredentialDef => return NativeCode::ACTION_NOT_SUPPORTED,
        };
        flatten(c_string(message).map(|message| {
            dispatch(command, callback, |token| unsafe {
                entry(token, handle, message.as_ptr(), Some(on_u32))
            })
        }))
    }

    fn serialize(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        callback: NativeCallback,
    ) -> NativeCode {
        let entry = match kind {
            ObjectKind::Connection => ffi::vcx_connection_serialize,
            ObjectKind::Credential => ffi::vcx_credential_serialize,
            ObjectKind::DisclosedProof => ffi::vcx_disclosed_proof_serialize,
            ObjectKind::Proof => ffi::vcx_proof_serialize,
            ObjectKind::CredentialDef => ffi::vcx_credentialdef_serialize,
        };
        dispatch(command, callback, |token| unsafe { entry(token, handle, Some(on_str)) })
    }

    fn deserialize(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        snapshot: &str,
        callback: NativeCallback,
    ) -> NativeCode {
        let entry = match kind {
            ObjectKind::Connection => ffi::vcx_connection_deserialize,
            ObjectKind::Credential => ffi::vcx_credential_deserialize,
            ObjectKind::DisclosedProof => ffi::vcx_disclosed_proof_deserialize,
            ObjectKind::Proof => ffi::vcx_proof_deserialize,
            ObjectKind::CredentialDef => ffi::vcx_credentialdef_deserialize,
        };
        flatten(c_string(snapshot).map(|snapshot| {
            dispatch(command, callback, |token| unsafe {
                entry(token, snapshot.as_ptr(), Some(on_u32))
            })
        }))
    }

    fn release(&self, kind: ObjectKind, handle: u32) -> NativeCode {
        let entry = match kind {
            ObjectKind::Connection => ffi::vcx_connection_release,
            ObjectKind::Credential => ffi::vcx_credential_release,
            ObjectKind::DisclosedProof => ffi::vcx_disclosed_proof_release,
            ObjectKind::Proof => ffi::vcx_proof_release,
            ObjectKind::CredentialDef => ffi::vcx_credentialdef_release,
        };
        NativeCode(unsafe { entry(handle) })
    }

    fn get_problem_report(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        callback: NativeCallback,
    ) -> NativeCode {
        let entry = match kind {
            ObjectKind::Connection => ffi::vcx_connection_get_problem_report,
            ObjectKind::Credential => ffi::vcx_credential_get_problem_report,
            ObjectKind::DisclosedProof => ffi::vcx_disclosed_proof_get_problem_report,
            ObjectKind::Proof => ffi::vcx_proof_get_problem_report,
            // Credential definitions never fail remotely.
            ObjectKind::CredentialDef => {
                return complete_locally(command, callback, vec![NativeValue::Null]);
            }
        };
        dispatch(command, callback, |token| unsafe { entry(token, handle, Some(on_str)) })
    }

    fn perform(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        handle: u32,
        action: &Action,
        callback: NativeCallback,
    ) -> NativeCode {
        flatten(Self::try_perform(command, kind, handle, action, callback))
    }

    fn list_pending(
        &self,
        command: CommandHandle,
        kind: ObjectKind,
        connection: u32,
        callback: NativeCallback,
    ) -> NativeCode {
        let entry = match kind {
            ObjectKind::Credential => ffi::vcx_credential_get_offers,
            ObjectKind::DisclosedProof => ffi::vcx_disclosed_proof_get_requests,
            _ => return NativeCode::ACTION_NOT_SUPPORTED,
        };
        dispatch(command, callback, |token| unsafe {
            entry(token, connection, Some(on_str))
        })
    }

    fn update_messages(
        &self,
        command: CommandHandle,
        status: &str,
        pairwise_uids: &str,
        callback: NativeCallback,
    ) -> NativeCode {
        flatten(c_string(status).and_then(|status| {
            let pairwise_uids = c_string(pairwise_uids)?;
            Ok(dispatch(command, callback, |token| unsafe {
                ffi::vcx_messages_update_status(
                    token,
                    status.as_ptr(),
                    pairwise_uids.as_ptr(),
                    Some(on_unit),
                )
            }))
        }))
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
        flatten(c_string(record_type).and_then(|record_type| {
            let id = c_string(id)?;
            let (value, tags) = (c_string(value)?, c_string(tags)?);
            Ok(dispatch(command, callback, |token| unsafe {
                ffi::vcx_wallet_add_record(
                    token,
                    record_type.as_ptr(),
                    id.as_ptr(),
                    value.as_ptr(),
                    tags.as_ptr(),
                    Some(on_unit),
                )
            }))
        }))
    }

    fn wallet_get_record(
        &self,
        command: CommandHandle,
        record_type: &str,
        id: &str,
        options: &str,
        callback: NativeCallback,
    ) -> NativeCode {
        flatten(c_string(record_type).and_then(|record_type| {
            let (id, options) = (c_string(id)?, c_string(options)?);
            Ok(dispatch(command, callback, |token| unsafe {
                ffi::vcx_wallet_get_record(
                    token,
                    record_type.as_ptr(),
                    id.as_ptr(),
                    options.as_ptr(),
                    Some(on_str),
                )
            }))
        }))
    }

    fn wallet_update_record_value(
        &self,
        command: CommandHandle,
        record_type: &str,
        id: &str,
        value: &str,
        callback: NativeCallback,
    ) -> NativeCode {
        flatten(c_string(record_type).and_then(|record_type| {
            let (id, value) = (c_string(id)?, c_string(value)?);
            Ok(dispatch(command, callback, |token| unsafe {
                ffi::vcx_wallet_update_record_value(
                    token,
                    record_type.as_ptr(),
                    id.as_ptr(),
                    value.as_ptr(),
                    Some(on_unit),
                )
            }))
        }))
    }

    fn wallet_delete_record(
        &self,
        command: CommandHandle,
        record_type: &str,
        id: &str,
        callback: NativeCallback,
    ) -> NativeCode {
        flatten(c_string(record_type).and_then(|record_type| {
            let id = c_string(id)?;
            Ok(dispatch(command, callback, |token| unsafe {
                ffi::vcx_wallet_delete_record(token, record_type.as_ptr(), id.as_ptr(), Some(on_unit))
            }))
        }))
    }

    fn wallet_open_search(
        &self,
        command: CommandHandle,
        record_type: &str,
        query: &str,
        options: &str,
        callback: NativeCallback,
    ) -> NativeCode {
        flatten(c_string(record_type).and_then(|record_type| {
            let (query, options) = (c_string(query)?, c_string(options)?);
            Ok(dispatch(command, callback, |token| unsafe {
                ffi::vcx_wallet_open_search(
                    token,
                    record_type.as_ptr(),
                    query.as_ptr(),
                    options.as_ptr(),
                    Some(on_search),
                )
            }))
        }))
    }

    fn wallet_search_next_records(
        &self,
        command: CommandHandle,
        search: u32,
        count: u32,
        callback: NativeCallback,
    ) -> NativeCode {
        let Ok(search) = i32::try_from(search) else {
            return NativeCode::INVALID_WALLET_HANDLE;
        };
        dispatch(command, callback, |token| unsafe {
            ffi::vcx_wallet_search_next_records(token, search, count as usize, Some(on_str))
        })
    }

    fn wallet_close_search(
        &self,
        command: CommandHandle,
        search: u32,
        callback: NativeCallback,
    ) -> NativeCode {
        let Ok(search) = i32::try_from(search) else {
            return NativeCode::INVALID_WALLET_HANDLE;
        };
        dispatch(command, callback, |token| unsafe {
            ffi::vcx_wallet_close_search(token, search, Some(on_unit))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{mpsc, Arc};

    use super::*;

    #[test]
    fn test_route_is_dropped_when_call_is_refused() {
        let callback: NativeCallback = Arc::new(|_, _, _| {});
        let before = routes().len();
        let status = dispatch(7, callback, |_| NativeCode::INVALID_OPTION.0);
        assert_eq!(status, NativeCode::INVALID_OPTION);
        assert_eq!(routes().len(), before);
    }

    #[test]
    fn test_trampoline_restores_command_handle() {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let callback: NativeCallback = Arc::new(move |command, code, fields| {
            tx.lock().unwrap().send((command, code, fields)).unwrap();
        });
        let mut issued = 0;
        let status = dispatch(42, callback, |token| {
            issued = token;
            0
        });
        assert!(status.is_success());

        let text = CString::new("{}").unwrap();
        on_u32_str(issued, 0, 5, text.as_ptr());
        let (command, code, fields) = rx.recv().unwrap();
        assert_eq!(command, 42);
        assert_eq!(code, NativeCode::SUCCESS);
        assert_eq!(fields, vec![NativeValue::U32(5), NativeValue::Str("{}".into())]);

        // A second completion for the same token finds no route.
        on_unit(issued, 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_interior_nul_is_an_invalid_option() {
        assert_eq!(c_string("a\0b").unwrap_err(), NativeCode::INVALID_OPTION);
        assert!(as_ptr(None).is_null());
    }
}
