//! Raw declarations of the libvcx C entry points the binding uses.
//!
//! Every asynchronous entry point takes a command handle and a completion callback and
//! returns an immediate status. The callback shapes are named after their result
//! fields.

#![allow(non_camel_case_types)]

use std::os::raw::c_char;

pub type vcx_command_handle_t = u32;

pub type cb_unit = Option<extern "C" fn(vcx_command_handle_t, u32)>;
pub type cb_u32 = Option<extern "C" fn(vcx_command_handle_t, u32, u32)>;
pub type cb_str = Option<extern "C" fn(vcx_command_handle_t, u32, *const c_char)>;
pub type cb_u32_str = Option<extern "C" fn(vcx_command_handle_t, u32, u32, *const c_char)>;
pub type cb_endorser = Option<
    extern "C" fn(vcx_command_handle_t, u32, u32, *const c_char, *const c_char, *const c_char),
>;
pub type cb_i32 = Option<extern "C" fn(vcx_command_handle_t, u32, i32)>;

// ── Library ─────────────────────────────────────────────────────────────

extern "C" {
    pub fn vcx_init_with_config(
        command_handle: vcx_command_handle_t,
        config: *const c_char,
        cb: cb_unit,
    ) -> u32;

    pub fn vcx_version() -> *const c_char;

    pub fn vcx_shutdown(delete: bool) -> u32;

    pub fn vcx_error_c_message(error_code: u32) -> *const c_char;

    pub fn vcx_messages_update_status(
        command_handle: vcx_command_handle_t,
        message_status: *const c_char,
        msg_json: *const c_char,
        cb: cb_unit,
    ) -> u32;
}

// ── Connection ──────────────────────────────────────────────────────────

extern "C" {
    pub fn vcx_connection_create(
        command_handle: vcx_command_handle_t,
        source_id: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_connection_create_with_invite(
        command_handle: vcx_command_handle_t,
        source_id: *const c_char,
        invite_details: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_connection_create_with_outofband_invitation(
        command_handle: vcx_command_handle_t,
        source_id: *const c_char,
        invite: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_connection_connect(
        command_handle: vcx_command_handle_t,
        connection_handle: u32,
        connection_options: *const c_char,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_connection_invite_details(
        command_handle: vcx_command_handle_t,
        connection_handle: u32,
        abbreviated: bool,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_connection_send_message(
        command_handle: vcx_command_handle_t,
        connection_handle: u32,
        msg: *const c_char,
        send_msg_options: *const c_char,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_connection_get_state(
        command_handle: vcx_command_handle_t,
        connection_handle: u32,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_connection_update_state(
        command_handle: vcx_command_handle_t,
        connection_handle: u32,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_connection_update_state_with_message(
        command_handle: vcx_command_handle_t,
        connection_handle: u32,
        message: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_connection_serialize(
        command_handle: vcx_command_handle_t,
        connection_handle: u32,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_connection_deserialize(
        command_handle: vcx_command_handle_t,
        connection_data: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_connection_get_problem_report(
        command_handle: vcx_command_handle_t,
        connection_handle: u32,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_connection_release(connection_handle: u32) -> u32;
}

// ── Credential ──────────────────────────────────────────────────────────

extern "C" {
    pub fn vcx_credential_create_with_offer(
        command_handle: vcx_command_handle_t,
        source_id: *const c_char,
        offer: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_credential_create_with_msgid(
        command_handle: vcx_command_handle_t,
        source_id: *const c_char,
        connection_handle: u32,
        msg_id: *const c_char,
        cb: cb_u32_str,
    ) -> u32;

    pub fn vcx_credential_send_request(
        command_handle: vcx_command_handle_t,
        credential_handle: u32,
        connection_handle: u32,
        payment_handle: u32,
        cb: cb_unit,
    ) -> u32;

    pub fn vcx_credential_reject(
        command_handle: vcx_command_handle_t,
        credential_handle: u32,
        connection_handle: u32,
        comment: *const c_char,
        cb: cb_unit,
    ) -> u32;

    pub fn vcx_credential_get_offers(
        command_handle: vcx_command_handle_t,
        connection_handle: u32,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_credential_get_state(
        command_handle: vcx_command_handle_t,
        credential_handle: u32,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_credential_update_state(
        command_handle: vcx_command_handle_t,
        credential_handle: u32,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_credential_update_state_with_message(
        command_handle: vcx_command_handle_t,
        credential_handle: u32,
        message: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_credential_serialize(
        command_handle: vcx_command_handle_t,
        credential_handle: u32,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_credential_deserialize(
        command_handle: vcx_command_handle_t,
        credential_data: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_credential_get_problem_report(
        command_handle: vcx_command_handle_t,
        credential_handle: u32,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_credential_release(credential_handle: u32) -> u32;
}

// ── Disclosed proof ─────────────────────────────────────────────────────

extern "C" {
    pub fn vcx_disclosed_proof_create_with_request(
        command_handle: vcx_command_handle_t,
        source_id: *const c_char,
        proof_req: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_disclosed_proof_create_with_msgid(
        command_handle: vcx_command_handle_t,
        source_id: *const c_char,
        connection_handle: u32,
        msg_id: *const c_char,
        cb: cb_u32_str,
    ) -> u32;

    pub fn vcx_disclosed_proof_get_requests(
        command_handle: vcx_command_handle_t,
        connection_handle: u32,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_disclosed_proof_retrieve_credentials(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_disclosed_proof_generate_proof(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        selected_credentials: *const c_char,
        self_attested_attrs: *const c_char,
        cb: cb_unit,
    ) -> u32;

    pub fn vcx_disclosed_proof_send_proof(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        connection_handle: u32,
        cb: cb_unit,
    ) -> u32;

    pub fn vcx_disclosed_proof_reject_proof(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        connection_handle: u32,
        cb: cb_unit,
    ) -> u32;

    pub fn vcx_disclosed_proof_decline_presentation_request(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        connection_handle: u32,
        reason: *const c_char,
        proposal: *const c_char,
        cb: cb_unit,
    ) -> u32;

    pub fn vcx_disclosed_proof_get_state(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_disclosed_proof_update_state(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_disclosed_proof_update_state_with_message(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        message: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_disclosed_proof_serialize(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_disclosed_proof_deserialize(
        command_handle: vcx_command_handle_t,
        proof_data: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_disclosed_proof_get_problem_report(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_disclosed_proof_release(proof_handle: u32) -> u32;
}

// ── Proof (verifier) ────────────────────────────────────────────────────

extern "C" {
    pub fn vcx_proof_create(
        command_handle: vcx_command_handle_t,
        source_id: *const c_char,
        requested_attrs: *const c_char,
        requested_predicates: *const c_char,
        revocation_interval: *const c_char,
        name: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_proof_create_with_proposal(
        command_handle: vcx_command_handle_t,
        source_id: *const c_char,
        presentation_proposal: *const c_char,
        name: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_proof_send_request(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        connection_handle: u32,
        cb: cb_unit,
    ) -> u32;

    pub fn vcx_get_proof(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        connection_handle: u32,
        cb: cb_u32_str,
    ) -> u32;

    pub fn vcx_proof_get_state(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_proof_update_state(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_proof_update_state_with_message(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        message: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_proof_serialize(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_proof_deserialize(
        command_handle: vcx_command_handle_t,
        proof_data: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_proof_get_problem_report(
        command_handle: vcx_command_handle_t,
        proof_handle: u32,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_proof_release(proof_handle: u32) -> u32;
}

// ── Credential definition ───────────────────────────────────────────────

extern "C" {
    pub fn vcx_credentialdef_create(
        command_handle: vcx_command_handle_t,
        source_id: *const c_char,
        credentialdef_name: *const c_char,
        schema_id: *const c_char,
        issuer_did: *const c_char,
        tag: *const c_char,
        revocation_details: *const c_char,
        payment_handle: u32,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_credentialdef_create_with_id(
        command_handle: vcx_command_handle_t,
        source_id: *const c_char,
        cred_def_id: *const c_char,
        issuer_did: *const c_char,
        revocation_config: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_credentialdef_prepare_for_endorser(
        command_handle: vcx_command_handle_t,
        source_id: *const c_char,
        credentialdef_name: *const c_char,
        schema_id: *const c_char,
        issuer_did: *const c_char,
        tag: *const c_char,
        revocation_details: *const c_char,
        endorser: *const c_char,
        cb: cb_endorser,
    ) -> u32;

    pub fn vcx_credentialdef_get_cred_def_id(
        command_handle: vcx_command_handle_t,
        credentialdef_handle: u32,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_credentialdef_get_state(
        command_handle: vcx_command_handle_t,
        credentialdef_handle: u32,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_credentialdef_update_state(
        command_handle: vcx_command_handle_t,
        credentialdef_handle: u32,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_credentialdef_serialize(
        command_handle: vcx_command_handle_t,
        credentialdef_handle: u32,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_credentialdef_deserialize(
        command_handle: vcx_command_handle_t,
        credentialdef_data: *const c_char,
        cb: cb_u32,
    ) -> u32;

    pub fn vcx_credentialdef_release(credentialdef_handle: u32) -> u32;
}

// ── Wallet ──────────────────────────────────────────────────────────────

extern "C" {
    pub fn vcx_wallet_add_record(
        command_handle: vcx_command_handle_t,
        type_: *const c_char,
        id: *const c_char,
        value: *const c_char,
        tags_json: *const c_char,
        cb: cb_unit,
    ) -> u32;

    pub fn vcx_wallet_get_record(
        command_handle: vcx_command_handle_t,
        type_: *const c_char,
        id: *const c_char,
        options_json: *const c_char,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_wallet_update_record_value(
        command_handle: vcx_command_handle_t,
        type_: *const c_char,
        id: *const c_char,
        value: *const c_char,
        cb: cb_unit,
    ) -> u32;

    pub fn vcx_wallet_delete_record(
        command_handle: vcx_command_handle_t,
        type_: *const c_char,
        id: *const c_char,
        cb: cb_unit,
    ) -> u32;

    pub fn vcx_wallet_open_search(
        command_handle: vcx_command_handle_t,
        type_: *const c_char,
        query_json: *const c_char,
        options_json: *const c_char,
        cb: cb_i32,
    ) -> u32;

    pub fn vcx_wallet_search_next_records(
        command_handle: vcx_command_handle_t,
        wallet_search_handle: i32,
        count: usize,
        cb: cb_str,
    ) -> u32;

    pub fn vcx_wallet_close_search(
        command_handle: vcx_command_handle_t,
        search_handle: i32,
        cb: cb_unit,
    ) -> u32;
}
