//! Foreign-language bindings for `VcxKit`.
//!
//! Every protocol object is exported as a uniffi object wrapping its
//! [`vcxkit_core`] counterpart. Objects are created from a [`VcxSession`] and keep it
//! alive; releasing an object invalidates its handle but the wrapper itself is freed by
//! the foreign runtime.
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod session;
pub use session::VcxSession;

mod objects;
pub use objects::*;

mod wallet;
pub use wallet::{Wallet, WalletSearch};

pub use vcxkit_core::{
    logger::{set_logger, LogLevel, Logger},
    protocol::{
        connection::ConnectionState, credential::CredentialState,
        credential_def::CredentialDefState, disclosed_proof::DisclosedProofState,
        verifier::{ProofState, VerifierState},
    },
    CommunicationMethod, ErrorKind, VcxKitError,
};

uniffi::setup_scaffolding!("vcxkit");
