//! `vcxkit-core` drives the VCX identity engine from Rust.
//!
//! The engine exposes every operation as a C entry point that returns an immediate
//! status and completes later through a callback. This crate turns those calls into
//! futures ([`adapter`]), keeps track of which object handles are still usable
//! ([`handle`]), and wraps each protocol object family (connections, held credentials,
//! disclosed proofs, verifier proofs and credential definitions) in a typed lifecycle
//! ([`lifecycle`], [`protocol`]).
//!
//! Everything starts from a [`Session`]:
//!
//! ```rust,no_run
//! # async fn demo() -> vcxkit_core::VcxKitResult<()> {
//! use std::sync::Arc;
//! use vcxkit_core::{protocol::connection::Connection, Session};
//!
//! let session = Arc::new(Session::from_config_json(r#"{"enable_test_mode":"true"}"#)?);
//! session.init().await?;
//!
//! let connection = Connection::create(Arc::clone(&session), Some("alice")).await?;
//! let invite = connection.connect(None).await?;
//! println!("{:?} {invite:?}", connection.get_state().await?);
//! # Ok(())
//! # }
//! ```
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod code;
pub use code::NativeCode;

mod config;
pub use config::*;

mod error;
pub use error::*;

pub mod adapter;
pub mod handle;
pub mod lifecycle;
pub mod native;
pub mod protocol;

mod session;
pub use session::*;

pub mod wallet;

/// Logging bridge for foreign hosts.
pub mod logger;

uniffi::setup_scaffolding!("vcxkit_core");
