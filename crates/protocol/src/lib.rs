//! # RootLink Protocol Library
//!
//! This crate is the wire-level contract between the RootLink `su` client
//! and the privileged daemon.
//!
//! ## Overview
//!
//! One su invocation is one connection and one strictly ordered exchange:
//!
//! ```text
//! client                                daemon
//!   │ discriminator + request record +    │
//!   │ shell + command (length-prefixed)   │
//!   ├────────────────────────────────────▶│
//!   │            ack (0 = authorized)     │
//!   │◀────────────────────────────────────┤
//!   │ stdin / stdout / stderr descriptor  │
//!   │ messages, then the pty flag         │
//!   ├────────────────────────────────────▶│
//!   │     pty master (only if flag = 1)   │
//!   │◀────────────────────────────────────┤
//!   │            ...execution...          │
//!   │            final exit status        │
//!   │◀────────────────────────────────────┤
//! ```
//!
//! No descriptor belonging to the client crosses the socket before the
//! acknowledgment came back as "authorized".
//!
//! ## Modules
//!
//! - [`request`]: the fixed-layout request record and the tty mask
//! - [`wire`]: integer and length-prefixed string codecs
//! - [`fdpass`]: descriptor transfer (`SCM_RIGHTS`) capability
//! - [`error`]: error types

pub mod error;
pub mod fdpass;
pub mod request;
pub mod wire;

pub use error::{ProtocolError, Result};
pub use request::{
    AttyMask, SuRequest, REQUEST_RECORD_LEN, REQUEST_SUPERUSER, UID_UNSET,
};
pub use wire::{INT_LEN, MAX_STRING_LEN};

use std::path::PathBuf;

/// Default path of the daemon control socket.
pub const DEFAULT_SOCKET_PATH: &str = "/dev/socket/rootlink";

/// Environment variable overriding the control socket path.
///
/// Used by the test suites to point the client at a mock daemon; on a real
/// device the default path is compiled in.
pub const SOCKET_PATH_ENV: &str = "ROOTLINK_SOCKET";

/// Resolve the daemon control socket path.
///
/// Honors [`SOCKET_PATH_ENV`] when set and non-empty, otherwise returns
/// [`DEFAULT_SOCKET_PATH`].
pub fn socket_path() -> PathBuf {
    match std::env::var(SOCKET_PATH_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_SOCKET_PATH),
    }
}
