//! # RootLink su client library
//!
//! The client half of RootLink's privilege-elevation facility: it turns a
//! command line into a superuser execution request, hands it to the
//! privileged daemon over the control socket, transparently relays the
//! invoking terminal to the remotely executed command, and propagates its
//! exit status.
//!
//! The daemon owns the authorization decision; this client only consumes
//! the accept/deny acknowledgment and is deliberately unable to bypass a
//! denial — no descriptor of the invoking process crosses the socket
//! before the daemon accepted the request.
//!
//! ## Modules
//!
//! - [`cli`]: argv normalization, option parsing, request construction
//! - [`channel`]: the one connection to the daemon
//! - [`session`]: handshake → relay → result collection
//! - [`pty`]: raw-mode guard, pumps, resize forwarding
//! - [`signals`]: signal-safe teardown
//! - [`defaults`]: compile-time configuration surface

pub mod channel;
pub mod cli;
pub mod defaults;
pub mod pty;
pub mod session;
pub mod signals;

pub use channel::{Ack, DaemonChannel};
pub use cli::{Cli, UsageError};
pub use session::{run_session, SuError};

// Re-export the wire contract for integration tests and tooling.
pub use protocol;
