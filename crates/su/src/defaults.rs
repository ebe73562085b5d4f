//! Compile-time configuration surface.
//!
//! These are deliberately constants, not a config file: the daemon owns
//! every policy decision, and the client ships as a fixed binary on the
//! device. The only runtime knob is the socket path override in
//! [`protocol::socket_path`], which exists for the test suites.

/// Shell invoked when the caller does not pass `-s/--shell`.
pub const DEFAULT_SHELL: &str = "/system/bin/sh";

/// Human-readable version, printed by `-v/--version` as `<version>:SU`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Monotonic version code, printed by `-V`.
pub const VERSION_CODE: i32 = 10200;

/// Exit status for malformed command lines (the daemon is never contacted).
pub const EXIT_USAGE: i32 = 2;

/// Exit status when the daemon denies authorization. EACCES's conventional
/// numeric value, matching what callers of su historically expect.
pub const EXIT_DENIED: i32 = 13;

/// Exit status when the channel fails mid-protocol. Distinct from both a
/// denial and any usage error; the remote command never ran to completion.
pub const EXIT_COMM_FAILURE: i32 = 1;
