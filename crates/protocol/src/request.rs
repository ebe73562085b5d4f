//! The superuser request record and the tty mask.
//!
//! # Preamble Format
//!
//! The first bytes a client sends after connecting are:
//!
//! - 4 bytes: request-kind discriminator ([`REQUEST_SUPERUSER`])
//! - 8 bytes: fixed-layout request record (see [`SuRequest::encode_record`])
//! - N bytes: length-prefixed shell string
//! - N bytes: length-prefixed command string
//!
//! The record is fixed-size so the daemon can read identity and flags in
//! one exact read before touching the variable-length tail.

use std::os::unix::io::AsRawFd;

use crate::error::{ProtocolError, Result};
use crate::wire;

/// Request-kind discriminator identifying a superuser request among the
/// other request kinds the daemon control socket serves.
pub const REQUEST_SUPERUSER: i32 = 1;

/// Size of the fixed-layout request record:
/// 4 (uid) + 1 (login) + 1 (keep_env) + 1 (mount_master) + 1 (reserved).
pub const REQUEST_RECORD_LEN: usize = 8;

/// Wire value of the uid field when the client leaves the target identity
/// to the daemon's default.
pub const UID_UNSET: i32 = -1;

/// A superuser execution request.
///
/// Built once from argv and immutable from the moment the handshake
/// begins. The target uid is resolved client-side (username lookup, then
/// integer literal) so the daemon never races a name lookup against use;
/// `None` leaves the choice to the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuRequest {
    /// Target identity. `None` is encoded as [`UID_UNSET`].
    pub uid: Option<u32>,
    /// Pretend the shell is a login shell.
    pub login: bool,
    /// Preserve the caller's entire environment.
    pub keep_env: bool,
    /// Run in the global mount namespace.
    pub mount_master: bool,
    /// Shell to invoke.
    pub shell: String,
    /// Command passed to the shell. Empty means an interactive shell.
    pub command: String,
}

impl SuRequest {
    /// Create a request with the given default shell and no command.
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            uid: None,
            login: false,
            keep_env: false,
            mount_master: false,
            shell: shell.into(),
            command: String::new(),
        }
    }

    /// Encode the fixed-layout record (no strings).
    pub fn encode_record(&self) -> [u8; REQUEST_RECORD_LEN] {
        let mut record = [0u8; REQUEST_RECORD_LEN];
        let uid = self.uid.map(|u| u as i32).unwrap_or(UID_UNSET);
        record[..4].copy_from_slice(&uid.to_le_bytes());
        record[4] = self.login as u8;
        record[5] = self.keep_env as u8;
        record[6] = self.mount_master as u8;
        // record[7] reserved, must be zero
        record
    }

    /// Encode the full preamble: discriminator, record, shell, command.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(
            wire::INT_LEN + REQUEST_RECORD_LEN + self.shell.len() + self.command.len() + 8,
        );
        wire::put_i32(&mut buf, REQUEST_SUPERUSER);
        buf.extend_from_slice(&self.encode_record());
        wire::put_string(&mut buf, &self.shell)?;
        wire::put_string(&mut buf, &self.command)?;
        Ok(buf)
    }

    /// Decode a full preamble, as the daemon side does.
    ///
    /// Returns the request and the number of bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let (kind, mut offset) = wire::get_i32(data)?;
        if kind != REQUEST_SUPERUSER {
            return Err(ProtocolError::Malformed(format!(
                "unexpected request kind: {}",
                kind
            )));
        }

        if data.len() < offset + REQUEST_RECORD_LEN {
            return Err(ProtocolError::Malformed(format!(
                "truncated request record: need {} bytes, have {}",
                REQUEST_RECORD_LEN,
                data.len() - offset
            )));
        }
        let record = &data[offset..offset + REQUEST_RECORD_LEN];
        offset += REQUEST_RECORD_LEN;

        let uid_raw = i32::from_le_bytes(record[..4].try_into().unwrap());
        let uid = if uid_raw == UID_UNSET {
            None
        } else if uid_raw >= 0 {
            Some(uid_raw as u32)
        } else {
            return Err(ProtocolError::Malformed(format!(
                "invalid uid field: {}",
                uid_raw
            )));
        };

        let (shell, used) = wire::get_string(&data[offset..])?;
        offset += used;
        let (command, used) = wire::get_string(&data[offset..])?;
        offset += used;

        Ok((
            Self {
                uid,
                login: record[4] != 0,
                keep_env: record[5] != 0,
                mount_master: record[6] != 0,
                shell,
                command,
            },
            offset,
        ))
    }
}

/// Which of the three standard streams are terminals.
///
/// Computed once, before any descriptor is transmitted; any combination is
/// valid (a piped stdin with a terminal stdout is common).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttyMask {
    /// stdin is a terminal.
    pub stdin: bool,
    /// stdout is a terminal.
    pub stdout: bool,
    /// stderr is a terminal.
    pub stderr: bool,
}

impl AttyMask {
    /// No stream is a terminal.
    pub const NONE: AttyMask = AttyMask {
        stdin: false,
        stdout: false,
        stderr: false,
    };

    /// Test each standard stream of the calling process.
    pub fn detect() -> Self {
        Self {
            stdin: nix::unistd::isatty(std::io::stdin().as_raw_fd()).unwrap_or(false),
            stdout: nix::unistd::isatty(std::io::stdout().as_raw_fd()).unwrap_or(false),
            stderr: nix::unistd::isatty(std::io::stderr().as_raw_fd()).unwrap_or(false),
        }
    }

    /// Whether any stream is a terminal, i.e. a pseudo-terminal is needed.
    pub fn any(self) -> bool {
        self.stdin || self.stdout || self.stderr
    }
}
