//! One su invocation from handshake to exit status.
//!
//! Control flow is strictly linear through request transmission, the
//! accept/deny acknowledgment and the descriptor relay, then conditionally
//! concurrent while the terminal pumps run, converging on the final
//! status read. The handshake happens-before any pump; exit-status
//! retrieval never begins before the output pump observed end-of-stream.

use std::io;
use std::os::unix::io::AsFd;
use std::path::PathBuf;

use thiserror::Error;

use protocol::error::ProtocolError;
use protocol::request::{AttyMask, SuRequest};

use crate::channel::{Ack, DaemonChannel};
use crate::defaults;
use crate::pty::{self, RawModeGuard};
use crate::signals;

/// Failure modes of one su invocation, beyond the usage errors the CLI
/// layer reports itself.
#[derive(Debug, Error)]
pub enum SuError {
    /// The daemon refused authorization. Occurs strictly before any
    /// descriptor is exposed.
    #[error("Permission denied")]
    Denied,

    /// The daemon control socket could not be reached.
    #[error("cannot connect to daemon at {path}: {source}")]
    Connect {
        /// Socket path the client tried.
        path: PathBuf,
        /// Underlying connect failure.
        source: io::Error,
    },

    /// The channel closed or errored mid-protocol. Never retried.
    #[error("daemon communication failed: {0}")]
    Protocol(#[from] ProtocolError),

    /// Local terminal or relay failure.
    #[error("terminal relay failed: {0}")]
    Relay(io::Error),
}

impl SuError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            SuError::Denied => defaults::EXIT_DENIED,
            _ => defaults::EXIT_COMM_FAILURE,
        }
    }
}

/// Run one complete exchange against the daemon at [`protocol::socket_path`]
/// and return the remote command's exit status.
///
/// `mask` must have been computed before calling; it decides which streams
/// are handed over directly and whether a pseudo-terminal is negotiated.
pub async fn run_session(request: &SuRequest, mask: AttyMask) -> Result<i32, SuError> {
    let path = protocol::socket_path();
    let mut channel = DaemonChannel::connect(&path)
        .await
        .map_err(|source| SuError::Connect { path, source })?;

    channel.send_request(request).await?;

    match channel.read_ack().await? {
        Ack::Authorized => {}
        Ack::Denied(code) => {
            // Fast fail: nothing else crosses the socket after a denial.
            tracing::warn!(code, "daemon denied the request");
            return Err(SuError::Denied);
        }
    }

    let wants_pty = channel.send_stdio(mask).await?;

    if wants_pty {
        let master = channel.recv_pty_master().await?;
        tracing::debug!("pseudo-terminal master received");

        signals::install_quit_handlers().map_err(|e| SuError::Relay(e.into()))?;

        let _guard = if mask.stdin {
            match RawModeGuard::new(std::io::stdin().as_fd()) {
                Ok(guard) => Some(guard),
                Err(e) => {
                    tracing::warn!(error = %e, "could not switch stdin to raw mode");
                    None
                }
            }
        } else {
            None
        };

        pty::run_relay(master).await.map_err(SuError::Relay)?;
        // _guard drops here: raw mode ends with the output pump, before
        // the status read.
    }

    let status = channel.read_exit_status().await?;
    tracing::debug!(status, "remote command finished");
    Ok(status)
}
