//! The one connection to the privilege-elevation daemon.
//!
//! A `DaemonChannel` lives for exactly one su invocation: connect, send
//! the request, read the acknowledgment, relay descriptors, read the final
//! exit status, drop. There is no reconnect and no protocol-level timeout;
//! the client blocks until the daemon answers or the channel dies.
//!
//! Descriptor passing is bridged into the async runtime with
//! [`tokio::net::UnixStream::async_io`]: the raw `sendmsg`/`recvmsg` from
//! [`protocol::fdpass`] runs whenever the socket reports readiness, and
//! `WouldBlock` results re-arm the readiness wait.

use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt, Interest};
use tokio::net::UnixStream;

use protocol::error::{ProtocolError, Result};
use protocol::request::{AttyMask, SuRequest};
use protocol::{fdpass, wire};

/// Outcome of the authorization handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// The daemon authorized the request; the exchange continues.
    Authorized,
    /// The daemon refused. The exchange is over; no descriptor may be
    /// transmitted after this.
    Denied(i32),
}

/// The single client connection to the daemon control socket.
pub struct DaemonChannel {
    stream: UnixStream,
}

impl DaemonChannel {
    /// Connect to the daemon at the given socket path.
    ///
    /// A connection failure typically means no daemon is installed or the
    /// caller cannot reach the control socket.
    pub async fn connect(path: &Path) -> std::io::Result<Self> {
        let stream = UnixStream::connect(path).await?;
        tracing::debug!(path = %path.display(), "connected to daemon");
        Ok(Self { stream })
    }

    /// Send the request preamble: discriminator, fixed record, shell and
    /// command strings.
    pub async fn send_request(&mut self, request: &SuRequest) -> Result<()> {
        let preamble = request.encode()?;
        self.stream.write_all(&preamble).await?;
        tracing::debug!(
            uid = ?request.uid,
            login = request.login,
            mount_master = request.mount_master,
            "request sent"
        );
        Ok(())
    }

    /// Read the daemon's accept/deny acknowledgment.
    pub async fn read_ack(&mut self) -> Result<Ack> {
        let code = self.read_i32().await?;
        if code == 0 {
            Ok(Ack::Authorized)
        } else {
            Ok(Ack::Denied(code))
        }
    }

    /// Relay the three standard streams, then the pseudo-terminal flag.
    ///
    /// For each of stdin, stdout, stderr in fixed order: a terminal stream
    /// sends the "allocate from pseudo-terminal" sentinel, anything else
    /// transfers the real descriptor so the daemon inherits the same open
    /// file description. Returns whether a pseudo-terminal was requested.
    ///
    /// Callers must have seen [`Ack::Authorized`] first; this method is
    /// the first point where descriptors cross the socket.
    pub async fn send_stdio(&mut self, mask: AttyMask) -> Result<bool> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();

        self.send_fd_message((!mask.stdin).then(|| stdin.as_fd()))
            .await?;
        self.send_fd_message((!mask.stdout).then(|| stdout.as_fd()))
            .await?;
        self.send_fd_message((!mask.stderr).then(|| stderr.as_fd()))
            .await?;

        let wants_pty = mask.any();
        self.write_i32(wants_pty as i32).await?;
        tracing::debug!(?mask, pty = wants_pty, "standard streams relayed");
        Ok(wants_pty)
    }

    /// Receive the pseudo-terminal master descriptor.
    pub async fn recv_pty_master(&mut self) -> Result<OwnedFd> {
        let sock = self.stream.as_raw_fd();
        let fd = self
            .stream
            .async_io(Interest::READABLE, || fdpass::recv_fd(sock))
            .await
            .map_err(ProtocolError::from)?;
        fd.ok_or(ProtocolError::DescriptorMissing)
    }

    /// Read the remote command's final exit status.
    ///
    /// A failure here is a communication error, not a nonzero remote
    /// status; the two must never be conflated.
    pub async fn read_exit_status(&mut self) -> Result<i32> {
        self.read_i32().await
    }

    async fn send_fd_message(&self, fd: Option<BorrowedFd<'_>>) -> Result<()> {
        let sock = self.stream.as_raw_fd();
        self.stream
            .async_io(Interest::WRITABLE, || fdpass::send_fd(sock, fd))
            .await
            .map_err(ProtocolError::from)
    }

    async fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; wire::INT_LEN];
        self.stream.read_exact(&mut buf).await?;
        let (value, _) = wire::get_i32(&buf)?;
        Ok(value)
    }

    async fn write_i32(&mut self, value: i32) -> Result<()> {
        let mut buf = Vec::with_capacity(wire::INT_LEN);
        wire::put_i32(&mut buf, value);
        self.stream.write_all(&buf).await?;
        Ok(())
    }
}
