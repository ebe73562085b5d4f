//! Terminal relay for a negotiated pseudo-terminal session.
//!
//! The client holds only the master side of the pair, received from the
//! daemon as an already open descriptor. Three tasks run for the life of
//! the session: an input pump (local stdin → master), an output pump
//! (master → local stdout), and a resize watcher forwarding SIGWINCH
//! geometry changes. The foreground awaits the output pump; its
//! end-of-stream means the remote command closed its side and the final
//! status can be read from the control channel.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, BorrowedFd, OwnedFd, RawFd};

use nix::sys::termios::{self, SetArg, Termios};
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

use crate::signals;

/// Buffer size for the relay pumps.
const PUMP_BUFFER_SIZE: usize = 8192;

/// Scoped raw-mode acquisition for the local terminal.
///
/// Construction saves the current configuration, publishes it to the
/// signal module (so the quit-signal handler can restore it if the
/// process is killed mid-session) and switches to raw mode. Dropping the
/// guard restores the saved configuration on every exit path.
pub struct RawModeGuard {
    fd: RawFd,
    saved: Termios,
}

impl RawModeGuard {
    /// Switch `fd` to raw mode, remembering the prior configuration.
    pub fn new(fd: BorrowedFd<'_>) -> nix::Result<Self> {
        let saved = termios::tcgetattr(fd)?;
        signals::publish_termios(saved.clone().into());

        let mut raw = saved.clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(fd, SetArg::TCSANOW, &raw)?;

        Ok(Self {
            fd: fd.as_raw_fd(),
            saved,
        })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        signals::discard_termios();
        // SAFETY: the guarded descriptor is one of the standard streams,
        // open for the life of the process.
        let fd = unsafe { BorrowedFd::borrow_raw(self.fd) };
        let _ = termios::tcsetattr(fd, SetArg::TCSANOW, &self.saved);
    }
}

/// Whether an I/O error means the stream is simply over.
///
/// A pty master reports the hangup of its slave side as `EIO`; that is
/// the normal end of a session. `EBADF` appears after the quit-signal
/// handler force-closed the standard streams, and a broken pipe means the
/// other end of the relay went away first.
fn is_stream_end(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(libc::EIO) | Some(libc::EBADF))
        || err.kind() == io::ErrorKind::BrokenPipe
}

/// Copy bytes from `from` to `to` until end-of-stream.
///
/// Returns the number of bytes relayed. The relay is a direct copy; no
/// buffering policy beyond the fixed chunk size is imposed.
fn copy_bytes(mut from: impl Read, mut to: impl Write) -> io::Result<u64> {
    let mut buf = [0u8; PUMP_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match from.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(ref e) if is_stream_end(e) => return Ok(total),
            Err(e) => return Err(e),
        };
        match to.write_all(&buf[..n]) {
            Ok(()) => {}
            Err(ref e) if is_stream_end(e) => return Ok(total),
            Err(e) => return Err(e),
        }
        let _ = to.flush();
        total += n as u64;
    }
}

/// Read the terminal geometry of `src` and apply it to `dst`.
pub fn sync_window_size(src: RawFd, dst: RawFd) -> io::Result<()> {
    // SAFETY: TIOCGWINSZ and TIOCSWINSZ read and write a plain winsize
    // struct owned by this frame.
    unsafe {
        let mut ws: libc::winsize = std::mem::zeroed();
        if libc::ioctl(src, libc::TIOCGWINSZ, &mut ws) != 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::ioctl(dst, libc::TIOCSWINSZ, &ws) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Spawn the resize watcher: on every SIGWINCH, forward the geometry of
/// `src` (the local terminal) to `dst` (the pty master).
///
/// The geometry is synchronized once up front so the remote side never
/// observes a default size before the first resize.
pub fn spawn_resize_watcher(src: RawFd, dst: RawFd) -> io::Result<JoinHandle<()>> {
    let mut winch = signal(SignalKind::window_change())?;
    if let Err(e) = sync_window_size(src, dst) {
        tracing::debug!(error = %e, "initial window size sync failed");
    }
    Ok(tokio::spawn(async move {
        while winch.recv().await.is_some() {
            if let Err(e) = sync_window_size(src, dst) {
                tracing::debug!(error = %e, "window size sync failed");
            }
        }
    }))
}

/// Spawn the input pump: local stdin → pty master.
///
/// The pump ends on stdin end-of-stream or when the quit-signal handler
/// closes stdin under it; it is never cancelled explicitly.
pub fn spawn_input_pump(master: File) -> JoinHandle<io::Result<u64>> {
    tokio::task::spawn_blocking(move || copy_bytes(io::stdin(), master))
}

/// Run the relay over a received pty master until the remote side hangs
/// up.
///
/// The output pump runs on the calling task's await point and is the one
/// the session waits on: returning from this function means end-of-stream
/// was observed and it is safe to read the final status from the control
/// channel without interleaving.
pub async fn run_relay(master: OwnedFd) -> io::Result<()> {
    let master_write = File::from(master);
    let master_read = master_write.try_clone()?;

    let stdout_fd = io::stdout().as_raw_fd();
    let _resize = spawn_resize_watcher(stdout_fd, master_write.as_raw_fd())?;
    let _input = spawn_input_pump(master_write);

    let relayed = tokio::task::spawn_blocking(move || copy_bytes(master_read, io::stdout()))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
    tracing::debug!(bytes = relayed, "output pump finished");
    Ok(())
}
