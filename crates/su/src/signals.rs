//! Process-wide cleanup on terminating signals.
//!
//! The handler exists for one reason: a process must never die leaving the
//! invoking terminal in raw mode. On any terminating signal it restores
//! the published pre-raw terminal configuration, force-closes the three
//! standard streams so any relay pump blocked on them wakes up, and
//! reinstalls the default dispositions so the signal's fatal effect
//! proceeds normally afterwards. It cleans up; it never suppresses.
//!
//! The published termios slot is the only process-wide mutable state in
//! the client. It is an atomic pointer so the handler body stays
//! async-signal-safe: the handler only loads it, while allocation and
//! release happen on the normal control flow in [`publish_termios`] and
//! [`discard_termios`].

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

/// The signals that terminate an su session.
pub const QUIT_SIGNALS: [Signal; 7] = [
    Signal::SIGALRM,
    Signal::SIGABRT,
    Signal::SIGHUP,
    Signal::SIGPIPE,
    Signal::SIGQUIT,
    Signal::SIGTERM,
    Signal::SIGINT,
];

static SAVED_TERMIOS: AtomicPtr<libc::termios> = AtomicPtr::new(ptr::null_mut());

/// Publish the pre-raw terminal configuration for the handler to restore.
///
/// Called by the raw-mode guard when it switches the terminal, replacing
/// any previously published configuration.
pub fn publish_termios(termios: libc::termios) {
    let fresh = Box::into_raw(Box::new(termios));
    let stale = SAVED_TERMIOS.swap(fresh, Ordering::SeqCst);
    if !stale.is_null() {
        // SAFETY: every non-null pointer in the slot came from
        // Box::into_raw in this function.
        drop(unsafe { Box::from_raw(stale) });
    }
}

/// Withdraw the published configuration once the guard restored the
/// terminal itself.
pub fn discard_termios() {
    let stale = SAVED_TERMIOS.swap(ptr::null_mut(), Ordering::SeqCst);
    if !stale.is_null() {
        // SAFETY: see publish_termios.
        drop(unsafe { Box::from_raw(stale) });
    }
}

/// Cleanup-only signal handler. Restricted to async-signal-safe calls:
/// `tcsetattr`, `close`, `signal`.
extern "C" fn on_quit_signal(_sig: libc::c_int) {
    let saved = SAVED_TERMIOS.load(Ordering::SeqCst);
    unsafe {
        if !saved.is_null() {
            libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, saved);
        }

        // Closing the standard streams wakes every pump currently blocked
        // on them, letting the foreground proceed to teardown.
        libc::close(libc::STDIN_FILENO);
        libc::close(libc::STDOUT_FILENO);
        libc::close(libc::STDERR_FILENO);

        for sig in QUIT_SIGNALS {
            libc::signal(sig as libc::c_int, libc::SIG_DFL);
        }
    }
}

/// Install the cleanup handler for every signal in [`QUIT_SIGNALS`].
pub fn install_quit_handlers() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_quit_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for sig in QUIT_SIGNALS {
        // SAFETY: the handler is restricted to async-signal-safe calls.
        unsafe {
            sigaction(sig, &action)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_quit_signal_set_matches_terminating_signals() {
        assert_eq!(
            QUIT_SIGNALS,
            [
                Signal::SIGALRM,
                Signal::SIGABRT,
                Signal::SIGHUP,
                Signal::SIGPIPE,
                Signal::SIGQUIT,
                Signal::SIGTERM,
                Signal::SIGINT,
            ]
        );
    }

    #[test]
    #[serial]
    fn test_publish_and_discard_termios() {
        // SAFETY: an all-zero termios is a valid value for storage.
        let termios: libc::termios = unsafe { std::mem::zeroed() };
        publish_termios(termios);
        publish_termios(termios); // replacing must not leak or crash
        discard_termios();
        discard_termios(); // idempotent
    }

    #[test]
    #[serial]
    fn test_install_quit_handlers() {
        install_quit_handlers().unwrap();

        // Put the default dispositions back so later tests see a clean
        // process state.
        let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
        for sig in QUIT_SIGNALS {
            unsafe {
                sigaction(sig, &default).unwrap();
            }
        }
    }
}
