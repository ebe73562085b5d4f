//! Descriptor passing over the daemon channel.
//!
//! This is the only place in the system that touches `sendmsg`/`recvmsg`
//! and `SCM_RIGHTS`. Everything above it exchanges [`OwnedFd`]s.
//!
//! # Message Shape
//!
//! Each descriptor-transfer message is a single tag byte. [`FD_PRESENT`]
//! carries exactly one descriptor in an `SCM_RIGHTS` control message;
//! [`FD_NONE`] is the "no descriptor" sentinel and carries none. On the
//! stream socket each tag byte is written and read with one
//! `sendmsg`/`recvmsg` pair, so ancillary data always arrives attached to
//! its own tag.
//!
//! The functions return [`std::io::Result`] rather than the protocol error
//! type: the socket may be in non-blocking mode, and callers retrying on
//! `WouldBlock` need the raw error kind.

use std::io::{self, IoSlice, IoSliceMut};
use std::os::unix::io::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use nix::cmsg_space;
use nix::sys::socket::{recvmsg, sendmsg, ControlMessage, ControlMessageOwned, MsgFlags};

/// Tag byte: a descriptor accompanies this message.
pub const FD_PRESENT: u8 = 1;

/// Tag byte: the "no descriptor" sentinel.
pub const FD_NONE: u8 = 0;

/// Send one descriptor-transfer message on `sock`.
///
/// `Some(fd)` transfers the descriptor itself, so the peer inherits the
/// same open file description rather than a copy of its contents. `None`
/// sends the sentinel.
pub fn send_fd(sock: RawFd, fd: Option<BorrowedFd<'_>>) -> io::Result<()> {
    let tag = [if fd.is_some() { FD_PRESENT } else { FD_NONE }];
    let iov = [IoSlice::new(&tag)];

    let sent = match fd {
        Some(fd) => {
            let fds = [fd.as_raw_fd()];
            let cmsgs = [ControlMessage::ScmRights(&fds)];
            sendmsg::<()>(sock, &iov, &cmsgs, MsgFlags::empty(), None)
        }
        None => sendmsg::<()>(sock, &iov, &[], MsgFlags::empty(), None),
    }
    .map_err(io::Error::from)?;

    if sent != tag.len() {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            "short write during descriptor transfer",
        ));
    }
    Ok(())
}

/// Receive one descriptor-transfer message from `sock`.
///
/// Returns `Ok(Some(fd))` for a transferred descriptor and `Ok(None)` for
/// the sentinel. Received descriptors are opened close-on-exec.
pub fn recv_fd(sock: RawFd) -> io::Result<Option<OwnedFd>> {
    let mut tag = [0u8; 1];
    let mut cmsg_buffer = cmsg_space!([RawFd; 1]);

    let received = {
        let mut iov = [IoSliceMut::new(&mut tag)];
        let msg = recvmsg::<()>(
            sock,
            &mut iov,
            Some(&mut cmsg_buffer),
            MsgFlags::MSG_CMSG_CLOEXEC,
        )
        .map_err(io::Error::from)?;

        if msg.bytes == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed during descriptor transfer",
            ));
        }

        let mut received = None;
        for cmsg in msg.cmsgs().map_err(io::Error::from)? {
            if let ControlMessageOwned::ScmRights(fds) = cmsg {
                for fd in fds {
                    // SAFETY: the kernel installed a fresh descriptor for
                    // this process; we are its sole owner.
                    received = Some(unsafe { OwnedFd::from_raw_fd(fd) });
                }
            }
        }
        received
    };

    match (tag[0], received) {
        (FD_NONE, None) => Ok(None),
        (FD_PRESENT, Some(fd)) => Ok(Some(fd)),
        (FD_PRESENT, None) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "descriptor announced but no control message received",
        )),
        (FD_NONE, Some(_)) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "unexpected descriptor on a sentinel message",
        )),
        (other, _) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid descriptor tag: {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::unix::io::AsFd;

    use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};

    fn stream_pair() -> (OwnedFd, OwnedFd) {
        socketpair(
            AddressFamily::Unix,
            SockType::Stream,
            None,
            SockFlag::empty(),
        )
        .unwrap()
    }

    #[test]
    fn test_sentinel_roundtrip() {
        let (a, b) = stream_pair();
        send_fd(a.as_raw_fd(), None).unwrap();
        let received = recv_fd(b.as_raw_fd()).unwrap();
        assert!(received.is_none());
    }

    #[test]
    fn test_descriptor_roundtrip_shares_open_file() {
        let (a, b) = stream_pair();
        let (pipe_r, pipe_w) = nix::unistd::pipe().unwrap();

        send_fd(a.as_raw_fd(), Some(pipe_w.as_fd())).unwrap();
        let received = recv_fd(b.as_raw_fd()).unwrap().expect("descriptor");

        // Writing through the received descriptor must surface on the
        // original pipe: same open file description, not a copy.
        let mut received_file = std::fs::File::from(received);
        received_file.write_all(b"through the wire").unwrap();
        drop(received_file);
        drop(pipe_w);

        let mut buf = Vec::new();
        std::fs::File::from(pipe_r).read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"through the wire");
    }

    #[test]
    fn test_three_stream_sequence_preserves_order() {
        // The fd relay sends stdin, stdout, stderr in fixed order with a
        // mix of real descriptors and sentinels.
        let (a, b) = stream_pair();
        let (pipe_r, pipe_w) = nix::unistd::pipe().unwrap();

        send_fd(a.as_raw_fd(), Some(pipe_r.as_fd())).unwrap();
        send_fd(a.as_raw_fd(), None).unwrap();
        send_fd(a.as_raw_fd(), Some(pipe_w.as_fd())).unwrap();

        assert!(recv_fd(b.as_raw_fd()).unwrap().is_some());
        assert!(recv_fd(b.as_raw_fd()).unwrap().is_none());
        assert!(recv_fd(b.as_raw_fd()).unwrap().is_some());
    }

    #[test]
    fn test_recv_on_closed_peer_is_eof() {
        let (a, b) = stream_pair();
        drop(a);
        let err = recv_fd(b.as_raw_fd()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_recv_rejects_unknown_tag() {
        let (a, b) = stream_pair();
        // Write a garbage tag byte directly, bypassing send_fd.
        nix::unistd::write(a.as_fd(), &[7u8]).unwrap();
        let err = recv_fd(b.as_raw_fd()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
