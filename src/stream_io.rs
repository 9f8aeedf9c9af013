//! Bounded byte-stream I/O over sockets.
//!
//! These primitives are the building block of both roles. They loop until
//! the requested amount has been transferred but hand control back to the
//! caller as soon as the socket reports an interrupted or would-block
//! condition, so the outer loop always owns pacing and retry decisions.

use crate::{Error, Result};
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;

/// Returns `true` for conditions that end a bounded transfer early without
/// being an error.
fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}

/// Reads until `buffer` is full, the peer closes, or the socket would block.
///
/// Returns the number of bytes obtained. A short count is not an error: it
/// means end-of-stream or a transient condition was hit. `Ok(0)` therefore
/// signals an orderly close when the socket was reported readable.
///
/// # Errors
///
/// Any read failure other than interrupted/would-block yields
/// [`Error::NetworkRead`].
pub fn bounded_read<R: Read>(reader: &mut R, buffer: &mut [u8]) -> Result<usize> {
    let total = buffer.len();
    let mut filled = 0;

    while filled < total {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if is_transient(&e) => break,
            Err(e) => return Err(Error::NetworkRead(e)),
        }
    }

    Ok(filled)
}

/// Writes all of `buffer` unless the socket would block first.
///
/// Returns the number of bytes written, which is short only when an
/// interrupted or would-block condition was hit. The caller decides whether
/// to retry the remainder.
///
/// # Errors
///
/// A hard write failure, or a write that makes no progress, yields
/// [`Error::NetworkWrite`].
pub fn bounded_write<W: Write>(writer: &mut W, buffer: &[u8]) -> Result<usize> {
    let total = buffer.len();
    let mut written = 0;

    while written < total {
        match writer.write(&buffer[written..]) {
            Ok(0) => {
                return Err(Error::NetworkWrite(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "peer accepted zero bytes",
                )))
            }
            Ok(n) => written += n,
            Err(e) if is_transient(&e) => return Ok(written),
            Err(e) => return Err(Error::NetworkWrite(e)),
        }
    }

    Ok(total)
}

/// Puts a socket into non-blocking mode with `fcntl(2)`.
///
/// # Errors
///
/// Fails with [`Error::SocketConfig`] if either the flag query or the flag
/// update fails.
pub fn set_nonblocking<S: AsRawFd + ?Sized>(socket: &S) -> Result<()> {
    let fd = socket.as_raw_fd();

    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL, 0) };
    if flags < 0 {
        return Err(Error::SocketConfig(io::Error::last_os_error()));
    }

    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(Error::SocketConfig(io::Error::last_os_error()));
    }

    Ok(())
}
