// Mock-based tests for the bounded read/write primitives.
// The mock replays a scripted sequence of socket outcomes so partial and
// transient conditions can be exercised without real network I/O.

use rntttcp::{bounded_read, bounded_write, Error};
use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// One scripted socket outcome.
enum Step {
    /// Deliver (read) or accept (write) up to this many bytes
    Bytes(usize),
    /// Fail with this error kind
    Fail(io::ErrorKind),
}

/// Mock socket that replays scripted outcomes.
///
/// Reads yield `b'x'` bytes; once the script is exhausted reads report EOF
/// and writes accept everything.
struct MockSocket {
    script: VecDeque<Step>,
    written: Vec<u8>,
    calls: usize,
}

impl MockSocket {
    fn new(script: Vec<Step>) -> Self {
        Self {
            script: script.into(),
            written: Vec::new(),
            calls: 0,
        }
    }
}

impl Read for MockSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.calls += 1;
        match self.script.pop_front() {
            Some(Step::Bytes(n)) => {
                let n = n.min(buf.len());
                buf[..n].fill(b'x');
                Ok(n)
            }
            Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
            None => Ok(0),
        }
    }
}

impl Write for MockSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.calls += 1;
        let n = match self.script.pop_front() {
            Some(Step::Bytes(n)) => n.min(buf.len()),
            Some(Step::Fail(kind)) => return Err(io::Error::new(kind, "scripted failure")),
            None => buf.len(),
        };
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================
    // bounded_write
    // ============================================================

    #[test]
    fn test_write_accepts_everything() {
        let mut mock = MockSocket::new(vec![]);
        let buffer = vec![b'A'; 4096];

        assert_eq!(bounded_write(&mut mock, &buffer).unwrap(), 4096);
        assert_eq!(mock.written, buffer);
        assert_eq!(mock.calls, 1);
    }

    #[test]
    fn test_write_loops_over_short_writes() {
        let mut mock = MockSocket::new(vec![Step::Bytes(100), Step::Bytes(300)]);
        let buffer = vec![b'A'; 1000];

        assert_eq!(bounded_write(&mut mock, &buffer).unwrap(), 1000);
        assert_eq!(mock.written.len(), 1000);
        assert_eq!(mock.calls, 3);
    }

    #[test]
    fn test_write_would_block_after_partial() {
        let mut mock = MockSocket::new(vec![
            Step::Bytes(250),
            Step::Fail(io::ErrorKind::WouldBlock),
            Step::Bytes(1000),
        ]);
        let buffer = vec![b'A'; 1000];

        assert_eq!(bounded_write(&mut mock, &buffer).unwrap(), 250);
        // Control returns to the caller instead of retrying.
        assert_eq!(mock.calls, 2);
    }

    #[test]
    fn test_write_interrupted_returns_progress() {
        let mut mock = MockSocket::new(vec![
            Step::Bytes(10),
            Step::Fail(io::ErrorKind::Interrupted),
        ]);

        assert_eq!(bounded_write(&mut mock, &[0u8; 64]).unwrap(), 10);
    }

    #[test]
    fn test_write_would_block_immediately() {
        let mut mock = MockSocket::new(vec![Step::Fail(io::ErrorKind::WouldBlock)]);
        assert_eq!(bounded_write(&mut mock, &[0u8; 64]).unwrap(), 0);
    }

    #[test]
    fn test_write_hard_failure() {
        let mut mock = MockSocket::new(vec![
            Step::Bytes(10),
            Step::Fail(io::ErrorKind::BrokenPipe),
        ]);

        match bounded_write(&mut mock, &[0u8; 64]) {
            Err(Error::NetworkWrite(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected NetworkWrite, got {:?}", other),
        }
    }

    #[test]
    fn test_write_zero_progress_is_an_error() {
        let mut mock = MockSocket::new(vec![Step::Bytes(0)]);

        match bounded_write(&mut mock, &[0u8; 64]) {
            Err(Error::NetworkWrite(e)) => assert_eq!(e.kind(), io::ErrorKind::WriteZero),
            other => panic!("expected NetworkWrite, got {:?}", other),
        }
    }

    #[test]
    fn test_write_empty_buffer() {
        let mut mock = MockSocket::new(vec![Step::Fail(io::ErrorKind::BrokenPipe)]);
        assert_eq!(bounded_write(&mut mock, &[]).unwrap(), 0);
        assert_eq!(mock.calls, 0);
    }

    // ============================================================
    // bounded_read
    // ============================================================

    #[test]
    fn test_read_fills_buffer() {
        let mut mock = MockSocket::new(vec![Step::Bytes(600), Step::Bytes(600)]);
        let mut buffer = [0u8; 1000];

        assert_eq!(bounded_read(&mut mock, &mut buffer).unwrap(), 1000);
        assert!(buffer.iter().all(|&b| b == b'x'));
    }

    #[test]
    fn test_read_eof_after_partial() {
        let mut mock = MockSocket::new(vec![Step::Bytes(300), Step::Bytes(200)]);
        let mut buffer = [0u8; 1000];

        // Script runs dry after 500 bytes, which the mock reports as EOF.
        assert_eq!(bounded_read(&mut mock, &mut buffer).unwrap(), 500);
    }

    #[test]
    fn test_read_eof_immediately() {
        let mut mock = MockSocket::new(vec![]);
        let mut buffer = [0u8; 16];

        assert_eq!(bounded_read(&mut mock, &mut buffer).unwrap(), 0);
    }

    #[test]
    fn test_read_would_block_after_partial() {
        let mut mock = MockSocket::new(vec![
            Step::Bytes(42),
            Step::Fail(io::ErrorKind::WouldBlock),
            Step::Bytes(100),
        ]);
        let mut buffer = [0u8; 1000];

        assert_eq!(bounded_read(&mut mock, &mut buffer).unwrap(), 42);
        assert_eq!(mock.calls, 2);
    }

    #[test]
    fn test_read_interrupted_returns_progress() {
        let mut mock = MockSocket::new(vec![
            Step::Bytes(7),
            Step::Fail(io::ErrorKind::Interrupted),
        ]);
        let mut buffer = [0u8; 64];

        assert_eq!(bounded_read(&mut mock, &mut buffer).unwrap(), 7);
    }

    #[test]
    fn test_read_hard_failure() {
        let mut mock = MockSocket::new(vec![
            Step::Bytes(7),
            Step::Fail(io::ErrorKind::ConnectionReset),
        ]);
        let mut buffer = [0u8; 64];

        match bounded_read(&mut mock, &mut buffer) {
            Err(Error::NetworkRead(e)) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("expected NetworkRead, got {:?}", other),
        }
    }

    #[test]
    fn test_read_single_byte_probe() {
        let mut mock = MockSocket::new(vec![Step::Bytes(100)]);
        let mut buffer = [0u8; 1];

        assert_eq!(bounded_read(&mut mock, &mut buffer).unwrap(), 1);
        assert_eq!(mock.calls, 1);
    }
}
