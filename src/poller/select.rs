use super::Poller;
use std::io;
use std::mem;
use std::os::unix::io::RawFd;
use std::ptr;

/// `select(2)` readiness set.
///
/// Keeps master read/write sets and the highest descriptor ever registered.
/// Each wait copies the master sets and rescans `0..=max_fd`, so ready
/// descriptors come back in ascending order. The watermark never shrinks on
/// deregistration.
pub struct SelectPoller {
    read_set: libc::fd_set,
    write_set: libc::fd_set,
    max_fd: RawFd,
}

unsafe impl Send for SelectPoller {}

fn empty_set() -> libc::fd_set {
    let mut set: libc::fd_set = unsafe { mem::zeroed() };
    unsafe { libc::FD_ZERO(&mut set) };
    set
}

fn check_range(fd: RawFd) -> io::Result<()> {
    if fd < 0 || fd as usize >= libc::FD_SETSIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("descriptor {} outside select() range", fd),
        ));
    }
    Ok(())
}

impl SelectPoller {
    pub fn new() -> Self {
        Self {
            read_set: empty_set(),
            write_set: empty_set(),
            max_fd: -1,
        }
    }

    /// Highest descriptor registered so far.
    pub fn max_fd(&self) -> RawFd {
        self.max_fd
    }

    /// Whether `fd` is in the master read set.
    pub fn is_watched(&self, fd: RawFd) -> bool {
        check_range(fd).is_ok() && unsafe { libc::FD_ISSET(fd, &self.read_set) }
    }
}

impl Default for SelectPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl Poller for SelectPoller {
    fn register(&mut self, fd: RawFd) -> io::Result<()> {
        check_range(fd)?;

        unsafe { libc::FD_SET(fd, &mut self.read_set) };
        if fd > self.max_fd {
            self.max_fd = fd;
        }
        Ok(())
    }

    fn deregister(&mut self, fd: RawFd) -> io::Result<()> {
        check_range(fd)?;

        unsafe { libc::FD_CLR(fd, &mut self.read_set) };
        Ok(())
    }

    fn wait_for_ready(&mut self, ready: &mut Vec<RawFd>) -> io::Result<()> {
        ready.clear();

        let mut read_set = self.read_set;
        let mut write_set = self.write_set;

        let n = unsafe {
            libc::select(
                self.max_fd + 1,
                &mut read_set,
                &mut write_set,
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        for fd in 0..=self.max_fd {
            if unsafe { libc::FD_ISSET(fd, &read_set) } {
                ready.push(fd);
            }
        }

        Ok(())
    }
}
