use super::Poller;
use libc::{
    epoll_create1, epoll_ctl, epoll_event, epoll_wait, EPOLLERR, EPOLLHUP, EPOLLIN, EPOLL_CLOEXEC,
    EPOLL_CTL_ADD, EPOLL_CTL_DEL,
};
use std::io;
use std::os::unix::io::RawFd;

/// Maximum number of events collected per `epoll_wait`.
pub const MAX_EPOLL_EVENTS: usize = 512;

/// Linux `epoll` notification table.
///
/// Registrations are level-triggered on `EPOLLIN`, so a connection with
/// unread data keeps being reported exactly like the readiness-set strategy
/// would. Errors and hang-ups are surfaced as readable; the following read
/// reports the actual condition.
pub struct EpollPoller {
    epoll: RawFd,
    events: Vec<epoll_event>,
}

impl EpollPoller {
    pub fn new() -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll,
            events: Vec::with_capacity(MAX_EPOLL_EVENTS),
        })
    }
}

impl Poller for EpollPoller {
    fn register(&mut self, fd: RawFd) -> io::Result<()> {
        let mut event = epoll_event {
            events: EPOLLIN as u32,
            u64: fd as u64,
        };

        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn deregister(&mut self, fd: RawFd) -> io::Result<()> {
        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn wait_for_ready(&mut self, ready: &mut Vec<RawFd>) -> io::Result<()> {
        ready.clear();

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                -1,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        let readable = (EPOLLIN | EPOLLERR | EPOLLHUP) as u32;
        for ev in &self.events {
            if ev.events & readable != 0 {
                ready.push(ev.u64 as RawFd);
            }
        }

        self.events.clear();
        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epoll);
        }
    }
}
