//! Event-multiplexing strategies for the receiver loop.
//!
//! The receiver only needs three things from the kernel: start watching a
//! descriptor, stop watching it, and block until some watched descriptors
//! are readable. [`Poller`] captures that contract; the accept/read/count
//! logic in the receiver is shared by every implementation.

mod select;

#[cfg(target_os = "linux")]
mod epoll;

pub use select::SelectPoller;

#[cfg(target_os = "linux")]
pub use epoll::EpollPoller;

use crate::config::Strategy;
use crate::{Error, Result};
use std::io;
use std::os::unix::io::RawFd;

/// Readiness multiplexer over a set of watched descriptors.
pub trait Poller: Send {
    /// Starts watching `fd` for readability.
    fn register(&mut self, fd: RawFd) -> io::Result<()>;

    /// Stops watching `fd`. Must be called before the descriptor is closed.
    fn deregister(&mut self, fd: RawFd) -> io::Result<()>;

    /// Blocks without timeout until at least one watched descriptor is
    /// readable, then fills `ready` with them.
    ///
    /// An interrupted wait returns `Ok(())` with `ready` empty.
    fn wait_for_ready(&mut self, ready: &mut Vec<RawFd>) -> io::Result<()>;
}

/// Builds the poller for the configured strategy.
pub fn for_strategy(strategy: Strategy) -> Result<Box<dyn Poller>> {
    match strategy {
        Strategy::Select => Ok(Box::new(SelectPoller::new())),
        #[cfg(target_os = "linux")]
        Strategy::Epoll => Ok(Box::new(EpollPoller::new().map_err(Error::Poll)?)),
        #[cfg(not(target_os = "linux"))]
        Strategy::Epoll => Err(Error::Config(
            "epoll strategy is only available on Linux".to_string(),
        )),
    }
}
