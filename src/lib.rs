//! rntttcp - a multi-connection TCP throughput streaming engine
//!
//! This library provides the streaming core of an ntttcp-style benchmark:
//! sender threads that push a fixed byte pattern over TCP, and receiver
//! threads that multiplex many connections in a single event loop and count
//! every byte they read.
//!
//! # Features
//!
//! - Bounded, non-blocking-aware read/write primitives
//! - Start barrier shared by every thread of a run
//! - Receiver event loop over `select(2)` or Linux `epoll(7)`
//! - Lock-free shared byte counter for live throughput reporting
//!
//! # Example
//!
//! ```no_run
//! use rntttcp::{receiver, Config, Sender, StartBarrier, TransferCounter};
//! use std::thread;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let counter = TransferCounter::new();
//! let barrier = StartBarrier::new();
//!
//! let (stop, addr, receiver) = receiver::spawn_receiver(
//!     Config::receiver("127.0.0.1", 0),
//!     counter.clone(),
//!     barrier.clone(),
//! )?;
//!
//! let sender = Sender::new(Config::sender("127.0.0.1", addr.port()), barrier.clone());
//! let sending = thread::spawn(move || sender.run());
//!
//! barrier.turn_on();
//! thread::sleep(Duration::from_secs(1));
//! barrier.turn_off();
//!
//! let sent = sending.join().unwrap();
//! println!("sent {} bytes, received {} so far", sent, counter.get());
//!
//! stop.stop();
//! receiver.join().unwrap();
//! # Ok(())
//! # }
//! ```

pub mod barrier;
pub mod config;
pub mod error;
pub mod measurements;
pub mod net;
pub mod poller;
pub mod receiver;
pub mod sender;
pub mod stream_io;

pub use barrier::StartBarrier;
pub use config::{AddressFamily, Config, Role, Strategy};
pub use error::{Error, Result};
pub use measurements::{TestSummary, TransferCounter};
pub use receiver::{Receiver, StopHandle};
pub use sender::Sender;
pub use stream_io::{bounded_read, bounded_write, set_nonblocking};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
