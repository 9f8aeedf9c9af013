use crate::barrier::StartBarrier;
use crate::config::Config;
use crate::net::resolve;
use crate::stream_io::bounded_write;
use crate::{Error, Result};
use log::{debug, error, info};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpStream};
use std::thread::{self, JoinHandle};

/// Byte pattern the send buffer is filled with. Receivers never inspect it.
pub const FILL_PATTERN: u8 = b'A';

/// One streaming connection from the sender side.
///
/// The sender connects, waits for the start barrier, then writes its buffer
/// over and over until the barrier is turned off or a write fails.
///
/// # Examples
///
/// ```no_run
/// use rntttcp::{Config, Sender, StartBarrier};
/// use std::thread;
/// use std::time::Duration;
///
/// let barrier = StartBarrier::new();
/// let sender = Sender::new(Config::sender("192.168.1.100", 5001), barrier.clone());
///
/// let handle = thread::spawn(move || sender.run());
///
/// barrier.turn_on();
/// thread::sleep(Duration::from_secs(10));
/// barrier.turn_off();
///
/// println!("sent {} bytes", handle.join().unwrap());
/// ```
pub struct Sender {
    config: Config,
    barrier: StartBarrier,
}

impl Sender {
    pub fn new(config: Config, barrier: StartBarrier) -> Self {
        Self { config, barrier }
    }

    /// Connects, streams while the barrier is on, and returns the total
    /// number of bytes written. Setup failures are logged and yield 0.
    pub fn run(&self) -> u64 {
        match self.connect() {
            Ok(stream) => self.stream(stream),
            Err(e) => {
                error!("sender to {}:{} failed: {}", self.config.address, self.config.port, e);
                0
            }
        }
    }

    /// Connects to the first resolved candidate that accepts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the send buffer size is zero,
    /// [`Error::Resolve`] if the target does not resolve and
    /// [`Error::Connect`] if no candidate accepts the connection.
    pub fn connect(&self) -> Result<TcpStream> {
        if self.config.send_buffer_size == 0 {
            return Err(Error::Config(
                "send buffer size must be at least one byte".to_string(),
            ));
        }

        let candidates = resolve(&self.config)?;

        for addr in &candidates {
            match connect_to(addr) {
                Ok(stream) => {
                    match stream.local_addr() {
                        Ok(local) => debug!("New connection: local:{} --> {}", local.port(), addr),
                        Err(e) => debug!(
                            "failed to get local address for connection to {}: {}",
                            addr, e
                        ),
                    }
                    return Ok(stream);
                }
                Err(e) => error!("failed to connect to receiver {}: {}", addr, e),
            }
        }

        Err(Error::Connect(format!(
            "no candidate accepted a connection for {}:{}",
            self.config.address, self.config.port
        )))
    }

    /// Streams over an established connection. The connection is closed when
    /// this returns.
    pub fn stream(&self, mut stream: TcpStream) -> u64 {
        if self.config.send_buffer_size == 0 {
            error!("cannot stream to {} with an empty send buffer", peer_of(&stream));
            return 0;
        }

        self.barrier.wait_until_on();

        let buffer = vec![FILL_PATTERN; self.config.send_buffer_size];
        let mut total = 0u64;

        while self.barrier.is_on() {
            match bounded_write(&mut stream, &buffer) {
                Ok(n) => total += n as u64,
                Err(e) => {
                    error!("cannot write data to {}: {}", peer_of(&stream), e);
                    break;
                }
            }
        }

        if self.config.verbose {
            info!("sender to {} finished: {} bytes", peer_of(&stream), total);
        }

        total
    }
}

fn connect_to(addr: &SocketAddr) -> std::io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.connect(&(*addr).into())?;
    Ok(socket.into())
}

fn peer_of(stream: &TcpStream) -> String {
    stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string())
}

/// Runs a [`Sender`] on its own thread. The join value is the number of
/// bytes written.
pub fn spawn_sender(config: Config, barrier: StartBarrier) -> std::io::Result<JoinHandle<u64>> {
    let name = format!("sender-{}", config.port);
    thread::Builder::new()
        .name(name)
        .spawn(move || Sender::new(config, barrier).run())
}
