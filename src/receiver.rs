//! Receiver role: listener setup and the readiness-driven event loop.
//!
//! One receiver thread owns one listener and every connection accepted on
//! it. The loop multiplexes all of them through a [`Poller`], accepts new
//! connections when the listener is ready, and adds every successful read to
//! the shared [`TransferCounter`]. A failure on one connection closes that
//! connection only; the loop keeps serving the others.

use crate::barrier::StartBarrier;
use crate::config::{Config, Strategy};
use crate::measurements::TransferCounter;
use crate::net::resolve;
use crate::poller::{self, Poller};
use crate::stream_io::{bounded_read, set_nonblocking};
use crate::{Error, Result};
use log::{debug, error, info};
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Listen backlog for each receiver socket.
pub const MAX_CONNECTIONS_PER_THREAD: i32 = 512;

/// Asks a running receiver loop to return.
///
/// Without a stop request the loop runs until the process exits.
#[derive(Clone)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    waker: Arc<UnixStream>,
}

impl StopHandle {
    /// Requests the loop to exit at its next wake-up.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        // A full pipe already holds a pending wake-up.
        let _ = (&*self.waker).write(&[1]);
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// State owned by one receiver thread.
pub struct Receiver {
    config: Config,
    listener: TcpListener,
    local_addr: SocketAddr,
    poller: Box<dyn Poller>,
    connections: HashMap<RawFd, TcpStream>,
    counter: TransferCounter,
    barrier: StartBarrier,
    buffer: Vec<u8>,
    stop: StopHandle,
    wake_rx: UnixStream,
    last_error: Option<Error>,
}

impl Receiver {
    /// Binds and listens on the configured address, ready to run.
    ///
    /// Resolved candidates are tried in order; the first that binds wins.
    ///
    /// # Errors
    ///
    /// - [`Error::Resolve`] if the bind address does not resolve
    /// - [`Error::Bind`] if no candidate could be bound
    /// - [`Error::Listen`] if `listen(2)` fails
    /// - [`Error::Config`] if the receive buffer size is zero, or the
    ///   strategy is not available on this platform
    /// - [`Error::Poll`] if the strategy cannot be built
    pub fn bind(config: Config, counter: TransferCounter, barrier: StartBarrier) -> Result<Self> {
        let backend = poller::for_strategy(config.strategy)?;
        Self::with_poller(config, counter, barrier, backend)
    }

    /// Like [`Receiver::bind`], but multiplexes through the given poller
    /// instead of the one selected by `config.strategy`.
    pub fn with_poller(
        config: Config,
        counter: TransferCounter,
        barrier: StartBarrier,
        mut poller: Box<dyn Poller>,
    ) -> Result<Self> {
        validate(&config)?;
        let candidates = resolve(&config)?;

        let mut bound = None;
        for addr in &candidates {
            match bind_candidate(addr) {
                Ok(socket) => {
                    bound = Some(socket);
                    break;
                }
                Err(e) => debug!("failed to bind the socket to local address {}: {}", addr, e),
            }
        }

        let socket = bound.ok_or_else(|| {
            let msg = format!("cannot bind the socket on address {}:{}", config.address, config.port);
            error!("{}", msg);
            Error::Bind(msg)
        })?;

        if let Err(e) = socket.listen(MAX_CONNECTIONS_PER_THREAD) {
            error!("failed to listen on address {}:{}: {}", config.address, config.port, e);
            return Err(Error::Listen(e));
        }

        let listener: TcpListener = socket.into();
        let local_addr = listener.local_addr()?;

        let (wake_rx, wake_tx) = UnixStream::pair()?;
        set_nonblocking(&wake_rx)?;
        set_nonblocking(&wake_tx)?;

        poller.register(listener.as_raw_fd()).map_err(Error::Poll)?;
        poller.register(wake_rx.as_raw_fd()).map_err(Error::Poll)?;

        debug!("receiver is listening on {}", local_addr);

        let buffer = vec![0u8; config.read_size()];

        Ok(Self {
            config,
            listener,
            local_addr,
            poller,
            connections: HashMap::new(),
            counter,
            barrier,
            buffer,
            stop: StopHandle {
                stopped: Arc::new(AtomicBool::new(false)),
                waker: Arc::new(wake_tx),
            },
            wake_rx,
            last_error: None,
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared counter this receiver adds to.
    pub fn counter(&self) -> &TransferCounter {
        &self.counter
    }

    /// Handle for stopping [`Receiver::run`] from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Number of currently open data connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Runs the event loop until a stop is requested.
    ///
    /// Per-connection and per-wait failures are logged and never end the
    /// loop.
    ///
    /// # Errors
    ///
    /// On return, the last non-fatal error seen by the loop, if any.
    pub fn run(&mut self) -> Result<()> {
        let listener_fd = self.listener.as_raw_fd();
        let wake_fd = self.wake_rx.as_raw_fd();
        let mut ready = Vec::new();

        while !self.stop.is_stopped() {
            if let Err(e) = self.poller.wait_for_ready(&mut ready) {
                error!("error happened when waiting for readiness: {}", e);
                self.last_error = Some(Error::Poll(e));
                continue;
            }

            for &fd in &ready {
                if fd == listener_fd {
                    self.accept_pending();
                } else if fd == wake_fd {
                    self.drain_waker();
                } else {
                    self.receive(fd);
                }
            }
        }

        self.close_all();
        match self.last_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn accept_pending(&mut self) {
        loop {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("error to accept new connections: {}", e);
                    self.last_error = Some(Error::Accept(e));
                    return;
                }
            };

            let fd = stream.as_raw_fd();
            if let Err(e) = set_nonblocking(&stream) {
                debug!("cannot set the new socket as non-blocking: {} ({})", fd, e);
            }

            if let Err(e) = self.poller.register(fd) {
                error!("cannot watch new connection from {} [socket {}]: {}", peer, fd, e);
                continue;
            }
            self.connections.insert(fd, stream);

            if self.config.verbose {
                match self.connections[&fd].local_addr() {
                    Ok(local) => debug!(
                        "New connection: {} --> local:{} [socket {}]",
                        peer,
                        local.port(),
                        fd
                    ),
                    Err(e) => debug!(
                        "failed to get local address information for the new socket: {} ({})",
                        fd, e
                    ),
                }
            }

            if self.config.no_sync && !self.barrier.is_on() {
                self.barrier.turn_on();
            }
        }
    }

    fn receive(&mut self, fd: RawFd) {
        let Some(stream) = self.connections.get_mut(&fd) else {
            return;
        };

        match bounded_read(stream, &mut self.buffer) {
            Ok(0) => {
                if self.config.verbose {
                    debug!("socket closed: {}", fd);
                }
                self.close(fd);
            }
            Ok(n) => self.counter.add(n as u64),
            Err(e) => {
                info!("error: cannot read data from socket: {} ({})", fd, e);
                self.last_error = Some(e);
                self.close(fd);
            }
        }
    }

    fn close(&mut self, fd: RawFd) {
        if let Err(e) = self.poller.deregister(fd) {
            debug!("failed to stop watching socket {}: {}", fd, e);
        }
        self.connections.remove(&fd);
    }

    fn close_all(&mut self) {
        let fds: Vec<RawFd> = self.connections.keys().copied().collect();
        for fd in fds {
            self.close(fd);
        }
    }

    fn drain_waker(&mut self) {
        let mut buf = [0u8; 64];
        loop {
            match (&self.wake_rx).read(&mut buf) {
                Ok(0) => return,
                Ok(_) => continue,
                Err(_) => return,
            }
        }
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.recv_buffer_size == 0 {
        return Err(Error::Config(
            "receive buffer size must be at least one byte".to_string(),
        ));
    }
    Ok(())
}

fn bind_candidate(addr: &SocketAddr) -> Result<Socket> {
    let socket = Socket::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true).map_err(Error::SocketConfig)?;
    set_nonblocking(&socket)?;
    socket
        .bind(&(*addr).into())
        .map_err(|e| Error::Bind(format!("{}: {}", addr, e)))?;
    Ok(socket)
}

/// Thread body for one receiver: bind, then run the configured strategy.
///
/// Setup failures are logged and end the thread.
pub fn run_receiver(config: Config, counter: TransferCounter, barrier: StartBarrier) {
    let port = config.port;
    let strategy = config.strategy;

    let mut receiver = match Receiver::bind(config, counter, barrier) {
        Ok(receiver) => receiver,
        Err(e) => {
            error!("listen error at port: {} ({})", port, e);
            return;
        }
    };

    if let Err(e) = receiver.run() {
        error!("{} error at port: {} ({})", strategy_name(strategy), port, e);
    }
}

/// Binds a receiver on the calling thread, then runs its loop on a new one.
///
/// Binding up front lets the caller learn about setup failures and the bound
/// address before any sender starts.
pub fn spawn_receiver(
    config: Config,
    counter: TransferCounter,
    barrier: StartBarrier,
) -> Result<(StopHandle, SocketAddr, JoinHandle<()>)> {
    let strategy = config.strategy;
    let mut receiver = Receiver::bind(config, counter, barrier)?;
    let stop = receiver.stop_handle();
    let addr = receiver.local_addr();

    let handle = thread::Builder::new()
        .name(format!("receiver-{}", addr.port()))
        .spawn(move || {
            if let Err(e) = receiver.run() {
                error!("{} error at port: {} ({})", strategy_name(strategy), addr.port(), e);
            }
        })?;

    Ok((stop, addr, handle))
}

fn strategy_name(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Select => "select",
        Strategy::Epoll => "epoll",
    }
}
