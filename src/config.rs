use serde::{Deserialize, Serialize};

/// Default TCP port used by both roles.
pub const DEFAULT_PORT: u16 = 5001;

/// Default size of the application send/receive buffers (64 KB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Address family used when resolving the bind or remote address.
///
/// `Unspecified` accepts whatever the resolver returns, in resolver order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressFamily {
    /// Any family the resolver returns
    Unspecified,
    /// IPv4 only
    Ipv4,
    /// IPv6 only
    Ipv6,
}

/// Readiness-multiplexing strategy used by the receiver event loop.
///
/// Both strategies share one contract; they only differ in how readiness
/// is collected from the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// `select(2)` over a readiness set, rescanned on every wake-up
    Select,
    /// Linux `epoll(7)` notification table
    Epoll,
}

/// Which side of the stream a thread plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Binds, accepts and counts bytes
    Receiver,
    /// Connects and streams bytes
    Sender,
}

/// Per-thread role configuration.
///
/// One `Config` is handed to each receiver or sender thread and stays
/// immutable for the lifetime of that thread. Use the role constructors and
/// the `with_*` builder methods to customize it.
///
/// # Examples
///
/// ## Receiver
///
/// ```
/// use rntttcp::{Config, Strategy};
///
/// let config = Config::receiver("0.0.0.0", 5001)
///     .with_strategy(Strategy::Select)
///     .with_recv_buffer_size(128 * 1024)
///     .with_no_sync(true);
/// ```
///
/// ## Sender
///
/// ```
/// use rntttcp::Config;
///
/// let config = Config::sender("192.168.1.100", 5001)
///     .with_send_buffer_size(256 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Receiver or sender
    pub role: Role,

    /// Address family filter applied to resolved addresses
    pub family: AddressFamily,

    /// Bind address (receiver) or remote address (sender)
    pub address: String,

    /// Port to bind or connect to
    pub port: u16,

    /// Size of the buffer written per sender iteration
    pub send_buffer_size: usize,

    /// Size of the buffer read per receiver wake-up
    pub recv_buffer_size: usize,

    /// Emit per-connection diagnostics
    pub verbose: bool,

    /// Receiver multiplexing strategy
    pub strategy: Strategy,

    /// Connections of this receiver are single-byte synchronization probes
    pub sync_probe: bool,

    /// No external sync thread: the first accepted connection starts the test
    pub no_sync: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            role: Role::Receiver,
            family: AddressFamily::Unspecified,
            address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            send_buffer_size: DEFAULT_BUFFER_SIZE,
            recv_buffer_size: DEFAULT_BUFFER_SIZE,
            verbose: false,
            strategy: Strategy::Select,
            sync_probe: false,
            no_sync: false,
        }
    }
}

impl Config {
    /// Creates a receiver configuration bound to `address:port`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rntttcp::Config;
    ///
    /// let config = Config::receiver("127.0.0.1", 5001);
    /// assert_eq!(config.port, 5001);
    /// ```
    pub fn receiver(address: impl Into<String>, port: u16) -> Self {
        Self {
            role: Role::Receiver,
            address: address.into(),
            port,
            ..Default::default()
        }
    }

    /// Creates a sender configuration targeting `address:port`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rntttcp::Config;
    ///
    /// let config = Config::sender("127.0.0.1", 5001);
    /// assert_eq!(config.address, "127.0.0.1");
    /// ```
    pub fn sender(address: impl Into<String>, port: u16) -> Self {
        Self {
            role: Role::Sender,
            address: address.into(),
            port,
            ..Default::default()
        }
    }

    /// Restricts address resolution to one family.
    pub fn with_family(mut self, family: AddressFamily) -> Self {
        self.family = family;
        self
    }

    /// Overrides the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the per-iteration send buffer size.
    ///
    /// # Examples
    ///
    /// ```
    /// use rntttcp::Config;
    ///
    /// let config = Config::sender("127.0.0.1", 5001)
    ///     .with_send_buffer_size(256 * 1024);
    /// assert_eq!(config.send_buffer_size, 256 * 1024);
    /// ```
    pub fn with_send_buffer_size(mut self, size: usize) -> Self {
        self.send_buffer_size = size;
        self
    }

    /// Sets the per-read receive buffer size.
    pub fn with_recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Enables per-connection diagnostics.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Selects the receiver multiplexing strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Marks the receiver's connections as synchronization probes, which are
    /// read one byte at a time.
    pub fn with_sync_probe(mut self, sync_probe: bool) -> Self {
        self.sync_probe = sync_probe;
        self
    }

    /// When set, the receiver turns the start barrier on at its first
    /// accepted connection instead of waiting for an external sync thread.
    pub fn with_no_sync(mut self, no_sync: bool) -> Self {
        self.no_sync = no_sync;
        self
    }

    /// Number of bytes the receiver asks for per read.
    pub fn read_size(&self) -> usize {
        if self.sync_probe {
            1
        } else {
            self.recv_buffer_size
        }
    }
}
