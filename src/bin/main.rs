use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{error, info};
use rntttcp::config::{AddressFamily, Role, Strategy, DEFAULT_BUFFER_SIZE, DEFAULT_PORT};
use rntttcp::receiver::spawn_receiver;
use rntttcp::sender::spawn_sender;
use rntttcp::{Config, StartBarrier, TestSummary, TransferCounter};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "rntttcp")]
#[command(about = "Multi-connection TCP throughput test", long_about = None)]
#[command(version)]
struct Cli {
    /// Log every connection
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the summary as JSON
    #[arg(short = 'J', long, global = true)]
    json: bool,

    /// Use IPv6 addresses only
    #[arg(short = '6', long, global = true)]
    ipv6: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run receiver threads on consecutive ports
    Receiver {
        /// First port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Address to bind
        #[arg(short, long)]
        bind: Option<String>,

        /// Number of receiver threads (one port each)
        #[arg(short = 'n', long, default_value = "1")]
        threads: u16,

        /// Use epoll instead of select
        #[arg(short, long)]
        epoll: bool,

        /// Receive buffer size in bytes
        #[arg(short = 'l', long, default_value_t = DEFAULT_BUFFER_SIZE, value_parser = parse_buffer_size)]
        length: usize,

        /// Test duration in seconds, counted from the first connection
        #[arg(short = 't', long, default_value = "60")]
        time: u64,
    },

    /// Stream to a receiver
    Sender {
        /// Receiver address
        server: String,

        /// First receiver port
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Number of receiver ports to target
        #[arg(short = 'n', long, default_value = "1")]
        threads: u16,

        /// Connections per receiver port
        #[arg(short = 'P', long, default_value = "1")]
        parallel: usize,

        /// Send buffer size in bytes
        #[arg(short = 'l', long, default_value_t = DEFAULT_BUFFER_SIZE, value_parser = parse_buffer_size)]
        length: usize,

        /// Test duration in seconds
        #[arg(short = 't', long, default_value = "60")]
        time: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let family = if cli.ipv6 {
        AddressFamily::Ipv6
    } else {
        AddressFamily::Unspecified
    };

    let summary = match cli.command {
        Commands::Receiver {
            port,
            bind,
            threads,
            epoll,
            length,
            time,
        } => {
            let bind = bind.unwrap_or_else(|| if cli.ipv6 { "::" } else { "0.0.0.0" }.to_string());
            let strategy = if epoll { Strategy::Epoll } else { Strategy::Select };
            let base = Config::receiver(bind, port)
                .with_family(family)
                .with_strategy(strategy)
                .with_recv_buffer_size(length)
                .with_verbose(cli.verbose)
                .with_no_sync(true);

            run_receivers(base, threads, Duration::from_secs(time))?
        }

        Commands::Sender {
            server,
            port,
            threads,
            parallel,
            length,
            time,
        } => {
            let base = Config::sender(server, port)
                .with_family(family)
                .with_send_buffer_size(length)
                .with_verbose(cli.verbose);

            run_senders(base, threads, parallel, Duration::from_secs(time))?
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }

    Ok(())
}

fn parse_buffer_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("buffer size must be at least 1 byte".to_string()),
        Ok(size) => Ok(size),
        Err(e) => Err(format!("invalid buffer size '{}': {}", s, e)),
    }
}

fn ports(base: u16, threads: u16) -> anyhow::Result<Vec<u16>> {
    (0..threads)
        .map(|i| {
            base.checked_add(i)
                .with_context(|| format!("port range {}+{} overflows", base, threads))
        })
        .collect()
}

fn run_receivers(base: Config, threads: u16, duration: Duration) -> anyhow::Result<TestSummary> {
    let counter = TransferCounter::new();
    let barrier = StartBarrier::new();

    let mut receivers = Vec::new();
    for port in ports(base.port, threads)? {
        let config = base.clone().with_port(port);
        match spawn_receiver(config, counter.clone(), barrier.clone()) {
            Ok((stop, addr, handle)) => {
                info!("receiver listening on {}", addr);
                receivers.push((stop, handle));
            }
            Err(e) => error!("listen error at port: {} ({})", port, e),
        }
    }
    anyhow::ensure!(!receivers.is_empty(), "no receiver could be started");

    info!("waiting for the first connection");
    barrier.wait_until_on();
    info!("test started");

    let start = Instant::now();
    thread::sleep(duration);
    let bytes = counter.get();
    let elapsed = start.elapsed();

    let started = receivers.len();
    for (stop, _) in &receivers {
        stop.stop();
    }
    for (_, handle) in receivers {
        if handle.join().is_err() {
            error!("receiver thread panicked");
        }
    }

    Ok(TestSummary::new(Role::Receiver, started, bytes, elapsed))
}

fn run_senders(
    base: Config,
    threads: u16,
    parallel: usize,
    duration: Duration,
) -> anyhow::Result<TestSummary> {
    let barrier = StartBarrier::new();

    let mut senders = Vec::new();
    for port in ports(base.port, threads)? {
        for _ in 0..parallel {
            let config = base.clone().with_port(port);
            senders.push(spawn_sender(config, barrier.clone())?);
        }
    }
    let connections = senders.len();

    barrier.turn_on();
    info!("test started with {} connection(s)", connections);

    let start = Instant::now();
    thread::sleep(duration);
    barrier.turn_off();

    let mut bytes = 0u64;
    for handle in senders {
        match handle.join() {
            Ok(sent) => bytes += sent,
            Err(_) => error!("sender thread panicked"),
        }
    }
    let elapsed = start.elapsed();

    Ok(TestSummary::new(Role::Sender, connections, bytes, elapsed))
}
