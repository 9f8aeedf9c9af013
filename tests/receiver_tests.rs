// Loopback tests for listener setup and the receiver event loop.

use rntttcp::receiver::spawn_receiver;
use rntttcp::{Config, Error, Receiver, StartBarrier, Strategy, TransferCounter};
use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(10);

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn loopback(strategy: Strategy) -> Config {
    Config::receiver("127.0.0.1", 0)
        .with_strategy(strategy)
        .with_recv_buffer_size(16 * 1024)
}

fn strategies() -> Vec<Strategy> {
    if cfg!(target_os = "linux") {
        vec![Strategy::Select, Strategy::Epoll]
    } else {
        vec![Strategy::Select]
    }
}

fn send_bytes(addr: SocketAddr, bytes: usize) {
    let mut stream = TcpStream::connect(addr).unwrap();
    let chunk = vec![b'A'; 8192];
    let mut left = bytes;
    while left > 0 {
        let n = left.min(chunk.len());
        stream.write_all(&chunk[..n]).unwrap();
        left -= n;
    }
}

// ============================================================
// Listener setup
// ============================================================

#[test]
fn test_bind_free_port() {
    let receiver = Receiver::bind(
        loopback(Strategy::Select),
        TransferCounter::new(),
        StartBarrier::new(),
    )
    .unwrap();

    assert_ne!(receiver.local_addr().port(), 0);
    assert_eq!(receiver.connection_count(), 0);
    assert_eq!(receiver.counter().get(), 0);
}

#[test]
fn test_bind_port_in_use() {
    let holder = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = holder.local_addr().unwrap().port();

    let result = Receiver::bind(
        Config::receiver("127.0.0.1", port),
        TransferCounter::new(),
        StartBarrier::new(),
    );

    assert!(matches!(result, Err(Error::Bind(_))));
}

#[test]
fn test_bind_unresolvable_address() {
    let result = Receiver::bind(
        Config::receiver("not a host name", 0),
        TransferCounter::new(),
        StartBarrier::new(),
    );

    assert!(matches!(result, Err(Error::Resolve(_))));
}

#[test]
fn test_zero_receive_buffer_rejected() {
    let result = spawn_receiver(
        Config::receiver("127.0.0.1", 0).with_recv_buffer_size(0),
        TransferCounter::new(),
        StartBarrier::new(),
    );

    assert!(matches!(result, Err(Error::Config(_))));
}

// ============================================================
// Event loop
// ============================================================

#[test]
fn test_counts_every_byte_from_concurrent_clients() {
    const CLIENTS: usize = 16;
    const BYTES: usize = 256 * 1024 + 17;

    for strategy in strategies() {
        let counter = TransferCounter::new();
        let (stop, addr, handle) =
            spawn_receiver(loopback(strategy), counter.clone(), StartBarrier::new()).unwrap();

        let clients: Vec<_> = (0..CLIENTS)
            .map(|_| thread::spawn(move || send_bytes(addr, BYTES)))
            .collect();
        for client in clients {
            client.join().unwrap();
        }

        let expected = (CLIENTS * BYTES) as u64;
        assert!(
            wait_for(|| counter.get() >= expected),
            "{:?}: received {} of {}",
            strategy,
            counter.get(),
            expected
        );

        // Nothing is double counted once every client has closed.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.get(), expected, "{:?}", strategy);

        stop.stop();
        handle.join().unwrap();
    }
}

#[test]
fn test_first_connection_turns_barrier_on_without_sync_thread() {
    for strategy in strategies() {
        let barrier = StartBarrier::new();
        let config = loopback(strategy).with_no_sync(true);
        let (stop, addr, handle) =
            spawn_receiver(config, TransferCounter::new(), barrier.clone()).unwrap();

        assert!(!barrier.is_on());
        let _client = TcpStream::connect(addr).unwrap();
        assert!(barrier.wait_until_on_timeout(WAIT), "{:?}", strategy);

        stop.stop();
        handle.join().unwrap();
    }
}

#[test]
fn test_barrier_left_to_sync_thread() {
    let barrier = StartBarrier::new();
    let counter = TransferCounter::new();
    let (stop, addr, handle) =
        spawn_receiver(loopback(Strategy::Select), counter.clone(), barrier.clone()).unwrap();

    send_bytes(addr, 1000);
    assert!(wait_for(|| counter.get() == 1000));
    assert!(!barrier.is_on());

    stop.stop();
    handle.join().unwrap();
}

#[test]
fn test_sync_probe_reads_single_bytes() {
    for strategy in strategies() {
        let counter = TransferCounter::new();
        let config = loopback(strategy).with_sync_probe(true);
        let (stop, addr, handle) =
            spawn_receiver(config, counter.clone(), StartBarrier::new()).unwrap();

        let mut probe = TcpStream::connect(addr).unwrap();
        probe.write_all(b"0123456789").unwrap();

        assert!(wait_for(|| counter.get() == 10), "{:?}", strategy);
        drop(probe);

        stop.stop();
        handle.join().unwrap();
    }
}

#[test]
fn test_failed_connection_does_not_affect_others() {
    let counter = TransferCounter::new();
    let (stop, addr, handle) =
        spawn_receiver(loopback(Strategy::Select), counter.clone(), StartBarrier::new()).unwrap();

    let mut healthy = TcpStream::connect(addr).unwrap();
    healthy.write_all(&[b'A'; 500]).unwrap();
    assert!(wait_for(|| counter.get() == 500));

    // Abort a second connection with a reset.
    let doomed = TcpStream::connect(addr).unwrap();
    socket2::SockRef::from(&doomed)
        .set_linger(Some(Duration::ZERO))
        .unwrap();
    drop(doomed);

    thread::sleep(Duration::from_millis(50));
    healthy.write_all(&[b'A'; 700]).unwrap();
    assert!(wait_for(|| counter.get() == 1200));

    drop(healthy);
    stop.stop();
    handle.join().unwrap();
}

#[test]
fn test_stop_ends_loop() {
    for strategy in strategies() {
        let mut receiver =
            Receiver::bind(loopback(strategy), TransferCounter::new(), StartBarrier::new())
                .unwrap();
        let addr = receiver.local_addr();
        let stop = receiver.stop_handle();

        let handle = thread::spawn(move || receiver.run());

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(b"hello").unwrap();
        thread::sleep(Duration::from_millis(50));

        stop.stop();
        assert!(stop.is_stopped());
        assert!(handle.join().unwrap().is_ok(), "{:?}", strategy);
    }
}

#[test]
fn test_stop_before_run_returns_immediately() {
    let mut receiver = Receiver::bind(
        loopback(Strategy::Select),
        TransferCounter::new(),
        StartBarrier::new(),
    )
    .unwrap();

    receiver.stop_handle().stop();
    assert!(receiver.run().is_ok());
}
