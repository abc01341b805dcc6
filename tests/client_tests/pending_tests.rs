//! Tests for PendingRequest
//!
//! These tests verify:
//! - Reply decoding over a real socket
//! - Timeout after the backoff schedule runs out
//! - Cancellation, explicit and by drop
//! - Faults for unreachable peers and undecodable replies
//! - Reply framing: split replies are cut short, endless ones are bounded
//! - Independent concurrent requests

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use talkwire::protocol::{Command, MAX_REPLY_SIZE};
use talkwire::{Client, Outcome, TalkError, NO_RESULT};

// =============================================================================
// Helper Functions
// =============================================================================

/// Peer stub for one query: reads the 2-byte request, waits `delay`,
/// writes `reply` (if any), then holds the socket until the client hangs up.
/// Returns the request bytes and how long the client kept the socket open.
fn stub_peer(reply: Vec<u8>, delay: Duration) -> (SocketAddr, JoinHandle<(Vec<u8>, Duration)>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let opened = Instant::now();

        let mut request = [0u8; 2];
        stream.read_exact(&mut request).unwrap();

        thread::sleep(delay);
        if !reply.is_empty() {
            stream.write_all(&reply).unwrap();
        }

        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
        (request.to_vec(), opened.elapsed())
    });
    (addr, handle)
}

fn client_for(addr: SocketAddr) -> Client {
    Client::new("127.0.0.1", addr.port())
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_single_byte_reply() {
    let (addr, stub) = stub_peer(vec![0x01], Duration::ZERO);

    let pending = client_for(addr).get_pause();
    assert_eq!(pending.command(), Command::GetPause);
    assert_eq!(pending.result().unwrap(), 1);

    let (request, _) = stub.join().unwrap();
    assert_eq!(request, vec![0x10, 0x01]);
}

#[test]
fn test_two_byte_reply_is_big_endian() {
    let (addr, stub) = stub_peer(vec![0x00, 0x05], Duration::ZERO);

    let pending = client_for(addr).get_task_count();
    assert_eq!(pending.result().unwrap(), 5);

    let (request, _) = stub.join().unwrap();
    assert_eq!(request, vec![0x30, 0x01]);
}

#[test]
fn test_four_byte_reply() {
    let (addr, stub) = stub_peer(vec![0x00, 0x00, 0x01, 0x00], Duration::ZERO);

    let outcome = client_for(addr).get_task_count().wait();
    assert!(matches!(outcome, Outcome::Success(256)));

    stub.join().unwrap();
}

#[test]
fn test_delayed_reply_within_budget() {
    let (addr, stub) = stub_peer(vec![0x01], Duration::from_millis(100));

    let pending = client_for(addr).get_now_playing();
    assert_eq!(pending.command(), Command::GetNowPlaying);
    assert_eq!(pending.result().unwrap(), 1);

    stub.join().unwrap();
}

#[test]
fn test_undecodable_reply_is_fault() {
    let (addr, stub) = stub_peer(vec![0x00, 0x00, 0x07], Duration::ZERO);

    let pending = client_for(addr).get_task_count();
    match pending.wait() {
        Outcome::Fault(TalkError::Decode { len }) => assert_eq!(len, 3),
        other => panic!("Expected decode fault, got {:?}", other),
    }

    stub.join().unwrap();
}

#[test]
fn test_reply_split_across_writes_is_cut_short() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    // 0x00 0x05 would decode to 5, but only the first byte is read as the reply
    let stub = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 2];
        stream.read_exact(&mut request).unwrap();

        stream.write_all(&[0x00]).unwrap();
        thread::sleep(Duration::from_millis(30));
        let _ = stream.write_all(&[0x05]);

        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
    });

    let outcome = client_for(addr).get_task_count().wait();
    assert!(
        matches!(outcome, Outcome::Success(0)),
        "Expected truncated reply, got {:?}",
        outcome
    );

    stub.join().unwrap();
}

#[test]
fn test_endless_reply_stops_reading_past_max_size() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    // Write far more than any reply in one go; fails once the client hangs up
    let stub = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 2];
        stream.read_exact(&mut request).unwrap();
        let _ = stream.write_all(&vec![0xAB; 64 * 1024]);
    });

    match client_for(addr).get_task_count().wait() {
        Outcome::Fault(TalkError::Decode { len }) => assert_eq!(len, MAX_REPLY_SIZE + 1),
        other => panic!("Expected decode fault, got {:?}", other),
    }

    stub.join().unwrap();
}

// =============================================================================
// Timeout Tests
// =============================================================================

#[test]
fn test_silent_peer_times_out_with_sentinel() {
    let (addr, stub) = stub_peer(Vec::new(), Duration::ZERO);

    let start = Instant::now();
    let pending = client_for(addr).get_task_count();
    assert!(!pending.is_completed());

    assert!(wait_until(Duration::from_secs(5), || pending.is_completed()));
    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(1000),
        "Timed out too early: {:?}",
        elapsed
    );

    assert!(matches!(pending.wait(), Outcome::Timeout));

    // The client closed the socket when it gave up
    let (_, held) = stub.join().unwrap();
    assert!(held < Duration::from_secs(5));
}

#[test]
fn test_timeout_result_is_sentinel_not_error() {
    let (addr, stub) = stub_peer(Vec::new(), Duration::ZERO);
    let client = client_for(addr).with_backoff(Duration::from_millis(1), 3);

    assert_eq!(client.get_pause().result().unwrap(), NO_RESULT);

    stub.join().unwrap();
}

#[test]
fn test_custom_backoff_shortens_timeout() {
    let (addr, stub) = stub_peer(Vec::new(), Duration::ZERO);
    let client = client_for(addr).with_backoff(Duration::from_millis(2), 4);

    let start = Instant::now();
    assert!(matches!(client.get_pause().wait(), Outcome::Timeout));
    let elapsed = start.elapsed();

    // 2 + 4 + 8 + 16 ms
    assert!(elapsed >= Duration::from_millis(30));
    assert!(elapsed < Duration::from_millis(1000));

    stub.join().unwrap();
}

#[test]
fn test_peer_closing_without_reply_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let stub = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 2];
        stream.read_exact(&mut request).unwrap();
        request
    });

    let client = client_for(addr);
    let start = Instant::now();
    assert!(matches!(client.get_task_count().wait(), Outcome::Timeout));
    assert!(start.elapsed() >= Duration::from_millis(1000));
    assert_eq!(stub.join().unwrap(), [0x30, 0x01]);
}

#[test]
fn test_peer_closing_without_reply_yields_sentinel() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let stub = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 2];
        stream.read_exact(&mut request).unwrap();
    });

    let client = client_for(addr).with_backoff(Duration::from_millis(1), 4);
    assert_eq!(client.get_pause().result().unwrap(), NO_RESULT);

    stub.join().unwrap();
}

// =============================================================================
// Cancellation Tests
// =============================================================================

#[test]
fn test_cancel_before_reply() {
    let (addr, stub) = stub_peer(Vec::new(), Duration::ZERO);

    let start = Instant::now();
    let pending = client_for(addr).get_task_count();
    thread::sleep(Duration::from_millis(50));
    pending.cancel();

    assert!(matches!(pending.wait(), Outcome::Cancelled));
    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_millis(900),
        "Cancel was not observed early: {:?}",
        elapsed
    );

    stub.join().unwrap();
}

#[test]
fn test_cancelled_result_is_sentinel() {
    let (addr, stub) = stub_peer(Vec::new(), Duration::ZERO);

    let pending = client_for(addr).get_now_playing();
    pending.cancel();
    pending.cancel();

    assert_eq!(pending.result().unwrap(), NO_RESULT);

    stub.join().unwrap();
}

#[test]
fn test_cancel_after_completion_has_no_effect() {
    let (addr, stub) = stub_peer(vec![0x00, 0x09], Duration::ZERO);

    let pending = client_for(addr).get_task_count();
    assert!(wait_until(Duration::from_secs(2), || pending.is_completed()));
    pending.cancel();

    assert_eq!(pending.result().unwrap(), 9);

    stub.join().unwrap();
}

#[test]
fn test_drop_cancels_and_closes_socket() {
    let (addr, stub) = stub_peer(Vec::new(), Duration::ZERO);

    let pending = client_for(addr).get_task_count();
    thread::sleep(Duration::from_millis(30));
    drop(pending);

    let (_, held) = stub.join().unwrap();
    assert!(
        held < Duration::from_millis(900),
        "Socket held for {:?} after drop",
        held
    );
}

// =============================================================================
// Fault Tests
// =============================================================================

#[test]
fn test_unreachable_peer_is_fault() {
    let client = Client::new("127.0.0.1", closed_port());

    let pending = client.get_pause();
    match pending.wait() {
        Outcome::Fault(TalkError::Connection { .. }) => {}
        other => panic!("Expected connection fault, got {:?}", other),
    }
}

#[test]
fn test_fault_is_raised_by_result() {
    let client = Client::new("127.0.0.1", closed_port());

    let result = client.get_task_count().result();
    assert!(matches!(result, Err(TalkError::Connection { .. })));
}

#[test]
fn test_outcome_helpers() {
    assert_eq!(Outcome::Success(4).value(), Some(4));
    assert!(Outcome::Success(4).is_success());
    assert_eq!(Outcome::Timeout.value(), None);
    assert_eq!(Outcome::Timeout.into_result().unwrap(), -1);
    assert_eq!(Outcome::Cancelled.into_result().unwrap(), -1);
    assert!(Outcome::Fault(TalkError::WorkerLost).into_result().is_err());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_requests_complete_independently() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    // Answer the second connection first, then the first one much later
    let stub = thread::spawn(move || {
        let mut streams: Vec<TcpStream> = Vec::new();
        for _ in 0..2 {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 2];
            stream.read_exact(&mut request).unwrap();
            assert_eq!(request, [0x30, 0x01]);
            streams.push(stream);
        }

        streams[1].write_all(&2i32.to_be_bytes()).unwrap();
        thread::sleep(Duration::from_millis(300));
        streams[0].write_all(&1i32.to_be_bytes()).unwrap();

        for mut stream in streams {
            let mut rest = Vec::new();
            let _ = stream.read_to_end(&mut rest);
        }
    });

    let client = client_for(addr);
    let first = client.get_task_count();
    let second = client.get_task_count();

    let mut pending = vec![first, second];
    assert!(wait_until(Duration::from_secs(3), || pending
        .iter()
        .any(|p| p.is_completed())));

    let done = pending.iter().position(|p| p.is_completed()).unwrap();
    let early = pending.remove(done);
    let late = pending.remove(0);
    assert!(!late.is_completed());

    assert_eq!(early.result().unwrap(), 2);
    assert_eq!(late.result().unwrap(), 1);

    stub.join().unwrap();
}

#[test]
fn test_many_concurrent_requests() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    const REQUESTS: u8 = 8;

    // Each connection is answered with its accept index
    let stub = thread::spawn(move || {
        let mut handlers = Vec::new();
        for index in 0..REQUESTS {
            let (mut stream, _) = listener.accept().unwrap();
            handlers.push(thread::spawn(move || {
                let mut request = [0u8; 2];
                stream.read_exact(&mut request).unwrap();
                stream.write_all(&[index]).unwrap();
                let mut rest = Vec::new();
                let _ = stream.read_to_end(&mut rest);
            }));
        }
        for handler in handlers {
            handler.join().unwrap();
        }
    });

    let client = client_for(addr);
    let pending: Vec<_> = (0..REQUESTS).map(|_| client.get_pause()).collect();

    let mut values: Vec<i32> = pending
        .into_iter()
        .map(|p| p.result().unwrap())
        .collect();
    values.sort_unstable();

    assert_eq!(values, (0..REQUESTS as i32).collect::<Vec<_>>());

    stub.join().unwrap();
}
