//! End-to-end subscriber flow over real TCP and a real filesystem watch.
//!
//! Watch events arrive on OS notification timing, so every expectation here
//! polls under a deadline instead of sleeping a fixed interval.

use std::fs::OpenOptions;
use std::io::Write;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tempfile::TempDir;
use tokio::io::{AsyncWriteExt, ReadHalf};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::timeout;

use filepulse_client::ProtocolClient;
use filepulse_protocol::Message;
use filepulse_server::{ListenAddr, NotificationServer, ServerConfig};

const DEADLINE: Duration = Duration::from_secs(15);

fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn append_line(path: &std::path::Path) {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .expect("open watch target");
    writeln!(file, "entry").expect("append to watch target");
}

async fn connect_subscriber(
    addr: std::net::SocketAddr,
) -> (
    ProtocolClient<ReadHalf<TcpStream>>,
    tokio::io::WriteHalf<TcpStream>,
) {
    let stream = TcpStream::connect(addr).await.expect("connect subscriber");
    let (read_half, write_half) = tokio::io::split(stream);
    (ProtocolClient::new(read_half), write_half)
}

async fn expect_watching(client: &mut ProtocolClient<ReadHalf<TcpStream>>, file: &str) {
    let message = timeout(DEADLINE, client.next_message())
        .await
        .expect("watching within deadline")
        .expect("read")
        .expect("some");
    assert_eq!(
        message,
        Message::Watching {
            file: file.to_string()
        }
    );
}

/// Read messages until a `changed` stamped at or after `min_timestamp`
/// arrives. Earlier queued change events (a single write can produce
/// several) are drained and ignored.
async fn expect_changed_after(
    client: &mut ProtocolClient<ReadHalf<TcpStream>>,
    min_timestamp: u64,
) -> u64 {
    timeout(DEADLINE, async {
        loop {
            let message = client
                .next_message()
                .await
                .expect("read")
                .expect("stream stays open");
            match message {
                Message::Changed { timestamp } if timestamp >= min_timestamp => {
                    return timestamp;
                }
                Message::Changed { .. } => continue,
                other => panic!("expected changed, got {other:?}"),
            }
        }
    })
    .await
    .expect("changed within deadline")
}

#[tokio::test]
async fn two_subscribers_are_independent_and_clean_up_on_disconnect() {
    let dir = TempDir::new().expect("tempdir");
    let target = dir.path().join("report.log");
    std::fs::write(&target, b"seed\n").expect("seed file");
    let target_label = target.display().to_string();

    let config = ServerConfig::new(
        target.clone(),
        ListenAddr::Tcp("127.0.0.1:0".parse().expect("addr")),
    );
    let server = NotificationServer::bind(config).await.expect("bind");
    let addr = server.local_addr().expect("tcp addr");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let server_handle = {
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move { server.run(shutdown_rx).await })
    };

    // Both subscribers get their own greeting.
    let (mut first, mut first_write) = connect_subscriber(addr).await;
    let (mut second, _second_write) = connect_subscriber(addr).await;
    expect_watching(&mut first, &target_label).await;
    expect_watching(&mut second, &target_label).await;

    // Both watch registrations happen right after each greeting; give the
    // OS a beat before the first modification.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let before_first_change = unix_millis_now();
    append_line(&target);

    let first_ts = expect_changed_after(&mut first, before_first_change).await;
    let second_ts = expect_changed_after(&mut second, before_first_change).await;

    // Timestamps are wall-clock at observation: same modification, small
    // tolerance around the write time.
    let now = unix_millis_now();
    for ts in [first_ts, second_ts] {
        assert!(
            ts >= before_first_change && ts <= now,
            "timestamp {ts} outside [{before_first_change}, {now}]",
        );
    }

    // First subscriber leaves; its session must die without touching the
    // second one.
    first_write.shutdown().await.expect("close first subscriber");
    let first_eof = timeout(DEADLINE, first.next_message())
        .await
        .expect("first subscriber eof within deadline")
        .expect("read");
    assert!(first_eof.is_none(), "server should close the session stream");

    let before_second_change = unix_millis_now();
    append_line(&target);
    expect_changed_after(&mut second, before_second_change).await;

    let _ = shutdown_tx.send(());
    timeout(DEADLINE, server_handle)
        .await
        .expect("server stops on shutdown")
        .expect("join")
        .expect("server result");
}

#[tokio::test]
async fn unix_socket_listener_serves_the_same_protocol() {
    let dir = TempDir::new().expect("tempdir");
    let target = dir.path().join("report.log");
    std::fs::write(&target, b"seed\n").expect("seed file");
    let socket = dir.path().join("filepulse.sock");

    let config = ServerConfig::new(target.clone(), ListenAddr::Unix(socket.clone()));
    let server = NotificationServer::bind(config).await.expect("bind");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let server_handle = {
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move { server.run(shutdown_rx).await })
    };

    let stream = tokio::net::UnixStream::connect(&socket)
        .await
        .expect("connect over unix socket");
    let (read_half, _write_half) = tokio::io::split(stream);
    let mut client = ProtocolClient::new(read_half);

    let greeting = timeout(DEADLINE, client.next_message())
        .await
        .expect("watching within deadline")
        .expect("read")
        .expect("some");
    assert_eq!(
        greeting,
        Message::Watching {
            file: target.display().to_string()
        }
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
    let before = unix_millis_now();
    append_line(&target);

    let changed = timeout(DEADLINE, async {
        loop {
            match client.next_message().await.expect("read").expect("open") {
                Message::Changed { timestamp } if timestamp >= before => break timestamp,
                Message::Changed { .. } => continue,
                other => panic!("expected changed, got {other:?}"),
            }
        }
    })
    .await
    .expect("changed within deadline");
    assert!(changed >= before);

    let _ = shutdown_tx.send(());
    timeout(DEADLINE, server_handle)
        .await
        .expect("server stops on shutdown")
        .expect("join")
        .expect("server result");

    assert!(!socket.exists(), "socket unlinked on shutdown");
}
