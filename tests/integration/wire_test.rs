// tests/integration/wire_test.rs

//! On-wire end-to-end tests: a real listener, real sockets, byte-exact
//! request and reply framing.

use opaldb::config::Config;
use opaldb::server;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

/// Binds a server on an ephemeral local port and serves it in the background.
async fn start_server() -> SocketAddr {
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Config::default()
    };
    let ctx = server::setup(config).await.expect("server setup failed");
    let addr = ctx.listener.local_addr().unwrap();
    tokio::spawn(server::serve(ctx));
    addr
}

/// Encodes a command the way a client would: an array of bulk strings.
fn resp_command(parts: &[&str]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", parts.len()).into_bytes();
    for part in parts {
        out.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
        out.extend_from_slice(part.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Reads exactly `expected.len()` bytes and asserts they match.
async fn expect_reply(stream: &mut TcpStream, expected: &[u8]) {
    let mut buf = vec![0u8; expected.len()];
    timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
        .await
        .expect("timed out waiting for reply")
        .expect("connection closed early");
    assert_eq!(
        buf,
        expected,
        "reply mismatch: got {:?}, want {:?}",
        String::from_utf8_lossy(&buf),
        String::from_utf8_lossy(expected)
    );
}

#[tokio::test]
async fn test_wire_ping() {
    let addr = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
    expect_reply(&mut stream, b"+PONG\r\n").await;
}

#[tokio::test]
async fn test_wire_echo() {
    let addr = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(b"*2\r\n$4\r\nECHO\r\n$5\r\nhello\r\n")
        .await
        .unwrap();
    expect_reply(&mut stream, b"$5\r\nhello\r\n").await;
}

#[tokio::test]
async fn test_wire_set_get_with_px() {
    let addr = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(&resp_command(&["SET", "k", "v", "PX", "100"]))
        .await
        .unwrap();
    expect_reply(&mut stream, b"+OK\r\n").await;

    stream.write_all(&resp_command(&["GET", "k"])).await.unwrap();
    expect_reply(&mut stream, b"$1\r\nv\r\n").await;

    sleep(Duration::from_millis(120)).await;
    stream.write_all(&resp_command(&["GET", "k"])).await.unwrap();
    expect_reply(&mut stream, b"$-1\r\n").await;
}

#[tokio::test]
async fn test_wire_xadd_and_xrange() {
    let addr = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(&resp_command(&["XADD", "stream-key", "1-1", "foo", "bar"]))
        .await
        .unwrap();
    expect_reply(&mut stream, b"$3\r\n1-1\r\n").await;

    stream
        .write_all(&resp_command(&["XADD", "stream-key", "1-2", "foo", "baz"]))
        .await
        .unwrap();
    expect_reply(&mut stream, b"$3\r\n1-2\r\n").await;

    stream
        .write_all(&resp_command(&["XRANGE", "stream-key", "-", "+"]))
        .await
        .unwrap();
    expect_reply(
        &mut stream,
        b"*2\r\n\
          *2\r\n$3\r\n1-1\r\n*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n\
          *2\r\n$3\r\n1-2\r\n*2\r\n$3\r\nfoo\r\n$3\r\nbaz\r\n",
    )
    .await;
}

#[tokio::test]
async fn test_wire_xadd_monotonicity_violation() {
    let addr = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream
        .write_all(&resp_command(&["XADD", "stream-key", "1-1", "foo", "bar"]))
        .await
        .unwrap();
    expect_reply(&mut stream, b"$3\r\n1-1\r\n").await;

    stream
        .write_all(&resp_command(&["XADD", "stream-key", "1-1", "foo", "baz"]))
        .await
        .unwrap();
    expect_reply(
        &mut stream,
        b"-ERR The ID specified in XADD is equal or smaller than the target stream top item\r\n",
    )
    .await;
}

#[tokio::test]
async fn test_wire_unknown_command_keeps_connection_open() {
    let addr = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    stream.write_all(&resp_command(&["FLY", "me"])).await.unwrap();
    expect_reply(&mut stream, b"-ERR unknown command\r\n").await;

    // The connection survives a command-level error.
    stream.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
    expect_reply(&mut stream, b"+PONG\r\n").await;
}

#[tokio::test]
async fn test_wire_blocking_xread_woken_by_other_connection() {
    let addr = start_server().await;
    let mut conn_a = TcpStream::connect(addr).await.unwrap();
    let mut conn_b = TcpStream::connect(addr).await.unwrap();

    conn_a
        .write_all(&resp_command(&["XREAD", "BLOCK", "0", "STREAMS", "s", "$"]))
        .await
        .unwrap();

    // Let connection A register its waiter before B publishes.
    sleep(Duration::from_millis(100)).await;

    conn_b
        .write_all(&resp_command(&["XADD", "s", "1-1", "k", "v"]))
        .await
        .unwrap();
    expect_reply(&mut conn_b, b"$3\r\n1-1\r\n").await;

    expect_reply(
        &mut conn_a,
        b"*1\r\n*2\r\n$1\r\ns\r\n*1\r\n*2\r\n$3\r\n1-1\r\n*2\r\n$1\r\nk\r\n$1\r\nv\r\n",
    )
    .await;
}

#[tokio::test]
async fn test_wire_blocking_xread_timeout_is_null_array() {
    let addr = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let start = std::time::Instant::now();
    stream
        .write_all(&resp_command(&["XREAD", "BLOCK", "100", "STREAMS", "s", "$"]))
        .await
        .unwrap();
    expect_reply(&mut stream, b"*-1\r\n").await;
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_wire_per_connection_replies_arrive_in_request_order() {
    let addr = start_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    // Pipeline three requests in a single write.
    let mut pipelined = Vec::new();
    pipelined.extend_from_slice(&resp_command(&["SET", "k", "v"]));
    pipelined.extend_from_slice(&resp_command(&["GET", "k"]));
    pipelined.extend_from_slice(&resp_command(&["PING"]));
    stream.write_all(&pipelined).await.unwrap();

    expect_reply(&mut stream, b"+OK\r\n$1\r\nv\r\n+PONG\r\n").await;
}
