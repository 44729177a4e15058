// tests/integration/blocking_test.rs

//! Integration tests for blocking XREAD: wakeup by XADD, timeout,
//! cancellation, and waiter-registry hygiene.

use super::test_helpers::{TestContext, bulk};
use opaldb::core::Command;
use opaldb::core::commands::command_trait::ExecutableCommand;
use opaldb::core::{OpalDBError, RespFrame};
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Runs a request on its own task with its own session id, the way a second
/// connection would.
fn spawn_request(
    ctx: &TestContext,
    session_id: u64,
    parts: &[&str],
) -> tokio::task::JoinHandle<Result<RespFrame, OpalDBError>> {
    let command = Command::try_from(TestContext::request(parts)).unwrap();
    let mut exec_ctx = ctx.execution_context(session_id);
    tokio::spawn(async move { command.execute(&mut exec_ctx).await })
}

#[tokio::test]
async fn test_blocking_xread_timeout() {
    let ctx = TestContext::new().await;

    let start = Instant::now();
    let reply = ctx
        .run(&["XREAD", "BLOCK", "100", "STREAMS", "s", "$"])
        .await
        .unwrap();
    let elapsed = start.elapsed();

    // A block-timeout is the null array, not the empty array.
    assert_eq!(reply, RespFrame::NullArray);
    assert!(elapsed >= Duration::from_millis(90));
    assert!(elapsed < Duration::from_millis(500));

    // The waiter must not linger in the registry.
    assert_eq!(ctx.state.stream_blockers.waiter_count(), 0);
}

#[tokio::test]
async fn test_blocking_xread_woken_by_xadd() {
    let ctx = TestContext::new().await;

    let reader = spawn_request(&ctx, 2, &["XREAD", "BLOCK", "0", "STREAMS", "s", "$"]);

    // Give the reader time to register and suspend, then publish.
    sleep(Duration::from_millis(50)).await;
    ctx.xadd("s", "1-1", &[("k", "v")]).await.unwrap();

    let reply = reader.await.unwrap().unwrap();
    let RespFrame::Array(streams) = reply else {
        panic!("expected array reply, got something else");
    };
    assert_eq!(streams.len(), 1);
    let RespFrame::Array(stream) = &streams[0] else {
        panic!("expected stream array");
    };
    assert_eq!(stream[0], bulk("s"));
    let RespFrame::Array(entries) = &stream[1] else {
        panic!("expected entries array");
    };
    assert_eq!(entries.len(), 1);

    assert_eq!(ctx.state.stream_blockers.waiter_count(), 0);
}

#[tokio::test]
async fn test_blocking_xread_with_data_available_returns_immediately() {
    let ctx = TestContext::new().await;

    ctx.xadd("s", "1-1", &[("k", "v")]).await.unwrap();

    let start = Instant::now();
    let reply = ctx
        .run(&["XREAD", "BLOCK", "1000", "STREAMS", "s", "0-0"])
        .await
        .unwrap();
    assert!(start.elapsed() < Duration::from_millis(100));
    assert!(matches!(reply, RespFrame::Array(ref streams) if streams.len() == 1));
}

#[tokio::test]
async fn test_blocking_xread_ignores_non_matching_append() {
    let ctx = TestContext::new().await;

    ctx.xadd("s", "5-5", &[("k", "v")]).await.unwrap();

    // The reader wants ids above 9-0; the appends below stay under it.
    let reader = spawn_request(&ctx, 2, &["XREAD", "BLOCK", "200", "STREAMS", "s", "9-0"]);
    sleep(Duration::from_millis(50)).await;
    ctx.xadd("s", "6-0", &[("k", "v")]).await.unwrap();

    // The notification woke the reader, the rescan found nothing matching,
    // and it went back to sleep until the deadline.
    let reply = reader.await.unwrap().unwrap();
    assert_eq!(reply, RespFrame::NullArray);
}

#[tokio::test]
async fn test_blocking_xread_multiple_waiters_all_woken() {
    let ctx = TestContext::new().await;

    let reader_a = spawn_request(&ctx, 2, &["XREAD", "BLOCK", "0", "STREAMS", "s", "$"]);
    let reader_b = spawn_request(&ctx, 3, &["XREAD", "BLOCK", "0", "STREAMS", "s", "$"]);

    sleep(Duration::from_millis(50)).await;
    ctx.xadd("s", "1-1", &[("k", "v")]).await.unwrap();

    // XREAD does not consume entries, so both waiters see the append.
    for reader in [reader_a, reader_b] {
        let reply = reader.await.unwrap().unwrap();
        assert!(matches!(reply, RespFrame::Array(ref streams) if streams.len() == 1));
    }
}

#[tokio::test]
async fn test_cancellation_releases_blocked_reader() {
    let ctx = TestContext::new().await;

    let command =
        Command::try_from(TestContext::request(&["XREAD", "BLOCK", "0", "STREAMS", "s", "$"]))
            .unwrap();
    let mut exec_ctx = ctx.execution_context(7);
    let cancel = exec_ctx.cancel.clone();
    let reader = tokio::spawn(async move { command.execute(&mut exec_ctx).await });

    sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    // The reader unblocks promptly and its waiter is gone.
    let result = tokio::time::timeout(Duration::from_millis(500), reader)
        .await
        .expect("cancelled reader did not unblock");
    assert!(result.unwrap().is_ok());
    assert_eq!(ctx.state.stream_blockers.waiter_count(), 0);
}

#[tokio::test]
async fn test_session_cleanup_removes_waiters() {
    let ctx = TestContext::new().await;

    let _reader = spawn_request(&ctx, 9, &["XREAD", "BLOCK", "0", "STREAMS", "s", "$"]);
    sleep(Duration::from_millis(50)).await;
    assert_eq!(ctx.state.stream_blockers.waiter_count(), 1);

    ctx.state.stream_blockers.remove_waiters_for_session(9);
    assert_eq!(ctx.state.stream_blockers.waiter_count(), 0);
}
