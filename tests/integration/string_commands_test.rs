// tests/integration/string_commands_test.rs

//! Integration tests for string commands: SET, GET, expiry behaviour.

use super::test_helpers::{TestContext, bulk, simple};
use opaldb::core::RespFrame;

#[tokio::test]
async fn test_set_get_roundtrip() {
    let ctx = TestContext::new().await;

    let reply = ctx.set("mykey", "myvalue").await.unwrap();
    assert_eq!(reply, simple("OK"));

    let reply = ctx.get("mykey").await.unwrap();
    assert_eq!(reply, bulk("myvalue"));
}

#[tokio::test]
async fn test_get_missing_key_is_null() {
    let ctx = TestContext::new().await;
    assert_eq!(ctx.get("nope").await.unwrap(), RespFrame::Null);
}

#[tokio::test]
async fn test_set_overwrites_unconditionally() {
    let ctx = TestContext::new().await;

    ctx.set("k", "first").await.unwrap();
    ctx.set("k", "second").await.unwrap();
    assert_eq!(ctx.get("k").await.unwrap(), bulk("second"));
}

#[tokio::test]
async fn test_set_px_expires_after_deadline() {
    let ctx = TestContext::new().await;

    ctx.run(&["SET", "k", "v", "PX", "100"]).await.unwrap();

    // Strictly before the deadline the value is visible.
    ctx.clock.advance(99);
    assert_eq!(ctx.get("k").await.unwrap(), bulk("v"));

    // At the deadline the record is no longer live.
    ctx.clock.advance(1);
    assert_eq!(ctx.get("k").await.unwrap(), RespFrame::Null);
}

#[tokio::test]
async fn test_set_ex_uses_seconds() {
    let ctx = TestContext::new().await;

    ctx.run(&["SET", "k", "v", "EX", "2"]).await.unwrap();

    ctx.clock.advance(1_999);
    assert_eq!(ctx.get("k").await.unwrap(), bulk("v"));

    ctx.clock.advance(1);
    assert_eq!(ctx.get("k").await.unwrap(), RespFrame::Null);
}

#[tokio::test]
async fn test_expired_record_is_purged_on_read() {
    let ctx = TestContext::new().await;

    ctx.run(&["SET", "k", "v", "PX", "50"]).await.unwrap();
    ctx.clock.advance(50);

    // The read observes the expiry and removes the record.
    assert_eq!(ctx.get("k").await.unwrap(), RespFrame::Null);
    assert!(ctx.state.kv.is_empty());
}

#[tokio::test]
async fn test_set_without_ttl_clears_previous_expiry() {
    let ctx = TestContext::new().await;

    ctx.run(&["SET", "k", "v", "PX", "50"]).await.unwrap();
    ctx.set("k", "v2").await.unwrap();

    // The overwrite dropped the deadline; the record outlives it.
    ctx.clock.advance(1_000);
    assert_eq!(ctx.get("k").await.unwrap(), bulk("v2"));
}

#[tokio::test]
async fn test_expired_key_reports_type_none() {
    let ctx = TestContext::new().await;

    ctx.run(&["SET", "k", "v", "PX", "10"]).await.unwrap();
    ctx.clock.advance(10);
    assert_eq!(ctx.type_of("k").await.unwrap(), simple("none"));
}
