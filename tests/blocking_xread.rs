//! Blocking XREAD behavior: wakeups on append, deadlines, and the `$`
//! horizon frozen at call time.

mod utils;

use std::time::{Duration, Instant};

use utils::{TestClient, start_server};

#[tokio::test]
async fn test_blocked_reader_wakes_on_append() {
    let (_context, address) = start_server(&[]).await;
    let mut reader = TestClient::connect(address).await;
    let mut writer = TestClient::connect(address).await;

    reader
        .send(&["XREAD", "BLOCK", "1000", "STREAMS", "s", "$"])
        .await;

    // Give the reader time to block before appending.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let added = writer.roundtrip(&["XADD", "s", "7-1", "k", "v"]).await;
    assert_eq!(added, "$3\r\n7-1\r\n");

    let started = Instant::now();
    let reply = reader.read_reply().await;

    assert_eq!(
        reply,
        "*1\r\n*2\r\n$1\r\ns\r\n*1\r\n*2\r\n$3\r\n7-1\r\n*2\r\n$1\r\nk\r\n$1\r\nv\r\n"
    );
    assert!(started.elapsed() < Duration::from_millis(900));
}

#[tokio::test]
async fn test_block_times_out_with_null_reply() {
    let (_context, address) = start_server(&[]).await;
    let mut reader = TestClient::connect(address).await;

    let started = Instant::now();
    reader
        .send(&["XREAD", "BLOCK", "150", "STREAMS", "s", "$"])
        .await;

    assert_eq!(reader.read_reply().await, "$-1\r\n");
    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_block_zero_waits_past_any_timeout() {
    let (_context, address) = start_server(&[]).await;
    let mut reader = TestClient::connect(address).await;
    let mut writer = TestClient::connect(address).await;

    reader
        .send(&["XREAD", "BLOCK", "0", "STREAMS", "s", "$"])
        .await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    writer.roundtrip(&["XADD", "s", "9-0", "k", "v"]).await;

    let reply = reader.read_reply().await;
    assert!(reply.contains("9-0"), "unexpected reply: {}", reply);
}

#[tokio::test]
async fn test_append_to_other_stream_does_not_satisfy_reader() {
    let (_context, address) = start_server(&[]).await;
    let mut reader = TestClient::connect(address).await;
    let mut writer = TestClient::connect(address).await;

    reader
        .send(&["XREAD", "BLOCK", "2000", "STREAMS", "wanted", "$"])
        .await;

    // An append to an unrelated stream wakes the waiter, which must re-check
    // and go back to sleep.
    tokio::time::sleep(Duration::from_millis(100)).await;
    writer.roundtrip(&["XADD", "other", "1-1", "k", "v"]).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    writer.roundtrip(&["XADD", "wanted", "1-1", "k", "v"]).await;

    let reply = reader.read_reply().await;

    assert!(reply.contains("wanted"), "unexpected reply: {}", reply);
    assert!(!reply.contains("other"), "unexpected reply: {}", reply);
}

#[tokio::test]
async fn test_dollar_horizon_only_sees_entries_after_the_call() {
    let (_context, address) = start_server(&[]).await;
    let mut reader = TestClient::connect(address).await;
    let mut writer = TestClient::connect(address).await;

    // Entries existing before the call are invisible through `$`.
    writer.roundtrip(&["XADD", "s", "1-1", "old", "1"]).await;

    reader
        .send(&["XREAD", "BLOCK", "1000", "STREAMS", "s", "$"])
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    writer.roundtrip(&["XADD", "s", "2-0", "new", "2"]).await;

    let reply = reader.read_reply().await;

    assert!(reply.contains("2-0"), "unexpected reply: {}", reply);
    assert!(!reply.contains("1-1"), "unexpected reply: {}", reply);
}
