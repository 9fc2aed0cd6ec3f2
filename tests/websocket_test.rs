// Integration tests for the chat hub WebSocket endpoint
// These drive the full filter tree in-process through warp's test client

use std::path::{Path, PathBuf};
use std::time::Duration;

use chat_hub::config::ServerConfig;
use chat_hub::core::SharedHub;
use chat_hub::routes::{routes, AppState};
use tempfile::TempDir;
use tokio::time::{sleep, timeout};
use warp::test::WsClient;
use warp::ws::Message;

const WAIT: Duration = Duration::from_secs(3);
const QUIET: Duration = Duration::from_millis(200);

fn scratch() -> TempDir {
    tempfile::tempdir().expect("Failed to create scratch directory")
}

// Uploads always land under `scratch`; the media directory is up to the test
fn state_with_media_dir(scratch: &TempDir, media_dir: PathBuf) -> AppState {
    let config = ServerConfig {
        media_dir,
        upload_dir: scratch.path().join("uploads"),
        ..ServerConfig::default()
    };
    AppState::from_config(&config).expect("Failed to build app state")
}

fn default_state(scratch: &TempDir) -> AppState {
    state_with_media_dir(scratch, scratch.path().join("media"))
}

async fn connect(state: &AppState, path: &str) -> WsClient {
    match timeout(WAIT, warp::test::ws().path(path).handshake(routes(state.clone()))).await {
        Ok(Ok(client)) => client,
        Ok(Err(e)) => panic!("WebSocket handshake for {} failed: {}", path, e),
        Err(_) => panic!("WebSocket handshake for {} timed out", path),
    }
}

// Upgrades complete before the hub registers the socket, so poll for it
async fn wait_for_connections(hub: &SharedHub, expected: usize) {
    let waited = timeout(WAIT, async {
        while hub.connection_count().await != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(
        waited.is_ok(),
        "Expected {} connections, found {}",
        expected,
        hub.connection_count().await
    );
}

// The sink write runs alongside the broadcast and may finish after delivery
async fn wait_for_media_files(dir: &Path, expected_len: usize) -> Vec<PathBuf> {
    let found = timeout(WAIT, async {
        loop {
            let mut files = Vec::new();
            if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
                while let Ok(Some(entry)) = entries.next_entry().await {
                    files.push(entry.path());
                }
            }
            let mut complete = !files.is_empty();
            for file in &files {
                let len = tokio::fs::metadata(file).await.map(|m| m.len()).unwrap_or(0);
                complete &= len as usize == expected_len;
            }
            if complete {
                return files;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    found.expect("Media file was not written")
}

async fn expect_message(client: &mut WsClient) -> Message {
    match timeout(WAIT, client.recv()).await {
        Ok(Ok(msg)) => msg,
        Ok(Err(e)) => panic!("Connection failed while waiting for a message: {}", e),
        Err(_) => panic!("No message received"),
    }
}

async fn expect_silence(client: &mut WsClient) {
    if let Ok(Ok(msg)) = timeout(QUIET, client.recv()).await {
        panic!("Unexpected message: {:?}", msg);
    }
}

async fn expect_closed(client: &mut WsClient) {
    match timeout(WAIT, client.recv()).await {
        Ok(Ok(msg)) if msg.is_close() => {}
        Ok(Err(_)) => {}
        Ok(Ok(msg)) => panic!("Expected close, got {:?}", msg),
        Err(_) => panic!("Connection was not closed"),
    }
}

#[tokio::test]
async fn test_same_identity_evicts_and_text_reaches_only_others() {
    let scratch = scratch();
    let state = default_state(&scratch);
    let hub = state.hub.clone();

    let mut a = connect(&state, "/chat?id=alice").await;
    wait_for_connections(&hub, 1).await;

    let mut b = connect(&state, "/chat?id=alice").await;
    expect_closed(&mut a).await;
    wait_for_connections(&hub, 1).await;

    let mut c = connect(&state, "/chat?id=bob").await;
    wait_for_connections(&hub, 2).await;

    b.send_text("hi").await;

    let received = expect_message(&mut c).await;
    assert_eq!(received.to_str().unwrap(), "hi");
    expect_silence(&mut b).await;
}

#[tokio::test]
async fn test_connections_without_id_do_not_evict_each_other() {
    let scratch = scratch();
    let state = default_state(&scratch);
    let hub = state.hub.clone();

    let mut first = connect(&state, "/chat").await;
    wait_for_connections(&hub, 1).await;
    let mut second = connect(&state, "/chat?room=lobby").await;
    wait_for_connections(&hub, 2).await;

    first.send_text("anyone there?").await;

    let received = expect_message(&mut second).await;
    assert_eq!(received.to_str().unwrap(), "anyone there?");
    expect_silence(&mut first).await;
    assert_eq!(hub.connection_count().await, 2);
}

#[tokio::test]
async fn test_binary_is_broadcast_and_persisted_once() {
    let scratch = scratch();
    let media_dir = scratch.path().join("media");
    let state = state_with_media_dir(&scratch, media_dir.clone());
    let hub = state.hub.clone();

    let mut d = connect(&state, "/chat?id=dora").await;
    let mut e = connect(&state, "/chat?id=emil").await;
    let mut f = connect(&state, "/chat?id=finn").await;
    wait_for_connections(&hub, 3).await;

    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    d.send(Message::binary(payload.clone())).await;

    assert_eq!(expect_message(&mut e).await.as_bytes(), payload.as_slice());
    assert_eq!(expect_message(&mut f).await.as_bytes(), payload.as_slice());
    expect_silence(&mut d).await;

    let files = wait_for_media_files(&media_dir, payload.len()).await;
    assert_eq!(files.len(), 1);
    assert_eq!(tokio::fs::read(&files[0]).await.unwrap(), payload);
}

#[tokio::test]
async fn test_binary_is_broadcast_even_when_persistence_fails() {
    // A regular file where the media directory should be makes every write fail
    let scratch = scratch();
    let blocker = scratch.path().join("blocker");
    tokio::fs::write(&blocker, b"not a directory").await.unwrap();
    let state = state_with_media_dir(&scratch, blocker.join("media"));
    let hub = state.hub.clone();

    let mut d = connect(&state, "/chat?id=dora").await;
    let mut e = connect(&state, "/chat?id=emil").await;
    wait_for_connections(&hub, 2).await;

    d.send(Message::binary(vec![7u8; 16])).await;

    assert_eq!(expect_message(&mut e).await.as_bytes(), &[7u8; 16][..]);
    assert_eq!(hub.connection_count().await, 2);
}

#[tokio::test]
async fn test_peer_disconnect_unregisters_connection() {
    let scratch = scratch();
    let state = default_state(&scratch);
    let hub = state.hub.clone();

    let first = connect(&state, "/chat?id=alice").await;
    let mut second = connect(&state, "/chat?id=bob").await;
    wait_for_connections(&hub, 2).await;

    drop(first);
    wait_for_connections(&hub, 1).await;

    // The survivor keeps working and nobody receives its messages
    second.send_text("still here").await;
    expect_silence(&mut second).await;
}
