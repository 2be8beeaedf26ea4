//! End-to-end tests: coordinator, HTTP transport, loopback client and the
//! reference backend.

use playersync_core::{is_metadata_key, Changeset, DataStore, ValueCell};
use playersync_engine::{
    HttpRequest, HttpResponse, HttpTransport, LoopbackClient, LoopbackServer, SaveOutcome,
    SyncConfig, SyncCoordinator, SyncError, WipeStep,
};
use playersync_protocol::{API_KEY_HEADER, SESSION_TOKEN_HEADER};
use playersync_server::{ServerConfig, ServerRequest, SyncServer};
use std::sync::Arc;

const API_KEY: &str = "fn-key";

fn loopback(server: Arc<SyncServer>) -> LoopbackClient<impl LoopbackServer> {
    LoopbackClient::new(move |request: &HttpRequest| {
        let server_request = ServerRequest {
            method: request.method.as_str(),
            path: request.path(),
            api_key: request.header(API_KEY_HEADER),
            session_token: request.header(SESSION_TOKEN_HEADER),
            body: request.body.as_deref().unwrap_or_default(),
        };
        let response = server.handle(&server_request);
        HttpResponse::new(response.status, response.body)
    })
}

fn setup() -> (
    Arc<SyncServer>,
    SyncCoordinator<HttpTransport<LoopbackClient<impl LoopbackServer>>>,
) {
    let server = Arc::new(SyncServer::new(ServerConfig::new().with_api_key(API_KEY)));
    let config = SyncConfig::new("https://players.example.com/").with_api_key(API_KEY);
    let transport = HttpTransport::new(config, loopback(server.clone()));
    (server, SyncCoordinator::new(transport))
}

fn application_entries(record: &Changeset) -> Changeset {
    record
        .iter()
        .filter(|(k, _)| !is_metadata_key(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn defaults() -> Changeset {
    [("Coins", 0i64), ("PlayerLevel", 1), ("ExperiencePoints", 0)]
        .into_iter()
        .collect()
}

#[tokio::test]
async fn save_then_load_in_a_fresh_store() {
    let (server, sync) = setup();
    sync.set("Coins", 50i64).await.unwrap();
    sync.set("Nickname", "Ada").await.unwrap();
    sync.set("Ratio", 0.75).await.unwrap();
    sync.set("Tutorial_Done", true).await.unwrap();

    let outcome = sync.save("p1", None).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved { ref keys } if keys.len() == 4));
    assert_eq!(server.player_count(), 1);

    // a second device starts from defaults and pulls the record
    let transport = HttpTransport::new(
        SyncConfig::new("https://players.example.com").with_api_key(API_KEY),
        loopback(server.clone()),
    );
    let other = SyncCoordinator::new(transport);
    other.load("p1", None).await.unwrap();

    assert_eq!(other.get("Coins", 0i64).await, 50);
    assert_eq!(other.get("Nickname", String::new()).await, "Ada");
    assert_eq!(other.get("Ratio", 0.0).await, 0.75);
    assert!(other.get("Tutorial_Done", false).await);
    assert_eq!(other.get("PlayerLevel", 0i64).await, 1);
    assert!(other.with_store(|s| s.contains_key("RowKey")).await);
    assert!(!other.with_store(DataStore::has_changes).await);
}

#[tokio::test]
async fn only_the_diff_is_sent() {
    let (server, sync) = setup();
    sync.set("Coins", 10i64).await.unwrap();
    sync.save("p1", None).await.unwrap();

    sync.set("Gems", 3i64).await.unwrap();
    sync.set("Coins", 10i64).await.unwrap();
    let outcome = sync.save("p1", None).await.unwrap();

    assert_eq!(
        outcome,
        SaveOutcome::Saved {
            keys: vec!["Gems".into()]
        }
    );
    let record = server.record("p1").unwrap();
    assert_eq!(record.get("Coins"), Some(&ValueCell::Integer(10)));
    assert_eq!(record.get("Gems"), Some(&ValueCell::Integer(3)));
    assert_eq!(sync.save("p1", None).await.unwrap(), SaveOutcome::NothingToSave);
}

#[tokio::test]
async fn wipe_all_restores_defaults_remotely() {
    let (server, sync) = setup();
    sync.set("Coins", 100i64).await.unwrap();
    sync.set("PlayerLevel", 5i64).await.unwrap();
    sync.set("Gems", 7i64).await.unwrap();
    sync.save("p1", None).await.unwrap();

    let outcome = sync.wipe_all("p1", None).await.unwrap();
    // ExperiencePoints never left its default, so it was never saved
    assert_eq!(outcome.deleted, vec!["Coins", "Gems", "PlayerLevel"]);

    let fresh = SyncCoordinator::new(HttpTransport::new(
        SyncConfig::new("https://players.example.com").with_api_key(API_KEY),
        loopback(server.clone()),
    ));
    let loaded = fresh.load("p1", None).await.unwrap();
    assert!(loaded.keys.iter().any(|k| k == "Timestamp"));

    let record = fresh
        .with_store(|s| s.iter().map(|(k, v)| (k.to_string(), v.clone())).collect::<Changeset>())
        .await;
    assert_eq!(application_entries(&record), defaults());
    assert_eq!(sync.with_store(DataStore::clone).await, DataStore::new());
}

#[tokio::test]
async fn wipe_all_of_unknown_player_restores_defaults() {
    let (server, sync) = setup();
    let outcome = sync.wipe_all("nobody", None).await.unwrap();

    assert!(outcome.deleted.is_empty());
    assert_eq!(server.player_count(), 1);
    let record = server.record("nobody").unwrap();
    assert_eq!(application_entries(&record), defaults());
}

#[tokio::test]
async fn wipe_all_fails_at_load_without_api_key() {
    let (server, _) = setup();
    let config = SyncConfig::new("https://players.example.com/");
    let sync = SyncCoordinator::new(HttpTransport::new(config, loopback(server.clone())));

    match sync.wipe_all("p1", None).await.unwrap_err() {
        SyncError::Wipe { step, source } => {
            assert_eq!(step, WipeStep::Load);
            assert!(matches!(*source, SyncError::Server { status: 401, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(server.player_count(), 0);
}

#[tokio::test]
async fn delete_keys_does_not_touch_local_store() {
    let (server, sync) = setup();
    sync.set("Gems", 3i64).await.unwrap();
    sync.save("p1", None).await.unwrap();

    sync.delete_keys("p1", &["Gems".to_string()], None)
        .await
        .unwrap();

    assert_eq!(server.record("p1").unwrap().get("Gems"), None);
    assert_eq!(sync.get("Gems", 0i64).await, 3);
    // still committed locally, so nothing is re-sent
    assert_eq!(sync.save("p1", None).await.unwrap(), SaveOutcome::NothingToSave);
}

#[tokio::test]
async fn wrong_api_key_is_rejected() {
    let server = Arc::new(SyncServer::new(ServerConfig::new().with_api_key(API_KEY)));
    let transport = HttpTransport::new(
        SyncConfig::new("https://players.example.com").with_api_key("stolen"),
        loopback(server.clone()),
    );
    let sync = SyncCoordinator::new(transport);
    sync.set("Coins", 1i64).await.unwrap();
    let before = sync.with_store(DataStore::clone).await;

    let err = sync.save("p1", None).await.unwrap_err();
    assert!(matches!(err, SyncError::Server { status: 401, .. }));
    assert!(!err.is_retryable());
    assert_eq!(sync.with_store(DataStore::clone).await, before);
    assert_eq!(sync.transport().last_error().as_deref(), Some("invalid api key"));
}

#[tokio::test]
async fn session_tokens_are_forwarded() {
    let (server, sync) = setup();
    let token = server.issue_token("p1");
    sync.set("Coins", 5i64).await.unwrap();

    let err = sync.save("p1", None).await.unwrap_err();
    assert!(matches!(err, SyncError::Server { status: 401, .. }));

    sync.save("p1", Some(&token)).await.unwrap();
    assert_eq!(
        server.record("p1").unwrap().get("Coins"),
        Some(&ValueCell::Integer(5))
    );
}

#[tokio::test]
async fn concurrent_edits_and_saves_converge() {
    let (server, sync) = setup();
    let sync = Arc::new(sync);

    let mut tasks = Vec::new();
    for i in 0..8i64 {
        let sync = sync.clone();
        tasks.push(tokio::spawn(async move {
            let key = format!("Slot_{i}");
            sync.set(&key, i).await.unwrap();
            sync.save("p1", None).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert!(!sync.with_store(DataStore::has_changes).await);
    let record = server.record("p1").unwrap();
    for i in 0..8i64 {
        assert_eq!(
            record.get(&format!("Slot_{i}")),
            Some(&ValueCell::Integer(i))
        );
    }
}
