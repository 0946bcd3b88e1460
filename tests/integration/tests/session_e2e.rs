//! End-to-end session tests against a local WebSocket gateway.

use hiven_gateway::codec::{op, Envelope};
use hiven_gateway::{names, GatewayError, GatewayEvent, GatewayMessage, Session, SessionBuilder, SessionState};
use hiven_integration_tests::{Connection, FakeGateway, WAIT};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SYNC: &str = "TEST_SYNC";

fn builder(gateway: &FakeGateway) -> SessionBuilder {
    SessionBuilder::new("tok")
        .gateway_url(gateway.url())
        .api_base("http://127.0.0.1:9")
}

/// Register a listener on the raw `TEST_SYNC` tag.
fn with_sync(builder: SessionBuilder) -> (SessionBuilder, mpsc::UnboundedReceiver<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let builder = builder.on(SYNC, move |_| {
        let _ = tx.send(());
    });
    (builder, rx)
}

/// Push a sync frame and wait until the session has processed it.
async fn sync(server: &mut Connection, rx: &mut mpsc::UnboundedReceiver<()>) {
    server.send(Envelope::event(SYNC, json!({}))).await;
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("sync frame not processed")
        .unwrap();
}

async fn open(builder: SessionBuilder, gateway: &FakeGateway) -> (Session, Connection) {
    let (session, mut server) = tokio::join!(builder.connect(), gateway.accept());
    let session = session.unwrap();

    let identify = server.recv().await;
    assert_eq!(identify, Envelope::identify("tok"));
    (session, server)
}

#[tokio::test]
async fn test_identify_is_first_frame() {
    let gateway = FakeGateway::bind().await;
    let (session, _server) = open(builder(&gateway), &gateway).await;

    assert!(session.is_online());
    assert_eq!(session.state(), SessionState::Identifying);
}

#[tokio::test]
async fn test_hello_interval_drives_heartbeat() {
    let gateway = FakeGateway::bind().await;
    let builder = builder(&gateway).heartbeat_interval(Duration::from_secs(30));
    let (session, mut server) = open(builder, &gateway).await;

    let sent = Instant::now();
    server.send(Envelope::hello(50)).await;

    for _ in 0..3 {
        let beat = server.recv().await;
        assert_eq!(beat.op, op::HEARTBEAT);
        assert_eq!(beat, Envelope::heartbeat());
    }
    assert!(sent.elapsed() < Duration::from_secs(5));
    assert_eq!(session.heartbeat_interval(), Duration::from_millis(50));
}

#[tokio::test]
async fn test_init_state_emits_ready_once() {
    let gateway = FakeGateway::bind().await;
    let ready = Arc::new(AtomicUsize::new(0));
    let (builder, mut synced) = with_sync({
        let ready = ready.clone();
        builder(&gateway).on(names::READY, move |event| {
            assert!(matches!(event, GatewayEvent::Ready));
            ready.fetch_add(1, Ordering::SeqCst);
        })
    });
    let (session, mut server) = open(builder, &gateway).await;

    server
        .send(Envelope::event("INIT_STATE", json!({ "user": { "id": "u1" } })))
        .await;
    sync(&mut server, &mut synced).await;

    assert_eq!(ready.load(Ordering::SeqCst), 1);
    assert_eq!(session.self_user().unwrap().id, "u1");
    assert_eq!(session.state(), SessionState::Active);
}

#[tokio::test]
async fn test_message_reply_posts_to_origin_room() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/rooms/r1/messages"))
        .and(header("Authorization", "tok"))
        .and(body_json(json!({ "content": "ok" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "id": "m2", "content": "ok" }
        })))
        .expect(1)
        .mount(&api)
        .await;

    let gateway = FakeGateway::bind().await;
    let (tx, mut messages) = mpsc::unbounded_channel::<GatewayMessage>();
    let builder = builder(&gateway)
        .api_base(api.uri())
        .on(names::MESSAGE_CREATE, move |event| {
            if let Some(message) = event.as_message() {
                let _ = tx.send(message.clone());
            }
        });
    let (_session, mut server) = open(builder, &gateway).await;

    server
        .send(Envelope::event(
            "MESSAGE_CREATE",
            json!({ "id": "m1", "room_id": "r1", "content": "hi" }),
        ))
        .await;

    let message = tokio::time::timeout(WAIT, messages.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.text(), "hi");

    let sent = message.reply("ok").await.unwrap();
    assert_eq!(sent.message.id.as_deref(), Some("m2"));
    assert_eq!(sent.message.room_id, "r1");
}

#[tokio::test]
async fn test_house_join_and_room_replay() {
    let gateway = FakeGateway::bind().await;
    let (builder, mut synced) = with_sync(builder(&gateway));
    let (session, mut server) = open(builder, &gateway).await;

    server
        .send(Envelope::event(
            "HOUSE_JOIN",
            json!({
                "id": "h1",
                "name": "Hive",
                "members": [{ "user_id": "u2", "user": { "id": "u2" } }],
                "rooms": [{ "id": "r1", "name": "general" }],
                "entities": []
            }),
        ))
        .await;
    let update = json!({ "id": "r1", "house_id": "h1", "name": "renamed" });
    server.send(Envelope::event("ROOM_UPDATE", update.clone())).await;
    server.send(Envelope::event("ROOM_UPDATE", update)).await;
    sync(&mut server, &mut synced).await;

    let cache = session.cache().read();
    let house = cache.get_house("h1").unwrap();
    assert!(!house.attributes.contains_key("members"));
    assert!(cache.get_user("u2").unwrap().cached_received_timestamp.is_some());
    assert_eq!(cache.rooms().len(), 1);
    assert_eq!(cache.find_room("r1").unwrap().name.as_deref(), Some("renamed"));
}

#[tokio::test]
async fn test_malformed_frame_does_not_end_session() {
    let gateway = FakeGateway::bind().await;
    let (builder, mut synced) = with_sync(builder(&gateway));
    let (session, mut server) = open(builder, &gateway).await;

    server.send_text("{not json").await;
    server
        .send(Envelope::event("ROLE_CREATE", json!({ "house_id": "missing", "id": "ro1" })))
        .await;
    server.send(Envelope::event("ROOM_CREATE", json!({ "id": "r1" }))).await;
    sync(&mut server, &mut synced).await;

    assert!(session.is_online());
    assert!(session.cache().read().find_room("r1").is_some());
}

#[tokio::test]
async fn test_server_close_ends_session() {
    let gateway = FakeGateway::bind().await;
    let (session, server) = open(builder(&gateway), &gateway).await;

    server.close().await;
    tokio::time::timeout(WAIT, session.closed()).await.unwrap();

    assert_eq!(session.state(), SessionState::Closed);
    assert!(!session.is_online());
    assert!(matches!(
        session.send_message("r1", "late").await,
        Err(GatewayError::Closed)
    ));
}

#[tokio::test]
async fn test_missing_token_never_connects() {
    let gateway = FakeGateway::bind().await;
    let err = SessionBuilder::new("")
        .gateway_url(gateway.url())
        .connect()
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Configuration(_)));
}

#[tokio::test]
async fn test_unreachable_gateway_is_transport_error() {
    let url = {
        let gateway = FakeGateway::bind().await;
        gateway.url().to_string()
    };

    let err = SessionBuilder::new("tok")
        .gateway_url(url)
        .connect()
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Transport(_)));
    assert!(!err.is_recoverable());
}
