//! Gateway session: one connection, its heartbeat, and its event loop.
//!
//! A [`Session`] is created through [`SessionBuilder::connect`], which checks
//! the token before any network activity. The session sends `identify` as its
//! first frame, then a reader task processes inbound frames strictly in order
//! while a writer task drains the outbound queue shared with the heartbeat.
//!
//! There is no reconnect. When the transport closes the session moves to
//! [`SessionState::Closed`] for good; connect a new session to resume.

use crate::cache::SharedCache;
use crate::codec::{self, op, Envelope};
use crate::emitter::EventEmitter;
use crate::error::{GatewayError, Result};
use crate::events::GatewayEvent;
use crate::heartbeat::HeartbeatScheduler;
use crate::router::EventRouter;
use futures::{Sink, SinkExt, Stream, StreamExt};
use hiven_core::config::{ApiConfig, GatewayConfig};
use hiven_core::{BotToken, Config, User};
use hiven_rest::{RestApi, RestClient, SentMessage};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, error, info, trace, warn};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Transport handshake in progress.
    Connecting,
    /// Connected and `identify` sent; no data frame seen yet.
    Identifying,
    /// Processing data frames.
    Active,
    /// Transport gone or session shut down. Terminal.
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Identifying => "identifying",
            Self::Active => "active",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Configures and opens a [`Session`].
pub struct SessionBuilder {
    token: Option<BotToken>,
    gateway: GatewayConfig,
    api: ApiConfig,
    rest_api: Option<Arc<dyn RestApi>>,
    cache: SharedCache,
    emitter: Arc<EventEmitter<GatewayEvent>>,
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("token", &self.token)
            .field("gateway", &self.gateway)
            .field("api", &self.api)
            .field("emitter", &self.emitter)
            .finish()
    }
}

impl SessionBuilder {
    /// Start from defaults with the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(BotToken::new(token)),
            gateway: GatewayConfig::default(),
            api: ApiConfig::default(),
            rest_api: None,
            cache: SharedCache::new(),
            emitter: Arc::new(EventEmitter::new()),
        }
    }

    /// Start from a loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            token: config.token.clone(),
            gateway: config.gateway.clone(),
            api: config.api.clone(),
            rest_api: None,
            cache: SharedCache::new(),
            emitter: Arc::new(EventEmitter::new()),
        }
    }

    /// Set the gateway WebSocket URL.
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway.url = url.into();
        self
    }

    /// Set the heartbeat period used until the server sends `HELLO`.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.gateway.heartbeat_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Bound the WebSocket handshake. Rounded up to whole seconds.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.gateway.connect_timeout_secs = whole_secs(timeout);
        self
    }

    /// Set the REST API base URL.
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into();
        self
    }

    /// Set the per-request REST timeout. Rounded up to whole seconds.
    pub fn api_timeout(mut self, timeout: Duration) -> Self {
        self.api.timeout_secs = whole_secs(timeout);
        self
    }

    /// Use a custom REST implementation instead of the HTTP client.
    pub fn rest_api(mut self, api: Arc<dyn RestApi>) -> Self {
        self.rest_api = Some(api);
        self
    }

    /// Register a callback before connecting, so no early event is missed.
    pub fn on<F>(self, name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        self.emitter.on(name, callback);
        self
    }

    /// The cache the session will populate, for callbacks to capture.
    pub fn cache(&self) -> SharedCache {
        self.cache.clone()
    }

    /// Validate settings, connect, and start the session.
    pub async fn connect(self) -> Result<Session> {
        let token = match self.token.as_ref().map(|t| BotToken::parse(t.expose())) {
            Some(Ok(token)) => token,
            _ => {
                error!("Cannot start a gateway session without a bot token");
                return Err(GatewayError::configuration("a non-empty bot token is required"));
            }
        };
        if self.gateway.url.trim().is_empty() {
            error!("Cannot start a gateway session without a gateway URL");
            return Err(GatewayError::configuration("gateway URL cannot be empty"));
        }
        if self.gateway.heartbeat_interval_ms == 0 {
            error!("Cannot start a gateway session with a zero heartbeat interval");
            return Err(GatewayError::configuration("heartbeat interval must be positive"));
        }

        let api: Arc<dyn RestApi> = match self.rest_api.clone() {
            Some(api) => api,
            None => Arc::new(
                RestClient::with_timeout(token.clone(), &self.api.base_url, self.api.timeout_secs)
                    .map_err(|e| GatewayError::configuration(e.to_string()))?,
            ),
        };

        info!("Connecting to gateway at {}", self.gateway.url);
        let timeout = Duration::from_secs(self.gateway.connect_timeout_secs);
        let (stream, _response) =
            match tokio::time::timeout(timeout, connect_async(self.gateway.url.as_str())).await {
                Ok(Ok(connected)) => connected,
                Ok(Err(e)) => {
                    error!("Gateway connection failed: {}", e);
                    return Err(e.into());
                }
                Err(_) => {
                    error!("Gateway connection timed out after {:?}", timeout);
                    return Err(GatewayError::transport(format!(
                        "connection timed out after {:?}",
                        timeout
                    )));
                }
            };

        self.start(stream, token, api).await
    }

    /// Run the session over an established transport.
    async fn start<S>(self, mut ws: S, token: BotToken, api: Arc<dyn RestApi>) -> Result<Session>
    where
        S: Stream<Item = std::result::Result<WsMessage, WsError>>
            + Sink<WsMessage, Error = WsError>
            + Send
            + Unpin
            + 'static,
    {
        let (state, _) = watch::channel(SessionState::Connecting);
        state.send_replace(SessionState::Identifying);

        // identify goes out before anything else can be written or read
        ws.send(codec::encode_message(&Envelope::identify(token.expose()))?)
            .await?;
        debug!("Identify sent");

        let (sink, stream) = ws.split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            state,
            cache: self.cache.clone(),
            emitter: self.emitter.clone(),
            heartbeat: HeartbeatScheduler::new(Duration::from_millis(
                self.gateway.heartbeat_interval_ms,
            )),
            api: api.clone(),
            outbound,
            writer: Mutex::new(None),
        });

        *shared.writer.lock() = Some(tokio::spawn(write_loop(sink, outbound_rx)));
        shared.start_heartbeat();

        let router = EventRouter::new(self.cache, self.emitter, api);
        let reader = tokio::spawn(read_loop(stream, shared.clone(), router));

        Ok(Session {
            shared,
            reader: Mutex::new(Some(reader)),
        })
    }
}

/// Seconds covering `duration`, at least one.
fn whole_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}

/// State shared between a [`Session`] and its tasks.
struct Shared {
    state: watch::Sender<SessionState>,
    cache: SharedCache,
    emitter: Arc<EventEmitter<GatewayEvent>>,
    heartbeat: HeartbeatScheduler,
    api: Arc<dyn RestApi>,
    outbound: mpsc::UnboundedSender<Envelope>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    fn start_heartbeat(&self) {
        self.heartbeat
            .start(self.heartbeat.interval(), self.outbound.clone());
    }

    fn handle(&self, envelope: Envelope, router: &EventRouter) {
        if envelope.op == op::HELLO {
            match envelope.hello_interval() {
                Ok(ms) => {
                    info!("Gateway requested a heartbeat every {}ms", ms);
                    self.heartbeat.set_interval(Duration::from_millis(ms));
                    self.start_heartbeat();
                }
                Err(e) => warn!("Ignoring HELLO: {}", e),
            }
            return;
        }

        let Some(tag) = envelope.e else {
            trace!(op = envelope.op, "Ignoring frame without event tag");
            return;
        };

        self.state.send_if_modified(|state| {
            if *state == SessionState::Identifying {
                *state = SessionState::Active;
                true
            } else {
                false
            }
        });

        match router.dispatch(&tag, envelope.d.unwrap_or(Value::Null)) {
            Ok(()) => {}
            Err(GatewayError::Closed) => debug!(event = %tag, "Session closed, dropping event"),
            Err(e) => warn!(event = %tag, "Skipping event: {}", e),
        }
    }

    /// Move to `Closed` and stop background work. Idempotent.
    ///
    /// Once this returns no listener starts and no cache mutation is in
    /// flight. Blocks briefly if the reader is mid-mutation.
    fn close(&self) {
        self.emitter.close();
        // the router re-checks the closed flag under the write lock
        drop(self.cache.write());

        self.heartbeat.stop();
        if let Some(writer) = self.writer.lock().take() {
            writer.abort();
        }
        let changed = self.state.send_if_modified(|state| {
            if *state == SessionState::Closed {
                false
            } else {
                *state = SessionState::Closed;
                true
            }
        });
        if changed {
            info!("Gateway session closed");
        }
    }
}

async fn write_loop<S>(mut sink: S, mut outbound: mpsc::UnboundedReceiver<Envelope>)
where
    S: Sink<WsMessage, Error = WsError> + Unpin,
{
    while let Some(envelope) = outbound.recv().await {
        let message = match codec::encode_message(&envelope) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping outbound frame: {}", e);
                continue;
            }
        };
        if let Err(e) = sink.send(message).await {
            warn!("Failed to write to gateway: {}", e);
            break;
        }
    }
    let _ = sink.close().await;
}

async fn read_loop<S>(mut stream: S, shared: Arc<Shared>, router: EventRouter)
where
    S: Stream<Item = std::result::Result<WsMessage, WsError>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        if shared.state() == SessionState::Closed {
            break;
        }

        let message = match frame {
            Ok(WsMessage::Close(reason)) => {
                info!("Gateway closed the connection: {:?}", reason);
                break;
            }
            Ok(message) => message,
            Err(e) => {
                error!("Gateway transport error: {}", e);
                break;
            }
        };

        match codec::decode_message(&message) {
            Ok(Some(envelope)) => shared.handle(envelope, &router),
            Ok(None) => {}
            Err(e) => warn!("Dropping frame: {}", e),
        }
    }

    shared.close();
}

/// A live (or closed) gateway session.
pub struct Session {
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("heartbeat", &self.shared.heartbeat)
            .finish()
    }
}

impl Session {
    /// Shorthand for [`SessionBuilder::new`].
    pub fn builder(token: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(token)
    }

    /// Register a callback. Ignored once the session is closed.
    pub fn on<F>(&self, name: impl Into<String>, callback: F)
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        if self.shared.state() == SessionState::Closed {
            debug!("Session closed, not registering listener");
            return;
        }
        self.shared.emitter.on(name, callback);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Whether the connection is up.
    pub fn is_online(&self) -> bool {
        matches!(
            self.state(),
            SessionState::Identifying | SessionState::Active
        )
    }

    /// Read access to the session's cache.
    pub fn cache(&self) -> &SharedCache {
        &self.shared.cache
    }

    /// The identity announced by `INIT_STATE`, once received.
    pub fn self_user(&self) -> Option<User> {
        self.shared.cache.read().self_user().cloned()
    }

    /// Heartbeat period the next (re)start will use.
    pub fn heartbeat_interval(&self) -> Duration {
        self.shared.heartbeat.interval()
    }

    /// Fetch a user over REST. The result is not cached.
    pub async fn fetch_user(&self, id: &str) -> Result<Option<User>> {
        self.ensure_open()?;
        Ok(self.shared.api.get_user(id).await?)
    }

    /// Post a message into a room over REST.
    pub async fn send_message(&self, room_id: &str, content: &str) -> Result<SentMessage> {
        self.ensure_open()?;
        Ok(SentMessage::send(self.shared.api.clone(), room_id, content).await?)
    }

    /// Wait until the session is closed.
    pub async fn closed(&self) {
        let mut state = self.shared.state.subscribe();
        // Err means the sender is gone, which only happens once we are dropped
        let _ = state.wait_for(|s| *s == SessionState::Closed).await;
    }

    /// Tear the session down. Safe to call more than once.
    ///
    /// No cache mutation happens and no listener starts after this returns. A
    /// listener already running on another thread finishes its own call.
    /// Must not be called while holding a guard from [`Session::cache`].
    pub fn shutdown(&self) {
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        self.shared.close();
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shared.state() == SessionState::Closed {
            return Err(GatewayError::Closed);
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hiven_core::Message;
    use serde_json::json;
    use tokio::io::DuplexStream;
    use tokio::time::Instant;
    use tokio_tungstenite::tungstenite::protocol::Role;
    use tokio_tungstenite::WebSocketStream;

    struct NullApi;

    #[async_trait]
    impl RestApi for NullApi {
        async fn get_user(&self, id: &str) -> hiven_rest::Result<Option<User>> {
            Ok(Some(User::new(id)))
        }

        async fn send_message(&self, room_id: &str, _content: &str) -> hiven_rest::Result<Message> {
            Ok(serde_json::from_value(json!({ "room_id": room_id }))?)
        }

        async fn edit_message(&self, _: &str, _: &str, _: &str) -> hiven_rest::Result<()> {
            Ok(())
        }

        async fn delete_message(&self, _: &str, _: &str) -> hiven_rest::Result<()> {
            Ok(())
        }
    }

    type Server = WebSocketStream<DuplexStream>;

    async fn open(builder: SessionBuilder) -> (Session, Server) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let client = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
        let server = WebSocketStream::from_raw_socket(server, Role::Server, None).await;

        let session = builder
            .start(client, BotToken::new("tok"), Arc::new(NullApi))
            .await
            .unwrap();
        (session, server)
    }

    async fn next_envelope(server: &mut Server) -> Envelope {
        loop {
            let message = server.next().await.unwrap().unwrap();
            if let Some(envelope) = codec::decode_message(&message).unwrap() {
                return envelope;
            }
        }
    }

    async fn push(server: &mut Server, envelope: Envelope) {
        server
            .send(codec::encode_message(&envelope).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_identify_then_hello_cadence() {
        let (session, mut server) = open(SessionBuilder::new("tok")).await;

        let identify = next_envelope(&mut server).await;
        assert_eq!(identify, Envelope::identify("tok"));
        assert_eq!(session.state(), SessionState::Identifying);

        let hello_at = Instant::now();
        push(&mut server, Envelope::hello(5_000)).await;

        let beat = next_envelope(&mut server).await;
        assert_eq!(beat.op, op::HEARTBEAT);
        let first = hello_at.elapsed();
        assert!(
            first >= Duration::from_millis(5_000) && first < Duration::from_millis(5_100),
            "first heartbeat after {:?}",
            first
        );

        next_envelope(&mut server).await;
        let second = hello_at.elapsed();
        assert!(second >= Duration::from_millis(10_000) && second < Duration::from_millis(10_100));
        assert_eq!(session.heartbeat_interval(), Duration::from_millis(5_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_heartbeat_without_hello() {
        let builder = SessionBuilder::new("tok").heartbeat_interval(Duration::from_millis(30_000));
        let (_session, mut server) = open(builder).await;
        next_envelope(&mut server).await;

        let started = Instant::now();
        let beat = next_envelope(&mut server).await;
        assert_eq!(beat.op, op::HEARTBEAT);
        let waited = started.elapsed();
        assert!(waited > Duration::from_millis(29_000) && waited < Duration::from_millis(30_100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_hello_interval_keeps_default() {
        let builder = SessionBuilder::new("tok").heartbeat_interval(Duration::from_millis(30_000));
        let (session, mut server) = open(builder).await;
        next_envelope(&mut server).await;

        let started = Instant::now();
        push(&mut server, Envelope::hello(0)).await;

        let beat = next_envelope(&mut server).await;
        assert_eq!(beat.op, op::HEARTBEAT);
        assert!(started.elapsed() > Duration::from_millis(29_000));
        assert_eq!(session.heartbeat_interval(), Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn test_zero_default_interval_rejected() {
        let err = SessionBuilder::new("tok")
            .gateway_url("ws://127.0.0.1:9")
            .heartbeat_interval(Duration::ZERO)
            .connect()
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[test]
    fn test_timeouts_round_up_to_seconds() {
        let builder = SessionBuilder::new("tok")
            .connect_timeout(Duration::from_millis(1_500))
            .api_timeout(Duration::from_millis(200));
        assert_eq!(builder.gateway.connect_timeout_secs, 2);
        assert_eq!(builder.api.timeout_secs, 1);

        let builder = SessionBuilder::new("tok").connect_timeout(Duration::from_secs(7));
        assert_eq!(builder.gateway.connect_timeout_secs, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_listener_starts_after_shutdown() {
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let started_tx = Mutex::new(Some(started_tx));
        let later_calls = Arc::new(Mutex::new(0));

        let builder = SessionBuilder::new("tok").on("roomCreate", move |_| {
            if let Some(tx) = started_tx.lock().take() {
                let _ = tx.send(());
            }
            std::thread::sleep(Duration::from_millis(300));
        });
        let builder = {
            let later_calls = later_calls.clone();
            builder
                .on("roomCreate", {
                    let later_calls = later_calls.clone();
                    move |_| *later_calls.lock() += 1
                })
                .on("ROOM_CREATE", move |_| *later_calls.lock() += 1)
        };
        let (session, mut server) = open(builder).await;
        next_envelope(&mut server).await;

        push(&mut server, Envelope::event("ROOM_CREATE", json!({ "id": "r1" }))).await;
        started_rx.await.unwrap();
        session.shutdown();

        assert_eq!(session.state(), SessionState::Closed);
        let at_shutdown = *later_calls.lock();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(at_shutdown, 0);
        assert_eq!(*later_calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_init_state_then_close() {
        let ready = Arc::new(Mutex::new(0));
        let builder = {
            let ready = ready.clone();
            SessionBuilder::new("tok").on("ready", move |_| *ready.lock() += 1)
        };
        let (session, mut server) = open(builder).await;
        next_envelope(&mut server).await;

        push(&mut server, Envelope::event("INIT_STATE", json!({ "user": { "id": "u1" } }))).await;
        push(&mut server, Envelope::event("ROOM_CREATE", json!({ "id": "r1" }))).await;

        let mut state = session.subscribe_state();
        state.wait_for(|s| *s == SessionState::Active).await.unwrap();

        server.close(None).await.unwrap();
        session.closed().await;

        assert_eq!(*ready.lock(), 1);
        assert_eq!(session.self_user().map(|u| u.id), Some("u1".to_string()));
        assert!(session.cache().read().find_room("r1").is_some());
        assert!(!session.is_online());
        assert!(matches!(
            session.fetch_user("u1").await,
            Err(GatewayError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_malformed_frame_is_dropped() {
        let (session, mut server) = open(SessionBuilder::new("tok")).await;
        next_envelope(&mut server).await;

        server.send(WsMessage::Text("not json".to_string())).await.unwrap();
        server.send(WsMessage::Binary(vec![0, 1])).await.unwrap();
        push(&mut server, Envelope::event("ROOM_CREATE", json!({ "id": "r1" }))).await;
        server.close(None).await.unwrap();
        session.closed().await;

        assert_eq!(session.cache().read().rooms().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let (session, _server) = open(SessionBuilder::new("tok")).await;
        assert!(session.is_online());
        assert_eq!(session.fetch_user("u9").await.unwrap().unwrap().id, "u9");

        session.shutdown();
        session.shutdown();

        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(
            session.send_message("r1", "hi").await,
            Err(GatewayError::Closed)
        ));
        session.on("ready", |_| {});
        assert_eq!(session.shared.emitter.listener_count("ready"), 0);
    }

    #[tokio::test]
    async fn test_blank_token_fails_before_connecting() {
        let err = SessionBuilder::new("   ")
            .gateway_url("ws://127.0.0.1:9")
            .connect()
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));

        let err = SessionBuilder::from_config(&Config::default())
            .connect()
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }
}
