//! A scripted gateway server for end-to-end session tests.

use futures::{SinkExt, StreamExt};
use hiven_gateway::codec::{self, Envelope};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{accept_async, WebSocketStream};

/// Upper bound on any single wait in a test.
pub const WAIT: Duration = Duration::from_secs(5);

/// A WebSocket listener on an ephemeral local port.
pub struct FakeGateway {
    listener: TcpListener,
    url: String,
}

impl FakeGateway {
    /// Bind to `127.0.0.1:0`.
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        Self { listener, url }
    }

    /// URL clients should connect to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Accept one client and complete the WebSocket handshake.
    pub async fn accept(&self) -> Connection {
        let (stream, _) = tokio::time::timeout(WAIT, self.listener.accept())
            .await
            .expect("no client connected")
            .unwrap();
        Connection {
            ws: accept_async(stream).await.unwrap(),
        }
    }
}

/// Server side of one client connection.
pub struct Connection {
    ws: WebSocketStream<TcpStream>,
}

impl Connection {
    /// Next frame the client sent, skipping non-text frames.
    pub async fn recv(&mut self) -> Envelope {
        loop {
            let message = tokio::time::timeout(WAIT, self.ws.next())
                .await
                .expect("client sent nothing")
                .expect("connection ended")
                .unwrap();
            if let Some(envelope) = codec::decode_message(&message).unwrap() {
                return envelope;
            }
        }
    }

    /// Send an envelope to the client.
    pub async fn send(&mut self, envelope: Envelope) {
        self.ws
            .send(codec::encode_message(&envelope).unwrap())
            .await
            .unwrap();
    }

    /// Send a raw text frame.
    pub async fn send_text(&mut self, text: &str) {
        self.ws.send(WsMessage::Text(text.to_string())).await.unwrap();
    }

    /// Close the connection from the server side.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
