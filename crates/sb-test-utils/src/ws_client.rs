//! WebSocket client wrapper for signaling tests.
//!
//! Sends JSON frames and receives them with a bounded deadline. While a
//! receive is in flight the underlying stream is polled, which also
//! answers server pings; a client that is deliberately *not* polled stops
//! ponging and gets reaped, which is exactly what the heartbeat tests
//! exercise.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Deadline applied to every receive.
const RECV_DEADLINE: Duration = Duration::from_secs(5);

/// A connected signaling client.
pub struct SignalClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl SignalClient {
    /// Connect to a signaling server.
    pub async fn connect(url: &str) -> Self {
        let (ws, _) = connect_async(url).await.expect("websocket connect");
        Self { ws }
    }

    /// Send one JSON frame.
    pub async fn send_json(&mut self, frame: &Value) {
        self.ws
            .send(Message::Text(frame.to_string()))
            .await
            .expect("websocket send");
    }

    /// Send a raw text frame (for malformed-input tests).
    pub async fn send_text(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string()))
            .await
            .expect("websocket send");
    }

    /// Send a `join` frame.
    pub async fn join(&mut self, room_id: &str, token: &str) {
        self.send_json(&serde_json::json!({
            "type": "join",
            "roomId": room_id,
            "token": token,
        }))
        .await;
    }

    /// Receive the next JSON frame, skipping transport pings/pongs.
    ///
    /// Panics if the connection closes or the deadline passes.
    pub async fn recv(&mut self) -> Value {
        loop {
            let message = timeout(RECV_DEADLINE, self.ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("connection closed while waiting for a frame")
                .expect("websocket error");

            match message {
                Message::Text(text) => {
                    return serde_json::from_str(&text).expect("frame is JSON")
                }
                Message::Ping(_) | Message::Pong(_) => {}
                other => panic!("unexpected websocket message: {other:?}"),
            }
        }
    }

    /// Receive the next frame and assert its `type`.
    pub async fn recv_type(&mut self, expected: &str) -> Value {
        let frame = self.recv().await;
        assert_eq!(
            frame["type"], expected,
            "expected a {expected:?} frame, got: {frame}"
        );
        frame
    }

    /// Poll the connection for `duration`, collecting any text frames.
    ///
    /// Keeps the client responsive to heartbeat pings for the whole
    /// window. Panics if the connection closes.
    pub async fn pump(&mut self, duration: Duration) -> Vec<Value> {
        let deadline = Instant::now() + duration;
        let mut frames = Vec::new();

        loop {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return frames;
            };
            match timeout(remaining, self.ws.next()).await {
                Err(_) => return frames,
                Ok(Some(Ok(Message::Text(text)))) => {
                    frames.push(serde_json::from_str(&text).expect("frame is JSON"));
                }
                Ok(Some(Ok(_))) => {}
                Ok(None) | Ok(Some(Err(_))) => panic!("connection closed during pump"),
            }
        }
    }

    /// Drain the connection until the server closes it.
    ///
    /// Panics if the server is still talking after the deadline.
    pub async fn expect_closed(&mut self) {
        loop {
            match timeout(RECV_DEADLINE, self.ws.next())
                .await
                .expect("timed out waiting for the server to close")
            {
                None | Some(Ok(Message::Close(_))) | Some(Err(_)) => return,
                Some(Ok(_)) => {}
            }
        }
    }

    /// Close the connection from the client side.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
