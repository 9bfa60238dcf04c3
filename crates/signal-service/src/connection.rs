//! Per-connection signaling endpoint.
//!
//! Each accepted WebSocket gets one task that owns the connection's write
//! side exclusively; every outgoing frame is serialized through it. The
//! task drives a `tokio::select!` loop over the transport, an outbound
//! mailbox fed by the other members of the room, the heartbeat tick, and
//! cancellation (server shutdown or stall termination).
//!
//! Protocol state machine:
//!
//! - **Opened** — registered, no grant presented yet. Only `join` makes
//!   progress; negotiation frames are `NOT_IN_ROOM`; a malformed frame or
//!   a failed admission closes the connection.
//! - **Admitted** — grant consumed, peer in a room. Negotiation frames are
//!   relayed verbatim to the other members; a malformed frame is reported
//!   without closing.
//! - **Closing** — cleanup has begun; the registry record is dropped and
//!   the remaining members are told exactly once that the peer left.
//!
//! The registry is only ever used through its synchronous operations; the
//! lock is never held across a suspension point.

use crate::errors::SignalError;
use crate::observability::metrics;
use crate::protocol::{ClientFrame, ServerFrame};
use crate::registry::{Departure, PeerLink, PresenceRegistry, RoomMember};
use common::grant;
use common::secret::{ExposeSecret, SecretString};
use common::types::ConnectionId;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Outbound mailbox capacity per connection.
///
/// A member whose mailbox is full when a relay arrives is treated as
/// stalled and terminated rather than letting backpressure block the
/// sender's loop.
pub const OUTBOUND_CHANNEL_BUFFER: usize = 64;

/// Shared collaborators handed to every connection task.
#[derive(Clone)]
pub struct ConnectionContext {
    /// The presence registry, constructed at server startup.
    pub registry: Arc<PresenceRegistry>,

    /// Shared grant signing secret for verification.
    pub signing_secret: SecretString,

    /// Ping cadence; a connection that misses a full interval without
    /// ponging is reaped on the following tick.
    pub heartbeat_interval: Duration,

    /// Server shutdown token; each connection derives a child from it.
    pub shutdown: CancellationToken,
}

/// Handle one accepted TCP connection for its entire life.
pub async fn handle_connection(stream: TcpStream, ctx: ConnectionContext) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!(target: "sb.connection", error = %e, "WebSocket handshake failed");
            return;
        }
    };

    let connection_id = ConnectionId::new();
    drive_session(ws, connection_id, ctx).await;
}

#[instrument(
    skip(ws, ctx),
    name = "sb.connection",
    fields(connection_id = %connection_id)
)]
async fn drive_session(
    ws: WebSocketStream<TcpStream>,
    connection_id: ConnectionId,
    ctx: ConnectionContext,
) {
    let (mut sink, mut stream) = ws.split();
    let (frames_tx, mut frames_rx) = mpsc::channel(OUTBOUND_CHANNEL_BUFFER);
    let cancel = ctx.shutdown.child_token();

    let link = PeerLink {
        frames: frames_tx,
        cancel: cancel.clone(),
    };
    if ctx.registry.register(connection_id, link).is_err() {
        warn!(target: "sb.connection", connection_id = %connection_id, "Registration failed");
        return;
    }

    metrics::record_connection_opened();
    metrics::set_active_connections(ctx.registry.connection_count());
    debug!(target: "sb.connection", connection_id = %connection_id, "Connection opened");

    let mut actor = SessionActor {
        connection_id,
        registry: Arc::clone(&ctx.registry),
        signing_secret: ctx.signing_secret.clone(),
        state: SessionState::Opened,
    };

    let mut alive = true;
    let mut heartbeat = tokio::time::interval(ctx.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the loop only
    // sees real interval boundaries.
    heartbeat.tick().await;

    let close_reason = loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!(
                    target: "sb.connection",
                    connection_id = %connection_id,
                    "Connection cancelled"
                );
                break if ctx.shutdown.is_cancelled() { "server" } else { "stalled" };
            }

            _ = heartbeat.tick() => {
                if !alive {
                    info!(
                        target: "sb.connection",
                        connection_id = %connection_id,
                        "Heartbeat missed; reaping connection"
                    );
                    break "heartbeat";
                }
                alive = false;
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break "error";
                }
            }

            outbound = frames_rx.recv() => {
                // The channel cannot close while the registry holds our
                // sender; treat it as a transport end regardless.
                let Some(frame) = outbound else { break "error" };
                if sink.send(Message::Text(frame.to_json())).await.is_err() {
                    break "error";
                }
            }

            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let reply = actor.handle_text(&text);
                        let mut send_failed = false;
                        for frame in &reply.frames {
                            if sink.send(Message::Text(frame.to_json())).await.is_err() {
                                send_failed = true;
                                break;
                            }
                        }
                        if send_failed {
                            break "error";
                        }
                        if reply.close {
                            break "protocol";
                        }
                    }
                    Some(Ok(Message::Pong(_))) => alive = true,
                    Some(Ok(Message::Ping(payload))) => {
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            break "error";
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let reply = actor.reject(SignalError::InvalidMessage(
                            "binary frames are not supported",
                        ));
                        for frame in &reply.frames {
                            let _ = sink.send(Message::Text(frame.to_json())).await;
                        }
                        if reply.close {
                            break "protocol";
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break "client",
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(
                            target: "sb.connection",
                            connection_id = %connection_id,
                            error = %e,
                            "WebSocket error"
                        );
                        break "error";
                    }
                }
            }
        }
    };

    // Cleanup runs on every exit path. Survivors hear about the departure
    // exactly once, except during server shutdown where nothing is
    // broadcast and clients treat the abrupt close as transient.
    if let Some(departure) = ctx.registry.drop_connection(connection_id) {
        if !ctx.shutdown.is_cancelled() {
            notify_departure(&departure);
        }
    }
    let _ = sink.send(Message::Close(None)).await;

    metrics::record_connection_closed(close_reason);
    metrics::set_active_connections(ctx.registry.connection_count());
    metrics::set_active_rooms(ctx.registry.room_count());
    info!(
        target: "sb.connection",
        connection_id = %connection_id,
        reason = close_reason,
        "Connection closed"
    );
}

/// Tell every remaining member of a room that a peer departed.
pub(crate) fn notify_departure(departure: &Departure) {
    let frame = ServerFrame::PeerLeft {
        user_id: departure.user_id.clone(),
    };
    for member in &departure.remaining {
        forward_frame(member, frame.clone());
    }
}

/// Deliver a frame to another connection's mailbox without blocking.
///
/// A full mailbox means the receiver has stopped draining its socket; it
/// is cancelled so its cleanup path runs. A closed mailbox means the
/// receiver is already tearing down and needs nothing from us.
fn forward_frame(member: &RoomMember, frame: ServerFrame) {
    match member.link.frames.try_send(frame) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(
                target: "sb.connection",
                connection_id = %member.connection_id,
                user_id = %member.user_id,
                "Peer mailbox full; terminating stalled connection"
            );
            member.link.cancel.cancel();
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}

/// Protocol state for one connection.
#[derive(Debug)]
enum SessionState {
    Opened,
    Admitted { room_id: String, user_id: String },
}

/// What a handled frame asks the transport loop to do.
#[derive(Debug, Default)]
struct Reply {
    /// Frames for this connection, written before the next poll.
    frames: Vec<ServerFrame>,
    /// Close the transport after writing them.
    close: bool,
}

impl Reply {
    fn none() -> Self {
        Self::default()
    }

    fn send(frame: ServerFrame) -> Self {
        Self {
            frames: vec![frame],
            close: false,
        }
    }

    fn close_after(frame: ServerFrame) -> Self {
        Self {
            frames: vec![frame],
            close: true,
        }
    }

    fn close_now() -> Self {
        Self {
            frames: Vec::new(),
            close: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RelayKind {
    Offer,
    Answer,
    Ice,
}

impl RelayKind {
    fn name(self) -> &'static str {
        match self {
            RelayKind::Offer => "offer",
            RelayKind::Answer => "answer",
            RelayKind::Ice => "ice",
        }
    }

    fn stamp(self, payload: Value, from_user_id: String) -> ServerFrame {
        match self {
            RelayKind::Offer => ServerFrame::Offer {
                sdp: payload,
                from_user_id,
            },
            RelayKind::Answer => ServerFrame::Answer {
                sdp: payload,
                from_user_id,
            },
            RelayKind::Ice => ServerFrame::Ice {
                candidate: payload,
                from_user_id,
            },
        }
    }
}

/// The synchronous half of the endpoint: frame handling and presence
/// transitions. Kept free of I/O so the state machine is unit-testable
/// without a transport.
struct SessionActor {
    connection_id: ConnectionId,
    registry: Arc<PresenceRegistry>,
    signing_secret: SecretString,
    state: SessionState,
}

impl SessionActor {
    fn is_admitted(&self) -> bool {
        matches!(self.state, SessionState::Admitted { .. })
    }

    /// Handle one text frame and produce the transport's marching orders.
    fn handle_text(&mut self, text: &str) -> Reply {
        let frame = match ClientFrame::parse(text) {
            Ok(frame) => frame,
            Err(err) => return self.reject(err),
        };

        match frame {
            ClientFrame::Join { room_id, token } => self.handle_join(&room_id, &token),
            ClientFrame::Offer { sdp } => self.handle_relay(RelayKind::Offer, sdp),
            ClientFrame::Answer { sdp } => self.handle_relay(RelayKind::Answer, sdp),
            ClientFrame::Ice { candidate } => self.handle_relay(RelayKind::Ice, candidate),
            ClientFrame::Leave => self.handle_leave(),
        }
    }

    /// Report an error frame; close when fatal for the current state.
    fn reject(&self, err: SignalError) -> Reply {
        let fatal = err.is_fatal(self.is_admitted());
        debug!(
            target: "sb.connection",
            connection_id = %self.connection_id,
            code = err.code(),
            fatal = fatal,
            "Rejecting frame"
        );
        if fatal {
            Reply::close_after(err.to_frame())
        } else {
            Reply::send(err.to_frame())
        }
    }

    fn handle_join(&mut self, room_id: &str, token: &str) -> Reply {
        if self.is_admitted() {
            return self.reject(SignalError::AlreadyInRoom);
        }

        let verified = {
            let secret = self.signing_secret.expose_secret();
            grant::verify_grant(token, secret.as_bytes())
        };
        let claims = match verified {
            Ok(claims) => claims,
            Err(err) => {
                let err = SignalError::from(err);
                metrics::record_admission_rejected(err.code());
                return self.reject(err);
            }
        };

        // The grant's claimed room must match the room the client asks
        // for; a mismatch is a credential problem, not a room problem.
        if claims.room_id != room_id {
            debug!(
                target: "sb.connection",
                connection_id = %self.connection_id,
                "Join rejected: grant room does not match requested room"
            );
            metrics::record_admission_rejected(SignalError::InvalidToken.code());
            return self.reject(SignalError::InvalidToken);
        }

        let existing = match self.registry.admit(
            self.connection_id,
            &claims.room_id,
            &claims.user_id,
            &claims.app_id,
        ) {
            Ok(existing) => existing,
            Err(err) => {
                let err = SignalError::from(err);
                metrics::record_admission_rejected(err.code());
                return self.reject(err);
            }
        };

        // The members that were present learn about the newcomer and that
        // they are the offer initiator; the newcomer learns about them
        // through `joined.peers`.
        for member in &existing {
            forward_frame(
                member,
                ServerFrame::PeerJoined {
                    user_id: claims.user_id.clone(),
                    is_initiator: true,
                },
            );
        }

        let joined = ServerFrame::Joined {
            room_id: claims.room_id.clone(),
            user_id: claims.user_id.clone(),
            peers: existing.into_iter().map(|m| m.user_id).collect(),
        };

        info!(
            target: "sb.connection",
            connection_id = %self.connection_id,
            room_id = %claims.room_id,
            user_id = %claims.user_id,
            role = %claims.role,
            "Peer admitted to room"
        );
        metrics::record_peer_admitted();
        metrics::set_active_rooms(self.registry.room_count());

        self.state = SessionState::Admitted {
            room_id: claims.room_id,
            user_id: claims.user_id,
        };
        Reply::send(joined)
    }

    fn handle_relay(&mut self, kind: RelayKind, payload: Value) -> Reply {
        let SessionState::Admitted { user_id, .. } = &self.state else {
            return self.reject(SignalError::NotInRoom);
        };

        let members = self.registry.peers_of(self.connection_id);
        if members.is_empty() {
            // Alone in the room: negotiation frames are dropped, not errors.
            return Reply::none();
        }

        let frame = kind.stamp(payload, user_id.clone());
        for member in &members {
            forward_frame(member, frame.clone());
        }
        metrics::record_frame_relayed(kind.name());
        Reply::none()
    }

    fn handle_leave(&mut self) -> Reply {
        match self.state {
            SessionState::Opened => Reply::close_now(),
            SessionState::Admitted { .. } => {
                if let Some(departure) = self.registry.leave(self.connection_id) {
                    notify_departure(&departure);
                }
                metrics::set_active_rooms(self.registry.room_count());
                self.state = SessionState::Opened;
                Reply::close_now()
            }
        }
    }
}
