//! Presence registry: the single piece of shared mutable state.
//!
//! Maps live connections to peers and rooms to member sets. Every public
//! operation is atomic with respect to the others: the forward index
//! (connection → peer) and the reverse index (room → members) either both
//! reflect a change or neither does. Operations are synchronous, never
//! perform I/O, and never suspend while the lock is held, so connection
//! tasks may call them freely from their select loops.
//!
//! The registry stores each connection's [`PeerLink`] so that room members
//! can relay frames to one another and terminate a stalled peer without
//! ever touching the transport under the lock.

use crate::protocol::ServerFrame;
use common::types::ConnectionId;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Room capacity pinned when a presence entry is created.
///
/// Calls are pairwise; the stored room's configured cap governs grant
/// issuance, while live presence enforces the pairwise limit.
pub const DEFAULT_ROOM_CAPACITY: usize = 2;

/// Handle for delivering frames to a connection from other tasks.
///
/// `frames` feeds the connection's outbound mailbox; `cancel` terminates
/// the connection when its mailbox is full (a stalled peer is treated as
/// failed rather than blocking the sender).
#[derive(Debug, Clone)]
pub struct PeerLink {
    pub frames: mpsc::Sender<ServerFrame>,
    pub cancel: CancellationToken,
}

/// A member of a room as seen at one atomic snapshot.
#[derive(Debug, Clone)]
pub struct RoomMember {
    pub connection_id: ConnectionId,
    pub user_id: String,
    pub link: PeerLink,
}

// `PeerLink` carries an `mpsc::Sender` and a `CancellationToken`, neither of
// which has a meaningful notion of equality, so identity is defined by the
// connection/user pair alone (this is what the test assertions rely on).
impl PartialEq for RoomMember {
    fn eq(&self, other: &Self) -> bool {
        self.connection_id == other.connection_id && self.user_id == other.user_id
    }
}

/// Result of a peer leaving a room, used to drive `peer-left` frames.
#[derive(Debug)]
pub struct Departure {
    pub room_id: String,
    pub user_id: String,
    pub remaining: Vec<RoomMember>,
}

/// Registry operation failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// No peer record exists for the connection (or one already did on
    /// register) — a programming error on the caller's side.
    #[error("inconsistent peer record for connection")]
    Internal,

    /// The peer is already admitted to a room.
    #[error("connection is already admitted to a room")]
    AlreadyAdmitted,

    /// The room is pinned to a different tenant.
    #[error("room belongs to a different tenant")]
    TenantMismatch,

    /// The room member set is at capacity.
    #[error("room is at capacity")]
    RoomFull,
}

/// Peer record: a connection's presence projection.
#[derive(Debug)]
struct PeerState {
    room_id: Option<String>,
    user_id: Option<String>,
    tenant_id: Option<String>,
    link: PeerLink,
}

impl PeerState {
    fn is_admitted(&self) -> bool {
        self.room_id.is_some()
    }
}

/// Presence entry for a room with at least one member.
#[derive(Debug)]
struct RoomEntry {
    /// Owning tenant, pinned by the first admission.
    tenant_id: String,
    max_participants: usize,
    /// Members in admission order.
    members: Vec<ConnectionId>,
}

#[derive(Debug, Default)]
struct Inner {
    peers: HashMap<ConnectionId, PeerState>,
    rooms: HashMap<String, RoomEntry>,
}

impl Inner {
    /// Snapshot the members of a room, excluding `skip` if given.
    fn members_of(&self, room_id: &str, skip: Option<ConnectionId>) -> Vec<RoomMember> {
        let Some(entry) = self.rooms.get(room_id) else {
            return Vec::new();
        };

        entry
            .members
            .iter()
            .filter(|id| Some(**id) != skip)
            .filter_map(|id| {
                let peer = self.peers.get(id)?;
                Some(RoomMember {
                    connection_id: *id,
                    user_id: peer.user_id.clone()?,
                    link: peer.link.clone(),
                })
            })
            .collect()
    }

    /// Remove a peer from its room, if admitted. Shared by `leave` and
    /// `drop_connection` so both run under one lock acquisition.
    fn leave_locked(&mut self, connection_id: ConnectionId) -> Option<Departure> {
        let peer = self.peers.get_mut(&connection_id)?;
        let room_id = peer.room_id.take()?;
        let user_id = peer.user_id.take().unwrap_or_default();
        peer.tenant_id = None;

        let Some(entry) = self.rooms.get_mut(&room_id) else {
            // Room vanished between admission and leave; the peer is
            // already reset, nothing to notify.
            return None;
        };

        entry.members.retain(|id| *id != connection_id);
        if entry.members.is_empty() {
            self.rooms.remove(&room_id);
        }

        let remaining = self.members_of(&room_id, None);
        Some(Departure {
            room_id,
            user_id,
            remaining,
        })
    }
}

/// The presence registry.
///
/// A single mutex guards both indices; constructed at server startup and
/// passed into every connection task as an explicit collaborator.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    inner: Mutex<Inner>,
}

impl PresenceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an unadmitted peer record for a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Internal`] if a record already exists for
    /// this connection; registering twice is a programming error.
    pub fn register(&self, connection_id: ConnectionId, link: PeerLink) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        if inner.peers.contains_key(&connection_id) {
            warn!(
                target: "sb.registry",
                connection_id = %connection_id,
                "Duplicate registration for connection"
            );
            return Err(RegistryError::Internal);
        }

        inner.peers.insert(
            connection_id,
            PeerState {
                room_id: None,
                user_id: None,
                tenant_id: None,
                link,
            },
        );
        debug!(target: "sb.registry", connection_id = %connection_id, "Peer registered");
        Ok(())
    }

    /// Admit a registered peer to a room.
    ///
    /// Returns the members that were in the room *before* this admission,
    /// in admission order; the caller uses the snapshot for the `joined`
    /// peer list, notifications, and initiator selection.
    ///
    /// The room's presence entry is created on first admission with the
    /// tenant pinned to the supplied tenant ID. A tenant mismatch takes
    /// precedence over a full room: it signals a credential problem, not a
    /// capacity one.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Internal`] when no peer record exists,
    /// [`RegistryError::AlreadyAdmitted`] when the peer is in any room,
    /// [`RegistryError::TenantMismatch`], [`RegistryError::RoomFull`].
    pub fn admit(
        &self,
        connection_id: ConnectionId,
        room_id: &str,
        user_id: &str,
        tenant_id: &str,
    ) -> Result<Vec<RoomMember>, RegistryError> {
        let mut inner = self.lock();

        let peer = inner
            .peers
            .get(&connection_id)
            .ok_or(RegistryError::Internal)?;
        if peer.is_admitted() {
            return Err(RegistryError::AlreadyAdmitted);
        }

        if let Some(entry) = inner.rooms.get(room_id) {
            if entry.tenant_id != tenant_id {
                debug!(
                    target: "sb.registry",
                    connection_id = %connection_id,
                    room_id = %room_id,
                    "Admission rejected: tenant mismatch"
                );
                return Err(RegistryError::TenantMismatch);
            }
            if entry.members.len() >= entry.max_participants {
                debug!(
                    target: "sb.registry",
                    connection_id = %connection_id,
                    room_id = %room_id,
                    members = entry.members.len(),
                    "Admission rejected: room full"
                );
                return Err(RegistryError::RoomFull);
            }
        }

        let existing = inner.members_of(room_id, None);

        let entry = inner
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| RoomEntry {
                tenant_id: tenant_id.to_string(),
                max_participants: DEFAULT_ROOM_CAPACITY,
                members: Vec::new(),
            });
        entry.members.push(connection_id);

        // Checked above; both indices mutate under the same lock.
        let peer = inner
            .peers
            .get_mut(&connection_id)
            .ok_or(RegistryError::Internal)?;
        peer.room_id = Some(room_id.to_string());
        peer.user_id = Some(user_id.to_string());
        peer.tenant_id = Some(tenant_id.to_string());

        debug!(
            target: "sb.registry",
            connection_id = %connection_id,
            room_id = %room_id,
            user_id = %user_id,
            "Peer admitted"
        );
        Ok(existing)
    }

    /// Remove an admitted peer from its room, resetting it to unadmitted.
    ///
    /// Returns `None` without error when the peer is not admitted (or does
    /// not exist); the empty room entry is deleted.
    pub fn leave(&self, connection_id: ConnectionId) -> Option<Departure> {
        self.lock().leave_locked(connection_id)
    }

    /// Remove the peer record entirely, leaving its room first if needed.
    pub fn drop_connection(&self, connection_id: ConnectionId) -> Option<Departure> {
        let mut inner = self.lock();
        let departure = inner.leave_locked(connection_id);
        inner.peers.remove(&connection_id);
        debug!(target: "sb.registry", connection_id = %connection_id, "Peer dropped");
        departure
    }

    /// All *other* members of the caller's room.
    #[must_use]
    pub fn peers_of(&self, connection_id: ConnectionId) -> Vec<RoomMember> {
        let inner = self.lock();
        let Some(room_id) = inner
            .peers
            .get(&connection_id)
            .and_then(|p| p.room_id.clone())
        else {
            return Vec::new();
        };
        inner.members_of(&room_id, Some(connection_id))
    }

    /// Snapshot of the user IDs currently in a room, in admission order.
    #[must_use]
    pub fn users_of(&self, room_id: &str) -> Vec<String> {
        self.lock()
            .members_of(room_id, None)
            .into_iter()
            .map(|m| m.user_id)
            .collect()
    }

    /// Number of live peer records.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.lock().peers.len()
    }

    /// Number of rooms with at least one member.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.lock().rooms.len()
    }
}
