//! Room store: tenant-scoped call containers.

use crate::models::Room;
use chrono::Utc;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Store of rooms as the core consumes them.
pub trait RoomStore: Send + Sync {
    /// Create a room owned by a tenant.
    fn create(&self, tenant_id: &str, name: &str, max_participants: u32) -> Room;

    /// All rooms owned by a tenant, in creation order.
    fn list_for_tenant(&self, tenant_id: &str) -> Vec<Room>;

    /// Look up a room by id, regardless of owner. Callers enforce
    /// tenant scoping.
    fn get(&self, room_id: &str) -> Option<Room>;
}

/// In-memory room store.
#[derive(Debug, Default)]
pub struct InMemoryRoomStore {
    rooms: Mutex<Vec<Room>>,
}

impl InMemoryRoomStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Room>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RoomStore for InMemoryRoomStore {
    fn create(&self, tenant_id: &str, name: &str, max_participants: u32) -> Room {
        let room = Room {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            max_participants,
            created_at: Utc::now(),
        };
        self.lock().push(room.clone());
        tracing::info!(
            target: "ag.repositories.rooms",
            room_id = %room.id,
            tenant_id = %tenant_id,
            "Room created"
        );
        room
    }

    fn list_for_tenant(&self, tenant_id: &str) -> Vec<Room> {
        self.lock()
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    fn get(&self, room_id: &str) -> Option<Room> {
        self.lock().iter().find(|r| r.id == room_id).cloned()
    }
}
