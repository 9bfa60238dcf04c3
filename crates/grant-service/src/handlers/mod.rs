//! HTTP handlers for the access plane.

mod apps;
mod health;
mod rooms;
mod tokens;

pub use apps::{create_app, list_apps};
pub use health::{health_check, metrics_handler};
pub use rooms::{create_room, get_room, list_rooms};
pub use tokens::issue_room_token;
