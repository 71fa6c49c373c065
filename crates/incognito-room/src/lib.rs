//! Room session management for Incognito.
//!
//! Each room runs as an isolated Tokio task (actor model) owning its
//! players, name pool, questions, and phase. State changes fan out as
//! full snapshots to every subscribed connection, projected so that no
//! player ever sees their own assigned label.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — creates, looks up, and evicts rooms by code
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomConfig`] — room settings (minimum players, idle TTL)

mod assign;
mod config;
mod error;
mod registry;
mod room;

pub use assign::distribute;
pub use config::RoomConfig;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{EventSender, RoomHandle, RoomStatus};
