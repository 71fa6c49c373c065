//! Room configuration.

use std::time::Duration;

/// Configuration for a room instance.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Minimum players required to start the game.
    pub min_players: usize,

    /// How long a room may sit with no state-changing activity before
    /// the periodic sweep evicts it.
    pub idle_ttl: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            idle_ttl: Duration::from_secs(60 * 60),
        }
    }
}
