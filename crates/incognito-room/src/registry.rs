//! Room registry: creates, looks up, and evicts rooms.

use std::collections::HashMap;

use incognito_protocol::RoomCode;
use rand::Rng;

use crate::room::spawn_room;
use crate::{RoomConfig, RoomError, RoomHandle};

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Alphabet for generated room codes.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated room codes.
const CODE_LEN: usize = 6;

/// Tracks all active rooms by code.
///
/// This is the entry point for room operations from the server layer.
/// All game state lives inside the room actors; the registry only maps
/// codes to handles.
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, RoomHandle>,
    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry. Rooms it spawns use `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
        }
    }

    /// Registers a room under a caller-chosen code.
    pub fn create(&mut self, code: RoomCode) -> Result<RoomHandle, RoomError> {
        if self.rooms.contains_key(&code) {
            return Err(RoomError::DuplicateCode(code));
        }

        let handle =
            spawn_room(code.clone(), self.config.clone(), DEFAULT_CHANNEL_SIZE);
        self.rooms.insert(code.clone(), handle.clone());
        tracing::info!(room = %code, rooms = self.rooms.len(), "room created");
        Ok(handle)
    }

    /// Allocates a fresh code and registers an empty room for `host_name`.
    ///
    /// The host is not joined here; they join over their connection like
    /// everyone else.
    pub fn open(&mut self, host_name: &str) -> Result<RoomCode, RoomError> {
        if host_name.trim().is_empty() {
            return Err(RoomError::EmptyPlayerName);
        }

        // Regenerate on collision; at 36^6 codes this rarely loops.
        loop {
            let code = generate_code();
            if !self.rooms.contains_key(&code) {
                self.create(code.clone())?;
                return Ok(code);
            }
        }
    }

    /// Returns a handle to the room with `code`, if it exists.
    pub fn get(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(code).cloned()
    }

    /// Returns cloned handles to all active rooms.
    ///
    /// Useful when callers need to perform async operations on rooms
    /// without holding the registry lock.
    pub fn handles(&self) -> Vec<RoomHandle> {
        self.rooms.values().cloned().collect()
    }

    /// The idle TTL rooms are swept against.
    pub fn idle_ttl(&self) -> std::time::Duration {
        self.config.idle_ttl
    }

    /// Removes a room from the registry, returning its handle. The actor
    /// keeps running until the caller shuts it down.
    pub fn remove(&mut self, code: &RoomCode) -> Option<RoomHandle> {
        let handle = self.rooms.remove(code);
        if handle.is_some() {
            tracing::info!(room = %code, "idle room evicted");
        }
        handle
    }

    /// Evicts rooms whose idle time exceeds the configured TTL, plus any
    /// whose actor is gone. Returns the evicted codes.
    ///
    /// Awaits each room actor; callers sharing the registry behind a lock
    /// should run the same phases through [`handles`](Self::handles) and
    /// [`remove`](Self::remove) so lookups are not stalled by the sweep.
    pub async fn sweep_idle(&mut self) -> Vec<RoomCode> {
        let mut evicted = Vec::new();
        for handle in self.handles() {
            match handle.status().await {
                Ok(status) if status.idle_for >= self.config.idle_ttl => {
                    evicted.push(handle.code().clone());
                }
                Ok(_) => {}
                Err(_) => evicted.push(handle.code().clone()),
            }
        }

        for code in &evicted {
            if let Some(handle) = self.remove(code) {
                let _ = handle.shutdown().await;
            }
        }
        evicted
    }

    /// Returns the number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Lists all active room codes.
    pub fn room_codes(&self) -> Vec<RoomCode> {
        self.rooms.keys().cloned().collect()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

/// Generates a random 6-character uppercase alphanumeric code.
fn generate_code() -> RoomCode {
    let mut rng = rand::rng();
    let code: String = (0..CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect();
    RoomCode::new(code)
}
