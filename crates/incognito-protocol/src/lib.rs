//! Wire protocol for Incognito.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`RoomSnapshot`],
//!   [`Question`], the identity newtypes) — the structures that travel
//!   on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those events are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong doing so.
//!
//! The protocol layer sits between transport (raw bytes) and the room
//! layer (game state). It knows nothing about connections or rooms — only
//! how events are shaped.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Answer, ClientEvent, ConnectionId, GamePhase, PlayerSnapshot, Question,
    QuestionDraft, QuestionId, RoomCode, RoomSnapshot, ServerEvent,
};
