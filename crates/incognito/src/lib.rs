//! # Incognito
//!
//! WebSocket backend for the "Who Am I?" party game: players join a room
//! by short code, pool famous names, and each gets someone else's pick
//! stuck to their forehead — figuratively — to deduce through yes/no
//! questions.
//!
//! The server is authoritative. Clients send [`ClientEvent`]s, rooms
//! apply them one at a time, and every state change fans out as a full
//! snapshot projected per recipient (nobody sees their own label).
//!
//! ```rust,no_run
//! use incognito::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), IncognitoError> {
//!     let server = IncognitoServer::builder()
//!         .bind("0.0.0.0:8080")
//!         .build()
//!         .await?;
//!     server.run().await
//! }
//! ```
//!
//! [`ClientEvent`]: incognito_protocol::ClientEvent

mod error;
mod handler;
mod server;

pub use error::IncognitoError;
pub use server::{IncognitoServer, IncognitoServerBuilder};

/// Commonly used types, re-exported from the sub-crates.
pub mod prelude {
    pub use crate::{IncognitoError, IncognitoServer, IncognitoServerBuilder};
    pub use incognito_protocol::{
        Answer, ClientEvent, ConnectionId, GamePhase, Question, QuestionDraft,
        QuestionId, RoomCode, RoomSnapshot, ServerEvent,
    };
    pub use incognito_room::{RoomConfig, RoomRegistry};
}
