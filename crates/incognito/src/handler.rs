//! Per-connection handler: event decoding and room dispatch.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbound event queue.
//! Room actors hold a clone of the queue's sender, so broadcasts and
//! direct replies travel the same path.

use std::sync::Arc;

use incognito_protocol::{ClientEvent, Codec, ConnectionId, RoomCode, ServerEvent};
use incognito_room::{EventSender, RoomHandle};
use incognito_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::IncognitoError;
use crate::server::ServerState;

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), IncognitoError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Writer task: serializes queued events onto the socket. Ends when
    // every sender clone is gone or the socket breaks.
    let writer_conn = conn.clone();
    let writer_state = Arc::clone(&state);
    let writer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let bytes = match writer_state.codec.encode(&event) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode event");
                    continue;
                }
            };
            if writer_conn.send(&bytes).await.is_err() {
                break;
            }
        }
    });

    // Rooms this connection has joined, for unsubscription on exit.
    let mut joined: Vec<RoomHandle> = Vec::new();

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode event");
                let _ = event_tx.send(ServerEvent::Error {
                    code: 400,
                    message: "malformed event".into(),
                });
                continue;
            }
        };

        dispatch(&state, conn_id, &event_tx, &mut joined, event).await?;
    }

    // Unbind this connection everywhere it joined; the player stays and
    // can rejoin under the same name.
    for handle in &joined {
        let _ = handle.unsubscribe(conn_id).await;
    }
    drop(event_tx);
    let _ = writer.await;

    Ok(())
}

/// Routes one client event to the registry or the targeted room.
async fn dispatch(
    state: &Arc<ServerState>,
    conn_id: ConnectionId,
    event_tx: &EventSender,
    joined: &mut Vec<RoomHandle>,
    event: ClientEvent,
) -> Result<(), IncognitoError> {
    match event {
        ClientEvent::CreateRoom { player_name } => {
            let result = state.rooms.lock().await.open(&player_name);
            match result {
                Ok(room_code) => {
                    let _ = event_tx.send(ServerEvent::RoomCreated { room_code });
                }
                Err(e) => {
                    let _ = event_tx.send(ServerEvent::Error {
                        code: 409,
                        message: e.to_string(),
                    });
                }
            }
        }

        ClientEvent::JoinRoom {
            room_code,
            player_name,
        } => {
            let Some(handle) = lookup(state, event_tx, &room_code).await else {
                return Ok(());
            };
            handle.join(conn_id, player_name, event_tx.clone()).await?;
            if !joined.iter().any(|h| h.code() == &room_code) {
                joined.push(handle);
            }
        }

        ClientEvent::AddName { room_code, name } => {
            if let Some(handle) = lookup(state, event_tx, &room_code).await {
                handle.add_name(conn_id, name, event_tx.clone()).await?;
            }
        }

        ClientEvent::StartGame { room_code } => {
            if let Some(handle) = lookup(state, event_tx, &room_code).await {
                handle.start(conn_id, event_tx.clone()).await?;
            }
        }

        ClientEvent::AskQuestion {
            room_code,
            question,
        } => {
            if let Some(handle) = lookup(state, event_tx, &room_code).await {
                handle.ask(conn_id, question).await?;
            }
        }

        ClientEvent::AnswerQuestion {
            room_code,
            question_id,
            answer,
        } => {
            if let Some(handle) = lookup(state, event_tx, &room_code).await {
                handle
                    .answer(conn_id, question_id, answer, event_tx.clone())
                    .await?;
            }
        }

        ClientEvent::MakeGuess {
            room_code,
            player_name,
            guess,
        } => {
            if let Some(handle) = lookup(state, event_tx, &room_code).await {
                handle
                    .guess(conn_id, player_name, guess, event_tx.clone())
                    .await?;
            }
        }
    }

    Ok(())
}

/// Looks up a room by code. On a miss, tells the requester (and only the
/// requester) and returns `None`.
async fn lookup(
    state: &Arc<ServerState>,
    event_tx: &EventSender,
    room_code: &RoomCode,
) -> Option<RoomHandle> {
    let handle = state.rooms.lock().await.get(room_code);
    if handle.is_none() {
        tracing::debug!(room = %room_code, "unknown room");
        let _ = event_tx.send(ServerEvent::RoomNotFound);
    }
    handle
}
