//! Integration tests for the server: real WebSocket clients playing the
//! game end to end against a server on a random port.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use incognito::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = IncognitoServerBuilder::new()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, event: &ClientEvent) {
    let json = serde_json::to_string(event).expect("encode");
    ws.send(Message::Text(json.into())).await.expect("send");
}

async fn recv(ws: &mut ClientWs) -> ServerEvent {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("event should arrive in time")
        .expect("stream should stay open")
        .expect("frame should decode");
    serde_json::from_slice(&msg.into_data()).expect("decode server event")
}

/// Receives events until one matches, discarding the rest.
async fn recv_until(
    ws: &mut ClientWs,
    pred: impl Fn(&ServerEvent) -> bool,
) -> ServerEvent {
    loop {
        let event = recv(ws).await;
        if pred(&event) {
            return event;
        }
    }
}

/// Creates a room and returns its code.
async fn create_room(ws: &mut ClientWs, host: &str) -> RoomCode {
    send(
        ws,
        &ClientEvent::CreateRoom {
            player_name: host.into(),
        },
    )
    .await;
    match recv(ws).await {
        ServerEvent::RoomCreated { room_code } => room_code,
        other => panic!("expected room-created, got {other:?}"),
    }
}

fn assigned_label(room: &RoomSnapshot, player: &str) -> String {
    room.players
        .iter()
        .find(|p| p.name == player)
        .and_then(|p| p.assigned_name.clone())
        .expect("label should be visible in this view")
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_create_room_returns_code() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let code = create_room(&mut ws, "alice").await;
    assert_eq!(code.as_str().len(), 6);
}

#[tokio::test]
async fn test_create_room_blank_name_rejected() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        &ClientEvent::CreateRoom {
            player_name: "  ".into(),
        },
    )
    .await;

    match recv(&mut ws).await {
        ServerEvent::Error { code, .. } => assert_eq!(code, 409),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_unknown_room_returns_room_not_found() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        &ClientEvent::JoinRoom {
            room_code: RoomCode::new("NOROOM"),
            player_name: "alice".into(),
        },
    )
    .await;

    assert!(matches!(recv(&mut ws).await, ServerEvent::RoomNotFound));
}

#[tokio::test]
async fn test_malformed_event_gets_error_and_connection_survives() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::Text("not json".into())).await.expect("send");
    match recv(&mut ws).await {
        ServerEvent::Error { code, .. } => assert_eq!(code, 400),
        other => panic!("expected error, got {other:?}"),
    }

    // The connection still works afterwards.
    let code = create_room(&mut ws, "alice").await;
    assert_eq!(code.as_str().len(), 6);
}

#[tokio::test]
async fn test_join_broadcasts_game_state_to_all_clients() {
    let addr = start_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;

    let code = create_room(&mut ws1, "alice").await;
    send(
        &mut ws1,
        &ClientEvent::JoinRoom {
            room_code: code.clone(),
            player_name: "alice".into(),
        },
    )
    .await;
    let state = recv_until(&mut ws1, |e| {
        matches!(e, ServerEvent::GameState { .. })
    })
    .await;
    match &state {
        ServerEvent::GameState { room } => {
            assert_eq!(room.phase, GamePhase::Waiting);
            assert_eq!(room.players.len(), 1);
        }
        _ => unreachable!(),
    }

    send(
        &mut ws2,
        &ClientEvent::JoinRoom {
            room_code: code,
            player_name: "bob".into(),
        },
    )
    .await;

    // Both the existing and the new client see the two-player roster.
    for ws in [&mut ws1, &mut ws2] {
        let state = recv_until(ws, |e| {
            matches!(e, ServerEvent::GameState { room } if room.players.len() == 2)
        })
        .await;
        match state {
            ServerEvent::GameState { room } => {
                assert_eq!(room.players[0].name, "alice");
                assert_eq!(room.players[1].name, "bob");
            }
            _ => unreachable!(),
        }
    }
}

#[tokio::test]
async fn test_start_alone_rejected_with_409() {
    let addr = start_server().await;
    let mut ws = connect(&addr).await;

    let code = create_room(&mut ws, "alice").await;
    send(
        &mut ws,
        &ClientEvent::JoinRoom {
            room_code: code.clone(),
            player_name: "alice".into(),
        },
    )
    .await;
    recv_until(&mut ws, |e| matches!(e, ServerEvent::GameState { .. })).await;

    send(&mut ws, &ClientEvent::StartGame { room_code: code }).await;
    match recv(&mut ws).await {
        ServerEvent::Error { code, .. } => assert_eq!(code, 409),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_command_before_join_rejected_with_409() {
    let addr = start_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;

    let code = create_room(&mut ws1, "alice").await;

    // ws2 skips join-room entirely; rejections still reach it.
    send(
        &mut ws2,
        &ClientEvent::AddName {
            room_code: code.clone(),
            name: "   ".into(),
        },
    )
    .await;
    send(
        &mut ws2,
        &ClientEvent::StartGame { room_code: code },
    )
    .await;

    for _ in 0..2 {
        match recv(&mut ws2).await {
            ServerEvent::Error { code, .. } => assert_eq!(code, 409),
            other => panic!("expected error, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_full_game_session() {
    let addr = start_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;

    // Alice creates and both players join.
    let code = create_room(&mut ws1, "alice").await;
    send(
        &mut ws1,
        &ClientEvent::JoinRoom {
            room_code: code.clone(),
            player_name: "alice".into(),
        },
    )
    .await;
    send(
        &mut ws2,
        &ClientEvent::JoinRoom {
            room_code: code.clone(),
            player_name: "bob".into(),
        },
    )
    .await;
    recv_until(&mut ws2, |e| {
        matches!(e, ServerEvent::GameState { room } if room.players.len() == 2)
    })
    .await;

    // Fill the pool and start.
    send(
        &mut ws1,
        &ClientEvent::AddName {
            room_code: code.clone(),
            name: "Cleopatra".into(),
        },
    )
    .await;
    send(
        &mut ws2,
        &ClientEvent::AddName {
            room_code: code.clone(),
            name: "Einstein".into(),
        },
    )
    .await;
    send(
        &mut ws1,
        &ClientEvent::StartGame {
            room_code: code.clone(),
        },
    )
    .await;

    let alice_view = match recv_until(&mut ws1, |e| {
        matches!(e, ServerEvent::GameState { room } if room.phase == GamePhase::Playing)
    })
    .await
    {
        ServerEvent::GameState { room } => room,
        _ => unreachable!(),
    };
    let bob_view = match recv_until(&mut ws2, |e| {
        matches!(e, ServerEvent::GameState { room } if room.phase == GamePhase::Playing)
    })
    .await
    {
        ServerEvent::GameState { room } => room,
        _ => unreachable!(),
    };

    // Each client sees the other's label but never its own.
    let alice_row = alice_view.players.iter().find(|p| p.name == "alice").unwrap();
    assert!(alice_row.has_assignment);
    assert_eq!(alice_row.assigned_name, None);
    let alice_label = assigned_label(&bob_view, "alice");
    let bob_label = assigned_label(&alice_view, "bob");
    assert!(["Cleopatra", "Einstein"].contains(&alice_label.as_str()));
    assert_ne!(alice_label, bob_label);

    // Alice asks; bob sees the question before its answer.
    send(
        &mut ws1,
        &ClientEvent::AskQuestion {
            room_code: code.clone(),
            question: QuestionDraft {
                asker_name: "alice".into(),
                text: "Am I a scientist?".into(),
            },
        },
    )
    .await;
    let question_id = match recv_until(&mut ws2, |e| {
        matches!(e, ServerEvent::QuestionAsked { .. })
    })
    .await
    {
        ServerEvent::QuestionAsked { question } => {
            assert_eq!(question.asker_name, "alice");
            assert!(question.answer.is_none());
            question.id
        }
        _ => unreachable!(),
    };

    send(
        &mut ws2,
        &ClientEvent::AnswerQuestion {
            room_code: code.clone(),
            question_id,
            answer: Answer::Yes,
        },
    )
    .await;
    match recv_until(&mut ws1, |e| {
        matches!(e, ServerEvent::QuestionAnswered { .. })
    })
    .await
    {
        ServerEvent::QuestionAnswered {
            question_id: answered,
            answer,
        } => {
            assert_eq!(answered, question_id);
            assert_eq!(answer, Answer::Yes);
        }
        _ => unreachable!(),
    }

    // Guesses are case-insensitive; after both, the game is finished.
    send(
        &mut ws1,
        &ClientEvent::MakeGuess {
            room_code: code.clone(),
            player_name: "alice".into(),
            guess: alice_label.to_lowercase(),
        },
    )
    .await;
    match recv_until(&mut ws2, |e| {
        matches!(e, ServerEvent::PlayerGuessed { .. })
    })
    .await
    {
        ServerEvent::PlayerGuessed {
            player_name,
            correct,
        } => {
            assert_eq!(player_name, "alice");
            assert!(correct);
        }
        _ => unreachable!(),
    }

    send(
        &mut ws2,
        &ClientEvent::MakeGuess {
            room_code: code,
            player_name: "bob".into(),
            guess: bob_label,
        },
    )
    .await;
    let final_state = match recv_until(&mut ws1, |e| {
        matches!(e, ServerEvent::GameState { room } if room.phase == GamePhase::Finished)
    })
    .await
    {
        ServerEvent::GameState { room } => room,
        _ => unreachable!(),
    };
    assert!(final_state.players.iter().all(|p| p.has_guessed));
}

#[tokio::test]
async fn test_rejoin_after_disconnect_keeps_player() {
    let addr = start_server().await;
    let mut ws1 = connect(&addr).await;
    let mut ws2 = connect(&addr).await;

    let code = create_room(&mut ws1, "alice").await;
    send(
        &mut ws1,
        &ClientEvent::JoinRoom {
            room_code: code.clone(),
            player_name: "alice".into(),
        },
    )
    .await;
    send(
        &mut ws2,
        &ClientEvent::JoinRoom {
            room_code: code.clone(),
            player_name: "bob".into(),
        },
    )
    .await;
    recv_until(&mut ws1, |e| {
        matches!(e, ServerEvent::GameState { room } if room.players.len() == 2)
    })
    .await;

    // Bob drops and comes back on a fresh connection.
    ws2.close(None).await.expect("close");
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut ws3 = connect(&addr).await;
    send(
        &mut ws3,
        &ClientEvent::JoinRoom {
            room_code: code,
            player_name: "bob".into(),
        },
    )
    .await;
    let state = recv_until(&mut ws3, |e| {
        matches!(e, ServerEvent::GameState { .. })
    })
    .await;
    match state {
        ServerEvent::GameState { room } => {
            assert_eq!(room.players.len(), 2, "rejoin does not duplicate bob");
        }
        _ => unreachable!(),
    }
}
