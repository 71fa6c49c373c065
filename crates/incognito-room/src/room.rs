//! Room actor: an isolated Tokio task that owns one game session.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. This is the "actor model" — no shared
//! mutable state, just message passing. Commands are applied one at a
//! time, so every broadcast reflects a fully applied mutation.

use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use incognito_protocol::{
    Answer, ConnectionId, GamePhase, PlayerSnapshot, Question, QuestionDraft,
    QuestionId, RoomCode, RoomSnapshot, ServerEvent,
};
use tokio::sync::{mpsc, oneshot};

use crate::{RoomConfig, RoomError, assign};

/// Channel sender delivering outbound events to one connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel — the
/// caller sends a command and waits for the response on it. Game
/// commands have no reply channel: outcomes travel over the event
/// subscription, rejections go to the requester only.
pub(crate) enum RoomCommand {
    /// Add (or rebind) a player and subscribe their connection.
    Join {
        connection: ConnectionId,
        player_name: String,
        sender: EventSender,
    },

    /// Contribute a candidate label to the name pool.
    AddName {
        connection: ConnectionId,
        name: String,
        reply: EventSender,
    },

    /// Request the waiting → playing transition and name distribution.
    Start {
        connection: ConnectionId,
        reply: EventSender,
    },

    /// Ask a question; the server stamps id, asker, and timestamp.
    Ask {
        connection: ConnectionId,
        draft: QuestionDraft,
    },

    /// Answer a question. First answer wins.
    Answer {
        connection: ConnectionId,
        question_id: QuestionId,
        answer: Answer,
        reply: EventSender,
    },

    /// Guess one's own assigned label, addressed by stable player name.
    Guess {
        connection: ConnectionId,
        player_name: String,
        guess: String,
        reply: EventSender,
    },

    /// Request the current unmasked room snapshot.
    Snapshot { reply: oneshot::Sender<RoomSnapshot> },

    /// Request room metadata for lifecycle decisions.
    Status { reply: oneshot::Sender<RoomStatus> },

    /// Drop a connection's subscription without removing its player.
    Unsubscribe { connection: ConnectionId },

    /// Shut down the room.
    Shutdown,
}

/// A snapshot of room metadata (not the game state itself).
#[derive(Debug, Clone)]
pub struct RoomStatus {
    /// The room's code.
    pub code: RoomCode,
    /// Current lifecycle phase.
    pub phase: GamePhase,
    /// Number of players in the room, connected or not.
    pub player_count: usize,
    /// Time since the last state-changing command.
    pub idle_for: Duration,
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone — it's just an `mpsc::Sender` wrapper. The
/// `RoomRegistry` holds one of these per room.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Adds a player under `player_name`, or rebinds them if a player
    /// with that exact name already exists. Subscribes `sender` either way.
    pub async fn join(
        &self,
        connection: ConnectionId,
        player_name: impl Into<String>,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Join {
            connection,
            player_name: player_name.into(),
            sender,
        })
        .await
    }

    /// Contributes a candidate label to the name pool. `reply` receives
    /// the rejection event if the contribution is refused.
    pub async fn add_name(
        &self,
        connection: ConnectionId,
        name: impl Into<String>,
        reply: EventSender,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::AddName {
            connection,
            name: name.into(),
            reply,
        })
        .await
    }

    /// Requests the game start.
    pub async fn start(
        &self,
        connection: ConnectionId,
        reply: EventSender,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Start { connection, reply }).await
    }

    /// Asks a question.
    pub async fn ask(
        &self,
        connection: ConnectionId,
        draft: QuestionDraft,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Ask { connection, draft }).await
    }

    /// Answers a question.
    pub async fn answer(
        &self,
        connection: ConnectionId,
        question_id: QuestionId,
        answer: Answer,
        reply: EventSender,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Answer {
            connection,
            question_id,
            answer,
            reply,
        })
        .await
    }

    /// Submits a guess on behalf of `player_name`.
    pub async fn guess(
        &self,
        connection: ConnectionId,
        player_name: impl Into<String>,
        guess: impl Into<String>,
        reply: EventSender,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Guess {
            connection,
            player_name: player_name.into(),
            guess: guess.into(),
            reply,
        })
        .await
    }

    /// Requests the current unmasked snapshot.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Snapshot { reply: reply_tx }).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Requests the room's lifecycle metadata.
    pub async fn status(&self) -> Result<RoomStatus, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Status { reply: reply_tx }).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Drops a connection's event subscription. The player stays in the
    /// room and can rejoin later under the same name.
    pub async fn unsubscribe(
        &self,
        connection: ConnectionId,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Unsubscribe { connection }).await
    }

    /// Tells the room to shut down.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

/// One subscribed connection: the outbound channel and the player it
/// joined as. The name is recorded at join time, so a stale tab kept
/// open through a rejoin still projects as its player.
struct Subscriber {
    player: String,
    sender: EventSender,
}

/// A player as held inside the actor.
struct Player {
    /// Display name — the stable identity key within the room.
    name: String,
    /// The live connection currently bound to this player, if any.
    connection: Option<ConnectionId>,
    /// The label this player must guess.
    assigned_name: Option<String>,
    /// Set once by a correct guess; never cleared.
    has_guessed: bool,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    code: RoomCode,
    phase: GamePhase,
    config: RoomConfig,
    /// Players in join order.
    players: Vec<Player>,
    name_pool: Vec<String>,
    questions: Vec<Question>,
    next_question_id: u64,
    /// Per-connection outbound channels, tagged with the joined player.
    subscribers: HashMap<ConnectionId, Subscriber>,
    last_activity: Instant,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        tracing::info!(room = %self.code, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    connection,
                    player_name,
                    sender,
                } => {
                    self.touch();
                    self.handle_join(connection, player_name, sender);
                }
                RoomCommand::AddName {
                    connection,
                    name,
                    reply,
                } => {
                    self.touch();
                    self.handle_add_name(connection, name, &reply);
                }
                RoomCommand::Start { connection, reply } => {
                    self.touch();
                    self.handle_start(connection, &reply);
                }
                RoomCommand::Ask { connection, draft } => {
                    self.touch();
                    self.handle_ask(connection, draft);
                }
                RoomCommand::Answer {
                    connection,
                    question_id,
                    answer,
                    reply,
                } => {
                    self.touch();
                    self.handle_answer(connection, question_id, answer, &reply);
                }
                RoomCommand::Guess {
                    connection,
                    player_name,
                    guess,
                    reply,
                } => {
                    self.touch();
                    self.handle_guess(connection, player_name, guess, &reply);
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
                RoomCommand::Status { reply } => {
                    let _ = reply.send(self.status());
                }
                RoomCommand::Unsubscribe { connection } => {
                    self.handle_unsubscribe(connection);
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room = %self.code, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(room = %self.code, "room actor stopped");
    }

    fn handle_join(
        &mut self,
        connection: ConnectionId,
        player_name: String,
        sender: EventSender,
    ) {
        // A connection re-joining under a different name abandons its
        // previous player row; clear the stale binding.
        for player in &mut self.players {
            if player.connection == Some(connection)
                && player.name != player_name
            {
                player.connection = None;
            }
        }

        self.subscribers.insert(
            connection,
            Subscriber {
                player: player_name.clone(),
                sender,
            },
        );

        match self
            .players
            .iter_mut()
            .find(|p| p.name == player_name)
        {
            Some(player) => {
                // Rejoin: same exact name rebinds to the new connection.
                // Assignment and guess status survive the reconnect.
                player.connection = Some(connection);
                tracing::info!(
                    room = %self.code,
                    %connection,
                    player = %player_name,
                    "player rejoined"
                );
            }
            None => {
                self.players.push(Player {
                    name: player_name.clone(),
                    connection: Some(connection),
                    assigned_name: None,
                    has_guessed: false,
                });
                tracing::info!(
                    room = %self.code,
                    %connection,
                    player = %player_name,
                    players = self.players.len(),
                    "player joined"
                );
            }
        }

        self.broadcast_snapshot();
    }

    fn handle_add_name(
        &mut self,
        connection: ConnectionId,
        name: String,
        reply: &EventSender,
    ) {
        if !self.phase.is_waiting() {
            self.reject(
                connection,
                reply,
                "name pool is locked once the game starts",
            );
            return;
        }
        if name.trim().is_empty() {
            self.reject(connection, reply, "name must not be blank");
            return;
        }
        if self.name_pool.contains(&name) {
            self.reject(
                connection,
                reply,
                format!("{name:?} is already in the pool"),
            );
            return;
        }

        self.name_pool.push(name);
        self.broadcast_snapshot();
    }

    fn handle_start(&mut self, connection: ConnectionId, reply: &EventSender) {
        if !self.phase.is_waiting() {
            self.reject(connection, reply, "game already started");
            return;
        }
        if self.players.len() < self.config.min_players {
            self.reject(
                connection,
                reply,
                format!(
                    "need at least {} players to start",
                    self.config.min_players
                ),
            );
            return;
        }
        if self.name_pool.len() < self.players.len() {
            self.reject(
                connection,
                reply,
                "name pool is smaller than the player count",
            );
            return;
        }

        let names: Vec<&str> =
            self.players.iter().map(|p| p.name.as_str()).collect();
        let assigned = assign::distribute(&names, &self.name_pool);
        for (player, label) in self.players.iter_mut().zip(assigned) {
            player.assigned_name = Some(label);
            player.has_guessed = false;
        }

        self.phase = GamePhase::Playing;
        tracing::info!(
            room = %self.code,
            players = self.players.len(),
            pool = self.name_pool.len(),
            "game started"
        );

        self.broadcast_snapshot();
    }

    fn handle_ask(&mut self, connection: ConnectionId, draft: QuestionDraft) {
        let id = QuestionId(self.next_question_id);
        self.next_question_id += 1;

        let question = Question {
            id,
            asker_id: connection,
            asker_name: draft.asker_name,
            text: draft.text,
            answer: None,
            asked_at: unix_millis(),
        };
        self.questions.push(question.clone());

        tracing::debug!(room = %self.code, question = %id, "question asked");
        self.broadcast(ServerEvent::QuestionAsked { question });
    }

    fn handle_answer(
        &mut self,
        connection: ConnectionId,
        question_id: QuestionId,
        answer: Answer,
        reply: &EventSender,
    ) {
        let Some(idx) = self
            .questions
            .iter()
            .position(|q| q.id == question_id)
        else {
            self.reject(
                connection,
                reply,
                format!("unknown question {question_id}"),
            );
            return;
        };

        if self.questions[idx].answer.is_some() {
            self.reject(
                connection,
                reply,
                format!("question {question_id} is already answered"),
            );
            return;
        }

        self.questions[idx].answer = Some(answer);
        self.broadcast(ServerEvent::QuestionAnswered {
            question_id,
            answer,
        });
    }

    fn handle_guess(
        &mut self,
        connection: ConnectionId,
        player_name: String,
        guess: String,
        reply: &EventSender,
    ) {
        let Some(idx) =
            self.players.iter().position(|p| p.name == player_name)
        else {
            self.reject(
                connection,
                reply,
                format!("unknown player {player_name:?}"),
            );
            return;
        };

        let correct = self.players[idx]
            .assigned_name
            .as_deref()
            .is_some_and(|label| label.eq_ignore_ascii_case(&guess));

        if !correct {
            // A wrong guess changes nothing; hasGuessed is monotonic.
            self.broadcast(ServerEvent::PlayerGuessed {
                player_name,
                correct: false,
            });
            return;
        }

        self.players[idx].has_guessed = true;
        tracing::info!(
            room = %self.code,
            player = %player_name,
            "correct guess"
        );
        self.broadcast(ServerEvent::PlayerGuessed {
            player_name,
            correct: true,
        });

        if self.phase.is_playing()
            && self.players.iter().all(|p| p.has_guessed)
        {
            self.phase = GamePhase::Finished;
            tracing::info!(room = %self.code, "game finished");
        }

        self.broadcast_snapshot();
    }

    fn handle_unsubscribe(&mut self, connection: ConnectionId) {
        self.subscribers.remove(&connection);
        for player in &mut self.players {
            if player.connection == Some(connection) {
                player.connection = None;
                tracing::debug!(
                    room = %self.code,
                    %connection,
                    player = %player.name,
                    "connection unbound"
                );
            }
        }
    }

    /// Sends the current snapshot to every subscriber, each projected for
    /// the player it joined as (a player never sees their own assigned
    /// label, even on a connection that has since been superseded).
    fn broadcast_snapshot(&self) {
        let snapshot = self.snapshot();
        for subscriber in self.subscribers.values() {
            let _ = subscriber.sender.send(ServerEvent::GameState {
                room: snapshot.for_viewer(Some(&subscriber.player)),
            });
        }
    }

    /// Sends one event to every subscriber. Silently drops channels whose
    /// receiver is gone.
    fn broadcast(&self, event: ServerEvent) {
        for subscriber in self.subscribers.values() {
            let _ = subscriber.sender.send(event.clone());
        }
    }

    /// Sends a rejection to the requesting connection only. Other
    /// subscribers see nothing. Unsubscribed requesters are reached
    /// through the `reply` channel that rode in with the command.
    fn reject(
        &self,
        connection: ConnectionId,
        reply: &EventSender,
        message: impl Into<String>,
    ) {
        let message = message.into();
        tracing::debug!(
            room = %self.code,
            %connection,
            %message,
            "request rejected"
        );
        let sender = self
            .subscribers
            .get(&connection)
            .map(|s| &s.sender)
            .unwrap_or(reply);
        let _ = sender.send(ServerEvent::Error { code: 409, message });
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            phase: self.phase,
            players: self
                .players
                .iter()
                .map(|p| PlayerSnapshot {
                    name: p.name.clone(),
                    has_guessed: p.has_guessed,
                    has_assignment: p.assigned_name.is_some(),
                    assigned_name: p.assigned_name.clone(),
                })
                .collect(),
            name_pool: self.name_pool.clone(),
        }
    }

    fn status(&self) -> RoomStatus {
        RoomStatus {
            code: self.code.clone(),
            phase: self.phase,
            player_count: self.players.len(),
            idle_for: self.last_activity.elapsed(),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// `channel_size` controls backpressure — if the channel fills up,
/// senders will wait (bounded channel).
pub(crate) fn spawn_room(
    code: RoomCode,
    config: RoomConfig,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        code: code.clone(),
        phase: GamePhase::Waiting,
        config,
        players: Vec::new(),
        name_pool: Vec::new(),
        questions: Vec::new(),
        next_question_id: 1,
        subscribers: HashMap::new(),
        last_activity: Instant::now(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
