//! Room actor: an isolated Tokio task that owns one match.
//!
//! Each room runs in its own task and talks to the outside world through
//! an mpsc channel. Ticks fire inside the same `select!` loop as
//! commands, so the simulation, paddle input, votes, and membership
//! changes are serialized without a lock.

use std::collections::HashSet;
use std::fmt;

use rally_protocol::{Recipient, RoomId, ServerEvent, VOTES_NEEDED};
use rally_sim::{Direction, Side, SimulationState, apply_paddle, step};
use rally_tick::TickScheduler;
use rally_transport::ConnectionId;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};

use crate::{RoomConfig, RoomError, RoomPhase};

/// Outbox of one connection. The room never waits on it: a full outbox
/// drops the event, and the next `gameState` supersedes whatever was lost.
pub type ConnectionSender = mpsc::Sender<ServerEvent>;

/// One of the two player positions in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Player 1, left paddle. Taken by whoever waited in the queue.
    One,
    /// Player 2, right paddle.
    Two,
}

impl Slot {
    pub fn side(self) -> Side {
        match self {
            Self::One => Side::Player1,
            Self::Two => Side::Player2,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "one"),
            Self::Two => write!(f, "two"),
        }
    }
}

/// Commands sent to a room actor through its channel.
///
/// Variants carrying a `oneshot::Sender` are request/response: the
/// caller waits for the actor to reply.
enum RoomCommand {
    AddConnection {
        conn: ConnectionId,
        slot: Slot,
        outbox: ConnectionSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    RemoveConnection {
        conn: ConnectionId,
        reply: oneshot::Sender<Vec<ConnectionId>>,
    },
    PaddleMove {
        conn: ConnectionId,
        dir: Direction,
    },
    VoteRestart {
        conn: ConnectionId,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    State {
        reply: oneshot::Sender<SimulationState>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// A snapshot of room metadata (not the simulation itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub phase: RoomPhase,
    /// Bound connections, indexed by slot.
    pub connections: [Option<ConnectionId>; 2],
    /// Restart votes currently counted.
    pub votes: usize,
    /// Ticks run since the room was created.
    pub ticks: u64,
}

impl RoomInfo {
    pub fn connection_count(&self) -> usize {
        self.connections.iter().flatten().count()
    }
}

/// Handle to a running room actor.
///
/// Cheap to clone: it's an `mpsc::Sender` and the room id. The registry
/// holds one per room and every player's connection handler holds
/// another for input routing.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomHandle")
            .field("room_id", &self.room_id)
            .finish_non_exhaustive()
    }
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Bind `conn` to `slot`. Binding the second slot starts the match.
    ///
    /// # Errors
    /// - [`RoomError::InvalidState`] once the room is past `Filling`
    /// - [`RoomError::AlreadyInRoom`] if `conn` holds the other slot
    /// - [`RoomError::SlotTaken`] if `slot` is occupied
    pub async fn add_connection(
        &self,
        conn: ConnectionId,
        slot: Slot,
        outbox: ConnectionSender,
    ) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::AddConnection {
            conn,
            slot,
            outbox,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Unbind `conn` and tear the room down. Returns the connections
    /// still bound afterwards.
    ///
    /// Once this returns, no further tick will run. Removing a
    /// connection that isn't bound changes nothing.
    pub async fn remove_connection(&self, conn: ConnectionId) -> Result<Vec<ConnectionId>, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::RemoveConnection { conn, reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Move `conn`'s paddle one step. Ignored unless the match is live
    /// and `conn` is bound.
    pub async fn paddle_move(&self, conn: ConnectionId, dir: Direction) -> Result<(), RoomError> {
        self.request(RoomCommand::PaddleMove { conn, dir }).await
    }

    /// Count `conn`'s restart vote. Ignored unless the match is over and
    /// `conn` is bound.
    pub async fn vote_restart(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.request(RoomCommand::VoteRestart { conn }).await
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::Info { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Current simulation state.
    pub async fn state(&self) -> Result<SimulationState, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::State { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Stop the actor and wait until it has acknowledged. The scheduler
    /// is stopped before the acknowledgement is sent.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.request(RoomCommand::Shutdown { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    async fn request(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_id.clone())
    }
}

/// A connection bound to a slot.
struct Binding {
    conn: ConnectionId,
    outbox: ConnectionSender,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    phase: RoomPhase,
    config: RoomConfig,
    slots: [Option<Binding>; 2],
    votes: HashSet<ConnectionId>,
    sim: SimulationState,
    rng: StdRng,
    scheduler: TickScheduler,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs until shut down or until every handle is dropped.
    async fn run(mut self) {
        tracing::debug!(room_id = %self.room_id, "room actor started");

        loop {
            tokio::select! {
                // Commands first: a removal queued alongside a due tick
                // must win, so nothing is simulated after teardown.
                biased;

                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if let RoomCommand::Shutdown { reply } = cmd {
                        self.scheduler.pause();
                        self.transition(RoomPhase::TornDown);
                        let _ = reply.send(());
                        break;
                    }
                    self.handle_command(cmd);
                }
                _ = self.scheduler.wait_for_tick() => {
                    self.on_tick();
                    self.scheduler.record_tick_end();
                }
            }
        }

        tracing::debug!(
            room_id = %self.room_id,
            ticks = self.scheduler.tick_count(),
            "room actor stopped"
        );
    }

    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::AddConnection {
                conn,
                slot,
                outbox,
                reply,
            } => {
                let result = self.add_connection(conn, slot, outbox);
                let _ = reply.send(result);
            }
            RoomCommand::RemoveConnection { conn, reply } => {
                let remaining = self.remove_connection(conn);
                let _ = reply.send(remaining);
            }
            RoomCommand::PaddleMove { conn, dir } => self.paddle_move(conn, dir),
            RoomCommand::VoteRestart { conn } => self.vote_restart(conn),
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::State { reply } => {
                let _ = reply.send(self.sim.clone());
            }
            // Handled in `run`, which has to leave the loop.
            RoomCommand::Shutdown { .. } => {}
        }
    }

    fn add_connection(
        &mut self,
        conn: ConnectionId,
        slot: Slot,
        outbox: ConnectionSender,
    ) -> Result<(), RoomError> {
        if !self.phase.is_joinable() {
            return Err(RoomError::InvalidState(format!(
                "cannot bind to room in phase {}",
                self.phase
            )));
        }
        if self.slot_of(conn).is_some() {
            return Err(RoomError::AlreadyInRoom(conn, self.room_id.clone()));
        }
        if self.slots[slot.index()].is_some() {
            return Err(RoomError::SlotTaken(self.room_id.clone(), slot));
        }

        self.slots[slot.index()] = Some(Binding { conn, outbox });
        tracing::debug!(room_id = %self.room_id, %conn, %slot, "connection bound");

        if let [Some(one), Some(two)] = &self.slots {
            let joined = ServerEvent::RoomJoined {
                room_id: self.room_id.clone(),
                player1_id: one.conn,
                player2_id: two.conn,
            };
            self.transition(RoomPhase::Active);
            self.broadcast(Recipient::All, joined);
            self.scheduler.resume();
            tracing::info!(room_id = %self.room_id, "match started");
        }
        Ok(())
    }

    fn remove_connection(&mut self, conn: ConnectionId) -> Vec<ConnectionId> {
        let Some(slot) = self.slot_of(conn) else {
            tracing::debug!(room_id = %self.room_id, %conn, "remove of unbound connection ignored");
            return self.bound();
        };

        // Stop the clock before anyone hears about it.
        self.scheduler.pause();
        self.votes.remove(&conn);
        self.broadcast(Recipient::AllExcept(conn), ServerEvent::PlayerDisconnected);
        self.slots[slot.index()] = None;

        if self.phase != RoomPhase::TornDown {
            self.transition(RoomPhase::TornDown);
        }
        let remaining = self.bound();
        tracing::info!(
            room_id = %self.room_id,
            %conn,
            remaining = remaining.len(),
            "player left, room torn down"
        );
        remaining
    }

    fn paddle_move(&mut self, conn: ConnectionId, dir: Direction) {
        // Dropped, not buffered, until the second bind starts the match.
        // Clients only send input after `roomJoined`, which that bind emits.
        if !self.phase.is_active() {
            return;
        }
        let Some(slot) = self.slot_of(conn) else {
            tracing::debug!(room_id = %self.room_id, %conn, "paddle move from unbound connection");
            return;
        };
        apply_paddle(&mut self.sim, &self.config.court, slot.side(), dir);
        self.broadcast(Recipient::All, ServerEvent::GameState(self.sim.clone()));
    }

    fn vote_restart(&mut self, conn: ConnectionId) {
        if self.phase != RoomPhase::Finished || self.slot_of(conn).is_none() {
            tracing::debug!(room_id = %self.room_id, %conn, phase = %self.phase, "restart vote ignored");
            return;
        }

        self.votes.insert(conn);
        tracing::debug!(room_id = %self.room_id, %conn, votes = self.votes.len(), "restart vote");

        if self.votes.len() < VOTES_NEEDED {
            self.broadcast(
                Recipient::All,
                ServerEvent::RestartVoteUpdate {
                    votes_received: self.votes.len(),
                    votes_needed: VOTES_NEEDED,
                },
            );
            return;
        }

        self.votes.clear();
        self.sim = SimulationState::new(&self.config.court);
        self.transition(RoomPhase::Active);
        self.scheduler.resume();
        tracing::info!(room_id = %self.room_id, "match restarted");

        self.broadcast(
            Recipient::All,
            ServerEvent::RestartConfirmed {
                state: self.sim.clone(),
            },
        );
        self.broadcast(Recipient::All, ServerEvent::GameState(self.sim.clone()));
    }

    fn on_tick(&mut self) {
        if !self.phase.is_active() {
            return;
        }

        let outcome = step(&mut self.sim, &self.config.court, &mut self.rng);
        if let Some(scorer) = outcome.scorer() {
            tracing::debug!(
                room_id = %self.room_id,
                %scorer,
                player1 = self.sim.score.player1,
                player2 = self.sim.score.player2,
                "point scored"
            );
        }
        self.broadcast(Recipient::All, ServerEvent::GameState(self.sim.clone()));

        if let Some(winner) = outcome.winner() {
            self.scheduler.pause();
            self.transition(RoomPhase::Finished);
            tracing::info!(
                room_id = %self.room_id,
                %winner,
                player1 = self.sim.score.player1,
                player2 = self.sim.score.player2,
                "match over"
            );
            self.broadcast(
                Recipient::All,
                ServerEvent::GameOver {
                    winner,
                    final_score: self.sim.score,
                },
            );
        }
    }

    fn transition(&mut self, to: RoomPhase) {
        if !self.phase.can_transition_to(to) {
            tracing::warn!(room_id = %self.room_id, from = %self.phase, %to, "unexpected phase change");
        }
        self.phase = to;
    }

    /// Fire-and-forget delivery. Never awaits a slow client.
    fn broadcast(&self, to: Recipient, event: ServerEvent) {
        for binding in self.slots.iter().flatten() {
            if !to.includes(binding.conn) {
                continue;
            }
            if let Err(e) = binding.outbox.try_send(event.clone()) {
                tracing::debug!(
                    room_id = %self.room_id,
                    conn = %binding.conn,
                    event = event.name(),
                    error = %e,
                    "outbox rejected event, dropping"
                );
            }
        }
    }

    fn slot_of(&self, conn: ConnectionId) -> Option<Slot> {
        [Slot::One, Slot::Two]
            .into_iter()
            .find(|slot| matches!(&self.slots[slot.index()], Some(b) if b.conn == conn))
    }

    fn bound(&self) -> Vec<ConnectionId> {
        self.slots.iter().flatten().map(|b| b.conn).collect()
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            phase: self.phase,
            connections: [
                self.slots[0].as_ref().map(|b| b.conn),
                self.slots[1].as_ref().map(|b| b.conn),
            ],
            votes: self.votes.len(),
            ticks: self.scheduler.tick_count(),
        }
    }
}

/// Spawns a room actor task and returns a handle to it.
pub(crate) fn spawn_room(room_id: RoomId, config: RoomConfig) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));

    let rng = match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let actor = RoomActor {
        room_id: room_id.clone(),
        phase: RoomPhase::Filling,
        sim: SimulationState::new(&config.court),
        scheduler: TickScheduler::new(config.tick.clone()),
        config,
        slots: [None, None],
        votes: HashSet::new(),
        rng,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
