//! The hub: single owner of the match
//!
//! All shared state (registry, paddles, ball, random source) lives in one
//! `Hub` value that is moved into one task. Connection tasks never touch it
//! directly; they talk to it through a cloneable `HubHandle`, and the hub
//! applies their requests one at a time between simulation ticks.

use crate::client_manager::{Client, ClientId, ClientManager, Frame};
use crate::error::{Error, Result};
use crate::game;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    BallState, Envelope, FrameState, Input, PlayerState, ServerMessage, GAME_FPS, MAX_PLAYERS,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Capacity of the channel feeding the hub.
const EVENT_QUEUE_CAPACITY: usize = 1000;

/// Outbound queue depth per client before it counts as unresponsive.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Outbound frames buffered per client
    pub queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            tick_rate: GAME_FPS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl HubConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

/// Requests from connection tasks to the hub
#[derive(Debug)]
pub enum HubEvent {
    Register(Client),
    Unregister(ClientId),
    Input {
        client_id: ClientId,
        envelope: Envelope,
        raw: Frame,
    },
    Broadcast(Frame),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubPhase {
    /// Nobody connected
    Empty,
    /// One player waiting for an opponent
    Waiting,
    /// Both seats taken, the ball is moving
    Running,
}

pub struct Hub {
    clients: ClientManager,
    ball: BallState,
    rng: StdRng,
    ticks: u64,
}

impl Hub {
    /// Creates a hub whose ball launches are seeded from OS entropy
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates a hub with a fixed seed, for reproducible matches
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            clients: ClientManager::new(MAX_PLAYERS),
            ball: BallState::centered(),
            rng,
            ticks: 0,
        }
    }

    /// Starts a hub task and returns the handle used to reach it
    pub fn spawn(config: HubConfig) -> HubHandle {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let hub = Hub::new();
        tokio::spawn(hub.run(events_rx, config.tick_duration()));
        HubHandle::new(events_tx, config.queue_capacity)
    }

    pub fn phase(&self) -> HubPhase {
        match self.clients.len() {
            0 => HubPhase::Empty,
            n if n < MAX_PLAYERS => HubPhase::Waiting,
            _ => HubPhase::Running,
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn ball(&self) -> &BallState {
        &self.ball
    }

    pub fn player(&self, client_id: ClientId) -> Option<PlayerState> {
        self.clients.get(client_id).map(|c| c.player)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Processes one event to completion
    pub fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Register(client) => self.register(client),
            HubEvent::Unregister(client_id) => {
                self.unregister(client_id);
            }
            HubEvent::Input {
                client_id,
                envelope,
                raw,
            } => self.handle_input(client_id, &envelope, raw),
            HubEvent::Broadcast(frame) => self.broadcast(frame),
        }
    }

    /// Seats a client; the second one starts the match
    ///
    /// A third client is turned away by closing its queue right away.
    pub fn register(&mut self, client: Client) {
        if let Err(rejected) = self.clients.add_client(client) {
            warn!(
                "Match is full, rejecting client {} ({} players seated)",
                rejected.id,
                self.clients.len()
            );
            return;
        }

        self.clients.assign_start_positions();

        let Some(players) = self.clients.player_states() else {
            info!("Waiting for an opponent");
            return;
        };

        game::restart_ball(&mut self.ball, &mut self.rng);
        info!("Game starting with clients {:?}", self.clients.ids());

        self.broadcast_message(&ServerMessage::GameStart(FrameState {
            players_state: players,
            ball_state: self.ball,
        }));
    }

    /// Removes a client and closes its queue. Unknown ids are ignored.
    pub fn unregister(&mut self, client_id: ClientId) -> bool {
        match self.clients.remove_client(client_id) {
            Some(_) => {
                if self.phase() == HubPhase::Waiting {
                    info!("Match paused, waiting for an opponent");
                }
                true
            }
            None => false,
        }
    }

    /// Applies a movement, if any, and echoes the raw message to everyone
    ///
    /// Actions other than `MOVE_UP`/`MOVE_DOWN` leave the paddles alone but
    /// are still echoed.
    pub fn handle_input(&mut self, client_id: ClientId, envelope: &Envelope, raw: Frame) {
        let Some(client) = self.clients.get_mut(client_id) else {
            debug!("Input from unregistered client {}", client_id);
            return;
        };

        match envelope.input() {
            Some(Input::MoveUp) => client.player.move_up(),
            Some(Input::MoveDown) => client.player.move_down(),
            None => debug!(
                "No movement for action {:?} from client {}",
                envelope.action, client_id
            ),
        }

        self.broadcast(raw);
    }

    /// Runs one simulation step and publishes the frame
    ///
    /// Does nothing unless both seats are taken.
    pub fn tick(&mut self) {
        let Some(players) = self.clients.player_states() else {
            return;
        };

        self.ticks += 1;
        self.ball = game::advance(&self.ball, &players, &mut self.rng);

        self.broadcast_message(&ServerMessage::UpdateFrame(FrameState {
            players_state: players,
            ball_state: self.ball,
        }));
    }

    /// Offers a frame to every client without blocking
    pub fn broadcast(&mut self, frame: Frame) {
        for client_id in self.clients.offer_all(&frame) {
            info!("Removed unresponsive client {}", client_id);
        }
    }

    /// Encodes and broadcasts; an encoding failure skips this message only
    fn broadcast_message(&mut self, message: &ServerMessage) {
        match encode(message) {
            Ok(frame) => self.broadcast(frame),
            Err(e) => error!("Dropping broadcast: {}", e),
        }
    }

    /// Main loop: ticks and events, strictly one at a time
    ///
    /// Returns once every handle has been dropped.
    pub async fn run(mut self, mut events: mpsc::Receiver<HubEvent>, tick_duration: Duration) {
        let mut ticker = interval(tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let ticks_per_report = (10.0 / tick_duration.as_secs_f64()).max(1.0) as u64;

        info!("Hub running at {:.1} ticks/s", 1.0 / tick_duration.as_secs_f64());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();

                    if self.ticks > 0 && self.ticks % ticks_per_report == 0 {
                        debug!("Tick {}: {:?}, ball at ({:.1}, {:.1})",
                               self.ticks, self.phase(), self.ball.x, self.ball.y);
                    }
                },
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        info!("All hub handles dropped, hub stopping");
                        break;
                    }
                },
            }
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

pub fn encode(message: &ServerMessage) -> Result<Frame> {
    serde_json::to_string(message)
        .map(Frame::from)
        .map_err(Error::Encode)
}

/// Cloneable entry point to a running hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    events: mpsc::Sender<HubEvent>,
    next_client_id: Arc<AtomicU32>,
    queue_capacity: usize,
}

impl HubHandle {
    pub fn new(events: mpsc::Sender<HubEvent>, queue_capacity: usize) -> Self {
        Self {
            events,
            next_client_id: Arc::new(AtomicU32::new(1)),
            queue_capacity,
        }
    }

    /// Allocates an id and a queue for a fresh connection
    pub fn new_client(&self) -> (Client, mpsc::Receiver<Frame>) {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        Client::new(id, self.queue_capacity)
    }

    pub async fn register(&self, client: Client) -> Result<()> {
        self.send(HubEvent::Register(client)).await
    }

    pub async fn unregister(&self, client_id: ClientId) -> Result<()> {
        self.send(HubEvent::Unregister(client_id)).await
    }

    pub async fn input(&self, client_id: ClientId, envelope: Envelope, raw: Frame) -> Result<()> {
        self.send(HubEvent::Input {
            client_id,
            envelope,
            raw,
        })
        .await
    }

    pub async fn broadcast(&self, frame: Frame) -> Result<()> {
        self.send(HubEvent::Broadcast(frame)).await
    }

    async fn send(&self, event: HubEvent) -> Result<()> {
        self.events.send(event).await.map_err(|_| Error::HubClosed)
    }
}
