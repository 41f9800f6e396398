//! Registry of connected players, in join order
//!
//! This module holds the hub-side view of each connection:
//! - Client identity and the sending half of its outbound queue
//! - The paddle position the hub keeps for it
//! - Capacity enforcement (a match has exactly two seats)
//!
//! Dropping a `Client` drops the only sender of its queue, which is how the
//! hub tells the connection's writer task to shut down.

use crate::error::{Error, Result};
use log::{debug, info, warn};
use shared::{PlayerState, MAX_PLAYERS, START_POSITIONS};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Unique client identifier, handed out by the hub handle
pub type ClientId = u32;

/// One encoded message, shared between every queue it is offered to
pub type Frame = Arc<str>;

/// A registered connection as seen by the hub
#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub connected_at: Instant,
    pub player: PlayerState,
    sender: mpsc::Sender<Frame>,
}

impl Client {
    /// Creates a client together with the receiving end of its queue
    ///
    /// The receiver goes to the connection's writer task; the client itself
    /// is handed to the hub.
    pub fn new(id: ClientId, queue_capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let client = Self {
            id,
            connected_at: Instant::now(),
            player: PlayerState::default(),
            sender,
        };
        (client, receiver)
    }

    /// Offers a frame without waiting
    ///
    /// Fails when the queue is full or the writer has gone away.
    pub fn offer(&self, frame: &Frame) -> Result<()> {
        self.sender
            .try_send(Arc::clone(frame))
            .map_err(|e| match e {
                TrySendError::Full(_) => Error::QueueFull(self.id),
                TrySendError::Closed(_) => Error::QueueClosed(self.id),
            })
    }
}

/// Join-ordered set of at most `max_clients` clients
///
/// Order matters: index 0 plays the left paddle, index 1 the right one.
pub struct ClientManager {
    clients: Vec<Client>,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: Vec::with_capacity(max_clients),
            max_clients,
        }
    }

    /// Attempts to seat a new client
    ///
    /// Returns the client back when the registry is full so the caller
    /// decides how to turn it away.
    pub fn add_client(&mut self, client: Client) -> Result<usize, Client> {
        if self.clients.len() >= self.max_clients {
            return Err(client);
        }

        info!("Client {} joined", client.id);
        self.clients.push(client);
        Ok(self.clients.len())
    }

    /// Removes a client, keeping the order of the others
    pub fn remove_client(&mut self, client_id: ClientId) -> Option<Client> {
        let index = self.clients.iter().position(|c| c.id == client_id)?;
        let client = self.clients.remove(index);
        info!(
            "Client {} left after {:.1}s",
            client.id,
            client.connected_at.elapsed().as_secs_f32()
        );
        Some(client)
    }

    pub fn get(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == client_id)
    }

    pub fn get_mut(&mut self, client_id: ClientId) -> Option<&mut Client> {
        self.clients.iter_mut().find(|c| c.id == client_id)
    }

    /// Puts every seated client on its starting spot by join order
    pub fn assign_start_positions(&mut self) {
        for (client, start) in self.clients.iter_mut().zip(START_POSITIONS) {
            client.player = start;
        }
    }

    /// Both paddles in join order, or None while a seat is empty
    pub fn player_states(&self) -> Option<[PlayerState; MAX_PLAYERS]> {
        match self.clients.as_slice() {
            [left, right] => Some([left.player, right.player]),
            _ => None,
        }
    }

    /// Offers a frame to every client and drops the ones that cannot take it
    ///
    /// Returns the ids that were removed. A full queue means the consumer is
    /// too slow; it is disconnected instead of stalling everyone else.
    pub fn offer_all(&mut self, frame: &Frame) -> Vec<ClientId> {
        let mut dropped = Vec::new();

        self.clients.retain(|client| match client.offer(frame) {
            Ok(()) => true,
            Err(e @ Error::QueueFull(_)) => {
                warn!("{}, disconnecting", e);
                dropped.push(client.id);
                false
            }
            Err(e) => {
                debug!("{}", e);
                dropped.push(client.id);
                false
            }
        });

        dropped
    }

    pub fn ids(&self) -> Vec<ClientId> {
        self.clients.iter().map(|c| c.id).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_clients
    }
}
