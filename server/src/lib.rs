//! # Pong Server Library
//!
//! Authoritative server for a two-player pong match played over WebSockets.
//! Clients send paddle moves; the server owns the ball, runs the physics at a
//! fixed tick rate and broadcasts every frame to both players.
//!
//! ## Architecture Design
//!
//! ### Single Owner, No Locks
//! All match state lives in one [`hub::Hub`] moved into a single task. The
//! hub merges a fixed-interval ticker with one event channel and handles one
//! event at a time, so the registry, paddles and ball are never touched
//! concurrently.
//!
//! ### Per-Connection Tasks
//! Every socket gets a reader task and a writer task. They only share the
//! client's bounded outbound queue; closing that queue is how the hub
//! disconnects someone.
//!
//! ### Backpressure by Disconnect
//! Broadcasts never wait on a client. A client whose queue is full is
//! removed from the match instead of slowing everyone else down.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Join-ordered registry with two seats; outbound queue ownership.
//!
//! ### Game Module (`game`)
//! Ball physics: integration, wall and paddle bounces, restart after a point.
//!
//! ### Hub Module (`hub`)
//! The match state machine (`EMPTY → WAITING → RUNNING`) and its event loop.
//!
//! ### Network Module (`network`)
//! HTTP routes, WebSocket upgrade, reader/writer tasks.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::hub::{Hub, HubConfig};
//! use server::network;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = Hub::spawn(HubConfig::default());
//!     let app = network::router(hub, Path::new("./static"));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod error;
pub mod game;
pub mod hub;
pub mod network;
