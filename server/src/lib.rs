//! # Garden Server Library
//!
//! This library provides the authoritative server for the cooperative garden
//! game. It owns the shared harvest counters, decides when the garden has been
//! won, routes seed gifts between players, and broadcasts a state snapshot to
//! every client at a fixed tick rate.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Harvest
//! Clients detect pickups locally and report only the resource type. The
//! server keeps the only trusted counters and is the sole judge of the win
//! condition, which it announces exactly once per session.
//!
//! ### Gift Routing
//! Seed pickups are not counted. Instead the matching crop is gifted to the
//! next player in join order, wrapping around to the first player.
//!
//! ### State Broadcasting
//! Once per tick every connected player receives a snapshot of the roster,
//! the harvest totals and the win flag, independent of how much traffic
//! arrived during that tick.
//!
//! ## Architecture Design
//!
//! ### Single Writer
//! Socket reader and writer tasks only move bytes. Everything that touches
//! game state runs sequentially inside the tick loop, so no locking is needed.
//!
//! ### Fixed-Rate Tick
//! The loop services connection events until the current tick deadline, then
//! advances the deadline by exactly one period, steps the game and broadcasts.
//! Busy or chatty clients cannot delay the broadcast beyond the deadline.
//!
//! ## Module Organization
//!
//! - `game`: roster, harvest counters, win flag and gift queues
//! - `connection`: buffered per-peer endpoint
//! - `session`: message dispatch and connection lifecycle
//! - `network`: TCP tasks, tick clock and the main loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind("0.0.0.0:15466", shared::TICK).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod error;
pub mod game;
pub mod network;
pub mod session;

pub use error::ServerError;
