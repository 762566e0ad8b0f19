//! # Garden Client Library
//!
//! This library provides the windowed client for the cooperative garden game.
//! Each player drives a basket around a shared garden, collecting crops for the
//! common harvest and seed packets that are passed on to the next player.
//!
//! ## Architecture Overview
//!
//! ### Local Movement, Remote Authority
//! The basket is simulated entirely on the client and is never sent to the
//! server. Pickups are detected locally by distance, but only their type is
//! reported. Harvest totals and the win flag shown on screen always come from
//! the latest server snapshot.
//!
//! ### Index-Aligned Garden
//! Garden objects live in parallel sequences (scene handle, type code and a
//! pickup-sent flag) addressed by a stable index. Crops retire their index
//! when picked, seed packets jump to a new spot and can be picked again.
//!
//! ### Frame Loop
//! Once per rendered frame the client:
//! 1. sends a controls report and clears its press counters
//! 2. applies every server message received since the last frame
//! 3. moves the basket and reports any new pickups
//! 4. draws the scene, HUD and banners
//!
//! ## Module Organization
//!
//! - `game`: basket, garden bookkeeping and message reconciliation
//! - `scene`: the scene collaborator trait and the in-memory scene graph
//! - `input`: keyboard sampling into a controls report
//! - `network`: non-blocking connection to the server
//! - `rendering`: 3D view, HUD and win screen
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::ClientGame;
//! use client::network::ServerLink;
//! use client::scene::SceneGraph;
//! use rand::SeedableRng;
//!
//! # fn main() -> Result<(), client::ClientError> {
//! let mut rng = rand::rngs::StdRng::from_entropy();
//! let mut scene = SceneGraph::garden();
//! let mut game = ClientGame::new(&mut scene, &mut rng)?;
//! let mut link = ServerLink::connect("127.0.0.1:15466")?;
//!
//! loop {
//!     link.send(&game.controls_message())?;
//!     let messages = link.poll()?;
//!     game.apply_all(&mut scene, &mut rng, messages)?;
//!     for pickup in game.update(&mut scene, &mut rng, 1.0 / 60.0) {
//!         link.send(&pickup)?;
//!     }
//! }
//! # }
//! ```

pub mod error;
pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
pub mod scene;

pub use error::ClientError;
