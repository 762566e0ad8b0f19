//! Connection roster and message dispatch for one game session
//!
//! The session is the single writer of [`Game`]. The tick loop feeds it raw
//! bytes per connection; it decodes whole frames, applies them to the game,
//! and queues replies on the affected connections. Any transport or protocol
//! failure on a connection disconnects that client only.

use crate::connection::{Connection, ConnectionId};
use crate::error::ServerError;
use crate::game::Game;
use log::{debug, info, warn};
use shared::{Crop, Message, Pickup, ProtocolError};
use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

pub struct Session {
    game: Game,
    /// Keyed by connection id, which increases with join order
    connections: BTreeMap<ConnectionId, Connection>,
}

impl Session {
    pub fn new(game: Game) -> Self {
        Self {
            game,
            connections: BTreeMap::new(),
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Registers a freshly accepted peer and spawns a player for it.
    pub fn open(
        &mut self,
        id: ConnectionId,
        addr: SocketAddr,
        outgoing: mpsc::UnboundedSender<Vec<u8>>,
        reader: Option<AbortHandle>,
    ) -> u32 {
        let player_id = self.game.spawn_player();
        let mut connection = Connection::new(id, addr, player_id, outgoing);
        if let Some(reader) = reader {
            connection = connection.with_reader(reader);
        }
        info!(
            "Connection {} from {} is now player {} ({} connected)",
            id,
            addr,
            player_id,
            self.connections.len() + 1
        );
        self.connections.insert(id, connection);
        player_id
    }

    /// Drops a connection and its player. Safe to call more than once for
    /// the same connection; only the first call has any effect.
    pub fn close(&mut self, id: ConnectionId, reason: impl fmt::Display) -> bool {
        let Some(mut connection) = self.connections.remove(&id) else {
            debug!("Connection {} already closed ({})", id, reason);
            return false;
        };

        if let Err(e) = connection.flush() {
            debug!("Could not flush connection {} on close: {}", id, e);
        }

        let name = self.player_name(connection.player_id);
        self.game.remove_player(connection.player_id);
        info!(
            "Disconnected {} (connection {}, {}): {}. {} still connected, harvest: {}",
            name,
            id,
            connection.addr,
            reason,
            self.connections.len(),
            self.game.harvest
        );
        true
    }

    /// Appends received bytes and dispatches every complete message.
    pub fn receive(&mut self, id: ConnectionId, bytes: &[u8]) {
        let Some(connection) = self.connections.get_mut(&id) else {
            debug!("Ignoring {} bytes for closed connection {}", bytes.len(), id);
            return;
        };
        connection.recv_buffer.extend_from_slice(bytes);

        if let Err(e) = self.drain_messages(id) {
            warn!("Error handling data from connection {}: {}", id, e);
            self.close(id, e);
        }
    }

    fn drain_messages(&mut self, id: ConnectionId) -> Result<(), ServerError> {
        loop {
            let decoded = match self.connections.get_mut(&id) {
                Some(connection) => Message::decode(&mut connection.recv_buffer)?,
                None => return Ok(()),
            };
            match decoded {
                Some(message) => self.dispatch(id, message)?,
                None => return Ok(()),
            }
        }
    }

    fn dispatch(&mut self, id: ConnectionId, message: Message) -> Result<(), ServerError> {
        let Some(player_id) = self.connections.get(&id).map(|c| c.player_id) else {
            return Ok(());
        };

        match message {
            Message::Controls(controls) => {
                self.game.apply_controls(player_id, &controls);
                Ok(())
            }
            Message::Pickup(code) => self.handle_pickup(player_id, code),
            other => Err(ProtocolError::UnexpectedMessage(other.kind()).into()),
        }
    }

    fn handle_pickup(&mut self, sender: u32, code: u8) -> Result<(), ServerError> {
        let name = self.player_name(sender);

        match Pickup::from(code) {
            Pickup::Crop(crop) => {
                let outcome = self.game.record_harvest(crop);
                info!(
                    "{} picked a {}! Total {}s: {}",
                    name, crop, crop, outcome.total
                );
                if outcome.won_now {
                    info!(
                        "Harvest goal reached ({}), announcing win to {} players",
                        self.game.harvest,
                        self.connections.len()
                    );
                    self.broadcast(&Message::Win)?;
                }
            }
            Pickup::Seed(crop) => {
                let Some(target) = self.game.gift_target(sender) else {
                    debug!("{} picked {} seeds with nobody to gift", name, crop);
                    return Ok(());
                };
                self.game.enqueue_gift(target, crop);
                let delivered = self.deliver_gifts(target)?;
                info!(
                    "{} picked {} seeds! Sent {} {} gift(s) to {}",
                    name,
                    crop,
                    delivered,
                    crop,
                    self.player_name(target)
                );
            }
            Pickup::Unknown(code) => {
                debug!("{} sent unknown pickup code {}", name, code);
            }
        }
        Ok(())
    }

    /// Sends every gift queued for `target` to its connection.
    fn deliver_gifts(&mut self, target: u32) -> Result<usize, ServerError> {
        let Some(connection) = self
            .connections
            .values_mut()
            .find(|c| c.player_id == target)
        else {
            warn!("No connection for gift target {}", target);
            return Ok(0);
        };

        let gifts: Vec<Crop> = self.game.take_gifts(target);
        for crop in &gifts {
            connection.send(&Message::Gift(*crop))?;
        }
        Ok(gifts.len())
    }

    fn broadcast(&mut self, message: &Message) -> Result<(), ServerError> {
        for connection in self.connections.values_mut() {
            connection.send(message)?;
        }
        Ok(())
    }

    /// Advances the game one tick and queues a state snapshot for every player.
    pub fn tick(&mut self, dt: Duration) {
        self.game.update(dt);

        let mut failed = Vec::new();
        for connection in self.connections.values_mut() {
            let snapshot = self.game.snapshot_for(connection.player_id);
            if let Err(e) = connection.send(&Message::State(snapshot)) {
                failed.push((connection.id, e));
            }
        }
        for (id, e) in failed {
            self.close(id, e);
        }
    }

    /// Pushes queued bytes to every writer, disconnecting peers whose writer is gone.
    pub fn flush(&mut self) {
        let failed: Vec<(ConnectionId, ServerError)> = self
            .connections
            .values_mut()
            .filter_map(|c| c.flush().err().map(|e| (c.id, e)))
            .collect();

        for (id, e) in failed {
            self.close(id, e);
        }
    }

    fn player_name(&self, id: u32) -> String {
        self.game
            .player(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("player {}", id))
    }
}
