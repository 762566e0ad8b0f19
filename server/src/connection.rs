//! Buffered endpoint for one TCP peer
//!
//! The socket itself lives in reader/writer tasks owned by the network layer.
//! The tick loop only sees this struct: received bytes pile up in
//! `recv_buffer` until whole frames can be decoded, and outgoing frames are
//! queued in `send_buffer` until the next `flush`.

use crate::error::ServerError;
use log::warn;
use shared::Message;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

pub type ConnectionId = u64;

#[derive(Debug)]
pub struct Connection {
    pub id: ConnectionId,
    pub addr: SocketAddr,
    /// Player controlled through this connection. Owned by the game roster.
    pub player_id: u32,
    pub recv_buffer: Vec<u8>,
    send_buffer: Vec<u8>,
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    reader: Option<AbortHandle>,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        addr: SocketAddr,
        player_id: u32,
        outgoing: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Self {
        Self {
            id,
            addr,
            player_id,
            recv_buffer: Vec::new(),
            send_buffer: Vec::new(),
            outgoing,
            reader: None,
        }
    }

    /// Ties the socket reader task to this connection so dropping the
    /// connection also stops reading from the peer.
    pub fn with_reader(mut self, reader: AbortHandle) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Queues a message. Nothing reaches the socket until `flush`.
    pub fn send(&mut self, message: &Message) -> Result<(), ServerError> {
        let frame = message.encode()?;
        self.send_buffer.extend_from_slice(&frame);
        Ok(())
    }

    pub fn pending_bytes(&self) -> usize {
        self.send_buffer.len()
    }

    /// Hands queued bytes to the writer task.
    pub fn flush(&mut self) -> Result<(), ServerError> {
        if self.send_buffer.is_empty() {
            return Ok(());
        }
        let bytes = std::mem::take(&mut self.send_buffer);
        self.outgoing
            .send(bytes)
            .map_err(|_| ServerError::WriterClosed(self.id))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if !self.send_buffer.is_empty() {
            warn!(
                "Dropping {} unsent bytes for connection {} ({})",
                self.send_buffer.len(),
                self.id,
                self.addr
            );
        }
    }
}
