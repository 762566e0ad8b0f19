//! Connection to the garden server
//!
//! Socket I/O runs on a small private tokio runtime. The frame loop talks to
//! it through unbounded channels, so sending and polling never block.

use crate::error::ClientError;
use log::{debug, info, warn};
use shared::Message;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, error::TryRecvError};

const READ_CHUNK: usize = 4096;

#[derive(Debug)]
enum LinkEvent {
    Data(Vec<u8>),
    Closed(Option<io::Error>),
}

pub struct ServerLink {
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    incoming: mpsc::UnboundedReceiver<LinkEvent>,
    recv_buffer: Vec<u8>,
    // Dropped last so the socket tasks outlive the channels above.
    _runtime: Runtime,
}

impl ServerLink {
    /// Connects to `addr` (`host:port`), blocking until the TCP handshake is done.
    pub fn connect(addr: &str) -> Result<Self, ClientError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("garden-net")
            .enable_all()
            .build()?;

        let stream = runtime.block_on(TcpStream::connect(addr))?;
        stream.set_nodelay(true)?;
        info!("Connected to {} from {}", stream.peer_addr()?, stream.local_addr()?);

        let (read_half, write_half) = stream.into_split();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        runtime.spawn(read_loop(read_half, incoming_tx));
        runtime.spawn(write_loop(write_half, outgoing_rx));

        Ok(Self {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
            recv_buffer: Vec::new(),
            _runtime: runtime,
        })
    }

    pub fn send(&self, message: &Message) -> Result<(), ClientError> {
        let bytes = message.encode()?;
        self.outgoing
            .send(bytes)
            .map_err(|_| ClientError::ConnectionLost)
    }

    /// Returns every complete message received so far without waiting.
    ///
    /// A closed connection is reported as [`ClientError::ConnectionLost`].
    pub fn poll(&mut self) -> Result<Vec<Message>, ClientError> {
        let mut lost = false;
        loop {
            match self.incoming.try_recv() {
                Ok(LinkEvent::Data(bytes)) => self.recv_buffer.extend_from_slice(&bytes),
                Ok(LinkEvent::Closed(error)) => {
                    match error {
                        Some(e) => warn!("Connection to server failed: {}", e),
                        None => info!("Server closed the connection"),
                    }
                    lost = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    lost = true;
                    break;
                }
            }
        }

        if lost {
            return Err(ClientError::ConnectionLost);
        }
        Ok(Message::decode_all(&mut self.recv_buffer)?)
    }
}

async fn read_loop(mut reader: OwnedReadHalf, events: mpsc::UnboundedSender<LinkEvent>) {
    let mut buffer = vec![0u8; READ_CHUNK];
    loop {
        let event = match reader.read(&mut buffer).await {
            Ok(0) => LinkEvent::Closed(None),
            Ok(len) => LinkEvent::Data(buffer[..len].to_vec()),
            Err(e) => LinkEvent::Closed(Some(e)),
        };
        let closing = matches!(event, LinkEvent::Closed(_));
        if events.send(event).is_err() || closing {
            break;
        }
    }
}

async fn write_loop(mut writer: OwnedWriteHalf, mut outgoing: mpsc::UnboundedReceiver<Vec<u8>>) {
    while let Some(bytes) = outgoing.recv().await {
        if let Err(e) = writer.write_all(&bytes).await {
            debug!("Write to server failed: {}", e);
            return;
        }
    }
    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Controls, Crop, StateSnapshot};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::sleep;
    use std::time::{Duration, Instant};
    use tokio_test::{assert_err, assert_ok};

    fn poll_until<F>(link: &mut ServerLink, mut done: F) -> Result<Vec<Message>, ClientError>
    where
        F: FnMut(&[Message]) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut received = Vec::new();
        while Instant::now() < deadline {
            received.extend(link.poll()?);
            if done(&received) {
                break;
            }
            sleep(Duration::from_millis(5));
        }
        Ok(received)
    }

    #[test]
    fn test_link_exchanges_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut link = assert_ok!(ServerLink::connect(&addr.to_string()));
        let (mut server, _) = listener.accept().unwrap();

        assert!(assert_ok!(link.poll()).is_empty());

        let mut frames = Message::Gift(Crop::Beet).encode().unwrap();
        frames.extend(
            Message::State(StateSnapshot {
                tick: 9,
                ..StateSnapshot::default()
            })
            .encode()
            .unwrap(),
        );
        // Split mid-frame to exercise reassembly.
        server.write_all(&frames[..3]).unwrap();
        server.flush().unwrap();
        sleep(Duration::from_millis(20));
        server.write_all(&frames[3..]).unwrap();

        let received = poll_until(&mut link, |m| m.len() >= 2).unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0], Message::Gift(Crop::Beet));
        assert!(matches!(&received[1], Message::State(s) if s.tick == 9));

        let mut controls = Controls::default();
        controls.up.press();
        assert_ok!(link.send(&Message::Controls(controls)));

        let mut bytes = [0u8; 9];
        server
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        server.read_exact(&mut bytes).unwrap();
        let mut buf = bytes.to_vec();
        assert_eq!(
            Message::decode(&mut buf).unwrap(),
            Some(Message::Controls(controls))
        );
    }

    #[test]
    fn test_server_close_is_connection_lost() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut link = assert_ok!(ServerLink::connect(&addr.to_string()));
        let (server, _) = listener.accept().unwrap();
        drop(server);

        let err = assert_err!(poll_until(&mut link, |_| false));
        assert!(matches!(err, ClientError::ConnectionLost));
    }

    #[test]
    fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(matches!(
            ServerLink::connect(&addr.to_string()),
            Err(ClientError::Io(_))
        ));
    }
}
