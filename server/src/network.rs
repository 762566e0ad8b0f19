//! Server network layer: TCP plumbing and the fixed-rate tick loop

use crate::connection::ConnectionId;
use crate::error::ServerError;
use crate::game::Game;
use crate::session::Session;
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, timeout_at, Instant};

const READ_CHUNK: usize = 4096;

/// Events sent from socket tasks to the tick loop
#[derive(Debug)]
pub enum NetworkEvent {
    Accepted {
        stream: TcpStream,
        addr: SocketAddr,
    },
    Data {
        id: ConnectionId,
        bytes: Vec<u8>,
    },
    Closed {
        id: ConnectionId,
        error: Option<std::io::Error>,
    },
}

/// Fixed-increment tick deadlines.
///
/// The next deadline is always the previous one plus `period`, never
/// "now + period", so time spent processing a tick does not accumulate as drift.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    next_deadline: Instant,
    period: Duration,
}

impl TickClock {
    pub fn start(now: Instant, period: Duration) -> Self {
        Self {
            next_deadline: now + period,
            period,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.next_deadline
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next_deadline.saturating_duration_since(now)
    }

    pub fn advance(&mut self) {
        self.next_deadline += self.period;
    }
}

/// Drives a [`Session`]: services connection events until each tick
/// deadline, then advances the game and broadcasts state.
pub struct TickLoop {
    session: Session,
    events_rx: mpsc::UnboundedReceiver<NetworkEvent>,
    events_tx: mpsc::UnboundedSender<NetworkEvent>,
    clock: TickClock,
    next_connection_id: ConnectionId,
    ticks: u64,
}

impl TickLoop {
    pub fn new(session: Session, period: Duration) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session,
            events_rx,
            events_tx,
            clock: TickClock::start(Instant::now(), period),
            next_connection_id: 1,
            ticks: 0,
        }
    }

    /// Sender for socket tasks to report into this loop.
    pub fn events(&self) -> mpsc::UnboundedSender<NetworkEvent> {
        self.events_tx.clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Restarts tick pacing from the current instant.
    pub fn restart_clock(&mut self) {
        self.clock = TickClock::start(Instant::now(), self.clock.period());
    }

    /// Runs one full tick period.
    pub async fn step(&mut self) {
        self.service_until_deadline().await;
        self.clock.advance();

        self.session.tick(self.clock.period());
        self.session.flush();
        self.ticks += 1;

        if self.ticks % 300 == 0 {
            debug!(
                "Tick {}: {} connections, harvest: {}",
                self.ticks,
                self.session.connection_count(),
                self.session.game().harvest
            );
        }
    }

    /// Handles connection events until the tick deadline. A deadline that has
    /// already passed still drains whatever is ready without waiting.
    async fn service_until_deadline(&mut self) {
        let deadline = self.clock.deadline();
        loop {
            match timeout_at(deadline, self.events_rx.recv()).await {
                Ok(Some(event)) => {
                    self.handle_event(event);
                    self.session.flush();
                }
                Ok(None) => {
                    sleep_until(deadline).await;
                    return;
                }
                Err(_) => return,
            }

            if self.clock.remaining(Instant::now()).is_zero() {
                return;
            }
        }
    }

    fn handle_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Accepted { stream, addr } => self.open_stream(stream, addr),
            NetworkEvent::Data { id, bytes } => self.session.receive(id, &bytes),
            NetworkEvent::Closed { id, error: None } => {
                self.session.close(id, "connection closed by peer");
            }
            NetworkEvent::Closed {
                id,
                error: Some(e),
            } => {
                self.session.close(id, e);
            }
        }
    }

    fn open_stream(&mut self, stream: TcpStream, addr: SocketAddr) {
        let id = self.next_connection_id;
        self.next_connection_id += 1;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Could not disable Nagle for {}: {}", addr, e);
        }
        let (read_half, write_half) = stream.into_split();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

        tokio::spawn(write_loop(id, write_half, outgoing_rx));
        let reader = tokio::spawn(read_loop(id, read_half, self.events_tx.clone()));

        self.session
            .open(id, addr, outgoing_tx, Some(reader.abort_handle()));
    }
}

async fn read_loop(
    id: ConnectionId,
    mut reader: OwnedReadHalf,
    events: mpsc::UnboundedSender<NetworkEvent>,
) {
    let mut buffer = vec![0u8; READ_CHUNK];
    loop {
        let event = match reader.read(&mut buffer).await {
            Ok(0) => NetworkEvent::Closed { id, error: None },
            Ok(len) => NetworkEvent::Data {
                id,
                bytes: buffer[..len].to_vec(),
            },
            Err(e) => NetworkEvent::Closed { id, error: Some(e) },
        };
        let closing = matches!(event, NetworkEvent::Closed { .. });
        if events.send(event).is_err() || closing {
            break;
        }
    }
}

async fn write_loop(
    id: ConnectionId,
    mut writer: OwnedWriteHalf,
    mut outgoing: mpsc::UnboundedReceiver<Vec<u8>>,
) {
    while let Some(bytes) = outgoing.recv().await {
        if let Err(e) = writer.write_all(&bytes).await {
            debug!("Write to connection {} failed: {}", id, e);
            return;
        }
    }
    let _ = writer.shutdown().await;
}

async fn accept_loop(listener: TcpListener, events: mpsc::UnboundedSender<NetworkEvent>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                if events.send(NetworkEvent::Accepted { stream, addr }).is_err() {
                    break;
                }
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

/// Authoritative game server bound to a TCP port
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    tick_loop: TickLoop,
}

impl Server {
    pub async fn bind(addr: &str, tick: Duration) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        Ok(Server {
            listener,
            local_addr,
            tick_loop: TickLoop::new(Session::new(Game::new()), tick),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts clients and runs the tick loop until the process exits.
    pub async fn run(self) -> Result<(), ServerError> {
        let Server {
            listener,
            mut tick_loop,
            ..
        } = self;

        tokio::spawn(accept_loop(listener, tick_loop.events()));
        tick_loop.restart_clock();
        info!(
            "Server started, ticking every {:?}",
            tick_loop.clock().period()
        );

        loop {
            tick_loop.step().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Message;

    // Whole milliseconds, so paused-clock timers land exactly on deadlines.
    const PERIOD: Duration = Duration::from_millis(20);

    fn assert_near(actual: Instant, expected: Instant) {
        assert!(actual >= expected, "woke before the deadline");
        assert!(actual - expected < Duration::from_millis(1), "woke late");
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> Vec<Message> {
        let mut buf = Vec::new();
        while let Ok(bytes) = rx.try_recv() {
            buf.extend(bytes);
        }
        Message::decode_all(&mut buf).unwrap()
    }

    #[test]
    fn test_clock_advances_by_fixed_increments() {
        let start = Instant::now();
        let period = Duration::from_millis(20);
        let mut clock = TickClock::start(start, period);
        assert_eq!(clock.deadline(), start + period);

        for n in 2..10u32 {
            clock.advance();
            assert_eq!(clock.deadline(), start + period * n);
        }
    }

    #[test]
    fn test_clock_remaining() {
        let start = Instant::now();
        let clock = TickClock::start(start, Duration::from_millis(20));
        assert_eq!(clock.remaining(start), Duration::from_millis(20));
        assert_eq!(
            clock.remaining(start + Duration::from_millis(5)),
            Duration::from_millis(15)
        );
        assert!(clock.remaining(start + Duration::from_millis(25)).is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_state_broadcast_per_tick() {
        let start = Instant::now();
        let mut tick_loop = TickLoop::new(Session::new(Game::new()), PERIOD);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let addr = "127.0.0.1:9000".parse().unwrap();
        tick_loop.session_mut().open(1, addr, tx, None);

        for n in 1..=5u32 {
            tick_loop.step().await;
            assert_near(Instant::now(), start + PERIOD * n);

            let messages = drain(&mut rx);
            assert_eq!(messages.len(), 1);
            assert!(matches!(&messages[0], Message::State(s) if s.tick == n));
        }
        assert_eq!(tick_loop.ticks(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_processing_time_does_not_drift() {
        let start = Instant::now();
        let mut tick_loop = TickLoop::new(Session::new(Game::new()), PERIOD);

        for n in 1..=4u32 {
            tick_loop.step().await;
            // Simulate a slow tick body.
            tokio::time::advance(Duration::from_millis(7)).await;
            assert_eq!(tick_loop.clock().deadline(), start + PERIOD * (n + 1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overdue_deadline_does_not_block() {
        let start = Instant::now();
        let mut tick_loop = TickLoop::new(Session::new(Game::new()), PERIOD);

        tokio::time::advance(PERIOD * 3).await;
        tick_loop.step().await;
        tick_loop.step().await;
        tick_loop.step().await;

        assert_eq!(Instant::now(), start + PERIOD * 3);
        assert_eq!(tick_loop.clock().deadline(), start + PERIOD * 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_are_serviced_within_tick() {
        let mut tick_loop = TickLoop::new(Session::new(Game::new()), PERIOD);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let addr = "127.0.0.1:9000".parse().unwrap();
        tick_loop.session_mut().open(1, addr, tx, None);

        let events = tick_loop.events();
        for _ in 0..3 {
            events
                .send(NetworkEvent::Data {
                    id: 1,
                    bytes: Message::Pickup(0).encode().unwrap(),
                })
                .unwrap();
        }
        events.send(NetworkEvent::Closed { id: 42, error: None }).unwrap();

        tick_loop.step().await;
        assert_eq!(tick_loop.session().game().harvest.carrots, 3);

        let messages = drain(&mut rx);
        assert!(matches!(&messages[..], [Message::State(s)] if s.harvest.carrots == 3));

        events.send(NetworkEvent::Closed { id: 1, error: None }).unwrap();
        tick_loop.step().await;
        assert_eq!(tick_loop.session().connection_count(), 0);
    }
}
