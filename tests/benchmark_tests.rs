//! Performance benchmarks for the hot paths of a garden session

use client::game::ClientGame;
use client::scene::SceneGraph;
use rand::rngs::StdRng;
use rand::SeedableRng;
use server::game::Game;
use server::session::Session;
use shared::{Controls, Crop, Message, PlayerSummary, StateSnapshot, TICK};
use std::time::Instant;
use tokio::sync::mpsc;

/// Benchmarks framing and parsing of controls reports
#[test]
fn benchmark_controls_codec() {
    let mut controls = Controls::default();
    controls.left.press();
    controls.jump.press();

    let iterations = 100_000;
    let start = Instant::now();

    let mut stream = Vec::with_capacity(iterations * 9);
    for _ in 0..iterations {
        stream.extend(Message::Controls(controls).encode().unwrap());
    }
    let decoded = Message::decode_all(&mut stream).unwrap();

    let duration = start.elapsed();
    println!(
        "Controls codec: {} messages in {:?} ({:.2} ns/msg)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert_eq!(decoded.len(), iterations);
    assert!(stream.is_empty());
    // Should complete in under 2 seconds even in debug builds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks encoding state snapshots for a full roster
#[test]
fn benchmark_state_encoding() {
    let snapshot = StateSnapshot {
        tick: 1,
        player_id: 1,
        players: (1..=32)
            .map(|id| PlayerSummary {
                id,
                name: format!("Player {}", id),
            })
            .collect(),
        ..StateSnapshot::default()
    };

    let iterations = 10_000;
    let start = Instant::now();
    let mut bytes = 0;
    for _ in 0..iterations {
        bytes += Message::State(snapshot.clone()).encode().unwrap().len();
    }
    let duration = start.elapsed();
    println!(
        "State encoding: {} snapshots ({} bytes) in {:?}",
        iterations, bytes, duration
    );

    assert!(duration.as_millis() < 2000);
}

/// Stress tests pickup dispatch and state broadcast across many players
#[test]
fn stress_test_session_ticks() {
    let mut session = Session::new(Game::new());
    let mut receivers = Vec::new();
    for id in 1..=16u64 {
        let (tx, rx) = mpsc::unbounded_channel();
        let addr = format!("10.0.1.{}:5000", id).parse().unwrap();
        session.open(id, addr, tx, None);
        receivers.push(rx);
    }

    let ticks = 300;
    let start = Instant::now();
    for tick in 0..ticks {
        for id in 1..=16u64 {
            let code = if (tick + id) % 4 == 0 {
                Crop::Tomato.seed_code()
            } else {
                Crop::Carrot.code()
            };
            let mut bytes = Message::Controls(Controls::default()).encode().unwrap();
            bytes.extend(Message::Pickup(code).encode().unwrap());
            session.receive(id, &bytes);
        }
        session.tick(TICK);
        session.flush();
        for rx in receivers.iter_mut() {
            while rx.try_recv().is_ok() {}
        }
    }
    let duration = start.elapsed();
    println!(
        "Session: {} ticks for 16 players in {:?} ({:.2} μs/tick)",
        ticks,
        duration,
        duration.as_micros() as f64 / ticks as f64
    );

    assert_eq!(session.game().tick, ticks as u32);
    assert_eq!(session.connection_count(), 16);
    assert!(duration.as_millis() < 3000);
}

/// Benchmarks local pickup detection over a crowded garden
#[test]
fn benchmark_pickup_detection() {
    let mut scene = SceneGraph::garden();
    let mut rng = StdRng::seed_from_u64(11);
    let mut game = ClientGame::new(&mut scene, &mut rng).unwrap();
    for i in 0..500 {
        let crop = Crop::ALL[i % 3];
        game.apply(&mut scene, &mut rng, Message::Gift(crop)).unwrap();
    }

    game.controls.up.press();
    game.controls.left.press();

    let frames = 1_000;
    let start = Instant::now();
    let mut pickups = 0;
    for _ in 0..frames {
        pickups += game.update(&mut scene, &mut rng, 1.0 / 60.0).len();
    }
    let duration = start.elapsed();
    println!(
        "Pickup detection: {} frames over {} objects in {:?} ({} pickups)",
        frames,
        game.garden().len(),
        duration,
        pickups
    );

    assert!(duration.as_millis() < 3000);
}
