//! Headless bot for exercising a running server without a window.
//!
//! Sends a controls report every tick and now and then claims a random
//! pickup, logging everything the server sends back.

use clap::Parser;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Controls, Message, TICK};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless garden bot", long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:15466")]
    server: String,

    /// Number of ticks to run before disconnecting
    #[arg(short = 't', long, default_value = "300")]
    ticks: u32,

    /// Chance per tick of reporting a pickup
    #[arg(short = 'p', long, default_value = "0.05")]
    pickup_chance: f64,

    /// Seed for the pickup generator
    #[arg(long, default_value = "1")]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut stream = TcpStream::connect(&args.server).await?;
    stream.set_nodelay(true)?;
    info!("Bot connected to {} from {}", args.server, stream.local_addr()?);

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut ticker = interval(TICK);
    let mut recv_buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    let mut states = 0u32;
    let mut controls = Controls::default();
    let mut ticks = 0u32;

    while ticks < args.ticks {
        tokio::select! {
            _ = ticker.tick() => {
                ticks += 1;
                if rng.gen_bool(0.1) {
                    controls.up.press();
                } else {
                    controls.up.release();
                }
                let mut frames = Message::Controls(controls).encode()?;
                controls.reset_downs();

                if rng.gen_bool(args.pickup_chance.clamp(0.0, 1.0)) {
                    let code = rng.gen_range(0..6u8);
                    info!("Reporting pickup {}", code);
                    frames.extend(Message::Pickup(code).encode()?);
                }
                stream.write_all(&frames).await?;
            }
            read = stream.read(&mut chunk) => {
                let len = read?;
                if len == 0 {
                    warn!("Server closed the connection");
                    break;
                }
                recv_buffer.extend_from_slice(&chunk[..len]);
                for message in Message::decode_all(&mut recv_buffer)? {
                    match message {
                        Message::State(snapshot) => {
                            states += 1;
                            if states % 30 == 1 {
                                info!(
                                    "State tick {}: {} players, {}",
                                    snapshot.tick,
                                    snapshot.players.len(),
                                    snapshot.harvest
                                );
                            }
                        }
                        Message::Gift(crop) => info!("Received a {} gift", crop),
                        Message::Win => info!("The garden has been won!"),
                        other => warn!("Unexpected message from server: {:?}", other),
                    }
                }
            }
        }
    }

    info!("Bot finished after {} state updates", states);
    Ok(())
}
