use clap::error::ErrorKind;
use clap::Parser;
use log::info;
use server::network::Server;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    port: u16,
}

/// Help and version requests succeed; any other parse failure exits 1.
fn exit_status(e: &clap::Error) -> i32 {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::try_parse().unwrap_or_else(|e| {
        // clap's message already ends with the usage line.
        let _ = e.print();
        std::process::exit(exit_status(&e));
    });

    let server = Server::bind(&format!("0.0.0.0:{}", args.port), shared::TICK).await?;
    info!(
        "Tick rate {} Hz, win goal: {}",
        shared::TICK_RATE,
        shared::WIN_GOAL
    );

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
