use clap::error::ErrorKind;
use clap::Parser;
use client::game::{ClientGame, Mode};
use client::input::InputManager;
use client::network::ServerLink;
use client::rendering::Renderer;
use client::scene::SceneGraph;
use client::ClientError;
use log::{error, info};
use macroquad::input::{is_key_pressed, KeyCode};
use macroquad::time::get_frame_time;
use macroquad::window::{next_frame, Conf};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host name or address
    host: String,

    /// Server port
    port: u16,
}

/// Help and version requests succeed; any other parse failure exits 1.
fn exit_status(e: &clap::Error) -> i32 {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Garden".to_owned(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::try_parse().unwrap_or_else(|e| {
        // clap's message already ends with the usage line.
        let _ = e.print();
        std::process::exit(exit_status(&e));
    });

    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ClientError> {
    let mut scene = SceneGraph::garden();
    let mut rng = StdRng::from_entropy();
    let mut game = ClientGame::new(&mut scene, &mut rng)?;

    let mut link = ServerLink::connect(&format!("{}:{}", args.host, args.port))?;
    let input = InputManager::new();
    let renderer = Renderer::new();
    info!("Controls: A/D to turn, W/S to move, Esc to quit");

    loop {
        if is_key_pressed(KeyCode::Escape) {
            info!("Quitting");
            return Ok(());
        }

        if game.mode() == Mode::Playing {
            input.update(&mut game.controls);
            link.send(&game.controls_message())?;
        }

        let messages = link.poll()?;
        game.apply_all(&mut scene, &mut rng, messages)?;

        for pickup in game.update(&mut scene, &mut rng, get_frame_time()) {
            link.send(&pickup)?;
        }

        renderer.render(&scene, &game);
        next_frame().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_and_port_arguments() {
        let args = Args::try_parse_from(["client", "localhost", "15466"]).unwrap();
        assert_eq!(args.host, "localhost");
        assert_eq!(args.port, 15466);
    }

    #[test]
    fn test_bad_arguments_exit_1() {
        let cases: [&[&str]; 4] = [
            &["client"],
            &["client", "localhost"],
            &["client", "localhost", "15466", "extra"],
            &["client", "localhost", "port"],
        ];
        for argv in cases {
            let err = Args::try_parse_from(argv.iter().copied()).unwrap_err();
            assert_eq!(exit_status(&err), 1, "{:?}", argv);
        }
    }

    #[test]
    fn test_help_is_not_a_failure() {
        let err = Args::try_parse_from(["client", "--help"]).unwrap_err();
        assert_eq!(exit_status(&err), 0);
    }
}
