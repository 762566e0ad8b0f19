use crate::game::{ClientGame, Mode};
use crate::scene::SceneGraph;
use macroquad::prelude::*;
use shared::{Crop, StateSnapshot, WIN_GOAL};

const SKY: Color = Color::new(0.53, 0.75, 0.92, 1.0);
const HUD_FONT: f32 = 24.0;

#[derive(Debug, Clone, Default)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Renderer
    }

    pub fn render(&self, scene: &SceneGraph, game: &ClientGame<SceneGraph>) {
        clear_background(SKY);

        match game.mode() {
            Mode::Playing => {
                self.draw_world(scene, game);
                set_default_camera();
                self.draw_hud(game.state());
                if game.gift_banner_visible() {
                    self.draw_banner("You received a gift!");
                }
            }
            Mode::Won => {
                set_default_camera();
                self.draw_win_screen(game.state());
            }
        }
    }

    fn draw_world(&self, scene: &SceneGraph, game: &ClientGame<SceneGraph>) {
        set_camera(&Camera3D {
            position: game.basket.camera_position(),
            target: game.basket.position,
            up: vec3(0.0, 0.0, 1.0),
            ..Default::default()
        });

        for (id, node) in scene.live_nodes() {
            if let Some(position) = scene.world_position(id) {
                draw_cube(position, node.size, None, node.color);
            }
        }
    }

    fn draw_hud(&self, state: Option<&StateSnapshot>) {
        for (i, line) in status_lines(state).iter().enumerate() {
            draw_text(line, 10.0, 30.0 + i as f32 * HUD_FONT, HUD_FONT, WHITE);
        }
    }

    fn draw_banner(&self, text: &str) {
        let size = measure_text(text, None, 40, 1.0);
        let x = (screen_width() - size.width) / 2.0;
        draw_rectangle(x - 16.0, 40.0, size.width + 32.0, 60.0, Color::new(0.0, 0.0, 0.0, 0.6));
        draw_text(text, x, 82.0, 40.0, GOLD);
    }

    fn draw_win_screen(&self, state: Option<&StateSnapshot>) {
        clear_background(DARKGREEN);
        let title = "The garden is complete!";
        let size = measure_text(title, None, 56, 1.0);
        let x = (screen_width() - size.width) / 2.0;
        let y = screen_height() / 2.0;
        draw_text(title, x, y, 56.0, GOLD);

        if let Some(state) = state {
            let totals = state.harvest.to_string();
            let size = measure_text(&totals, None, 28, 1.0);
            draw_text(&totals, (screen_width() - size.width) / 2.0, y + 48.0, 28.0, WHITE);
        }
    }
}

/// HUD text: connection status, roster and harvest progress towards the goal.
fn status_lines(state: Option<&StateSnapshot>) -> Vec<String> {
    let Some(state) = state else {
        return vec!["Waiting for the server...".to_string()];
    };

    let mut lines = vec![format!(
        "Player {} | {} in garden | tick {}",
        state.player_id,
        state.players.len(),
        state.tick
    )];
    for crop in Crop::ALL {
        lines.push(format!(
            "{}: {}/{}",
            crop,
            state.harvest.count(crop),
            WIN_GOAL.count(crop)
        ));
    }
    lines
}
