// src/app.rs
use eframe::egui;
use nalgebra::Vector2;
use tracing::{error, info};

use crate::config::Config;
use crate::game::SystemRandom;
use crate::pose::PoseSource;
use crate::pose_bridge::open_source;
use crate::render::{self, SceneView};
use crate::session::GameSession;
use crate::ui::Theme;

pub struct DrinkUpApp {
    config: Config,
    session: GameSession,
    source: Box<dyn PoseSource>,
    rng: SystemRandom,
    theme: Theme,
    // Set once the current session's log has been written.
    exported: bool,
}

fn now_ms(ctx: &egui::Context) -> f64 {
    ctx.input(|i| i.time) * 1000.0
}

fn canvas_of(rect: egui::Rect) -> Vector2<f32> {
    Vector2::new(rect.width(), rect.height())
}

impl DrinkUpApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config) -> Self {
        let now = now_ms(&cc.egui_ctx);
        let canvas = canvas_of(cc.egui_ctx.screen_rect());
        let session = GameSession::new(
            config.tracking.clone(),
            config.rules.clone(),
            canvas,
            now,
        );
        let source = open_source(&config.pose);

        Self {
            config,
            session,
            source,
            rng: SystemRandom::new(),
            theme: Theme::default(),
            exported: false,
        }
    }

    fn restart(&mut self, now: f64) {
        self.export_log();
        self.session.restart(now);
        self.exported = false;
    }

    fn export_log(&mut self) {
        if !self.config.export.enabled || self.exported || self.session.log().is_empty() {
            return;
        }
        let dir = self.config.export.output_directory();
        match self.session.log().export_csv(&dir) {
            Ok(path) => info!("session log written to {}", path.display()),
            Err(e) => error!("failed to export session log: {e:#}"),
        }
        self.exported = true;
    }

    fn render_end_screen(&mut self, ctx: &egui::Context, screen: egui::Rect, now: f64) {
        let state = self.session.state();
        let age = state.game_over_at_ms.map_or(0.0, |at| now - at);
        let drinks = state.drink_count;

        let mut play_again = false;
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                render::draw_blackout(ui.painter(), screen, &self.theme, drinks, age);

                if age >= render::BLACKOUT_FADE_MS {
                    let button_rect = egui::Rect::from_center_size(
                        egui::pos2(screen.center().x, screen.min.y + screen.height() * 0.76),
                        egui::vec2(160.0, 40.0),
                    );
                    play_again = ui
                        .put(button_rect, egui::Button::new("Play again"))
                        .clicked();
                }
            });

        if play_again {
            self.restart(now);
        }
    }

    fn render_game(&mut self, ctx: &egui::Context, screen: egui::Rect, now: f64) {
        let status = self.source.status();
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let view = SceneView {
                    state: self.session.state(),
                    rules: self.session.rules(),
                    puppet: self.session.puppet(),
                    source: &status,
                    now_ms: now,
                };
                render::draw_scene(ui.painter(), screen, &self.theme, &view);
            });
    }
}

impl eframe::App for DrinkUpApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = now_ms(ctx);
        let screen = ctx.screen_rect();

        if ctx.input(|i| i.key_pressed(egui::Key::R)) {
            self.restart(now);
        }

        let frame = self.source.latest();
        self.session
            .tick(frame.as_ref(), canvas_of(screen), now, &mut self.rng);

        if self.session.state().is_game_over() {
            self.export_log();
            self.render_end_screen(ctx, screen, now);
        } else {
            self.render_game(ctx, screen, now);
        }

        // Continuous animation
        ctx.request_repaint();
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.export_log();
    }
}
