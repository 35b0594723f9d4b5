// src/main.rs
use anyhow::anyhow;
use drink_up::app::DrinkUpApp;
use drink_up::config::Config;
use eframe::egui;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "DRINK_UP_CONFIG";
const DEFAULT_CONFIG: &str = "drink_up.toml";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drink_up=info")),
        )
        .init();

    if let Ok(p) = std::env::current_exe() {
        info!("running from {}", p.display());
    }

    log_cameras();

    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG.to_string());
    let config = Config::load_or_default(&config_path);

    let window = &config.window;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("DRINK UP")
            .with_inner_size([window.width, window.height])
            .with_min_inner_size([640.0, 480.0])
            .with_fullscreen(window.fullscreen),
        centered: true,
        ..Default::default()
    };

    eframe::run_native(
        "DRINK UP",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(create_visuals());
            Box::new(DrinkUpApp::new(cc, config))
        }),
    )
    .map_err(|e| anyhow!("error running application: {e}"))
}

/// The estimator opens the webcam itself; this only reports what is there.
fn log_cameras() {
    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(cameras) if cameras.is_empty() => warn!("no cameras found"),
        Ok(cameras) => {
            info!("found {} camera(s)", cameras.len());
            for (i, camera) in cameras.iter().enumerate() {
                info!("  [{}] {}", i, camera.human_name());
            }
        }
        Err(e) => warn!("failed to query cameras: {e}"),
    }
}

fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    visuals.panel_fill = egui::Color32::from_rgb(14, 16, 28);
    visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(45, 45, 52);
    visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(55, 55, 65);
    visuals.widgets.active.bg_fill = egui::Color32::from_rgb(220, 50, 50);

    visuals.widgets.inactive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.hovered.rounding = egui::Rounding::same(8.0);
    visuals.widgets.active.rounding = egui::Rounding::same(8.0);

    visuals
}
