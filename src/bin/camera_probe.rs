// Checks that the configured webcam opens and delivers a frame before the
// pose estimator is pointed at it.
use anyhow::{Context, Result};
use drink_up::config::Config;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path =
        std::env::var("DRINK_UP_CONFIG").unwrap_or_else(|_| "drink_up.toml".to_string());
    let config = Config::load_or_default(&config_path);
    let camera_index = config.pose.camera_index;

    info!("testing camera {camera_index}");
    let index = CameraIndex::Index(camera_index);
    let format = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

    let mut camera = Camera::new(index, format).map_err(|e| {
        warn!("possible causes: camera in use by another app, permissions not granted, or no camera connected");
        anyhow::anyhow!("failed to open camera {camera_index}: {e}")
    })?;
    info!("camera opened: {}", camera.info().human_name());

    camera
        .open_stream()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to open stream")?;
    info!("stream opened");

    let frame = camera
        .frame()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("failed to capture frame")?;
    let resolution = frame.resolution();
    info!(
        "frame captured at {}x{}, camera is ready for the pose estimator",
        resolution.width(),
        resolution.height()
    );

    Ok(())
}
