// Runs the configured pose source without the game and logs what arrives.
use anyhow::Result;
use drink_up::config::Config;
use drink_up::pose::{KeypointName, SourceStatus};
use drink_up::pose_bridge::open_source;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const RUN_FOR: Duration = Duration::from_secs(15);
const POLL: Duration = Duration::from_millis(200);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drink_up=debug,info")),
        )
        .init();

    let config_path =
        std::env::var("DRINK_UP_CONFIG").unwrap_or_else(|_| "drink_up.toml".to_string());
    let config = Config::load_or_default(&config_path);
    let mut source = open_source(&config.pose);

    let started = Instant::now();
    let mut last_status = None;
    let mut frames = 0usize;
    while started.elapsed() < RUN_FOR {
        let status = source.status();
        if last_status.as_ref() != Some(&status) {
            info!("source status: {status:?}");
            last_status = Some(status.clone());
        }
        if let SourceStatus::Unavailable(reason) = &status {
            warn!("giving up: {reason}");
            break;
        }

        match source.latest() {
            Some(frame) => {
                frames += 1;
                let floor = config.tracking.min_score;
                let nose = frame.keypoint(KeypointName::Nose, floor);
                let wrist = frame.keypoint(KeypointName::RightWrist, config.tracking.wrist_min_score);
                info!(
                    "{}x{} frame, {} keypoints, nose {:?}, right wrist {:?}",
                    frame.width,
                    frame.height,
                    frame.keypoints.len(),
                    nose.map(|kp| (kp.position.x, kp.position.y)),
                    wrist.map(|kp| (kp.position.x, kp.position.y)),
                );
            }
            None => info!("nobody in view"),
        }
        std::thread::sleep(POLL);
    }

    info!("saw {frames} frames in {:.1}s", started.elapsed().as_secs_f32());
    Ok(())
}
