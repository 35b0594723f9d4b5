// src/pose_bridge.rs - External pose estimator running as a child process
//
// The estimator owns the webcam and prints one JSON message per line on
// stdout. A background tokio runtime reads those lines and publishes the
// newest frame through a watch channel, so the UI thread only ever sees
// the last value.
use serde::Deserialize;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::config::{PoseConfig, SourceKind};
use crate::pose::{
    Keypoint, OfflinePoseSource, PoseFrame, PoseSource, SimulatedPoseSource, SourceStatus,
};

#[derive(Debug, Error)]
pub enum PoseSourceError {
    #[error("failed to start pose runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to spawn pose estimator `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("pose estimator has no stdout")]
    NoStdout,
    #[error("reading pose estimator output: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed pose message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct DetectedPose {
    keypoints: Vec<Keypoint>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum SidecarMessage {
    Ready,
    Poses {
        width: f32,
        height: f32,
        #[serde(default)]
        poses: Vec<DetectedPose>,
    },
}

#[derive(Debug, Clone, Default)]
struct Shared {
    status: SourceStatus,
    frame: Option<PoseFrame>,
}

fn parse_line(line: &str) -> Result<SidecarMessage, PoseSourceError> {
    Ok(serde_json::from_str(line)?)
}

fn apply_message(shared: &mut Shared, message: SidecarMessage) {
    match message {
        SidecarMessage::Ready => {
            shared.status = SourceStatus::Ready;
        }
        SidecarMessage::Poses {
            width,
            height,
            poses,
        } => {
            // Frames imply the model is up even if `ready` was never sent.
            shared.status = SourceStatus::Ready;
            shared.frame = poses
                .into_iter()
                .next()
                .map(|pose| PoseFrame::new(width, height, pose.keypoints));
        }
    }
}

/// Reads messages until EOF. Bad lines are logged and skipped.
async fn read_messages<R>(reader: R, tx: &watch::Sender<Shared>) -> Result<(), PoseSourceError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(message) => {
                if matches!(message, SidecarMessage::Ready) {
                    info!("pose model ready");
                }
                tx.send_modify(|shared| apply_message(shared, message));
            }
            Err(e) => warn!("skipping pose line: {e}"),
        }
    }
    Ok(())
}

async fn run_reader<R>(
    reader: R,
    child: Option<Child>,
    tx: watch::Sender<Shared>,
    mut shutdown: oneshot::Receiver<()>,
) where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        result = read_messages(reader, &tx) => {
            let reason = match result {
                Ok(()) => "pose estimator exited".to_string(),
                Err(e) => e.to_string(),
            };
            warn!("{reason}");
            tx.send_modify(|shared| {
                shared.status = SourceStatus::Unavailable(reason);
                shared.frame = None;
            });
        }
        _ = &mut shutdown => {
            debug!("pose reader shutting down");
        }
    }

    if let Some(mut child) = child {
        if let Err(e) = child.kill().await {
            debug!("pose estimator already gone: {e}");
        }
    }
}

pub struct SidecarPoseSource {
    shutdown: Option<oneshot::Sender<()>>,
    state: watch::Receiver<Shared>,
    _runtime: tokio::runtime::Runtime,
}

impl SidecarPoseSource {
    fn runtime() -> Result<tokio::runtime::Runtime, PoseSourceError> {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("pose-sidecar")
            .enable_all()
            .build()
            .map_err(PoseSourceError::Runtime)
    }

    /// Launches the configured estimator and starts reading its output.
    pub fn spawn(config: &PoseConfig) -> Result<Self, PoseSourceError> {
        let runtime = Self::runtime()?;
        let args = config.sidecar_args();
        info!("starting pose estimator: {} {}", config.command, args.join(" "));

        let mut child = {
            let _guard = runtime.enter();
            Command::new(&config.command)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .kill_on_drop(true)
                .spawn()
                .map_err(|source| PoseSourceError::Spawn {
                    command: config.command.clone(),
                    source,
                })?
        };
        let stdout = child.stdout.take().ok_or(PoseSourceError::NoStdout)?;

        Ok(Self::start(runtime, BufReader::new(stdout), Some(child)))
    }

    /// Reads sidecar messages from an arbitrary stream instead of a process.
    pub fn from_reader<R>(reader: R) -> Result<Self, PoseSourceError>
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
    {
        let runtime = Self::runtime()?;
        Ok(Self::start(runtime, BufReader::new(reader), None))
    }

    fn start<R>(runtime: tokio::runtime::Runtime, reader: R, child: Option<Child>) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, rx) = watch::channel(Shared::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        runtime.spawn(run_reader(reader, child, tx, shutdown_rx));

        Self {
            shutdown: Some(shutdown_tx),
            state: rx,
            _runtime: runtime,
        }
    }
}

impl PoseSource for SidecarPoseSource {
    fn latest(&mut self) -> Option<PoseFrame> {
        self.state.borrow().frame.clone()
    }

    fn status(&self) -> SourceStatus {
        self.state.borrow().status.clone()
    }
}

impl Drop for SidecarPoseSource {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Builds the configured source. A sidecar that fails to start leaves the
/// game running with nobody in view.
pub fn open_source(config: &PoseConfig) -> Box<dyn PoseSource> {
    match config.source {
        SourceKind::Simulated => {
            info!("using simulated pose source");
            Box::new(SimulatedPoseSource::new())
        }
        SourceKind::Sidecar => match SidecarPoseSource::spawn(config) {
            Ok(source) => Box::new(source),
            Err(e) => {
                error!("{e}");
                Box::new(OfflinePoseSource::new(e.to_string()))
            }
        },
    }
}
