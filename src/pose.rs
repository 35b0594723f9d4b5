// src/pose.rs - Keypoint frames and the sources that produce them
use serde::Deserialize;
use std::f32::consts::TAU;
use std::time::Instant;

/// PoseNet's 17 body parts, named the way the estimator reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeypointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Keypoint {
    pub part: KeypointName,
    pub score: f32,
    pub position: Position,
}

impl Keypoint {
    pub fn new(part: KeypointName, x: f32, y: f32, score: f32) -> Self {
        Self {
            part,
            score,
            position: Position { x, y },
        }
    }
}

/// One detected person in source-frame pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseFrame {
    pub width: f32,
    pub height: f32,
    pub keypoints: Vec<Keypoint>,
}

impl PoseFrame {
    pub fn new(width: f32, height: f32, keypoints: Vec<Keypoint>) -> Self {
        Self {
            width,
            height,
            keypoints,
        }
    }

    /// First keypoint with this name that clears the score floor.
    pub fn keypoint(&self, part: KeypointName, min_score: f32) -> Option<&Keypoint> {
        self.keypoints
            .iter()
            .find(|kp| kp.part == part && kp.score >= min_score)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SourceStatus {
    #[default]
    Loading,
    Ready,
    Unavailable(String),
}

impl SourceStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, SourceStatus::Loading)
    }
}

/// Anything that hands out the newest detected person once per frame.
pub trait PoseSource {
    /// Most recent detection; `None` while nobody is in view.
    fn latest(&mut self) -> Option<PoseFrame>;

    fn status(&self) -> SourceStatus;
}

/// Scripted stand-in for a webcam + estimator.
///
/// Cycles through: standing with arms down, raising the right wrist to the
/// face long enough to trigger a sip, lowering it again, and briefly
/// stepping out of frame.
pub struct SimulatedPoseSource {
    started: Instant,
    width: f32,
    height: f32,
}

impl SimulatedPoseSource {
    pub const CYCLE_SECS: f32 = 6.0;
    const RAISE_START: f32 = 2.0;
    const RAISE_END: f32 = 3.5;
    const ABSENT_FROM: f32 = 5.5;

    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            width: 640.0,
            height: 480.0,
        }
    }

    /// Frame the simulation would report `t` seconds after start.
    pub fn frame_at(&self, t: f32) -> Option<PoseFrame> {
        let phase = t.rem_euclid(Self::CYCLE_SECS);
        if phase >= Self::ABSENT_FROM {
            return None;
        }

        let (w, h) = (self.width, self.height);
        let bob = (t * TAU * 0.5).sin() * 4.0;
        let nose = (w * 0.5 + (t * 0.7).sin() * 12.0, h * 0.3 + bob);
        let left_shoulder = (w * 0.38, h * 0.5 + bob);
        let right_shoulder = (w * 0.62, h * 0.5 + bob);
        let left_wrist = (w * 0.32, h * 0.8);

        // Right wrist travels up to the nose and back.
        let rest = (w * 0.68, h * 0.8);
        let raise = if (Self::RAISE_START..Self::RAISE_END).contains(&phase) {
            1.0
        } else if (Self::RAISE_START - 0.5..Self::RAISE_START).contains(&phase) {
            (phase - (Self::RAISE_START - 0.5)) / 0.5
        } else if (Self::RAISE_END..Self::RAISE_END + 0.5).contains(&phase) {
            1.0 - (phase - Self::RAISE_END) / 0.5
        } else {
            0.0
        };
        let right_wrist = (
            rest.0 + (nose.0 + 20.0 - rest.0) * raise,
            rest.1 + (nose.1 + 30.0 - rest.1) * raise,
        );

        Some(PoseFrame::new(
            w,
            h,
            vec![
                Keypoint::new(KeypointName::Nose, nose.0, nose.1, 0.95),
                Keypoint::new(KeypointName::LeftShoulder, left_shoulder.0, left_shoulder.1, 0.9),
                Keypoint::new(KeypointName::RightShoulder, right_shoulder.0, right_shoulder.1, 0.9),
                Keypoint::new(KeypointName::LeftWrist, left_wrist.0, left_wrist.1, 0.7),
                Keypoint::new(KeypointName::RightWrist, right_wrist.0, right_wrist.1, 0.7),
            ],
        ))
    }
}

impl Default for SimulatedPoseSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseSource for SimulatedPoseSource {
    fn latest(&mut self) -> Option<PoseFrame> {
        self.frame_at(self.started.elapsed().as_secs_f32())
    }

    fn status(&self) -> SourceStatus {
        SourceStatus::Ready
    }
}

/// Stands in when no estimator could be started; nobody is ever in view.
pub struct OfflinePoseSource {
    reason: String,
}

impl OfflinePoseSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl PoseSource for OfflinePoseSource {
    fn latest(&mut self) -> Option<PoseFrame> {
        None
    }

    fn status(&self) -> SourceStatus {
        SourceStatus::Unavailable(self.reason.clone())
    }
}
