// src/tracking.rs - Puppet joint smoothing and sip gesture detection
use nalgebra::{Point2, Vector2};
use tracing::debug;

use crate::config::TrackingConfig;
use crate::pose::{KeypointName, PoseFrame};

pub type Point = Point2<f32>;

/// The five joints the puppet is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Head,
    LeftShoulder,
    RightShoulder,
    LeftWrist,
    RightWrist,
}

impl Joint {
    pub const ALL: [Joint; 5] = [
        Joint::Head,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftWrist,
        Joint::RightWrist,
    ];

    /// Keypoint driving this joint.
    pub fn keypoint(self) -> KeypointName {
        match self {
            Joint::Head => KeypointName::Nose,
            Joint::LeftShoulder => KeypointName::LeftShoulder,
            Joint::RightShoulder => KeypointName::RightShoulder,
            Joint::LeftWrist => KeypointName::LeftWrist,
            Joint::RightWrist => KeypointName::RightWrist,
        }
    }

    /// Offset from the canvas centre in the rest pose.
    pub fn rest_offset(self) -> Vector2<f32> {
        match self {
            Joint::Head => Vector2::new(0.0, -180.0),
            Joint::LeftShoulder => Vector2::new(-90.0, -60.0),
            Joint::RightShoulder => Vector2::new(90.0, -60.0),
            Joint::LeftWrist => Vector2::new(-140.0, 60.0),
            Joint::RightWrist => Vector2::new(140.0, 60.0),
        }
    }

    fn is_wrist(self) -> bool {
        matches!(self, Joint::LeftWrist | Joint::RightWrist)
    }
}

/// Smoothed canvas-space joints the puppet is drawn from.
#[derive(Debug, Clone, PartialEq)]
pub struct PuppetPose {
    pub head: Point,
    pub left_shoulder: Point,
    pub right_shoulder: Point,
    pub left_wrist: Point,
    pub right_wrist: Point,
}

fn rest_point(joint: Joint, canvas: Vector2<f32>) -> Point {
    Point::new(canvas.x * 0.5, canvas.y * 0.5) + joint.rest_offset()
}

fn ease(point: &mut Point, target: Point, amount: f32) {
    *point += (target - *point) * amount;
}

fn map_range(value: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    out_lo + (value - in_lo) / (in_hi - in_lo) * (out_hi - out_lo)
}

impl PuppetPose {
    pub fn at_rest(canvas: Vector2<f32>) -> Self {
        Self {
            head: rest_point(Joint::Head, canvas),
            left_shoulder: rest_point(Joint::LeftShoulder, canvas),
            right_shoulder: rest_point(Joint::RightShoulder, canvas),
            left_wrist: rest_point(Joint::LeftWrist, canvas),
            right_wrist: rest_point(Joint::RightWrist, canvas),
        }
    }

    fn joint_mut(&mut self, joint: Joint) -> &mut Point {
        match joint {
            Joint::Head => &mut self.head,
            Joint::LeftShoulder => &mut self.left_shoulder,
            Joint::RightShoulder => &mut self.right_shoulder,
            Joint::LeftWrist => &mut self.left_wrist,
            Joint::RightWrist => &mut self.right_wrist,
        }
    }

    /// Eases every joint toward its detected keypoint.
    ///
    /// Keypoints below their score floor are skipped for this frame, so
    /// the joint simply holds its previous position.
    pub fn track(&mut self, frame: &PoseFrame, canvas: Vector2<f32>, config: &TrackingConfig) {
        if frame.width <= 0.0 || frame.height <= 0.0 {
            debug!("ignoring pose frame with empty source size");
            return;
        }

        let mx = canvas.x * config.margin_x;
        let my = canvas.y * config.margin_y;

        for joint in Joint::ALL {
            let floor = if joint.is_wrist() {
                config.wrist_min_score
            } else {
                config.min_score
            };
            if let Some(kp) = frame.keypoint(joint.keypoint(), floor) {
                let target = Point::new(
                    map_range(kp.position.x, 0.0, frame.width, mx, canvas.x - mx),
                    map_range(kp.position.y, 0.0, frame.height, my, canvas.y - my),
                );
                ease(self.joint_mut(joint), target, config.follow_rate);
            }
        }
    }

    /// Drifts back toward the rest pose while nobody is detected.
    pub fn ease_to_rest(&mut self, canvas: Vector2<f32>, rate: f32) {
        for joint in Joint::ALL {
            ease(self.joint_mut(joint), rest_point(joint, canvas), rate);
        }
    }

    pub fn shoulder_mid(&self) -> Point {
        nalgebra::center(&self.left_shoulder, &self.right_shoulder)
    }

    pub fn shoulder_width(&self) -> f32 {
        nalgebra::distance(&self.left_shoulder, &self.right_shoulder)
    }

    /// Distance between the cup hand and the face.
    pub fn sip_distance(&self) -> f32 {
        nalgebra::distance(&self.right_wrist, &self.head)
    }
}

/// Turns "wrist held at the face" into discrete attempt events.
///
/// The wrist has to stay inside the sip zone for `hold_frames` consecutive
/// ticks, and triggers are spaced by at least `cooldown_ms`.
#[derive(Debug, Clone)]
pub struct GestureDetector {
    hold_frames: u32,
    cooldown_ms: f64,
    zone_base: f32,
    zone_growth: f32,
    near_count: u32,
    last_trigger_ms: Option<f64>,
}

impl GestureDetector {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            hold_frames: config.hold_frames,
            cooldown_ms: config.cooldown_ms,
            zone_base: config.sip_zone_base,
            zone_growth: config.sip_zone_growth,
            near_count: 0,
            last_trigger_ms: None,
        }
    }

    /// Zone radius grows as the puppet gets drunk.
    pub fn sip_zone(&self, intoxication: f32) -> f32 {
        self.zone_base + self.zone_growth * intoxication
    }

    pub fn near_count(&self) -> u32 {
        self.near_count
    }

    /// Returns true on the tick an attempt fires.
    pub fn update(&mut self, pose: &PuppetPose, intoxication: f32, now_ms: f64) -> bool {
        if pose.sip_distance() < self.sip_zone(intoxication) {
            self.near_count += 1;
        } else {
            self.near_count = 0;
        }

        let cooled_down = self
            .last_trigger_ms
            .map_or(true, |last| now_ms - last > self.cooldown_ms);

        if self.near_count >= self.hold_frames && cooled_down {
            debug!(
                "sip gesture held for {} frames at {:.0}ms",
                self.near_count, now_ms
            );
            self.last_trigger_ms = Some(now_ms);
            self.near_count = 0;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.near_count = 0;
        self.last_trigger_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Keypoint;

    fn canvas() -> Vector2<f32> {
        Vector2::new(1000.0, 800.0)
    }

    fn frame(keypoints: Vec<Keypoint>) -> PoseFrame {
        PoseFrame::new(100.0, 100.0, keypoints)
    }

    #[test]
    fn test_rest_pose_is_centered() {
        let pose = PuppetPose::at_rest(canvas());
        assert_eq!(pose.head, Point::new(500.0, 220.0));
        assert_eq!(pose.left_shoulder, Point::new(410.0, 340.0));
        assert_eq!(pose.right_wrist, Point::new(640.0, 460.0));
        assert_eq!(pose.shoulder_width(), 180.0);
        assert_eq!(pose.shoulder_mid(), Point::new(500.0, 340.0));
    }

    #[test]
    fn test_track_maps_into_margins_and_eases() {
        let config = TrackingConfig::default();
        let mut pose = PuppetPose::at_rest(canvas());
        // Source (0, 0) maps to the top-left margin corner (150, 80).
        let f = frame(vec![Keypoint::new(KeypointName::Nose, 0.0, 0.0, 0.9)]);
        pose.track(&f, canvas(), &config);

        let expected_x = 500.0 + (150.0 - 500.0) * 0.18;
        let expected_y = 220.0 + (80.0 - 220.0) * 0.18;
        assert!((pose.head.x - expected_x).abs() < 1e-3);
        assert!((pose.head.y - expected_y).abs() < 1e-3);
        // Untracked joints stay put.
        assert_eq!(pose.left_shoulder, Point::new(410.0, 340.0));
    }

    #[test]
    fn test_low_score_keypoints_are_ignored() {
        let config = TrackingConfig::default();
        let mut pose = PuppetPose::at_rest(canvas());
        let before = pose.clone();
        let f = frame(vec![
            Keypoint::new(KeypointName::Nose, 50.0, 50.0, 0.12),
            Keypoint::new(KeypointName::LeftShoulder, 50.0, 50.0, 0.14),
        ]);
        pose.track(&f, canvas(), &config);
        assert_eq!(pose, before);

        // Wrists have a lower floor.
        let f = frame(vec![Keypoint::new(KeypointName::RightWrist, 50.0, 50.0, 0.12)]);
        pose.track(&f, canvas(), &config);
        assert_ne!(pose.right_wrist, before.right_wrist);
    }

    #[test]
    fn test_empty_source_size_is_ignored() {
        let config = TrackingConfig::default();
        let mut pose = PuppetPose::at_rest(canvas());
        let before = pose.clone();
        let f = PoseFrame::new(0.0, 0.0, vec![Keypoint::new(KeypointName::Nose, 1.0, 1.0, 1.0)]);
        pose.track(&f, canvas(), &config);
        assert_eq!(pose, before);
    }

    #[test]
    fn test_ease_to_rest_converges() {
        let mut pose = PuppetPose::at_rest(canvas());
        pose.head = Point::new(0.0, 0.0);
        for _ in 0..400 {
            pose.ease_to_rest(canvas(), 0.04);
        }
        assert!(nalgebra::distance(&pose.head, &Point::new(500.0, 220.0)) < 0.1);
    }

    fn pose_with_wrist_at(distance: f32) -> PuppetPose {
        let mut pose = PuppetPose::at_rest(canvas());
        pose.right_wrist = pose.head + Vector2::new(distance, 0.0);
        pose
    }

    #[test]
    fn test_sip_zone_grows_with_intoxication() {
        let detector = GestureDetector::new(&TrackingConfig::default());
        assert_eq!(detector.sip_zone(0.0), 110.0);
        assert_eq!(detector.sip_zone(1.0), 150.0);
    }

    #[test]
    fn test_fires_after_hold_frames() {
        let mut detector = GestureDetector::new(&TrackingConfig::default());
        let near = pose_with_wrist_at(50.0);
        for frame in 0..7 {
            assert!(!detector.update(&near, 0.0, frame as f64 * 16.0));
        }
        assert!(detector.update(&near, 0.0, 7.0 * 16.0));
        assert_eq!(detector.near_count(), 0);
    }

    #[test]
    fn test_leaving_zone_resets_counter() {
        let mut detector = GestureDetector::new(&TrackingConfig::default());
        let near = pose_with_wrist_at(50.0);
        let far = pose_with_wrist_at(300.0);
        for _ in 0..5 {
            detector.update(&near, 0.0, 0.0);
        }
        assert_eq!(detector.near_count(), 5);
        detector.update(&far, 0.0, 0.0);
        assert_eq!(detector.near_count(), 0);
    }

    #[test]
    fn test_drunk_zone_catches_farther_wrist() {
        let mut detector = GestureDetector::new(&TrackingConfig::default());
        let pose = pose_with_wrist_at(130.0);
        detector.update(&pose, 0.0, 0.0);
        assert_eq!(detector.near_count(), 0);
        detector.update(&pose, 1.0, 0.0);
        assert_eq!(detector.near_count(), 1);
    }

    #[test]
    fn test_cooldown_blocks_second_trigger() {
        let mut detector = GestureDetector::new(&TrackingConfig::default());
        let near = pose_with_wrist_at(10.0);
        let mut fired_at = Vec::new();
        let mut t = 0.0;
        while t < 5000.0 {
            if detector.update(&near, 0.0, t) {
                fired_at.push(t);
            }
            t += 100.0;
        }
        assert_eq!(fired_at.len(), 3);
        assert!(fired_at.windows(2).all(|w| w[1] - w[0] > 2000.0));
    }
}
