// src/session.rs - One play session: tracking, gesture detection and drink resolution
use nalgebra::Vector2;
use tracing::info;

use crate::config::TrackingConfig;
use crate::data::SessionLog;
use crate::game::{AttemptOutcome, DrinkMachine, GameRules, GameState, RandomSource, Transition};
use crate::pose::PoseFrame;
use crate::tracking::{GestureDetector, PuppetPose};

/// What happened during one [`GameSession::tick`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub transitions: Vec<Transition>,
    pub attempt: Option<AttemptOutcome>,
}

/// Everything that used to live in process-wide globals, owned in one place.
pub struct GameSession {
    tracking: TrackingConfig,
    canvas: Vector2<f32>,
    puppet: PuppetPose,
    detector: GestureDetector,
    machine: DrinkMachine,
    log: SessionLog,
    started_ms: f64,
}

impl GameSession {
    pub fn new(tracking: TrackingConfig, rules: GameRules, canvas: Vector2<f32>, now_ms: f64) -> Self {
        Self {
            detector: GestureDetector::new(&tracking),
            puppet: PuppetPose::at_rest(canvas),
            machine: DrinkMachine::new(rules),
            log: SessionLog::new(None),
            tracking,
            canvas,
            started_ms: now_ms,
        }
    }

    pub fn puppet(&self) -> &PuppetPose {
        &self.puppet
    }

    pub fn state(&self) -> &GameState {
        self.machine.state()
    }

    pub fn rules(&self) -> &GameRules {
        self.machine.rules()
    }

    pub fn detector(&self) -> &GestureDetector {
        &self.detector
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn canvas(&self) -> Vector2<f32> {
        self.canvas
    }

    pub fn pending_transitions(&self) -> usize {
        self.machine.pending_transitions()
    }

    /// Runs one frame of game logic.
    ///
    /// Due transitions fire first, then the puppet follows `frame` and the
    /// detector decides whether this frame is a sip attempt. With nobody in
    /// view the puppet only drifts home.
    pub fn tick(
        &mut self,
        frame: Option<&PoseFrame>,
        canvas: Vector2<f32>,
        now_ms: f64,
        rng: &mut dyn RandomSource,
    ) -> TickReport {
        self.canvas = canvas;
        let transitions = self.machine.advance(now_ms);

        // Frozen after a blackout.
        if self.machine.state().is_blacked_out() {
            return TickReport {
                transitions,
                attempt: None,
            };
        }

        // Nobody in view: drift home, leave the hold count as it was.
        let Some(frame) = frame else {
            self.puppet.ease_to_rest(canvas, self.tracking.rest_rate);
            return TickReport {
                transitions,
                attempt: None,
            };
        };
        self.puppet.track(frame, canvas, &self.tracking);

        let intoxication = self.machine.state().intoxication;
        if !self.detector.update(&self.puppet, intoxication, now_ms) {
            return TickReport {
                transitions,
                attempt: None,
            };
        }

        let drinks_before = self.machine.state().drink_count;
        let wrist_right_of_head = self.puppet.right_wrist.x > self.puppet.head.x;
        let outcome = self.machine.attempt(now_ms, rng, wrist_right_of_head);
        self.log.record(
            now_ms - self.started_ms,
            drinks_before,
            &outcome,
            self.machine.state(),
        );

        TickReport {
            transitions,
            attempt: Some(outcome),
        }
    }

    /// Fresh game with the puppet back at rest. Pending transitions of the
    /// old game are dropped.
    pub fn restart(&mut self, now_ms: f64) {
        info!(
            "restarting after {} drinks and {} attempts",
            self.machine.state().drink_count,
            self.log.records().len()
        );
        self.machine.reset();
        self.detector.reset();
        self.puppet = PuppetPose::at_rest(self.canvas);
        self.log = SessionLog::new(None);
        self.started_ms = now_ms;
    }
}
