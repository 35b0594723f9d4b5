use drink_up::config::TrackingConfig;
use drink_up::game::{AttemptOutcome, GameRules, Phase, Reaction, ScriptedRandom, Transition};
use drink_up::pose::{Keypoint, KeypointName, PoseFrame, SimulatedPoseSource};
use drink_up::session::GameSession;
use drink_up::tracking::PuppetPose;
use nalgebra::Vector2;

const FRAME_MS: f64 = 16.0;

fn canvas() -> Vector2<f32> {
    Vector2::new(1000.0, 800.0)
}

fn session() -> GameSession {
    GameSession::new(TrackingConfig::default(), GameRules::default(), canvas(), 0.0)
}

/// Person facing the camera with the right wrist at `wrist_y` (0..100).
fn person(wrist_y: f32) -> PoseFrame {
    PoseFrame::new(
        100.0,
        100.0,
        vec![
            Keypoint::new(KeypointName::Nose, 50.0, 20.0, 0.9),
            Keypoint::new(KeypointName::LeftShoulder, 40.0, 40.0, 0.9),
            Keypoint::new(KeypointName::RightShoulder, 60.0, 40.0, 0.9),
            Keypoint::new(KeypointName::LeftWrist, 35.0, 90.0, 0.6),
            Keypoint::new(KeypointName::RightWrist, 52.0, wrist_y, 0.6),
        ],
    )
}

fn sipping() -> PoseFrame {
    person(25.0)
}

fn arms_down() -> PoseFrame {
    person(90.0)
}

struct Clock {
    now: f64,
}

impl Clock {
    fn step(&mut self) -> f64 {
        self.now += FRAME_MS;
        self.now
    }
}

/// Ticks with `frame` until the detector fires; returns the outcome and its time.
fn sip_until_attempt(
    s: &mut GameSession,
    clock: &mut Clock,
    rng: &mut ScriptedRandom,
) -> (AttemptOutcome, f64) {
    let frame = sipping();
    for _ in 0..1000 {
        let now = clock.step();
        if let Some(outcome) = s.tick(Some(&frame), canvas(), now, rng).attempt {
            return (outcome, now);
        }
    }
    panic!("sip gesture never fired");
}

/// Ticks with `frame` until `until_ms`, collecting fired transitions.
fn run_until(
    s: &mut GameSession,
    clock: &mut Clock,
    frame: Option<&PoseFrame>,
    until_ms: f64,
    rng: &mut ScriptedRandom,
) -> Vec<Transition> {
    let mut fired = Vec::new();
    while clock.now < until_ms {
        let now = clock.step();
        fired.extend(s.tick(frame, canvas(), now, rng).transitions);
    }
    fired
}

#[test]
fn test_first_sip_is_accepted_and_turn_passes() {
    let mut s = session();
    let mut clock = Clock { now: 0.0 };
    let mut rng = ScriptedRandom::new([0.9]);

    let (outcome, t0) = sip_until_attempt(&mut s, &mut clock, &mut rng);
    assert_eq!(outcome, AttemptOutcome::Accepted { drink_count: 1 });
    assert!((s.state().intoxication - 0.16).abs() < 1e-6);
    assert_eq!(s.state().phase, Phase::Closing);

    let down = arms_down();
    let fired = run_until(&mut s, &mut clock, Some(&down), t0 + 2200.0, &mut rng);
    assert_eq!(fired, vec![Transition::EndTurn]);
    assert_eq!(s.state().phase, Phase::TurnOver);
    assert_eq!(s.state().reaction, Reaction::TurnOver);

    let fired = run_until(&mut s, &mut clock, Some(&down), t0 + 4500.0, &mut rng);
    assert_eq!(fired, vec![Transition::FinishTurnOver]);
    assert_eq!(s.state().phase, Phase::Open);
    assert_eq!(s.state().turn_attempts, 0);
    assert_eq!(s.state().drink_count, 1);
}

#[test]
fn test_attempts_during_closing_and_turnover_are_rejected() {
    let mut s = session();
    let mut clock = Clock { now: 0.0 };
    // Accept, then (after two rejected triggers) resist with line 0.
    let mut rng = ScriptedRandom::new([0.9, 0.1, 0.0]);

    let mut outcomes = Vec::new();
    let mut times = Vec::new();
    for _ in 0..4 {
        let (outcome, at) = sip_until_attempt(&mut s, &mut clock, &mut rng);
        outcomes.push(outcome);
        times.push(at);
    }

    assert_eq!(
        outcomes,
        vec![
            AttemptOutcome::Accepted { drink_count: 1 },
            AttemptOutcome::Rejected,
            AttemptOutcome::Rejected,
            AttemptOutcome::Resisted { attempts_left: 1 },
        ]
    );
    // Cooldown spaces every trigger, processed or not.
    assert!(times.windows(2).all(|w| w[1] - w[0] > 2000.0));
    assert_eq!(rng.remaining(), 0);
    assert_eq!(s.state().drink_count, 1);
    assert_eq!(s.state().turn_attempts, 1);

    let labels: Vec<&str> = s.log().records().iter().map(|r| r.outcome.as_str()).collect();
    assert_eq!(labels, vec!["accepted", "rejected", "rejected", "resisted"]);
}

#[test]
fn test_blackout_freezes_session_until_restart() {
    let mut s = session();
    let mut clock = Clock { now: 0.0 };

    // Survive every blackout roll and always accept.
    let mut rng = ScriptedRandom::constant(0.99);
    let mut guard = 0;
    while s.state().drink_count < 6 {
        sip_until_attempt(&mut s, &mut clock, &mut rng);
        guard += 1;
        assert!(guard < 50, "never reached six drinks");
    }

    // 0.5 < 64% at six drinks.
    let mut rng = ScriptedRandom::new([0.5]).with_fallback(0.99);
    let (outcome, at) = loop {
        let (outcome, at) = sip_until_attempt(&mut s, &mut clock, &mut rng);
        if outcome != AttemptOutcome::Rejected {
            break (outcome, at);
        }
    };
    assert!(matches!(outcome, AttemptOutcome::BlackedOut { .. }));
    assert!(s.state().is_blacked_out());
    let frozen_puppet = s.puppet().clone();

    let frame = sipping();
    let mut attempts = 0;
    let mut fired = Vec::new();
    while clock.now < at + 5000.0 {
        let now = clock.step();
        let report = s.tick(Some(&frame), canvas(), now, &mut rng);
        attempts += report.attempt.iter().count();
        fired.extend(report.transitions);
    }
    assert_eq!(attempts, 0);
    assert_eq!(fired, vec![Transition::EnterGameOver]);
    assert!(s.state().is_game_over());
    assert_eq!(s.state().drink_count, 6);
    assert_eq!(*s.puppet(), frozen_puppet);

    s.restart(clock.now);
    assert_eq!(s.state().drink_count, 0);
    assert_eq!(s.state().phase, Phase::Open);
    assert_eq!(s.pending_transitions(), 0);
    assert!(s.log().is_empty());
}

#[test]
fn test_restart_cancels_scheduled_turn_end() {
    let mut s = session();
    let mut clock = Clock { now: 0.0 };
    let mut rng = ScriptedRandom::new([0.9]);

    let (_, t0) = sip_until_attempt(&mut s, &mut clock, &mut rng);
    assert_eq!(s.pending_transitions(), 1);
    s.restart(clock.now);

    let fired = run_until(&mut s, &mut clock, None, t0 + 6000.0, &mut rng);
    assert!(fired.is_empty());
    assert_eq!(s.state().phase, Phase::Open);
    assert_eq!(s.state().reaction, Reaction::Idle);
}

#[test]
fn test_nobody_in_view_drifts_back_to_rest() {
    let mut s = session();
    let mut clock = Clock { now: 0.0 };
    let mut rng = ScriptedRandom::constant(0.9);

    let down = arms_down();
    run_until(&mut s, &mut clock, Some(&down), 1000.0, &mut rng);
    let rest = PuppetPose::at_rest(canvas());
    assert!(nalgebra::distance(&s.puppet().head, &rest.head) > 5.0);

    run_until(&mut s, &mut clock, None, 10_000.0, &mut rng);
    assert!(nalgebra::distance(&s.puppet().head, &rest.head) < 0.5);
    assert!(nalgebra::distance(&s.puppet().right_wrist, &rest.right_wrist) < 0.5);
    assert!(s.log().is_empty());
}

#[test]
fn test_leaving_mid_sip_does_not_fire_an_attempt() {
    let mut s = session();
    let mut clock = Clock { now: 0.0 };
    let mut rng = ScriptedRandom::constant(0.9);

    let frame = sipping();
    let hold = TrackingConfig::default().hold_frames;
    let mut guard = 0;
    while s.detector().near_count() < hold - 1 {
        let now = clock.step();
        assert!(s.tick(Some(&frame), canvas(), now, &mut rng).attempt.is_none());
        guard += 1;
        assert!(guard < 1000, "wrist never reached the face");
    }

    // One frame short of a sip, then nobody in view.
    for _ in 0..200 {
        let now = clock.step();
        assert!(s.tick(None, canvas(), now, &mut rng).attempt.is_none());
    }
    assert_eq!(s.detector().near_count(), hold - 1);
    assert_eq!(s.state().drink_count, 0);
    assert_eq!(s.state().turn_attempts, 0);
    assert!(s.log().is_empty());
}

#[test]
fn test_simulated_player_triggers_a_sip() {
    let sim = SimulatedPoseSource::new();
    let mut s = session();
    let mut rng = ScriptedRandom::constant(0.9);

    let mut attempts = 0;
    let mut t = 0.0;
    while t < SimulatedPoseSource::CYCLE_SECS as f64 * 1000.0 {
        t += FRAME_MS;
        let frame = sim.frame_at((t / 1000.0) as f32);
        if s.tick(frame.as_ref(), canvas(), t, &mut rng).attempt.is_some() {
            attempts += 1;
        }
    }
    assert_eq!(attempts, 1);
    assert_eq!(s.state().drink_count, 1);
}
