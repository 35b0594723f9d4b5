// src/game.rs - Drink resolution state machine
//
// Each sip attempt is resolved against the current drink count: past the
// danger threshold a blackout roll comes first, otherwise a coin flip
// decides between the puppet resisting and giving in. Everything that
// happens "a moment later" (turn end, turnover pause, game over) goes
// through the scheduler so a reset cancels it.
use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::schedule::Scheduler;

pub const RESIST_LINES: [&str; 8] = [
    "Nah I'm good.",
    "No thanks.",
    "I'll pass.",
    "Not right now.",
    "Stop it.",
    "I said no!",
    "Seriously, stop.",
    "I don't want it.",
];

/// (line, badge) shown when the puppet gives in, indexed by drink number.
pub const ACCEPT_LINES: [(&str, &str); 8] = [
    ("Ok fine… just one.", "🍺"),
    ("Alright, alright.", "🍺🍺"),
    ("You win… ugh.", "🍺🍺🍺"),
    ("I shouldn't… but ok.", "🍺🍺🍺🍺"),
    ("This is a bad idea.", "🍺🍺🍺🍺🍺"),
    ("Blacking out is possible now…", "⚠️"),
    ("I feel sick…", "⚠️⚠️"),
    ("Everything is spinning…", "🚨"),
];

pub const TURNOVER_MESSAGE: &str = "⏭  Next player's turn!";
pub const BLACKOUT_MESSAGE: &str = "🚨 Blacked out.";

// Head offsets in canvas px; the resist dodge flips to move away from the wrist.
const RESIST_DODGE: (f32, f32) = (55.0, -15.0);
const ACCEPT_DODGE: (f32, f32) = (0.0, 18.0);

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub attempts_per_turn: u32,
    /// Chance the puppet pushes the drink away. Flat for every drink count.
    pub resist_chance: f64,
    /// Drinks already taken before blackout rolls start.
    pub blackout_threshold: u32,
    pub blackout_base: f64,
    pub max_drinks: u32,
    pub intox_base: f32,
    pub intox_per_drink: f32,
    pub resist_reaction_ms: f64,
    pub resist_dodge_ms: f64,
    pub resist_turn_end_ms: f64,
    pub accept_reaction_ms: f64,
    pub accept_dodge_ms: f64,
    pub accept_turn_end_ms: f64,
    pub turnover_ms: f64,
    pub blackout_reaction_ms: f64,
    pub game_over_delay_ms: f64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            attempts_per_turn: 2,
            resist_chance: 0.5,
            blackout_threshold: 5,
            blackout_base: 0.6,
            max_drinks: 8,
            intox_base: 0.14,
            intox_per_drink: 0.02,
            resist_reaction_ms: 1400.0,
            resist_dodge_ms: 700.0,
            resist_turn_end_ms: 1500.0,
            accept_reaction_ms: 2000.0,
            accept_dodge_ms: 600.0,
            accept_turn_end_ms: 2200.0,
            turnover_ms: 2200.0,
            blackout_reaction_ms: 1000.0,
            game_over_delay_ms: 3500.0,
        }
    }
}

impl GameRules {
    /// `1 - base^(drinks - threshold + 1)` once the threshold is reached.
    pub fn blackout_probability(&self, drinks: u32) -> f64 {
        if drinks < self.blackout_threshold {
            return 0.0;
        }
        let over = (drinks - self.blackout_threshold + 1) as i32;
        1.0 - self.blackout_base.powi(over)
    }

    /// Intoxication after the drink that brings the count to `drinks`.
    pub fn intoxication_after(&self, current: f32, drinks: u32) -> f32 {
        (current + self.intox_base + self.intox_per_drink * drinks as f32).min(1.0)
    }

    pub fn in_danger_zone(&self, drinks: u32) -> bool {
        drinks >= self.blackout_threshold
    }
}

/// Uniform draws in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

pub struct SystemRandom {
    rng: StdRng,
}

impl SystemRandom {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays fixed draws, then keeps returning `fallback`.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    draws: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRandom {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            fallback: 0.999,
        }
    }

    /// Every draw returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(Vec::new()).with_fallback(value)
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn remaining(&self) -> usize {
        self.draws.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        self.draws.pop_front().unwrap_or(self.fallback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reaction {
    #[default]
    Idle,
    Resist,
    Accept,
    Blackout,
    TurnOver,
}

impl Reaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reaction::Idle => "idle",
            Reaction::Resist => "resist",
            Reaction::Accept => "accept",
            Reaction::Blackout => "blackout",
            Reaction::TurnOver => "turnover",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Attempts are accepted.
    #[default]
    Open,
    /// The turn is decided and waiting for the turnover pause.
    Closing,
    TurnOver,
    /// Terminal; only the game-over transition is still pending.
    BlackingOut,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    EndTurn,
    FinishTurnOver,
    EnterGameOver,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttemptOutcome {
    Rejected,
    Resisted { attempts_left: u32 },
    Accepted { drink_count: u32 },
    BlackedOut { probability: f64 },
}

impl AttemptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Rejected => "rejected",
            AttemptOutcome::Resisted { .. } => "resisted",
            AttemptOutcome::Accepted { .. } => "accepted",
            AttemptOutcome::BlackedOut { .. } => "blackout",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub drink_count: u32,
    /// 0..=1, drives every visual degradation.
    pub intoxication: f32,
    pub turn_attempts: u32,
    pub reaction: Reaction,
    pub reaction_until_ms: f64,
    pub reaction_message: String,
    pub head_dodge: Vector2<f32>,
    pub head_dodge_until_ms: f64,
    pub phase: Phase,
    pub game_over_at_ms: Option<f64>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            drink_count: 0,
            intoxication: 0.0,
            turn_attempts: 0,
            reaction: Reaction::Idle,
            reaction_until_ms: 0.0,
            reaction_message: String::new(),
            head_dodge: Vector2::zeros(),
            head_dodge_until_ms: 0.0,
            phase: Phase::Open,
            game_over_at_ms: None,
        }
    }
}

impl GameState {
    pub fn head_dodge_at(&self, now_ms: f64) -> Vector2<f32> {
        if now_ms < self.head_dodge_until_ms {
            self.head_dodge
        } else {
            Vector2::zeros()
        }
    }

    pub fn reaction_visible(&self, now_ms: f64) -> bool {
        now_ms <= self.reaction_until_ms && !self.reaction_message.is_empty()
    }

    pub fn attempts_left(&self, rules: &GameRules) -> u32 {
        rules.attempts_per_turn.saturating_sub(self.turn_attempts)
    }

    pub fn is_turn_over(&self) -> bool {
        self.phase == Phase::TurnOver
    }

    pub fn is_blacked_out(&self) -> bool {
        matches!(self.phase, Phase::BlackingOut | Phase::GameOver)
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    fn react(&mut self, reaction: Reaction, message: String, until_ms: f64) {
        debug!("{} reaction until {:.0}ms", reaction.as_str(), until_ms);
        self.reaction = reaction;
        self.reaction_message = message;
        self.reaction_until_ms = until_ms;
    }

    fn dodge(&mut self, offset: Vector2<f32>, until_ms: f64) {
        self.head_dodge = offset;
        self.head_dodge_until_ms = until_ms;
    }
}

fn tries_left_suffix(attempts_left: u32) -> String {
    if attempts_left == 1 {
        " (1 try left)".to_string()
    } else {
        format!(" ({attempts_left} tries left)")
    }
}

pub struct DrinkMachine {
    rules: GameRules,
    state: GameState,
    scheduler: Scheduler<Transition>,
}

impl DrinkMachine {
    pub fn new(rules: GameRules) -> Self {
        Self {
            rules,
            state: GameState::default(),
            scheduler: Scheduler::new(),
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn pending_transitions(&self) -> usize {
        self.scheduler.pending()
    }

    /// Resolves one sip attempt.
    ///
    /// `wrist_right_of_head` decides which way a resisting puppet ducks.
    pub fn attempt(
        &mut self,
        now_ms: f64,
        rng: &mut dyn RandomSource,
        wrist_right_of_head: bool,
    ) -> AttemptOutcome {
        if self.state.phase != Phase::Open {
            debug!("attempt ignored during {:?}", self.state.phase);
            return AttemptOutcome::Rejected;
        }

        self.state.turn_attempts += 1;

        if self.rules.in_danger_zone(self.state.drink_count) {
            let probability = self.rules.blackout_probability(self.state.drink_count);
            if rng.next_unit() < probability {
                self.black_out(now_ms);
                return AttemptOutcome::BlackedOut { probability };
            }
        }

        if rng.next_unit() < self.rules.resist_chance {
            self.resist(now_ms, rng, wrist_right_of_head)
        } else {
            self.accept(now_ms)
        }
    }

    fn resist(
        &mut self,
        now_ms: f64,
        rng: &mut dyn RandomSource,
        wrist_right_of_head: bool,
    ) -> AttemptOutcome {
        let rules = &self.rules;
        let direction = if wrist_right_of_head { -1.0 } else { 1.0 };
        self.state.dodge(
            Vector2::new(RESIST_DODGE.0 * direction, RESIST_DODGE.1),
            now_ms + rules.resist_dodge_ms,
        );

        let index = ((rng.next_unit() * RESIST_LINES.len() as f64) as usize)
            .min(RESIST_LINES.len() - 1);
        let line = RESIST_LINES[index];

        let attempts_left = self.state.attempts_left(rules);
        let message = if attempts_left == 0 {
            self.state.phase = Phase::Closing;
            self.scheduler
                .schedule(now_ms + rules.resist_turn_end_ms, Transition::EndTurn);
            format!("{line} (turn over!)")
        } else {
            format!("{line}{}", tries_left_suffix(attempts_left))
        };
        self.state
            .react(Reaction::Resist, message, now_ms + rules.resist_reaction_ms);

        info!(
            "puppet resisted (attempt {}/{})",
            self.state.turn_attempts, rules.attempts_per_turn
        );
        AttemptOutcome::Resisted { attempts_left }
    }

    fn accept(&mut self, now_ms: f64) -> AttemptOutcome {
        let rules = &self.rules;
        let state = &mut self.state;

        if state.drink_count < rules.max_drinks {
            state.drink_count += 1;
        } else {
            warn!("drink count already at {}", rules.max_drinks);
        }
        state.intoxication = rules.intoxication_after(state.intoxication, state.drink_count);

        let index = (state.drink_count as usize)
            .saturating_sub(1)
            .min(ACCEPT_LINES.len() - 1);
        let (line, badge) = ACCEPT_LINES[index];
        state.react(
            Reaction::Accept,
            format!("{badge}  {line}"),
            now_ms + rules.accept_reaction_ms,
        );
        state.dodge(
            Vector2::new(ACCEPT_DODGE.0, ACCEPT_DODGE.1),
            now_ms + rules.accept_dodge_ms,
        );
        state.phase = Phase::Closing;
        self.scheduler
            .schedule(now_ms + rules.accept_turn_end_ms, Transition::EndTurn);

        info!(
            "puppet drank: {} drinks, intoxication {:.2}",
            state.drink_count, state.intoxication
        );
        AttemptOutcome::Accepted {
            drink_count: state.drink_count,
        }
    }

    fn black_out(&mut self, now_ms: f64) {
        let rules = &self.rules;
        self.state.react(
            Reaction::Blackout,
            BLACKOUT_MESSAGE.to_string(),
            now_ms + rules.blackout_reaction_ms,
        );
        self.state.phase = Phase::BlackingOut;
        self.scheduler
            .schedule(now_ms + rules.game_over_delay_ms, Transition::EnterGameOver);
        info!("puppet blacked out after {} drinks", self.state.drink_count);
    }

    /// Applies every transition that has come due. Returns what fired.
    pub fn advance(&mut self, now_ms: f64) -> Vec<Transition> {
        let fired = self.scheduler.drain_due(now_ms);
        for transition in &fired {
            self.apply(*transition, now_ms);
        }
        fired
    }

    fn apply(&mut self, transition: Transition, now_ms: f64) {
        match transition {
            Transition::EndTurn => {
                let until = now_ms + self.rules.turnover_ms;
                self.state.turn_attempts = 0;
                self.state.phase = Phase::TurnOver;
                self.state
                    .react(Reaction::TurnOver, TURNOVER_MESSAGE.to_string(), until);
                self.scheduler.schedule(until, Transition::FinishTurnOver);
                info!("turn over, pass to the next player");
            }
            Transition::FinishTurnOver => {
                self.state.phase = Phase::Open;
                self.state.reaction = Reaction::Idle;
                self.state.reaction_message.clear();
                debug!("next turn open");
            }
            Transition::EnterGameOver => {
                self.state.phase = Phase::GameOver;
                self.state.game_over_at_ms = Some(now_ms);
                info!("game over after {} drinks", self.state.drink_count);
            }
        }
    }

    /// Starts a fresh session and cancels everything still scheduled.
    pub fn reset(&mut self) {
        if !self.scheduler.is_empty() {
            debug!("cancelling {} pending transitions", self.scheduler.pending());
        }
        self.scheduler.cancel_all();
        self.state = GameState::default();
    }
}
