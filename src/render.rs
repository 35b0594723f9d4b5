// src/render.rs - Puppet, background, HUD and end screen
//
// Everything here reads game state and paints; nothing mutates it.
use eframe::egui::{self, Align2, Color32, FontId, Painter, Pos2, Rect, Vec2};
use std::f32::consts::{PI, TAU};

use crate::game::{GameRules, GameState, Phase, Reaction};
use crate::pose::SourceStatus;
use crate::tracking::{Point, PuppetPose};
use crate::ui::{lerp, lerp_color, with_alpha, Pen, Theme, Transform};

/// End screen fade to black.
pub const BLACKOUT_FADE_MS: f64 = 3000.0;
/// End screen text starts fading in after this long.
pub const BLACKOUT_TEXT_DELAY_MS: f64 = 1500.0;
/// Normalising span for the reaction bubble fade.
const BUBBLE_SPAN_MS: f64 = 1800.0;

/// Everything one frame is drawn from.
pub struct SceneView<'a> {
    pub state: &'a GameState,
    pub rules: &'a GameRules,
    pub puppet: &'a PuppetPose,
    pub source: &'a SourceStatus,
    pub now_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expression {
    Smile,
    Frown,
    Open,
}

impl Expression {
    pub fn for_intoxication(intoxication: f32) -> Self {
        if intoxication < 0.25 {
            Expression::Smile
        } else if intoxication < 0.65 {
            Expression::Frown
        } else {
            Expression::Open
        }
    }
}

/// Body proportions, all derived from the shoulder span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proportions {
    pub shoulder_width: f32,
    pub torso_width: f32,
    pub torso_height: f32,
    pub head_radius: f32,
}

impl Proportions {
    pub fn of(puppet: &PuppetPose) -> Self {
        let shoulder_width = puppet.shoulder_width().max(60.0);
        let torso_width = shoulder_width * 1.1;
        Self {
            shoulder_width,
            torso_width,
            torso_height: torso_width * 1.55,
            head_radius: torso_width * 0.38,
        }
    }

    pub fn arm_width(&self) -> f32 {
        (self.torso_width * 0.17).max(9.0)
    }
}

pub fn background_color(theme: &Theme, intoxication: f32) -> Color32 {
    lerp_color(theme.background_sober, theme.background_drunk, intoxication)
}

pub fn body_color(theme: &Theme, intoxication: f32) -> Color32 {
    lerp_color(theme.body_sober, theme.body_drunk, intoxication)
}

pub fn rain_streaks(intoxication: f32) -> usize {
    if intoxication > 0.3 {
        lerp(0.0, 45.0, intoxication).floor() as usize
    } else {
        0
    }
}

/// Scene rotation in radians.
pub fn sway_angle(intoxication: f32, now_ms: f64) -> f32 {
    intoxication * 0.22 * (now_ms * 0.002 + 0.5).sin() as f32
}

/// Offset of the faint double, once drunk enough to see one.
pub fn ghost_offset(intoxication: f32, now_ms: f64) -> Option<Vec2> {
    (intoxication > 0.55).then(|| {
        Vec2::new(
            (now_ms * 0.009).sin() as f32 * 8.0 * intoxication,
            (now_ms * 0.011).cos() as f32 * 6.0 * intoxication,
        )
    })
}

/// Eyelid opening as a fraction of a fully open eye.
pub fn eye_opening(intoxication: f32, now_ms: f64) -> f32 {
    let open = (1.0 - intoxication * 0.85).max(0.08);
    let blink = 0.85 + 0.15 * (now_ms * 0.007 + 2.0).sin() as f32;
    (open * blink).max(0.06)
}

pub fn cup_level(drinks: u32, max_drinks: u32) -> f32 {
    if max_drinks == 0 {
        return 0.05;
    }
    (1.0 - drinks as f32 / max_drinks as f32).max(0.05)
}

/// Bubble opacity in 0..=1 for a reaction ending at `until_ms`.
pub fn bubble_fade(until_ms: f64, now_ms: f64) -> f32 {
    let progress = ((until_ms - now_ms) / BUBBLE_SPAN_MS) as f32;
    (progress * 3.0)
        .min((1.0 - progress) * 6.0 + 0.1)
        .clamp(0.0, 1.0)
}

pub fn bubble_color(theme: &Theme, reaction: Reaction) -> Color32 {
    match reaction {
        Reaction::Resist => theme.resist,
        Reaction::TurnOver => theme.turnover,
        _ => theme.success,
    }
}

/// `None` for an empty pip.
pub fn pip_color(theme: &Theme, rules: &GameRules, index: u32, drinks: u32) -> Option<Color32> {
    if index >= drinks {
        None
    } else if index >= rules.blackout_threshold {
        Some(theme.danger)
    } else {
        Some(Color32::from_rgb(80, 200, 120))
    }
}

pub fn instruction(state: &GameState, rules: &GameRules) -> String {
    let left = state.attempts_left(rules);
    if state.phase == Phase::TurnOver {
        "⏭  Pass to next player!".to_string()
    } else if !rules.in_danger_zone(state.drink_count) {
        format!("✋ Offer a sip  |  attempts left this turn: {left}")
    } else {
        format!("⚠️  Danger zone: attempts left this turn: {left}")
    }
}

pub fn drinks_label(drinks: u32) -> String {
    if drinks == 1 {
        "after 1 drink".to_string()
    } else {
        format!("after {drinks} drinks")
    }
}

/// (screen fade, text fade), both 0..=1, `age_ms` after the end screen appeared.
pub fn blackout_fades(age_ms: f64) -> (f32, f32) {
    let screen = (age_ms / BLACKOUT_FADE_MS).clamp(0.0, 1.0) as f32;
    let text = ((age_ms - BLACKOUT_TEXT_DELAY_MS) / BLACKOUT_TEXT_DELAY_MS).clamp(0.0, 1.0) as f32;
    (screen, text)
}

/// Backdrop blur strength in pixels.
pub fn blur_px(intoxication: f32) -> f32 {
    intoxication * 10.0
}

fn to_pos(point: Point) -> Pos2 {
    Pos2::new(point.x, point.y)
}

/// One full frame of the running game.
pub fn draw_scene(painter: &Painter, screen: Rect, theme: &Theme, view: &SceneView<'_>) {
    let intox = view.state.intoxication;
    draw_background(painter, screen, theme, intox, view.now_ms);
    draw_puppet_layers(painter, theme, view);
    draw_hud(painter, screen, theme, view);
    draw_bubble(painter, theme, view);
    draw_glass(painter, screen, intox);
}

pub fn draw_background(painter: &Painter, screen: Rect, theme: &Theme, intoxication: f32, now_ms: f64) {
    painter.rect_filled(screen, 0.0, background_color(theme, intoxication));

    let blob_alpha = lerp(15.0, 55.0, intoxication);
    let size = screen.size();
    let origin = screen.min.to_vec2();
    draw_neon_blob(
        painter,
        Pos2::new(size.x * 0.18, size.y * 0.22) + origin,
        180.0,
        blob_alpha,
        intoxication,
        now_ms,
    );
    draw_neon_blob(
        painter,
        Pos2::new(size.x * 0.82, size.y * 0.28) + origin,
        200.0,
        blob_alpha,
        intoxication,
        now_ms + 999.0,
    );

    let streaks = rain_streaks(intoxication);
    if streaks > 0 {
        draw_rain(painter, screen, theme, streaks, now_ms);
    }
}

fn draw_neon_blob(
    painter: &Painter,
    center: Pos2,
    diameter: f32,
    alpha: f32,
    intoxication: f32,
    now_ms: f64,
) {
    let center = center
        + Vec2::new(
            (now_ms * 0.001).sin() as f32 * 12.0,
            (now_ms * 0.0013).cos() as f32 * 10.0,
        );
    let pen = Pen::new(painter, Transform::IDENTITY, 1.0);
    for ring in 0..7 {
        let shrink = 1.0 - ring as f32 / 7.0;
        let color = Color32::from_rgb(
            (lerp(120.0, 200.0, intoxication) + ring as f32 * 6.0).min(255.0) as u8,
            55 + ring * 7,
            255,
        );
        let radius = diameter * shrink * 0.5;
        pen.ellipse(center, Vec2::splat(radius), color, alpha * shrink);
    }
}

fn draw_rain(painter: &Painter, screen: Rect, theme: &Theme, streaks: usize, now_ms: f64) {
    let (w, h) = (screen.width() as f64, screen.height() as f64);
    if w <= 0.0 || h <= 0.0 {
        return;
    }
    let pen = Pen::new(painter, Transform::IDENTITY, 1.0);
    for i in 0..streaks {
        let x = ((i as f64 * 97.0 + now_ms * 0.18) % w) as f32 + screen.min.x;
        let y = ((i as f64 * 193.0 + now_ms * 0.72) % h) as f32 + screen.min.y;
        pen.line(Pos2::new(x, y), Pos2::new(x + 3.0, y + 15.0), 1.0, theme.rain, 28.0);
    }
}

fn draw_puppet_layers(painter: &Painter, theme: &Theme, view: &SceneView<'_>) {
    let intox = view.state.intoxication;
    let mid = view.puppet.shoulder_mid();
    let pivot = Pos2::new(mid.x, mid.y + 200.0);
    let sway = Transform::rotate_about(pivot, sway_angle(intox, view.now_ms));

    if let Some(offset) = ghost_offset(intox, view.now_ms) {
        draw_puppet(&Pen::new(painter, sway.translated_local(offset), 0.22), theme, view);
    }
    draw_puppet(&Pen::new(painter, sway, 1.0), theme, view);
}

fn draw_puppet(pen: &Pen<'_>, theme: &Theme, view: &SceneView<'_>) {
    let puppet = view.puppet;
    let intox = view.state.intoxication;
    let p = Proportions::of(puppet);
    let body = body_color(theme, intox);
    let mid = to_pos(puppet.shoulder_mid());

    let torso = Rect::from_center_size(
        Pos2::new(mid.x, mid.y + p.torso_height * 0.5),
        Vec2::new(p.torso_width, p.torso_height),
    );
    pen.rounded_rect(torso, 14.0, body, 210.0);

    let dodge = view.state.head_dodge_at(view.now_ms);
    let head = to_pos(puppet.head) + Vec2::new(dodge.x, dodge.y);
    let r = p.head_radius;

    pen.ellipse(head, Vec2::splat(r), theme.skin, 230.0);
    pen.ellipse_slice(
        head - Vec2::new(0.0, r * 0.1),
        Vec2::new(r * 1.05, r * 0.7),
        PI,
        TAU,
        theme.hair,
        210.0,
    );

    let lid = eye_opening(intox, view.now_ms);
    let eye_dx = r * 0.28;
    let eye_y = head.y - r * 0.08;
    for eye in [Pos2::new(head.x - eye_dx, eye_y), Pos2::new(head.x + eye_dx, eye_y)] {
        pen.ellipse(eye, Vec2::new(r * 0.165, r * 0.165 * lid), theme.eye_white, 230.0);
        pen.ellipse(eye, Vec2::new(r * 0.085, r * 0.085 * lid), theme.pupil, 240.0);
        if intox > 0.3 {
            let red = (intox - 0.3) / 0.7 * 85.0;
            pen.ellipse(eye, Vec2::new(r * 0.165, r * 0.165 * lid), theme.red_eye, red);
        }
    }

    let mouth_w = r * 0.52;
    let mouth_y = head.y + r * 0.32;
    match Expression::for_intoxication(intox) {
        Expression::Smile => pen.arc(
            Pos2::new(head.x, mouth_y),
            Vec2::new(mouth_w * 0.5, mouth_w * 0.25),
            0.0,
            PI,
            3.0,
            theme.mouth_line,
            210.0,
        ),
        Expression::Frown => pen.arc(
            Pos2::new(head.x, mouth_y + 5.0),
            Vec2::new(mouth_w * 0.45, mouth_w * 0.275),
            PI,
            TAU,
            3.0,
            theme.mouth_line,
            210.0,
        ),
        Expression::Open => pen.ellipse(
            Pos2::new(head.x, mouth_y + 6.0),
            Vec2::new(mouth_w * 0.25, mouth_w * 0.19),
            theme.mouth_open,
            200.0,
        ),
    }

    let arm = p.arm_width();
    pen.limb(to_pos(puppet.left_shoulder), to_pos(puppet.left_wrist), arm, body, 200.0);
    pen.limb(to_pos(puppet.right_shoulder), to_pos(puppet.right_wrist), arm, body, 200.0);

    pen.ellipse(to_pos(puppet.left_wrist), Vec2::splat(10.0), theme.skin, 210.0);
    pen.ellipse(to_pos(puppet.right_wrist), Vec2::splat(10.0), theme.skin, 210.0);

    draw_cup(pen, theme, to_pos(puppet.right_wrist), view);
}

fn draw_cup(pen: &Pen<'_>, theme: &Theme, hand: Pos2, view: &SceneView<'_>) {
    let glass = Rect::from_center_size(hand - Vec2::new(0.0, 2.0), Vec2::new(24.0, 32.0));
    pen.rounded_rect(glass, 5.0, theme.cup, 175.0);

    let level = cup_level(view.state.drink_count, view.rules.max_drinks);
    let liquid_h = 22.0 * level;
    let liquid = Rect::from_center_size(
        Pos2::new(hand.x, hand.y + 16.0 - liquid_h * 0.5),
        Vec2::new(18.0, liquid_h),
    );
    pen.rounded_rect(liquid, 3.0, theme.liquid, 165.0);

    pen.line(
        hand + Vec2::new(5.0, -17.0),
        hand + Vec2::new(8.0, 13.0),
        2.5,
        theme.straw,
        185.0,
    );
}

fn draw_bubble(painter: &Painter, theme: &Theme, view: &SceneView<'_>) {
    let state = view.state;
    if !state.reaction_visible(view.now_ms) {
        return;
    }

    let fade = bubble_fade(state.reaction_until_ms, view.now_ms);
    let dodge = state.head_dodge_at(view.now_ms);
    let anchor = Pos2::new(
        view.puppet.head.x + dodge.x,
        view.puppet.head.y + dodge.y - 80.0,
    );

    let font = FontId::proportional(18.0);
    let galley = painter.layout_no_wrap(state.reaction_message.clone(), font.clone(), Color32::WHITE);
    let size = Vec2::new(galley.size().x + 28.0, 44.0);
    let rect = Rect::from_center_size(anchor, size);

    let fill = with_alpha(bubble_color(theme, state.reaction), 200.0 * fade);
    painter.rect_filled(rect, 12.0, fill);
    let tail_top = rect.max.y - 1.0;
    painter.add(egui::Shape::convex_polygon(
        vec![
            Pos2::new(anchor.x - 8.0, tail_top),
            Pos2::new(anchor.x + 8.0, tail_top),
            Pos2::new(anchor.x, tail_top + 15.0),
        ],
        fill,
        egui::Stroke::NONE,
    ));

    painter.text(
        anchor,
        Align2::CENTER_CENTER,
        &state.reaction_message,
        font,
        with_alpha(theme.text_primary, 240.0 * fade),
    );
}

pub fn draw_hud(painter: &Painter, screen: Rect, theme: &Theme, view: &SceneView<'_>) {
    let state = view.state;
    let rules = view.rules;
    let origin = screen.min;

    let pip = 20.0;
    let gap = 7.0;
    let left = origin.x + 20.0;
    let pip_y = screen.max.y - 36.0;
    for i in 0..rules.max_drinks {
        let center = Pos2::new(left + i as f32 * (pip + gap) + pip * 0.5, pip_y);
        let color = pip_color(theme, rules, i, state.drink_count)
            .unwrap_or_else(|| with_alpha(Color32::WHITE, 40.0));
        painter.circle_filled(center, pip * 0.5, color);
    }

    let instruction_color = if state.phase == Phase::TurnOver {
        with_alpha(Color32::from_rgb(100, 160, 255), 220.0)
    } else {
        with_alpha(Color32::WHITE, 150.0)
    };
    painter.text(
        Pos2::new(left, screen.max.y - 60.0),
        Align2::LEFT_TOP,
        instruction(state, rules),
        FontId::monospace(13.0),
        instruction_color,
    );

    let bar = Rect::from_min_size(
        Pos2::new(screen.max.x - 160.0, origin.y + 20.0),
        Vec2::new(140.0, 14.0),
    );
    let intox = state.intoxication;
    painter.rect_filled(bar, 4.0, with_alpha(Color32::WHITE, 30.0));
    let fill = Rect::from_min_size(bar.min, Vec2::new(bar.width() * intox, bar.height()));
    let fill_color = lerp_color(
        Color32::from_rgb(80, 200, 120),
        Color32::from_rgb(255, 60, 60),
        intox,
    );
    painter.rect_filled(fill, 4.0, with_alpha(fill_color, 210.0));
    painter.text(
        Pos2::new(bar.max.x, bar.max.y + 4.0),
        Align2::RIGHT_TOP,
        "intox",
        FontId::monospace(11.0),
        with_alpha(Color32::WHITE, 180.0),
    );

    let notice = match view.source {
        SourceStatus::Loading => Some(("⏳ Loading pose model…".to_string(), theme.warning)),
        SourceStatus::Unavailable(reason) => {
            Some((format!("Pose tracking unavailable: {reason}"), theme.danger))
        }
        SourceStatus::Ready => None,
    };
    if let Some((text, color)) = notice {
        painter.text(
            Pos2::new(screen.center().x, origin.y + 20.0),
            Align2::CENTER_TOP,
            text,
            FontId::monospace(14.0),
            with_alpha(color, 200.0),
        );
    }
}

/// Frosted veil standing in for a backdrop blur.
pub fn draw_glass(painter: &Painter, screen: Rect, intoxication: f32) {
    let blur = blur_px(intoxication);
    if blur <= 0.0 {
        return;
    }
    painter.rect_filled(screen, 0.0, with_alpha(Color32::from_rgb(180, 170, 200), blur * 2.0));
}

/// Black end screen; `age_ms` counts from when the game ended.
pub fn draw_blackout(painter: &Painter, screen: Rect, theme: &Theme, drinks: u32, age_ms: f64) {
    let (screen_fade, text_fade) = blackout_fades(age_ms);
    painter.rect_filled(screen, 0.0, with_alpha(Color32::BLACK, 255.0 * screen_fade));
    if text_fade <= 0.0 {
        return;
    }

    let x = screen.center().x;
    let at = |fraction: f32| Pos2::new(x, screen.min.y + screen.height() * fraction);
    let lines = [
        ("Blacked out.".to_string(), 36.0, theme.text_primary, 255.0, 0.38),
        (drinks_label(drinks), 18.0, theme.text_secondary, 180.0, 0.48),
        ("Current player loses!".to_string(), 22.0, Color32::from_rgb(255, 80, 80), 220.0, 0.57),
        ("press R to play again".to_string(), 14.0, Color32::from_gray(160), 140.0, 0.67),
    ];
    for (text, size, color, alpha, fraction) in lines {
        painter.text(
            at(fraction),
            Align2::CENTER_CENTER,
            text,
            FontId::monospace(size),
            with_alpha(color, alpha * text_fade),
        );
    }
}
