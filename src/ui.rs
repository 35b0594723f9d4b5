// src/ui.rs - Palette and shape helpers on top of egui's painter
//
// egui paints flat shapes only: no ellipses, no transform stack. Curved
// shapes are turned into polygons here, and the puppet's sway is applied
// by transforming every point before it reaches the painter.
use eframe::egui::{self, Color32, Pos2, Rect, Shape, Stroke, Vec2};
use std::f32::consts::{PI, TAU};

#[derive(Debug, Clone)]
pub struct Theme {
    pub background_sober: Color32,
    pub background_drunk: Color32,
    pub body_sober: Color32,
    pub body_drunk: Color32,
    pub skin: Color32,
    pub hair: Color32,
    pub eye_white: Color32,
    pub pupil: Color32,
    pub red_eye: Color32,
    pub mouth_line: Color32,
    pub mouth_open: Color32,
    pub cup: Color32,
    pub liquid: Color32,
    pub straw: Color32,
    pub rain: Color32,
    pub resist: Color32,
    pub turnover: Color32,
    pub success: Color32,
    pub danger: Color32,
    pub warning: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background_sober: Color32::from_rgb(14, 16, 28),
            background_drunk: Color32::from_rgb(45, 8, 18),
            body_sober: Color32::from_rgb(100, 140, 200),
            body_drunk: Color32::from_rgb(160, 60, 140),
            skin: Color32::from_rgb(245, 220, 185),
            hair: Color32::from_rgb(55, 35, 15),
            eye_white: Color32::WHITE,
            pupil: Color32::from_rgb(30, 30, 80),
            red_eye: Color32::from_rgb(255, 50, 50),
            mouth_line: Color32::from_rgb(140, 75, 55),
            mouth_open: Color32::from_rgb(100, 45, 30),
            cup: Color32::WHITE,
            liquid: Color32::from_rgb(255, 200, 80),
            straw: Color32::from_rgb(255, 120, 120),
            rain: Color32::from_rgb(200, 200, 255),
            resist: Color32::from_rgb(220, 50, 50),
            turnover: Color32::from_rgb(60, 120, 220),
            success: Color32::from_rgb(40, 180, 100),
            danger: Color32::from_rgb(255, 60, 60),
            warning: Color32::from_rgb(255, 200, 0),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Linear blend of the RGB channels; the result is opaque.
pub fn lerp_color(a: Color32, b: Color32, t: f32) -> Color32 {
    let channel = |x: u8, y: u8| lerp(x as f32, y as f32, t).round().clamp(0.0, 255.0) as u8;
    Color32::from_rgb(channel(a.r(), b.r()), channel(a.g(), b.g()), channel(a.b(), b.b()))
}

/// `alpha` on the 0..=255 scale, clamped.
pub fn with_alpha(color: Color32, alpha: f32) -> Color32 {
    Color32::from_rgba_unmultiplied(
        color.r(),
        color.g(),
        color.b(),
        alpha.round().clamp(0.0, 255.0) as u8,
    )
}

fn segments_for(radius: f32, sweep: f32) -> usize {
    ((radius.abs() * sweep.abs() * 0.25) as usize).clamp(8, 96)
}

/// Points along an axis-aligned ellipse from `start` to `end` (radians,
/// y pointing down).
pub fn ellipse_points(center: Pos2, radii: Vec2, start: f32, end: f32) -> Vec<Pos2> {
    let sweep = end - start;
    let count = segments_for(radii.x.max(radii.y), sweep);
    (0..=count)
        .map(|i| {
            let angle = start + sweep * i as f32 / count as f32;
            Pos2::new(
                center.x + radii.x * angle.cos(),
                center.y + radii.y * angle.sin(),
            )
        })
        .collect()
}

pub fn rounded_rect_points(rect: Rect, radius: f32) -> Vec<Pos2> {
    let r = radius.min(rect.width() * 0.5).min(rect.height() * 0.5).max(0.0);
    let corners = [
        (Pos2::new(rect.max.x - r, rect.max.y - r), 0.0),
        (Pos2::new(rect.min.x + r, rect.max.y - r), PI * 0.5),
        (Pos2::new(rect.min.x + r, rect.min.y + r), PI),
        (Pos2::new(rect.max.x - r, rect.min.y + r), PI * 1.5),
    ];
    corners
        .iter()
        .flat_map(|&(c, a)| ellipse_points(c, Vec2::splat(r), a, a + PI * 0.5))
        .collect()
}

/// Outline of a thick line with round caps.
pub fn capsule_points(a: Pos2, b: Pos2, radius: f32) -> Vec<Pos2> {
    let dir = b - a;
    let angle = if dir.length_sq() > f32::EPSILON {
        dir.y.atan2(dir.x)
    } else {
        0.0
    };
    let mut points = ellipse_points(b, Vec2::splat(radius), angle - PI * 0.5, angle + PI * 0.5);
    points.extend(ellipse_points(
        a,
        Vec2::splat(radius),
        angle + PI * 0.5,
        angle + PI * 1.5,
    ));
    points
}

/// Rotation about a pivot followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub pivot: Pos2,
    pub angle: f32,
    pub offset: Vec2,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        pivot: Pos2::ZERO,
        angle: 0.0,
        offset: Vec2::ZERO,
    };

    pub fn rotate_about(pivot: Pos2, angle: f32) -> Self {
        Self {
            pivot,
            angle,
            offset: Vec2::ZERO,
        }
    }

    /// Shifts by `offset` measured in the rotated frame, so the shift turns
    /// with the rotation.
    pub fn translated_local(self, offset: Vec2) -> Self {
        Self {
            offset: self.offset + self.rotate(offset),
            ..self
        }
    }

    fn rotate(&self, v: Vec2) -> Vec2 {
        let (sin, cos) = self.angle.sin_cos();
        Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
    }

    pub fn apply(&self, point: Pos2) -> Pos2 {
        self.pivot + self.rotate(point - self.pivot) + self.offset
    }
}

/// Painter wrapper that transforms geometry and scales every alpha.
pub struct Pen<'a> {
    painter: &'a egui::Painter,
    transform: Transform,
    alpha: f32,
}

impl<'a> Pen<'a> {
    pub fn new(painter: &'a egui::Painter, transform: Transform, alpha: f32) -> Self {
        Self {
            painter,
            transform,
            alpha,
        }
    }

    fn color(&self, color: Color32, alpha: f32) -> Color32 {
        with_alpha(color, alpha * self.alpha)
    }

    fn polygon(&self, points: Vec<Pos2>, fill: Color32) {
        let points = points.into_iter().map(|p| self.transform.apply(p)).collect();
        self.painter
            .add(Shape::convex_polygon(points, fill, Stroke::NONE));
    }

    pub fn ellipse(&self, center: Pos2, radii: Vec2, color: Color32, alpha: f32) {
        self.polygon(ellipse_points(center, radii, 0.0, TAU), self.color(color, alpha));
    }

    /// Filled slice of an ellipse, closed along its chord.
    pub fn ellipse_slice(
        &self,
        center: Pos2,
        radii: Vec2,
        start: f32,
        end: f32,
        color: Color32,
        alpha: f32,
    ) {
        self.polygon(ellipse_points(center, radii, start, end), self.color(color, alpha));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn arc(
        &self,
        center: Pos2,
        radii: Vec2,
        start: f32,
        end: f32,
        width: f32,
        color: Color32,
        alpha: f32,
    ) {
        let stroke = Stroke::new(width, self.color(color, alpha));
        let points: Vec<Pos2> = ellipse_points(center, radii, start, end)
            .into_iter()
            .map(|p| self.transform.apply(p))
            .collect();
        self.painter.add(Shape::line(points, stroke));
    }

    pub fn rounded_rect(&self, rect: Rect, radius: f32, color: Color32, alpha: f32) {
        self.polygon(rounded_rect_points(rect, radius), self.color(color, alpha));
    }

    /// Thick line with round caps.
    pub fn limb(&self, a: Pos2, b: Pos2, width: f32, color: Color32, alpha: f32) {
        self.polygon(capsule_points(a, b, width * 0.5), self.color(color, alpha));
    }

    pub fn line(&self, a: Pos2, b: Pos2, width: f32, color: Color32, alpha: f32) {
        self.painter.line_segment(
            [self.transform.apply(a), self.transform.apply(b)],
            Stroke::new(width, self.color(color, alpha)),
        );
    }
}
