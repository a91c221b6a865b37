//! Cursor highlight with a particle trail.
//!
//! Layers, bottom to top: ambient glow, binary ornament, trail dots, click
//! ripple, glow ring, core dot. Ring, glow and core sizes follow the pointer
//! state (idle, moving, clicking) and ease towards their targets instead of
//! snapping.
//!
//! The glow, ornament and trail can each be switched off; with all three off
//! (see [`CursorConfig::smooth`]) only the core, ring and ripple remain.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::surface::Surface;
use crate::time::Millis;
use crate::trail::{TrailConfig, TrailParticle, TrailStore};

const CORE_RADIUS: f32 = 8.0;
const RING_RADIUS: f32 = 20.0;
const GLOW_RADIUS: f32 = 40.0;
const RIPPLE_RADIUS: f32 = 30.0;
const RIPPLE_MAX_SCALE: f32 = 3.0;
const ORNAMENT_OFFSET: Vec2 = Vec2::new(15.0, -15.0);
const ORNAMENT_SIZE: f32 = 10.0;

/// Cursor effect settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    pub enabled: bool,
    /// Core dot color.
    pub color: Color,
    pub ring_color: Color,
    pub ripple_color: Color,
    pub glow_color: Color,
    /// Trail dots cycle through these.
    pub trail_colors: Vec<Color>,
    /// Radius of a fresh trail dot.
    pub dot_radius: f32,
    /// Pointer counts as moving for this long after a move event.
    pub idle_ms: Millis,
    /// Duration of the click ripple.
    pub ripple_ms: Millis,
    /// Show the flickering "01"/"10" ornament while moving.
    pub binary_ornament: bool,
    /// Spawn and draw trail dots.
    pub trail_enabled: bool,
    /// Draw the large soft glow under everything else.
    pub ambient_glow: bool,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            color: Color::from_rgba8(0x22, 0xd3, 0xee, 0xff),
            ring_color: Color::from_rgba8(0x60, 0xa5, 0xfa, 0xff),
            ripple_color: Color::from_rgba8(0x4a, 0xde, 0x80, 0xff),
            glow_color: Color::from_rgba8(0x3b, 0x82, 0xf6, 0xff),
            trail_colors: vec![
                Color::from_rgba8(0x60, 0xa5, 0xfa, 0xff),
                Color::from_rgba8(0x4a, 0xde, 0x80, 0xff),
            ],
            dot_radius: 4.0,
            idle_ms: 150,
            ripple_ms: 600,
            binary_ornament: true,
            trail_enabled: true,
            ambient_glow: true,
        }
    }
}

impl CursorConfig {
    /// Core, ring and click ripple in a single color; no trail, glow or
    /// ornament.
    pub fn smooth(color: Color) -> Self {
        Self {
            color,
            ring_color: color,
            ripple_color: color,
            glow_color: color,
            binary_ornament: false,
            trail_enabled: false,
            ambient_glow: false,
            ..Self::default()
        }
    }
}

/// A value that approaches its target with exponential ease-out, reaching
/// ~99% of the way within `duration_ms`.
#[derive(Debug, Clone, Copy)]
struct Eased {
    value: f32,
    duration_ms: f32,
}

impl Eased {
    fn new(value: f32, duration_ms: f32) -> Self {
        Self { value, duration_ms }
    }

    fn step(&mut self, target: f32, dt: Millis) -> f32 {
        if self.duration_ms <= 0.0 {
            self.value = target;
        } else {
            let k = 1.0 - (-(dt as f32) * 4.6 / self.duration_ms).exp();
            self.value += (target - self.value) * k;
        }
        self.value
    }
}

/// Cubic ease-out on `0..=1`.
#[inline]
fn ease_out(t: f32) -> f32 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}

/// Pointer-following highlight and its trail.
#[derive(Debug, Clone)]
pub struct CursorEffect {
    config: CursorConfig,
    trail: TrailStore,
    pointer: Option<Vec2>,
    clicking: bool,
    pressed_at: Millis,
    last_move: Option<Millis>,
    last_frame: Option<Millis>,
    core_scale: Eased,
    ring_scale: Eased,
    ring_opacity: Eased,
    glow_scale: Eased,
    glow_opacity: Eased,
}

impl CursorEffect {
    pub fn new(config: CursorConfig, trail: TrailConfig) -> Self {
        let palette_len = config.trail_colors.len();
        Self {
            config,
            trail: TrailStore::new(trail, palette_len),
            pointer: None,
            clicking: false,
            pressed_at: 0,
            last_move: None,
            last_frame: None,
            core_scale: Eased::new(1.0, 100.0),
            ring_scale: Eased::new(1.0, 200.0),
            ring_opacity: Eased::new(0.3, 200.0),
            glow_scale: Eased::new(0.8, 400.0),
            glow_opacity: Eased::new(0.05, 400.0),
        }
    }

    pub fn config(&self) -> &CursorConfig {
        &self.config
    }

    pub fn trail(&self) -> &TrailStore {
        &self.trail
    }

    /// Last known pointer position.
    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer
    }

    /// Record a pointer move and, with the trail enabled, spawn a trail
    /// particle there. Returns the spawned particle.
    ///
    /// Events with non-finite coordinates are ignored.
    pub fn pointer_moved(&mut self, position: Vec2, now: Millis) -> Option<TrailParticle> {
        if !position.is_finite() {
            log::trace!("ignoring pointer move with non-finite position {position:?}");
            return None;
        }
        self.pointer = Some(position);
        self.last_move = Some(now);
        self.config
            .trail_enabled
            .then(|| self.trail.spawn(position, now))
    }

    pub fn pointer_down(&mut self, now: Millis) {
        self.clicking = true;
        self.pressed_at = now;
    }

    pub fn pointer_up(&mut self) {
        self.clicking = false;
    }

    pub fn is_clicking(&self) -> bool {
        self.clicking
    }

    /// Whether a move event arrived within the idle window.
    pub fn is_moving(&self, now: Millis) -> bool {
        self.last_move
            .is_some_and(|t| now.saturating_sub(t) < self.config.idle_ms)
    }

    /// Drop expired trail particles.
    pub fn sweep(&mut self, now: Millis) -> usize {
        self.trail.sweep(now)
    }

    /// Target scale of the core dot for the current state.
    pub fn core_target(&self, now: Millis) -> f32 {
        if self.clicking {
            1.5
        } else if self.is_moving(now) {
            1.2
        } else {
            1.0
        }
    }

    /// Draw one frame. Does nothing until the pointer has been seen.
    pub fn draw<S, R>(&mut self, surface: &mut S, now: Millis, rng: &mut R)
    where
        S: Surface + ?Sized,
        R: Rng + ?Sized,
    {
        let dt = self
            .last_frame
            .map_or(0, |last| now.saturating_sub(last));
        self.last_frame = Some(now);

        let moving = self.is_moving(now);
        let core_scale = self.core_scale.step(self.core_target(now), dt);
        let ring_scale = self.ring_scale.step(if moving { 1.3 } else { 1.0 }, dt);
        let ring_opacity = self.ring_opacity.step(if moving { 0.6 } else { 0.3 }, dt);
        let glow_scale = self.glow_scale.step(if moving { 1.2 } else { 0.8 }, dt);
        let glow_opacity = self.glow_opacity.step(if moving { 0.15 } else { 0.05 }, dt);

        let Some(pointer) = self.pointer else {
            return;
        };

        if self.config.ambient_glow {
            surface.fill_circle(
                pointer,
                GLOW_RADIUS * glow_scale,
                self.config.glow_color.fade(glow_opacity),
            );
        }

        if moving && self.config.binary_ornament {
            let text = if rng.gen::<bool>() { "01" } else { "10" };
            let origin = pointer + ORNAMENT_OFFSET;
            for (i, glyph) in text.chars().enumerate() {
                let at = origin + Vec2::new(i as f32 * ORNAMENT_SIZE * 0.7, 0.0);
                surface.draw_glyph(glyph, at, ORNAMENT_SIZE, self.config.ripple_color.fade(0.7));
            }
        }

        if self.config.trail_enabled {
            self.draw_trail(surface, now);
        }

        if self.clicking {
            let t = now.saturating_sub(self.pressed_at) as f32 / self.config.ripple_ms.max(1) as f32;
            let e = ease_out(t);
            let opacity = 1.0 - e;
            if opacity > 0.0 {
                surface.stroke_circle(
                    pointer,
                    RIPPLE_RADIUS * RIPPLE_MAX_SCALE * e,
                    2.0,
                    self.config.ripple_color.fade(0.6 * opacity),
                );
            }
        }

        // Outer ring: faint fill plus border
        let ring_radius = RING_RADIUS * ring_scale;
        surface.fill_circle(pointer, ring_radius, self.config.ring_color.fade(0.1 * ring_opacity));
        surface.stroke_circle(pointer, ring_radius, 1.0, self.config.ring_color.fade(0.4 * ring_opacity));

        // Core with its shadow
        let core_radius = CORE_RADIUS * core_scale;
        surface.fill_circle(pointer, core_radius * 2.0, self.config.color.fade(0.2));
        surface.fill_circle(pointer, core_radius, self.config.color);
    }

    fn draw_trail<S: Surface + ?Sized>(&self, surface: &mut S, now: Millis) {
        let palette = &self.config.trail_colors;
        for sample in self.trail.render(now) {
            if sample.opacity <= 0.0 {
                continue;
            }
            let color = palette
                .get(sample.color_index)
                .copied()
                .unwrap_or(Color::WHITE);
            let radius = self.config.dot_radius * sample.scale;
            surface.fill_circle(sample.position, radius * 2.0, color.fade(0.35 * sample.opacity));
            surface.fill_circle(sample.position, radius, color.fade(sample.opacity));
        }
    }
}
