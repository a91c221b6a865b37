//! Meteor shower: streaks crossing the viewport diagonally on a loop.
//!
//! Meteors are generated once per viewport size. Each one waits for its start
//! delay, then repeats a linear flight from its start position towards the
//! lower left, fading in over the first third of the flight and out over the
//! last third.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::surface::Surface;
use crate::time::Millis;
use crate::trail::sanitize;

/// Meteor shower settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeteorConfig {
    pub enabled: bool,
    pub count: usize,
    pub colors: Vec<Color>,
    /// Color of the outer glow for non-white meteors.
    pub glow_color: Color,
    /// Flight duration range, milliseconds.
    pub min_duration_ms: Millis,
    pub max_duration_ms: Millis,
    /// Upper bound of the random start delay, milliseconds.
    pub max_delay_ms: Millis,
}

impl Default for MeteorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 20,
            colors: vec![
                Color::WHITE,
                Color::from_rgba8(0x00, 0xff, 0xff, 0xff),
                Color::from_rgba8(0x00, 0x99, 0xff, 0xff),
                Color::WHITE,
                Color::from_rgba8(0x00, 0xcc, 0xff, 0xff),
            ],
            glow_color: Color::from_rgba8(0x00, 0xff, 0xff, 0xff),
            min_duration_ms: 3000,
            max_duration_ms: 5000,
            max_delay_ms: 5000,
        }
    }
}

/// One meteor's fixed parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Meteor {
    pub start: Vec2,
    /// Total displacement over one flight.
    pub travel: Vec2,
    /// Head radius in pixels.
    pub size: f32,
    /// Tail direction in degrees.
    pub angle: f32,
    pub color: Color,
    pub delay_ms: Millis,
    pub duration_ms: Millis,
}

/// Where a meteor is at some instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeteorState {
    pub position: Vec2,
    pub opacity: f32,
}

impl Meteor {
    /// Position and opacity `elapsed_ms` after the shower started, or `None`
    /// while still waiting for the start delay.
    pub fn state_at(&self, elapsed_ms: Millis) -> Option<MeteorState> {
        let since = elapsed_ms.checked_sub(self.delay_ms)?;
        let duration = self.duration_ms.max(1);
        let t = (since % duration) as f32 / duration as f32;
        Some(MeteorState {
            position: self.start + self.travel * t,
            opacity: keyframe_opacity(t),
        })
    }
}

/// Opacity keyframes `[0, 1, 1, 0]` spaced evenly over one flight.
pub fn keyframe_opacity(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 1.0 / 3.0 {
        t * 3.0
    } else if t < 2.0 / 3.0 {
        1.0
    } else {
        (1.0 - t) * 3.0
    }
}

/// A generated set of meteors for one viewport.
#[derive(Debug, Clone, Default)]
pub struct MeteorShower {
    meteors: Vec<Meteor>,
    glow_color: Color,
}

impl MeteorShower {
    /// Generate `config.count` meteors for a `width` x `height` viewport.
    ///
    /// Generated values are validated; anything non-finite becomes zero.
    pub fn generate<R: Rng + ?Sized>(config: &MeteorConfig, width: u32, height: u32, rng: &mut R) -> Self {
        let (w, h) = (width as f32, height as f32);
        let max_duration = config.max_duration_ms;
        let min_duration = config.min_duration_ms.min(max_duration);

        let meteors = (0..config.count)
            .map(|_| {
                let color = if config.colors.is_empty() {
                    Color::WHITE
                } else {
                    config.colors[rng.gen_range(0..config.colors.len())]
                };
                Meteor {
                    start: Vec2::new(sanitize(rng.gen::<f32>() * w), sanitize(rng.gen::<f32>() * h)),
                    travel: Vec2::new(-w * 1.5, h * 1.5),
                    size: sanitize(1.0 + rng.gen::<f32>() * 2.0),
                    angle: sanitize(rng.gen::<f32>() * 360.0),
                    color,
                    delay_ms: rng.gen_range(0..=config.max_delay_ms),
                    duration_ms: if min_duration < max_duration {
                        rng.gen_range(min_duration..max_duration)
                    } else {
                        min_duration
                    },
                }
            })
            .collect();

        Self {
            meteors,
            glow_color: config.glow_color,
        }
    }

    pub fn meteors(&self) -> &[Meteor] {
        &self.meteors
    }

    pub fn len(&self) -> usize {
        self.meteors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meteors.is_empty()
    }

    /// Draw every visible meteor.
    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S, elapsed_ms: Millis) {
        for meteor in &self.meteors {
            let Some(state) = meteor.state_at(elapsed_ms) else {
                continue;
            };
            if state.opacity <= 0.0 {
                continue;
            }

            let glow = if meteor.color == Color::WHITE {
                Color::WHITE
            } else {
                self.glow_color
            };
            surface.fill_circle(state.position, meteor.size * 3.0, glow.fade(0.25 * state.opacity));

            let tail_len = 20.0 + meteor.size * 10.0;
            let dir = Vec2::from_angle(meteor.angle.to_radians());
            surface.draw_line(
                state.position,
                state.position + dir * tail_len,
                1.0,
                meteor.color.fade(0.6 * state.opacity),
            );

            surface.fill_circle(state.position, meteor.size, meteor.color.fade(state.opacity));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::DrawList;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn meteor() -> Meteor {
        Meteor {
            start: Vec2::new(300.0, 100.0),
            travel: Vec2::new(-600.0, 450.0),
            size: 2.0,
            angle: 45.0,
            color: Color::WHITE,
            delay_ms: 1000,
            duration_ms: 3000,
        }
    }

    #[test]
    fn test_waits_for_delay() {
        assert!(meteor().state_at(999).is_none());
        let s = meteor().state_at(1000).unwrap();
        assert_eq!(s.position, Vec2::new(300.0, 100.0));
        assert_eq!(s.opacity, 0.0);
    }

    #[test]
    fn test_linear_flight_and_loop() {
        let s = meteor().state_at(1000 + 1500).unwrap();
        assert_eq!(s.position, Vec2::new(0.0, 325.0));
        assert_eq!(s.opacity, 1.0);

        // One full loop later it is back at the same place
        let again = meteor().state_at(1000 + 1500 + 3000).unwrap();
        assert_eq!(again, s);
    }

    #[test]
    fn test_keyframes() {
        assert_eq!(keyframe_opacity(0.0), 0.0);
        assert!((keyframe_opacity(1.0 / 6.0) - 0.5).abs() < 1e-6);
        assert_eq!(keyframe_opacity(0.5), 1.0);
        assert!((keyframe_opacity(5.0 / 6.0) - 0.5).abs() < 1e-5);
        assert_eq!(keyframe_opacity(1.0), 0.0);
    }

    #[test]
    fn test_generation_respects_ranges() {
        let config = MeteorConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let shower = MeteorShower::generate(&config, 1280, 720, &mut rng);
        assert_eq!(shower.len(), 20);
        for m in shower.meteors() {
            assert!(m.start.x >= 0.0 && m.start.x < 1280.0);
            assert!(m.start.y >= 0.0 && m.start.y < 720.0);
            assert!(m.size >= 1.0 && m.size < 3.0);
            assert!(m.delay_ms <= 5000);
            assert!(m.duration_ms >= 3000 && m.duration_ms < 5000);
            assert_eq!(m.travel, Vec2::new(-1920.0, 1080.0));
            assert!(config.colors.contains(&m.color));
        }
    }

    #[test]
    fn test_generation_with_extreme_durations() {
        let config = MeteorConfig {
            count: 4,
            min_duration_ms: Millis::MAX,
            max_duration_ms: Millis::MAX,
            max_delay_ms: Millis::MAX,
            ..MeteorConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let shower = MeteorShower::generate(&config, 640, 480, &mut rng);
        assert_eq!(shower.len(), 4);
        assert!(shower.meteors().iter().all(|m| m.duration_ms == Millis::MAX));

        // Equal bounds pick that duration
        let config = MeteorConfig {
            min_duration_ms: 4000,
            max_duration_ms: 4000,
            ..MeteorConfig::default()
        };
        let shower = MeteorShower::generate(&config, 640, 480, &mut rng);
        assert!(shower.meteors().iter().all(|m| m.duration_ms == 4000));
    }

    #[test]
    fn test_draw_skips_pending_meteors() {
        let shower = MeteorShower {
            meteors: vec![meteor()],
            glow_color: Color::WHITE,
        };
        let mut list = DrawList::new(640, 480);
        shower.draw(&mut list, 500);
        assert!(list.commands().is_empty());

        shower.draw(&mut list, 2500);
        // glow, tail, head
        assert_eq!(list.commands().len(), 3);
    }
}
