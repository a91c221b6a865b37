//! Slowly tumbling starfield drawn behind the other overlay effects.
//!
//! Stars are points sampled uniformly inside a sphere and viewed through a
//! perspective camera sitting on the +z axis. Every frame the sphere turns
//! about its x and y axes; the whole field is tilted about z.
//!
//! Sampling has two fallbacks:
//!
//! - non-finite coordinates coming out of the sampler are replaced with 0;
//! - if the sampler gives up (no point found within its attempt budget), the
//!   whole field is rebuilt on the sphere's surface from spherical
//!   coordinates.

use std::f32::consts::{FRAC_PI_4, TAU};

use glam::{Quat, Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::surface::Surface;
use crate::time::Millis;
use crate::trail::sanitize;

/// Rejection-sampling attempts per star before sampling counts as failed.
const MAX_ATTEMPTS: usize = 32;
/// Points closer to the camera than this are not drawn.
const NEAR: f32 = 0.1;

/// Starfield settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarfieldConfig {
    pub enabled: bool,
    /// Number of stars.
    pub count: usize,
    /// Radius of the star sphere, world units.
    pub radius: f32,
    pub color: Color,
    /// Star diameter in world units at distance 1.
    pub point_size: f32,
    /// Rotation speed about x, radians per second (subtracted).
    pub spin_x: f32,
    /// Rotation speed about y, radians per second (subtracted).
    pub spin_y: f32,
    /// Fixed roll of the whole field about z, radians.
    pub tilt: f32,
    /// Camera distance from the sphere's center.
    pub camera_distance: f32,
    /// Vertical field of view, degrees.
    pub fov_degrees: f32,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 5000,
            radius: 1.5,
            color: Color::from_rgba8(0xff, 0xa0, 0xe0, 0xff),
            point_size: 0.005,
            spin_x: 1.0 / 10.0,
            spin_y: 1.0 / 15.0,
            tilt: FRAC_PI_4,
            camera_distance: 1.0,
            fov_degrees: 75.0,
        }
    }
}

/// Uniform point inside a ball of `radius`, or `None` when rejection
/// sampling keeps missing.
pub fn in_sphere<R: Rng + ?Sized>(rng: &mut R, radius: f32) -> Option<Vec3> {
    (0..MAX_ATTEMPTS).find_map(|_| {
        let p = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        (p.length_squared() <= 1.0).then_some(p * radius)
    })
}

/// Point on the sphere of `radius` from uniformly drawn spherical
/// coordinates.
pub fn on_sphere<R: Rng + ?Sized>(rng: &mut R, radius: f32) -> Vec3 {
    let theta = rng.gen::<f32>() * TAU;
    let phi = (2.0 * rng.gen::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
    radius
        * Vec3::new(
            phi.sin() * theta.cos(),
            phi.sin() * theta.sin(),
            phi.cos(),
        )
}

#[inline]
fn sanitize3(p: Vec3) -> Vec3 {
    Vec3::new(sanitize(p.x), sanitize(p.y), sanitize(p.z))
}

/// A generated starfield and its current rotation.
#[derive(Debug, Clone)]
pub struct Starfield {
    config: StarfieldConfig,
    points: Vec<Vec3>,
    /// Accumulated rotation about x and y, radians.
    rotation: Vec2,
    fell_back: bool,
}

impl Starfield {
    /// Sample `config.count` stars inside the sphere with `rng`.
    pub fn generate<R: Rng + ?Sized>(config: &StarfieldConfig, rng: &mut R) -> Self {
        let radius = config.radius;
        Self::generate_with(config, rng, |rng| in_sphere(rng, radius))
    }

    /// Build the field from `sample`, which returns one star per call or
    /// `None` when it cannot produce one.
    ///
    /// Non-finite coordinates become 0. The first `None` discards everything
    /// sampled so far and fills the field with [`on_sphere`] points instead.
    pub fn generate_with<R, F>(config: &StarfieldConfig, rng: &mut R, mut sample: F) -> Self
    where
        R: Rng + ?Sized,
        F: FnMut(&mut R) -> Option<Vec3>,
    {
        let mut points = Vec::with_capacity(config.count.min(1 << 16));
        let mut fell_back = false;
        for _ in 0..config.count {
            match sample(rng) {
                Some(p) => points.push(sanitize3(p)),
                None => {
                    log::warn!("star sampling failed, falling back to spherical coordinates");
                    fell_back = true;
                    break;
                }
            }
        }

        if fell_back {
            points.clear();
            points.extend((0..config.count).map(|_| sanitize3(on_sphere(rng, config.radius))));
        }

        Self {
            config: config.clone(),
            points,
            rotation: Vec2::ZERO,
            fell_back,
        }
    }

    pub fn config(&self) -> &StarfieldConfig {
        &self.config
    }

    /// Star positions before rotation.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Whether generation used the spherical fallback.
    pub fn fell_back(&self) -> bool {
        self.fell_back
    }

    pub fn rotation(&self) -> Vec2 {
        self.rotation
    }

    /// Turn the field by `dt_ms` worth of spin.
    pub fn advance(&mut self, dt_ms: Millis) {
        let dt = dt_ms as f32 / 1000.0;
        self.rotation -= Vec2::new(self.config.spin_x, self.config.spin_y) * dt;
    }

    /// Rotation applied to every star: the fixed tilt outside, then x, then
    /// y.
    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_z(self.config.tilt)
            * Quat::from_rotation_x(self.rotation.x)
            * Quat::from_rotation_y(self.rotation.y)
    }

    /// Screen position and radius of a world-space point on a `width` x
    /// `height` surface, or `None` when it is behind the near plane or off
    /// screen.
    pub fn project(&self, world: Vec3, width: u32, height: u32) -> Option<(Vec2, f32)> {
        let depth = self.config.camera_distance - world.z;
        if !(depth > NEAR) || width == 0 || height == 0 {
            return None;
        }
        let (w, h) = (width as f32, height as f32);
        let focal = 1.0 / (self.config.fov_degrees.to_radians() * 0.5).tan();
        let ndc = Vec2::new(world.x * focal * h / w, world.y * focal) / depth;
        if !(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0) {
            return None;
        }
        let screen = Vec2::new((ndc.x + 1.0) * 0.5 * w, (1.0 - ndc.y) * 0.5 * h);
        let radius = (self.config.point_size * focal * h * 0.25 / depth).max(0.5);
        Some((screen, radius))
    }

    /// Draw every visible star.
    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S) {
        let (width, height) = surface.size();
        let orientation = self.orientation();
        for point in &self.points {
            if let Some((at, radius)) = self.project(orientation * *point, width, height) {
                surface.fill_circle(at, radius, self.config.color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCommand, DrawList};
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    /// Generator stuck at its maximum output.
    struct Saturated;

    impl RngCore for Saturated {
        fn next_u32(&mut self) -> u32 {
            u32::MAX
        }

        fn next_u64(&mut self) -> u64 {
            u64::MAX
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0xff);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn small(count: usize) -> StarfieldConfig {
        StarfieldConfig {
            count,
            ..StarfieldConfig::default()
        }
    }

    #[test]
    fn test_default_field_fills_the_ball() {
        let config = StarfieldConfig::default();
        let mut rng = StdRng::seed_from_u64(21);
        let field = Starfield::generate(&config, &mut rng);

        assert!(!field.fell_back());
        assert_eq!(field.points().len(), 5000);
        assert!(field.points().iter().all(|p| p.length() <= 1.5 + 1e-4));
        // Uniform in the ball: roughly 1/8 of the stars within half the radius
        let inner = field.points().iter().filter(|p| p.length() < 0.75).count();
        assert!((400..850).contains(&inner), "{inner} inner stars");
    }

    #[test]
    fn test_non_finite_samples_become_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut calls = 0;
        let field = Starfield::generate_with(&small(4), &mut rng, |_| {
            calls += 1;
            Some(match calls {
                1 => Vec3::new(f32::NAN, 0.5, f32::INFINITY),
                2 => Vec3::new(0.25, f32::NEG_INFINITY, f32::NAN),
                _ => Vec3::new(0.1, 0.2, 0.3),
            })
        });

        assert!(!field.fell_back());
        assert_eq!(
            field.points(),
            &[
                Vec3::new(0.0, 0.5, 0.0),
                Vec3::new(0.25, 0.0, 0.0),
                Vec3::new(0.1, 0.2, 0.3),
                Vec3::new(0.1, 0.2, 0.3),
            ]
        );
    }

    #[test]
    fn test_stuck_generator_falls_back_to_sphere_surface() {
        let field = Starfield::generate(&small(50), &mut Saturated);

        assert!(field.fell_back());
        assert_eq!(field.points().len(), 50);
        for p in field.points() {
            assert!(p.is_finite());
            assert!((p.length() - 1.5).abs() < 1e-3, "{p:?}");
        }
    }

    #[test]
    fn test_failure_midway_discards_partial_samples() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut calls = 0;
        let field = Starfield::generate_with(&small(1000), &mut rng, |_| {
            calls += 1;
            (calls < 10).then_some(Vec3::ZERO)
        });

        assert!(field.fell_back());
        assert_eq!(field.points().len(), 1000);
        assert!(field.points().iter().all(|p| (p.length() - 1.5).abs() < 1e-3));

        // Spherical fallback is spread over the whole surface
        let mean = field.points().iter().copied().sum::<Vec3>() / 1000.0;
        assert!(mean.length() < 0.2, "mean {mean:?}");
        let upper = field.points().iter().filter(|p| p.z > 0.0).count();
        assert!((400..600).contains(&upper), "{upper} in upper half");
    }

    #[test]
    fn test_rotation_accumulates_from_frame_time() {
        let mut field = Starfield::generate(&small(1), &mut StdRng::seed_from_u64(0));
        field.advance(1500);
        field.advance(1500);
        let r = field.rotation();
        assert!((r.x + 0.3).abs() < 1e-6, "{r:?}");
        assert!((r.y + 0.2).abs() < 1e-6, "{r:?}");
    }

    #[test]
    fn test_projection_centre_and_culling() {
        let field = Starfield::generate(&small(1), &mut StdRng::seed_from_u64(0));
        let (at, radius) = field.project(Vec3::new(0.0, 0.0, -0.5), 800, 600).unwrap();
        assert!((at - Vec2::new(400.0, 300.0)).length() < 1e-3);
        assert!(radius >= 0.5);

        // Behind the camera and beside the frustum
        assert!(field.project(Vec3::new(0.0, 0.0, 1.2), 800, 600).is_none());
        assert!(field.project(Vec3::new(5.0, 0.0, 0.0), 800, 600).is_none());
        assert!(field.project(Vec3::ZERO, 0, 0).is_none());
    }

    #[test]
    fn test_draw_uses_star_color() {
        let field = Starfield::generate(&small(200), &mut StdRng::seed_from_u64(4));
        let mut list = DrawList::new(320, 200);
        field.draw(&mut list);

        let pink = StarfieldConfig::default().color;
        assert!(!list.commands().is_empty());
        assert!(list.commands().len() <= 200);
        assert!(list
            .commands()
            .iter()
            .all(|c| matches!(c, DrawCommand::FillCircle { color, .. } if *color == pink)));
    }
}
