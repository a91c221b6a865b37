//! Cursor-trail particle store.
//!
//! Particles are spawned on pointer movement and never move afterwards; all
//! visual change comes from their age. Two independent mechanisms bound the
//! store:
//!
//! | Mechanism | When | Effect |
//! |-----------|------|--------|
//! | Retention cap | every [`TrailStore::spawn`] | keep only the newest `capacity` particles |
//! | Age sweep | every [`TrailStore::sweep`] (100 ms timer) | drop particles with `age >= max_age_ms` |
//!
//! Decay is derived on demand by [`TrailStore::render`]:
//!
//! ```text
//! opacity = max(0, 1 - age / fade_ms)
//! scale   = max(min_scale, 1 - age / shrink_ms)
//! ```

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::time::Millis;

/// Trail store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Particles retained at insertion time.
    pub capacity: usize,
    /// Age at which `sweep` removes a particle.
    pub max_age_ms: Millis,
    /// Age at which opacity reaches zero.
    pub fade_ms: Millis,
    /// Age at which scale reaches `min_scale`.
    pub shrink_ms: Millis,
    /// Lower bound for scale.
    pub min_scale: f32,
    /// Cadence of the sweep timer.
    pub sweep_interval_ms: Millis,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            capacity: 9,
            max_age_ms: 1000,
            fade_ms: 800,
            shrink_ms: 600,
            min_scale: 0.2,
            sweep_interval_ms: 100,
        }
    }
}

/// A trail dot. Position and spawn time never change after creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailParticle {
    pub id: u64,
    pub position: Vec2,
    pub spawn_time: Millis,
}

impl TrailParticle {
    /// Age at `now`, zero if `now` precedes the spawn.
    #[inline]
    pub fn age(&self, now: Millis) -> Millis {
        now.saturating_sub(self.spawn_time)
    }
}

/// A particle paired with its decay values at some instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSample {
    pub id: u64,
    pub position: Vec2,
    pub opacity: f32,
    pub scale: f32,
    /// Index into the trail palette.
    pub color_index: usize,
}

/// Opacity for a particle of `age`; 1 at birth, 0 from `fade_ms` on.
pub fn opacity_at(age: Millis, fade_ms: Millis) -> f32 {
    if fade_ms == 0 {
        return if age == 0 { 1.0 } else { 0.0 };
    }
    (1.0 - age as f32 / fade_ms as f32).max(0.0)
}

/// Scale for a particle of `age`; 1 at birth, never below `min_scale`.
pub fn scale_at(age: Millis, shrink_ms: Millis, min_scale: f32) -> f32 {
    if shrink_ms == 0 {
        return if age == 0 { 1.0 } else { min_scale };
    }
    (1.0 - age as f32 / shrink_ms as f32).max(min_scale)
}

/// Replace a non-finite coordinate with zero.
#[inline]
pub fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Replace non-finite components of a point with zero.
#[inline]
pub fn sanitize_point(p: Vec2) -> Vec2 {
    Vec2::new(sanitize(p.x), sanitize(p.y))
}

/// Capped, time-ordered collection of trail particles (oldest first).
#[derive(Debug, Clone)]
pub struct TrailStore {
    config: TrailConfig,
    particles: VecDeque<TrailParticle>,
    next_id: u64,
    palette_len: usize,
}

impl TrailStore {
    /// Create an empty store cycling through `palette_len` colors.
    pub fn new(config: TrailConfig, palette_len: usize) -> Self {
        Self {
            particles: VecDeque::with_capacity(config.capacity.min(256) + 1),
            config,
            next_id: 0,
            palette_len: palette_len.max(1),
        }
    }

    pub fn config(&self) -> &TrailConfig {
        &self.config
    }

    /// Append a particle at `position`, then drop the oldest ones beyond the
    /// retention cap. Non-finite coordinates are replaced with zero.
    pub fn spawn(&mut self, position: Vec2, now: Millis) -> TrailParticle {
        let particle = TrailParticle {
            id: self.next_id,
            position: sanitize_point(position),
            spawn_time: now,
        };
        self.next_id += 1;

        self.particles.push_back(particle);
        while self.particles.len() > self.config.capacity {
            self.particles.pop_front();
        }
        particle
    }

    /// Remove every particle whose age at `now` reached `max_age_ms`.
    /// Returns how many were removed.
    pub fn sweep(&mut self, now: Millis) -> usize {
        let before = self.particles.len();
        let max_age = self.config.max_age_ms;
        self.particles.retain(|p| p.age(now) < max_age);
        before - self.particles.len()
    }

    /// Live particles paired with their decay at `now`, oldest first.
    ///
    /// The iterator borrows the store and can be cloned to walk it again.
    pub fn render(&self, now: Millis) -> Render<'_> {
        Render {
            inner: self.particles.iter().enumerate(),
            now,
            config: &self.config,
            palette_len: self.palette_len,
        }
    }

    /// Stored particles, oldest first.
    pub fn particles(&self) -> impl Iterator<Item = &TrailParticle> + '_ {
        self.particles.iter()
    }

    pub fn newest(&self) -> Option<&TrailParticle> {
        self.particles.back()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

/// Iterator returned by [`TrailStore::render`].
#[derive(Clone)]
pub struct Render<'a> {
    inner: std::iter::Enumerate<std::collections::vec_deque::Iter<'a, TrailParticle>>,
    now: Millis,
    config: &'a TrailConfig,
    palette_len: usize,
}

impl Iterator for Render<'_> {
    type Item = TrailSample;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, p) = self.inner.next()?;
        let age = p.age(self.now);
        Some(TrailSample {
            id: p.id,
            position: p.position,
            opacity: opacity_at(age, self.config.fade_ms),
            scale: scale_at(age, self.config.shrink_ms, self.config.min_scale),
            color_index: index % self.palette_len,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Render<'_> {}
