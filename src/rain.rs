//! Matrix-rain glyph columns.
//!
//! Each column has one head row. Every tick paints a translucent background
//! overlay over the whole surface, draws one random glyph at each head, and
//! moves the heads down. Older glyphs are never erased explicitly; repeated
//! overlays fade them, which is what produces the trails.
//!
//! ```text
//! tick:
//!   fill(surface, background @ fade_alpha)
//!   for each column i:
//!     draw glyph at (i * cell, head[i] * cell)
//!     head[i] += 1
//!     if head[i] * cell > height and random < reset_chance: head[i] = 0
//! ```

use std::path::PathBuf;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::glyphs::{self, MATRIX_CHARS};
use crate::surface::{Rect, Surface};
use crate::time::Millis;

/// Glyph rain settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RainConfig {
    pub enabled: bool,
    /// Glyph cell size in pixels (also the font size).
    pub cell_size: u32,
    /// Tick cadence.
    pub interval_ms: Millis,
    /// Alpha of the background overlay painted every tick.
    pub fade_alpha: f32,
    /// Chance per tick that an off-screen head restarts at the top.
    pub reset_chance: f32,
    pub color: Color,
    /// Characters to pick from.
    pub charset: String,
    /// Font face tried after the embedded one; needed for katakana when no
    /// system CJK font is installed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cell_size: 14,
            interval_ms: 50,
            fade_alpha: 0.1,
            reset_chance: 0.025,
            color: Color::from_rgba8(0x00, 0xff, 0x41, 0xff),
            charset: MATRIX_CHARS.to_string(),
            font_path: None,
        }
    }
}

/// Column count for a canvas `width` wide.
#[inline]
pub fn column_count(width: u32, cell_size: u32) -> usize {
    if cell_size == 0 {
        0
    } else {
        (width / cell_size) as usize
    }
}

/// The glyph rain effect.
#[derive(Debug, Clone)]
pub struct GlyphRain {
    config: RainConfig,
    background: Color,
    chars: Vec<char>,
    heads: Vec<u32>,
    width: u32,
    height: u32,
}

impl GlyphRain {
    /// Create the effect for a `width` x `height` canvas, all heads at row 0.
    pub fn new(config: RainConfig, background: Color, width: u32, height: u32) -> Self {
        let mut chars = glyphs::charset(&config.charset);
        if chars.is_empty() {
            chars = glyphs::charset(MATRIX_CHARS);
        }
        let heads = vec![0; column_count(width, config.cell_size)];
        Self {
            config,
            background,
            chars,
            heads,
            width,
            height,
        }
    }

    pub fn config(&self) -> &RainConfig {
        &self.config
    }

    /// Glyph table selection draws from.
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Current head row of every column.
    pub fn heads(&self) -> &[u32] {
        &self.heads
    }

    pub fn columns(&self) -> usize {
        self.heads.len()
    }

    /// Adopt a new canvas size. Column count is recomputed and every head
    /// restarts at row 0.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.heads.clear();
        self.heads
            .resize(column_count(width, self.config.cell_size), 0);
    }

    /// Pick a glyph uniformly from the set.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> char {
        let index = rng.gen_range(0..self.chars.len());
        self.chars.get(index).copied().unwrap_or(self.chars[0])
    }

    /// Advance the rain by one step, drawing into `surface`.
    ///
    /// Without a surface nothing happens: heads stay where they are.
    pub fn tick<S, R>(&mut self, surface: Option<&mut S>, rng: &mut R)
    where
        S: Surface + ?Sized,
        R: Rng + ?Sized,
    {
        let Some(surface) = surface else {
            return;
        };

        let (width, height) = surface.size();
        surface.fill_rect(
            Rect::full(width, height),
            self.background.with_alpha(self.config.fade_alpha),
        );

        let cell = self.config.cell_size;
        let size = cell as f32;
        for column in 0..self.heads.len() {
            let glyph = self.pick(rng);
            let origin = Vec2::new(column as f32 * size, self.heads[column] as f32 * size);
            surface.draw_glyph(glyph, origin, size, self.config.color);

            let head = &mut self.heads[column];
            *head = head.saturating_add(1);
            if head.saturating_mul(cell) > self.height && rng.gen::<f32>() < self.config.reset_chance {
                *head = 0;
            }
        }
    }
}
