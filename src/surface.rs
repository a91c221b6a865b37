//! Drawing targets for the effects.
//!
//! Effects draw through the [`Surface`] trait and never know what sits behind
//! it. Two implementations ship with the crate:
//!
//! - [`Canvas`]: a CPU RGBA8 raster with source-over blending. This is what the
//!   engine's layers are made of and what the GPU presenter uploads.
//! - [`DrawList`]: records every call as a [`DrawCommand`], for hosts that
//!   render styled nodes themselves and for tests.

use std::path::Path;
use std::sync::Arc;

use glam::Vec2;

use crate::color::Color;
use crate::glyphs::GlyphFont;

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle covering a `width` x `height` surface.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }
}

/// A 2D drawing target.
pub trait Surface {
    /// Size in pixels.
    fn size(&self) -> (u32, u32);

    /// Replace every pixel with `color` (no blending).
    fn clear(&mut self, color: Color);

    /// Blend `color` over a rectangle.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Blend a filled, anti-aliased circle.
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);

    /// Blend a circle outline of the given stroke width.
    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Color);

    /// Blend a line segment.
    fn draw_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color);

    /// Draw `glyph` in a `size` x `size` cell whose baseline-left corner is
    /// `origin` (text baseline semantics: the glyph sits above `origin.y`).
    fn draw_glyph(&mut self, glyph: char, origin: Vec2, size: f32, color: Color);

    /// Change the size. Contents are discarded.
    fn resize(&mut self, width: u32, height: u32);
}

// ============================================================================
// Canvas
// ============================================================================

/// CPU raster surface, straight-alpha RGBA8.
///
/// Glyphs are rasterized from the canvas's [`GlyphFont`], by default the
/// process-wide [`GlyphFont::shared`].
#[derive(Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
    font: Arc<GlyphFont>,
}

impl Canvas {
    /// Create a transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0; 4]; (width as usize) * (height as usize)],
            font: GlyphFont::shared(),
        }
    }

    /// Use `font` for glyphs.
    pub fn with_font(mut self, font: Arc<GlyphFont>) -> Self {
        self.font = font;
        self
    }

    pub fn font(&self) -> &Arc<GlyphFont> {
        &self.font
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Pixel at (`x`, `y`), or `None` out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// Blend `top` over this canvas. Sizes must match; a mismatch copies
    /// nothing.
    pub fn composite(&mut self, top: &Canvas) {
        if top.width != self.width || top.height != self.height {
            return;
        }
        for (dst, src) in self.pixels.iter_mut().zip(&top.pixels) {
            if src[3] == 0 {
                continue;
            }
            *dst = blend(*dst, Color::from_rgba8(src[0], src[1], src[2], src[3]), 1.0);
        }
    }

    /// Copy another canvas of the same size.
    pub fn copy_from(&mut self, other: &Canvas) {
        if other.width == self.width && other.height == self.height {
            self.pixels.copy_from_slice(&other.pixels);
        }
    }

    /// Convert to an `image` buffer.
    pub fn to_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_raw(self.width, self.height, self.as_bytes().to_vec())
            .unwrap_or_else(|| image::RgbaImage::new(self.width, self.height))
    }

    /// Write the canvas as a PNG.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        self.to_image().save_with_format(path, image::ImageFormat::Png)
    }

    /// Blend `color` at integer pixel (`x`, `y`) with extra `coverage`.
    #[inline]
    fn plot(&mut self, x: i64, y: i64, color: Color, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let idx = (y as usize) * (self.width as usize) + x as usize;
        self.pixels[idx] = blend(self.pixels[idx], color, coverage);
    }

    /// Integer pixel bounds of a box, clipped to the canvas. Empty when the
    /// box is off-canvas or not finite.
    fn clip(&self, min: Vec2, max: Vec2) -> Option<(i64, i64, i64, i64)> {
        if !(min.is_finite() && max.is_finite()) {
            return None;
        }
        let x0 = (min.x.floor() as i64).max(0);
        let y0 = (min.y.floor() as i64).max(0);
        let x1 = (max.x.ceil() as i64).min(self.width as i64);
        let y1 = (max.y.ceil() as i64).min(self.height as i64);
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("font", &self.font)
            .finish()
    }
}

/// Source-over blend of `src` (scaled by `coverage`) onto `dst`.
fn blend(dst: [u8; 4], src: Color, coverage: f32) -> [u8; 4] {
    let sa = (src.a * coverage).clamp(0.0, 1.0);
    if sa <= 0.0 {
        return dst;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return [0; 4];
    }

    let channel = |s: f32, d: u8| {
        let d = d as f32 / 255.0;
        (s * sa + d * da * (1.0 - sa)) / out_a
    };
    Color::rgba(
        channel(src.r, dst[0]),
        channel(src.g, dst[1]),
        channel(src.b, dst[2]),
        out_a,
    )
    .to_rgba8()
}

impl Surface for Canvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Color) {
        let px = color.to_rgba8();
        self.pixels.fill(px);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let min = Vec2::new(rect.x, rect.y);
        let max = min + Vec2::new(rect.width, rect.height);
        let Some((x0, y0, x1, y1)) = self.clip(min, max) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                self.plot(x, y, color, 1.0);
            }
        }
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        if !(radius > 0.0) {
            return;
        }
        let reach = Vec2::splat(radius + 1.0);
        let Some((x0, y0, x1, y1)) = self.clip(center - reach, center + reach) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let d = (Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center).length();
                let coverage = (radius - d + 0.5).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.plot(x, y, color, coverage);
                }
            }
        }
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Color) {
        if !(radius > 0.0 && width > 0.0) {
            return;
        }
        let half = width * 0.5;
        let reach = Vec2::splat(radius + half + 1.0);
        let Some((x0, y0, x1, y1)) = self.clip(center - reach, center + reach) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let d = (Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center).length();
                let coverage = (half - (d - radius).abs() + 0.5).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.plot(x, y, color, coverage);
                }
            }
        }
    }

    fn draw_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color) {
        if !(width > 0.0) {
            return;
        }
        let half = width * 0.5;
        let reach = Vec2::splat(half + 1.0);
        let Some((x0, y0, x1, y1)) = self.clip(from.min(to) - reach, from.max(to) + reach) else {
            return;
        };
        let seg = to - from;
        let len_sq = seg.length_squared();
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let t = if len_sq > 0.0 {
                    ((p - from).dot(seg) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let d = (p - (from + seg * t)).length();
                let coverage = (half - d + 0.5).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.plot(x, y, color, coverage);
                }
            }
        }
    }

    fn draw_glyph(&mut self, glyph: char, origin: Vec2, size: f32, color: Color) {
        if !(size.is_finite() && size > 0.0) || !origin.is_finite() {
            return;
        }
        let Some(outline) = self.font.outline(glyph, origin, size) else {
            return;
        };
        let bounds = outline.px_bounds();
        let (left, top) = (bounds.min.x as i64, bounds.min.y as i64);
        outline.draw(|x, y, coverage| {
            if coverage > 0.0 {
                self.plot(left + x as i64, top + y as i64, color, coverage);
            }
        });
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![[0; 4]; (width as usize) * (height as usize)];
    }
}

// ============================================================================
// DrawList
// ============================================================================

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    FillRect { rect: Rect, color: Color },
    FillCircle { center: Vec2, radius: f32, color: Color },
    StrokeCircle { center: Vec2, radius: f32, width: f32, color: Color },
    Line { from: Vec2, to: Vec2, width: f32, color: Color },
    Glyph { glyph: char, origin: Vec2, size: f32, color: Color },
}

/// Surface that records draw calls instead of rasterizing them.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    width: u32,
    height: u32,
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the list empty.
    pub fn drain(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Every glyph drawn, in order.
    pub fn glyphs(&self) -> impl Iterator<Item = char> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Glyph { glyph, .. } => Some(*glyph),
            _ => None,
        })
    }
}

impl Surface for DrawList {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.commands.push(DrawCommand::FillCircle { center, radius, color });
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Color) {
        self.commands.push(DrawCommand::StrokeCircle {
            center,
            radius,
            width,
            color,
        });
    }

    fn draw_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            width,
            color,
        });
    }

    fn draw_glyph(&mut self, glyph: char, origin: Vec2, size: f32, color: Color) {
        self.commands.push(DrawCommand::Glyph {
            glyph,
            origin,
            size,
            color,
        });
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.commands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_and_pixel() {
        let mut canvas = Canvas::new(4, 3);
        canvas.clear(Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(canvas.pixel(3, 2), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(4, 0), None);
        assert_eq!(canvas.as_bytes().len(), 4 * 3 * 4);
    }

    #[test]
    fn test_fade_overlay_darkens_gradually() {
        let mut canvas = Canvas::new(2, 2);
        canvas.clear(Color::rgb(0.0, 1.0, 0.0));
        canvas.fill_rect(Rect::full(2, 2), Color::BLACK.with_alpha(0.1));
        let g1 = canvas.pixel(0, 0).unwrap()[1];
        assert!(g1 > 220 && g1 < 235, "g1 = {g1}");

        for _ in 0..40 {
            canvas.fill_rect(Rect::full(2, 2), Color::BLACK.with_alpha(0.1));
        }
        assert!(canvas.pixel(0, 0).unwrap()[1] < 10);
        assert_eq!(canvas.pixel(0, 0).unwrap()[3], 255);
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(Rect::new(-10.0, -10.0, 12.0, 12.0), Color::WHITE);
        assert_eq!(canvas.pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(canvas.pixel(2, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_circle_covers_center_not_corner() {
        let mut canvas = Canvas::new(20, 20);
        canvas.fill_circle(Vec2::new(10.0, 10.0), 4.0, Color::WHITE);
        assert_eq!(canvas.pixel(10, 10).unwrap()[3], 255);
        assert_eq!(canvas.pixel(0, 0).unwrap()[3], 0);
    }

    #[test]
    fn test_non_finite_geometry_is_ignored() {
        let mut canvas = Canvas::new(8, 8);
        canvas.fill_circle(Vec2::new(f32::NAN, 1.0), 3.0, Color::WHITE);
        canvas.draw_line(Vec2::ZERO, Vec2::new(f32::INFINITY, 0.0), 1.0, Color::WHITE);
        canvas.draw_glyph('A', Vec2::new(f32::NAN, 8.0), 8.0, Color::WHITE);
        assert!(canvas.as_bytes().iter().all(|b| *b == 0));
    }

    fn embedded_canvas(width: u32, height: u32) -> Canvas {
        Canvas::new(width, height).with_font(Arc::new(GlyphFont::embedded()))
    }

    fn lit(canvas: &Canvas) -> Vec<(u32, u32)> {
        (0..canvas.height())
            .flat_map(|y| (0..canvas.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| canvas.pixel(x, y).is_some_and(|p| p[3] > 0))
            .collect()
    }

    #[test]
    fn test_glyph_lands_above_baseline() {
        let mut canvas = embedded_canvas(14, 28);
        canvas.draw_glyph('A', Vec2::new(0.0, 14.0), 14.0, Color::WHITE);
        let pixels = lit(&canvas);
        assert!(!pixels.is_empty());
        assert!(pixels.iter().all(|&(_, y)| y < 14));
    }

    #[test]
    fn test_glyph_edges_are_antialiased() {
        let mut canvas = embedded_canvas(32, 32);
        canvas.draw_glyph('@', Vec2::new(0.0, 28.0), 28.0, Color::WHITE);
        let alphas: Vec<u8> = lit(&canvas)
            .into_iter()
            .filter_map(|(x, y)| canvas.pixel(x, y))
            .map(|p| p[3])
            .collect();
        assert!(alphas.iter().any(|a| *a == 255));
        assert!(alphas.iter().any(|a| *a < 255));
    }

    #[test]
    fn test_glyph_shapes_follow_the_font() {
        let draw = |c| {
            let mut canvas = embedded_canvas(20, 24);
            canvas.draw_glyph(c, Vec2::new(0.0, 20.0), 20.0, Color::WHITE);
            lit(&canvas)
        };
        let (bar, w) = (draw('|'), draw('W'));
        assert!(!bar.is_empty());
        // 'W' spans more columns than '|'
        let span = |pixels: &[(u32, u32)]| {
            let xs = pixels.iter().map(|p| p.0);
            xs.clone().max().unwrap_or(0) - xs.min().unwrap_or(0)
        };
        assert!(span(&w) > span(&bar) + 4);
    }

    #[test]
    fn test_unmapped_and_blank_glyphs_draw_nothing() {
        let mut canvas = embedded_canvas(16, 16);
        canvas.draw_glyph(' ', Vec2::new(0.0, 14.0), 14.0, Color::WHITE);
        canvas.draw_glyph('ア', Vec2::new(0.0, 14.0), 14.0, Color::WHITE);
        canvas.draw_glyph('A', Vec2::new(0.0, 14.0), 0.0, Color::WHITE);
        assert!(lit(&canvas).is_empty());
    }

    #[test]
    fn test_resize_keeps_font() {
        let font = Arc::new(GlyphFont::embedded());
        let mut canvas = Canvas::new(4, 4).with_font(font.clone());
        canvas.resize(8, 2);
        assert_eq!((canvas.width(), canvas.height()), (8, 2));
        assert_eq!(canvas.as_bytes().len(), 8 * 2 * 4);
        assert!(Arc::ptr_eq(canvas.font(), &font));
    }

    #[test]
    fn test_composite_over() {
        let mut bottom = Canvas::new(2, 1);
        bottom.clear(Color::BLACK);
        let mut top = Canvas::new(2, 1);
        top.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
        bottom.composite(&top);
        assert_eq!(bottom.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(bottom.pixel(1, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_draw_list_records() {
        let mut list = DrawList::new(100, 50);
        list.draw_glyph('ア', Vec2::new(0.0, 14.0), 14.0, Color::WHITE);
        list.fill_circle(Vec2::ONE, 2.0, Color::WHITE);
        assert_eq!(list.commands().len(), 2);
        assert_eq!(list.glyphs().collect::<Vec<_>>(), vec!['ア']);
        assert_eq!(list.drain().len(), 2);
        assert!(list.commands().is_empty());
    }

    #[test]
    fn test_png_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut canvas = Canvas::new(8, 8);
        canvas.clear(Color::rgb(0.0, 1.0, 0.25));
        canvas.save_png(&path).unwrap();

        let loaded = image::open(&path).unwrap().into_rgba8();
        assert_eq!(loaded.dimensions(), (8, 8));
        assert_eq!(loaded.get_pixel(3, 3).0, [0, 255, 64, 255]);
    }
}
