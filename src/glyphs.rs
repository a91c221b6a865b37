//! Glyph sets and font rasterization for the rain effect.
//!
//! Characters are outlined with `ab_glyph` from an ordered list of faces; each
//! character uses the first face that maps it. The embedded face (DejaVu Sans
//! Mono) covers the ASCII half of [`MATRIX_CHARS`]. Katakana need a second
//! face: either one configured with `rain.font_path` or one of the common
//! system CJK fonts, picked up when present. Characters no face maps draw
//! nothing.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use ab_glyph::{point, Font, FontArc, OutlinedGlyph, PxScale, ScaleFont};
use glam::Vec2;

use crate::error::ConfigError;

/// Characters used for the matrix rain: upper-case ASCII, digits 1-9, a few
/// symbols and the katakana syllabary.
pub const MATRIX_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ123456789@#$%^&*()\
アイウエオカキクケコサシスセソタチツテトナニヌネノハヒフヘホマミムメモヤユヨラリルレロワヲン";

/// DejaVu Sans Mono (Bitstream Vera license, see `assets/`).
const EMBEDDED_FONT: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Faces with katakana tried after the embedded one, when installed.
const SYSTEM_FALLBACKS: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
    "/System/Library/Fonts/Hiragino Sans GB.ttc",
    "C:\\Windows\\Fonts\\msgothic.ttc",
];

/// Split a character set string into a glyph table.
pub fn charset(chars: &str) -> Vec<char> {
    chars.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Ordered font faces used to draw glyphs.
#[derive(Clone, Default)]
pub struct GlyphFont {
    faces: Vec<FontArc>,
}

impl GlyphFont {
    /// The embedded face alone.
    pub fn embedded() -> Self {
        let faces = match FontArc::try_from_slice(EMBEDDED_FONT) {
            Ok(face) => vec![face],
            Err(err) => {
                log::error!("embedded font failed to load: {err}");
                Vec::new()
            }
        };
        Self { faces }
    }

    /// Embedded face, then the face at `path`, then installed system
    /// fallbacks.
    pub fn with_fallback(path: &Path) -> Result<Self, ConfigError> {
        let mut font = Self::embedded();
        font.push_file(path)?;
        font.push_system_fallbacks();
        Ok(font)
    }

    /// Embedded face plus installed system fallbacks, loaded once per
    /// process.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<GlyphFont>> = OnceLock::new();
        SHARED
            .get_or_init(|| {
                let mut font = Self::embedded();
                font.push_system_fallbacks();
                Arc::new(font)
            })
            .clone()
    }

    /// Append the face stored at `path` (TrueType, OpenType or the first face
    /// of a collection).
    pub fn push_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let font_error = |reason: String| ConfigError::Font {
            path: path.to_path_buf(),
            reason,
        };
        let bytes = fs::read(path).map_err(|e| font_error(e.to_string()))?;
        let face = FontArc::try_from_vec(bytes).map_err(|e| font_error(e.to_string()))?;
        log::debug!("loaded font face {}", path.display());
        self.faces.push(face);
        Ok(())
    }

    fn push_system_fallbacks(&mut self) {
        for path in SYSTEM_FALLBACKS {
            let path = Path::new(path);
            if path.exists() {
                if let Err(err) = self.push_file(path) {
                    log::warn!("skipping system font: {err}");
                }
            }
        }
    }

    /// Number of faces.
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Whether some face maps `glyph`.
    pub fn covers(&self, glyph: char) -> bool {
        self.face_for(glyph).is_some()
    }

    fn face_for(&self, glyph: char) -> Option<&FontArc> {
        self.faces.iter().find(|face| face.glyph_id(glyph).0 != 0)
    }

    /// Outline of `glyph` at `size` pixels, centred horizontally in a
    /// `size`-wide cell whose baseline-left corner is `origin`.
    ///
    /// `None` for unmapped characters and for glyphs without an outline
    /// (whitespace).
    pub fn outline(&self, glyph: char, origin: Vec2, size: f32) -> Option<OutlinedGlyph> {
        let face = self.face_for(glyph)?;
        let scale = PxScale::from(size);
        let id = face.glyph_id(glyph);
        let advance = face.as_scaled(scale).h_advance(id);
        let x = origin.x + ((size - advance) * 0.5).max(0.0);
        face.outline_glyph(id.with_scale_and_position(scale, point(x, origin.y)))
    }
}

impl fmt::Debug for GlyphFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlyphFont")
            .field("faces", &self.faces.len())
            .finish()
    }
}
