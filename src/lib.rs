//! # glyphtrail
//!
//! Pointer-trail and glyph-rain effects for a 2D canvas, with an explicit
//! frame driver and no global state.
//!
//! An [`Engine`] owns everything: the effect state, the timers that update it
//! and the input listeners that feed it. Time is always passed in as
//! milliseconds, so the same engine runs under a winit window, a headless
//! loop or a unit test.
//!
//! ## Quick Start
//!
//! ```ignore
//! use glyphtrail::prelude::*;
//! use rand::SeedableRng;
//!
//! let mut engine = Engine::new(EngineConfig::default(), StdRng::seed_from_u64(1), 800, 600)?;
//! engine.attach_surface(800, 600);
//! engine.start();
//!
//! let clock = ManualClock::default();
//! for _ in 0..60 {
//!     let now = clock.advance(16);
//!     engine.handle_event(InputEvent::PointerMoved { position: Vec2::new(400.0, 300.0) }, now);
//!     engine.poll(now);
//!     engine.frame(now);
//! }
//! engine.frame_canvas().unwrap().save_png("frame.png")?;
//! ```
//!
//! ## Effects
//!
//! | Effect | Layer | Cadence |
//! |--------|-------|---------|
//! | [`GlyphRain`] | background | fixed interval (50 ms) |
//! | [`CursorEffect`] + [`TrailStore`] | overlay | display frame, swept every 100 ms |
//! | [`Starfield`] | overlay | display frame |
//! | [`MeteorShower`] | overlay | display frame |
//!
//! ## Running
//!
//! [`app::run`] opens a window and presents frames through wgpu.
//! [`HeadlessRun`] simulates a pointer path and writes the last frame to a PNG.

pub mod app;
pub mod color;
pub mod config;
pub mod cursor;
pub mod driver;
pub mod engine;
pub mod error;
pub mod glyphs;
pub mod gpu;
pub mod headless;
pub mod input;
pub mod meteors;
pub mod rain;
pub mod starfield;
pub mod surface;
pub mod time;
pub mod trail;

pub use color::Color;
pub use config::EngineConfig;
pub use cursor::{CursorConfig, CursorEffect};
pub use driver::{Cadence, FrameDriver, TickHandle};
pub use engine::{Engine, Layers, Scene};
pub use error::{ConfigError, GpuError, RunError};
pub use glam::Vec2;
pub use glyphs::GlyphFont;
pub use headless::HeadlessRun;
pub use input::{EventKind, InputEvent, ListenerHandle, Listeners};
pub use meteors::{Meteor, MeteorConfig, MeteorShower};
pub use rain::{GlyphRain, RainConfig};
pub use starfield::{Starfield, StarfieldConfig};
pub use surface::{Canvas, DrawCommand, DrawList, Rect, Surface};
pub use time::{Clock, FrameStats, ManualClock, Millis, SystemClock};
pub use trail::{TrailConfig, TrailParticle, TrailSample, TrailStore};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use glyphtrail::prelude::*;
/// ```
pub mod prelude {
    pub use crate::color::Color;
    pub use crate::config::EngineConfig;
    pub use crate::engine::Engine;
    pub use crate::input::InputEvent;
    pub use crate::surface::{Canvas, DrawList, Surface};
    pub use crate::time::{Clock, ManualClock, Millis, SystemClock};
    pub use crate::Vec2;
    pub use rand::rngs::StdRng;
}
