//! Headless rendering: drive an engine with a simulated clock and write the
//! final frame to a PNG.
//!
//! The pointer follows a Lissajous curve across the viewport so the trail and
//! cursor show up in the output without a real input device.
//!
//! ```ignore
//! let run = HeadlessRun::new(EngineConfig::default(), 640, 360)
//!     .with_seed(7)
//!     .with_frames(120)
//!     .with_step_ms(16);
//! run.render_to("frame.png")?;
//! ```

use std::path::Path;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::RunError;
use crate::input::InputEvent;
use crate::surface::Canvas;
use crate::time::{Clock, ManualClock, Millis};

/// Configuration for a headless render.
#[derive(Debug, Clone)]
pub struct HeadlessRun {
    config: EngineConfig,
    width: u32,
    height: u32,
    seed: u64,
    frames: u32,
    step_ms: Millis,
    pointer: bool,
}

impl HeadlessRun {
    pub fn new(config: EngineConfig, width: u32, height: u32) -> Self {
        Self {
            config,
            width,
            height,
            seed: 0,
            frames: 120,
            step_ms: 16,
            pointer: true,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of display frames to simulate.
    pub fn with_frames(mut self, frames: u32) -> Self {
        self.frames = frames;
        self
    }

    /// Simulated time between frames.
    pub fn with_step_ms(mut self, step_ms: Millis) -> Self {
        self.step_ms = step_ms.max(1);
        self
    }

    /// Enable or disable the scripted pointer.
    pub fn with_pointer(mut self, pointer: bool) -> Self {
        self.pointer = pointer;
        self
    }

    /// Pointer position at simulated time `now`.
    pub fn pointer_at(&self, now: Millis) -> Vec2 {
        let t = now as f32 / 1000.0;
        let center = Vec2::new(self.width as f32, self.height as f32) * 0.5;
        let radius = center * 0.7;
        center + Vec2::new((t * 1.3).sin() * radius.x, (t * 2.1).sin() * radius.y)
    }

    /// Run the simulation and return the last composed frame.
    pub fn render(&self) -> Result<Canvas, RunError> {
        let clock = ManualClock::starting_at(0);
        let mut engine = Engine::new(
            self.config.clone(),
            StdRng::seed_from_u64(self.seed),
            self.width,
            self.height,
        )?;
        engine.attach_surface(self.width, self.height);
        engine.start();

        for _ in 0..self.frames {
            let now = clock.advance(self.step_ms);
            if self.pointer {
                engine.handle_event(
                    InputEvent::PointerMoved {
                        position: self.pointer_at(now),
                    },
                    now,
                );
            }
            engine.poll(now);
            engine.frame(now);
        }

        log::info!(
            "rendered {} frames over {} ms of simulated time",
            self.frames,
            clock.now_ms()
        );

        let frame = engine
            .frame_canvas()
            .cloned()
            .unwrap_or_else(|| Canvas::new(self.width, self.height));
        engine.stop();
        Ok(frame)
    }

    /// Run the simulation and save the last frame as a PNG at `path`.
    pub fn render_to(&self, path: impl AsRef<Path>) -> Result<Canvas, RunError> {
        let path = path.as_ref();
        let frame = self.render()?;
        frame.save_png(path).map_err(|source| RunError::Export {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("wrote {}", path.display());
        Ok(frame)
    }
}
