//! The effect engine: one owned instance wiring effects to the frame driver.
//!
//! An [`Engine`] holds every piece of effect state in a [`Scene`] and owns the
//! [`FrameDriver`] and [`Listeners`] that update it. Nothing is global, so
//! several engines can coexist and tests can drive one with a manual clock.
//!
//! Rendering uses three canvases of viewport size:
//!
//! - **background**: the glyph rain draws here and fades it; it is never
//!   cleared between ticks.
//! - **overlay**: cleared every display frame, then the starfield, meteors and
//!   the cursor draw on it.
//! - **frame**: background with the overlay blended on top, handed to the
//!   presenter.
//!
//! # Lifecycle
//!
//! ```ignore
//! let mut engine = Engine::new(EngineConfig::default(), StdRng::seed_from_u64(1), 800, 600)?;
//! engine.attach_surface(800, 600);
//! engine.start();
//!
//! // event loop
//! engine.handle_event(InputEvent::PointerMoved { position }, now);
//! engine.poll(now);
//! engine.frame(now);
//! present(engine.frame_canvas());
//!
//! engine.stop();
//! ```

use std::fmt;
use std::sync::Arc;

use rand::Rng;

use crate::color::Color;
use crate::config::EngineConfig;
use crate::cursor::CursorEffect;
use crate::driver::{FrameDriver, TickHandle};
use crate::error::ConfigError;
use crate::glyphs::GlyphFont;
use crate::input::{EventKind, InputEvent, ListenerHandle, Listeners};
use crate::meteors::{MeteorConfig, MeteorShower};
use crate::rain::GlyphRain;
use crate::starfield::Starfield;
use crate::surface::{Canvas, Surface};
use crate::time::Millis;
use crate::trail::TrailStore;

// ============================================================================
// Scene
// ============================================================================

/// The three raster layers.
#[derive(Clone)]
pub struct Layers {
    pub background: Canvas,
    pub overlay: Canvas,
    pub frame: Canvas,
}

impl Layers {
    fn new(width: u32, height: u32, background: Color, font: &Arc<GlyphFont>) -> Self {
        let canvas = || Canvas::new(width, height).with_font(font.clone());
        let mut layers = Self {
            background: canvas(),
            overlay: canvas(),
            frame: canvas(),
        };
        layers.background.clear(background);
        layers.frame.clear(background);
        layers
    }

    fn resize(&mut self, width: u32, height: u32, background: Color) {
        let font = self.background.font().clone();
        *self = Self::new(width, height, background, &font);
    }
}

/// Effect state updated by the engine's timers and listeners.
pub struct Scene<R> {
    layers: Option<Layers>,
    background: Color,
    font: Arc<GlyphFont>,
    starfield: Option<Starfield>,
    rain: GlyphRain,
    rain_enabled: bool,
    cursor: CursorEffect,
    cursor_enabled: bool,
    meteor_config: MeteorConfig,
    meteors: Option<MeteorShower>,
    /// Time of the first display frame; meteor flights are timed from here.
    epoch: Option<Millis>,
    last_frame: Option<Millis>,
    viewport: (u32, u32),
    rng: R,
}

impl<R: Rng> Scene<R> {
    fn new(config: &EngineConfig, font: Arc<GlyphFont>, mut rng: R, width: u32, height: u32) -> Self {
        let starfield = config
            .starfield
            .enabled
            .then(|| Starfield::generate(&config.starfield, &mut rng));
        let meteors = config
            .meteors
            .enabled
            .then(|| MeteorShower::generate(&config.meteors, width, height, &mut rng));
        Self {
            layers: None,
            background: config.background,
            font,
            starfield,
            rain: GlyphRain::new(config.rain.clone(), config.background, width, height),
            rain_enabled: config.rain.enabled,
            cursor: CursorEffect::new(config.cursor.clone(), config.trail.clone()),
            cursor_enabled: config.cursor.enabled,
            meteor_config: config.meteors.clone(),
            meteors,
            epoch: None,
            last_frame: None,
            viewport: (width, height),
            rng,
        }
    }

    pub fn layers(&self) -> Option<&Layers> {
        self.layers.as_ref()
    }

    pub fn rain(&self) -> &GlyphRain {
        &self.rain
    }

    pub fn cursor(&self) -> &CursorEffect {
        &self.cursor
    }

    pub fn trail(&self) -> &TrailStore {
        self.cursor.trail()
    }

    pub fn meteors(&self) -> Option<&MeteorShower> {
        self.meteors.as_ref()
    }

    pub fn starfield(&self) -> Option<&Starfield> {
        self.starfield.as_ref()
    }

    /// Font the layers draw glyphs with.
    pub fn font(&self) -> &Arc<GlyphFont> {
        &self.font
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    fn tick_rain(&mut self) {
        let background = self.layers.as_mut().map(|layers| &mut layers.background);
        self.rain.tick(background, &mut self.rng);
    }

    fn sweep(&mut self, now: Millis) {
        let removed = self.cursor.sweep(now);
        if removed > 0 {
            log::trace!("swept {removed} trail particles");
        }
    }

    fn render_overlay(&mut self, now: Millis) {
        let Some(layers) = self.layers.as_mut() else {
            return;
        };
        let epoch = *self.epoch.get_or_insert(now);
        let dt = self.last_frame.map_or(0, |last| now.saturating_sub(last));
        self.last_frame = Some(now);

        layers.overlay.clear(Color::TRANSPARENT);
        if let Some(stars) = self.starfield.as_mut() {
            stars.advance(dt);
            stars.draw(&mut layers.overlay);
        }
        if let Some(meteors) = &self.meteors {
            meteors.draw(&mut layers.overlay, now.saturating_sub(epoch));
        }
        if self.cursor_enabled {
            self.cursor.draw(&mut layers.overlay, now, &mut self.rng);
        }

        layers.frame.copy_from(&layers.background);
        layers.frame.composite(&layers.overlay);
    }

    fn resize(&mut self, width: u32, height: u32) {
        log::debug!(
            "viewport resized {}x{} -> {width}x{height}",
            self.viewport.0,
            self.viewport.1
        );
        self.viewport = (width, height);
        if let Some(layers) = self.layers.as_mut() {
            layers.resize(width, height, self.background);
        }
        self.rain.resize(width, height);
        if self.meteor_config.enabled {
            self.meteors = Some(MeteorShower::generate(&self.meteor_config, width, height, &mut self.rng));
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// An owned effect engine instance.
pub struct Engine<R> {
    config: EngineConfig,
    scene: Scene<R>,
    driver: FrameDriver<Scene<R>>,
    listeners: Listeners<Scene<R>>,
    timers: Vec<TickHandle>,
    subscriptions: Vec<ListenerHandle>,
}

impl<R: Rng + 'static> Engine<R> {
    /// Create a stopped engine for a `width` x `height` viewport.
    ///
    /// Fails if `config` does not validate or its font cannot be loaded.
    pub fn new(config: EngineConfig, rng: R, width: u32, height: u32) -> Result<Self, ConfigError> {
        config.validate()?;
        let font = match &config.rain.font_path {
            Some(path) => Arc::new(GlyphFont::with_fallback(path)?),
            None => GlyphFont::shared(),
        };
        let scene = Scene::new(&config, font, rng, width, height);
        Ok(Self {
            config,
            scene,
            driver: FrameDriver::new(),
            listeners: Listeners::new(),
            timers: Vec::new(),
            subscriptions: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene<R> {
        &self.scene
    }

    pub fn is_running(&self) -> bool {
        !self.timers.is_empty()
    }

    pub fn has_surface(&self) -> bool {
        self.scene.layers.is_some()
    }

    /// Register timers and listeners. Calling it on a running engine does
    /// nothing.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        if self.scene.rain_enabled {
            self.timers
                .push(self.driver.start(self.config.rain.interval_ms, |scene, _| scene.tick_rain()));
        }
        self.timers.push(
            self.driver
                .start(self.config.trail.sweep_interval_ms, |scene, now| scene.sweep(now)),
        );
        self.timers
            .push(self.driver.start_display_synced(|scene, now| scene.render_overlay(now)));

        if self.scene.cursor_enabled {
            self.subscriptions
                .push(self.listeners.register(EventKind::PointerMove, |scene, event, now| {
                    if let InputEvent::PointerMoved { position } = event {
                        scene.cursor.pointer_moved(*position, now);
                    }
                }));
            self.subscriptions
                .push(self.listeners.register(EventKind::PointerButton, |scene, event, now| {
                    match event {
                        InputEvent::PointerDown => scene.cursor.pointer_down(now),
                        InputEvent::PointerUp => scene.cursor.pointer_up(),
                        _ => {}
                    }
                }));
        }
        self.subscriptions
            .push(self.listeners.register(EventKind::Resize, |scene, event, _| {
                if let InputEvent::Resized { width, height } = *event {
                    scene.resize(width, height);
                }
            }));

        log::info!(
            "engine started: {} timers, {} listeners, viewport {}x{}",
            self.driver.len(),
            self.listeners.len(),
            self.scene.viewport.0,
            self.scene.viewport.1
        );
    }

    /// Cancel every timer and remove every listener. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if !self.is_running() && self.subscriptions.is_empty() {
            return;
        }
        for handle in self.timers.drain(..) {
            self.driver.stop(handle);
        }
        for handle in self.subscriptions.drain(..) {
            self.listeners.deregister(handle);
        }
        log::info!("engine stopped");
    }

    /// Provide drawing layers of the given size.
    pub fn attach_surface(&mut self, width: u32, height: u32) {
        log::info!("surface attached ({width}x{height})");
        self.scene.layers = Some(Layers::new(
            width,
            height,
            self.scene.background,
            &self.scene.font,
        ));
        if (width, height) != self.scene.viewport {
            self.scene.resize(width, height);
        }
    }

    /// Drop the drawing layers. Ticks keep running but draw nothing.
    pub fn detach_surface(&mut self) {
        if self.scene.layers.take().is_some() {
            log::info!("surface detached");
        }
    }

    /// Deliver an input event to the registered listeners.
    pub fn handle_event(&mut self, event: InputEvent, now: Millis) {
        self.driver.set_now(now);
        self.listeners.dispatch(&mut self.scene, &event, now);
    }

    /// Fire due fixed-interval timers. Returns how many fired.
    pub fn poll(&mut self, now: Millis) -> usize {
        self.driver.poll(&mut self.scene, now)
    }

    /// Run the display-synced render. Returns how many callbacks fired.
    pub fn frame(&mut self, now: Millis) -> usize {
        self.driver.frame(&mut self.scene, now)
    }

    /// When the next fixed-interval timer is due.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.driver.next_deadline()
    }

    /// Whether the host should keep requesting display frames.
    pub fn wants_redraw(&self) -> bool {
        self.has_surface() && self.driver.has_display_synced()
    }

    /// The composed frame, if a surface is attached.
    pub fn frame_canvas(&self) -> Option<&Canvas> {
        self.scene.layers.as_ref().map(|layers| &layers.frame)
    }
}

impl<R> fmt::Debug for Engine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("viewport", &self.scene.viewport)
            .field("surface", &self.scene.layers.is_some())
            .field("timers", &self.timers.len())
            .field("listeners", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine(width: u32, height: u32) -> Engine<StdRng> {
        Engine::new(EngineConfig::default(), StdRng::seed_from_u64(5), width, height).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.rain.cell_size = 0;
        assert!(Engine::new(config, StdRng::seed_from_u64(1), 100, 100).is_err());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut e = engine(200, 100);
        e.start();
        let timers = e.driver.len();
        let listeners = e.listeners.len();
        assert_eq!(timers, 3);
        assert_eq!(listeners, 3);

        e.start();
        assert_eq!(e.driver.len(), timers);
        assert_eq!(e.listeners.len(), listeners);
    }

    #[test]
    fn test_stop_removes_everything() {
        let mut e = engine(200, 100);
        e.start();
        e.stop();
        assert!(e.driver.is_empty());
        assert!(e.listeners.is_empty());
        assert!(!e.is_running());

        e.stop();
        e.handle_event(
            InputEvent::PointerMoved {
                position: Vec2::new(3.0, 4.0),
            },
            10,
        );
        assert!(e.scene().trail().is_empty());
    }

    #[test]
    fn test_restart_after_stop() {
        let mut e = engine(200, 100);
        e.start();
        e.stop();
        e.start();
        assert!(e.is_running());
        assert_eq!(e.driver.len(), 3);
    }

    #[test]
    fn test_pointer_moves_spawn_trail() {
        let mut e = engine(200, 100);
        e.start();
        for i in 0..3 {
            e.handle_event(
                InputEvent::PointerMoved {
                    position: Vec2::splat(i as f32),
                },
                i,
            );
        }
        assert_eq!(e.scene().trail().len(), 3);

        e.handle_event(InputEvent::PointerDown, 5);
        assert!(e.scene().cursor().is_clicking());
        e.handle_event(InputEvent::PointerUp, 6);
        assert!(!e.scene().cursor().is_clicking());
    }

    #[test]
    fn test_sweep_timer_expires_trail() {
        let mut e = engine(200, 100);
        e.start();
        e.handle_event(
            InputEvent::PointerMoved {
                position: Vec2::new(10.0, 10.0),
            },
            0,
        );
        for now in (0..=1100).step_by(10) {
            e.poll(now);
        }
        assert!(e.scene().trail().is_empty());
    }

    #[test]
    fn test_detached_ticks_are_noops() {
        let mut e = engine(140, 100);
        e.start();
        for now in (0..=500).step_by(10) {
            e.poll(now);
            e.frame(now);
        }
        assert!(e.scene().rain().heads().iter().all(|h| *h == 0));
        assert!(e.frame_canvas().is_none());
        assert!(!e.wants_redraw());
    }

    #[test]
    fn test_attached_rain_advances() {
        let mut e = engine(140, 100);
        e.attach_surface(140, 100);
        e.start();
        e.poll(50);
        assert!(e.scene().rain().heads().iter().all(|h| *h == 1));
        assert!(e.wants_redraw());
    }

    #[test]
    fn test_frame_draws_cursor_over_background() {
        let mut config = EngineConfig::default();
        config.rain.enabled = false;
        config.meteors.enabled = false;
        config.starfield.enabled = false;
        let mut e = Engine::new(config, StdRng::seed_from_u64(2), 64, 64).unwrap();
        e.attach_surface(64, 64);
        e.start();

        e.frame(0);
        let blank = e.frame_canvas().unwrap().pixel(32, 32).unwrap();
        assert_eq!(blank, [0, 0, 0, 255]);

        e.handle_event(
            InputEvent::PointerMoved {
                position: Vec2::new(32.0, 32.0),
            },
            16,
        );
        e.frame(16);
        let lit = e.frame_canvas().unwrap().pixel(32, 32).unwrap();
        assert_ne!(lit, [0, 0, 0, 255]);
    }

    #[test]
    fn test_resize_event_rebuilds_layers() {
        let mut e = engine(800, 600);
        e.attach_surface(800, 600);
        e.start();
        assert_eq!(e.scene().rain().columns(), 57);

        e.handle_event(
            InputEvent::Resized {
                width: 400,
                height: 300,
            },
            0,
        );
        assert_eq!(e.scene().rain().columns(), 28);
        assert_eq!(e.scene().viewport(), (400, 300));
        let frame = e.frame_canvas().unwrap();
        assert_eq!((frame.width(), frame.height()), (400, 300));
    }

    #[test]
    fn test_disabled_meteors_not_generated() {
        let mut config = EngineConfig::default();
        config.meteors.enabled = false;
        let e = Engine::new(config, StdRng::seed_from_u64(2), 64, 64).unwrap();
        assert!(e.scene().meteors().is_none());
    }

    #[test]
    fn test_extreme_durations_rejected_before_use() {
        let mut config = EngineConfig::default();
        config.meteors.min_duration_ms = Millis::MAX;
        config.meteors.max_duration_ms = Millis::MAX;
        assert!(Engine::new(config, StdRng::seed_from_u64(1), 100, 100).is_err());

        let mut config = EngineConfig::default();
        config.rain.interval_ms = Millis::MAX;
        assert!(Engine::new(config, StdRng::seed_from_u64(1), 100, 100).is_err());
    }

    #[test]
    fn test_longest_interval_starts_and_polls() {
        let mut config = EngineConfig::default();
        config.rain.interval_ms = crate::config::MAX_DURATION_MS;
        config.meteors.min_duration_ms = crate::config::MAX_DURATION_MS;
        config.meteors.max_duration_ms = crate::config::MAX_DURATION_MS;
        let mut e = Engine::new(config, StdRng::seed_from_u64(1), 140, 100).unwrap();
        e.attach_surface(140, 100);
        e.start();
        e.poll(Millis::MAX - 1);
        e.frame(Millis::MAX);
        assert!(e.scene().rain().heads().iter().all(|h| *h == 1));
    }

    #[test]
    fn test_starfield_turns_with_display_frames() {
        let mut config = EngineConfig::default();
        config.starfield.count = 300;
        let mut e = Engine::new(config, StdRng::seed_from_u64(6), 160, 120).unwrap();
        assert_eq!(e.scene().starfield().unwrap().points().len(), 300);

        e.attach_surface(160, 120);
        e.start();
        e.frame(1000);
        assert_eq!(e.scene().starfield().unwrap().rotation(), Vec2::ZERO);
        e.frame(2000);
        let rotation = e.scene().starfield().unwrap().rotation();
        assert!((rotation.x + 0.1).abs() < 1e-6);
        assert!((rotation.y + 1.0 / 15.0).abs() < 1e-6);

        // Resizing keeps the same stars
        let before = e.scene().starfield().unwrap().points().to_vec();
        e.handle_event(InputEvent::Resized { width: 80, height: 60 }, 2100);
        assert_eq!(e.scene().starfield().unwrap().points(), &before[..]);
    }

    #[test]
    fn test_stars_light_the_overlay() {
        let mut config = EngineConfig::default();
        config.rain.enabled = false;
        config.meteors.enabled = false;
        config.cursor.enabled = false;
        let mut e = Engine::new(config, StdRng::seed_from_u64(9), 200, 150).unwrap();
        e.attach_surface(200, 150);
        e.start();
        e.frame(0);

        let frame = e.frame_canvas().unwrap();
        let lit = frame
            .as_bytes()
            .chunks(4)
            .filter(|px| px[..3] != [0, 0, 0])
            .count();
        assert!(lit > 50, "{lit} star pixels");

        let mut config = EngineConfig::default();
        config.starfield.enabled = false;
        let e = Engine::new(config, StdRng::seed_from_u64(9), 200, 150).unwrap();
        assert!(e.scene().starfield().is_none());
    }

    #[test]
    fn test_missing_font_file_is_config_error() {
        let mut config = EngineConfig::default();
        config.rain.font_path = Some("/definitely/not/a/font.ttf".into());
        let err = Engine::new(config, StdRng::seed_from_u64(1), 100, 100).unwrap_err();
        assert!(matches!(err, ConfigError::Font { .. }));
    }
}
