//! Windowed runner: a winit event loop driving an [`Engine`] and showing its
//! frames through a [`Presenter`].

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::RunError;
use crate::gpu::Presenter;
use crate::input::InputEvent;
use crate::time::{Clock, FrameStats, Millis, SystemClock};

/// How often the frame rate is logged.
const FPS_LOG_INTERVAL: Millis = 5000;

/// Open a window and run the effects until it is closed.
///
/// `width` and `height` are the initial logical window size.
pub fn run(config: EngineConfig, seed: u64, width: u32, height: u32) -> Result<(), RunError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, seed, width, height);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct App {
    config: EngineConfig,
    seed: u64,
    initial_size: (u32, u32),
    window: Option<Arc<Window>>,
    presenter: Option<Presenter>,
    engine: Option<Engine<StdRng>>,
    clock: SystemClock,
    stats: FrameStats,
    last_fps_log: Millis,
    /// Fatal error raised inside the event loop, returned by [`run`].
    error: Option<RunError>,
}

impl App {
    fn new(config: EngineConfig, seed: u64, width: u32, height: u32) -> Self {
        Self {
            config,
            seed,
            initial_size: (width, height),
            window: None,
            presenter: None,
            engine: None,
            clock: SystemClock::new(),
            stats: FrameStats::new(),
            last_fps_log: 0,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), RunError> {
        let (width, height) = self.initial_size;
        let window_attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(width, height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let size = window.inner_size();
        let presenter = pollster::block_on(Presenter::new(window.clone()))?;

        let mut engine = Engine::new(
            self.config.clone(),
            StdRng::seed_from_u64(self.seed),
            size.width,
            size.height,
        )?;
        engine.attach_surface(size.width, size.height);
        engine.start();

        window.request_redraw();
        self.window = Some(window);
        self.presenter = Some(presenter);
        self.engine = Some(engine);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: RunError) {
        log::error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = self.clock.now_ms();
        let (Some(engine), Some(presenter)) = (self.engine.as_mut(), self.presenter.as_mut()) else {
            return;
        };

        engine.frame(now);
        if let Some(canvas) = engine.frame_canvas() {
            match presenter.present(canvas) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    log::debug!("surface lost, reconfiguring");
                    presenter.reconfigure();
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("GPU out of memory");
                    event_loop.exit();
                }
                Err(e) => log::warn!("Render error: {e:?}"),
            }
        }

        self.stats.record(now);
        if now.saturating_sub(self.last_fps_log) >= FPS_LOG_INTERVAL {
            self.last_fps_log = now;
            log::debug!("frame {} fps {:.1}", self.stats.frame(), self.stats.fps());
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.init(event_loop) {
                self.fail(event_loop, err);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let now = self.clock.now_ms();

        match &event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
                return;
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                event_loop.exit();
                return;
            }
            WindowEvent::Resized(size) => {
                if let Some(presenter) = &mut self.presenter {
                    presenter.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                return;
            }
            _ => {}
        }

        if let (Some(engine), Some(input)) = (self.engine.as_mut(), InputEvent::from_window_event(&event)) {
            engine.handle_event(input, now);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        engine.poll(self.clock.now_ms());

        if engine.wants_redraw() {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }

        match engine.next_deadline().and_then(|d| self.clock.instant_at(d)) {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(engine) = self.engine.as_mut() {
            engine.stop();
            engine.detach_surface();
        }
    }
}
