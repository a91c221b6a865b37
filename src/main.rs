use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use glyphtrail::{app, EngineConfig, HeadlessRun};

/// Matrix glyph rain with a glowing pointer trail.
#[derive(Debug, Parser)]
#[command(name = "glyphtrail", version, about)]
struct Args {
    /// JSON config file; missing fields use defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the random generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Viewport width in pixels.
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Viewport height in pixels.
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Render without a window and write the last frame to --output.
    #[arg(long)]
    headless: bool,

    /// Frames to simulate in headless mode.
    #[arg(long, default_value_t = 180)]
    frames: u32,

    /// Simulated milliseconds per headless frame.
    #[arg(long, default_value_t = 16)]
    step_ms: u64,

    /// PNG written in headless mode.
    #[arg(short, long, default_value = "glyphtrail.png")]
    output: PathBuf,
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .filter_module("wgpu_core", log::LevelFilter::Warn)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if args.headless {
        HeadlessRun::new(config, args.width, args.height)
            .with_seed(args.seed)
            .with_frames(args.frames)
            .with_step_ms(args.step_ms)
            .render_to(&args.output)?;
    } else {
        app::run(config, args.seed, args.width, args.height)?;
    }

    Ok(())
}
