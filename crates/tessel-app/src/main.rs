// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use tessel_core::{init_tracing, terminate};
use tessel_platform::PlatformWindow;
use tessel_render::{FrameOutcome, FrameScheduler, SystemClock, WindowHost};
use tessel_render_vk::{
    BackendOptions, DeviceContext, DeviceOptions, GeometryStore, VkBackend, Vertex,
};
use tracing::{debug, info};

mod config;
mod error;
mod shaders;

use config::{load_cfg, AppCfg, PresentModeCfg};
use error::AppError;
use shaders::load_shaders;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file; missing means defaults
    #[arg(long, default_value = "tessel.toml")]
    config: PathBuf,
    /// Frames the CPU may record ahead of the GPU
    #[arg(long)]
    frames_in_flight: Option<usize>,
    /// Enable the Khronos validation layer
    #[arg(long)]
    validation: bool,
    #[arg(long, value_enum)]
    present_mode: Option<PresentModeCfg>,
}

const QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new([-0.5, -0.5], [1.0, 0.0, 0.0]),
    Vertex::new([0.5, -0.5], [0.0, 1.0, 0.0]),
    Vertex::new([0.5, 0.5], [0.0, 0.0, 1.0]),
    Vertex::new([-0.5, 0.5], [1.0, 1.0, 1.0]),
];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

fn apply_overrides(cfg: &mut AppCfg, args: &Args) {
    if let Some(n) = args.frames_in_flight {
        cfg.render.frames_in_flight = n;
    }
    if args.validation {
        cfg.render.validation = true;
    }
    if let Some(mode) = args.present_mode {
        cfg.render.present_mode = mode;
    }
}

fn run(cfg: &AppCfg) -> Result<(), AppError> {
    let shaders = load_shaders(&cfg.shaders)?;
    let mut window = PlatformWindow::new(&cfg.window.title, cfg.window.width, cfg.window.height)
        .map_err(AppError::Window)?;

    let ctx = DeviceContext::new(
        &window,
        &window,
        &DeviceOptions {
            app_name: cfg.window.title.clone(),
            validation: cfg.render.validation,
            prefer_discrete: cfg.render.prefer_discrete,
        },
    )?;
    let geometry = GeometryStore::upload(&ctx, &QUAD_VERTICES, &QUAD_INDICES)?;
    let backend = VkBackend::new(
        &ctx,
        geometry,
        shaders,
        BackendOptions {
            present: cfg.render.present_mode.into(),
            clear_color: cfg.render.clear_color,
        },
    )?;
    let mut scheduler = FrameScheduler::new(
        backend,
        SystemClock::new(),
        cfg.render.frames_in_flight,
        &mut window,
    )?;

    let mut frames = 0u32;
    let mut last_report = Instant::now();
    loop {
        window.pump_events();
        if window.close_requested() {
            break;
        }
        match scheduler.draw_frame(&mut window)? {
            FrameOutcome::Presented { .. } => frames = frames.saturating_add(1),
            FrameOutcome::Rebuilt(_) => {}
            FrameOutcome::Closing => break,
        }
        if last_report.elapsed() >= Duration::from_secs(1) {
            debug!(
                "fps ~ {frames} ({} frames submitted)",
                scheduler.frames_submitted()
            );
            frames = 0;
            last_report = Instant::now();
        }
    }

    scheduler.finish()?;
    info!(
        "exiting after {} frames ({} in flight) on {}",
        scheduler.frames_submitted(),
        scheduler.frames_in_flight(),
        ctx.device_name()
    );
    Ok(())
}

fn main() {
    let args = Args::parse();
    let mut cfg = match load_cfg(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing(None);
            terminate(&AppError::Config(e));
        }
    };
    apply_overrides(&mut cfg, &args);
    init_tracing(cfg.render.log_filter.as_deref());

    if let Err(e) = run(&cfg) {
        terminate(&e);
    }
}
