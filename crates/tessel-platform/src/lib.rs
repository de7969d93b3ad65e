// SPDX-License-Identifier: CEPL-1.0
//! `winit` window driven by pumping, so the render loop stays in charge of
//! the thread instead of handing it to `EventLoop::run_app`.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tessel_render::{RenderSize, ResizeFlag, WindowHost};
use tracing::{debug, info};

pub use winit;

use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    error::OsError,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    raw_window_handle::{
        DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
    },
    window::{Window, WindowId},
};

/// How many pumps to allow before giving up on the first `resumed`.
const CREATE_ATTEMPTS: usize = 100;

pub struct PlatformWindow {
    event_loop: EventLoop<()>,
    state: WindowState,
}

struct WindowState {
    title: String,
    size: LogicalSize<u32>,
    window: Option<Window>,
    create_error: Option<OsError>,
    close_requested: bool,
    resize_flag: ResizeFlag,
}

impl WindowState {
    fn on_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                info!("close requested");
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                debug!("resized to {}x{}", size.width, size.height);
                self.resize_flag.set();
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                debug!("scale factor now {scale_factor}");
                self.resize_flag.set();
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(self.size);
        match event_loop.create_window(attrs) {
            Ok(window) => self.window = Some(window),
            Err(e) => self.create_error = Some(e),
        }
    }

    fn window_event(&mut self, _: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.window.as_ref().is_some_and(|w| w.id() == window_id) {
            self.on_event(&event);
        }
    }
}

fn render_size(size: PhysicalSize<u32>) -> RenderSize {
    RenderSize::new(size.width, size.height)
}

impl PlatformWindow {
    /// Opens a window of `width` x `height` logical pixels and pumps until it
    /// exists.
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self> {
        let event_loop = EventLoop::new().context("creating the event loop")?;
        let mut this = Self {
            event_loop,
            state: WindowState {
                title: title.to_owned(),
                size: LogicalSize::new(width, height),
                window: None,
                create_error: None,
                close_requested: false,
                resize_flag: ResizeFlag::new(),
            },
        };

        for _ in 0..CREATE_ATTEMPTS {
            let status = this
                .event_loop
                .pump_app_events(Some(Duration::ZERO), &mut this.state);
            if let Some(e) = this.state.create_error.take() {
                bail!("creating the window: {e}");
            }
            if this.state.window.is_some() {
                info!("window \"{title}\" open at {}", this.framebuffer_size());
                return Ok(this);
            }
            if let PumpStatus::Exit(code) = status {
                bail!("event loop exited with {code} before the window opened");
            }
        }
        bail!("window was not created after {CREATE_ATTEMPTS} event pumps")
    }

    pub fn window(&self) -> Option<&Window> {
        self.state.window.as_ref()
    }

    fn pump(&mut self, timeout: Option<Duration>) {
        let status = self.event_loop.pump_app_events(timeout, &mut self.state);
        if let PumpStatus::Exit(code) = status {
            debug!("event loop exited with {code}");
            self.state.close_requested = true;
        }
    }
}

impl WindowHost for PlatformWindow {
    fn framebuffer_size(&self) -> RenderSize {
        self.window()
            .map(|w| render_size(w.inner_size()))
            .unwrap_or_default()
    }

    fn pump_events(&mut self) {
        self.pump(Some(Duration::ZERO));
    }

    fn wait_events(&mut self) {
        self.pump(None);
    }

    fn close_requested(&self) -> bool {
        self.state.close_requested
    }

    fn resize_flag(&self) -> &ResizeFlag {
        &self.state.resize_flag
    }
}

impl HasWindowHandle for PlatformWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.window().ok_or(HandleError::Unavailable)?.window_handle()
    }
}

impl HasDisplayHandle for PlatformWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.event_loop.display_handle()
    }
}
