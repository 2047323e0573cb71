//! Windowed [`DisplaySurface`] backed by winit and pixels.
//!
//! The event loop is pumped from inside `show` and `wait_event` instead of
//! owning the thread, so the marker and trial runner keep their own loops.

use pixels::{Pixels, SurfaceTexture};
use rewardmap_experiment::{DisplaySurface, Gesture, Key, SurfaceError, SurfaceEvent};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tiny_skia::Pixmap;
use tracing::{debug, info};
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);
const DOUBLE_CLICK_SLOP: i32 = 4;

pub struct WinitSurface {
    event_loop: EventLoop<()>,
    state: WindowState,
}

impl WinitSurface {
    pub fn new() -> Result<Self, SurfaceError> {
        let event_loop = EventLoop::new().map_err(SurfaceError::backend)?;
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "display event loop ready"
        );
        Ok(Self {
            event_loop,
            state: WindowState::default(),
        })
    }

    fn pump(&mut self, timeout: Duration) -> Result<(), SurfaceError> {
        if let PumpStatus::Exit(code) = self
            .event_loop
            .pump_app_events(Some(timeout), &mut self.state)
        {
            debug!(code, "event loop exited");
            self.state.close();
        }
        match self.state.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Pumps until `resumed` has created the window and its pixel buffer.
    fn ensure_window(&mut self) -> Result<(), SurfaceError> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.state.pixels.is_none() {
            if self.state.closed {
                return Err(SurfaceError::Closed);
            }
            if Instant::now() >= deadline {
                return Err(SurfaceError::Backend("window was not created in time".into()));
            }
            self.pump(Duration::from_millis(10))?;
        }
        Ok(())
    }
}

impl DisplaySurface for WinitSurface {
    fn show(&mut self, title: &str, frame: &Pixmap) -> Result<(), SurfaceError> {
        if self.state.closed {
            return Err(SurfaceError::Closed);
        }
        self.state.frame_size = PhysicalSize::new(frame.width(), frame.height());
        self.state.title = title.to_string();
        self.ensure_window()?;
        self.state.present(frame)?;
        self.pump(Duration::ZERO)
    }

    fn wait_event(&mut self, timeout: Duration) -> Result<Option<SurfaceEvent>, SurfaceError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.state.events.pop_front() {
                return Ok(Some(event));
            }
            if self.state.closed {
                return Ok(Some(SurfaceEvent::Closed));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            self.pump(remaining)?;
        }
    }

    fn release(&mut self) {
        if let Some(window) = &self.state.window {
            window.set_visible(false);
        }
        self.state.events.clear();
        self.state.last_press = None;
    }
}

struct WindowState {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    frame_size: PhysicalSize<u32>,
    buffer_size: PhysicalSize<u32>,
    title: String,
    cursor: Option<PhysicalPosition<f64>>,
    last_press: Option<(Instant, i32, i32)>,
    events: VecDeque<SurfaceEvent>,
    closed: bool,
    error: Option<SurfaceError>,
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            window: None,
            pixels: None,
            frame_size: PhysicalSize::new(1, 1),
            buffer_size: PhysicalSize::new(0, 0),
            title: String::new(),
            cursor: None,
            last_press: None,
            events: VecDeque::new(),
            closed: false,
            error: None,
        }
    }
}

impl WindowState {
    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), SurfaceError> {
        let attributes = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(self.frame_size);
        let window = event_loop
            .create_window(attributes)
            .map_err(SurfaceError::backend)?;
        let window = Arc::new(window);

        let inner = window.inner_size();
        let texture = SurfaceTexture::new(inner.width, inner.height, window.clone());
        let pixels = Pixels::new(self.frame_size.width, self.frame_size.height, texture)
            .map_err(SurfaceError::backend)?;

        info!(
            width = inner.width,
            height = inner.height,
            scale_factor = window.scale_factor(),
            "window created"
        );
        self.buffer_size = self.frame_size;
        self.pixels = Some(pixels);
        self.window = Some(window);
        Ok(())
    }

    /// Copies `frame` into the pixel buffer and renders it. The buffer is
    /// resized whenever the frame size changes.
    fn present(&mut self, frame: &Pixmap) -> Result<(), SurfaceError> {
        let (Some(window), Some(pixels)) = (&self.window, &mut self.pixels) else {
            return Err(SurfaceError::Backend("window is not open".into()));
        };

        if window.title() != self.title {
            window.set_title(&self.title);
        }
        window.set_visible(true);

        let size = PhysicalSize::new(frame.width(), frame.height());
        if self.buffer_size != size {
            pixels
                .resize_buffer(size.width, size.height)
                .map_err(SurfaceError::backend)?;
            let _ = window.request_inner_size(size);
            self.buffer_size = size;
        }

        for (dst, src) in pixels.frame_mut().chunks_exact_mut(4).zip(frame.pixels()) {
            let color = src.demultiply();
            dst.copy_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
        }
        pixels.render().map_err(SurfaceError::backend)?;
        window.request_redraw();
        Ok(())
    }

    /// Left presses become [`Gesture::Press`], or [`Gesture::DoubleClick`]
    /// when they follow a press close by in time and space. Presses outside
    /// the map are dropped.
    fn pointer_pressed(&mut self) {
        let (Some(pixels), Some(cursor)) = (&self.pixels, self.cursor) else {
            return;
        };
        let Ok((x, y)) = pixels.window_pos_to_pixel((cursor.x as f32, cursor.y as f32)) else {
            return;
        };
        let (x, y) = (x as i32, y as i32);
        let now = Instant::now();

        let gesture = match self.last_press.take() {
            Some((at, px, py))
                if now.duration_since(at) <= DOUBLE_CLICK_WINDOW
                    && (x - px).abs() <= DOUBLE_CLICK_SLOP
                    && (y - py).abs() <= DOUBLE_CLICK_SLOP =>
            {
                Gesture::DoubleClick
            }
            _ => {
                self.last_press = Some((now, x, y));
                Gesture::Press
            }
        };
        self.events.push_back(SurfaceEvent::Pointer { gesture, x, y });
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.events.push_back(SurfaceEvent::Closed);
        }
    }
}

fn map_key(code: KeyCode) -> Key {
    match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::Space => Key::Space,
        KeyCode::Enter | KeyCode::NumpadEnter => Key::Enter,
        _ => Key::Other,
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.create_window(event_loop) {
                self.error = Some(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.close();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed() && !event.repeat =>
            {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.events.push_back(SurfaceEvent::Key(map_key(code)));
                }
            }
            WindowEvent::CursorMoved { position, .. } => self.cursor = Some(position),
            WindowEvent::CursorLeft { .. } => self.cursor = None,
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.pointer_pressed(),
            WindowEvent::Resized(size) => {
                if let Some(pixels) = &mut self.pixels {
                    if let Err(err) = pixels.resize_surface(size.width, size.height) {
                        self.error = Some(SurfaceError::backend(err));
                    }
                }
            }
            _ => {}
        }
    }
}
