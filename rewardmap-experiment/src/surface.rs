//! The display seam. Components draw frames and poll input through a
//! [`DisplaySurface`] handle they are given; nothing is process-global.

use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;
use tiny_skia::Pixmap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Press,
    DoubleClick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Space,
    Enter,
    Other,
}

/// Input observed on a surface. Pointer coordinates are map pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Pointer { gesture: Gesture, x: i32, y: i32 },
    Key(Key),
    Closed,
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("display surface was closed")]
    Closed,

    #[error("display backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SurfaceError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        SurfaceError::Backend(Box::new(err))
    }
}

pub trait DisplaySurface {
    /// Presents `frame` in a window titled `title`.
    fn show(&mut self, title: &str, frame: &Pixmap) -> Result<(), SurfaceError>;

    /// Processes pending display events, waiting at most `timeout` for
    /// input. Returns `None` when nothing arrived in time.
    fn wait_event(&mut self, timeout: Duration) -> Result<Option<SurfaceEvent>, SurfaceError>;

    /// Hides whatever is currently shown.
    fn release(&mut self) {}
}

/// Surface without a window: frames are counted and input comes from a
/// script. Real-time mode makes waits actually take their timeout.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    script: VecDeque<SurfaceEvent>,
    realtime: bool,
    frames_shown: usize,
    releases: usize,
    last_title: Option<String>,
    last_frame: Option<Pixmap>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn realtime() -> Self {
        Self {
            realtime: true,
            ..Self::default()
        }
    }

    pub fn with_script(mut self, events: impl IntoIterator<Item = SurfaceEvent>) -> Self {
        self.script.extend(events);
        self
    }

    pub fn push_event(&mut self, event: SurfaceEvent) {
        self.script.push_back(event);
    }

    pub fn frames_shown(&self) -> usize {
        self.frames_shown
    }

    pub fn releases(&self) -> usize {
        self.releases
    }

    pub fn last_title(&self) -> Option<&str> {
        self.last_title.as_deref()
    }

    pub fn last_frame(&self) -> Option<&Pixmap> {
        self.last_frame.as_ref()
    }
}

impl DisplaySurface for HeadlessSurface {
    fn show(&mut self, title: &str, frame: &Pixmap) -> Result<(), SurfaceError> {
        self.frames_shown += 1;
        if self.last_title.as_deref() != Some(title) {
            self.last_title = Some(title.to_string());
        }
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    fn wait_event(&mut self, timeout: Duration) -> Result<Option<SurfaceEvent>, SurfaceError> {
        if let Some(event) = self.script.pop_front() {
            return Ok(Some(event));
        }
        if self.realtime && !timeout.is_zero() {
            std::thread::sleep(timeout);
        }
        Ok(None)
    }

    fn release(&mut self) {
        self.releases += 1;
    }
}
