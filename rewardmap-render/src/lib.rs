pub mod error;
pub mod map;
pub mod overlay;
pub mod text;

pub use error::RenderError;
pub use map::{MapImage, save_snapshot, to_rgba_image};
pub use overlay::{OverlayPainter, OverlayStyle, elapsed_label};
pub use text::TextPainter;
