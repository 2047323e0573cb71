//! Map raster: loaded once, read-only afterwards.

use crate::error::RenderError;
use image::{DynamicImage, ImageFormat, RgbaImage};
use rewardmap_core::{RewardSite, staging_path};
use std::fs;
use std::path::{Path, PathBuf};
use tiny_skia::{Color, ColorU8, Pixmap};
use tracing::info;

/// Base map in premultiplied RGBA. Drawing always happens on a
/// [`canvas`](MapImage::canvas) copy, never on the map itself.
#[derive(Debug, Clone)]
pub struct MapImage {
    pixmap: Pixmap,
    source: Option<PathBuf>,
}

impl MapImage {
    pub fn open(path: &Path) -> Result<Self, RenderError> {
        let rgba = image::open(path)
            .map_err(|source| RenderError::MapLoad {
                path: path.to_path_buf(),
                source,
            })?
            .into_rgba8();
        let mut map = Self::from_rgba(rgba.width(), rgba.height(), rgba.as_raw())?;
        map.source = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            width = map.width(),
            height = map.height(),
            "loaded map"
        );
        Ok(map)
    }

    /// Builds a map from straight (non-premultiplied) RGBA bytes.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self, RenderError> {
        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Pixmap { width, height })?;
        for (dst, px) in pixmap.pixels_mut().iter_mut().zip(rgba.chunks_exact(4)) {
            *dst = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        }
        Ok(Self {
            pixmap,
            source: None,
        })
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Result<Self, RenderError> {
        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Pixmap { width, height })?;
        pixmap.fill(color);
        Ok(Self {
            pixmap,
            source: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn contains(&self, site: RewardSite) -> bool {
        site.within(self.width(), self.height())
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Fresh copy of the map to draw on.
    pub fn canvas(&self) -> Pixmap {
        self.pixmap.clone()
    }
}

pub fn to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, px) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = px.demultiply();
        dst.0 = [c.red(), c.green(), c.blue(), c.alpha()];
    }
    out
}

/// Writes `pixmap` as an RGB image, format chosen by the extension of
/// `path`. Goes through a staging file so a failed write leaves nothing.
pub fn save_snapshot(pixmap: &Pixmap, path: &Path) -> Result<(), RenderError> {
    let snapshot_error = |source| RenderError::Snapshot {
        path: path.to_path_buf(),
        source,
    };
    let format = ImageFormat::from_path(path).map_err(snapshot_error)?;
    let rgb = DynamicImage::ImageRgba8(to_rgba_image(pixmap)).to_rgb8();

    let staging = staging_path(path);
    if let Err(source) = rgb.save_with_format(&staging, format) {
        let _ = fs::remove_file(&staging);
        return Err(snapshot_error(source));
    }
    fs::rename(&staging, path).map_err(|source| {
        let _ = fs::remove_file(&staging);
        RenderError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    info!(path = %path.display(), "saved snapshot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_loads_from_disk_with_its_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.png");
        RgbaImage::from_pixel(40, 30, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let map = MapImage::open(&path).unwrap();
        assert_eq!((map.width(), map.height()), (40, 30));
        assert_eq!(map.source(), Some(path.as_path()));
        let px = map.pixmap().pixel(5, 5).unwrap();
        assert_eq!((px.red(), px.green(), px.blue()), (10, 20, 30));
        assert!(map.contains(RewardSite::new(39, 29)));
        assert!(!map.contains(RewardSite::new(40, 0)));
    }

    #[test]
    fn missing_map_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MapImage::open(&dir.path().join("absent.pgm")).unwrap_err();
        assert!(matches!(err, RenderError::MapLoad { .. }));
    }

    #[test]
    fn snapshot_round_trips_through_tiff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.tif");
        let map = MapImage::filled(16, 8, Color::from_rgba8(200, 0, 0, 255)).unwrap();

        save_snapshot(map.pixmap(), &path).unwrap();
        let back = image::open(&path).unwrap().into_rgb8();

        assert_eq!(back.dimensions(), (16, 8));
        assert_eq!(back.get_pixel(3, 3).0, [200, 0, 0]);
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn snapshot_into_missing_folder_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone").join("snap.tif");
        let map = MapImage::filled(4, 4, Color::WHITE).unwrap();

        assert!(save_snapshot(map.pixmap(), &path).is_err());
        assert!(!path.exists());
    }
}
