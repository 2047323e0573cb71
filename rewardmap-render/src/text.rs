use crate::error::RenderError;
use ab_glyph::{Font, FontVec, Glyph, GlyphId, PxScale, ScaleFont, point};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tiny_skia::{Color, Pixmap, PremultipliedColorU8};
use tracing::debug;

/// Fonts tried by [`TextPainter::discover`], in order.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Clone)]
struct CachedGlyph {
    bitmap: Vec<u8>,
    width: u32,
    height: u32,
    bearing_x: i32,
    bearing_y: i32,
}

#[derive(Hash, Eq, PartialEq, Clone, Copy)]
struct GlyphCacheKey {
    glyph_id: u16,
    scale_bits: u32, // f32 bits for exact scale matching
}

/// Rasterises text onto pixmaps, caching coverage bitmaps per glyph and size.
pub struct TextPainter {
    font: FontVec,
    glyph_cache: HashMap<GlyphCacheKey, CachedGlyph>,
}

impl TextPainter {
    pub fn from_bytes(bytes: Vec<u8>, origin: &Path) -> Result<Self, RenderError> {
        let font = FontVec::try_from_vec(bytes).map_err(|e| RenderError::Font {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            font,
            glyph_cache: HashMap::with_capacity(256),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let bytes = fs::read(path).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(bytes, path)
    }

    /// First usable system font, if any.
    pub fn discover() -> Option<(Self, PathBuf)> {
        FONT_CANDIDATES.iter().map(PathBuf::from).find_map(|path| {
            let painter = Self::from_file(&path).ok()?;
            debug!(font = %path.display(), "using system font");
            Some((painter, path))
        })
    }

    /// Draws `text` with its baseline starting at (`x`, `baseline_y`).
    pub fn draw_text(
        &mut self,
        pixmap: &mut Pixmap,
        text: &str,
        x: f32,
        baseline_y: f32,
        size: f32,
        color: Color,
    ) {
        let w = pixmap.width();
        let h = pixmap.height();
        let scale = PxScale::from(size);

        // Layout, noting which glyphs still need rasterising.
        let (glyphs, misses) = {
            let scaled_font = self.font.as_scaled(scale);
            let mut pen_x = x;
            let mut prev: Option<GlyphId> = None;
            let mut glyphs = Vec::with_capacity(text.len());
            let mut misses = Vec::new();

            for ch in text.chars() {
                let gid = self.font.glyph_id(ch);
                if let Some(prev_gid) = prev {
                    pen_x += scaled_font.kern(prev_gid, gid);
                }
                let key = GlyphCacheKey {
                    glyph_id: gid.0,
                    scale_bits: size.to_bits(),
                };
                if !self.glyph_cache.contains_key(&key) {
                    misses.push((gid, key));
                }
                glyphs.push((point(pen_x, baseline_y), key));
                pen_x += scaled_font.h_advance(gid);
                prev = Some(gid);
            }
            (glyphs, misses)
        };

        for (gid, key) in misses {
            let glyph = Glyph {
                id: gid,
                scale,
                position: point(0.0, 0.0),
            };
            Self::cache_glyph(&mut self.glyph_cache, &self.font, glyph, key);
        }

        let pixels = pixmap.pixels_mut();
        for (origin, key) in glyphs {
            if let Some(cached) = self.glyph_cache.get(&key) {
                blit_glyph(pixels, w, h, origin, cached, color);
            }
        }
    }

    fn cache_glyph(
        cache: &mut HashMap<GlyphCacheKey, CachedGlyph>,
        font: &FontVec,
        glyph: Glyph,
        key: GlyphCacheKey,
    ) {
        let Some(outlined) = font.outline_glyph(glyph) else {
            return;
        };
        let bounds = outlined.px_bounds();
        let w = bounds.width().ceil() as u32;
        let h = bounds.height().ceil() as u32;
        if w == 0 || h == 0 {
            return;
        }
        let mut bitmap = vec![0u8; (w * h) as usize];
        outlined.draw(|x, y, cov| {
            if let Some(cell) = bitmap.get_mut((y * w + x) as usize) {
                *cell = (cov.clamp(0.0, 1.0) * 255.0) as u8;
            }
        });
        cache.insert(
            key,
            CachedGlyph {
                bitmap,
                width: w,
                height: h,
                bearing_x: bounds.min.x.floor() as i32,
                bearing_y: bounds.min.y.floor() as i32,
            },
        );
    }
}

fn blit_glyph(
    pixels: &mut [PremultipliedColorU8],
    w: u32,
    h: u32,
    origin: ab_glyph::Point,
    cached: &CachedGlyph,
    color: Color,
) {
    let glyph_x = origin.x as i32 + cached.bearing_x;
    let glyph_y = origin.y as i32 + cached.bearing_y;
    let (wi, hi) = (w as i32, h as i32);
    let (cr, cg, cb, ca) = (color.red(), color.green(), color.blue(), color.alpha());

    for gy in 0..cached.height as i32 {
        let py = glyph_y + gy;
        if py < 0 || py >= hi {
            continue;
        }
        let src_row = (gy as u32 * cached.width) as usize;
        let dst_row = (py as u32 * w) as usize;

        for gx in 0..cached.width as i32 {
            let px = glyph_x + gx;
            if px < 0 || px >= wi {
                continue;
            }
            let coverage = cached.bitmap[src_row + gx as usize];
            if coverage == 0 {
                continue;
            }

            // Source-over in premultiplied space.
            let alpha = ca * coverage as f32 / 255.0;
            let inv = 1.0 - alpha;
            let dst = &mut pixels[dst_row + px as usize];
            let blend = |src: f32, dst: u8| (src * alpha * 255.0 + dst as f32 * inv) as u8;
            let out_a = (alpha * 255.0 + dst.alpha() as f32 * inv) as u8;
            let out = PremultipliedColorU8::from_rgba(
                blend(cr, dst.red()).min(out_a),
                blend(cg, dst.green()).min(out_a),
                blend(cb, dst.blue()).min(out_a),
                out_a,
            );
            if let Some(out) = out {
                *dst = out;
            }
        }
    }
}
