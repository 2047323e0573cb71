//! Marker and overlay drawing on map canvases.

use crate::map::MapImage;
use crate::text::TextPainter;
use rewardmap_core::RewardSite;
use std::f32::consts::PI;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

/// Sizes and colours of everything drawn over the map.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub site_radius: f32,
    pub site_color: [u8; 4],
    pub label_size: f32,
    pub label_color: [u8; 4],
    pub target_radius: f32,
    pub target_stroke: f32,
    pub target_color: [u8; 4],
    pub time_anchor: (f32, f32),
    pub time_size: f32,
    pub time_color: [u8; 4],
    pub agent_radius: f32,
    pub agent_color: [u8; 4],
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            site_radius: 20.0,
            site_color: RED,
            label_size: 44.0,
            label_color: BLACK,
            target_radius: 50.0,
            target_stroke: 20.0,
            target_color: RED,
            time_anchor: (20.0, 200.0),
            time_size: 88.0,
            time_color: BLACK,
            agent_radius: 30.0,
            agent_color: RED,
        }
    }
}

pub fn elapsed_label(elapsed_secs: f64) -> String {
    format!("Time : {elapsed_secs:.4}")
}

fn paint(color: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba8(color[0], color[1], color[2], color[3]));
    paint.anti_alias = true;
    paint
}

fn text_color(color: [u8; 4]) -> Color {
    Color::from_rgba8(color[0], color[1], color[2], color[3])
}

/// Draws site markers, the trial target, the agent and the elapsed-time
/// readout. Text is skipped when no font is available.
pub struct OverlayPainter {
    style: OverlayStyle,
    text: Option<TextPainter>,
}

impl OverlayPainter {
    pub fn new(style: OverlayStyle, text: Option<TextPainter>) -> Self {
        Self { style, text }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }

    /// Filled disc plus an `(x, y)` label anchored at the site.
    pub fn draw_site_marker(&mut self, pixmap: &mut Pixmap, site: RewardSite) {
        let (x, y) = (site.x as f32, site.y as f32);
        if let Some(circle) = PathBuilder::from_circle(x, y, self.style.site_radius) {
            pixmap.fill_path(
                &circle,
                &paint(self.style.site_color),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
        if let Some(text) = &mut self.text {
            text.draw_text(
                pixmap,
                &site.to_string(),
                x,
                y,
                self.style.label_size,
                text_color(self.style.label_color),
            );
        }
    }

    /// Thick ring around the trial target.
    pub fn draw_target(&self, pixmap: &mut Pixmap, site: RewardSite) {
        let Some(ring) =
            PathBuilder::from_circle(site.x as f32, site.y as f32, self.style.target_radius)
        else {
            return;
        };
        let stroke = Stroke {
            width: self.style.target_stroke,
            ..Default::default()
        };
        pixmap.stroke_path(
            &ring,
            &paint(self.style.target_color),
            &stroke,
            Transform::identity(),
            None,
        );
    }

    /// Five-pointed star at the agent position.
    pub fn draw_agent(&self, pixmap: &mut Pixmap, position: (i32, i32)) {
        let (cx, cy) = (position.0 as f32, position.1 as f32);
        let outer = self.style.agent_radius;
        let inner = outer * 0.4;

        let mut path = PathBuilder::new();
        for i in 0..10 {
            let r = if i % 2 == 0 { outer } else { inner };
            let angle = -PI / 2.0 + i as f32 * PI / 5.0;
            let (px, py) = (cx + r * angle.cos(), cy + r * angle.sin());
            if i == 0 {
                path.move_to(px, py);
            } else {
                path.line_to(px, py);
            }
        }
        path.close();
        if let Some(star) = path.finish() {
            pixmap.fill_path(
                &star,
                &paint(self.style.agent_color),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    pub fn draw_elapsed(&mut self, pixmap: &mut Pixmap, elapsed_secs: f64) {
        let (x, y) = self.style.time_anchor;
        let (size, color) = (self.style.time_size, text_color(self.style.time_color));
        if let Some(text) = &mut self.text {
            text.draw_text(pixmap, &elapsed_label(elapsed_secs), x, y, size, color);
        }
    }

    /// Map with every site marked and labelled.
    pub fn sites_frame(&mut self, map: &MapImage, sites: &[RewardSite]) -> Pixmap {
        let mut canvas = map.canvas();
        for site in sites {
            self.draw_site_marker(&mut canvas, *site);
        }
        canvas
    }

    /// Map with the trial target ringed.
    pub fn target_frame(&self, map: &MapImage, target: RewardSite) -> Pixmap {
        let mut canvas = map.canvas();
        self.draw_target(&mut canvas, target);
        canvas
    }

    /// One tracking tick: target ring, elapsed time and agent marker.
    pub fn tracking_frame(
        &mut self,
        map: &MapImage,
        target: RewardSite,
        elapsed_secs: f64,
        agent: (i32, i32),
    ) -> Pixmap {
        let mut canvas = map.canvas();
        self.draw_target(&mut canvas, target);
        self.draw_elapsed(&mut canvas, elapsed_secs);
        self.draw_agent(&mut canvas, agent);
        canvas
    }
}

impl Default for OverlayPainter {
    fn default() -> Self {
        Self::new(OverlayStyle::default(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white_map() -> MapImage {
        MapImage::filled(400, 300, Color::WHITE).unwrap()
    }

    fn is_red(pixmap: &Pixmap, x: u32, y: u32) -> bool {
        let px = pixmap.pixel(x, y).unwrap().demultiply();
        px.red() > 200 && px.green() < 60 && px.blue() < 60
    }

    #[test]
    fn overlays_never_touch_the_base_map() {
        let map = white_map();
        let before = map.pixmap().data().to_vec();
        let mut painter = OverlayPainter::default();

        for tick in 0..5 {
            let _ = painter.tracking_frame(
                &map,
                RewardSite::new(200, 150),
                tick as f64 * 0.1,
                (100 + tick, 100 + tick),
            );
        }
        let _ = painter.sites_frame(&map, &[RewardSite::new(10, 10)]);
        let _ = painter.target_frame(&map, RewardSite::new(50, 50));

        assert_eq!(map.pixmap().data(), &before[..]);
    }

    #[test]
    fn site_marker_fills_its_centre() {
        let map = white_map();
        let frame = OverlayPainter::default().sites_frame(&map, &[RewardSite::new(100, 80)]);
        assert!(is_red(&frame, 100, 80));
        assert!(!is_red(&frame, 300, 250));
    }

    #[test]
    fn target_ring_is_hollow() {
        let map = white_map();
        let frame = OverlayPainter::default().target_frame(&map, RewardSite::new(200, 150));
        assert!(is_red(&frame, 250, 150));
        assert!(!is_red(&frame, 200, 150));
    }

    #[test]
    fn agent_star_is_drawn_at_position() {
        let map = white_map();
        let mut painter = OverlayPainter::default();
        let frame = painter.tracking_frame(&map, RewardSite::new(50, 50), 0.0, (300, 200));
        assert!(is_red(&frame, 300, 200));
    }

    #[test]
    fn elapsed_label_has_four_decimals() {
        assert_eq!(elapsed_label(1.5), "Time : 1.5000");
    }
}
