use crate::config::MarkerConfig;
use crate::error::ExperimentError;
use crate::surface::{DisplaySurface, Gesture, SurfaceError, SurfaceEvent};
use rewardmap_core::{RewardSite, SITE_SNAPSHOT_FILE, SITE_TABLE_FILE, SiteTable};
use rewardmap_render::{MapImage, OverlayPainter, save_snapshot};
use std::fs;
use std::path::PathBuf;
use tiny_skia::Pixmap;
use tracing::{info, warn};

pub const MARKER_WINDOW_TITLE: &str = "LocationMap";

/// Files written by [`LocationMarker::persist`].
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSites {
    pub site_table: PathBuf,
    pub snapshot: PathBuf,
    pub sites: SiteTable,
}

/// Turns double-clicks on the map into a list of reward sites.
pub struct LocationMarker {
    map: MapImage,
    annotated: Pixmap,
    sites: SiteTable,
    painter: OverlayPainter,
    config: MarkerConfig,
    output_dir: PathBuf,
}

impl LocationMarker {
    pub fn new(
        map: MapImage,
        output_dir: impl Into<PathBuf>,
        painter: OverlayPainter,
        config: MarkerConfig,
    ) -> Self {
        let annotated = map.canvas();
        Self {
            map,
            annotated,
            sites: SiteTable::new(),
            painter,
            config,
            output_dir: output_dir.into(),
        }
    }

    pub fn sites(&self) -> &SiteTable {
        &self.sites
    }

    /// The map as the operator currently sees it, markers included.
    pub fn annotated(&self) -> &Pixmap {
        &self.annotated
    }

    pub fn map(&self) -> &MapImage {
        &self.map
    }

    /// Records a site for a double-click; any other gesture is ignored.
    /// Returns whether a site was added.
    pub fn mark(&mut self, gesture: Gesture, x: i32, y: i32) -> bool {
        if gesture != Gesture::DoubleClick {
            return false;
        }
        let site = RewardSite::new(x, y);
        if !self.map.contains(site) {
            warn!(%site, "ignoring click outside the map");
            return false;
        }
        self.painter.draw_site_marker(&mut self.annotated, site);
        self.sites.push(site);
        info!(%site, count = self.sites.len(), "marked reward site");
        true
    }

    /// Shows the map until the quit key is pressed, marking sites as the
    /// operator double-clicks. Closing the window aborts marking.
    pub fn run_until_quit<D: DisplaySurface + ?Sized>(
        &mut self,
        surface: &mut D,
    ) -> Result<(), ExperimentError> {
        info!(
            width = self.map.width(),
            height = self.map.height(),
            "double-click to mark reward sites, press {:?} when done",
            self.config.quit_key
        );
        loop {
            surface.show(MARKER_WINDOW_TITLE, &self.annotated)?;
            match surface.wait_event(self.config.refresh)? {
                Some(SurfaceEvent::Pointer { gesture, x, y }) => {
                    self.mark(gesture, x, y);
                }
                Some(SurfaceEvent::Key(key)) if key == self.config.quit_key => break,
                Some(SurfaceEvent::Closed) => return Err(SurfaceError::Closed.into()),
                Some(SurfaceEvent::Key(_)) | None => {}
            }
        }
        surface.release();
        Ok(())
    }

    /// Writes the site table and the annotated snapshot. Either both land
    /// or neither does.
    pub fn persist(self) -> Result<PersistedSites, ExperimentError> {
        if self.sites.is_empty() {
            warn!("no reward sites were marked; the table will be empty");
        }
        info!(count = self.sites.len(), folder = %self.output_dir.display(), "saving reward locations");

        let site_table = self.output_dir.join(SITE_TABLE_FILE);
        let snapshot = self.output_dir.join(SITE_SNAPSHOT_FILE);

        save_snapshot(&self.annotated, &snapshot)?;
        if let Err(err) = self.sites.save(&site_table) {
            let _ = fs::remove_file(&snapshot);
            return Err(err.into());
        }

        Ok(PersistedSites {
            site_table,
            snapshot,
            sites: self.sites,
        })
    }
}
