//! Reward sites and the on-disk site table.
//!
//! The table is a CSV with a leading unnamed row-index column:
//!
//! ```text
//! ,x,y
//! 0,120,80
//! 1,300,450
//! ```

use crate::error::CoreError;
use crate::persist::write_atomic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const SITE_TABLE_FILE: &str = "rewardlocations.csv";
pub const SITE_SNAPSHOT_FILE: &str = "rewardlocations.tif";

/// A reward location in map pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RewardSite {
    pub x: i32,
    pub y: i32,
}

impl RewardSite {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// True when the site addresses a pixel of a `width` x `height` map.
    pub fn within(&self, width: u32, height: u32) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as u32) < width && (self.y as u32) < height
    }
}

impl fmt::Display for RewardSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Ordered list of reward sites. Order is insertion order, never spatial.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteTable {
    sites: Vec<RewardSite>,
}

impl SiteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sites(sites: Vec<RewardSite>) -> Self {
        Self { sites }
    }

    pub fn push(&mut self, site: RewardSite) {
        self.sites.push(site);
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn sites(&self) -> &[RewardSite] {
        &self.sites
    }

    pub fn iter(&self) -> impl Iterator<Item = &RewardSite> {
        self.sites.iter()
    }

    /// Picks a site with `pick`, which receives the table length and
    /// returns an index. Fails on an empty table or an out-of-range index.
    pub fn select(&self, pick: impl FnOnce(usize) -> usize) -> Result<RewardSite, CoreError> {
        let len = self.sites.len();
        if len == 0 {
            return Err(CoreError::EmptySiteTable);
        }
        let index = pick(len);
        self.sites
            .get(index)
            .copied()
            .ok_or(CoreError::SamplerOutOfRange { index, len })
    }

    /// Rejects the first site that falls outside a `width` x `height` map.
    pub fn check_bounds(&self, width: u32, height: u32) -> Result<(), CoreError> {
        match self.sites.iter().find(|s| !s.within(width, height)) {
            Some(site) => Err(CoreError::SiteOutOfBounds {
                site: *site,
                width,
                height,
            }),
            None => Ok(()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let table = Self::parse(&text)?;
        debug!(path = %path.display(), sites = table.len(), "loaded site table");
        Ok(table)
    }

    /// Parses the CSV form. Columns are found by header name; any other
    /// column (the row index included) is ignored.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(n, line)| (n + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let Some((header_line, header)) = lines.next() else {
            return Err(format_error(1, "missing header"));
        };
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        let position = |name: &str| columns.iter().position(|c| *c == name);
        let (Some(x_col), Some(y_col)) = (position("x"), position("y")) else {
            return Err(format_error(
                header_line,
                "header must name an `x` and a `y` column",
            ));
        };

        let mut sites = Vec::new();
        for (line_no, line) in lines {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != columns.len() {
                return Err(format_error(
                    line_no,
                    format!("expected {} fields, found {}", columns.len(), fields.len()),
                ));
            }
            let x = parse_coordinate(fields[x_col], line_no, "x")?;
            let y = parse_coordinate(fields[y_col], line_no, "y")?;
            sites.push(RewardSite::new(x, y));
        }

        Ok(Self { sites })
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from(",x,y\n");
        for (row, site) in self.sites.iter().enumerate() {
            let _ = writeln!(out, "{row},{},{}", site.x, site.y);
        }
        out
    }

    /// Writes the table; nothing lands at `path` unless the whole table did.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        write_atomic(path, self.to_csv().as_bytes())?;
        debug!(path = %path.display(), sites = self.len(), "saved site table");
        Ok(())
    }
}

impl FromIterator<RewardSite> for SiteTable {
    fn from_iter<I: IntoIterator<Item = RewardSite>>(iter: I) -> Self {
        Self {
            sites: iter.into_iter().collect(),
        }
    }
}

fn format_error(line: usize, reason: impl Into<String>) -> CoreError {
    CoreError::SiteTableFormat {
        line,
        reason: reason.into(),
    }
}

fn parse_coordinate(field: &str, line: usize, column: &str) -> Result<i32, CoreError> {
    field
        .parse::<i32>()
        .map_err(|e| format_error(line, format!("column `{column}`: {e} (`{field}`)")))
}
