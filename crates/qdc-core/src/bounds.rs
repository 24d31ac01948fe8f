//! Dataset extent in origin-code units.

use crate::layer::LayerProfile;
use crate::tile::{MatchedTile, TileOrigin};
use crate::{QdcError, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Running-extremum seeds. Valid origin codes stay well inside +-32000.
const MIN_SEED: i16 = 32000;
const MAX_SEED: i16 = -32000;

/// Minimum and maximum origin codes over all tiles of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileBounds {
    /// Smallest X origin code.
    pub x_min: i16,
    /// Largest X origin code.
    pub x_max: i16,
    /// Smallest Y origin code.
    pub y_min: i16,
    /// Largest Y origin code.
    pub y_max: i16,
}

impl TileBounds {
    /// Bounds covering a single tile.
    pub fn single(origin: TileOrigin) -> Self {
        Self {
            x_min: origin.x,
            x_max: origin.x,
            y_min: origin.y,
            y_max: origin.y,
        }
    }

    /// Grid columns needed for this extent.
    pub fn columns(&self, profile: &LayerProfile) -> usize {
        span(self.x_min, self.x_max, profile.grid_span())
    }

    /// Grid rows needed for this extent.
    pub fn rows(&self, profile: &LayerProfile) -> usize {
        span(self.y_min, self.y_max, profile.grid_span())
    }

    /// Longitude of the lower-left grid corner in degrees.
    pub fn x_corner(&self) -> f64 {
        origin_degrees(self.x_min)
    }

    /// Latitude of the lower-left grid corner in degrees.
    pub fn y_corner(&self) -> f64 {
        origin_degrees(self.y_min)
    }

    fn include(&mut self, origin: TileOrigin) {
        self.x_min = self.x_min.min(origin.x);
        self.x_max = self.x_max.max(origin.x);
        self.y_min = self.y_min.min(origin.y);
        self.y_max = self.y_max.max(origin.y);
    }

    fn is_seeded(&self) -> bool {
        self.x_min == MIN_SEED || self.y_min == MIN_SEED || self.x_max == MAX_SEED || self.y_max == MAX_SEED
    }
}

/// Degrees of one origin-code unit is `90 / 2^14`.
pub fn origin_degrees(code: i16) -> f64 {
    f64::from(i32::from(code) * 90) / 16384.0
}

fn span(min: i16, max: i16, cells: i32) -> usize {
    ((i32::from(max) - i32::from(min) + 1) * cells) as usize
}

/// Tiles that matched the layer and the extent they cover.
#[derive(Debug, Clone)]
pub struct ResolvedTiles {
    /// Extent in origin-code units.
    pub bounds: TileBounds,
    /// Every matched tile, in scan order.
    pub tiles: Vec<MatchedTile>,
}

/// Match candidate files against the layer's size variants and fold their
/// origin codes into the dataset bounds.
///
/// Files whose size matches no variant are skipped. Fails with
/// [`QdcError::NoValidTiles`] if nothing matched.
pub fn resolve_bounds(profile: &LayerProfile, files: &[PathBuf]) -> Result<ResolvedTiles> {
    let mut bounds = TileBounds {
        x_min: MIN_SEED,
        x_max: MAX_SEED,
        y_min: MIN_SEED,
        y_max: MAX_SEED,
    };
    let mut tiles = Vec::new();
    let mut seen = HashSet::new();

    for path in files {
        let Some(tile) = MatchedTile::probe(profile, path)? else {
            debug!("Skipping {}: size matches no layer {} variant", path.display(), profile.layer());
            continue;
        };
        let origin = TileOrigin::read_from(&tile.path)?;
        if !seen.insert(origin) {
            warn!(
                "Tile {} repeats origin ({}, {}); later tiles overwrite earlier ones",
                tile.path.display(),
                origin.x,
                origin.y
            );
        }
        bounds.include(origin);
        tiles.push(tile);
    }

    if tiles.is_empty() || bounds.is_seeded() {
        return Err(QdcError::NoValidTiles(profile.layer()));
    }

    info!(
        "Resolved {} of {} files for layer {}: x {}..={}, y {}..={}",
        tiles.len(),
        files.len(),
        profile.layer(),
        bounds.x_min,
        bounds.x_max,
        bounds.y_min,
        bounds.y_max
    );
    Ok(ResolvedTiles { bounds, tiles })
}
