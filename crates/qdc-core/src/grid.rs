//! Dense depth grid and tile assembly.

use crate::bounds::{ResolvedTiles, TileBounds};
use crate::codec::ValueMode;
use crate::layer::{LayerProfile, SECTOR_PIXELS};
use crate::progress::{report, CancelFlag, Phase, ProgressCallback};
use crate::tile::{QdcTile, Record};
use crate::{QdcError, Result};
use tracing::{debug, info};

/// A rectangular raster of raw `i16` cells.
///
/// Column `x` grows eastward from the X origin minimum and row `y` grows
/// northward from the Y origin minimum. Zero means no data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthGrid {
    columns: usize,
    rows: usize,
    /// Row-major: `cells[y * columns + x]`.
    cells: Vec<i16>,
}

impl DepthGrid {
    /// Create a zero-filled grid.
    ///
    /// Aborts if the cells cannot be allocated; sizes derived from tile
    /// headers go through [`try_new`](Self::try_new).
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            cells: vec![0; columns * rows],
        }
    }

    /// Create a zero-filled grid, failing with [`QdcError::GridTooLarge`]
    /// instead of aborting when the cells cannot be allocated.
    pub fn try_new(columns: usize, rows: usize) -> Result<Self> {
        let too_large = || QdcError::GridTooLarge { columns, rows };
        let len = columns.checked_mul(rows).ok_or_else(too_large)?;
        let mut cells = Vec::new();
        cells.try_reserve_exact(len).map_err(|_| too_large())?;
        cells.resize(len, 0);
        Ok(Self { columns, rows, cells })
    }

    /// Number of columns (`NCOLS`).
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of rows (`NROWS`).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Cell at column `x`, row `y`, or `None` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<i16> {
        if x < self.columns && y < self.rows {
            Some(self.cells[y * self.columns + x])
        } else {
            None
        }
    }

    /// All cells of row `y`, west to east.
    ///
    /// # Panics
    /// Panics if `y` is not below [`rows`](Self::rows).
    pub fn row(&self, y: usize) -> &[i16] {
        let start = y * self.columns;
        &self.cells[start..start + self.columns]
    }

    pub(crate) fn set(&mut self, x: usize, y: usize, value: i16) -> bool {
        if x < self.columns && y < self.rows {
            self.cells[y * self.columns + x] = value;
            true
        } else {
            false
        }
    }

    /// Count of cells holding a non-zero value.
    pub fn filled_cells(&self) -> usize {
        self.cells.iter().filter(|&&v| v != 0).count()
    }

    /// Decode every matched tile into a new grid sized from the bounds.
    pub fn assemble(
        profile: &LayerProfile,
        resolved: &ResolvedTiles,
        mode: ValueMode,
        progress: Option<&ProgressCallback>,
        cancel: Option<&CancelFlag>,
    ) -> Result<Self> {
        let bounds = &resolved.bounds;
        let mut grid = Self::try_new(bounds.columns(profile), bounds.rows(profile))?;
        info!(
            "Allocated {}x{} grid for {} tiles",
            grid.columns,
            grid.rows,
            resolved.tiles.len()
        );

        let total = resolved.tiles.len();
        for (done, matched) in resolved.tiles.iter().enumerate() {
            if cancel.is_some_and(CancelFlag::is_cancelled) {
                return Err(QdcError::Cancelled);
            }
            let tile = QdcTile::from_file(profile, matched)?;
            let dropped = grid.place_tile(profile, bounds, &tile, mode);
            debug!(
                "Placed {} at origin ({}, {}){}",
                matched.path.display(),
                tile.origin().x,
                tile.origin().y,
                if dropped > 0 {
                    format!(", {} records fell outside the grid", dropped)
                } else {
                    String::new()
                }
            );
            report(progress, Phase::Assembling, done + 1, total);
        }

        Ok(grid)
    }

    /// Scatter one tile's records into the grid.
    ///
    /// Records are stored sector row by sector row, then sector column, then
    /// pixel row, then pixel column. In depth mode a record with a zero
    /// validity code leaves the cell untouched; in validity mode the code is
    /// stored unconditionally. Returns the number of records that fell outside
    /// the grid.
    pub fn place_tile(
        &mut self,
        profile: &LayerProfile,
        bounds: &TileBounds,
        tile: &QdcTile,
        mode: ValueMode,
    ) -> usize {
        let origin = tile.origin();
        let span = i64::from(profile.origin_span());
        let x_origin = (i64::from(origin.x) - i64::from(bounds.x_min)) * span;
        let y_origin = (i64::from(origin.y) - i64::from(bounds.y_min)) * span;

        let sectors = profile.sectors_per_side();
        let mut index = 0usize;
        let mut dropped = 0usize;
        for sector_row in 0..sectors {
            for sector_col in 0..sectors {
                for pixel_row in 0..SECTOR_PIXELS {
                    for pixel_col in 0..SECTOR_PIXELS {
                        let x = (sector_col * SECTOR_PIXELS + pixel_col) as i64 + x_origin;
                        let y = (sector_row * SECTOR_PIXELS + pixel_row) as i64 + y_origin;
                        let Record { depth, code } = tile.record(index);
                        let value = match mode {
                            ValueMode::ValidityCode => Some(code),
                            ValueMode::Depth if code != 0 => Some(depth),
                            ValueMode::Depth => None,
                        };
                        if let Some(value) = value {
                            let stored = usize::try_from(x)
                                .ok()
                                .zip(usize::try_from(y).ok())
                                .is_some_and(|(x, y)| self.set(x, y, value));
                            if !stored {
                                dropped += 1;
                            }
                        }
                        index += 1;
                    }
                }
            }
        }
        debug_assert_eq!(index, tile.record_count());
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{SizeVariant, RECORD_STRIDE};
    use crate::tile::TileOrigin;

    /// Build layer bytes where record `i` has the given depth and code.
    fn tile_bytes(
        profile: &LayerProfile,
        variant: SizeVariant,
        origin: TileOrigin,
        record: impl Fn(usize) -> (i16, i16),
    ) -> Vec<u8> {
        let mut data = vec![0u8; variant.file_size as usize];
        data[164..166].copy_from_slice(&origin.x.to_le_bytes());
        data[160..162].copy_from_slice(&origin.y.to_le_bytes());
        for i in 0..profile.record_count() {
            let (depth, code) = record(i);
            let at = variant.record_offset - 1 + RECORD_STRIDE * i;
            data[at..at + 2].copy_from_slice(&depth.to_le_bytes());
            data[at + 2..at + 4].copy_from_slice(&code.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_grid_accessors() {
        let mut grid = DepthGrid::new(3, 2);
        assert!(grid.set(2, 1, 9));
        assert!(!grid.set(3, 0, 1));
        assert_eq!(grid.get(2, 1), Some(9));
        assert_eq!(grid.get(0, 2), None);
        assert_eq!(grid.row(1), &[0, 0, 9]);
        assert_eq!(grid.filled_cells(), 1);
    }

    #[test]
    fn test_traversal_order_layer2() {
        // Layer 2 has 2x2 sectors, so the record order differs from plain row-major.
        let profile = LayerProfile::for_layer(2).unwrap();
        let variant = profile.match_size(110_592).unwrap();
        let origin = TileOrigin { x: 0, y: 0 };
        let data = tile_bytes(profile, variant, origin, |i| ((i % 30_000) as i16 + 1, 1));
        let tile = QdcTile::from_bytes(profile, variant, data).unwrap();
        let bounds = TileBounds::single(origin);
        let mut grid = DepthGrid::new(bounds.columns(profile), bounds.rows(profile));
        assert_eq!(grid.place_tile(profile, &bounds, &tile, ValueMode::Depth), 0);

        // First record of sector (row 0, col 1) is index 1024 and lands at x=32, y=0.
        assert_eq!(grid.get(32, 0), Some(1025));
        // Second pixel row of sector 0 starts at index 32.
        assert_eq!(grid.get(0, 1), Some(33));
        // Sector (row 1, col 0) starts at index 2048.
        assert_eq!(grid.get(0, 32), Some(2049));
        assert_eq!(grid.get(63, 63), Some(4096));
    }

    #[test]
    fn test_zero_code_leaves_cell_in_depth_mode() {
        let profile = LayerProfile::for_layer(3).unwrap();
        let variant = profile.match_size(90_112).unwrap();
        let origin = TileOrigin { x: 5, y: 5 };
        let data = tile_bytes(profile, variant, origin, |i| (500, if i == 0 { 0 } else { 2 }));
        let tile = QdcTile::from_bytes(profile, variant, data).unwrap();
        let bounds = TileBounds::single(origin);

        let mut depth = DepthGrid::new(32, 32);
        depth.place_tile(profile, &bounds, &tile, ValueMode::Depth);
        assert_eq!(depth.get(0, 0), Some(0));
        assert_eq!(depth.get(1, 0), Some(500));

        let mut codes = DepthGrid::new(32, 32);
        codes.place_tile(profile, &bounds, &tile, ValueMode::ValidityCode);
        assert_eq!(codes.get(0, 0), Some(0));
        assert_eq!(codes.get(1, 0), Some(2));
    }

    #[test]
    fn test_origin_span_offsets_tiles() {
        // Layer 5 places tiles 8 pixels apart per origin unit.
        let profile = LayerProfile::for_layer(5).unwrap();
        let variant = profile.match_size(110_592).unwrap();
        let bounds = TileBounds {
            x_min: 10,
            x_max: 11,
            y_min: 20,
            y_max: 20,
        };
        let origin = TileOrigin { x: 11, y: 20 };
        let data = tile_bytes(profile, variant, origin, |_| (100, 1));
        let tile = QdcTile::from_bytes(profile, variant, data).unwrap();
        let mut grid = DepthGrid::new(bounds.columns(profile), bounds.rows(profile));
        assert_eq!((grid.columns(), grid.rows()), (64, 32));
        grid.place_tile(profile, &bounds, &tile, ValueMode::Depth);
        assert_eq!(grid.get(7, 0), Some(0));
        assert_eq!(grid.get(8, 0), Some(100));
        assert_eq!(grid.get(39, 31), Some(100));
        assert_eq!(grid.get(40, 0), Some(0));
    }

    #[test]
    fn test_try_new_rejects_unallocatable_sizes() {
        assert!(matches!(
            DepthGrid::try_new(usize::MAX, 2),
            Err(QdcError::GridTooLarge { columns: usize::MAX, rows: 2 })
        ));
        // Layer 0 extent for origins -31999 and 31999 on both axes.
        let side = 63_999 * 256;
        assert!(matches!(
            DepthGrid::try_new(side, side),
            Err(QdcError::GridTooLarge { .. })
        ));
        let grid = DepthGrid::try_new(4, 3).unwrap();
        assert_eq!(grid, DepthGrid::new(4, 3));
    }

    #[test]
    fn test_last_writer_wins() {
        let profile = LayerProfile::for_layer(3).unwrap();
        let variant = profile.match_size(110_592).unwrap();
        let origin = TileOrigin { x: 0, y: 0 };
        let bounds = TileBounds::single(origin);
        let first = QdcTile::from_bytes(profile, variant, tile_bytes(profile, variant, origin, |_| (10, 1))).unwrap();
        let second = QdcTile::from_bytes(profile, variant, tile_bytes(profile, variant, origin, |_| (20, 1))).unwrap();
        let mut grid = DepthGrid::new(32, 32);
        grid.place_tile(profile, &bounds, &first, ValueMode::Depth);
        grid.place_tile(profile, &bounds, &second, ValueMode::Depth);
        assert_eq!(grid.get(3, 3), Some(20));
    }

    #[test]
    fn test_out_of_grid_records_are_dropped() {
        let profile = LayerProfile::for_layer(3).unwrap();
        let variant = profile.match_size(110_592).unwrap();
        let origin = TileOrigin { x: 0, y: 0 };
        let tile = QdcTile::from_bytes(profile, variant, tile_bytes(profile, variant, origin, |_| (10, 1))).unwrap();
        let mut grid = DepthGrid::new(16, 32);
        let dropped = grid.place_tile(profile, &TileBounds::single(origin), &tile, ValueMode::Depth);
        assert_eq!(dropped, 16 * 32);
        assert_eq!(grid.filled_cells(), 16 * 32);
    }
}
