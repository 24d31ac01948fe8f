//! # qdc-core
//!
//! Decoder for Garmin QuickDraw Contours (QDC) tiles.
//!
//! A QDC folder holds many fixed-size binary tiles. Each tile carries two
//! origin codes in its header and a raster of 4-byte depth/validity records
//! for each of six precision layers. This crate merges the tiles of one layer
//! into a dense grid and writes it out as:
//! - a CSV point table (`x, y, depth` per sounding), or
//! - an ESRI ASCII grid with a WGS84 `.prj` companion.
//!
//! ## Overview
//!
//! 1. [`find_tile_files`] walks the input folder for `*.qdc` files
//! 2. [`resolve_bounds`] keeps files whose size matches a [`LayerProfile`]
//!    variant and computes the origin-code extent
//! 3. [`DepthGrid::assemble`] decodes every tile into the grid
//! 4. [`run_ordered`] renders grid rows on worker threads, delivering them
//!    top row first
//!
//! [`convert`] runs all of it.
//!
//! ## Example
//!
//! ```no_run
//! use qdc_core::{convert, CancelFlag, ConvertOptions, ProgressCallback};
//!
//! let mut options = ConvertOptions::new("Quickdraw", "lake.grd", 1);
//! options.z_correction = -0.3;
//! options.cancel = Some(CancelFlag::new());
//!
//! let callback: ProgressCallback = Box::new(|phase, current, total| {
//!     println!("{}: {}/{}", phase, current, total);
//! });
//! convert(&options, Some(&callback))?;
//! # Ok::<(), qdc_core::QdcError>(())
//! ```

mod bounds;
mod codec;
mod convert;
mod error;
mod grid;
mod layer;
mod output;
mod pipeline;
mod progress;
mod scan;
mod tile;

pub use bounds::{origin_degrees, resolve_bounds, ResolvedTiles, TileBounds};
pub use codec::{decode_depth, decode_validity, ValueMode};
pub use convert::{convert, ConversionSummary, ConvertOptions};
pub use error::QdcError;
pub use grid::DepthGrid;
pub use layer::{LayerProfile, SizeVariant, LAYER_COUNT, RECORD_STRIDE, SECTOR_PIXELS};
pub use output::{
    csv_header, format_f64, grd_header, prj_file, prj_path, Corrections, CsvRowRenderer, CsvStyle,
    GrdRowRenderer, OutputFile, OutputFormat, RowRenderer, WGS84_PRJ,
};
pub use pipeline::{run_ordered, PipelineConfig, DEFAULT_BATCH_ROWS};
pub use progress::{CancelFlag, Phase, ProgressCallback};
pub use scan::{find_tile_files, TILE_EXTENSION};
pub use tile::{MatchedTile, QdcTile, Record, TileOrigin, X_ORIGIN_OFFSET, Y_ORIGIN_OFFSET};

/// Result type for QDC operations.
pub type Result<T> = std::result::Result<T, QdcError>;
