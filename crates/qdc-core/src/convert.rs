//! End-to-end conversion of a QDC folder into one output file.

use crate::bounds::{resolve_bounds, TileBounds};
use crate::codec::ValueMode;
use crate::grid::DepthGrid;
use crate::layer::LayerProfile;
use crate::output::{
    csv_header, grd_header, prj_file, Corrections, CsvRowRenderer, CsvStyle, GrdRowRenderer,
    OutputFile, OutputFormat, RowRenderer,
};
use crate::pipeline::{run_ordered, PipelineConfig};
use crate::progress::{report, CancelFlag, Phase, ProgressCallback};
use crate::scan::find_tile_files;
use crate::Result;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Everything a conversion run needs besides the progress sink.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Folder searched recursively for `.qdc` tiles.
    pub input_dir: PathBuf,
    /// Target `.csv` or `.grd` file.
    pub output_path: PathBuf,
    /// Layer to extract (0-5).
    pub layer: u8,
    /// Write validity codes instead of depth.
    pub validity_codes: bool,
    /// Added to every X coordinate.
    pub x_correction: f64,
    /// Added to every Y coordinate.
    pub y_correction: f64,
    /// Added to every written value.
    pub z_correction: f64,
    /// CSV field separator.
    pub csv_delimiter: String,
    /// Do not write the CSV header record.
    pub csv_skip_header: bool,
    /// Write CSV columns as `Y, X, value`.
    pub swap_xy: bool,
    /// Row pipeline tuning.
    pub pipeline: PipelineConfig,
    /// Abort flag polled during assembly and writing.
    pub cancel: Option<CancelFlag>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::new(),
            output_path: PathBuf::new(),
            layer: 1,
            validity_codes: false,
            x_correction: 0.0,
            y_correction: 0.0,
            z_correction: 0.0,
            csv_delimiter: ",".to_string(),
            csv_skip_header: false,
            swap_xy: false,
            pipeline: PipelineConfig::default(),
            cancel: None,
        }
    }
}

impl ConvertOptions {
    /// Options for converting `input_dir` into `output_path` at `layer`.
    pub fn new(input_dir: impl Into<PathBuf>, output_path: impl Into<PathBuf>, layer: u8) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_path: output_path.into(),
            layer,
            ..Self::default()
        }
    }

    fn mode(&self) -> ValueMode {
        ValueMode::from_flag(self.validity_codes)
    }

    fn corrections(&self) -> Corrections {
        Corrections {
            x: self.x_correction,
            y: self.y_correction,
            z: self.z_correction,
        }
    }

    fn csv_style(&self) -> CsvStyle {
        CsvStyle {
            delimiter: self.csv_delimiter.clone(),
            skip_header: self.csv_skip_header,
            swap_xy: self.swap_xy,
        }
    }
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    /// Selected output format.
    pub format: OutputFormat,
    /// Tiles decoded into the grid.
    pub tiles: usize,
    /// Dataset extent in origin-code units.
    pub bounds: TileBounds,
    /// Grid columns.
    pub columns: usize,
    /// Grid rows.
    pub rows: usize,
    /// Data records written (CSV rows or grid lines, header excluded).
    pub records: usize,
    /// Files written, main output first.
    pub outputs: Vec<PathBuf>,
}

/// Convert a folder of QDC tiles into a CSV table or ESRI ASCII grid.
///
/// Validation happens before any tile is read: layer, then output extension,
/// then input folder. The output only appears at its path after the last row
/// was written.
///
/// # Example
///
/// ```no_run
/// use qdc_core::{convert, ConvertOptions};
///
/// let options = ConvertOptions::new("charts/Garmin/Quickdraw", "depth.csv", 1);
/// let summary = convert(&options, None)?;
/// println!("{} points from {} tiles", summary.records, summary.tiles);
/// # Ok::<(), qdc_core::QdcError>(())
/// ```
pub fn convert(options: &ConvertOptions, progress: Option<&ProgressCallback>) -> Result<ConversionSummary> {
    let profile = LayerProfile::for_layer(options.layer)?;
    let format = OutputFormat::from_path(&options.output_path)?;
    let cancel = options.cancel.as_ref();

    report(progress, Phase::Scanning, 0, 1);
    let files = find_tile_files(&options.input_dir)?;
    if files.is_empty() {
        warn!("No tile files under {}", options.input_dir.display());
    }
    report(progress, Phase::Scanning, 1, 1);

    report(progress, Phase::ResolvingBounds, 0, files.len());
    let resolved = resolve_bounds(profile, &files)?;
    report(progress, Phase::ResolvingBounds, files.len(), files.len());

    let mode = options.mode();
    let grid = DepthGrid::assemble(profile, &resolved, mode, progress, cancel)?;
    let bounds = resolved.bounds;

    let (records, outputs) = match format {
        OutputFormat::Grd => {
            let header = grd_header(profile, &bounds, &grid);
            let renderer = GrdRowRenderer {
                mode,
                z_correction: options.z_correction,
            };
            let (records, file) = write_grid(options, &grid, &header, &renderer, progress)?;
            // The grid only appears once its projection is in place.
            let prj = prj_file(&options.output_path)?.commit()?;
            if let Err(e) = file.commit() {
                if let Err(remove) = fs::remove_file(&prj) {
                    warn!("Failed to remove {}: {}", prj.display(), remove);
                }
                return Err(e);
            }
            (records, vec![options.output_path.clone(), prj])
        }
        OutputFormat::Csv => {
            let style = options.csv_style();
            let header = csv_header(&style, mode).unwrap_or_default();
            let renderer = CsvRowRenderer::new(profile, &bounds, mode, options.corrections(), style);
            let (records, file) = write_grid(options, &grid, &header, &renderer, progress)?;
            (records, vec![file.commit()?])
        }
    };

    info!(
        "Wrote {} records to {}",
        records,
        options.output_path.display()
    );

    Ok(ConversionSummary {
        format,
        tiles: resolved.tiles.len(),
        bounds,
        columns: grid.columns(),
        rows: grid.rows(),
        records,
        outputs,
    })
}

/// Write the header and every grid row, top row first.
///
/// Returns the record count and the still uncommitted output file.
fn write_grid<R: RowRenderer>(
    options: &ConvertOptions,
    grid: &DepthGrid,
    header: &str,
    renderer: &R,
    progress: Option<&ProgressCallback>,
) -> Result<(usize, OutputFile)> {
    let mut file = OutputFile::create(&options.output_path)?;
    file.write_str(header)?;

    let rows: Vec<usize> = (0..grid.rows()).rev().collect();
    let total = rows.len();
    let mut written_rows = 0;
    let mut records = 0;

    run_ordered(
        &options.pipeline,
        &rows,
        options.cancel.as_ref(),
        |y| {
            let mut text = String::new();
            let count = renderer.render_row(grid, y, &mut text);
            (text, count)
        },
        |_, (text, count)| {
            file.write_str(&text)?;
            records += count;
            written_rows += 1;
            report(progress, Phase::Writing, written_rows, total);
            Ok(())
        },
    )?;

    Ok((records, file))
}
