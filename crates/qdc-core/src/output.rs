//! CSV table and ESRI ASCII grid rendering.
//!
//! Both formats walk the grid from the northernmost row down to row 0 and
//! west to east within a row. Row rendering is a pure function of the frozen
//! grid, so it can run on worker threads; the driver writes the rendered rows
//! through [`OutputFile`], which only appears at the target path once
//! everything was written.

use crate::bounds::TileBounds;
use crate::codec::ValueMode;
use crate::grid::DepthGrid;
use crate::layer::LayerProfile;
use crate::{QdcError, Result};
use std::fmt::Write as _;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// WGS84 geographic coordinate system written next to every grid.
pub const WGS84_PRJ: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",\
SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],\
PRIMEM[\"Greenwich\",0.0],UNIT[\"Degree\",0.0174532925199433]]";

/// CSV record terminator.
pub const CSV_LINE_END: &str = "\r\n";

/// Output file type, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Delimited `x, y, value` table.
    Csv,
    /// ESRI ASCII raster grid plus `.prj`.
    Grd,
}

impl OutputFormat {
    /// Select the format from a case-insensitive `.csv` / `.grd` extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(OutputFormat::Csv),
            Some("grd") => Ok(OutputFormat::Grd),
            _ => Err(QdcError::UnsupportedOutputFormat(path.to_path_buf())),
        }
    }
}

/// Additive corrections applied to written coordinates and values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Corrections {
    /// Added to X (longitude).
    pub x: f64,
    /// Added to Y (latitude).
    pub y: f64,
    /// Added to the decoded value.
    pub z: f64,
}

/// CSV layout options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvStyle {
    /// Field separator.
    pub delimiter: String,
    /// Omit the header record.
    pub skip_header: bool,
    /// Write `Y, X, value` instead of `X, Y, value`.
    pub swap_xy: bool,
}

impl Default for CsvStyle {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            skip_header: false,
            swap_xy: false,
        }
    }
}

/// Append a float in shortest round-trip form with a fractional part.
///
/// Exponents are written with a sign and at least two digits (`2.5e-05`).
pub fn push_f64(out: &mut String, value: f64) {
    let start = out.len();
    let _ = write!(out, "{:?}", value);
    if let Some(e) = out[start..].find('e') {
        let at = start + e + 1;
        let (sign, digits_at) = match out.as_bytes().get(at) {
            Some(b'-') => ('-', at + 1),
            _ => ('+', at),
        };
        let digits = out[digits_at..].to_string();
        out.truncate(at);
        out.push(sign);
        if digits.len() < 2 {
            out.push('0');
        }
        out.push_str(&digits);
    }
}

/// Render a float the same way as [`push_f64`].
pub fn format_f64(value: f64) -> String {
    let mut s = String::new();
    push_f64(&mut s, value);
    s
}

/// Renders one grid row into output text.
pub trait RowRenderer: Sync {
    /// Append the text for row `y` and return the number of records written.
    fn render_row(&self, grid: &DepthGrid, y: usize, out: &mut String) -> usize;
}

/// ESRI ASCII grid header.
pub fn grd_header(profile: &LayerProfile, bounds: &TileBounds, grid: &DepthGrid) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "NCOLS {}", grid.columns());
    let _ = writeln!(s, "NROWS {}", grid.rows());
    s.push_str("XLLCORNER ");
    push_f64(&mut s, bounds.x_corner());
    s.push_str("\nYLLCORNER ");
    push_f64(&mut s, bounds.y_corner());
    s.push_str("\nCELLSIZE ");
    push_f64(&mut s, profile.angular_step());
    s.push_str("\nNODATA_VALUE 0\n");
    s
}

/// Grid rows: every cell decoded, space separated.
#[derive(Debug, Clone, Copy)]
pub struct GrdRowRenderer {
    /// Cell interpretation.
    pub mode: ValueMode,
    /// Added to every decoded value.
    pub z_correction: f64,
}

impl RowRenderer for GrdRowRenderer {
    fn render_row(&self, grid: &DepthGrid, y: usize, out: &mut String) -> usize {
        for (x, &raw) in grid.row(y).iter().enumerate() {
            if x > 0 {
                out.push(' ');
            }
            push_f64(out, self.mode.decode(raw) + self.z_correction);
        }
        out.push('\n');
        1
    }
}

/// CSV header record, or `None` when headers are skipped.
pub fn csv_header(style: &CsvStyle, mode: ValueMode) -> Option<String> {
    if style.skip_header {
        return None;
    }
    let (first, second) = if style.swap_xy { ("Y", "X") } else { ("X", "Y") };
    let mut s = String::new();
    push_field(&mut s, first, &style.delimiter);
    s.push_str(&style.delimiter);
    push_field(&mut s, second, &style.delimiter);
    s.push_str(&style.delimiter);
    push_field(&mut s, mode.column_name(), &style.delimiter);
    s.push_str(CSV_LINE_END);
    Some(s)
}

/// Append a CSV field, quoting it if it contains the delimiter, a quote or a line break.
fn push_field(out: &mut String, field: &str, delimiter: &str) {
    let needs_quotes = (!delimiter.is_empty() && field.contains(delimiter))
        || field.contains(['"', '\r', '\n']);
    if needs_quotes {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

/// CSV rows: one record per cell whose raw value is positive.
#[derive(Debug, Clone)]
pub struct CsvRowRenderer {
    x_base: f64,
    y_base: f64,
    step: f64,
    mode: ValueMode,
    corrections: Corrections,
    style: CsvStyle,
}

impl CsvRowRenderer {
    /// Build a renderer placing each record at its cell center.
    pub fn new(
        profile: &LayerProfile,
        bounds: &TileBounds,
        mode: ValueMode,
        corrections: Corrections,
        style: CsvStyle,
    ) -> Self {
        let step = profile.angular_step();
        Self {
            x_base: bounds.x_corner() + step / 2.0,
            y_base: bounds.y_corner() + step / 2.0,
            step,
            mode,
            corrections,
            style,
        }
    }

    fn push_number(&self, out: &mut String, value: f64) {
        let start = out.len();
        push_f64(out, value);
        if !self.style.delimiter.is_empty() && out[start..].contains(self.style.delimiter.as_str()) {
            let text = out.split_off(start);
            push_field(out, &text, &self.style.delimiter);
        }
    }
}

impl RowRenderer for CsvRowRenderer {
    fn render_row(&self, grid: &DepthGrid, y: usize, out: &mut String) -> usize {
        let mut records = 0;
        let lat = self.y_base + y as f64 * self.step + self.corrections.y;
        for (x, &raw) in grid.row(y).iter().enumerate() {
            // Zero is the no-data sentinel; negative values are dropped as well.
            if raw <= 0 {
                continue;
            }
            let lon = self.x_base + x as f64 * self.step + self.corrections.x;
            let value = self.mode.decode(raw) + self.corrections.z;
            let (first, second) = if self.style.swap_xy { (lat, lon) } else { (lon, lat) };
            self.push_number(out, first);
            out.push_str(&self.style.delimiter);
            self.push_number(out, second);
            out.push_str(&self.style.delimiter);
            self.push_number(out, value);
            out.push_str(CSV_LINE_END);
            records += 1;
        }
        records
    }
}

/// Sibling path with the `.prj` extension.
pub fn prj_path<P: AsRef<Path>>(output: P) -> PathBuf {
    output.as_ref().with_extension("prj")
}

/// Buffered output written to a temporary file and moved into place on commit.
///
/// Dropping it without calling [`commit`](Self::commit) removes the temporary,
/// so a failed or cancelled run never leaves a partial file at the target.
#[derive(Debug)]
pub struct OutputFile {
    target: PathBuf,
    writer: BufWriter<NamedTempFile>,
}

impl OutputFile {
    /// Open a temporary file next to `target`.
    pub fn create<P: AsRef<Path>>(target: P) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let dir = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut builder = tempfile::Builder::new();
        builder.prefix(".qdc-").suffix(".tmp");
        // Request the same mode as a plain `File::create`; the umask still applies.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o666));
        }
        let file = builder
            .tempfile_in(&dir)
            .map_err(|e| QdcError::io("create", &target, e))?;
        Ok(Self {
            target,
            writer: BufWriter::new(file),
        })
    }

    /// Append text.
    pub fn write_str(&mut self, text: &str) -> Result<()> {
        self.writer
            .write_all(text.as_bytes())
            .map_err(|e| QdcError::io("write", &self.target, e))
    }

    /// Flush and move the file onto the target path.
    pub fn commit(self) -> Result<PathBuf> {
        let target = self.target;
        let file = self
            .writer
            .into_inner()
            .map_err(|e| QdcError::io("write", &target, e.into_error()))?;
        file.persist(&target)
            .map_err(|e| QdcError::io("rename", &target, e.error))?;
        Ok(target)
    }
}

/// The WGS84 `.prj` companion of a grid file, written but not yet committed.
pub fn prj_file<P: AsRef<Path>>(grid_path: P) -> Result<OutputFile> {
    let mut file = OutputFile::create(prj_path(grid_path))?;
    file.write_str(WGS84_PRJ)?;
    Ok(file)
}
