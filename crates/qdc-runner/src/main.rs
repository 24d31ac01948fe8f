//! `qdc-converter`: convert a folder of QDC tiles into CSV or ESRI ASCII grid.

use clap::Parser;
use qdc_core::{convert, CancelFlag, ConvertOptions, Phase, PipelineConfig, ProgressCallback};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "qdc-converter",
    version,
    about = "Converter of Garmin's QDC files into CSV or GRD",
    long_about = "Reads every *.qdc tile under a QuickDraw Contours folder, merges the selected layer into one grid and writes it as a CSV point table or an ESRI ASCII grid with a WGS84 .prj file."
)]
struct Cli {
    /// Path to folder with QuickDraw Contours (QDC) inside
    #[arg(short = 'i', long)]
    qdc_folder_path: PathBuf,

    /// Path to the result file (*.csv or *.grd)
    #[arg(short = 'o', long)]
    output_path: PathBuf,

    /// Data layer (0 - raw user data, 1 - recommended)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u8).range(0..=5))]
    layer: u8,

    /// Write validity code instead of depth
    #[arg(long)]
    validity_codes: bool,

    /// Only log warnings and errors
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Correction of X
    #[arg(long = "dx", visible_alias = "x-correction", default_value_t = 0.0, allow_negative_numbers = true)]
    x_correction: f64,

    /// Correction of Y
    #[arg(long = "dy", visible_alias = "y-correction", default_value_t = 0.0, allow_negative_numbers = true)]
    y_correction: f64,

    /// Correction of Z
    #[arg(long = "dz", visible_alias = "z-correction", default_value_t = 0.0, allow_negative_numbers = true)]
    z_correction: f64,

    /// CSV delimiter
    #[arg(long, default_value = ",")]
    csv_delimiter: String,

    /// Do not write the CSV header
    #[arg(long)]
    csv_skip_headers: bool,

    /// Change CSV column order from X,Y,Z to Y,X,Z
    #[arg(long)]
    csv_yxz: bool,

    /// Worker threads for writing (default: available cores)
    #[arg(short = 'j', long, conflicts_with = "sequential")]
    jobs: Option<usize>,

    /// Write rows on the main thread only
    #[arg(long)]
    sequential: bool,
}

impl Cli {
    fn pipeline(&self) -> PipelineConfig {
        if self.sequential {
            PipelineConfig::sequential()
        } else if let Some(jobs) = self.jobs {
            PipelineConfig::with_workers(jobs)
        } else {
            PipelineConfig::default()
        }
    }

    fn into_options(self, cancel: CancelFlag) -> ConvertOptions {
        let pipeline = self.pipeline();
        ConvertOptions {
            input_dir: self.qdc_folder_path,
            output_path: self.output_path,
            layer: self.layer,
            validity_codes: self.validity_codes,
            x_correction: self.x_correction,
            y_correction: self.y_correction,
            z_correction: self.z_correction,
            csv_delimiter: self.csv_delimiter,
            csv_skip_header: self.csv_skip_headers,
            swap_xy: self.csv_yxz,
            pipeline,
            cancel: Some(cancel),
        }
    }
}

/// True when `current` is the first step at or past a new tenth of `total`.
fn crosses_tenth(current: usize, total: usize) -> bool {
    total > 0 && current > 0 && (current == total || current * 10 / total != (current - 1) * 10 / total)
}

fn progress_logger() -> ProgressCallback {
    Box::new(|phase, current, total| match phase {
        Phase::Assembling | Phase::Writing if crosses_tenth(current, total) => {
            info!("{}: {}/{} ({}%)", phase, current, total, current * 100 / total);
        }
        _ => {}
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl+C, stopping...");
        handler_flag.cancel();
    }) {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let quiet = cli.quiet;
    let options = cli.into_options(cancel);
    let progress = (!quiet).then(progress_logger);

    match convert(&options, progress.as_ref()) {
        Ok(summary) => {
            info!(
                "Done: {} tiles, {}x{} grid, {} records",
                summary.tiles, summary.columns, summary.rows, summary.records
            );
            for path in &summary.outputs {
                info!("Wrote {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
