//! Ordered parallel row rendering.
//!
//! Grid rows are split into fixed-size batches that worker threads render
//! against a shared, read-only borrow of the assembled grid. The driver keeps a
//! bounded window of batches in flight and hands results to the sink strictly
//! in submission order, buffering batches that finish early.
//!
//! # Ordering
//!
//! - Batch `k` is delivered only after batches `0..k`, whatever order the
//!   workers finish in
//! - Rows inside a batch keep their submission order
//! - The sequential path delivers the same rows in the same order

use crate::progress::CancelFlag;
use crate::{QdcError, Result};
use crossbeam_channel::{bounded, unbounded};
use std::collections::BTreeMap;
use std::thread;
use tracing::trace;

/// Rows per batch used by default.
pub const DEFAULT_BATCH_ROWS: usize = 64;

/// Configuration for the row pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Worker threads.
    pub workers: usize,
    /// Rows handed to a worker at a time.
    pub batch_rows: usize,
    /// Maximum batches submitted but not yet delivered.
    pub depth: usize,
    /// Below this number of rows the sequential path is used.
    pub min_parallel_rows: usize,
    /// Whether parallel rendering is enabled.
    pub enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let workers = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        PipelineConfig {
            workers,
            batch_rows: DEFAULT_BATCH_ROWS,
            depth: workers * 2,
            min_parallel_rows: 256,
            enabled: true,
        }
    }
}

impl PipelineConfig {
    /// Sequential rendering on the calling thread.
    pub fn sequential() -> Self {
        PipelineConfig {
            workers: 1,
            enabled: false,
            ..Self::default()
        }
    }

    /// Use `workers` threads with a matching window.
    pub fn with_workers(workers: usize) -> Self {
        let workers = workers.max(1);
        PipelineConfig {
            workers,
            depth: workers * 2,
            ..Self::default()
        }
    }

    fn is_parallel(&self, rows: usize) -> bool {
        self.enabled && self.workers > 1 && rows >= self.min_parallel_rows.max(1)
    }
}

/// Render `rows` in order and pass each result to `sink`.
///
/// `render` runs on worker threads and may only read shared state. `sink`
/// runs on the calling thread and receives `(row, output)` in exactly the
/// order of `rows`. Returns [`QdcError::Cancelled`] once `cancel` is set.
pub fn run_ordered<T, R, S>(
    config: &PipelineConfig,
    rows: &[usize],
    cancel: Option<&CancelFlag>,
    render: R,
    mut sink: S,
) -> Result<()>
where
    T: Send,
    R: Fn(usize) -> T + Sync,
    S: FnMut(usize, T) -> Result<()>,
{
    let cancelled = || cancel.is_some_and(CancelFlag::is_cancelled);

    if !config.is_parallel(rows.len()) {
        for &row in rows {
            if cancelled() {
                return Err(QdcError::Cancelled);
            }
            sink(row, render(row))?;
        }
        return Ok(());
    }

    let batch_rows = config.batch_rows.max(1);
    let depth = config.depth.max(1);
    let batches: Vec<&[usize]> = rows.chunks(batch_rows).collect();
    let render = &render;
    let cancelled = &cancelled;

    thread::scope(|scope| {
        let (job_tx, job_rx) = bounded::<(usize, &[usize])>(depth);
        let (done_tx, done_rx) = unbounded::<(usize, Option<Vec<T>>)>();

        for worker in 0..config.workers {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            scope.spawn(move || {
                for (index, batch) in job_rx.iter() {
                    let mut out = Vec::with_capacity(batch.len());
                    let mut aborted = false;
                    for &row in batch {
                        if cancelled() {
                            aborted = true;
                            break;
                        }
                        out.push(render(row));
                    }
                    trace!("Worker {} finished batch {}", worker, index);
                    if done_tx.send((index, (!aborted).then_some(out))).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(done_tx);

        let mut pending: BTreeMap<usize, Vec<T>> = BTreeMap::new();
        let mut submitted = 0;
        let mut delivered = 0;

        while delivered < batches.len() {
            while submitted < batches.len() && submitted - delivered < depth {
                if cancelled() {
                    return Err(QdcError::Cancelled);
                }
                if job_tx.send((submitted, batches[submitted])).is_err() {
                    return Err(QdcError::Cancelled);
                }
                submitted += 1;
            }

            while let Some(out) = pending.remove(&delivered) {
                for (&row, value) in batches[delivered].iter().zip(out) {
                    sink(row, value)?;
                }
                trace!("Delivered batch {}", delivered);
                delivered += 1;
            }
            if delivered == batches.len() || (submitted - delivered < depth && submitted < batches.len()) {
                continue;
            }

            // A closed channel means every worker exited early.
            let (index, out) = done_rx.recv().map_err(|_| QdcError::Cancelled)?;
            match out {
                Some(out) => {
                    pending.insert(index, out);
                }
                None => return Err(QdcError::Cancelled),
            }
        }
        drop(job_tx);
        Ok(())
    })
}
