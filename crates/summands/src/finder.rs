//! Search orchestration.
//!
//! [`CombinationFinder`] wires a [`CombinationGenerator`] to a [`PagedSink`]:
//! every full batch the generator drains is written to the sink in
//! production order, the final partial batch is written once the search
//! completes, and the sink is saved and closed on every exit path.
//!
//! Two [`WriteMode`]s are supported. Both keep at most a bounded number of
//! batches alive, so memory never grows with the size of the result set.

use crate::{
    Batch, Combination, CombinationGenerator, Error, PagedSink, Result, SearchParameters,
    SinkLimits, Value,
    store::{Store, XlsxStore},
};
use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default number of combinations buffered before they are written.
pub const DEFAULT_BATCH_SIZE: usize = 1_000_000;

/// How batches travel from the generator to the sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum WriteMode {
    /// The sink writes each batch inside the generator's callback. The search
    /// is suspended while a batch is being written.
    #[default]
    Inline,
    /// The generator runs on its own thread and hands owned batches to the
    /// writer over a channel of capacity 1, so the search can fill the next
    /// batch while the previous one is written.
    Pipelined,
}

/// Tuning knobs of a [`CombinationFinder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinderConfig {
    batch_size: usize,
    limits: SinkLimits,
    mode: WriteMode,
}

impl FinderConfig {
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] if `batch_size` is zero.
    pub fn new(batch_size: usize, limits: SinkLimits, mode: WriteMode) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::invalid("batch size must be greater than 0"));
        }
        Ok(Self {
            batch_size,
            limits,
            mode,
        })
    }

    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub const fn limits(&self) -> SinkLimits {
        self.limits
    }

    pub const fn mode(&self) -> WriteMode {
        self.mode
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            limits: SinkLimits::default(),
            mode: WriteMode::Inline,
        }
    }
}

/// Result of a completed search.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SearchSummary {
    pub parameters: SearchParameters,
    /// Number of combinations found, equal to the number of rows written.
    pub total: u64,
    /// Every persisted file, in creation order.
    pub files: Vec<PathBuf>,
    pub elapsed: Duration,
}

/// Runs a search and streams its results into paginated files.
///
/// # Example
///
/// ```
/// use summands::{CombinationFinder, FinderConfig, SearchParameters, store::MemoryStore};
///
/// let store = MemoryStore::new();
/// let summary = CombinationFinder::with_store(FinderConfig::default(), store.clone())
///     .run(SearchParameters::new(5, 2, 0).unwrap(), "out", |_| {})
///     .unwrap();
///
/// assert_eq!(summary.total, 2);
/// assert_eq!(store.books()[0].pages, vec![vec![vec![1, 4], vec![2, 3]]]);
/// ```
pub struct CombinationFinder<S: Store = XlsxStore> {
    config: FinderConfig,
    store: S,
    cancel: CancellationToken,
}

impl CombinationFinder<XlsxStore> {
    /// Creates a finder writing `.xlsx` workbooks.
    pub fn new(config: FinderConfig) -> Self {
        Self::with_store(config, XlsxStore::new())
    }
}

impl<S: Store> CombinationFinder<S> {
    pub fn with_store(config: FinderConfig, store: S) -> Self {
        Self {
            config,
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches a cancellation token. It is checked on every recursive entry
    /// of the search and before every sink write.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub const fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Runs the search for `params`.
    ///
    /// Files are written to `output_dir/{key}/{key}-{n}.{ext}`, where `key` is
    /// `{target}-{length}-{bound}`. The directory is created before the first
    /// file is persisted. `on_progress` receives the running total after each
    /// full batch has been written; it runs on the calling thread and should
    /// return quickly.
    ///
    /// The sink is saved on success and closed on every path, so a failed or
    /// cancelled run still leaves everything written so far on disk.
    ///
    /// # Errors
    ///
    /// - [`Error::Storage`] if any file operation fails.
    /// - [`Error::Cancelled`] if the cancellation token fires.
    /// - [`Error::ChannelError`] if the pipelined handoff breaks.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            level = "info",
            skip_all,
            fields(key = %params.key(), mode = ?self.config.mode)
        )
    )]
    pub fn run<P>(
        self,
        params: SearchParameters,
        output_dir: impl AsRef<Path>,
        on_progress: P,
    ) -> Result<SearchSummary>
    where
        P: FnMut(u64),
    {
        let started = Instant::now();
        let key = params.key();
        let dir = output_dir.as_ref().join(&key);

        let generator = CombinationGenerator::new(params, self.config.batch_size)?
            .with_cancellation(self.cancel.clone());
        let mut sink = PagedSink::new(self.store, dir, key, self.config.limits);

        #[cfg(feature = "tracing")]
        tracing::info!(dir = %sink.dir().display(), "Search started");

        let driven = match self.config.mode {
            WriteMode::Inline => drive_inline(&generator, &mut sink, &self.cancel, on_progress),
            WriteMode::Pipelined => {
                drive_pipelined(&generator, &mut sink, &self.cancel, on_progress)
            }
        };
        let saved = driven.and_then(|total| sink.save().map(|()| total));
        let closed = sink.close();

        let total = saved?;
        closed?;

        debug_assert_eq!(total, sink.rows_written());

        let summary = SearchSummary {
            parameters: params,
            total,
            files: sink.files().to_vec(),
            elapsed: started.elapsed(),
        };

        #[cfg(feature = "tracing")]
        tracing::info!(
            total = summary.total,
            files = summary.files.len(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Search finished"
        );

        Ok(summary)
    }
}

fn ensure_running(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

fn drive_inline<S, P>(
    generator: &CombinationGenerator,
    sink: &mut PagedSink<S>,
    cancel: &CancellationToken,
    on_progress: P,
) -> Result<u64>
where
    S: Store,
    P: FnMut(u64),
{
    let outcome = generator.enumerate(
        |batch: &mut Batch| {
            ensure_running(cancel)?;
            sink.write(batch.as_slice())
        },
        on_progress,
    )?;

    ensure_running(cancel)?;
    sink.write(outcome.remainder.as_slice())?;
    Ok(outcome.total)
}

fn drive_pipelined<S, P>(
    generator: &CombinationGenerator,
    sink: &mut PagedSink<S>,
    cancel: &CancellationToken,
    mut on_progress: P,
) -> Result<u64>
where
    S: Store,
    P: FnMut(u64),
{
    std::thread::scope(|scope| -> Result<u64> {
        // Capacity 1 keeps at most three batches alive: one waiting to be
        // sent, one queued and one being written. The taken batch refills
        // only after the send returns.
        let (tx, mut rx) = mpsc::channel::<Vec<Combination>>(1);

        let producer = scope.spawn(move || {
            generator.enumerate(
                |batch| {
                    tx.blocking_send(batch.take())
                        .map_err(|_| Error::ChannelError {
                            context: "writer stopped receiving batches".into(),
                        })
                },
                |_| {},
            )
        });

        let mut written: u64 = 0;
        let consumed = loop {
            let Some(batch) = rx.blocking_recv() else {
                break Ok(());
            };
            if let Err(e) = ensure_running(cancel).and_then(|()| sink.write(&batch)) {
                break Err(e);
            }
            written += batch.len() as u64;
            on_progress(written);
        };

        // Unblocks the producer if the writer stopped early.
        drop(rx);

        let produced = producer.join().map_err(|_| Error::ChannelError {
            context: "generator thread panicked".into(),
        })?;
        consumed?;
        let outcome = produced?;

        ensure_running(cancel)?;
        sink.write(outcome.remainder.as_slice())?;
        Ok(outcome.total)
    })
}

/// Finds every combination of `length` strictly increasing summands of
/// `target`, each at most `ub` (`0` selects the default bound), and writes
/// them as `.xlsx` files under `output_dir` with the default capacities.
///
/// Returns the number of combinations found.
///
/// # Errors
///
/// - [`Error::InvalidParameters`] if `target` or `length` is zero, or `ub`
///   exceeds `target`.
/// - [`Error::Storage`] if any file operation fails.
pub fn find_combinations<P>(
    target: Value,
    length: usize,
    ub: Value,
    output_dir: impl AsRef<Path>,
    on_progress: P,
) -> Result<u64>
where
    P: FnMut(u64),
{
    let params = SearchParameters::new(target, length, ub)?;
    CombinationFinder::new(FinderConfig::default())
        .run(params, output_dir, on_progress)
        .map(|summary| summary.total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn config(batch_size: usize, rows: usize, pages: usize, mode: WriteMode) -> FinderConfig {
        FinderConfig::new(batch_size, SinkLimits::new(rows, pages).unwrap(), mode).unwrap()
    }

    fn written_rows(store: &MemoryStore) -> Vec<Vec<Value>> {
        store
            .books()
            .into_iter()
            .flat_map(|b| b.pages.into_iter().flatten())
            .collect()
    }

    #[test]
    fn rows_match_generator_output() {
        let params = SearchParameters::new(30, 3, 0).unwrap();
        let expected: Vec<Vec<Value>> = CombinationGenerator::new(params, 4)
            .unwrap()
            .collect()
            .unwrap()
            .iter()
            .map(|c| c.values().to_vec())
            .collect();

        let store = MemoryStore::new();
        let summary = CombinationFinder::with_store(config(4, 5, 2, WriteMode::Inline), store.clone())
            .run(params, "out", |_| {})
            .unwrap();

        assert_eq!(summary.total, expected.len() as u64);
        assert_eq!(written_rows(&store), expected);
        assert_eq!(store.row_count() as u64, summary.total);
        assert_eq!(
            summary.files.first(),
            Some(&Path::new("out").join("30-3-30").join("30-3-30-0.mem"))
        );
        for book in store.books() {
            assert!(book.pages.len() <= 2);
            assert!(book.pages.iter().all(|p| p.len() <= 5));
        }
    }

    #[test]
    fn pipelined_writes_the_same_rows() {
        let params = SearchParameters::new(40, 4, 25).unwrap();

        let inline = MemoryStore::new();
        let a = CombinationFinder::with_store(config(3, 4, 3, WriteMode::Inline), inline.clone())
            .run(params, "out", |_| {})
            .unwrap();

        let piped = MemoryStore::new();
        let b = CombinationFinder::with_store(config(3, 4, 3, WriteMode::Pipelined), piped.clone())
            .run(params, "out", |_| {})
            .unwrap();

        assert_eq!(a.total, b.total);
        assert_eq!(a.files, b.files);
        assert_eq!(inline.books(), piped.books());
    }

    #[test]
    fn progress_reports_running_totals() {
        // 11 with two summands has five combinations.
        let params = SearchParameters::new(11, 2, 0).unwrap();
        for mode in [WriteMode::Inline, WriteMode::Pipelined] {
            let mut seen = Vec::new();
            let summary =
                CombinationFinder::with_store(config(2, 10, 1, mode), MemoryStore::new())
                    .run(params, "out", |n| seen.push(n))
                    .unwrap();
            assert_eq!(summary.total, 5);
            assert_eq!(seen, vec![2, 4], "{mode:?}");
        }
    }

    #[test]
    fn zero_results_still_leave_a_file() {
        let params = SearchParameters::new(3, 3, 0).unwrap();
        let store = MemoryStore::new();
        let summary = CombinationFinder::with_store(FinderConfig::default(), store.clone())
            .run(params, "out", |_| {})
            .unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(summary.files.len(), 1);
        assert_eq!(store.books()[0].row_count(), 0);
    }

    #[test]
    fn cancelled_run_closes_the_sink() {
        for mode in [WriteMode::Inline, WriteMode::Pipelined] {
            let cancel = CancellationToken::new();
            cancel.cancel();
            let store = MemoryStore::new();

            let err = CombinationFinder::with_store(config(2, 10, 1, mode), store.clone())
                .with_cancellation(cancel)
                .run(SearchParameters::new(50, 3, 0).unwrap(), "out", |_| {})
                .unwrap_err();

            assert!(err.is_cancelled(), "{mode:?}: {err}");
            assert!(store.books().is_empty());
        }
    }

    #[test]
    fn cancelling_from_progress_stops_after_written_batches() {
        for mode in [WriteMode::Inline, WriteMode::Pipelined] {
            let cancel = CancellationToken::new();
            let store = MemoryStore::new();
            let trigger = cancel.clone();

            let err = CombinationFinder::with_store(config(2, 100, 1, mode), store.clone())
                .with_cancellation(cancel)
                .run(SearchParameters::new(60, 3, 0).unwrap(), "out", move |n| {
                    if n >= 4 {
                        trigger.cancel();
                    }
                })
                .unwrap_err();

            assert!(err.is_cancelled(), "{mode:?}: {err}");
            // Close still persisted what reached the sink before cancellation.
            let rows = store.row_count();
            assert!(rows >= 4 && rows % 2 == 0, "{mode:?}: {rows} rows");
        }
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert!(matches!(
            FinderConfig::new(0, SinkLimits::default(), WriteMode::Inline),
            Err(Error::InvalidParameters { .. })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn summary_serializes_counts_and_files() {
        let summary = SearchSummary {
            parameters: SearchParameters::new(5, 2, 0).unwrap(),
            total: 2,
            files: vec![PathBuf::from("out/5-2-5/5-2-5-0.xlsx")],
            elapsed: Duration::from_millis(1500),
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["files"], serde_json::json!(["out/5-2-5/5-2-5-0.xlsx"]));
        assert_eq!(json["parameters"]["target"], 5);
        assert_eq!(json["parameters"]["requested_bound"], 0);
        assert_eq!(json["parameters"]["bound"], 5);
        assert_eq!(json["elapsed"]["secs"], 1);
        assert_eq!(json["elapsed"]["nanos"], 500_000_000);
    }
}
