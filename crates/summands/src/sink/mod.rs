//! Paginated output sink.
//!
//! [`PagedSink`] streams combinations into pages of at most `rows_per_page`
//! rows, grouped into files of at most `pages_per_file` pages. A page is
//! flushed into its file the moment it fills, and a file is persisted and
//! released the moment its last page closes, so memory stays bounded by one
//! open file no matter how many rows pass through.
//!
//! ## States
//!
//! ```text
//!            write            page full            pages full
//! NoFileOpen ─────▶ PageOpen ──────────▶ FileOpen ────────────▶ NoFileOpen
//!                     ▲                     │
//!                     └──────── write ──────┘
//! ```
//!
//! Pages and files open lazily on the next row, which means a full page never
//! leaves an empty trailing page behind. [`close`](PagedSink::close) moves
//! every state to the terminal `Closed` state.
//!
//! ## Failure
//!
//! Any store failure is fatal for the run. Output persisted before the failure
//! stays where it is, and a failed sink no longer persists on close; it only
//! releases what it holds.

mod limits;

pub use limits::*;

use crate::{Combination, Error, Result, store::Store};
use std::{
    io,
    path::{Path, PathBuf},
};

enum SinkState<B, P> {
    NoFileOpen,
    FileOpen { book: B },
    PageOpen { book: B, page: P },
    Closed,
}

/// Streams rows into size-bounded pages and files through a [`Store`].
///
/// Files are named `{key}-{n}.{ext}` inside `dir`, with `n` counting from `0`
/// in creation order.
///
/// Dropping the sink closes it; call [`close`](Self::close) explicitly to
/// observe errors.
pub struct PagedSink<S: Store> {
    store: S,
    dir: PathBuf,
    key: String,
    limits: SinkLimits,
    state: SinkState<S::Book, S::Page>,
    filled_rows: usize,
    filled_pages: usize,
    filled_files: usize,
    rows_written: u64,
    dirty: bool,
    failed: bool,
    files: Vec<PathBuf>,
}

impl<S: Store> PagedSink<S> {
    /// Creates a sink writing `{key}-{n}` files into `dir`. Nothing touches
    /// storage until the first row arrives.
    pub fn new(
        store: S,
        dir: impl Into<PathBuf>,
        key: impl Into<String>,
        limits: SinkLimits,
    ) -> Self {
        Self {
            store,
            dir: dir.into(),
            key: key.into(),
            limits,
            state: SinkState::NoFileOpen,
            filled_rows: 0,
            filled_pages: 0,
            filled_files: 0,
            rows_written: 0,
            dirty: false,
            failed: false,
            files: Vec::new(),
        }
    }

    /// Appends `rows` in order.
    ///
    /// A page is closed as soon as it holds `rows_per_page` rows, and its file
    /// is persisted and released as soon as it holds `pages_per_file` pages.
    /// The next page or file is only opened when another row arrives. The
    /// sink does not keep any reference to `rows`.
    ///
    /// # Errors
    ///
    /// - [`Error::SinkClosed`] if the sink was closed.
    /// - [`Error::Storage`] if the store fails; the run must be abandoned.
    pub fn write(&mut self, rows: &[Combination]) -> Result<()> {
        if matches!(self.state, SinkState::Closed) {
            return Err(Error::SinkClosed);
        }

        for row in rows {
            self.ensure_page()?;
            self.write_row(row)?;
            self.rotate_if_full()?;
        }

        Ok(())
    }

    /// Flushes the open page and persists the open file without closing it.
    ///
    /// When no row was ever written, an empty `{key}-0` file is persisted so
    /// every run leaves an output behind.
    ///
    /// # Errors
    ///
    /// - [`Error::SinkClosed`] if the sink was closed.
    /// - [`Error::Storage`] if flushing or persisting fails.
    pub fn save(&mut self) -> Result<()> {
        match self.state {
            SinkState::Closed => return Err(Error::SinkClosed),
            SinkState::NoFileOpen if self.files.is_empty() => {
                let book = self
                    .store
                    .create_book()
                    .map_err(|e| self.fail("creating file", e))?;
                self.state = SinkState::FileOpen { book };
                self.dirty = true;
            }
            _ => {}
        }

        self.flush_open()
    }

    /// Flushes any open page, persists the open file if it changed since it
    /// was last persisted, and releases it.
    ///
    /// Idempotent, and a no-op when nothing was ever written.
    ///
    /// # Errors
    ///
    /// [`Error::Storage`] if flushing, persisting or releasing fails. The sink
    /// is closed either way.
    pub fn close(&mut self) -> Result<()> {
        if matches!(self.state, SinkState::Closed) {
            return Ok(());
        }

        let flushed = if self.failed {
            Ok(())
        } else {
            self.flush_open()
        };

        let released = match core::mem::replace(&mut self.state, SinkState::Closed) {
            SinkState::FileOpen { book } | SinkState::PageOpen { book, .. } => {
                self.filled_files += 1;
                self.store
                    .release_book(book)
                    .map_err(|e| self.fail("releasing file", e))
            }
            SinkState::NoFileOpen | SinkState::Closed => Ok(()),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            rows = self.rows_written,
            files = self.files.len(),
            "Sink closed"
        );

        flushed.and(released)
    }

    /// Paths of every file persisted so far, in creation order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub const fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub const fn limits(&self) -> &SinkLimits {
        &self.limits
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn is_closed(&self) -> bool {
        matches!(self.state, SinkState::Closed)
    }

    fn fail(&mut self, context: impl Into<String>, err: io::Error) -> Error {
        self.failed = true;
        let err = Error::storage(context, err);

        #[cfg(feature = "tracing")]
        tracing::error!("{err}");

        err
    }

    fn file_path(&self) -> PathBuf {
        self.dir.join(format!(
            "{}-{}.{}",
            self.key,
            self.filled_files,
            self.store.extension()
        ))
    }

    fn ensure_page(&mut self) -> Result<()> {
        match self.state {
            SinkState::Closed => return Err(Error::SinkClosed),
            SinkState::NoFileOpen => {
                let book = self
                    .store
                    .create_book()
                    .map_err(|e| self.fail("creating file", e))?;
                self.filled_pages = 0;
                self.filled_rows = 0;
                self.state = SinkState::FileOpen { book };
            }
            SinkState::FileOpen { .. } | SinkState::PageOpen { .. } => {}
        }

        match core::mem::replace(&mut self.state, SinkState::NoFileOpen) {
            SinkState::FileOpen { mut book } => {
                match self.store.create_page(&mut book, self.filled_pages) {
                    Ok(page) => {
                        self.filled_rows = 0;
                        self.state = SinkState::PageOpen { book, page };
                        Ok(())
                    }
                    Err(e) => {
                        self.state = SinkState::FileOpen { book };
                        Err(self.fail(format!("creating page {}", self.filled_pages + 1), e))
                    }
                }
            }
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    fn write_row(&mut self, row: &Combination) -> Result<()> {
        let SinkState::PageOpen { page, .. } = &mut self.state else {
            return Err(Error::SinkClosed);
        };

        let res = self.store.write_row(page, self.filled_rows, row.values());
        res.map_err(|e| self.fail(format!("writing row {}", self.filled_rows + 1), e))?;

        self.filled_rows += 1;
        self.rows_written += 1;
        self.dirty = true;
        Ok(())
    }

    fn rotate_if_full(&mut self) -> Result<()> {
        if self.filled_rows >= self.limits.rows_per_page() {
            self.close_page()?;
        }
        if self.filled_pages >= self.limits.pages_per_file() {
            self.close_file()?;
        }
        Ok(())
    }

    fn close_page(&mut self) -> Result<()> {
        match core::mem::replace(&mut self.state, SinkState::NoFileOpen) {
            SinkState::PageOpen { mut book, page } => {
                let res = self.store.flush_page(&mut book, page);
                self.state = SinkState::FileOpen { book };
                res.map_err(|e| self.fail(format!("flushing page {}", self.filled_pages + 1), e))?;

                self.filled_pages += 1;
                self.filled_rows = 0;
                self.dirty = true;

                #[cfg(feature = "tracing")]
                tracing::trace!(
                    page = self.filled_pages,
                    file = self.filled_files,
                    "Page closed"
                );
                Ok(())
            }
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    fn close_file(&mut self) -> Result<()> {
        if self.dirty {
            self.persist_open()?;
        }

        match core::mem::replace(&mut self.state, SinkState::NoFileOpen) {
            SinkState::FileOpen { book } => {
                self.store
                    .release_book(book)
                    .map_err(|e| self.fail("releasing file", e))?;
                self.filled_files += 1;
                self.filled_pages = 0;
                self.filled_rows = 0;
                Ok(())
            }
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    fn flush_open(&mut self) -> Result<()> {
        self.close_page()?;
        if self.dirty {
            self.persist_open()?;
        }
        Ok(())
    }

    fn persist_open(&mut self) -> Result<()> {
        match core::mem::replace(&mut self.state, SinkState::NoFileOpen) {
            SinkState::FileOpen { mut book } => {
                let res = self.persist(&mut book);
                self.state = SinkState::FileOpen { book };
                res
            }
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    fn persist(&mut self, book: &mut S::Book) -> Result<()> {
        let path = self.file_path();

        if let Err(e) = self.store.prepare_dir(&self.dir) {
            let context = format!("creating output directory {}", self.dir.display());
            return Err(self.fail(context, e));
        }
        if let Err(e) = self.store.persist_book(book, &path) {
            return Err(self.fail(format!("persisting {}", path.display()), e));
        }

        self.dirty = false;
        if self.files.last() != Some(&path) {
            self.files.push(path);

            #[cfg(feature = "tracing")]
            tracing::info!(
                file = %self.files[self.files.len() - 1].display(),
                rows = self.rows_written,
                "File persisted"
            );
        }
        Ok(())
    }
}

impl<S: Store> Drop for PagedSink<S> {
    fn drop(&mut self) {
        if let Err(_e) = self.close() {
            #[cfg(feature = "tracing")]
            tracing::error!("Failed to close sink on drop: {_e}");
        }
    }
}
