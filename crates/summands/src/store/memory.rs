use super::Store;
use crate::Value;
use std::{
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Rows of a single page.
pub type MemoryPage = Vec<Vec<Value>>;

/// A book held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryBook {
    pages: Vec<MemoryPage>,
}

/// Snapshot of a book at the time it was last persisted to `path`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedBook {
    pub path: PathBuf,
    pub pages: Vec<MemoryPage>,
}

impl PersistedBook {
    /// Number of rows on each page.
    pub fn page_sizes(&self) -> Vec<usize> {
        self.pages.iter().map(Vec::len).collect()
    }

    pub fn row_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    books: Vec<PersistedBook>,
    persists: usize,
    released: usize,
}

/// In-memory store.
///
/// Persisting a book records a snapshot keyed by path; persisting the same
/// path again replaces the earlier snapshot. Clones share state, so a clone
/// kept by the caller can inspect what a sink wrote after the sink is gone.
/// No directories are created.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persisted books in the order their paths were first persisted.
    pub fn books(&self) -> Vec<PersistedBook> {
        self.lock().books.clone()
    }

    /// Number of `persist_book` calls, including repeats of the same path.
    pub fn persist_count(&self) -> usize {
        self.lock().persists
    }

    /// Number of released books.
    pub fn released_count(&self) -> usize {
        self.lock().released
    }

    /// Total rows across the latest snapshot of every book.
    pub fn row_count(&self) -> usize {
        self.lock().books.iter().map(PersistedBook::row_count).sum()
    }
}

impl Store for MemoryStore {
    type Book = MemoryBook;
    type Page = MemoryPage;

    fn extension(&self) -> &'static str {
        "mem"
    }

    fn create_book(&mut self) -> io::Result<Self::Book> {
        Ok(MemoryBook::default())
    }

    fn create_page(&mut self, _book: &mut Self::Book, _index: usize) -> io::Result<Self::Page> {
        Ok(Vec::new())
    }

    fn write_row(
        &mut self,
        page: &mut Self::Page,
        row: usize,
        values: &[Value],
    ) -> io::Result<()> {
        if row != page.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("row {row} written out of order (page has {} rows)", page.len()),
            ));
        }
        page.push(values.to_vec());
        Ok(())
    }

    fn flush_page(&mut self, book: &mut Self::Book, page: Self::Page) -> io::Result<()> {
        book.pages.push(page);
        Ok(())
    }

    fn prepare_dir(&mut self, _dir: &Path) -> io::Result<()> {
        Ok(())
    }

    fn persist_book(&mut self, book: &mut Self::Book, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        state.persists += 1;
        let snapshot = PersistedBook {
            path: path.to_path_buf(),
            pages: book.pages.clone(),
        };
        match state.books.iter_mut().find(|b| b.path == path) {
            Some(existing) => *existing = snapshot,
            None => state.books.push(snapshot),
        }
        Ok(())
    }

    fn release_book(&mut self, _book: Self::Book) -> io::Result<()> {
        self.lock().released += 1;
        Ok(())
    }
}
