//! Storage backends for the paginated sink.
//!
//! A [`Store`] knows how to create files ("books") and pages inside them, how
//! to write a row into a page, and how to persist a book to a path. The
//! [`PagedSink`](crate::PagedSink) drives all pagination and rotation; stores
//! only do the I/O.
//!
//! ## Implementations
//!
//! - [`XlsxStore`] - spreadsheet workbooks, one worksheet per page.
//! - [`MemoryStore`] - in-memory books, recording every persisted snapshot.

mod memory;
mod xlsx;

pub use memory::*;
pub use xlsx::*;

use crate::Value;
use std::{fs, io, path::Path};

/// Storage backend the sink rotates pages and files through.
///
/// Every method returns a plain [`io::Result`]; the sink attaches context and
/// treats any failure as fatal for the run.
pub trait Store {
    /// An open output file.
    type Book;
    /// A page being filled inside a [`Self::Book`].
    type Page;

    /// File extension (without the dot) of persisted books.
    fn extension(&self) -> &'static str;

    /// Creates an empty book.
    fn create_book(&mut self) -> io::Result<Self::Book>;

    /// Creates page number `index` (zero-based) for `book`.
    fn create_page(&mut self, book: &mut Self::Book, index: usize) -> io::Result<Self::Page>;

    /// Writes `values` into row `row` (zero-based), one value per column
    /// starting at the first column. Rows of a page arrive in increasing
    /// order.
    fn write_row(&mut self, page: &mut Self::Page, row: usize, values: &[Value])
    -> io::Result<()>;

    /// Moves a finished page into its book.
    fn flush_page(&mut self, book: &mut Self::Book, page: Self::Page) -> io::Result<()>;

    /// Makes sure `dir` exists before a book is persisted into it.
    fn prepare_dir(&mut self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    /// Writes the current contents of `book` to `path`. The book stays open
    /// and may be persisted again later.
    fn persist_book(&mut self, book: &mut Self::Book, path: &Path) -> io::Result<()>;

    /// Releases a book once no more pages will be added.
    fn release_book(&mut self, book: Self::Book) -> io::Result<()>;
}
