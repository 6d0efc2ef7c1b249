use super::Store;
use crate::Value;
use rust_xlsxwriter::{ColNum, RowNum, Workbook, Worksheet, XlsxError};
use std::{io, path::Path};

/// Maximum number of rows a worksheet can hold.
pub const XLSX_MAX_ROWS: usize = 1_048_576;

/// Maximum number of columns a worksheet can hold.
pub const XLSX_MAX_COLUMNS: usize = 16_384;

/// Largest value a worksheet cell holds exactly. Cells are `f64`.
pub const XLSX_MAX_EXACT_VALUE: Value = 1 << 53;

/// Spreadsheet store: each book is an `.xlsx` workbook and each page is a
/// worksheet named `{prefix} {n}`.
///
/// Pages are constant-memory worksheets: every finished row is streamed to a
/// temporary file, so only the row being written stays in RAM. Rows must
/// therefore arrive in increasing order. Values above
/// [`XLSX_MAX_EXACT_VALUE`] are rejected rather than rounded.
#[derive(Clone, Debug)]
pub struct XlsxStore {
    sheet_prefix: String,
}

impl XlsxStore {
    pub fn new() -> Self {
        Self::with_sheet_prefix("Sheet")
    }

    pub fn with_sheet_prefix(prefix: impl Into<String>) -> Self {
        Self {
            sheet_prefix: prefix.into(),
        }
    }
}

impl Default for XlsxStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A worksheet being filled before it is moved into its workbook.
pub struct XlsxPage {
    worksheet: Worksheet,
    next_row: usize,
}

fn xlsx_error(err: XlsxError) -> io::Error {
    io::Error::other(err.to_string())
}

fn out_of_range(what: &str, index: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{what} {index} is outside the worksheet grid"),
    )
}

fn invalid_input(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

impl Store for XlsxStore {
    type Book = Workbook;
    type Page = XlsxPage;

    fn extension(&self) -> &'static str {
        "xlsx"
    }

    fn create_book(&mut self) -> io::Result<Self::Book> {
        Ok(Workbook::new())
    }

    fn create_page(&mut self, book: &mut Self::Book, index: usize) -> io::Result<Self::Page> {
        let mut worksheet = book.new_worksheet_with_constant_memory();
        worksheet
            .set_name(format!("{} {}", self.sheet_prefix, index + 1))
            .map_err(xlsx_error)?;
        Ok(XlsxPage {
            worksheet,
            next_row: 0,
        })
    }

    fn write_row(
        &mut self,
        page: &mut Self::Page,
        row: usize,
        values: &[Value],
    ) -> io::Result<()> {
        let row_num = RowNum::try_from(row).map_err(|_| out_of_range("row", row))?;
        // Flushed rows are gone; the worksheet would silently drop the write.
        if row < page.next_row {
            return Err(invalid_input(format!(
                "row {row} was already written, next row is {}",
                page.next_row
            )));
        }
        if let Some(&value) = values.iter().find(|&&v| v > XLSX_MAX_EXACT_VALUE) {
            return Err(invalid_input(format!(
                "value {value} exceeds the exact cell limit {XLSX_MAX_EXACT_VALUE}"
            )));
        }

        for (col, &value) in values.iter().enumerate() {
            let col_num = ColNum::try_from(col).map_err(|_| out_of_range("column", col))?;
            page.worksheet
                .write_number(row_num, col_num, value as f64)
                .map_err(xlsx_error)?;
        }
        page.next_row = row + 1;
        Ok(())
    }

    fn flush_page(&mut self, book: &mut Self::Book, page: Self::Page) -> io::Result<()> {
        book.push_worksheet(page.worksheet);
        Ok(())
    }

    fn persist_book(&mut self, book: &mut Self::Book, path: &Path) -> io::Result<()> {
        book.save(path).map_err(xlsx_error)
    }

    fn release_book(&mut self, book: Self::Book) -> io::Result<()> {
        drop(book);
        Ok(())
    }
}
