use std::io::Cursor;
use umya_spreadsheet::Spreadsheet;

/// Build an in-memory xlsx by mutating a fresh single-sheet workbook.
pub fn build_xlsx<F: FnOnce(&mut Spreadsheet)>(f: F) -> Vec<u8> {
    let mut book = umya_spreadsheet::new_file();
    f(&mut book);
    let mut buf = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut buf).unwrap();
    buf.into_inner()
}
