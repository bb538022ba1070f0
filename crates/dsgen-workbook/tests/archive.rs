use dsgen_workbook::{Archiver, ZipArchiver};
use std::io::{Cursor, Read};

#[test]
fn zip_contains_each_entry_once() {
    let mut archiver = ZipArchiver::new();
    archiver.add("PROJECT_P-1.xlsx", b"first".to_vec()).unwrap();
    archiver.add("PROJECT_P-2.xlsx", b"second".to_vec()).unwrap();
    archiver.add("PROJECT_P-1.xlsx", b"replaced".to_vec()).unwrap();
    assert_eq!(archiver.len(), 2);

    let bytes = archiver.finish().unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(zip.len(), 2);

    let mut text = String::new();
    zip.by_name("PROJECT_P-1.xlsx")
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "replaced");
    assert_eq!(zip.by_index(1).unwrap().name(), "PROJECT_P-2.xlsx");
}

#[test]
fn finish_to_path_writes_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("out.zip");
    let mut archiver = ZipArchiver::new();
    archiver.add("a.json", b"{}".to_vec()).unwrap();
    archiver.finish_to_path(&path).unwrap();
    let zip = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(zip.len(), 1);
}
