use super::common::build_xlsx;
use dsgen_common::{CellRef, decode_used_range};
use dsgen_workbook::{TemplateReader, UmyaTemplate};

#[test]
fn reads_sheet_names_values_and_used_range() {
    let bytes = build_xlsx(|book| {
        let sh = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sh.get_cell_mut("A1").set_value_string("Tag");
        sh.get_cell_mut("C4").set_value_string("tail");
        book.new_sheet("Notes").unwrap();
    });
    let template = UmyaTemplate::open_bytes(bytes).unwrap();
    assert_eq!(template.sheet_names(), vec!["Sheet1", "Notes"]);
    assert!(template.has_sheet("Notes"));

    let descriptor = template.used_range("Sheet1").unwrap();
    let used = decode_used_range(descriptor.as_deref()).unwrap();
    assert_eq!((used.rows, used.cols), (4, 3));

    let a1 = CellRef::parse_a1("A1").unwrap();
    let b2 = CellRef::parse_a1("B2").unwrap();
    assert_eq!(template.cell_text("Sheet1", a1).unwrap().as_deref(), Some("Tag"));
    assert_eq!(template.cell_text("Sheet1", b2).unwrap(), None);
}

#[test]
fn used_range_starts_at_first_populated_cell() {
    let bytes = build_xlsx(|book| {
        let sh = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sh.get_cell_mut("C3").set_value_string("top-left");
        sh.get_cell_mut("D5").set_value_string("bottom-right");
    });
    let template = UmyaTemplate::open_bytes(bytes).unwrap();
    let descriptor = template.used_range("Sheet1").unwrap();
    assert_eq!(descriptor.as_deref(), Some("C3:D5"));

    let used = decode_used_range(descriptor.as_deref()).unwrap();
    assert_eq!((used.rows, used.cols), (3, 2));
    assert_eq!(used.origin, CellRef::parse_a1("C3").unwrap());
}

#[test]
fn empty_sheet_has_no_used_range() {
    let bytes = build_xlsx(|_| {});
    let template = UmyaTemplate::open_bytes(bytes).unwrap();
    assert_eq!(template.used_range("Sheet1").unwrap(), None);
}

#[test]
fn reports_merged_regions() {
    let bytes = build_xlsx(|book| {
        let sh = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sh.get_cell_mut("A1").set_value_string("Header");
        sh.add_merge_cells("A1:C1");
    });
    let template = UmyaTemplate::open_bytes(bytes).unwrap();
    let merges = template.merged_regions("Sheet1").unwrap();
    assert_eq!(merges.len(), 1);
    assert_eq!(merges[0].start.to_string(), "A1");
    assert_eq!(merges[0].end.to_string(), "C1");
}

#[test]
fn missing_sheet_is_an_error() {
    let template = UmyaTemplate::open_bytes(build_xlsx(|_| {})).unwrap();
    assert!(template.used_range("Nope").is_err());
}

#[test]
fn invalid_payload_fails_to_open() {
    assert!(UmyaTemplate::open_bytes(vec![0x01, 0x02, 0x03]).is_err());
}
