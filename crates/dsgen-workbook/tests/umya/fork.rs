use super::common::build_xlsx;
use dsgen_common::CellRef;
use dsgen_workbook::{OutputDocument, TemplateReader, UmyaTemplate};

fn cell(a1: &str) -> CellRef {
    CellRef::parse_a1(a1).unwrap()
}

#[test]
fn forks_are_independent_of_template_and_each_other() {
    let bytes = build_xlsx(|book| {
        let sh = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sh.get_cell_mut("B2").set_value_string("original");
    });
    let template = UmyaTemplate::open_bytes(bytes).unwrap();

    let mut first = template.fork().unwrap();
    let mut second = template.fork().unwrap();
    first.set_text("Sheet1", cell("B2"), "one").unwrap();
    second.set_text("Sheet1", cell("B2"), "two").unwrap();

    assert_eq!(
        template.cell_text("Sheet1", cell("B2")).unwrap().as_deref(),
        Some("original")
    );

    let reopened = UmyaTemplate::open_bytes(first.to_bytes().unwrap()).unwrap();
    assert_eq!(
        reopened.cell_text("Sheet1", cell("B2")).unwrap().as_deref(),
        Some("one")
    );
    let reopened = UmyaTemplate::open_bytes(second.to_bytes().unwrap()).unwrap();
    assert_eq!(
        reopened.cell_text("Sheet1", cell("B2")).unwrap().as_deref(),
        Some("two")
    );
}

#[test]
fn numeric_looking_values_stay_text() {
    let template = UmyaTemplate::open_bytes(build_xlsx(|_| {})).unwrap();
    let mut doc = template.fork().unwrap();
    doc.set_text("Sheet1", cell("A1"), "007").unwrap();
    let reopened = UmyaTemplate::open_bytes(doc.to_bytes().unwrap()).unwrap();
    assert_eq!(
        reopened.cell_text("Sheet1", cell("A1")).unwrap().as_deref(),
        Some("007")
    );
}

#[test]
fn writing_to_missing_sheet_fails() {
    let template = UmyaTemplate::open_bytes(build_xlsx(|_| {})).unwrap();
    let mut doc = template.fork().unwrap();
    assert!(!doc.has_sheet("Ghost"));
    assert!(doc.set_text("Ghost", cell("A1"), "x").is_err());
}
