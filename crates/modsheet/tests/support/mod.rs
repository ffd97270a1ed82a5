#![allow(dead_code)]

use std::io::{Cursor, Write};

use modsheet_xlsx::{CellRef, CellValue, XlsxPackage};
use zip::write::FileOptions;
use zip::ZipWriter;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
  <Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
  <Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Coursework" sheetId="1" r:id="rId1"/>
    <sheet name="Exam" sheetId="2" r:id="rId2"/>
  </sheets>
  <calcPr calcId="191029"/>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;

const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>OLD100</t></si>
  <si><t>Old label</t></si>
  <si><t>Total</t></si>
</sst>"#;

const MAIN_NS: &str = r#"xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main""#;

/// Coursework sheet: header row 1 and four student slots (rows 2-5) full of leftover content,
/// with a total formula in column F.
pub fn coursework_xml() -> String {
    let mut rows = String::from(
        r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>1</v></c><c r="D1" t="s"><v>1</v></c><c r="E1" t="s"><v>1</v></c><c r="F1" t="s"><v>2</v></c></row>"#,
    );
    for r in 2..=5 {
        rows.push_str(&format!(
            r#"<row r="{r}"><c r="A{r}" s="1" t="inlineStr"><is><t>#old{r}</t></is></c><c r="B{r}"><v>1</v></c><c r="C{r}"><v>2</v></c><c r="D{r}"><v>3</v></c><c r="E{r}"><v>4</v></c><c r="F{r}"><f>SUM(B{r}:E{r})</f><v>10</v></c></row>"#
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet {MAIN_NS}><dimension ref="A1:F5"/><sheetData>{rows}</sheetData></worksheet>"#
    )
}

/// Exam sheet: module metadata, coursework headers on row 13 and four student slots (rows
/// 39-42) with leftover detail marks in D..I and a formula pointing at the coursework total.
pub fn exam_xml() -> String {
    let mut rows = String::from(
        r#"<row r="3"><c r="C3" t="s"><v>0</v></c><c r="D3" t="inlineStr"><is><t>Old module</t></is></c></row><row r="6"><c r="D6" t="inlineStr"><is><t>Old organiser</t></is></c></row><row r="13"><c r="D13" t="s"><v>1</v></c><c r="E13" t="s"><v>1</v></c><c r="F13" t="s"><v>1</v></c><c r="G13" t="s"><v>1</v></c></row>"#,
    );
    for slot in 0..4 {
        let r = 39 + slot;
        let cw = 2 + slot;
        rows.push_str(&format!(r#"<row r="{r}">"#));
        for col in ["D", "E", "F", "G", "H", "I"] {
            rows.push_str(&format!(r#"<c r="{col}{r}"><v>5</v></c>"#));
        }
        rows.push_str(&format!(
            r#"<c r="M{r}" s="2"/><c r="N{r}"><f>Coursework!F{cw}</f><v>10</v></c></row>"#
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet {MAIN_NS}><sheetData>{rows}</sheetData></worksheet>"#
    )
}

pub fn build_package(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, bytes) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn template_bytes() -> Vec<u8> {
    let coursework = coursework_xml();
    let exam = exam_xml();
    build_package(&[
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", ROOT_RELS.as_bytes()),
        ("xl/workbook.xml", WORKBOOK.as_bytes()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
        ("xl/sharedStrings.xml", SHARED_STRINGS.as_bytes()),
        ("xl/worksheets/sheet1.xml", coursework.as_bytes()),
        ("xl/worksheets/sheet2.xml", exam.as_bytes()),
    ])
}

pub fn a1(reference: &str) -> CellRef {
    CellRef::from_a1(reference).unwrap()
}

pub fn cell(package: &mut XlsxPackage, sheet: &str, reference: &str) -> CellValue {
    package.cell_value(sheet, a1(reference)).unwrap()
}

pub fn text(value: &str) -> CellValue {
    CellValue::Text(value.to_string())
}

/// Apply cell writes to a saved workbook and save it again.
pub fn fill(bytes: &[u8], writes: &[(&str, &str, CellValue)]) -> Vec<u8> {
    let mut package = XlsxPackage::from_bytes(bytes).unwrap();
    for (sheet, reference, value) in writes {
        package
            .worksheet(sheet)
            .unwrap()
            .set_cell_value(a1(reference), value.clone());
    }
    package.into_bytes().unwrap()
}

/// Raw XML of a sheet in a saved workbook.
pub fn sheet_xml(bytes: &[u8], sheet: &str) -> String {
    let package = XlsxPackage::from_bytes(bytes).unwrap();
    let part = package.resolve_sheet_part(sheet).unwrap();
    String::from_utf8(package.part(&part).unwrap().to_vec()).unwrap()
}
