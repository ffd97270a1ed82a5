//! In-place editing of a single worksheet part.

use log::warn;

use crate::address::CellRef;
use crate::value::CellValue;
use crate::xml::{write_document, XmlDocument, XmlElement, XmlNode};
use crate::XlsxError;

/// A `<row>` of `<sheetData>`, with its cells kept in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// The row element itself; its children live in `cells` / `extra`.
    element: XmlElement,
    number: Option<u32>,
    cells: Vec<XmlElement>,
    extra: Vec<XmlNode>,
}

impl Row {
    fn new(name: String, number: u32) -> Self {
        Self {
            element: XmlElement::new(name).with_attr("r", number.to_string()),
            number: Some(number),
            cells: Vec::new(),
            extra: Vec::new(),
        }
    }

    fn from_element(mut element: XmlElement, part_name: &str) -> Self {
        let number = element.attr("r").and_then(|r| r.trim().parse::<u32>().ok());
        if number.is_none() {
            warn!("{part_name}: <row> without a usable r attribute is left untouched");
        }

        let mut cells = Vec::new();
        let mut extra = Vec::new();
        for node in std::mem::take(&mut element.children) {
            match node {
                XmlNode::Element(el) if el.local_name() == "c" => cells.push(el),
                XmlNode::Text(t) if t.trim().is_empty() => {}
                other => extra.push(other),
            }
        }

        Self {
            element,
            number,
            cells,
            extra,
        }
    }

    fn to_element(&self) -> XmlElement {
        let mut el = self.element.clone();
        el.children = self
            .cells
            .iter()
            .cloned()
            .map(XmlNode::Element)
            .chain(self.extra.iter().cloned())
            .collect();
        el
    }

    /// 1-based row number from the `r` attribute.
    pub fn number(&self) -> Option<u32> {
        self.number
    }

    pub fn cells(&self) -> &[XmlElement] {
        &self.cells
    }

    pub fn cell(&self, col: u32) -> Option<&XmlElement> {
        self.cells.iter().find(|c| cell_col(c) == Some(col))
    }
}

fn cell_col(cell: &XmlElement) -> Option<u32> {
    cell.attr("r")
        .and_then(|r| CellRef::from_a1(r).ok())
        .map(|c| c.col)
}

/// Parsed worksheet part.
///
/// `<sheetData>` is held as typed rows; every other element of the part is kept verbatim and
/// written back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct WorksheetDocument {
    part_name: String,
    root: XmlElement,
    sheet_data_slot: usize,
    sheet_data: XmlElement,
    rows: Vec<Row>,
}

impl WorksheetDocument {
    pub fn parse(part_name: &str, bytes: &[u8]) -> Result<Self, XlsxError> {
        let mut root = XmlDocument::parse(part_name, bytes)?.root;
        let slot = root
            .children
            .iter()
            .position(|n| matches!(n, XmlNode::Element(el) if el.local_name() == "sheetData"))
            .ok_or_else(|| XlsxError::Invalid(format!("{part_name}: missing <sheetData>")))?;

        let XmlNode::Element(mut sheet_data) =
            std::mem::replace(&mut root.children[slot], XmlNode::Text(String::new()))
        else {
            return Err(XlsxError::Invalid(format!(
                "{part_name}: <sheetData> is not an element"
            )));
        };

        let mut rows = Vec::new();
        for node in std::mem::take(&mut sheet_data.children) {
            match node {
                XmlNode::Element(el) if el.local_name() == "row" => {
                    rows.push(Row::from_element(el, part_name))
                }
                XmlNode::Element(el) => {
                    warn!("{part_name}: dropping unexpected <{}> in <sheetData>", el.name)
                }
                _ => {}
            }
        }

        Ok(Self {
            part_name: part_name.to_string(),
            root,
            sheet_data_slot: slot,
            sheet_data,
            rows,
        })
    }

    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Largest 1-based row number present in `<sheetData>`, or 0 for an empty sheet.
    pub fn highest_row_index(&self) -> u32 {
        self.rows.iter().filter_map(Row::number).max().unwrap_or(0)
    }

    pub fn row(&self, row: u32) -> Option<&Row> {
        let number = row + 1;
        self.rows.iter().find(|r| r.number == Some(number))
    }

    /// Locate or create the row for 0-indexed `row`, keeping rows ordered by number.
    pub fn ensure_row(&mut self, row: u32) -> &mut Row {
        let number = row + 1;
        let idx = match self.rows.iter().position(|r| r.number == Some(number)) {
            Some(idx) => idx,
            None => {
                let insert_at = self
                    .rows
                    .iter()
                    .position(|r| r.number.is_some_and(|n| n > number))
                    .unwrap_or(self.rows.len());
                let name = self.sheet_data.prefixed_name("row");
                self.rows.insert(insert_at, Row::new(name, number));
                insert_at
            }
        };
        &mut self.rows[idx]
    }

    /// Locate or create the `<c>` element for `cell`, keeping cells ordered by column.
    pub fn ensure_cell(&mut self, cell: CellRef) -> &mut XmlElement {
        let row = self.ensure_row(cell.row);
        let idx = match row.cells.iter().position(|c| cell_col(c) == Some(cell.col)) {
            Some(idx) => idx,
            None => {
                let insert_at = row
                    .cells
                    .iter()
                    .position(|c| cell_col(c).is_some_and(|col| col > cell.col))
                    .unwrap_or(row.cells.len());
                let el = XmlElement::new(row.element.prefixed_name("c")).with_attr("r", cell.to_a1());
                row.cells.insert(insert_at, el);
                insert_at
            }
        };
        &mut row.cells[idx]
    }

    pub fn cell(&self, cell: CellRef) -> Option<&XmlElement> {
        self.row(cell.row).and_then(|r| r.cell(cell.col))
    }

    /// Write `value` into `cell`, replacing any value, inline string or formula it had.
    ///
    /// Contentless values (see [`CellValue::is_contentless`]) leave the cell present but empty.
    /// The style attribute is kept.
    pub fn set_cell_value(&mut self, cell: CellRef, value: impl Into<CellValue>) {
        let value = value.into();
        let c = self.ensure_cell(cell);
        clear_contents(c);
        if value.is_contentless() {
            return;
        }

        match value {
            CellValue::Number(n) => {
                let v = text_element(c.prefixed_name("v"), n.to_string());
                insert_content(c, v);
            }
            CellValue::Bool(b) => {
                c.set_attr("t", "b");
                let v = text_element(c.prefixed_name("v"), if b { "1" } else { "0" }.to_string());
                insert_content(c, v);
            }
            CellValue::Text(s) => {
                c.set_attr("t", "inlineStr");
                let preserve = s.trim() != s;
                let mut t = text_element(c.prefixed_name("t"), s);
                if preserve {
                    t.set_attr("xml:space", "preserve");
                }
                let mut is = XmlElement::new(c.prefixed_name("is"));
                is.push_element(t);
                insert_content(c, is);
            }
            CellValue::Empty => {}
        }
    }

    /// Remove the content of an existing cell. Missing cells are not created.
    pub fn clear_cell(&mut self, cell: CellRef) {
        let number = cell.row_number();
        let Some(row) = self.rows.iter_mut().find(|r| r.number == Some(number)) else {
            return;
        };
        if let Some(c) = row.cells.iter_mut().find(|c| cell_col(c) == Some(cell.col)) {
            clear_contents(c);
        }
    }

    /// Drop the cached `<v>` of every formula cell so the stored result can't be shown stale.
    pub fn clear_formula_cached_values(&mut self) {
        for c in self.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
            if c.has_child("f") {
                c.remove_children(&["v"]);
            }
        }
    }

    /// Read the value of `cell`, resolving shared-string indices through `shared_strings`.
    pub fn cell_value(&self, cell: CellRef, shared_strings: &[String]) -> CellValue {
        self.cell(cell)
            .map(|c| read_cell_value(c, shared_strings))
            .unwrap_or(CellValue::Empty)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, XlsxError> {
        let mut sheet_data = self.sheet_data.clone();
        sheet_data.children = self
            .rows
            .iter()
            .map(|r| XmlNode::Element(r.to_element()))
            .collect();

        let mut root = self.root.clone();
        match root.children.get_mut(self.sheet_data_slot) {
            Some(slot) => *slot = XmlNode::Element(sheet_data),
            None => root.children.push(XmlNode::Element(sheet_data)),
        }
        write_document(&root)
    }
}

fn text_element(name: String, text: String) -> XmlElement {
    let mut el = XmlElement::new(name);
    el.children.push(XmlNode::Text(text));
    el
}

fn clear_contents(c: &mut XmlElement) {
    c.remove_children(&["v", "is", "f"]);
    c.remove_attr("t");
}

// `<extLst>` must stay the last child of `<c>`.
fn insert_content(c: &mut XmlElement, el: XmlElement) {
    let at = c
        .children
        .iter()
        .position(|n| matches!(n, XmlNode::Element(e) if e.local_name() == "extLst"))
        .unwrap_or(c.children.len());
    c.children.insert(at, XmlNode::Element(el));
}

fn read_cell_value(c: &XmlElement, shared_strings: &[String]) -> CellValue {
    let raw = c.child("v").map(XmlElement::text);
    match c.attr("t") {
        Some("s") => raw
            .and_then(|r| r.trim().parse::<usize>().ok())
            .and_then(|idx| shared_strings.get(idx))
            .map(|s| CellValue::Text(s.clone()))
            .unwrap_or(CellValue::Empty),
        Some("inlineStr") => c
            .child("is")
            .map(|is| CellValue::Text(rich_text(is)))
            .unwrap_or(CellValue::Empty),
        Some("b") => raw
            .map(|r| CellValue::Bool(r.trim() == "1"))
            .unwrap_or(CellValue::Empty),
        Some("str") | Some("e") => raw.map(CellValue::Text).unwrap_or(CellValue::Empty),
        _ => match raw {
            None => CellValue::Empty,
            Some(r) => match r.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Text(r),
            },
        },
    }
}

/// Text of an `<is>`/`<si>` element: direct `<t>` plus `<r><t>` runs, phonetic runs skipped.
fn rich_text(el: &XmlElement) -> String {
    let mut out = String::new();
    for child in el.elements() {
        match child.local_name() {
            "t" => out.push_str(&child.text()),
            "r" => {
                if let Some(t) = child.child("t") {
                    out.push_str(&t.text());
                }
            }
            _ => {}
        }
    }
    out
}
