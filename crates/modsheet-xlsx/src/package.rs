use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use log::debug;
use thiserror::Error;

use crate::address::{A1ParseError, CellRef};
use crate::content_types::{ensure_override, WORKSHEET_CONTENT_TYPE};
use crate::path::{part_names_equivalent, resolve_workbook_target};
use crate::recalc_policy::{
    force_full_calc_on_load, remove_calc_chain_override, remove_calc_chain_relationships,
    RecalcPolicy,
};
use crate::relationships::{
    next_relationship_id, push_relationship, relationships, SHARED_STRINGS_REL_TYPE,
    WORKSHEET_REL_TYPE,
};
use crate::shared_strings::{parse_shared_strings, DEFAULT_SHARED_STRINGS_PART};
use crate::sheet_metadata::{next_sheet_id, sheet_registry, sheet_rel_id_attr, SheetEntry};
use crate::sheet_refs::SheetReferenceRewrite;
use crate::value::CellValue;
use crate::worksheet::WorksheetDocument;
use crate::xml::{XmlDocument, XmlElement, OFFICE_RELATIONSHIPS_NS};
use crate::zip_util::{read_entry_with_budget, ZipInflateBudget};

pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("xml error: {0}")]
    RoXml(#[from] roxmltree::Error),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("xml attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("missing xlsx part: {0}")]
    MissingPart(String),
    #[error("invalid xlsx: {0}")]
    Invalid(String),
    #[error("sheet '{0}' not found in workbook")]
    MissingSheet(String),
    #[error("invalid cell reference '{reference}': {source}")]
    InvalidCellReference {
        reference: String,
        #[source]
        source: A1ParseError,
    },
    #[error(
        "xlsx package part is too large to load safely: {part} is {size} bytes (max {max} bytes)"
    )]
    PartTooLarge { part: String, size: u64, max: u64 },
    #[error("xlsx package is too large to load safely: {total} bytes uncompressed (max {max})")]
    PackageTooLarge { total: u64, max: u64 },
}

/// Parse an A1 reference, reporting failures as [`XlsxError::InvalidCellReference`].
pub fn parse_cell_ref(reference: &str) -> Result<CellRef, XlsxError> {
    CellRef::from_a1(reference).map_err(|source| XlsxError::InvalidCellReference {
        reference: reference.to_string(),
        source,
    })
}

/// Size limits enforced by [`XlsxPackage::from_bytes_limited`].
#[derive(Debug, Clone, Copy)]
pub struct XlsxPackageLimits {
    /// Maximum allowed uncompressed bytes for any single part.
    pub max_part_bytes: u64,
    /// Maximum allowed uncompressed bytes across the whole package.
    pub max_total_bytes: u64,
}

impl Default for XlsxPackageLimits {
    fn default() -> Self {
        Self {
            max_part_bytes: crate::zip_util::DEFAULT_MAX_PART_BYTES,
            max_total_bytes: crate::zip_util::DEFAULT_MAX_TOTAL_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
struct ControlPart {
    /// Entry name as stored in the archive.
    key: String,
    doc: XmlDocument,
}

impl ControlPart {
    fn load(parts: &BTreeMap<String, Vec<u8>>, name: &str) -> Result<Self, XlsxError> {
        let (key, bytes) =
            find_part(parts, name).ok_or_else(|| XlsxError::MissingPart(name.to_string()))?;
        debug!("parsing control part {key}");
        Ok(Self {
            key: key.to_string(),
            doc: XmlDocument::parse(key, bytes)?,
        })
    }
}

fn find_part<'a>(parts: &'a BTreeMap<String, Vec<u8>>, name: &str) -> Option<(&'a str, &'a [u8])> {
    if let Some((key, bytes)) = parts.get_key_value(name) {
        return Some((key.as_str(), bytes.as_slice()));
    }
    parts
        .iter()
        .find(|(key, _)| part_names_equivalent(key, name))
        .map(|(key, bytes)| (key.as_str(), bytes.as_slice()))
}

/// An XLSX package opened for in-place editing.
///
/// Every archive entry is held in memory. The workbook, its relationships and the content-type
/// list are parsed up front; worksheets are parsed on first access and cached. Nothing is written
/// back to the part map until [`XlsxPackage::into_bytes`].
#[derive(Debug, Clone)]
pub struct XlsxPackage {
    parts: BTreeMap<String, Vec<u8>>,
    workbook: ControlPart,
    workbook_rels: ControlPart,
    content_types: ControlPart,
    worksheets: BTreeMap<String, WorksheetDocument>,
    shared_strings: Option<Vec<String>>,
}

impl XlsxPackage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, XlsxError> {
        Self::from_bytes_limited(bytes, XlsxPackageLimits::default())
    }

    pub fn from_bytes_limited(bytes: &[u8], limits: XlsxPackageLimits) -> Result<Self, XlsxError> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;

        let mut parts = BTreeMap::new();
        let mut budget = ZipInflateBudget::new(limits.max_total_bytes);
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if !file.is_file() {
                continue;
            }
            let name = file.name().to_string();
            let declared = file.size();
            let buf =
                read_entry_with_budget(&mut file, declared, &name, limits.max_part_bytes, &mut budget)?;
            parts.insert(name, buf);
        }
        debug!("read {} parts from package", parts.len());

        Ok(Self {
            workbook: ControlPart::load(&parts, WORKBOOK_PART)?,
            workbook_rels: ControlPart::load(&parts, WORKBOOK_RELS_PART)?,
            content_types: ControlPart::load(&parts, CONTENT_TYPES_PART)?,
            parts,
            worksheets: BTreeMap::new(),
            shared_strings: None,
        })
    }

    /// Raw bytes of a part as loaded (or as produced by [`XlsxPackage::clone_sheet`]).
    ///
    /// Edits held in parsed documents are not reflected here until the package is serialized.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        find_part(&self.parts, name).map(|(_, bytes)| bytes)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Current sheet registry, recomputed from the workbook and its relationships.
    pub fn sheets(&self) -> Vec<SheetEntry> {
        sheet_registry(&self.workbook.doc.root, &self.workbook_rels.doc.root)
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets().into_iter().map(|s| s.name).collect()
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheets().iter().any(|s| s.name == name)
    }

    /// Worksheet part path for the sheet called `name`.
    pub fn resolve_sheet_part(&self, name: &str) -> Result<String, XlsxError> {
        self.sheets()
            .into_iter()
            .find(|s| s.name == name)
            .map(|s| s.part_name)
            .ok_or_else(|| XlsxError::MissingSheet(name.to_string()))
    }

    fn ensure_worksheet(&mut self, name: &str) -> Result<String, XlsxError> {
        let part_name = self.resolve_sheet_part(name)?;
        let (key, bytes) = find_part(&self.parts, &part_name)
            .ok_or_else(|| XlsxError::MissingPart(part_name.clone()))?;
        if let Entry::Vacant(slot) = self.worksheets.entry(key.to_string()) {
            debug!("parsing worksheet {key} for sheet '{name}'");
            slot.insert(WorksheetDocument::parse(key, bytes)?);
        }
        Ok(key.to_string())
    }

    /// Parsed worksheet for `name`, parsed on first access and cached by part path.
    pub fn worksheet(&mut self, name: &str) -> Result<&mut WorksheetDocument, XlsxError> {
        let key = self.ensure_worksheet(name)?;
        self.worksheets
            .get_mut(&key)
            .ok_or(XlsxError::MissingPart(key))
    }

    fn ensure_shared_strings(&mut self) -> Result<(), XlsxError> {
        if self.shared_strings.is_some() {
            return Ok(());
        }
        let part_name = relationships(&self.workbook_rels.doc.root)
            .into_iter()
            .find(|rel| rel.type_uri == SHARED_STRINGS_REL_TYPE && !rel.is_external())
            .map(|rel| resolve_workbook_target(&rel.target))
            .unwrap_or_else(|| DEFAULT_SHARED_STRINGS_PART.to_string());
        let strings = match find_part(&self.parts, &part_name) {
            Some((_, bytes)) => parse_shared_strings(bytes)?,
            None => Vec::new(),
        };
        debug!("loaded {} shared strings", strings.len());
        self.shared_strings = Some(strings);
        Ok(())
    }

    /// Shared-string table, parsed once on first use. Empty when the package has none.
    pub fn shared_strings(&mut self) -> Result<&[String], XlsxError> {
        self.ensure_shared_strings()?;
        Ok(self.shared_strings.as_deref().unwrap_or_default())
    }

    /// Read a cell, resolving shared strings.
    pub fn cell_value(&mut self, sheet: &str, cell: CellRef) -> Result<CellValue, XlsxError> {
        self.ensure_shared_strings()?;
        let key = self.ensure_worksheet(sheet)?;
        let strings = self.shared_strings.as_deref().unwrap_or_default();
        Ok(self
            .worksheets
            .get(&key)
            .map(|ws| ws.cell_value(cell, strings))
            .unwrap_or_default())
    }

    /// Add a copy of worksheet `source` named `new_name`.
    ///
    /// Does nothing when `new_name` already exists. The copy is taken from the source part as
    /// stored in the archive, so unsaved edits to the source sheet are not carried over. When
    /// `rewrite` is given, references to one sheet name inside the copy are retargeted.
    pub fn clone_sheet(
        &mut self,
        source: &str,
        new_name: &str,
        rewrite: Option<&SheetReferenceRewrite>,
    ) -> Result<(), XlsxError> {
        let registry = self.sheets();
        if registry.iter().any(|s| s.name == new_name) {
            debug!("sheet '{new_name}' already exists, clone skipped");
            return Ok(());
        }
        let source_part = registry
            .iter()
            .find(|s| s.name == source)
            .map(|s| s.part_name.clone())
            .ok_or_else(|| XlsxError::MissingSheet(source.to_string()))?;
        let (_, source_bytes) = find_part(&self.parts, &source_part)
            .ok_or_else(|| XlsxError::MissingPart(source_part.clone()))?;
        let source_xml = std::str::from_utf8(source_bytes)?;
        let cloned_xml = match rewrite {
            Some(rewrite) => {
                debug!(
                    "retargeting '{}' references to '{}' in the copy",
                    rewrite.from(),
                    rewrite.to()
                );
                rewrite.apply(source_xml).into_owned()
            }
            None => source_xml.to_string(),
        };
        if !self.workbook.doc.root.has_child("sheets") {
            return Err(XlsxError::Invalid(format!(
                "{}: missing <sheets>",
                self.workbook.key
            )));
        }

        let part_number = self.next_worksheet_part_number();
        let part_name = format!("xl/worksheets/sheet{part_number}.xml");
        let rel_id = next_relationship_id(&self.workbook_rels.doc.root);
        let sheet_id = next_sheet_id(&self.workbook.doc.root);
        let rel_id_attr = sheet_rel_id_attr(&self.workbook.doc.root);
        debug!("cloning '{source}' into '{new_name}' as {part_name} ({rel_id}, sheetId {sheet_id})");

        self.parts.insert(part_name.clone(), cloned_xml.into_bytes());
        push_relationship(
            &mut self.workbook_rels.doc.root,
            &rel_id,
            WORKSHEET_REL_TYPE,
            &format!("worksheets/sheet{part_number}.xml"),
        );

        let workbook = &mut self.workbook.doc.root;
        let rel_id_attr = match rel_id_attr {
            Some(attr) => attr,
            None => {
                workbook.set_attr("xmlns:r", OFFICE_RELATIONSHIPS_NS);
                "r:id".to_string()
            }
        };
        if let Some(sheets) = workbook.child_mut("sheets") {
            let sheet = XmlElement::new(sheets.prefixed_name("sheet"))
                .with_attr("name", new_name)
                .with_attr("sheetId", sheet_id.to_string())
                .with_attr(rel_id_attr, rel_id);
            sheets.push_element(sheet);
        }

        ensure_override(
            &mut self.content_types.doc.root,
            &part_name,
            WORKSHEET_CONTENT_TYPE,
        );
        Ok(())
    }

    fn next_worksheet_part_number(&self) -> u32 {
        self.parts
            .keys()
            .filter_map(|name| {
                name.trim_start_matches('/')
                    .strip_prefix("xl/worksheets/sheet")?
                    .strip_suffix(".xml")?
                    .parse::<u32>()
                    .ok()
            })
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Ask the spreadsheet application to recalculate every formula when the file is opened.
    pub fn set_force_recalculation_on_load(&mut self) {
        force_full_calc_on_load(&mut self.workbook.doc.root);
    }

    pub fn apply_recalc_policy(&mut self, policy: RecalcPolicy) {
        if policy.force_full_calc_on_load {
            self.set_force_recalculation_on_load();
        }
        if policy.drop_calc_chain {
            if let Some((key, _)) = find_part(&self.parts, CALC_CHAIN_PART) {
                let key = key.to_string();
                self.parts.remove(&key);
            }
            if remove_calc_chain_relationships(&mut self.workbook_rels.doc.root) {
                debug!("dropped calc chain");
            }
            remove_calc_chain_override(&mut self.content_types.doc.root);
        }
    }

    /// Write every parsed document back into the part map and zip the package.
    pub fn into_bytes(self) -> Result<Vec<u8>, XlsxError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn write_to<W: Write>(mut self, mut w: W) -> Result<(), XlsxError> {
        for control in [&self.workbook, &self.workbook_rels, &self.content_types] {
            self.parts.insert(control.key.clone(), control.doc.to_bytes()?);
        }
        for (key, worksheet) in &self.worksheets {
            self.parts.insert(key.clone(), worksheet.to_bytes()?);
        }

        let cursor = Cursor::new(Vec::new());
        let mut zip = zip::ZipWriter::new(cursor);
        let options = zip::write::FileOptions::<()>::default()
            .compression_method(zip::CompressionMethod::Deflated);

        for (name, bytes) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }

        let cursor = zip.finish()?;
        w.write_all(&cursor.into_inner())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_package(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::<()>::default().compression_method(zip::CompressionMethod::Stored);
        for (name, bytes) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    const WORKBOOK: &[u8] = br#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
    const RELS: &[u8] = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
    const TYPES: &[u8] = br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#;
    const SHEET: &[u8] = br#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData/></worksheet>"#;

    #[test]
    fn missing_control_part_is_reported() {
        let bytes = build_package(&[("xl/workbook.xml", WORKBOOK), ("[Content_Types].xml", TYPES)]);
        let err = XlsxPackage::from_bytes(&bytes).unwrap_err();
        assert!(
            matches!(&err, XlsxError::MissingPart(p) if p == WORKBOOK_RELS_PART),
            "{err:?}"
        );
    }

    #[test]
    fn not_a_zip_is_reported() {
        let err = XlsxPackage::from_bytes(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, XlsxError::Zip(_)), "{err:?}");
    }

    #[test]
    fn from_bytes_limited_rejects_packages_exceeding_total_limit() {
        let bytes = build_package(&[("xl/a.xml", b"123456"), ("xl/b.xml", b"abcdef")]);
        let limits = XlsxPackageLimits {
            max_part_bytes: 10,
            max_total_bytes: 10,
        };
        match XlsxPackage::from_bytes_limited(&bytes, limits) {
            Err(XlsxError::PackageTooLarge { total, max }) => {
                assert_eq!(max, 10);
                assert!(total > max);
            }
            other => panic!("expected PackageTooLarge error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_sheet_is_reported() {
        let bytes = build_package(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("[Content_Types].xml", TYPES),
            ("xl/worksheets/sheet1.xml", SHEET),
        ]);
        let mut pkg = XlsxPackage::from_bytes(&bytes).unwrap();
        assert!(matches!(
            pkg.worksheet("Nope"),
            Err(XlsxError::MissingSheet(name)) if name == "Nope"
        ));
        assert!(matches!(
            pkg.clone_sheet("Nope", "Copy", None),
            Err(XlsxError::MissingSheet(_))
        ));
        assert_eq!(pkg.sheet_names(), vec!["Sheet1"]);
    }

    #[test]
    fn parse_cell_ref_wraps_parse_errors() {
        let err = parse_cell_ref("1A").unwrap_err();
        assert!(matches!(
            err,
            XlsxError::InvalidCellReference {
                source: A1ParseError::MissingColumn,
                ..
            }
        ));
        assert_eq!(parse_cell_ref("m39").unwrap().to_a1(), "M39");
    }
}
