use log::warn;

use crate::path::resolve_workbook_target;
use crate::relationships::relationships;
use crate::xml::{XmlElement, OFFICE_RELATIONSHIPS_NS};

/// One `<sheet>` of the workbook joined to the part its relationship points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    /// `sheetId`; 0 when missing or unparseable.
    pub sheet_id: u32,
    pub rel_id: String,
    pub part_name: String,
}

/// `<sheet>` elements of the workbook's `<sheets>` list.
pub(crate) fn workbook_sheet_elements(workbook: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    workbook
        .child("sheets")
        .into_iter()
        .flat_map(|sheets| sheets.elements())
        .filter(|el| el.local_name() == "sheet")
}

/// Join the workbook's sheet list with the workbook relationships.
///
/// Sheets whose relationship is missing or external are left out. Nothing here is cached, so the
/// result always reflects the current state of both documents.
pub fn sheet_registry(workbook: &XmlElement, workbook_rels: &XmlElement) -> Vec<SheetEntry> {
    let rels = relationships(workbook_rels);
    let mut out = Vec::new();
    for sheet in workbook_sheet_elements(workbook) {
        let (Some(name), Some(rel_id)) = (sheet.attr("name"), sheet.attr_local("id")) else {
            warn!("workbook <sheet> without name or r:id is ignored");
            continue;
        };
        let Some(rel) = rels.iter().find(|r| r.id == rel_id && !r.is_external()) else {
            warn!("sheet '{name}' points at unknown relationship '{rel_id}'");
            continue;
        };
        out.push(SheetEntry {
            name: name.to_string(),
            sheet_id: sheet
                .attr("sheetId")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
            rel_id: rel_id.to_string(),
            part_name: resolve_workbook_target(&rel.target),
        });
    }
    out
}

/// `max(sheetId) + 1` over every `<sheet>` in the workbook.
pub(crate) fn next_sheet_id(workbook: &XmlElement) -> u32 {
    workbook_sheet_elements(workbook)
        .filter_map(|el| el.attr("sheetId")?.trim().parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1
}

/// Qualified name to use for the relationship-id attribute of a new `<sheet>`.
///
/// Prefers the name existing sheets use, then whatever prefix the workbook root binds to the
/// relationships namespace. `None` means no binding exists yet and one has to be declared.
pub(crate) fn sheet_rel_id_attr(workbook: &XmlElement) -> Option<String> {
    let existing = workbook_sheet_elements(workbook)
        .flat_map(|el| el.attrs.iter())
        .map(|(k, _)| k)
        .find(|k| k.ends_with(":id"));
    if let Some(key) = existing {
        return Some(key.clone());
    }
    workbook
        .attrs
        .iter()
        .find(|(k, v)| k.starts_with("xmlns:") && v == OFFICE_RELATIONSHIPS_NS)
        .and_then(|(k, _)| k.strip_prefix("xmlns:"))
        .map(|prefix| format!("{prefix}:id"))
}
