use crate::xml::{XmlElement, XmlNode};

pub const CALC_CHAIN_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain";

/// How a package that had cells rewritten should ask the spreadsheet application to recalculate.
///
/// Cached formula results are cleared per worksheet by the editor; this covers the workbook-level
/// switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecalcPolicy {
    /// Set `fullCalcOnLoad="1"` and `forceFullCalc="1"` on `<calcPr>`.
    pub force_full_calc_on_load: bool,
    /// Remove `xl/calcChain.xml` along with its relationship and content-type override. The chain
    /// lists formula cells by address and goes stale once cells are overwritten.
    pub drop_calc_chain: bool,
}

impl Default for RecalcPolicy {
    fn default() -> Self {
        Self {
            force_full_calc_on_load: true,
            drop_calc_chain: true,
        }
    }
}

// Elements that may follow `<calcPr>` inside `<workbook>`.
const AFTER_CALC_PR: &[&str] = &[
    "oleSize",
    "customWorkbookViews",
    "pivotCaches",
    "smartTagPr",
    "smartTagTypes",
    "webPublishing",
    "fileRecoveryPr",
    "webPublishObjects",
    "extLst",
];

/// Ensure `<calcPr>` exists in the workbook root and request a full recalculation on load.
pub fn force_full_calc_on_load(workbook: &mut XmlElement) {
    if workbook.child("calcPr").is_none() {
        let calc_pr = XmlElement::new(workbook.prefixed_name("calcPr"));
        let at = workbook
            .children
            .iter()
            .position(|n| {
                n.as_element()
                    .is_some_and(|el| AFTER_CALC_PR.contains(&el.local_name()))
            })
            .unwrap_or(workbook.children.len());
        workbook.children.insert(at, XmlNode::Element(calc_pr));
    }

    if let Some(calc_pr) = workbook.child_mut("calcPr") {
        calc_pr.set_attr("fullCalcOnLoad", "1");
        calc_pr.set_attr("forceFullCalc", "1");
    }
}

/// Remove calc-chain relationships. Returns `true` when anything was removed.
pub(crate) fn remove_calc_chain_relationships(rels: &mut XmlElement) -> bool {
    let before = rels.children.len();
    rels.children.retain(|node| {
        !node.as_element().is_some_and(|el| {
            el.local_name() == "Relationship"
                && (el.attr("Type") == Some(CALC_CHAIN_REL_TYPE)
                    || el.attr("Target").is_some_and(|t| t.ends_with("calcChain.xml")))
        })
    });
    rels.children.len() != before
}

pub(crate) fn remove_calc_chain_override(types: &mut XmlElement) {
    types.children.retain(|node| {
        !node.as_element().is_some_and(|el| {
            el.local_name() == "Override"
                && el
                    .attr("PartName")
                    .is_some_and(|p| p.eq_ignore_ascii_case("/xl/calcChain.xml"))
        })
    });
}
