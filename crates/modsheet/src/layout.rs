use modsheet_xlsx::{name_to_col, parse_cell_ref, CellRef, XlsxError};
use serde::{Deserialize, Serialize};

use crate::ModsheetError;

/// Number of coursework mark slots the moderation template provides per student.
pub const COURSEWORK_SLOTS: usize = 4;

/// Where things live in the moderation template.
///
/// Cells are A1 references, columns are letters and rows are 1-based. Every field has a default
/// matching the stock template, so a JSON override only needs the fields that differ.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateLayout {
    pub coursework_sheet: String,
    pub exam_sheet: String,
    pub child_coursework_sheet: String,
    pub child_exam_sheet: String,

    /// Row of the first student slot on the coursework sheet.
    pub coursework_first_row: u32,
    /// Row of the first student slot on the exam sheet. Slot `n` is `exam_first_row + n`.
    pub exam_first_row: u32,

    pub coursework_module_code_cell: String,
    pub exam_module_code_cell: String,
    pub exam_module_name_cell: String,
    pub exam_organiser_cell: String,

    pub coursework_header_row: u32,
    pub coursework_header_first_column: String,
    pub exam_header_row: u32,
    pub exam_header_first_column: String,

    /// Coursework column holding the `#`-prefixed student identifier.
    pub student_id_column: String,
    /// First of the coursework mark columns; the others follow it.
    pub coursework_mark_first_column: String,
    /// Exam columns that are blanked for every slot, occupied or not.
    pub exam_detail_columns: Vec<String>,
    /// Exam column holding the moderated mark read back during merge.
    pub moderated_mark_column: String,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self {
            coursework_sheet: "Coursework".to_string(),
            exam_sheet: "Exam".to_string(),
            child_coursework_sheet: "Coursework Child".to_string(),
            child_exam_sheet: "Exam Child".to_string(),
            coursework_first_row: 2,
            exam_first_row: 39,
            coursework_module_code_cell: "A1".to_string(),
            exam_module_code_cell: "C3".to_string(),
            exam_module_name_cell: "D3".to_string(),
            exam_organiser_cell: "D6".to_string(),
            coursework_header_row: 1,
            coursework_header_first_column: "B".to_string(),
            exam_header_row: 13,
            exam_header_first_column: "D".to_string(),
            student_id_column: "A".to_string(),
            coursework_mark_first_column: "B".to_string(),
            exam_detail_columns: ["D", "E", "F", "G", "H", "I"]
                .into_iter()
                .map(String::from)
                .collect(),
            moderated_mark_column: "M".to_string(),
        }
    }
}

impl TemplateLayout {
    pub fn from_json(json: &str) -> Result<Self, ModsheetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse every reference up front so a bad layout fails before the package is touched.
    pub(crate) fn resolve(&self) -> Result<ResolvedLayout, ModsheetError> {
        Ok(ResolvedLayout {
            coursework_first_row: row_number(self.coursework_first_row, "coursework_first_row")?,
            exam_first_row: row_number(self.exam_first_row, "exam_first_row")?,
            coursework_module_code: parse_cell_ref(&self.coursework_module_code_cell)?,
            exam_module_code: parse_cell_ref(&self.exam_module_code_cell)?,
            exam_module_name: parse_cell_ref(&self.exam_module_name_cell)?,
            exam_organiser: parse_cell_ref(&self.exam_organiser_cell)?,
            coursework_header_row: row_number(
                self.coursework_header_row,
                "coursework_header_row",
            )?,
            coursework_header_first_col: column(&self.coursework_header_first_column)?,
            exam_header_row: row_number(self.exam_header_row, "exam_header_row")?,
            exam_header_first_col: column(&self.exam_header_first_column)?,
            student_id_col: column(&self.student_id_column)?,
            coursework_mark_first_col: column(&self.coursework_mark_first_column)?,
            exam_detail_cols: self
                .exam_detail_columns
                .iter()
                .map(|c| column(c))
                .collect::<Result<_, _>>()?,
            moderated_mark_col: column(&self.moderated_mark_column)?,
        })
    }
}

/// [`TemplateLayout`] with references parsed. Rows are 1-based, columns 0-based.
#[derive(Clone, Debug)]
pub(crate) struct ResolvedLayout {
    pub coursework_first_row: u32,
    pub exam_first_row: u32,
    pub coursework_module_code: CellRef,
    pub exam_module_code: CellRef,
    pub exam_module_name: CellRef,
    pub exam_organiser: CellRef,
    pub coursework_header_row: u32,
    pub coursework_header_first_col: u32,
    pub exam_header_row: u32,
    pub exam_header_first_col: u32,
    pub student_id_col: u32,
    pub coursework_mark_first_col: u32,
    pub exam_detail_cols: Vec<u32>,
    pub moderated_mark_col: u32,
}

fn row_number(row: u32, field: &str) -> Result<u32, ModsheetError> {
    if row == 0 {
        return Err(ModsheetError::InvalidLayout(format!(
            "{field} must be a 1-based row number"
        )));
    }
    Ok(row)
}

fn column(letters: &str) -> Result<u32, ModsheetError> {
    name_to_col(letters).map_err(|source| {
        ModsheetError::Xlsx(XlsxError::InvalidCellReference {
            reference: letters.to_string(),
            source,
        })
    })
}
