use log::{debug, info};
use modsheet_xlsx::{CellRef, CellValue, XlsxPackage};

use crate::layout::{ResolvedLayout, COURSEWORK_SLOTS};
use crate::normalize::format_reg_for_template;
use crate::{ModsheetError, TemplateLayout};

/// One student row: identifier plus one optional mark per coursework slot.
#[derive(Clone, Debug, PartialEq)]
pub struct StudentRecord {
    pub student_id: String,
    pub marks: [Option<f64>; COURSEWORK_SLOTS],
}

impl StudentRecord {
    /// Marks beyond the slot count are ignored; missing ones are blank.
    pub fn new(student_id: impl Into<String>, marks: &[Option<f64>]) -> Self {
        let mut slots = [None; COURSEWORK_SLOTS];
        for (slot, mark) in slots.iter_mut().zip(marks) {
            *slot = *mark;
        }
        Self {
            student_id: student_id.into(),
            marks: slots,
        }
    }
}

/// Students sharing one coursework/exam sheet pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Cohort {
    /// Label used in messages (`Main`, `Child`).
    pub name: String,
    pub coursework_sheet: String,
    pub exam_sheet: String,
    pub module_code: String,
    pub module_name: String,
    pub organiser: String,
    pub coursework_labels: Vec<String>,
    pub students: Vec<StudentRecord>,
}

/// Write one cohort into its sheet pair.
///
/// Every slot the template provides is rewritten: occupied slots get the identifier and marks,
/// the rest are blanked, and the per-student exam detail columns are cleared for all of them.
/// Fails without touching the package when the labels or students don't fit the template.
pub fn populate_cohort(
    package: &mut XlsxPackage,
    layout: &TemplateLayout,
    cohort: &Cohort,
) -> Result<(), ModsheetError> {
    let resolved = layout.resolve()?;

    if cohort.coursework_labels.len() > COURSEWORK_SLOTS {
        return Err(ModsheetError::TooManyCourseworkColumns {
            count: cohort.coursework_labels.len(),
            max: COURSEWORK_SLOTS,
        });
    }

    package.worksheet(&cohort.exam_sheet)?;
    let highest = package
        .worksheet(&cohort.coursework_sheet)?
        .highest_row_index();
    let capacity = i64::from(highest) - i64::from(resolved.coursework_first_row) + 1;
    if capacity <= 0 {
        return Err(ModsheetError::NoStudentRows(cohort.coursework_sheet.clone()));
    }
    let capacity = capacity as usize;
    if cohort.students.len() > capacity {
        return Err(ModsheetError::CapacityExceeded {
            cohort: cohort.name.clone(),
            students: cohort.students.len(),
            capacity,
        });
    }
    debug!(
        "{}: {} students in {capacity} slots on '{}'",
        cohort.name,
        cohort.students.len(),
        cohort.coursework_sheet
    );

    write_coursework(package, &resolved, cohort, capacity)?;
    write_exam(package, &resolved, cohort, capacity)?;

    info!(
        "populated {} cohort: module {}, {} students",
        cohort.name,
        cohort.module_code,
        cohort.students.len()
    );
    Ok(())
}

fn label(cohort: &Cohort, slot: usize) -> CellValue {
    cohort
        .coursework_labels
        .get(slot)
        .map_or(CellValue::Empty, |l| CellValue::Text(l.clone()))
}

fn write_coursework(
    package: &mut XlsxPackage,
    layout: &ResolvedLayout,
    cohort: &Cohort,
    capacity: usize,
) -> Result<(), ModsheetError> {
    let sheet = package.worksheet(&cohort.coursework_sheet)?;

    sheet.set_cell_value(layout.coursework_module_code, cohort.module_code.as_str());
    for slot in 0..COURSEWORK_SLOTS {
        let cell = CellRef::from_row_number(
            layout.coursework_header_row,
            layout.coursework_header_first_col + slot as u32,
        );
        sheet.set_cell_value(cell, label(cohort, slot));
    }

    for slot in 0..capacity {
        let row = layout.coursework_first_row + slot as u32;
        let id_cell = CellRef::from_row_number(row, layout.student_id_col);
        let mark_cell =
            |i: usize| CellRef::from_row_number(row, layout.coursework_mark_first_col + i as u32);
        match cohort.students.get(slot) {
            Some(student) => {
                sheet.set_cell_value(id_cell, format_reg_for_template(&student.student_id));
                for (i, mark) in student.marks.iter().enumerate() {
                    sheet.set_cell_value(mark_cell(i), *mark);
                }
            }
            None => {
                sheet.clear_cell(id_cell);
                for i in 0..COURSEWORK_SLOTS {
                    sheet.clear_cell(mark_cell(i));
                }
            }
        }
    }

    sheet.clear_formula_cached_values();
    Ok(())
}

fn write_exam(
    package: &mut XlsxPackage,
    layout: &ResolvedLayout,
    cohort: &Cohort,
    capacity: usize,
) -> Result<(), ModsheetError> {
    let sheet = package.worksheet(&cohort.exam_sheet)?;

    sheet.set_cell_value(layout.exam_module_code, cohort.module_code.as_str());
    sheet.set_cell_value(layout.exam_module_name, cohort.module_name.as_str());
    sheet.set_cell_value(layout.exam_organiser, cohort.organiser.as_str());
    for slot in 0..COURSEWORK_SLOTS {
        let cell = CellRef::from_row_number(
            layout.exam_header_row,
            layout.exam_header_first_col + slot as u32,
        );
        sheet.set_cell_value(cell, label(cohort, slot));
    }

    for slot in 0..capacity {
        let row = layout.exam_first_row + slot as u32;
        for &col in &layout.exam_detail_cols {
            sheet.clear_cell(CellRef::from_row_number(row, col));
        }
    }

    sheet.clear_formula_cached_values();
    Ok(())
}
