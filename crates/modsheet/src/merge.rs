use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use modsheet_delimited::DelimitedTable;
use modsheet_xlsx::{CellRef, XlsxPackage};

use crate::export::{read_export, resolve_column};
use crate::normalize::{
    cell_number, cell_text, extract_module_code_from_child_course, format_mark,
    normalize_module_code, normalize_reg_no,
};
use crate::{MarkSource, ModsheetError, TemplateLayout};

/// Moderated marks keyed by student and module, formatted for upload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModeratedMarks {
    by_student: BTreeMap<String, BTreeMap<String, String>>,
}

impl ModeratedMarks {
    /// Record a mark. A different mark for the same student and module is a conflict.
    pub fn insert(
        &mut self,
        student: &str,
        module: &str,
        mark: String,
    ) -> Result<(), ModsheetError> {
        let modules = self.by_student.entry(student.to_string()).or_default();
        match modules.get(module) {
            Some(existing) if *existing != mark => Err(ModsheetError::ConflictingRecord {
                student: student.to_string(),
                module: module.to_string(),
                first: existing.clone(),
                second: mark,
            }),
            _ => {
                modules.insert(module.to_string(), mark);
                Ok(())
            }
        }
    }

    pub fn get(&self, student: &str, module: &str) -> Option<&str> {
        self.by_student
            .get(student)
            .and_then(|m| m.get(module))
            .map(String::as_str)
    }

    /// The `(module, mark)` of a student who has a mark in exactly one module.
    pub fn only_mark_for(&self, student: &str) -> Option<(&str, &str)> {
        let modules = self.by_student.get(student)?;
        if modules.len() != 1 {
            return None;
        }
        modules
            .iter()
            .next()
            .map(|(module, mark)| (module.as_str(), mark.as_str()))
    }

    pub fn modules(&self) -> BTreeSet<&str> {
        self.by_student
            .values()
            .flat_map(|m| m.keys().map(String::as_str))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_student.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collect moderated marks from every coursework/exam sheet pair of a filled-in workbook.
///
/// The child pair is read when both of its sheets exist; having only one of them is an error.
pub fn extract_marks<S: MarkSource>(
    source: &mut S,
    layout: &TemplateLayout,
) -> Result<ModeratedMarks, ModsheetError> {
    let resolved = layout.resolve()?;
    let mut pairs = vec![(&layout.coursework_sheet, &layout.exam_sheet)];
    match (
        source.has_sheet(&layout.child_coursework_sheet),
        source.has_sheet(&layout.child_exam_sheet),
    ) {
        (true, true) => pairs.push((&layout.child_coursework_sheet, &layout.child_exam_sheet)),
        (false, false) => {}
        _ => {
            return Err(ModsheetError::UnpairedChildSheet {
                coursework: layout.child_coursework_sheet.clone(),
                exam: layout.child_exam_sheet.clone(),
            })
        }
    }

    let mut marks = ModeratedMarks::default();
    for (coursework, exam) in pairs {
        let module = normalize_module_code(&cell_text(
            &source.cell_value(exam, resolved.exam_module_code)?,
        ));
        if module.is_empty() {
            return Err(ModsheetError::MissingModuleCode {
                sheet: exam.clone(),
                cell: layout.exam_module_code_cell.clone(),
            });
        }

        let slots = |highest: u32, first: u32| i64::from(highest) - i64::from(first) + 1;
        let rows = slots(
            source.highest_row_index(coursework)?,
            resolved.coursework_first_row,
        )
        .max(slots(
            source.highest_row_index(exam)?,
            resolved.exam_first_row,
        ));
        debug!("scanning {rows} rows of '{coursework}'/'{exam}' for module {module}");

        for slot in 0..u32::try_from(rows.max(0)).unwrap_or(0) {
            let id_cell =
                CellRef::from_row_number(resolved.coursework_first_row + slot, resolved.student_id_col);
            let student = normalize_reg_no(&cell_text(&source.cell_value(coursework, id_cell)?));
            if student.is_empty() {
                continue;
            }
            let mark_cell =
                CellRef::from_row_number(resolved.exam_first_row + slot, resolved.moderated_mark_col);
            let Some(mark) = cell_number(&source.cell_value(exam, mark_cell)?) else {
                continue;
            };
            marks.insert(&student, &module, format_mark(mark))?;
        }
    }

    if marks.is_empty() {
        return Err(ModsheetError::NoMarks(layout.moderated_mark_column.clone()));
    }
    Ok(marks)
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub student_id_column: String,
    /// Module of rows without a child course; the workbook's exam module cell when absent.
    pub module_code: Option<String>,
    pub child_course_column: Option<String>,
    /// Column receiving marks for any module without its own entry in `target_columns`.
    pub target_column: Option<String>,
    /// Column receiving marks per module code.
    pub target_columns: BTreeMap<String, String>,
    /// Blank the target column of export rows that have no moderated mark.
    pub blank_unmatched: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeReport {
    pub records: usize,
    pub marks: usize,
    pub updated: usize,
    pub blanked: usize,
    pub default_module: String,
    pub student_id_column: String,
    /// Target header per module code.
    pub targets: BTreeMap<String, String>,
}

#[derive(Clone, Debug)]
pub struct MergeOutput {
    pub export: Vec<u8>,
    pub report: MergeReport,
}

/// Write the moderated marks of a filled-in workbook back into the LMS export it was built from.
///
/// The output keeps the export's headers, record order and delimiter and is encoded for upload.
pub fn merge_marks(
    export: &[u8],
    workbook: &[u8],
    layout: &TemplateLayout,
    options: &MergeOptions,
) -> Result<MergeOutput, ModsheetError> {
    let mut table = read_export(export)?;
    let sid_col = resolve_column(&table, &options.student_id_column)?;
    let child_col = options
        .child_course_column
        .as_deref()
        .map(|name| resolve_column(&table, name))
        .transpose()?;

    let mut package = XlsxPackage::from_bytes(workbook)?;
    let marks = extract_marks(&mut package, layout)?;

    let default_module = match options.module_code.as_deref().map(normalize_module_code) {
        Some(code) if !code.is_empty() => code,
        _ => {
            let cell = layout.resolve()?.exam_module_code;
            normalize_module_code(&cell_text(&package.cell_value(&layout.exam_sheet, cell)?))
        }
    };

    let row_module = |table: &DelimitedTable, idx: usize| {
        child_col
            .and_then(|col| table.get(idx, col))
            .map(extract_module_code_from_child_course)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_module.clone())
    };

    let mut modules: BTreeSet<String> = marks.modules().into_iter().map(String::from).collect();
    modules.insert(default_module.clone());
    for idx in 0..table.len() {
        modules.insert(row_module(&table, idx));
    }
    let targets = resolve_targets(&table, options, &modules)?;

    let mut updated = 0;
    let mut blanked = 0;
    for idx in 0..table.len() {
        let student = normalize_reg_no(table.get(idx, sid_col).unwrap_or_default());
        if student.is_empty() {
            continue;
        }
        let module = row_module(&table, idx);
        let found = marks
            .get(&student, &module)
            .map(|mark| (module.as_str(), mark))
            .or_else(|| marks.only_mark_for(&student));

        match found {
            Some((mark_module, mark)) => {
                let target = targets
                    .get(mark_module)
                    .or_else(|| targets.get(&module))
                    .copied()
                    .ok_or_else(|| ModsheetError::UnresolvedTarget(mark_module.to_string()))?;
                table.set(idx, target, mark);
                updated += 1;
            }
            None if options.blank_unmatched => {
                if let Some(&target) = targets.get(&module) {
                    table.set(idx, target, "");
                    blanked += 1;
                }
            }
            None => warn!("no moderated mark for student {student} in module {module}"),
        }
    }

    let report = MergeReport {
        records: table.len(),
        marks: marks.len(),
        updated,
        blanked,
        default_module,
        student_id_column: table.headers()[sid_col].clone(),
        targets: targets
            .iter()
            .map(|(module, &col)| (module.clone(), table.headers()[col].clone()))
            .collect(),
    };
    info!(
        "merged {} of {} marks into {} export rows",
        report.updated, report.marks, report.records
    );
    Ok(MergeOutput {
        export: table.to_bytes(),
        report,
    })
}

/// Target column index per module. Modules with no configured column are left out.
fn resolve_targets(
    table: &DelimitedTable,
    options: &MergeOptions,
    modules: &BTreeSet<String>,
) -> Result<BTreeMap<String, usize>, ModsheetError> {
    let per_module: BTreeMap<String, &String> = options
        .target_columns
        .iter()
        .map(|(module, column)| (normalize_module_code(module), column))
        .collect();

    let mut targets = BTreeMap::new();
    for module in modules {
        let column = per_module
            .get(module)
            .copied()
            .or(options.target_column.as_ref());
        if let Some(column) = column {
            targets.insert(module.clone(), resolve_column(table, column)?);
        }
    }
    Ok(targets)
}
