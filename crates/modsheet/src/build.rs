use std::collections::BTreeSet;

use log::info;
use modsheet_delimited::DelimitedTable;
use modsheet_xlsx::{RecalcPolicy, SheetReferenceRewrite, XlsxPackage};

use crate::cohort::{populate_cohort, Cohort, StudentRecord};
use crate::export::{read_export, resolve_column};
use crate::layout::COURSEWORK_SLOTS;
use crate::normalize::{
    cell_text, extract_module_code_from_child_course, normalize_module_code, normalize_reg_no,
    parse_number,
};
use crate::{ModsheetError, TemplateLayout};

/// An export column carrying one coursework mark.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CourseworkColumn {
    pub header: String,
    /// Label written into the template; the header when absent.
    pub label: Option<String>,
}

impl CourseworkColumn {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| self.header.trim().to_string())
    }
}

/// Students enrolled through a linked child course.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildCohortOptions {
    pub child_course_column: String,
    pub coursework_columns: Vec<CourseworkColumn>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Module code of the main cohort; the template's exam module cell when blank.
    pub module_code: String,
    pub module_name: String,
    pub organiser: String,
    pub student_id_column: String,
    pub coursework_columns: Vec<CourseworkColumn>,
    pub child: Option<ChildCohortOptions>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CohortSummary {
    pub name: String,
    pub module_code: String,
    pub coursework_columns: usize,
    pub students: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildReport {
    pub student_id_column: String,
    pub child_course_column: Option<String>,
    pub cohorts: Vec<CohortSummary>,
}

#[derive(Clone, Debug)]
pub struct BuildOutput {
    pub workbook: Vec<u8>,
    pub report: BuildReport,
}

/// Turn an LMS export into a moderation workbook based on `template`.
pub fn build_workbook(
    template: &[u8],
    export: &[u8],
    layout: &TemplateLayout,
    options: &BuildOptions,
) -> Result<BuildOutput, ModsheetError> {
    let table = read_export(export)?;
    let sid_col = resolve_column(&table, &options.student_id_column)?;
    let main_cols = resolve_coursework_columns(&table, &options.coursework_columns)?;
    let child_course_col = options
        .child
        .as_ref()
        .map(|child| resolve_column(&table, &child.child_course_column))
        .transpose()?;
    let child_cols = options
        .child
        .as_ref()
        .map(|child| resolve_coursework_columns(&table, &child.coursework_columns))
        .transpose()?
        .unwrap_or_default();

    let mut main_rows = Vec::new();
    let mut child_rows = Vec::new();
    let mut child_modules = BTreeSet::new();
    for (idx, record) in table.records().iter().enumerate() {
        if normalize_reg_no(&record[sid_col]).is_empty() {
            continue;
        }
        let child_module = child_course_col
            .map(|col| extract_module_code_from_child_course(&record[col]))
            .unwrap_or_default();
        if child_module.is_empty() {
            main_rows.push(idx);
        } else {
            child_rows.push(idx);
            child_modules.insert(child_module);
        }
    }
    if child_modules.len() > 1 {
        return Err(ModsheetError::MultipleChildModules(
            child_modules.into_iter().collect(),
        ));
    }

    let mut package = XlsxPackage::from_bytes(template)?;
    let module_code = match normalize_module_code(&options.module_code) {
        code if code.is_empty() => {
            let cell = layout.resolve()?.exam_module_code;
            normalize_module_code(&cell_text(&package.cell_value(&layout.exam_sheet, cell)?))
        }
        code => code,
    };
    if module_code.is_empty() {
        return Err(ModsheetError::MissingModuleCode {
            sheet: layout.exam_sheet.clone(),
            cell: layout.exam_module_code_cell.clone(),
        });
    }

    let mut cohorts = vec![Cohort {
        name: "Main".to_string(),
        coursework_sheet: layout.coursework_sheet.clone(),
        exam_sheet: layout.exam_sheet.clone(),
        module_code,
        module_name: options.module_name.trim().to_string(),
        organiser: options.organiser.trim().to_string(),
        coursework_labels: labels(&options.coursework_columns),
        students: student_records(&table, &main_rows, sid_col, &main_cols),
    }];
    if let (Some(child), Some(child_module)) = (&options.child, child_modules.into_iter().next()) {
        cohorts.push(Cohort {
            name: "Child".to_string(),
            coursework_sheet: layout.child_coursework_sheet.clone(),
            exam_sheet: layout.child_exam_sheet.clone(),
            module_code: child_module,
            module_name: options.module_name.trim().to_string(),
            organiser: options.organiser.trim().to_string(),
            coursework_labels: labels(&child.coursework_columns),
            students: student_records(&table, &child_rows, sid_col, &child_cols),
        });
    }

    if cohorts.iter().all(|c| c.students.is_empty()) {
        return Err(ModsheetError::NoStudents);
    }

    if cohorts.len() > 1 {
        package.clone_sheet(&layout.coursework_sheet, &layout.child_coursework_sheet, None)?;
        let rewrite =
            SheetReferenceRewrite::new(&layout.coursework_sheet, &layout.child_coursework_sheet)?;
        package.clone_sheet(&layout.exam_sheet, &layout.child_exam_sheet, Some(&rewrite))?;
    }
    for cohort in &cohorts {
        populate_cohort(&mut package, layout, cohort)?;
    }
    package.apply_recalc_policy(RecalcPolicy::default());
    let workbook = package.into_bytes()?;

    let report = BuildReport {
        student_id_column: table.headers()[sid_col].clone(),
        child_course_column: child_course_col.map(|col| table.headers()[col].clone()),
        cohorts: cohorts
            .iter()
            .map(|c| CohortSummary {
                name: c.name.clone(),
                module_code: c.module_code.clone(),
                coursework_columns: c.coursework_labels.len(),
                students: c.students.len(),
            })
            .collect(),
    };
    info!(
        "built workbook ({} bytes) with {} cohort(s)",
        workbook.len(),
        report.cohorts.len()
    );
    Ok(BuildOutput { workbook, report })
}

fn resolve_coursework_columns(
    table: &DelimitedTable,
    columns: &[CourseworkColumn],
) -> Result<Vec<usize>, ModsheetError> {
    if columns.len() > COURSEWORK_SLOTS {
        return Err(ModsheetError::TooManyCourseworkColumns {
            count: columns.len(),
            max: COURSEWORK_SLOTS,
        });
    }
    columns
        .iter()
        .map(|c| resolve_column(table, &c.header))
        .collect()
}

fn labels(columns: &[CourseworkColumn]) -> Vec<String> {
    columns.iter().map(CourseworkColumn::display_label).collect()
}

fn student_records(
    table: &DelimitedTable,
    rows: &[usize],
    sid_col: usize,
    mark_cols: &[usize],
) -> Vec<StudentRecord> {
    rows.iter()
        .map(|&idx| {
            let record = &table.records()[idx];
            let marks: Vec<Option<f64>> = mark_cols
                .iter()
                .map(|&col| parse_number(&record[col]))
                .collect();
            StudentRecord::new(normalize_reg_no(&record[sid_col]), &marks)
        })
        .collect()
}
