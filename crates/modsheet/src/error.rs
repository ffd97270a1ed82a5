use modsheet_xlsx::XlsxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModsheetError {
    #[error(transparent)]
    Xlsx(#[from] XlsxError),
    #[error("no header row found in export")]
    MissingHeaderRow,
    #[error("header row is empty in export")]
    EmptyHeaderRow,
    #[error("column '{0}' not found in export headers")]
    MissingColumn(String),
    #[error("{count} coursework columns given but the template has {max} slots")]
    TooManyCourseworkColumns { count: usize, max: usize },
    #[error("template sheet '{0}' has no student rows")]
    NoStudentRows(String),
    #[error("{cohort} cohort has {students} students but template capacity is {capacity}")]
    CapacityExceeded {
        cohort: String,
        students: usize,
        capacity: usize,
    },
    #[error("multiple child module codes found in one export: {}", .0.join(", "))]
    MultipleChildModules(Vec<String>),
    #[error("no student records with a student id were found")]
    NoStudents,
    #[error("workbook has only one child sheet; expected both '{coursework}' and '{exam}'")]
    UnpairedChildSheet { coursework: String, exam: String },
    #[error("module code missing in {sheet}!{cell}")]
    MissingModuleCode { sheet: String, cell: String },
    #[error("conflicting marks for student {student} in module {module}: {first} vs {second}")]
    ConflictingRecord {
        student: String,
        module: String,
        first: String,
        second: String,
    },
    #[error("no moderated marks found in workbook; ensure exam column {0} is populated")]
    NoMarks(String),
    #[error("could not resolve target column for module {0}")]
    UnresolvedTarget(String),
    #[error("invalid template layout: {0}")]
    InvalidLayout(String),
    #[error("invalid template layout json: {0}")]
    Layout(#[from] serde_json::Error),
}
