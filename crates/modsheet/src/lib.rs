//! Moderation workbooks for LMS mark exports.
//!
//! [`build_workbook`] reads a delimited mark export and fills a moderation template with one
//! cohort per coursework/exam sheet pair, cloning the pair for students enrolled through a child
//! course. Once moderators have entered final marks, [`merge_marks`] reads them back and writes
//! them into the original export, ready to be uploaded again.
//!
//! Every template position is described by [`TemplateLayout`]. Column choices that depend on the
//! export are supplied explicitly through [`BuildOptions`] and [`MergeOptions`].

pub mod build;
pub mod cohort;
pub mod error;
pub mod export;
pub mod layout;
pub mod merge;
pub mod normalize;
pub mod source;

pub use build::{
    build_workbook, BuildOptions, BuildOutput, BuildReport, ChildCohortOptions, CohortSummary,
    CourseworkColumn,
};
pub use cohort::{populate_cohort, Cohort, StudentRecord};
pub use error::ModsheetError;
pub use export::{read_export, resolve_column};
pub use layout::{TemplateLayout, COURSEWORK_SLOTS};
pub use merge::{extract_marks, merge_marks, MergeOptions, MergeOutput, MergeReport, ModeratedMarks};
pub use source::MarkSource;
