//! In-place editing of XLSX packages.
//!
//! [`XlsxPackage`] keeps every archive entry in memory and edits worksheet XML directly: it clones
//! sheets, writes and clears cells, drops stale formula caches and keeps the workbook, relationship
//! and content-type parts consistent. It never evaluates formulas; instead it asks the spreadsheet
//! application to recalculate on load.

pub mod address;
pub mod content_types;
pub mod package;
pub mod path;
pub mod recalc_policy;
pub mod relationships;
pub mod shared_strings;
pub mod sheet_metadata;
pub mod sheet_refs;
pub mod value;
pub mod worksheet;
pub mod xml;

mod zip_util;

pub use address::{col_to_name, name_to_col, A1ParseError, CellRef};
pub use package::{parse_cell_ref, XlsxError, XlsxPackage, XlsxPackageLimits};
pub use recalc_policy::RecalcPolicy;
pub use sheet_metadata::{sheet_registry, SheetEntry};
pub use sheet_refs::SheetReferenceRewrite;
pub use value::CellValue;
pub use worksheet::{Row, WorksheetDocument};
