use log::debug;
use modsheet_delimited::{read_table, DelimitedTable};

use crate::ModsheetError;

/// Read an LMS export, rejecting files without a usable header row.
pub fn read_export(bytes: &[u8]) -> Result<DelimitedTable, ModsheetError> {
    let table = read_table(bytes);
    let headers = table.headers();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty() && table.is_empty()) {
        return Err(ModsheetError::MissingHeaderRow);
    }
    if table.has_blank_header_row() {
        return Err(ModsheetError::EmptyHeaderRow);
    }
    debug!(
        "export has {} columns and {} records ({}, {:?})",
        headers.len(),
        table.len(),
        table.encoding(),
        table.delimiter()
    );
    Ok(table)
}

/// Index of the header named `name`, compared case-insensitively after trimming.
pub fn resolve_column(table: &DelimitedTable, name: &str) -> Result<usize, ModsheetError> {
    table
        .column_index(name)
        .filter(|_| !name.trim().is_empty())
        .ok_or_else(|| ModsheetError::MissingColumn(name.trim().to_string()))
}
