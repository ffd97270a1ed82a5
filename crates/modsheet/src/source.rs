use modsheet_xlsx::{CellRef, CellValue, XlsxError, XlsxPackage};

/// Read access to a filled-in moderation workbook.
pub trait MarkSource {
    fn has_sheet(&self, name: &str) -> bool;

    fn cell_value(&mut self, sheet: &str, cell: CellRef) -> Result<CellValue, XlsxError>;

    /// Highest 1-based row number present on `sheet`, or 0 when it has no rows.
    fn highest_row_index(&mut self, sheet: &str) -> Result<u32, XlsxError>;
}

impl MarkSource for XlsxPackage {
    fn has_sheet(&self, name: &str) -> bool {
        XlsxPackage::has_sheet(self, name)
    }

    fn cell_value(&mut self, sheet: &str, cell: CellRef) -> Result<CellValue, XlsxError> {
        XlsxPackage::cell_value(self, sheet, cell)
    }

    fn highest_row_index(&mut self, sheet: &str) -> Result<u32, XlsxError> {
        Ok(self.worksheet(sheet)?.highest_row_index())
    }
}
