/// Value written to or read from a worksheet cell.
///
/// Writers dispatch on the variant: numbers are stored as `<v>`, text as an inline string. Text
/// that merely looks numeric is still stored as text.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    /// True when writing this value leaves a cell without content.
    pub fn is_contentless(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Number(n) => !n.is_finite(),
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Bool(_) => false,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<Option<f64>> for CellValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(CellValue::Empty, CellValue::Number)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contentless_values() {
        assert!(CellValue::Empty.is_contentless());
        assert!(CellValue::from("   ").is_contentless());
        assert!(CellValue::Number(f64::NAN).is_contentless());
        assert!(CellValue::from(None::<f64>).is_contentless());
        assert!(!CellValue::from("0").is_contentless());
        assert!(!CellValue::Number(0.0).is_contentless());
    }
}
