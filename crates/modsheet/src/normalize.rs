//! Normalization of the loosely formatted values found in LMS exports and filled-in workbooks.

use modsheet_xlsx::CellValue;

/// Trim a student registration number and drop one leading `'` and then one leading `#`.
///
/// Spreadsheet applications add the apostrophe to keep numeric-looking text as text; the `#` is
/// the prefix the moderation template uses.
pub fn normalize_reg_no(value: &str) -> String {
    let text = value.trim();
    let text = text.strip_prefix('\'').unwrap_or(text);
    let text = text.strip_prefix('#').unwrap_or(text);
    text.trim().to_string()
}

/// The identifier as written into the template: `#<normalized id>`, or empty.
pub fn format_reg_for_template(value: &str) -> String {
    let norm = normalize_reg_no(value);
    if norm.is_empty() {
        norm
    } else {
        format!("#{norm}")
    }
}

/// Remove all whitespace and uppercase.
pub fn normalize_module_code(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Module code of a child-course value.
///
/// The first non-empty `{...}` group wins (`"Intro {ab 123}"` gives `AB123`); without one the
/// whole value is normalized.
pub fn extract_module_code_from_child_course(value: &str) -> String {
    let text = value.trim();
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        let code = normalize_module_code(&after[..close]);
        if !code.is_empty() {
            return code;
        }
        rest = &after[close + 1..];
    }
    normalize_module_code(text)
}

/// Parse a mark, tolerating thousands separators and a trailing `%`.
pub fn parse_number(value: &str) -> Option<f64> {
    let text = value.trim().replace(',', "");
    let text = text.strip_suffix('%').unwrap_or(&text).trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Round to two decimals and drop trailing zeros (`71.50 -> "71.5"`, `64.0 -> "64"`).
pub fn format_mark(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let fixed = format!("{rounded:.2}");
    if let Some(whole) = fixed.strip_suffix(".00") {
        return whole.to_string();
    }
    match fixed.strip_suffix('0') {
        Some(one_decimal) => one_decimal.to_string(),
        None => fixed,
    }
}

/// Text of a cell as a user would read it.
pub fn cell_text(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Number(n) => n.to_string(),
        CellValue::Text(s) => s.clone(),
        CellValue::Bool(true) => "TRUE".to_string(),
        CellValue::Bool(false) => "FALSE".to_string(),
    }
}

/// Numeric reading of a cell: numbers as-is, text through [`parse_number`].
pub fn cell_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        CellValue::Text(s) => parse_number(s),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}
