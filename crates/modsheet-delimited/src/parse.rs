/// Split delimited text into records of fields.
///
/// Outside quotes the delimiter ends a field and `\n`, `\r\n` or a lone `\r` ends a record; a `"`
/// starts a quoted span anywhere in a field. Inside quotes `""` is a literal quote, a single `"`
/// ends the span, and everything else (line breaks included) is literal.
///
/// A line break at the very end does not produce an extra empty record, a final record without a
/// terminator is kept, and a BOM at the start of the first field is dropped. Empty input yields
/// one record with one empty field.
pub fn parse(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(ch);
            }
            continue;
        }

        match ch {
            '"' => in_quotes = true,
            c if c == delimiter => record.push(std::mem::take(&mut field)),
            '\n' | '\r' => {
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            c => field.push(c),
        }
    }

    if !record.is_empty() || !field.is_empty() || records.is_empty() {
        record.push(field);
        records.push(record);
    }

    if let Some(first) = records.first_mut().and_then(|r| r.first_mut()) {
        if let Some(stripped) = first.strip_prefix('\u{feff}') {
            *first = stripped.to_string();
        }
    }

    records
}
