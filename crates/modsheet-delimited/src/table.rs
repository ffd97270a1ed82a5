use log::warn;

use crate::encoding::{encode_for_output, TextEncoding};

/// A delimited export: a header row plus positional records.
///
/// Every record has exactly one field per header. The delimiter and encoding the export arrived
/// in are kept so it can be written back in the same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedTable {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
    delimiter: char,
    encoding: TextEncoding,
}

impl DelimitedTable {
    /// Build a table from already-split records, padding short records with `""` and dropping
    /// fields beyond the last header.
    pub fn new(
        headers: Vec<String>,
        records: Vec<Vec<String>>,
        delimiter: char,
        encoding: TextEncoding,
    ) -> Self {
        let width = headers.len();
        let records = records
            .into_iter()
            .map(|mut record| {
                record.resize(width, String::new());
                record
            })
            .collect();
        Self {
            headers,
            records,
            delimiter,
            encoding,
        }
    }

    /// Assemble a table from parsed records: the first record (trimmed) is the header row, and
    /// records whose fields are all blank are discarded.
    pub fn from_matrix(
        matrix: Vec<Vec<String>>,
        delimiter: char,
        encoding: TextEncoding,
    ) -> Self {
        let mut rows = matrix.into_iter();
        let headers: Vec<String> = rows
            .next()
            .unwrap_or_default()
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let width = headers.len();
        let records = rows
            .map(|mut record| {
                record.truncate(width);
                record
            })
            .filter(|record| record.iter().any(|field| !field.trim().is_empty()))
            .collect();
        let table = Self::new(headers, records, delimiter, encoding);
        for name in table.duplicate_headers() {
            warn!("duplicate header '{name}': lookups by name resolve to its first column");
        }
        table
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// True when there is no header row or every header is blank.
    pub fn has_blank_header_row(&self) -> bool {
        self.headers.iter().all(|h| h.is_empty())
    }

    /// Non-blank headers that occur more than once, compared like [`Self::column_index`].
    pub fn duplicate_headers(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for (idx, header) in self.headers.iter().enumerate() {
            if header.is_empty() || out.iter().any(|d| d.eq_ignore_ascii_case(header)) {
                continue;
            }
            if self.headers[idx + 1..]
                .iter()
                .any(|h| h.eq_ignore_ascii_case(header))
            {
                out.push(header);
            }
        }
        out
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Index of the first header equal to `name`, ignoring ASCII case and surrounding whitespace.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, record: usize, column: usize) -> Option<&str> {
        self.records
            .get(record)
            .and_then(|r| r.get(column))
            .map(String::as_str)
    }

    /// Overwrite one field. Returns `false` when the position is out of range.
    pub fn set(&mut self, record: usize, column: usize, value: impl Into<String>) -> bool {
        match self.records.get_mut(record).and_then(|r| r.get_mut(column)) {
            Some(field) => {
                *field = value.into();
                true
            }
            None => false,
        }
    }

    pub fn to_text(&self) -> String {
        serialize(&self.headers, &self.records, self.delimiter)
    }

    /// Serialized text encoded per [`encode_for_output`] for the table's source encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_for_output(&self.to_text(), self.encoding)
    }
}

/// Write a header row and records as delimited text.
///
/// A field is quoted, with inner quotes doubled, only when it contains a quote, a line break or
/// the delimiter. Records are joined with CRLF and the text has no trailing terminator.
pub fn serialize(headers: &[String], records: &[Vec<String>], delimiter: char) -> String {
    let mut out = String::new();
    let all = std::iter::once(headers).chain(records.iter().map(Vec::as_slice));
    for (idx, record) in all.enumerate() {
        if idx > 0 {
            out.push_str("\r\n");
        }
        for (col, field) in record.iter().enumerate() {
            if col > 0 {
                out.push(delimiter);
            }
            push_field(&mut out, field, delimiter);
        }
    }
    out
}

fn push_field(out: &mut String, field: &str, delimiter: char) {
    let needs_quotes = field
        .chars()
        .any(|c| c == '"' || c == '\n' || c == '\r' || c == delimiter);
    if needs_quotes {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;
    use pretty_assertions::assert_eq;

    fn strings(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn from_matrix_trims_headers_pads_and_drops_blank_records() {
        let matrix = vec![
            strings(&[" Username ", "Mark", "Notes"]),
            strings(&["u1", "50"]),
            strings(&["  ", "", " "]),
            strings(&["u2", "60", "", "extra"]),
        ];
        let table = DelimitedTable::from_matrix(matrix, ',', TextEncoding::Utf8);
        assert_eq!(table.headers(), strings(&["Username", "Mark", "Notes"]).as_slice());
        assert_eq!(
            table.records(),
            &[strings(&["u1", "50", ""]), strings(&["u2", "60", ""])]
        );
        assert_eq!(table.column_index("username"), Some(0));
        assert_eq!(table.column_index(" NOTES "), Some(2));
        assert_eq!(table.column_index("Total"), None);
    }

    #[test]
    fn duplicate_headers_are_reported_and_resolve_to_the_first_column() {
        let matrix = vec![
            strings(&["Username", "Final Mark", "", "final mark ", "Notes", ""]),
            strings(&["u1", "50", "", "51", "", ""]),
        ];
        let table = DelimitedTable::from_matrix(matrix, ',', TextEncoding::Utf8);
        assert_eq!(table.duplicate_headers(), vec!["Final Mark"]);
        assert_eq!(table.column_index("Final Mark"), Some(1));
        assert_eq!(table.get(0, 3), Some("51"));

        let unique = DelimitedTable::new(strings(&["a", "b"]), Vec::new(), ',', TextEncoding::Utf8);
        assert!(unique.duplicate_headers().is_empty());
    }

    #[test]
    fn empty_matrix_has_blank_header_row() {
        let table = DelimitedTable::from_matrix(parse("", ','), ',', TextEncoding::Utf8);
        assert!(table.has_blank_header_row());
        assert!(table.is_empty());
        assert!(DelimitedTable::from_matrix(Vec::new(), ',', TextEncoding::Utf8).has_blank_header_row());
    }

    #[test]
    fn serialize_quotes_only_when_needed() {
        let text = serialize(
            &strings(&["id", "name"]),
            &[
                strings(&["1", "Smith, Jo"]),
                strings(&["2", "say \"hi\""]),
                strings(&["3", "two\nlines"]),
                strings(&["4", "semi;colon"]),
            ],
            ',',
        );
        assert_eq!(
            text,
            "id,name\r\n1,\"Smith, Jo\"\r\n2,\"say \"\"hi\"\"\"\r\n3,\"two\nlines\"\r\n4,semi;colon"
        );
    }

    #[test]
    fn set_and_get_fields() {
        let mut table = DelimitedTable::new(
            strings(&["a", "b"]),
            vec![strings(&["1"])],
            '\t',
            TextEncoding::Utf16Le,
        );
        assert_eq!(table.get(0, 1), Some(""));
        assert!(table.set(0, 1, "x\ty"));
        assert!(!table.set(3, 0, "nope"));
        assert_eq!(table.to_text(), "a\tb\r\n1\t\"x\ty\"");
        assert_eq!(&table.to_bytes()[..4], &[0xFF, 0xFE, b'a', 0]);
    }
}
