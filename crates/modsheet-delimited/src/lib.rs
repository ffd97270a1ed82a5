//! Reading and writing LMS mark exports.
//!
//! Exports arrive as delimited text in whatever encoding and delimiter the LMS (or a spreadsheet
//! application in between) chose. This crate sniffs both, parses the quoted/escaped records, and
//! writes edited tables back out so they can be uploaded again. Nothing here fails: undecodable
//! bytes become U+FFFD and unbalanced quotes run to the end of the input.

pub mod delimiter;
pub mod encoding;
pub mod parse;
pub mod table;

use log::debug;

pub use delimiter::{detect_delimiter, CANDIDATE_DELIMITERS};
pub use encoding::{decode, detect_encoding, encode_for_output, TextEncoding};
pub use parse::parse;
pub use table::{serialize, DelimitedTable};

/// Detect encoding and delimiter, parse, and assemble a table.
pub fn read_table(bytes: &[u8]) -> DelimitedTable {
    let encoding = detect_encoding(bytes);
    let text = decode(bytes, encoding);
    let delimiter = detect_delimiter(&text);
    let matrix = parse(&text, delimiter);
    debug!(
        "export: {} bytes, encoding {encoding}, delimiter {delimiter:?}, {} raw records",
        bytes.len(),
        matrix.len()
    );
    DelimitedTable::from_matrix(matrix, delimiter, encoding)
}
