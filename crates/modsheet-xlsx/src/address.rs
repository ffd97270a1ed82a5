use core::fmt;

/// Largest column index a worksheet may address (`XFD`), 0-indexed.
pub const MAX_COL: u32 = 16_383;
/// Largest Excel row number (1-based).
pub const MAX_ROW_NUMBER: u32 = 1_048_576;

/// A reference to a single cell within a worksheet.
///
/// Rows and columns are **0-indexed**:
/// - `row = 0` is Excel row `1`
/// - `col = 0` is Excel column `A`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    /// 0-indexed row.
    pub row: u32,
    /// 0-indexed column.
    pub col: u32,
}

impl CellRef {
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Build a reference from a 1-based Excel row number and a 0-indexed column.
    #[inline]
    pub const fn from_row_number(row_number: u32, col: u32) -> Self {
        Self {
            row: row_number.saturating_sub(1),
            col,
        }
    }

    /// 1-based Excel row number.
    #[inline]
    pub const fn row_number(self) -> u32 {
        self.row + 1
    }

    /// Convert to Excel A1 notation (e.g. `A1`, `BC32`).
    pub fn to_a1(self) -> String {
        format!("{}{}", col_to_name(self.col), self.row + 1)
    }

    /// Parse a plain A1 reference: letters then digits, nothing else.
    ///
    /// Letters are accepted in either case. Absolute markers (`$`) are not accepted; cell `r`
    /// attributes never carry them.
    pub fn from_a1(a1: &str) -> Result<Self, A1ParseError> {
        let bytes = a1.as_bytes();
        if bytes.is_empty() {
            return Err(A1ParseError::Empty);
        }

        let mut idx = 0usize;
        while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
            idx += 1;
        }
        if idx == 0 {
            return Err(A1ParseError::MissingColumn);
        }
        let col_str = &a1[..idx];

        let row_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == row_start {
            return Err(A1ParseError::MissingRow);
        }
        if idx != bytes.len() {
            return Err(A1ParseError::TrailingCharacters);
        }

        let col = name_to_col(col_str)?;
        let row_number: u32 = a1[row_start..]
            .parse()
            .map_err(|_| A1ParseError::InvalidRow)?;
        if row_number == 0 || row_number > MAX_ROW_NUMBER {
            return Err(A1ParseError::InvalidRow);
        }

        Ok(Self {
            row: row_number - 1,
            col,
        })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

impl std::str::FromStr for CellRef {
    type Err = A1ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_a1(s)
    }
}

/// Errors that can occur while parsing an A1 reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum A1ParseError {
    Empty,
    MissingColumn,
    MissingRow,
    InvalidColumn,
    InvalidRow,
    TrailingCharacters,
}

impl fmt::Display for A1ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            A1ParseError::Empty => f.write_str("empty reference"),
            A1ParseError::MissingColumn => f.write_str("missing column letters"),
            A1ParseError::MissingRow => f.write_str("missing row number"),
            A1ParseError::InvalidColumn => f.write_str("invalid column"),
            A1ParseError::InvalidRow => f.write_str("invalid row"),
            A1ParseError::TrailingCharacters => f.write_str("unexpected trailing characters"),
        }
    }
}

impl std::error::Error for A1ParseError {}

/// Convert a 0-indexed column number to Excel letters (`0 -> A`, `25 -> Z`, `26 -> AA`).
pub fn col_to_name(col: u32) -> String {
    let mut n = col as u64 + 1;
    let mut out = Vec::<u8>::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        out.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Convert Excel column letters to a 0-indexed column number (`A -> 0`, `aa -> 26`).
pub fn name_to_col(name: &str) -> Result<u32, A1ParseError> {
    if name.is_empty() {
        return Err(A1ParseError::MissingColumn);
    }
    let mut col: u32 = 0;
    for b in name.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(A1ParseError::InvalidColumn);
        }
        let v = (b.to_ascii_uppercase() - b'A') as u32 + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(v))
            .ok_or(A1ParseError::InvalidColumn)?;
    }
    let col = col - 1;
    if col > MAX_COL {
        return Err(A1ParseError::InvalidColumn);
    }
    Ok(col)
}
