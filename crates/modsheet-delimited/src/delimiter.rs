/// Delimiters considered by [`detect_delimiter`], in tie-break order.
pub const CANDIDATE_DELIMITERS: [char; 4] = [',', '\t', ';', '|'];

/// Pick the delimiter that occurs most often, outside quotes, on the first non-blank line.
///
/// Ties go to the candidate listed first, so text with no candidate at all is comma-delimited.
pub fn detect_delimiter(text: &str) -> char {
    let first_line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();

    let mut best = CANDIDATE_DELIMITERS[0];
    let mut best_count = 0;
    for candidate in CANDIDATE_DELIMITERS {
        let count = count_outside_quotes(first_line, candidate);
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

fn count_outside_quotes(line: &str, delimiter: char) -> usize {
    let mut count = 0;
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if !in_quotes && ch == delimiter {
            count += 1;
        }
    }
    count
}
