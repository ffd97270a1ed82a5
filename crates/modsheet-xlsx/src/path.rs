/// Resolve a relationship target against the part that owns the relationship.
fn resolve_target(source_part: &str, target: &str) -> String {
    let target = target.split('#').next().unwrap_or(target);
    if target.is_empty() {
        return normalize(source_part);
    }
    if let Some(target) = target.strip_prefix('/') {
        return normalize(target);
    }

    let base_dir = source_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    normalize(&format!("{base_dir}/{target}"))
}

/// Resolve a target found in the workbook relationships.
///
/// Some producers write package-relative targets without the leading `/`
/// (`xl/worksheets/sheet1.xml`); those are kept as-is instead of being nested under `xl/`.
pub fn resolve_workbook_target(target: &str) -> String {
    if target.starts_with("xl/") {
        return normalize(target);
    }
    resolve_target("xl/workbook.xml", target)
}

/// Collapse empty, `.` and `..` segments.
pub fn normalize(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}

/// Archive entry names are compared without a leading slash, with `\` treated as `/`, and
/// ASCII-case-insensitively.
pub fn part_names_equivalent(a: &str, b: &str) -> bool {
    fn canonical(name: &str) -> String {
        name.replace('\\', "/")
            .trim_start_matches('/')
            .to_ascii_lowercase()
    }
    a == b || canonical(a) == canonical(b)
}
