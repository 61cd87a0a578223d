//! Workbook file-name handling: canonical names and "did you mean" hints

use similar::TextDiff;

/// Extension every managed workbook carries
pub const WORKBOOK_EXTENSION: &str = ".xlsx";

/// Default minimum similarity for a suggestion
pub const DEFAULT_SUGGESTION_CUTOFF: f64 = 0.6;

/// Canonical registry key for a file name.
///
/// Trims, collapses runs of spaces, and appends the workbook extension when
/// missing. Idempotent.
pub fn canonicalize(name: &str) -> String {
    let mut canonical = String::with_capacity(name.len() + WORKBOOK_EXTENSION.len());
    let mut previous_space = false;
    for ch in name.trim().chars() {
        if ch == ' ' {
            if previous_space {
                continue;
            }
            previous_space = true;
        } else {
            previous_space = false;
        }
        canonical.push(ch);
    }

    if !has_workbook_extension(&canonical) {
        canonical.push_str(WORKBOOK_EXTENSION);
    }
    canonical
}

/// True when the name ends with the workbook extension, ignoring case
pub fn has_workbook_extension(name: &str) -> bool {
    name.to_lowercase().ends_with(WORKBOOK_EXTENSION)
}

/// Drop any directory components, accepting both separator styles
pub fn bare_file_name(name: &str) -> String {
    name.trim()
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Closest candidate whose similarity to `name` reaches `cutoff`.
///
/// Scoring is case-sensitive and measures each candidate against `name`,
/// in that order; the ratio is not symmetric.
pub fn suggest<'a, I>(name: &str, candidates: I, cutoff: f64) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut best: Option<(f64, &String)> = None;

    for candidate in candidates {
        let score = similarity(candidate, name);
        if score < cutoff {
            continue;
        }
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, candidate));
        }
    }

    best.map(|(_, name)| name.clone())
}

/// Character-level match ratio of `b` against `a`: twice the matched
/// characters over the combined length, in `0.0..=1.0`.
pub fn similarity(a: &str, b: &str) -> f64 {
    f64::from(TextDiff::from_chars(a, b).ratio())
}
