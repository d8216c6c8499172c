use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_FILENAME_CHARS: usize = 50;

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]").unwrap());
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").unwrap());

/// Convert a title into a filesystem safe file stem.
///
/// Unicode letters and numbers are preserved (case included), every other
/// character becomes `_`, runs of `_` collapse to one and leading/trailing
/// `_` are trimmed. The result is capped at [`MAX_FILENAME_CHARS`] characters.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = DISALLOWED.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    let truncated: String = collapsed
        .trim_matches('_')
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect();
    // Truncation can leave a dangling separator.
    truncated.trim_end_matches('_').to_string()
}

/// Build `<stem>_<tag>.png`, using `fallback` when the title is blank or
/// sanitizes to nothing.
pub fn export_filename(title: &str, fallback: &str, tag: &str) -> String {
    let base = match title.trim() {
        "" => fallback,
        trimmed => trimmed,
    };
    let stem = match sanitize_filename(base) {
        s if s.is_empty() => sanitize_filename(fallback),
        s => s,
    };
    format!("{stem}_{tag}.png")
}
