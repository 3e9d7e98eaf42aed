//! Task extraction from completion text.
//!
//! The model is asked for lines shaped like `1. Title - Description`. This is a
//! best-effort lexer over that shape; lines that don't fit are skipped, never
//! reported as errors.
//!
//! A line is kept when:
//! - its first character is an ASCII digit,
//! - it contains a `-` (the split happens on the *first* one),
//! - both the title and the description are non-empty after cleanup.
//!
//! Known limitation: a hyphen inside the title is taken as the separator, so
//! `1. Set-up account - Do X` yields title `Set` and description
//! `up account - Do X`.

use super::record::TaskRecord;

/// Extract task records from completion text, preserving their order.
pub fn parse_tasks(text: &str) -> Vec<TaskRecord> {
    text.lines().filter_map(parse_line).collect()
}

/// Parse a single numbered line, or `None` if it isn't a task line.
fn parse_line(line: &str) -> Option<TaskRecord> {
    if !line.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let (head, description) = line.split_once('-')?;
    let title = strip_list_marker(head);

    TaskRecord::new(title, description).ok()
}

/// Remove the list number and one trailing punctuation mark (`1.`, `12)`).
fn strip_list_marker(head: &str) -> &str {
    let rest = head.trim().trim_start_matches(|c: char| c.is_ascii_digit());
    let rest = rest
        .strip_prefix(|c: char| c.is_ascii_punctuation())
        .unwrap_or(rest);
    rest.trim()
}

/// Render records in the canonical `N. Title - Description` shape.
///
/// # Property
/// `parse_tasks(&render_tasks(&r)) == r` for any `r` returned by `parse_tasks`.
pub fn render_tasks(records: &[TaskRecord]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {} - {}", i + 1, r.title(), r.description()))
        .collect::<Vec<_>>()
        .join("\n")
}
