//! Caller-side naming policy for new and renamed nodes.

/// Normalize a user-entered node name.
///
/// Trims surrounding whitespace and replaces `.` and inner whitespace with
/// `_` so the result is a single path segment.
///
/// # Returns
/// The sanitized name, or `None` when nothing remains after trimming.
pub fn sanitize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        trimmed
            .chars()
            .map(|ch| if ch == '.' || ch.is_whitespace() { '_' } else { ch })
            .collect(),
    )
}

/// `true` when `name` is already in the form [`sanitize_name`] produces,
/// i.e. a non-empty single path segment.
pub fn is_canonical_name(name: &str) -> bool {
    sanitize_name(name).as_deref() == Some(name)
}

/// Generate the next `<label><n>` name that is not already taken.
///
/// `counter` is advanced past every candidate tried, so names are never
/// reused within a session even after the node that held them is gone.
///
/// # Returns
/// A name for which `exists_check` returned `false`.
pub fn next_default_name<F>(label: &str, counter: &mut u64, exists_check: F) -> String
where
    F: Fn(&str) -> bool,
{
    loop {
        let name = format!("{}{}", label, counter);
        *counter = counter.saturating_add(1);
        if !exists_check(&name) {
            return name;
        }
    }
}
