//! Toolbar and plugin name lists.

/// Normalise a space-separated list of tool or plugin names.
///
/// Splits on any whitespace and keeps alphanumeric tokens and the `|`
/// separator.
pub fn sanitize_names(value: &str) -> String {
    value
        .split_whitespace()
        .filter(|token| *token == "|" || token.chars().all(|c| c.is_ascii_alphanumeric()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sanitize a toolbar value.
///
/// Returns `None` for the legacy comma-separated toolbar format, which is
/// ignored rather than converted.
pub fn sanitize_toolbar(value: &str) -> Option<String> {
    if value.contains(',') {
        tracing::debug!(toolbar = value, "ignoring comma-separated toolbar");
        return None;
    }
    Some(sanitize_names(value))
}

/// Is `name` one of the space-separated tokens in `list`?
pub fn has_name(list: &str, name: &str) -> bool {
    list.split_whitespace().any(|token| token == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_alnum_and_separators() {
        assert_eq!(
            sanitize_names("bold  italic\n|\tpw-link <script> code"),
            "bold italic | code"
        );
    }

    #[test]
    fn legacy_toolbar_is_ignored() {
        assert_eq!(sanitize_toolbar("Bold, Italic, -, Link"), None);
        assert_eq!(sanitize_toolbar("bold italic").as_deref(), Some("bold italic"));
    }
}
