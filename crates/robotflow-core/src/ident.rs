//! Identifier sanitising for generated Python.
//!
//! Variable names come from free-text block parameters. Before they reach
//! generated source they are rewritten to plain ASCII identifiers that cannot
//! collide with Python keywords or with the names the generated program
//! itself relies on.

/// Python keywords plus names the generated program defines or calls.
const RESERVED: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield", "time", "main", "print", "range", "globals",
];

/// Returns `true` if `name` can be emitted unchanged.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !RESERVED.contains(&name)
}

/// Rewrites `name` into a safe identifier.
///
/// Characters outside `[A-Za-z0-9_]` become `_`, a leading digit gets a `_`
/// prefix, and reserved words get a `_` suffix. Valid names are returned
/// unchanged.
pub fn sanitize_identifier(name: &str) -> String {
    if is_valid_identifier(name) {
        return name.to_string();
    }

    let mut out: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() {
        return "_".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if RESERVED.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names_pass_through() {
        assert_eq!(sanitize_identifier("count"), "count");
        assert_eq!(sanitize_identifier("_tmp2"), "_tmp2");
    }

    #[test]
    fn rewrites() {
        assert_eq!(sanitize_identifier("my var"), "my_var");
        assert_eq!(sanitize_identifier("2fast"), "_2fast");
        assert_eq!(sanitize_identifier("class"), "class_");
        assert_eq!(sanitize_identifier("time"), "time_");
        assert_eq!(sanitize_identifier(""), "_");
        assert_eq!(sanitize_identifier("温度"), "__");
    }

    #[test]
    fn validity() {
        assert!(is_valid_identifier("speed_1"));
        assert!(!is_valid_identifier("1speed"));
        assert!(!is_valid_identifier("while"));
        assert!(!is_valid_identifier("a-b"));
    }
}
