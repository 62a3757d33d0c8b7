//! SQL text helpers used when rendering query signatures

use serde_json::Value;

/// Escape SQL LIKE metacharacters (%, _, \) in user input
///
/// Use this when building LIKE patterns from user input so the input
/// is matched literally.
///
/// # Example
///
/// ```
/// use datatable::utils::sql::escape_like_pattern;
///
/// let user_input = "100% match_test";
/// let pattern = format!("%{}%", escape_like_pattern(user_input));
/// assert_eq!(pattern, "%100\\% match\\_test%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Quote a string literal, doubling embedded single quotes
pub fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Render a scalar as a SQL literal
///
/// Arrays and objects have no SQL literal form; they are rendered as their
/// JSON text in a quoted string so signatures stay distinct.
pub fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_string(s),
        other => quote_string(&other.to_string()),
    }
}

/// Render a value list as `('a','b')`
pub fn quote_list(values: &[Value]) -> String {
    let items: Vec<String> = values.iter().map(quote_literal).collect();
    format!("({})", items.join(","))
}
