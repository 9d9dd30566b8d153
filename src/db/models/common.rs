//! Common types and utilities shared across models.

/// Helper to parse a JSON string array column from the database
pub fn parse_string_list(json: &str) -> Vec<String> {
    serde_json::from_str::<Vec<Option<String>>>(json)
        .map(|items| items.into_iter().flatten().collect())
        .unwrap_or_default()
}

/// Helper to serialize a string list to JSON for the database
pub fn serialize_string_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Escape `%`, `_` and `\` so user input can be embedded in a LIKE pattern
/// declared with `ESCAPE '\'`
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
