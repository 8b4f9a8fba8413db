use crate::error::QueryError;

/// Split a path into its segments, expanding bracket indices:
/// `items[2].name` yields `["items", "2", "name"]`.
pub fn split_path(path: &str) -> Result<Vec<String>, QueryError> {
    if path.is_empty() {
        return Err(QueryError::invalid_path(path, "empty path"));
    }
    let mut segments = Vec::new();
    for part in path.split('.') {
        let (name, mut rest) = match part.find('[') {
            Some(i) => part.split_at(i),
            None => (part, ""),
        };
        if name.is_empty() {
            return Err(QueryError::invalid_path(path, "empty segment"));
        }
        if name.contains(']') {
            return Err(QueryError::invalid_path(path, "unbalanced ']'"));
        }
        segments.push(name.to_string());

        while !rest.is_empty() {
            let Some(inner) = rest.strip_prefix('[') else {
                return Err(QueryError::invalid_path(path, "text after ']'"));
            };
            let close = inner
                .find(']')
                .ok_or_else(|| QueryError::invalid_path(path, "unclosed '['"))?;
            let index = &inner[..close];
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return Err(QueryError::invalid_path(path, "index must be a non-negative integer"));
            }
            segments.push(index.to_string());
            rest = &inner[close + 1..];
        }
    }
    Ok(segments)
}

/// Canonical dotted form of a path. Bracket and dot spellings of the same
/// path normalize to the same string.
pub fn normalize_path(path: &str) -> Result<String, QueryError> {
    Ok(split_path(path)?.join("."))
}
