use crate::error::BambamError;

pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(msg: &str, line: usize, column: usize) -> BambamError {
    BambamError::ParseError {
        msg: msg.to_string(),
        line,
        column,
    }
}

/// Drops underscores, uppercasing the lowercase letter that follows each one
/// (`foo_bar` becomes `fooBar`, `type_` becomes `type`).
pub fn under_to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '_' {
            out.push(c);
            continue;
        }
        if let Some(&next) = chars.peek() {
            if next.is_lowercase() {
                out.extend(next.to_uppercase());
                chars.next();
            }
        }
    }
    out
}

pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
    }
}

pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}
