//! Log-safe rendering of error values

use serde_json::Value;

const MAX_ERROR_CHARS: usize = 2000;

/// Render an arbitrary error value as a single bounded line.
pub fn format_error_for_log(error: &Value) -> Option<String> {
    let rendered = match error {
        Value::Null => return None,
        Value::String(message) => message.clone(),
        Value::Object(map) => {
            let message = map.get("message").and_then(Value::as_str);
            let name = map.get("name").and_then(Value::as_str);
            match (name, message) {
                (Some(name), Some(message)) => format!("{}: {}", name, message),
                (None, Some(message)) => message.to_string(),
                _ => error.to_string(),
            }
        }
        other => other.to_string(),
    };

    let single_line = rendered.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.is_empty() {
        return None;
    }
    if single_line.chars().count() > MAX_ERROR_CHARS {
        let truncated: String = single_line.chars().take(MAX_ERROR_CHARS).collect();
        return Some(format!("{}…", truncated));
    }
    Some(single_line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_and_object_errors() {
        assert_eq!(format_error_for_log(&json!("boom")).as_deref(), Some("boom"));
        assert_eq!(
            format_error_for_log(&json!({ "name": "TimeoutError", "message": "took too long" }))
                .as_deref(),
            Some("TimeoutError: took too long")
        );
        assert_eq!(
            format_error_for_log(&json!({ "code": 7 })).as_deref(),
            Some(r#"{"code":7}"#)
        );
    }

    #[test]
    fn test_null_and_blank_errors() {
        assert_eq!(format_error_for_log(&Value::Null), None);
        assert_eq!(format_error_for_log(&json!("  \n ")), None);
    }

    #[test]
    fn test_multiline_is_collapsed_and_long_is_truncated() {
        assert_eq!(
            format_error_for_log(&json!("line one\n  line two")).as_deref(),
            Some("line one line two")
        );

        let long = "x".repeat(MAX_ERROR_CHARS + 10);
        let rendered = format_error_for_log(&json!(long)).unwrap();
        assert_eq!(rendered.chars().count(), MAX_ERROR_CHARS + 1);
    }
}
