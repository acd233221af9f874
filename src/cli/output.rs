use serde::Serialize;

/// Format a result as minified JSON.
pub fn format_json<T: Serialize>(result: &T) -> String {
    serde_json::to_string(result).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

/// Format an error as JSON.
pub fn format_error(err: &dyn std::fmt::Display) -> String {
    format!("{{\"error\":\"{}\"}}", err.to_string().replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn format_json_minified() {
        let data = TestData {
            name: "expense".into(),
            value: 3,
        };
        assert_eq!(format_json(&data), r#"{"name":"expense","value":3}"#);
    }

    #[test]
    fn format_error_escapes_quotes() {
        let msg = "bad \"column\"";
        assert_eq!(
            format_error(&msg),
            "{\"error\":\"bad \\\"column\\\"\"}"
        );
    }
}
