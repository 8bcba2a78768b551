//! Parsing and rendering of mini-app form submissions.

use serde_json::{Map, Value};

use super::RelayError;

/// Field carrying an image attachment; never rendered as a text line.
pub const PHOTO_FIELD: &str = "photo";

/// Form data sent by the mini-app, in the order the fields were received.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    fields: Map<String, Value>,
}

impl Submission {
    /// Parse the raw `web_app_data` payload.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::MalformedPayload` if the payload is not valid
    /// JSON or not a JSON object.
    pub fn parse(payload: &str) -> Result<Self, RelayError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| RelayError::MalformedPayload(e.to_string()))?;

        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(RelayError::MalformedPayload(format!(
                "expected a JSON object, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// Fields rendered into the notification, `photo` excluded.
    pub fn text_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter().filter(|(key, _)| key.as_str() != PHOTO_FIELD)
    }

    /// Whether a non-empty `photo` value was submitted.
    #[must_use]
    pub fn has_photo(&self) -> bool {
        self.fields.get(PHOTO_FIELD).is_some_and(is_truthy)
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Truthiness used for the `photo` field: null, `false`, zero and empty
/// strings or collections count as absent.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Turn a form key into a display label.
///
/// `_` and `-` become spaces, the first character is upper-cased and the
/// rest lower-cased: `first_name` → `First name`, `ZIP` → `Zip`.
#[must_use]
pub fn normalize_field_name(key: &str) -> String {
    let spaced = key.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Escape the characters legacy Markdown treats as entity markers
/// (`_`, `*`, `` ` ``, `[`) so user text is shown exactly as typed.
#[must_use]
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render a field value: strings verbatim, anything else as compact JSON.
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The user who submitted the form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Submitter {
    /// Telegram user id, 0 when unknown
    pub id: i64,
    /// First name as shown in Telegram
    pub first_name: String,
    /// Optional last name
    pub last_name: Option<String>,
    /// Optional @username, without the `@`
    pub username: Option<String>,
}

impl Submitter {
    /// Full name followed by the username, e.g. `Anna Schmidt (@anna_s)`.
    #[must_use]
    pub fn display_line(&self) -> String {
        let mut name = self.first_name.clone();
        if let Some(last) = self.last_name.as_deref().filter(|l| !l.is_empty()) {
            if !name.is_empty() {
                name.push(' ');
            }
            name.push_str(last);
        }
        if name.is_empty() {
            name.push_str("Unknown");
        }

        match self.username.as_deref().filter(|u| !u.is_empty()) {
            Some(username) => format!("{name} (@{username})"),
            None => format!("{name} (no username)"),
        }
    }
}

/// Build the Markdown notification sent to the administrator.
///
/// Only the `*Label*` markers are Markdown; names, labels and values are
/// escaped.
#[must_use]
pub fn format_notification(submitter: &Submitter, submission: &Submission) -> String {
    let mut message = String::from("📋 *New insurance application*\n\n");
    message.push_str(&format!(
        "👤 *From user*: {}\n\n",
        escape_markdown(&submitter.display_line())
    ));

    for (key, value) in submission.text_fields() {
        message.push_str(&format!(
            "*{}*: {}\n",
            escape_markdown(&normalize_field_name(key)),
            escape_markdown(&render_value(value))
        ));
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn anna() -> Submitter {
        Submitter {
            id: 42,
            first_name: "Anna".to_string(),
            last_name: Some("Schmidt".to_string()),
            username: Some("anna_s".to_string()),
        }
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(matches!(
            Submission::parse("{not json"),
            Err(RelayError::MalformedPayload(_))
        ));
        assert!(matches!(
            Submission::parse(""),
            Err(RelayError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let err = Submission::parse("[1, 2, 3]");
        match err {
            Err(RelayError::MalformedPayload(reason)) => assert!(reason.contains("an array")),
            other => panic!("expected MalformedPayload, got {other:?}"),
        }
        assert!(Submission::parse("\"text\"").is_err());
    }

    #[test]
    fn test_parse_keeps_field_order() -> Result<(), RelayError> {
        let submission = Submission::parse(r#"{"zeta": "1", "alpha": "2", "mid": "3"}"#)?;
        let keys: Vec<&str> = submission.text_fields().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        Ok(())
    }

    #[test]
    fn test_normalize_field_name() {
        assert_eq!(normalize_field_name("age"), "Age");
        assert_eq!(normalize_field_name("first_name"), "First name");
        assert_eq!(normalize_field_name("insurance-type"), "Insurance type");
        assert_eq!(normalize_field_name("ZIP_Code"), "Zip code");
        assert_eq!(normalize_field_name("ärztin"), "Ärztin");
        assert_eq!(normalize_field_name(""), "");
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!("Berlin")), "Berlin");
        assert_eq!(render_value(&json!(34)), "34");
        assert_eq!(render_value(&json!(true)), "true");
        assert_eq!(render_value(&json!(null)), "null");
        assert_eq!(render_value(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(render_value(&json!(["x", "y"])), r#"["x","y"]"#);
    }

    #[test]
    fn test_photo_truthiness() -> Result<(), RelayError> {
        assert!(Submission::parse(r#"{"photo": "base64..."}"#)?.has_photo());
        assert!(Submission::parse(r#"{"photo": ["a"]}"#)?.has_photo());
        assert!(!Submission::parse(r#"{"photo": ""}"#)?.has_photo());
        assert!(!Submission::parse(r#"{"photo": null}"#)?.has_photo());
        assert!(!Submission::parse(r#"{"photo": false}"#)?.has_photo());
        assert!(!Submission::parse(r#"{"photo": 0}"#)?.has_photo());
        assert!(!Submission::parse(r#"{"photo": {}}"#)?.has_photo());
        assert!(!Submission::parse(r#"{"age": "34"}"#)?.has_photo());
        Ok(())
    }

    #[test]
    fn test_display_line_variants() {
        assert_eq!(anna().display_line(), "Anna Schmidt (@anna_s)");

        let bare = Submitter {
            id: 1,
            first_name: "Max".to_string(),
            last_name: None,
            username: None,
        };
        assert_eq!(bare.display_line(), "Max (no username)");

        assert_eq!(Submitter::default().display_line(), "Unknown (no username)");
    }

    #[test]
    fn test_format_notification_orders_and_skips_photo() -> Result<(), RelayError> {
        let submission =
            Submission::parse(r#"{"age": "34", "photo": "abc", "city": "Berlin"}"#)?;
        let text = format_notification(&anna(), &submission);

        assert!(text.starts_with("📋 *New insurance application*\n\n"));
        assert!(text.contains("👤 *From user*: Anna Schmidt (@anna\\_s)\n\n"));

        let age = text.find("*Age*: 34\n");
        let city = text.find("*City*: Berlin\n");
        assert!(age.is_some() && city.is_some());
        assert!(age < city);
        assert!(!text.to_lowercase().contains("photo"));
        Ok(())
    }

    #[test]
    fn test_format_notification_nested_value() -> Result<(), RelayError> {
        let submission =
            Submission::parse(r#"{"family_members": [{"name": "Lea", "age": 5}]}"#)?;
        let text = format_notification(&anna(), &submission);
        assert!(text.contains(r#"*Family members*: \[{"name":"Lea","age":5}]"#));
        Ok(())
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("plain text"), "plain text");
        assert_eq!(escape_markdown("a_b*c`d[e]"), r"a\_b\*c\`d\[e]");
    }

    #[test]
    fn test_underscores_in_user_text_are_escaped() -> Result<(), RelayError> {
        let submitter = Submitter {
            id: 42,
            first_name: "Anna".to_string(),
            last_name: None,
            username: Some("anna_s".to_string()),
        };
        let submission = Submission::parse(
            r#"{"email": "max_mustermann@example.de", "*note*": "see [1]"}"#,
        )?;
        let text = format_notification(&submitter, &submission);

        assert!(text.contains(r"👤 *From user*: Anna (@anna\_s)"));
        assert!(text.contains(r"*Email*: max\_mustermann@example.de"));
        assert!(text.contains(r"*\*note\**: see \[1]"));

        // every underscore in the message is escaped
        let bytes = text.as_bytes();
        for (i, b) in bytes.iter().enumerate() {
            if *b == b'_' {
                assert!(i > 0 && bytes[i - 1] == b'\\', "unescaped '_' in {text}");
            }
        }
        Ok(())
    }
}
