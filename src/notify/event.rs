use serde::Deserialize;
use thiserror::Error;

/// Errors from decoding a raw notification event.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed event envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("Malformed notification record: {0}")]
    Record(#[source] serde_json::Error),
}

/// Outer record as delivered by the host. The `notification` value is
/// itself a JSON-encoded string; two decode stages, either can fail.
#[derive(Debug, Deserialize)]
struct EventEnvelope {
    notification: String,
}

/// Inner record fields the bridge forwards.
#[derive(Debug, Deserialize)]
struct NotificationRecord {
    app: String,
    title: String,
    text: String,
}

/// Normalized notification ready for forwarding.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub source_app: String,
    pub title: String,
    pub body: String,
}

impl NotificationMessage {
    /// Wire encoding on the notification topic.
    pub fn to_payload(&self) -> String {
        format!("{}: {} - {}", self.source_app, self.title, self.body)
    }
}

/// Decode one self-contained raw event.
pub fn parse_event(raw: &str) -> Result<NotificationMessage, ParseError> {
    let envelope: EventEnvelope = serde_json::from_str(raw).map_err(ParseError::Envelope)?;
    let record: NotificationRecord =
        serde_json::from_str(&envelope.notification).map_err(ParseError::Record)?;
    Ok(NotificationMessage {
        source_app: record.app,
        title: record.title,
        body: record.text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_event(app: &str, title: &str, text: &str) -> String {
        let record = serde_json::json!({ "app": app, "title": title, "text": text });
        serde_json::json!({ "notification": record.to_string() }).to_string()
    }

    #[test]
    fn well_formed_event_parses() {
        let message = parse_event(&raw_event("signal", "Alice", "hi there")).unwrap();
        assert_eq!(message.source_app, "signal");
        assert_eq!(message.title, "Alice");
        assert_eq!(message.body, "hi there");
        assert_eq!(message.to_payload(), "signal: Alice - hi there");
    }

    #[test]
    fn malformed_outer_json_is_an_envelope_error() {
        assert!(matches!(
            parse_event("not json at all"),
            Err(ParseError::Envelope(_))
        ));
    }

    #[test]
    fn missing_notification_field_is_an_envelope_error() {
        assert!(matches!(
            parse_event(r#"{"something_else": true}"#),
            Err(ParseError::Envelope(_))
        ));
    }

    #[test]
    fn malformed_inner_record_is_a_record_error() {
        assert!(matches!(
            parse_event(r#"{"notification": "{broken"}"#),
            Err(ParseError::Record(_))
        ));
    }

    #[test]
    fn missing_inner_fields_are_a_record_error() {
        let partial = serde_json::json!({ "notification": r#"{"app":"x","title":"y"}"# });
        assert!(matches!(
            parse_event(&partial.to_string()),
            Err(ParseError::Record(_))
        ));
    }

    #[test]
    fn wrong_field_types_are_a_record_error() {
        let bad = serde_json::json!({
            "notification": r#"{"app":1,"title":"y","text":"z"}"#
        });
        assert!(matches!(
            parse_event(&bad.to_string()),
            Err(ParseError::Record(_))
        ));
    }
}
