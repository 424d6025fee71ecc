use thiserror::Error;

use crate::location::Coordinate;

/// One decoded line from the ingest socket.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestFrame {
    /// Raw notification event, passed on verbatim: the relay owns its
    /// parsing and error reporting.
    Notification(String),
    /// Toggle the notification forwarding gate.
    Forwarding(bool),
    /// Update the last known coordinate.
    Location(Coordinate),
    /// Request one status reply line.
    Status,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame is not a JSON object")]
    NotAnObject,

    #[error("Frame field '{field}' is invalid")]
    InvalidField { field: &'static str },

    #[error("Frame has no recognized field")]
    Unrecognized,
}

/// Classify one newline-delimited frame.
///
/// Frames are routed by their distinguishing field; a notification frame
/// keeps the whole line so both of its decode stages stay in the relay.
pub fn classify(line: &str) -> Result<IngestFrame, FrameError> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    let object = value.as_object().ok_or(FrameError::NotAnObject)?;

    if object.contains_key("notification") {
        return Ok(IngestFrame::Notification(line.to_string()));
    }

    if let Some(enabled) = object.get("forwarding") {
        let enabled = enabled
            .as_bool()
            .ok_or(FrameError::InvalidField { field: "forwarding" })?;
        return Ok(IngestFrame::Forwarding(enabled));
    }

    if let Some(location) = object.get("location") {
        let latitude = location
            .get("latitude")
            .and_then(serde_json::Value::as_f64)
            .ok_or(FrameError::InvalidField { field: "location" })?;
        let longitude = location
            .get("longitude")
            .and_then(serde_json::Value::as_f64)
            .ok_or(FrameError::InvalidField { field: "location" })?;
        let coordinate = Coordinate::validated(latitude, longitude)
            .ok_or(FrameError::InvalidField { field: "location" })?;
        return Ok(IngestFrame::Location(coordinate));
    }

    if object.contains_key("status") {
        return Ok(IngestFrame::Status);
    }

    Err(FrameError::Unrecognized)
}
