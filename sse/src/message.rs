use axum::response::sse::Event;
use events::EventCategory;
use std::fmt;

/// Payload of the keep-alive frame sent on idle streams.
pub const HEARTBEAT_PAYLOAD: &str = "dummy";

/// A single frame pushed to a streaming client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// The counter for this category moved since the client last heard about it.
    Event(EventCategory),
    /// Content-free frame whose only job is to make the transport notice a
    /// client that has gone away.
    Heartbeat,
}

impl Frame {
    pub fn payload(&self) -> &'static str {
        match self {
            Frame::Event(category) => category.as_str(),
            Frame::Heartbeat => HEARTBEAT_PAYLOAD,
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Frame::Heartbeat)
    }
}

/// Wire encoding: `data: <payload>\n\n`.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data: {}\n\n", self.payload())
    }
}

impl From<Frame> for Event {
    fn from(frame: Frame) -> Self {
        Event::default().data(frame.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_frames_use_category_identifier() {
        assert_eq!(
            Frame::Event(EventCategory::Control).to_string(),
            "data: control\n\n"
        );
        assert_eq!(
            Frame::Event(EventCategory::Schedule).to_string(),
            "data: schedule\n\n"
        );
        assert_eq!(Frame::Event(EventCategory::Log).to_string(), "data: log\n\n");
    }

    #[test]
    fn test_heartbeat_frame_wire_format() {
        assert_eq!(Frame::Heartbeat.to_string(), "data: dummy\n\n");
        assert!(Frame::Heartbeat.is_heartbeat());
        assert!(!Frame::Event(EventCategory::Log).is_heartbeat());
    }
}
