//! Platform-neutral view of an inbound chat notification

/// Who sent the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: u64,
    /// Used for logging only
    pub display_name: String,
}

/// A downloadable attachment as announced by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub id: u64,
    pub url: String,
    pub filename: String,
    /// Size in bytes as declared by the platform
    pub size: u64,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `/start` command
    Start,
    /// Voice note with its audio attachment
    Voice(AttachmentRef),
    Other,
}

/// One inbound notification, read-only for the whole pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingEvent {
    pub sender: Sender,
    pub chat_id: u64,
    pub kind: EventKind,
}

impl IncomingEvent {
    pub fn new(sender: Sender, chat_id: u64, kind: EventKind) -> Self {
        Self {
            sender,
            chat_id,
            kind,
        }
    }
}
