use crate::domain::{MediaRef, UserId};

/// Inbound event delivered by the transport.
#[derive(Clone, Debug)]
pub enum IncomingEvent {
    Start(UserId),
    Help(UserId),
    Pair(UserId),
    Next(UserId),
    Stop(UserId),
    UnknownCommand { user_id: UserId, name: String },
    Message { user_id: UserId, payload: Payload },
}

/// Content of a user message, tagged by the kind it arrived as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Photo {
        media: MediaRef,
        caption: Option<String>,
    },
    Document {
        media: MediaRef,
        mime_type: Option<String>,
        caption: Option<String>,
    },
    Sticker {
        media: MediaRef,
    },
    Video {
        media: MediaRef,
        caption: Option<String>,
    },
    /// Anything the relay cannot forward (voice, location, polls...).
    Unsupported {
        kind: String,
    },
}

impl Payload {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Short kind name used in logs.
    pub fn kind(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::Photo { .. } => "photo",
            Self::Document { .. } => "document",
            Self::Sticker { .. } => "sticker",
            Self::Video { .. } => "video",
            Self::Unsupported { kind } => kind.as_str(),
        }
    }

    pub fn caption(&self) -> Option<&str> {
        match self {
            Self::Photo { caption, .. }
            | Self::Document { caption, .. }
            | Self::Video { caption, .. } => caption.as_deref(),
            _ => None,
        }
    }

    /// Human-readable description for the transcript.
    ///
    /// Text is kept literally; media becomes a tag, prefixed by the caption when
    /// there is one (`"look [Photo]"`).
    pub fn summary(&self) -> String {
        let tag = match self {
            Self::Text(text) => return text.clone(),
            Self::Photo { .. } => "[Photo]",
            Self::Document { .. } => "[Document]",
            Self::Sticker { .. } => "[Sticker]",
            Self::Video { .. } => "[Video]",
            Self::Unsupported { .. } => "[Unsupported]",
        };

        match self.caption().map(str::trim) {
            Some(c) if !c.is_empty() => format!("{c} {tag}"),
            _ => tag.to_string(),
        }
    }
}
