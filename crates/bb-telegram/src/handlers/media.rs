use teloxide::types::Message;

use bb_core::{domain::MediaRef, messaging::types::Payload};

/// Reduce a Telegram message to the payload the relay forwards.
///
/// Media is referenced by `file_id`; nothing is downloaded.
pub fn payload_from_message(msg: &Message) -> Payload {
    let caption = msg.caption().map(|s| s.to_string());

    if let Some(text) = msg.text() {
        return Payload::Text(text.to_string());
    }

    if let Some(best) = msg.photo().and_then(|sizes| sizes.last()) {
        return Payload::Photo {
            media: MediaRef::new(best.file.id.clone()),
            caption,
        };
    }

    // GIFs arrive as animations; they travel as documents.
    if let Some(anim) = msg.animation() {
        return Payload::Document {
            media: MediaRef::new(anim.file.id.clone()),
            mime_type: anim.mime_type.as_ref().map(|m| m.to_string()),
            caption,
        };
    }

    if let Some(doc) = msg.document() {
        return Payload::Document {
            media: MediaRef::new(doc.file.id.clone()),
            mime_type: doc.mime_type.as_ref().map(|m| m.to_string()),
            caption,
        };
    }

    if let Some(sticker) = msg.sticker() {
        return Payload::Sticker {
            media: MediaRef::new(sticker.file.id.clone()),
        };
    }

    if let Some(video) = msg.video() {
        return Payload::Video {
            media: MediaRef::new(video.file.id.clone()),
            caption,
        };
    }

    Payload::Unsupported {
        kind: unsupported_kind(msg).to_string(),
    }
}

fn unsupported_kind(msg: &Message) -> &'static str {
    if msg.voice().is_some() {
        "voice"
    } else if msg.audio().is_some() {
        "audio"
    } else if msg.video_note().is_some() {
        "video_note"
    } else if msg.location().is_some() {
        "location"
    } else if msg.contact().is_some() {
        "contact"
    } else if msg.poll().is_some() {
        "poll"
    } else {
        "other"
    }
}
