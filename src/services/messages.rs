use std::collections::HashMap;

use crate::models::{DailyMessage, MessageReadMark, MessageView};

/// Merge the shared messages with the caller's read marks, keyed by message
/// id. The two lists come from independent queries; the join happens here
/// rather than in the database.
pub fn merge_read_marks(messages: Vec<DailyMessage>, marks: &[MessageReadMark]) -> Vec<MessageView> {
    let marks_by_id: HashMap<i64, &MessageReadMark> =
        marks.iter().map(|mark| (mark.message_id, mark)).collect();

    messages
        .into_iter()
        .map(|message| {
            let mark = marks_by_id.get(&message.id);
            MessageView {
                is_read: mark.is_some(),
                is_favorited: mark.map(|m| m.is_favorited).unwrap_or(false),
                read_at: mark.map(|m| m.read_at.clone()),
                message,
            }
        })
        .collect()
}
