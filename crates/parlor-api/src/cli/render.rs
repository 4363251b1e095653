//! Shared terminal formatting for chats and messages.

use chrono::{Local, NaiveDateTime};
use console::style;
use parlor_types::chat::{ChatMessage, ChatSummary};
use uuid::Uuid;

/// Chat-list timestamp: `HH:MM` today, `Yesterday`, otherwise `MM/DD`.
pub fn format_chat_time(at: NaiveDateTime, now: NaiveDateTime) -> String {
    let day = at.date();
    let today = now.date();
    if day == today {
        at.format("%H:%M").to_string()
    } else if today.pred_opt() == Some(day) {
        "Yesterday".to_string()
    } else {
        at.format("%m/%d").to_string()
    }
}

/// [`format_chat_time`] against the local clock.
pub fn format_local_time(at: chrono::DateTime<chrono::Utc>) -> String {
    format_chat_time(
        at.with_timezone(&Local).naive_local(),
        Local::now().naive_local(),
    )
}

/// Truncate to `max` characters, marking the cut with `...`.
pub fn preview(text: &str, max: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let kept: String = single_line.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// First eight characters of an id, enough to pick a chat by prefix.
pub fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// Display name of a message author: `You` for the signed-in user, the
/// member's name otherwise.
pub fn author_name<'a>(summary: &'a ChatSummary, message: &ChatMessage, user_id: Uuid) -> &'a str {
    if message.created_by == user_id {
        return "You";
    }
    summary
        .members
        .iter()
        .find(|m| m.id() == message.created_by)
        .map(|m| m.name())
        .unwrap_or("(left)")
}

/// Print one transcript line.
pub fn print_message(summary: &ChatSummary, message: &ChatMessage, user_id: Uuid) {
    let name = author_name(summary, message, user_id);
    let label = if message.created_by == user_id {
        style(name).green().bold()
    } else {
        style(name).cyan().bold()
    };
    println!(
        "  {} {} {}",
        style(format_local_time(message.created_at)).dim(),
        label,
        message.content
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use parlor_types::character::Character;
    use parlor_types::chat::{Chat, ChatKind, Member};

    fn at(month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_same_day_shows_clock_time() {
        assert_eq!(format_chat_time(at(10, 19, 9, 5), at(10, 19, 23, 59)), "09:05");
    }

    #[test]
    fn test_previous_day_is_yesterday() {
        assert_eq!(format_chat_time(at(10, 18, 23, 59), at(10, 19, 0, 1)), "Yesterday");
        assert_eq!(format_chat_time(at(9, 30, 12, 0), at(10, 1, 8, 0)), "Yesterday");
    }

    #[test]
    fn test_older_shows_month_and_day() {
        assert_eq!(format_chat_time(at(10, 17, 12, 0), at(10, 19, 12, 0)), "10/17");
        assert_eq!(format_chat_time(at(1, 2, 12, 0), at(10, 19, 12, 0)), "01/02");
    }

    #[test]
    fn test_preview_truncates_on_char_boundaries() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("héllo wörld again", 8), "héllo...");
        assert_eq!(preview("two\nlines", 20), "two lines");
    }

    #[test]
    fn test_short_id_is_prefix() {
        let id = Uuid::now_v7();
        assert!(id.simple().to_string().starts_with(&short_id(&id)));
        assert_eq!(short_id(&id).len(), 8);
    }

    #[test]
    fn test_author_name() {
        let user_id = Uuid::now_v7();
        let character = Character {
            id: Uuid::now_v7(),
            name: "Mika".to_string(),
            gender: String::new(),
            personality: String::new(),
            background: String::new(),
            description: String::new(),
            created_by: user_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        let summary = ChatSummary {
            chat: Chat {
                id: Uuid::now_v7(),
                kind: ChatKind::Single,
                name: "Mika".to_string(),
                created_by: user_id,
                created_at: Utc::now(),
                updated_at: None,
            },
            members: vec![Member::Ai(character.clone())],
            last_message: None,
        };
        let message = |created_by| ChatMessage {
            id: Uuid::now_v7(),
            chat_id: summary.chat.id,
            created_by,
            content: "hi".to_string(),
            created_at: Utc::now(),
            updated_at: None,
        };

        assert_eq!(author_name(&summary, &message(user_id), user_id), "You");
        assert_eq!(author_name(&summary, &message(character.id), user_id), "Mika");
        assert_eq!(author_name(&summary, &message(Uuid::now_v7()), user_id), "(left)");
    }
}
