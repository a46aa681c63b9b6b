//! Prompt assembly for the generative model.
//!
//! ```text
//! Data produk dari database (gunakan sebagai sumber kebenaran):
//! - Product: Pocari Sweat (SKU: BEV-PS-005), Stock: 60, Price: 8000.00
//!
//! User: ada pocari?
//!
//! Riwayat percakapan:
//! User: halo
//! Assistant: Halo! Ada yang bisa dibantu?
//! ```
//!
//! The database block is omitted when no products matched and the history
//! block when the window is empty.

use kasir_core::{ChatMessage, ChatRole};

pub const DB_CONTEXT_HEADER: &str =
    "Data produk dari database (gunakan sebagai sumber kebenaran):";

pub const HISTORY_HEADER: &str = "Riwayat percakapan:";

fn role_tag(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "User",
        ChatRole::Assistant => "Assistant",
    }
}

/// Builds the single text prompt sent to the model. `history` is oldest
/// first and must not contain the new message.
pub fn build_prompt(product_lines: &[String], message: &str, history: &[ChatMessage]) -> String {
    let mut sections = Vec::with_capacity(3);

    if !product_lines.is_empty() {
        let mut block = vec![DB_CONTEXT_HEADER.to_string()];
        block.extend(product_lines.iter().map(|line| format!("- {line}")));
        sections.push(block.join("\n"));
    }

    sections.push(format!("User: {}", message.trim()));

    if !history.is_empty() {
        let mut block = vec![HISTORY_HEADER.to_string()];
        block.extend(
            history
                .iter()
                .map(|m| format!("{}: {}", role_tag(m.role), m.content)),
        );
        sections.push(block.join("\n"));
    }

    sections.join("\n\n")
}

/// The last `window` entries of `history` (oldest first).
pub fn history_window(history: &[ChatMessage], window: usize) -> &[ChatMessage] {
    &history[history.len().saturating_sub(window)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(role: ChatRole, content: &str) -> ChatMessage {
        ChatMessage {
            id: content.to_string(),
            chat_topic_id: "t1".into(),
            user_id: None,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_prompt_sections_in_order() {
        let history = vec![
            message(ChatRole::User, "halo"),
            message(ChatRole::Assistant, "Halo! Ada yang bisa dibantu?"),
        ];
        let prompt = build_prompt(
            &["Product: Pocari Sweat (SKU: BEV-PS-005), Stock: 60, Price: 8000.00".to_string()],
            " ada pocari? ",
            &history,
        );

        let db = prompt.find(DB_CONTEXT_HEADER).unwrap();
        let user = prompt.find("User: ada pocari?").unwrap();
        let past = prompt.find(HISTORY_HEADER).unwrap();
        assert!(db < user && user < past);
        assert!(prompt.ends_with("User: halo\nAssistant: Halo! Ada yang bisa dibantu?"));
    }

    #[test]
    fn test_prompt_without_context_or_history() {
        assert_eq!(build_prompt(&[], "hai", &[]), "User: hai");
    }

    #[test]
    fn test_history_window_keeps_newest() {
        let history = vec![
            message(ChatRole::User, "a"),
            message(ChatRole::Assistant, "b"),
            message(ChatRole::User, "c"),
        ];
        let window = history_window(&history, 2);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "b");
        assert!(history_window(&history, 0).is_empty());
        assert_eq!(history_window(&history, 10).len(), 3);
    }
}
