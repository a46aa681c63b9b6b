//! # Chat Repository
//!
//! Chat topics, their messages and the pending multi-step action stored on
//! each topic.
//!
//! ## Topic State
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  chat_topics                                                            │
//! │  ├── last_message_at       bumped on every appended message            │
//! │  ├── confirmation_action   "add_product" | "restock" | "restock_select"│
//! │  ├── confirmation_payload  JSON body of the pending action             │
//! │  └── deleted_at            soft delete (messages are removed)          │
//! │                                                                         │
//! │  chat_messages (append-only, oldest first)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::generate_id;
use crate::error::{DbError, DbResult};
use kasir_core::validation::{validate_message_content, validate_name};
use kasir_core::{
    ChatMessage, ChatRole, ChatTopic, CoreError, PendingAction, DEFAULT_TOPIC_TITLE,
    MAX_TOPIC_MESSAGES,
};

const TOPIC_COLUMNS: &str = "id, user_id, title, last_message_at, confirmation_action, \
     confirmation_payload, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, chat_topic_id, user_id, role, content, created_at";

/// Repository for chat topics and messages.
#[derive(Debug, Clone)]
pub struct ChatRepository {
    pool: SqlitePool,
}

impl ChatRepository {
    /// Creates a new ChatRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ChatRepository { pool }
    }

    // =========================================================================
    // Topics
    // =========================================================================

    /// Creates a topic. A missing or blank title becomes "New Chat".
    pub async fn create_topic(&self, user_id: &str, title: Option<&str>) -> DbResult<ChatTopic> {
        let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => {
                validate_name("title", t)?;
                t.to_string()
            }
            None => DEFAULT_TOPIC_TITLE.to_string(),
        };

        let now = Utc::now();
        let topic = ChatTopic {
            id: generate_id(),
            user_id: user_id.to_string(),
            title,
            last_message_at: None,
            confirmation_action: None,
            confirmation_payload: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO chat_topics (id, user_id, title, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(&topic.id)
        .bind(&topic.user_id)
        .bind(&topic.title)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(id = %topic.id, user_id = %user_id, "Chat topic created");
        Ok(topic)
    }

    /// Topics of a user, most recently active first.
    pub async fn list_topics(&self, user_id: &str) -> DbResult<Vec<ChatTopic>> {
        let sql = format!(
            "SELECT {TOPIC_COLUMNS} FROM chat_topics \
             WHERE user_id = ?1 AND deleted_at IS NULL \
             ORDER BY last_message_at DESC, created_at DESC"
        );
        let topics = sqlx::query_as::<_, ChatTopic>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(topics)
    }

    /// Like [`list_topics`](Self::list_topics), creating a first topic when
    /// the user has none.
    pub async fn list_or_create_topics(&self, user_id: &str) -> DbResult<Vec<ChatTopic>> {
        let topics = self.list_topics(user_id).await?;
        if !topics.is_empty() {
            return Ok(topics);
        }

        let topic = self.create_topic(user_id, None).await?;
        Ok(vec![topic])
    }

    /// Gets a topic that belongs to `user_id`.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Topic doesn't exist or is deleted
    /// * `Err(DbError::Business(Forbidden))` - Topic belongs to another user
    pub async fn owned_topic(&self, user_id: &str, topic_id: &str) -> DbResult<ChatTopic> {
        let sql = format!(
            "SELECT {TOPIC_COLUMNS} FROM chat_topics WHERE id = ?1 AND deleted_at IS NULL"
        );
        let topic = sqlx::query_as::<_, ChatTopic>(&sql)
            .bind(topic_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Chat topic", topic_id))?;

        if topic.user_id != user_id {
            return Err(CoreError::Forbidden("chat topic belongs to another user".into()).into());
        }

        Ok(topic)
    }

    /// Removes every message of an owned topic and resets its state.
    pub async fn clear_topic(&self, user_id: &str, topic_id: &str) -> DbResult<()> {
        self.owned_topic(user_id, topic_id).await?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chat_messages WHERE chat_topic_id = ?1")
            .bind(topic_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE chat_topics SET
                last_message_at = NULL,
                confirmation_action = NULL,
                confirmation_payload = NULL,
                updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(topic_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(topic_id = %topic_id, "Chat topic cleared");
        Ok(())
    }

    /// Soft-deletes an owned topic and removes its messages.
    pub async fn delete_topic(&self, user_id: &str, topic_id: &str) -> DbResult<()> {
        self.owned_topic(user_id, topic_id).await?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chat_messages WHERE chat_topic_id = ?1")
            .bind(topic_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE chat_topics SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1")
            .bind(topic_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(topic_id = %topic_id, "Chat topic deleted");
        Ok(())
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Messages of a topic, oldest first, capped at the topic display limit.
    pub async fn messages(&self, topic_id: &str) -> DbResult<Vec<ChatMessage>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE chat_topic_id = ?1 \
             ORDER BY created_at, rowid LIMIT ?2"
        );
        let messages = sqlx::query_as::<_, ChatMessage>(&sql)
            .bind(topic_id)
            .bind(MAX_TOPIC_MESSAGES)
            .fetch_all(&self.pool)
            .await?;

        Ok(messages)
    }

    /// The last `limit` messages of a topic, returned oldest first.
    pub async fn recent_messages(&self, topic_id: &str, limit: i64) -> DbResult<Vec<ChatMessage>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE chat_topic_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        );
        let mut messages = sqlx::query_as::<_, ChatMessage>(&sql)
            .bind(topic_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        messages.reverse();
        Ok(messages)
    }

    /// Appends a message and bumps the topic's `last_message_at`.
    ///
    /// `user_id` is set for user messages and `None` for assistant replies.
    pub async fn append_message(
        &self,
        topic_id: &str,
        user_id: Option<&str>,
        role: ChatRole,
        content: &str,
    ) -> DbResult<ChatMessage> {
        if role == ChatRole::User {
            validate_message_content(content)?;
        }

        let now = Utc::now();
        let message = ChatMessage {
            id: generate_id(),
            chat_topic_id: topic_id.to_string(),
            user_id: user_id.map(str::to_string),
            role,
            content: content.to_string(),
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, chat_topic_id, user_id, role, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&message.id)
        .bind(&message.chat_topic_id)
        .bind(&message.user_id)
        .bind(message.role)
        .bind(&message.content)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE chat_topics SET last_message_at = ?2, updated_at = ?2 WHERE id = ?1")
            .bind(topic_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    // =========================================================================
    // Pending Actions
    // =========================================================================

    /// Stores the action the topic is waiting on, replacing any previous one.
    pub async fn set_pending(&self, topic_id: &str, action: &PendingAction) -> DbResult<()> {
        let payload = action
            .payload_json()
            .map_err(|e| DbError::Internal(format!("Failed to encode pending action: {}", e)))?;

        sqlx::query(
            r#"
            UPDATE chat_topics SET
                confirmation_action = ?2,
                confirmation_payload = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(topic_id)
        .bind(action.name())
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(topic_id = %topic_id, action = action.name(), "Pending action stored");
        Ok(())
    }

    /// Forgets the pending action of a topic.
    pub async fn clear_pending(&self, topic_id: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE chat_topics SET
                confirmation_action = NULL,
                confirmation_payload = NULL,
                updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(topic_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use kasir_core::{NewUser, ProductChoice, UserRole};

    async fn user(db: &Database, username: &str) -> String {
        db.users()
            .create(&NewUser {
                name: "Admin Toko".into(),
                username: username.into(),
                password: "secret1".into(),
                role: UserRole::Admin,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_default_title_and_auto_create() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = user(&db, "admin1").await;

        let topics = db.chats().list_or_create_topics(&owner).await.unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].title, DEFAULT_TOPIC_TITLE);

        let again = db.chats().list_or_create_topics(&owner).await.unwrap();
        assert_eq!(again[0].id, topics[0].id);

        let blank = db.chats().create_topic(&owner, Some("   ")).await.unwrap();
        assert_eq!(blank.title, DEFAULT_TOPIC_TITLE);
    }

    #[tokio::test]
    async fn test_topics_ordered_by_activity() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = user(&db, "admin1").await;
        let chats = db.chats();

        let first = chats.create_topic(&owner, Some("Stok")).await.unwrap();
        let second = chats.create_topic(&owner, Some("Penjualan")).await.unwrap();
        chats
            .append_message(&first.id, Some(&owner), ChatRole::User, "cek stok")
            .await
            .unwrap();

        let topics = chats.list_topics(&owner).await.unwrap();
        assert_eq!(topics[0].id, first.id);
        assert_eq!(topics[1].id, second.id);
    }

    #[tokio::test]
    async fn test_foreign_topic_is_forbidden() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = user(&db, "admin1").await;
        let other = user(&db, "admin2").await;
        let topic = db.chats().create_topic(&owner, None).await.unwrap();

        assert!(matches!(
            db.chats().owned_topic(&other, &topic.id).await,
            Err(DbError::Business(CoreError::Forbidden(_)))
        ));
        assert!(matches!(
            db.chats().delete_topic(&other, &topic.id).await,
            Err(DbError::Business(CoreError::Forbidden(_)))
        ));
    }

    #[tokio::test]
    async fn test_clear_resets_messages_and_pending() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = user(&db, "admin1").await;
        let chats = db.chats();
        let topic = chats.create_topic(&owner, None).await.unwrap();

        chats
            .append_message(&topic.id, Some(&owner), ChatRole::User, "restok kopi 12")
            .await
            .unwrap();
        chats
            .append_message(&topic.id, None, ChatRole::Assistant, "Pilih produk")
            .await
            .unwrap();
        let pending = PendingAction::RestockSelect {
            candidates: vec![ProductChoice {
                product_id: "p1".into(),
                name: "Kopi Kapal Api".into(),
            }],
            amount: 12,
        };
        chats.set_pending(&topic.id, &pending).await.unwrap();

        let stored = chats.owned_topic(&owner, &topic.id).await.unwrap();
        assert_eq!(stored.pending_action(), Some(pending));
        assert!(stored.last_message_at.is_some());

        chats.clear_topic(&owner, &topic.id).await.unwrap();
        let cleared = chats.owned_topic(&owner, &topic.id).await.unwrap();
        assert!(cleared.pending_action().is_none());
        assert!(cleared.last_message_at.is_none());
        assert!(chats.messages(&topic.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_messages_window() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = user(&db, "admin1").await;
        let chats = db.chats();
        let topic = chats.create_topic(&owner, None).await.unwrap();

        for i in 0..5 {
            chats
                .append_message(&topic.id, Some(&owner), ChatRole::User, &format!("pesan {}", i))
                .await
                .unwrap();
        }

        let recent = chats.recent_messages(&topic.id, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].content, "pesan 3");
        assert_eq!(recent[1].content, "pesan 4");
        assert!(chats.recent_messages(&topic.id, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_topic_disappears() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owner = user(&db, "admin1").await;
        let topic = db.chats().create_topic(&owner, None).await.unwrap();

        db.chats().delete_topic(&owner, &topic.id).await.unwrap();
        assert!(db.chats().list_topics(&owner).await.unwrap().is_empty());
        assert!(matches!(
            db.chats().owned_topic(&owner, &topic.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
