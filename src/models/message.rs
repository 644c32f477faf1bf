use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::conversation::Conversation;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rejects blank message bodies before anything touches the store.
pub fn ensure_valid_content(content: &str) -> Result<(), ApiError> {
    if content.trim().is_empty() {
        return Err(ApiError::Validation(
            "message content cannot be empty".to_string(),
        ));
    }
    Ok(())
}

impl Message {
    /// Only the original sender may edit.
    pub fn ensure_editable_by(&self, editor_id: &str) -> Result<(), ApiError> {
        if self.sender_id != editor_id {
            return Err(ApiError::Forbidden(
                "only the sender may edit a message".to_string(),
            ));
        }
        Ok(())
    }

    /// Appends a message to the conversation. The insert, the denormalized
    /// preview on the conversation row, and the receiver's unread counter all
    /// move in one transaction. The caller has already passed the contact
    /// gate; this only enforces that sender and receiver are the
    /// conversation's two participants.
    pub async fn send(
        pool: &PgPool,
        conversation: &Conversation,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
    ) -> Result<Self, ApiError> {
        ensure_valid_content(content)?;

        if !conversation.is_participant(sender_id) {
            return Err(ApiError::Forbidden(
                "not a participant of this conversation".to_string(),
            ));
        }
        if conversation.other_participant(sender_id) != Some(receiver_id) {
            return Err(ApiError::Validation(
                "receiver is not the other participant of this conversation".to_string(),
            ));
        }

        let now = Utc::now();
        let mut tx = pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, receiver_id, content, is_edited, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conversation.id)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE conversations
            SET last_message_at = $2,
                last_message_content = $3,
                unread_low = unread_low + CASE WHEN participant_low = $4 THEN 1 ELSE 0 END,
                unread_high = unread_high + CASE WHEN participant_high = $4 THEN 1 ELSE 0 END
            WHERE id = $1
            "#,
        )
        .bind(conversation.id)
        .bind(now)
        .bind(content)
        .bind(receiver_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Message sent: {:?}", message);
        Ok(message)
    }

    /// Replaces the content of a message the editor originally sent. If the
    /// edited message is the latest in its conversation, the denormalized
    /// preview is refreshed too; `last_message_at` never changes on edit.
    pub async fn edit(
        pool: &PgPool,
        message_id: Uuid,
        editor_id: &str,
        new_content: &str,
    ) -> Result<Self, ApiError> {
        ensure_valid_content(new_content)?;

        let mut tx = pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(message_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("message not found".to_string()))?;

        message.ensure_editable_by(editor_id)?;

        let updated = sqlx::query_as::<_, Message>(
            r#"
            UPDATE messages
            SET content = $1, is_edited = TRUE, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(new_content)
        .bind(Utc::now())
        .bind(message_id)
        .fetch_one(&mut *tx)
        .await?;

        let latest_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(updated.conversation_id)
        .fetch_optional(&mut *tx)
        .await?;

        if latest_id == Some(updated.id) {
            sqlx::query(
                r#"
                UPDATE conversations
                SET last_message_content = $2
                WHERE id = $1
                "#,
            )
            .bind(updated.conversation_id)
            .bind(new_content)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!("Message edited: {:?}", updated);
        Ok(updated)
    }

    /// Messages of a conversation in send order: `created_at` ascending, id
    /// as the insertion tiebreak.
    pub async fn list(pool: &PgPool, conversation_id: Uuid) -> Result<Vec<Self>, ApiError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await?;

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn message_from(sender: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: sender.to_string(),
            receiver_id: "other".to_string(),
            content: "hello".to_string(),
            is_edited: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn blank_content_is_rejected() {
        assert!(matches!(
            ensure_valid_content("").unwrap_err(),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            ensure_valid_content("   \n\t").unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn non_ascii_content_is_accepted() {
        assert!(ensure_valid_content("سلام").is_ok());
    }

    #[test]
    fn only_sender_may_edit() {
        let message = message_from("sender-1");
        assert!(message.ensure_editable_by("sender-1").is_ok());

        let err = message.ensure_editable_by("other").unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        // The receiver is not the sender either.
        let err = message.ensure_editable_by(&message.receiver_id).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(message.content, "hello");
    }
}
