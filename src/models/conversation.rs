use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

/// Orders two party identifiers into the canonical (low, high) form the
/// conversations table stores. The unordered pair always lands on the same
/// row regardless of who opened the thread.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The persistent thread between exactly two parties. One row per unordered
/// pair; created lazily on first gated send and never deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub participant_low: String,
    pub participant_high: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_content: String,
    pub unread_low: i64,
    pub unread_high: i64,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participant_low == user_id || self.participant_high == user_id
    }

    pub fn other_participant(&self, user_id: &str) -> Option<&str> {
        if self.participant_low == user_id {
            Some(&self.participant_high)
        } else if self.participant_high == user_id {
            Some(&self.participant_low)
        } else {
            None
        }
    }

    pub fn unread_for(&self, viewer_id: &str) -> i64 {
        if self.participant_low == viewer_id {
            self.unread_low
        } else if self.participant_high == viewer_id {
            self.unread_high
        } else {
            0
        }
    }

    /// Returns the conversation for the unordered pair, creating it if absent.
    /// Safe under concurrent calls from both participants: the unique
    /// constraint on the canonical pair makes the racing insert a no-op, and
    /// the loser re-selects the winner's row.
    pub async fn get_or_create(pool: &PgPool, a: &str, b: &str) -> Result<Self, ApiError> {
        if a == b {
            return Err(ApiError::Validation(
                "a conversation needs two distinct participants".to_string(),
            ));
        }
        let (low, high) = canonical_pair(a, b);

        if let Some(conversation) = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (id, participant_low, participant_high, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (participant_low, participant_high) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(low)
        .bind(high)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await?
        {
            debug!("Conversation created: {:?}", conversation);
            return Ok(conversation);
        }

        // Lost the insert race (or the row already existed); fetch it.
        let conversation = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE participant_low = $1 AND participant_high = $2
            "#,
        )
        .bind(low)
        .bind(high)
        .fetch_one(pool)
        .await?;

        debug!("Conversation found: {:?}", conversation);
        Ok(conversation)
    }

    pub async fn get(pool: &PgPool, conversation_id: Uuid) -> Result<Self, ApiError> {
        sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("conversation not found".to_string()))
    }

    /// All conversations the viewer participates in, most recent activity
    /// first.
    pub async fn inbox(pool: &PgPool, viewer_id: &str) -> Result<Vec<Self>, ApiError> {
        let conversations = sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE participant_low = $1 OR participant_high = $1
            ORDER BY last_message_at DESC NULLS LAST, created_at DESC
            "#,
        )
        .bind(viewer_id)
        .fetch_all(pool)
        .await?;

        Ok(conversations)
    }

    /// Zeroes the viewer's unread side. Idempotent.
    pub async fn mark_read(
        pool: &PgPool,
        conversation_id: Uuid,
        viewer_id: &str,
    ) -> Result<(), ApiError> {
        let conversation = Self::get(pool, conversation_id).await?;
        if !conversation.is_participant(viewer_id) {
            return Err(ApiError::Forbidden(
                "not a participant of this conversation".to_string(),
            ));
        }

        sqlx::query(
            r#"
            UPDATE conversations
            SET unread_low = CASE WHEN participant_low = $2 THEN 0 ELSE unread_low END,
                unread_high = CASE WHEN participant_high = $2 THEN 0 ELSE unread_high END
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .bind(viewer_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Sum of the viewer's unread sides across all their conversations;
    /// drives the messages badge.
    pub async fn unread_total(pool: &PgPool, viewer_id: &str) -> Result<i64, ApiError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(
                CASE
                    WHEN participant_low = $1 THEN unread_low
                    WHEN participant_high = $1 THEN unread_high
                    ELSE 0
                END
            ), 0)::BIGINT
            FROM conversations
            WHERE participant_low = $1 OR participant_high = $1
            "#,
        )
        .bind(viewer_id)
        .fetch_one(pool)
        .await?;

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn conversation_between(low: &str, high: &str) -> Conversation {
        Conversation {
            id: Uuid::new_v4(),
            participant_low: low.to_string(),
            participant_high: high.to_string(),
            last_message_at: None,
            last_message_content: String::new(),
            unread_low: 2,
            unread_high: 5,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn canonical_pair_is_order_insensitive() {
        assert_eq!(canonical_pair("a", "b"), ("a", "b"));
        assert_eq!(canonical_pair("b", "a"), ("a", "b"));
        assert_eq!(
            canonical_pair("+989121111111", "+989120000000"),
            ("+989120000000", "+989121111111")
        );
    }

    #[test]
    fn participant_checks() {
        let conversation = conversation_between("a", "b");
        assert!(conversation.is_participant("a"));
        assert!(conversation.is_participant("b"));
        assert!(!conversation.is_participant("c"));

        assert_eq!(conversation.other_participant("a"), Some("b"));
        assert_eq!(conversation.other_participant("b"), Some("a"));
        assert_eq!(conversation.other_participant("c"), None);
    }

    #[test]
    fn unread_side_follows_viewer() {
        let conversation = conversation_between("a", "b");
        assert_eq!(conversation.unread_for("a"), 2);
        assert_eq!(conversation.unread_for("b"), 5);
        assert_eq!(conversation.unread_for("c"), 0);
    }
}
