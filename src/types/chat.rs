use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub recipient_id: String,
    pub content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct EditMessageRequest {
    pub content: String,
}

/// One inbox row, shaped for the viewer: the other party, the denormalized
/// preview, and the viewer's own unread count.
#[derive(Serialize, ToSchema)]
pub struct InboxEntry {
    pub conversation_id: Uuid,
    pub other_participant: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_content: String,
    pub unread: i64,
}
