use serde::Serialize;
use utoipa::ToSchema;

/// Badge counts for the UI shell, recomputed per request rather than stored.
#[derive(Serialize, ToSchema)]
pub struct BadgeCounts {
    pub pending_agreements: i64,
    pub unread_messages: i64,
}
