use actix_web::{get, post, web, HttpResponse, Responder};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{Conversation, Message};
use crate::types::InboxEntry;
use crate::AppState;

/// The caller's inbox, most recent activity first, each row shaped for the
/// viewer (other party, preview, own unread count).
#[get("")]
async fn inbox(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
) -> Result<impl Responder, ApiError> {
    let viewer_id = authenticated_user.user_id;
    let conversations = Conversation::inbox(&app_state.pool, &viewer_id).await?;

    let entries: Vec<InboxEntry> = conversations
        .iter()
        .map(|c| InboxEntry {
            conversation_id: c.id,
            other_participant: c.other_participant(&viewer_id).unwrap_or_default().to_string(),
            last_message_at: c.last_message_at,
            last_message_content: c.last_message_content.clone(),
            unread: c.unread_for(&viewer_id),
        })
        .collect();

    Ok(web::Json(entries))
}

/// Messages of a conversation in send order. Participants only.
#[get("/{conversation_id}/messages")]
async fn list_messages(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    conversation_id: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let conversation = Conversation::get(&app_state.pool, conversation_id.into_inner()).await?;
    if !conversation.is_participant(&authenticated_user.user_id) {
        return Err(ApiError::Forbidden(
            "not a participant of this conversation".to_string(),
        ));
    }

    let messages = Message::list(&app_state.pool, conversation.id).await?;
    Ok(web::Json(messages))
}

#[post("/{conversation_id}/read")]
async fn mark_read(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    conversation_id: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    Conversation::mark_read(
        &app_state.pool,
        conversation_id.into_inner(),
        &authenticated_user.user_id,
    )
    .await?;

    Ok(HttpResponse::NoContent().finish())
}
