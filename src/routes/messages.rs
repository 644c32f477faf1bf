use actix_web::{post, put, web, Responder};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::gate;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::message::ensure_valid_content;
use crate::models::{Conversation, Message};
use crate::types::{EditMessageRequest, SendMessageRequest};
use crate::AppState;

/// Sends a direct message. The contact gate is checked server-side before the
/// conversation is even looked up, so a closed gate never creates a
/// conversation row. A gate that cannot be evaluated denies the send.
#[post("")]
async fn send_message(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    web::Json(req): web::Json<SendMessageRequest>,
) -> Result<impl Responder, ApiError> {
    let sender_id = authenticated_user.user_id;
    ensure_valid_content(&req.content)?;

    gate::ensure_can_contact(&app_state.pool, &sender_id, &req.recipient_id).await?;

    let conversation =
        Conversation::get_or_create(&app_state.pool, &sender_id, &req.recipient_id).await?;

    let message = Message::send(
        &app_state.pool,
        &conversation,
        &sender_id,
        &req.recipient_id,
        &req.content,
    )
    .await?;

    Ok(web::Json(message))
}

#[put("/{message_id}")]
async fn edit_message(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    message_id: web::Path<Uuid>,
    web::Json(req): web::Json<EditMessageRequest>,
) -> Result<impl Responder, ApiError> {
    let message = Message::edit(
        &app_state.pool,
        message_id.into_inner(),
        &authenticated_user.user_id,
        &req.content,
    )
    .await?;

    Ok(web::Json(message))
}
