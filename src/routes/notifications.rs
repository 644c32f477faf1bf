use actix_web::{get, web, Responder};
use std::sync::Arc;
use tokio::join;

use crate::error::ApiError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{Agreement, Conversation};
use crate::types::BadgeCounts;
use crate::AppState;

/// Badge counts for the UI shell. Both numbers are recounted from the
/// authoritative tables on every call, so they cannot drift from the
/// mutations that feed them.
#[get("/badges")]
async fn badges(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
) -> Result<impl Responder, ApiError> {
    let viewer_id = authenticated_user.user_id;

    let pending_future = Agreement::pending_unseen_count(&app_state.pool, &viewer_id);
    let unread_future = Conversation::unread_total(&app_state.pool, &viewer_id);

    let (pending_agreements, unread_messages) = join!(pending_future, unread_future);

    Ok(web::Json(BadgeCounts {
        pending_agreements: pending_agreements?,
        unread_messages: unread_messages?,
    }))
}
