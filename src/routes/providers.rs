use actix_web::{get, post, put, web, Responder};
use std::sync::Arc;

use crate::error::ApiError;
use crate::gate;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{Provider, Review};
use crate::types::{AddReviewRequest, ContactDetailsResponse, UpsertProfileRequest};
use crate::AppState;

#[get("/{provider_id}")]
async fn get_provider(
    app_state: web::Data<Arc<AppState>>,
    provider_id: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let provider = Provider::get(&app_state.pool, &provider_id).await?;
    Ok(web::Json(provider))
}

/// Creates or updates the caller's own provider profile.
#[put("/me")]
async fn upsert_my_profile(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    web::Json(req): web::Json<UpsertProfileRequest>,
) -> Result<impl Responder, ApiError> {
    let provider = Provider::upsert_profile(
        &app_state.pool,
        &authenticated_user.user_id,
        &req.display_name,
        &req.phone,
    )
    .await?;

    Ok(web::Json(provider))
}

#[post("/{provider_id}/reviews")]
async fn add_review(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    provider_id: web::Path<String>,
    web::Json(req): web::Json<AddReviewRequest>,
) -> Result<impl Responder, ApiError> {
    let review = Review::add(
        &app_state.pool,
        &provider_id,
        &authenticated_user.user_id,
        req.rating,
        req.comment.as_deref().unwrap_or(""),
    )
    .await?;

    Ok(web::Json(review))
}

#[get("/{provider_id}/reviews")]
async fn list_reviews(
    app_state: web::Data<Arc<AppState>>,
    provider_id: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let reviews = Review::list_for_provider(&app_state.pool, &provider_id).await?;
    Ok(web::Json(reviews))
}

/// Reveals the provider's phone number, gated on an accepted agreement with
/// the caller. Denied when the gate is closed or cannot be evaluated.
#[get("/{provider_id}/contact")]
async fn contact_details(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    provider_id: web::Path<String>,
) -> Result<impl Responder, ApiError> {
    let provider_id = provider_id.into_inner();

    gate::ensure_can_contact(&app_state.pool, &authenticated_user.user_id, &provider_id).await?;

    let provider = Provider::get(&app_state.pool, &provider_id).await?;
    Ok(web::Json(ContactDetailsResponse {
        provider_id: provider.id,
        phone: provider.phone,
    }))
}
