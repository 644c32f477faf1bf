use actix_web::{get, post, web, HttpResponse, Responder};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::Agreement;
use crate::types::{MarkSeenRequest, RequestAgreementRequest, RespondAgreementRequest};
use crate::AppState;

#[post("")]
async fn request_agreement(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    web::Json(req): web::Json<RequestAgreementRequest>,
) -> Result<impl Responder, ApiError> {
    let agreement = Agreement::request(
        &app_state.pool,
        &authenticated_user.user_id,
        &req.provider_id,
    )
    .await?;

    Ok(web::Json(agreement))
}

#[post("/{agreement_id}/respond")]
async fn respond_agreement(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    agreement_id: web::Path<Uuid>,
    web::Json(req): web::Json<RespondAgreementRequest>,
) -> Result<impl Responder, ApiError> {
    let agreement = Agreement::respond(
        &app_state.pool,
        agreement_id.into_inner(),
        &authenticated_user.user_id,
        req.decision,
    )
    .await?;

    Ok(web::Json(agreement))
}

#[post("/seen")]
async fn mark_seen(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
    web::Json(req): web::Json<MarkSeenRequest>,
) -> Result<HttpResponse, ApiError> {
    Agreement::mark_seen(
        &app_state.pool,
        &req.agreement_ids,
        &authenticated_user.user_id,
    )
    .await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Agreements addressed to the caller as a provider, newest first.
#[get("/incoming")]
async fn incoming(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
) -> Result<impl Responder, ApiError> {
    let agreements = Agreement::incoming(&app_state.pool, &authenticated_user.user_id).await?;
    Ok(web::Json(agreements))
}

/// Agreements the caller has requested as a customer, newest first.
#[get("/outgoing")]
async fn outgoing(
    app_state: web::Data<Arc<AppState>>,
    authenticated_user: AuthenticatedUser,
) -> Result<impl Responder, ApiError> {
    let agreements = Agreement::outgoing(&app_state.pool, &authenticated_user.user_id).await?;
    Ok(web::Json(agreements))
}
