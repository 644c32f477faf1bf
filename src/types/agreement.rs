use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::agreement::Decision;

#[derive(Deserialize, ToSchema)]
pub struct RequestAgreementRequest {
    pub provider_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RespondAgreementRequest {
    #[schema(value_type = String)]
    pub decision: Decision,
}

#[derive(Deserialize, ToSchema)]
pub struct MarkSeenRequest {
    pub agreement_ids: Vec<Uuid>,
}
