use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct UpsertProfileRequest {
    pub display_name: String,
    pub phone: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AddReviewRequest {
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ContactDetailsResponse {
    pub provider_id: String,
    pub phone: String,
}
