use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::debug;

use crate::error::ApiError;

/// A service provider profile with its denormalized aggregates. `rating` and
/// `reviews_count` are recomputed from the reviews table inside the same
/// transaction that inserts a review; `agreements_count` moves with agreement
/// acceptance. No other code path touches these columns.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub display_name: String,
    pub phone: String,
    pub rating: f64,
    pub reviews_count: i64,
    pub agreements_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    pub async fn get(pool: &PgPool, provider_id: &str) -> Result<Self, ApiError> {
        sqlx::query_as::<_, Provider>(
            r#"
            SELECT * FROM providers
            WHERE id = $1
            "#,
        )
        .bind(provider_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("provider not found".to_string()))
    }

    /// Creates or updates the caller's own profile. Aggregate columns are
    /// left alone; only the profile fields move here.
    pub async fn upsert_profile(
        pool: &PgPool,
        provider_id: &str,
        display_name: &str,
        phone: &str,
    ) -> Result<Self, ApiError> {
        if display_name.trim().is_empty() {
            return Err(ApiError::Validation(
                "display name cannot be empty".to_string(),
            ));
        }

        let provider = sqlx::query_as::<_, Provider>(
            r#"
            INSERT INTO providers (id, display_name, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (id) DO UPDATE
            SET display_name = $2, phone = $3, updated_at = $4
            RETURNING *
            "#,
        )
        .bind(provider_id)
        .bind(display_name)
        .bind(phone)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        debug!("Provider profile upserted: {:?}", provider);
        Ok(provider)
    }
}
