use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub provider_id: String,
    pub customer_id: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

pub fn ensure_valid_rating(rating: i32) -> Result<(), ApiError> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

/// Mean of the given ratings rounded to one decimal; 0.0 when there are none.
/// The provider's denormalized `rating` column always holds this value.
pub fn rounded_mean(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|r| *r as i64).sum();
    let mean = sum as f64 / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

impl Review {
    /// Inserts a review and recomputes the provider's aggregates from scratch
    /// in the same transaction, so the denormalized values converge no matter
    /// how concurrent reviews interleave.
    pub async fn add(
        pool: &PgPool,
        provider_id: &str,
        customer_id: &str,
        rating: i32,
        comment: &str,
    ) -> Result<Self, ApiError> {
        ensure_valid_rating(rating)?;
        if provider_id == customer_id {
            return Err(ApiError::Validation(
                "cannot review yourself".to_string(),
            ));
        }

        let now = Utc::now();
        let mut tx = pool.begin().await?;

        // The reviews table references providers; make sure the row exists
        // before the insert, without disturbing an existing profile.
        sqlx::query(
            r#"
            INSERT INTO providers (id, created_at, updated_at)
            VALUES ($1, $2, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(provider_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, provider_id, customer_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(provider_id)
        .bind(customer_id)
        .bind(rating)
        .bind(comment)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let ratings: Vec<i32> = sqlx::query_scalar(
            r#"
            SELECT rating FROM reviews
            WHERE provider_id = $1
            "#,
        )
        .bind(provider_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE providers
            SET rating = $2, reviews_count = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(provider_id)
        .bind(rounded_mean(&ratings))
        .bind(ratings.len() as i64)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Review added: {:?}", review);
        Ok(review)
    }

    pub async fn list_for_provider(
        pool: &PgPool,
        provider_id: &str,
    ) -> Result<Vec<Self>, ApiError> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT * FROM reviews
            WHERE provider_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(provider_id)
        .fetch_all(pool)
        .await?;

        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rating_bounds() {
        for rating in 1..=5 {
            assert!(ensure_valid_rating(rating).is_ok());
        }
        assert!(matches!(
            ensure_valid_rating(0).unwrap_err(),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            ensure_valid_rating(6).unwrap_err(),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            ensure_valid_rating(-3).unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn mean_rounds_to_one_decimal() {
        assert_eq!(rounded_mean(&[]), 0.0);
        assert_eq!(rounded_mean(&[4]), 4.0);
        assert_eq!(rounded_mean(&[4, 5]), 4.5);
        assert_eq!(rounded_mean(&[3, 4, 4]), 3.7);
        assert_eq!(rounded_mean(&[1, 1, 1, 2]), 1.3);
        assert_eq!(rounded_mean(&[5, 5, 5, 5, 5]), 5.0);
    }

    #[test]
    fn mean_is_order_insensitive() {
        assert_eq!(rounded_mean(&[1, 5, 3]), rounded_mean(&[3, 1, 5]));
    }
}
