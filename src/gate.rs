use sqlx::PgPool;
use tracing::debug;

use crate::error::ApiError;

/// Single source of truth for "may these two parties exchange direct
/// messages / see phone numbers": true iff an accepted agreement exists for
/// the unordered pair. Queried fresh on every call, since acceptance can land
/// from another session at any moment.
///
/// Fail-closed: a store failure propagates as `StoreUnavailable`, and every
/// caller treats that as denial rather than permission.
pub async fn can_contact(pool: &PgPool, a: &str, b: &str) -> Result<bool, ApiError> {
    let allowed: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM agreements
            WHERE status = 'accepted'
              AND ((customer_id = $1 AND provider_id = $2)
                OR (customer_id = $2 AND provider_id = $1))
        )
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_one(pool)
    .await?;

    debug!("Contact gate for ({}, {}): {}", a, b, allowed);
    Ok(allowed)
}

/// Convenience for the write paths: turns a closed gate into `Forbidden`.
pub async fn ensure_can_contact(pool: &PgPool, a: &str, b: &str) -> Result<(), ApiError> {
    if !can_contact(pool, a, b).await? {
        return Err(ApiError::Forbidden(
            "no accepted agreement between these parties".to_string(),
        ));
    }
    Ok(())
}
