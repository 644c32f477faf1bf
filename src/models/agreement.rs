use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "agreement_status", rename_all = "lowercase")] // SQL value name
#[serde(rename_all = "lowercase")] // JSON value name
pub enum AgreementStatus {
    Pending,
    Accepted,
    Rejected,
}

impl AgreementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgreementStatus::Pending => "pending",
            AgreementStatus::Accepted => "accepted",
            AgreementStatus::Rejected => "rejected",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn resulting_status(self) -> AgreementStatus {
        match self {
            Decision::Accept => AgreementStatus::Accepted,
            Decision::Reject => AgreementStatus::Rejected,
        }
    }
}

/// A customer's request to unlock direct contact with a provider. Created
/// pending, decided exactly once by the provider, never deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Agreement {
    pub id: Uuid,
    pub customer_id: String,
    pub provider_id: String,
    pub status: AgreementStatus,
    pub seen_by_provider: bool,
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Agreement {
    /// Transition rules for `respond`: only the provider may decide, and only
    /// while the agreement is still pending. Both outcomes are terminal.
    pub fn ensure_respondable(&self, responder_id: &str) -> Result<(), ApiError> {
        if self.provider_id != responder_id {
            return Err(ApiError::Forbidden(
                "only the provider may respond to this agreement".to_string(),
            ));
        }
        if self.status != AgreementStatus::Pending {
            return Err(ApiError::InvalidTransition(format!(
                "agreement is already {}",
                self.status.as_str()
            )));
        }
        Ok(())
    }

    /// Inserts a pending agreement for the pair. The partial unique index on
    /// live agreements turns a duplicate request into `AlreadyExists` instead
    /// of a second row.
    pub async fn request(
        pool: &PgPool,
        customer_id: &str,
        provider_id: &str,
    ) -> Result<Self, ApiError> {
        if provider_id.is_empty() {
            return Err(ApiError::Validation("provider id is required".to_string()));
        }
        if customer_id == provider_id {
            return Err(ApiError::Validation(
                "cannot request an agreement with yourself".to_string(),
            ));
        }

        let agreement = sqlx::query_as::<_, Agreement>(
            r#"
            INSERT INTO agreements (id, customer_id, provider_id, status, seen_by_provider, requested_at)
            VALUES ($1, $2, $3, 'pending', FALSE, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(customer_id)
        .bind(provider_id)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::AlreadyExists(_) => {
                ApiError::AlreadyExists("agreement already requested".to_string())
            }
            other => other,
        })?;

        debug!("Agreement requested: {:?}", agreement);
        Ok(agreement)
    }

    /// Applies the provider's decision. The row is locked for the duration of
    /// the transaction so two concurrent decisions cannot both see `pending`,
    /// and the accepted-agreements counter moves in the same transaction as
    /// the status change.
    pub async fn respond(
        pool: &PgPool,
        agreement_id: Uuid,
        responder_id: &str,
        decision: Decision,
    ) -> Result<Self, ApiError> {
        let mut tx = pool.begin().await?;

        let agreement = sqlx::query_as::<_, Agreement>(
            r#"
            SELECT * FROM agreements
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(agreement_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::NotFound("agreement not found".to_string()))?;

        agreement.ensure_respondable(responder_id)?;

        let now = Utc::now();
        let updated = sqlx::query_as::<_, Agreement>(
            r#"
            UPDATE agreements
            SET status = $1, decided_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(decision.resulting_status())
        .bind(now)
        .bind(agreement_id)
        .fetch_one(&mut *tx)
        .await?;

        if decision == Decision::Accept {
            sqlx::query(
                r#"
                INSERT INTO providers (id, agreements_count, created_at, updated_at)
                VALUES ($1, 1, $2, $2)
                ON CONFLICT (id) DO UPDATE
                SET agreements_count = providers.agreements_count + 1, updated_at = $2
                "#,
            )
            .bind(&updated.provider_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!("Agreement decided: {:?}", updated);
        Ok(updated)
    }

    /// Marks agreements as seen where the viewer is the provider. Idempotent,
    /// and a no-op on empty input.
    pub async fn mark_seen(
        pool: &PgPool,
        agreement_ids: &[Uuid],
        viewer_id: &str,
    ) -> Result<(), ApiError> {
        if agreement_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE agreements
            SET seen_by_provider = TRUE
            WHERE id = ANY($1) AND provider_id = $2
            "#,
        )
        .bind(agreement_ids)
        .bind(viewer_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Agreements addressed to a provider, newest first.
    pub async fn incoming(pool: &PgPool, provider_id: &str) -> Result<Vec<Self>, ApiError> {
        let agreements = sqlx::query_as::<_, Agreement>(
            r#"
            SELECT * FROM agreements
            WHERE provider_id = $1
            ORDER BY requested_at DESC
            "#,
        )
        .bind(provider_id)
        .fetch_all(pool)
        .await?;

        Ok(agreements)
    }

    /// Agreements a customer has requested, newest first.
    pub async fn outgoing(pool: &PgPool, customer_id: &str) -> Result<Vec<Self>, ApiError> {
        let agreements = sqlx::query_as::<_, Agreement>(
            r#"
            SELECT * FROM agreements
            WHERE customer_id = $1
            ORDER BY requested_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(pool)
        .await?;

        Ok(agreements)
    }

    /// Pending requests the provider has not yet looked at; drives the
    /// agreements badge.
    pub async fn pending_unseen_count(pool: &PgPool, provider_id: &str) -> Result<i64, ApiError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM agreements
            WHERE provider_id = $1 AND status = 'pending' AND seen_by_provider = FALSE
            "#,
        )
        .bind(provider_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pending_agreement() -> Agreement {
        Agreement {
            id: Uuid::new_v4(),
            customer_id: "customer-1".to_string(),
            provider_id: "provider-1".to_string(),
            status: AgreementStatus::Pending,
            seen_by_provider: false,
            requested_at: Utc::now(),
            decided_at: None,
        }
    }

    #[test]
    fn provider_may_respond_to_pending() {
        let agreement = pending_agreement();
        assert!(agreement.ensure_respondable("provider-1").is_ok());
    }

    #[test]
    fn non_provider_is_forbidden() {
        let agreement = pending_agreement();
        let err = agreement.ensure_respondable("customer-1").unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = agreement.ensure_respondable("someone-else").unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn decided_agreements_are_terminal() {
        for status in [AgreementStatus::Accepted, AgreementStatus::Rejected] {
            let mut agreement = pending_agreement();
            agreement.status = status;
            agreement.decided_at = Some(Utc::now());

            let err = agreement.ensure_respondable("provider-1").unwrap_err();
            assert!(matches!(err, ApiError::InvalidTransition(_)));
        }
    }

    #[test]
    fn authorization_is_checked_before_transition() {
        // A stranger poking at a decided agreement sees Forbidden, not the
        // state of the agreement.
        let mut agreement = pending_agreement();
        agreement.status = AgreementStatus::Rejected;

        let err = agreement.ensure_respondable("someone-else").unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn decision_maps_to_terminal_status() {
        assert_eq!(
            Decision::Accept.resulting_status(),
            AgreementStatus::Accepted
        );
        assert_eq!(
            Decision::Reject.resulting_status(),
            AgreementStatus::Rejected
        );
    }
}
