use std::sync::Arc;

use actix_web::{get, post, web, Responder};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::ApiError;
use crate::middleware::auth::AuthenticatedUser;
use crate::types::{MeResponse, TokenResponse, VerifyOtpRequest};
use crate::AppConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Serialize)]
struct VerifierRequest {
    phone: String,
    code: String,
}

#[derive(Deserialize)]
struct VerifierResponse {
    verified: bool,
}

/// Exchanges a phone number plus one-time code for a bearer token. The code
/// itself is checked by the external OTP verifier; this service only mints
/// the JWT once the verifier says yes.
#[post("/verify")]
async fn verify_otp(
    app_config: web::Data<Arc<AppConfig>>,
    web::Json(req): web::Json<VerifyOtpRequest>,
) -> Result<impl Responder, ApiError> {
    if req.phone.trim().is_empty() || req.code.trim().is_empty() {
        return Err(ApiError::Validation(
            "phone and code are required".to_string(),
        ));
    }

    let verified = check_code_with_verifier(&req.phone, &req.code, app_config.get_ref()).await?;
    if !verified {
        return Err(ApiError::Unauthenticated);
    }

    let token = sign_jwt(&req.phone, app_config.get_ref())
        .map_err(|e| {
            error!("Failed to sign token: {:?}", e);
            ApiError::StoreUnavailable
        })?;

    info!("Issued token for {}", req.phone);
    Ok(web::Json(TokenResponse { token }))
}

#[get("/me")]
async fn me(authenticated_user: AuthenticatedUser) -> Result<impl Responder, ApiError> {
    Ok(web::Json(MeResponse {
        user_id: authenticated_user.user_id,
    }))
}

async fn check_code_with_verifier(
    phone: &str,
    code: &str,
    app_config: &Arc<AppConfig>,
) -> Result<bool, ApiError> {
    let client = Client::new();
    let response = client
        .post(&app_config.otp_verify_url)
        .header("Authorization", format!("Bearer {}", app_config.otp_api_key))
        .json(&VerifierRequest {
            phone: phone.to_owned(),
            code: code.to_owned(),
        })
        .send()
        .await;

    match response {
        Ok(resp) => {
            if resp.status().is_success() {
                let body = resp.json::<VerifierResponse>().await.map_err(|e| {
                    error!("Malformed verifier response: {:?}", e);
                    ApiError::Unauthenticated
                })?;
                Ok(body.verified)
            } else {
                let error_body = resp
                    .text()
                    .await
                    .unwrap_or_else(|_| "Failed to read response body".to_string());
                error!("Error response from OTP verifier: {}", error_body);
                Ok(false)
            }
        }
        Err(e) => {
            error!("HTTP request error: {}", e);
            Err(ApiError::Unauthenticated)
        }
    }
}

fn sign_jwt(user_id: &str, app_config: &Arc<AppConfig>) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_owned(),
        exp: now + 3600 * 24 * 7, // Token expires after 1 week
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(app_config.jwt_secret.as_ref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use pretty_assertions::assert_eq;

    fn test_config() -> Arc<AppConfig> {
        Arc::new(AppConfig {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            otp_verify_url: String::new(),
            otp_api_key: String::new(),
            bind_address: String::new(),
        })
    }

    #[test]
    fn signed_token_round_trips() {
        let config = test_config();
        let token = sign_jwt("+989121234567", &config).unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(config.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, "+989121234567");
        assert!(decoded.claims.exp > decoded.claims.iat);
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let config = test_config();
        let token = sign_jwt("+989121234567", &config).unwrap();

        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other-secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }
}
