use anyhow::anyhow;

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub otp_verify_url: String,
    pub otp_api_key: String,
    pub bind_address: String,
}

impl AppConfig {
    /// Gathers configuration from the process environment. `.env` files are
    /// loaded by the caller before this runs.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| anyhow!("DATABASE_URL not found"))?;

        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| anyhow!("JWT_SECRET not found"))?;

        let otp_verify_url =
            std::env::var("OTP_VERIFY_URL").map_err(|_| anyhow!("OTP_VERIFY_URL not found"))?;

        let otp_api_key =
            std::env::var("OTP_API_KEY").map_err(|_| anyhow!("OTP_API_KEY not found"))?;

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(AppConfig {
            database_url,
            jwt_secret,
            otp_verify_url,
            otp_api_key,
            bind_address,
        })
    }
}
