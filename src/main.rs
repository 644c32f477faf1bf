use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod gate;
mod middleware;
mod models;
mod routes;
mod types;

pub use config::AppConfig;

pub struct AppState {
    pub pool: PgPool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let app_config = Arc::new(AppConfig::from_env()?);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&app_config.database_url)
        .await?;
    sqlx::migrate!().run(&pool).await?;

    let app_state = Arc::new(AppState { pool });
    let bind_address = app_config.bind_address.clone();

    info!("Listening on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::auth::Authentication {
                app_config: app_config.clone(),
            })
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::new(app_config.clone()))
            .service(
                web::scope("/auth")
                    .service(routes::auth::verify_otp)
                    .service(routes::auth::me),
            )
            .service(
                web::scope("/agreements")
                    .service(routes::agreements::incoming)
                    .service(routes::agreements::outgoing)
                    .service(routes::agreements::mark_seen)
                    .service(routes::agreements::respond_agreement)
                    .service(routes::agreements::request_agreement),
            )
            .service(
                web::scope("/conversations")
                    .service(routes::conversations::inbox)
                    .service(routes::conversations::list_messages)
                    .service(routes::conversations::mark_read),
            )
            .service(
                web::scope("/messages")
                    .service(routes::messages::send_message)
                    .service(routes::messages::edit_message),
            )
            .service(
                web::scope("/providers")
                    .service(routes::providers::upsert_my_profile)
                    .service(routes::providers::contact_details)
                    .service(routes::providers::add_review)
                    .service(routes::providers::list_reviews)
                    .service(routes::providers::get_provider),
            )
            .service(web::scope("/notifications").service(routes::notifications::badges))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
