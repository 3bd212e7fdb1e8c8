#[macro_use]
extern crate rocket;

use screening_api::{env, init_rocket, schema, telemetry};
use sqlx::SqlitePool;
use tracing::{error, info};

#[launch]
async fn rocket() -> _ {
    telemetry::init_tracing();

    if let Err(e) = env::load_environment() {
        error!("Failed to load environment files: {}", e);
    }

    let database_url = env::database_url().expect("Failed to resolve database path");

    let pool: SqlitePool = screening_api::db::connect(&database_url)
        .await
        .expect("Failed to connect to SQLite database");

    info!("Ensuring database schema...");
    match schema::ensure_schema(&pool).await {
        Ok(_) => info!("Schema ready"),
        Err(e) => {
            error!("Failed to create schema: {}", e);
            panic!("Database schema creation failed: {}", e);
        }
    }

    init_rocket(pool).await
}
