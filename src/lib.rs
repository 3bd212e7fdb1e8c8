#[macro_use]
extern crate rocket;

pub mod api;
pub mod db;
pub mod env;
pub mod error;
pub mod models;
pub mod schema;
pub mod telemetry;
pub mod validation;
#[cfg(test)]
mod test;

use api::{
    api_admin_stats, api_create_assessment, api_get_results, api_get_session,
    api_get_user_assessments, api_record_gaze_data, api_record_responses, api_record_results,
    api_upsert_session, health,
};
use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use telemetry::TelemetryFairing;
use tracing::info;

pub async fn init_rocket(pool: SqlitePool) -> Rocket<Build> {
    info!("Starting screening API");

    rocket::build()
        .manage(pool)
        .mount(
            "/api",
            routes![
                health,
                api_upsert_session,
                api_get_session,
                api_create_assessment,
                api_get_user_assessments,
                api_record_gaze_data,
                api_record_responses,
                api_record_results,
                api_get_results,
                api_admin_stats,
            ],
        )
        .attach(TelemetryFairing)
}
