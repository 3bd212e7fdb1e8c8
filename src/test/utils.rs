use crate::db::{create_assessment, upsert_session};
use crate::error::AppError;
use crate::init_rocket;
use crate::schema::ensure_schema;
use rocket::local::asynchronous::Client;
use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};
use std::collections::HashMap;
use std::sync::Once;

static INIT: Once = Once::new();

#[derive(Default)]
pub struct TestDbBuilder {
    sessions: Vec<TestSession>,
    assessments: Vec<TestAssessment>,
}

pub struct TestSession {
    pub session_id: String,
    pub age_group: Option<String>,
    pub consent_given: bool,
}

pub struct TestAssessment {
    pub session_id: String,
    pub assessment_type: String,
}

impl TestDbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(mut self, session_id: &str, age_group: Option<&str>, consent_given: bool) -> Self {
        self.sessions.push(TestSession {
            session_id: session_id.to_string(),
            age_group: age_group.map(String::from),
            consent_given,
        });
        self
    }

    pub fn assessment(mut self, session_id: &str, assessment_type: &str) -> Self {
        self.assessments.push(TestAssessment {
            session_id: session_id.to_string(),
            assessment_type: assessment_type.to_string(),
        });
        self
    }

    pub async fn build(self) -> Result<TestDb, AppError> {
        INIT.call_once(|| {
            let _ = env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or("debug"),
            )
            .is_test(true)
            .try_init();
        });

        // A single connection keeps every query on the same in-memory
        // database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        ensure_schema(&pool).await?;

        let mut user_id_map: HashMap<String, i64> = HashMap::new();
        let mut assessment_id_map: HashMap<String, i64> = HashMap::new();

        for session in &self.sessions {
            let user = upsert_session(
                &pool,
                &session.session_id,
                session.age_group.as_deref(),
                session.consent_given,
            )
            .await?;

            user_id_map.insert(session.session_id.clone(), user.id);
        }

        for assessment in &self.assessments {
            let user_id = user_id_map
                .get(&assessment.session_id)
                .copied()
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "Test fixture references unknown session {}",
                        assessment.session_id
                    ))
                })?;

            let created = create_assessment(&pool, user_id, &assessment.assessment_type).await?;

            assessment_id_map.insert(
                assessment_key(&assessment.session_id, &assessment.assessment_type),
                created.id,
            );
        }

        Ok(TestDb {
            pool,
            user_id_map,
            assessment_id_map,
        })
    }
}

fn assessment_key(session_id: &str, assessment_type: &str) -> String {
    format!("{}:{}", session_id, assessment_type)
}

pub struct TestDb {
    pub pool: Pool<Sqlite>,
    user_id_map: HashMap<String, i64>,
    assessment_id_map: HashMap<String, i64>,
}

impl TestDb {
    pub fn user_id(&self, session_id: &str) -> Option<i64> {
        self.user_id_map.get(session_id).copied()
    }

    pub fn assessment_id(&self, session_id: &str, assessment_type: &str) -> Option<i64> {
        self.assessment_id_map
            .get(&assessment_key(session_id, assessment_type))
            .copied()
    }

    pub async fn count_rows(&self, table: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
    }
}

pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
    let rocket = init_rocket(test_db.pool.clone()).await;
    let client = Client::tracked(rocket)
        .await
        .expect("valid rocket instance");
    (client, test_db)
}

pub async fn create_standard_test_db() -> TestDb {
    TestDbBuilder::new()
        .session("sess-alpha", Some("adult"), true)
        .session("sess-beta", None, false)
        .assessment("sess-alpha", "gaze")
        .build()
        .await
        .expect("Failed to build test DB")
}
