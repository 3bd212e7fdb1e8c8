use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;

// The sibling Streamlit analysis app creates these same five tables from its
// own model definitions, so every statement must stay idempotent and
// constraint-free: whichever process touches the file first defines the
// schema, and the other must agree with it.
pub const CURRENT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    session_id TEXT NOT NULL UNIQUE,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    age_group TEXT,
    consent_given BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE TABLE IF NOT EXISTS assessments (
    id INTEGER PRIMARY KEY,
    user_id INTEGER,
    assessment_type TEXT,
    status TEXT DEFAULT 'in_progress',
    started_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    completed_at TIMESTAMP,
    total_duration INTEGER
);

CREATE TABLE IF NOT EXISTS questionnaire_responses (
    id INTEGER PRIMARY KEY,
    assessment_id INTEGER,
    question_id TEXT,
    question_text TEXT,
    response_value REAL,
    response_text TEXT,
    domain TEXT,
    weight REAL DEFAULT 1.0,
    is_critical_item BOOLEAN DEFAULT FALSE,
    answered_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS gaze_data (
    id INTEGER PRIMARY KEY,
    assessment_id INTEGER,
    task_name TEXT,
    task_type TEXT,
    frame_number INTEGER,
    timestamp REAL,
    face_detected BOOLEAN,
    gaze_x REAL,
    gaze_y REAL,
    eye_contact_score REAL,
    fixation_duration REAL,
    saccade_amplitude REAL,
    social_attention_score REAL,
    recorded_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS assessment_results (
    id INTEGER PRIMARY KEY,
    assessment_id INTEGER,
    questionnaire_scores TEXT,
    gaze_metrics TEXT,
    ml_prediction TEXT,
    risk_assessment TEXT,
    recommendations TEXT,
    overall_score REAL,
    risk_level TEXT,
    confidence_score REAL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_users_session ON users(session_id);
CREATE INDEX IF NOT EXISTS idx_assessments_user ON assessments(user_id);
CREATE INDEX IF NOT EXISTS idx_responses_assessment ON questionnaire_responses(assessment_id);
CREATE INDEX IF NOT EXISTS idx_gaze_assessment ON gaze_data(assessment_id);
CREATE INDEX IF NOT EXISTS idx_results_assessment ON assessment_results(assessment_id);
"#;

#[instrument(skip_all)]
pub async fn ensure_schema(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    info!("Ensuring database schema");
    sqlx::raw_sql(CURRENT_SCHEMA).execute(pool).await?;
    Ok(())
}
