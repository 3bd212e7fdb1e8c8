use std::str::FromStr;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, instrument};

use crate::error::AppError;
use crate::models::{
    Assessment, AssessmentResult, AssessmentStatistics, DbAssessment, DbAssessmentResult, DbUser,
    GazeRecord, NewAssessmentResult, ResponseRecord, User,
};

pub async fn connect(database_url: &str) -> Result<Pool<Sqlite>, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    debug!("Connecting to SQLite database at {}", database_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[instrument(skip(pool))]
pub async fn upsert_session(
    pool: &Pool<Sqlite>,
    session_id: &str,
    age_group: Option<&str>,
    consent_given: bool,
) -> Result<User, AppError> {
    info!("Upserting user session");
    sqlx::query(
        "INSERT INTO users (session_id, age_group, consent_given)
         VALUES (?, ?, ?)
         ON CONFLICT(session_id) DO UPDATE SET updated_at = CURRENT_TIMESTAMP",
    )
    .bind(session_id)
    .bind(age_group)
    .bind(consent_given)
    .execute(pool)
    .await?;

    get_user_by_session(pool, session_id).await
}

#[instrument(skip(pool))]
pub async fn get_user_by_session(
    pool: &Pool<Sqlite>,
    session_id: &str,
) -> Result<User, AppError> {
    info!("Fetching user by session id");
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, session_id, age_group, consent_given, created_at, updated_at
         FROM users WHERE session_id = ?",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!(
            "User with session id {} not found in database",
            session_id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn create_assessment(
    pool: &Pool<Sqlite>,
    user_id: i64,
    assessment_type: &str,
) -> Result<Assessment, AppError> {
    info!("Creating assessment");
    let res = sqlx::query("INSERT INTO assessments (user_id, assessment_type) VALUES (?, ?)")
        .bind(user_id)
        .bind(assessment_type)
        .execute(pool)
        .await?;

    get_assessment(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool))]
pub async fn get_assessment(pool: &Pool<Sqlite>, id: i64) -> Result<Assessment, AppError> {
    let row = sqlx::query_as::<_, DbAssessment>(
        "SELECT id, user_id, assessment_type, status, started_at, completed_at, total_duration
         FROM assessments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(assessment) => Ok(Assessment::from(assessment)),
        _ => Err(AppError::NotFound(format!(
            "Assessment with id {} not found in database",
            id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn get_user_assessments(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<Assessment>, AppError> {
    info!("Getting user assessments");
    let rows = sqlx::query_as::<_, DbAssessment>(
        "SELECT id, user_id, assessment_type, status, started_at, completed_at, total_duration
         FROM assessments WHERE user_id = ? ORDER BY started_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Assessment::from).collect())
}

#[instrument(skip(pool, records), fields(count = records.len()))]
pub async fn insert_gaze_batch(
    pool: &Pool<Sqlite>,
    assessment_id: i64,
    records: &[GazeRecord],
) -> Result<usize, AppError> {
    info!("Inserting gaze sample batch");
    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(
            "INSERT INTO gaze_data
             (assessment_id, task_name, task_type, frame_number, timestamp, face_detected,
              gaze_x, gaze_y, eye_contact_score, fixation_duration, saccade_amplitude,
              social_attention_score)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(assessment_id)
        .bind(&record.task_name)
        .bind(&record.task_type)
        .bind(record.frame_number)
        .bind(record.timestamp)
        .bind(record.face_detected)
        .bind(record.gaze_x)
        .bind(record.gaze_y)
        .bind(record.eye_contact_score)
        .bind(record.fixation_duration)
        .bind(record.saccade_amplitude)
        .bind(record.social_attention_score)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(records.len())
}

#[instrument(skip(pool, records), fields(count = records.len()))]
pub async fn insert_response_batch(
    pool: &Pool<Sqlite>,
    assessment_id: i64,
    records: &[ResponseRecord],
) -> Result<usize, AppError> {
    info!("Inserting questionnaire response batch");
    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(
            "INSERT INTO questionnaire_responses
             (assessment_id, question_id, question_text, response_value, response_text,
              domain, weight, is_critical_item)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(assessment_id)
        .bind(&record.question_id)
        .bind(&record.question_text)
        .bind(record.response_value)
        .bind(&record.response_text)
        .bind(&record.domain)
        .bind(record.weight)
        .bind(record.is_critical_item)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(records.len())
}

/// Writes the result row and marks the parent assessment completed with a
/// wall-clock duration, in one transaction. A missing assessment is not an
/// error: the result row is still recorded, there is just nothing to
/// complete.
#[instrument(skip(pool, result))]
pub async fn record_result(
    pool: &Pool<Sqlite>,
    assessment_id: i64,
    result: &NewAssessmentResult,
) -> Result<(), AppError> {
    info!("Recording assessment result");
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO assessment_results
         (assessment_id, questionnaire_scores, gaze_metrics, ml_prediction, risk_assessment,
          recommendations, overall_score, risk_level, confidence_score)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(assessment_id)
    .bind(&result.questionnaire_scores)
    .bind(&result.gaze_metrics)
    .bind(&result.ml_prediction)
    .bind(&result.risk_assessment)
    .bind(&result.recommendations)
    .bind(result.overall_score)
    .bind(&result.risk_level)
    .bind(result.confidence_score)
    .execute(&mut *tx)
    .await?;

    let row = sqlx::query_as::<_, DbAssessment>(
        "SELECT id, user_id, assessment_type, status, started_at, completed_at, total_duration
         FROM assessments WHERE id = ?",
    )
    .bind(assessment_id)
    .fetch_optional(&mut *tx)
    .await?;

    if let Some(assessment) = row {
        let now = Utc::now().naive_utc();
        let total_duration = assessment
            .started_at
            .map(|started| (now - started).num_seconds().max(0));

        sqlx::query(
            "UPDATE assessments
             SET status = 'completed', completed_at = ?, total_duration = ?
             WHERE id = ?",
        )
        .bind(now)
        .bind(total_duration)
        .bind(assessment_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(())
}

#[instrument(skip(pool))]
pub async fn get_assessment_result(
    pool: &Pool<Sqlite>,
    assessment_id: i64,
) -> Result<AssessmentResult, AppError> {
    info!("Fetching assessment result");
    let row = sqlx::query_as::<_, DbAssessmentResult>(
        "SELECT id, assessment_id, questionnaire_scores, gaze_metrics, ml_prediction,
                risk_assessment, recommendations, overall_score, risk_level, confidence_score,
                created_at
         FROM assessment_results WHERE assessment_id = ?",
    )
    .bind(assessment_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(result) => Ok(AssessmentResult::from(result)),
        _ => Err(AppError::NotFound(format!(
            "No result recorded for assessment {}",
            assessment_id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn get_statistics(pool: &Pool<Sqlite>) -> Result<AssessmentStatistics, AppError> {
    info!("Aggregating assessment statistics");
    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    let total_assessments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assessments")
        .fetch_one(pool)
        .await?;

    let completed_assessments: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM assessments WHERE status = 'completed'")
            .fetch_one(pool)
            .await?;

    let risk_levels: Vec<Option<String>> =
        sqlx::query_scalar("SELECT risk_level FROM assessment_results")
            .fetch_all(pool)
            .await?;

    let mut risk_distribution = std::collections::HashMap::new();
    for level in risk_levels.into_iter().flatten() {
        if !level.is_empty() {
            *risk_distribution.entry(level).or_insert(0) += 1;
        }
    }

    let completion_rate = completed_assessments as f64 / total_assessments.max(1) as f64;

    Ok(AssessmentStatistics {
        total_users,
        total_assessments,
        completed_assessments,
        completion_rate,
        risk_distribution,
    })
}
