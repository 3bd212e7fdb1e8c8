use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn to_utc(dt: Option<NaiveDateTime>) -> DateTime<Utc> {
    dt.map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
        .unwrap_or_else(Utc::now)
}

#[derive(Serialize, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub session_id: String,
    pub age_group: Option<String>,
    pub consent_given: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbUser {
    pub id: Option<i64>,
    pub session_id: Option<String>,
    pub age_group: Option<String>,
    pub consent_given: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl From<DbUser> for User {
    fn from(db: DbUser) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            session_id: db.session_id.unwrap_or_default(),
            age_group: db.age_group,
            consent_given: db.consent_given.unwrap_or_default(),
            created_at: to_utc(db.created_at),
            updated_at: to_utc(db.updated_at),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct Assessment {
    pub id: i64,
    pub user_id: i64,
    pub assessment_type: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_duration: Option<i64>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbAssessment {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub assessment_type: Option<String>,
    pub status: Option<String>,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub total_duration: Option<i64>,
}

impl From<DbAssessment> for Assessment {
    fn from(db: DbAssessment) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            user_id: db.user_id.unwrap_or_default(),
            assessment_type: db.assessment_type.unwrap_or_default(),
            status: db.status.unwrap_or_default(),
            started_at: to_utc(db.started_at),
            completed_at: db
                .completed_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc)),
            total_duration: db.total_duration,
        }
    }
}

/// One gaze sample ready for insertion, after wire-field fallbacks have been
/// resolved.
#[derive(Debug, Clone, Default)]
pub struct GazeRecord {
    pub task_name: String,
    pub task_type: String,
    pub frame_number: i64,
    pub timestamp: f64,
    pub face_detected: bool,
    pub gaze_x: f64,
    pub gaze_y: f64,
    pub eye_contact_score: f64,
    pub fixation_duration: f64,
    pub saccade_amplitude: f64,
    pub social_attention_score: f64,
}

/// One questionnaire answer ready for insertion.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub question_id: String,
    pub question_text: String,
    pub response_value: f64,
    pub response_text: Option<String>,
    pub domain: Option<String>,
    pub weight: f64,
    pub is_critical_item: bool,
}

/// A result row to be written, with the JSON blob columns already serialized.
#[derive(Debug, Clone)]
pub struct NewAssessmentResult {
    pub questionnaire_scores: String,
    pub gaze_metrics: String,
    pub ml_prediction: String,
    pub risk_assessment: String,
    pub recommendations: String,
    pub overall_score: f64,
    pub risk_level: String,
    pub confidence_score: f64,
}

#[derive(Serialize, Debug, Clone)]
pub struct AssessmentResult {
    pub id: i64,
    pub assessment_id: i64,
    pub questionnaire_scores: serde_json::Value,
    pub gaze_metrics: serde_json::Value,
    pub ml_prediction: serde_json::Value,
    pub risk_assessment: serde_json::Value,
    pub recommendations: serde_json::Value,
    pub overall_score: f64,
    pub risk_level: String,
    pub confidence_score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbAssessmentResult {
    pub id: Option<i64>,
    pub assessment_id: Option<i64>,
    pub questionnaire_scores: Option<String>,
    pub gaze_metrics: Option<String>,
    pub ml_prediction: Option<String>,
    pub risk_assessment: Option<String>,
    pub recommendations: Option<String>,
    pub overall_score: Option<f64>,
    pub risk_level: Option<String>,
    pub confidence_score: Option<f64>,
    pub created_at: Option<NaiveDateTime>,
}

fn parse_blob(text: Option<String>) -> serde_json::Value {
    text.as_deref()
        .and_then(|t| serde_json::from_str(t).ok())
        .unwrap_or(serde_json::Value::Null)
}

impl From<DbAssessmentResult> for AssessmentResult {
    fn from(db: DbAssessmentResult) -> Self {
        Self {
            id: db.id.unwrap_or_default(),
            assessment_id: db.assessment_id.unwrap_or_default(),
            questionnaire_scores: parse_blob(db.questionnaire_scores),
            gaze_metrics: parse_blob(db.gaze_metrics),
            ml_prediction: parse_blob(db.ml_prediction),
            risk_assessment: parse_blob(db.risk_assessment),
            recommendations: parse_blob(db.recommendations),
            overall_score: db.overall_score.unwrap_or_default(),
            risk_level: db.risk_level.unwrap_or_default(),
            confidence_score: db.confidence_score.unwrap_or_default(),
            created_at: to_utc(db.created_at),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AssessmentStatistics {
    pub total_users: i64,
    pub total_assessments: i64,
    pub completed_assessments: i64,
    pub completion_rate: f64,
    pub risk_distribution: HashMap<String, i64>,
}
