use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{Deserialize, Serialize, json::Json};
use serde_json::{Map, Value};
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;

use crate::db::{
    create_assessment, get_assessment_result, get_statistics, get_user_assessments,
    get_user_by_session, insert_gaze_batch, insert_response_batch, record_result, upsert_session,
};
use crate::error::AppError;
use crate::models::{
    Assessment, AssessmentResult, AssessmentStatistics, GazeRecord, NewAssessmentResult,
    ResponseRecord, User,
};
use crate::validation::{ValidateExt, ValidationResponse};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}

#[get("/health")]
pub fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserData {
    pub id: i64,
    pub session_id: String,
    pub age_group: Option<String>,
    pub consent_given: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            session_id: user.session_id,
            age_group: user.age_group,
            consent_given: user.consent_given,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: UserData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: Option<String>,
    pub age_group: Option<String>,
    pub consent_given: Option<bool>,
}

#[post("/session", data = "<request>")]
pub async fn api_upsert_session(
    request: Json<SessionRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SessionResponse>, Custom<Json<ValidationResponse>>> {
    let session_id = match request.session_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return Err(Custom(
                Status::BadRequest,
                Json(ValidationResponse::with_error(
                    "sessionId",
                    "sessionId is required",
                )),
            ));
        }
    };

    let user = upsert_session(
        db,
        &session_id,
        request.age_group.as_deref(),
        request.consent_given.unwrap_or(false),
    )
    .await
    .validate_custom()?;

    Ok(Json(SessionResponse {
        user: UserData::from(user),
    }))
}

#[get("/session/<session_id>")]
pub async fn api_get_session(
    session_id: &str,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SessionResponse>, Status> {
    let user = get_user_by_session(db, session_id).await?;

    Ok(Json(SessionResponse {
        user: UserData::from(user),
    }))
}

#[derive(Serialize, Deserialize)]
pub struct AssessmentData {
    pub id: i64,
    pub user_id: i64,
    pub assessment_type: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub total_duration: Option<i64>,
}

impl From<Assessment> for AssessmentData {
    fn from(assessment: Assessment) -> Self {
        Self {
            id: assessment.id,
            user_id: assessment.user_id,
            assessment_type: assessment.assessment_type,
            status: assessment.status,
            started_at: assessment.started_at.to_rfc3339(),
            completed_at: assessment.completed_at.map(|dt| dt.to_rfc3339()),
            total_duration: assessment.total_duration,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub assessment: AssessmentData,
}

#[derive(Serialize, Deserialize)]
pub struct AssessmentsResponse {
    pub assessments: Vec<AssessmentData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssessmentRequest {
    pub user_id: Option<i64>,
    pub assessment_type: Option<String>,
}

#[post("/assessments", data = "<request>")]
pub async fn api_create_assessment(
    request: Json<CreateAssessmentRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<AssessmentResponse>, Custom<Json<ValidationResponse>>> {
    let user_id = match request.user_id {
        Some(id) => id,
        None => {
            return Err(Custom(
                Status::BadRequest,
                Json(ValidationResponse::with_error(
                    "userId",
                    "userId is required",
                )),
            ));
        }
    };

    let assessment_type = match request.assessment_type.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => {
            return Err(Custom(
                Status::BadRequest,
                Json(ValidationResponse::with_error(
                    "assessmentType",
                    "assessmentType is required",
                )),
            ));
        }
    };

    let assessment = create_assessment(db, user_id, &assessment_type)
        .await
        .validate_custom()?;

    Ok(Json(AssessmentResponse {
        assessment: AssessmentData::from(assessment),
    }))
}

#[get("/users/<id>/assessments")]
pub async fn api_get_user_assessments(
    id: i64,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<AssessmentsResponse>, Status> {
    let assessments = get_user_assessments(db, id).await?;

    Ok(Json(AssessmentsResponse {
        assessments: assessments.into_iter().map(AssessmentData::from).collect(),
    }))
}

#[derive(Serialize, Deserialize)]
pub struct SavedCountResponse {
    pub saved: usize,
}

#[derive(Serialize, Deserialize)]
pub struct SavedResponse {
    pub saved: bool,
}

fn number_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| obj.get(*key)?.as_f64())
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Maps one wire object onto the gaze-sample schema. Browser clients send
/// per-frame fields; the aggregate-summary path sends `total_frames`,
/// `avg_gaze_x`, `face_detection_rate` and friends, so each column accepts
/// the summary name as a fallback.
fn map_gaze_record(obj: &Map<String, Value>, index: usize) -> GazeRecord {
    let face_detected = obj
        .get("face_detected")
        .and_then(Value::as_bool)
        .or_else(|| number_field(obj, &["face_detected_frames"]).map(|frames| frames > 0.0))
        .unwrap_or(false);

    GazeRecord {
        task_name: string_field(obj, "task_name"),
        task_type: string_field(obj, "task_type"),
        frame_number: number_field(obj, &["frame_number", "total_frames", "frame_count"])
            .map(|n| n as i64)
            .unwrap_or(index as i64),
        timestamp: number_field(obj, &["timestamp"]).unwrap_or(0.0),
        face_detected,
        gaze_x: number_field(obj, &["gaze_x", "avg_gaze_x"]).unwrap_or(0.0),
        gaze_y: number_field(obj, &["gaze_y", "avg_gaze_y"]).unwrap_or(0.0),
        eye_contact_score: number_field(obj, &["eye_contact_score", "face_detection_rate"])
            .unwrap_or(0.0),
        fixation_duration: number_field(obj, &["fixation_duration", "avg_fixation_duration"])
            .unwrap_or(0.0),
        saccade_amplitude: number_field(obj, &["saccade_amplitude", "gaze_velocity_std"])
            .unwrap_or(0.0),
        social_attention_score: number_field(
            obj,
            &[
                "social_attention_score",
                "social_attention_ratio",
                "face_preference_ratio",
            ],
        )
        .unwrap_or(0.0),
    }
}

/// Accepts a single object or an array of objects; anything else is a
/// validation failure before any row is written.
fn batch_objects(body: &Value) -> Result<Vec<&Map<String, Value>>, AppError> {
    match body {
        Value::Object(obj) => Ok(vec![obj]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_object().ok_or_else(|| {
                    AppError::Validation(
                        "Body must be an object or an array of objects".to_string(),
                    )
                })
            })
            .collect(),
        _ => Err(AppError::Validation(
            "Body must be an object or an array of objects".to_string(),
        )),
    }
}

#[post("/assessments/<id>/gaze", data = "<body>")]
pub async fn api_record_gaze_data(
    id: i64,
    body: Json<Value>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SavedCountResponse>, Custom<Json<ValidationResponse>>> {
    let records: Vec<GazeRecord> = batch_objects(&body)
        .validate_custom()?
        .into_iter()
        .enumerate()
        .map(|(index, obj)| map_gaze_record(obj, index))
        .collect();

    let saved = insert_gaze_batch(db, id, &records).await.validate_custom()?;

    Ok(Json(SavedCountResponse { saved }))
}

fn map_response_record(obj: &Map<String, Value>) -> ResponseRecord {
    ResponseRecord {
        question_id: string_field(obj, "question_id"),
        question_text: string_field(obj, "question_text"),
        response_value: number_field(obj, &["response_value"]).unwrap_or(0.0),
        response_text: obj
            .get("response_text")
            .and_then(Value::as_str)
            .map(String::from),
        domain: obj.get("domain").and_then(Value::as_str).map(String::from),
        weight: number_field(obj, &["weight"]).unwrap_or(1.0),
        is_critical_item: obj
            .get("is_critical_item")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

#[post("/assessments/<id>/responses", data = "<body>")]
pub async fn api_record_responses(
    id: i64,
    body: Json<Value>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SavedCountResponse>, Custom<Json<ValidationResponse>>> {
    let records: Vec<ResponseRecord> = batch_objects(&body)
        .validate_custom()?
        .into_iter()
        .map(map_response_record)
        .collect();

    let saved = insert_response_batch(db, id, &records)
        .await
        .validate_custom()?;

    Ok(Json(SavedCountResponse { saved }))
}

#[derive(Deserialize)]
pub struct ResultsRequest {
    pub overall_scores: Option<HashMap<String, Value>>,
    pub behavioral_patterns: Option<Value>,
    pub meta: Option<Value>,
    pub risk_indicators: Option<Value>,
    pub recommendations: Option<Value>,
}

fn serialize_blob(value: Value) -> Result<String, AppError> {
    serde_json::to_string(&value)
        .map_err(|e| AppError::Internal(format!("Failed to serialize result payload: {}", e)))
}

#[post("/assessments/<id>/results", data = "<request>")]
pub async fn api_record_results(
    id: i64,
    request: Json<ResultsRequest>,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<SavedResponse>, Custom<Json<ValidationResponse>>> {
    let request = request.into_inner();

    // A map with any non-numeric value cannot be averaged and scores 0.
    let overall_score = match &request.overall_scores {
        Some(scores) if !scores.is_empty() => {
            let values: Vec<f64> = scores.values().filter_map(Value::as_f64).collect();
            if values.len() == scores.len() {
                values.iter().sum::<f64>() / values.len() as f64
            } else {
                0.0
            }
        }
        _ => 0.0,
    };

    let meta = request.meta.unwrap_or_else(|| Value::Object(Map::new()));
    let risk_level = meta
        .get("overall_risk_level")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let confidence_score = meta
        .get("confidence_level")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    // The questionnaire domain scores travel in overall_scores and
    // behavioral_patterns; questionnaire_scores is stored as an empty object,
    // as the analysis app writes it.
    let result = NewAssessmentResult {
        questionnaire_scores: "{}".to_string(),
        gaze_metrics: serialize_blob(
            request
                .behavioral_patterns
                .unwrap_or_else(|| Value::Object(Map::new())),
        )
        .validate_custom()?,
        ml_prediction: serialize_blob(meta).validate_custom()?,
        risk_assessment: serialize_blob(
            request
                .risk_indicators
                .unwrap_or_else(|| Value::Object(Map::new())),
        )
        .validate_custom()?,
        recommendations: serialize_blob(
            request
                .recommendations
                .unwrap_or_else(|| Value::Array(Vec::new())),
        )
        .validate_custom()?,
        overall_score,
        risk_level,
        confidence_score,
    };

    record_result(db, id, &result).await.validate_custom()?;

    Ok(Json(SavedResponse { saved: true }))
}

#[derive(Serialize, Deserialize)]
pub struct ResultData {
    pub id: i64,
    pub assessment_id: i64,
    pub questionnaire_scores: Value,
    pub gaze_metrics: Value,
    pub ml_prediction: Value,
    pub risk_assessment: Value,
    pub recommendations: Value,
    pub overall_score: f64,
    pub risk_level: String,
    pub confidence_score: f64,
    pub created_at: String,
}

impl From<AssessmentResult> for ResultData {
    fn from(result: AssessmentResult) -> Self {
        Self {
            id: result.id,
            assessment_id: result.assessment_id,
            questionnaire_scores: result.questionnaire_scores,
            gaze_metrics: result.gaze_metrics,
            ml_prediction: result.ml_prediction,
            risk_assessment: result.risk_assessment,
            recommendations: result.recommendations,
            overall_score: result.overall_score,
            risk_level: result.risk_level,
            confidence_score: result.confidence_score,
            created_at: result.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct ResultResponse {
    pub result: ResultData,
}

#[get("/assessments/<id>/results")]
pub async fn api_get_results(
    id: i64,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ResultResponse>, Status> {
    let result = get_assessment_result(db, id).await?;

    Ok(Json(ResultResponse {
        result: ResultData::from(result),
    }))
}

#[get("/admin/stats")]
pub async fn api_admin_stats(
    db: &State<Pool<Sqlite>>,
) -> Result<Json<AssessmentStatistics>, Status> {
    let stats = get_statistics(db).await?;
    Ok(Json(stats))
}
