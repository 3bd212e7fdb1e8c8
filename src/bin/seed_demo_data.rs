use anyhow::Result;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde_json::json;
use uuid::Uuid;

use screening_api::models::{GazeRecord, NewAssessmentResult};
use screening_api::{db, env, schema};

const AGE_GROUPS: &[&str] = &["18-24 months", "2-5 years", "school age", "adult"];
const ASSESSMENT_TYPES: &[&str] = &["questionnaire", "gaze", "combined"];
const RISK_LEVELS: &[&str] = &["low", "moderate", "elevated"];

#[tokio::main]
async fn main() -> Result<()> {
    let sessions: usize = std::env::var("SEED_SESSIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8);

    let database_url = env::database_url()?;
    let pool = db::connect(&database_url).await?;
    schema::ensure_schema(&pool).await?;

    let mut rng = rand::rng();
    let mut assessments_created = 0;
    let mut gaze_rows = 0;
    let mut results_written = 0;

    for _ in 0..sessions {
        let session_id = format!("demo-{}", Uuid::new_v4());
        let age_group = AGE_GROUPS.choose(&mut rng).copied();

        let user = db::upsert_session(&pool, &session_id, age_group, true).await?;

        let assessment_type = ASSESSMENT_TYPES.choose(&mut rng).copied().unwrap_or("gaze");
        let assessment = db::create_assessment(&pool, user.id, assessment_type).await?;
        assessments_created += 1;

        let batch = simulated_gaze_batch(&mut rng);
        gaze_rows += db::insert_gaze_batch(&pool, assessment.id, &batch).await?;

        // Roughly two thirds of demo assessments run to completion.
        if rng.random_range(0..3) < 2 {
            let result = simulated_result(&mut rng);
            db::record_result(&pool, assessment.id, &result).await?;
            results_written += 1;
        }
    }

    println!("Seeded {} demo sessions:", sessions);
    println!("    Assessments created: {}", assessments_created);
    println!("    Gaze rows inserted:  {}", gaze_rows);
    println!("    Results written:     {}", results_written);

    Ok(())
}

/// One aggregate summary row per task, with the value ranges the demo
/// simulator produces for each stimulus type.
fn simulated_gaze_batch(rng: &mut impl Rng) -> Vec<GazeRecord> {
    vec![
        GazeRecord {
            task_name: "face_recognition".to_string(),
            task_type: "gaze_tracking".to_string(),
            frame_number: rng.random_range(800..=1200),
            timestamp: rng.random_range(25.0..35.0),
            face_detected: true,
            gaze_x: rng.random_range(150.0..650.0),
            gaze_y: rng.random_range(150.0..450.0),
            eye_contact_score: rng.random_range(0.85..0.95),
            fixation_duration: rng.random_range(0.2..0.4),
            saccade_amplitude: rng.random_range(20.0..60.0),
            social_attention_score: rng.random_range(0.55..0.75),
        },
        GazeRecord {
            task_name: "social_attention".to_string(),
            task_type: "gaze_tracking".to_string(),
            frame_number: rng.random_range(300..=500),
            timestamp: rng.random_range(25.0..35.0),
            face_detected: true,
            gaze_x: rng.random_range(150.0..650.0),
            gaze_y: rng.random_range(150.0..450.0),
            eye_contact_score: rng.random_range(0.8..0.95),
            fixation_duration: rng.random_range(0.2..0.4),
            saccade_amplitude: rng.random_range(20.0..60.0),
            social_attention_score: rng.random_range(0.65..0.82),
        },
        GazeRecord {
            task_name: "visual_pattern".to_string(),
            task_type: "gaze_tracking".to_string(),
            frame_number: rng.random_range(200..=350),
            timestamp: rng.random_range(25.0..35.0),
            face_detected: true,
            gaze_x: rng.random_range(150.0..650.0),
            gaze_y: rng.random_range(150.0..450.0),
            eye_contact_score: rng.random_range(0.8..0.95),
            fixation_duration: rng.random_range(0.2..0.4),
            saccade_amplitude: rng.random_range(20.0..60.0),
            social_attention_score: rng.random_range(0.7..0.9),
        },
        GazeRecord {
            task_name: "motion_tracking".to_string(),
            task_type: "gaze_tracking".to_string(),
            frame_number: rng.random_range(250..=400),
            timestamp: rng.random_range(25.0..35.0),
            face_detected: true,
            gaze_x: rng.random_range(150.0..650.0),
            gaze_y: rng.random_range(150.0..450.0),
            eye_contact_score: rng.random_range(0.6..0.85),
            fixation_duration: rng.random_range(0.2..0.4),
            saccade_amplitude: rng.random_range(200.0..400.0),
            social_attention_score: rng.random_range(0.5..0.8),
        },
    ]
}

fn simulated_result(rng: &mut impl Rng) -> NewAssessmentResult {
    let risk_level = RISK_LEVELS.choose(rng).copied().unwrap_or("low");
    let social = rng.random_range(40.0..90.0);
    let communication = rng.random_range(40.0..90.0);
    let behavior = rng.random_range(40.0..90.0);
    let overall_score = (social + communication + behavior) / 3.0;
    let confidence = rng.random_range(0.6..0.9);

    NewAssessmentResult {
        questionnaire_scores: "{}".to_string(),
        gaze_metrics: json!({
            "face_preference_ratio": rng.random_range(0.55..0.75),
            "social_attention_ratio": rng.random_range(0.65..0.82),
            "tracking_accuracy": rng.random_range(0.6..0.85),
        })
        .to_string(),
        ml_prediction: json!({
            "overall_risk_level": risk_level,
            "confidence_level": confidence,
        })
        .to_string(),
        risk_assessment: json!({
            "social_communication": social,
            "autism_traits": behavior,
        })
        .to_string(),
        recommendations: json!([
            "This is a demonstration result, not a clinical finding.",
            "Discuss any concerns with a qualified professional.",
        ])
        .to_string(),
        overall_score,
        risk_level: risk_level.to_string(),
        confidence_score: confidence,
    }
}
