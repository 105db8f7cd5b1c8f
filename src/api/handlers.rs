use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, rejection::QueryRejection,
        ConnectInfo, Multipart, Query, State,
    },
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{round2, AnalysisRecord, NewAnalysis},
    ml::PredictionOutcome,
    text::{decode_email_bytes, preview},
};

use super::{
    client::{client_ip, user_agent},
    error::ApiError,
    export::{render_csv, CSV_FILENAME},
    AppState,
};

const EMAIL_MIN_CHARS: usize = 10;
const EMAIL_MAX_CHARS: usize = 50_000;
const HISTORY_DEFAULT_LIMIT: i64 = 10;
const HISTORY_MAX_LIMIT: i64 = 50;
const EXPORT_DEFAULT_LIMIT: i64 = 100;
const EXPORT_MAX_LIMIT: i64 = 1000;
const HISTORY_PREVIEW_CHARS: usize = 100;

type SharedState = State<Arc<AppState>>;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Numbers are accepted and read as their text form.
    pub email_text: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
    pub model_loaded: bool,
}

#[derive(Debug, Serialize)]
pub struct FilePredictionResponse {
    #[serde(flatten)]
    pub outcome: PredictionOutcome,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub total_analyses: i64,
    pub spam_count: i64,
    pub ham_count: i64,
    pub spam_percentage: f64,
    pub ham_percentage: f64,
    pub avg_confidence: f64,
    pub avg_latency: f64,
    pub last_24h: WindowResponse,
}

#[derive(Debug, Serialize)]
pub struct WindowResponse {
    pub total: i64,
    pub spam: i64,
    pub ham: i64,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub prediction: &'static str,
    pub confidence: f64,
    pub latency: f64,
    pub created_at: String,
    pub email_preview: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub results: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ExportEntry {
    pub id: i64,
    pub prediction: &'static str,
    pub confidence: f64,
    pub latency: f64,
    pub created_at: String,
    pub email_content: String,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub format: &'static str,
    pub count: usize,
    pub exported_at: String,
    pub data: Vec<ExportEntry>,
}

/// GET /api/health/ and GET /api/analyze/
pub async fn health(State(state): SharedState) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "online",
        message: "Spam Detector API is running",
        version: env!("CARGO_PKG_VERSION"),
        model_loaded: state.detector.is_loaded(),
    })
}

/// POST /api/analyze/ - classify the `email_text` of a JSON body
pub async fn analyze(
    State(state): SharedState,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<PredictionOutcome>, ApiError> {
    let Json(request) = payload.map_err(json_rejection)?;
    let email_text = email_text_field(request.email_text)?;
    let email_text = validate_email_text(email_text.as_deref())?;

    let outcome = state.detector.predict(email_text);
    record_outcome(&state, email_text, &outcome, &headers, peer.map(|c| c.0)).await;
    Ok(Json(outcome))
}

/// POST /api/analyze-file/ - classify an uploaded raw email (multipart field `file`)
pub async fn analyze_file(
    State(state): SharedState,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<FilePredictionResponse>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| ApiError::Rejected {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;

    let mut upload = None;
    loop {
        let field = multipart.next_field().await.map_err(|err| ApiError::Rejected {
            status: err.status(),
            message: err.body_text(),
        })?;
        let Some(field) = field else { break };
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(|err| ApiError::Rejected {
            status: err.status(),
            message: err.body_text(),
        })?;
        upload = Some((filename, bytes));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return Err(ApiError::validation("file", "The file is required."));
    };
    if bytes.is_empty() {
        return Err(ApiError::validation("file", "The submitted file is empty."));
    }

    let content = decode_email_bytes(&bytes);
    let outcome = state.detector.predict(&content);
    tracing::info!(
        target: "api",
        filename = %filename,
        bytes = bytes.len(),
        prediction = ?outcome.prediction,
        "file analyzed"
    );
    record_outcome(&state, &content, &outcome, &headers, peer.map(|c| c.0)).await;

    Ok(Json(FilePredictionResponse { outcome, filename }))
}

/// GET /api/statistics/
pub async fn statistics(State(state): SharedState) -> Result<Json<StatisticsResponse>, ApiError> {
    let stats = state
        .repository
        .statistics(Utc::now())
        .await
        .map_err(|err| {
            tracing::error!(target: "api", error = %err, "failed to compute statistics");
            ApiError::Internal("Failed to compute statistics")
        })?;

    Ok(Json(StatisticsResponse {
        total_analyses: stats.total,
        spam_count: stats.spam,
        ham_count: stats.ham,
        spam_percentage: stats.spam_percentage(),
        ham_percentage: stats.ham_percentage(),
        avg_confidence: stats.avg_confidence.map_or(0.0, |c| round2(c * 100.0)),
        avg_latency: stats.avg_latency_ms.map_or(0.0, round2),
        last_24h: WindowResponse {
            total: stats.last_24h.total,
            spam: stats.last_24h.spam,
            ham: stats.last_24h.ham,
        },
    }))
}

/// GET /api/history/?limit=N
pub async fn history(
    State(state): SharedState,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Query(params) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let limit = params
        .limit
        .unwrap_or(HISTORY_DEFAULT_LIMIT)
        .clamp(0, HISTORY_MAX_LIMIT);

    let records = load_recent(&state, limit).await?;
    let results: Vec<HistoryEntry> = records
        .iter()
        .map(|record| HistoryEntry {
            id: record.id,
            prediction: record.prediction.as_str(),
            confidence: record.confidence_percentage(),
            latency: round2(record.latency_ms),
            created_at: iso_timestamp(record),
            email_preview: preview(&record.email_content, HISTORY_PREVIEW_CHARS),
        })
        .collect();

    Ok(Json(HistoryResponse {
        count: results.len(),
        results,
    }))
}

/// GET /api/export/?format=json|csv&limit=N
pub async fn export(
    State(state): SharedState,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let limit = params
        .limit
        .unwrap_or(EXPORT_DEFAULT_LIMIT)
        .clamp(0, EXPORT_MAX_LIMIT);
    let records = load_recent(&state, limit).await?;

    let wants_csv = params
        .format
        .as_deref()
        .is_some_and(|f| f.eq_ignore_ascii_case("csv"));
    if wants_csv {
        let body = render_csv(&records, state.timezone);
        let headers = [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{CSV_FILENAME}\""),
            ),
        ];
        return Ok((headers, body).into_response());
    }

    let data: Vec<ExportEntry> = records
        .into_iter()
        .map(|record| ExportEntry {
            id: record.id,
            prediction: record.prediction.as_str(),
            confidence: record.confidence_percentage(),
            latency: round2(record.latency_ms),
            created_at: iso_timestamp(&record),
            email_content: record.email_content,
        })
        .collect();

    Ok(Json(ExportResponse {
        format: "json",
        count: data.len(),
        exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
        data,
    })
    .into_response())
}

/// Every malformed body is a 400. A body that parses but is not an object
/// is reported against `email_text`.
fn json_rejection(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::JsonDataError(_) => ApiError::validation(
            "email_text",
            "Invalid data. Expected an object with an email_text field.",
        ),
        other => ApiError::bad_request(other.body_text()),
    }
}

fn email_text_field(value: Option<Value>) -> Result<Option<String>, ApiError> {
    match value {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(Value::Null) => Err(ApiError::validation(
            "email_text",
            "The email_text field may not be null.",
        )),
        Some(_) => Err(ApiError::validation("email_text", "Not a valid string.")),
    }
}

/// Trims and checks the submitted text; returns the trimmed slice.
fn validate_email_text(email_text: Option<&str>) -> Result<&str, ApiError> {
    let Some(text) = email_text else {
        return Err(ApiError::validation(
            "email_text",
            "The email_text field is required.",
        ));
    };
    let text = text.trim();
    let chars = text.chars().count();
    if chars == 0 {
        return Err(ApiError::validation(
            "email_text",
            "The email_text field may not be blank.",
        ));
    }
    if chars < EMAIL_MIN_CHARS {
        return Err(ApiError::validation(
            "email_text",
            "The email must be at least 10 characters long.",
        ));
    }
    if chars > EMAIL_MAX_CHARS {
        return Err(ApiError::validation(
            "email_text",
            "The email is too long (maximum 50,000 characters).",
        ));
    }
    Ok(text)
}

/// Stores spam/ham outcomes. Storage failures are logged and swallowed so
/// the caller still gets its prediction.
async fn record_outcome(
    state: &AppState,
    email_text: &str,
    outcome: &PredictionOutcome,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) {
    let Some(label) = outcome.prediction.label() else {
        return;
    };
    let entry = NewAnalysis::new(
        email_text,
        label,
        outcome.confidence / 100.0,
        outcome.latency,
        client_ip(headers, peer),
        user_agent(headers),
    );
    match state.repository.insert(entry).await {
        Ok(id) => tracing::debug!(target: "db", id, prediction = %label, "analysis stored"),
        Err(err) => tracing::warn!(target: "db", error = %err, "failed to store analysis"),
    }
}

async fn load_recent(state: &AppState, limit: i64) -> Result<Vec<AnalysisRecord>, ApiError> {
    state.repository.recent(limit).await.map_err(|err| {
        tracing::error!(target: "api", error = %err, "failed to load analyses");
        ApiError::Internal("Failed to load analyses")
    })
}

fn iso_timestamp(record: &AnalysisRecord) -> String {
    record
        .created_at
        .to_rfc3339_opts(SecondsFormat::Micros, false)
}
