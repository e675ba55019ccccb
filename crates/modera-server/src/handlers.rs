//! API route handlers.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::{debug, info, warn};

use modera_core::SafetyStatus;

use crate::error::{ApiError, Result};
use crate::models::{
    AnnotateRequest, AskRequest, AskResponse, BucketEntry, ContentStatusResponse,
    DashboardQuery, DashboardResponse, FinalizeRequest, HealthResponse, ReviewQueueQuery,
    ReviewQueueResponse, UnverifiedResponse, UpdateStatusRequest, UpdateStatusResponse,
    UploadResponse, VerifyResponse,
};
use crate::state::AppState;

/// POST /api/upload - Accept a media file and classify it.
///
/// Validation failures reject the upload with 400. Gateway failures do
/// not: the fail-open policy inside the workflow still persists the item
/// as safe, and the upload succeeds with 201.
pub async fn upload_content(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let mut file_name: Option<String> = None;
    let mut data: Option<axum::body::Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
            data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?,
            );
        }
    }

    let file_name =
        file_name.ok_or_else(|| ApiError::BadRequest("missing 'file' field".to_string()))?;
    let data = data.ok_or_else(|| ApiError::BadRequest("missing 'file' field".to_string()))?;

    let kind = modera_core::validate_upload(&file_name, data.len())?;

    debug!(
        file_name = %file_name,
        size = data.len(),
        kind = %kind,
        "upload accepted, storing media"
    );

    // Strip any client-supplied directory components
    let base_name = std::path::Path::new(&file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ApiError::BadRequest(format!("invalid file name: {file_name}")))?;
    let stored_name = format!("{}_{}", Utc::now().timestamp_millis(), base_name);

    tokio::fs::create_dir_all(&state.media_dir).await?;
    tokio::fs::write(state.media_dir.join(&stored_name), &data).await?;

    let content_id = state.db.create_content(stored_name, kind)?;

    // The gateway outcome is consumed as a value; classification applies
    // the fail-open policy on failure
    let gateway_result = state.gateway.analyze(&data, kind).await;
    if let Err(ref failure) = gateway_result {
        warn!(content_id, error = %failure, "classification gateway failed");
    }

    let outcome = state.workflow.classify(content_id, gateway_result)?;

    info!(
        content_id,
        status = %outcome.content.safety_status,
        "content uploaded and classified"
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            content_id,
            record_id: outcome.record.id,
            safety_status: outcome.content.safety_status,
            message: outcome.content.safety_status.display_message(),
            detected_tags: outcome.record.detected_tags,
        }),
    ))
}

/// GET /api/content/{id}/status - Current classification for an item.
pub async fn get_content_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ContentStatusResponse>> {
    let status = state.workflow.content_status(id)?;

    Ok(Json(ContentStatusResponse {
        content: status.content.into(),
        message: status.message,
        record: status.record.map(Into::into),
    }))
}

/// GET /api/moderator/dashboard - Content grouped per safety bucket.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>> {
    let filter = parse_status_filter(query.status.as_deref())?;
    let dashboard = state.workflow.dashboard(filter)?;

    let buckets = dashboard
        .buckets
        .into_iter()
        .map(|b| BucketEntry {
            status: b.status,
            count: b.count,
            items: b.items.into_iter().map(Into::into).collect(),
        })
        .collect();

    Ok(Json(DashboardResponse {
        buckets,
        counts: dashboard.counts,
        total: dashboard.total,
    }))
}

/// POST /api/content/{id}/update-status - Administrative status change.
///
/// Changes only the safety status; the review flag and moderator fields
/// stay as they are. Full review goes through finalize.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>> {
    let content = state.workflow.update_status_directly(id, &req.status)?;

    Ok(Json(UpdateStatusResponse {
        success: true,
        content: content.into(),
    }))
}

/// GET /api/moderator/review-queue - Content items needing review:
/// no record yet, or the record is not yet reviewed. Optional status filter.
pub async fn get_review_queue(
    State(state): State<AppState>,
    Query(query): Query<ReviewQueueQuery>,
) -> Result<Json<ReviewQueueResponse>> {
    let filter = parse_status_filter(query.status.as_deref())?;
    let items = state.workflow.needing_review(filter)?;

    Ok(Json(ReviewQueueResponse {
        total: items.len(),
        items: items.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/moderator/unverified - Records awaiting review, newest first.
pub async fn get_unverified(State(state): State<AppState>) -> Result<Json<UnverifiedResponse>> {
    let records = state.workflow.unverified_records()?;

    Ok(Json(UnverifiedResponse {
        total: records.len(),
        records: records.into_iter().map(Into::into).collect(),
    }))
}

/// POST /api/moderation/{id}/verify - Mark a record as reviewed.
pub async fn verify_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<VerifyResponse>> {
    let record = state.workflow.mark_verified(id)?;

    Ok(Json(VerifyResponse {
        success: true,
        record: record.into(),
    }))
}

/// POST /api/content/{id}/tags - Update the moderator annotation.
pub async fn annotate_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AnnotateRequest>,
) -> Result<Json<VerifyResponse>> {
    let record = state
        .workflow
        .update_annotation(id, &req.tags, req.verdict.as_deref())?;

    Ok(Json(VerifyResponse {
        success: true,
        record: record.into(),
    }))
}

/// POST /api/content/{id}/finalize - The authoritative moderator override.
pub async fn finalize_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<FinalizeRequest>,
) -> Result<Json<ContentStatusResponse>> {
    let status = state
        .workflow
        .finalize(id, &req.status, &req.tags, req.verdict.as_deref())?;

    Ok(Json(ContentStatusResponse {
        content: status.content.into(),
        message: status.message,
        record: status.record.map(Into::into),
    }))
}

/// POST /api/ask - Forward a text question to the chat model.
///
/// Pass-through with no fail-open: upstream failures surface as errors.
pub async fn ask_question(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>> {
    if req.text.trim().is_empty() || req.question.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "both 'text' and 'question' are required".to_string(),
        ));
    }

    let chat = state.chat.as_ref().ok_or(ApiError::ChatNotConfigured)?;

    let answer = chat
        .ask(&req.text, &req.question)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    Ok(Json(AskResponse { answer }))
}

/// GET /api/health - Liveness check with a storage round-trip.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let content_count = state.db.count_content()?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        content_count,
    }))
}

/// Parse an optional status filter string.
fn parse_status_filter(s: Option<&str>) -> Result<Option<SafetyStatus>> {
    match s {
        None => Ok(None),
        Some(s) => SafetyStatus::parse(s)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid status filter: {s}"))),
    }
}
