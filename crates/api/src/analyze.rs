//! Comment analysis endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use tubesense_analysis::{ModelInfo, SentimentAnalyzer};
use tubesense_core::{AnalysisReport, Comment, ScoredComment, VideoSummary};

use crate::database::{AnalysisRecord, AnalysisSummary, NewAnalysis, Repository};
use crate::youtube::{extract_video_id, ApiStatus, CommentSource};
use crate::{ApiError, ApiResult};

const DEFAULT_SEARCH_RESULTS: u32 = 10;
const DEFAULT_CHANNEL_RESULTS: u32 = 50;
const MAX_QUERY_RESULTS: u32 = 50;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Analysis persistence.
    pub repo: Repository,
    /// Sentiment model.
    pub analyzer: Arc<SentimentAnalyzer>,
    /// Video and comment provider.
    pub comments: Arc<dyn CommentSource>,
    /// Comments fetched per analysis.
    pub max_comments: u32,
}

/// Analysis API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze_video))
        .route("/analysis/:id", get(get_analysis).delete(delete_analysis))
        .route("/analyses", get(list_analyses))
        .route("/search", get(search_videos))
        .route("/channels/:channel_id/comments", get(channel_comments))
        .route("/status", get(status))
        .with_state(state)
}

// ==================== Request/Response Types ====================

#[derive(Debug, Deserialize)]
struct AnalyzeForm {
    video_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChannelParams {
    max_results: Option<u32>,
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    deleted: bool,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    youtube: ApiStatus,
    model: ModelInfo,
}

// ==================== Handler Implementations ====================

/// Classify comments on a blocking thread; the model is CPU bound.
async fn score_comments(
    analyzer: Arc<SentimentAnalyzer>,
    comments: Vec<Comment>,
) -> ApiResult<Vec<ScoredComment>> {
    tokio::task::spawn_blocking(move || -> ApiResult<Vec<ScoredComment>> {
        let sentiments = analyzer.analyze_batch(
            &comments.iter().map(|c| c.text.as_str()).collect::<Vec<_>>(),
        )?;
        Ok(comments
            .iter()
            .zip(sentiments)
            .map(|(comment, sentiment)| ScoredComment::new(comment, sentiment))
            .collect())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("classification task failed: {}", e)))?
}

#[instrument(skip(state))]
async fn analyze_video(
    State(state): State<AppState>,
    Form(form): Form<AnalyzeForm>,
) -> ApiResult<Json<AnalysisReport>> {
    let video_id = extract_video_id(&form.video_url)
        .ok_or_else(|| ApiError::InvalidRequest("Invalid YouTube URL".to_string()))?;
    if !state.analyzer.is_loaded() {
        return Err(ApiError::ModelNotLoaded);
    }

    let video_info = state.comments.video_info(&video_id).await?;
    let comments = state
        .comments
        .video_comments(&video_id, state.max_comments)
        .await?;
    if comments.is_empty() {
        return Err(ApiError::NotFound(
            "No comments found for this video".to_string(),
        ));
    }

    let scored = score_comments(state.analyzer.clone(), comments).await?;
    let mut report = AnalysisReport::build(video_info, scored);

    let id = state
        .repo
        .save_analysis(&NewAnalysis {
            video_id: video_id.clone(),
            video_title: report.video_info.title.clone(),
            total_comments: report.statistics.total_comments as i64,
            positive_count: report.statistics.positive_count as i64,
            negative_count: report.statistics.negative_count as i64,
            results: serde_json::to_value(&report)?,
        })
        .await?;
    report.analysis_id = Some(id);

    info!(
        "Analysis {} for video {}: {} positive, {} negative",
        id, video_id, report.statistics.positive_count, report.statistics.negative_count
    );
    Ok(Json(report))
}

#[instrument(skip(state))]
async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<AnalysisRecord>> {
    state
        .repo
        .get_analysis(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Analysis not found".to_string()))
}

#[instrument(skip(state))]
async fn list_analyses(State(state): State<AppState>) -> ApiResult<Json<Vec<AnalysisSummary>>> {
    Ok(Json(state.repo.list_analyses().await?))
}

#[instrument(skip(state))]
async fn delete_analysis(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    if state.repo.delete_analysis(id).await? {
        Ok(Json(DeleteResponse { deleted: true }))
    } else {
        Err(ApiError::NotFound("Analysis not found".to_string()))
    }
}

#[instrument(skip(state))]
async fn search_videos(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<VideoSummary>>> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(ApiError::InvalidRequest(
            "Search query must not be empty".to_string(),
        ));
    }
    let max = params
        .max_results
        .unwrap_or(DEFAULT_SEARCH_RESULTS)
        .clamp(1, MAX_QUERY_RESULTS);
    Ok(Json(state.comments.search_videos(query, max).await?))
}

#[instrument(skip(state))]
async fn channel_comments(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Query(params): Query<ChannelParams>,
) -> ApiResult<Json<Vec<ScoredComment>>> {
    if !state.analyzer.is_loaded() {
        return Err(ApiError::ModelNotLoaded);
    }
    let max = params
        .max_results
        .unwrap_or(DEFAULT_CHANNEL_RESULTS)
        .clamp(1, state.max_comments.max(1));
    let comments = state.comments.channel_comments(&channel_id, max).await?;
    Ok(Json(score_comments(state.analyzer.clone(), comments).await?))
}

#[instrument(skip(state))]
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        youtube: state.comments.api_status().await,
        model: state.analyzer.model_info(),
    })
}
