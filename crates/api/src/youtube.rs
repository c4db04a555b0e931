//! YouTube Data API v3 client.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use tubesense_analysis::nlp::clean_html;
use tubesense_core::config::YouTubeConfig;
use tubesense_core::constants::YOUTUBE_MAX_PAGE_SIZE;
use tubesense_core::{Comment, VideoInfo, VideoSummary};

/// Video used to probe API availability.
const STATUS_PROBE_VIDEO: &str = "dQw4w9WgXcQ";

/// Errors returned by the YouTube Data API.
#[derive(Error, Debug)]
pub enum YouTubeError {
    /// No API key configured.
    #[error("YouTube API not initialized")]
    NotConfigured,

    /// Daily or per-request quota exhausted.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The video owner disabled comments.
    #[error("Comments are disabled for this video: {0}")]
    CommentsDisabled(String),

    /// Unknown video.
    #[error("Video not found: {0}")]
    VideoNotFound(String),

    /// Any other API error response.
    #[error("YouTube API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the error body.
        message: String,
    },

    /// Network or decoding failure.
    #[error("YouTube request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for YouTubeError {
    fn from(error: reqwest::Error) -> Self {
        YouTubeError::Transport(error.to_string())
    }
}

/// Result of probing the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiStatus {
    /// Human-readable status.
    pub status: String,
    /// Whether a key is configured.
    pub api_key_set: bool,
    /// Whether requests currently succeed.
    pub quota_available: bool,
}

/// Source of videos and comments for analysis.
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// Metadata for one video.
    async fn video_info(&self, video_id: &str) -> Result<VideoInfo, YouTubeError>;

    /// Up to `max` top-level comments of a video, most relevant first.
    async fn video_comments(&self, video_id: &str, max: u32) -> Result<Vec<Comment>, YouTubeError>;

    /// Up to `max` recent comments across a channel's videos.
    async fn channel_comments(&self, channel_id: &str, max: u32)
        -> Result<Vec<Comment>, YouTubeError>;

    /// Search videos by keyword.
    async fn search_videos(&self, query: &str, max: u32) -> Result<Vec<VideoSummary>, YouTubeError>;

    /// Probe the API.
    async fn api_status(&self) -> ApiStatus;
}

// ==================== Wire types ====================

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
    channel_title: Option<String>,
    published_at: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ThreadItem {
    id: String,
    snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    video_id: Option<String>,
    top_level_comment: TopLevelComment,
    #[serde(default)]
    total_reply_count: u64,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    text_display: String,
    author_display_name: Option<String>,
    #[serde(default)]
    author_channel_url: String,
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    published_at: String,
    #[serde(default)]
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

// ==================== Client ====================

/// HTTP client for the YouTube Data API v3.
#[derive(Clone)]
pub struct YouTubeClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl YouTubeClient {
    /// Build a client from configuration. A missing key is allowed.
    pub fn new(config: &YouTubeConfig) -> Result<Self, YouTubeError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;
        let api_key = config
            .api_key
            .as_ref()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        if api_key.is_some() {
            info!("YouTube API client initialized");
        } else {
            warn!("YOUTUBE_API_KEY not set; YouTube requests will fail");
        }
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Whether an API key is configured.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, YouTubeError> {
        let key = self.api_key.as_deref().ok_or(YouTubeError::NotConfigured)?;
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {} {:?}", url, params);

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", key)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }
        Ok(response.json::<T>().await?)
    }

    /// Fetch video metadata.
    pub async fn get_video_info(&self, video_id: &str) -> Result<VideoInfo, YouTubeError> {
        let response: ListResponse<VideoItem> = self
            .get(
                "videos",
                &[
                    ("part", "snippet,statistics".to_string()),
                    ("id", video_id.to_string()),
                ],
            )
            .await?;
        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| YouTubeError::VideoNotFound(video_id.to_string()))?;

        let snippet = item.snippet;
        let stats = item.statistics;
        Ok(VideoInfo {
            id: video_id.to_string(),
            title: snippet.title.unwrap_or_else(|| "Unknown Title".to_string()),
            description: truncate_with_ellipsis(snippet.description.as_deref().unwrap_or(""), 200),
            channel_title: snippet
                .channel_title
                .unwrap_or_else(|| "Unknown Channel".to_string()),
            published_at: snippet
                .published_at
                .unwrap_or_else(|| "Unknown Date".to_string()),
            view_count: parse_count(stats.view_count.as_deref()),
            like_count: parse_count(stats.like_count.as_deref()),
            comment_count: parse_count(stats.comment_count.as_deref()),
            thumbnail: snippet.thumbnails.medium.map(|t| t.url).unwrap_or_default(),
            tags: snippet.tags.into_iter().take(5).collect(),
        })
    }

    /// Fetch up to `max` top-level comments of a video.
    pub async fn get_video_comments(
        &self,
        video_id: &str,
        max: u32,
    ) -> Result<Vec<Comment>, YouTubeError> {
        let comments = self
            .fetch_threads(("videoId", video_id), "relevance", max, false)
            .await?;
        info!("Fetched {} comments from video {}", comments.len(), video_id);
        Ok(comments)
    }

    /// Fetch up to `max` recent comments from a channel.
    pub async fn get_channel_comments(
        &self,
        channel_id: &str,
        max: u32,
    ) -> Result<Vec<Comment>, YouTubeError> {
        self.fetch_threads(("allThreadsRelatedToChannelId", channel_id), "time", max, true)
            .await
    }

    async fn fetch_threads(
        &self,
        filter: (&str, &str),
        order: &str,
        max: u32,
        keep_video_id: bool,
    ) -> Result<Vec<Comment>, YouTubeError> {
        let max = max as usize;
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;

        while comments.len() < max {
            let page_size = (max - comments.len()).min(YOUTUBE_MAX_PAGE_SIZE as usize);
            let mut params = vec![
                ("part", "snippet".to_string()),
                (filter.0, filter.1.to_string()),
                ("maxResults", page_size.to_string()),
                ("order", order.to_string()),
            ];
            if let Some(token) = page_token.take() {
                params.push(("pageToken", token));
            }

            let page: ListResponse<ThreadItem> = self.get("commentThreads", &params).await?;
            for item in page.items {
                let comment = thread_to_comment(item, keep_video_id);
                if comment.text.trim().is_empty() {
                    continue;
                }
                comments.push(comment);
                if comments.len() >= max {
                    break;
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(comments)
    }

    /// Search videos by keyword.
    pub async fn search_videos(
        &self,
        query: &str,
        max: u32,
    ) -> Result<Vec<VideoSummary>, YouTubeError> {
        let response: ListResponse<SearchItem> = self
            .get(
                "search",
                &[
                    ("part", "snippet".to_string()),
                    ("q", query.to_string()),
                    ("type", "video".to_string()),
                    ("maxResults", max.to_string()),
                    ("order", "relevance".to_string()),
                ],
            )
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.video_id?;
                let snippet = item.snippet;
                Some(VideoSummary {
                    id,
                    title: snippet.title.unwrap_or_else(|| "Unknown Title".to_string()),
                    description: truncate_with_ellipsis(
                        snippet.description.as_deref().unwrap_or(""),
                        100,
                    ),
                    channel_title: snippet
                        .channel_title
                        .unwrap_or_else(|| "Unknown Channel".to_string()),
                    published_at: snippet
                        .published_at
                        .unwrap_or_else(|| "Unknown Date".to_string()),
                    thumbnail: snippet.thumbnails.medium.map(|t| t.url).unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Probe the API with a lightweight video lookup.
    pub async fn get_api_status(&self) -> ApiStatus {
        let api_key_set = self.is_configured();
        let probe: Result<ListResponse<serde_json::Value>, _> = self
            .get(
                "videos",
                &[
                    ("part", "snippet".to_string()),
                    ("id", STATUS_PROBE_VIDEO.to_string()),
                ],
            )
            .await;
        let (status, quota_available) = match probe {
            Ok(_) => ("API working".to_string(), true),
            Err(YouTubeError::NotConfigured) => ("API not initialized".to_string(), false),
            Err(YouTubeError::QuotaExceeded(_)) => ("Quota exceeded".to_string(), false),
            Err(e) => (format!("API error: {}", e), false),
        };
        ApiStatus {
            status,
            api_key_set,
            quota_available,
        }
    }
}

#[async_trait]
impl CommentSource for YouTubeClient {
    async fn video_info(&self, video_id: &str) -> Result<VideoInfo, YouTubeError> {
        self.get_video_info(video_id).await
    }

    async fn video_comments(&self, video_id: &str, max: u32) -> Result<Vec<Comment>, YouTubeError> {
        self.get_video_comments(video_id, max).await
    }

    async fn channel_comments(
        &self,
        channel_id: &str,
        max: u32,
    ) -> Result<Vec<Comment>, YouTubeError> {
        self.get_channel_comments(channel_id, max).await
    }

    async fn search_videos(&self, query: &str, max: u32) -> Result<Vec<VideoSummary>, YouTubeError> {
        YouTubeClient::search_videos(self, query, max).await
    }

    async fn api_status(&self) -> ApiStatus {
        self.get_api_status().await
    }
}

fn thread_to_comment(item: ThreadItem, keep_video_id: bool) -> Comment {
    let snippet = item.snippet.top_level_comment.snippet;
    Comment {
        id: item.id,
        text: clean_html(&snippet.text_display),
        author: snippet
            .author_display_name
            .unwrap_or_else(|| "Anonymous".to_string()),
        author_channel: snippet.author_channel_url,
        likes: snippet.like_count,
        published_at: snippet.published_at,
        updated_at: snippet.updated_at,
        total_reply_count: item.snippet.total_reply_count,
        video_id: if keep_video_id {
            Some(item.snippet.video_id.unwrap_or_default())
        } else {
            None
        },
    }
}

/// Map an error response to a typed error.
fn classify_error(status: StatusCode, body: &str) -> YouTubeError {
    let (message, reasons) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (
            envelope.error.message,
            envelope
                .error
                .errors
                .into_iter()
                .map(|e| e.reason)
                .collect::<Vec<_>>(),
        ),
        Err(_) => (body.trim().to_string(), Vec::new()),
    };
    let has_reason = |needle: &str| reasons.iter().any(|r| r == needle) || message.contains(needle);

    if has_reason("commentsDisabled") {
        YouTubeError::CommentsDisabled(message)
    } else if has_reason("quotaExceeded") || has_reason("dailyLimitExceeded") {
        YouTubeError::QuotaExceeded(message)
    } else if has_reason("videoNotFound") || status == StatusCode::NOT_FOUND {
        YouTubeError::VideoNotFound(message)
    } else {
        YouTubeError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

fn parse_count(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.parse().ok()).unwrap_or(0)
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated)
}

static VIDEO_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&\n?#]+)",
        r"youtube\.com/v/([^&\n?#]+)",
        r"youtube\.com/watch\?.*v=([^&\n?#]+)",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static BARE_VIDEO_ID: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").ok());

/// Extract a video ID from a YouTube URL or a bare 11-character ID.
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    for pattern in VIDEO_ID_PATTERNS.iter() {
        if let Some(id) = pattern.captures(url).and_then(|c| c.get(1)) {
            return Some(id.as_str().to_string());
        }
    }
    BARE_VIDEO_ID
        .as_ref()
        .filter(|re| re.is_match(url))
        .map(|_| url.to_string())
}
