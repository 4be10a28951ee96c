#![forbid(unsafe_code)]

//! YouTube Data API v3 client.
//!
//! Only the handful of list endpoints the collector needs are covered. Every
//! response struct keeps its fields optional because the API omits whole
//! sub-objects (live details, topic details, ...) whenever they do not apply.

use crate::error::ApiError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;

pub const SEARCH_PAGE_SIZE: u32 = 50;
pub const COMMENT_PAGE_SIZE: u32 = 100;
pub const VIDEO_KIND: &str = "youtube#video";
const VIDEO_PARTS: &str =
    "snippet,contentDetails,statistics,status,liveStreamingDetails,topicDetails,recordingDetails";

/// Counters arrive as JSON strings (`"1234"`) but are accepted as numbers too,
/// fractional ones included.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Number(u64),
    Float(f64),
    Text(String),
}

impl Count {
    /// Unparsable text and negative or non-finite numbers count as zero.
    pub fn value(&self) -> u64 {
        match self {
            Count::Number(value) => *value,
            Count::Float(value) => float_count(*value),
            Count::Text(text) => {
                let text = text.trim();
                text.parse()
                    .ok()
                    .or_else(|| text.parse().ok().map(float_count))
                    .unwrap_or(0)
            }
        }
    }
}

fn float_count(value: f64) -> u64 {
    if value.is_finite() && value >= 0.0 {
        value.trunc() as u64
    } else {
        0
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Count::Number(value) => write!(f, "{value}"),
            Count::Float(value) => write!(f, "{value}"),
            Count::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchResult>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub id: ResourceId,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub kind: Option<String>,
    pub video_id: Option<String>,
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<Video>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(default)]
    pub id: String,
    pub snippet: Option<VideoSnippet>,
    pub content_details: Option<ContentDetails>,
    pub statistics: Option<Statistics>,
    pub status: Option<VideoStatus>,
    pub live_streaming_details: Option<LiveStreamingDetails>,
    pub topic_details: Option<TopicDetails>,
    pub recording_details: Option<RecordingDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: Option<String>,
    pub description: Option<String>,
    pub channel_id: Option<String>,
    pub published_at: Option<String>,
    pub category_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub thumbnails: Option<Thumbnails>,
    pub default_audio_language: Option<String>,
    pub default_language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnails {
    pub high: Option<Thumbnail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnail {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetails {
    pub duration: Option<String>,
    pub definition: Option<String>,
    pub caption: Option<String>,
    pub licensed_content: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub view_count: Option<Count>,
    pub like_count: Option<Count>,
    pub comment_count: Option<Count>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatus {
    pub upload_status: Option<String>,
    pub failure_reason: Option<String>,
    pub privacy_status: Option<String>,
    pub license: Option<String>,
    pub embeddable: Option<bool>,
    pub public_stats_viewable: Option<bool>,
    pub made_for_kids: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamingDetails {
    pub actual_start_time: Option<String>,
    pub actual_end_time: Option<String>,
    pub scheduled_start_time: Option<String>,
    pub scheduled_end_time: Option<String>,
    pub concurrent_viewers: Option<Count>,
    pub active_live_chat_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetails {
    pub topic_categories: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingDetails {
    pub recording_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadListResponse {
    #[serde(default)]
    pub items: Vec<CommentThread>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentThread {
    #[serde(default)]
    pub id: String,
    pub snippet: Option<CommentThreadSnippet>,
    pub replies: Option<CommentThreadReplies>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadSnippet {
    pub top_level_comment: Option<Comment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentThreadReplies {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    pub snippet: Option<CommentSnippet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnippet {
    pub author_display_name: Option<String>,
    pub author_profile_image_url: Option<String>,
    pub author_channel_url: Option<String>,
    pub author_channel_id: Option<AuthorChannelId>,
    pub text_display: Option<String>,
    pub published_at: Option<String>,
    pub updated_at: Option<String>,
    pub like_count: Option<Count>,
    pub viewer_rating: Option<String>,
    pub can_rate: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorChannelId {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<Channel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub id: String,
    pub snippet: Option<ChannelSnippet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelSnippet {
    pub title: Option<String>,
}

/// Parameters of one page of the per-channel video search.
#[derive(Debug, Clone, Copy)]
pub struct VideoSearch<'a> {
    pub channel_id: &'a str,
    pub published_after: &'a str,
    pub published_before: &'a str,
    pub page_token: Option<&'a str>,
}

/// The request/response contract the collector relies on. Every call names
/// the API key explicitly, so switching keys needs no client rebuild.
pub trait YoutubeApi {
    fn search_videos(
        &self,
        key: &str,
        query: &VideoSearch<'_>,
    ) -> Result<SearchListResponse, ApiError>;

    fn videos(&self, key: &str, video_id: &str) -> Result<VideoListResponse, ApiError>;

    fn comment_threads(
        &self,
        key: &str,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentThreadListResponse, ApiError>;

    fn search_channels(&self, key: &str, name: &str) -> Result<SearchListResponse, ApiError>;

    fn channels(&self, key: &str, channel_id: &str) -> Result<ChannelListResponse, ApiError>;
}

/// Blocking client backed by a shared `ureq` agent.
pub struct HttpYoutubeApi {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpYoutubeApi {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        key: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut request = self.agent.get(&url);
        for (name, value) in params {
            request = request.query(name, value);
        }
        request = request.query("key", key);

        match request.call() {
            Ok(response) => response
                .into_json::<T>()
                .map_err(|err| ApiError::Decode(format!("{endpoint}: {err}"))),
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(ApiError::Status { status, body })
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(ApiError::Transport(transport.to_string()))
            }
        }
    }
}

impl YoutubeApi for HttpYoutubeApi {
    fn search_videos(
        &self,
        key: &str,
        query: &VideoSearch<'_>,
    ) -> Result<SearchListResponse, ApiError> {
        let page_size = SEARCH_PAGE_SIZE.to_string();
        let mut params = vec![
            ("part", "id"),
            ("channelId", query.channel_id),
            ("maxResults", page_size.as_str()),
            ("order", "date"),
            ("publishedAfter", query.published_after),
            ("publishedBefore", query.published_before),
            ("type", "video"),
        ];
        if let Some(token) = query.page_token {
            params.push(("pageToken", token));
        }
        self.get("search", key, &params)
    }

    fn videos(&self, key: &str, video_id: &str) -> Result<VideoListResponse, ApiError> {
        self.get("videos", key, &[("part", VIDEO_PARTS), ("id", video_id)])
    }

    fn comment_threads(
        &self,
        key: &str,
        video_id: &str,
        page_token: Option<&str>,
    ) -> Result<CommentThreadListResponse, ApiError> {
        let page_size = COMMENT_PAGE_SIZE.to_string();
        let mut params = vec![
            ("part", "snippet,replies"),
            ("videoId", video_id),
            ("maxResults", page_size.as_str()),
            ("textFormat", "plainText"),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        self.get("commentThreads", key, &params)
    }

    fn search_channels(&self, key: &str, name: &str) -> Result<SearchListResponse, ApiError> {
        self.get(
            "search",
            key,
            &[
                ("part", "snippet"),
                ("q", name),
                ("type", "channel"),
                ("maxResults", "1"),
            ],
        )
    }

    fn channels(&self, key: &str, channel_id: &str) -> Result<ChannelListResponse, ApiError> {
        self.get("channels", key, &[("part", "snippet"), ("id", channel_id)])
    }
}
