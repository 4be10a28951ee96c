#![forbid(unsafe_code)]

//! Flat CSV rows built from nested API resources.
//!
//! Every column has a concrete default (empty string, `0` or `false`), so a
//! row never carries a missing cell no matter which parts the API omitted.

use crate::api::{Comment, CommentSnippet, CommentThread, Count, Video};
use serde::Serialize;

/// Column order of the videos file. Matches the field order of [`VideoRecord`].
pub const VIDEO_HEADER: [&str; 35] = [
    "video_id",
    "title",
    "description",
    "channel_id",
    "published_at",
    "category_id",
    "tags",
    "view_count",
    "like_count",
    "comment_count",
    "duration",
    "definition",
    "caption",
    "licensed_content",
    "privacy_status",
    "license",
    "embeddable",
    "public_stats_viewable",
    "is_made_for_kids",
    "thumbnail_url",
    "default_audio_language",
    "default_language",
    "actual_start_time",
    "scheduled_start_time",
    "actual_end_time",
    "scheduled_end_time",
    "concurrent_viewers",
    "active_live_chat_id",
    "recording_date",
    "topicCategories",
    "processing_status",
    "parts_total",
    "parts_processed",
    "time_left_ms",
    "processing_failure_reason",
];

/// Column order of the comments file. Matches the field order of [`CommentRecord`].
pub const COMMENT_HEADER: [&str; 15] = [
    "video_id",
    "comment_id",
    "author",
    "author_profile_image_url",
    "author_channel_url",
    "author_channel_id",
    "comment",
    "published_at",
    "updated_at",
    "like_count",
    "viewer_rating",
    "can_rate",
    "is_reply",
    "parent_id",
    "channel_id",
];

/// One row of `<name>_videos.csv`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub published_at: String,
    pub category_id: String,
    /// `|`-joined, empty when the video has no tags.
    pub tags: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub duration: String,
    pub definition: String,
    pub caption: String,
    pub licensed_content: bool,
    pub privacy_status: String,
    pub license: String,
    pub embeddable: bool,
    pub public_stats_viewable: bool,
    pub is_made_for_kids: bool,
    pub thumbnail_url: String,
    pub default_audio_language: String,
    pub default_language: String,
    pub actual_start_time: String,
    pub scheduled_start_time: String,
    pub actual_end_time: String,
    pub scheduled_end_time: String,
    pub concurrent_viewers: String,
    pub active_live_chat_id: String,
    pub recording_date: String,
    #[serde(rename = "topicCategories")]
    pub topic_categories: String,
    pub processing_status: String,
    // Always empty: the requested parts never report processing progress.
    pub parts_total: String,
    pub parts_processed: String,
    pub time_left_ms: String,
    pub processing_failure_reason: String,
}

/// One row of `<name>_comments.csv`, either a top-level comment or a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub video_id: String,
    pub comment_id: String,
    pub author: String,
    pub author_profile_image_url: String,
    pub author_channel_url: String,
    pub author_channel_id: String,
    pub comment: String,
    pub published_at: String,
    pub updated_at: String,
    pub like_count: u64,
    pub viewer_rating: String,
    pub can_rate: bool,
    pub is_reply: bool,
    /// Id of the top-level comment for replies, empty otherwise.
    pub parent_id: String,
    pub channel_id: String,
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn count(value: &Option<Count>) -> u64 {
    value.as_ref().map(Count::value).unwrap_or(0)
}

fn flag(value: Option<bool>) -> bool {
    value.unwrap_or(false)
}

/// `[]` becomes `""`, `["a", "b"]` becomes `"a|b"`.
pub fn join_list(values: Option<&[String]>) -> String {
    values.map(|values| values.join("|")).unwrap_or_default()
}

impl VideoRecord {
    pub fn from_video(video_id: &str, video: &Video) -> Self {
        let snippet = video.snippet.clone().unwrap_or_default();
        let content = video.content_details.clone().unwrap_or_default();
        let stats = video.statistics.clone().unwrap_or_default();
        let status = video.status.clone().unwrap_or_default();
        let live = video.live_streaming_details.clone().unwrap_or_default();
        let topics = video.topic_details.clone().unwrap_or_default();
        let recording = video.recording_details.clone().unwrap_or_default();

        let thumbnail_url = snippet
            .thumbnails
            .as_ref()
            .and_then(|thumbnails| thumbnails.high.as_ref())
            .and_then(|high| high.url.clone())
            .unwrap_or_default();

        Self {
            video_id: video_id.to_owned(),
            title: text(&snippet.title),
            description: text(&snippet.description),
            channel_id: text(&snippet.channel_id),
            published_at: text(&snippet.published_at),
            category_id: text(&snippet.category_id),
            tags: join_list(snippet.tags.as_deref()),
            view_count: count(&stats.view_count),
            like_count: count(&stats.like_count),
            comment_count: count(&stats.comment_count),
            duration: text(&content.duration),
            definition: text(&content.definition),
            caption: text(&content.caption),
            licensed_content: flag(content.licensed_content),
            privacy_status: text(&status.privacy_status),
            license: text(&status.license),
            embeddable: flag(status.embeddable),
            public_stats_viewable: flag(status.public_stats_viewable),
            is_made_for_kids: flag(status.made_for_kids),
            thumbnail_url,
            default_audio_language: text(&snippet.default_audio_language),
            default_language: text(&snippet.default_language),
            actual_start_time: text(&live.actual_start_time),
            scheduled_start_time: text(&live.scheduled_start_time),
            actual_end_time: text(&live.actual_end_time),
            scheduled_end_time: text(&live.scheduled_end_time),
            concurrent_viewers: live
                .concurrent_viewers
                .as_ref()
                .map(Count::to_string)
                .unwrap_or_default(),
            active_live_chat_id: text(&live.active_live_chat_id),
            recording_date: text(&recording.recording_date),
            topic_categories: join_list(topics.topic_categories.as_deref()),
            processing_status: text(&status.upload_status),
            parts_total: String::new(),
            parts_processed: String::new(),
            time_left_ms: String::new(),
            processing_failure_reason: text(&status.failure_reason),
        }
    }
}

impl CommentRecord {
    fn from_snippet(
        comment_id: &str,
        snippet: Option<&CommentSnippet>,
        video_id: &str,
        channel_id: &str,
    ) -> Self {
        let snippet = snippet.cloned().unwrap_or_default();
        let author_channel_id = snippet
            .author_channel_id
            .and_then(|author| author.value)
            .unwrap_or_default();

        Self {
            video_id: video_id.to_owned(),
            comment_id: comment_id.to_owned(),
            author: text(&snippet.author_display_name),
            author_profile_image_url: text(&snippet.author_profile_image_url),
            author_channel_url: text(&snippet.author_channel_url),
            author_channel_id,
            comment: text(&snippet.text_display),
            published_at: text(&snippet.published_at),
            updated_at: text(&snippet.updated_at),
            like_count: count(&snippet.like_count),
            viewer_rating: text(&snippet.viewer_rating),
            can_rate: flag(snippet.can_rate),
            is_reply: false,
            parent_id: String::new(),
            channel_id: channel_id.to_owned(),
        }
    }

    pub fn top_level(thread: &CommentThread, video_id: &str, channel_id: &str) -> Self {
        let top = thread
            .snippet
            .as_ref()
            .and_then(|snippet| snippet.top_level_comment.as_ref());
        let comment_id = if thread.id.is_empty() {
            top.map(|comment| comment.id.as_str()).unwrap_or_default()
        } else {
            thread.id.as_str()
        };
        Self::from_snippet(
            comment_id,
            top.and_then(|comment| comment.snippet.as_ref()),
            video_id,
            channel_id,
        )
    }

    pub fn reply(reply: &Comment, parent_id: &str, video_id: &str, channel_id: &str) -> Self {
        Self {
            is_reply: true,
            parent_id: parent_id.to_owned(),
            ..Self::from_snippet(&reply.id, reply.snippet.as_ref(), video_id, channel_id)
        }
    }
}

/// One record for the thread's top-level comment followed by one per reply.
pub fn flatten_thread(
    thread: &CommentThread,
    video_id: &str,
    channel_id: &str,
) -> Vec<CommentRecord> {
    let top = CommentRecord::top_level(thread, video_id, channel_id);
    let replies = thread
        .replies
        .as_ref()
        .map(|replies| replies.comments.as_slice())
        .unwrap_or_default();

    let parent_id = top.comment_id.clone();
    let mut records = Vec::with_capacity(1 + replies.len());
    records.push(top);
    for reply in replies {
        records.push(CommentRecord::reply(reply, &parent_id, video_id, channel_id));
    }
    records
}
