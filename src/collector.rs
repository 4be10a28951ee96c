#![forbid(unsafe_code)]

//! Collection loops over the Data API.
//!
//! Every failed call goes through [`Collector::recover`], which decides
//! between retrying (after switching keys or waiting out a rate limit) and
//! giving up on the current loop. Nothing here returns an API failure to the
//! caller: loops hand back whatever they gathered before stopping, so one bad
//! video or channel never ends the run.

use crate::api::{VIDEO_KIND, VideoSearch, YoutubeApi};
use crate::config::Pacing;
use crate::error::{ApiError, ErrorClass, LookupError};
use crate::inputs::CollectionWindow;
use crate::keys::KeyPool;
use crate::output::ChannelFiles;
use crate::records::{CommentRecord, VideoRecord, flatten_thread};
use anyhow::Result;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// Blocking pause used between requests.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

/// What a loop does after a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    Retry,
    Abort,
}

/// Counters reported after a channel has been processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSummary {
    pub channel_id: String,
    pub display_name: String,
    pub videos_found: usize,
    pub videos_written: usize,
    pub videos_skipped: usize,
    pub comments_written: usize,
}

pub struct Collector<A, S = ThreadSleeper> {
    api: A,
    keys: KeyPool,
    pacing: Pacing,
    sleeper: S,
    /// Key rejections (quota or disabled) in the current loop since its last
    /// successful call.
    rejections: usize,
}

impl<A: YoutubeApi> Collector<A, ThreadSleeper> {
    pub fn new(api: A, keys: KeyPool, pacing: Pacing) -> Self {
        Self::with_sleeper(api, keys, pacing, ThreadSleeper)
    }
}

impl<A: YoutubeApi, S: Sleeper> Collector<A, S> {
    pub fn with_sleeper(api: A, keys: KeyPool, pacing: Pacing, sleeper: S) -> Self {
        Self {
            api,
            keys,
            pacing,
            sleeper,
            rejections: 0,
        }
    }

    pub fn keys(&self) -> &KeyPool {
        &self.keys
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    fn rotate_key(&mut self) {
        self.keys.rotate();
        info!(
            "Switched to API key {} of {}",
            self.keys.position(),
            self.keys.len()
        );
        self.sleeper.sleep(self.pacing.key_rotation);
    }

    fn succeeded(&mut self) {
        self.rejections = 0;
    }

    /// Applies the recovery policy to a failed call.
    ///
    /// Quota and disabled-key answers switch to the next key, a 429 waits for
    /// the rate-limit pause and keeps the key, anything else stops the loop.
    /// Once every key has been rejected and the first one was tried again,
    /// the loop stops instead of cycling forever.
    pub fn recover(&mut self, err: &ApiError) -> Recovery {
        match err.class() {
            ErrorClass::QuotaExceeded => {
                warn!("Quota exceeded for the current API key, switching to the next key");
                self.rotate_after_rejection()
            }
            ErrorClass::KeyDisabled => {
                warn!("Current API key is disabled, switching to the next key");
                self.rotate_after_rejection()
            }
            ErrorClass::RateLimited => {
                warn!(
                    "Too many requests, waiting {}s before continuing",
                    self.pacing.rate_limit.as_secs()
                );
                self.sleeper.sleep(self.pacing.rate_limit);
                Recovery::Retry
            }
            ErrorClass::Other => {
                error!("API error: {err}");
                Recovery::Abort
            }
        }
    }

    fn rotate_after_rejection(&mut self) -> Recovery {
        self.rotate_key();
        self.rejections += 1;
        if self.rejections > self.keys.len() {
            error!(
                "All {} API keys were rejected, giving up on this request",
                self.keys.len()
            );
            return Recovery::Abort;
        }
        Recovery::Retry
    }

    /// Ids of every video the channel published inside the window, in the
    /// order the search returns them. Duplicates are kept.
    pub fn channel_video_ids(
        &mut self,
        channel_id: &str,
        window: &CollectionWindow,
    ) -> Vec<String> {
        let published_after = window.published_after();
        let published_before = window.published_before();
        let mut video_ids = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;
        self.succeeded();

        loop {
            let query = VideoSearch {
                channel_id,
                published_after: &published_after,
                published_before: &published_before,
                page_token: page_token.as_deref(),
            };
            match self.api.search_videos(self.keys.current(), &query) {
                Ok(page) => {
                    self.succeeded();
                    let before = video_ids.len();
                    video_ids.extend(page.items.into_iter().filter_map(|item| {
                        if item.id.kind.as_deref() == Some(VIDEO_KIND) {
                            item.id.video_id
                        } else {
                            None
                        }
                    }));
                    pages += 1;
                    info!(
                        "Search page {pages}: {} videos ({} so far)",
                        video_ids.len() - before,
                        video_ids.len()
                    );
                    match page.next_page_token.filter(|token| !token.is_empty()) {
                        Some(token) => {
                            page_token = Some(token);
                            self.sleeper.sleep(self.pacing.page);
                        }
                        None => break,
                    }
                }
                Err(err) => {
                    if self.recover(&err) == Recovery::Abort {
                        break;
                    }
                }
            }
        }

        video_ids
    }

    /// Full record of one video, or `None` when the API does not know it or
    /// the lookup had to be abandoned.
    pub fn video_details(&mut self, video_id: &str) -> Option<VideoRecord> {
        self.succeeded();
        loop {
            match self.api.videos(self.keys.current(), video_id) {
                Ok(list) => {
                    self.succeeded();
                    let Some(video) = list.items.first() else {
                        info!("Video {video_id} not found");
                        return None;
                    };
                    return Some(VideoRecord::from_video(video_id, video));
                }
                Err(err) => {
                    if self.recover(&err) == Recovery::Abort {
                        return None;
                    }
                }
            }
        }
    }

    /// Every top-level comment and reply of a video. Videos with comments
    /// turned off end the loop quietly with what was gathered so far.
    pub fn video_comments(&mut self, video_id: &str, channel_id: &str) -> Vec<CommentRecord> {
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;
        self.succeeded();

        loop {
            match self
                .api
                .comment_threads(self.keys.current(), video_id, page_token.as_deref())
            {
                Ok(page) => {
                    self.succeeded();
                    for thread in &page.items {
                        comments.extend(flatten_thread(thread, video_id, channel_id));
                    }
                    pages += 1;
                    info!(
                        "Comment page {pages} of video {video_id}: {} threads ({} comments so far)",
                        page.items.len(),
                        comments.len()
                    );
                    match page.next_page_token.filter(|token| !token.is_empty()) {
                        Some(token) => {
                            page_token = Some(token);
                            self.sleeper.sleep(self.pacing.page);
                        }
                        None => break,
                    }
                }
                Err(err) if err.is_comments_disabled() => {
                    info!("Comments are disabled for video {video_id}");
                    break;
                }
                Err(err) => {
                    if self.recover(&err) == Recovery::Abort {
                        break;
                    }
                }
            }
        }

        comments
    }

    /// Looks a free-text channel name up. Always uses the first key and never
    /// rotates.
    pub fn resolve_channel_id(&self, name: &str) -> Result<String, LookupError> {
        let response = self.api.search_channels(self.keys.first(), name)?;
        response
            .items
            .into_iter()
            .next()
            .and_then(|item| item.id.channel_id)
            .ok_or_else(|| LookupError::NotFound(name.to_string()))
    }

    /// Title of a channel. Same single-key behaviour as
    /// [`Collector::resolve_channel_id`].
    pub fn channel_title(&self, channel_id: &str) -> Result<String, LookupError> {
        let response = self.api.channels(self.keys.first(), channel_id)?;
        response
            .items
            .into_iter()
            .next()
            .and_then(|channel| channel.snippet)
            .and_then(|snippet| snippet.title)
            .filter(|title| !title.trim().is_empty())
            .ok_or_else(|| LookupError::NotFound(channel_id.to_string()))
    }

    /// Collects one channel into `<output_dir>/<name>_videos.csv` and
    /// `<output_dir>/<name>_comments.csv`.
    ///
    /// Only file errors are returned; API failures are handled per video.
    pub fn collect_channel(
        &mut self,
        channel_id: &str,
        window: &CollectionWindow,
        output_dir: &Path,
    ) -> Result<ChannelSummary> {
        info!("Starting collection for channel {channel_id}");
        info!("Period: {} to {}", window.start(), window.end());

        let title = match self.channel_title(channel_id) {
            Ok(title) => Some(title),
            Err(err) => {
                warn!("Could not look up the name of channel {channel_id}: {err}");
                None
            }
        };
        let files = ChannelFiles::prepare(output_dir, channel_id, title.as_deref())?;
        let mut summary = ChannelSummary {
            channel_id: channel_id.to_string(),
            display_name: title.unwrap_or_else(|| channel_id.to_string()),
            ..ChannelSummary::default()
        };

        info!("Listing videos of {}", summary.display_name);
        let video_ids = self.channel_video_ids(channel_id, window);
        summary.videos_found = video_ids.len();
        info!("Found {} videos to process", video_ids.len());

        for (index, video_id) in video_ids.iter().enumerate() {
            info!(
                "Processing video {} of {} (ID: {video_id})",
                index + 1,
                video_ids.len()
            );

            let Some(record) = self.video_details(video_id) else {
                warn!("Could not get details for video {video_id}, skipping");
                summary.videos_skipped += 1;
                continue;
            };
            files.append_video(&record)?;
            summary.videos_written += 1;

            if record.comment_count == 0 {
                info!("Video {video_id} has no comments, skipping comment collection");
                continue;
            }

            info!("Collecting comments for video {video_id}");
            let comments = self.video_comments(video_id, channel_id);
            if !comments.is_empty() {
                files.append_comments(&comments)?;
                summary.comments_written += comments.len();
                info!("Saved {} comments for video {video_id}", comments.len());
            }
        }

        info!("Finished collection for channel {channel_id}");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        ChannelListResponse, CommentThreadListResponse, SearchListResponse, VideoListResponse,
    };
    use chrono::NaiveDate;
    use serde::de::DeserializeOwned;
    use serde_json::{Value, json};
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};
    use tempfile::tempdir;

    type Scripted<T> = RefCell<VecDeque<Result<T, ApiError>>>;
    type ScriptedByVideo<T> = RefCell<HashMap<String, VecDeque<Result<T, ApiError>>>>;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Search {
            key: String,
            page_token: Option<String>,
        },
        Videos {
            key: String,
            video_id: String,
        },
        Threads {
            key: String,
            video_id: String,
            page_token: Option<String>,
        },
        SearchChannels {
            key: String,
            name: String,
        },
        Channels {
            key: String,
            channel_id: String,
        },
    }

    /// In-memory API answering from per-endpoint scripts. Unscripted calls
    /// get an empty list.
    #[derive(Default)]
    struct FakeApi {
        searches: Scripted<SearchListResponse>,
        videos: ScriptedByVideo<VideoListResponse>,
        threads: ScriptedByVideo<CommentThreadListResponse>,
        channel_searches: Scripted<SearchListResponse>,
        channels: Scripted<ChannelListResponse>,
        calls: RefCell<Vec<Call>>,
    }

    fn decode<T: DeserializeOwned>(value: Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    fn forbidden(reason: &str) -> ApiError {
        ApiError::Status {
            status: 403,
            body: format!(r#"{{"error":{{"code":403,"errors":[{{"reason":"{reason}"}}]}}}}"#),
        }
    }

    fn too_many_requests() -> ApiError {
        ApiError::Status {
            status: 429,
            body: String::new(),
        }
    }

    fn search_page(ids: &[&str], next: Option<&str>) -> SearchListResponse {
        let items: Vec<Value> = ids
            .iter()
            .map(|id| json!({"id": {"kind": "youtube#video", "videoId": id}}))
            .collect();
        decode(json!({"items": items, "nextPageToken": next}))
    }

    fn video(id: &str, comment_count: &str) -> VideoListResponse {
        decode(json!({"items": [{
            "id": id,
            "snippet": {"title": format!("title {id}"), "channelId": "UCchan"},
            "statistics": {"viewCount": "1", "commentCount": comment_count}
        }]}))
    }

    fn thread_page(
        threads: &[(&str, Vec<&str>)],
        next: Option<&str>,
    ) -> CommentThreadListResponse {
        let items: Vec<Value> = threads
            .iter()
            .map(|(id, replies)| {
                let replies: Vec<Value> = replies
                    .iter()
                    .map(|reply| json!({"id": reply, "snippet": {"textDisplay": reply}}))
                    .collect();
                json!({
                    "id": id,
                    "snippet": {"topLevelComment": {"id": id, "snippet": {"textDisplay": id}}},
                    "replies": {"comments": replies}
                })
            })
            .collect();
        decode(json!({"items": items, "nextPageToken": next}))
    }

    impl FakeApi {
        fn push_search(&self, result: Result<SearchListResponse, ApiError>) {
            self.searches.borrow_mut().push_back(result);
        }

        fn push_video(&self, video_id: &str, result: Result<VideoListResponse, ApiError>) {
            self.videos
                .borrow_mut()
                .entry(video_id.to_string())
                .or_default()
                .push_back(result);
        }

        fn push_threads(
            &self,
            video_id: &str,
            result: Result<CommentThreadListResponse, ApiError>,
        ) {
            self.threads
                .borrow_mut()
                .entry(video_id.to_string())
                .or_default()
                .push_back(result);
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        fn thread_calls_for(&self, video_id: &str) -> usize {
            self.calls()
                .iter()
                .filter(|call| matches!(call, Call::Threads { video_id: v, .. } if v == video_id))
                .count()
        }
    }

    fn next_from<T: Default>(queue: &Scripted<T>) -> Result<T, ApiError> {
        queue
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(T::default()))
    }

    fn next_for<T: Default>(queues: &ScriptedByVideo<T>, video_id: &str) -> Result<T, ApiError> {
        queues
            .borrow_mut()
            .get_mut(video_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(T::default()))
    }

    impl YoutubeApi for FakeApi {
        fn search_videos(
            &self,
            key: &str,
            query: &VideoSearch<'_>,
        ) -> Result<SearchListResponse, ApiError> {
            self.calls.borrow_mut().push(Call::Search {
                key: key.to_string(),
                page_token: query.page_token.map(str::to_string),
            });
            next_from(&self.searches)
        }

        fn videos(&self, key: &str, video_id: &str) -> Result<VideoListResponse, ApiError> {
            self.calls.borrow_mut().push(Call::Videos {
                key: key.to_string(),
                video_id: video_id.to_string(),
            });
            next_for(&self.videos, video_id)
        }

        fn comment_threads(
            &self,
            key: &str,
            video_id: &str,
            page_token: Option<&str>,
        ) -> Result<CommentThreadListResponse, ApiError> {
            self.calls.borrow_mut().push(Call::Threads {
                key: key.to_string(),
                video_id: video_id.to_string(),
                page_token: page_token.map(str::to_string),
            });
            next_for(&self.threads, video_id)
        }

        fn search_channels(&self, key: &str, name: &str) -> Result<SearchListResponse, ApiError> {
            self.calls.borrow_mut().push(Call::SearchChannels {
                key: key.to_string(),
                name: name.to_string(),
            });
            next_from(&self.channel_searches)
        }

        fn channels(&self, key: &str, channel_id: &str) -> Result<ChannelListResponse, ApiError> {
            self.calls.borrow_mut().push(Call::Channels {
                key: key.to_string(),
                channel_id: channel_id.to_string(),
            });
            next_from(&self.channels)
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        pauses: Vec<Duration>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.pauses.push(duration);
        }
    }

    fn collector(api: FakeApi, keys: &[&str]) -> Collector<FakeApi, RecordingSleeper> {
        let pool = KeyPool::new(keys.iter().map(|key| key.to_string()).collect()).unwrap();
        Collector::with_sleeper(api, pool, Pacing::default(), RecordingSleeper::default())
    }

    fn window() -> CollectionWindow {
        CollectionWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn search_follows_page_tokens() {
        let api = FakeApi::default();
        api.push_search(Ok(search_page(&["a", "b"], Some("p2"))));
        api.push_search(Ok(decode(json!({"items": [
            {"id": {"kind": "youtube#video", "videoId": "c"}},
            {"id": {"kind": "youtube#playlist", "playlistId": "pl"}}
        ]}))));
        let mut collector = collector(api, &["k1"]);

        let ids = collector.channel_video_ids("UCchan", &window());

        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(
            collector.api().calls(),
            vec![
                Call::Search {
                    key: "k1".into(),
                    page_token: None,
                },
                Call::Search {
                    key: "k1".into(),
                    page_token: Some("p2".into()),
                },
            ]
        );
        assert_eq!(collector.sleeper().pauses, vec![Duration::from_millis(100)]);
    }

    #[test]
    fn duplicate_ids_across_pages_are_kept() {
        let api = FakeApi::default();
        api.push_search(Ok(search_page(&["a"], Some("p2"))));
        api.push_search(Ok(search_page(&["a"], None)));
        let mut collector = collector(api, &["k1"]);
        assert_eq!(collector.channel_video_ids("UCchan", &window()), vec!["a", "a"]);
    }

    #[test]
    fn quota_error_rotates_once_and_retries_with_next_key() {
        let api = FakeApi::default();
        api.push_search(Ok(search_page(&["a"], Some("p2"))));
        api.push_search(Err(forbidden("quotaExceeded")));
        api.push_search(Ok(search_page(&["b"], None)));
        let mut collector = collector(api, &["k1", "k2", "k3"]);

        let ids = collector.channel_video_ids("UCchan", &window());

        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(collector.keys().index(), 1);
        let calls = collector.api().calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[2],
            Call::Search {
                key: "k2".into(),
                page_token: Some("p2".into()),
            }
        );
        assert_eq!(
            collector.sleeper().pauses,
            vec![Duration::from_millis(100), Duration::from_secs(1)]
        );
    }

    #[test]
    fn disabled_key_rotates_too() {
        let api = FakeApi::default();
        api.push_search(Err(ApiError::Status {
            status: 403,
            body: "API key has been disabled".into(),
        }));
        api.push_search(Ok(search_page(&["a"], None)));
        let mut collector = collector(api, &["k1", "k2"]);

        assert_eq!(collector.channel_video_ids("UCchan", &window()), vec!["a"]);
        assert_eq!(collector.keys().current(), "k2");
    }

    #[test]
    fn rate_limit_waits_and_keeps_key() {
        let api = FakeApi::default();
        api.push_search(Err(too_many_requests()));
        api.push_search(Ok(search_page(&["a"], None)));
        let mut collector = collector(api, &["k1", "k2"]);

        assert_eq!(collector.channel_video_ids("UCchan", &window()), vec!["a"]);
        assert_eq!(collector.keys().index(), 0);
        assert_eq!(collector.sleeper().pauses, vec![Duration::from_secs(60)]);
        let calls = collector.api().calls();
        assert!(
            calls
                .iter()
                .all(|call| matches!(call, Call::Search { key, .. } if key == "k1"))
        );
    }

    #[test]
    fn unexpected_error_keeps_partial_results() {
        let api = FakeApi::default();
        api.push_search(Ok(search_page(&["a"], Some("p2"))));
        api.push_search(Err(ApiError::Status {
            status: 500,
            body: "backend error".into(),
        }));
        api.push_search(Ok(search_page(&["never"], None)));
        let mut collector = collector(api, &["k1", "k2"]);

        assert_eq!(collector.channel_video_ids("UCchan", &window()), vec!["a"]);
        assert_eq!(collector.keys().index(), 0);
        assert_eq!(collector.api().calls().len(), 2);
    }

    #[test]
    fn exhausted_pool_stops_the_loop() {
        let api = FakeApi::default();
        for _ in 0..10 {
            api.push_search(Err(forbidden("quotaExceeded")));
        }
        let mut collector = collector(api, &["k1", "k2"]);

        assert!(collector.channel_video_ids("UCchan", &window()).is_empty());
        assert_eq!(collector.api().calls().len(), 3);
    }

    #[test]
    fn details_not_found_is_none() {
        let api = FakeApi::default();
        api.push_video("gone", Ok(VideoListResponse::default()));
        let mut collector = collector(api, &["k1"]);
        assert!(collector.video_details("gone").is_none());
    }

    #[test]
    fn details_retry_after_quota() {
        let api = FakeApi::default();
        api.push_video("v1", Err(forbidden("quotaExceeded")));
        api.push_video("v1", Ok(video("v1", "3")));
        let mut collector = collector(api, &["k1", "k2"]);

        let record = collector.video_details("v1").unwrap();
        assert_eq!(record.video_id, "v1");
        assert_eq!(record.comment_count, 3);
        assert_eq!(
            collector.api().calls()[1],
            Call::Videos {
                key: "k2".into(),
                video_id: "v1".into(),
            }
        );
    }

    #[test]
    fn comments_walk_pages_and_replies() {
        let api = FakeApi::default();
        api.push_threads(
            "v1",
            Ok(thread_page(&[("t1", vec!["t1.a", "t1.b"])], Some("n2"))),
        );
        api.push_threads("v1", Ok(thread_page(&[("t2", vec![])], None)));
        let mut collector = collector(api, &["k1"]);

        let comments = collector.video_comments("v1", "UCchan");

        let ids: Vec<&str> = comments.iter().map(|c| c.comment_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t1.a", "t1.b", "t2"]);
        for comment in &comments {
            assert_eq!(comment.video_id, "v1");
            assert_eq!(comment.channel_id, "UCchan");
            if comment.is_reply {
                assert_eq!(comment.parent_id, "t1");
            } else {
                assert!(comment.parent_id.is_empty());
            }
        }
        assert_eq!(collector.sleeper().pauses, vec![Duration::from_millis(100)]);
    }

    #[test]
    fn comments_disabled_stops_quietly() {
        let api = FakeApi::default();
        api.push_threads("v1", Ok(thread_page(&[("t1", vec![])], Some("n2"))));
        let body = json!({"error": {
            "code": 403,
            "message": "The video has disabled comments.",
            "errors": [{"reason": "commentsDisabled"}]
        }});
        api.push_threads(
            "v1",
            Err(ApiError::Status {
                status: 403,
                body: body.to_string(),
            }),
        );
        let mut collector = collector(api, &["k1", "k2"]);

        let comments = collector.video_comments("v1", "UCchan");

        assert_eq!(comments.len(), 1);
        assert_eq!(collector.keys().index(), 0);
        assert_eq!(collector.api().thread_calls_for("v1"), 2);
    }

    #[test]
    fn lookups_use_first_key_only() {
        let api = FakeApi::default();
        api.push_search(Err(forbidden("quotaExceeded")));
        api.channel_searches.borrow_mut().push_back(Ok(decode(json!({
            "items": [{"id": {"kind": "youtube#channel", "channelId": "UCfound"}}]
        }))));
        api.channel_searches
            .borrow_mut()
            .push_back(Ok(SearchListResponse::default()));
        api.channels
            .borrow_mut()
            .push_back(Err(forbidden("quotaExceeded")));
        let mut collector = collector(api, &["k1", "k2"]);
        collector.channel_video_ids("UCchan", &window());
        assert_eq!(collector.keys().current(), "k2");

        assert_eq!(collector.resolve_channel_id("Some Name").unwrap(), "UCfound");
        assert!(matches!(
            collector.resolve_channel_id("Nobody"),
            Err(LookupError::NotFound(_))
        ));
        assert!(matches!(
            collector.channel_title("UCchan"),
            Err(LookupError::Api(_))
        ));
        assert_eq!(collector.keys().current(), "k2");

        let lookup_keys: Vec<String> = collector
            .api()
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SearchChannels { key, .. } | Call::Channels { key, .. } => Some(key),
                _ => None,
            })
            .collect();
        assert_eq!(lookup_keys, vec!["k1", "k1", "k1"]);
    }

    #[test]
    fn collect_channel_writes_videos_and_comments() {
        let dir = tempdir().unwrap();
        let api = FakeApi::default();
        api.channels.borrow_mut().push_back(Ok(decode(json!({
            "items": [{"id": "UCchan", "snippet": {"title": "Test/Channel #1"}}]
        }))));
        api.push_search(Ok(search_page(&["v1", "v2"], Some("p2"))));
        api.push_search(Ok(search_page(&["v3"], None)));
        api.push_video("v1", Ok(video("v1", "5")));
        api.push_video("v2", Ok(video("v2", "0")));
        api.push_video("v3", Ok(video("v3", "2")));
        api.push_threads(
            "v1",
            Ok(thread_page(&[("c1", vec!["c1.r"]), ("c2", vec![])], None)),
        );
        api.push_threads("v3", Ok(thread_page(&[("c3", vec![])], Some("n2"))));
        api.push_threads("v3", Ok(thread_page(&[("c4", vec!["c4.r"])], None)));
        let mut collector = collector(api, &["k1"]);

        let summary = collector
            .collect_channel("UCchan", &window(), dir.path())
            .unwrap();

        assert_eq!(summary.display_name, "Test/Channel #1");
        assert_eq!(summary.videos_found, 3);
        assert_eq!(summary.videos_written, 3);
        assert_eq!(summary.comments_written, 6);
        assert_eq!(collector.api().thread_calls_for("v2"), 0);
        assert_eq!(collector.api().thread_calls_for("v1"), 1);

        let mut videos =
            csv::Reader::from_path(dir.path().join("TestChannel_1_videos.csv")).unwrap();
        let video_ids: Vec<String> = videos
            .records()
            .map(|row| row.unwrap()[0].to_string())
            .collect();
        assert_eq!(video_ids, vec!["v1", "v2", "v3"]);

        let mut comments =
            csv::Reader::from_path(dir.path().join("TestChannel_1_comments.csv")).unwrap();
        let rows: Vec<(String, String)> = comments
            .records()
            .map(|row| {
                let row = row.unwrap();
                (row[0].to_string(), row[1].to_string())
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                ("v1".to_string(), "c1".to_string()),
                ("v1".to_string(), "c1.r".to_string()),
                ("v1".to_string(), "c2".to_string()),
                ("v3".to_string(), "c3".to_string()),
                ("v3".to_string(), "c4".to_string()),
                ("v3".to_string(), "c4.r".to_string()),
            ]
        );
    }

    #[test]
    fn collect_channel_survives_failed_lookups() {
        let dir = tempdir().unwrap();
        let api = FakeApi::default();
        api.channels
            .borrow_mut()
            .push_back(Err(ApiError::Transport("offline".into())));
        api.push_search(Ok(search_page(&["v1", "v2"], None)));
        api.push_video("v1", Err(ApiError::Decode("bad".into())));
        api.push_video("v2", Ok(video("v2", "1")));
        api.push_threads(
            "v2",
            Err(ApiError::Status {
                status: 500,
                body: String::new(),
            }),
        );
        let mut collector = collector(api, &["k1"]);

        let summary = collector
            .collect_channel("UCchan", &window(), dir.path())
            .unwrap();

        assert_eq!(summary.display_name, "UCchan");
        assert_eq!(summary.videos_skipped, 1);
        assert_eq!(summary.videos_written, 1);
        assert_eq!(summary.comments_written, 0);
        assert!(dir.path().join("UCchan_videos.csv").exists());

        let mut comments =
            csv::Reader::from_path(dir.path().join("UCchan_comments.csv")).unwrap();
        assert_eq!(comments.records().count(), 0);
    }

    #[test]
    fn blank_channel_title_falls_back_to_id() {
        let dir = tempdir().unwrap();
        let api = FakeApi::default();
        api.channels.borrow_mut().push_back(Ok(decode(json!({
            "items": [{"id": "UCchan", "snippet": {"title": ""}}]
        }))));
        api.push_search(Ok(SearchListResponse::default()));
        let mut collector = collector(api, &["k1"]);

        let summary = collector
            .collect_channel("UCchan", &window(), dir.path())
            .unwrap();

        assert_eq!(summary.display_name, "UCchan");
        assert!(dir.path().join("UCchan_videos.csv").exists());
    }
}
