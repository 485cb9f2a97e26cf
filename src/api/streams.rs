/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::api::encoding::join_id;
use crate::api::parsers::{embedded_error, ContentFailure};
use crate::api::request::{CallSpec, PendingCall, Target};
use crate::api::resources::check_status;
use crate::api::{DailymotionError, ModelEvent, Operation, Request, RequestError, Status};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::ops::Deref;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use url::Url;

// The player configuration is the first argument of this call in the embed page
const PLAYER_MARKER: &str = "dmp.create(document.getElementById('player'), ";
const MP4_MIME: &str = "video/mp4";

struct Format {
    id: &'static str,
    description: &'static str,
    ext: &'static str,
    width: u32,
    height: u32,
}

// Highest quality first
const FORMATS: &[Format] = &[
    Format { id: "2160", description: "H264 audio/video", ext: "mp4", width: 3840, height: 2160 },
    Format { id: "1440", description: "H264 audio/video", ext: "mp4", width: 2560, height: 1440 },
    Format { id: "1080", description: "H264 audio/video", ext: "mp4", width: 1920, height: 1080 },
    Format { id: "720", description: "H264 audio/video", ext: "mp4", width: 1280, height: 720 },
    Format { id: "480", description: "H264 audio/video", ext: "mp4", width: 848, height: 480 },
    Format { id: "380", description: "H264 audio/video", ext: "mp4", width: 512, height: 384 },
    Format { id: "240", description: "H264 audio/video", ext: "mp4", width: 400, height: 240 },
];

/// A playable encoding of a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStream {
    /// Quality identifier, e.g. `"720"`
    pub id: String,
    pub description: String,
    /// Container format
    pub ext: String,
    pub width: u32,
    pub height: u32,
    pub url: String,
}

/// Reads the stream list out of a video embed page.
pub(crate) fn parse_video_page(body: &[u8]) -> Result<Value, ContentFailure> {
    let page = String::from_utf8_lossy(body);
    let Some((_, config)) = page.split_once(PLAYER_MARKER) else {
        return Err(ContentFailure::content("No player configuration found in video page"));
    };
    let config = match serde_json::Deserializer::from_str(config)
        .into_iter::<Value>()
        .next()
    {
        Some(Ok(config)) => config,
        _ => return Err(ContentFailure::parse()),
    };

    let metadata = config.get("metadata");
    if let Some(message) = embedded_error(&config).or_else(|| metadata.and_then(embedded_error)) {
        return Err(ContentFailure::content(message));
    }
    let qualities = metadata
        .and_then(|m| m.get("qualities"))
        .and_then(Value::as_object)
        .ok_or_else(|| ContentFailure::content("No streams found in video page"))?;

    let streams: Vec<Value> = FORMATS
        .iter()
        .filter_map(|format| {
            let url = pick_url(qualities, format.id)?;
            Some(json!({
                "id": format.id,
                "description": format.description,
                "ext": format.ext,
                "width": format.width,
                "height": format.height,
                "url": url,
            }))
        })
        .collect();

    if streams.is_empty() {
        return Err(ContentFailure::content("No streams found in video page"));
    }
    Ok(Value::Array(streams))
}

// MP4 entry of a quality if there is one, else its first usable url
fn pick_url(qualities: &Map<String, Value>, quality: &str) -> Option<String> {
    let entries = qualities.get(quality)?.as_array()?;
    let url_of = |entry: &Value| {
        entry
            .get("url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
    };
    entries
        .iter()
        .filter(|e| e.get("type").and_then(Value::as_str) == Some(MP4_MIME))
        .find_map(url_of)
        .or_else(|| entries.iter().find_map(url_of))
}

/// Resolves the stream URLs of a video.
pub struct StreamsRequest {
    request: Request,
}

impl StreamsRequest {
    pub fn new(request: Request) -> Self {
        Self { request }
    }

    fn target(&self, video_id: &str) -> Result<Target, DailymotionError> {
        let base = self.request.config().video_page_url.as_str();
        let url = Url::parse(&join_id(base, video_id))?;
        let mut headers = Map::new();
        // Family filter off, or some pages come back without streams
        headers.insert("Cookie".to_string(), Value::from("ff=off"));
        Ok(Target::new(url).with_headers(headers))
    }

    fn call_spec() -> CallSpec {
        CallSpec {
            operation: Operation::Get,
            auth_required: false,
            refreshable: false,
            parser: parse_video_page,
        }
    }

    /// Fetches the streams of `video_id`
    pub async fn list(&self, video_id: &str) -> Result<Status, DailymotionError> {
        let target = self.target(video_id)?;
        self.request.call(Some(target), Self::call_spec()).await
    }

    pub(crate) fn start(&self, video_id: &str) -> Result<Option<PendingCall<'_>>, DailymotionError> {
        let target = self.target(video_id)?;
        self.request.begin(Some(target), Self::call_spec())
    }

    /// Streams of the last successful call, best quality first
    pub fn streams(&self) -> Result<Vec<VideoStream>, DailymotionError> {
        check_status(&self.request, self.request.status())?;
        self.request.result_as()
    }
}

impl Deref for StreamsRequest {
    type Target = Request;

    fn deref(&self) -> &Self::Target {
        &self.request
    }
}

impl std::fmt::Debug for StreamsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StreamsRequest").field(&self.request).finish()
    }
}

#[derive(Debug, Default)]
struct StreamsState {
    video_id: String,
    items: Vec<VideoStream>,
}

/// The streams of one video as a list.
pub struct StreamsModel {
    streams: StreamsRequest,
    state: Mutex<StreamsState>,
    events: broadcast::Sender<ModelEvent>,
}

impl StreamsModel {
    pub fn new(streams: StreamsRequest) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            streams,
            state: Mutex::new(StreamsState::default()),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StreamsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ModelEvent) {
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ModelEvent> {
        self.events.subscribe()
    }

    pub fn request(&self) -> &StreamsRequest {
        &self.streams
    }

    pub fn status(&self) -> Status {
        self.streams.status()
    }

    pub fn error(&self) -> RequestError {
        self.streams.error()
    }

    pub fn error_string(&self) -> String {
        self.streams.error_string()
    }

    pub fn video_id(&self) -> String {
        self.lock().video_id.clone()
    }

    pub fn count(&self) -> usize {
        self.lock().items.len()
    }

    pub fn get(&self, row: usize) -> Option<VideoStream> {
        self.lock().items.get(row).cloned()
    }

    pub fn items(&self) -> Vec<VideoStream> {
        self.lock().items.clone()
    }

    /// Resolves the streams of `video_id`, replacing the current rows
    pub async fn list(&self, video_id: &str) -> Result<Status, DailymotionError> {
        let Some(pending) = self.streams.start(video_id)? else {
            return Ok(Status::Loading);
        };
        let had_items = {
            let mut state = self.lock();
            state.video_id = video_id.to_string();
            let had_items = !state.items.is_empty();
            state.items.clear();
            had_items
        };
        self.emit(ModelEvent::Reset);
        if had_items {
            self.emit(ModelEvent::CountChanged(0));
        }
        self.emit(ModelEvent::StatusChanged(Status::Loading));

        let status = pending.wait().await;
        if status == Status::Ready {
            match self.streams.streams() {
                Ok(items) if !items.is_empty() => {
                    let last = items.len() - 1;
                    self.lock().items = items;
                    self.emit(ModelEvent::RowsInserted { first: 0, last });
                    self.emit(ModelEvent::CountChanged(last + 1));
                }
                Ok(_) => {}
                Err(err) => log::warn!("Unreadable stream list: {err}"),
            }
        }
        self.emit(ModelEvent::StatusChanged(status));
        Ok(status)
    }

    /// Resolves the streams of the current video again
    pub async fn reload(&self) -> Result<Status, DailymotionError> {
        let video_id = self.video_id();
        if video_id.is_empty() {
            return Err(DailymotionError::UrlMissing());
        }
        self.list(&video_id).await
    }

    pub fn cancel(&self) {
        self.streams.cancel()
    }
}

impl std::fmt::Debug for StreamsModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("StreamsModel")
            .field("video_id", &state.video_id)
            .field("count", &state.items.len())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn page(config: &str) -> Vec<u8> {
        format!(
            "<html><script>var x = 1;\n{PLAYER_MARKER}{config});\n</script></html>"
        )
        .into_bytes()
    }

    #[test]
    fn streams_are_ordered_best_first() {
        let body = page(
            r#"{"metadata": {"qualities": {
                "auto": [{"type": "application/x-mpegURL", "url": "https://cdn/auto.m3u8"}],
                "380": [{"type": "video/mp4", "url": "https://cdn/380.mp4"}],
                "1080": [
                    {"type": "application/x-mpegURL", "url": "https://cdn/1080.m3u8"},
                    {"type": "video/mp4", "url": "https://cdn/1080.mp4"}
                ]
            }}}"#,
        );
        let streams: Vec<VideoStream> =
            serde_json::from_value(parse_video_page(&body).unwrap()).unwrap();
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].id, "1080");
        assert_eq!(streams[0].url, "https://cdn/1080.mp4");
        assert_eq!((streams[0].width, streams[0].height), (1920, 1080));
        assert_eq!(streams[1].id, "380");
        assert_eq!(streams[1].ext, "mp4");
    }

    #[test]
    fn falls_back_to_first_url_of_a_quality() {
        let body = page(r#"{"metadata": {"qualities": {"240": [{"url": "https://cdn/240"}]}}}"#);
        let streams = parse_video_page(&body).unwrap();
        assert_eq!(streams[0]["url"], "https://cdn/240");
    }

    #[test]
    fn embedded_errors_are_content_errors() {
        let body = page(r#"{"metadata": {"error": {"title": "Video not found"}}}"#);
        let failure = parse_video_page(&body).unwrap_err();
        assert_eq!(failure.error, RequestError::UnknownContentError);
        assert_eq!(failure.message, "Video not found");
    }

    #[test]
    fn missing_marker_and_bad_json() {
        let failure = parse_video_page(b"<html></html>").unwrap_err();
        assert_eq!(failure.error, RequestError::UnknownContentError);

        let failure = parse_video_page(&page("{not json")).unwrap_err();
        assert_eq!(failure.error, RequestError::ParseError);

        let failure = parse_video_page(&page(r#"{"metadata": {}}"#)).unwrap_err();
        assert_eq!(failure.error, RequestError::UnknownContentError);
    }
}
