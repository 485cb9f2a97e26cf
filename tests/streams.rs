/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
mod helpers;

#[cfg(test)]
mod test {
    use crate::helpers::{mock_client, status_reply, test_creds, text_reply};
    use dailymotion::api::{DailymotionError, ModelEvent, RequestError, Status};

    fn embed_page(config: &str) -> String {
        format!(
            "<!DOCTYPE html><html><body><div id=\"player\"></div><script>\n\
             var dmp = window.dmp;\n\
             dmp.create(document.getElementById('player'), {config});\n\
             </script></body></html>"
        )
    }

    const QUALITIES: &str = r#"{"context": {"api": "x"}, "metadata": {"id": "x7tgad0", "qualities": {
        "auto": [{"type": "application/x-mpegURL", "url": "https://cdn.example/x7/manifest.m3u8"}],
        "240": [{"type": "video/mp4", "url": "https://cdn.example/x7/240.mp4"}],
        "720": [{"type": "video/mp4", "url": "https://cdn.example/x7/720.mp4"}],
        "480": [{"type": "video/mp4", "url": "https://cdn.example/x7/480.mp4"}]
    }}}"#;

    #[tokio::test]
    async fn streams_of_a_video() {
        let (client, transport) = mock_client(test_creds());
        transport.push(text_reply(200, &embed_page(QUALITIES)));

        let request = client.streams();
        assert_eq!(request.list("x7tgad0").await.unwrap(), Status::Ready);

        let streams = request.streams().unwrap();
        let ids: Vec<&str> = streams.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["720", "480", "240"]);
        assert_eq!(streams[0].url, "https://cdn.example/x7/720.mp4");
        assert_eq!(streams[0].description, "H264 audio/video");
        assert_eq!((streams[1].width, streams[1].height), (848, 480));

        let sent = transport.sent();
        assert_eq!(sent[0].url.as_str(), "https://www.dailymotion.com/embed/video/x7tgad0");
        assert_eq!(sent[0].header("Cookie"), Some("ff=off"));
        assert_eq!(sent[0].header("Authorization"), None);
    }

    #[tokio::test]
    async fn page_errors_are_content_errors() {
        let (client, transport) = mock_client(test_creds());
        transport.push(text_reply(
            200,
            &embed_page(r#"{"error": {"type": "DM007", "title": "Video geo-restricted by the owner."}}"#),
        ));
        transport.push(text_reply(200, "<html>no player here</html>"));

        let request = client.streams();
        assert_eq!(request.list("x1").await.unwrap(), Status::Failed);
        assert_eq!(request.error(), RequestError::UnknownContentError);
        assert_eq!(request.error_string(), "Video geo-restricted by the owner.");
        assert!(matches!(request.streams(), Err(DailymotionError::ApiResponse { .. })));

        assert_eq!(request.list("x1").await.unwrap(), Status::Failed);
        assert_eq!(request.error(), RequestError::UnknownContentError);
    }

    #[tokio::test]
    async fn stream_pages_are_never_refreshed() {
        let (client, transport) = mock_client(test_creds());
        transport.push(status_reply(401));

        let request = client.streams();
        assert_eq!(request.list("x1").await.unwrap(), Status::Failed);
        assert_eq!(request.error(), RequestError::AuthenticationRequired);
        assert_eq!(transport.sent_count(), 1);
    }

    #[tokio::test]
    async fn streams_model_lists_and_reloads() {
        let (client, transport) = mock_client(test_creds());
        transport.push(text_reply(200, &embed_page(QUALITIES)));
        transport.push(text_reply(200, &embed_page(QUALITIES)));

        let model = client.streams_model();
        let mut events = model.subscribe();
        assert_eq!(model.list("x7tgad0").await.unwrap(), Status::Ready);
        assert_eq!(model.count(), 3);
        assert_eq!(model.get(0).unwrap().id, "720");
        assert_eq!(model.video_id(), "x7tgad0");

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert!(received.contains(&ModelEvent::RowsInserted { first: 0, last: 2 }));
        assert_eq!(received.last(), Some(&ModelEvent::StatusChanged(Status::Ready)));

        assert_eq!(model.reload().await.unwrap(), Status::Ready);
        assert_eq!(model.count(), 3);
        assert_eq!(transport.sent()[1].url.path(), "/embed/video/x7tgad0");
    }

    #[tokio::test]
    async fn streams_model_reload_needs_a_video() {
        let (client, _transport) = mock_client(test_creds());
        let model = client.streams_model();
        assert!(matches!(model.reload().await, Err(DailymotionError::UrlMissing())));
    }
}
