//! End-to-end integration tests
//!
//! Drive the full router against a fake ffmpeg and a local upstream.

use axum::{routing::get, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::http::create_router;
use crate::integration::fixtures::{serve, FakeFfmpeg};
use crate::state::AppState;

/// Router whose transcoder is `fake`
pub fn recorder_app(fake: &FakeFfmpeg) -> Router {
    let config = ServerConfig {
        ffmpeg: fake.config(),
        ..Default::default()
    };
    create_router(Arc::new(AppState::new(config).unwrap()))
}

/// Upstream serving `playlist` at `/master.m3u8`, counting requests
pub async fn playlist_upstream(playlist: &'static str) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/master.m3u8",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                playlist
            }
        }),
    );
    let base = serve(app).await;
    (format!("{}/master.m3u8", base), hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::fixtures::{
        is_running, AAC_MASTER_PLAYLIST, MP3_MASTER_PLAYLIST, PLAIN_PLAYLIST,
    };
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use std::time::Duration;
    use tower::util::ServiceExt;

    async fn get_response(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8_lossy(&bytes).to_string()
    }

    fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> &'a str {
        response.headers().get(name).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn test_status_text() {
        let fake = FakeFfmpeg::emitting("x");
        let response = get_response(recorder_app(&fake), "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Running"));
    }

    #[tokio::test]
    async fn test_missing_url_is_rejected_without_spawning() {
        let fake = FakeFfmpeg::emitting("x");

        for uri in ["/record", "/record?url=", "/record?filename=a.mp3&format=mp3"] {
            let response = get_response(recorder_app(&fake), uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_text(response).await, "Missing url parameter");
        }
        assert!(fake.invoked_args().is_none());
    }

    #[tokio::test]
    async fn test_unusual_format_is_passed_to_ffmpeg_unchanged() {
        let fake = FakeFfmpeg::emitting("x");
        let response = get_response(
            recorder_app(&fake),
            "/record?url=http://127.0.0.1:9/a.m3u8&format=a%2Fb%20c",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_TYPE), "audio/aac");
        assert_eq!(fake.arg_after("-f").as_deref(), Some("a/b c"));
    }

    #[tokio::test]
    async fn test_rejected_format_is_500() {
        let fake = FakeFfmpeg::new("echo 'Unknown output format' >&2; exit 1");
        let response = get_response(
            recorder_app(&fake),
            "/record?url=http://127.0.0.1:9/a.m3u8&format=-y",
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fake.arg_after("-f").as_deref(), Some("-y"));
    }

    #[tokio::test]
    async fn test_probed_aac_playlist() {
        let fake = FakeFfmpeg::emitting("ADTSDATA");
        let (url, hits) = playlist_upstream(AAC_MASTER_PLAYLIST).await;

        let response = get_response(recorder_app(&fake), &format!("/record?url={}", url)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_TYPE), "audio/aac");
        // The default name stays .mp3 even for AAC content.
        assert_eq!(
            header_str(&response, header::CONTENT_DISPOSITION),
            "attachment; filename=\"recording.mp3\""
        );
        assert_eq!(body_text(response).await, "ADTSDATA");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(fake.arg_after("-f").as_deref(), Some("adts"));
        assert_eq!(fake.arg_after("-i"), Some(url));
        assert_eq!(fake.arg_after("-acodec").as_deref(), Some("copy"));
    }

    #[tokio::test]
    async fn test_probed_mp3_playlist() {
        let fake = FakeFfmpeg::emitting("ID3");
        let (url, _) = playlist_upstream(MP3_MASTER_PLAYLIST).await;

        let response = get_response(
            recorder_app(&fake),
            &format!("/record?url={}&filename=show.mp3", url),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_TYPE), "audio/mpeg");
        assert_eq!(
            header_str(&response, header::CONTENT_DISPOSITION),
            "attachment; filename=\"show.mp3\""
        );
        assert_eq!(fake.arg_after("-f").as_deref(), Some("mp3"));
    }

    #[tokio::test]
    async fn test_inconclusive_probe_defaults_to_adts() {
        let fake = FakeFfmpeg::emitting("x");
        let (url, hits) = playlist_upstream(PLAIN_PLAYLIST).await;

        let response = get_response(recorder_app(&fake), &format!("/record?url={}", url)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_TYPE), "audio/aac");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(fake.arg_after("-f").as_deref(), Some("adts"));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_defaults_to_adts() {
        let fake = FakeFfmpeg::emitting("x");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let response = get_response(
            recorder_app(&fake),
            &format!("/record?url=http://{}/master.m3u8", addr),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fake.arg_after("-f").as_deref(), Some("adts"));
    }

    #[tokio::test]
    async fn test_explicit_aac_skips_probe() {
        let fake = FakeFfmpeg::emitting("x");
        let (url, hits) = playlist_upstream(MP3_MASTER_PLAYLIST).await;

        let response = get_response(
            recorder_app(&fake),
            &format!("/record?url={}&format=aac", url),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_str(&response, header::CONTENT_TYPE), "audio/aac");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(fake.arg_after("-f").as_deref(), Some("adts"));
    }

    #[tokio::test]
    async fn test_explicit_mp3() {
        let fake = FakeFfmpeg::emitting("x");
        let (url, hits) = playlist_upstream(AAC_MASTER_PLAYLIST).await;

        let response = get_response(
            recorder_app(&fake),
            &format!("/record?url={}&format=mp3", url),
        )
        .await;

        assert_eq!(header_str(&response, header::CONTENT_TYPE), "audio/mpeg");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(fake.arg_after("-f").as_deref(), Some("mp3"));
    }

    #[tokio::test]
    async fn test_failure_before_output_is_500() {
        let fake = FakeFfmpeg::new("echo 'Input/output error' >&2; exit 1");

        let response = get_response(
            recorder_app(&fake),
            "/record?url=http://127.0.0.1:9/master.m3u8&format=aac",
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "Recording error");
    }

    #[tokio::test]
    async fn test_client_disconnect_kills_transcoder() {
        let fake = FakeFfmpeg::endless();
        let base = serve(recorder_app(&fake)).await;

        let mut response = reqwest::Client::new()
            .get(format!("{}/record", base))
            .query(&[("url", "http://127.0.0.1:9/live.m3u8"), ("format", "aac")])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response.chunk().await.unwrap().is_some());

        let pid = fake.wait_for_pid().await;
        assert!(is_running(pid));
        drop(response);

        assert!(FakeFfmpeg::wait_for_exit(pid, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_disconnect_before_first_output_kills_transcoder() {
        let fake = FakeFfmpeg::new("exec sleep 30");
        let base = serve(recorder_app(&fake)).await;

        let request = tokio::spawn(async move {
            reqwest::Client::new()
                .get(format!("{}/record", base))
                .query(&[("url", "http://127.0.0.1:9/live.m3u8"), ("format", "aac")])
                .send()
                .await
        });

        let pid = fake.wait_for_pid().await;
        assert!(is_running(pid));
        // Headers are still pending; aborting drops the client connection.
        request.abort();

        assert!(FakeFfmpeg::wait_for_exit(pid, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_concurrent_recordings_are_independent() {
        let fake = FakeFfmpeg::endless();
        let base = serve(recorder_app(&fake)).await;
        let client = reqwest::Client::new();

        let mut first = client
            .get(format!("{}/record", base))
            .query(&[("url", "http://127.0.0.1:9/one.m3u8"), ("format", "aac")])
            .send()
            .await
            .unwrap();
        assert!(first.chunk().await.unwrap().is_some());
        let first_pid = fake.wait_for_pids(1).await[0];

        let mut second = client
            .get(format!("{}/record", base))
            .query(&[("url", "http://127.0.0.1:9/two.m3u8"), ("format", "mp3")])
            .send()
            .await
            .unwrap();
        assert!(second.chunk().await.unwrap().is_some());
        let second_pid = fake.wait_for_pids(2).await[1];
        assert_ne!(first_pid, second_pid);

        drop(first);
        assert!(FakeFfmpeg::wait_for_exit(first_pid, Duration::from_secs(5)).await);

        assert!(is_running(second_pid));
        for _ in 0..3 {
            assert!(second.chunk().await.unwrap().is_some());
        }
    }
}
