//! HTTP-level tests for the native Gemini client.
//!
//! Each test binds a one-shot server on `127.0.0.1:0`, points
//! `api_base_url` at it, and checks both the request the client sends and
//! how the reply is mapped. No network access is needed.
//!
//! Run with:
//!   cargo test --test gemini_http

use edgequake_timetable::{
    parse_schedule_pdf, DayOfWeek, ExtractionConfig, GeminiModel, ScheduleDay, ScheduleError,
};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const FAKE_PDF: &[u8] = b"%PDF-1.4\n% timetable\n";

/// What the server saw.
struct Captured {
    head: String,
    body: Value,
}

impl Captured {
    fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }
}

/// Serve exactly one request with `status`, `extra_headers` and `body`.
async fn serve_once(
    status: &'static str,
    extra_headers: &'static str,
    body: String,
) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/v1beta", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim()
                    .eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let reply = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n{extra_headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(reply.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        Captured {
            head,
            body: serde_json::from_slice(&buf[header_end..header_end + content_length])
                .unwrap_or(Value::Null),
        }
    });

    (base_url, handle)
}

fn gemini_config(base_url: &str) -> ExtractionConfig {
    ExtractionConfig::builder()
        .api_key("test-key")
        .api_base_url(base_url)
        .model("gemini-1.5-flash")
        .build()
        .expect("valid config")
}

fn candidate_envelope(text: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }]
    })
    .to_string()
}

#[tokio::test]
async fn successful_call_sends_key_path_and_document() {
    let answer = r#"{"groupName":"dev-101","entries":[{"day":"Mercredi","timeSlot":"10:00-12:00","room":"B3","professor":"Mme Idrissi"}]}"#;
    let (base_url, server) = serve_once("200 OK", "", candidate_envelope(answer)).await;

    let group = parse_schedule_pdf(FAKE_PDF, "DEV101.pdf", &gemini_config(&base_url))
        .await
        .expect("extraction should succeed");
    assert_eq!(group.name, "DEV101");
    assert_eq!(group.entries.len(), 1);
    assert_eq!(group.entries[0].day, ScheduleDay::Known(DayOfWeek::Wednesday));
    assert_eq!(group.entries[0].room, "B3");

    let seen = server.await.unwrap();
    assert_eq!(
        seen.request_line(),
        "POST /v1beta/models/gemini-1.5-flash:generateContent HTTP/1.1"
    );
    assert_eq!(seen.header("x-goog-api-key"), Some("test-key"));

    let parts = &seen.body["contents"][0]["parts"];
    assert!(parts[0]["text"].as_str().unwrap().contains("DEV101.pdf"));
    assert_eq!(parts[1]["inlineData"]["mimeType"], "application/pdf");
    assert_eq!(
        parts[1]["inlineData"]["data"],
        edgequake_timetable::pipeline::encode::encode_pdf(FAKE_PDF).data.as_str()
    );
    assert_eq!(
        seen.body["generationConfig"]["responseMimeType"],
        "application/json"
    );
}

#[tokio::test]
async fn forbidden_maps_to_auth_error() {
    let body = r#"{"error":{"code":403,"message":"API key not valid. Please pass a valid API key.","status":"PERMISSION_DENIED"}}"#;
    let (base_url, server) = serve_once("403 Forbidden", "", body.to_string()).await;

    let err = parse_schedule_pdf(FAKE_PDF, "x.pdf", &gemini_config(&base_url))
        .await
        .unwrap_err();
    match err {
        ScheduleError::AuthError { provider, detail } => {
            assert_eq!(provider, "gemini");
            assert_eq!(detail, "API key not valid. Please pass a valid API key.");
        }
        other => panic!("expected AuthError, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn too_many_requests_keeps_retry_after() {
    let (base_url, server) =
        serve_once("429 Too Many Requests", "Retry-After: 7\r\n", "{}".to_string()).await;

    let model = GeminiModel::try_new(&gemini_config(&base_url)).unwrap();
    let err = edgequake_timetable::extract_with_model(
        &model,
        FAKE_PDF,
        "x.pdf",
        &gemini_config(&base_url),
    )
    .await
    .unwrap_err();
    assert!(
        matches!(
            err,
            ScheduleError::RateLimitExceeded {
                retry_after_secs: Some(7),
                ..
            }
        ),
        "got {err:?}"
    );
    server.await.unwrap();
}

#[tokio::test]
async fn unreachable_endpoint_is_external_service_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = parse_schedule_pdf(
        FAKE_PDF,
        "x.pdf",
        &gemini_config(&format!("http://{addr}/v1beta")),
    )
    .await
    .unwrap_err();
    match err {
        ScheduleError::ExternalService { provider, .. } => assert_eq!(provider, "gemini"),
        other => panic!("expected ExternalService, got {other:?}"),
    }
}
