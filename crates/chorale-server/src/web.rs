//! HTTP endpoints.
//!
//! Request bodies are read as raw bytes and go through the validation
//! boundary in `chorale::request`, so malformed JSON and schema violations
//! share one error format.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chorale::{
    evaluate, harmonize_to_midi, ChordDescriptor, EvaluateRequest, EvaluationResult,
    HarmonizeRequest, MidiParams, ReferenceLibrary, ReturnMode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifact::{ArtifactSink, NullSink};
use crate::error::ApiError;

/// Base name for persisted harmonize output.
pub const ARTIFACT_NAME: &str = "harmony_output.mid";
/// Filename offered to clients downloading the MIDI bytes.
pub const DOWNLOAD_NAME: &str = "harmony.mid";
pub const CHORD_INFO_HEADER: &str = "x-chord-info";

const DEFAULT_PLACEHOLDER_URL: &str = "https://example.com/generated/harmony.mid";
const URL_MODE_MESSAGE: &str = "URL mode not fully implemented in demo";

/// Shared, read-only state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub params: Arc<MidiParams>,
    pub references: Arc<ReferenceLibrary>,
    pub sink: Arc<dyn ArtifactSink>,
    pub placeholder_url: Arc<str>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(params: MidiParams, references: ReferenceLibrary) -> Self {
        Self {
            params: Arc::new(params),
            references: Arc::new(references),
            sink: Arc::new(NullSink),
            placeholder_url: Arc::from(DEFAULT_PLACEHOLDER_URL),
            start_time: Instant::now(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_placeholder_url(mut self, url: impl AsRef<str>) -> Self {
        self.placeholder_url = Arc::from(url.as_ref());
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_root))
        .route("/health", get(handle_health))
        .route("/api/v1/references", get(list_references))
        .route("/api/v1/harmonize", post(harmonize))
        .route("/api/v1/evaluate", post(evaluate_performance))
        .with_state(state)
}

async fn serve_root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Music Harmony API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/v1/harmonize",
            "/api/v1/evaluate",
            "/api/v1/references",
            "/health",
        ]
    }))
}

async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "references": state.references.len(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReferenceSummary {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReferenceList {
    pub references: Vec<ReferenceSummary>,
}

async fn list_references(State(state): State<AppState>) -> Json<ReferenceList> {
    let references = state
        .references
        .list()
        .into_iter()
        .map(|t| ReferenceSummary {
            id: t.id.clone(),
            name: t.name.clone(),
            description: t.description.clone(),
        })
        .collect();
    Json(ReferenceList { references })
}

/// Response body for `return_mode = "url"`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UrlResponse {
    pub url: String,
    pub message: String,
    pub chord_names: Vec<String>,
    pub chord_details: Vec<ChordDescriptor>,
}

#[tracing::instrument(name = "http.harmonize", skip_all)]
async fn harmonize(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request = HarmonizeRequest::from_json(&body)?.validate()?;
    info!(
        events = request.events.len(),
        duration_sec = request.duration_sec,
        "processing harmonize request"
    );

    let output = harmonize_to_midi(&request.events, request.duration_sec, &state.params)?;
    info!(
        bytes = output.midi.len(),
        chords = ?output.chords.iter().map(|c| c.chord_name.as_str()).collect::<Vec<_>>(),
        "generated MIDI"
    );

    persist_copy(Arc::clone(&state.sink), output.midi.clone()).await;

    match request.return_mode {
        ReturnMode::Bytes => {
            let chord_info = serde_json::to_string(&output.chords)
                .map_err(|e| ApiError::Internal(e.into()))?;
            let chord_header = HeaderValue::from_str(&chord_info)
                .map_err(|e| ApiError::Internal(e.into()))?;

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={}", DOWNLOAD_NAME),
                )
                .header(CHORD_INFO_HEADER, chord_header)
                .body(Body::from(output.midi))
                .map_err(|e| ApiError::Internal(e.into()))
        }
        ReturnMode::Url => {
            let chord_names = output.chords.iter().map(|c| c.chord_name.clone()).collect();
            let body = UrlResponse {
                url: state.placeholder_url.to_string(),
                message: URL_MODE_MESSAGE.to_string(),
                chord_names,
                chord_details: output.chords,
            };
            Ok(Json(body).into_response())
        }
    }
}

/// Save a copy through the sink on the blocking pool. Failures are logged only.
async fn persist_copy(sink: Arc<dyn ArtifactSink>, midi: Vec<u8>) {
    match tokio::task::spawn_blocking(move || sink.persist(ARTIFACT_NAME, &midi)).await {
        Ok(Ok(Some(path))) => info!(path = %path.display(), "saved MIDI copy"),
        Ok(Ok(None)) => {}
        Ok(Err(e)) => warn!(error = %e, "failed to save MIDI copy"),
        Err(e) => warn!(error = %e, "MIDI copy task did not complete"),
    }
}

#[tracing::instrument(name = "http.evaluate", skip_all)]
async fn evaluate_performance(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<EvaluationResult>, ApiError> {
    let request = EvaluateRequest::from_json(&body)?.validate()?;
    info!(
        events = request.events.len(),
        reference_id = %request.reference_id,
        "processing evaluate request"
    );

    let result = evaluate(
        &request.events,
        &request.reference_id,
        request.duration_sec,
        state.references.as_ref(),
    )?;
    info!(score = result.score, "evaluation complete");

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Request;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};
    use tower::ServiceExt;

    /// Records which thread each persist call ran on.
    #[derive(Default)]
    struct ThreadRecordingSink {
        threads: Mutex<Vec<ThreadId>>,
    }

    impl ArtifactSink for ThreadRecordingSink {
        fn persist(&self, _name: &str, _data: &[u8]) -> anyhow::Result<Option<PathBuf>> {
            self.threads.lock().unwrap().push(thread::current().id());
            Ok(None)
        }
    }

    fn app() -> Router {
        router(AppState::new(MidiParams::default(), ReferenceLibrary::builtin()))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_root_banner() {
        let (status, json) = get_json(app(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Music Harmony API is running");
        assert!(json["endpoints"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e == "/api/v1/harmonize"));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, json) = get_json(app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["references"], 1);
    }

    #[tokio::test]
    async fn test_list_references() {
        let (status, json) = get_json(app(), "/api/v1/references").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            serde_json::json!({
                "references": [{
                    "id": "exercise_c_major_01",
                    "name": "C Major Exercise 01",
                    "description": "Basic C major scale exercise"
                }]
            })
        );
    }

    #[tokio::test]
    async fn test_harmonize_rejects_malformed_body() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/harmonize")
                    .body(Body::from("{\"version\":"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error_code"], "validation_error");
        assert!(json["details"]["reason"].is_string());
    }

    #[tokio::test]
    async fn test_persist_runs_on_blocking_pool() {
        let sink = Arc::new(ThreadRecordingSink::default());
        let state = AppState::new(MidiParams::default(), ReferenceLibrary::builtin())
            .with_sink(sink.clone());

        let body = serde_json::json!({
            "version": "1.0",
            "mode": "harmonize",
            "duration_sec": 2,
            "quantize": "1s",
            "octave_base": "C4",
            "key": "C major",
            "events": [{"t_sec": 0, "note": 60}]
        });
        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/harmonize")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // current_thread runtime: the handler itself runs on this thread
        let threads = sink.threads.lock().unwrap().clone();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], thread::current().id());
    }
}
