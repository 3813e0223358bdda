use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use canvas_adapters::{BlobLocator, BlobStore, PlaceholderSynthesizer, ProofSynthesizer, SynthesisInput, UploadError};
use canvas_core::{Artifact, ArtifactStore, InMemoryArtifactStore, JobId, JobState, StoreError};
use canvas_persistence::FsArtifactStore;
use canvas_policies::PasteRatioPolicy;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::sync::Notify;
use tower::ServiceExt;
use truecanvas::config::JobsConfig;
use truecanvas::jobs::{DispatchOutcome, JobCounts};
use truecanvas::{api, AppParts, AppState};

const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
const GIF_URI: &str = "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";
const AGGREGATOR: &str = "https://aggregator.test/v1/";

fn png_uri() -> String {
    format!("data:image/png;base64,{PNG_B64}")
}

// ---------------------------------------------------------------------------
// Colaboradores falsos
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeBlobStore {
    uploads: AtomicUsize,
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn store_blob(&self, bytes: Vec<u8>, _content_type: &str) -> Result<BlobLocator, UploadError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        let blob_id = format!("blob-{n}-{}", bytes.len());
        Ok(BlobLocator { uri: format!("{AGGREGATOR}{blob_id}"),
                         blob_id })
    }
}

/// Sintetizador que espera a que el test abra la compuerta.
#[derive(Default)]
struct GatedSynth {
    gate: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl ProofSynthesizer for GatedSynth {
    async fn synthesize(&self, input: SynthesisInput<'_>) -> Artifact {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        PlaceholderSynthesizer::derive(input)
    }
}

struct StuckSynth;

#[async_trait]
impl ProofSynthesizer for StuckSynth {
    async fn synthesize(&self, input: SynthesisInput<'_>) -> Artifact {
        tokio::time::sleep(Duration::from_secs(30)).await;
        PlaceholderSynthesizer::derive(input)
    }
}

/// Registry que rechaza toda escritura.
struct ReadOnlyStore;

impl ArtifactStore for ReadOnlyStore {
    fn put(&self, _job_id: &JobId, _artifact: &Artifact) -> Result<bool, StoreError> {
        Err(StoreError::Io("read-only file system".into()))
    }

    fn get(&self, job_id: &JobId) -> Result<Artifact, StoreError> {
        Err(StoreError::NotFound(job_id.to_string()))
    }

    fn exists(&self, _job_id: &JobId) -> Result<bool, StoreError> {
        Ok(false)
    }
}

struct Harness {
    state: AppState,
    app: Router,
    blobs: Arc<FakeBlobStore>,
}

fn harness_with(store: Arc<dyn ArtifactStore>, synth: Arc<dyn ProofSynthesizer>, marker: &str, jobs: JobsConfig) -> Harness {
    let blobs = Arc::new(FakeBlobStore::default());
    let state = AppState::from_parts(AppParts { store,
                                                policy: Arc::new(PasteRatioPolicy::new(marker)),
                                                blobs: blobs.clone(),
                                                probe: None,
                                                synth,
                                                jobs });
    Harness { app: api::router(state.clone()),
              state,
              blobs }
}

fn harness(synth: Arc<dyn ProofSynthesizer>) -> Harness {
    harness_with(Arc::new(InMemoryArtifactStore::new()), synth, "paste", JobsConfig::default())
}

// ---------------------------------------------------------------------------
// Helpers HTTP
// ---------------------------------------------------------------------------

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

async fn post_verify(app: &Router, image: &str, logs: &str) -> Value {
    let req = Request::builder().method(Method::POST)
                                .uri("/verify")
                                .header(header::CONTENT_TYPE, "application/json")
                                .body(Body::from(json!({"image": image, "logs": logs}).to_string()))
                                .unwrap();
    let (status, _, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

async fn get_status(app: &Router, image_id: &str) -> Value {
    let req = Request::builder().uri(format!("/proof_status?imageID={image_id}"))
                                .body(Body::empty())
                                .unwrap();
    let (status, _, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

async fn wait_proven(app: &Router, image_id: &str) -> Value {
    for _ in 0..500 {
        let body = get_status(app, image_id).await;
        if body["proofStatus"] == "proven" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {image_id} never proven");
}

fn job_id(v: &Value) -> JobId {
    JobId::parse(v["imageID"].as_str().unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Flujos
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verified_png_goes_from_unproven_to_proven_once() {
    let synth = Arc::new(GatedSynth::default());
    let h = harness(synth.clone());

    // 29 bytes, 5 apariciones: 6 < 29, legítimo
    let resp = post_verify(&h.app, &png_uri(), "paste paste paste paste paste").await;
    let expected = format!("{:x}", Sha256::digest(STANDARD.decode(PNG_B64).unwrap()));
    assert_eq!(resp, json!({"verificationStatus": "verified", "imageID": expected}));

    let before = get_status(&h.app, &expected).await;
    assert_eq!(before["proofStatus"], "unproven");
    assert_eq!(before["ZKproof"], json!({"sourceHash": "", "destHash": "", "proof": [], "walrusURI": ""}));
    assert!(before["jobState"] == "pending" || before["jobState"] == "running");

    synth.gate.notify_one();
    let after = wait_proven(&h.app, &expected).await;
    assert_eq!(after["jobState"], "completed");
    assert!(after["ZKproof"]["walrusURI"].as_str().unwrap().starts_with(AGGREGATOR));
    assert!(!after["ZKproof"]["sourceHash"].as_str().unwrap().is_empty());
    assert_eq!(after["ZKproof"]["proof"].as_array().unwrap().len(), 3);

    // nunca vuelve atrás y no se relanza
    assert_eq!(get_status(&h.app, &expected).await, after);
    post_verify(&h.app, &png_uri(), "").await;
    assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.blobs.uploads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn saturated_logs_are_unverified_and_nothing_runs() {
    let store = Arc::new(InMemoryArtifactStore::new());
    let h = harness_with(store.clone(), Arc::new(PlaceholderSynthesizer::default()), "x", JobsConfig::default());

    let resp = post_verify(&h.app, &png_uri(), "XxXx").await;
    assert_eq!(resp, json!({"verificationStatus": "unverified", "imageID": ""}));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.is_empty());
    assert_eq!(h.blobs.uploads.load(Ordering::SeqCst), 0);
    assert_eq!(h.state.jobs.counts().pending + h.state.jobs.counts().running, 0);
}

#[tokio::test]
async fn default_marker_never_rejects_non_empty_logs() {
    let h = harness(Arc::new(PlaceholderSynthesizer::default()));
    let resp = post_verify(&h.app, &png_uri(), "pastepastepaste").await;
    assert_eq!(resp["verificationStatus"], "verified");
}

#[tokio::test]
async fn gif_image_completes_with_empty_locator() {
    let h = harness(Arc::new(PlaceholderSynthesizer::default()));
    let resp = post_verify(&h.app, GIF_URI, "drawn by hand").await;
    let id = resp["imageID"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 64);

    let proven = wait_proven(&h.app, &id).await;
    assert_eq!(proven["ZKproof"]["walrusURI"], "");
    assert_eq!(h.blobs.uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_image_id_gets_plain_text_prompt() {
    let h = harness(Arc::new(PlaceholderSynthesizer::default()));
    for uri in ["/proof_status", "/proof_status?imageID="] {
        let (status, _, body) = send(&h.app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"You need to include an 'imageID'");
    }

    let unknown = get_status(&h.app, "not-a-real-id").await;
    assert_eq!(unknown["proofStatus"], "unproven");
    assert_eq!(unknown["jobState"], "unknown");
}

#[tokio::test]
async fn multi_megabyte_images_are_accepted() {
    let h = harness(Arc::new(PlaceholderSynthesizer::default()));
    // 4 MiB de base64, el doble del tope por defecto de axum
    let image = format!("data:image/png;base64,{}", "A".repeat(4 * 1024 * 1024));
    let resp = post_verify(&h.app, &image, "drawn by hand").await;
    assert_eq!(resp["verificationStatus"], "verified");
    wait_proven(&h.app, resp["imageID"].as_str().unwrap()).await;
}

#[tokio::test]
async fn bodies_over_the_configured_limit_are_rejected() {
    let h = harness(Arc::new(PlaceholderSynthesizer::default()));
    let app = api::router(h.state.clone().with_max_body_bytes(Some(1024)));
    let body = json!({"image": format!("data:image/png;base64,{}", "A".repeat(4096)), "logs": ""}).to_string();
    let req = Request::builder().method(Method::POST)
                                .uri("/verify")
                                .header(header::CONTENT_TYPE, "application/json")
                                .body(Body::from(body))
                                .unwrap();
    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(h.state.jobs.counts(), JobCounts::default());
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let h = harness(Arc::new(PlaceholderSynthesizer::default()));
    let req = Request::builder().method(Method::POST)
                                .uri("/verify")
                                .body(Body::from("{ nope"))
                                .unwrap();
    let (status, _, body) = send(&h.app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8_lossy(&body).contains("invalid request body"));
}

#[tokio::test]
async fn cors_is_open_on_every_route() {
    let h = harness(Arc::new(PlaceholderSynthesizer::default()));
    for uri in ["/", "/proof_status?imageID=abc", "/health"] {
        let req = Request::builder().uri(uri)
                                    .header(header::ORIGIN, "https://canvas.example")
                                    .body(Body::empty())
                                    .unwrap();
        let (_, headers, _) = send(&h.app, req).await;
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*", "route {uri}");
    }

    let preflight = Request::builder().method(Method::OPTIONS)
                                      .uri("/verify")
                                      .header(header::ORIGIN, "https://canvas.example")
                                      .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                                      .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                                      .body(Body::empty())
                                      .unwrap();
    let (status, headers, _) = send(&h.app, preflight).await;
    assert_eq!(status, StatusCode::OK);
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap().to_string();
    for m in ["GET", "POST", "PUT", "DELETE", "OPTIONS"] {
        assert!(methods.contains(m), "{methods}");
    }
    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS].to_str().unwrap().to_ascii_lowercase();
    assert!(allowed.contains("content-type") && allowed.contains("authorization"));
}

#[tokio::test]
async fn ancillary_routes_answer() {
    let h = harness(Arc::new(PlaceholderSynthesizer::default()));
    let (_, _, body) = send(&h.app, Request::builder().uri("/").body(Body::empty()).unwrap()).await;
    assert_eq!(&body[..], b"Hello, World!");
    let (_, _, body) = send(&h.app, Request::builder().uri("/available_contracts").body(Body::empty()).unwrap()).await;
    assert_eq!(&body[..], b"Available Contracts");
    let (status, _, body) = send(&h.app, Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["jobs"]["running"], 0);

    let (status, _, _) = send(&h.app, Request::builder().uri("/verify").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

// ---------------------------------------------------------------------------
// Ciclo de vida de jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_identical_submissions_spawn_one_worker() {
    let synth = Arc::new(GatedSynth::default());
    let h = harness(synth.clone());

    let mut handles = Vec::new();
    for _ in 0..10 {
        let app = h.app.clone();
        handles.push(tokio::spawn(async move { post_verify(&app, &png_uri(), "sketch").await }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap()["imageID"].as_str().unwrap().to_string());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    wait_until(|| synth.calls.load(Ordering::SeqCst) == 1).await;
    synth.gate.notify_one();
    wait_proven(&h.app, &ids[0]).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pool_keeps_extra_jobs_pending() {
    let synth = Arc::new(GatedSynth::default());
    let h = harness_with(Arc::new(InMemoryArtifactStore::new()),
                         synth.clone(),
                         "paste",
                         JobsConfig { max_concurrent: 1,
                                      ..JobsConfig::default() });
    let a = job_id(&post_verify(&h.app, &png_uri(), "a").await);
    let b = job_id(&post_verify(&h.app, GIF_URI, "b").await);

    let jobs = h.state.jobs.clone();
    wait_until(|| jobs.counts().running == 1).await;
    assert_eq!(jobs.counts().pending, 1);

    synth.gate.notify_one();
    wait_until(|| jobs.counts().completed == 1).await;
    wait_until(|| jobs.counts().running == 1).await;
    synth.gate.notify_one();
    wait_until(|| jobs.counts().completed == 2).await;
    assert_eq!(jobs.state(&a), Some(JobState::Completed));
    assert_eq!(jobs.state(&b), Some(JobState::Completed));
}

#[tokio::test]
async fn timed_out_job_fails_and_can_be_resubmitted() {
    let h = harness_with(Arc::new(InMemoryArtifactStore::new()),
                         Arc::new(StuckSynth),
                         "paste",
                         JobsConfig { timeout: Duration::from_millis(50),
                                      ..JobsConfig::default() });
    let id = job_id(&post_verify(&h.app, &png_uri(), "sketch").await);

    let jobs = h.state.jobs.clone();
    wait_until(|| jobs.state(&id) == Some(JobState::Failed)).await;
    let record = jobs.snapshot(&id).unwrap();
    assert!(record.error.unwrap().contains("timed out"));
    let status = get_status(&h.app, id.as_str()).await;
    assert_eq!(status["proofStatus"], "unproven");
    assert_eq!(status["jobState"], "failed");

    assert_eq!(jobs.dispatch(id.clone(), png_uri()).await.unwrap(), DispatchOutcome::Spawned { attempt: 2 });
    assert_eq!(jobs.snapshot(&id).unwrap().attempt, 2);
}

#[tokio::test]
async fn cancel_fails_a_running_job() {
    let synth = Arc::new(GatedSynth::default());
    let h = harness(synth.clone());
    let id = job_id(&post_verify(&h.app, &png_uri(), "sketch").await);

    let jobs = h.state.jobs.clone();
    wait_until(|| synth.calls.load(Ordering::SeqCst) == 1).await;
    assert!(jobs.cancel(&id));
    wait_until(|| jobs.state(&id) == Some(JobState::Failed)).await;
    assert_eq!(jobs.snapshot(&id).unwrap().error.as_deref(), Some("cancelled"));
    assert!(!jobs.cancel(&id));
    assert!(!h.state.store().exists(&id).unwrap());
}

#[tokio::test]
async fn shutdown_cancels_live_jobs_and_refuses_new_ones() {
    let synth = Arc::new(GatedSynth::default());
    let h = harness(synth.clone());
    let id = job_id(&post_verify(&h.app, &png_uri(), "sketch").await);
    wait_until(|| synth.calls.load(Ordering::SeqCst) == 1).await;

    h.state.jobs.shutdown().await;
    assert_eq!(h.state.jobs.state(&id), Some(JobState::Failed));
    assert_eq!(h.state.jobs.dispatch(canvas_core::fingerprint(b"late"), GIF_URI.to_string()).await.unwrap(),
               DispatchOutcome::ShuttingDown);
}

#[tokio::test]
async fn filesystem_registry_serves_completed_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsArtifactStore::open(dir.path()).unwrap());
    let h = harness_with(store.clone(), Arc::new(PlaceholderSynthesizer::default()), "paste", JobsConfig::default());

    let id = job_id(&post_verify(&h.app, &png_uri(), "sketch").await);
    let proven = wait_proven(&h.app, id.as_str()).await;
    assert_eq!(store.list_job_ids().unwrap(), vec![id.clone()]);

    // un servidor nuevo sobre el mismo directorio ve el resultado
    let reopened = harness_with(Arc::new(FsArtifactStore::open(dir.path()).unwrap()),
                                Arc::new(PlaceholderSynthesizer::default()),
                                "paste",
                                JobsConfig::default());
    assert_eq!(get_status(&reopened.app, id.as_str()).await["ZKproof"], proven["ZKproof"]);
    assert_eq!(reopened.state.jobs.dispatch(id, png_uri()).await.unwrap(), DispatchOutcome::AlreadyProven);
}

#[tokio::test]
async fn corrupt_registry_record_is_a_server_error_for_that_id_only() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsArtifactStore::open(dir.path()).unwrap());
    let broken = canvas_core::fingerprint(b"broken");
    std::fs::write(dir.path().join(format!("{broken}___manual")), b"{ not json").unwrap();
    let h = harness_with(store, Arc::new(PlaceholderSynthesizer::default()), "paste", JobsConfig::default());

    let req = Request::builder().uri(format!("/proof_status?imageID={broken}"))
                                .body(Body::empty())
                                .unwrap();
    let (status, headers, body) = send(&h.app, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("serialization failure") && text.contains(broken.as_str()), "{text}");

    // los demás ids del mismo directorio siguen sirviéndose
    let id = job_id(&post_verify(&h.app, &png_uri(), "sketch").await);
    assert_eq!(wait_proven(&h.app, id.as_str()).await["jobState"], "completed");
}

#[tokio::test]
async fn registry_write_failure_fails_the_job() {
    let h = harness_with(Arc::new(ReadOnlyStore),
                         Arc::new(PlaceholderSynthesizer::default()),
                         "paste",
                         JobsConfig::default());
    let id = job_id(&post_verify(&h.app, &png_uri(), "sketch").await);

    let jobs = h.state.jobs.clone();
    wait_until(|| jobs.state(&id) == Some(JobState::Failed)).await;
    let error = jobs.snapshot(&id).unwrap().error.unwrap();
    assert!(error.starts_with("registry write failed"), "{error}");
    assert!(error.contains("read-only file system"), "{error}");
    // la subida sí ocurrió; sólo el commit falló
    assert_eq!(h.blobs.uploads.load(Ordering::SeqCst), 1);

    let status = get_status(&h.app, id.as_str()).await;
    assert_eq!(status["proofStatus"], "unproven");
    assert_eq!(status["jobState"], "failed");
}

#[tokio::test]
async fn finished_records_are_pruned_after_retention() {
    let h = harness_with(Arc::new(InMemoryArtifactStore::new()),
                         Arc::new(PlaceholderSynthesizer::default()),
                         "paste",
                         JobsConfig { retention: Duration::ZERO,
                                      ..JobsConfig::default() });
    let jobs = h.state.jobs.clone();
    let first = job_id(&post_verify(&h.app, &png_uri(), "a").await);
    wait_until(|| jobs.state(&first) == Some(JobState::Completed)).await;

    // el siguiente despacho barre el registro terminado
    let second = job_id(&post_verify(&h.app, GIF_URI, "b").await);
    assert_eq!(jobs.state(&first), None);
    // el registry sigue respondiendo por el job podado
    let status = get_status(&h.app, first.as_str()).await;
    assert_eq!(status["proofStatus"], "proven");
    assert_eq!(status["jobState"], "completed");

    wait_until(|| jobs.state(&second) == Some(JobState::Completed)).await;
    assert_eq!(jobs.prune_expired(), 1);
    assert_eq!(jobs.counts(), JobCounts::default());
}

#[tokio::test]
async fn default_retention_keeps_finished_records() {
    let h = harness(Arc::new(PlaceholderSynthesizer::default()));
    let jobs = h.state.jobs.clone();
    let id = job_id(&post_verify(&h.app, &png_uri(), "a").await);
    wait_until(|| jobs.state(&id) == Some(JobState::Completed)).await;
    post_verify(&h.app, GIF_URI, "b").await;
    assert_eq!(jobs.prune_expired(), 0);
    assert_eq!(jobs.state(&id), Some(JobState::Completed));
}
