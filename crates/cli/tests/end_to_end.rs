//! End-to-end runs of the batch workflow against a scripted API.

use std::path::Path;
use std::sync::Arc;

use assert_matches::assert_matches;
use clap::Parser;
use serde_json::json;

use rapid_cli::app::{run_with_api, RunOutcome};
use rapid_cli::args::Args;
use rapid_client::api::RapidPipelineApi;
use rapid_client::backend::Method;
use rapid_client::progress::NoProgress;
use rapid_client::testing::{Reply, ScriptedBackend};
use rapid_core::config::Credentials;
use rapid_core::preset::{Preset, PresetSet};

const BASE: &str = "https://api.test/v2/";
const PUT_URL: &str = "https://s3.test/put/11";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn args(extra: &[&str]) -> Args {
    let argv = ["rapid-cli", "-b", BASE].iter().chain(extra.iter()).copied();
    Args::try_parse_from(argv).unwrap()
}

fn api(backend: &Arc<ScriptedBackend>) -> RapidPipelineApi<Arc<ScriptedBackend>> {
    let credentials = Credentials::new("token").unwrap();
    RapidPipelineApi::new(Arc::clone(backend), BASE, &credentials)
        .with_progress(Arc::new(NoProgress))
}

fn presets(entries: &[(&str, Preset)]) -> PresetSet {
    entries
        .iter()
        .map(|(name, preset)| (name.to_string(), preset.clone()))
        .collect()
}

fn lod_preset() -> PresetSet {
    presets(&[("lod", Preset::Config { config: json!({ "lod": 1 }) })])
}

fn url(path: &str) -> String {
    format!("{BASE}{path}")
}

fn write_model(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, b"model-bytes").unwrap();
    path.to_string_lossy().into_owned()
}

/// Script a successful upload of asset 11.
fn script_upload(backend: &ScriptedBackend) {
    backend.on(
        Method::Post,
        &url("rawmodel/api-upload/start"),
        [Reply::json(json!({
            "id": 11,
            "links": { "s3_upload_urls": { "rapid.glb": PUT_URL } }
        }))],
    );
    backend.on(Method::Put, PUT_URL, [Reply::bytes("")]);
    backend.on(Method::Get, &url("rawmodel/11/api-upload/complete"), [Reply::json(json!({}))]);
    backend.on(
        Method::Get,
        &url("rawmodel/11"),
        [Reply::json(json!({ "data": { "upload_status": "complete" } }))],
    );
    backend.on(Method::Delete, &url("rawmodel/11"), [Reply::json(json!({}))]);
}

/// Script a job that is queued once, then done with one glb download.
fn script_job(backend: &ScriptedBackend, asset_id: i64, job_id: i64) {
    let artifact = format!("https://cdn.test/{job_id}/1_glb/model.glb");
    backend.on(
        Method::Post,
        &url(&format!("rawmodel/optimize/{asset_id}")),
        [Reply::json(json!({ "id": job_id }))],
    );
    backend.on(
        Method::Get,
        &url(&format!("rapidmodel/{job_id}")),
        [
            Reply::json(json!({ "data": { "optimization_status": "sent_to_queue", "progress": 50 } })),
            Reply::json(json!({ "data": {
                "optimization_status": "done",
                "progress": 100,
                "downloads": { "all": { "glb": artifact } }
            } })),
        ],
    );
    backend.on(Method::Get, &artifact, [Reply::bytes("GLB")]);
    backend.on(Method::Delete, &url(&format!("rapidmodel/{job_id}")), [Reply::json(json!({}))]);
}

// ---------------------------------------------------------------------------
// Test: local file, one config preset, cleanup
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn local_file_full_cycle_with_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path(), "chair.glb");
    let out = dir.path().join("out");
    let out_arg = out.to_string_lossy().into_owned();

    let backend = Arc::new(ScriptedBackend::new());
    script_upload(&backend);
    script_job(&backend, 11, 900);

    let outcome = run_with_api(
        &args(&["-o", out_arg.as_str(), model.as_str()]),
        lod_preset(),
        api(&backend),
    )
    .await;

    assert_matches!(outcome, RunOutcome::Completed(ref s) if s.failures == 0 && s.inputs == 1);
    assert_eq!(backend.count(Method::Post, &url("rawmodel/api-upload/start")), 1);
    assert_eq!(backend.count(Method::Put, PUT_URL), 1);
    assert_eq!(backend.count(Method::Get, &url("rawmodel/11/api-upload/complete")), 1);
    assert_eq!(backend.count(Method::Post, &url("rawmodel/optimize/11")), 1);
    assert_eq!(backend.count(Method::Get, &url("rapidmodel/900")), 2);
    assert_eq!(backend.count(Method::Get, "https://cdn.test/900/1_glb/model.glb"), 1);
    assert_eq!(backend.count(Method::Delete, &url("rawmodel/11")), 1);
    assert_eq!(backend.count(Method::Delete, &url("rapidmodel/900")), 1);
    assert_eq!(std::fs::read(out.join("chair_lod_1.glb")).unwrap(), b"GLB");

    let requests = backend.requests();
    let start = &requests[0];
    let sent: serde_json::Value = serde_json::from_slice(start.body.as_ref().unwrap()).unwrap();
    assert_eq!(sent, json!({ "filenames": ["rapid.glb"], "model_name": "chair" }));
}

#[tokio::test(start_paused = true)]
async fn label_names_upload_and_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path(), "chair.glb");
    let out = dir.path().join("out");
    let out_arg = out.to_string_lossy().into_owned();

    let backend = Arc::new(ScriptedBackend::new());
    script_upload(&backend);
    script_job(&backend, 11, 900);

    let outcome = run_with_api(
        &args(&["-l", "armchair", "-o", out_arg.as_str(), model.as_str()]),
        lod_preset(),
        api(&backend),
    )
    .await;

    assert_eq!(outcome.failures(), 0);
    assert!(out.join("armchair_lod_1.glb").is_file());
    let sent: serde_json::Value =
        serde_json::from_slice(backend.requests()[0].body.as_ref().unwrap()).unwrap();
    assert_eq!(sent["model_name"], "armchair");
}

#[tokio::test(start_paused = true)]
async fn no_cleanup_leaves_server_assets() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path(), "chair.glb");
    let out_arg = dir.path().join("out").to_string_lossy().into_owned();

    let backend = Arc::new(ScriptedBackend::new());
    script_upload(&backend);
    script_job(&backend, 11, 900);

    let outcome = run_with_api(
        &args(&["--no-cleanup", "-o", out_arg.as_str(), model.as_str()]),
        lod_preset(),
        api(&backend),
    )
    .await;

    assert_eq!(outcome.failures(), 0);
    assert!(backend.requests().iter().all(|r| r.method != Method::Delete));
}

// ---------------------------------------------------------------------------
// Test: base asset references
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn base_asset_reference_skips_upload_and_keeps_asset() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let out_arg = out.to_string_lossy().into_owned();

    let backend = Arc::new(ScriptedBackend::new());
    script_job(&backend, 42, 901);

    let outcome = run_with_api(
        &args(&["-o", out_arg.as_str(), "42.id"]),
        lod_preset(),
        api(&backend),
    )
    .await;

    assert_eq!(outcome.failures(), 0);
    assert_eq!(backend.count(Method::Post, &url("rawmodel/api-upload/start")), 0);
    assert!(backend.requests().iter().all(|r| r.method != Method::Put));
    assert_eq!(backend.count(Method::Post, &url("rawmodel/optimize/42")), 1);
    assert_eq!(backend.count(Method::Delete, &url("rapidmodel/901")), 1);
    assert_eq!(backend.count(Method::Delete, &url("rawmodel/42")), 0);
    assert!(out.join("42_lod_1.glb").is_file());
}

#[tokio::test(start_paused = true)]
async fn invalid_base_asset_reference_fails_without_network() {
    let backend = Arc::new(ScriptedBackend::new());

    let outcome = run_with_api(&args(&["abc.id"]), lod_preset(), api(&backend)).await;

    assert_matches!(outcome, RunOutcome::Completed(ref s) if s.failures == 1);
    assert!(backend.requests().is_empty());
}

// ---------------------------------------------------------------------------
// Test: failure accounting
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn failed_preset_does_not_stop_the_next_one() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path(), "chair.glb");
    let out_arg = dir.path().join("out").to_string_lossy().into_owned();

    let backend = Arc::new(ScriptedBackend::new());
    script_upload(&backend);
    script_job(&backend, 11, 901);
    // The first preset is submitted first and gets job 900, which fails.
    backend.on(
        Method::Post,
        &url("rawmodel/optimize/11"),
        [
            Reply::json(json!({ "id": 900 })),
            Reply::json(json!({ "id": 901 })),
        ],
    );
    backend.on(
        Method::Get,
        &url("rapidmodel/900"),
        [Reply::json(json!({ "data": { "optimization_status": "failed" } }))],
    );

    let set = presets(&[
        ("broken", Preset::Id { preset_id: 1 }),
        ("lod", Preset::Config { config: json!({ "lod": 1 }) }),
    ]);
    let outcome = run_with_api(
        &args(&["-o", out_arg.as_str(), model.as_str()]),
        set,
        api(&backend),
    )
    .await;

    assert_matches!(outcome, RunOutcome::Completed(ref s) if s.failures == 1);
    assert_eq!(backend.count(Method::Post, &url("rawmodel/optimize/11")), 2);
    // Only the finished job is cleaned up, along with the uploaded asset.
    assert_eq!(backend.count(Method::Delete, &url("rapidmodel/900")), 0);
    assert_eq!(backend.count(Method::Delete, &url("rapidmodel/901")), 1);
    assert_eq!(backend.count(Method::Delete, &url("rawmodel/11")), 1);
}

#[tokio::test(start_paused = true)]
async fn poll_failure_counts_once_and_job_is_not_deleted() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path(), "chair.glb");
    let out_arg = dir.path().join("out").to_string_lossy().into_owned();

    let backend = Arc::new(ScriptedBackend::new());
    script_upload(&backend);
    backend.on(Method::Post, &url("rawmodel/optimize/11"), [Reply::json(json!({ "id": 905 }))]);
    backend.on(
        Method::Get,
        &url("rapidmodel/905"),
        [
            Reply::json(json!({ "data": { "optimization_status": "sent_to_queue", "progress": 5 } })),
            Reply::network("connection reset"),
        ],
    );
    backend.on(Method::Delete, &url("rapidmodel/905"), [Reply::json(json!({}))]);

    let outcome = run_with_api(
        &args(&["-o", out_arg.as_str(), model.as_str()]),
        lod_preset(),
        api(&backend),
    )
    .await;

    assert_matches!(outcome, RunOutcome::Completed(ref s) if s.failures == 1);
    assert_eq!(backend.count(Method::Get, &url("rapidmodel/905")), 2);
    assert_eq!(backend.count(Method::Delete, &url("rapidmodel/905")), 0);
    assert_eq!(backend.count(Method::Delete, &url("rawmodel/11")), 1);
}

#[tokio::test(start_paused = true)]
async fn finished_job_without_downloads_is_still_cleaned_up() {
    let dir = tempfile::tempdir().unwrap();
    let out_arg = dir.path().join("out").to_string_lossy().into_owned();

    let backend = Arc::new(ScriptedBackend::new());
    backend.on(Method::Post, &url("rawmodel/optimize/42"), [Reply::json(json!({ "id": 906 }))]);
    backend.on(
        Method::Get,
        &url("rapidmodel/906"),
        [Reply::json(json!({ "data": { "optimization_status": "done" } }))],
    );
    backend.on(Method::Delete, &url("rapidmodel/906"), [Reply::json(json!({}))]);

    let outcome = run_with_api(
        &args(&["-o", out_arg.as_str(), "42.id"]),
        lod_preset(),
        api(&backend),
    )
    .await;

    assert_eq!(outcome.failures(), 1);
    assert_eq!(backend.count(Method::Delete, &url("rapidmodel/906")), 1);
    assert_eq!(backend.count(Method::Delete, &url("rawmodel/42")), 0);
}

#[tokio::test(start_paused = true)]
async fn upload_failure_skips_presets() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path(), "chair.glb");

    let backend = Arc::new(ScriptedBackend::new());
    backend.on(
        Method::Post,
        &url("rawmodel/api-upload/start"),
        [Reply::status(500, json!({ "message": "boom" }))],
    );

    let outcome = run_with_api(&args(&[model.as_str()]), lod_preset(), api(&backend)).await;

    assert_eq!(outcome.failures(), 1);
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn directory_inputs_fail_independently() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "a.glb");
    write_model(dir.path(), "b.glb");
    let dir_arg = dir.path().to_string_lossy().into_owned();

    let backend = Arc::new(ScriptedBackend::new());
    backend.on(
        Method::Post,
        &url("rawmodel/api-upload/start"),
        [Reply::status(500, json!({}))],
    );

    let outcome = run_with_api(&args(&[dir_arg.as_str()]), lod_preset(), api(&backend)).await;

    assert_matches!(outcome, RunOutcome::Completed(ref s) if s.inputs == 2 && s.failures == 2);
    assert_eq!(backend.count(Method::Post, &url("rawmodel/api-upload/start")), 2);
}

#[tokio::test(start_paused = true)]
async fn exit_on_error_stops_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_model(dir.path(), "a.glb");
    write_model(dir.path(), "b.glb");
    let dir_arg = dir.path().to_string_lossy().into_owned();

    let backend = Arc::new(ScriptedBackend::new());
    backend.on(
        Method::Post,
        &url("rawmodel/api-upload/start"),
        [Reply::status(500, json!({}))],
    );

    let outcome = run_with_api(&args(&["-e", dir_arg.as_str()]), lod_preset(), api(&backend)).await;

    assert_matches!(outcome, RunOutcome::Aborted(ref a) if a.failures == 1);
    assert_eq!(backend.count(Method::Post, &url("rawmodel/api-upload/start")), 1);
}

#[tokio::test(start_paused = true)]
async fn exit_on_error_skips_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path(), "chair.glb");
    let out_arg = dir.path().join("out").to_string_lossy().into_owned();

    let backend = Arc::new(ScriptedBackend::new());
    script_upload(&backend);
    backend.on(
        Method::Post,
        &url("rawmodel/optimize/11"),
        [Reply::status(422, json!({ "message": "Invalid preset" }))],
    );

    let outcome = run_with_api(
        &args(&["-e", "-o", out_arg.as_str(), model.as_str()]),
        lod_preset(),
        api(&backend),
    )
    .await;

    assert_matches!(outcome, RunOutcome::Aborted(_));
    assert!(backend.requests().iter().all(|r| r.method != Method::Delete));
}
