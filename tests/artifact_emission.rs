//! Artifact emission against a real filesystem target.

use std::{fs, path::PathBuf};

use sha2::{Digest, Sha256};
use tempfile::TempDir;
use vetrina::{
    application::cache_policy::{
        self, CachingManifest, MANIFEST_FILE, RegistrationMode, WORKER_FILE,
    },
    infra::error::InfraError,
};

fn manifest(enabled: bool, output_target: PathBuf) -> CachingManifest {
    CachingManifest {
        enabled,
        registration: RegistrationMode::Auto,
        output_target,
    }
}

#[test]
fn enabled_manifest_emits_both_artifacts() {
    let dir = TempDir::new().expect("tempdir");
    cache_policy::emit_artifacts(&manifest(true, dir.path().to_path_buf()))
        .expect("emission should succeed");

    let worker = fs::read_to_string(dir.path().join(WORKER_FILE)).expect("worker emitted");
    assert!(worker.contains("self.skipWaiting()"));
    assert!(worker.contains(MANIFEST_FILE));

    let raw = fs::read_to_string(dir.path().join(MANIFEST_FILE)).expect("manifest emitted");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("manifest is json");
    assert_eq!(parsed["registration"], "auto");
    assert!(parsed["generated_at"].as_str().is_some());

    let entries = parsed["entries"].as_array().expect("entries array");
    assert!(!entries.is_empty());
    for entry in entries {
        let url = entry["url"].as_str().expect("entry url");
        assert!(url.starts_with("/assets/"), "url: {url}");
        let revision = entry["revision"].as_str().expect("entry revision");
        assert_eq!(revision.len(), 64, "revision: {revision}");
    }
}

#[test]
fn revisions_hash_the_embedded_contents() {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let stylesheet = fs::read(root.join("static/app.css")).expect("bundled stylesheet on disk");
    let expected = hex::encode(Sha256::digest(&stylesheet));

    let entry = cache_policy::precache_entries()
        .iter()
        .find(|entry| entry.url == "/assets/app.css")
        .expect("stylesheet should be precached");
    assert_eq!(entry.revision, expected);
}

#[test]
fn repeated_emission_is_stable() {
    let first_dir = TempDir::new().expect("tempdir");
    let second_dir = TempDir::new().expect("tempdir");
    cache_policy::emit_artifacts(&manifest(true, first_dir.path().to_path_buf()))
        .expect("first emission");
    cache_policy::emit_artifacts(&manifest(true, second_dir.path().to_path_buf()))
        .expect("second emission");

    let first_worker = fs::read(first_dir.path().join(WORKER_FILE)).expect("first worker");
    let second_worker = fs::read(second_dir.path().join(WORKER_FILE)).expect("second worker");
    assert_eq!(first_worker, second_worker);

    let first: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(first_dir.path().join(MANIFEST_FILE)).unwrap())
            .expect("first manifest");
    let second: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(second_dir.path().join(MANIFEST_FILE)).unwrap())
            .expect("second manifest");
    assert_eq!(first["entries"], second["entries"]);
    assert_eq!(first["registration"], second["registration"]);
}

#[test]
fn disabled_manifest_emits_nothing_and_preserves_existing_artifacts() {
    let dir = TempDir::new().expect("tempdir");
    let stale = dir.path().join(WORKER_FILE);
    fs::write(&stale, "stale").expect("stale artifact should write");

    cache_policy::emit_artifacts(&manifest(false, dir.path().to_path_buf()))
        .expect("disabled emission is a no-op");

    assert_eq!(fs::read_to_string(&stale).expect("stale artifact"), "stale");
    assert!(!dir.path().join(MANIFEST_FILE).exists());
}

#[test]
fn non_directory_target_is_a_configuration_error() {
    let dir = TempDir::new().expect("tempdir");
    let occupied = dir.path().join("occupied");
    fs::write(&occupied, "x").expect("file should write");

    let err = cache_policy::emit_artifacts(&manifest(true, occupied)).unwrap_err();
    assert!(matches!(err, InfraError::Configuration { .. }));
}

#[test]
fn manual_registration_worker_waits_for_the_page() {
    let dir = TempDir::new().expect("tempdir");
    let manual = CachingManifest {
        enabled: true,
        registration: RegistrationMode::Manual,
        output_target: dir.path().to_path_buf(),
    };
    cache_policy::emit_artifacts(&manual).expect("emission should succeed");

    let worker = fs::read_to_string(dir.path().join(WORKER_FILE)).expect("worker emitted");
    assert!(!worker.contains("skipWaiting"));

    let raw = fs::read_to_string(dir.path().join(MANIFEST_FILE)).expect("manifest emitted");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("manifest is json");
    assert_eq!(parsed["registration"], "manual");
}

#[test]
fn auto_worker_script_matches_the_reviewed_form() {
    insta::assert_snapshot!(
        "auto_worker",
        cache_policy::render_worker(RegistrationMode::Auto)
    );
}
