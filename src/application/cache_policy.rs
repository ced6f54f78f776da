//! Build-time asset cache policy.
//!
//! [`evaluate`] is a single-branch function of the deployment environment.
//! [`emit_artifacts`] performs the one side effect in this layer: writing
//! the browser cache controller and its precache manifest into the
//! configured static output directory. Nothing here retries; both failure
//! modes are deterministic functions of static configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use metrics::counter;
use once_cell::sync::Lazy;
use serde::Serialize;
use sha2::{Digest, Sha256};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::info;

use crate::{
    config::CacheSettings,
    domain::environment::DeployEnvironment,
    infra::{assets, error::InfraError},
};

/// File name of the emitted cache controller.
pub const WORKER_FILE: &str = "offline-worker.js";
/// File name of the emitted precache manifest.
pub const MANIFEST_FILE: &str = "precache-manifest.json";

const OFFLINE_FALLBACK_URL: &str = "/assets/offline.html";

/// How the browser-side cache controller installs itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationMode {
    /// Install and activate without user action. A freshly emitted
    /// controller takes over immediately; it never waits for a stale one to
    /// be released by hand.
    Auto,
    /// The embedding page registers the controller explicitly.
    Manual,
}

/// The static caching manifest for one build of the deployed artifact.
///
/// Computed once per invocation and immutable afterwards; regenerated from
/// scratch on the next build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachingManifest {
    pub enabled: bool,
    pub registration: RegistrationMode,
    pub output_target: PathBuf,
}

/// Evaluate the policy for `environment`.
///
/// The single branch: caching is enabled everywhere except the local
/// development context. Custom named environments are production-like.
/// Evaluation itself has no side effects and is idempotent per environment.
pub fn evaluate(environment: &DeployEnvironment, cache: &CacheSettings) -> CachingManifest {
    CachingManifest {
        enabled: !environment.is_development(),
        registration: cache.registration,
        output_target: cache.output_dir.clone(),
    }
}

/// One precached asset: its public URL and the content revision keying its
/// cache entry.
#[derive(Debug, Clone, Serialize)]
pub struct PrecacheEntry {
    pub url: String,
    pub revision: String,
}

#[derive(Debug, Serialize)]
struct PrecacheManifest<'a> {
    generated_at: String,
    registration: RegistrationMode,
    entries: &'a [PrecacheEntry],
}

// Embedded assets are hashed once per process. The revision is the SHA-256
// of the asset bytes, so identical inputs always emit identical entries.
static PRECACHE_ENTRIES: Lazy<Vec<PrecacheEntry>> = Lazy::new(|| {
    let mut entries: Vec<PrecacheEntry> = assets::embedded_files()
        .into_iter()
        .map(|(path, contents)| PrecacheEntry {
            url: format!("{}/{path}", assets::PUBLIC_PREFIX),
            revision: hex::encode(Sha256::digest(contents)),
        })
        .collect();
    entries.sort_by(|a, b| a.url.cmp(&b.url));
    entries
});

/// The precache entries for the embedded asset bundle.
pub fn precache_entries() -> &'static [PrecacheEntry] {
    &PRECACHE_ENTRIES
}

/// Emit the cache-control artifacts for `manifest`.
///
/// A disabled manifest emits nothing and leaves previously emitted
/// artifacts untouched; stale-artifact cleanup is out of scope.
pub fn emit_artifacts(manifest: &CachingManifest) -> Result<(), InfraError> {
    if !manifest.enabled {
        info!(
            target = "vetrina::cache_policy",
            "caching disabled for this environment; skipping artifact emission"
        );
        return Ok(());
    }

    let output = ensure_output_dir(&manifest.output_target)?;
    let entries = precache_entries();

    let generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| InfraError::configuration(format!("failed to format timestamp: {err}")))?;
    let precache = PrecacheManifest {
        generated_at,
        registration: manifest.registration,
        entries,
    };
    let encoded = serde_json::to_vec_pretty(&precache).map_err(|err| {
        InfraError::configuration(format!("failed to encode precache manifest: {err}"))
    })?;
    write_artifact(&output.join(MANIFEST_FILE), &encoded)?;
    write_artifact(
        &output.join(WORKER_FILE),
        render_worker(manifest.registration).as_bytes(),
    )?;

    counter!("vetrina_precache_entries_emitted_total").increment(entries.len() as u64);
    info!(
        target = "vetrina::cache_policy",
        output = %output.display(),
        entries = entries.len(),
        "emitted cache artifacts"
    );
    Ok(())
}

fn ensure_output_dir(target: &Path) -> Result<PathBuf, InfraError> {
    if target.as_os_str().is_empty() {
        return Err(InfraError::configuration(
            "cache output target must not be empty",
        ));
    }
    fs::create_dir_all(target).map_err(|err| {
        InfraError::configuration(format!(
            "cache output target `{}` is not a usable directory: {err}",
            target.display()
        ))
    })?;
    let metadata = fs::metadata(target).map_err(|err| {
        InfraError::configuration(format!(
            "cache output target `{}` could not be inspected: {err}",
            target.display()
        ))
    })?;
    if !metadata.is_dir() {
        return Err(InfraError::configuration(format!(
            "cache output target `{}` is not a directory",
            target.display()
        )));
    }
    if metadata.permissions().readonly() {
        return Err(InfraError::configuration(format!(
            "cache output target `{}` is not writable",
            target.display()
        )));
    }
    Ok(target.to_path_buf())
}

fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), InfraError> {
    fs::write(path, bytes).map_err(|err| {
        InfraError::configuration(format!(
            "failed to write cache artifact `{}`: {err}",
            path.display()
        ))
    })
}

const WORKER_TEMPLATE: &str = r#"/* Generated by vetrina. Do not edit. */
const PRECACHE = "vetrina-precache-v1";
const RUNTIME = "vetrina-runtime-v1";
const MANIFEST_URL = "@manifest_url@";
const OFFLINE_URL = "@offline_url@";

self.addEventListener("install", (event) => {
  event.waitUntil(
    (async () => {
      const response = await fetch(MANIFEST_URL);
      const manifest = await response.json();
      const cache = await caches.open(PRECACHE);
      await cache.addAll(manifest.entries.map((entry) => `${entry.url}?rev=${entry.revision}`));
@install_hook@
    })()
  );
});

self.addEventListener("activate", (event) => {
  event.waitUntil(
    (async () => {
      const names = await caches.keys();
      await Promise.all(
        names
          .filter((name) => name !== PRECACHE && name !== RUNTIME)
          .map((name) => caches.delete(name))
      );
@activate_hook@
    })()
  );
});

self.addEventListener("fetch", (event) => {
  const request = event.request;
  if (request.method !== "GET") {
    return;
  }
  if (request.mode === "navigate") {
    event.respondWith(networkFirst(request));
    return;
  }
  const destination = request.destination;
  if (destination === "image" || destination === "style" || destination === "script") {
    event.respondWith(cacheFirst(request));
  }
});

async function networkFirst(request) {
  const cache = await caches.open(RUNTIME);
  try {
    const response = await fetch(request);
    cache.put(request, response.clone());
    return response;
  } catch (err) {
    const cached = await cache.match(request);
    if (cached) {
      return cached;
    }
    return caches.match(OFFLINE_URL, { ignoreSearch: true });
  }
}

async function cacheFirst(request) {
  const cached = await caches.match(request, { ignoreSearch: true });
  if (cached) {
    return cached;
  }
  const response = await fetch(request);
  const cache = await caches.open(RUNTIME);
  cache.put(request, response.clone());
  return response;
}
"#;

const AUTO_INSTALL_HOOK: &str = "      await self.skipWaiting();";
const AUTO_ACTIVATE_HOOK: &str = "      await self.clients.claim();";
const MANUAL_HOOK: &str = "      /* manual registration: the page decides when to take over */";

/// Render the controller script for the chosen registration mode.
pub fn render_worker(registration: RegistrationMode) -> String {
    let (install_hook, activate_hook) = match registration {
        RegistrationMode::Auto => (AUTO_INSTALL_HOOK, AUTO_ACTIVATE_HOOK),
        RegistrationMode::Manual => (MANUAL_HOOK, MANUAL_HOOK),
    };
    WORKER_TEMPLATE
        .replace("@manifest_url@", MANIFEST_FILE)
        .replace("@offline_url@", OFFLINE_FALLBACK_URL)
        .replace("@install_hook@", install_hook)
        .replace("@activate_hook@", activate_hook)
}
