//! Embedded static asset serving utilities.
//!
//! The `static/` bundle is compiled into the binary; the same bundle backs
//! both the `/assets` routes and the precache manifest emitted by the cache
//! policy.

use axum::{
    body::Body,
    extract::Path,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, DirEntry, include_dir};
use mime_guess::{Mime, MimeGuess};

use crate::application::error::ErrorReport;

static ASSET_BUNDLE: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Route prefix the bundle is mounted under.
pub const PUBLIC_PREFIX: &str = "/assets";

/// Serve one embedded static asset.
pub async fn serve(path: Option<Path<String>>) -> Response {
    let captured = path.map(|Path(value)| value);
    match resolve_asset(captured) {
        Some(asset) => asset.into_response(),
        None => not_found_response("infra::assets::serve"),
    }
}

fn not_found_response(source: &'static str) -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(source, StatusCode::NOT_FOUND, "Static asset not found")
        .attach(&mut response);
    response
}

struct Asset {
    contents: &'static [u8],
    mime: MimeGuess,
}

fn resolve_asset(path: Option<String>) -> Option<Asset> {
    let mut candidate = path.unwrap_or_default();
    if candidate.starts_with('/') {
        candidate = candidate.trim_start_matches('/').to_string();
    }

    if candidate.is_empty() || candidate.ends_with('/') || candidate.contains("..") {
        // Avoid directory traversal and disallow directory listings.
        return None;
    }

    let file = ASSET_BUNDLE.get_file(&candidate)?;
    Some(Asset {
        contents: file.contents(),
        mime: mime_guess::from_path(&candidate),
    })
}

impl IntoResponse for Asset {
    fn into_response(self) -> Response {
        build_response(Bytes::from_static(self.contents), self.mime.first_or_octet_stream())
    }
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    response
}

/// Relative path and contents of every file in the bundle.
pub fn embedded_files() -> Vec<(String, &'static [u8])> {
    let mut files = Vec::new();
    collect(&ASSET_BUNDLE, &mut files);
    files
}

fn collect(dir: &'static Dir<'static>, files: &mut Vec<(String, &'static [u8])>) {
    for entry in dir.entries() {
        match entry {
            DirEntry::Dir(sub) => collect(sub, files),
            DirEntry::File(file) => files.push((
                file.path().to_string_lossy().into_owned(),
                file.contents(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_contains_the_branding_assets() {
        let files = embedded_files();
        let names: Vec<&str> = files.iter().map(|(path, _)| path.as_str()).collect();
        assert!(names.contains(&"logo.svg"));
        assert!(names.contains(&"app.css"));
        assert!(names.contains(&"offline.html"));
    }

    #[test]
    fn traversal_and_listing_requests_resolve_to_nothing() {
        assert!(resolve_asset(Some("../Cargo.toml".to_string())).is_none());
        assert!(resolve_asset(Some("css/".to_string())).is_none());
        assert!(resolve_asset(None).is_none());
    }

    #[test]
    fn known_asset_resolves_with_contents() {
        let asset = resolve_asset(Some("logo.svg".to_string())).expect("logo should be embedded");
        assert!(!asset.contents.is_empty());
    }
}
