//! The public HTTP surface of the asset layer.

use std::{io::ErrorKind, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use metrics::counter;
use tracing::{error, warn};

use crate::{
    application::{
        cache_policy::{CachingManifest, MANIFEST_FILE, RegistrationMode, WORKER_FILE},
        error::ErrorReport,
        images,
    },
    config::BrandSettings,
    domain::images::{ImageRenderRequest, RemotePatternSet},
    infra::assets,
    presentation::views::{BrandTemplate, LogoView, render_template_response},
};

use super::middleware::{apply_permissions_policy, log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub allow_list: Arc<RemotePatternSet>,
    pub brand: BrandSettings,
    pub manifest: CachingManifest,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(brand))
        .route("/healthz", get(healthz))
        .route("/assets/{*path}", get(assets::serve))
        .route(&format!("/{WORKER_FILE}"), get(worker_artifact))
        .route(&format!("/{MANIFEST_FILE}"), get(manifest_artifact))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(apply_permissions_policy))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

/// Render the branding page.
///
/// When the configured image source fails the trust check the image is
/// omitted from the render; the failure stays local to this request.
async fn brand(State(state): State<HttpState>) -> Response {
    let request = ImageRenderRequest {
        source: state.brand.source.clone(),
        display_class: state.brand.display_class.clone(),
        alt: state.brand.alt.clone(),
        high_priority: state.brand.high_priority,
    };

    let logo = match images::resolve(request, &state.allow_list) {
        Ok(result) => {
            counter!("vetrina_image_resolve_allowed_total").increment(1);
            Some(LogoView::from(&result))
        }
        Err(err) => {
            counter!("vetrina_image_resolve_rejected_total").increment(1);
            warn!(
                target = "vetrina::http::brand",
                error = %err,
                "branding image omitted from render"
            );
            None
        }
    };

    let register_worker =
        state.manifest.enabled && state.manifest.registration == RegistrationMode::Auto;

    render_template_response(
        BrandTemplate {
            title: state.brand.title.clone(),
            logo,
            register_worker,
        },
        StatusCode::OK,
    )
}

async fn healthz() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn worker_artifact(State(state): State<HttpState>) -> Response {
    serve_artifact(&state, WORKER_FILE).await
}

async fn manifest_artifact(State(state): State<HttpState>) -> Response {
    serve_artifact(&state, MANIFEST_FILE).await
}

/// Serve a previously emitted cache artifact from the output target.
///
/// Artifacts are revalidated on every request; the revision-keyed entries
/// they reference are what the browser caches long-term. When nothing was
/// emitted for this environment the route is simply absent content.
async fn serve_artifact(state: &HttpState, name: &str) -> Response {
    let full = state.manifest.output_target.join(name);
    match tokio::fs::read(&full).await {
        Ok(contents) => {
            let mut response = Response::new(Body::from(contents));
            let mime = mime_guess::from_path(name).first_or_octet_stream();
            if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
                response.headers_mut().insert(CONTENT_TYPE, value);
            }
            response
                .headers_mut()
                .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            response
        }
        Err(err) if err.kind() == ErrorKind::NotFound => artifact_not_found(),
        Err(err) => {
            error!(
                target = "vetrina::http::artifacts",
                path = %full.display(),
                error = %err,
                "failed to read cache artifact"
            );
            let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            ErrorReport::from_error(
                "infra::http::serve_artifact",
                StatusCode::INTERNAL_SERVER_ERROR,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

fn artifact_not_found() -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(
        "infra::http::serve_artifact",
        StatusCode::NOT_FOUND,
        "Cache artifact not found",
    )
    .attach(&mut response);
    response
}

async fn not_found() -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message("infra::http::not_found", StatusCode::NOT_FOUND, "No such route")
        .attach(&mut response);
    response
}
