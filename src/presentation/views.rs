use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::{application::error::ErrorReport, domain::images::ImageRenderResult};

#[derive(Debug, Error)]
#[error("template rendering failed")]
pub struct TemplateRenderError {
    pub(crate) source_location: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

pub fn render_template<T: Template>(
    template: T,
    source_location: &'static str,
) -> Result<Html<String>, TemplateRenderError> {
    template.render().map(Html).map_err(|error| TemplateRenderError {
        source_location,
        error,
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template, "presentation::views::render_template_response") {
        Ok(html) => (status, html).into_response(),
        Err(err) => {
            let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
            ErrorReport::from_error(
                err.source_location,
                StatusCode::INTERNAL_SERVER_ERROR,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Markup-ready attributes for the branding image.
#[derive(Debug, Clone)]
pub struct LogoView {
    pub src: String,
    pub alt: String,
    pub display_class: String,
    pub sizes: String,
    pub fetchpriority: &'static str,
}

impl From<&ImageRenderResult> for LogoView {
    fn from(result: &ImageRenderResult) -> Self {
        Self {
            src: result.source.as_str().to_string(),
            alt: result.alt.clone(),
            display_class: result.display_class.clone(),
            sizes: result.sizing.to_sizes_attr(),
            fetchpriority: result.priority.as_str(),
        }
    }
}

#[derive(Template)]
#[template(path = "brand.html")]
pub struct BrandTemplate {
    pub title: String,
    pub logo: Option<LogoView>,
    pub register_worker: bool,
}
