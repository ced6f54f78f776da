//! Vetrina: the client-facing asset layer of a web application.
//!
//! Two cores: the build-time asset cache policy (what is cached, under what
//! key, gated on the deployment environment) and the responsive image
//! resolver (trusted sources, sizing, layout and priority defaults). The
//! HTTP surface around them serves the branding page, the embedded static
//! bundle, and the emitted cache artifacts.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
