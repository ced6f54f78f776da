use std::{process, sync::Arc};

use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use vetrina::{
    application::{
        cache_policy::{self, CachingManifest},
        error::AppError,
    },
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    // The policy is evaluated exactly once per invocation; the manifest is
    // immutable for the lifetime of this process.
    let manifest = cache_policy::evaluate(&settings.deploy.environment, &settings.cache);
    info!(
        target = "vetrina::policy",
        environment = %settings.deploy.environment,
        enabled = manifest.enabled,
        output = %manifest.output_target.display(),
        "evaluated asset cache policy"
    );
    cache_policy::emit_artifacts(&manifest).map_err(AppError::from)?;

    match command {
        config::Command::Emit(_) => Ok(()),
        config::Command::Serve(_) => run_serve(settings, manifest).await,
    }
}

async fn run_serve(settings: config::Settings, manifest: CachingManifest) -> Result<(), AppError> {
    let state = HttpState {
        allow_list: Arc::new(settings.images.remote_patterns.clone()),
        brand: settings.brand.clone(),
        manifest,
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(target = "vetrina::serve", addr = %settings.server.addr, "listening");

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
