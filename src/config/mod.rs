//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::{
    application::cache_policy::RegistrationMode,
    domain::{
        environment::DeployEnvironment,
        images::{RemotePattern, RemotePatternSet},
    },
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "vetrina";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ENVIRONMENT: &str = "production";
const DEFAULT_CACHE_OUTPUT_DIR: &str = "public";
const DEFAULT_BRAND_TITLE: &str = "Vetrina";
const DEFAULT_BRAND_SOURCE: &str = "/assets/logo.svg";

/// Command-line arguments for the Vetrina binary.
#[derive(Debug, Parser)]
#[command(name = "vetrina", version, about = "Vetrina asset-layer server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VETRINA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Evaluate the cache policy, emit artifacts, and serve the asset layer.
    Serve(Box<ServeArgs>),
    /// Evaluate the cache policy and emit artifacts only, then exit.
    #[command(name = "emit")]
    Emit(EmitArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct EmitArgs {
    #[command(flatten)]
    pub overrides: PolicyOverrides,
}

/// Overrides shared by every command that evaluates the cache policy.
#[derive(Debug, Args, Default, Clone)]
pub struct PolicyOverrides {
    /// Override the deployment environment (development|production|<name>).
    #[arg(long = "environment", env = "VETRINA_ENVIRONMENT", value_name = "NAME")]
    pub environment: Option<String>,

    /// Override the cache artifact output directory.
    #[arg(long = "cache-output-dir", value_name = "PATH")]
    pub cache_output_dir: Option<PathBuf>,

    /// Override the cache controller registration mode (auto|manual).
    #[arg(long = "cache-register", value_name = "MODE")]
    pub cache_register: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub policy: PolicyOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub deploy: DeploySettings,
    pub cache: CacheSettings,
    pub images: ImageSettings,
    pub brand: BrandSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub environment: DeployEnvironment,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub output_dir: PathBuf,
    pub registration: RegistrationMode,
}

#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub remote_patterns: RemotePatternSet,
}

#[derive(Debug, Clone)]
pub struct BrandSettings {
    pub title: String,
    pub source: String,
    pub display_class: Option<String>,
    pub alt: Option<String>,
    pub high_priority: Option<bool>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("VETRINA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Emit(args)) => raw.apply_policy_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    deploy: RawDeploySettings,
    cache: RawCacheSettings,
    images: RawImageSettings,
    brand: RawBrandSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }

        self.apply_policy_overrides(&overrides.policy);
    }

    fn apply_policy_overrides(&mut self, overrides: &PolicyOverrides) {
        if let Some(environment) = overrides.environment.as_ref() {
            self.deploy.environment = Some(environment.clone());
        }
        if let Some(dir) = overrides.cache_output_dir.as_ref() {
            self.cache.output_dir = Some(dir.clone());
        }
        if let Some(mode) = overrides.cache_register.as_ref() {
            self.cache.register = Some(mode.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            deploy,
            cache,
            images,
            brand,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let deploy = build_deploy_settings(deploy)?;
        let cache = build_cache_settings(cache)?;
        let images = build_image_settings(images)?;
        let brand = build_brand_settings(brand)?;

        Ok(Self {
            server,
            logging,
            deploy,
            cache,
            images,
            brand,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_deploy_settings(deploy: RawDeploySettings) -> Result<DeploySettings, LoadError> {
    let name = deploy
        .environment
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
    if name.trim().is_empty() {
        return Err(LoadError::invalid(
            "deploy.environment",
            "environment name must not be empty",
        ));
    }

    Ok(DeploySettings {
        environment: DeployEnvironment::parse(&name),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let output_dir = cache
        .output_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_OUTPUT_DIR));
    if output_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "cache.output_dir",
            "path must not be empty",
        ));
    }

    let registration = match cache.register.as_deref() {
        None => RegistrationMode::Auto,
        Some(mode) => match mode.trim().to_ascii_lowercase().as_str() {
            "auto" => RegistrationMode::Auto,
            "manual" => RegistrationMode::Manual,
            other => {
                return Err(LoadError::invalid(
                    "cache.register",
                    format!("expected `auto` or `manual`, got `{other}`"),
                ));
            }
        },
    };

    Ok(CacheSettings {
        output_dir,
        registration,
    })
}

fn build_image_settings(images: RawImageSettings) -> Result<ImageSettings, LoadError> {
    let remote_patterns = match images.remote_patterns {
        None => RemotePatternSet::seeded(),
        Some(patterns) => {
            for pattern in &patterns {
                if pattern.hostname.trim().is_empty() {
                    return Err(LoadError::invalid(
                        "images.remote_patterns",
                        "hostname must not be empty",
                    ));
                }
                if !pattern.pathname.starts_with('/') {
                    return Err(LoadError::invalid(
                        "images.remote_patterns",
                        format!(
                            "path pattern `{}` must start with `/`",
                            pattern.pathname
                        ),
                    ));
                }
            }
            RemotePatternSet::new(patterns)
        }
    };

    Ok(ImageSettings { remote_patterns })
}

fn build_brand_settings(brand: RawBrandSettings) -> Result<BrandSettings, LoadError> {
    let title = brand
        .title
        .unwrap_or_else(|| DEFAULT_BRAND_TITLE.to_string());

    let source = brand
        .source
        .unwrap_or_else(|| DEFAULT_BRAND_SOURCE.to_string());
    if source.trim().is_empty() {
        return Err(LoadError::invalid(
            "brand.source",
            "image source must not be empty",
        ));
    }

    Ok(BrandSettings {
        title,
        source,
        display_class: brand.display_class,
        alt: brand.alt,
        high_priority: brand.high_priority,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDeploySettings {
    environment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    output_dir: Option<PathBuf>,
    register: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawImageSettings {
    remote_patterns: Option<Vec<RemotePattern>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBrandSettings {
    title: Option<String>,
    source: Option<String>,
    display_class: Option<String>,
    alt: Option<String>,
    high_priority: Option<bool>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}
