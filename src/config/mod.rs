//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::auth::EditorCredential;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "goodnews";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_SITE_TITLE: &str = "GoodNews";
const DEFAULT_LIST_PAGE_SIZE: u32 = 1;
const DEFAULT_SEARCH_PAGE_SIZE: u32 = 10;
const DEFAULT_COOKIE_NAME: &str = "goodnews_session";
const DEFAULT_SESSION_TTL_SECS: u64 = 14 * 24 * 60 * 60;
const MAX_SESSION_TTL_SECS: u64 = 366 * 24 * 60 * 60;

/// Command-line arguments for the GoodNews binary.
#[derive(Debug, Parser)]
#[command(name = "goodnews", version, about = "GoodNews server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "GOODNEWS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the GoodNews HTTP service.
    Serve(Box<ServeArgs>),
    /// Manage post categories.
    Categories(CategoriesArgs),
    /// Print the SHA-256 digest to configure for an editor password.
    #[command(name = "hash-password")]
    HashPassword(HashPasswordArgs),
}

impl Command {
    /// `hash-password` must keep working while the configuration is broken.
    pub fn needs_settings(&self) -> bool {
        !matches!(self, Command::HashPassword(_))
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
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

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the number of posts per page on the news list.
    #[arg(long = "news-list-page-size", value_name = "COUNT")]
    pub news_list_page_size: Option<u32>,

    /// Override the number of posts per page on the search page.
    #[arg(long = "news-search-page-size", value_name = "COUNT")]
    pub news_search_page_size: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct CategoriesArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    #[command(subcommand)]
    pub command: CategoriesCommand,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CategoriesCommand {
    /// Create a category.
    Add {
        /// Display name of the new category.
        name: String,
    },
    /// List categories ordered by name.
    List,
}

#[derive(Debug, Args, Clone)]
pub struct HashPasswordArgs {
    /// Plain-text password to digest.
    pub password: String,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub news: NewsSettings,
    pub auth: AuthSettings,
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
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct NewsSettings {
    pub site_title: String,
    pub list_page_size: NonZeroU32,
    pub search_page_size: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub cookie_name: String,
    pub session_ttl: Duration,
    pub secure_cookie: bool,
    pub editors: Vec<EditorCredential>,
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

    builder = builder.add_source(Environment::with_prefix("GOODNEWS").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Categories(args)) => raw.apply_database_override(&args.database),
        Some(Command::HashPassword(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    news: RawNewsSettings,
    auth: RawAuthSettings,
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
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(size) = overrides.news_list_page_size {
            self.news.list_page_size = Some(size);
        }
        if let Some(size) = overrides.news_search_page_size {
            self.news.search_page_size = Some(size);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            news,
            auth,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            news: build_news_settings(news)?,
            auth: build_auth_settings(auth)?,
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

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_news_settings(news: RawNewsSettings) -> Result<NewsSettings, LoadError> {
    let site_title = news
        .site_title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string());

    let list_page_size = non_zero_u32(
        news.list_page_size.unwrap_or(DEFAULT_LIST_PAGE_SIZE).into(),
        "news.list_page_size",
    )?;
    let search_page_size = non_zero_u32(
        news.search_page_size
            .unwrap_or(DEFAULT_SEARCH_PAGE_SIZE)
            .into(),
        "news.search_page_size",
    )?;

    Ok(NewsSettings {
        site_title,
        list_page_size,
        search_page_size,
    })
}

fn build_auth_settings(auth: RawAuthSettings) -> Result<AuthSettings, LoadError> {
    let cookie_name = auth
        .cookie_name
        .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());
    if cookie_name.is_empty()
        || !cookie_name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(LoadError::invalid(
            "auth.cookie_name",
            "must be non-empty and contain only ASCII letters, digits, `_` or `-`",
        ));
    }

    let ttl_secs = auth.session_ttl_seconds.unwrap_or(DEFAULT_SESSION_TTL_SECS);
    if ttl_secs == 0 || ttl_secs > MAX_SESSION_TTL_SECS {
        return Err(LoadError::invalid(
            "auth.session_ttl_seconds",
            format!("must be between 1 and {MAX_SESSION_TTL_SECS}"),
        ));
    }

    let editors = auth
        .editors
        .into_iter()
        .map(build_editor)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AuthSettings {
        cookie_name,
        session_ttl: Duration::from_secs(ttl_secs),
        secure_cookie: auth.secure_cookie.unwrap_or(false),
        editors,
    })
}

fn build_editor(editor: RawEditorSettings) -> Result<EditorCredential, LoadError> {
    let username = editor.username.trim().to_string();
    if username.is_empty() {
        return Err(LoadError::invalid(
            "auth.editors.username",
            "must not be empty",
        ));
    }

    let digest = hex::decode(editor.password_sha256.trim()).map_err(|err| {
        LoadError::invalid(
            "auth.editors.password_sha256",
            format!("`{username}`: not valid hex: {err}"),
        )
    })?;
    if digest.len() != 32 {
        return Err(LoadError::invalid(
            "auth.editors.password_sha256",
            format!("`{username}`: expected 32 bytes, got {}", digest.len()),
        ));
    }

    Ok(EditorCredential {
        username,
        password_sha256: digest,
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
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNewsSettings {
    site_title: Option<String>,
    list_page_size: Option<u32>,
    search_page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    cookie_name: Option<String>,
    session_ttl_seconds: Option<u64>,
    secure_cookie: Option<bool>,
    editors: Vec<RawEditorSettings>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawEditorSettings {
    username: String,
    password_sha256: String,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn parse_cli() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests;
