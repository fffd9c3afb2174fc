use std::{process, sync::Arc};

use goodnews::{
    application::{
        auth::{AuthService, Authenticator, ConfiguredEditors, SessionStore},
        error::AppError,
        news::NewsService,
        repos::{CategoriesRepo, HealthRepo, PostsRepo, PostsWriteRepo},
    },
    config::{self, CategoriesCommand},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState, SessionCookie},
        telemetry,
    },
};
use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

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
    let cli_args = config::parse_cli();

    let command = cli_args
        .command
        .clone()
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    if !command.needs_settings() {
        if let config::Command::HashPassword(args) = &command {
            println!("{}", ConfiguredEditors::digest_hex(&args.password));
        }
        return Ok(());
    }

    let settings = config::load(&cli_args)
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Categories(args) => run_categories(settings, args.command).await,
        config::Command::HashPassword(_) => Ok(()),
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_news_service(
    repositories: &Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> NewsService {
    let reader: Arc<dyn PostsRepo> = repositories.clone();
    let writer: Arc<dyn PostsWriteRepo> = repositories.clone();
    let categories: Arc<dyn CategoriesRepo> = repositories.clone();

    NewsService::new(
        reader,
        writer,
        categories,
        settings.news.list_page_size,
        settings.news.search_page_size,
    )
}

fn build_http_state(
    repositories: &Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> HttpState {
    if settings.auth.editors.is_empty() {
        warn!(
            target = "goodnews::auth",
            "no editors configured; post editing is unavailable"
        );
    }

    let authenticator: Arc<dyn Authenticator> =
        Arc::new(ConfiguredEditors::new(settings.auth.editors.clone()));
    let sessions = Arc::new(SessionStore::new(settings.auth.session_ttl));
    let health: Arc<dyn HealthRepo> = repositories.clone();

    HttpState {
        news: Arc::new(build_news_service(repositories, settings)),
        auth: Arc::new(AuthService::new(authenticator, sessions)),
        health,
        cookie: SessionCookie {
            name: settings.auth.cookie_name.clone(),
            secure: settings.auth.secure_cookie,
        },
        site_title: Arc::from(settings.news.site_title.as_str()),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let router = http::build_router(build_http_state(&repositories, &settings));

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "goodnews::server",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "goodnews::server", "server stopped");
    Ok(())
}

async fn run_categories(
    settings: config::Settings,
    command: CategoriesCommand,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let news = build_news_service(&repositories, &settings);

    match command {
        CategoriesCommand::Add { name } => {
            let category = news.create_category(&name).await?;
            println!("{}\t{}", category.id, category.name);
        }
        CategoriesCommand::List => {
            for category in news.categories().await? {
                println!("{}\t{}", category.id, category.name);
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(target = "goodnews::server", "shutdown signal received");
}
