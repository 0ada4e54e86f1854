use std::{error::Error as StdError, process, sync::Arc};

use postdesk::{
    application::{
        admin::AdminPostService,
        error::AppError,
        repos::{CategoriesRepo, PostsRepo, PostsWriteRepo, TagsRepo},
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState},
        telemetry,
        uploads::UploadStorage,
    },
};
use sqlx::PgPool;
use tokio::sync::Notify;
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
    let chain = error_chain(error);
    if dispatcher::has_been_set() {
        error!(error = %chain, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %chain, "application error");
    });
}

fn error_chain(error: &AppError) -> String {
    let mut chain = error.to_string();
    let mut source = StdError::source(error);
    while let Some(inner) = source {
        chain.push_str(": ");
        chain.push_str(&inner.to_string());
        source = inner.source();
    }
    chain
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    migrate(&pool).await?;
    info!(target = "postdesk::migrate", "database migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    migrate(&pool).await?;

    let repositories = Arc::new(PostgresRepositories::new(pool));
    let admin_state = build_admin_state(repositories, &settings)?;

    serve_http(&settings, admin_state).await
}

async fn connect_pool(settings: &config::Settings) -> Result<PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or(InfraError::MissingDatabaseUrl)?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::Connect(err)))
}

async fn migrate(pool: &PgPool) -> Result<(), AppError> {
    PostgresRepositories::run_migrations(pool)
        .await
        .map_err(|err| AppError::from(InfraError::Migrate(err)))
}

fn build_admin_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<AdminState, AppError> {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let categories_repo: Arc<dyn CategoriesRepo> = repositories.clone();
    let tags_repo: Arc<dyn TagsRepo> = repositories.clone();

    let upload_root = settings.uploads.directory.clone();
    let upload_storage = UploadStorage::new(upload_root.clone())
        .map_err(|source| InfraError::UploadRoot {
            root: upload_root,
            source,
        })?;
    let upload_storage = Arc::new(upload_storage);

    let posts = Arc::new(AdminPostService::new(
        posts_repo,
        posts_write_repo,
        categories_repo,
        tags_repo,
        upload_storage,
    ));

    let upload_limit_bytes = usize::try_from(settings.uploads.max_request_bytes.get())
        .map_err(|err| InfraError::setting("uploads.max_request_bytes", err.to_string()))?;

    Ok(AdminState {
        db: repositories,
        posts,
        user_header: settings.admin.user_header.clone(),
        page_size: settings.admin.page_size.get(),
        upload_limit_bytes,
    })
}

async fn serve_http(settings: &config::Settings, admin_state: AdminState) -> Result<(), AppError> {
    let router = http::build_admin_router(admin_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|source| InfraError::Bind {
            addr: settings.server.addr,
            source,
        })?;

    info!(
        target = "postdesk::serve",
        addr = %settings.server.addr,
        "admin server listening"
    );

    let shutdown = Arc::new(Notify::new());
    let drained = shutdown.notified();
    let grace = settings.server.graceful_shutdown;

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .into_future();

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = async {
            drained.await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(
                target = "postdesk::serve",
                grace_seconds = grace.as_secs(),
                "in-flight requests did not finish before the shutdown deadline"
            );
        }
    }

    info!(target = "postdesk::serve", "admin server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: Arc<Notify>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "postdesk::serve",
            error = %err,
            "failed to listen for the shutdown signal"
        );
        std::future::pending::<()>().await;
    }

    info!(target = "postdesk::serve", "shutdown signal received");
    shutdown.notify_waiters();
}
