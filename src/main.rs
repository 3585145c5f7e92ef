use std::{net::SocketAddr, process, sync::Arc, time::Duration as StdDuration};

use apalis::{
    layers::WorkerBuilderExt,
    prelude::{Monitor, WorkerBuilder, WorkerFactoryFn},
};
use apalis_cron::CronStream;
use apalis_sql::{Config as ApalisSqlConfig, postgres::PostgresStorage};
use specdoc::{
    application::{
        docs::{DocumentFormatter, DocumentationGenerator, GenerationSettings},
        error::AppError,
        jobs::{
            JobWorkerContext, Pipeline, PurgeContext, TaskExecutor, process_documentation_job,
            process_purge_expired_jobs, purge_expired_jobs, purge_schedule,
        },
        repos::{JobStore, TaskQueue},
        retry::RetryPolicy,
        service::{JobService, SubmissionLimits},
        tracker::StatusTracker,
    },
    config,
    domain::types::TaskType,
    infra::{
        db::PostgresRepositories, error::InfraError, fetch::HttpSpecFetcher,
        genai::HttpGenAiClient, http, telemetry,
    },
};
use time::OffsetDateTime;
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Worker(_) => run_worker(settings).await,
        config::Command::Purge(args) => run_purge(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let (http_repositories, job_repositories) = init_repositories(&settings).await?;
    let app = build_application_context(http_repositories, job_repositories.clone(), &settings)?;

    let monitor_handle = spawn_job_monitor(
        job_repositories,
        app.job_context,
        app.purge_context,
        &settings.jobs,
    );

    let result = serve_http(&settings, app.api_state).await;

    monitor_handle.abort();
    let _ = monitor_handle.await;

    result
}

async fn run_worker(settings: config::Settings) -> Result<(), AppError> {
    let (http_repositories, job_repositories) = init_repositories(&settings).await?;
    let app = build_application_context(http_repositories, job_repositories.clone(), &settings)?;

    info!(
        target = "specdoc::worker",
        concurrency = settings.jobs.max_concurrent.get(),
        "starting documentation workers"
    );
    let monitor_handle = spawn_job_monitor(
        job_repositories,
        app.job_context,
        app.purge_context,
        &settings.jobs,
    );

    shutdown_signal().await;
    info!(
        target = "specdoc::worker",
        "shutdown signal received, stopping workers"
    );
    monitor_handle.abort();
    let _ = monitor_handle.await;
    Ok(())
}

async fn run_purge(settings: config::Settings, args: config::PurgeArgs) -> Result<(), AppError> {
    let (http_repositories, _) = init_repositories(&settings).await?;

    let result_ttl = match args.older_than_hours {
        Some(hours) => StdDuration::from_secs(hours.saturating_mul(3600)),
        None => settings.jobs.result_ttl,
    };
    let result_ttl = to_time_duration("jobs.result_ttl_hours", result_ttl)?;

    let purged = purge_expired_jobs(
        http_repositories.as_ref(),
        result_ttl,
        OffsetDateTime::now_utc(),
    )
    .await
    .map_err(AppError::from)?;
    info!(target = "specdoc::purge", purged, "purge completed");
    Ok(())
}

struct ApplicationContext {
    api_state: http::ApiState,
    job_context: JobWorkerContext,
    purge_context: PurgeContext,
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<(Arc<PostgresRepositories>, Arc<PostgresRepositories>), AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let http_pool =
        PostgresRepositories::connect(database_url, settings.database.http_max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&http_pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    let jobs_pool =
        PostgresRepositories::connect(database_url, settings.database.jobs_max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok((
        Arc::new(PostgresRepositories::new(http_pool)),
        Arc::new(PostgresRepositories::new(jobs_pool)),
    ))
}

fn build_application_context(
    http_repositories: Arc<PostgresRepositories>,
    job_repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let http_store: Arc<dyn JobStore> = http_repositories.clone();
    let http_queue: Arc<dyn TaskQueue> = http_repositories;
    let job_store: Arc<dyn JobStore> = job_repositories;

    let default_estimate = to_time_duration(
        "jobs.default_estimate_seconds",
        settings.jobs.default_estimate,
    )?;
    let result_ttl = to_time_duration("jobs.result_ttl_hours", settings.jobs.result_ttl)?;
    let max_concurrent = settings.jobs.max_concurrent.get();
    let retry = RetryPolicy::from(&settings.retry);

    let http_tracker = Arc::new(StatusTracker::new(
        http_store.clone(),
        max_concurrent,
        default_estimate,
    ));
    let job_tracker = Arc::new(StatusTracker::new(
        job_store.clone(),
        max_concurrent,
        default_estimate,
    ));

    let fetcher = Arc::new(
        HttpSpecFetcher::new(
            settings.limits.fetch_timeout,
            settings.limits.max_spec_bytes.get(),
        )
        .map_err(AppError::from)?,
    );
    let jobs = Arc::new(JobService::new(
        http_store,
        http_queue,
        fetcher,
        http_tracker,
        SubmissionLimits {
            delivery_attempts: settings.jobs.delivery_attempts.get(),
        },
    ));

    let rate_limiter = Arc::new(http::ApiRateLimiter::new(
        StdDuration::from_secs(u64::from(settings.api_rate_limit.window_seconds.get())),
        settings.api_rate_limit.max_requests.get(),
    ));
    let api_state = http::ApiState::new(
        jobs,
        rate_limiter,
        settings.server.public_base_url.as_deref(),
    );

    let genai = Arc::new(
        HttpGenAiClient::new(
            settings.genai.endpoint_url.clone(),
            settings.genai.api_key.clone(),
            settings.genai.timeout,
        )
        .map_err(AppError::from)?,
    );
    let generator = Arc::new(DocumentationGenerator::new(
        genai,
        GenerationSettings::from(&settings.genai),
        retry.clone(),
    ));
    let formatter = Arc::new(DocumentFormatter::new(
        settings.server.public_base_url.as_deref(),
    ));
    let pipeline = Pipeline::new(job_store.clone(), generator, formatter, retry);
    let executor = Arc::new(TaskExecutor::new(job_store.clone(), job_tracker, pipeline));

    Ok(ApplicationContext {
        api_state,
        job_context: JobWorkerContext { executor },
        purge_context: PurgeContext {
            store: job_store,
            result_ttl,
        },
    })
}

fn to_time_duration(key: &str, value: StdDuration) -> Result<time::Duration, AppError> {
    time::Duration::try_from(value)
        .map_err(|err| AppError::validation(format!("`{key}` is out of range: {err}")))
}

fn spawn_job_monitor(
    repositories: Arc<PostgresRepositories>,
    context: JobWorkerContext,
    purge: PurgeContext,
    jobs: &config::JobsSettings,
) -> tokio::task::JoinHandle<()> {
    let execute_storage = PostgresStorage::new_with_config(
        repositories.pool().clone(),
        ApalisSqlConfig::new(TaskType::ExecuteDocumentationJob.as_str()),
    );

    let execute_worker = WorkerBuilder::new("documentation-job-worker")
        .concurrency(jobs.max_concurrent.get() as usize)
        .data(context)
        .backend(execute_storage)
        .build_fn(process_documentation_job);

    let monitor = Monitor::new().register(execute_worker);

    // Hourly expiry sweep; a malformed schedule disables it rather than the workers.
    let monitor = match purge_schedule() {
        Ok(schedule) => {
            let purge_worker = WorkerBuilder::new("purge-expired-jobs-worker")
                .data(purge)
                .backend(CronStream::new(schedule))
                .build_fn(process_purge_expired_jobs);
            monitor.register(purge_worker)
        }
        Err(err) => {
            warn!(
                target = "specdoc::worker",
                error = %err,
                "purge schedule is invalid, expiry sweep disabled"
            );
            monitor
        }
    };

    tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    })
}

async fn serve_http(
    settings: &config::Settings,
    api_state: http::ApiState,
) -> Result<(), AppError> {
    let body_limit = usize::try_from(settings.limits.max_spec_bytes.get())
        .map_err(|_| AppError::validation("`limits.max_spec_bytes` does not fit in memory"))?;
    let router = http::build_router(api_state, body_limit);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "specdoc::http",
        addr = %settings.server.addr,
        "listening"
    );

    let grace = settings.server.graceful_shutdown;
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    // In-flight requests get `grace` to finish once the signal arrives.
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        _ = async {
            shutdown_signal().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!(target = "specdoc::http", "graceful shutdown timed out");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
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
}
