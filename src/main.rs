use crate::{
    cli::Args,
    config::Config,
    environment::ServerEnv,
    errors::Result,
    server::ExportServer,
    vars::{
        CLEANUP_API_KEY, CLEANUP_BLOBSTORE_URL, CLEANUP_DATABASE_URL, CLEANUP_HOST, CLEANUP_PORT,
        CLEANUP_SCHEDULE, init_started_at,
    },
};
use axum::{body::Body, extract::MatchedPath, http::Request};
use clap::Parser;
use log::{error, info};
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info_span;

mod blobstore;
mod cli;
mod config;
mod environment;
mod errors;
mod janitor;
mod keys;
mod logger;
mod middlewares;
mod models;
mod repository;
mod routes;
mod scheduler;
mod server;
#[cfg(test)]
mod testing;
mod vars;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    // Load environment variables from .env file if it exists
    let dotenv_loaded = dotenvy::dotenv().is_ok();
    let bind = format!("{}:{}", *CLEANUP_HOST, *CLEANUP_PORT);
    if args.healthcheck {
        cli::healthcheck::run(args, bind);
        return Ok(());
    }

    // Initialize the logger
    logger::init();
    if dotenv_loaded {
        info!("loaded .env file");
    }
    if args.cleanup {
        cli::cleanup::run().await?;
    } else {
        web_serve(&bind).await?;
    }

    Ok(())
}

async fn web_serve(bind: &str) -> Result<()> {
    // Load and validate the configuration
    let config = Config::from_env()?;
    // Wire the database and the blob store
    let env = ServerEnv::connect(*CLEANUP_DATABASE_URL, *CLEANUP_BLOBSTORE_URL).await?;
    let server = ExportServer::new(config, Arc::new(env)).inspect_err(|e| {
        if e.is_configuration() {
            error!("Refusing to start with an incomplete environment: {e}");
        }
    })?;
    let server = Arc::new(server);
    // Optional in-process schedule
    let mut sched = if CLEANUP_SCHEDULE.is_empty() {
        info!("No cleanup schedule configured, cleanup runs only when invoked over HTTP");
        None
    } else {
        Some(scheduler::start(*CLEANUP_SCHEDULE, Arc::clone(&server)).await?)
    };

    let app = routes::app(server, *CLEANUP_API_KEY)?
        // 将日志追踪层添加到最后面
        .layer(trace_layer());
    // 初始化启动时间
    init_started_at();
    // 输出启动日志
    info!("Starting server at http://{bind}");
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sched) = sched.as_mut() {
        sched.shutdown().await?;
    }

    Ok(())
}

type MyTraceLayer<M> = TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
    M,
>;

fn trace_layer() -> MyTraceLayer<impl Fn(&Request<Body>) -> tracing::Span + Clone> {
    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        // 获取匹配的路由路径
        let matched_path = request
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str);

        info_span!(
            "http_request",
            method = %request.method(),
            matched_path = matched_path,
            status_code = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
