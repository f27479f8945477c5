use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{extract::Request, middleware, Router, ServiceExt};
use tokio::net::TcpListener;
use tower::{Layer, ServiceBuilder};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    decompression::RequestDecompressionLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use crate::{
    cli_args::CliArgs,
    database::{Database, DatabaseConfig},
    error::ErrorVerbosity,
    middleware::{
        method_not_allowed::method_not_allowed, not_found::not_found,
        trace_response_body::trace_response_body,
    },
    repository::{BookRepository, MemoryBookRepository, PostgresBookRepository},
    route,
    state::ApiState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Postgres { run_migrations: bool },
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    socket_address: SocketAddr,
    error_verbosity: ErrorVerbosity,
    database: DatabaseConfig,
    storage: Storage,
    trace_response_body: bool,
}

impl ServerConfig {
    pub fn new(
        socket_address: SocketAddr,
        error_verbosity: ErrorVerbosity,
        database: DatabaseConfig,
        storage: Storage,
        trace_response_body: bool,
    ) -> Self {
        Self {
            socket_address,
            error_verbosity,
            database,
            storage,
            trace_response_body,
        }
    }

    pub fn from_cli_args(args: &CliArgs) -> Self {
        let storage = match args.in_memory {
            true => Storage::Memory,
            false => Storage::Postgres {
                run_migrations: !args.skip_migrations,
            },
        };

        Self::new(
            args.socket_address,
            args.error_verbosity,
            DatabaseConfig::from_cli_args(args),
            storage,
            args.trace_response_body,
        )
    }
}

/// Builds the application: books under `/books`, JSON errors for everything else.
///
/// Trailing slashes are trimmed before routing, `/books/` is `/books`.
pub fn app(state: ApiState, trace_response_body_enabled: bool) -> NormalizePath<Router> {
    let router = Router::new()
        .nest("/books", route::books::app::app())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            method_not_allowed,
        ));

    let router = match trace_response_body_enabled {
        true => router.layer(middleware::from_fn_with_state(
            state.clone(),
            trace_response_body,
        )),
        false => router,
    };

    let router = router.with_state(state).layer(
        ServiceBuilder::new()
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                    .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                    .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
            )
            .layer(RequestDecompressionLayer::new())
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive()),
    );

    // Layers added to the router run after routing, this one has to wrap it.
    NormalizePathLayer::trim_trailing_slash().layer(router)
}

pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let database = match self.config.storage {
            Storage::Postgres { run_migrations } => {
                let database = Database::connect(&self.config.database).await?;

                if run_migrations {
                    database.migrate().await?;
                }

                Some(database)
            }
            Storage::Memory => {
                tracing::warn!("Using in-memory storage. Books are lost on shutdown");

                None
            }
        };

        let books: Arc<dyn BookRepository> = match &database {
            Some(database) => Arc::new(PostgresBookRepository::new(database.pool().clone())),
            None => Arc::new(MemoryBookRepository::new()),
        };

        let state = ApiState::new(self.config.error_verbosity, books);
        let router = app(state, self.config.trace_response_body);

        tracing::info!(addr = %self.config.socket_address, "Starting server");

        let listener = TcpListener::bind(&self.config.socket_address)
            .await
            .context("Bind failed")?;

        let served = axum::serve(
            listener,
            ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(router),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed");

        if let Some(database) = database {
            database.close().await;
        }

        served
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "Failed to install CTRL+C signal handler");

            return std::future::pending::<()>().await;
        }

        tracing::info!("CTRL+C received");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;

                tracing::info!("SIGTERM received");
            }
            Err(err) => {
                tracing::error!(%err, "Failed to install SIGTERM signal handler");

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

    tracing::info!("Shutting down");
}
