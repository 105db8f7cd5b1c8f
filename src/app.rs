use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use tokio::{net::TcpListener, time::timeout};

use crate::{
    api::{self, AppState},
    config::AppConfig,
    db::{self, analysis::AnalysisRepository},
    infrastructure::{directories::ResolvedPaths, shutdown::Shutdown},
    ml::SpamDetector,
};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SpamDetectorApp {
    _paths: ResolvedPaths,
    bind_addr: SocketAddr,
    router: Router,
    repository: AnalysisRepository,
    shutdown: Shutdown,
}

impl SpamDetectorApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let pool = db::init_pool(&paths.db_path).await?;
        let repository = AnalysisRepository::new(pool);

        // A missing or broken model is not fatal; predictions degrade to the
        // error outcome until the file is fixed and the server restarted.
        let detector = Arc::new(SpamDetector::load(&config.model_path));

        let state = Arc::new(AppState {
            detector,
            repository: repository.clone(),
            timezone: config.timezone,
        });
        let router = api::router(state, &config.http);

        Ok(Self {
            _paths: paths,
            bind_addr: config.bind_addr,
            router,
            repository,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let SpamDetectorApp {
            _paths: _,
            bind_addr,
            router,
            repository,
            shutdown,
        } = self;

        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("failed to bind {bind_addr}"))?;
        tracing::info!(target: "lifecycle", addr = %bind_addr, "spam detector API listening");

        let mut shutdown_listener = shutdown.subscribe();
        let served = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown_listener.notified().await;
            tracing::info!(target: "lifecycle", "shutdown signal received; draining connections");
        })
        .await;

        // Make sure anything else subscribed also winds down if the server
        // exited on its own.
        shutdown.trigger();

        if timeout(SHUTDOWN_TIMEOUT, repository.close()).await.is_err() {
            tracing::warn!(
                target: "db",
                "database pool did not close within {:?}",
                SHUTDOWN_TIMEOUT
            );
        }

        served.context("HTTP server failed")?;
        tracing::info!(target: "lifecycle", "spam detector API stopped");
        Ok(())
    }
}
