//! Long-running background services with cooperative shutdown.
//!
//! A `Service` owns its loop and watches a `CancellationToken`. The
//! `ServiceHost` spawns every registered service, waits for a shutdown
//! signal (or for any service to exit), cancels the token and then waits for
//! all services to finish their drain work.
//!
//! ```text
//! ServiceHost
//!     ├─► spawn service A ─┐
//!     ├─► spawn service B ─┤  (each runs until token cancelled)
//!     ├─► wait: Ctrl-C / SIGTERM / first service exit
//!     ├─► cancel token
//!     └─► join all (services flush / drain)
//! ```

use std::future::Future;

use anyhow::Result;
use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[async_trait]
pub trait Service: Send + 'static {
    fn name(&self) -> &'static str;

    /// Run until `shutdown` is cancelled, then drain and return.
    async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()>;
}

pub struct ServiceHost {
    services: Vec<Box<dyn Service>>,
    shutdown: CancellationToken,
}

impl Default for ServiceHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceHost {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_service(mut self, service: impl Service) -> Self {
        self.services.push(Box::new(service));
        self
    }

    /// Run all services until Ctrl-C or SIGTERM.
    pub async fn run_until_shutdown(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run all services until `signal` resolves.
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let mut tasks = JoinSet::new();
        for service in self.services {
            let name = service.name();
            let token = self.shutdown.clone();
            info!(service = name, "starting service");
            tasks.spawn(async move { (name, service.run(token).await) });
        }

        let mut failed = false;

        tokio::select! {
            _ = signal => info!("shutdown signal received"),
            _ = self.shutdown.cancelled() => info!("shutdown requested"),
            Some(joined) = tasks.join_next() => {
                warn!("a service exited before shutdown was requested");
                failed |= !record_exit(joined);
            }
        }

        self.shutdown.cancel();

        while let Some(joined) = tasks.join_next().await {
            failed |= !record_exit(joined);
        }

        if failed {
            anyhow::bail!("one or more services failed");
        }
        info!("all services stopped");
        Ok(())
    }
}

/// Log a finished service task; returns `false` if it failed.
fn record_exit(joined: Result<(&'static str, Result<()>), tokio::task::JoinError>) -> bool {
    match joined {
        Ok((name, Ok(()))) => {
            info!(service = name, "service stopped");
            true
        }
        Ok((name, Err(e))) => {
            error!(service = name, error = %e, "service failed");
            false
        }
        Err(e) => {
            error!(error = %e, "service task panicked");
            false
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct WaitsForShutdown {
        drained: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Service for WaitsForShutdown {
        fn name(&self) -> &'static str {
            "waits-for-shutdown"
        }

        async fn run(self: Box<Self>, shutdown: CancellationToken) -> Result<()> {
            shutdown.cancelled().await;
            self.drained.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailsImmediately;

    #[async_trait]
    impl Service for FailsImmediately {
        fn name(&self) -> &'static str {
            "fails-immediately"
        }

        async fn run(self: Box<Self>, _shutdown: CancellationToken) -> Result<()> {
            anyhow::bail!("boom")
        }
    }

    #[tokio::test]
    async fn test_services_drain_on_signal() {
        let drained = Arc::new(AtomicBool::new(false));
        let host = ServiceHost::new().with_service(WaitsForShutdown {
            drained: drained.clone(),
        });

        host.run_until(async {}).await.unwrap();
        assert!(drained.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_service_stops_the_others() {
        let drained = Arc::new(AtomicBool::new(false));
        let host = ServiceHost::new()
            .with_service(FailsImmediately)
            .with_service(WaitsForShutdown {
                drained: drained.clone(),
            });

        let result = host.run_until(std::future::pending::<()>()).await;
        assert!(result.is_err());
        assert!(drained.load(Ordering::SeqCst));
    }
}
