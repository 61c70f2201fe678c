//! Binds a [`Router`] to the request stream of a bus.
//!
//! Each event delivered on the request stream is decoded and dispatched on
//! its own task, so a slow or failing handler never holds up the next event.
//! Responses leave through whatever publisher the router was built with,
//! normally a [`BusPublisher`](courier_transport::BusPublisher) on the reply
//! stream.

use std::future::Future;
use std::sync::Arc;

use courier_core::{Event, MessageBus, SubscriptionHandle};
use courier_framework::Router;
use courier_transport::DEFAULT_REQUEST_STREAM;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::signal;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::BusConfig;
use crate::error::{RuntimeError, RuntimeResult};

/// A handler service: one subscription, many concurrent dispatches.
pub struct HandlerService {
    bus: Arc<dyn MessageBus>,
    router: Router,
    request_stream: String,
    subscription: Mutex<Option<SubscriptionHandle>>,
    tasks: TaskTracker,
}

impl HandlerService {
    pub fn new(bus: Arc<dyn MessageBus>, router: Router) -> Self {
        Self {
            bus,
            router,
            request_stream: DEFAULT_REQUEST_STREAM.to_string(),
            subscription: Mutex::new(None),
            tasks: TaskTracker::new(),
        }
    }

    pub fn from_config(bus: Arc<dyn MessageBus>, router: Router, config: &BusConfig) -> Self {
        Self::new(bus, router).with_request_stream(&config.request_stream)
    }

    pub fn with_request_stream(mut self, stream: impl Into<String>) -> Self {
        self.request_stream = stream.into();
        self
    }

    pub fn request_stream(&self) -> &str {
        &self.request_stream
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn is_running(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Number of dispatches still in progress.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Subscribes to the request stream.
    ///
    /// Must be called from within a tokio runtime; dispatch tasks are spawned
    /// on it.
    pub async fn start(&self) -> RuntimeResult<()> {
        if self.is_running() {
            return Err(RuntimeError::AlreadyRunning);
        }

        let router = self.router.clone();
        let tasks = self.tasks.clone();
        let runtime = Handle::current();
        let on_message = Arc::new(move |payload: Value| {
            let event: Event = match serde_json::from_value(payload) {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "Dropping malformed event");
                    return;
                }
            };
            let router = router.clone();
            tasks.spawn_on(
                async move {
                    if let Err(e) = router.dispatch(event).await {
                        error!(error = %e, "Dispatch failed");
                    }
                },
                &runtime,
            );
        });

        let handle = self.bus.subscribe(&self.request_stream, on_message).await?;
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            // Lost a race with a concurrent start; dropping `handle` unsubscribes.
            return Err(RuntimeError::AlreadyRunning);
        }
        *subscription = Some(handle);

        info!(
            stream = %self.request_stream,
            routes = self.router.route_count(),
            "Handler service started"
        );
        Ok(())
    }

    /// Stops consuming and waits for in-flight dispatches to finish.
    pub async fn shutdown(&self) {
        let Some(handle) = self.subscription.lock().take() else {
            debug!("Handler service is not running");
            return;
        };
        handle.stop();

        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
        info!("Handler service stopped");
    }

    /// Starts, runs until `shutdown` resolves, then shuts down.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        shutdown.await;
        self.shutdown().await;
        Ok(())
    }

    /// Starts and runs until Ctrl+C (or SIGTERM on unix).
    pub async fn run(&self) -> RuntimeResult<()> {
        self.start().await?;
        info!("Handler service is running. Press Ctrl+C to stop.");
        let waited = wait_for_shutdown().await;
        self.shutdown().await;
        waited
    }
}

impl std::fmt::Debug for HandlerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerService")
            .field("request_stream", &self.request_stream)
            .field("router", &self.router)
            .field("running", &self.is_running())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// Waits for Ctrl+C or SIGTERM.
pub async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            received = signal::ctrl_c() => {
                received?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}
