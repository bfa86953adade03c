//! The event loop.
//!
//! [`LatheRuntime`] drains an [`EventSource`] on one task and dispatches every
//! `message_new` payload on its own tokio task. Other event types are ignored
//! and malformed payloads are logged and dropped.
//!
//! ```rust,ignore
//! use lathe_runtime::LatheRuntime;
//!
//! let runtime = LatheRuntime::builder()
//!     .dispatcher(dispatcher)
//!     .api(api)
//!     .build()?;
//!
//! // Runs until the source ends, Ctrl+C or SIGTERM.
//! let stats = runtime.run(source).await?;
//! ```
//!
//! On shutdown the runtime stops taking new payloads and waits up to
//! `runtime.shutdown_timeout_ms` for in-flight messages before aborting them.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use serde_json::Value as Json;
use tokio::signal;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use lathe_core::{BoxedApi, EventSource, MessageEvent, RawEvent};
use lathe_framework::{BoxError, Dispatcher, LatheContext, Service};

use crate::config::{ApiConfig, ConfigLoader, LatheConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Counters reported when [`LatheRuntime::run`] returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Payloads taken from the source.
    pub received: u64,
    /// Messages handed to the dispatcher.
    pub dispatched: u64,
    /// Dispatched messages some service handled.
    pub handled: u64,
    /// Dispatched messages no service wanted.
    pub unhandled: u64,
    /// Payloads of other event types.
    pub ignored: u64,
    /// Payloads that failed to decode.
    pub malformed: u64,
    /// Dispatch tasks that panicked.
    pub panicked: u64,
    /// Dispatch tasks aborted by the shutdown timeout.
    pub aborted: u64,
}

impl RuntimeStats {
    fn record(&mut self, joined: Result<bool, JoinError>) {
        match joined {
            Ok(true) => self.handled += 1,
            Ok(false) => self.unhandled += 1,
            Err(err) if err.is_panic() => {
                self.panicked += 1;
                error!(error = %err, "Dispatch task panicked");
            }
            Err(_) => {}
        }
    }
}

/// Consumes an event source and dispatches its messages.
pub struct LatheRuntime {
    config: LatheConfig,
    dispatcher: Arc<Dispatcher>,
    api: BoxedApi,
    shutdown: CancellationToken,
    running: AtomicBool,
}

impl LatheRuntime {
    /// Creates a runtime from parts. Logging is left untouched.
    pub fn new(config: LatheConfig, dispatcher: Dispatcher, api: BoxedApi) -> Self {
        Self {
            config,
            dispatcher: Arc::new(dispatcher),
            api,
            shutdown: CancellationToken::new(),
            running: AtomicBool::new(false),
        }
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &LatheConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn api(&self) -> &BoxedApi {
        &self.api
    }

    /// A token that stops the runtime when cancelled.
    ///
    /// Cancelling it is permanent: later runs stop immediately.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs until the source ends, Ctrl+C, SIGTERM or the shutdown token.
    pub async fn run<S: EventSource>(&self, source: S) -> RuntimeResult<RuntimeStats> {
        info!("Lathe runtime is now running. Press Ctrl+C to stop.");
        self.run_until(source, wait_for_signal()).await
    }

    /// Runs until the source ends, `shutdown` resolves or the shutdown token.
    pub async fn run_until<S, F>(&self, source: S, shutdown: F) -> RuntimeResult<RuntimeStats>
    where
        S: EventSource,
        F: Future<Output = ()>,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyRunning);
        }

        let intake = self.shutdown.child_token();
        let watcher = {
            let intake = intake.clone();
            async move {
                tokio::select! {
                    () = shutdown => {
                        info!("Shutdown signal received");
                        intake.cancel();
                    }
                    () = intake.cancelled() => {}
                }
            }
        };

        let (stats, ()) = tokio::join!(self.drive(source, intake), watcher);
        self.running.store(false, Ordering::SeqCst);

        info!(
            received = stats.received,
            dispatched = stats.dispatched,
            handled = stats.handled,
            "Runtime stopped"
        );
        Ok(stats)
    }

    async fn drive<S: EventSource>(&self, source: S, intake: CancellationToken) -> RuntimeStats {
        let mut stream = source.into_stream();
        let mut stats = RuntimeStats::default();
        let mut tasks: JoinSet<bool> = JoinSet::new();
        let limiter = match self.config.runtime.max_in_flight {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };

        info!(
            max_in_flight = self.config.runtime.max_in_flight,
            "Event loop started"
        );

        loop {
            tokio::select! {
                biased;
                () = intake.cancelled() => {
                    info!("Stopping intake");
                    break;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => stats.record(joined),
                next = stream.next() => {
                    let Some(payload) = next else {
                        info!("Event stream ended");
                        break;
                    };
                    stats.received += 1;
                    let Some(event) = decode(payload, &mut stats) else {
                        continue;
                    };

                    let permit = match &limiter {
                        Some(limiter) => match admit(limiter, &intake).await {
                            Some(permit) => Some(permit),
                            None => {
                                debug!(peer_id = event.peer_id, "Shutdown while waiting for a slot, dropping message");
                                break;
                            }
                        },
                        None => None,
                    };

                    let dispatcher = Arc::clone(&self.dispatcher);
                    let api = Arc::clone(&self.api);
                    tasks.spawn(async move {
                        let _permit = permit;
                        dispatcher.dispatch(Arc::new(event), api).await
                    });
                    stats.dispatched += 1;
                }
            }
        }

        // Releases the signal watcher when the stream ended on its own.
        intake.cancel();
        self.drain(&mut tasks, &mut stats).await;
        stats
    }

    async fn drain(&self, tasks: &mut JoinSet<bool>, stats: &mut RuntimeStats) {
        if tasks.is_empty() {
            return;
        }

        let timeout = self.config.runtime.shutdown_timeout();
        info!(in_flight = tasks.len(), ?timeout, "Waiting for in-flight messages");

        let drained = tokio::time::timeout(timeout, async {
            while let Some(joined) = tasks.join_next().await {
                stats.record(joined);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = tasks.len(),
                "Shutdown timeout elapsed, aborting in-flight messages"
            );
            stats.aborted += tasks.len() as u64;
            tasks.shutdown().await;
        }
    }
}

/// Decodes a raw payload, counting what is skipped.
fn decode(payload: Json, stats: &mut RuntimeStats) -> Option<MessageEvent> {
    let raw = match RawEvent::from_value(payload) {
        Ok(raw) => raw,
        Err(err) => {
            stats.malformed += 1;
            warn!(error = %err, "Dropping malformed event payload");
            return None;
        }
    };

    if !raw.is_message_new() {
        stats.ignored += 1;
        trace!(event_type = %raw.event_type, "Ignoring event");
        return None;
    }

    match raw.message() {
        Ok(message) => Some(message),
        Err(err) => {
            stats.malformed += 1;
            warn!(error = %err, group_id = ?raw.group_id, "Dropping undecodable message");
            None
        }
    }
}

/// Waits for a dispatch slot, or `None` once intake is cancelled.
async fn admit(limiter: &Arc<Semaphore>, intake: &CancellationToken) -> Option<OwnedSemaphorePermit> {
    tokio::select! {
        permit = Arc::clone(limiter).acquire_owned() => permit.ok(),
        () = intake.cancelled() => None,
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(err) => warn!(error = %err, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(err) => {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`LatheRuntime`].
///
/// Without an explicit [`config`](Self::config) the configuration is loaded
/// through a [`ConfigLoader`] searching the current directory. Without an
/// explicit [`api`](Self::api) the client is built from `[api]`, which needs
/// the `http-client` feature.
pub struct RuntimeBuilder {
    config: Option<LatheConfig>,
    loader: ConfigLoader,
    dispatcher: Dispatcher,
    api: Option<BoxedApi>,
    init_logging: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            loader: ConfigLoader::new().with_current_dir(),
            dispatcher: Dispatcher::new(),
            api: None,
            init_logging: true,
        }
    }

    /// Uses this configuration instead of loading one.
    pub fn config(mut self, config: LatheConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    pub fn search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.loader = self.loader.search_path(dir);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Appends a service to the dispatcher.
    pub fn service<S>(mut self, service: S) -> Self
    where
        S: Service<Arc<LatheContext>, Response = (), Error = BoxError>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        self.dispatcher.add(service);
        self
    }

    pub fn api(mut self, api: BoxedApi) -> Self {
        self.api = Some(api);
        self
    }

    /// Skips installing the global tracing subscriber.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    pub fn build(self) -> RuntimeResult<LatheRuntime> {
        let config = match self.config {
            Some(config) => {
                validate_config(&config)?;
                config
            }
            None => self.loader.load()?,
        };

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let api = match self.api {
            Some(api) => api,
            None => api_from_config(&config.api)?,
        };

        info!(
            log_level = %config.logging.level,
            services = self.dispatcher.len(),
            "Runtime initialized from configuration"
        );

        Ok(LatheRuntime::new(config, self.dispatcher, api))
    }
}

#[cfg(feature = "http-client")]
fn api_from_config(config: &ApiConfig) -> RuntimeResult<BoxedApi> {
    use lathe_transport::HttpApiClient;

    let token = config
        .access_token
        .as_deref()
        .ok_or_else(|| crate::config::ConfigError::missing("api.access_token"))?;
    let client = HttpApiClient::builder(&config.base_url)
        .version(&config.version)
        .access_token(token)
        .timeout(config.timeout())
        .build()?;
    debug!(base_url = %config.base_url, version = %config.version, "Built HTTP API client");
    Ok(Arc::new(client))
}

#[cfg(not(feature = "http-client"))]
fn api_from_config(config: &ApiConfig) -> RuntimeResult<BoxedApi> {
    debug!(base_url = %config.base_url, "No API client given and http-client is disabled");
    Err(RuntimeError::MissingApiClient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lathe_core::{ApiClient, ApiResult, ChannelEventSource};
    use lathe_framework::{
        Arguments, CommandSpec, Event, ServiceBuilder, ServiceBuilderExt, TypeTag, on_command,
    };
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingApi {
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl ApiClient for RecordingApi {
        async fn call(&self, method: &str, params: Json) -> ApiResult<Json> {
            assert_eq!(method, "messages.send");
            self.sent.lock().push((
                params["peer_id"].as_i64().unwrap(),
                params["message"].as_str().unwrap().to_string(),
            ));
            Ok(json!(1))
        }
    }

    fn message_payload(peer_id: i64, text: &str) -> Json {
        json!({
            "type": "message_new",
            "group_id": 1,
            "object": {
                "message": { "peer_id": peer_id, "from_id": 7, "text": text },
                "client_info": {}
            }
        })
    }

    fn runtime(config: LatheConfig, dispatcher: Dispatcher) -> (LatheRuntime, Arc<RecordingApi>) {
        let api = Arc::new(RecordingApi::default());
        let runtime = LatheRuntime::builder()
            .config(config)
            .dispatcher(dispatcher)
            .api(api.clone())
            .without_logging()
            .build()
            .unwrap();
        (runtime, api)
    }

    fn add_dispatcher() -> Dispatcher {
        let spec = CommandSpec::builder()
            .prefix("/")
            .name("add")
            .arg("a", TypeTag::Int)
            .arg("b", TypeTag::Int)
            .build()
            .unwrap();
        Dispatcher::new().with(on_command(spec).handler(|args: Arguments| async move {
            let a: i64 = args.get("a")?;
            let b: i64 = args.get("b")?;
            Ok::<_, BoxError>((a + b).to_string())
        }))
    }

    #[tokio::test]
    async fn test_dispatches_messages_until_stream_ends() {
        let (runtime, api) = runtime(LatheConfig::default(), add_dispatcher());
        let (tx, source) = ChannelEventSource::new(8);

        tx.send(message_payload(10, "/add 2 3")).await.unwrap();
        tx.send(json!({"type": "message_typing_state", "object": {}})).await.unwrap();
        tx.send(json!({"object": "no type"})).await.unwrap();
        tx.send(message_payload(11, "hello")).await.unwrap();
        drop(tx);

        let stats = runtime
            .run_until(source, std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.received, 4);
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.handled, 1);
        assert_eq!(stats.unhandled, 1);
        assert_eq!(stats.ignored, 1);
        assert_eq!(stats.malformed, 1);
        assert_eq!(*api.sent.lock(), vec![(10, "5".to_string())]);
        assert!(!runtime.is_running());
    }

    #[tokio::test]
    async fn test_legacy_message_shape_is_accepted() {
        let (runtime, api) = runtime(LatheConfig::default(), add_dispatcher());
        let (tx, source) = ChannelEventSource::new(1);
        tx.send(json!({
            "type": "message_new",
            "object": { "peer_id": 3, "from_id": 3, "text": "/add 1 1" }
        }))
        .await
        .unwrap();
        drop(tx);

        runtime.run_until(source, std::future::pending()).await.unwrap();
        assert_eq!(*api.sent.lock(), vec![(3, "2".to_string())]);
    }

    #[tokio::test]
    async fn test_shutdown_future_stops_intake() {
        let (runtime, _api) = runtime(LatheConfig::default(), Dispatcher::new());
        let (tx, source) = ChannelEventSource::new(1);

        let stats = runtime
            .run_until(source, tokio::time::sleep(Duration::from_millis(20)))
            .await
            .unwrap();

        assert_eq!(stats, RuntimeStats::default());
        drop(tx);
    }

    #[tokio::test]
    async fn test_shutdown_token_stops_intake() {
        let (runtime, _api) = runtime(LatheConfig::default(), Dispatcher::new());
        let (_tx, source) = ChannelEventSource::new(1);

        let token = runtime.shutdown_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let stats = runtime
            .run_until(source, std::future::pending())
            .await
            .unwrap();
        assert_eq!(stats.received, 0);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let dispatcher = Dispatcher::new().with(ServiceBuilder::new().handler(|| async {
            if true {
                panic!("handler exploded");
            }
        }));
        let (runtime, _api) = runtime(LatheConfig::default(), dispatcher);
        let (tx, source) = ChannelEventSource::new(2);
        tx.send(message_payload(1, "a")).await.unwrap();
        tx.send(message_payload(1, "b")).await.unwrap();
        drop(tx);

        let stats = runtime
            .run_until(source, std::future::pending())
            .await
            .unwrap();
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.panicked, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_max_in_flight_bounds_concurrency() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let handler = {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            move |_event: Event| {
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                }
            }
        };

        let mut config = LatheConfig::default();
        config.runtime.max_in_flight = 2;
        let (runtime, _api) = runtime(
            config,
            Dispatcher::new().with(ServiceBuilder::new().handler(handler)),
        );

        let (tx, source) = ChannelEventSource::new(16);
        for i in 0..8 {
            tx.send(message_payload(i, "x")).await.unwrap();
        }
        drop(tx);

        let stats = runtime
            .run_until(source, std::future::pending())
            .await
            .unwrap();
        assert_eq!(stats.handled, 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_shutdown_timeout_aborts_slow_messages() {
        let dispatcher = Dispatcher::new().with(ServiceBuilder::new().handler(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }));
        let mut config = LatheConfig::default();
        config.runtime.shutdown_timeout_ms = 20;
        let (runtime, _api) = runtime(config, dispatcher);

        let (tx, source) = ChannelEventSource::new(1);
        tx.send(message_payload(1, "slow")).await.unwrap();
        drop(tx);

        let stats = runtime
            .run_until(source, std::future::pending())
            .await
            .unwrap();
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.aborted, 1);
        assert_eq!(stats.handled, 0);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = LatheConfig::default();
        config.api.version = String::new();
        let result = LatheRuntime::builder()
            .config(config)
            .api(Arc::new(RecordingApi::default()))
            .without_logging()
            .build();
        assert!(matches!(result, Err(RuntimeError::Config(_))));
    }

    #[cfg(not(feature = "http-client"))]
    #[test]
    fn test_builder_requires_api_without_http_client() {
        let result = LatheRuntime::builder()
            .config(LatheConfig::default())
            .without_logging()
            .build();
        assert!(matches!(result, Err(RuntimeError::MissingApiClient)));
    }
}
