use std::future::Future;
use std::sync::Arc;

use notify::{recommended_watcher, Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use fanout_core::{FileEvent, WatchConfig};
use fanout_sync::{EventOutcome, LogSink, OutcomeCounts, OutcomeSink, Propagator, Sleeper};

use crate::error::{io_err, DaemonError};
use crate::translate::{EventTranslator, RENAME_PAIR_WINDOW};

/// Totals for one watch session.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub events: usize,
    pub propagated: usize,
    pub not_ready: usize,
    pub ignored: usize,
    pub destinations: OutcomeCounts,
}

impl SessionSummary {
    fn record(&mut self, outcome: &EventOutcome) {
        self.events += 1;
        match outcome {
            EventOutcome::Ignored { .. } => self.ignored += 1,
            EventOutcome::NotReady { .. } => self.not_ready += 1,
            EventOutcome::Propagated { .. } => self.propagated += 1,
        }
        self.destinations.add(outcome.counts());
    }

    pub fn to_json_pretty(&self) -> Result<String, DaemonError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A running watch: the OS watcher plus the task that propagates its events.
///
/// Returned by [`WatchSession::start`] and consumed by [`WatchSession::stop`].
pub struct WatchSession {
    config: Arc<WatchConfig>,
    watcher: Option<RecommendedWatcher>,
    shutdown_tx: broadcast::Sender<()>,
    processor: JoinHandle<Result<SessionSummary, DaemonError>>,
}

impl WatchSession {
    /// Watch `config.source_root` recursively and mirror into every destination.
    ///
    /// Must be called from inside a tokio runtime.
    pub async fn start(
        config: Arc<WatchConfig>,
        sink: Arc<dyn OutcomeSink>,
    ) -> Result<Self, DaemonError> {
        let propagator = Arc::new(Propagator::new(config.clone(), sink));
        Self::start_with(propagator)
    }

    /// Like [`WatchSession::start`] with a caller-built propagator.
    ///
    /// Fails with [`DaemonError::Config`] listing every missing root before
    /// any watcher is created.
    pub fn start_with<S: Sleeper + 'static>(
        propagator: Arc<Propagator<S>>,
    ) -> Result<Self, DaemonError> {
        let config = Arc::new(propagator.config().clone());
        fanout_core::config::check_roots(&config)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
            let _ = event_tx.send(event);
        })?;
        watcher.watch(&config.source_root, RecursiveMode::Recursive)?;
        tracing::debug!(path = %config.source_root.display(), "watching source tree");

        propagator.announce();

        let (shutdown_tx, _) = broadcast::channel::<()>(4);
        let processor = tokio::spawn(process_events(
            propagator,
            event_rx,
            shutdown_tx.subscribe(),
        ));

        Ok(Self {
            config,
            watcher: Some(watcher),
            shutdown_tx,
            processor,
        })
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Stop watching and wait for the in-flight event, if any, to finish.
    ///
    /// Dropping the watcher ends event emission and releases its handle;
    /// queued events not yet started are discarded. A rename source still
    /// waiting for its counterpart is propagated as a delete first.
    pub async fn stop(mut self) -> Result<SessionSummary, DaemonError> {
        drop(self.watcher.take());
        let _ = self.shutdown_tx.send(());
        join_processor(self.processor.await)
    }

    /// Run until `signal` resolves, then stop. Returns early on watcher failure.
    pub async fn run_until<F>(mut self, signal: F) -> Result<SessionSummary, DaemonError>
    where
        F: Future<Output = ()>,
    {
        let finished = tokio::select! {
            _ = signal => None,
            result = &mut self.processor => Some(result),
        };
        match finished {
            None => self.stop().await,
            Some(result) => {
                drop(self.watcher.take());
                join_processor(result)
            }
        }
    }
}

/// Serial processor: one event at a time, in delivery order.
///
/// Propagation blocks (readiness sleeps, file copies), so each event runs on
/// the blocking pool and is awaited before the next is dequeued.
pub(crate) async fn process_events<S: Sleeper + 'static>(
    propagator: Arc<Propagator<S>>,
    mut event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<SessionSummary, DaemonError> {
    let mut translator = EventTranslator::new();
    let mut summary = SessionSummary::default();

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::error!(error = %err, "watcher failed, halting propagation");
                        return Err(DaemonError::Watch(err));
                    }
                };
                for file_event in translator.translate(event) {
                    let outcome = propagate(propagator.clone(), file_event).await?;
                    summary.record(&outcome);
                }
            }
            _ = tokio::time::sleep(RENAME_PAIR_WINDOW), if translator.has_pending() => {
                if let Some(file_event) = translator.flush() {
                    let outcome = propagate(propagator.clone(), file_event).await?;
                    summary.record(&outcome);
                }
            }
        }
    }

    // A rename source with no counterpart left the tree.
    if let Some(file_event) = translator.flush() {
        let outcome = propagate(propagator.clone(), file_event).await?;
        summary.record(&outcome);
    }

    tracing::info!(
        events = summary.events,
        propagated = summary.propagated,
        not_ready = summary.not_ready,
        failed = summary.destinations.failed,
        "watch session stopped",
    );
    Ok(summary)
}

async fn propagate<S: Sleeper + 'static>(
    propagator: Arc<Propagator<S>>,
    event: FileEvent,
) -> Result<EventOutcome, DaemonError> {
    tracing::debug!(event = %event, "processing event");
    tokio::task::spawn_blocking(move || propagator.handle(&event))
        .await
        .map_err(|err| DaemonError::Task(format!("propagation task join error: {err}")))
}

fn join_processor(
    result: Result<Result<SessionSummary, DaemonError>, tokio::task::JoinError>,
) -> Result<SessionSummary, DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Task(format!(
            "event processor join failure: {err}"
        ))),
    }
}

/// Start a session on a fresh runtime and block until ctrl-c or watcher failure.
pub fn start_blocking(config: WatchConfig, json_logs: bool) -> Result<SessionSummary, DaemonError> {
    init_tracing(json_logs);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

/// Run a session with the default sink until ctrl-c.
pub async fn run(config: WatchConfig) -> Result<SessionSummary, DaemonError> {
    let session = WatchSession::start(Arc::new(config), Arc::new(LogSink)).await?;
    session
        .run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("received ctrl-c, stopping watch session"),
                Err(err) => {
                    tracing::warn!(error = %err, "ctrl-c handler failed; running until killed");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
}

/// Install the global subscriber once; `log` records are bridged into it.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
