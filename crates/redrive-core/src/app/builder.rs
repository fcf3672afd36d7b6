//! AppBuilder - wiring of the controller and triage from their ports.
//!
//! Fail-fast: `build()` checks that every required port was supplied and
//! that the configuration is usable, before anything runs.

use std::sync::Arc;

use crate::app::controller::LifecycleController;
use crate::app::ingress::Ingress;
use crate::app::triage::DeadLetterTriage;
use crate::config::RedriveConfig;
use crate::impls::TracingDiagnosticSink;
use crate::ports::{
    Clock, DiagnosticSink, IdGenerator, MessagePublisher, RedeliveryScheduler, SystemClock,
    TaskStore, UnitOfWork,
};

/// Builds an [`App`].
///
/// ```ignore
/// let queue = InMemoryQueue::from_config(&config.queue);
/// let app = AppBuilder::new(config)
///     .store(Arc::new(InMemoryTaskStore::new()))
///     .scheduler(queue.tasks())
///     .unit_of_work(Arc::new(MyWork))
///     .build()?;
/// ```
///
/// The diagnostic sink defaults to [`TracingDiagnosticSink`], the clock to
/// [`SystemClock`].
pub struct AppBuilder {
    config: RedriveConfig,
    store: Option<Arc<dyn TaskStore>>,
    scheduler: Option<Arc<dyn RedeliveryScheduler>>,
    work: Option<Arc<dyn UnitOfWork>>,
    sink: Option<Arc<dyn DiagnosticSink>>,
    clock: Option<Arc<dyn Clock>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing component: {0}")]
    MissingComponent(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AppBuilder {
    pub fn new(config: RedriveConfig) -> Self {
        Self {
            config,
            store: None,
            scheduler: None,
            work: None,
            sink: None,
            clock: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn RedeliveryScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn unit_of_work(mut self, work: Arc<dyn UnitOfWork>) -> Self {
        self.work = Some(work);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        let store = self.store.ok_or(BuildError::MissingComponent("task store"))?;
        let scheduler = self
            .scheduler
            .ok_or(BuildError::MissingComponent("redelivery scheduler"))?;
        let work = self.work.ok_or(BuildError::MissingComponent("unit of work"))?;

        self.config
            .validate()
            .map_err(|e| BuildError::InvalidConfig(e.to_string()))?;
        let policy = self
            .config
            .retry_policy()
            .map_err(|e| BuildError::InvalidConfig(e.to_string()))?;

        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingDiagnosticSink));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let controller = LifecycleController::new(
            Arc::clone(&store),
            scheduler,
            work,
            Arc::clone(&clock),
            policy,
            self.config.worker.concurrency_guard,
        );
        let triage = DeadLetterTriage::new(Arc::clone(&store), sink, Arc::clone(&clock));

        Ok(App {
            controller: Arc::new(controller),
            triage: Arc::new(triage),
            store,
            clock,
            config: self.config,
        })
    }
}

/// The wired application.
pub struct App {
    pub controller: Arc<LifecycleController>,
    pub triage: Arc<DeadLetterTriage>,
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    config: RedriveConfig,
}

impl App {
    pub fn config(&self) -> &RedriveConfig {
        &self.config
    }

    /// An ingress sharing this app's store and clock.
    pub fn ingress(&self, publisher: Arc<dyn MessagePublisher>, ids: Arc<dyn IdGenerator>) -> Ingress {
        Ingress::new(Arc::clone(&self.store), publisher, ids, Arc::clone(&self.clock))
    }
}
