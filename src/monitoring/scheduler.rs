//! Recurring health checks for every monitored service.
//!
//! [`HealthCheckScheduler`] runs one reconciliation loop that periodically
//! re-lists services and keeps exactly one check task alive per eligible
//! service. Each check task owns its [`FailureStreak`]; nothing else reads or
//! writes it.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::models::{MonitoredService, ProbeOutcome, ProbeResult, ServiceId};
use super::probe::ProbeClient;
use super::status::Status;
use super::streak::{DEFAULT_FAILURE_THRESHOLD, FailureStreak, Transition};
use crate::db::store::{ServiceStore, StoreError};
use crate::notifications::{NotificationKind, NotificationSink};

pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Which slice of the service id space this process schedules.
///
/// Deployments running several instances give each one a distinct `index`
/// and the same `count`; every service is then probed by exactly one
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardAssignment {
    index: u32,
    count: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidShard {
    #[error("Shard count must be at least 1")]
    ZeroCount,
    #[error("Shard index {index} is out of range for {count} shards")]
    IndexOutOfRange { index: u32, count: u32 },
}

impl ShardAssignment {
    pub const SINGLE: ShardAssignment = ShardAssignment { index: 0, count: 1 };

    pub fn new(index: u32, count: u32) -> Result<Self, InvalidShard> {
        if count == 0 {
            return Err(InvalidShard::ZeroCount);
        }
        if index >= count {
            return Err(InvalidShard::IndexOutOfRange { index, count });
        }
        Ok(Self { index, count })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn owns(&self, service_id: Uuid) -> bool {
        service_id.as_u128() % u128::from(self.count) == u128::from(self.index)
    }
}

impl Default for ShardAssignment {
    fn default() -> Self {
        Self::SINGLE
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub failure_threshold: u32,
    pub reconcile_interval: Duration,
    pub shard: ShardAssignment,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            shard: ShardAssignment::SINGLE,
        }
    }
}

/// Collaborators shared by every check task.
pub(crate) struct CheckContext {
    store: Arc<dyn ServiceStore>,
    probe: Arc<dyn ProbeClient>,
    notifier: Arc<dyn NotificationSink>,
    failure_threshold: u32,
}

struct SchedulerRuntime {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct HealthCheckScheduler {
    context: Arc<CheckContext>,
    config: SchedulerConfig,
    runtime: Option<SchedulerRuntime>,
}

impl HealthCheckScheduler {
    pub fn new(
        store: Arc<dyn ServiceStore>,
        probe: Arc<dyn ProbeClient>,
        notifier: Arc<dyn NotificationSink>,
        config: SchedulerConfig,
    ) -> Self {
        let context = Arc::new(CheckContext {
            store,
            probe,
            notifier,
            failure_threshold: config.failure_threshold.max(1),
        });
        Self {
            context,
            config,
            runtime: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }

    /// Starts the reconciliation loop. The first pass runs immediately.
    pub fn start(&mut self) {
        if self.runtime.is_some() {
            warn!("Health check scheduler is already running.");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let registry = CheckRegistry::new(self.context.clone(), self.config.shard);
        let handle = tokio::spawn(reconcile_loop(
            registry,
            self.config.reconcile_interval,
            shutdown_rx,
        ));

        info!(
            reconcile_interval_secs = self.config.reconcile_interval.as_secs(),
            failure_threshold = self.context.failure_threshold,
            shard_index = self.config.shard.index(),
            shard_count = self.config.shard.count(),
            "Health check scheduler started."
        );
        self.runtime = Some(SchedulerRuntime {
            shutdown_tx,
            handle,
        });
    }

    /// Cancels every check task and waits for them to finish.
    pub async fn stop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };
        if runtime.shutdown_tx.send(true).is_err() {
            warn!("Reconciliation loop already exited before shutdown was requested.");
        }
        if let Err(e) = runtime.handle.await {
            error!(error = %e, "Reconciliation loop terminated abnormally.");
        }
        info!("Health check scheduler stopped.");
    }
}

async fn reconcile_loop(
    mut registry: CheckRegistry,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                info!("Shutdown signal received, stopping all health check tasks.");
                break;
            }

            _ = interval.tick() => {
                if let Err(e) = registry.reconcile().await {
                    error!(error = %e, "Failed to list services; keeping current health checks.");
                }
            }
        }
    }

    registry.shutdown().await;
}

struct RunningCheck {
    handle: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

impl RunningCheck {
    fn is_live(&self) -> bool {
        !self.handle.is_finished()
    }

    fn cancel(self) -> JoinHandle<()> {
        // The task may already have exited on its own.
        let _ = self.shutdown_tx.send(());
        self.handle
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReconcileSummary {
    pub started: usize,
    pub stopped: usize,
    pub kept: usize,
}

/// The service id → check task map. Owned by the reconciliation loop.
pub(crate) struct CheckRegistry {
    context: Arc<CheckContext>,
    shard: ShardAssignment,
    running: HashMap<ServiceId, RunningCheck>,
}

impl CheckRegistry {
    pub(crate) fn new(context: Arc<CheckContext>, shard: ShardAssignment) -> Self {
        Self {
            context,
            shard,
            running: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_scheduled(&self, service_id: ServiceId) -> bool {
        self.running
            .get(&service_id)
            .is_some_and(RunningCheck::is_live)
    }

    pub(crate) fn scheduled_count(&self) -> usize {
        self.running.values().filter(|check| check.is_live()).count()
    }

    /// Brings the running checks in line with the current service list.
    pub(crate) async fn reconcile(&mut self) -> Result<ReconcileSummary, StoreError> {
        let services = self.context.store.list_services().await?;
        let desired: HashMap<ServiceId, &MonitoredService> = services
            .iter()
            .filter(|service| service.ping.is_eligible() && self.shard.owns(service.id))
            .map(|service| (service.id, service))
            .collect();

        let mut summary = ReconcileSummary::default();

        // Tasks that exited on their own no longer count as scheduled.
        self.running.retain(|service_id, check| {
            let live = check.is_live();
            if !live {
                debug!(service_id = %service_id, "Dropping finished health check task.");
            }
            live
        });

        let stale: Vec<ServiceId> = self
            .running
            .keys()
            .filter(|service_id| !desired.contains_key(service_id))
            .copied()
            .collect();
        for service_id in stale {
            if let Some(check) = self.running.remove(&service_id) {
                info!(service_id = %service_id, "Stopping health check for removed or disabled service.");
                drop(check.cancel());
                summary.stopped += 1;
            }
        }

        for (service_id, service) in desired {
            if self.running.contains_key(&service_id) {
                summary.kept += 1;
                continue;
            }
            info!(service_id = %service_id, service_name = %service.name, "Starting health check.");
            let check = self.spawn_check(service);
            self.running.insert(service_id, check);
            summary.started += 1;
        }

        debug!(
            started = summary.started,
            stopped = summary.stopped,
            kept = summary.kept,
            scheduled = self.scheduled_count(),
            "Reconciliation pass finished."
        );
        Ok(summary)
    }

    fn spawn_check(&self, service: &MonitoredService) -> RunningCheck {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let check = ServiceCheck::new(
            service.id,
            service.ping.interval.as_duration(),
            self.context.clone(),
        );
        let handle = tokio::spawn(check.run(shutdown_rx));
        RunningCheck {
            handle,
            shutdown_tx,
        }
    }

    /// Cancels every check and waits for in-flight probes to drain.
    pub(crate) async fn shutdown(&mut self) {
        let handles: Vec<JoinHandle<()>> = self
            .running
            .drain()
            .map(|(_, check)| check.cancel())
            .collect();
        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Health check task terminated abnormally.");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Reschedule(Duration),
    Stop,
}

fn is_cancelled(shutdown_rx: &mut oneshot::Receiver<()>) -> bool {
    match shutdown_rx.try_recv() {
        Ok(()) | Err(oneshot::error::TryRecvError::Closed) => true,
        Err(oneshot::error::TryRecvError::Empty) => false,
    }
}

/// The recurring check of one service.
pub(crate) struct ServiceCheck {
    service_id: ServiceId,
    interval: Duration,
    context: Arc<CheckContext>,
    streak: FailureStreak,
}

impl ServiceCheck {
    pub(crate) fn new(service_id: ServiceId, interval: Duration, context: Arc<CheckContext>) -> Self {
        Self {
            service_id,
            interval,
            context,
            streak: FailureStreak::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn streak(&self) -> &FailureStreak {
        &self.streak
    }

    async fn run(mut self, mut shutdown_rx: oneshot::Receiver<()>) {
        debug!(service_id = %self.service_id, "Health check task started.");
        loop {
            let delay = match self.tick(&mut shutdown_rx).await {
                TickOutcome::Reschedule(delay) => delay,
                TickOutcome::Stop => break,
            };

            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        debug!(service_id = %self.service_id, "Health check task finished.");
    }

    /// Loads the service, returning `None` when it is gone or no longer
    /// eligible for checks.
    async fn load_eligible(&self) -> Result<Option<MonitoredService>, StoreError> {
        let service = self.context.store.get_service(self.service_id).await?;
        match service {
            Some(service) if service.ping.is_eligible() => Ok(Some(service)),
            Some(_) => {
                info!(service_id = %self.service_id, "Health checks disabled or URL missing; stopping task.");
                Ok(None)
            }
            None => {
                info!(service_id = %self.service_id, "Service no longer exists; stopping task.");
                Ok(None)
            }
        }
    }

    /// One probe cycle. Ticks of the same service never overlap.
    pub(crate) async fn tick(&mut self, shutdown_rx: &mut oneshot::Receiver<()>) -> TickOutcome {
        let service = match self.load_eligible().await {
            Ok(Some(service)) => service,
            Ok(None) => return TickOutcome::Stop,
            Err(e) => {
                error!(service_id = %self.service_id, error = %e, "Failed to load service before probing.");
                return TickOutcome::Reschedule(self.interval);
            }
        };
        let Some(url) = service.ping.target().map(str::to_owned) else {
            return TickOutcome::Stop;
        };

        let result = self.context.probe.probe(&url).await;

        if is_cancelled(shutdown_rx) {
            debug!(service_id = %self.service_id, "Check cancelled while probing; discarding result.");
            return TickOutcome::Stop;
        }

        // Status and settings may have changed while the probe was in flight.
        let service = match self.load_eligible().await {
            Ok(Some(service)) => service,
            Ok(None) => return TickOutcome::Stop,
            Err(e) => {
                error!(service_id = %self.service_id, error = %e, "Failed to reload service after probing.");
                return TickOutcome::Reschedule(self.interval);
            }
        };
        if is_cancelled(shutdown_rx) {
            debug!(service_id = %self.service_id, "Check cancelled while reloading service; discarding result.");
            return TickOutcome::Stop;
        }
        self.interval = service.ping.interval.as_duration();

        self.apply(&service, result).await;
        TickOutcome::Reschedule(self.interval)
    }

    async fn apply(&mut self, service: &MonitoredService, result: ProbeResult) {
        let threshold = self.context.failure_threshold;
        let transition = match result.status.outcome() {
            ProbeOutcome::Failure => {
                let transition = self.streak.record_failure(service.status, threshold);
                warn!(
                    service_id = %service.id,
                    probe_status = ?result.status,
                    consecutive_failures = self.streak.consecutive_failures(),
                    "Health check failed."
                );
                transition
            }
            ProbeOutcome::Success => self.streak.record_success(service.status, threshold),
            ProbeOutcome::Indeterminate => {
                debug!(service_id = %service.id, "Health check result is indeterminate.");
                Transition::None
            }
        };

        match transition {
            Transition::None => self.record(result).await,
            Transition::Escalate => self.escalate(service, result).await,
            Transition::Restore(status) => self.restore(service, status, result).await,
        }
    }

    async fn record(&self, result: ProbeResult) {
        if let Err(e) = self
            .context
            .store
            .record_probe_result(self.service_id, result)
            .await
        {
            error!(service_id = %self.service_id, error = %e, "Failed to persist probe result.");
        }
    }

    async fn escalate(&self, service: &MonitoredService, result: ProbeResult) {
        let failures = self.streak.consecutive_failures();
        if let Err(e) = self
            .context
            .store
            .update_service_status(service.id, Status::MajorOutage, result)
            .await
        {
            error!(service_id = %service.id, error = %e, "Failed to persist escalation; will retry on the next failed check.");
            return;
        }

        warn!(
            service_id = %service.id,
            service_name = %service.name,
            consecutive_failures = failures,
            previous_status = %service.status,
            "Service escalated to major outage."
        );
        if !service.ping.alerts_muted {
            self.notify(
                NotificationKind::Error,
                format!("{} is down", service.name),
                format!(
                    "{} failed {failures} consecutive health checks and has been marked as a major outage.",
                    service.name
                ),
            )
            .await;
        }
    }

    async fn restore(&mut self, service: &MonitoredService, status: Status, result: ProbeResult) {
        if let Err(e) = self
            .context
            .store
            .update_service_status(service.id, status, result)
            .await
        {
            error!(service_id = %service.id, error = %e, "Failed to persist restoration; will retry on the next successful check.");
            return;
        }

        self.streak.reset();
        info!(
            service_id = %service.id,
            service_name = %service.name,
            restored_status = %status,
            "Service recovered from scheduler-induced outage."
        );
        if !service.ping.alerts_muted {
            self.notify(
                NotificationKind::Success,
                format!("{} has recovered", service.name),
                format!(
                    "{} is responding again; status restored to {status}.",
                    service.name
                ),
            )
            .await;
        }
    }

    async fn notify(&self, kind: NotificationKind, title: String, message: String) {
        if let Err(e) = self.context.notifier.notify(kind, &title, &message).await {
            error!(service_id = %self.service_id, error = %e, "Failed to send health check notification.");
        }
    }
}
