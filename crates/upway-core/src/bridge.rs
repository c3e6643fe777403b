// ── Bridge scheduler ──
//
// Startup: login, discovery, one immediate poll cycle.
// Steady state: one cycle per tick; a cycle never overlaps the next.
// Shutdown: stop ticking, give the publish queue a bounded time to drain.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use upway_api::PortalSession;

use crate::catalog::Catalog;
use crate::config::BridgeConfig;
use crate::discovery::{self, DeviceInfo};
use crate::error::CoreError;
use crate::poll::{self, PollReport};
use crate::publish::PublishSink;
use crate::topics::Topics;

const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Drives one portal session into one publish sink.
pub struct Bridge<S: PublishSink> {
    config: BridgeConfig,
    session: PortalSession,
    catalog: Catalog,
    topics: Topics,
    device: DeviceInfo,
    sink: S,
}

impl<S: PublishSink> Bridge<S> {
    pub fn new(config: BridgeConfig, session: PortalSession, catalog: Catalog, sink: S) -> Self {
        let topics = Topics::new(&config.root_topic, &config.discovery_prefix);
        let device = DeviceInfo::for_topics(&topics);
        Self {
            config,
            session,
            catalog,
            topics,
            device,
            sink,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn session(&self) -> &PortalSession {
        &self.session
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Authenticate, publish discovery, and run the first cycle.
    ///
    /// Login and discovery failures are returned; the first cycle's failure
    /// is only logged, like any later cycle. `cancel` is checked between the
    /// steps: once it fires the remaining steps are skipped and `Ok` is
    /// returned, so the caller still drains.
    pub async fn start(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        if stopping(cancel, "login") {
            return Ok(());
        }
        info!(
            system_id = self.session.system_id(),
            root = self.topics.root(),
            "logging in to portal"
        );
        self.session.authenticate().await?;
        info!("portal login succeeded");

        if stopping(cancel, "discovery") {
            return Ok(());
        }
        self.publish_discovery().await?;

        if stopping(cancel, "first poll cycle") {
            return Ok(());
        }
        self.run_logged_cycle().await;
        Ok(())
    }

    /// Publish the retained discovery config for every catalog entry.
    pub async fn publish_discovery(&self) -> Result<usize, CoreError> {
        discovery::publish_discovery(&self.sink, &self.catalog, &self.topics, &self.device).await
    }

    /// One fetch-and-publish cycle.
    pub async fn poll_once(&self) -> Result<PollReport, CoreError> {
        poll::run_cycle(&self.session, &self.catalog, &self.topics, &self.sink).await
    }

    async fn run_logged_cycle(&self) {
        match self.poll_once().await {
            Ok(report) => debug!(
                published = report.published,
                skipped = report.skipped,
                "poll cycle complete"
            ),
            Err(e) => warn!(error = %e, "poll cycle failed"),
        }
    }

    /// Run a cycle every `update_interval` until `cancel` fires. The first
    /// cycle runs one full interval from now; `start` covers the immediate
    /// one. Cancellation interrupts the wait, never a running cycle.
    pub async fn run(&self, cancel: CancellationToken) {
        let period = self.config.update_interval.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // consume the immediate first tick

        info!(interval_secs = period.as_secs(), "polling");
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => self.run_logged_cycle().await,
            }
        }
        debug!("poll loop stopped");
    }

    /// Wait until the sink reports nothing pending or `timeout` passes.
    /// Returns what is still pending.
    pub async fn drain(&self, timeout: Duration) -> usize {
        // No deadline means the timeout is too large to represent: wait on.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let pending = self.sink.pending_count();
            if pending == 0 {
                return 0;
            }
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return pending;
                    }
                    DRAIN_POLL.min(deadline - now)
                }
                None => DRAIN_POLL,
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// Drain within `shutdown_timeout`, then stop the sink.
    pub async fn shutdown(&self) -> usize {
        let pending = self.drain(self.config.shutdown_timeout).await;
        if pending == 0 {
            info!("publish queue drained");
        } else {
            warn!(pending, "shutting down with undelivered messages");
        }
        self.sink.shutdown().await;
        pending
    }
}

fn stopping(cancel: &CancellationToken, next: &str) -> bool {
    let cancelled = cancel.is_cancelled();
    if cancelled {
        info!(skipped = next, "shutdown requested during startup");
    }
    cancelled
}
