// Usage poller
//
// A single task owns the polling loop, so cycles never overlap. Three things
// start a cycle: the interval ticker, a manual refresh from a PollerHandle,
// and a change of the monitored feature. Ticks that fall due while a cycle is
// running are skipped, not queued. A feature change or shutdown cancels the
// in-flight cycle and nothing from it is committed.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::error::PollerError;
use crate::monitor::{CycleReport, CycleTrigger, UsageMonitor};

type CycleReply = oneshot::Sender<Result<CycleReport, PollerError>>;

enum Command {
    Refresh {
        feature_id: Option<String>,
        reply: CycleReply,
    },
}

/// Handle to a running poller
///
/// Cheap to clone. Dropping every handle does not stop the poller; call
/// [`PollerHandle::shutdown`].
#[derive(Clone)]
pub struct PollerHandle {
    monitor: Arc<UsageMonitor>,
    commands: mpsc::Sender<Command>,
    feature_tx: Arc<watch::Sender<Option<String>>>,
    shutdown: CancellationToken,
}

impl PollerHandle {
    pub fn monitor(&self) -> &Arc<UsageMonitor> {
        &self.monitor
    }

    /// Feature currently being polled
    pub fn current_feature(&self) -> Option<String> {
        self.feature_tx.borrow().clone()
    }

    /// Switch the monitored feature
    ///
    /// Cancels any in-flight cycle and starts a new one. Returns false when the
    /// feature was already selected.
    pub fn set_feature(&self, feature_id: impl Into<String>) -> bool {
        let feature_id = normalize(feature_id.into());
        self.feature_tx.send_if_modified(|current| {
            if *current == feature_id {
                false
            } else {
                *current = feature_id;
                true
            }
        })
    }

    /// Run a cycle now and wait for its report
    ///
    /// With `Some(feature_id)` the poller switches to that feature first.
    /// Requests queue behind a running cycle.
    pub async fn refresh(&self, feature_id: Option<String>) -> Result<CycleReport, PollerError> {
        if self.shutdown.is_cancelled() {
            return Err(PollerError::Shutdown);
        }

        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Refresh {
                feature_id: feature_id.and_then(normalize),
                reply,
            })
            .await
            .map_err(|_| PollerError::ChannelClosed)?;

        match response.await {
            Ok(result) => result,
            Err(_) if self.shutdown.is_cancelled() => Err(PollerError::Shutdown),
            Err(_) => Err(PollerError::ChannelClosed),
        }
    }

    /// Stop the poller, cancelling any in-flight cycle
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// The polling task
pub struct UsagePoller {
    monitor: Arc<UsageMonitor>,
    config: MonitorConfig,
    commands: mpsc::Receiver<Command>,
    feature_tx: Arc<watch::Sender<Option<String>>>,
    feature_rx: watch::Receiver<Option<String>>,
    shutdown: CancellationToken,
}

impl UsagePoller {
    /// Start polling on the current runtime
    pub fn spawn(monitor: Arc<UsageMonitor>, config: MonitorConfig) -> (PollerHandle, JoinHandle<()>) {
        let (command_tx, commands) = mpsc::channel(config.command_buffer.max(1));
        let (feature_tx, feature_rx) = watch::channel(config.feature_id.clone().and_then(normalize));
        let feature_tx = Arc::new(feature_tx);
        let shutdown = CancellationToken::new();

        let handle = PollerHandle {
            monitor: monitor.clone(),
            commands: command_tx,
            feature_tx: feature_tx.clone(),
            shutdown: shutdown.clone(),
        };

        let poller = UsagePoller {
            monitor,
            config,
            commands,
            feature_tx,
            feature_rx,
            shutdown,
        };

        (handle, tokio::spawn(poller.run()))
    }

    async fn run(mut self) {
        info!(
            feature_id = ?self.feature_rx.borrow().as_deref(),
            interval_secs = self.config.poll_interval.as_secs(),
            "Usage poller started"
        );

        // First tick completes immediately
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!("Received shutdown signal, stopping usage poller");
                    break;
                }

                changed = self.feature_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    ticker.reset();
                    let result = self.execute(CycleTrigger::FeatureChange).await;
                    log_result(CycleTrigger::FeatureChange, &result);
                }

                Some(command) = self.commands.recv() => {
                    match command {
                        Command::Refresh { feature_id, reply } => {
                            if let Some(feature_id) = feature_id {
                                self.switch_feature(feature_id, &mut ticker);
                            }
                            let result = self.execute(CycleTrigger::Manual).await;
                            log_result(CycleTrigger::Manual, &result);
                            // Caller may have given up waiting
                            let _ = reply.send(result);
                        }
                    }
                }

                _ = ticker.tick() => {
                    let result = self.execute(CycleTrigger::Interval).await;
                    log_result(CycleTrigger::Interval, &result);
                }
            }
        }

        info!("Usage poller stopped");
    }

    /// Select a feature from within the loop without queueing a second cycle for it
    fn switch_feature(&mut self, feature_id: String, ticker: &mut tokio::time::Interval) {
        let changed = self.feature_tx.send_if_modified(|current| {
            if current.as_deref() == Some(feature_id.as_str()) {
                false
            } else {
                *current = Some(feature_id);
                true
            }
        });
        // execute() marks the new value seen
        if changed {
            ticker.reset();
        }
    }

    /// Run one cycle for the current feature, racing it against shutdown and
    /// feature change
    async fn execute(&mut self, trigger: CycleTrigger) -> Result<CycleReport, PollerError> {
        let feature_id = self
            .feature_rx
            .borrow_and_update()
            .clone()
            .ok_or(PollerError::NoFeature)?;

        let guard_rx = self.feature_rx.clone();
        let expected = feature_id.clone();
        let still_current = move || guard_rx.borrow().as_deref() == Some(expected.as_str());

        let mut change_rx = self.feature_rx.clone();
        let cycle = self.monitor.run_guarded(&feature_id, trigger, still_current);

        tokio::select! {
            biased;

            _ = self.shutdown.cancelled() => Err(PollerError::Shutdown),
            _ = feature_changed_from(&mut change_rx, &feature_id) => {
                Err(PollerError::superseded(feature_id.as_str()))
            }
            result = cycle => result,
        }
    }
}

/// Resolves once the watched feature differs from `feature_id`
async fn feature_changed_from(rx: &mut watch::Receiver<Option<String>>, feature_id: &str) {
    loop {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        if rx.borrow_and_update().as_deref() != Some(feature_id) {
            return;
        }
    }
}

fn log_result(trigger: CycleTrigger, result: &Result<CycleReport, PollerError>) {
    match result {
        Ok(report) => debug!(
            trigger = %trigger,
            feature_id = %report.feature_id,
            notifications = report.events.len(),
            "Cycle finished"
        ),
        Err(PollerError::NoFeature) => debug!(trigger = %trigger, "No feature selected, skipping cycle"),
        Err(PollerError::Superseded { feature_id }) => {
            info!(trigger = %trigger, feature_id = %feature_id, "Cycle superseded by feature change")
        }
        Err(PollerError::Shutdown) => debug!(trigger = %trigger, "Cycle cancelled by shutdown"),
        Err(e) => warn!(trigger = %trigger, error = %e, "Cycle failed"),
    }
}

fn normalize(feature_id: String) -> Option<String> {
    let trimmed = feature_id.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_feature_id() {
        assert_eq!(normalize("  feat_1 ".to_string()), Some("feat_1".to_string()));
        assert_eq!(normalize("   ".to_string()), None);
    }

    #[tokio::test]
    async fn test_feature_changed_from_ignores_same_value() {
        let (tx, rx) = watch::channel(Some("a".to_string()));
        let mut change_rx = rx.clone();

        tx.send_replace(Some("a".to_string()));
        tx.send_replace(Some("b".to_string()));

        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            feature_changed_from(&mut change_rx, "a"),
        )
        .await
        .unwrap();
    }
}
