//! Identity service reachability monitor.
//!
//! Feeds the "backend online/offline" indicator. A single task probes the health
//! endpoint; on failure it waits `min(1s * 2^retry, 10s)` and tries again, at most
//! `max_retries` times, then idles until someone asks for a refresh. The latest
//! [`StatusSnapshot`] is published on a `watch` channel. This is display-only and
//! nothing on the auth path consults it.

use std::sync::Arc;
use std::time::Duration;

use adapters::HealthCheck;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub const BASE_DELAY: Duration = Duration::from_millis(1_000);
pub const MAX_DELAY: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Checking,
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: BackendStatus,
    pub retries: u32,
    pub max_retries: u32,
    pub last_checked: Option<DateTime<Utc>>,
    pub label: String,
}

impl StatusSnapshot {
    /// The state before the first probe completes.
    pub fn new(max_retries: u32) -> Self {
        let mut snapshot = Self {
            status: BackendStatus::Checking,
            retries: 0,
            max_retries,
            last_checked: None,
            label: String::new(),
        };
        snapshot.relabel();
        snapshot
    }

    /// Retries are used up and the service is still down.
    pub fn exhausted(&self) -> bool {
        self.status == BackendStatus::Offline && self.retries >= self.max_retries
    }

    fn relabel(&mut self) {
        self.label = match self.status {
            BackendStatus::Checking => "Checking...".to_string(),
            BackendStatus::Online => "Backend Online".to_string(),
            BackendStatus::Offline if self.retries > 0 => {
                format!("Backend Offline (Retry {}/{})", self.retries, self.max_retries)
            }
            BackendStatus::Offline => "Backend Offline".to_string(),
        };
    }
}

#[async_trait]
pub trait Probe: Send + Sync + 'static {
    /// `true` when the service answered healthy within its timeout.
    async fn probe(&self) -> bool;
}

#[async_trait]
impl Probe for HealthCheck {
    async fn probe(&self) -> bool {
        HealthCheck::probe(self).await
    }
}

/// Delay before retry number `retry + 1`.
pub fn backoff_delay(retry: u32) -> Duration {
    let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
    BASE_DELAY.saturating_mul(factor).min(MAX_DELAY)
}

/// Read side of the monitor, cheap to clone into request state.
#[derive(Clone)]
pub struct StatusHandle {
    rx: watch::Receiver<StatusSnapshot>,
    refresh: Arc<Notify>,
}

impl StatusHandle {
    /// A handle that always reports `snapshot` and ignores refreshes.
    pub fn detached(snapshot: StatusSnapshot) -> Self {
        let (_tx, rx) = watch::channel(snapshot);
        Self {
            rx,
            refresh: Arc::new(Notify::new()),
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.rx.clone()
    }

    /// Restarts the probe cycle with a fresh retry budget.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }
}

/// Owns the probing task; dropping it stops the task.
pub struct StatusMonitor {
    handle: StatusHandle,
    task: JoinHandle<()>,
}

impl StatusMonitor {
    pub fn spawn(probe: Arc<dyn Probe>, max_retries: u32) -> Self {
        let (tx, rx) = watch::channel(StatusSnapshot::new(max_retries));
        let refresh = Arc::new(Notify::new());
        let task = tokio::spawn(run(probe, tx, refresh.clone(), max_retries));
        Self {
            handle: StatusHandle { rx, refresh },
            task,
        }
    }

    pub fn handle(&self) -> StatusHandle {
        self.handle.clone()
    }
}

impl Drop for StatusMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    probe: Arc<dyn Probe>,
    tx: watch::Sender<StatusSnapshot>,
    refresh: Arc<Notify>,
    max_retries: u32,
) {
    let mut retries = 0;
    loop {
        tx.send_modify(|s| {
            s.status = BackendStatus::Checking;
            s.retries = retries;
            s.relabel();
        });

        let online = probe.probe().await;
        let status = if online {
            BackendStatus::Online
        } else {
            BackendStatus::Offline
        };
        tx.send_modify(|s| {
            s.status = status;
            s.last_checked = Some(Utc::now());
            s.relabel();
        });
        debug!(?status, retries, "identity service probed");

        if online || retries >= max_retries {
            if !online {
                info!(retries, "identity service still offline, waiting for manual refresh");
            }
            refresh.notified().await;
            retries = 0;
            continue;
        }

        tokio::select! {
            _ = tokio::time::sleep(backoff_delay(retries)) => retries += 1,
            _ = refresh.notified() => retries = 0,
        }
    }
}
