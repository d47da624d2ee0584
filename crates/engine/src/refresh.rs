//! Pull-only refresh driver for the command console.
//!
//! Fetch cycles run on mount, on the tab regaining visibility, on the
//! post-dispatch `RefreshDue` event, and on explicit manual refresh. There
//! is no standing interval subscription; this bounds remote read volume.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use devrelay_types::CommandLog;
use tokio::time::Instant;
use tracing::warn;

use crate::config::ConsoleConfig;
use crate::reconciler::CommandConsole;

/// Drives fetch-and-request-output cycles and holds the merged view.
pub struct RefreshDriver {
    console: Arc<CommandConsole>,
    config: ConsoleConfig,
    view: Mutex<Vec<CommandLog>>,
    refreshing: AtomicBool,
}

impl RefreshDriver {
    pub fn new(console: Arc<CommandConsole>, config: ConsoleConfig) -> Self {
        Self {
            console,
            config,
            view: Mutex::new(Vec::new()),
            refreshing: AtomicBool::new(false),
        }
    }

    /// The last merged view: optimistic entries first, then the server log.
    pub fn view(&self) -> Vec<CommandLog> {
        self.view.lock().expect("view lock poisoned").clone()
    }

    /// Whether a manual refresh is visibly in progress.
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    /// Initial mount: one fetch cycle.
    pub async fn on_mount(&self) {
        self.fetch_once().await;
    }

    /// Tab regained visibility: one fetch cycle.
    pub async fn on_visible(&self) {
        self.fetch_once().await;
    }

    /// A background dispatch asked for a near-term re-fetch.
    pub async fn on_refresh_due(&self) {
        self.fetch_once().await;
    }

    /// Explicit manual refresh: request fresh output for active commands,
    /// fetch, then fetch again after a fixed delay to catch the agent's
    /// response. The refreshing flag stays raised for at least the
    /// configured minimum so the indicator does not flicker.
    pub async fn manual_refresh(&self) {
        self.refreshing.store(true, Ordering::SeqCst);
        let started = Instant::now();

        let active: Vec<CommandLog> = self.view().into_iter().filter(CommandLog::is_active).collect();
        self.console.request_output(&active, self.config.output_request_timeout_secs).await;
        self.fetch_once().await;

        let elapsed = started.elapsed();
        if elapsed < self.config.min_refresh_visible {
            tokio::time::sleep(self.config.min_refresh_visible - elapsed).await;
        }
        self.refreshing.store(false, Ordering::SeqCst);

        tokio::time::sleep(self.config.manual_refresh_followup_delay).await;
        self.fetch_once().await;
    }

    /// One fetch-and-merge cycle. Failures degrade to a stale view and are
    /// logged; the next trigger is the retry.
    async fn fetch_once(&self) {
        match self.console.fetch_merged().await {
            Ok(merged) => {
                *self.view.lock().expect("view lock poisoned") = merged;
            }
            Err(error) => {
                warn!("log refresh failed, keeping stale view: {error}");
            }
        }
    }
}
