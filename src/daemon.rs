//! Timer-driven posting.
//!
//! Runs the pipeline on a fixed interval until SIGINT/SIGTERM, without
//! requiring system scheduler configuration.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::pipeline::Pipeline;

/// Longest accepted posting interval (one year).
pub const MAX_INTERVAL_SECS: u64 = 366 * 86400;

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Posting interval like "6h" or "1d" (default: 1d)
    pub interval: String,
    /// Whether to post immediately on start
    pub run_on_start: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval: "1d".to_string(),
            run_on_start: true,
        }
    }
}

impl DaemonConfig {
    /// Parse interval string like "1h", "30m", "6h", "1d"
    pub fn parse_interval(s: &str) -> Result<u64, String> {
        let s = s.trim().to_lowercase();

        let scaled = |n: u64, unit: u64| {
            n.checked_mul(unit)
                .ok_or_else(|| format!("Interval too large: {}", s))
        };

        let secs = if let Some(hours) = s.strip_suffix('h') {
            hours
                .parse::<u64>()
                .map_err(|_| format!("Invalid hours: {}", hours))
                .and_then(|h| scaled(h, 3600))
        } else if let Some(minutes) = s.strip_suffix('m') {
            minutes
                .parse::<u64>()
                .map_err(|_| format!("Invalid minutes: {}", minutes))
                .and_then(|m| scaled(m, 60))
        } else if let Some(days) = s.strip_suffix('d') {
            days.parse::<u64>()
                .map_err(|_| format!("Invalid days: {}", days))
                .and_then(|d| scaled(d, 86400))
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map_err(|_| format!("Invalid seconds: {}", secs))
        } else {
            // Try parsing as raw seconds
            s.parse::<u64>()
                .map_err(|_| format!("Invalid interval: {}. Use format like '1h', '30m', '1d'", s))
        }?;

        if secs == 0 {
            return Err("Interval must be greater than zero".to_string());
        }
        if secs > MAX_INTERVAL_SECS {
            return Err(format!(
                "Interval too large: {} (at most {})",
                s,
                Self::format_interval(MAX_INTERVAL_SECS)
            ));
        }
        Ok(secs)
    }

    /// Format interval for display
    pub fn format_interval(secs: u64) -> String {
        if secs >= 86400 && secs.is_multiple_of(86400) {
            format!("{}d", secs / 86400)
        } else if secs >= 3600 && secs.is_multiple_of(3600) {
            format!("{}h", secs / 3600)
        } else if secs >= 60 && secs.is_multiple_of(60) {
            format!("{}m", secs / 60)
        } else {
            format!("{}s", secs)
        }
    }

    pub fn interval(&self) -> Result<Duration, String> {
        Self::parse_interval(&self.interval).map(Duration::from_secs)
    }
}

/// Daemon runner
pub struct Daemon {
    pipeline: Arc<Pipeline>,
    interval: Duration,
    run_on_start: bool,
}

impl Daemon {
    pub fn new(pipeline: Arc<Pipeline>, interval: Duration, run_on_start: bool) -> Self {
        Self {
            pipeline,
            interval,
            run_on_start,
        }
    }

    /// Run until SIGINT or SIGTERM.
    pub async fn run(&self) {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` completes. A run in progress is finished first.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "almanac daemon started (interval: {}, PID: {})",
            DaemonConfig::format_interval(self.interval.as_secs()),
            std::process::id()
        );

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await; // Skip the first immediate tick

        if self.run_on_start {
            info!("Running initial post...");
            self.run_scheduled().await;
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = timer.tick() => {
                    info!("Running scheduled post...");
                    self.run_scheduled().await;
                }
            }
        }

        info!("Daemon shutting down...");
    }

    async fn run_scheduled(&self) {
        let started = tokio::time::Instant::now();
        let outcome = self.pipeline.run_once().await;
        let elapsed = started.elapsed().as_secs_f64();

        if outcome.is_success() {
            info!("Run complete: {} ({:.1}s)", outcome.detail, elapsed);
        } else {
            warn!("Run failed: {} ({:.1}s)", outcome.detail, elapsed);
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                }
            }
            _ => {
                warn!("Failed to install signal handlers, falling back to Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
