//! Daily refresh runner.
//!
//! Wakes once a day at the configured local hour and forces a refresh of
//! every enabled source, without needing a system scheduler.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Local, LocalResult, NaiveTime, TimeZone};

use crate::app::{AppContext, ConfluenceError, Result};
use crate::domain::RefreshOptions;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Local hour (0-23) of the daily run.
    pub refresh_hour: u32,
    /// Whether to refresh once immediately on start
    pub update_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_hour: 8,
            update_on_start: true,
        }
    }
}

/// The first `hour:00` local time strictly after `now`.
///
/// When that wall-clock time does not exist (a DST gap) the next hour is
/// used; when it is ambiguous the earlier instant wins.
pub fn next_run_after(now: DateTime<Local>, hour: u32) -> DateTime<Local> {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let mut day = now.date_naive();

    for _ in 0..3 {
        let naive = day.and_time(at);
        let candidate = match Local.from_local_datetime(&naive) {
            LocalResult::Single(t) => Some(t),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => Local
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest(),
        };
        if let Some(candidate) = candidate.filter(|t| *t > now) {
            return candidate;
        }
        day = day.succ_opt().unwrap_or(day);
    }
    now + Duration::days(1)
}

pub struct Scheduler {
    ctx: Arc<AppContext>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(ctx: Arc<AppContext>, config: SchedulerConfig) -> Self {
        Self { ctx, config }
    }

    pub fn pid_file_path() -> Option<PathBuf> {
        dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .map(|d| d.join("confluence").join("scheduler.pid"))
    }

    /// Whether a live scheduler process owns the PID file.
    pub fn is_running() -> bool {
        Self::recorded_pid().is_some_and(process_exists)
    }

    fn recorded_pid() -> Option<u32> {
        let path = Self::pid_file_path()?;
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    fn write_pid_file(&self) -> std::io::Result<()> {
        if let Some(pid_path) = Self::pid_file_path() {
            if let Some(parent) = pid_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&pid_path)?;
            writeln!(file, "{}", std::process::id())?;
        }
        Ok(())
    }

    fn remove_pid_file(&self) {
        if let Some(pid_path) = Self::pid_file_path() {
            let _ = fs::remove_file(pid_path);
        }
    }

    /// Run until SIGINT/SIGTERM (Ctrl-C on Windows).
    pub async fn run(&self) -> Result<()> {
        if Self::is_running() {
            return Err(ConfluenceError::Other(
                "another scheduler instance is already running".to_string(),
            ));
        }
        self.write_pid_file()
            .map_err(|e| ConfluenceError::Other(format!("failed to write PID file: {}", e)))?;

        let result = self.run_loop().await;
        self.remove_pid_file();
        result
    }

    async fn run_loop(&self) -> Result<()> {
        let shutdown = shutdown_signal()?;
        tokio::pin!(shutdown);

        tracing::info!(
            "scheduler started (daily at {:02}:00, PID {})",
            self.config.refresh_hour,
            std::process::id()
        );

        if self.config.update_on_start {
            tracing::info!("running initial refresh");
            self.run_update().await;
        }

        loop {
            let next = next_run_after(Local::now(), self.config.refresh_hour);
            let wait = (next - Local::now()).to_std().unwrap_or_default();
            tracing::info!("next refresh at {}", next.format("%Y-%m-%d %H:%M"));

            tokio::select! {
                _ = tokio::time::sleep(wait) => self.run_update().await,
                _ = &mut shutdown => break,
            }
        }

        tracing::info!("scheduler shutting down");
        Ok(())
    }

    async fn run_update(&self) {
        let start = Instant::now();
        match self.ctx.refresh(RefreshOptions::forced()).await {
            Ok(report) => tracing::info!(
                "scheduled refresh stored {} items ({:.1}s)",
                report.items.len(),
                start.elapsed().as_secs_f64()
            ),
            Err(e) => tracing::error!("scheduled refresh failed: {}", e),
        }
    }
}

#[cfg(unix)]
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
    })
}

#[cfg(unix)]
fn process_exists(pid: u32) -> bool {
    use std::process::Command;
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(windows)]
fn process_exists(pid: u32) -> bool {
    use std::process::Command;
    Command::new("tasklist")
        .args(["/FI", &format!("PID eq {}", pid)])
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).contains(&pid.to_string()))
        .unwrap_or(false)
}

/// Human-readable scheduler state for `confluence status`.
pub fn scheduler_status() -> String {
    match Scheduler::recorded_pid() {
        Some(pid) if process_exists(pid) => format!("Scheduler is running (PID: {})", pid),
        Some(_) => "Scheduler is not running (stale PID file)".to_string(),
        None => "Scheduler is not running".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, 0).earliest().unwrap()
    }

    #[test]
    fn test_next_run_later_today() {
        let now = local(2024, 3, 5, 6, 30);
        let next = next_run_after(now, 8);
        assert_eq!(next.date_naive(), now.date_naive());
        assert_eq!((next.hour(), next.minute()), (8, 0));
    }

    #[test]
    fn test_next_run_tomorrow_when_hour_passed() {
        let now = local(2024, 3, 5, 9, 15);
        let next = next_run_after(now, 8);
        assert_eq!(next.date_naive(), now.date_naive().succ_opt().unwrap());
        assert_eq!(next.hour(), 8);
    }

    #[test]
    fn test_next_run_is_strictly_after() {
        let now = local(2024, 3, 5, 8, 0);
        let next = next_run_after(now, 8);
        assert!(next > now);
        assert_eq!(next.date_naive(), now.date_naive().succ_opt().unwrap());
    }

    #[test]
    fn test_next_run_midnight_and_clamping() {
        let now = local(2024, 12, 31, 23, 59);
        let next = next_run_after(now, 0);
        assert_eq!(next.date_naive().to_string(), "2025-01-01");

        let clamped = next_run_after(local(2024, 6, 1, 1, 0), 99);
        assert_eq!(clamped.hour(), 23);
    }

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.refresh_hour, 8);
        assert!(config.update_on_start);
    }
}
