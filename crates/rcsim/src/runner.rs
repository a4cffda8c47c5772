//! ngspice process runner.
//!
//! Each sweep iteration runs ngspice once in batch mode and waits for it.
//! The outcome is reported as a [`SimulationOutcome`] tag instead of an
//! error so the sweep can tell a missing tool, a failed run and a user
//! interrupt apart.

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::SimulatorConfig;
use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of one simulator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationOutcome {
    /// The simulator exited successfully and its log can be decoded.
    Completed,
    /// The executable could not be started.
    ToolMissing(String),
    /// The simulator ran but failed (non-zero exit, timeout, wait error).
    ExecutionFailed(String),
    /// The run was interrupted by the user.
    Cancelled,
}

/// Shared interrupt flag, raised from a signal handler and polled here.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Something that can turn a top-level deck into a measurement log.
pub trait CircuitSimulator {
    /// Simulate `top`, writing the batch log to `log`. Blocks until done.
    fn simulate(&self, top: &Path, log: &Path, cancel: &CancelFlag) -> SimulationOutcome;
}

/// ngspice invoked as `ngspice -b -o <log> <top>`.
#[derive(Debug, Clone, Default)]
pub struct Ngspice {
    config: SimulatorConfig,
}

impl Ngspice {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }
}

impl CircuitSimulator for Ngspice {
    fn simulate(&self, top: &Path, log: &Path, cancel: &CancelFlag) -> SimulationOutcome {
        // -b: batch mode
        // -o log: write measurement output to the log file
        let child = Command::new(&self.config.executable)
            .arg("-b")
            .arg("-o")
            .arg(log)
            .arg(top)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                return SimulationOutcome::ToolMissing(format!("{}: {}", self.config.executable, e));
            }
        };

        let timeout = self.config.timeout_secs.map(Duration::from_secs);
        match wait_cancellable(child, timeout, cancel) {
            Ok(Wait::Exited(status)) => classify_exit(status),
            Ok(Wait::Cancelled) => SimulationOutcome::Cancelled,
            Ok(Wait::TimedOut(limit)) => SimulationOutcome::ExecutionFailed(format!(
                "ngspice timed out after {} seconds",
                limit.as_secs()
            )),
            Err(e) => SimulationOutcome::ExecutionFailed(e.to_string()),
        }
    }
}

fn classify_exit(status: ExitStatus) -> SimulationOutcome {
    if status.success() {
        return SimulationOutcome::Completed;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        // SIGINT from the terminal reaches ngspice too.
        const SIGINT: i32 = 2;
        if status.signal() == Some(SIGINT) {
            return SimulationOutcome::Cancelled;
        }
    }

    SimulationOutcome::ExecutionFailed(format!("ngspice exited with {}", status))
}

enum Wait {
    Exited(ExitStatus),
    Cancelled,
    TimedOut(Duration),
}

/// Wait for a child, killing it if the flag is raised or the limit passes.
fn wait_cancellable(
    mut child: Child,
    timeout: Option<Duration>,
    cancel: &CancelFlag,
) -> std::io::Result<Wait> {
    let start = Instant::now();

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Wait::Exited(status));
        }

        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(Wait::Cancelled);
        }

        if let Some(limit) = timeout {
            if start.elapsed() > limit {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(Wait::TimedOut(limit));
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Check if ngspice is available.
pub fn is_ngspice_available(config: &SimulatorConfig) -> bool {
    Command::new(&config.executable)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Get ngspice version string.
pub fn ngspice_version(config: &SimulatorConfig) -> Result<String> {
    let output = Command::new(&config.executable)
        .arg("--version")
        .output()
        .map_err(|e| Error::SimulatorNotFound(e.to_string()))?;

    if !output.status.success() {
        return Err(Error::SimulatorNotFound("--version failed".to_string()));
    }

    let version = String::from_utf8_lossy(&output.stdout);
    Ok(version
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("unknown")
        .trim()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!flag.is_cancelled());
        other.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Ngspice::new(SimulatorConfig {
            executable: "rcsim-no-such-simulator".to_string(),
            timeout_secs: None,
        });
        let outcome = sim.simulate(
            &dir.path().join("top.cir"),
            &dir.path().join("out.log"),
            &CancelFlag::new(),
        );
        assert!(matches!(outcome, SimulationOutcome::ToolMissing(_)));
        assert!(!is_ngspice_available(sim.config()));
        assert!(ngspice_version(sim.config()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_execution_failure() {
        let dir = tempfile::tempdir().unwrap();
        let sim = Ngspice::new(SimulatorConfig {
            executable: "false".to_string(),
            timeout_secs: None,
        });
        let outcome = sim.simulate(
            &dir.path().join("top.cir"),
            &dir.path().join("out.log"),
            &CancelFlag::new(),
        );
        assert!(matches!(outcome, SimulationOutcome::ExecutionFailed(_)));
    }

    #[cfg(unix)]
    fn spawn_sleeper() -> Child {
        Command::new("sleep")
            .arg("30")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_raised_flag_kills_child() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let wait = wait_cancellable(spawn_sleeper(), None, &cancel).unwrap();
        assert!(matches!(wait, Wait::Cancelled));
    }

    #[cfg(unix)]
    #[test]
    fn test_time_limit_kills_child() {
        let limit = Duration::from_millis(100);
        let start = Instant::now();
        let wait = wait_cancellable(spawn_sleeper(), Some(limit), &CancelFlag::new()).unwrap();
        assert!(matches!(wait, Wait::TimedOut(l) if l == limit));
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[cfg(unix)]
    #[test]
    fn test_wait_reports_exit_status() {
        let child = Command::new("true").spawn().unwrap();
        let wait = wait_cancellable(child, None, &CancelFlag::new()).unwrap();
        match wait {
            Wait::Exited(status) => {
                assert_eq!(classify_exit(status), SimulationOutcome::Completed)
            }
            _ => panic!("expected exit"),
        }
    }

    #[test]
    #[ignore = "requires ngspice"]
    fn test_ngspice_version() {
        let config = SimulatorConfig::default();
        if is_ngspice_available(&config) {
            let version = ngspice_version(&config).unwrap();
            assert!(!version.is_empty());
        }
    }
}
