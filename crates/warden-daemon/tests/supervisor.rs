//! End-to-end tests for the supervisor in foreground mode.
//!
//! These run `Daemon::start` on the test thread without forking. No test here
//! raises a signal: the installed shutdown action would exit the test binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tempfile::TempDir;
use warden_daemon::{from_fn, Daemon, DaemonConfig, DaemonError, LoopExit, Severity, WorkError};

// ============================================================================
// Test Helpers
// ============================================================================

fn foreground_config(dir: &Path) -> DaemonConfig {
    DaemonConfig {
        daemon: false,
        delay: 1,
        pid_file: dir.join("daemon.pid"),
        log_file: dir.join("daemon.log"),
        ..Default::default()
    }
}

fn critical_lines(log: &PathBuf) -> Vec<String> {
    fs::read_to_string(log)
        .unwrap()
        .lines()
        .filter(|l| l.contains("[critical]"))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Time budget
// ============================================================================

#[test]
fn test_counter_reaches_three_then_stops() {
    let dir = TempDir::new().unwrap();
    let config = DaemonConfig {
        time_limit: 3,
        ..foreground_config(dir.path())
    };
    let pid_path = config.pid_file.clone();
    let mut counter = 0;

    let started = Instant::now();
    let exit = Daemon::new(from_fn(|_| {
        counter += 1;
        Ok(())
    }))
    .configure(config)
    .start()
    .unwrap();

    assert_eq!(counter, 3);
    assert_eq!(exit, LoopExit::TimeLimit { iterations: 3 });
    assert!(started.elapsed().as_secs() >= 3);
    assert!(!pid_path.exists());
}

#[test]
fn test_pid_file_holds_own_pid_while_running() {
    let dir = TempDir::new().unwrap();
    let config = DaemonConfig {
        time_limit: 1,
        ..foreground_config(dir.path())
    };
    let pid_path = config.pid_file.clone();
    let mut seen = String::new();

    Daemon::new(from_fn(|_| {
        seen = fs::read_to_string(&pid_path).unwrap();
        Ok(())
    }))
    .configure(config.clone())
    .start()
    .unwrap();

    assert_eq!(seen, std::process::id().to_string());
    assert!(!config.pid_file.exists());
}

#[test]
fn test_log_records_start_and_stop() {
    let dir = TempDir::new().unwrap();
    let config = DaemonConfig {
        time_limit: 1,
        log_level: Severity::Debug,
        ..foreground_config(dir.path())
    };
    let log_path = config.log_file.clone();

    Daemon::new(from_fn(|ctx| {
        ctx.logger().debug(format!("tick {}", ctx.iteration()));
        Ok(())
    }))
    .configure(config)
    .start()
    .unwrap();

    let contents = fs::read_to_string(&log_path).unwrap();
    assert!(contents.contains("daemon started"));
    assert!(contents.contains("[debug]\t tick 1"));
    assert!(contents.contains("daemon stopped"));
}

#[test]
fn test_threshold_suppresses_log_file() {
    let dir = TempDir::new().unwrap();
    let config = DaemonConfig {
        time_limit: 1,
        log_level: Severity::Warning,
        ..foreground_config(dir.path())
    };
    let log_path = config.log_file.clone();

    Daemon::new(from_fn(|ctx| {
        ctx.logger().info("routine");
        ctx.logger().debug("noise");
        Ok(())
    }))
    .configure(config)
    .start()
    .unwrap();

    assert!(!log_path.exists());
}

// ============================================================================
// Singleton
// ============================================================================

#[test]
fn test_existing_pid_file_refuses_to_start() {
    let dir = TempDir::new().unwrap();
    let config = foreground_config(dir.path());
    fs::write(&config.pid_file, "4242").unwrap();
    let mut called = false;

    let result = Daemon::new(from_fn(|_| {
        called = true;
        Ok(())
    }))
    .configure(config.clone())
    .start();

    match result {
        Err(DaemonError::AlreadyRunning { pid, .. }) => assert_eq!(pid, 4242),
        other => panic!("expected AlreadyRunning, got {:?}", other),
    }
    assert!(!called);
    assert_eq!(fs::read_to_string(&config.pid_file).unwrap(), "4242");
    assert!(!config.log_file.exists());
}

#[test]
fn test_garbage_pid_file_is_overwritten() {
    let dir = TempDir::new().unwrap();
    let config = DaemonConfig {
        time_limit: 1,
        ..foreground_config(dir.path())
    };
    fs::write(&config.pid_file, "not a pid").unwrap();

    let exit = Daemon::new(from_fn(|_| Ok(())))
        .configure(config.clone())
        .start()
        .unwrap();

    assert_eq!(exit.iterations(), 1);
    assert!(!config.pid_file.exists());
}

#[test]
fn test_unwritable_pid_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let config = DaemonConfig {
        pid_file: blocker.join("daemon.pid"),
        ..foreground_config(dir.path())
    };

    let result = Daemon::new(from_fn(|_| Ok(()))).configure(config).start();

    assert!(matches!(result, Err(DaemonError::PidFileWrite { .. })));
}

// ============================================================================
// Work failures
// ============================================================================

#[test]
fn test_failing_worker_stops_cleanly() {
    let dir = TempDir::new().unwrap();
    let config = foreground_config(dir.path());
    let pid_path = config.pid_file.clone();
    let log_path = config.log_file.clone();

    let exit = Daemon::new(from_fn(|ctx| {
        if ctx.iteration() == 2 {
            Err(WorkError::msg("disk full"))
        } else {
            Ok(())
        }
    }))
    .configure(config)
    .start()
    .unwrap();

    assert_eq!(exit, LoopExit::WorkFailed { iterations: 2 });
    assert!(!pid_path.exists());
    let critical = critical_lines(&log_path);
    assert_eq!(critical.len(), 1);
    assert!(critical[0].contains("disk full"));
}

#[test]
fn test_panicking_worker_stops_cleanly() {
    let dir = TempDir::new().unwrap();
    let config = foreground_config(dir.path());
    let pid_path = config.pid_file.clone();
    let log_path = config.log_file.clone();

    let exit = Daemon::new(from_fn(|_| -> Result<(), WorkError> {
        panic!("bad state")
    }))
    .configure(config)
    .start()
    .unwrap();

    assert_eq!(exit, LoopExit::WorkFailed { iterations: 1 });
    assert!(!pid_path.exists());
    assert!(critical_lines(&log_path)[0].contains("bad state"));
}
