//! Process lifecycle: PID-file single-instance lock, `stop` and `status`
//!
//! Kept apart from the poll loop, which only sees the lock through
//! [`StopHook`].

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, warn};

use crate::poll::StopHook;

/// Errors from managing the PID file
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Another live process holds the PID file
    #[error("i3geoweather is already running with pid {0}")]
    AlreadyRunning(u32),

    /// No live process holds the PID file
    #[error("i3geoweather is not running")]
    NotRunning,

    /// Another process created the PID file first
    #[error("PID file {path} is held by another instance")]
    Locked { path: PathBuf },

    /// The PID file does not contain a process id
    #[error("PID file {path} does not contain a valid pid")]
    InvalidPid { path: PathBuf },

    /// Sending the termination signal failed
    #[error("failed to signal pid {pid}: {reason}")]
    Signal { pid: u32, reason: String },

    /// Filesystem operation failed
    #[error("PID file I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What the PID file says about the instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    /// A live process holds the lock
    Running(u32),
    /// The PID file names a process that no longer exists
    Stale(u32),
    /// No PID file
    Stopped,
}

/// A held single-instance lock
///
/// Released on [`PidFile::release`], on a fatal loop stop, or on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
    held: bool,
}

impl PidFile {
    /// Takes the lock at `path` for the current process
    ///
    /// A PID file naming a dead process is replaced. The file is created
    /// exclusively, so of two concurrent starts only one gets the lock.
    pub fn acquire(path: PathBuf) -> Result<Self, DaemonError> {
        match status(&path)? {
            InstanceStatus::Running(pid) => return Err(DaemonError::AlreadyRunning(pid)),
            InstanceStatus::Stale(pid) => {
                warn!(pid, "replacing stale PID file");
                remove_pid_file(&path)?;
            }
            InstanceStatus::Stopped => {}
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                // Lost the race; the winner may not have written its pid yet
                return Err(match status(&path) {
                    Ok(InstanceStatus::Running(pid)) => DaemonError::AlreadyRunning(pid),
                    _ => DaemonError::Locked { path },
                });
            }
            Err(source) => return Err(DaemonError::Io { path, source }),
        };

        let pid = std::process::id();
        if let Err(source) = writeln!(file, "{}", pid) {
            remove_pid_file(&path)?;
            return Err(DaemonError::Io { path, source });
        }
        debug!(pid, path = %path.display(), "acquired PID file");
        Ok(Self { path, held: true })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the PID file; calling it again is a no-op
    pub fn release(&mut self) -> Result<(), DaemonError> {
        if !self.held {
            return Ok(());
        }
        self.held = false;
        remove_pid_file(&self.path)
    }
}

impl StopHook for PidFile {
    fn signal_stop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "could not release PID file");
        }
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "could not release PID file");
        }
    }
}

/// Reads the PID file at `path` and reports whether its process is alive
pub fn status(path: &Path) -> Result<InstanceStatus, DaemonError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(InstanceStatus::Stopped),
        Err(source) => {
            return Err(DaemonError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let pid: u32 = content.trim().parse().map_err(|_| DaemonError::InvalidPid {
        path: path.to_path_buf(),
    })?;

    if is_alive(pid) {
        Ok(InstanceStatus::Running(pid))
    } else {
        Ok(InstanceStatus::Stale(pid))
    }
}

/// Sends SIGTERM to the instance named in the PID file and removes the file
///
/// # Returns
/// * `Ok(pid)` of the signalled process
/// * `Err(DaemonError::NotRunning)` if there is no live instance (a stale file is cleaned up)
pub fn stop(path: &Path) -> Result<u32, DaemonError> {
    let pid = match status(path)? {
        InstanceStatus::Running(pid) => pid,
        InstanceStatus::Stale(_) => {
            remove_pid_file(path)?;
            return Err(DaemonError::NotRunning);
        }
        InstanceStatus::Stopped => return Err(DaemonError::NotRunning),
    };

    let result = Command::new("kill")
        .arg("-TERM")
        .arg(pid.to_string())
        .status()
        .map_err(|e| DaemonError::Signal {
            pid,
            reason: e.to_string(),
        })?;
    if !result.success() {
        return Err(DaemonError::Signal {
            pid,
            reason: format!("kill exited with {}", result),
        });
    }

    // The stopping instance removes the file itself; this covers a hard kill
    remove_pid_file(path)?;
    Ok(pid)
}

fn remove_pid_file(path: &Path) -> Result<(), DaemonError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DaemonError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(target_os = "linux")]
fn is_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_alive(pid: u32) -> bool {
    Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use tempfile::TempDir;

    /// Above the Linux `pid_max` ceiling, so never a live process
    const DEAD_PID: u32 = 999_999_999;

    fn pid_path(temp_dir: &TempDir) -> PathBuf {
        temp_dir.path().join("i3geoweather.pid")
    }

    #[test]
    fn test_status_without_pid_file_is_stopped() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert_eq!(status(&pid_path(&temp_dir)).expect("status"), InstanceStatus::Stopped);
    }

    #[test]
    fn test_acquire_writes_current_pid_and_release_removes_it() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = pid_path(&temp_dir);

        let mut lock = PidFile::acquire(path.clone()).expect("acquire");
        let content = fs::read_to_string(&path).expect("pid file");
        assert_eq!(content.trim(), std::process::id().to_string());
        assert_eq!(
            status(&path).expect("status"),
            InstanceStatus::Running(std::process::id())
        );

        lock.release().expect("release");
        assert!(!path.exists());
        lock.release().expect("second release is a no-op");
    }

    #[test]
    fn test_acquire_refuses_live_instance() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = pid_path(&temp_dir);
        let _lock = PidFile::acquire(path.clone()).expect("acquire");

        let second = PidFile::acquire(path);

        assert!(matches!(second, Err(DaemonError::AlreadyRunning(_))));
    }

    #[test]
    fn test_acquire_replaces_stale_pid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = pid_path(&temp_dir);
        fs::write(&path, format!("{}\n", DEAD_PID)).expect("write");
        assert_eq!(status(&path).expect("status"), InstanceStatus::Stale(DEAD_PID));

        let _lock = PidFile::acquire(path.clone()).expect("acquire over stale file");

        let content = fs::read_to_string(&path).expect("pid file");
        assert_eq!(content.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_concurrent_acquire_has_one_winner() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = pid_path(&temp_dir);
        let barrier = Barrier::new(4);

        let results: Vec<Result<PidFile, DaemonError>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        PidFile::acquire(path.clone())
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("acquire thread"))
                .collect()
        });

        let winners = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(winners, 1);
        for result in &results {
            if let Err(e) = result {
                // A loser may read the winner's file before the pid is written
                assert!(
                    matches!(
                        e,
                        DaemonError::AlreadyRunning(_)
                            | DaemonError::Locked { .. }
                            | DaemonError::InvalidPid { .. }
                    ),
                    "unexpected error: {}",
                    e
                );
            }
        }
    }

    #[test]
    fn test_acquire_leaves_empty_pid_file_in_place() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = pid_path(&temp_dir);
        fs::write(&path, "").expect("write");

        let result = PidFile::acquire(path.clone());

        // An empty file is what a racing winner looks like before it writes
        assert!(matches!(result, Err(DaemonError::InvalidPid { .. })));
        assert!(path.exists(), "someone else's lock must not be removed");
    }

    #[test]
    fn test_garbage_pid_file_is_invalid() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = pid_path(&temp_dir);
        fs::write(&path, "not-a-pid").expect("write");

        assert!(matches!(status(&path), Err(DaemonError::InvalidPid { .. })));
    }

    #[test]
    fn test_stop_hook_releases_lock() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = pid_path(&temp_dir);
        let mut lock = PidFile::acquire(path.clone()).expect("acquire");

        lock.signal_stop();

        assert!(!path.exists());
    }

    #[test]
    fn test_drop_releases_lock() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = pid_path(&temp_dir);
        {
            let _lock = PidFile::acquire(path.clone()).expect("acquire");
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_stop_without_instance_is_not_running() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert!(matches!(stop(&pid_path(&temp_dir)), Err(DaemonError::NotRunning)));
    }

    #[test]
    fn test_stop_cleans_up_stale_pid_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = pid_path(&temp_dir);
        fs::write(&path, format!("{}\n", DEAD_PID)).expect("write");

        assert!(matches!(stop(&path), Err(DaemonError::NotRunning)));
        assert!(!path.exists());
    }
}
