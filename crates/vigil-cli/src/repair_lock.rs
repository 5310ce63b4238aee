//! Cross-process repair lock.
//!
//! `.vigil/repair.lock` holds the pid of the process running a repair. A
//! second `vgl` process refuses to start a repair while that pid is alive; a
//! lock left by a dead process is removed.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::bootstrap::PROJECT_DIR;

pub struct RepairLockGuard {
    path: PathBuf,
}

impl Drop for RepairLockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[derive(Debug)]
enum LockState {
    HeldBy(i32),
    Stale,
    Unknown,
}

pub fn acquire_for_project(project_root: &Path) -> anyhow::Result<RepairLockGuard> {
    let lock_path = project_root.join(PROJECT_DIR).join("repair.lock");

    for _ in 0..2 {
        match try_acquire(&lock_path) {
            Ok(guard) => return Ok(guard),
            Err(LockState::HeldBy(pid)) => {
                anyhow::bail!("repair already in progress (pid {pid})");
            }
            Err(LockState::Stale) => {
                tracing::warn!(path = %lock_path.display(), "removing stale repair lock");
                let _ = std::fs::remove_file(&lock_path);
            }
            Err(LockState::Unknown) => break,
        }
    }
    anyhow::bail!(
        "could not acquire repair lock at {}; remove it if no vgl process is running",
        lock_path.display()
    )
}

fn try_acquire(lock_path: &Path) -> Result<RepairLockGuard, LockState> {
    if let Some(parent) = lock_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match OpenOptions::new().create_new(true).write(true).open(lock_path) {
        Ok(mut file) => {
            let _ = writeln!(file, "{}", std::process::id());
            Ok(RepairLockGuard {
                path: lock_path.to_path_buf(),
            })
        }
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            let mut contents = String::new();
            if OpenOptions::new()
                .read(true)
                .open(lock_path)
                .and_then(|mut file| file.read_to_string(&mut contents))
                .is_err()
            {
                return Err(LockState::Unknown);
            }
            match contents.trim().parse::<i32>().ok() {
                Some(pid) if is_process_running(pid) => Err(LockState::HeldBy(pid)),
                Some(_) => Err(LockState::Stale),
                None => Err(LockState::Unknown),
            }
        }
        Err(_) => Err(LockState::Unknown),
    }
}

fn is_process_running(pid: i32) -> bool {
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .status()
        .is_ok_and(|status| status.success())
}
