// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client identity and process-local id bookkeeping.
//!
//! Every running client gets a transport name that must be unique across
//! the whole deployment:
//!
//! ```text
//! <base_name>.<host_suffix>.<process_local_id>.client
//! ```
//!
//! `host_suffix` is the host's primary local IP with separators replaced by
//! `-`. `process_local_id` comes from an [`IdRegistry`] so that two clients
//! with the same base name (in one process or in concurrently running
//! processes) never collide.

use crate::error::{RpcError, RpcResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Role tag appended to every client transport name.
pub const ROLE_TAG: &str = "client";

/// Upper bound on process-local ids per base name.
pub const MAX_LOCAL_IDS: u32 = 1024;

/// Identity of one client instance. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ClientIdentity {
    base_name: String,
    process_local_id: u32,
    transport_name: String,
}

impl ClientIdentity {
    pub fn new(base_name: impl Into<String>, process_local_id: u32, host_suffix: &str) -> Self {
        let base_name = base_name.into();
        let transport_name = format!(
            "{}.{}.{}.{}",
            base_name, host_suffix, process_local_id, ROLE_TAG
        );
        Self {
            base_name,
            process_local_id,
            transport_name,
        }
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn process_local_id(&self) -> u32 {
        self.process_local_id
    }

    /// Routing name used by the transport.
    pub fn transport_name(&self) -> &str {
        &self.transport_name
    }
}

/// Host-unique transport name fragment, computed once per process.
pub fn host_suffix() -> &'static str {
    static SUFFIX: OnceLock<String> = OnceLock::new();
    SUFFIX.get_or_init(|| match local_ip_address::local_ip() {
        Ok(ip) => ip.to_string().replace(['.', ':'], "-"),
        Err(e) => {
            tracing::debug!(error = %e, "no local IP address, using `localhost` host suffix");
            "localhost".to_string()
        }
    })
}

/// Validate a client base name.
pub(crate) fn validate_base_name(name: &str) -> RpcResult<()> {
    if name.is_empty() {
        return Err(RpcError::Construction("base name is empty".to_string()));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control() || c == '/') {
        return Err(RpcError::Construction(format!(
            "base name `{}` contains whitespace, control characters or `/`",
            name
        )));
    }
    Ok(())
}

/// Process identity collaborator.
pub trait IdRegistry: Send + Sync {
    /// Reserve the lowest free id for `name`.
    fn acquire_id(&self, name: &str) -> RpcResult<u32>;

    /// Give `id` back. Releasing an id that is not held is a no-op.
    fn release_id(&self, name: &str, id: u32) -> RpcResult<()>;
}

/// In-process id table.
///
/// Unique within one process only; use [`FileIds`] when several processes
/// share a transport.
#[derive(Debug, Default)]
pub struct InProcessIds {
    taken: Mutex<HashMap<String, BTreeSet<u32>>>,
}

impl InProcessIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-global table.
    pub fn global() -> &'static InProcessIds {
        static GLOBAL: OnceLock<InProcessIds> = OnceLock::new();
        GLOBAL.get_or_init(InProcessIds::new)
    }

    /// Ids currently held for `name`.
    pub fn held(&self, name: &str) -> Vec<u32> {
        self.taken
            .lock()
            .get(name)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl IdRegistry for InProcessIds {
    fn acquire_id(&self, name: &str) -> RpcResult<u32> {
        let mut taken = self.taken.lock();
        let ids = taken.entry(name.to_string()).or_default();
        let id = (0..MAX_LOCAL_IDS)
            .find(|id| !ids.contains(id))
            .ok_or_else(|| {
                RpcError::Construction(format!("no free process-local id for `{}`", name))
            })?;
        ids.insert(id);
        tracing::trace!(name, id, "acquired process-local id");
        Ok(id)
    }

    fn release_id(&self, name: &str, id: u32) -> RpcResult<()> {
        let mut taken = self.taken.lock();
        if let Some(ids) = taken.get_mut(name) {
            ids.remove(&id);
            if ids.is_empty() {
                taken.remove(name);
            }
        }
        Ok(())
    }
}

impl IdRegistry for &'static InProcessIds {
    fn acquire_id(&self, name: &str) -> RpcResult<u32> {
        (**self).acquire_id(name)
    }

    fn release_id(&self, name: &str, id: u32) -> RpcResult<()> {
        (**self).release_id(name, id)
    }
}

/// Lock-file backed ids shared by every process using the same directory.
///
/// Layout: `<root>/ids/<name>/<id>.pid`, each file holding the owning pid.
/// Files are created with `create_new`, so two processes racing for the
/// same id cannot both win. On Linux, files left behind by dead processes
/// are reclaimed.
#[derive(Debug, Clone)]
pub struct FileIds {
    root: PathBuf,
}

impl FileIds {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self, name: &str) -> PathBuf {
        self.root.join("ids").join(name)
    }

    fn try_claim(path: &Path) -> std::io::Result<bool> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Pid recorded in an id file, if it parses.
    fn owner(path: &Path) -> Option<u32> {
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    /// Take over `path` from `dead`, a process observed to have exited.
    ///
    /// Reclaimers serialize on a sibling guard file, and the id file is only
    /// removed while it still names `dead`. A file claimed afresh between
    /// the observation and the guard is left alone.
    fn reclaim(path: &Path, dead: u32) -> std::io::Result<bool> {
        let guard = path.with_extension("reclaim");
        if !Self::try_claim(&guard)? {
            return Ok(false);
        }
        let claimed = match Self::owner(path) {
            Some(pid) if pid == dead => match fs::remove_file(path) {
                Ok(()) => Self::try_claim(path),
                Err(e) if e.kind() == ErrorKind::NotFound => Self::try_claim(path),
                Err(e) => Err(e),
            },
            _ => Ok(false),
        };
        if let Err(e) = fs::remove_file(&guard) {
            tracing::warn!(guard = %guard.display(), error = %e, "failed to remove reclaim guard");
        }
        claimed
    }
}

impl IdRegistry for FileIds {
    fn acquire_id(&self, name: &str) -> RpcResult<u32> {
        let dir = self.dir(name);
        fs::create_dir_all(&dir)?;

        for id in 0..MAX_LOCAL_IDS {
            let path = dir.join(format!("{}.pid", id));
            if Self::try_claim(&path)? {
                tracing::trace!(name, id, path = %path.display(), "claimed id file");
                return Ok(id);
            }
            let Some(pid) = Self::owner(&path).filter(|pid| !pid_alive(*pid)) else {
                continue;
            };
            tracing::debug!(name, id, pid, "reclaiming id left by a dead process");
            if Self::reclaim(&path, pid)? {
                return Ok(id);
            }
        }
        Err(RpcError::Construction(format!(
            "no free process-local id for `{}` under {}",
            name,
            dir.display()
        )))
    }

    fn release_id(&self, name: &str, id: u32) -> RpcResult<()> {
        let path = self.dir(name).join(format!("{}.pid", id));
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(target_os = "linux")]
fn pid_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn pid_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_name_layout() {
        let id = ClientIdentity::new("calc", 3, "10-0-0-7");
        assert_eq!(id.transport_name(), "calc.10-0-0-7.3.client");
        assert_eq!(id.base_name(), "calc");
        assert_eq!(id.process_local_id(), 3);
    }

    #[test]
    fn host_suffix_has_no_dots() {
        let suffix = host_suffix();
        assert!(!suffix.is_empty());
        assert!(!suffix.contains('.'));
    }

    #[test]
    fn base_name_validation() {
        assert!(validate_base_name("calc").is_ok());
        assert!(validate_base_name("calc.describe").is_ok());
        assert!(matches!(validate_base_name(""), Err(RpcError::Construction(_))));
        assert!(validate_base_name("has space").is_err());
        assert!(validate_base_name("a/b").is_err());
    }

    #[test]
    fn in_process_ids_reuse_lowest_free() {
        let ids = InProcessIds::new();
        assert_eq!(ids.acquire_id("svc").unwrap(), 0);
        assert_eq!(ids.acquire_id("svc").unwrap(), 1);
        assert_eq!(ids.acquire_id("other").unwrap(), 0);

        ids.release_id("svc", 0).unwrap();
        assert_eq!(ids.acquire_id("svc").unwrap(), 0);
        assert_eq!(ids.held("svc"), vec![0, 1]);

        // Releasing twice is harmless.
        ids.release_id("svc", 1).unwrap();
        ids.release_id("svc", 1).unwrap();
        assert_eq!(ids.held("svc"), vec![0]);
    }

    #[test]
    fn file_ids_claim_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let ids = FileIds::new(dir.path());

        let a = ids.acquire_id("svc").unwrap();
        let b = ids.acquire_id("svc").unwrap();
        assert_eq!((a, b), (0, 1));

        let pid_file = dir.path().join("ids/svc/0.pid");
        let content = fs::read_to_string(&pid_file).unwrap();
        assert_eq!(content.trim(), std::process::id().to_string());

        ids.release_id("svc", 0).unwrap();
        assert!(!pid_file.exists());
        assert_eq!(ids.acquire_id("svc").unwrap(), 0);

        ids.release_id("svc", 42).unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn file_ids_reclaim_dead_owner() {
        let dir = tempfile::tempdir().unwrap();
        let svc_dir = dir.path().join("ids/svc");
        fs::create_dir_all(&svc_dir).unwrap();
        // pid_max on Linux is at most 2^22, so this pid cannot be alive.
        fs::write(svc_dir.join("0.pid"), "4294967000\n").unwrap();

        let ids = FileIds::new(dir.path());
        assert_eq!(ids.acquire_id("svc").unwrap(), 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn file_ids_reclaim_dead_owner_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let svc_dir = dir.path().join("ids/svc");
        fs::create_dir_all(&svc_dir).unwrap();
        fs::write(svc_dir.join("0.pid"), "4294967000\n").unwrap();

        let ids = FileIds::new(dir.path());
        assert_eq!(ids.acquire_id("svc").unwrap(), 0);
        assert!(!svc_dir.join("0.reclaim").exists());
        let content = fs::read_to_string(svc_dir.join("0.pid")).unwrap();
        assert_eq!(content.trim(), std::process::id().to_string());
    }

    #[test]
    fn reclaim_leaves_a_freshly_claimed_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.pid");
        // Another process claimed the slot after the dead owner was observed.
        fs::write(&path, "4294967000\n").unwrap();
        let dead = FileIds::owner(&path).unwrap();
        fs::write(&path, format!("{}\n", std::process::id())).unwrap();

        assert!(!FileIds::reclaim(&path, dead).unwrap());
        assert_eq!(FileIds::owner(&path), Some(std::process::id()));
        assert!(!dir.path().join("0.reclaim").exists());
    }

    #[test]
    fn reclaim_backs_off_while_another_reclaimer_holds_the_guard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.pid");
        fs::write(&path, "4294967000\n").unwrap();
        fs::write(dir.path().join("0.reclaim"), "1\n").unwrap();

        assert!(!FileIds::reclaim(&path, 4294967000).unwrap());
        assert_eq!(FileIds::owner(&path), Some(4294967000));
        assert!(dir.path().join("0.reclaim").exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn stale_slot_with_held_guard_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let svc_dir = dir.path().join("ids/svc");
        fs::create_dir_all(&svc_dir).unwrap();
        fs::write(svc_dir.join("0.pid"), "4294967000\n").unwrap();
        fs::write(svc_dir.join("0.reclaim"), "1\n").unwrap();

        let ids = FileIds::new(dir.path());
        assert_eq!(ids.acquire_id("svc").unwrap(), 1);
        assert_eq!(FileIds::owner(&svc_dir.join("0.pid")), Some(4294967000));
    }
}
