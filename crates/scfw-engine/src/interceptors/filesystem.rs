//! Filesystem interceptor. Wraps path-based reads/writes and
//! descriptor-based I/O so an `open` followed by descriptor read/write
//! cannot bypass the path check the equivalent path-based call would have
//! taken.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use scfw_core::error::FirewallError;

use crate::engine::Engine;
use crate::operation::{Operation, OperationKind};

/// The mode a path was opened with — determines which evaluator kind a
/// later descriptor-based read/write resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

/// Opaque handle standing in for a host file descriptor/handle. Hosts
/// embedding the engine map their native fd to this newtype at `open` time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(u64);

/// Records the path and resolved kind each open handle refers to, so a
/// later `read`/`write` on the same handle re-evaluates against the
/// *opened* path rather than trusting the descriptor blindly.
struct DescriptorTable {
    entries: Mutex<HashMap<FileHandle, (PathBuf, OpenMode)>>,
    next: AtomicU64,
}

impl DescriptorTable {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next: AtomicU64::new(1),
        }
    }

    fn insert(&self, path: PathBuf, mode: OpenMode) -> FileHandle {
        let handle = FileHandle(self.next.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().unwrap().insert(handle, (path, mode));
        handle
    }

    fn lookup(&self, handle: FileHandle) -> Option<(PathBuf, OpenMode)> {
        self.entries.lock().unwrap().get(&handle).cloned()
    }

    fn remove(&self, handle: FileHandle) {
        self.entries.lock().unwrap().remove(&handle);
    }
}

pub struct FileGuard<'e> {
    engine: &'e Engine,
    descriptors: DescriptorTable,
}

impl<'e> FileGuard<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            descriptors: DescriptorTable::new(),
        }
    }

    fn check(&self, kind: OperationKind, path: &str, caller_origin: &str) -> Result<(), FirewallError> {
        let op = Operation::new(kind, path, caller_origin);
        self.engine.enforce(op)?;
        Ok(())
    }

    pub fn guarded_read(&self, path: &str, caller_origin: &str) -> Result<Vec<u8>, FirewallError> {
        self.check(OperationKind::FileRead, path, caller_origin)?;
        Ok(fs::read(path)?)
    }

    pub fn guarded_read_to_string(&self, path: &str, caller_origin: &str) -> Result<String, FirewallError> {
        self.check(OperationKind::FileRead, path, caller_origin)?;
        Ok(fs::read_to_string(path)?)
    }

    pub fn guarded_write(&self, path: &str, data: &[u8], caller_origin: &str) -> Result<(), FirewallError> {
        self.check(OperationKind::FileWrite, path, caller_origin)?;
        Ok(fs::write(path, data)?)
    }

    pub fn guarded_unlink(&self, path: &str, caller_origin: &str) -> Result<(), FirewallError> {
        self.check(OperationKind::FileUnlink, path, caller_origin)?;
        Ok(fs::remove_file(path)?)
    }

    pub fn guarded_rename(&self, from: &str, to: &str, caller_origin: &str) -> Result<(), FirewallError> {
        // Both the source and destination are evaluated: a rename into a
        // protected location is exactly as dangerous as a direct write.
        self.check(OperationKind::FileRename, from, caller_origin)?;
        self.check(OperationKind::FileRename, to, caller_origin)?;
        Ok(fs::rename(from, to)?)
    }

    pub fn guarded_readdir(&self, path: &str, caller_origin: &str) -> Result<Vec<std::fs::DirEntry>, FirewallError> {
        self.check(OperationKind::FileReaddir, path, caller_origin)?;
        fs::read_dir(path)?.collect::<std::io::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn guarded_mkdir(&self, path: &str, caller_origin: &str) -> Result<(), FirewallError> {
        self.check(OperationKind::FileWrite, path, caller_origin)?;
        Ok(fs::create_dir_all(path)?)
    }

    pub fn guarded_symlink(&self, target: &str, link: &str, caller_origin: &str) -> Result<(), FirewallError> {
        self.check(OperationKind::FileWrite, link, caller_origin)?;
        #[cfg(unix)]
        {
            Ok(std::os::unix::fs::symlink(target, link)?)
        }
        #[cfg(not(unix))]
        {
            let _ = target;
            Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "symlink unsupported on this platform").into())
        }
    }

    /// `open(path, mode)`: evaluated once up front at the kind implied by
    /// `mode`, then recorded so later descriptor I/O re-evaluates
    /// consistently.
    pub fn guarded_open(&self, path: &str, mode: OpenMode, caller_origin: &str) -> Result<FileHandle, FirewallError> {
        let kind = match mode {
            OpenMode::Read => OperationKind::FileRead,
            OpenMode::Write => OperationKind::FileWrite,
        };
        self.check(kind, path, caller_origin)?;
        Ok(self.descriptors.insert(PathBuf::from(path), mode))
    }

    /// Read through a previously opened handle. Re-evaluates against the
    /// path recorded at `guarded_open`, not a cached verdict — a config
    /// reload or counter-threshold crossing between `open` and `read` must
    /// still take effect.
    pub fn guarded_read_handle(&self, handle: FileHandle, caller_origin: &str) -> Result<Vec<u8>, FirewallError> {
        let (path, _) = self.descriptor_or_err(handle)?;
        self.guarded_read(path.to_string_lossy().as_ref(), caller_origin)
    }

    /// Write through a previously opened handle. If the handle was opened
    /// read-only but the caller attempts a write anyway (the classic
    /// `open(..., "r") -> write` bypass), this re-evaluates as a *write*
    /// against the stored path rather than trusting the open-time read
    /// verdict.
    pub fn guarded_write_handle(&self, handle: FileHandle, data: &[u8], caller_origin: &str) -> Result<(), FirewallError> {
        let (path, _) = self.descriptor_or_err(handle)?;
        self.guarded_write(path.to_string_lossy().as_ref(), data, caller_origin)
    }

    pub fn close_handle(&self, handle: FileHandle) {
        self.descriptors.remove(handle);
    }

    fn descriptor_or_err(&self, handle: FileHandle) -> Result<(PathBuf, OpenMode), FirewallError> {
        self.descriptors
            .lookup(handle)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "unknown file handle").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scfw_core::config::Config;
    use scfw_core::context::ProcessContext;
    use scfw_core::AuditLog;
    use crate::accountant::Counters;
    use crate::compiled::CompiledPolicy;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex as StdMutex;

    fn test_engine(dir: &std::path::Path) -> Engine {
        let audit_path = dir.join("audit.jsonl");
        let mut config = Config::baseline();
        config.audit_log_path = Some(audit_path.to_str().unwrap().to_string());
        Engine {
            compiled: CompiledPolicy::from_config(&config, dir),
            context: ProcessContext::detect_in(dir),
            counters: Counters::new(),
            audit: AuditLog::open(&audit_path).unwrap(),
            config,
            ready: AtomicBool::new(true),
            blocks_by_kind: StdMutex::new(HashMap::new()),
        }
    }

    #[test]
    fn blocked_read_returns_firewall_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let guard = FileGuard::new(&engine);
        let result = guard.guarded_read("/root/.ssh/id_rsa", "user-code");
        assert!(result.is_err());
    }

    #[test]
    fn allowed_write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let guard = FileGuard::new(&engine);
        let path = dir.path().join("scratch.txt");
        guard.guarded_write(path.to_str().unwrap(), b"hello", "user-code").unwrap();
        let content = guard.guarded_read(path.to_str().unwrap(), "user-code").unwrap();
        assert_eq!(content, b"hello");
    }

    #[test]
    fn descriptor_write_after_read_open_is_evaluated_against_blocked_write_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("locked")).unwrap();
        std::fs::write(dir.path().join("locked/data.txt"), b"seed").unwrap();
        let mut config = Config::baseline();
        let audit_path = dir.path().join("audit.jsonl");
        config.audit_log_path = Some(audit_path.to_str().unwrap().to_string());
        config.filesystem.blocked_write_paths = vec![dir.path().join("locked").to_str().unwrap().to_string()];
        let engine = Engine {
            compiled: CompiledPolicy::from_config(&config, dir.path()),
            context: ProcessContext::detect_in(dir.path()),
            counters: Counters::new(),
            audit: AuditLog::open(&audit_path).unwrap(),
            config,
            ready: AtomicBool::new(true),
            blocks_by_kind: StdMutex::new(HashMap::new()),
        };
        let guard = FileGuard::new(&engine);
        let target = dir.path().join("locked/data.txt");

        // Opening read-only succeeds — blocked_write_paths doesn't cover reads.
        let handle = guard
            .guarded_open(target.to_str().unwrap(), OpenMode::Read, "user-code")
            .unwrap();

        // A later write through that same handle is re-evaluated as a
        // write against the stored path and is blocked (descriptor
        // equivalence closes the read-open-then-write bypass).
        let result = guard.guarded_write_handle(handle, b"payload", "user-code");
        assert!(result.is_err());
    }

    #[test]
    fn self_protection_blocks_unlink_of_audit_log() {
        let dir = tempfile::tempdir().unwrap();
        let audit_path = dir.path().join("audit.jsonl");
        let mut config = Config::baseline();
        config.audit_log_path = Some(audit_path.to_str().unwrap().to_string());
        config.filesystem.output_files = vec![audit_path.to_str().unwrap().to_string()];
        let engine = Engine {
            compiled: CompiledPolicy::from_config(&config, dir.path()),
            context: ProcessContext::detect_in(dir.path()),
            counters: Counters::new(),
            audit: AuditLog::open(&audit_path).unwrap(),
            config,
            ready: AtomicBool::new(true),
            blocks_by_kind: StdMutex::new(HashMap::new()),
        };
        let guard = FileGuard::new(&engine);
        let result = guard.guarded_unlink(audit_path.to_str().unwrap(), "user-code");
        assert!(result.is_err());
        assert!(audit_path.exists());
    }
}
