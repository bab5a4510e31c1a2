//! Privileged operation backend trait for pluggable implementations

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use nix::errno::Errno;

/// Trait for the privileged operations namespace entry is built from
///
/// This allows for different implementations:
/// - [`SyscallBackend`](crate::SyscallBackend) - Real syscalls via `nix`
/// - [`MockBackend`] - Testing without privileges
///
/// Implementations are used from a single thread only: namespace membership
/// is per-thread, so nothing here is `Send` or `Sync` by requirement.
pub trait NamespaceBackend {
    /// Open namespace reference, closed when dropped
    type Handle;

    /// Open the namespace handle at `path`
    fn open_namespace(&self, path: &Path) -> io::Result<Self::Handle>;

    /// Associate the calling thread with the network namespace behind `handle`
    fn join_network_namespace(&self, handle: &Self::Handle) -> nix::Result<()>;

    /// Detach into a private copy of the mount namespace
    fn unshare_mount_namespace(&self) -> nix::Result<()>;

    /// Mark `target` and every submount as slave
    fn make_rslave(&self, target: &Path) -> nix::Result<()>;

    /// Lazily unmount `target`
    fn detach_mount(&self, target: &Path) -> nix::Result<()>;

    /// Mount a fresh sysfs at `target` with `label` as its source
    fn mount_sysfs(&self, label: &str, target: &Path) -> nix::Result<()>;

    /// Bind-mount `source` over `target`
    fn bind_mount(&self, source: &Path, target: &Path) -> nix::Result<()>;

    /// Whether `path` exists and is a directory
    fn is_directory(&self, path: &Path) -> bool;

    /// File names inside `path`, sorted
    fn list_directory(&self, path: &Path) -> io::Result<Vec<OsString>>;
}

/// Operations of [`MockBackend`] that accept injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    /// `unshare(CLONE_NEWNS)`
    Unshare,
    /// Recursive slave remount of `/`
    MakeRslave,
    /// Lazy unmount of sysfs
    DetachMount,
    /// Fresh sysfs mount
    MountSysfs,
}

/// Mock backend for testing (no syscalls, no filesystem)
///
/// # Example
/// ```
/// use nsexec_core::NamespaceName;
/// use nsexec_namespace::{EntryConfig, MockBackend, NamespaceEntry};
///
/// let backend = MockBackend::new().with_namespace("/var/run/netns/blue");
/// let entry = NamespaceEntry::new(backend.clone(), EntryConfig::default());
///
/// let report = entry.enter(&NamespaceName::new("blue").unwrap()).unwrap();
/// assert!(report.warnings.is_empty());
/// assert_eq!(backend.open_handles(), 0);
/// ```
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Rc<RefCell<MockState>>,
}

#[derive(Default)]
struct MockState {
    // Known handle paths, `false` for files that are not namespaces
    namespaces: HashMap<PathBuf, bool>,
    directories: HashMap<PathBuf, Vec<OsString>>,
    unreadable_dirs: HashSet<PathBuf>,
    failures: HashMap<MockOp, Errno>,
    failing_binds: HashSet<PathBuf>,

    calls: Vec<&'static str>,
    handles_opened: usize,
    handles_closed: usize,
    joined: Option<PathBuf>,
    mount_private: bool,
    rslave_root: Option<PathBuf>,
    detached: Vec<PathBuf>,
    sysfs_mounts: Vec<(String, PathBuf)>,
    bind_mounts: Vec<(PathBuf, PathBuf)>,
}

impl MockState {
    fn fail(&self, op: MockOp) -> nix::Result<()> {
        self.failures.get(&op).map_or(Ok(()), |errno| Err(*errno))
    }
}

/// Handle returned by [`MockBackend`]; counts as closed once dropped
pub struct MockHandle {
    path: PathBuf,
    valid: bool,
    state: Rc<RefCell<MockState>>,
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.state.borrow_mut().handles_closed += 1;
    }
}

impl std::fmt::Debug for MockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHandle")
            .field("path", &self.path)
            .field("valid", &self.valid)
            .finish_non_exhaustive()
    }
}

impl MockBackend {
    /// Create a new mock backend with no namespaces
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a valid namespace handle at `path`
    #[must_use]
    pub fn with_namespace(self, path: impl Into<PathBuf>) -> Self {
        self.state.borrow_mut().namespaces.insert(path.into(), true);
        self
    }

    /// Register a file at `path` that opens but is not a namespace
    #[must_use]
    pub fn with_invalid_namespace(self, path: impl Into<PathBuf>) -> Self {
        self.state.borrow_mut().namespaces.insert(path.into(), false);
        self
    }

    /// Register a directory containing `entries`
    #[must_use]
    pub fn with_directory<I, S>(self, path: impl Into<PathBuf>, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut entries: Vec<OsString> = entries.into_iter().map(Into::into).collect();
        entries.sort();
        self.state
            .borrow_mut()
            .directories
            .insert(path.into(), entries);
        self
    }

    /// Register a directory whose listing fails
    #[must_use]
    pub fn with_unreadable_directory(self, path: impl Into<PathBuf>) -> Self {
        self.state.borrow_mut().unreadable_dirs.insert(path.into());
        self
    }

    /// Make `op` fail with `errno`
    #[must_use]
    pub fn with_failure(self, op: MockOp, errno: Errno) -> Self {
        self.state.borrow_mut().failures.insert(op, errno);
        self
    }

    /// Make bind mounts onto `target` fail
    #[must_use]
    pub fn with_failing_bind(self, target: impl Into<PathBuf>) -> Self {
        self.state.borrow_mut().failing_binds.insert(target.into());
        self
    }

    /// Names of the operations called so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.borrow().calls.clone()
    }

    /// Number of handles opened
    #[must_use]
    pub fn handles_opened(&self) -> usize {
        self.state.borrow().handles_opened
    }

    /// Number of handles opened and not yet dropped
    #[must_use]
    pub fn open_handles(&self) -> usize {
        let state = self.state.borrow();
        state.handles_opened - state.handles_closed
    }

    /// Namespace joined, if any
    #[must_use]
    pub fn joined(&self) -> Option<PathBuf> {
        self.state.borrow().joined.clone()
    }

    /// Whether the mount namespace was unshared
    #[must_use]
    pub fn is_mount_private(&self) -> bool {
        self.state.borrow().mount_private
    }

    /// Root marked as recursive slave, if any
    #[must_use]
    pub fn rslave_root(&self) -> Option<PathBuf> {
        self.state.borrow().rslave_root.clone()
    }

    /// Lazily unmounted targets
    #[must_use]
    pub fn detached_mounts(&self) -> Vec<PathBuf> {
        self.state.borrow().detached.clone()
    }

    /// sysfs mounts made, as `(label, target)`
    #[must_use]
    pub fn sysfs_mounts(&self) -> Vec<(String, PathBuf)> {
        self.state.borrow().sysfs_mounts.clone()
    }

    /// Successful bind mounts, as `(source, target)`
    #[must_use]
    pub fn bind_mounts(&self) -> Vec<(PathBuf, PathBuf)> {
        self.state.borrow().bind_mounts.clone()
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend").finish_non_exhaustive()
    }
}

impl NamespaceBackend for MockBackend {
    type Handle = MockHandle;

    fn open_namespace(&self, path: &Path) -> io::Result<MockHandle> {
        let mut state = self.state.borrow_mut();
        state.calls.push("open");

        let valid = *state
            .namespaces
            .get(path)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        state.handles_opened += 1;

        tracing::debug!(path = %path.display(), valid, "Mock: Opened namespace");

        Ok(MockHandle {
            path: path.to_path_buf(),
            valid,
            state: Rc::clone(&self.state),
        })
    }

    fn join_network_namespace(&self, handle: &MockHandle) -> nix::Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push("setns");

        if !handle.valid {
            return Err(Errno::EINVAL);
        }
        state.joined = Some(handle.path.clone());
        Ok(())
    }

    fn unshare_mount_namespace(&self) -> nix::Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push("unshare");
        state.fail(MockOp::Unshare)?;
        state.mount_private = true;
        Ok(())
    }

    fn make_rslave(&self, target: &Path) -> nix::Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push("make-rslave");
        state.fail(MockOp::MakeRslave)?;
        state.rslave_root = Some(target.to_path_buf());
        Ok(())
    }

    fn detach_mount(&self, target: &Path) -> nix::Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push("umount");
        state.fail(MockOp::DetachMount)?;
        state.detached.push(target.to_path_buf());
        Ok(())
    }

    fn mount_sysfs(&self, label: &str, target: &Path) -> nix::Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push("mount-sysfs");
        state.fail(MockOp::MountSysfs)?;
        state
            .sysfs_mounts
            .push((label.to_string(), target.to_path_buf()));
        Ok(())
    }

    fn bind_mount(&self, source: &Path, target: &Path) -> nix::Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push("bind");

        if state.failing_binds.contains(target) {
            return Err(Errno::ENOENT);
        }
        state
            .bind_mounts
            .push((source.to_path_buf(), target.to_path_buf()));
        Ok(())
    }

    fn is_directory(&self, path: &Path) -> bool {
        let state = self.state.borrow();
        state.directories.contains_key(path) || state.unreadable_dirs.contains(path)
    }

    fn list_directory(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let state = self.state.borrow();
        if state.unreadable_dirs.contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        state
            .directories
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}
