//! Production backend issuing real syscalls
//!
//! Requires `CAP_SYS_ADMIN`. Every call affects the calling thread (setns)
//! or the whole mount namespace of the process.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::Path;

use nix::mount::{mount, umount2, MntFlags, MsFlags};
use nix::sched::{setns, unshare, CloneFlags};

use crate::backend::NamespaceBackend;

/// [`NamespaceBackend`] backed by `setns(2)`, `unshare(2)`, `mount(2)` and `umount2(2)`
#[derive(Debug, Clone, Copy, Default)]
pub struct SyscallBackend;

impl SyscallBackend {
    /// Create the production backend
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl NamespaceBackend for SyscallBackend {
    type Handle = File;

    fn open_namespace(&self, path: &Path) -> io::Result<File> {
        // std opens with O_CLOEXEC, so the handle never reaches the command
        File::open(path)
    }

    fn join_network_namespace(&self, handle: &File) -> nix::Result<()> {
        setns(handle, CloneFlags::CLONE_NEWNET)
    }

    fn unshare_mount_namespace(&self) -> nix::Result<()> {
        unshare(CloneFlags::CLONE_NEWNS)
    }

    fn make_rslave(&self, target: &Path) -> nix::Result<()> {
        mount(
            Some("none"),
            target,
            None::<&str>,
            MsFlags::MS_REC | MsFlags::MS_SLAVE,
            None::<&str>,
        )
    }

    fn detach_mount(&self, target: &Path) -> nix::Result<()> {
        umount2(target, MntFlags::MNT_DETACH)
    }

    fn mount_sysfs(&self, label: &str, target: &Path) -> nix::Result<()> {
        mount(
            Some(label),
            target,
            Some("sysfs"),
            MsFlags::empty(),
            None::<&str>,
        )
    }

    fn bind_mount(&self, source: &Path, target: &Path) -> nix::Result<()> {
        mount(
            Some(source),
            target,
            Some("none"),
            MsFlags::MS_BIND,
            None::<&str>,
        )
    }

    fn is_directory(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok_and(|meta| meta.is_dir())
    }

    fn list_directory(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut names = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SyscallBackend::new();

        let err = backend.open_namespace(&dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_join_regular_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-namespace");
        fs::write(&path, b"").unwrap();

        let backend = SyscallBackend::new();
        let handle = backend.open_namespace(&path).unwrap();

        // EINVAL for a non-namespace fd, EPERM without privileges
        assert!(backend.join_network_namespace(&handle).is_err());
    }

    #[test]
    fn test_directory_listing_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["resolv.conf", "hosts", "nsswitch.conf"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let backend = SyscallBackend::new();
        assert!(backend.is_directory(dir.path()));

        let names = backend.list_directory(dir.path()).unwrap();
        assert_eq!(names, vec!["hosts", "nsswitch.conf", "resolv.conf"]);
    }

    #[test]
    fn test_file_is_not_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blue");
        fs::write(&path, b"").unwrap();

        let backend = SyscallBackend::new();
        assert!(!backend.is_directory(&path));
        assert!(!backend.is_directory(&dir.path().join("missing")));
    }
}
