//! Entering an existing network namespace
//!
//! Entry runs as a fixed sequence of stages:
//! 1. Open the namespace handle
//! 2. Join the network namespace (handle closed right after)
//! 3. Detach into a private mount table with slave propagation
//! 4. Replace sysfs so it describes the joined namespace
//! 5. Bind-mount `/etc/netns/<name>/*` over `/etc` (best-effort)
//!
//! Stages 1-4 abort on the first error. Stage 5 only collects warnings.

use std::path::Path;

use nix::errno::Errno;
use nsexec_core::{ConfigOverlayEntry, Error, NamespaceName, OverlayWarning, Result, Stage};
use tracing::{debug, info, warn};

use crate::backend::NamespaceBackend;
use crate::config::EntryConfig;

/// Outcome of a successful [`NamespaceEntry::enter`]
#[derive(Debug)]
pub struct EntryReport {
    /// Namespace that was entered
    pub namespace: NamespaceName,

    /// Configuration files bind-mounted over the standard paths
    pub overlaid: Vec<ConfigOverlayEntry>,

    /// Non-fatal problems from the configuration overlay
    pub warnings: Vec<OverlayWarning>,
}

impl EntryReport {
    fn new(namespace: NamespaceName) -> Self {
        Self {
            namespace,
            overlaid: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Whether the overlay stage reported problems
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Moves the calling thread into a network namespace
///
/// Must run on the thread that later spawns the command, before any other
/// thread exists. Entering more than once per process is not supported.
#[derive(Debug)]
pub struct NamespaceEntry<B: NamespaceBackend> {
    backend: B,
    config: EntryConfig,
}

impl<B: NamespaceBackend> NamespaceEntry<B> {
    /// Create an entry procedure over `backend`
    #[must_use]
    pub const fn new(backend: B, config: EntryConfig) -> Self {
        Self { backend, config }
    }

    /// Enter the network namespace `name`
    ///
    /// # Errors
    /// Returns the error of the first failing stage among open, switch,
    /// mount isolation and sysfs remount. Overlay problems never fail.
    pub fn enter(&self, name: &NamespaceName) -> Result<EntryReport> {
        info!(namespace = %name, "Entering network namespace");

        self.switch(name)?;
        self.isolate_mounts()?;
        self.remount_sysfs(name)?;

        let mut report = EntryReport::new(name.clone());
        self.overlay_config(name, &mut report);

        info!(
            namespace = %name,
            overlaid = report.overlaid.len(),
            warnings = report.warnings.len(),
            "Network namespace entered"
        );

        Ok(report)
    }

    /// Stages 1 and 2
    fn switch(&self, name: &NamespaceName) -> Result<()> {
        let path = self.config.handle_path(name);
        debug!(stage = %Stage::Open, path = %path.display());

        let handle = self
            .backend
            .open_namespace(&path)
            .map_err(|source| Error::NamespaceNotFound {
                name: name.to_string(),
                path: path.clone(),
                source,
            })?;

        debug!(stage = %Stage::Switch, namespace = %name);
        let joined = self.backend.join_network_namespace(&handle);
        drop(handle);

        joined.map_err(|source| Error::SwitchFailed {
            name: name.to_string(),
            source,
        })
    }

    /// Stage 3, must complete before anything is mounted
    fn isolate_mounts(&self) -> Result<()> {
        debug!(stage = %Stage::IsolateMounts);

        self.backend
            .unshare_mount_namespace()
            .map_err(|source| Error::MountIsolationFailed {
                operation: "unshare",
                source,
            })?;

        self.backend
            .make_rslave(Path::new("/"))
            .map_err(|source| Error::MountIsolationFailed {
                operation: "mount / as rslave",
                source,
            })
    }

    /// Stage 4
    fn remount_sysfs(&self, name: &NamespaceName) -> Result<()> {
        let target = self.config.sysfs_dir();
        debug!(stage = %Stage::RemountSysfs, target = %target.display());

        let remount_error = |operation: &'static str, source: Errno| Error::MetadataRemountFailed {
            target: target.to_path_buf(),
            operation,
            source,
        };

        self.backend
            .detach_mount(target)
            .map_err(|e| remount_error("umount", e))?;
        self.backend
            .mount_sysfs(name.as_str(), target)
            .map_err(|e| remount_error("mount", e))
    }

    /// Stage 5
    fn overlay_config(&self, name: &NamespaceName, report: &mut EntryReport) {
        let dir = self.config.namespace_config_dir(name);
        debug!(stage = %Stage::OverlayConfig, dir = %dir.display());

        if !self.backend.is_directory(&dir) {
            debug!(dir = %dir.display(), "No namespace configuration to overlay");
            return;
        }

        let files = match self.backend.list_directory(&dir) {
            Ok(files) => files,
            Err(source) => {
                let warning = OverlayWarning::ReadDir { dir, source };
                warn!("{warning}");
                report.warnings.push(warning);
                return;
            }
        };

        for file in files {
            let entry = ConfigOverlayEntry::new(&dir, &self.config.etc_dir, file);

            match self.backend.bind_mount(&entry.source, &entry.destination) {
                Ok(()) => {
                    debug!(%entry, "Configuration overlaid");
                    report.overlaid.push(entry);
                }
                Err(source) => {
                    let warning = OverlayWarning::BindMount { entry, source };
                    warn!("{warning}");
                    report.warnings.push(warning);
                }
            }
        }
    }
}
