//! Namespace entry configuration

use std::path::{Path, PathBuf};

use nsexec_core::NamespaceName;

/// Default directory holding network namespace handles (iproute2 convention)
pub const NETNS_RUN_DIR: &str = "/var/run/netns";

/// Default directory holding per-namespace configuration
pub const NETNS_ETC_DIR: &str = "/etc/netns";

/// Standard configuration directory
pub const ETC_DIR: &str = "/etc";

/// sysfs mount point
pub const SYSFS_DIR: &str = "/sys";

/// Filesystem locations used while entering a namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryConfig {
    /// Directory holding namespace handles
    pub runtime_dir: PathBuf,

    /// Directory holding one configuration directory per namespace
    pub config_dir: PathBuf,

    /// Directory the configuration files are overlaid onto
    pub etc_dir: PathBuf,

    /// sysfs mount point
    pub sysfs_dir: PathBuf,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            runtime_dir: PathBuf::from(NETNS_RUN_DIR),
            config_dir: PathBuf::from(NETNS_ETC_DIR),
            etc_dir: PathBuf::from(ETC_DIR),
            sysfs_dir: PathBuf::from(SYSFS_DIR),
        }
    }
}

impl EntryConfig {
    /// Create a configuration with the standard locations
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace handle directory
    #[must_use]
    pub fn with_runtime_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.runtime_dir = dir.into();
        self
    }

    /// Set the per-namespace configuration directory
    #[must_use]
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    /// Set the overlay destination directory
    #[must_use]
    pub fn with_etc_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.etc_dir = dir.into();
        self
    }

    /// Set the sysfs mount point
    #[must_use]
    pub fn with_sysfs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sysfs_dir = dir.into();
        self
    }

    /// Handle path for `name`
    #[must_use]
    pub fn handle_path(&self, name: &NamespaceName) -> PathBuf {
        name.path_in(&self.runtime_dir)
    }

    /// Configuration directory for `name`
    #[must_use]
    pub fn namespace_config_dir(&self, name: &NamespaceName) -> PathBuf {
        name.path_in(&self.config_dir)
    }

    /// sysfs mount point
    #[must_use]
    pub fn sysfs_dir(&self) -> &Path {
        &self.sysfs_dir
    }
}
