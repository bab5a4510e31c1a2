//! Core type definitions

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{Error, Result};

/// Name of a network namespace registered under the namespace runtime directory
///
/// The name is opaque: it is only checked for emptiness. Anything else is left
/// to the filesystem lookup, so odd characters surface as a not-found error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NamespaceName(String);

impl NamespaceName {
    /// Create a new `NamespaceName`
    ///
    /// # Errors
    /// Returns error if the name is empty
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_argument("Namespace name cannot be empty"));
        }
        Ok(Self(name))
    }

    /// Get the name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of this namespace's entry inside `dir`
    ///
    /// The name is always appended below `dir`, even when it starts with `/`.
    #[must_use]
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.0.trim_start_matches('/'))
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NamespaceName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for NamespaceName {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for NamespaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One namespace-specific configuration file and the standard path it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOverlayEntry {
    /// File inside the per-namespace configuration directory
    pub source: PathBuf,
    /// Identically-named file under the standard configuration directory
    pub destination: PathBuf,
}

impl ConfigOverlayEntry {
    /// Map `file_name` from `source_dir` onto `destination_dir`
    pub fn new(
        source_dir: impl AsRef<Path>,
        destination_dir: impl AsRef<Path>,
        file_name: impl AsRef<OsStr>,
    ) -> Self {
        let file_name = file_name.as_ref();
        Self {
            source: source_dir.as_ref().join(file_name),
            destination: destination_dir.as_ref().join(file_name),
        }
    }
}

impl fmt::Display for ConfigOverlayEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.source.display(),
            self.destination.display()
        )
    }
}

/// Stages of entering a network namespace, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Open the namespace handle
    Open,
    /// Join the network namespace
    Switch,
    /// Detach into a private, slave mount table
    IsolateMounts,
    /// Replace the sysfs mount
    RemountSysfs,
    /// Bind-mount per-namespace configuration (non-fatal)
    OverlayConfig,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open namespace",
            Self::Switch => "switch network namespace",
            Self::IsolateMounts => "isolate mount table",
            Self::RemountSysfs => "remount sysfs",
            Self::OverlayConfig => "overlay configuration",
        };
        f.write_str(name)
    }
}
