//! Error types for nsexec

use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

use crate::types::{ConfigOverlayEntry, Stage};

/// nsexec error types
///
/// Every variant except [`Error::InvalidArgument`] and the command variants
/// maps to one fatal stage of namespace entry, see [`Error::stage`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Usage violation, detected before any privileged call
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Namespace handle could not be opened
    #[error("Unable to find {name} namespace at {}: {source}", .path.display())]
    NamespaceNotFound {
        /// Namespace name as given by the caller
        name: String,
        /// Resolved handle path
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// `setns(2)` rejected the handle
    #[error("Unable to join {name} network namespace: setns() failed: {source}")]
    SwitchFailed {
        /// Namespace name
        name: String,
        /// Errno reported by the kernel
        source: Errno,
    },

    /// Private mount table could not be set up
    #[error("Unable to isolate mount table: {operation} failed: {source}")]
    MountIsolationFailed {
        /// Failing step
        operation: &'static str,
        /// Errno reported by the kernel
        source: Errno,
    },

    /// sysfs could not be remounted for the namespace
    #[error("Unable to remount {}: {operation} failed: {source}", .target.display())]
    MetadataRemountFailed {
        /// Mount point
        target: PathBuf,
        /// Failing step
        operation: &'static str,
        /// Errno reported by the kernel
        source: Errno,
    },

    /// Command could not be started
    #[error("Unable to start command {program}: {source}")]
    CommandSpawn {
        /// Program as given by the caller
        program: String,
        /// Underlying I/O error
        source: io::Error,
    },

    /// Command started but its outcome could not be collected
    #[error("Error while running command {program}: {source}")]
    CommandExecution {
        /// Program as given by the caller
        program: String,
        /// Underlying I/O error
        source: io::Error,
    },
}

impl Error {
    /// Entry stage this error aborted, if any
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::NamespaceNotFound { .. } => Some(Stage::Open),
            Self::SwitchFailed { .. } => Some(Stage::Switch),
            Self::MountIsolationFailed { .. } => Some(Stage::IsolateMounts),
            Self::MetadataRemountFailed { .. } => Some(Stage::RemountSysfs),
            Self::InvalidArgument { .. }
            | Self::CommandSpawn { .. }
            | Self::CommandExecution { .. } => None,
        }
    }

    /// Shorthand for [`Error::InvalidArgument`]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

/// Non-fatal problem while overlaying namespace configuration files
///
/// Warnings are logged and collected; they never abort namespace entry.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OverlayWarning {
    /// The per-namespace configuration directory could not be listed
    #[error("Read files in {} failed: {source}", .dir.display())]
    ReadDir {
        /// Directory being listed
        dir: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// One configuration file could not be bind-mounted
    #[error("Bind mount {entry} failed: {source}")]
    BindMount {
        /// The overlay that failed
        entry: ConfigOverlayEntry,
        /// Errno reported by the kernel
        source: Errno,
    },
}

/// Result type alias for nsexec operations
pub type Result<T> = std::result::Result<T, Error>;
