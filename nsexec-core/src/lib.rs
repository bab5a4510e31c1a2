//! nsexec Core - Foundation types and errors
//!
//! This crate provides the types shared by the namespace entry logic and the CLI.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

pub use error::{Error, OverlayWarning, Result};
pub use types::{ConfigOverlayEntry, NamespaceName, Stage};
