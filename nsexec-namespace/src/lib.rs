//! Entering existing network namespaces
//!
//! This crate moves the current thread into a network namespace registered
//! under `/var/run/netns` and prepares a matching filesystem view:
//! - Network namespace - joined with `setns(2)`
//! - Mount namespace - private copy with slave propagation
//! - sysfs - remounted so devices reflect the joined namespace
//! - `/etc/netns/<name>` - files bind-mounted over `/etc`
//!
//! It also runs the target command once the namespace is entered.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod backend;
pub mod config;
pub mod entry;
pub mod executor;
pub mod syscall;

pub use backend::{MockBackend, MockHandle, MockOp, NamespaceBackend};
pub use config::EntryConfig;
pub use entry::{EntryReport, NamespaceEntry};
pub use executor::{
    exec_in_namespace, CommandRunner, ExecutionResult, ExitOutcome, MockRunner, ProcessRunner,
};
pub use syscall::SyscallBackend;
