//! Namespace entry and command execution

use anyhow::{Context, Result};
use nsexec_core::NamespaceName;
use nsexec_namespace::{
    exec_in_namespace, EntryConfig, NamespaceEntry, ProcessRunner, SyscallBackend,
};
use tracing::debug;

use crate::cli::Cli;

/// Enter the requested namespace, run the command, and return the exit code to use
///
/// Everything runs on the main thread: the namespace switch only applies to
/// the calling thread and the command inherits it from there.
pub fn execute(cli: &Cli) -> Result<i32> {
    let name = NamespaceName::new(cli.net.as_str()).context("Invalid namespace name")?;

    let entry = NamespaceEntry::new(SyscallBackend::new(), EntryConfig::default());
    let result = exec_in_namespace(&entry, &ProcessRunner, &name, &cli.command).map_err(|e| {
        let context = match e.stage() {
            Some(stage) => format!("Unable to {stage} for {name}"),
            None => format!("Unable to run command in {name} namespace"),
        };
        anyhow::Error::new(e).context(context)
    })?;

    debug!(
        namespace = %name,
        outcome = %result.outcome,
        overlaid = result.report.overlaid.len(),
        "Command finished"
    );

    Ok(result.outcome.exit_code())
}
