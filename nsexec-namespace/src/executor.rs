//! Running the target command once the namespace is entered

use std::cell::RefCell;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus};
use std::rc::Rc;

use nsexec_core::{Error, NamespaceName, Result};
use tracing::{debug, info, warn};

use crate::backend::NamespaceBackend;
use crate::entry::{EntryReport, NamespaceEntry};

/// How the command terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited normally with this code
    Exited(i32),
    /// Killed by this signal
    Signaled(i32),
}

impl ExitOutcome {
    /// Process exit code to report for this outcome
    ///
    /// Signals follow the shell convention of `128 + signal`.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Exited(code) => code,
            Self::Signaled(signal) => 128 + signal,
        }
    }

    /// Whether the command exited with code 0
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => Self::Exited(code),
            (None, Some(signal)) => Self::Signaled(signal),
            (None, None) => Self::Exited(1),
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit code {code}"),
            Self::Signaled(signal) => write!(f, "signal {signal}"),
        }
    }
}

/// Spawns the target command
pub trait CommandRunner {
    /// Run `program` with `args` and wait for it
    ///
    /// # Errors
    /// [`Error::CommandSpawn`] if the program could not be started,
    /// [`Error::CommandExecution`] if waiting for it failed. A non-zero
    /// exit is an `Ok` outcome.
    fn run(&self, program: &OsStr, args: &[OsString]) -> Result<ExitOutcome>;
}

/// Runs the command as a child inheriting stdio and namespaces
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &OsStr, args: &[OsString]) -> Result<ExitOutcome> {
        let program_name = program.to_string_lossy().into_owned();
        debug!(program = %program_name, ?args, "Spawning command");

        let mut child = Command::new(program)
            .args(args)
            .spawn()
            .map_err(|source| Error::CommandSpawn {
                program: program_name.clone(),
                source,
            })?;

        let status = child.wait().map_err(|source| Error::CommandExecution {
            program: program_name.clone(),
            source,
        })?;

        let outcome = ExitOutcome::from(status);
        debug!(program = %program_name, %outcome, "Command finished");
        Ok(outcome)
    }
}

/// Runner that records invocations instead of spawning (for testing)
#[derive(Debug, Clone)]
pub struct MockRunner {
    outcome: ExitOutcome,
    spawn_error: Option<io::ErrorKind>,
    invocations: Rc<RefCell<Vec<Vec<OsString>>>>,
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRunner {
    /// Runner whose commands exit with code 0
    #[must_use]
    pub fn new() -> Self {
        Self {
            outcome: ExitOutcome::Exited(0),
            spawn_error: None,
            invocations: Rc::default(),
        }
    }

    /// Report `outcome` for every command
    #[must_use]
    pub fn with_outcome(mut self, outcome: ExitOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Fail every spawn with `kind`
    #[must_use]
    pub fn with_spawn_error(mut self, kind: io::ErrorKind) -> Self {
        self.spawn_error = Some(kind);
        self
    }

    /// Command lines run so far, program first
    #[must_use]
    pub fn invocations(&self) -> Vec<Vec<OsString>> {
        self.invocations.borrow().clone()
    }

    /// Whether any command was run
    #[must_use]
    pub fn was_run(&self) -> bool {
        !self.invocations.borrow().is_empty()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, program: &OsStr, args: &[OsString]) -> Result<ExitOutcome> {
        if let Some(kind) = self.spawn_error {
            return Err(Error::CommandSpawn {
                program: program.to_string_lossy().into_owned(),
                source: io::Error::from(kind),
            });
        }

        let mut line = vec![program.to_os_string()];
        line.extend(args.iter().cloned());
        self.invocations.borrow_mut().push(line);

        Ok(self.outcome)
    }
}

/// Result of running a command inside a namespace
#[derive(Debug)]
pub struct ExecutionResult {
    /// What namespace entry did
    pub report: EntryReport,
    /// How the command terminated
    pub outcome: ExitOutcome,
}

/// Enter `name` and run `command` (program followed by its arguments) inside it
///
/// The command is only started once entry succeeded.
///
/// # Errors
/// [`Error::InvalidArgument`] for an empty command, the entry error if
/// entering failed, or the runner's spawn error.
pub fn exec_in_namespace<B, R>(
    entry: &NamespaceEntry<B>,
    runner: &R,
    name: &NamespaceName,
    command: &[OsString],
) -> Result<ExecutionResult>
where
    B: NamespaceBackend,
    R: CommandRunner,
{
    let Some((program, args)) = command.split_first() else {
        return Err(Error::invalid_argument("Command cannot be empty"));
    };

    let report = entry.enter(name)?;
    if report.has_warnings() {
        warn!(
            namespace = %name,
            warnings = report.warnings.len(),
            "Running command with incomplete configuration overlay"
        );
    }

    info!(namespace = %name, program = %program.to_string_lossy(), "Executing command");
    let outcome = runner.run(program, args)?;

    Ok(ExecutionResult { report, outcome })
}
