use std::ffi::OsString;
use std::path::PathBuf;

use nix::errno::Errno;
use nsexec_core::{Error, NamespaceName, OverlayWarning, Stage};
use nsexec_namespace::*;

fn name(s: &str) -> NamespaceName {
    NamespaceName::new(s).unwrap()
}

fn command(parts: &[&str]) -> Vec<OsString> {
    parts.iter().map(OsString::from).collect()
}

#[test]
fn test_missing_namespace_never_spawns() {
    let backend = MockBackend::new();
    let runner = MockRunner::new();
    let entry = NamespaceEntry::new(backend.clone(), EntryConfig::default());

    let result = exec_in_namespace(&entry, &runner, &name("missing-ns"), &command(&["ip", "a"]));

    let err = result.unwrap_err();
    assert!(matches!(err, Error::NamespaceNotFound { .. }));
    assert_eq!(err.stage(), Some(Stage::Open));
    assert!(!runner.was_run());
    assert_eq!(backend.handles_opened(), 0);
}

#[test]
fn test_invalid_handle_stops_after_switch() {
    let backend = MockBackend::new().with_invalid_namespace("/var/run/netns/bogus");
    let runner = MockRunner::new();
    let entry = NamespaceEntry::new(backend.clone(), EntryConfig::default());

    let err = exec_in_namespace(&entry, &runner, &name("bogus"), &command(&["true"])).unwrap_err();

    assert!(matches!(err, Error::SwitchFailed { .. }));
    assert_eq!(backend.calls(), vec!["open", "setns"]);
    assert!(backend.sysfs_mounts().is_empty());
    assert!(!runner.was_run());
}

#[test]
fn test_no_config_dir_succeeds_without_warnings() {
    let backend = MockBackend::new().with_namespace("/var/run/netns/ns-empty");
    let runner = MockRunner::new();
    let entry = NamespaceEntry::new(backend.clone(), EntryConfig::default());

    let result =
        exec_in_namespace(&entry, &runner, &name("ns-empty"), &command(&["ip", "link"])).unwrap();

    assert!(result.report.warnings.is_empty());
    assert!(result.report.overlaid.is_empty());
    assert!(result.outcome.success());
    assert_eq!(runner.invocations(), vec![command(&["ip", "link"])]);
    assert_eq!(
        backend.joined(),
        Some(PathBuf::from("/var/run/netns/ns-empty"))
    );
}

#[test]
fn test_one_failing_bind_does_not_stop_others() {
    let files = ["hosts", "nsswitch.conf", "resolv.conf", "services"];
    let backend = MockBackend::new()
        .with_namespace("/var/run/netns/blue")
        .with_directory("/etc/netns/blue", files)
        .with_failing_bind("/etc/resolv.conf");
    let runner = MockRunner::new();
    let entry = NamespaceEntry::new(backend.clone(), EntryConfig::default());

    let result = exec_in_namespace(&entry, &runner, &name("blue"), &command(&["cat", "/etc/hosts"]))
        .unwrap();

    assert_eq!(result.report.warnings.len(), 1);
    match &result.report.warnings[0] {
        OverlayWarning::BindMount { entry, source } => {
            assert_eq!(entry.destination, PathBuf::from("/etc/resolv.conf"));
            assert_eq!(*source, Errno::ENOENT);
        }
        other => panic!("unexpected warning: {other}"),
    }

    // Every entry attempted, N-1 mounted
    let binds = backend.bind_mounts();
    assert_eq!(binds.len(), files.len() - 1);
    assert!(binds.contains(&(
        PathBuf::from("/etc/netns/blue/services"),
        PathBuf::from("/etc/services")
    )));
    assert_eq!(
        backend.calls().iter().filter(|c| **c == "bind").count(),
        files.len()
    );
    assert!(runner.was_run());
}

#[test]
fn test_handle_closed_on_success_and_failure() {
    let ok = MockBackend::new().with_namespace("/var/run/netns/good");
    NamespaceEntry::new(ok.clone(), EntryConfig::default())
        .enter(&name("good"))
        .unwrap();
    assert_eq!(ok.handles_opened(), 1);
    assert_eq!(ok.open_handles(), 0);

    let bad = MockBackend::new().with_invalid_namespace("/var/run/netns/bad");
    NamespaceEntry::new(bad.clone(), EntryConfig::default())
        .enter(&name("bad"))
        .unwrap_err();
    assert_eq!(bad.handles_opened(), 1);
    assert_eq!(bad.open_handles(), 0);
}

#[test]
fn test_handle_closed_before_mount_isolation() {
    // Unshare fails after the switch, the handle must already be gone
    let backend = MockBackend::new()
        .with_namespace("/var/run/netns/blue")
        .with_failure(MockOp::Unshare, Errno::EPERM);

    let err = NamespaceEntry::new(backend.clone(), EntryConfig::default())
        .enter(&name("blue"))
        .unwrap_err();

    assert!(matches!(
        err,
        Error::MountIsolationFailed {
            operation: "unshare",
            ..
        }
    ));
    assert_eq!(backend.open_handles(), 0);
    assert!(backend.rslave_root().is_none());
}

#[test]
fn test_sysfs_detach_failure_is_fatal() {
    let backend = MockBackend::new()
        .with_namespace("/var/run/netns/blue")
        .with_directory("/etc/netns/blue", ["resolv.conf"])
        .with_failure(MockOp::DetachMount, Errno::EBUSY);
    let runner = MockRunner::new();
    let entry = NamespaceEntry::new(backend.clone(), EntryConfig::default());

    let err = exec_in_namespace(&entry, &runner, &name("blue"), &command(&["true"])).unwrap_err();

    assert_eq!(err.stage(), Some(Stage::RemountSysfs));
    assert!(backend.bind_mounts().is_empty());
    assert!(!runner.was_run());
}

#[test]
fn test_empty_command_rejected_before_entry() {
    let backend = MockBackend::new().with_namespace("/var/run/netns/blue");
    let runner = MockRunner::new();
    let entry = NamespaceEntry::new(backend.clone(), EntryConfig::default());

    let err = exec_in_namespace(&entry, &runner, &name("blue"), &[]).unwrap_err();

    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert!(backend.calls().is_empty());
}

#[test]
fn test_spawn_error_surfaces_after_entry() {
    let backend = MockBackend::new().with_namespace("/var/run/netns/blue");
    let runner = MockRunner::new().with_spawn_error(std::io::ErrorKind::NotFound);
    let entry = NamespaceEntry::new(backend.clone(), EntryConfig::default());

    let err =
        exec_in_namespace(&entry, &runner, &name("blue"), &command(&["no-such-cmd"])).unwrap_err();

    assert!(matches!(err, Error::CommandSpawn { .. }));
    assert_eq!(err.stage(), None);
    assert_eq!(backend.sysfs_mounts().len(), 1);
}

#[test]
fn test_child_exit_code_is_reported() {
    let backend = MockBackend::new().with_namespace("/var/run/netns/blue");
    let runner = MockRunner::new().with_outcome(ExitOutcome::Exited(3));
    let entry = NamespaceEntry::new(backend, EntryConfig::default());

    let result = exec_in_namespace(&entry, &runner, &name("blue"), &command(&["false"])).unwrap();

    assert_eq!(result.outcome.exit_code(), 3);
    assert_eq!(result.report.namespace.as_str(), "blue");
}

#[test]
fn test_absolute_name_cannot_escape_runtime_dir() {
    // A real handle at the absolute path must not be reachable by name
    let backend = MockBackend::new()
        .with_namespace("/proc/self/ns/net")
        .with_directory("/etc", ["hosts"]);
    let runner = MockRunner::new();
    let entry = NamespaceEntry::new(backend.clone(), EntryConfig::default());

    let err = exec_in_namespace(&entry, &runner, &name("/proc/self/ns/net"), &command(&["true"]))
        .unwrap_err();

    match err {
        Error::NamespaceNotFound { path, .. } => {
            assert_eq!(path, PathBuf::from("/var/run/netns/proc/self/ns/net"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.handles_opened(), 0);
    assert!(backend.bind_mounts().is_empty());
    assert!(!runner.was_run());
}
