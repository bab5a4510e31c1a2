//! CLI argument definitions

use std::ffi::OsString;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "nsexec")]
#[command(about = "Run a command inside an existing network namespace", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Network namespace name (as listed in /var/run/netns)
    #[arg(long = "net", value_name = "NAME")]
    pub net: String,

    /// Command to run, followed by its arguments
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<OsString>,
}

/// Accept the historical single-dash `-net` spelling
///
/// Rewrites `-net NAME` and `-net=NAME` to their `--net` forms. Only options
/// before the command are touched; the command's own arguments pass through.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut normalized: Vec<OsString> = args.next().into_iter().collect();
    let mut in_command = false;
    let mut expects_value = false;

    for arg in args {
        if in_command {
            normalized.push(arg);
            continue;
        }
        if expects_value {
            expects_value = false;
            normalized.push(arg);
            continue;
        }

        let rewritten = match arg.to_str() {
            Some("-net" | "--net") => {
                expects_value = true;
                Some(OsString::from("--net"))
            }
            Some(s) if s.starts_with("-net=") => Some(OsString::from(format!("-{s}"))),
            Some(s) if s.starts_with('-') && s != "--" => None,
            _ => {
                in_command = true;
                None
            }
        };
        normalized.push(rewritten.unwrap_or(arg));
    }

    normalized
}
