// src/installer.rs

//! External package manager invocation
//!
//! The installer is a capability (`PackageInstaller`) so that reconciliation
//! can be exercised without spawning processes. `PipInstaller` runs pip with
//! inherited stdio.

use crate::error::{Error, Result};
use std::fmt;
use std::process::Command;
use tracing::info;

/// Passthrough flags that would let pip read the manifest itself or upgrade
/// packages behind the manifest's back
pub const DISABLED_ARGUMENTS: [&str; 5] = ["-r", "--requirement", "--requirements", "-U", "--upgrade"];

/// pip short options that consume the rest of their cluster as a value
const VALUE_SHORT_FLAGS: [char; 6] = ['r', 'c', 'e', 't', 'i', 'f'];

/// Shortest abbreviation of `--requirement` pip accepts unambiguously
const REQUIREMENT_ABBREV: &str = "--requirem";

/// Passthrough flags that make pip do something useful with no packages
const FORCING_ARGUMENTS: [&str; 2] = ["-h", "--help"];

/// Package manager verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallerCommand {
    Install,
    Uninstall,
}

impl InstallerCommand {
    pub fn as_str(&self) -> &str {
        match self {
            InstallerCommand::Install => "install",
            InstallerCommand::Uninstall => "uninstall",
        }
    }
}

impl fmt::Display for InstallerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Arguments forwarded verbatim to the package manager (everything after `--`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassthroughArgs {
    args: Vec<String>,
}

impl PassthroughArgs {
    /// Validate forwarded arguments against the deny-list
    ///
    /// Flags are recognised in every spelling pip accepts: `--flag=value`,
    /// unambiguous long abbreviations, `-rFILE`, and short option clusters
    /// such as `-qU`.
    pub fn new(args: Vec<String>) -> Result<Self> {
        let mut disabled: Vec<&str> = args.iter().flat_map(|arg| disabled_flags(arg)).collect();

        if !disabled.is_empty() {
            disabled.sort_unstable();
            disabled.dedup();
            return Err(Error::DisabledArgument(disabled.join(", ")));
        }

        Ok(Self { args })
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Whether the package manager must run even with nothing to change
    pub fn forces_run(&self) -> bool {
        self.args
            .iter()
            .any(|arg| FORCING_ARGUMENTS.contains(&arg.as_str()))
    }
}

/// Deny-listed flags spelled by a single argument
fn disabled_flags(arg: &str) -> Vec<&'static str> {
    if let Some(long) = arg.strip_prefix("--") {
        let name = long.split_once('=').map_or(long, |(name, _)| name);
        let option = format!("--{}", name);
        let flag = match option.as_str() {
            "--requirements" => Some("--requirements"),
            "--upgrade" => Some("--upgrade"),
            o if o.len() >= REQUIREMENT_ABBREV.len() && "--requirement".starts_with(o) => {
                Some("--requirement")
            }
            _ => None,
        };
        return flag.into_iter().collect();
    }

    let Some(cluster) = arg.strip_prefix('-') else {
        return Vec::new();
    };

    let mut flags = Vec::new();
    for c in cluster.chars() {
        match c {
            'U' => flags.push("-U"),
            'r' => flags.push("-r"),
            _ => {}
        }
        if VALUE_SHORT_FLAGS.contains(&c) {
            break;
        }
    }
    flags
}

/// Runs the external package manager
pub trait PackageInstaller {
    /// Run `command` on `packages` with extra forwarded `args`
    fn run(&self, command: InstallerCommand, packages: &[String], args: &[String]) -> Result<()>;
}

/// pip as a subprocess
pub struct PipInstaller {
    program: String,
}

impl PipInstaller {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build the command line without running it
    pub fn command(&self, command: InstallerCommand, packages: &[String], args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(command.as_str()).args(packages).args(args);
        cmd
    }
}

impl PackageInstaller for PipInstaller {
    fn run(&self, command: InstallerCommand, packages: &[String], args: &[String]) -> Result<()> {
        info!(
            "Running {} {} {} {}",
            self.program,
            command,
            packages.join(" "),
            args.join(" ")
        );

        let status = self.command(command, packages, args).status()?;
        if !status.success() {
            // Killed by a signal: no exit code to forward
            return Err(Error::InstallerFailed {
                code: status.code().unwrap_or(1),
            });
        }

        info!("{}ed packages: {:?}", capitalize(command.as_str()), packages);
        Ok(())
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_passthrough_args_accepted() {
        let passthrough = PassthroughArgs::new(args(&["pip_arg1", "pip_arg2"])).unwrap();
        assert_eq!(passthrough.as_slice(), &args(&["pip_arg1", "pip_arg2"])[..]);
        assert!(!passthrough.forces_run());

        let empty = PassthroughArgs::new(Vec::new()).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_disabled_arguments_rejected() {
        for flag in DISABLED_ARGUMENTS {
            let result = PassthroughArgs::new(args(&["--no-cache-dir", flag]));
            assert!(matches!(result, Err(Error::DisabledArgument(_))), "{} allowed", flag);
        }

        let result = PassthroughArgs::new(args(&["-r", "requirements.txt"]));
        assert!(matches!(result, Err(Error::DisabledArgument(f)) if f == "-r"));
    }

    #[test]
    fn test_disabled_long_flags_with_values() {
        let spellings = [
            "--requirement=reqs.txt",
            "--requirements=reqs.txt",
            "--upgrade=yes",
            "--requirem",
            "--requireme=a.txt",
        ];
        for arg in spellings {
            let result = PassthroughArgs::new(args(&[arg]));
            assert!(matches!(result, Err(Error::DisabledArgument(_))), "{} allowed", arg);
        }

        let result = PassthroughArgs::new(args(&["--requirement=reqs.txt"]));
        assert!(matches!(result, Err(Error::DisabledArgument(f)) if f == "--requirement"));
    }

    #[test]
    fn test_disabled_short_flag_spellings() {
        let result = PassthroughArgs::new(args(&["-rreqs.txt"]));
        assert!(matches!(result, Err(Error::DisabledArgument(f)) if f == "-r"));

        let result = PassthroughArgs::new(args(&["-qU"]));
        assert!(matches!(result, Err(Error::DisabledArgument(f)) if f == "-U"));

        let result = PassthroughArgs::new(args(&["-Uqr", "reqs.txt"]));
        assert!(matches!(result, Err(Error::DisabledArgument(f)) if f == "-U, -r"));
    }

    #[test]
    fn test_similar_flags_accepted() {
        let accepted = [
            "--upgrade-strategy=eager",
            "--require-hashes",
            "--no-deps",
            "-q",
            "-ihttps://example.com/Ur",
            "--index-url=https://example.com/-U",
            "requests",
        ];
        let passthrough = PassthroughArgs::new(args(&accepted)).unwrap();
        assert_eq!(passthrough.as_slice().len(), accepted.len());
    }

    #[test]
    fn test_help_forces_run() {
        assert!(PassthroughArgs::new(args(&["--help"])).unwrap().forces_run());
        assert!(PassthroughArgs::new(args(&["-h"])).unwrap().forces_run());
        assert!(!PassthroughArgs::new(args(&["-y"])).unwrap().forces_run());
    }

    #[test]
    fn test_pip_command_line() {
        let pip = PipInstaller::new("pip");
        let cmd = pip.command(
            InstallerCommand::Install,
            &args(&["numpy==1.2.0", "pkg[extra]>=2.0"]),
            &args(&["--index-url", "https://download.pytorch.org/whl/cu118"]),
        );

        assert_eq!(cmd.get_program(), "pip");
        let argv: Vec<&str> = cmd.get_args().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(
            argv,
            vec![
                "install",
                "numpy==1.2.0",
                "pkg[extra]>=2.0",
                "--index-url",
                "https://download.pytorch.org/whl/cu118"
            ]
        );
    }

    #[test]
    fn test_failing_installer_reports_exit_code() {
        // `false` ignores its arguments and exits with 1
        let installer = PipInstaller::new("false");
        let result = installer.run(InstallerCommand::Uninstall, &args(&["numpy"]), &[]);
        assert!(matches!(result, Err(Error::InstallerFailed { code: 1 })));
    }

    #[test]
    fn test_missing_installer_is_io_error() {
        let installer = PipInstaller::new("definitely-not-a-package-manager");
        let result = installer.run(InstallerCommand::Install, &[], &[]);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("install"), "Install");
        assert_eq!(capitalize(""), "");
    }
}
