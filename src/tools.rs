//! External tool invocation.
//!
//! Every tool is run from an explicit argument vector ([`ToolCommand`]);
//! nothing goes through a shell. Orchestration code talks to a
//! [`ToolRunner`] so the OS boundary can be replaced in tests.
//!
//! Calls block until the child exits. There is no timeout: a hung tool
//! hangs the run.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::error;

use crate::config::ToolkitConfig;
use crate::error::{Error, Result};

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ToolCommand {
    /// Starts a command for `program`.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Runs the command from `dir` instead of the current directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Program name or path.
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments, not including the program.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Working directory override, if any.
    pub fn get_current_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Program followed by arguments, lossily converted for display and matching.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// Runs external tools.
pub trait ToolRunner {
    /// Runs `command` to completion and returns its captured stdout.
    ///
    /// A non-zero exit is an [`Error::Subprocess`].
    fn run(&self, command: &ToolCommand) -> Result<Vec<u8>>;
}

/// Runs tools as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<Vec<u8>> {
        let program = command.program().to_string_lossy().into_owned();
        let mut cmd = Command::new(command.program());
        cmd.args(command.get_args());
        if let Some(dir) = command.get_current_dir() {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|source| Error::ToolLaunch {
            program: program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(Error::Subprocess {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// Configuration and runner handed to every component that shells out.
#[derive(Clone, Copy)]
pub struct Toolbox<'a> {
    /// Tool locations and carving parameters
    pub config: &'a ToolkitConfig,
    /// Process runner
    pub runner: &'a dyn ToolRunner,
}

impl<'a> Toolbox<'a> {
    /// Bundles a configuration with a runner.
    pub fn new(config: &'a ToolkitConfig, runner: &'a dyn ToolRunner) -> Self {
        Self { config, runner }
    }

    /// Runs `command`, logging a failure as `Subprocess error: <description>`.
    pub fn run(&self, description: &str, command: &ToolCommand) -> Result<Vec<u8>> {
        self.runner.run(command).map_err(|e| {
            error!("Subprocess error: {}. Command: {}. Details: {}", description, command, e);
            e
        })
    }

    /// Builds a mount/umount invocation, prefixed with the privilege wrapper if configured.
    pub fn privileged(&self, program: &str) -> ToolCommand {
        match self.config.tools.sudo.as_deref().filter(|s| !s.is_empty()) {
            Some(sudo) => ToolCommand::new(sudo).arg(program),
            None => ToolCommand::new(program),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A runner that records invocations and simulates tool side effects.

    use super::*;
    use std::cell::RefCell;

    type Script = Box<dyn Fn(&ToolCommand) -> Result<Vec<u8>>>;

    pub struct ScriptedRunner {
        calls: RefCell<Vec<ToolCommand>>,
        script: Script,
    }

    impl ScriptedRunner {
        pub fn new(script: impl Fn(&ToolCommand) -> Result<Vec<u8>> + 'static) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                script: Box::new(script),
            }
        }

        /// Every tool succeeds silently.
        pub fn succeeding() -> Self {
            Self::new(|_| Ok(Vec::new()))
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.borrow().iter().map(|c| c.argv()).collect()
        }

        /// Number of calls whose program is `name`.
        pub fn count(&self, name: &str) -> usize {
            self.calls()
                .iter()
                .filter(|argv| argv.first().map(String::as_str) == Some(name))
                .count()
        }
    }

    impl ToolRunner for ScriptedRunner {
        fn run(&self, command: &ToolCommand) -> Result<Vec<u8>> {
            self.calls.borrow_mut().push(command.clone());
            (self.script)(command)
        }
    }

    /// Value following `flag` in an argument vector.
    pub fn arg_after<'a>(argv: &'a [String], flag: &str) -> Option<&'a str> {
        argv.iter()
            .position(|a| a == flag)
            .and_then(|i| argv.get(i + 1))
            .map(String::as_str)
    }

    /// A config whose mount/umount run without a privilege wrapper.
    pub fn test_config(mount_point: &Path) -> ToolkitConfig {
        let mut config = ToolkitConfig::default();
        config.tools.sudo = None;
        config.mount.point = mount_point.to_path_buf();
        config
    }
}
