//! Write / configure / build / install lifecycle.
//!
//! Every phase re-issues its external command from scratch and can be invoked
//! on its own. Exit codes of the external tool are passed through unchanged.
//!
//! External calls accept an optional timeout. When it expires the child is
//! killed and the phase reports [`TIMEOUT_EXIT_CODE`].

use crate::generate::Generator;
use crate::project::Project;
use anyhow::{Context, Result};
use colored::*;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Exit code reported when a tool is killed after its timeout
pub const TIMEOUT_EXIT_CODE: i32 = 124;
/// Exit code reported when a tool cannot be found
pub const NOT_FOUND_EXIT_CODE: i32 = 127;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Where a project is in its lifecycle. Informational only; no phase requires another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Uninitialized,
    Declared,
    Configured,
    Built,
    Installed,
}

/// Phases requested for one invocation, always run in this order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Phases {
    pub write: bool,
    pub configure: bool,
    pub build: bool,
    pub install: bool,
}

impl Phases {
    pub fn any(&self) -> bool {
        self.write || self.configure || self.build || self.install
    }
}

/// Parameters forwarded verbatim to the external tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOptions {
    pub source_folder: PathBuf,
    pub build_folder: PathBuf,
    pub install_folder: Option<PathBuf>,
    pub mode: String,
    pub jobs: u32,
    pub clean: bool,
    pub verbose: bool,
    pub timeout: Option<Duration>,
}

impl ToolOptions {
    /// Options with folders resolved against the description's directory.
    ///
    /// Relative build and install folders are taken relative to `source_folder`.
    pub fn new(source_folder: &Path, build_folder: &Path, install_folder: Option<&Path>) -> Self {
        Self {
            source_folder: source_folder.to_path_buf(),
            build_folder: resolve_folder(source_folder, build_folder),
            install_folder: install_folder
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| resolve_folder(source_folder, p)),
            mode: "debug".to_string(),
            jobs: 1,
            clean: false,
            verbose: false,
            timeout: None,
        }
    }
}

fn resolve_folder(base: &Path, folder: &Path) -> PathBuf {
    if folder.is_absolute() {
        folder.to_path_buf()
    } else {
        base.join(folder)
    }
}

/// A fully spelled out external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().to_string())
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

pub struct Toolchain {
    generator: Generator,
    options: ToolOptions,
    state: LifecycleState,
}

impl Toolchain {
    pub fn new(generator: Generator, options: ToolOptions) -> Self {
        Self {
            generator,
            options,
            state: LifecycleState::Uninitialized,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn options(&self) -> &ToolOptions {
        &self.options
    }

    pub fn configure_command(&self) -> Option<ToolCommand> {
        match self.generator {
            Generator::Make => None,
            Generator::CMake => {
                let o = &self.options;
                let mut cmd = ToolCommand::new("cmake")
                    .arg("-S")
                    .path_arg(&o.source_folder)
                    .arg("-B")
                    .path_arg(&o.build_folder)
                    .arg(format!("-DCMAKE_BUILD_TYPE={}", o.mode));
                if let Some(install) = &o.install_folder {
                    cmd = cmd.arg(format!("-DCMAKE_INSTALL_PREFIX={}", install.display()));
                }
                Some(cmd)
            }
        }
    }

    /// Commands of the build phase, run in order until one fails.
    ///
    /// Make runs `clean` as its own invocation so it can never race `all`
    /// under `-j`.
    pub fn build_commands(&self) -> Vec<ToolCommand> {
        let o = &self.options;
        match self.generator {
            Generator::Make => {
                let make = ToolCommand::new("make").arg("-C").path_arg(&o.source_folder);
                let mut cmds = Vec::new();
                if o.clean {
                    cmds.push(make.clone().arg("clean"));
                }
                cmds.push(make.arg("all").arg("-j").arg(o.jobs.to_string()));
                cmds
            }
            Generator::CMake => {
                let mut cmd = ToolCommand::new("cmake")
                    .arg("--build")
                    .path_arg(&o.build_folder)
                    .arg("--config")
                    .arg(o.mode.clone())
                    .arg("-j")
                    .arg(o.jobs.to_string());
                if o.verbose {
                    cmd = cmd.arg("--verbose");
                }
                if o.clean {
                    cmd = cmd.arg("--clean-first");
                }
                vec![cmd]
            }
        }
    }

    pub fn install_command(&self) -> Option<ToolCommand> {
        match self.generator {
            Generator::Make => None,
            Generator::CMake => {
                let o = &self.options;
                let mut cmd = ToolCommand::new("cmake")
                    .arg("--install")
                    .path_arg(&o.build_folder)
                    .arg("--config")
                    .arg(o.mode.clone());
                if o.verbose {
                    cmd = cmd.arg("--verbose");
                }
                Some(cmd)
            }
        }
    }

    /// Generate the build file(s) for `project`
    pub fn write(&mut self, mut project: Project) -> Result<PathBuf> {
        project.set_generator(self.generator);
        let path = project.finalize()?;
        self.state = LifecycleState::Declared;
        Ok(path)
    }

    pub fn configure(&mut self) -> Result<i32> {
        let Some(cmd) = self.configure_command() else {
            println!(
                "{} Nothing to configure for the {} generator",
                "!".yellow(),
                self.generator
            );
            return Ok(0);
        };
        fs::create_dir_all(&self.options.build_folder).with_context(|| {
            format!(
                "Failed to create build folder {}",
                self.options.build_folder.display()
            )
        })?;
        self.run_phase(&cmd, LifecycleState::Configured)
    }

    pub fn build(&mut self) -> Result<i32> {
        for cmd in self.build_commands() {
            let code = run_command(&cmd, self.options.timeout, self.options.verbose)?;
            if code != 0 {
                return Ok(code);
            }
        }
        self.state = LifecycleState::Built;
        Ok(0)
    }

    pub fn install(&mut self) -> Result<i32> {
        let Some(cmd) = self.install_command() else {
            println!(
                "{} Install steps are part of the generated rules for the {} generator",
                "!".yellow(),
                self.generator
            );
            return Ok(0);
        };
        if let Some(install) = &self.options.install_folder {
            fs::create_dir_all(install).with_context(|| {
                format!("Failed to create install folder {}", install.display())
            })?;
        }
        self.run_phase(&cmd, LifecycleState::Installed)
    }

    /// Run the requested phases in order, stopping at the first failing tool.
    ///
    /// Returns the exit code of the last tool invoked, or 0 if none ran.
    pub fn run(&mut self, project: Project, phases: Phases) -> Result<i32> {
        let mut code = 0;
        if phases.write {
            self.write(project)?;
        }
        if phases.configure {
            code = self.configure()?;
            if code != 0 {
                return Ok(code);
            }
        }
        if phases.build {
            code = self.build()?;
            if code != 0 {
                return Ok(code);
            }
        }
        if phases.install {
            code = self.install()?;
        }
        Ok(code)
    }

    fn run_phase(&mut self, cmd: &ToolCommand, reached: LifecycleState) -> Result<i32> {
        let code = run_command(cmd, self.options.timeout, self.options.verbose)?;
        if code == 0 {
            self.state = reached;
        }
        Ok(code)
    }
}

/// Spawn `cmd` with inherited stdio and wait for it, killing it after `timeout`.
pub fn run_command(cmd: &ToolCommand, timeout: Option<Duration>, verbose: bool) -> Result<i32> {
    if verbose {
        println!("   {} {}", "$".cyan(), cmd);
    }

    let spawned = Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            println!("{} '{}' not found on PATH", "x".red(), cmd.program);
            return Ok(NOT_FOUND_EXIT_CODE);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to execute {}", cmd.program));
        }
    };

    let Some(limit) = timeout else {
        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for {}", cmd.program))?;
        return Ok(status.code().unwrap_or(1));
    };

    let started = Instant::now();
    loop {
        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("Failed to poll {}", cmd.program))?
        {
            return Ok(status.code().unwrap_or(1));
        }
        if started.elapsed() >= limit {
            // The child may exit between the poll and the kill.
            let _ = child.kill();
            let _ = child.wait();
            println!(
                "{} '{}' timed out after {:.1?}",
                "x".red(),
                cmd,
                limit
            );
            return Ok(TIMEOUT_EXIT_CODE);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
