//! # pmake CLI Entry Point
//!
//! Loads a build description, writes the generated build file and optionally
//! drives the configure, build and install phases of the external tool.
//!
//! The process exit code is the exit code of the last external tool that ran,
//! 0 when only writing and 1 when loading or generation fails.

use anyhow::Result;
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use pmake::description;
use pmake::generate::Generator;
use pmake::project::Settings;
use pmake::toolchain::{Phases, ToolOptions, Toolchain};

#[cfg(windows)]
#[link(name = "kernel32")]
unsafe extern "system" {
    fn SetConsoleOutputCP(wCodePageID: u32) -> i32;
}

#[cfg(windows)]
fn enable_windows_utf8_console() {
    unsafe {
        SetConsoleOutputCP(65001);
    }
}

#[cfg(not(windows))]
fn enable_windows_utf8_console() {}

#[derive(Parser, Debug)]
#[command(name = "pmake")]
#[command(about = "Generate and drive C/C++ build files", version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
struct Cli {
    /// Description file, or a directory containing pmake.toml
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Write the build file (implied when no phase is given)
    #[arg(short, long)]
    write: bool,

    /// Configure the generated project
    #[arg(short, long)]
    configure: bool,

    /// Build the generated project
    #[arg(short, long)]
    build: bool,

    /// Install the built project
    #[arg(short, long)]
    install: bool,

    /// Build mode
    #[arg(long, default_value = "debug")]
    mode: String,

    /// Build folder, relative to the description (short form: -bf)
    #[arg(long, default_value = "build")]
    build_folder: PathBuf,

    /// Install prefix, relative to the description (short form: -if)
    #[arg(long)]
    install_folder: Option<PathBuf>,

    /// Clean before building
    #[arg(long)]
    clean: bool,

    /// Parallel jobs
    #[arg(short, long, default_value_t = 1)]
    jobs: u32,

    /// Echo generated text and tool commands
    #[arg(short, long)]
    verbose: bool,

    /// Generator to use, overriding the description
    #[arg(long, value_enum)]
    generator: Option<Generator>,

    /// Kill external tools after this many seconds
    #[arg(long)]
    timeout: Option<u64>,
}

impl Cli {
    fn phases(&self) -> Phases {
        let phases = Phases {
            write: self.write,
            configure: self.configure,
            build: self.build,
            install: self.install,
        };
        if phases.any() {
            phases
        } else {
            Phases {
                write: true,
                ..Default::default()
            }
        }
    }
}

/// Rewrite the two-letter short forms clap cannot express into their long forms
fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| match arg.as_str() {
            "-bf" => "--build-folder".to_string(),
            "-if" => "--install-folder".to_string(),
            _ => arg,
        })
        .collect()
}

fn main() -> ExitCode {
    enable_windows_utf8_console();

    let cli = Cli::parse_from(normalize_args(std::env::args()));

    match run(&cli) {
        Ok(code) => exit_code(code),
        Err(e) => {
            println!("{} {}", "x".red(), e.to_string().red());
            for cause in e.chain().skip(1) {
                println!("  {} {}", "caused by:".red(), cause);
            }
            ExitCode::from(1)
        }
    }
}

/// Exit with a tool's exit code.
///
/// Unix codes always fit in a byte. Windows tools may exit with wider values
/// (NTSTATUS codes), which are passed to the OS whole instead of truncated.
fn exit_code(code: i32) -> ExitCode {
    match byte_exit_code(code) {
        Some(code) => ExitCode::from(code),
        #[cfg(windows)]
        None => std::process::exit(code),
        #[cfg(not(windows))]
        None => ExitCode::FAILURE,
    }
}

fn byte_exit_code(code: i32) -> Option<u8> {
    u8::try_from(code).ok()
}

fn run(cli: &Cli) -> Result<i32> {
    let settings = Settings {
        mode: cli.mode.clone(),
        verbose: cli.verbose,
        ..Default::default()
    };

    let file = description::resolve_path(&cli.path)?;
    let project = description::load(&file, &settings)?;
    let generator = cli.generator.unwrap_or(project.generator());

    let source_folder = match project.directory() {
        dir if dir.as_os_str().is_empty() => Path::new("."),
        dir => dir,
    };
    let mut options = ToolOptions::new(
        source_folder,
        &cli.build_folder,
        cli.install_folder.as_deref(),
    );
    options.mode = cli.mode.clone();
    options.jobs = cli.jobs.max(1);
    options.clean = cli.clean;
    options.verbose = cli.verbose;
    options.timeout = cli.timeout.map(Duration::from_secs);

    let mut toolchain = Toolchain::new(generator, options);
    toolchain.run(project, cli.phases())
}
